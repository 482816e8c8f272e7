//! Property tests for the text heuristics every adapter relies on.

use chrono::{TimeZone, Utc};
use job_crawlers::heuristics::{
    collapse_whitespace, extract_skills, merge_skills, normalize_skill, parse_career,
    parse_employment_type, parse_period, split_lines,
};
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_classifiers_accept_any_text(text in "\\PC{0,80}") {
        let _ = parse_career(&text);
        let _ = parse_employment_type(&text);
        let _ = extract_skills(&text);
    }

    #[test]
    fn test_collapse_whitespace_is_idempotent(text in "[ \\ta-z가-힣\\n]{0,60}") {
        let once = collapse_whitespace(&text);
        prop_assert_eq!(collapse_whitespace(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }

    #[test]
    fn test_merged_skills_have_no_case_duplicates(skills in prop::collection::vec("[a-zA-Z]{1,6}", 0..12)) {
        let merged = merge_skills(skills.clone());
        for (i, a) in merged.iter().enumerate() {
            for b in &merged[i + 1..] {
                prop_assert!(!a.eq_ignore_ascii_case(b));
            }
        }
        for skill in &skills {
            prop_assert!(merged.iter().any(|m| m.eq_ignore_ascii_case(skill)));
        }
    }

    #[test]
    fn test_normalized_skill_is_never_blank(raw in "#?[a-zA-Z.+ ]{0,20}") {
        if let Some(skill) = normalize_skill(&raw) {
            prop_assert!(!skill.trim().is_empty());
            prop_assert!(!skill.starts_with('#'));
        }
    }

    #[test]
    fn test_period_defaults_never_precede_now(text in "[a-zA-Z가-힣 ~.]{0,30}") {
        let now = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let period = parse_period(&text, now);
        prop_assert_eq!(period.start, now);
        prop_assert!(period.end > period.start);
    }

    #[test]
    fn test_split_lines_drops_blank_lines(lines in prop::collection::vec("[ a-z]{0,10}", 0..8)) {
        let text = lines.join("\n");
        for line in split_lines(&text) {
            prop_assert!(!line.trim().is_empty());
        }
    }
}
