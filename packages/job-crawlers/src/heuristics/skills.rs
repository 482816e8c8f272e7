//! Skill dictionary with alias and composite-term normalization.

use super::find_term;

/// Canonical skill name and the lowercase aliases that identify it.
///
/// Composite names come before their components so `Spring Boot` is claimed
/// before `Spring` gets a chance to match the same text.
pub const SKILLS: &[(&str, &[&str])] = &[
    ("Spring Boot", &["spring boot", "springboot"]),
    ("Spring", &["spring framework", "spring"]),
    ("React Native", &["react native", "react-native"]),
    ("React", &["react.js", "reactjs", "react"]),
    ("Vue.js", &["vue.js", "vuejs", "vue"]),
    ("Next.js", &["next.js", "nextjs"]),
    ("Node.js", &["node.js", "nodejs", "node"]),
    ("JavaScript", &["javascript", "js"]),
    ("TypeScript", &["typescript", "ts"]),
    ("Java", &["java"]),
    ("Kotlin", &["kotlin"]),
    ("Swift", &["swift"]),
    ("Objective-C", &["objective-c", "objc"]),
    ("Python", &["python"]),
    ("Go", &["golang", "go"]),
    ("Rust", &["rust"]),
    ("C++", &["c++", "cpp"]),
    ("C#", &["c#", ".net"]),
    ("Scala", &["scala"]),
    ("Ruby", &["ruby", "rails"]),
    ("PHP", &["php"]),
    ("Angular", &["angular"]),
    ("Django", &["django"]),
    ("Flask", &["flask"]),
    ("FastAPI", &["fastapi"]),
    ("JPA", &["jpa", "hibernate"]),
    ("Flutter", &["flutter"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Docker", &["docker"]),
    ("Terraform", &["terraform"]),
    ("Jenkins", &["jenkins"]),
    ("AWS", &["aws", "amazon web services"]),
    ("GCP", &["gcp", "google cloud"]),
    ("Azure", &["azure"]),
    ("Kafka", &["kafka"]),
    ("Redis", &["redis"]),
    ("MySQL", &["mysql"]),
    ("PostgreSQL", &["postgresql", "postgres"]),
    ("Oracle", &["oracle"]),
    ("MongoDB", &["mongodb", "mongo"]),
    ("Elasticsearch", &["elasticsearch", "elastic search"]),
    ("Hadoop", &["hadoop"]),
    ("Spark", &["apache spark", "spark"]),
    ("Airflow", &["airflow"]),
    ("TensorFlow", &["tensorflow"]),
    ("PyTorch", &["pytorch"]),
    ("GraphQL", &["graphql"]),
    ("gRPC", &["grpc"]),
    ("Linux", &["linux"]),
    ("Git", &["git"]),
    ("iOS", &["ios"]),
    ("Android", &["android", "안드로이드"]),
    ("MSA", &["msa", "microservice", "마이크로서비스"]),
];

/// Known skills mentioned in free text, in dictionary order, without duplicates.
pub fn extract_skills(text: &str) -> Vec<String> {
    let mut haystack = text.to_lowercase();
    let mut found = Vec::new();

    for (canonical, aliases) in SKILLS {
        let mut matched = false;
        for alias in *aliases {
            let mut from = 0;
            while let Some(begin) = find_term(&haystack, alias, from) {
                matched = true;
                let end = begin + alias.len();
                // Blank the span so component terms cannot match it again.
                haystack.replace_range(begin..end, &" ".repeat(end - begin));
                from = end;
            }
        }
        if matched {
            found.push(canonical.to_string());
        }
    }

    found
}

/// Canonical name for a raw skill tag such as `#springboot` or `nodejs`.
///
/// Exact alias matches win; otherwise a canonical composite containing the
/// tag (or contained by it) is used; otherwise the cleaned tag is returned.
pub fn normalize_skill(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_start_matches('#').trim();
    if cleaned.is_empty() {
        return None;
    }
    let lower = cleaned.to_lowercase();

    if let Some((canonical, _)) = SKILLS
        .iter()
        .find(|(canonical, aliases)| canonical.to_lowercase() == lower || aliases.contains(&lower.as_str()))
    {
        return Some(canonical.to_string());
    }

    if lower.chars().count() >= 3 {
        if let Some((canonical, _)) = SKILLS.iter().find(|(canonical, _)| {
            let canonical = canonical.to_lowercase();
            canonical.contains(' ') && (canonical.contains(&lower) || lower.contains(&canonical))
        }) {
            return Some(canonical.to_string());
        }
    }

    Some(cleaned.to_string())
}

/// Normalize each tag and drop case-insensitive duplicates, keeping first occurrence.
pub fn normalize_skills<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    merge_skills(raw.into_iter().filter_map(|s| normalize_skill(s.as_ref())))
}

/// Order-preserving, case-insensitive de-duplication.
pub fn merge_skills<I, S>(skills: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut merged: Vec<String> = Vec::new();
    for skill in skills {
        let skill = skill.into();
        if !merged.iter().any(|s| s.eq_ignore_ascii_case(&skill)) {
            merged.push(skill);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_aliases_without_duplicates() {
        let skills = extract_skills("Java, Spring Boot, JPA 경험 / k8s 및 AWS 운영 경험. Java 필수");
        assert_eq!(skills, vec!["Spring Boot", "Java", "JPA", "Kubernetes", "AWS"]);
    }

    #[test]
    fn composite_terms_claim_their_span() {
        assert_eq!(extract_skills("React Native 앱 개발"), vec!["React Native"]);
        assert_eq!(
            extract_skills("React Native와 React 웹 모두"),
            vec!["React Native", "React"]
        );
        assert_eq!(extract_skills("JavaScript/TypeScript"), vec!["JavaScript", "TypeScript"]);
    }

    #[test]
    fn no_partial_word_matches() {
        assert!(extract_skills("Google 검색 서비스").is_empty());
        assert_eq!(extract_skills("Node.js 서버"), vec!["Node.js"]);
    }

    #[test]
    fn normalizes_tags() {
        assert_eq!(normalize_skill("#springboot").as_deref(), Some("Spring Boot"));
        assert_eq!(normalize_skill("nodejs").as_deref(), Some("Node.js"));
        assert_eq!(normalize_skill("Spring").as_deref(), Some("Spring"));
        assert_eq!(normalize_skill("#react-native").as_deref(), Some("React Native"));
        assert_eq!(normalize_skill("#Boot").as_deref(), Some("Spring Boot"));
        assert_eq!(normalize_skill("#WebFlux").as_deref(), Some("WebFlux"));
        assert_eq!(normalize_skill(" # "), None);
    }

    #[test]
    fn normalize_and_dedupe() {
        let skills = normalize_skills(["#Kotlin", "#SpringBoot", "#kotlin", "#Spring Boot"]);
        assert_eq!(skills, vec!["Kotlin", "Spring Boot"]);
    }

    #[test]
    fn merge_keeps_first_spelling() {
        let merged = merge_skills(["Java", "Kafka", "JAVA", "kafka", "Redis"]);
        assert_eq!(merged, vec!["Java", "Kafka", "Redis"]);
    }
}
