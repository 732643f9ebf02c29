crate::define_id_enum! {
    /// Runtime languages, derived from the detected framework
    LanguageId {
        Python => "python" : "Python",
        NodeJs => "nodejs" : "Node.js" | "JavaScript",
        Java => "java" : "Java",
        Go => "go" : "Go",
        Unknown => "unknown" : "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_id_round_trip() {
        let json = serde_json::to_string(&LanguageId::NodeJs).unwrap();
        assert_eq!(json, "\"nodejs\"");
        let parsed: LanguageId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, LanguageId::NodeJs);
    }

    #[test]
    fn test_language_alias() {
        assert_eq!(LanguageId::from_name("JavaScript"), Some(LanguageId::NodeJs));
    }
}
