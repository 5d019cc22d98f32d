/// Articles stripped from names. Removal is a plain substring replace applied
/// in this order, not a leading-word check: "data analysis" loses its "a ".
const STRIPPED_ARTICLES: [&str; 3] = ["the ", "a ", "an "];

/// Normalize entity name: lowercase, trim, drop article substrings
pub fn normalize_name(name: &str) -> String {
    let mut normalized = name.to_lowercase().trim().to_string();

    for article in STRIPPED_ARTICLES {
        normalized = normalized.replace(article, "");
    }

    normalized
}

/// Whitespace separated words of an already normalized name
pub fn tokens(normalized: &str) -> Vec<&str> {
    normalized.split_whitespace().collect()
}

/// `|shared words| / max(|a|, |b|)` over word sets
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let mut words_a = tokens(a);
    let mut words_b = tokens(b);
    words_a.sort_unstable();
    words_a.dedup();
    words_b.sort_unstable();
    words_b.dedup();

    let total = words_a.len().max(words_b.len());
    if total == 0 {
        return 0.0;
    }

    let common = words_a.iter().filter(|w| words_b.contains(w)).count();
    common as f64 / total as f64
}

/// Containment in either direction (handles "AI" vs "AI research lab")
pub fn either_contains(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        assert_eq!(normalize_name("GraphRAG"), "graphrag");
        assert_eq!(normalize_name("  GraphRAG  "), "graphrag");
        assert_eq!(normalize_name("The Beatles"), "beatles");
        assert_eq!(normalize_name("An Apple"), "apple");
    }

    #[test]
    fn test_articles_removed_anywhere() {
        assert_eq!(normalize_name("Bank of the West"), "bank of west");
        assert_eq!(normalize_name("Data Analysis"), "datanalysis");
        assert_eq!(normalize_name("pasta"), "pasta");
    }

    #[test]
    fn test_token_overlap() {
        assert_eq!(token_overlap("apple inc", "apple inc"), 1.0);
        assert_eq!(token_overlap("apple inc", "apple computer inc"), 2.0 / 3.0);
        assert_eq!(token_overlap("apple", "microsoft"), 0.0);
        assert_eq!(token_overlap("", ""), 0.0);
    }

    #[test]
    fn test_either_contains() {
        assert!(either_contains("openai", "openai inc"));
        assert!(either_contains("openai inc", "openai"));
        assert!(!either_contains("", "openai"));
    }
}
