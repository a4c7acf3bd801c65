use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

pub const FALLBACK_KEYWORD: &str = "news";

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[a-zA-Z가-힣]{3,}\b").unwrap());

/// Most frequent word of three or more Latin or Hangul letters.
///
/// Ties go to the word that appears first. Returns [`FALLBACK_KEYWORD`] when
/// no word qualifies.
pub fn extract_keyword(script: &str) -> String {
    // word -> (count, first position)
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (position, word) in WORD.find_iter(script).map(|m| m.as_str()).enumerate() {
        counts.entry(word).or_insert((0, position)).0 += 1;
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(word, _)| word.to_string())
        .unwrap_or_else(|| FALLBACK_KEYWORD.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_most_frequent_word() {
        let script = "반도체 수출이 늘었습니다.\n반도체 업계는 반도체 투자를 확대합니다.";
        assert_eq!(extract_keyword(script), "반도체");
    }

    #[test]
    fn ties_resolve_to_first_occurrence() {
        assert_eq!(extract_keyword("zeta alpha alpha zeta"), "zeta");
        assert_eq!(extract_keyword("alpha zeta zeta alpha"), "alpha");
    }

    #[test]
    fn short_words_and_digits_are_ignored() {
        assert_eq!(extract_keyword("AI is on 2024 go"), FALLBACK_KEYWORD);
        assert_eq!(extract_keyword(""), FALLBACK_KEYWORD);
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(extract_keyword("Apple apple Apple"), "Apple");
    }
}
