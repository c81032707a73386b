//! Case-insensitive literal matching over normalized text.

use memchr::memmem;

/// Case-fold text for indexing and matching.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// [`normalize`] into a reused buffer.
///
/// ASCII text is folded in place without allocating; anything else goes
/// through [`normalize`] so context-sensitive folds stay identical.
pub fn normalize_into(text: &str, out: &mut String) {
    out.clear();
    if text.is_ascii() {
        out.push_str(text);
        out.make_ascii_lowercase();
    } else {
        out.push_str(&normalize(text));
    }
}

/// Precompiled needle for verifying many candidates against one query.
pub struct LiteralMatcher {
    finder: memmem::Finder<'static>,
}

impl LiteralMatcher {
    pub fn new(normalized_needle: &str) -> Self {
        LiteralMatcher {
            finder: memmem::Finder::new(normalized_needle.as_bytes()).into_owned(),
        }
    }

    pub fn is_match(&self, normalized_haystack: &str) -> bool {
        self.finder.find(normalized_haystack.as_bytes()).is_some()
    }
}

/// Char offsets, into `normalize(haystack)`, of every non-overlapping
/// occurrence of `normalize(needle)`, scanning left to right.
///
/// Uses the same folding as search verification, so every entry a search
/// returns has at least one match. An empty needle has no occurrences.
pub fn find_all_matches(haystack: &str, needle: &str) -> Vec<usize> {
    let needle: Vec<char> = normalize(needle).chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }
    let folded: Vec<char> = normalize(haystack).chars().collect();

    let mut matches = Vec::new();
    let mut i = 0;
    while i + needle.len() <= folded.len() {
        if folded[i..i + needle.len()] == needle[..] {
            matches.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("Apple PIE"), "apple pie");
        assert_eq!(normalize("ÄÖÜ"), "äöü");
    }

    #[test]
    fn test_normalize_into_matches_normalize() {
        let mut buf = String::from("stale contents");
        for text in [
            "Apple PIE",
            "",
            "\u{39f}\u{394}\u{39f}\u{3a3}",
            "\u{130}stanbul",
            "MiXeD 123 ÄÖ",
        ] {
            normalize_into(text, &mut buf);
            assert_eq!(buf, normalize(text), "{text:?}");
        }
    }

    #[test]
    fn test_literal_matcher() {
        let matcher = LiteralMatcher::new("ppl");
        assert!(matcher.is_match("apple"));
        assert!(!matcher.is_match("banana"));
        assert!(LiteralMatcher::new("").is_match("anything"));
    }

    #[test]
    fn test_find_all_matches() {
        assert_eq!(find_all_matches("Hello, world!", "l"), vec![2, 3, 10]);
        assert_eq!(find_all_matches("sassafras", "as"), vec![1, 7]);
        assert_eq!(find_all_matches("aaaa", "aa"), vec![0, 2]);
        assert_eq!(find_all_matches("ERROR error", "Error"), vec![0, 6]);
        assert_eq!(find_all_matches("abc", ""), Vec::<usize>::new());
        assert_eq!(find_all_matches("", "a"), Vec::<usize>::new());
        assert_eq!(find_all_matches("héllo wörld", "ö"), vec![7]);
    }

    #[test]
    fn test_find_all_matches_uses_normalized_offsets() {
        // U+0130 folds to two chars: "i" and a combining dot above.
        assert_eq!(normalize("\u{130}x").chars().count(), 3);
        assert_eq!(find_all_matches("\u{130}x", "x"), vec![2]);
    }

    #[test]
    fn test_find_all_matches_agrees_with_verification() {
        // A word-final capital sigma folds to the final form.
        let haystack = "\u{39f}\u{394}\u{39f}\u{3a3}";
        let needle = "\u{3bf}\u{3c2}";
        assert_eq!(normalize(haystack), "\u{3bf}\u{3b4}\u{3bf}\u{3c2}");
        assert!(LiteralMatcher::new(&normalize(needle)).is_match(&normalize(haystack)));
        assert_eq!(find_all_matches(haystack, needle), vec![2]);
    }
}
