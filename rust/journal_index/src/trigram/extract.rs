//! Trigram extraction from normalized text.
//!
//! Trigrams are taken over Unicode scalar values, not bytes, so a query is
//! decomposable exactly when it has at least three characters.

use ahash::AHashSet;

/// Number of characters per index key.
pub const NGRAM_LEN: usize = 3;

/// Index key: three consecutive characters.
pub type Trigram = [char; NGRAM_LEN];

/// Unique trigrams of `text`. Empty when `text` has fewer than 3 characters.
pub fn extract_trigrams(text: &str) -> Vec<Trigram> {
    let mut scratch = TrigramScratch::default();
    scratch.extract(text).to_vec()
}

/// Reusable buffers for extracting trigrams from many documents.
#[derive(Debug, Default)]
pub struct TrigramScratch {
    chars: Vec<char>,
    seen: AHashSet<Trigram>,
    unique: Vec<Trigram>,
}

impl TrigramScratch {
    /// Unique trigrams of `text`, in first-occurrence order.
    pub fn extract(&mut self, text: &str) -> &[Trigram] {
        self.chars.clear();
        self.seen.clear();
        self.unique.clear();

        self.chars.extend(text.chars());
        for window in self.chars.windows(NGRAM_LEN) {
            let trigram = to_trigram(window);
            if self.seen.insert(trigram) {
                self.unique.push(trigram);
            }
        }
        &self.unique
    }
}

fn to_trigram(window: &[char]) -> Trigram {
    [window[0], window[1], window[2]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_trigrams_overlapping() {
        assert_eq!(
            extract_trigrams("hello"),
            vec![['h', 'e', 'l'], ['e', 'l', 'l'], ['l', 'l', 'o']]
        );
        assert_eq!(extract_trigrams("aaaa"), vec![['a', 'a', 'a']]);
    }

    #[test]
    fn test_extract_trigrams_short() {
        assert!(extract_trigrams("").is_empty());
        assert!(extract_trigrams("a").is_empty());
        assert!(extract_trigrams("ab").is_empty());
        assert_eq!(extract_trigrams("abc"), vec![['a', 'b', 'c']]);
    }

    #[test]
    fn test_extract_trigrams_deduplicates() {
        assert_eq!(extract_trigrams("aaaaaa"), vec![['a', 'a', 'a']]);
        assert_eq!(extract_trigrams("abcabc").len(), 3);
    }

    #[test]
    fn test_extract_trigrams_unicode_is_per_char() {
        // 3 chars, 9 bytes: exactly one trigram.
        assert_eq!(extract_trigrams("日本語"), vec![['日', '本', '語']]);
        assert_eq!(extract_trigrams("🥟🥟").len(), 0);
    }

    #[test]
    fn test_scratch_reuse_resets_state() {
        let mut scratch = TrigramScratch::default();
        assert_eq!(scratch.extract("hello").len(), 3);
        assert_eq!(scratch.extract("xyz"), &[['x', 'y', 'z']]);
        assert!(scratch.extract("no").is_empty());
    }
}
