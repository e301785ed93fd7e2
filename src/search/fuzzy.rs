//! Suggestion vocabulary and similarity scoring for the fuzzy fallback.

use std::collections::{HashSet, VecDeque};

/// Bounded set of tokens the engine has seen in queries and records.
///
/// FIFO-bounded: once the cap is reached the oldest term is forgotten.
/// Constructed by the caller and injected into the query engine, so tests
/// get a fresh instance each time.
pub struct Vocabulary {
    order: VecDeque<String>,
    terms: HashSet<String>,
    cap: usize,
}

impl Vocabulary {
    /// Create an empty vocabulary holding at most `cap` terms.
    pub fn new(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            terms: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Remember every whitespace-separated token of `text`.
    pub fn learn(&mut self, text: &str) {
        for token in text.split_whitespace() {
            if self.terms.contains(token) {
                continue;
            }
            while self.order.len() >= self.cap {
                if let Some(oldest) = self.order.pop_front() {
                    self.terms.remove(&oldest);
                }
            }
            self.order.push_back(token.to_string());
            self.terms.insert(token.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Whether a token is known verbatim.
    pub fn contains(&self, token: &str) -> bool {
        self.terms.contains(token)
    }

    /// Propose a corrected query, token by token.
    ///
    /// Tokens already in the vocabulary stay as they are; each unknown
    /// token is replaced by its best-scoring vocabulary term when that
    /// score clears the threshold. Returns `None` when nothing changes.
    pub fn suggest(&self, query: &str, threshold: u8) -> Option<String> {
        let mut changed = false;
        let mut corrected: Vec<&str> = Vec::new();

        for token in query.split_whitespace() {
            if self.contains(token) {
                corrected.push(token);
                continue;
            }

            let best = self
                .order
                .iter()
                .map(|term| (similarity(token, term), term.as_str()))
                .max_by_key(|(score, _)| *score);

            match best {
                Some((score, term)) if score >= threshold && term != token => {
                    corrected.push(term);
                    changed = true;
                }
                _ => corrected.push(token),
            }
        }

        if changed {
            Some(corrected.join(" "))
        } else {
            None
        }
    }
}

/// Similarity of two tokens on a 0-100 scale.
///
/// Dice coefficient over character bigrams, plus a 15-point bonus when
/// one token is a prefix of the other, capped at 100.
pub fn similarity(a: &str, b: &str) -> u8 {
    if a == b {
        return 100;
    }

    let bigrams_a = bigrams(a);
    let bigrams_b = bigrams(b);

    let base = if bigrams_a.is_empty() || bigrams_b.is_empty() {
        0.0
    } else {
        let shared = bigrams_a.intersection(&bigrams_b).count();
        200.0 * shared as f64 / (bigrams_a.len() + bigrams_b.len()) as f64
    };

    let bonus = if !a.is_empty() && !b.is_empty() && (a.starts_with(b) || b.starts_with(a)) {
        15.0
    } else {
        0.0
    };

    (base + bonus).round().min(100.0) as u8
}

fn bigrams(s: &str) -> HashSet<(char, char)> {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(2).map(|w| (w[0], w[1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_extremes() {
        assert_eq!(similarity("alpha", "alpha"), 100);
        assert_eq!(similarity("alpha", "zq"), 0);
    }

    #[test]
    fn test_similarity_near_miss_scores_high() {
        // one dropped letter
        assert!(similarity("interstelar", "interstellar") >= 60);
        // one appended character plus the prefix bonus
        assert!(similarity("alpha", "alphas") >= 60);
    }

    #[test]
    fn test_similarity_is_symmetric() {
        assert_eq!(
            similarity("gladiator", "gladiat0r"),
            similarity("gladiat0r", "gladiator")
        );
    }

    #[test]
    fn test_learn_and_contains() {
        let mut vocab = Vocabulary::new(16);
        vocab.learn("alpha 2024 1080p");
        assert!(vocab.contains("alpha"));
        assert!(vocab.contains("1080p"));
        assert!(!vocab.contains("beta"));
        assert_eq!(vocab.len(), 3);

        // duplicates are not stored twice
        vocab.learn("alpha again");
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn test_cap_evicts_oldest() {
        let mut vocab = Vocabulary::new(2);
        vocab.learn("one");
        vocab.learn("two");
        vocab.learn("three");

        assert_eq!(vocab.len(), 2);
        assert!(!vocab.contains("one"));
        assert!(vocab.contains("two"));
        assert!(vocab.contains("three"));
    }

    #[test]
    fn test_suggest_corrects_misspelled_token() {
        let mut vocab = Vocabulary::new(16);
        vocab.learn("interstellar 2014 1080p");

        let suggestion = vocab.suggest("interstelar", 60);
        assert_eq!(suggestion.as_deref(), Some("interstellar"));
    }

    #[test]
    fn test_suggest_keeps_known_tokens() {
        let mut vocab = Vocabulary::new(16);
        vocab.learn("interstellar 2014");

        let suggestion = vocab.suggest("interstelar 2014", 60);
        assert_eq!(suggestion.as_deref(), Some("interstellar 2014"));
    }

    #[test]
    fn test_suggest_returns_none_when_nothing_beats_threshold() {
        let mut vocab = Vocabulary::new(16);
        vocab.learn("completely different words");

        assert_eq!(vocab.suggest("zzzzqqq", 60), None);
    }

    #[test]
    fn test_suggest_returns_none_for_exact_query() {
        let mut vocab = Vocabulary::new(16);
        vocab.learn("alpha");

        assert_eq!(vocab.suggest("alpha", 60), None);
    }
}
