use rustc_hash::FxHashSet;

/// Marker emitted at the start of each sentence
pub const SENTENCE_START: &str = "<s>";
/// Marker emitted at the end of each sentence
pub const SENTENCE_END: &str = "</s>";

/// Maximum token length kept; longer runs are usually encoded blobs
const MAX_TOKEN_LENGTH: usize = 64;

/// Common English function words dropped by the default chain
const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "herself",
    "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just",
    "me", "more", "most", "my", "myself", "no", "nor", "not", "now", "of", "off", "on", "once",
    "one", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "theirs", "them",
    "themselves", "then", "there", "these", "they", "this", "those", "through", "to", "too",
    "under", "until", "up", "very", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Word tokenizer followed by lowercasing, stopword removal and
/// sentence boundary markers.
#[derive(Debug, Clone)]
pub struct FilterChain {
    lowercase: bool,
    stopwords: FxHashSet<String>,
    sentence_boundaries: bool,
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::default_chain()
    }
}

impl FilterChain {
    /// Lowercase, English stopwords, `<s>`/`</s>` markers
    pub fn default_chain() -> Self {
        Self {
            lowercase: true,
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            sentence_boundaries: true,
        }
    }

    /// Plain word splitting, nothing dropped or added
    pub fn passthrough() -> Self {
        Self {
            lowercase: false,
            stopwords: FxHashSet::default(),
            sentence_boundaries: false,
        }
    }

    pub fn with_stopwords<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stopwords = words.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sentence_boundaries(mut self, enabled: bool) -> Self {
        self.sentence_boundaries = enabled;
        self
    }

    pub fn is_stopword(&self, word: &str) -> bool {
        self.stopwords.contains(word)
    }

    /// Run the chain over a text, producing the token sequence
    pub fn apply(&self, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut in_sentence = false;

        for piece in split_words(text) {
            match piece {
                Piece::Word(word) => {
                    let word = if self.lowercase {
                        word.to_lowercase()
                    } else {
                        word.to_string()
                    };
                    if self.stopwords.contains(&word) {
                        continue;
                    }
                    if self.sentence_boundaries && !in_sentence {
                        out.push(SENTENCE_START.to_string());
                        in_sentence = true;
                    }
                    out.push(word);
                }
                Piece::SentenceEnd => {
                    if in_sentence {
                        out.push(SENTENCE_END.to_string());
                        in_sentence = false;
                    }
                }
            }
        }

        if in_sentence {
            out.push(SENTENCE_END.to_string());
        }
        out
    }
}

enum Piece<'a> {
    Word(&'a str),
    SentenceEnd,
}

/// Split on non-alphanumeric characters, reporting sentence-final punctuation
fn split_words(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut start: Option<usize> = None;

    for (i, ch) in text.char_indices() {
        if ch.is_alphanumeric() || ch == '\'' {
            if start.is_none() {
                start = Some(i);
            }
            continue;
        }
        if let Some(s) = start.take() {
            push_word(&mut pieces, &text[s..i]);
        }
        if matches!(ch, '.' | '!' | '?') {
            pieces.push(Piece::SentenceEnd);
        }
    }

    if let Some(s) = start {
        push_word(&mut pieces, &text[s..]);
    }
    pieces
}

fn push_word<'a>(pieces: &mut Vec<Piece<'a>>, word: &'a str) {
    let word = word.trim_matches('\'');
    if !word.is_empty() && word.len() <= MAX_TOKEN_LENGTH {
        pieces.push(Piece::Word(word));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_chain_drops_stopwords_and_marks_sentence() {
        let tokens = FilterChain::default_chain().apply("The cat sat. One dog ran!");
        assert_eq!(
            tokens,
            vec!["<s>", "cat", "sat", "</s>", "<s>", "dog", "ran", "</s>"]
        );
    }

    #[test]
    fn test_all_stopwords_yield_nothing() {
        assert!(FilterChain::default_chain().apply("the of and").is_empty());
        assert!(FilterChain::default_chain().apply("").is_empty());
    }

    #[test]
    fn test_passthrough_keeps_case() {
        let tokens = FilterChain::passthrough().apply("Hello, World");
        assert_eq!(tokens, vec!["Hello", "World"]);
    }
}
