use crate::analysis::filters::stopword::StopWordFilter;

/// Token kinds produced from a raw query string.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryToken {
    Word(String),
    /// A `"` character; opens or closes an exact-phrase group.
    Quote,
    /// A recognized stopword; the planner drops these.
    Stopword(String),
    End,
}

/// Splits a query into words, quotes and stopwords. Words are lowercased;
/// any other character separates.
pub struct QueryTokenizer<'a> {
    input: &'a str,
    pos: usize,
    stopwords: StopWordFilter,
}

impl<'a> QueryTokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        QueryTokenizer {
            input,
            pos: 0,
            stopwords: StopWordFilter::english(),
        }
    }

    pub fn with_stopwords(input: &'a str, stopwords: StopWordFilter) -> Self {
        QueryTokenizer {
            input,
            pos: 0,
            stopwords,
        }
    }

    pub fn has_next(&self) -> bool {
        self.pos < self.input.len()
    }

    pub fn next_token(&mut self) -> QueryToken {
        let rest = &self.input[self.pos..];
        let mut chars = rest.char_indices();

        while let Some((start, c)) = chars.next() {
            if c == '"' {
                self.pos += start + c.len_utf8();
                return QueryToken::Quote;
            }
            if !c.is_alphanumeric() {
                continue;
            }

            // the word runs until the first non-alphanumeric char
            let mut end = rest.len();
            for (i, c) in rest[start..].char_indices() {
                if !c.is_alphanumeric() {
                    end = start + i;
                    break;
                }
            }
            let word = rest[start..end].to_lowercase();
            self.pos += end;
            return if self.stopwords.is_stopword(&word) {
                QueryToken::Stopword(word)
            } else {
                QueryToken::Word(word)
            };
        }

        self.pos = self.input.len();
        QueryToken::End
    }
}
