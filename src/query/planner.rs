use crate::analysis::query_tokenizer::{QueryToken, QueryTokenizer};
use crate::core::types::FIELD_MASK_ALL;
use crate::numeric::filter::NumericFilter;
use crate::query::stage::QueryStage;

/// A parsed query: the stage tree plus the result window and field
/// restriction it runs under.
#[derive(Debug, Clone)]
pub struct Query {
    pub raw: String,
    pub offset: usize,
    pub limit: usize,
    pub field_mask: u8,
    pub num_tokens: usize,
    pub root: QueryStage,
}

impl Query {
    /// Tokenize `raw` into a stage tree rooted at an intersection. Words
    /// become `Load` children of the current node; a quote opens an `Exact`
    /// group and the matching quote closes it; stopwords vanish. Numeric
    /// filters attach as extra children of the root.
    pub fn parse(
        raw: &str,
        offset: usize,
        limit: usize,
        field_mask: u8,
        filters: &[NumericFilter],
        max_tokens: usize,
    ) -> Query {
        let mut tokenizer = QueryTokenizer::new(raw);
        let mut num_tokens = 0usize;

        // stack of open groups: the bottom frame is the root intersection,
        // every frame above it is an unclosed phrase
        let mut frames: Vec<Vec<QueryStage>> = vec![Vec::new()];

        loop {
            match tokenizer.next_token() {
                QueryToken::Word(term) => {
                    if num_tokens >= max_tokens {
                        break;
                    }
                    num_tokens += 1;
                    frames
                        .last_mut()
                        .expect("frame stack never empties")
                        .push(QueryStage::Load(term));
                }
                QueryToken::Quote => {
                    if frames.len() == 1 {
                        frames.push(Vec::new());
                    } else {
                        let children = frames.pop().expect("phrase frame present");
                        frames
                            .last_mut()
                            .expect("frame stack never empties")
                            .push(QueryStage::Exact(children));
                    }
                }
                QueryToken::Stopword(_) => {}
                QueryToken::End => break,
            }
        }

        // an unclosed quote closes at end of input
        while frames.len() > 1 {
            let children = frames.pop().expect("phrase frame present");
            frames
                .last_mut()
                .expect("frame stack never empties")
                .push(QueryStage::Exact(children));
        }

        let mut root_children = frames.pop().expect("root frame present");
        for filter in filters {
            root_children.push(QueryStage::Numeric(filter.clone()));
        }

        Query {
            raw: raw.to_string(),
            offset,
            limit,
            field_mask,
            num_tokens,
            root: QueryStage::Intersect(root_children),
        }
    }

    /// A single unrestricted term can be answered straight off the score
    /// index, best hits first.
    pub fn is_single_word(&self) -> bool {
        self.num_tokens == 1
            && self.field_mask == FIELD_MASK_ALL
            && self.root.children().len() == 1
    }
}
