//! Backing-store key layout. A pre-existing deployment depends on these
//! exact templates, so they are kept byte-for-byte stable.

/// Posting list blob for a term.
pub fn term_key(index: &str, term: &str) -> String {
    format!("{}/{}", index, term)
}

/// Skip index blob for a term.
pub fn skip_index_key(index: &str, term: &str) -> String {
    format!("si:{}/{}", index, term)
}

/// Score index blob for a term.
pub fn score_index_key(index: &str, term: &str) -> String {
    format!("ss:{}/{}", index, term)
}

/// Numeric sorted set for a field.
pub fn numeric_index_key(index: &str, field: &str) -> String {
    format!("num:{}/{}", index, field)
}

/// Doc-id -> metadata hash for an index.
pub fn doc_table_key(index: &str) -> String {
    format!("dt:{}", index)
}

/// Doc key -> doc id hash.
pub const DOC_KEY_MAP: &str = "__dockey_map";

/// Doc id -> doc key hash.
pub const DOC_ID_MAP: &str = "__docid_map";

/// Monotonic doc id counter.
pub const DOC_ID_COUNTER: &str = "__docid_counter";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_templates() {
        assert_eq!(term_key("idx", "hello"), "idx/hello");
        assert_eq!(skip_index_key("idx", "hello"), "si:idx/hello");
        assert_eq!(score_index_key("idx", "hello"), "ss:idx/hello");
        assert_eq!(numeric_index_key("idx", "price"), "num:idx/price");
        assert_eq!(doc_table_key("idx"), "dt:idx");
    }
}
