use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, DocumentMetadata};
use crate::storage::keys;
use crate::storage::store::BlobStore;

/// Document bookkeeping over the store's hashes: the doc-key <-> doc-id
/// maps, the monotonic id counter and the per-index metadata table.
pub struct DocTable {
    store: Arc<dyn BlobStore>,
    table_key: String,
}

impl DocTable {
    pub fn new(store: Arc<dyn BlobStore>, index: &str) -> Self {
        DocTable {
            store,
            table_key: keys::doc_table_key(index),
        }
    }

    /// Resolve a document key to its dense id, minting a fresh one from the
    /// counter on first sight. Returns `(doc_id, is_new)`.
    pub fn get_doc_id(&self, doc_key: &str) -> Result<(DocId, bool)> {
        if let Some(raw) = self.store.hget(keys::DOC_KEY_MAP, doc_key)? {
            let id = std::str::from_utf8(&raw)
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .ok_or_else(|| {
                    Error::new(
                        ErrorKind::Decode,
                        format!("doc id map holds garbage for '{}'", doc_key),
                    )
                })?;
            return Ok((DocId(id), false));
        }

        let id = self.store.incr(keys::DOC_ID_COUNTER)? as u32;
        let id_str = id.to_string();
        self.store
            .hset(keys::DOC_ID_MAP, &id_str, doc_key.as_bytes())?;
        self.store
            .hset(keys::DOC_KEY_MAP, doc_key, id_str.as_bytes())?;
        Ok((DocId(id), true))
    }

    pub fn get_doc_key(&self, doc_id: DocId) -> Result<Option<String>> {
        Ok(self
            .store
            .hget(keys::DOC_ID_MAP, &doc_id.to_string())?
            .and_then(|raw| String::from_utf8(raw.to_vec()).ok()))
    }

    /// Store the 6-byte little-endian `{score, flags}` metadata payload.
    pub fn put_document(&self, doc_id: DocId, score: f32, flags: u16) -> Result<()> {
        let md = DocumentMetadata { score, flags };
        let payload = bincode::serialize(&md)?;
        self.store
            .hset(&self.table_key, &doc_id.to_string(), &payload)
    }

    pub fn get_metadata(&self, doc_id: DocId) -> Result<Option<DocumentMetadata>> {
        match self.store.hget(&self.table_key, &doc_id.to_string())? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }
}
