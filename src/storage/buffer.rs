use std::sync::Arc;

use crate::core::error::{Error, ErrorKind, Result};
use crate::storage::store::BlobStore;

pub const BUFFER_READ: u8 = 0x01;
pub const BUFFER_WRITE: u8 = 0x02;
/// Memory-backed buffers release their allocation on drop; store-backed
/// buffers leave the blob in place.
pub const BUFFER_FREEABLE: u8 = 0x04;

enum Backing {
    Memory,
    Store {
        store: Arc<dyn BlobStore>,
        key: String,
    },
}

/// Seekable binary buffer over a pluggable backing.
///
/// Memory buffers own a growable region doubled on demand. Store buffers
/// cache the blob image; writes go through to the store, appending when the
/// cursor sits at the end.
pub struct ByteBuffer {
    data: Vec<u8>,
    cap: usize,
    offset: usize,
    mode: u8,
    backing: Backing,
}

impl ByteBuffer {
    /// Growable in-memory buffer opened for writing.
    pub fn memory(initial_cap: usize) -> Self {
        ByteBuffer {
            data: vec![0u8; initial_cap],
            cap: initial_cap,
            offset: 0,
            mode: BUFFER_READ | BUFFER_WRITE | BUFFER_FREEABLE,
            backing: Backing::Memory,
        }
    }

    /// Read-only view over an owned byte vector.
    pub fn from_vec(data: Vec<u8>) -> Self {
        let cap = data.len();
        ByteBuffer {
            data,
            cap,
            offset: 0,
            mode: BUFFER_READ | BUFFER_FREEABLE,
            backing: Backing::Memory,
        }
    }

    /// Open a store blob read-only. `None` when the key does not exist.
    pub fn store_read(store: Arc<dyn BlobStore>, key: &str) -> Result<Option<Self>> {
        let blob = match store.get(key)? {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let data = blob.to_vec();
        let cap = data.len();
        Ok(Some(ByteBuffer {
            data,
            cap,
            offset: 0,
            mode: BUFFER_READ,
            backing: Backing::Store {
                store,
                key: key.to_string(),
            },
        }))
    }

    /// Open a store blob for writing, creating it if absent. The cursor
    /// starts at 0; writers append after `seek_end`.
    pub fn store_write(store: Arc<dyn BlobStore>, key: &str) -> Result<Self> {
        let data = match store.get(key)? {
            Some(blob) => blob.to_vec(),
            None => Vec::new(),
        };
        let cap = data.len();
        Ok(ByteBuffer {
            data,
            cap,
            offset: 0,
            mode: BUFFER_READ | BUFFER_WRITE,
            backing: Backing::Store {
                store,
                key: key.to_string(),
            },
        })
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.cap == 0
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.cap
    }

    pub fn remaining(&self) -> usize {
        self.cap - self.offset.min(self.cap)
    }

    pub fn read_byte(&mut self) -> Option<u8> {
        if self.offset >= self.cap {
            return None;
        }
        let b = self.data[self.offset];
        self.offset += 1;
        Some(b)
    }

    /// Read exactly `n` bytes, advancing the cursor. `None` when fewer than
    /// `n` bytes remain (the cursor does not move).
    pub fn read(&mut self, n: usize) -> Option<&[u8]> {
        if self.offset + n > self.cap {
            return None;
        }
        let slice = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Some(slice)
    }

    pub fn skip(&mut self, n: usize) {
        self.offset = (self.offset + n).min(self.cap);
    }

    pub fn seek(&mut self, offset: usize) {
        self.offset = offset.min(self.cap);
    }

    pub fn seek_end(&mut self) {
        self.offset = self.cap;
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.mode & BUFFER_WRITE == 0 {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "write on read-only buffer".to_string(),
            ));
        }
        match &self.backing {
            Backing::Memory => {
                let needed = self.offset + bytes.len();
                if needed > self.data.len() {
                    let grown = (self.data.len() * 2).max(needed).max(16);
                    self.data.resize(grown, 0);
                }
                self.data[self.offset..needed].copy_from_slice(bytes);
                self.offset = needed;
                self.cap = self.cap.max(needed);
            }
            Backing::Store { store, key } => {
                if self.offset == self.cap {
                    store.append(key, bytes)?;
                    self.data.extend_from_slice(bytes);
                } else {
                    let needed = self.offset + bytes.len();
                    if needed > self.data.len() {
                        self.data.resize(needed, 0);
                    }
                    self.data[self.offset..needed].copy_from_slice(bytes);
                    store.set(key, &self.data)?;
                }
                self.offset += bytes.len();
                self.cap = self.data.len();
            }
        }
        Ok(())
    }

    /// Truncate to `new_len` bytes; `new_len == 0` truncates to the current
    /// cursor, which is how writers trim to the exact written length.
    /// Returns the resulting length. Idempotent.
    pub fn truncate(&mut self, new_len: usize) -> Result<usize> {
        if self.mode & BUFFER_WRITE == 0 {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "truncate on read-only buffer".to_string(),
            ));
        }
        let target = if new_len == 0 { self.offset } else { new_len };
        let target = target.min(self.data.len());
        self.data.truncate(target);
        self.cap = target;
        self.offset = self.offset.min(target);
        if let Backing::Store { store, key } = &self.backing {
            store.truncate(key, target)?;
        }
        Ok(target)
    }
}
