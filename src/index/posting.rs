use bytes::Bytes;

use crate::compression::varint::Varint;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::DocId;
use crate::index::offsets::OffsetVector;
use crate::storage::buffer::ByteBuffer;

/// One occurrence record of a term in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct Posting {
    pub doc_id: DocId,
    pub flags: u8,
    pub field_mask: u8,
    pub total_freq: f32,
    pub offsets: OffsetVector,
}

/// Wire codec for postings. Per posting, appended in order: doc id delta
/// (varint, relative to the previous posting in the list), flags byte, field
/// mask byte, total frequency as little-endian f32, offsets length (varint),
/// offsets bytes verbatim. A posting list is a bare concatenation; readers
/// iterate until the buffer ends.
pub struct PostingCodec;

impl PostingCodec {
    pub fn encode(buf: &mut ByteBuffer, posting: &Posting, prev_doc_id: DocId) -> Result<usize> {
        let start = buf.offset();
        Varint::write_u32(buf, posting.doc_id.0.wrapping_sub(prev_doc_id.0))?;
        buf.write(&[posting.flags, posting.field_mask])?;
        buf.write(&posting.total_freq.to_le_bytes())?;
        Varint::write_u32(buf, posting.offsets.len() as u32)?;
        buf.write(posting.offsets.as_bytes())?;
        Ok(buf.offset() - start)
    }

    /// Decode the next posting. `Ok(None)` on a clean end of list; a tail
    /// cut mid-posting is a decode error.
    pub fn decode_one(buf: &mut ByteBuffer, prev_doc_id: DocId) -> Result<Option<Posting>> {
        let delta = match Varint::read_u32(buf)? {
            Some(delta) => delta,
            None => return Ok(None),
        };
        let doc_id = DocId(prev_doc_id.0.wrapping_add(delta));

        let header = buf
            .read(2)
            .ok_or_else(|| truncated("posting header"))?;
        let (flags, field_mask) = (header[0], header[1]);

        let freq_bytes = buf.read(4).ok_or_else(|| truncated("total freq"))?;
        let total_freq = f32::from_le_bytes([
            freq_bytes[0],
            freq_bytes[1],
            freq_bytes[2],
            freq_bytes[3],
        ]);

        let offsets_len = Varint::read_u32(buf)?
            .ok_or_else(|| truncated("offsets length"))? as usize;
        let offsets = buf
            .read(offsets_len)
            .ok_or_else(|| truncated("offsets"))?;

        Ok(Some(Posting {
            doc_id,
            flags,
            field_mask,
            total_freq,
            offsets: OffsetVector::from_bytes(Bytes::copy_from_slice(offsets)),
        }))
    }

    /// Walk a posting without materializing its offsets. Used by writers
    /// reopening an existing list to recover its tables.
    pub fn skip_one(buf: &mut ByteBuffer, prev_doc_id: DocId) -> Result<Option<(DocId, f32)>> {
        let delta = match Varint::read_u32(buf)? {
            Some(delta) => delta,
            None => return Ok(None),
        };
        let doc_id = DocId(prev_doc_id.0.wrapping_add(delta));

        if buf.read(2).is_none() {
            return Err(truncated("posting header"));
        }
        let freq_bytes = buf.read(4).ok_or_else(|| truncated("total freq"))?;
        let total_freq = f32::from_le_bytes([
            freq_bytes[0],
            freq_bytes[1],
            freq_bytes[2],
            freq_bytes[3],
        ]);

        let offsets_len = Varint::read_u32(buf)?
            .ok_or_else(|| truncated("offsets length"))? as usize;
        if buf.remaining() < offsets_len {
            return Err(truncated("offsets"));
        }
        buf.skip(offsets_len);

        Ok(Some((doc_id, total_freq)))
    }
}

fn truncated(what: &str) -> Error {
    Error::new(ErrorKind::Decode, format!("truncated posting: {}", what))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(doc_id: u32, field_mask: u8, total_freq: f32, positions: &[u32]) -> Posting {
        Posting {
            doc_id: DocId(doc_id),
            flags: 0,
            field_mask,
            total_freq,
            offsets: OffsetVector::encode(positions),
        }
    }

    fn encode_list(postings: &[Posting]) -> ByteBuffer {
        let mut buf = ByteBuffer::memory(64);
        let mut prev = DocId(0);
        for p in postings {
            PostingCodec::encode(&mut buf, p, prev).unwrap();
            prev = p.doc_id;
        }
        buf.truncate(0).unwrap();
        buf.seek(0);
        buf
    }

    #[test]
    fn test_round_trip_consumes_exact_tail() {
        let postings = vec![
            posting(1, 0x01, 1.0, &[1, 2]),
            posting(5, 0x03, 2.0, &[7]),
            posting(1000, 0xFF, 0.5, &[]),
        ];
        let mut buf = encode_list(&postings);

        let mut prev = DocId(0);
        for expected in &postings {
            let decoded = PostingCodec::decode_one(&mut buf, prev).unwrap().unwrap();
            assert_eq!(&decoded, expected);
            prev = decoded.doc_id;
        }
        assert!(buf.at_end());
        assert_eq!(PostingCodec::decode_one(&mut buf, prev).unwrap(), None);
    }

    #[test]
    fn test_wire_layout() {
        let postings = vec![
            Posting {
                doc_id: DocId(1),
                flags: 0,
                field_mask: 0x01,
                total_freq: 1.0,
                offsets: OffsetVector::empty(),
            },
            Posting {
                doc_id: DocId(5),
                flags: 0,
                field_mask: 0x02,
                total_freq: 2.0,
                offsets: OffsetVector::from_bytes(Bytes::from_static(&[0x01])),
            },
        ];
        let mut buf = encode_list(&postings);

        // first posting: delta 1, flags, mask, f32, zero offsets length
        let bytes = buf.read(buf.len()).unwrap().to_vec();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(bytes[1], 0x00);
        assert_eq!(bytes[2], 0x01);
        assert_eq!(&bytes[3..7], &1.0f32.to_le_bytes());
        assert_eq!(bytes[7], 0x00);
        // second posting: delta 4, then header, then one offsets byte
        assert_eq!(bytes[8], 0x04);
        assert_eq!(bytes[9], 0x00);
        assert_eq!(bytes[10], 0x02);
        assert_eq!(&bytes[11..15], &2.0f32.to_le_bytes());
        assert_eq!(bytes[15], 0x01);
        assert_eq!(bytes[16], 0x01);
        assert_eq!(bytes.len(), 17);
    }

    #[test]
    fn test_truncated_tail_is_decode_error() {
        let postings = vec![posting(3, 0x01, 1.0, &[4, 5, 6])];
        let mut full = encode_list(&postings);
        let full_bytes = full.read(full.len()).unwrap().to_vec();

        // cut anywhere after the delta byte and the decode must fail cleanly
        for cut in 1..full_bytes.len() {
            let mut buf = ByteBuffer::from_vec(full_bytes[..cut].to_vec());
            assert!(
                PostingCodec::decode_one(&mut buf, DocId(0)).is_err(),
                "cut at {} decoded",
                cut
            );
        }
    }

    #[test]
    fn test_random_lists_round_trip() {
        use rand::Rng;
        let mut rng = rand::thread_rng();

        for _ in 0..20 {
            let mut doc_id = 0u32;
            let postings: Vec<Posting> = (0..rng.gen_range(1..200))
                .map(|_| {
                    doc_id += rng.gen_range(1..50);
                    let mut position = 0u32;
                    let positions: Vec<u32> = (0..rng.gen_range(0..6))
                        .map(|_| {
                            position += rng.gen_range(1..30);
                            position
                        })
                        .collect();
                    posting(doc_id, rng.gen_range(0..=255u32) as u8 | 1, 1.5, &positions)
                })
                .collect();

            let mut buf = encode_list(&postings);
            let mut prev = DocId(0);
            for expected in &postings {
                let decoded = PostingCodec::decode_one(&mut buf, prev).unwrap().unwrap();
                assert_eq!(&decoded, expected);
                prev = decoded.doc_id;
            }
            assert!(buf.at_end());
        }
    }

    #[test]
    fn test_skip_one_matches_decode() {
        let postings = vec![posting(2, 0x01, 1.5, &[1]), posting(9, 0x02, 3.0, &[2, 8])];
        let mut buf = encode_list(&postings);

        let (d1, f1) = PostingCodec::skip_one(&mut buf, DocId(0)).unwrap().unwrap();
        assert_eq!((d1, f1), (DocId(2), 1.5));
        let (d2, f2) = PostingCodec::skip_one(&mut buf, d1).unwrap().unwrap();
        assert_eq!((d2, f2), (DocId(9), 3.0));
        assert_eq!(PostingCodec::skip_one(&mut buf, d2).unwrap(), None);
    }
}
