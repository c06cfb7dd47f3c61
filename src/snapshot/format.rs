//! Snapshot file format
//!
//! ```text
//! magic    8 bytes  "AERODOC\x01"
//! record*
//!   length   u32 LE  payload length
//!   payload  JSON    one SnapshotRecord
//!   checksum u32 LE  CRC32 over length + payload
//! ```
//!
//! The last record is always `end`, carrying the number of records before
//! it. Bytes after it, a missing `end`, or any checksum mismatch make the
//! whole file unreadable.

use serde::{Deserialize, Serialize};

use super::checksum::{compute_checksum, verify_checksum};
use super::errors::{SnapshotError, SnapshotResult};
use crate::index::IndexDefinition;
use crate::value::Document;

pub const MAGIC: &[u8; 8] = b"AERODOC\x01";

const LENGTH_SIZE: usize = 4;
const CHECKSUM_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotRecord {
    Collection {
        name: String,
    },
    Index {
        collection: String,
        definition: IndexDefinition,
    },
    Document {
        collection: String,
        document: Document,
    },
    End {
        records: u64,
    },
}

/// Appends one framed record to `out`
pub fn encode_record(record: &SnapshotRecord, out: &mut Vec<u8>) -> SnapshotResult<()> {
    let payload = serde_json::to_vec(record)
        .map_err(|e| SnapshotError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    let length = u32::try_from(payload.len()).map_err(|_| {
        SnapshotError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "snapshot record exceeds 4 GiB",
        ))
    })?;

    let start = out.len();
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&payload);
    let checksum = compute_checksum(&out[start..]);
    out.extend_from_slice(&checksum.to_le_bytes());
    Ok(())
}

/// Decodes every record of a snapshot image, checking framing and the
/// `end` record. The returned list excludes `end`.
pub fn decode_records(data: &[u8]) -> SnapshotResult<Vec<SnapshotRecord>> {
    if data.len() < MAGIC.len() || &data[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::corruption(0, "missing snapshot header"));
    }

    let mut records = Vec::new();
    let mut offset = MAGIC.len();
    loop {
        if offset == data.len() {
            return Err(SnapshotError::corruption(offset, "missing end record"));
        }
        let (record, next) = decode_one(data, offset)?;
        if let SnapshotRecord::End { records: count } = record {
            if count != records.len() as u64 {
                return Err(SnapshotError::corruption(
                    offset,
                    format!("end record counts {} records, found {}", count, records.len()),
                ));
            }
            if next != data.len() {
                return Err(SnapshotError::corruption(next, "trailing bytes after end record"));
            }
            return Ok(records);
        }
        records.push(record);
        offset = next;
    }
}

fn decode_one(data: &[u8], offset: usize) -> SnapshotResult<(SnapshotRecord, usize)> {
    let header_end = offset + LENGTH_SIZE;
    let Some(length_bytes) = data.get(offset..header_end) else {
        return Err(SnapshotError::corruption(offset, "truncated record length"));
    };
    let mut length = [0u8; LENGTH_SIZE];
    length.copy_from_slice(length_bytes);
    let length = u32::from_le_bytes(length) as usize;

    let payload_end = header_end + length;
    let record_end = payload_end + CHECKSUM_SIZE;
    let Some(checksum_bytes) = data.get(payload_end..record_end) else {
        return Err(SnapshotError::corruption(offset, "truncated record"));
    };
    let mut stored = [0u8; CHECKSUM_SIZE];
    stored.copy_from_slice(checksum_bytes);
    let stored = u32::from_le_bytes(stored);

    if !verify_checksum(&data[offset..payload_end], stored) {
        return Err(SnapshotError::corruption(offset, "checksum mismatch"));
    }
    let record = serde_json::from_slice(&data[header_end..payload_end])
        .map_err(|e| SnapshotError::corruption(offset, format!("bad record payload: {}", e)))?;
    Ok((record, record_end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn image(records: &[SnapshotRecord]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        for record in records {
            encode_record(record, &mut out).unwrap();
        }
        out
    }

    fn sample() -> Vec<SnapshotRecord> {
        vec![
            SnapshotRecord::Collection {
                name: "products".into(),
            },
            SnapshotRecord::Document {
                collection: "products".into(),
                document: Document::from_json(json!({"_id": "p1", "price": 9.5})).unwrap(),
            },
            SnapshotRecord::End { records: 2 },
        ]
    }

    #[test]
    fn test_decode_valid_image() {
        let records = decode_records(&image(&sample())).unwrap();
        assert_eq!(records, sample()[..2].to_vec());
    }

    #[test]
    fn test_any_flipped_byte_is_detected() {
        let data = image(&sample());
        for i in MAGIC.len()..data.len() {
            let mut corrupted = data.clone();
            corrupted[i] ^= 0x20;
            let err = decode_records(&corrupted).unwrap_err();
            assert!(err.is_corruption(), "byte {} not detected", i);
        }
    }

    #[test]
    fn test_framing_errors() {
        let data = image(&sample());
        assert!(decode_records(&data[..data.len() - 1]).unwrap_err().is_corruption());
        assert!(decode_records(b"NOTASNAP").unwrap_err().is_corruption());

        let mut no_end = sample();
        no_end.pop();
        assert!(decode_records(&image(&no_end)).unwrap_err().is_corruption());

        let mut wrong_count = sample();
        wrong_count[2] = SnapshotRecord::End { records: 5 };
        assert!(decode_records(&image(&wrong_count)).unwrap_err().is_corruption());

        let mut trailing = data.clone();
        trailing.push(0);
        assert!(decode_records(&trailing).unwrap_err().is_corruption());
    }
}
