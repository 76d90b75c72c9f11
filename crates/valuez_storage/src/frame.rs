//! Log frame format.
//!
//! ```text
//! | magic (4) | version u16 | payload len u32 | payload | crc32 (4) |
//! ```
//!
//! The CRC covers header and payload. The payload is an op count `u32`
//! followed by each op as a tag byte and length-prefixed fields.

use crate::batch::{Batch, BatchOp};
use crate::error::{StorageError, StorageResult};

/// Magic bytes opening every frame.
pub const FRAME_MAGIC: [u8; 4] = *b"VZLG";

/// Current frame format version.
pub const FRAME_VERSION: u16 = 1;

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 10;

/// Size of the trailing checksum in bytes.
pub const CRC_SIZE: usize = 4;

const TAG_CREATE_BUCKET: u8 = 1;
const TAG_DROP_BUCKET: u8 = 2;
const TAG_PUT: u8 = 3;
const TAG_DELETE: u8 = 4;

/// Result of reading one frame from a byte buffer.
#[derive(Debug)]
pub(crate) enum FrameRead {
    /// A valid frame of `len` bytes.
    Complete { batch: Batch, len: usize },
    /// The buffer ends before the frame does.
    Incomplete,
    /// The bytes at this position are not a valid frame.
    Invalid(String),
}

/// Encodes a batch as one frame.
pub(crate) fn encode_frame(batch: &Batch) -> StorageResult<Vec<u8>> {
    let payload = encode_payload(batch)?;
    let payload_len = u32::try_from(payload.len())
        .map_err(|_| StorageError::corrupted("batch too large for one frame"))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    frame.extend_from_slice(&FRAME_MAGIC);
    frame.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    frame.extend_from_slice(&payload_len.to_le_bytes());
    frame.extend_from_slice(&payload);
    let crc = crc32fast::hash(&frame);
    frame.extend_from_slice(&crc.to_le_bytes());
    Ok(frame)
}

/// Reads the frame starting at the beginning of `buf`.
pub(crate) fn read_frame(buf: &[u8]) -> FrameRead {
    if buf.len() < HEADER_SIZE {
        return FrameRead::Incomplete;
    }
    if buf[0..4] != FRAME_MAGIC {
        return FrameRead::Invalid("invalid magic".to_string());
    }
    let version = u16::from_le_bytes([buf[4], buf[5]]);
    if version > FRAME_VERSION {
        return FrameRead::Invalid(format!("unsupported version {version}"));
    }
    let payload_len = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]) as usize;
    let total = HEADER_SIZE + payload_len + CRC_SIZE;
    if buf.len() < total {
        return FrameRead::Incomplete;
    }

    let body_end = HEADER_SIZE + payload_len;
    let stored_crc = u32::from_le_bytes([
        buf[body_end],
        buf[body_end + 1],
        buf[body_end + 2],
        buf[body_end + 3],
    ]);
    let computed_crc = crc32fast::hash(&buf[..body_end]);
    if stored_crc != computed_crc {
        return FrameRead::Invalid(format!(
            "checksum mismatch: expected {stored_crc:#010x}, got {computed_crc:#010x}"
        ));
    }

    match decode_payload(&buf[HEADER_SIZE..body_end]) {
        Ok(batch) => FrameRead::Complete { batch, len: total },
        Err(e) => FrameRead::Invalid(e.to_string()),
    }
}

/// Summary of a pass over a whole log.
#[derive(Debug, Default)]
pub(crate) struct LogScan {
    /// Batches of every valid frame, in order.
    pub batches: Vec<Batch>,
    /// Length of the valid prefix.
    pub valid_len: u64,
    /// Description of the first invalid frame, if any.
    pub error: Option<String>,
    /// True if valid frames follow the first invalid one.
    pub data_after_error: bool,
}

/// Reads frames until the first incomplete or invalid one.
pub(crate) fn scan_log(bytes: &[u8]) -> LogScan {
    let mut scan = LogScan::default();
    let mut pos = 0usize;

    while pos < bytes.len() {
        match read_frame(&bytes[pos..]) {
            FrameRead::Complete { batch, len } => {
                scan.batches.push(batch);
                pos += len;
            }
            FrameRead::Incomplete => {
                // A damaged length can make a mid-log frame look unfinished.
                scan.error = Some(format!("incomplete frame at offset {pos}"));
                scan.data_after_error = valid_frame_after(bytes, pos + 1);
                break;
            }
            FrameRead::Invalid(reason) => {
                scan.error = Some(format!("{reason} at offset {pos}"));
                scan.data_after_error = valid_frame_after(bytes, pos + 1);
                break;
            }
        }
    }

    scan.valid_len = pos as u64;
    scan
}

fn valid_frame_after(bytes: &[u8], from: usize) -> bool {
    (from..bytes.len().saturating_sub(HEADER_SIZE - 1)).any(|start| {
        bytes[start..].starts_with(&FRAME_MAGIC)
            && matches!(read_frame(&bytes[start..]), FrameRead::Complete { .. })
    })
}

fn encode_payload(batch: &Batch) -> StorageResult<Vec<u8>> {
    let mut buf = Vec::new();
    let count = u32::try_from(batch.len())
        .map_err(|_| StorageError::corrupted("too many operations in batch"))?;
    buf.extend_from_slice(&count.to_le_bytes());

    for op in batch.ops() {
        match op {
            BatchOp::CreateBucket { name } => {
                buf.push(TAG_CREATE_BUCKET);
                write_field(&mut buf, name.as_bytes())?;
            }
            BatchOp::DropBucket { name } => {
                buf.push(TAG_DROP_BUCKET);
                write_field(&mut buf, name.as_bytes())?;
            }
            BatchOp::Put { bucket, key, value } => {
                buf.push(TAG_PUT);
                write_field(&mut buf, bucket.as_bytes())?;
                write_field(&mut buf, key)?;
                write_field(&mut buf, value)?;
            }
            BatchOp::Delete { bucket, key } => {
                buf.push(TAG_DELETE);
                write_field(&mut buf, bucket.as_bytes())?;
                write_field(&mut buf, key)?;
            }
        }
    }
    Ok(buf)
}

fn write_field(buf: &mut Vec<u8>, bytes: &[u8]) -> StorageResult<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| StorageError::corrupted("field exceeds u32 length"))?;
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(bytes);
    Ok(())
}

fn decode_payload(payload: &[u8]) -> StorageResult<Batch> {
    let mut cursor = 0usize;

    let read_u32 = |cursor: &mut usize| -> StorageResult<u32> {
        if *cursor + 4 > payload.len() {
            return Err(StorageError::corrupted("unexpected end of payload"));
        }
        let bytes: [u8; 4] = payload[*cursor..*cursor + 4]
            .try_into()
            .map_err(|_| StorageError::corrupted("invalid u32"))?;
        *cursor += 4;
        Ok(u32::from_le_bytes(bytes))
    };

    let read_field = |cursor: &mut usize| -> StorageResult<Vec<u8>> {
        let len = read_u32(cursor)? as usize;
        if *cursor + len > payload.len() {
            return Err(StorageError::corrupted("unexpected end of field"));
        }
        let bytes = payload[*cursor..*cursor + len].to_vec();
        *cursor += len;
        Ok(bytes)
    };

    let read_name = |cursor: &mut usize| -> StorageResult<String> {
        String::from_utf8(read_field(cursor)?)
            .map_err(|_| StorageError::corrupted("bucket name is not UTF-8"))
    };

    let count = read_u32(&mut cursor)?;
    let mut ops = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let Some(&tag) = payload.get(cursor) else {
            return Err(StorageError::corrupted("unexpected end of payload"));
        };
        cursor += 1;
        let op = match tag {
            TAG_CREATE_BUCKET => BatchOp::CreateBucket {
                name: read_name(&mut cursor)?,
            },
            TAG_DROP_BUCKET => BatchOp::DropBucket {
                name: read_name(&mut cursor)?,
            },
            TAG_PUT => BatchOp::Put {
                bucket: read_name(&mut cursor)?,
                key: read_field(&mut cursor)?,
                value: read_field(&mut cursor)?,
            },
            TAG_DELETE => BatchOp::Delete {
                bucket: read_name(&mut cursor)?,
                key: read_field(&mut cursor)?,
            },
            other => {
                return Err(StorageError::corrupted(format!("unknown op tag {other}")));
            }
        };
        ops.push(op);
    }

    if cursor != payload.len() {
        return Err(StorageError::corrupted(format!(
            "trailing bytes in frame payload: expected {} bytes, got {}",
            cursor,
            payload.len()
        )));
    }
    Ok(Batch::from_ops(ops))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Batch {
        let mut batch = Batch::new();
        batch
            .create_bucket("people")
            .put("people", b"101".to_vec(), b"ada".to_vec())
            .delete("people", b"100".to_vec())
            .drop_bucket("old");
        batch
    }

    #[test]
    fn frame_layout() {
        let frame = encode_frame(&sample()).unwrap();
        assert_eq!(&frame[0..4], b"VZLG");
        assert_eq!(u16::from_le_bytes([frame[4], frame[5]]), FRAME_VERSION);
        let payload_len = u32::from_le_bytes([frame[6], frame[7], frame[8], frame[9]]) as usize;
        assert_eq!(frame.len(), HEADER_SIZE + payload_len + CRC_SIZE);
    }

    #[test]
    fn frame_decodes_to_same_batch() {
        let frame = encode_frame(&sample()).unwrap();
        match read_frame(&frame) {
            FrameRead::Complete { batch, len } => {
                assert_eq!(batch, sample());
                assert_eq!(len, frame.len());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_frame_is_incomplete() {
        let frame = encode_frame(&sample()).unwrap();
        assert!(matches!(read_frame(&frame[..5]), FrameRead::Incomplete));
        assert!(matches!(
            read_frame(&frame[..frame.len() - 1]),
            FrameRead::Incomplete
        ));
    }

    #[test]
    fn flipped_bit_is_invalid() {
        let mut frame = encode_frame(&sample()).unwrap();
        frame[HEADER_SIZE + 2] ^= 0x01;
        assert!(matches!(read_frame(&frame), FrameRead::Invalid(_)));
    }

    #[test]
    fn newer_version_is_invalid() {
        let mut frame = encode_frame(&sample()).unwrap();
        frame[4] = 9;
        assert!(matches!(read_frame(&frame), FrameRead::Invalid(ref m) if m.contains("version")));
    }

    #[test]
    fn scan_stops_at_torn_tail() {
        let mut log = encode_frame(&sample()).unwrap();
        let first = log.len();
        let second = encode_frame(&sample()).unwrap();
        log.extend_from_slice(&second[..second.len() / 2]);

        let scan = scan_log(&log);
        assert_eq!(scan.batches.len(), 1);
        assert_eq!(scan.valid_len, first as u64);
        assert!(scan.error.is_some());
        assert!(!scan.data_after_error);
    }

    #[test]
    fn scan_detects_valid_data_after_corruption() {
        let frame = encode_frame(&sample()).unwrap();
        let mut log = frame.clone();
        log.extend_from_slice(&frame);
        log.extend_from_slice(&frame);
        // corrupt the middle frame's checksum
        let crc_pos = 2 * frame.len() - 1;
        log[crc_pos] ^= 0xff;

        let scan = scan_log(&log);
        assert_eq!(scan.batches.len(), 1);
        assert!(scan.data_after_error);
    }

    #[test]
    fn damaged_length_before_valid_frames_is_not_a_torn_tail() {
        let frame = encode_frame(&sample()).unwrap();
        let mut log = frame.clone();
        log.extend_from_slice(&frame);
        log.extend_from_slice(&frame);
        // stretch the middle frame's payload length past the end of the log
        log[frame.len() + 9] = 0x7f;

        let scan = scan_log(&log);
        assert_eq!(scan.batches.len(), 1);
        assert_eq!(scan.valid_len, frame.len() as u64);
        assert!(scan.data_after_error);
    }

    #[test]
    fn empty_log_scans_clean() {
        let scan = scan_log(&[]);
        assert!(scan.batches.is_empty());
        assert_eq!(scan.valid_len, 0);
        assert!(scan.error.is_none());
    }
}
