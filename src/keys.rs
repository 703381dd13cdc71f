//! Key encoding and decoding utilities
//!
//! All keys use a single-byte prefix followed by binary data.
//! Block numbers and timestamps are big-endian so RocksDB iteration
//! order matches numeric order.

use alloy_primitives::B256;
use anyhow::Result;

/// Meta key id for the ingestion cursor (highest fully processed block).
pub const META_CURSOR: u8 = 0x01;

/// Encode a fee record key.
///
/// Format: byte 'T' (0x54) + tx hash (32 bytes)
/// Total length: 33 bytes
pub fn encode_record_key(hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(b'T');
    key.extend_from_slice(hash.as_slice());
    key
}

/// Encode a block index key.
///
/// Format: byte 'B' (0x42) + block_number (8 bytes, big-endian) + tx hash (32 bytes)
/// Total length: 41 bytes
pub fn encode_block_index_key(block: u64, hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(41);
    key.push(b'B');
    key.extend_from_slice(&block.to_be_bytes());
    key.extend_from_slice(hash.as_slice());
    key
}

/// Decode a block index key back to (block_number, hash).
pub fn decode_block_index_key(key: &[u8]) -> Result<(u64, B256)> {
    if key.len() != 41 || key[0] != b'B' {
        anyhow::bail!("Invalid block index key: {} bytes", key.len());
    }
    let block = u64::from_be_bytes(key[1..9].try_into()?);
    let hash = B256::from_slice(&key[9..41]);
    Ok((block, hash))
}

/// Encode a time index key.
///
/// Format: byte 'S' (0x53) + timestamp (8 bytes, big-endian) + tx hash (32 bytes)
/// Total length: 41 bytes
pub fn encode_time_index_key(timestamp: u64, hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(41);
    key.push(b'S');
    key.extend_from_slice(&timestamp.to_be_bytes());
    key.extend_from_slice(hash.as_slice());
    key
}

/// Decode a time index key back to (timestamp, hash).
pub fn decode_time_index_key(key: &[u8]) -> Result<(u64, B256)> {
    if key.len() != 41 || key[0] != b'S' {
        anyhow::bail!("Invalid time index key: {} bytes", key.len());
    }
    let timestamp = u64::from_be_bytes(key[1..9].try_into()?);
    let hash = B256::from_slice(&key[9..41]);
    Ok((timestamp, hash))
}

/// Encode a dead letter key.
///
/// Format: byte 'D' (0x44) + tx hash (32 bytes)
/// Total length: 33 bytes
pub fn encode_dead_letter_key(hash: B256) -> Vec<u8> {
    let mut key = Vec::with_capacity(33);
    key.push(b'D');
    key.extend_from_slice(hash.as_slice());
    key
}

/// Encode a meta key.
///
/// Format: byte 'M' (0x4D) + meta_id (1 byte)
/// Total length: 2 bytes
pub fn encode_meta_key(meta_id: u8) -> Vec<u8> {
    vec![b'M', meta_id]
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::b256;

    const HASH: B256 =
        b256!("00000000000000000000000000000000000000000000000000000000000000aa");

    #[test]
    fn test_record_key_encoding() {
        let key = encode_record_key(HASH);
        assert_eq!(key.len(), 33);
        assert_eq!(key[0], b'T');
        assert_eq!(&key[1..], HASH.as_slice());
    }

    #[test]
    fn test_block_index_key_roundtrip() {
        let key = encode_block_index_key(12345, HASH);
        assert_eq!(key.len(), 41);
        assert_eq!(key[0], b'B');
        let (block, hash) = decode_block_index_key(&key).unwrap();
        assert_eq!(block, 12345);
        assert_eq!(hash, HASH);
    }

    #[test]
    fn test_time_index_key_roundtrip() {
        let key = encode_time_index_key(1_700_000_000, HASH);
        assert_eq!(key.len(), 41);
        assert_eq!(key[0], b'S');
        let (ts, hash) = decode_time_index_key(&key).unwrap();
        assert_eq!(ts, 1_700_000_000);
        assert_eq!(hash, HASH);
    }

    #[test]
    fn test_index_keys_sort_numerically() {
        // Big-endian encoding keeps lexicographic order == numeric order.
        let a = encode_block_index_key(255, HASH);
        let b = encode_block_index_key(256, HASH);
        assert!(a < b);

        let a = encode_time_index_key(999, HASH);
        let b = encode_time_index_key(1000, HASH);
        assert!(a < b);
    }

    #[test]
    fn test_decode_rejects_wrong_prefix() {
        let key = encode_block_index_key(1, HASH);
        assert!(decode_time_index_key(&key).is_err());
    }

    #[test]
    fn test_meta_key_encoding() {
        let key = encode_meta_key(META_CURSOR);
        assert_eq!(key, vec![b'M', 0x01]);
    }
}
