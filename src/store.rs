//! Ledger trait and RocksDB implementation
//!
//! Persists enriched fee records idempotently, keyed by transaction
//! hash, with block-number and timestamp indexes for range queries.
//! Records are append-only; `insert_if_absent` is the idempotency
//! mechanism that makes re-processing a block safe.

use crate::error::IngestError;
use crate::keys::{
    decode_block_index_key, decode_time_index_key, encode_block_index_key, encode_dead_letter_key,
    encode_meta_key, encode_record_key, encode_time_index_key, META_CURSOR,
};
use crate::records::{DeadLetter, FeeRecord, LedgerTotals, RecordFilter};
use alloy_primitives::B256;
use rocksdb::{ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use std::path::Path;

/// Idempotent persistence of enriched fee records.
///
/// All failures map to `StorageUnavailable`, which callers treat as
/// retryable rather than data loss.
pub trait Ledger {
    /// Persist a record unless one with the same hash already exists.
    ///
    /// Returns false (no error) on a duplicate hash; the conflict is
    /// expected, not exceptional.
    fn insert_if_absent(&self, record: &FeeRecord) -> Result<bool, IngestError>;

    /// Fetch a record by transaction hash.
    fn get_by_hash(&self, hash: B256) -> Result<Option<FeeRecord>, IngestError>;

    /// Highest block number with at least one persisted record.
    ///
    /// Used to recover the cursor on restart.
    fn max_block_number(&self) -> Result<Option<u64>, IngestError>;

    /// Get the persisted ingestion cursor.
    fn get_cursor(&self) -> Result<Option<u64>, IngestError>;

    /// Set the ingestion cursor.
    fn set_cursor(&self, block: u64) -> Result<(), IngestError>;

    /// List records newest-first, filtered by timestamp and paginated.
    fn list(&self, filter: &RecordFilter) -> Result<Vec<FeeRecord>, IngestError>;

    /// Aggregate totals over all persisted records.
    fn totals(&self) -> Result<LedgerTotals, IngestError>;

    /// Record a transaction that exhausted its enrichment retries.
    fn put_dead_letter(&self, dead_letter: &DeadLetter) -> Result<(), IngestError>;

    /// List all dead-lettered transactions.
    fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, IngestError>;
}

// Column family names
const CF_RECORDS: &str = "records";
const CF_BLOCK_INDEX: &str = "block_index";
const CF_TIME_INDEX: &str = "time_index";
const CF_DEAD_LETTERS: &str = "dead_letters";
const CF_META: &str = "meta";

/// RocksDB-backed implementation of the ledger.
///
/// Column families:
/// - records: hash -> postcard-encoded FeeRecord
/// - block_index: (block_number, hash) -> empty, big-endian ordered
/// - time_index: (timestamp, hash) -> empty, big-endian ordered
/// - dead_letters: hash -> postcard-encoded DeadLetter
/// - meta: cursor and other single values
pub struct RocksLedger {
    db: DB,
}

fn storage_err(what: &str, e: impl std::fmt::Display) -> IngestError {
    IngestError::StorageUnavailable(format!("{}: {}", what, e))
}

impl RocksLedger {
    /// Open or create a ledger database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, IngestError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let column_families = vec![
            ColumnFamilyDescriptor::new(CF_RECORDS, Options::default()),
            ColumnFamilyDescriptor::new(CF_BLOCK_INDEX, Options::default()),
            ColumnFamilyDescriptor::new(CF_TIME_INDEX, Options::default()),
            ColumnFamilyDescriptor::new(CF_DEAD_LETTERS, Options::default()),
            ColumnFamilyDescriptor::new(CF_META, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, column_families)
            .map_err(|e| storage_err("open ledger", e))?;

        Ok(Self { db })
    }

    /// Get a column family handle by name.
    fn get_cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, IngestError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| storage_err("column family", name))
    }

    fn decode_record(bytes: &[u8]) -> Result<FeeRecord, IngestError> {
        postcard::from_bytes(bytes).map_err(|e| storage_err("decode record", e))
    }
}

impl Ledger for RocksLedger {
    fn insert_if_absent(&self, record: &FeeRecord) -> Result<bool, IngestError> {
        let records_cf = self.get_cf(CF_RECORDS)?;
        let record_key = encode_record_key(record.hash);

        let existing = self
            .db
            .get_cf(records_cf, &record_key)
            .map_err(|e| storage_err("check record", e))?;
        if existing.is_some() {
            return Ok(false);
        }

        let value =
            postcard::to_allocvec(record).map_err(|e| storage_err("encode record", e))?;

        // Record and both index entries land atomically.
        let mut batch = WriteBatch::default();
        batch.put_cf(records_cf, &record_key, &value);
        batch.put_cf(
            self.get_cf(CF_BLOCK_INDEX)?,
            encode_block_index_key(record.block_number, record.hash),
            [],
        );
        batch.put_cf(
            self.get_cf(CF_TIME_INDEX)?,
            encode_time_index_key(record.timestamp, record.hash),
            [],
        );

        self.db
            .write(batch)
            .map_err(|e| storage_err("insert record", e))?;
        Ok(true)
    }

    fn get_by_hash(&self, hash: B256) -> Result<Option<FeeRecord>, IngestError> {
        let cf = self.get_cf(CF_RECORDS)?;
        let key = encode_record_key(hash);
        match self
            .db
            .get_cf(cf, &key)
            .map_err(|e| storage_err("get record", e))?
        {
            Some(bytes) => Ok(Some(Self::decode_record(&bytes)?)),
            None => Ok(None),
        }
    }

    fn max_block_number(&self) -> Result<Option<u64>, IngestError> {
        let cf = self.get_cf(CF_BLOCK_INDEX)?;
        let mut iter = self.db.iterator_cf(cf, IteratorMode::End);
        match iter.next() {
            Some(item) => {
                let (key, _) = item.map_err(|e| storage_err("scan block index", e))?;
                let (block, _) =
                    decode_block_index_key(&key).map_err(|e| storage_err("block index key", e))?;
                Ok(Some(block))
            }
            None => Ok(None),
        }
    }

    fn get_cursor(&self) -> Result<Option<u64>, IngestError> {
        let cf = self.get_cf(CF_META)?;
        let key = encode_meta_key(META_CURSOR);
        match self
            .db
            .get_cf(cf, &key)
            .map_err(|e| storage_err("get cursor", e))?
        {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| storage_err("cursor", "must be 8 bytes"))?;
                Ok(Some(u64::from_be_bytes(bytes)))
            }
            None => Ok(None),
        }
    }

    fn set_cursor(&self, block: u64) -> Result<(), IngestError> {
        let cf = self.get_cf(CF_META)?;
        let key = encode_meta_key(META_CURSOR);
        self.db
            .put_cf(cf, &key, block.to_be_bytes())
            .map_err(|e| storage_err("set cursor", e))
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<FeeRecord>, IngestError> {
        let time_cf = self.get_cf(CF_TIME_INDEX)?;

        // Newest-first: walk the timestamp index backwards, starting
        // just past the upper bound when one is given.
        let upper_key = filter
            .to_timestamp
            .map(|to| encode_time_index_key(to, B256::repeat_byte(0xff)));
        let mode = match &upper_key {
            Some(key) => IteratorMode::From(key.as_slice(), Direction::Reverse),
            None => IteratorMode::End,
        };

        let mut out = Vec::new();
        let mut skipped = 0usize;
        let offset = filter.offset();
        let limit = filter.effective_page_size();

        for item in self.db.iterator_cf(time_cf, mode) {
            let (key, _) = item.map_err(|e| storage_err("scan time index", e))?;
            let (ts, hash) =
                decode_time_index_key(&key).map_err(|e| storage_err("time index key", e))?;

            if let Some(from) = filter.from_timestamp {
                if ts < from {
                    break; // descending scan: everything further is older
                }
            }
            if !filter.matches_timestamp(ts) {
                continue;
            }

            if skipped < offset {
                skipped += 1;
                continue;
            }
            if out.len() >= limit {
                break;
            }

            let record = self
                .get_by_hash(hash)?
                .ok_or_else(|| storage_err("time index", format!("dangling hash {:?}", hash)))?;
            out.push(record);
        }

        Ok(out)
    }

    fn totals(&self) -> Result<LedgerTotals, IngestError> {
        let cf = self.get_cf(CF_RECORDS)?;

        let mut totals = LedgerTotals {
            record_count: 0,
            total_fee_native: 0.0,
            total_fee_fiat: 0.0,
            latest_fiat_price: None,
        };
        let mut latest_ts = 0u64;

        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| storage_err("scan records", e))?;
            let record = Self::decode_record(&value)?;

            totals.record_count += 1;
            totals.total_fee_native += record.fee_native;
            totals.total_fee_fiat += record.fee_fiat;
            if record.timestamp >= latest_ts {
                latest_ts = record.timestamp;
                totals.latest_fiat_price = Some(record.fiat_price);
            }
        }

        Ok(totals)
    }

    fn put_dead_letter(&self, dead_letter: &DeadLetter) -> Result<(), IngestError> {
        let cf = self.get_cf(CF_DEAD_LETTERS)?;
        let key = encode_dead_letter_key(dead_letter.hash);
        let value =
            postcard::to_allocvec(dead_letter).map_err(|e| storage_err("encode dead letter", e))?;
        self.db
            .put_cf(cf, &key, &value)
            .map_err(|e| storage_err("put dead letter", e))
    }

    fn list_dead_letters(&self) -> Result<Vec<DeadLetter>, IngestError> {
        let cf = self.get_cf(CF_DEAD_LETTERS)?;
        let mut out = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| storage_err("scan dead letters", e))?;
            let dl =
                postcard::from_bytes(&value).map_err(|e| storage_err("decode dead letter", e))?;
            out.push(dl);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;
    use tempfile::TempDir;

    fn create_test_ledger() -> (RocksLedger, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let ledger = RocksLedger::open(temp_dir.path()).unwrap();
        (ledger, temp_dir)
    }

    fn record(hash_byte: u8, block: u64, timestamp: u64) -> FeeRecord {
        FeeRecord {
            hash: B256::repeat_byte(hash_byte),
            block_number: block,
            timestamp,
            gas_used: U256::from(21000u64),
            gas_price: U256::from(50_000_000_000u64),
            fiat_price: 2000.0,
            fee_native: 0.00105,
            fee_fiat: 2.10,
        }
    }

    #[test]
    fn test_insert_if_absent_is_idempotent() {
        let (ledger, _temp_dir) = create_test_ledger();
        let rec = record(0xaa, 100, 1000);

        assert!(ledger.insert_if_absent(&rec).unwrap());
        assert!(!ledger.insert_if_absent(&rec).unwrap());

        let totals = ledger.totals().unwrap();
        assert_eq!(totals.record_count, 1);
    }

    #[test]
    fn test_get_by_hash_roundtrip() {
        let (ledger, _temp_dir) = create_test_ledger();
        let rec = record(0xaa, 100, 1000);
        ledger.insert_if_absent(&rec).unwrap();

        let found = ledger.get_by_hash(rec.hash).unwrap().unwrap();
        assert_eq!(found, rec);
        assert!(ledger.get_by_hash(B256::repeat_byte(0xbb)).unwrap().is_none());
    }

    #[test]
    fn test_max_block_number_tracks_highest() {
        let (ledger, _temp_dir) = create_test_ledger();
        assert_eq!(ledger.max_block_number().unwrap(), None);

        ledger.insert_if_absent(&record(0x01, 100, 1000)).unwrap();
        ledger.insert_if_absent(&record(0x02, 300, 3000)).unwrap();
        ledger.insert_if_absent(&record(0x03, 200, 2000)).unwrap();

        assert_eq!(ledger.max_block_number().unwrap(), Some(300));
    }

    #[test]
    fn test_cursor_roundtrip() {
        let (ledger, _temp_dir) = create_test_ledger();
        assert_eq!(ledger.get_cursor().unwrap(), None);
        ledger.set_cursor(12345).unwrap();
        assert_eq!(ledger.get_cursor().unwrap(), Some(12345));
    }

    #[test]
    fn test_list_is_newest_first() {
        let (ledger, _temp_dir) = create_test_ledger();
        ledger.insert_if_absent(&record(0x01, 100, 1000)).unwrap();
        ledger.insert_if_absent(&record(0x02, 101, 2000)).unwrap();
        ledger.insert_if_absent(&record(0x03, 102, 3000)).unwrap();

        let rows = ledger.list(&RecordFilter::default()).unwrap();
        let timestamps: Vec<u64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![3000, 2000, 1000]);
    }

    #[test]
    fn test_list_timestamp_bounds() {
        let (ledger, _temp_dir) = create_test_ledger();
        for i in 0..5u8 {
            ledger
                .insert_if_absent(&record(i, 100 + i as u64, 1000 * (i as u64 + 1)))
                .unwrap();
        }

        let filter = RecordFilter {
            from_timestamp: Some(2000),
            to_timestamp: Some(4000),
            ..Default::default()
        };
        let rows = ledger.list(&filter).unwrap();
        let timestamps: Vec<u64> = rows.iter().map(|r| r.timestamp).collect();
        assert_eq!(timestamps, vec![4000, 3000, 2000]);
    }

    #[test]
    fn test_list_pagination() {
        let (ledger, _temp_dir) = create_test_ledger();
        for i in 0..5u8 {
            ledger
                .insert_if_absent(&record(i, 100 + i as u64, 1000 * (i as u64 + 1)))
                .unwrap();
        }

        let page1 = ledger
            .list(&RecordFilter {
                page: 1,
                page_size: 2,
                ..Default::default()
            })
            .unwrap();
        let page2 = ledger
            .list(&RecordFilter {
                page: 2,
                page_size: 2,
                ..Default::default()
            })
            .unwrap();
        let page3 = ledger
            .list(&RecordFilter {
                page: 3,
                page_size: 2,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(page1.len(), 2);
        assert_eq!(page2.len(), 2);
        assert_eq!(page3.len(), 1);
        assert_eq!(page1[0].timestamp, 5000);
        assert_eq!(page2[0].timestamp, 3000);
        assert_eq!(page3[0].timestamp, 1000);
    }

    #[test]
    fn test_totals_aggregation() {
        let (ledger, _temp_dir) = create_test_ledger();
        let mut r1 = record(0x01, 100, 1000);
        r1.fee_native = 0.001;
        r1.fee_fiat = 2.0;
        r1.fiat_price = 2000.0;
        let mut r2 = record(0x02, 101, 2000);
        r2.fee_native = 0.002;
        r2.fee_fiat = 4.2;
        r2.fiat_price = 2100.0;

        ledger.insert_if_absent(&r1).unwrap();
        ledger.insert_if_absent(&r2).unwrap();

        let totals = ledger.totals().unwrap();
        assert_eq!(totals.record_count, 2);
        assert!((totals.total_fee_native - 0.003).abs() < 1e-12);
        assert!((totals.total_fee_fiat - 6.2).abs() < 1e-9);
        // Latest price comes from the newest timestamp.
        assert_eq!(totals.latest_fiat_price, Some(2100.0));
    }

    #[test]
    fn test_empty_ledger_totals() {
        let (ledger, _temp_dir) = create_test_ledger();
        let totals = ledger.totals().unwrap();
        assert_eq!(totals.record_count, 0);
        assert_eq!(totals.total_fee_native, 0.0);
        assert_eq!(totals.latest_fiat_price, None);
    }

    #[test]
    fn test_dead_letter_roundtrip() {
        let (ledger, _temp_dir) = create_test_ledger();
        let dl = DeadLetter {
            hash: B256::repeat_byte(0xdd),
            block_number: 100,
            attempts: 3,
            reason: "quote unavailable: ETHUSDT: timeout".into(),
        };
        ledger.put_dead_letter(&dl).unwrap();

        let all = ledger.list_dead_letters().unwrap();
        assert_eq!(all, vec![dl]);
    }

    #[test]
    fn test_reopen_preserves_state() {
        let temp_dir = TempDir::new().unwrap();
        {
            let ledger = RocksLedger::open(temp_dir.path()).unwrap();
            ledger.insert_if_absent(&record(0xaa, 100, 1000)).unwrap();
            ledger.set_cursor(100).unwrap();
        }

        let ledger = RocksLedger::open(temp_dir.path()).unwrap();
        assert_eq!(ledger.get_cursor().unwrap(), Some(100));
        assert_eq!(ledger.max_block_number().unwrap(), Some(100));
        assert!(ledger.get_by_hash(B256::repeat_byte(0xaa)).unwrap().is_some());
    }
}
