//! # RocksDB Case Store
//!
//! Persistent `CaseRepository` behind the `rocksdb` feature.
//!
//! ## Column Families
//!
//! - `cases` - case id → JSON document
//! - `case_index` - secondary keys for owner, status and village lookups
//!
//! Index keys are `<kind>:<value>:<case id>` with an empty value. A case and
//! its index entries are always written in one `WriteBatch`.

use crate::domain::Case;
use crate::ports::{CaseQuery, CaseRepository, StoreError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, Direction, IteratorMode, Options, WriteBatch, DB};
use shared_types::CaseId;
use std::collections::BTreeSet;

pub const CF_CASES: &str = "cases";
pub const CF_CASE_INDEX: &str = "case_index";

pub const COLUMN_FAMILIES: &[&str] = &[CF_CASES, CF_CASE_INDEX];

#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Path to the database directory
    pub path: String,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Enable fsync after each write (default: true)
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            path: "./data/cases".to_string(),
            block_cache_size: 64 * 1024 * 1024,
            sync_writes: true,
        }
    }
}

impl RocksDbConfig {
    /// Small cache, no fsync.
    pub fn for_testing(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 4 * 1024 * 1024,
            sync_writes: false,
        }
    }
}

pub struct RocksDbCaseStore {
    db: DB,
    config: RocksDbConfig,
    /// Serialises read-check-write sequences so CAS is exact.
    write_lock: Mutex<()>,
}

impl RocksDbCaseStore {
    pub fn open(config: RocksDbConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Snappy);

        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_block_cache(&rocksdb::Cache::new_lru_cache(config.block_cache_size));
        opts.set_block_based_table_factory(&block_opts);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let db = DB::open_cf_descriptors(&opts, &config.path, cf_descriptors)
            .map_err(|e| backend("open", e))?;

        Ok(Self {
            db,
            config,
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily, StoreError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Backend(format!("missing column family {name}")))
    }

    fn read(&self, case_id: &CaseId) -> Result<Option<Case>, StoreError> {
        let cf = self.cf(CF_CASES)?;
        let Some(bytes) = self
            .db
            .get_cf(cf, case_id.as_str())
            .map_err(|e| backend("get", e))?
        else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StoreError::Backend(format!("corrupt case {case_id}: {e}")))
    }

    fn write(&self, batch: WriteBatch) -> Result<(), StoreError> {
        let mut write_opts = rocksdb::WriteOptions::default();
        write_opts.set_sync(self.config.sync_writes);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| backend("batch write", e))
    }

    /// Puts `case` and replaces the index entries of `previous`.
    fn stage(&self, batch: &mut WriteBatch, case: &Case, previous: Option<&Case>) -> Result<(), StoreError> {
        let cases = self.cf(CF_CASES)?;
        let index = self.cf(CF_CASE_INDEX)?;

        let json = serde_json::to_vec(case)
            .map_err(|e| StoreError::Backend(format!("serialize {}: {e}", case.case_id)))?;
        batch.put_cf(cases, case.case_id.as_str(), json);

        if let Some(previous) = previous {
            for key in index_keys(previous) {
                batch.delete_cf(index, key);
            }
        }
        for key in index_keys(case) {
            batch.put_cf(index, key, b"");
        }
        Ok(())
    }

    /// Case ids under one index prefix.
    fn scan_index(&self, prefix: &str) -> Result<BTreeSet<String>, StoreError> {
        let index = self.cf(CF_CASE_INDEX)?;
        let mut ids = BTreeSet::new();
        let iter = self
            .db
            .iterator_cf(index, IteratorMode::From(prefix.as_bytes(), Direction::Forward));
        for item in iter {
            let (key, _) = item.map_err(|e| backend("scan", e))?;
            let Some(rest) = key.strip_prefix(prefix.as_bytes()) else {
                break;
            };
            ids.insert(String::from_utf8_lossy(rest).into_owned());
        }
        Ok(ids)
    }

    fn all_ids(&self) -> Result<BTreeSet<String>, StoreError> {
        let cases = self.cf(CF_CASES)?;
        let mut ids = BTreeSet::new();
        for item in self.db.iterator_cf(cases, IteratorMode::Start) {
            let (key, _) = item.map_err(|e| backend("scan", e))?;
            ids.insert(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(ids)
    }

    /// Narrows candidates with the most selective index the query allows.
    fn candidates(&self, query: &CaseQuery) -> Result<BTreeSet<String>, StoreError> {
        if let Some(owner) = query.owner {
            return self.scan_index(&format!("owner:{owner}:"));
        }
        if let Some(village) = &query.village {
            return self.scan_index(&format!("village:{}:", village.trim().to_lowercase()));
        }
        if !query.statuses.is_empty() {
            let mut ids = BTreeSet::new();
            for status in &query.statuses {
                ids.extend(self.scan_index(&format!("status:{}:", status.as_str()))?);
            }
            return Ok(ids);
        }
        self.all_ids()
    }
}

fn index_keys(case: &Case) -> Vec<String> {
    let id = case.case_id.as_str();
    let mut keys = vec![
        format!("owner:{}:{id}", case.owner_id),
        format!("status:{}:{id}", case.status.as_str()),
    ];
    if let Some(village) = case.family_data.village_key() {
        keys.push(format!("village:{village}:{id}"));
    }
    keys
}

fn backend(op: &str, e: rocksdb::Error) -> StoreError {
    StoreError::Backend(format!("RocksDB {op} failed: {e}"))
}

#[async_trait]
impl CaseRepository for RocksDbCaseStore {
    async fn insert(&self, mut case: Case) -> Result<Case, StoreError> {
        let _guard = self.write_lock.lock();
        if self.read(&case.case_id)?.is_some() {
            return Err(StoreError::Duplicate(case.case_id));
        }
        case.version = 1;
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, &case, None)?;
        self.write(batch)?;
        Ok(case)
    }

    async fn load(&self, case_id: &CaseId) -> Result<Option<Case>, StoreError> {
        self.read(case_id)
    }

    async fn save(&self, mut case: Case, expected_version: u64) -> Result<Case, StoreError> {
        let _guard = self.write_lock.lock();
        let Some(stored) = self.read(&case.case_id)? else {
            return Err(StoreError::NotFound(case.case_id));
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                case_id: case.case_id,
                expected: expected_version,
                found: stored.version,
            });
        }
        case.version = expected_version + 1;
        let mut batch = WriteBatch::default();
        self.stage(&mut batch, &case, Some(&stored))?;
        self.write(batch)?;
        Ok(case)
    }

    async fn delete(&self, case_id: &CaseId, expected_version: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock();
        let Some(stored) = self.read(case_id)? else {
            return Err(StoreError::NotFound(case_id.clone()));
        };
        if stored.version != expected_version {
            return Err(StoreError::Conflict {
                case_id: case_id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }
        let mut batch = WriteBatch::default();
        batch.delete_cf(self.cf(CF_CASES)?, case_id.as_str());
        let index = self.cf(CF_CASE_INDEX)?;
        for key in index_keys(&stored) {
            batch.delete_cf(index, key);
        }
        self.write(batch)
    }

    async fn find(&self, query: &CaseQuery) -> Result<Vec<Case>, StoreError> {
        let mut found = Vec::new();
        for raw in self.candidates(query)? {
            let Ok(case_id) = CaseId::parse(&raw) else {
                continue;
            };
            if let Some(case) = self.read(&case_id)? {
                if query.matches(&case) {
                    found.push(case);
                }
            }
        }
        Ok(found)
    }
}
