//! # Idempotency Cache
//!
//! Remembers, for every (source reference, split configuration) pair, which
//! source commit was last split and what the split produced, so unchanged
//! references are never split twice.
//!
//! Records are stored as two references of the `cache` remote, in the same
//! object store the splits live in:
//!
//! - `source-<hash(reference)>-<hash(prefixes)>` → the split source commit
//! - `target-<hash(reference)>-<hash(prefixes)>` → the split result
//!
//! The two references are written one after the other, not atomically. A
//! crash between the writes leaves a record with a source and no target,
//! which [`CacheEntry::is_fresh`] reports as stale: the pair is simply split
//! again on the next run. This torn state is expected and self-healing.

use crate::config::SplitConfig;
use crate::error::{Error, Result};
use crate::hash::hash;
use crate::reference::{ObjectId, Reference};
use crate::remote::Remote;

/// Deterministic record key for a reference name and a split.
pub fn cache_key(reference_name: &str, split: &SplitConfig) -> String {
    format!("{}-{}", hash(reference_name), hash(&split.joined_prefixes()))
}

/// The last known split of one (reference, split configuration) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    key: String,
    source_id: Option<ObjectId>,
    target_id: Option<ObjectId>,
}

impl CacheEntry {
    pub fn empty(key: String) -> Self {
        Self {
            key,
            source_id: None,
            target_id: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn source_id(&self) -> Option<&ObjectId> {
        self.source_id.as_ref()
    }

    pub fn target_id(&self) -> Option<&ObjectId> {
        self.target_id.as_ref()
    }

    pub fn set(&mut self, source_id: ObjectId, target_id: ObjectId) {
        self.source_id = Some(source_id);
        self.target_id = Some(target_id);
    }

    /// Whether the recorded split still matches the current reference.
    pub fn is_fresh(&self, reference: &Reference) -> bool {
        match (&self.source_id, &self.target_id) {
            (Some(source_id), Some(_)) => source_id == &reference.id,
            _ => false,
        }
    }
}

/// Reads and writes cache entries through the `cache` remote.
pub struct IdempotencyCache<'a> {
    remote: &'a Remote,
}

impl<'a> IdempotencyCache<'a> {
    pub fn new(remote: &'a Remote) -> Self {
        Self { remote }
    }

    fn read(&self, key: &str, name: &str) -> Result<Option<Reference>> {
        self.remote.reference(name).map_err(|e| Error::CacheIo {
            key: key.to_string(),
            message: format!("Unable to read {}: {}", name, e),
        })
    }

    /// Look up the entry of `reference_name` split by `split`.
    ///
    /// Both ids are populated only when both records exist.
    pub fn get_item(&self, reference_name: &str, split: &SplitConfig) -> Result<CacheEntry> {
        let key = cache_key(reference_name, split);
        let mut entry = CacheEntry::empty(key.clone());

        let Some(source) = self.read(&key, &format!("source-{}", key))? else {
            return Ok(entry);
        };
        let Some(target) = self.read(&key, &format!("target-{}", key))? else {
            return Ok(entry);
        };

        entry.set(source.id, target.id);
        Ok(entry)
    }

    /// Persist an entry: source record first, then target record.
    pub fn save_item(&self, entry: &CacheEntry) -> Result<()> {
        let (Some(source_id), Some(target_id)) = (entry.source_id(), entry.target_id()) else {
            return Err(Error::CacheIo {
                key: entry.key.clone(),
                message: "Refusing to save an incomplete entry".to_string(),
            });
        };

        self.remote
            .add_reference(&format!("source-{}", entry.key), source_id)
            .map_err(|e| Error::CacheIo {
                key: entry.key.clone(),
                message: format!("Unable to create source reference targeting {}: {}", source_id, e),
            })?;
        self.remote
            .add_reference(&format!("target-{}", entry.key), target_id)
            .map_err(|e| Error::CacheIo {
                key: entry.key.clone(),
                message: format!("Unable to create target reference targeting {}: {}", target_id, e),
            })
    }
}
