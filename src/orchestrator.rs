//! Orchestrator for a complete split run
//!
//! For every reference of `origin` selected by the `origins` patterns (and the
//! optional whitelist), and for every configured split:
//!
//! 1. Look the pair up in the idempotency cache
//! 2. On a miss or a stale entry, split the reference through a temporary
//!    reference and record the result
//! 3. Queue the publication of the result to each target of the split
//!
//! Publications run concurrently on the target remotes' pools. The registry
//! is always flushed before returning, even when the walk failed, so no push
//! is left running behind the caller's back.

use log::{info, warn};
use regex::Regex;

use crate::cache::{cache_key, IdempotencyCache};
use crate::config::SplitConfig;
use crate::error::{Error, Result};
use crate::reference::{ObjectId, Reference};
use crate::splitter::{Prefix, ReferenceSplitter};
use crate::workspace::{WorkingSpace, CACHE_REMOTE, ORIGIN_REMOTE};

const TEMPORARY_ROOT: &str = "refs/gitsplit-tmp";

/// Name of the short-lived reference a split runs against.
pub fn temporary_reference(reference_name: &str, split: &SplitConfig) -> String {
    format!("{}/{}", TEMPORARY_ROOT, cache_key(reference_name, split))
}

/// Drives the split of every selected reference.
pub struct SplitOrchestrator<'a> {
    workspace: &'a WorkingSpace,
    splitter: &'a dyn ReferenceSplitter,
    origins: Vec<Regex>,
}

impl<'a> SplitOrchestrator<'a> {
    pub fn new(workspace: &'a WorkingSpace, splitter: &'a dyn ReferenceSplitter) -> Result<Self> {
        let origins = workspace.config().origin_patterns()?;
        Ok(Self {
            workspace,
            splitter,
            origins,
        })
    }

    /// Split and publish every selected reference.
    ///
    /// An empty `whitelist` selects every reference matching the origins
    /// patterns. The first error of the walk wins over publication errors.
    pub fn split(&self, whitelist: &[String]) -> Result<()> {
        let walked = self.split_references(whitelist);
        let flushed = self.workspace.remotes().flush();
        walked?;
        flushed
    }

    /// Whether `reference` takes part in the run.
    pub fn is_selected(&self, reference: &Reference, whitelist: &[String]) -> bool {
        if reference.alias.is_empty() {
            return false;
        }
        if !self.origins.iter().any(|origin| origin.is_match(&reference.alias)) {
            return false;
        }
        if !whitelist.is_empty() && !whitelist.contains(&reference.alias) {
            info!("References {} skipped", reference.alias);
            return false;
        }
        true
    }

    fn split_references(&self, whitelist: &[String]) -> Result<()> {
        let remotes = self.workspace.remotes();
        let references = remotes
            .get(ORIGIN_REMOTE)?
            .references()
            .map_err(|e| Error::Fetch {
                remote: ORIGIN_REMOTE.to_string(),
                message: format!("Fail to read source references: {}", e),
            })?;
        let cache = IdempotencyCache::new(remotes.get(CACHE_REMOTE)?);

        for reference in references
            .iter()
            .filter(|reference| self.is_selected(reference, whitelist))
        {
            for split in &self.workspace.config().splits {
                self.split_reference(&cache, reference, split)?;
            }
        }
        Ok(())
    }

    fn split_reference(
        &self,
        cache: &IdempotencyCache<'_>,
        reference: &Reference,
        split: &SplitConfig,
    ) -> Result<()> {
        let mut entry = cache.get_item(&reference.full_name, split)?;
        let fresh = match entry.target_id() {
            Some(target_id) if entry.is_fresh(reference) => Some(target_id.clone()),
            _ => None,
        };

        let target_id = match fresh {
            Some(target_id) => {
                info!("Already split {} for {}", reference.alias, split.describe());
                target_id
            }
            None => {
                warn!("Splitting {} for {}", reference.alias, split.describe());
                let target_id = self.run_splitter(reference, split)?;
                entry.set(reference.id.clone(), target_id.clone());
                cache.save_item(&entry)?;
                target_id
            }
        };

        let remotes = self.workspace.remotes();
        for target in &split.targets {
            remotes.get(target)?.push(reference, &target_id);
        }
        Ok(())
    }

    fn run_splitter(&self, reference: &Reference, split: &SplitConfig) -> Result<ObjectId> {
        let split_error = |message: String| Error::Split {
            reference: reference.alias.clone(),
            prefixes: split.describe(),
            message,
        };

        let git = self.workspace.git();
        let temporary = temporary_reference(&reference.full_name, split);
        git.update_reference(&temporary, &reference.id)
            .map_err(|e| split_error(format!("Unable to create {}: {}", temporary, e)))?;

        let result = self.splitter.split(&temporary, &Prefix::parse_all(&split.prefixes));

        if let Err(e) = git.delete_reference(&temporary) {
            warn!("Unable to remove temporary reference {}: {}", temporary, e);
        }

        result.map_err(|e| split_error(e.to_string()))
    }
}
