//! # Remotes
//!
//! A [`Remote`] is one counterpart repository of the working object store:
//! the project being split (`origin`), the idempotency cache (`cache`) or one
//! of the publish targets. Each remote has
//!
//! - an **id** derived from its alias, safe to use as a git remote name and
//!   inside reference names;
//! - a **local namespace** `refs/gitsplit/<id>/<namespace>/<alias>` mirroring
//!   the references it tracks (`heads`, `tags`, `split-flag`);
//! - a private [`WorkerPool`] running its fetch and push tasks.
//!
//! The [`RemoteRegistry`] owns every remote of a run. It also owns the lock
//! serializing mutations of the remote endpoint list; each remote receives a
//! handle to it. The second exclusion domain, reference enumeration against
//! reference writes, is a per-remote lock around the cached reference list.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};

use crate::defaults::REMOTE_CONCURRENCY;
use crate::error::{Error, Result};
use crate::hash::{hash, slugify};
use crate::pool::WorkerPool;
use crate::reference::{parse_listing, ObjectId, Reference};
use crate::repository::GitOperations;

/// Branches.
pub const HEADS: &str = "heads";
/// Tags.
pub const TAGS: &str = "tags";
/// Idempotency records.
pub const SPLIT_FLAG: &str = "split-flag";

const LOCAL_ROOT: &str = "refs/gitsplit";

/// Remote id for an alias: the alias itself when it is already a slug,
/// otherwise its slug suffixed with the alias hash.
pub fn remote_id(alias: &str) -> String {
    let slug = slugify(alias);
    if slug == alias {
        slug
    } else if slug.is_empty() {
        hash(alias)
    } else {
        format!("{}-{}", slug, hash(alias))
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| Error::LockPoisoned {
        context: context.to_string(),
    })
}

struct RemoteState {
    id: String,
    alias: String,
    url: String,
    namespaces: Vec<String>,
    git: Arc<dyn GitOperations>,
    endpoint_lock: Arc<Mutex<()>>,
    references: Mutex<Option<Vec<Reference>>>,
}

impl RemoteState {
    fn local_root(&self) -> String {
        format!("{}/{}", LOCAL_ROOT, self.id)
    }

    fn local_name(&self, full_name: &str) -> String {
        let relative = full_name.strip_prefix("refs/").unwrap_or(full_name);
        format!("{}/{}", self.local_root(), relative)
    }

    fn init(&self) -> Result<()> {
        if self.url.is_empty() {
            return Ok(());
        }

        let _guard = lock(&self.endpoint_lock, "remote endpoints")?;
        let identity_error = |e: Error| Error::RemoteIdentity {
            remote: self.alias.clone(),
            message: e.to_string(),
        };

        let remotes = self.git.list_remotes().map_err(identity_error)?;
        if remotes.iter().any(|id| id == &self.id) {
            self.git.set_remote_url(&self.id, &self.url).map_err(identity_error)
        } else {
            self.git.create_remote(&self.id, &self.url).map_err(identity_error)
        }
    }

    fn references(&self) -> Result<Vec<Reference>> {
        let mut cached = lock(&self.references, &self.alias)?;
        if let Some(references) = cached.as_ref() {
            return Ok(references.clone());
        }

        let mut references = Vec::new();
        for namespace in &self.namespaces {
            let prefix = format!("{}/{}", self.local_root(), namespace);
            let listing = self.git.list_references(&prefix)?;
            for (id, name) in parse_listing(&listing)? {
                let Some(alias) = name
                    .strip_prefix(prefix.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                else {
                    continue;
                };
                references.push(Reference {
                    alias: alias.to_string(),
                    full_name: format!("refs/{}/{}", namespace, alias),
                    id,
                });
            }
        }

        *cached = Some(references.clone());
        Ok(references)
    }

    /// Write the local mirror of `full_name` and drop the cached listing.
    fn record(&self, full_name: &str, id: &ObjectId) -> Result<()> {
        let mut cached = lock(&self.references, &self.alias)?;
        *cached = None;
        self.git.update_reference(&self.local_name(full_name), id)
    }

    fn invalidate(&self) -> Result<()> {
        *lock(&self.references, &self.alias)? = None;
        Ok(())
    }

    fn fetch(&self) -> Result<()> {
        if self.url.is_empty() {
            debug!("Remote {} has no endpoint, nothing to fetch", self.alias);
            return Ok(());
        }

        info!("Fetching from remote {}", self.alias);
        let refspecs: Vec<String> = self
            .namespaces
            .iter()
            .map(|namespace| format!("+refs/{0}/*:{1}/{0}/*", namespace, self.local_root()))
            .collect();

        let mut cached = lock(&self.references, &self.alias)?;
        *cached = None;
        self.git
            .fetch(&self.id, &refspecs)
            .map_err(|e| Error::Fetch {
                remote: self.alias.clone(),
                message: e.to_string(),
            })
    }

    fn push(&self, reference: &Reference, id: &ObjectId) -> Result<()> {
        let push_error = |message: String| Error::Push {
            remote: self.alias.clone(),
            reference: reference.alias.clone(),
            message,
        };

        let known = self
            .references()
            .map_err(|e| push_error(format!("Fail to get references: {}", e)))?;
        if let Some(current) = known.iter().find(|r| r.full_name == reference.full_name) {
            if &current.id == id {
                info!("Already pushed {} into {}", reference.alias, self.alias);
                return Ok(());
            }
            warn!("Out of date {} into {}", reference.alias, self.alias);
        }

        warn!("Pushing {} into {}", reference.alias, self.alias);
        let refspec = format!("{}:{}", id, reference.full_name);
        self.git
            .push(&self.id, &[refspec])
            .map_err(|e| push_error(e.to_string()))?;

        self.record(&reference.full_name, id)
            .map_err(|e| push_error(e.to_string()))
    }

    fn push_ref(&self, refspec: &str) -> Result<()> {
        info!("Pushing {} into {}", refspec, self.alias);
        self.git
            .push(&self.id, &[refspec.to_string()])
            .map_err(|e| Error::Push {
                remote: self.alias.clone(),
                reference: refspec.to_string(),
                message: e.to_string(),
            })?;
        self.invalidate()
    }

    fn push_mirror(&self) -> Result<()> {
        info!("Mirroring into {}", self.alias);
        self.git.push_mirror(&self.id).map_err(|e| Error::Push {
            remote: self.alias.clone(),
            reference: "--mirror".to_string(),
            message: e.to_string(),
        })?;
        self.invalidate()
    }
}

/// One named remote repository.
pub struct Remote {
    state: Arc<RemoteState>,
    pool: WorkerPool<()>,
}

impl Remote {
    fn new(
        git: Arc<dyn GitOperations>,
        endpoint_lock: Arc<Mutex<()>>,
        alias: &str,
        url: &str,
        namespaces: &[&str],
        concurrency: usize,
    ) -> Result<Self> {
        if namespaces.is_empty() {
            return Err(Error::RemoteIdentity {
                remote: alias.to_string(),
                message: "at least one reference namespace is required".to_string(),
            });
        }

        let id = remote_id(alias);
        let pool = WorkerPool::new(&id, concurrency)?;
        Ok(Self {
            state: Arc::new(RemoteState {
                id,
                alias: alias.to_string(),
                url: url.to_string(),
                namespaces: namespaces.iter().map(|ns| ns.to_string()).collect(),
                git,
                endpoint_lock,
                references: Mutex::new(None),
            }),
            pool,
        })
    }

    pub fn id(&self) -> &str {
        &self.state.id
    }

    pub fn alias(&self) -> &str {
        &self.state.alias
    }

    /// Connection URL; empty for a remote that only exists locally.
    pub fn url(&self) -> &str {
        &self.state.url
    }

    pub fn namespaces(&self) -> &[String] {
        &self.state.namespaces
    }

    /// Local reference name mirroring `full_name` (`refs/heads/main`).
    pub fn local_name(&self, full_name: &str) -> String {
        self.state.local_name(full_name)
    }

    /// Create or update the remote endpoint. Safe to call repeatedly.
    pub fn init(&self) -> Result<()> {
        self.state.init()
    }

    /// Known references of this remote, limited to its namespaces.
    pub fn references(&self) -> Result<Vec<Reference>> {
        self.state.references()
    }

    /// The known reference with the given alias, if any.
    pub fn reference(&self, alias: &str) -> Result<Option<Reference>> {
        Ok(self
            .references()?
            .into_iter()
            .find(|reference| reference.alias == alias))
    }

    /// Create or overwrite `alias` in the first namespace of this remote.
    pub fn add_reference(&self, alias: &str, id: &ObjectId) -> Result<()> {
        let full_name = format!("refs/{}/{}", self.state.namespaces[0], alias);
        self.state.record(&full_name, id)
    }

    /// Queue a fetch mirroring the upstream references locally.
    pub fn fetch(&self) {
        let state = Arc::clone(&self.state);
        self.pool.push(move || {
            state.init()?;
            state.fetch()
        });
    }

    /// Queue a publication of `id` as `reference`, skipped when the remote
    /// already has it.
    pub fn push(&self, reference: &Reference, id: &ObjectId) {
        let state = Arc::clone(&self.state);
        let reference = reference.clone();
        let id = id.clone();
        self.pool.push(move || {
            state.init()?;
            state.push(&reference, &id)
        });
    }

    /// Queue a push of a raw refspec.
    pub fn push_ref(&self, refspec: &str) {
        let state = Arc::clone(&self.state);
        let refspec = refspec.to_string();
        self.pool.push(move || {
            state.init()?;
            state.push_ref(&refspec)
        });
    }

    /// Queue a mirror push of every local reference.
    pub fn push_mirror(&self) {
        let state = Arc::clone(&self.state);
        self.pool.push(move || {
            state.init()?;
            state.push_mirror()
        });
    }

    /// Wait for the queued tasks and return the first error.
    pub fn flush(&self) -> Result<()> {
        self.pool.wait().into_result().map(|_| ())
    }
}

/// Every remote of a run, in registration order.
pub struct RemoteRegistry {
    git: Arc<dyn GitOperations>,
    endpoint_lock: Arc<Mutex<()>>,
    remotes: Vec<Remote>,
    maintenance: WorkerPool<()>,
    concurrency: usize,
}

impl RemoteRegistry {
    pub fn new(git: Arc<dyn GitOperations>) -> Result<Self> {
        Self::with_concurrency(git, REMOTE_CONCURRENCY)
    }

    pub fn with_concurrency(git: Arc<dyn GitOperations>, concurrency: usize) -> Result<Self> {
        Ok(Self {
            git,
            endpoint_lock: Arc::new(Mutex::new(())),
            remotes: Vec::new(),
            maintenance: WorkerPool::new("maintenance", 1)?,
            concurrency,
        })
    }

    /// Register a remote. An alias can only be registered once.
    pub fn add(&mut self, alias: &str, url: &str, namespaces: &[&str]) -> Result<&Remote> {
        if self.remotes.iter().any(|r| r.alias() == alias) {
            return Err(Error::RemoteIdentity {
                remote: alias.to_string(),
                message: "the remote is already declared".to_string(),
            });
        }

        let remote = Remote::new(
            Arc::clone(&self.git),
            Arc::clone(&self.endpoint_lock),
            alias,
            url,
            namespaces,
            self.concurrency,
        )?;

        self.remotes.push(remote);
        Ok(&self.remotes[self.remotes.len() - 1])
    }

    pub fn get(&self, alias: &str) -> Result<&Remote> {
        self.remotes
            .iter()
            .find(|remote| remote.alias() == alias)
            .ok_or_else(|| Error::NotFound {
                alias: alias.to_string(),
            })
    }

    pub fn remotes(&self) -> impl Iterator<Item = &Remote> {
        self.remotes.iter()
    }

    /// Queue the removal of every remote endpoint this registry does not
    /// know about. Joined by [`RemoteRegistry::flush`].
    pub fn clean(&self) {
        let known: Vec<String> = self.remotes.iter().map(|r| r.id().to_string()).collect();
        let git = Arc::clone(&self.git);
        let endpoint_lock = Arc::clone(&self.endpoint_lock);

        self.maintenance.push(move || {
            let _guard = lock(&endpoint_lock, "remote endpoints")?;
            let remotes = git.list_remotes().map_err(|e| Error::RemoteIdentity {
                remote: "*".to_string(),
                message: format!("Unable to list remotes: {}", e),
            })?;

            for id in remotes.iter().filter(|id| !known.contains(id)) {
                info!("Removing remote {}", id);
                if let Err(e) = git.delete_remote(id) {
                    warn!("Unable to remove remote {}: {}", id, e);
                }
            }
            Ok(())
        });
    }

    /// Flush every remote, then the maintenance tasks, and return the first
    /// error in registration order.
    pub fn flush(&self) -> Result<()> {
        let mut first_error = None;
        for remote in &self.remotes {
            if let Err(e) = remote.flush() {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = self.maintenance.wait().into_result() {
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
