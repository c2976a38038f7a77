//! Test doubles shared by the unit tests.
//!
//! `InMemoryGit` models one working repository: its remote endpoints, its
//! local references and, per remote URL, the references that exist on the
//! other side. Fetch and push move references between the two the way the
//! refspecs say, and every network operation is recorded.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::hash::hash;
use crate::reference::ObjectId;
use crate::repository::GitOperations;
use crate::splitter::{Prefix, ReferenceSplitter};

/// Object id made of one repeated byte.
pub fn oid(byte: u8) -> ObjectId {
    ObjectId::parse(&format!("{:02x}", byte).repeat(20)).unwrap()
}

fn command_error(command: &str, stderr: &str) -> Error {
    Error::GitCommand {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}

fn split_refspec(refspec: &str) -> (&str, &str) {
    let refspec = refspec.strip_prefix('+').unwrap_or(refspec);
    refspec.split_once(':').unwrap_or((refspec, refspec))
}

#[derive(Default)]
struct Store {
    remotes: BTreeMap<String, String>,
    local: BTreeMap<String, ObjectId>,
    upstream: HashMap<String, BTreeMap<String, ObjectId>>,
    failing_fetches: HashSet<String>,
    failing_pushes: HashSet<String>,
    failing_listings: bool,
    fetch_attempts: Vec<String>,
    fetch_calls: Vec<String>,
    push_calls: Vec<(String, String)>,
}

impl Store {
    fn url(&self, remote_id: &str) -> Result<String> {
        self.remotes
            .get(remote_id)
            .cloned()
            .ok_or_else(|| command_error("remote", &format!("'{}' does not appear to be a git repository", remote_id)))
    }
}

pub struct InMemoryGit {
    git_dir: PathBuf,
    store: Mutex<Store>,
}

impl InMemoryGit {
    pub fn new() -> Self {
        Self {
            git_dir: PathBuf::from("/nonexistent/work.git"),
            store: Mutex::new(Store::default()),
        }
    }

    pub fn set_upstream(&self, url: &str, name: &str, id: ObjectId) {
        let mut store = self.store.lock().unwrap();
        store
            .upstream
            .entry(url.to_string())
            .or_default()
            .insert(name.to_string(), id);
    }

    pub fn remove_upstream(&self, url: &str, name: &str) {
        let mut store = self.store.lock().unwrap();
        if let Some(refs) = store.upstream.get_mut(url) {
            refs.remove(name);
        }
    }

    pub fn upstream(&self, url: &str, name: &str) -> Option<ObjectId> {
        let store = self.store.lock().unwrap();
        store.upstream.get(url).and_then(|refs| refs.get(name)).cloned()
    }

    pub fn remote_url(&self, id: &str) -> Option<String> {
        self.store.lock().unwrap().remotes.get(id).cloned()
    }

    pub fn local_reference(&self, name: &str) -> Option<ObjectId> {
        self.store.lock().unwrap().local.get(name).cloned()
    }

    pub fn local_references(&self) -> Vec<String> {
        self.store.lock().unwrap().local.keys().cloned().collect()
    }

    pub fn fail_fetches_from(&self, url: &str) {
        self.store.lock().unwrap().failing_fetches.insert(url.to_string());
    }

    pub fn fail_listings(&self) {
        self.store.lock().unwrap().failing_listings = true;
    }

    pub fn fail_pushes_to(&self, url: &str) {
        self.store.lock().unwrap().failing_pushes.insert(url.to_string());
    }

    /// Remote ids of every fetch issued, failed ones included.
    pub fn fetch_attempts(&self) -> Vec<String> {
        self.store.lock().unwrap().fetch_attempts.clone()
    }

    /// Remote ids of the fetches that went through.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.store.lock().unwrap().fetch_calls.clone()
    }

    /// `(remote id, refspec)` of the pushes that went through.
    pub fn push_calls(&self) -> Vec<(String, String)> {
        self.store.lock().unwrap().push_calls.clone()
    }

    pub fn push_count(&self) -> usize {
        self.store.lock().unwrap().push_calls.len()
    }
}

impl GitOperations for InMemoryGit {
    fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn list_remotes(&self) -> Result<Vec<String>> {
        Ok(self.store.lock().unwrap().remotes.keys().cloned().collect())
    }

    fn create_remote(&self, id: &str, url: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        if store.remotes.contains_key(id) {
            return Err(command_error("remote add", &format!("remote {} already exists", id)));
        }
        store.remotes.insert(id.to_string(), url.to_string());
        Ok(())
    }

    fn set_remote_url(&self, id: &str, url: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        match store.remotes.get_mut(id) {
            Some(current) => {
                *current = url.to_string();
                Ok(())
            }
            None => Err(command_error("remote set-url", &format!("No such remote '{}'", id))),
        }
    }

    fn delete_remote(&self, id: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store
            .remotes
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| command_error("remote remove", &format!("No such remote: '{}'", id)))
    }

    fn fetch(&self, remote_id: &str, refspecs: &[String]) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let url = store.url(remote_id)?;
        store.fetch_attempts.push(remote_id.to_string());
        if store.failing_fetches.contains(&url) {
            return Err(command_error("fetch", "fatal: unable to access repository"));
        }

        let upstream = store.upstream.get(&url).cloned().unwrap_or_default();
        for refspec in refspecs {
            let (src, dst) = split_refspec(refspec);
            let src = src.trim_end_matches('*');
            let dst = dst.trim_end_matches('*');

            store.local.retain(|name, _| !name.starts_with(dst));
            for (name, id) in &upstream {
                if let Some(rest) = name.strip_prefix(src) {
                    store.local.insert(format!("{}{}", dst, rest), id.clone());
                }
            }
        }

        store.fetch_calls.push(remote_id.to_string());
        Ok(())
    }

    fn push(&self, remote_id: &str, refspecs: &[String]) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let url = store.url(remote_id)?;
        if store.failing_pushes.contains(&url) {
            return Err(command_error("push", "! [remote rejected] (pre-receive hook declined)"));
        }

        for refspec in refspecs {
            let (src, dst) = split_refspec(refspec);
            let mut updates = Vec::new();

            if let Some(src_prefix) = src.strip_suffix('*') {
                let dst_prefix = dst.trim_end_matches('*');
                for (name, id) in &store.local {
                    if let Some(rest) = name.strip_prefix(src_prefix) {
                        updates.push((format!("{}{}", dst_prefix, rest), id.clone()));
                    }
                }
            } else if let Ok(id) = ObjectId::parse(src) {
                updates.push((dst.to_string(), id));
            } else {
                let id = store
                    .local
                    .get(src)
                    .cloned()
                    .ok_or_else(|| command_error("push", &format!("src refspec {} does not match any", src)))?;
                updates.push((dst.to_string(), id));
            }

            store.upstream.entry(url.clone()).or_default().extend(updates);
            store.push_calls.push((remote_id.to_string(), refspec.clone()));
        }

        Ok(())
    }

    fn push_mirror(&self, remote_id: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let url = store.url(remote_id)?;
        if store.failing_pushes.contains(&url) {
            return Err(command_error("push --mirror", "! [remote rejected]"));
        }

        let mirror = store.local.clone();
        store.upstream.insert(url, mirror);
        store.push_calls.push((remote_id.to_string(), "--mirror".to_string()));
        Ok(())
    }

    fn list_references(&self, prefix: &str) -> Result<String> {
        let store = self.store.lock().unwrap();
        if store.failing_listings {
            return Err(command_error("for-each-ref", "fatal: bad object"));
        }
        let prefix = format!("{}/", prefix);
        Ok(store
            .local
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(name, id)| format!("{}\t{}\n", id, name))
            .collect())
    }

    fn update_reference(&self, name: &str, id: &ObjectId) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store.local.insert(name.to_string(), id.clone());
        Ok(())
    }

    fn delete_reference(&self, name: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        store.local.remove(name);
        Ok(())
    }
}

/// A splitter deriving its result from the source id and the prefixes, and
/// remembering every call.
pub struct RecordingSplitter<'a> {
    git: &'a InMemoryGit,
    calls: Mutex<Vec<(String, Vec<Prefix>)>>,
    failing: bool,
}

impl<'a> RecordingSplitter<'a> {
    pub fn new(git: &'a InMemoryGit) -> Self {
        Self {
            git,
            calls: Mutex::new(Vec::new()),
            failing: false,
        }
    }

    pub fn failing(git: &'a InMemoryGit) -> Self {
        Self {
            failing: true,
            ..Self::new(git)
        }
    }

    pub fn calls(&self) -> Vec<(String, Vec<Prefix>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// The result this splitter produces for `source` split by `prefixes`.
    pub fn expected(source: &ObjectId, prefixes: &[Prefix]) -> ObjectId {
        let rules: Vec<String> = prefixes.iter().map(Prefix::to_string).collect();
        let digest = hash(&format!("{}|{}", source, rules.join("|")));
        ObjectId::parse(&digest[..40]).unwrap()
    }
}

impl ReferenceSplitter for RecordingSplitter<'_> {
    fn split(&self, reference: &str, prefixes: &[Prefix]) -> Result<ObjectId> {
        self.calls
            .lock()
            .unwrap()
            .push((reference.to_string(), prefixes.to_vec()));

        if self.failing {
            return Err(command_error("splitsh-lite", "prefix not found in history"));
        }

        let source = self
            .git
            .local_reference(reference)
            .ok_or_else(|| command_error("splitsh-lite", &format!("unknown reference {}", reference)))?;
        Ok(Self::expected(&source, prefixes))
    }
}
