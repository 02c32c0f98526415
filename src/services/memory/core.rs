// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use super::backend::MemoryStats;
use crate::raw::*;
use crate::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum NodeKind {
    Dir,
    File,
}

#[derive(Clone, Debug)]
pub(super) struct Node {
    pub kind: NodeKind,
    pub len: u64,
    pub tier: AccessTier,
    pub acl: AclSpec,
}

impl Node {
    fn dir() -> Self {
        Self {
            kind: NodeKind::Dir,
            len: 0,
            tier: AccessTier::Hot,
            acl: base_acl(),
        }
    }

    fn file(len: u64, tier: AccessTier) -> Self {
        Self {
            kind: NodeKind::File,
            len,
            tier,
            acl: base_acl(),
        }
    }
}

/// The base entries every node starts with.
fn base_acl() -> AclSpec {
    let rwx = AclPermissions {
        read: true,
        write: true,
        execute: true,
    };
    let rx = AclPermissions {
        read: true,
        write: false,
        execute: true,
    };
    let r = AclPermissions {
        read: true,
        write: false,
        execute: false,
    };

    AclSpec::from_entries(vec![
        AclEntry::access(AclQualifier::User(None), rwx),
        AclEntry::access(AclQualifier::Group(None), rx),
        AclEntry::access(AclQualifier::Other, r),
    ])
}

#[derive(Clone, Debug)]
struct CopyJob {
    copy_id: String,
    polls_total: u32,
    polls_remaining: u32,
    bytes_total: u64,
    tier: AccessTier,
}

#[derive(Clone, Debug)]
struct FinishedCopy {
    copy_id: String,
    status: CopyStatus,
    completed_at: chrono::DateTime<Utc>,
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    leases: HashMap<String, String>,
    jobs: HashMap<String, CopyJob>,
    finished: HashMap<String, FinishedCopy>,
    deny: HashSet<String>,
    flaky_status: u32,
    stats: MemoryStats,
    visited: Vec<String>,
}

/// Shared state behind [`super::MemoryStore`].
///
/// Copies are simulated: a pending job completes after a configured number
/// of status checks, so tests can pin down exactly how many polls an
/// orchestration performs.
#[derive(Debug)]
pub(super) struct MemoryCore {
    state: Mutex<State>,

    batch_size: usize,
    copy_polls: u32,
    fail_copies: bool,
}

impl MemoryCore {
    pub fn new(
        batch_size: usize,
        copy_polls: u32,
        fail_copies: bool,
        flaky_status: u32,
        deny: HashSet<String>,
    ) -> Self {
        Self {
            state: Mutex::new(State {
                flaky_status,
                deny,
                ..State::default()
            }),
            batch_size,
            copy_polls,
            fail_copies,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // ------------------------------------------------------------------
    // scaffolding used by tests and local development
    // ------------------------------------------------------------------

    pub fn create_dir(&self, path: &str) {
        let path = normalize_path(path);
        let mut st = self.lock();
        ensure_parents(&mut st.nodes, &path);
        st.nodes.entry(path).or_insert_with(Node::dir);
    }

    pub fn create_file(&self, path: &str, len: u64) {
        let path = normalize_path(path);
        let mut st = self.lock();
        ensure_parents(&mut st.nodes, &path);
        st.nodes.insert(path, Node::file(len, AccessTier::Hot));
    }

    pub fn set_tier(&self, path: &str, tier: AccessTier) {
        let path = normalize_path(path);
        if let Some(node) = self.lock().nodes.get_mut(&path) {
            node.tier = tier;
        }
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lock().nodes.contains_key(&normalize_path(path))
    }

    pub fn tier_of(&self, path: &str) -> Option<AccessTier> {
        self.lock().nodes.get(&normalize_path(path)).map(|n| n.tier)
    }

    pub fn acl_of(&self, path: &str) -> Option<AclSpec> {
        self.lock()
            .nodes
            .get(&normalize_path(path))
            .map(|n| n.acl.clone())
    }

    pub fn lease_held(&self, path: &str) -> bool {
        self.lock().leases.contains_key(&normalize_path(path))
    }

    pub fn deny(&self, path: &str) {
        self.lock().deny.insert(normalize_path(path));
    }

    pub fn allow(&self, path: &str) {
        let path = normalize_path(path);
        self.lock().deny.remove(&path);
    }

    pub fn stats(&self) -> MemoryStats {
        self.lock().stats
    }

    pub fn visited(&self) -> Vec<String> {
        self.lock().visited.clone()
    }

    pub fn clear_visited(&self) {
        self.lock().visited.clear();
    }

    // ------------------------------------------------------------------
    // copy
    // ------------------------------------------------------------------

    pub fn start_copy(&self, source: &str, dest: &str, args: OpStartCopy) -> Result<RpStartCopy> {
        let mut st = self.lock();

        let src = st
            .nodes
            .get(source)
            .ok_or_else(|| {
                Error::new(ErrorKind::NotFound, "copy source does not exist")
                    .with_context("source", source)
            })?
            .clone();

        if src.kind == NodeKind::Dir {
            return Err(
                Error::new(ErrorKind::InvalidState, "copy source is a directory")
                    .with_context("source", source),
            );
        }
        if src.tier == AccessTier::Archive && args.rehydrate_priority().is_none() {
            return Err(Error::new(
                ErrorKind::InvalidState,
                "archived source must be rehydrated; set a rehydrate priority",
            )
            .with_context("source", source));
        }
        if st.nodes.contains_key(dest) && !args.overwrite() {
            return Err(
                Error::new(ErrorKind::AlreadyExists, "copy dest already exists")
                    .with_context("dest", dest),
            );
        }

        let copy_id = Uuid::new_v4().to_string();
        let tier = args.access_tier().unwrap_or(src.tier);

        // Zero-byte objects complete synchronously, as do all copies when
        // the store is configured with no simulated latency.
        if self.copy_polls == 0 || src.len == 0 {
            ensure_parents(&mut st.nodes, dest);
            st.nodes
                .insert(dest.to_string(), Node::file(src.len, tier));
            st.finished.insert(
                dest.to_string(),
                FinishedCopy {
                    copy_id: copy_id.clone(),
                    status: CopyStatus::Success,
                    completed_at: Utc::now(),
                },
            );
            return Ok(RpStartCopy::new(copy_id, CopyStatus::Success));
        }

        st.jobs.insert(
            dest.to_string(),
            CopyJob {
                copy_id: copy_id.clone(),
                polls_total: self.copy_polls,
                polls_remaining: self.copy_polls,
                bytes_total: src.len,
                tier,
            },
        );
        Ok(RpStartCopy::new(copy_id, CopyStatus::Pending))
    }

    pub fn copy_status(&self, dest: &str) -> Result<RpCopyStatus> {
        let mut st = self.lock();
        st.stats.status_checks += 1;

        if st.flaky_status > 0 {
            st.flaky_status -= 1;
            return Err(
                Error::new(ErrorKind::Unexpected, "simulated transient fault")
                    .with_context("dest", dest)
                    .set_temporary(),
            );
        }

        if let Some(mut job) = st.jobs.get(dest).cloned() {
            job.polls_remaining = job.polls_remaining.saturating_sub(1);

            if job.polls_remaining == 0 {
                st.jobs.remove(dest);

                let status = if self.fail_copies {
                    CopyStatus::Failed
                } else {
                    ensure_parents(&mut st.nodes, dest);
                    st.nodes
                        .insert(dest.to_string(), Node::file(job.bytes_total, job.tier));
                    CopyStatus::Success
                };
                let completed_at = Utc::now();
                st.finished.insert(
                    dest.to_string(),
                    FinishedCopy {
                        copy_id: job.copy_id.clone(),
                        status,
                        completed_at,
                    },
                );

                return Ok(RpCopyStatus::new(Some(job.copy_id), status)
                    .with_progress(CopyProgress {
                        bytes_copied: job.bytes_total,
                        bytes_total: job.bytes_total,
                    })
                    .with_completed_at(completed_at));
            }

            let done = u64::from(job.polls_total - job.polls_remaining);
            let progress = CopyProgress {
                bytes_copied: job.bytes_total * done / u64::from(job.polls_total),
                bytes_total: job.bytes_total,
            };
            let copy_id = job.copy_id.clone();
            st.jobs.insert(dest.to_string(), job);

            return Ok(RpCopyStatus::new(Some(copy_id), CopyStatus::Pending).with_progress(progress));
        }

        if let Some(finished) = st.finished.get(dest) {
            return Ok(
                RpCopyStatus::new(Some(finished.copy_id.clone()), finished.status)
                    .with_completed_at(finished.completed_at),
            );
        }

        if st.nodes.contains_key(dest) {
            return Err(
                Error::new(ErrorKind::InvalidState, "no copy recorded on this path")
                    .with_context("dest", dest),
            );
        }
        Err(Error::new(ErrorKind::NotFound, "copy dest does not exist")
            .with_context("dest", dest))
    }

    pub fn abort_copy(&self, dest: &str, args: OpAbortCopy) -> Result<RpAbortCopy> {
        let mut st = self.lock();

        let job = match st.jobs.remove(dest) {
            Some(job) if job.copy_id == args.copy_id() => job,
            Some(job) => {
                // Wrong id; the pending job stays where it was.
                st.jobs.insert(dest.to_string(), job);
                return Err(Error::new(ErrorKind::InvalidState, "copy id does not match")
                    .with_context("dest", dest)
                    .with_context("copy_id", args.copy_id().to_string()));
            }
            None => {
                return Err(
                    Error::new(ErrorKind::InvalidState, "no pending copy on this path")
                        .with_context("dest", dest),
                )
            }
        };
        st.finished.insert(
            dest.to_string(),
            FinishedCopy {
                copy_id: job.copy_id,
                status: CopyStatus::Aborted,
                completed_at: Utc::now(),
            },
        );
        Ok(RpAbortCopy::default())
    }

    // ------------------------------------------------------------------
    // lease
    // ------------------------------------------------------------------

    pub fn acquire_lease(&self, path: &str) -> Result<RpAcquireLease> {
        let mut st = self.lock();

        if !st.nodes.contains_key(path) {
            return Err(Error::new(ErrorKind::NotFound, "path does not exist")
                .with_context("path", path));
        }
        if st.leases.contains_key(path) {
            return Err(
                Error::new(ErrorKind::AlreadyExists, "a lease is already present")
                    .with_context("path", path),
            );
        }

        let lease_id = Uuid::new_v4().to_string();
        st.leases.insert(path.to_string(), lease_id.clone());
        st.stats.leases_acquired += 1;
        Ok(RpAcquireLease::new(lease_id))
    }

    pub fn renew_lease(&self, path: &str, args: OpRenewLease) -> Result<RpRenewLease> {
        let st = self.lock();
        match st.leases.get(path) {
            Some(id) if id == args.lease_id() => Ok(RpRenewLease::default()),
            _ => Err(
                Error::new(ErrorKind::InvalidState, "lease is not held with this id")
                    .with_context("path", path),
            ),
        }
    }

    pub fn release_lease(&self, path: &str, args: OpReleaseLease) -> Result<RpReleaseLease> {
        let mut st = self.lock();
        match st.leases.get(path) {
            Some(id) if id == args.lease_id() => {
                st.leases.remove(path);
                st.stats.leases_released += 1;
                Ok(RpReleaseLease::default())
            }
            _ => Err(
                Error::new(ErrorKind::InvalidState, "lease is not held with this id")
                    .with_context("path", path),
            ),
        }
    }

    pub fn break_lease(&self, path: &str) -> Result<RpBreakLease> {
        let mut st = self.lock();
        if st.leases.remove(path).is_none() {
            return Err(Error::new(ErrorKind::InvalidState, "path is not leased")
                .with_context("path", path));
        }
        st.stats.leases_broken += 1;
        Ok(RpBreakLease::default())
    }

    // ------------------------------------------------------------------
    // acl
    // ------------------------------------------------------------------

    pub fn get_acl(&self, path: &str) -> Result<RpGetAcl> {
        let st = self.lock();
        let node = st.nodes.get(path).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, "path does not exist").with_context("path", path)
        })?;
        Ok(RpGetAcl::new(node.acl.clone()))
    }

    pub fn set_acl(&self, path: &str, args: OpSetAcl) -> Result<RpSetAcl> {
        let mut st = self.lock();
        let st = &mut *st;

        if st.deny.contains(path) {
            return Err(
                Error::new(ErrorKind::PermissionDenied, "acl change denied")
                    .with_context("path", path),
            );
        }
        let node = st.nodes.get_mut(path).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, "path does not exist").with_context("path", path)
        })?;

        apply_mode(node, AclMode::Set, args.acl());
        Ok(RpSetAcl::default())
    }

    pub fn apply_acl_batch(&self, root: &str, args: OpApplyAclBatch) -> Result<RpApplyAclBatch> {
        let mut st = self.lock();
        let st = &mut *st;

        let root_node = st.nodes.get(root).ok_or_else(|| {
            Error::new(ErrorKind::NotFound, "root does not exist").with_context("root", root)
        })?;
        if root_node.kind != NodeKind::Dir {
            return Err(
                Error::new(ErrorKind::InvalidState, "root is not a directory")
                    .with_context("root", root),
            );
        }

        let batch_size = args.batch_size().unwrap_or(self.batch_size).max(1);

        // The subtree in lexicographic path order is the stable traversal
        // cursor: the continuation token is simply the last visited path,
        // opaque to callers.
        let paths: Vec<String> = st
            .nodes
            .range(root.to_string()..)
            .take_while(|(k, _)| k.starts_with(root))
            .filter(|(k, _)| k.as_str() == root || in_subtree(root, k))
            .map(|(k, _)| k.clone())
            .filter(|k| args.continuation().is_none_or(|c| k.as_str() > c))
            .collect();

        let mut counters = AclCounters::default();
        let mut failures = Vec::new();
        let mut cursor: Option<String> = None;
        let mut processed = 0usize;
        let mut halted = false;

        for path in &paths {
            if processed == batch_size {
                break;
            }
            processed += 1;
            cursor = Some(path.clone());
            st.visited.push(path.clone());

            let Some(node) = st.nodes.get_mut(path) else {
                continue;
            };
            let is_dir = node.kind == NodeKind::Dir;

            if st.deny.contains(path) {
                counters.failure_count += 1;
                failures.push(AclFailedEntry {
                    path: path.clone(),
                    is_directory: is_dir,
                    message: "acl change denied".to_string(),
                });
                if !args.continue_on_failure() {
                    halted = true;
                    break;
                }
                continue;
            }

            apply_mode(node, args.mode(), args.acl());
            if is_dir {
                counters.directories_succeeded += 1;
            } else {
                counters.files_succeeded += 1;
            }
        }

        let fully_visited = processed == paths.len();
        let continuation = if halted || !fully_visited { cursor } else { None };

        Ok(RpApplyAclBatch::new(counters, continuation).with_failures(failures))
    }
}

fn ensure_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut prefix = String::new();
    for seg in path.split('/') {
        if !prefix.is_empty() {
            nodes.entry(prefix.clone()).or_insert_with(Node::dir);
            prefix.push('/');
        }
        prefix.push_str(seg);
    }
}

fn apply_mode(node: &mut Node, mode: AclMode, acl: &AclSpec) {
    let is_file = node.kind == NodeKind::File;

    match mode {
        AclMode::Set => {
            // Default entries do not apply to files: a file keeps its acl
            // when the spec carries nothing in access scope.
            let effective = if is_file {
                acl.with_scope(AclScope::Access)
            } else {
                acl.clone()
            };
            if !effective.is_empty() {
                node.acl = effective;
            }
        }
        AclMode::Update => {
            let effective = if is_file {
                acl.with_scope(AclScope::Access)
            } else {
                acl.clone()
            };
            if !effective.is_empty() {
                node.acl = node.acl.merge(&effective);
            }
        }
        AclMode::Remove => {
            node.acl = node.acl.strip(acl);
        }
    }
}
