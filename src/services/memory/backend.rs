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

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use super::core::MemoryCore;
use crate::raw::*;
use crate::*;

/// Config for the in-memory store.
#[derive(Default, Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
#[non_exhaustive]
pub struct MemoryConfig {
    /// Nodes visited per ACL batch when the request does not pick a size.
    pub batch_size: Option<usize>,
    /// Status checks a copy stays pending for before completing. Zero makes
    /// every copy complete synchronously.
    pub copy_polls: u32,
    /// Complete every asynchronous copy as `Failed` instead of `Success`.
    pub fail_copies: bool,
    /// Fail this many status checks with a temporary error before serving
    /// real answers.
    pub flaky_status: u32,
    /// Paths whose ACL changes are denied with `PermissionDenied`.
    pub deny: Vec<String>,
}

/// Counters of store-side activity, for inspection in tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Copy status checks served, including ones that failed temporarily.
    pub status_checks: u64,
    /// Leases acquired.
    pub leases_acquired: u64,
    /// Leases released with a matching id.
    pub leases_released: u64,
    /// Leases forcibly broken.
    pub leases_broken: u64,
}

/// Builder for the in-memory store.
#[derive(Default, Debug)]
pub struct MemoryBuilder {
    config: MemoryConfig,
}

impl MemoryBuilder {
    /// Nodes visited per ACL batch when the request does not pick a size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = Some(batch_size);
        self
    }

    /// Status checks a copy stays pending for before completing.
    pub fn copy_polls(mut self, copy_polls: u32) -> Self {
        self.config.copy_polls = copy_polls;
        self
    }

    /// Complete every asynchronous copy as `Failed`.
    pub fn fail_copies(mut self) -> Self {
        self.config.fail_copies = true;
        self
    }

    /// Fail this many status checks with a temporary error first.
    pub fn flaky_status(mut self, count: u32) -> Self {
        self.config.flaky_status = count;
        self
    }

    /// Deny ACL changes on the given path.
    pub fn deny(mut self, path: &str) -> Self {
        self.config.deny.push(path.to_string());
        self
    }

    /// Build a [`MemoryStore`] from the accumulated config.
    pub fn build(self) -> Result<MemoryStore> {
        if self.config.batch_size == Some(0) {
            return Err(
                Error::new(ErrorKind::ConfigInvalid, "batch_size must be at least 1")
                    .with_context("service", "memory"),
            );
        }

        let deny: HashSet<String> = self
            .config
            .deny
            .iter()
            .map(|p| normalize_path(p))
            .collect();

        Ok(MemoryStore {
            core: Arc::new(MemoryCore::new(
                self.config.batch_size.unwrap_or(5000),
                self.config.copy_polls,
                self.config.fail_copies,
                self.config.flaky_status,
                deny,
            )),
        })
    }
}

/// An in-memory store keeping its namespace in a `BTreeMap`, with knobs to
/// simulate slow copies, transient faults and denied ACL changes.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    core: Arc<MemoryCore>,
}

impl MemoryStore {
    /// Create a directory, including missing ancestors.
    pub fn create_dir(&self, path: &str) {
        self.core.create_dir(path)
    }

    /// Create a file of the given length, including missing ancestors.
    pub fn create_file(&self, path: &str, len: u64) {
        self.core.create_file(path, len)
    }

    /// Move an existing node to the given access tier.
    pub fn set_tier(&self, path: &str, tier: AccessTier) {
        self.core.set_tier(path, tier)
    }

    /// Whether the path exists.
    pub fn exists(&self, path: &str) -> bool {
        self.core.exists(path)
    }

    /// The node's access tier, if it exists.
    pub fn tier_of(&self, path: &str) -> Option<AccessTier> {
        self.core.tier_of(path)
    }

    /// The node's ACL, if it exists.
    pub fn acl_of(&self, path: &str) -> Option<AclSpec> {
        self.core.acl_of(path)
    }

    /// Whether a lease is currently held on the path.
    pub fn lease_held(&self, path: &str) -> bool {
        self.core.lease_held(path)
    }

    /// Start denying ACL changes on the path.
    pub fn deny(&self, path: &str) {
        self.core.deny(path)
    }

    /// Stop denying ACL changes on the path.
    pub fn allow(&self, path: &str) {
        self.core.allow(path)
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> MemoryStats {
        self.core.stats()
    }

    /// Paths visited by ACL batches, in visit order.
    pub fn visited(&self) -> Vec<String> {
        self.core.visited()
    }

    /// Reset the visit log.
    pub fn clear_visited(&self) {
        self.core.clear_visited()
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn info(&self) -> StoreInfo {
        StoreInfo::new(
            "memory",
            Capability {
                copy: true,
                lease: true,
                acl: true,
                acl_recursive: true,
            },
        )
    }

    async fn start_copy(&self, source: &str, dest: &str, args: OpStartCopy) -> Result<RpStartCopy> {
        self.core.start_copy(source, dest, args)
    }

    async fn copy_status(&self, dest: &str, _: OpCopyStatus) -> Result<RpCopyStatus> {
        self.core.copy_status(dest)
    }

    async fn abort_copy(&self, dest: &str, args: OpAbortCopy) -> Result<RpAbortCopy> {
        self.core.abort_copy(dest, args)
    }

    async fn acquire_lease(&self, path: &str, _: OpAcquireLease) -> Result<RpAcquireLease> {
        self.core.acquire_lease(path)
    }

    async fn renew_lease(&self, path: &str, args: OpRenewLease) -> Result<RpRenewLease> {
        self.core.renew_lease(path, args)
    }

    async fn release_lease(&self, path: &str, args: OpReleaseLease) -> Result<RpReleaseLease> {
        self.core.release_lease(path, args)
    }

    async fn break_lease(&self, path: &str, _: OpBreakLease) -> Result<RpBreakLease> {
        self.core.break_lease(path)
    }

    async fn get_acl(&self, path: &str, _: OpGetAcl) -> Result<RpGetAcl> {
        self.core.get_acl(path)
    }

    async fn set_acl(&self, path: &str, args: OpSetAcl) -> Result<RpSetAcl> {
        self.core.set_acl(path, args)
    }

    async fn apply_acl_batch(&self, root: &str, args: OpApplyAclBatch) -> Result<RpApplyAclBatch> {
        self.core.apply_acl_batch(root, args)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_build_rejects_zero_batch_size() {
        let err = MemoryBuilder::default().batch_size(0).build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    }

    #[tokio::test]
    async fn test_synchronous_copy_materializes_dest() {
        let store = MemoryBuilder::default().build().unwrap();
        store.create_file("src.bin", 16);

        let rp = store
            .start_copy("src.bin", "dst.bin", OpStartCopy::new())
            .await
            .unwrap();
        assert_eq!(rp.status(), CopyStatus::Success);
        assert!(store.exists("dst.bin"));
    }

    #[tokio::test]
    async fn test_lease_round_trip() {
        let store = MemoryBuilder::default().build().unwrap();
        store.create_file("src.bin", 16);

        let rp = store
            .acquire_lease("src.bin", OpAcquireLease::new(LeaseDuration::Infinite))
            .await
            .unwrap();
        assert!(store.lease_held("src.bin"));

        // A second acquisition conflicts while the lease is held.
        let err = store
            .acquire_lease("src.bin", OpAcquireLease::new(LeaseDuration::Infinite))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        store
            .release_lease("src.bin", OpReleaseLease::new(rp.lease_id()))
            .await
            .unwrap();
        assert!(!store.lease_held("src.bin"));
    }
}
