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

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;

use crate::raw::*;
use crate::*;

/// Which operations a store supports.
///
/// Orchestrators check capabilities before issuing requests so that an
/// unsupported workflow fails with [`ErrorKind::Unsupported`] instead of a
/// confusing service error.
#[derive(Clone, Copy, Debug, Default)]
pub struct Capability {
    /// Server-side copy with status polling and abort.
    pub copy: bool,
    /// Exclusive leases over single paths.
    pub lease: bool,
    /// Per-path ACL reads and writes.
    pub acl: bool,
    /// Batched recursive ACL changes with continuation tokens.
    pub acl_recursive: bool,
}

/// Metadata of a store: a human-readable name plus its capabilities.
#[derive(Clone, Debug)]
pub struct StoreInfo {
    name: String,
    capability: Capability,
}

impl StoreInfo {
    /// Create a new `StoreInfo`.
    pub fn new(name: impl Into<String>, capability: Capability) -> Self {
        Self {
            name: name.into(),
            capability,
        }
    }

    /// Name of the store, used in logs and error context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The store's capabilities.
    pub fn capability(&self) -> Capability {
        self.capability
    }
}

/// Underlying trait of all stores for implementors.
///
/// The store owns the actual protocol work: requests, authentication and
/// its own internal retries. Stratus orchestrates on top of it and treats
/// every method as a single request/response exchange.
///
/// # Notes
///
/// - Paths are normalized before they reach a store: no leading or trailing
///   `/`, no empty segments.
/// - Every method has a default implementation returning
///   [`ErrorKind::Unsupported`]; stores implement what they can and declare
///   it in [`StoreInfo`].
#[async_trait]
pub trait Store: Send + Sync + Debug + 'static {
    /// Invoke the `info` operation to get metadata of this store.
    ///
    /// This function is required to be implemented.
    fn info(&self) -> StoreInfo;

    /// Request the service begin copying `source` into `dest`.
    ///
    /// Require [`Capability::copy`]
    ///
    /// # Behavior
    ///
    /// - Returns [`ErrorKind::NotFound`] if `source` does not exist.
    /// - Returns [`ErrorKind::AlreadyExists`] if `dest` exists and overwrite
    ///   is disallowed.
    /// - The reply may carry a terminal status when the service completed
    ///   the copy synchronously.
    async fn start_copy(&self, source: &str, dest: &str, args: OpStartCopy) -> Result<RpStartCopy> {
        let (_, _, _) = (source, dest, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Re-read the copy status recorded on `dest`.
    ///
    /// Require [`Capability::copy`]
    async fn copy_status(&self, dest: &str, args: OpCopyStatus) -> Result<RpCopyStatus> {
        let (_, _) = (dest, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Abort the pending copy identified by the copy id in `args`.
    ///
    /// Require [`Capability::copy`]
    ///
    /// # Behavior
    ///
    /// - Returns [`ErrorKind::InvalidState`] when no copy with that id is
    ///   pending on `dest`.
    async fn abort_copy(&self, dest: &str, args: OpAbortCopy) -> Result<RpAbortCopy> {
        let (_, _) = (dest, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Acquire an exclusive lease on `path`.
    ///
    /// Require [`Capability::lease`]
    ///
    /// # Behavior
    ///
    /// - Returns [`ErrorKind::AlreadyExists`] when a lease is already held.
    async fn acquire_lease(&self, path: &str, args: OpAcquireLease) -> Result<RpAcquireLease> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Renew the lease identified by the lease id in `args`.
    ///
    /// Require [`Capability::lease`]
    async fn renew_lease(&self, path: &str, args: OpRenewLease) -> Result<RpRenewLease> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Release the lease identified by the lease id in `args`.
    ///
    /// Require [`Capability::lease`]
    ///
    /// # Behavior
    ///
    /// - Returns [`ErrorKind::InvalidState`] when the path is not leased or
    ///   the id does not match.
    async fn release_lease(&self, path: &str, args: OpReleaseLease) -> Result<RpReleaseLease> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Break the lease on `path` without knowing its id.
    ///
    /// Require [`Capability::lease`]
    async fn break_lease(&self, path: &str, args: OpBreakLease) -> Result<RpBreakLease> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Read the ACL of a single path.
    ///
    /// Require [`Capability::acl`]
    async fn get_acl(&self, path: &str, args: OpGetAcl) -> Result<RpGetAcl> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Overwrite the ACL of a single path.
    ///
    /// Require [`Capability::acl`]
    async fn set_acl(&self, path: &str, args: OpSetAcl) -> Result<RpSetAcl> {
        let (_, _) = (path, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }

    /// Apply one batch of a recursive ACL change under `root`.
    ///
    /// Require [`Capability::acl_recursive`]
    ///
    /// # Behavior
    ///
    /// - The walk is path-ordered and the continuation token in the reply is
    ///   a stable cursor: resuming from it visits exactly the nodes not yet
    ///   visited, in the same order.
    /// - Without `continue_on_failure` the batch stops at the first failed
    ///   node and the cursor resumes past it.
    async fn apply_acl_batch(&self, root: &str, args: OpApplyAclBatch) -> Result<RpApplyAclBatch> {
        let (_, _) = (root, args);

        Err(Error::new(
            ErrorKind::Unsupported,
            "operation is not supported",
        ))
    }
}

/// A reference-counted, type-erased store handle.
pub type StoreRef = Arc<dyn Store>;
