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

//! Ops provides the operation args struct like [`OpStartCopy`] for
//! user input and reply struct like [`RpStartCopy`] for store output.

use chrono::DateTime;
use chrono::Utc;

use crate::AccessTier;
use crate::AclCounters;
use crate::AclFailedEntry;
use crate::AclMode;
use crate::AclSpec;
use crate::CopyProgress;
use crate::CopyStatus;
use crate::RehydratePriority;

/// Duration of a lease on one path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseDuration {
    /// The lease is held until explicitly released or broken.
    Infinite,
    /// The lease expires after the given number of seconds.
    Seconds(u32),
}

/// Args for `start_copy` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpStartCopy {
    overwrite: bool,
    access_tier: Option<AccessTier>,
    rehydrate_priority: Option<RehydratePriority>,
}

impl OpStartCopy {
    /// Create a new `OpStartCopy`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow overwriting an existing destination.
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Set the destination's access tier.
    pub fn with_access_tier(mut self, tier: Option<AccessTier>) -> Self {
        self.access_tier = tier;
        self
    }

    /// Set the rehydrate priority for an archived source.
    pub fn with_rehydrate_priority(mut self, priority: Option<RehydratePriority>) -> Self {
        self.rehydrate_priority = priority;
        self
    }

    /// Whether overwriting an existing destination is allowed.
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// The destination's access tier, if set.
    pub fn access_tier(&self) -> Option<AccessTier> {
        self.access_tier
    }

    /// The rehydrate priority, if set.
    pub fn rehydrate_priority(&self) -> Option<RehydratePriority> {
        self.rehydrate_priority
    }
}

/// Reply for `start_copy` operation.
#[derive(Clone, Debug)]
pub struct RpStartCopy {
    copy_id: String,
    status: CopyStatus,
}

impl RpStartCopy {
    /// Create a new `RpStartCopy`.
    pub fn new(copy_id: impl Into<String>, status: CopyStatus) -> Self {
        Self {
            copy_id: copy_id.into(),
            status,
        }
    }

    /// The service-issued copy id.
    pub fn copy_id(&self) -> &str {
        &self.copy_id
    }

    /// Status at acceptance time. Small objects may complete synchronously;
    /// this is a service-determined outcome.
    pub fn status(&self) -> CopyStatus {
        self.status
    }
}

/// Args for `copy_status` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpCopyStatus {}

impl OpCopyStatus {
    /// Create a new `OpCopyStatus`.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reply for `copy_status` operation.
#[derive(Clone, Debug)]
pub struct RpCopyStatus {
    copy_id: Option<String>,
    status: CopyStatus,
    progress: Option<CopyProgress>,
    completed_at: Option<DateTime<Utc>>,
}

impl RpCopyStatus {
    /// Create a new `RpCopyStatus`.
    pub fn new(copy_id: Option<String>, status: CopyStatus) -> Self {
        Self {
            copy_id,
            status,
            progress: None,
            completed_at: None,
        }
    }

    /// Set the progress report.
    pub fn with_progress(mut self, progress: CopyProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Set the completion timestamp.
    pub fn with_completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// The copy id the status belongs to, if the service reports one.
    pub fn copy_id(&self) -> Option<&str> {
        self.copy_id.as_deref()
    }

    /// Current status of the copy.
    pub fn status(&self) -> CopyStatus {
        self.status
    }

    /// Progress report, if any.
    pub fn progress(&self) -> Option<CopyProgress> {
        self.progress
    }

    /// Completion timestamp, if the copy is terminal.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

/// Args for `abort_copy` operation.
#[derive(Clone, Debug)]
pub struct OpAbortCopy {
    copy_id: String,
}

impl OpAbortCopy {
    /// Create a new `OpAbortCopy` for the given copy id.
    pub fn new(copy_id: impl Into<String>) -> Self {
        Self {
            copy_id: copy_id.into(),
        }
    }

    /// The copy id to abort.
    pub fn copy_id(&self) -> &str {
        &self.copy_id
    }
}

/// Reply for `abort_copy` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpAbortCopy {}

/// Args for `acquire_lease` operation.
#[derive(Clone, Copy, Debug)]
pub struct OpAcquireLease {
    duration: LeaseDuration,
}

impl OpAcquireLease {
    /// Create a new `OpAcquireLease`.
    pub fn new(duration: LeaseDuration) -> Self {
        Self { duration }
    }

    /// How long the lease is held.
    pub fn duration(&self) -> LeaseDuration {
        self.duration
    }
}

/// Reply for `acquire_lease` operation.
#[derive(Clone, Debug)]
pub struct RpAcquireLease {
    lease_id: String,
}

impl RpAcquireLease {
    /// Create a new `RpAcquireLease`.
    pub fn new(lease_id: impl Into<String>) -> Self {
        Self {
            lease_id: lease_id.into(),
        }
    }

    /// The opaque token representing the exclusive hold.
    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }
}

/// Args for `renew_lease` operation.
#[derive(Clone, Debug)]
pub struct OpRenewLease {
    lease_id: String,
}

impl OpRenewLease {
    /// Create a new `OpRenewLease`.
    pub fn new(lease_id: impl Into<String>) -> Self {
        Self {
            lease_id: lease_id.into(),
        }
    }

    /// The lease to renew.
    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }
}

/// Reply for `renew_lease` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpRenewLease {}

/// Args for `release_lease` operation.
#[derive(Clone, Debug)]
pub struct OpReleaseLease {
    lease_id: String,
}

impl OpReleaseLease {
    /// Create a new `OpReleaseLease`.
    pub fn new(lease_id: impl Into<String>) -> Self {
        Self {
            lease_id: lease_id.into(),
        }
    }

    /// The lease to release.
    pub fn lease_id(&self) -> &str {
        &self.lease_id
    }
}

/// Reply for `release_lease` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpReleaseLease {}

/// Args for `break_lease` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpBreakLease {}

impl OpBreakLease {
    /// Create a new `OpBreakLease`.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reply for `break_lease` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpBreakLease {}

/// Args for `get_acl` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpGetAcl {}

impl OpGetAcl {
    /// Create a new `OpGetAcl`.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reply for `get_acl` operation.
#[derive(Clone, Debug)]
pub struct RpGetAcl {
    acl: AclSpec,
}

impl RpGetAcl {
    /// Create a new `RpGetAcl`.
    pub fn new(acl: AclSpec) -> Self {
        Self { acl }
    }

    /// The node's ACL.
    pub fn into_acl(self) -> AclSpec {
        self.acl
    }
}

/// Args for `set_acl` operation.
#[derive(Clone, Debug)]
pub struct OpSetAcl {
    acl: AclSpec,
}

impl OpSetAcl {
    /// Create a new `OpSetAcl`.
    pub fn new(acl: AclSpec) -> Self {
        Self { acl }
    }

    /// The ACL to set.
    pub fn acl(&self) -> &AclSpec {
        &self.acl
    }
}

/// Reply for `set_acl` operation.
#[derive(Clone, Copy, Debug, Default)]
pub struct RpSetAcl {}

/// Args for `apply_acl_batch` operation: one service-side batch of a
/// recursive ACL change.
#[derive(Clone, Debug)]
pub struct OpApplyAclBatch {
    mode: AclMode,
    acl: AclSpec,
    continuation: Option<String>,
    batch_size: Option<usize>,
    continue_on_failure: bool,
}

impl OpApplyAclBatch {
    /// Create a new `OpApplyAclBatch`.
    pub fn new(mode: AclMode, acl: AclSpec) -> Self {
        Self {
            mode,
            acl,
            continuation: None,
            batch_size: None,
            continue_on_failure: false,
        }
    }

    /// Resume from a continuation token.
    pub fn with_continuation(mut self, continuation: Option<String>) -> Self {
        self.continuation = continuation;
        self
    }

    /// Bound the number of nodes visited in this batch.
    pub fn with_batch_size(mut self, batch_size: Option<usize>) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Count node failures instead of stopping the batch at the first one.
    pub fn with_continue_on_failure(mut self, continue_on_failure: bool) -> Self {
        self.continue_on_failure = continue_on_failure;
        self
    }

    /// How the spec applies to each node.
    pub fn mode(&self) -> AclMode {
        self.mode
    }

    /// The ACL spec to apply.
    pub fn acl(&self) -> &AclSpec {
        &self.acl
    }

    /// The resumption cursor, if any.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// The requested batch size, if any.
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// Whether node failures are counted instead of stopping the batch.
    pub fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }
}

/// Reply for `apply_acl_batch` operation.
#[derive(Clone, Debug)]
pub struct RpApplyAclBatch {
    counters: AclCounters,
    continuation: Option<String>,
    failures: Vec<AclFailedEntry>,
}

impl RpApplyAclBatch {
    /// Create a new `RpApplyAclBatch`.
    pub fn new(counters: AclCounters, continuation: Option<String>) -> Self {
        Self {
            counters,
            continuation,
            failures: Vec::new(),
        }
    }

    /// Attach per-node failure details.
    pub fn with_failures(mut self, failures: Vec<AclFailedEntry>) -> Self {
        self.failures = failures;
        self
    }

    /// Counters for this batch only.
    pub fn counters(&self) -> AclCounters {
        self.counters
    }

    /// Cursor to request the next batch; `None` when the subtree is
    /// exhausted.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Per-node failure details for this batch.
    pub fn failures(&self) -> &[AclFailedEntry] {
        &self.failures
    }

    pub(crate) fn into_parts(self) -> (AclCounters, Option<String>, Vec<AclFailedEntry>) {
        (self.counters, self.continuation, self.failures)
    }
}
