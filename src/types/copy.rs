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

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;

/// Status of a server-side copy operation.
///
/// `Pending` is the only non-terminal status: once a copy reaches `Success`,
/// `Failed` or `Aborted` it never transitions again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CopyStatus {
    /// The service accepted the copy and is still executing it.
    Pending,
    /// The copy completed and the destination is fully written.
    Success,
    /// The service gave up on the copy.
    Failed,
    /// The copy was aborted by the caller while still pending.
    Aborted,
}

impl CopyStatus {
    /// Returns true for every status other than [`CopyStatus::Pending`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CopyStatus::Pending)
    }

    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            CopyStatus::Pending => "pending",
            CopyStatus::Success => "success",
            CopyStatus::Failed => "failed",
            CopyStatus::Aborted => "aborted",
        }
    }
}

impl Display for CopyStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Bytes copied so far out of the total, as reported by the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyProgress {
    /// Bytes already written to the destination.
    pub bytes_copied: u64,
    /// Total size of the source.
    pub bytes_total: u64,
}

impl Display for CopyProgress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bytes_copied, self.bytes_total)
    }
}

/// Storage tier of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessTier {
    /// Optimized for frequent access.
    Hot,
    /// Optimized for infrequent access.
    Cool,
    /// Optimized for rare access.
    Cold,
    /// Offline tier; objects must be rehydrated before they can be read.
    Archive,
}

impl AccessTier {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            AccessTier::Hot => "hot",
            AccessTier::Cool => "cool",
            AccessTier::Cold => "cold",
            AccessTier::Archive => "archive",
        }
    }
}

impl Display for AccessTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Priority for rehydrating an archived source via copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RehydratePriority {
    /// May take up to the service's standard rehydration window.
    Standard,
    /// Prioritized rehydration at a higher cost.
    High,
}

/// Options for starting a server-side copy.
///
/// Rehydrating an archived object is itself modeled as a copy: set an
/// [`AccessTier`] for the destination and a [`RehydratePriority`], and use a
/// destination path that differs from the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyOptions {
    overwrite: bool,
    access_tier: Option<AccessTier>,
    rehydrate_priority: Option<RehydratePriority>,
}

impl CopyOptions {
    /// Create a new `CopyOptions` with overwrite disallowed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow overwriting an existing destination.
    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    /// Set the destination's access tier.
    pub fn with_access_tier(mut self, tier: AccessTier) -> Self {
        self.access_tier = Some(tier);
        self
    }

    /// Set the rehydrate priority for an archived source.
    pub fn with_rehydrate_priority(mut self, priority: RehydratePriority) -> Self {
        self.rehydrate_priority = Some(priority);
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

/// A handle over one server-side copy, as seen by the caller.
///
/// The handle enforces the copy-id invariant: a copy id is only observable
/// while the status is [`CopyStatus::Pending`], since it is only good for
/// aborting an in-flight copy.
#[derive(Clone, Debug)]
pub struct CopyOperation {
    source: String,
    dest: String,

    copy_id: Option<String>,
    status: CopyStatus,
    progress: Option<CopyProgress>,
    completed_at: Option<DateTime<Utc>>,
}

impl CopyOperation {
    pub(crate) fn new(
        source: String,
        dest: String,
        status: CopyStatus,
        copy_id: Option<String>,
    ) -> Self {
        let mut op = Self {
            source,
            dest,
            copy_id,
            status,
            progress: None,
            completed_at: None,
        };
        if op.status.is_terminal() {
            op.copy_id = None;
        }
        op
    }

    /// The source path the copy reads from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The destination path the copy writes to.
    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// Current status of the copy.
    pub fn status(&self) -> CopyStatus {
        self.status
    }

    /// The service-issued copy id, present only while the copy is pending.
    pub fn copy_id(&self) -> Option<&str> {
        self.copy_id.as_deref()
    }

    /// Last progress report from the service, if any.
    pub fn progress(&self) -> Option<CopyProgress> {
        self.progress
    }

    /// When the copy reached a terminal status, as reported by the service.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Record a fresh status report. Clears the copy id when the status
    /// becomes terminal.
    pub(crate) fn record(
        &mut self,
        status: CopyStatus,
        progress: Option<CopyProgress>,
        completed_at: Option<DateTime<Utc>>,
    ) {
        debug_assert!(
            !self.status.is_terminal() || self.status == status,
            "copy status must not leave a terminal state"
        );

        self.status = status;
        if let Some(progress) = progress {
            self.progress = Some(progress);
        }
        if completed_at.is_some() {
            self.completed_at = completed_at;
        }
        if self.status.is_terminal() {
            self.copy_id = None;
        }
    }

    pub(crate) fn mark_aborted(&mut self) {
        self.status = CopyStatus::Aborted;
        self.copy_id = None;
    }
}

/// Bounds for the copy status polling loop.
///
/// The bounded loop is the only retry mechanism during polling: once
/// `max_attempts` status checks have been spent, the operation is handed
/// back to the caller still pending, and the caller decides whether to keep
/// polling later or abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    interval: Duration,
    max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 12,
        }
    }
}

impl PollPolicy {
    /// Create a new `PollPolicy` with a 5s interval and 12 attempts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sleep between status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the maximum number of status checks.
    ///
    /// # Panics
    ///
    /// Input max_attempts must be at least 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        assert!(max_attempts >= 1, "max_attempts must be at least 1");
        self.max_attempts = max_attempts;
        self
    }

    /// The sleep between status checks.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The maximum number of status checks.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_copy_id_cleared_on_terminal() {
        let mut op = CopyOperation::new(
            "a".to_string(),
            "b".to_string(),
            CopyStatus::Pending,
            Some("id-1".to_string()),
        );
        assert_eq!(op.copy_id(), Some("id-1"));

        op.record(CopyStatus::Success, None, None);
        assert_eq!(op.copy_id(), None);
        assert!(op.status().is_terminal());
    }

    #[test]
    fn test_copy_id_absent_for_synchronous_completion() {
        let op = CopyOperation::new(
            "a".to_string(),
            "b".to_string(),
            CopyStatus::Success,
            Some("id-1".to_string()),
        );
        assert_eq!(op.copy_id(), None);
    }

    #[test]
    #[should_panic(expected = "max_attempts must be at least 1")]
    fn test_poll_policy_rejects_zero_attempts() {
        let _ = PollPolicy::new().with_max_attempts(0);
    }
}
