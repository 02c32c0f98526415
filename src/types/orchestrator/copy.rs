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

use log::debug;
use log::warn;

use crate::raw::*;
use crate::*;

/// Copier coordinates server-side copies: start, bounded status polling,
/// abort, and lease protection of the source.
///
/// The state machine is `pending -> {success, failed, aborted}`; the three
/// outcomes are terminal and a [`CopyOperation`] never leaves them.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use stratus::services::MemoryBuilder;
/// # use stratus::Copier;
/// # use stratus::CopyOptions;
/// # use stratus::CopyStatus;
/// # use stratus::PollPolicy;
/// # use stratus::Result;
/// # async fn example() -> Result<()> {
/// let copier = Copier::new(Arc::new(MemoryBuilder::default().build()?));
///
/// let op = copier.start("src.bin", "dst.bin", CopyOptions::new()).await?;
/// let op = copier.wait(op, &PollPolicy::default()).await?;
///
/// if op.status() == CopyStatus::Pending {
///     // Polling budget exhausted; decide: keep polling later, or abort.
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Copier {
    store: StoreRef,
}

impl Copier {
    /// Create a new `Copier` over the given store.
    pub fn new(store: StoreRef) -> Self {
        Self { store }
    }

    fn require(&self, supported: bool, operation: &'static str) -> Result<()> {
        if supported {
            return Ok(());
        }

        Err(
            Error::new(ErrorKind::Unsupported, "store does not support this operation")
                .with_operation(operation)
                .with_context("service", self.store.info().name()),
        )
    }

    /// Request the service begin copying `source` into `dest`.
    ///
    /// The returned operation is `Pending` when the copy runs
    /// asynchronously, or already `Success` when the service completed it
    /// synchronously (small objects may complete immediately; this is a
    /// service-determined outcome).
    ///
    /// # Behavior
    ///
    /// - Fails with [`ErrorKind::NotFound`] when `source` does not exist.
    /// - Fails with [`ErrorKind::AlreadyExists`] when `dest` exists and
    ///   overwrite is disallowed.
    /// - Fails with [`ErrorKind::IsSameFile`] when source and destination
    ///   are the same path; rehydration in particular requires a different
    ///   destination.
    pub async fn start(
        &self,
        source: &str,
        dest: &str,
        opts: CopyOptions,
    ) -> Result<CopyOperation> {
        self.require(self.store.info().capability().copy, "Copier::start")?;

        let source = normalize_path(source);
        let dest = normalize_path(dest);

        if source == dest {
            return Err(
                Error::new(ErrorKind::IsSameFile, "source and dest paths are same")
                    .with_operation("Copier::start")
                    .with_context("source", &source)
                    .with_context("dest", &dest),
            );
        }

        let args = OpStartCopy::new()
            .with_overwrite(opts.overwrite())
            .with_access_tier(opts.access_tier())
            .with_rehydrate_priority(opts.rehydrate_priority());

        let rp = self.store.start_copy(&source, &dest, args).await?;
        debug!(
            "copy accepted: {} -> {} id={} status={}",
            source,
            dest,
            rp.copy_id(),
            rp.status()
        );

        Ok(CopyOperation::new(
            source,
            dest,
            rp.status(),
            Some(rp.copy_id().to_string()),
        ))
    }

    /// Poll the copy status until it becomes terminal or the polling budget
    /// is exhausted.
    ///
    /// Performs at most `policy.max_attempts()` status checks, sleeping
    /// `policy.interval()` before each one. A copy that is already terminal
    /// returns immediately without sleeping or checking.
    ///
    /// Temporary service errors during polling are absorbed by the budget:
    /// each consumes one attempt. Any other error surfaces immediately.
    /// When the budget runs out the operation is returned still `Pending`;
    /// the caller decides whether to keep polling later or abort.
    pub async fn wait(&self, mut op: CopyOperation, policy: &PollPolicy) -> Result<CopyOperation> {
        if op.status().is_terminal() {
            return Ok(op);
        }

        for attempt in 1..=policy.max_attempts() {
            tokio::time::sleep(policy.interval()).await;

            match self.store.copy_status(op.dest(), OpCopyStatus::new()).await {
                Ok(rp) => {
                    op.record(rp.status(), rp.progress(), rp.completed_at());
                    if op.status().is_terminal() {
                        debug!(
                            "copy {} reached status {} after {} attempts",
                            op.dest(),
                            op.status(),
                            attempt
                        );
                        return Ok(op);
                    }
                }
                Err(err) if err.is_temporary() => {
                    warn!(
                        "copy status check {}/{} for {} failed temporarily: {}",
                        attempt,
                        policy.max_attempts(),
                        op.dest(),
                        err
                    );
                }
                Err(err) => {
                    return Err(err
                        .with_operation("Copier::wait")
                        .with_context("dest", op.dest()))
                }
            }
        }

        debug!(
            "copy {} still pending after {} attempts, handing back to caller",
            op.dest(),
            policy.max_attempts()
        );
        Ok(op)
    }

    /// Abort a pending copy.
    ///
    /// Fails with [`ErrorKind::InvalidState`] when the operation already
    /// reached a terminal status. On success the operation transitions to
    /// [`CopyStatus::Aborted`].
    pub async fn abort(&self, op: &mut CopyOperation) -> Result<()> {
        if op.status() != CopyStatus::Pending {
            return Err(
                Error::new(ErrorKind::InvalidState, "only a pending copy can be aborted")
                    .with_operation("Copier::abort")
                    .with_context("dest", op.dest())
                    .with_context("status", op.status()),
            );
        }

        let copy_id = op.copy_id().ok_or_else(|| {
            Error::new(ErrorKind::InvalidState, "pending copy carries no copy id")
                .with_operation("Copier::abort")
                .with_context("dest", op.dest())
        })?;

        self.store
            .abort_copy(op.dest(), OpAbortCopy::new(copy_id))
            .await?;

        debug!("copy {} aborted", op.dest());
        op.mark_aborted();
        Ok(())
    }

    /// Acquire an infinite-duration exclusive lease on `source`, preventing
    /// concurrent writers from mutating it mid-copy.
    ///
    /// The returned lease id must be passed to [`Copier::release`] exactly
    /// once. Prefer [`Copier::start_protected`], which scopes the lease to
    /// the whole orchestration and releases it on every exit path.
    pub async fn protect(&self, source: &str) -> Result<String> {
        self.require(self.store.info().capability().lease, "Copier::protect")?;

        let source = normalize_path(source);
        let rp = self
            .store
            .acquire_lease(&source, OpAcquireLease::new(LeaseDuration::Infinite))
            .await?;

        debug!("lease acquired on {}", source);
        Ok(rp.lease_id().to_string())
    }

    /// Release a lease previously acquired with [`Copier::protect`].
    pub async fn release(&self, source: &str, lease_id: &str) -> Result<()> {
        let source = normalize_path(source);
        self.store
            .release_lease(&source, OpReleaseLease::new(lease_id))
            .await?;

        debug!("lease released on {}", source);
        Ok(())
    }

    /// Renew a lease previously acquired with [`Copier::protect`].
    pub async fn renew(&self, source: &str, lease_id: &str) -> Result<()> {
        let source = normalize_path(source);
        self.store
            .renew_lease(&source, OpRenewLease::new(lease_id))
            .await?;
        Ok(())
    }

    /// Break the lease on `source` without knowing its id, forcibly ending
    /// another holder's exclusive access.
    pub async fn break_lease(&self, source: &str) -> Result<()> {
        let source = normalize_path(source);
        self.store
            .break_lease(&source, OpBreakLease::new())
            .await?;

        debug!("lease broken on {}", source);
        Ok(())
    }

    /// Copy with the source protected by an exclusive lease for the whole
    /// orchestration: acquire, start, wait under `policy`, release.
    ///
    /// The lease is released exactly once on every exit path: copy success,
    /// copy failure, polling budget exhaustion, and errors after
    /// acquisition. A lease acquisition failure aborts the orchestration
    /// before any copy is started. If the release itself fails the copy
    /// outcome still wins; the release error is logged.
    pub async fn start_protected(
        &self,
        source: &str,
        dest: &str,
        opts: CopyOptions,
        policy: &PollPolicy,
    ) -> Result<CopyOperation> {
        let source = normalize_path(source);

        let lease_id = self.protect(&source).await?;

        let outcome = async {
            let op = self.start(&source, dest, opts).await?;
            self.wait(op, policy).await
        }
        .await;

        if let Err(err) = self.release(&source, &lease_id).await {
            warn!("failed to release lease on {} after copy: {}", source, err);
        }

        outcome
    }
}
