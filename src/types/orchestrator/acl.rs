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

use crate::raw::*;
use crate::*;

/// AclPropagator applies an ACL change across a directory subtree, batch by
/// batch, tracking per-invocation counters and supporting exact resumption
/// from a continuation token.
///
/// The walk is path-ordered and sequential. A non-empty continuation token
/// in the result means the subtree was not fully visited: the walk halted
/// on a failure, hit the failure threshold, or paused after the configured
/// number of batches. Resuming from the token visits exactly the remaining
/// nodes, never revisiting an already-changed one.
///
/// # Examples
///
/// ```no_run
/// # use std::sync::Arc;
/// # use stratus::services::MemoryBuilder;
/// # use stratus::AclChangeRequest;
/// # use stratus::AclPropagator;
/// # use stratus::Result;
/// # async fn example() -> Result<()> {
/// let propagator = AclPropagator::new(Arc::new(MemoryBuilder::default().build()?));
///
/// let request = AclChangeRequest::set(
///     "my-parent-directory",
///     "user::rwx,group::rwx,other::rwx".parse()?,
/// )
/// .with_continue_on_failure();
///
/// let result = propagator.apply(&request).await?;
/// println!(
///     "{} directories and {} files were updated successfully, {} failures were counted",
///     result.counters().directories_succeeded,
///     result.counters().files_succeeded,
///     result.counters().failure_count,
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct AclPropagator {
    store: StoreRef,
}

impl AclPropagator {
    /// Create a new `AclPropagator` over the given store.
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

    /// Read the ACL of a single path.
    pub async fn get_acl(&self, path: &str) -> Result<AclSpec> {
        self.require(self.store.info().capability().acl, "AclPropagator::get_acl")?;

        let path = normalize_path(path);
        let rp = self.store.get_acl(&path, OpGetAcl::new()).await?;
        Ok(rp.into_acl())
    }

    /// Overwrite the ACL of a single path.
    pub async fn set_acl(&self, path: &str, acl: AclSpec) -> Result<()> {
        self.require(self.store.info().capability().acl, "AclPropagator::set_acl")?;

        let path = normalize_path(path);
        self.store.set_acl(&path, OpSetAcl::new(acl)).await?;
        Ok(())
    }

    /// Walk the subtree rooted at the request's root and apply the ACL
    /// change to every visited node.
    ///
    /// The walk stops, returning a result with a continuation token, when:
    ///
    /// - a node fails and `continue_on_failure` is off (the token resumes
    ///   past the failed node),
    /// - the `max_failures` threshold is reached,
    /// - `max_batches` batches have been issued (explicit pause).
    ///
    /// Counters and failure details always reflect the nodes visited in
    /// this invocation; partial progress is never silently discarded.
    pub async fn apply(&self, request: &AclChangeRequest) -> Result<AclChangeResult> {
        self.require(
            self.store.info().capability().acl_recursive,
            "AclPropagator::apply",
        )?;
        request.validate()?;

        let root = normalize_path(request.root());

        let mut counters = AclCounters::default();
        let mut failures = Vec::new();
        let mut continuation = request.continuation().map(|t| t.to_string());
        let mut batches = 0usize;

        loop {
            let args = OpApplyAclBatch::new(request.mode(), request.acl().clone())
                .with_continuation(continuation.clone())
                .with_batch_size(request.batch_size())
                .with_continue_on_failure(request.continue_on_failure());

            let rp = self
                .store
                .apply_acl_batch(&root, args)
                .await
                .map_err(|err| {
                    err.with_operation("AclPropagator::apply")
                        .with_context("root", &root)
                        .with_context("mode", request.mode())
                })?;

            let (batch_counters, batch_continuation, batch_failures) = rp.into_parts();
            counters.absorb(batch_counters);
            failures.extend(batch_failures);
            continuation = batch_continuation;
            batches += 1;

            if continuation.is_none() {
                break;
            }
            if !request.continue_on_failure() && counters.failure_count > 0 {
                // A single node failure aborts the walk; the token in the
                // result resumes past the failed node.
                break;
            }
            if let Some(max) = request.max_failures() {
                if counters.failure_count >= max {
                    break;
                }
            }
            if let Some(max) = request.max_batches() {
                if batches >= max {
                    break;
                }
            }
        }

        debug!(
            "acl {} on {}: {} directories and {} files updated, {} failures, complete={}",
            request.mode(),
            root,
            counters.directories_succeeded,
            counters.files_succeeded,
            counters.failure_count,
            continuation.is_none(),
        );

        Ok(AclChangeResult::new(counters, continuation, failures))
    }

    /// Resume a partially-completed change from its continuation token.
    ///
    /// Fails with [`ErrorKind::ConfigInvalid`] when the request carries no
    /// token; otherwise behaves exactly like [`AclPropagator::apply`],
    /// starting where the prior invocation stopped.
    pub async fn resume(&self, request: &AclChangeRequest) -> Result<AclChangeResult> {
        if request.continuation().is_none() {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "resume requires a continuation token",
            )
            .with_operation("AclPropagator::resume")
            .with_context("root", request.root()));
        }

        self.apply(request).await
    }
}
