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

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::ExponentialBuilder;
use backon::Retryable;
use log::warn;

use crate::raw::*;
use crate::*;

/// Add retry for temporarily failed store requests.
///
/// # Notes
///
/// This layer retries a request when [`Error::is_temporary`] returns true.
/// If the request still fails after the configured backoff is exhausted, the
/// error is marked persistent, which means it has already been retried.
///
/// The copy polling loop in [`Copier::wait`][crate::Copier::wait] is NOT a
/// retry mechanism and stays bounded by its own [`PollPolicy`]; this layer
/// only covers the store's individual request/response exchanges, the way a
/// service client applies its configured retry options.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use stratus::layers::RetryLayer;
/// use stratus::services::MemoryBuilder;
/// use stratus::Copier;
/// use stratus::Result;
///
/// fn main() -> Result<()> {
///     let store = MemoryBuilder::default().build()?;
///     let store = RetryLayer::new().with_jitter().layer(Arc::new(store));
///     let _ = Copier::new(store);
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct RetryLayer(ExponentialBuilder);

impl RetryLayer {
    /// Create a new retry layer with the default exponential backoff.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set jitter of current backoff.
    ///
    /// If jitter is enabled, a random value in `[0, min_delay)` is added to
    /// the current delay.
    pub fn with_jitter(mut self) -> Self {
        self.0 = self.0.with_jitter();
        self
    }

    /// Set factor of current backoff.
    ///
    /// # Panics
    ///
    /// This function will panic if input factor is smaller than `1.0`.
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.0 = self.0.with_factor(factor);
        self
    }

    /// Set min_delay of current backoff.
    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.0 = self.0.with_min_delay(min_delay);
        self
    }

    /// Set max_delay of current backoff.
    ///
    /// Delay will not increase if the current delay is larger than
    /// max_delay.
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.0 = self.0.with_max_delay(max_delay);
        self
    }

    /// Set max_times of current backoff.
    ///
    /// Backoff stops retrying once max times is reached.
    pub fn with_max_times(mut self, max_times: usize) -> Self {
        self.0 = self.0.with_max_times(max_times);
        self
    }

    /// Wrap a store with this retry policy.
    pub fn layer(&self, inner: StoreRef) -> StoreRef {
        Arc::new(RetryStore {
            inner,
            builder: self.0,
        })
    }
}

#[derive(Debug)]
struct RetryStore {
    inner: StoreRef,
    builder: ExponentialBuilder,
}

impl RetryStore {
    async fn with_retry<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        f.retry(self.builder)
            .when(|e: &Error| e.is_temporary())
            .notify(|err: &Error, dur: Duration| {
                warn!("{operation} failed temporarily, retrying after {dur:?}: {err}");
            })
            .await
            .map_err(|e| {
                if e.is_temporary() {
                    e.set_persistent()
                } else {
                    e
                }
            })
    }
}

#[async_trait]
impl Store for RetryStore {
    fn info(&self) -> StoreInfo {
        self.inner.info()
    }

    async fn start_copy(&self, source: &str, dest: &str, args: OpStartCopy) -> Result<RpStartCopy> {
        self.with_retry("start_copy", || self.inner.start_copy(source, dest, args))
            .await
    }

    async fn copy_status(&self, dest: &str, args: OpCopyStatus) -> Result<RpCopyStatus> {
        self.with_retry("copy_status", || self.inner.copy_status(dest, args))
            .await
    }

    async fn abort_copy(&self, dest: &str, args: OpAbortCopy) -> Result<RpAbortCopy> {
        self.with_retry("abort_copy", || self.inner.abort_copy(dest, args.clone()))
            .await
    }

    async fn acquire_lease(&self, path: &str, args: OpAcquireLease) -> Result<RpAcquireLease> {
        self.with_retry("acquire_lease", || self.inner.acquire_lease(path, args))
            .await
    }

    async fn renew_lease(&self, path: &str, args: OpRenewLease) -> Result<RpRenewLease> {
        self.with_retry("renew_lease", || self.inner.renew_lease(path, args.clone()))
            .await
    }

    async fn release_lease(&self, path: &str, args: OpReleaseLease) -> Result<RpReleaseLease> {
        self.with_retry("release_lease", || {
            self.inner.release_lease(path, args.clone())
        })
        .await
    }

    async fn break_lease(&self, path: &str, args: OpBreakLease) -> Result<RpBreakLease> {
        self.with_retry("break_lease", || self.inner.break_lease(path, args))
            .await
    }

    async fn get_acl(&self, path: &str, args: OpGetAcl) -> Result<RpGetAcl> {
        self.with_retry("get_acl", || self.inner.get_acl(path, args))
            .await
    }

    async fn set_acl(&self, path: &str, args: OpSetAcl) -> Result<RpSetAcl> {
        self.with_retry("set_acl", || self.inner.set_acl(path, args.clone()))
            .await
    }

    async fn apply_acl_batch(&self, root: &str, args: OpApplyAclBatch) -> Result<RpApplyAclBatch> {
        self.with_retry("apply_acl_batch", || {
            self.inner.apply_acl_batch(root, args.clone())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;

    #[derive(Debug, Default)]
    struct FlakyStore {
        failures_left: Mutex<u32>,
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl Store for FlakyStore {
        fn info(&self) -> StoreInfo {
            StoreInfo::new(
                "flaky",
                Capability {
                    lease: true,
                    ..Capability::default()
                },
            )
        }

        async fn break_lease(&self, _: &str, _: OpBreakLease) -> Result<RpBreakLease> {
            *self.calls.lock().unwrap() += 1;

            let mut left = self.failures_left.lock().unwrap();
            if *left > 0 {
                *left -= 1;
                return Err(
                    Error::new(ErrorKind::RateLimited, "simulated throttle").set_temporary()
                );
            }
            Ok(RpBreakLease::default())
        }
    }

    #[tokio::test]
    async fn test_retry_absorbs_temporary_errors() {
        let flaky = Arc::new(FlakyStore {
            failures_left: Mutex::new(2),
            calls: Mutex::new(0),
        });

        let store = RetryLayer::new()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(4)
            .layer(flaky.clone());

        store
            .break_lease("path", OpBreakLease::new())
            .await
            .expect("must succeed after retries");
        assert_eq!(*flaky.calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn test_retry_marks_exhausted_errors_persistent() {
        let flaky = Arc::new(FlakyStore {
            failures_left: Mutex::new(u32::MAX),
            calls: Mutex::new(0),
        });

        let store = RetryLayer::new()
            .with_min_delay(Duration::from_millis(1))
            .with_max_times(2)
            .layer(flaky);

        let err = store
            .break_lease("path", OpBreakLease::new())
            .await
            .expect_err("must fail");
        assert!(!err.is_temporary());
    }
}
