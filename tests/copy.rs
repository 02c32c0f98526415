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

use std::sync::Arc;
use std::time::Duration;

use stratus::services::MemoryBuilder;
use stratus::services::MemoryStore;
use stratus::AccessTier;
use stratus::Copier;
use stratus::CopyOptions;
use stratus::CopyStatus;
use stratus::ErrorKind;
use stratus::PollPolicy;
use stratus::RehydratePriority;
use stratus::Result;

fn setup(builder: MemoryBuilder) -> Result<(Copier, MemoryStore)> {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = builder.build()?;
    Ok((Copier::new(Arc::new(store.clone())), store))
}

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new()
        .with_interval(Duration::from_millis(10))
        .with_max_attempts(max_attempts)
}

#[tokio::test]
async fn test_synchronous_copy_needs_no_polling() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("logs/app.log", 128);

    let op = copier
        .start("logs/app.log", "archive/app.log", CopyOptions::new())
        .await?;
    assert_eq!(op.status(), CopyStatus::Success);
    assert!(op.copy_id().is_none());

    // An already-terminal operation returns without touching the service.
    let op = copier.wait(op, &PollPolicy::default()).await?;
    assert_eq!(op.status(), CopyStatus::Success);
    assert_eq!(store.stats().status_checks, 0);
    assert!(store.exists("archive/app.log"));
    Ok(())
}

#[tokio::test]
async fn test_zero_byte_copy_completes_synchronously() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(10))?;
    store.create_file("empty.bin", 0);

    let op = copier
        .start("empty.bin", "copy.bin", CopyOptions::new())
        .await?;
    assert_eq!(op.status(), CopyStatus::Success);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_stops_at_the_polling_budget() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(100))?;
    store.create_file("big.bin", 1 << 30);

    let op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    assert_eq!(op.status(), CopyStatus::Pending);

    let op = copier.wait(op, &fast_policy(3)).await?;

    // The budget ran out; the copy is handed back still pending, with its
    // id intact so the caller can abort or keep polling.
    assert_eq!(op.status(), CopyStatus::Pending);
    assert!(op.copy_id().is_some());
    assert_eq!(store.stats().status_checks, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_wait_returns_as_soon_as_terminal() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(2))?;
    store.create_file("big.bin", 1 << 20);

    let op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    let op = copier.wait(op, &fast_policy(5)).await?;

    assert_eq!(op.status(), CopyStatus::Success);
    assert!(op.copy_id().is_none());
    assert!(op.completed_at().is_some());
    assert_eq!(store.stats().status_checks, 2);
    assert!(store.exists("copy.bin"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_temporary_poll_errors_consume_the_budget() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(1).flaky_status(2))?;
    store.create_file("big.bin", 1 << 20);

    let op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    let op = copier.wait(op, &fast_policy(5)).await?;

    // Two flaky checks plus the one that saw completion.
    assert_eq!(op.status(), CopyStatus::Success);
    assert_eq!(store.stats().status_checks, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_flaky_service_can_exhaust_the_budget() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(1).flaky_status(10))?;
    store.create_file("big.bin", 1 << 20);

    let op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    let op = copier.wait(op, &fast_policy(3)).await?;

    assert_eq!(op.status(), CopyStatus::Pending);
    assert_eq!(store.stats().status_checks, 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_copy_is_terminal() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(1).fail_copies())?;
    store.create_file("big.bin", 1 << 20);

    let op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    let op = copier.wait(op, &fast_policy(5)).await?;

    assert_eq!(op.status(), CopyStatus::Failed);
    assert!(op.copy_id().is_none());
    assert!(!store.exists("copy.bin"));
    Ok(())
}

#[tokio::test]
async fn test_abort_pending_copy() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(100))?;
    store.create_file("big.bin", 1 << 20);

    let mut op = copier.start("big.bin", "copy.bin", CopyOptions::new()).await?;
    copier.abort(&mut op).await?;
    assert_eq!(op.status(), CopyStatus::Aborted);
    assert!(op.copy_id().is_none());

    // Aborted is terminal; a second abort is rejected.
    let err = copier.abort(&mut op).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn test_start_rejects_missing_source() -> Result<()> {
    let (copier, _) = setup(MemoryBuilder::default())?;

    let err = copier
        .start("nope.bin", "copy.bin", CopyOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

#[tokio::test]
async fn test_start_rejects_same_path() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("a.bin", 1);

    let err = copier
        .start("a.bin", "/a.bin/", CopyOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IsSameFile);
    Ok(())
}

#[tokio::test]
async fn test_overwrite_is_opt_in() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("a.bin", 1);
    store.create_file("b.bin", 1);

    let err = copier
        .start("a.bin", "b.bin", CopyOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let op = copier
        .start("a.bin", "b.bin", CopyOptions::new().with_overwrite())
        .await?;
    assert_eq!(op.status(), CopyStatus::Success);
    Ok(())
}

#[tokio::test]
async fn test_archived_source_requires_rehydrate_priority() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("cold.bin", 64);
    store.set_tier("cold.bin", AccessTier::Archive);

    let err = copier
        .start("cold.bin", "warm.bin", CopyOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    let op = copier
        .start(
            "cold.bin",
            "warm.bin",
            CopyOptions::new()
                .with_rehydrate_priority(RehydratePriority::High)
                .with_access_tier(AccessTier::Hot),
        )
        .await?;
    assert_eq!(op.status(), CopyStatus::Success);
    assert_eq!(store.tier_of("warm.bin"), Some(AccessTier::Hot));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_protected_copy_releases_the_lease_on_success() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(2))?;
    store.create_file("src.bin", 1 << 20);

    let op = copier
        .start_protected("src.bin", "dst.bin", CopyOptions::new(), &fast_policy(5))
        .await?;

    assert_eq!(op.status(), CopyStatus::Success);
    assert!(!store.lease_held("src.bin"));
    assert_eq!(store.stats().leases_acquired, 1);
    assert_eq!(store.stats().leases_released, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_protected_copy_releases_the_lease_on_failure() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(1).fail_copies())?;
    store.create_file("src.bin", 1 << 20);

    let op = copier
        .start_protected("src.bin", "dst.bin", CopyOptions::new(), &fast_policy(5))
        .await?;

    assert_eq!(op.status(), CopyStatus::Failed);
    assert!(!store.lease_held("src.bin"));
    assert_eq!(store.stats().leases_released, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_protected_copy_releases_the_lease_when_budget_runs_out() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default().copy_polls(100))?;
    store.create_file("src.bin", 1 << 20);

    let op = copier
        .start_protected("src.bin", "dst.bin", CopyOptions::new(), &fast_policy(2))
        .await?;

    assert_eq!(op.status(), CopyStatus::Pending);
    assert!(!store.lease_held("src.bin"));
    assert_eq!(store.stats().leases_released, 1);
    Ok(())
}

#[tokio::test]
async fn test_protected_copy_releases_the_lease_when_start_fails() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("src.bin", 1);
    store.create_file("dst.bin", 1);

    let err = copier
        .start_protected("src.bin", "dst.bin", CopyOptions::new(), &fast_policy(2))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(!store.lease_held("src.bin"));
    assert_eq!(store.stats().leases_released, 1);
    Ok(())
}

#[tokio::test]
async fn test_protected_copy_aborts_when_source_is_already_leased() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("src.bin", 1);

    let other = copier.protect("src.bin").await?;

    let err = copier
        .start_protected("src.bin", "dst.bin", CopyOptions::new(), &fast_policy(2))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert!(!store.exists("dst.bin"));

    copier.release("src.bin", &other).await?;
    Ok(())
}

#[tokio::test]
async fn test_break_lease_forcibly_ends_the_hold() -> Result<()> {
    let (copier, store) = setup(MemoryBuilder::default())?;
    store.create_file("src.bin", 1);

    let lease_id = copier.protect("src.bin").await?;
    copier.renew("src.bin", &lease_id).await?;

    copier.break_lease("src.bin").await?;
    assert!(!store.lease_held("src.bin"));

    // Releasing a lease that no longer exists is an error.
    let err = copier.release("src.bin", &lease_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    Ok(())
}
