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

use stratus::services::MemoryBuilder;
use stratus::services::MemoryStore;
use stratus::AclChangeRequest;
use stratus::AclPropagator;
use stratus::AclSpec;
use stratus::ErrorKind;
use stratus::Result;

fn setup(builder: MemoryBuilder) -> Result<(AclPropagator, MemoryStore)> {
    let _ = env_logger::builder().is_test(true).try_init();

    let store = builder.build()?;
    Ok((AclPropagator::new(Arc::new(store.clone())), store))
}

/// data/ with three subdirectories of three files each: 13 nodes total
/// counting the root.
fn populate(store: &MemoryStore) {
    store.create_dir("data");
    for d in 0..3 {
        for f in 0..3 {
            store.create_file(&format!("data/d{d}/f{f}"), 64);
        }
    }
}

fn base() -> AclSpec {
    "user::rwx,group::r-x,other::r--".parse().expect("valid acl")
}

#[tokio::test]
async fn test_set_covers_the_whole_subtree() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let acl: AclSpec = "user::rwx,group::rwx,other::---".parse()?;
    let result = propagator
        .apply(&AclChangeRequest::set("data", acl.clone()))
        .await?;

    assert!(result.is_complete());
    assert_eq!(result.counters().directories_succeeded, 4);
    assert_eq!(result.counters().files_succeeded, 9);
    assert_eq!(result.counters().failure_count, 0);
    assert_eq!(result.counters().total(), store.visited().len() as u64);

    assert_eq!(store.acl_of("data"), Some(acl.clone()));
    assert_eq!(store.acl_of("data/d2/f1"), Some(acl));
    Ok(())
}

#[tokio::test]
async fn test_walk_does_not_leak_into_sibling_prefixes() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    store.create_file("data/f", 1);
    store.create_file("database/f", 1);

    let result = propagator
        .apply(&AclChangeRequest::set("data", base()))
        .await?;

    // `database/` shares the string prefix but is outside the subtree.
    assert_eq!(result.counters().total(), 2);
    Ok(())
}

#[tokio::test]
async fn test_continue_on_failure_counts_and_keeps_walking() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);
    store.deny("data/d0/f1");
    store.deny("data/d1");
    store.deny("data/d2/f2");

    let result = propagator
        .apply(&AclChangeRequest::set("data", base()).with_continue_on_failure())
        .await?;

    assert!(result.is_complete());
    assert_eq!(result.counters().failure_count, 3);
    assert_eq!(result.counters().total(), 13);
    assert_eq!(result.failures().len(), 3);

    let failed: Vec<&str> = result.failures().iter().map(|f| f.path.as_str()).collect();
    assert_eq!(failed, vec!["data/d0/f1", "data/d1", "data/d2/f2"]);
    assert!(result.failures()[1].is_directory);
    Ok(())
}

#[tokio::test]
async fn test_first_failure_halts_with_a_token() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);
    store.deny("data/d1");

    let result = propagator
        .apply(&AclChangeRequest::set("data", base()))
        .await?;

    assert!(!result.is_complete());
    assert_eq!(result.counters().failure_count, 1);
    assert_eq!(result.failures()[0].path, "data/d1");

    // Nodes past the failure were never touched.
    let visited = store.visited();
    assert!(!visited.contains(&"data/d2/f0".to_string()));

    // Fix the fault, resume past the failed node and finish the subtree.
    store.allow("data/d1");
    store.clear_visited();

    let token = result.continuation().expect("token present").to_string();
    let resumed = propagator
        .resume(&AclChangeRequest::set("data", base()).with_continuation(token))
        .await?;

    assert!(resumed.is_complete());
    let resumed_visited = store.visited();
    assert!(!resumed_visited.contains(&"data/d1".to_string()));
    // Every node counted exactly once across the two invocations; the
    // denied node shows up as the single failure.
    assert_eq!(result.counters().total() + resumed.counters().total(), 13);
    Ok(())
}

#[tokio::test]
async fn test_paused_walk_resumes_exactly_where_it_stopped() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let first = propagator
        .apply(
            &AclChangeRequest::set("data", base())
                .with_batch_size(4)
                .with_max_batches(1),
        )
        .await?;
    assert!(!first.is_complete());
    assert_eq!(first.counters().total(), 4);

    let first_visited = store.visited();
    store.clear_visited();

    let token = first.continuation().expect("token present").to_string();
    let second = propagator
        .resume(&AclChangeRequest::set("data", base()).with_continuation(token))
        .await?;
    assert!(second.is_complete());
    assert_eq!(second.counters().total(), 9);

    // The two visits are disjoint and together cover the subtree once.
    let second_visited = store.visited();
    assert!(first_visited.iter().all(|p| !second_visited.contains(p)));
    assert_eq!(first_visited.len() + second_visited.len(), 13);
    Ok(())
}

#[tokio::test]
async fn test_small_batches_still_cover_everything_in_one_call() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default().batch_size(2))?;
    populate(&store);

    let result = propagator
        .apply(&AclChangeRequest::set("data", base()))
        .await?;

    assert!(result.is_complete());
    assert_eq!(result.counters().total(), 13);
    assert_eq!(store.visited().len(), 13);
    Ok(())
}

#[tokio::test]
async fn test_max_failures_threshold_stops_the_walk() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default().batch_size(1))?;
    populate(&store);
    store.deny("data/d0/f0");
    store.deny("data/d0/f1");
    store.deny("data/d0/f2");

    let result = propagator
        .apply(
            &AclChangeRequest::set("data", base())
                .with_continue_on_failure()
                .with_max_failures(2),
        )
        .await?;

    assert!(!result.is_complete());
    assert_eq!(result.counters().failure_count, 2);
    Ok(())
}

#[tokio::test]
async fn test_resume_requires_a_token() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let err = propagator
        .resume(&AclChangeRequest::set("data", base()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    Ok(())
}

#[tokio::test]
async fn test_update_merges_into_existing_entries() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let update: AclSpec = "user:1234:r-x".parse()?;
    let result = propagator
        .apply(&AclChangeRequest::update("data", update))
        .await?;
    assert!(result.is_complete());

    // Base entries survive; the named entry is appended.
    let acl = store.acl_of("data/d0/f0").expect("node exists");
    assert_eq!(acl.to_string(), "user::rwx,group::r-x,other::r--,user:1234:r-x");
    Ok(())
}

#[tokio::test]
async fn test_default_entries_do_not_apply_to_files() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    store.create_dir("data");
    store.create_file("data/f", 1);

    let update: AclSpec = "default:user:1234:r--".parse()?;
    let result = propagator
        .apply(&AclChangeRequest::update("data", update))
        .await?;
    assert!(result.is_complete());

    let dir_acl = store.acl_of("data").expect("dir exists");
    assert!(dir_acl.to_string().contains("default:user:1234:r--"));

    // The file keeps exactly its base entries.
    let file_acl = store.acl_of("data/f").expect("file exists");
    assert_eq!(file_acl.to_string(), "user::rwx,group::r-x,other::r--");
    Ok(())
}

#[tokio::test]
async fn test_remove_strips_named_entries_and_keeps_base() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let update: AclSpec = "user:1234:rwx".parse()?;
    propagator
        .apply(&AclChangeRequest::update("data", update))
        .await?;

    let remove: AclSpec = "user:1234".parse()?;
    let result = propagator
        .apply(&AclChangeRequest::remove("data", remove))
        .await?;
    assert!(result.is_complete());

    let acl = store.acl_of("data/d1/f1").expect("node exists");
    assert_eq!(acl.to_string(), "user::rwx,group::r-x,other::r--");
    Ok(())
}

#[tokio::test]
async fn test_remove_rejects_base_entries() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    populate(&store);

    let remove: AclSpec = "user:".parse()?;
    let err = propagator
        .apply(&AclChangeRequest::remove("data", remove))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
    Ok(())
}

#[tokio::test]
async fn test_apply_rejects_a_file_root() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    store.create_file("data/f", 1);

    let err = propagator
        .apply(&AclChangeRequest::set("data/f", base()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    Ok(())
}

#[tokio::test]
async fn test_single_path_get_and_set() -> Result<()> {
    let (propagator, store) = setup(MemoryBuilder::default())?;
    store.create_file("data/f", 1);

    assert_eq!(propagator.get_acl("data/f").await?, base());

    let acl: AclSpec = "user::rw-,group::r--,other::---".parse()?;
    propagator.set_acl("data/f", acl.clone()).await?;
    assert_eq!(propagator.get_acl("data/f").await?, acl);

    store.deny("data/f");
    let err = propagator.set_acl("data/f", acl).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    let err = propagator.get_acl("data/nope").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}
