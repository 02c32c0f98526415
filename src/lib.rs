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

//! Stratus orchestrates long-running control operations over object storage
//! services: server-side copies protected by source leases and bounded
//! status polling, and recursive ACL changes over a hierarchical namespace
//! with exact resumption from continuation tokens.
//!
//! The storage service itself stays behind the [`raw::Store`] trait: it owns
//! the wire protocol, durability and authentication. Stratus only drives the
//! multi-step state handling on top of it. An in-memory store is shipped in
//! [`services`] for tests and local development.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use stratus::services::MemoryBuilder;
//! use stratus::Copier;
//! use stratus::CopyOptions;
//! use stratus::PollPolicy;
//! use stratus::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let store = MemoryBuilder::default().build()?;
//!     store.create_file("logs/2026-08-26.log", 4096);
//!
//!     let copier = Copier::new(Arc::new(store));
//!
//!     // Lease the source, start the copy and poll under a bounded budget.
//!     // The lease is released on every exit path.
//!     let op = copier
//!         .start_protected(
//!             "logs/2026-08-26.log",
//!             "archive/2026-08-26.log",
//!             CopyOptions::new(),
//!             &PollPolicy::default(),
//!         )
//!         .await?;
//!
//!     println!("copy finished with status {}", op.status());
//!     Ok(())
//! }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]
// Deny unused qualifications.
#![deny(unused_qualifications)]

// Private module with public types, they will be accessed via `stratus::Xxxx`
mod types;
pub use types::*;

// Public modules, they will be accessed like `stratus::layers::Xxxx`
pub mod layers;
pub mod raw;
pub mod services;
