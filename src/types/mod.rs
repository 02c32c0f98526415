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

mod error;
pub use error::Error;
pub use error::ErrorKind;
pub use error::Result;

mod copy;
pub use copy::AccessTier;
pub use copy::CopyOperation;
pub use copy::CopyOptions;
pub use copy::CopyProgress;
pub use copy::CopyStatus;
pub use copy::PollPolicy;
pub use copy::RehydratePriority;

mod acl;
pub use acl::AclChangeRequest;
pub use acl::AclChangeResult;
pub use acl::AclCounters;
pub use acl::AclEntry;
pub use acl::AclFailedEntry;
pub use acl::AclMode;
pub use acl::AclPermissions;
pub use acl::AclQualifier;
pub use acl::AclScope;
pub use acl::AclSpec;

mod orchestrator;
pub use orchestrator::AclPropagator;
pub use orchestrator::Copier;
