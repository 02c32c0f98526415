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

//! POSIX-style ACL model for hierarchical namespaces.
//!
//! ACL specs use the textual form the service documents, for example:
//!
//! - `user::rwx,group::r-x,other::r--` sets the base entries.
//! - `default:user:1234:r--` sets an inheritable entry for descendants
//!   created later.
//! - `user:1234` (no permission bits) names an entry for removal.

use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::str::FromStr;

use crate::Error;
use crate::ErrorKind;
use crate::Result;

/// Scope of an ACL entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AclScope {
    /// The entry applies to the node itself, immediately.
    Access,
    /// The entry is inherited by children created under the node later.
    /// Default entries never apply to files.
    Default,
}

/// Who an ACL entry applies to.
///
/// `User(None)` and `Group(None)` are the owning user and group; together
/// with `Other` they form the base entries that every node carries and that
/// cannot be removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AclQualifier {
    /// The owning user (`None`) or a named user by object id.
    User(Option<String>),
    /// The owning group (`None`) or a named group by object id.
    Group(Option<String>),
    /// Everyone else.
    Other,
    /// The mask bounding the effective permissions of named entries.
    Mask,
}

impl AclQualifier {
    /// Base entries are the owning user, owning group and other. They exist
    /// on every node and cannot be removed.
    pub fn is_base(&self) -> bool {
        matches!(
            self,
            AclQualifier::User(None) | AclQualifier::Group(None) | AclQualifier::Other
        )
    }

    fn tag(&self) -> &'static str {
        match self {
            AclQualifier::User(_) => "user",
            AclQualifier::Group(_) => "group",
            AclQualifier::Other => "other",
            AclQualifier::Mask => "mask",
        }
    }

    fn name(&self) -> &str {
        match self {
            AclQualifier::User(Some(n)) | AclQualifier::Group(Some(n)) => n,
            _ => "",
        }
    }
}

/// Read/write/execute permission bits of one ACL entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct AclPermissions {
    /// Read bit.
    pub read: bool,
    /// Write bit.
    pub write: bool,
    /// Execute (traverse, for directories) bit.
    pub execute: bool,
}

impl Display for AclPermissions {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            if self.read { 'r' } else { '-' },
            if self.write { 'w' } else { '-' },
            if self.execute { 'x' } else { '-' },
        )
    }
}

impl FromStr for AclPermissions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bs = s.as_bytes();
        if bs.len() != 3 {
            return Err(
                Error::new(ErrorKind::ConfigInvalid, "permissions must be three characters")
                    .with_context("permissions", s),
            );
        }

        let bit = |b: u8, on: u8| -> Result<bool> {
            if b == on {
                Ok(true)
            } else if b == b'-' {
                Ok(false)
            } else {
                Err(
                    Error::new(ErrorKind::ConfigInvalid, "invalid permission character")
                        .with_context("permissions", s),
                )
            }
        };

        Ok(AclPermissions {
            read: bit(bs[0], b'r')?,
            write: bit(bs[1], b'w')?,
            execute: bit(bs[2], b'x')?,
        })
    }
}

/// One ACL entry: scope, qualifier and optional permission bits.
///
/// Permissions are absent only in remove specs, where the entry merely names
/// what to strip.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AclEntry {
    /// Scope of the entry.
    pub scope: AclScope,
    /// Who the entry applies to.
    pub qualifier: AclQualifier,
    /// Permission bits; `None` in remove specs.
    pub permissions: Option<AclPermissions>,
}

impl AclEntry {
    /// Create an access-scope entry.
    pub fn access(qualifier: AclQualifier, permissions: AclPermissions) -> Self {
        Self {
            scope: AclScope::Access,
            qualifier,
            permissions: Some(permissions),
        }
    }

    /// Create a default-scope entry.
    pub fn default_scope(qualifier: AclQualifier, permissions: AclPermissions) -> Self {
        Self {
            scope: AclScope::Default,
            qualifier,
            permissions: Some(permissions),
        }
    }

    /// Two entries refer to the same slot when scope and qualifier match.
    pub fn same_slot(&self, other: &AclEntry) -> bool {
        self.scope == other.scope && self.qualifier == other.qualifier
    }
}

impl Display for AclEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.scope == AclScope::Default {
            write!(f, "default:")?;
        }
        write!(f, "{}:{}", self.qualifier.tag(), self.qualifier.name())?;
        if let Some(perms) = &self.permissions {
            write!(f, ":{perms}")?;
        }
        Ok(())
    }
}

impl FromStr for AclEntry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::new(ErrorKind::ConfigInvalid, "invalid acl entry").with_context("entry", s)
        };

        let mut parts: Vec<&str> = s.split(':').collect();

        let scope = if parts.first() == Some(&"default") {
            parts.remove(0);
            AclScope::Default
        } else {
            AclScope::Access
        };

        // Remaining forms: `tag:name` (remove spec) or `tag:name:perms`,
        // where name may be empty for base and mask entries.
        let (tag, name, perms) = match parts.as_slice() {
            [tag, name] => (*tag, *name, None),
            [tag, name, perms] => (*tag, *name, Some(AclPermissions::from_str(perms)?)),
            _ => return Err(invalid()),
        };

        let name = if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        };

        let qualifier = match tag {
            "user" => AclQualifier::User(name),
            "group" => AclQualifier::Group(name),
            "other" if name.is_none() => AclQualifier::Other,
            "mask" if name.is_none() => AclQualifier::Mask,
            _ => return Err(invalid()),
        };

        Ok(AclEntry {
            scope,
            qualifier,
            permissions: perms,
        })
    }
}

/// An ordered list of ACL entries, round-tripping with the comma-separated
/// textual form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AclSpec {
    entries: Vec<AclEntry>,
}

impl AclSpec {
    /// Build a spec from entries.
    pub fn from_entries(entries: Vec<AclEntry>) -> Self {
        Self { entries }
    }

    /// All entries, in order.
    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    /// Whether the spec carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge `update` into self: entries matching an existing slot (scope
    /// and qualifier) replace its permissions, new slots are appended, and
    /// untouched entries stay as they are.
    pub fn merge(&self, update: &AclSpec) -> AclSpec {
        let mut entries = self.entries.clone();
        for entry in &update.entries {
            match entries.iter_mut().find(|e| e.same_slot(entry)) {
                Some(slot) => slot.permissions = entry.permissions,
                None => entries.push(entry.clone()),
            }
        }
        AclSpec { entries }
    }

    /// Strip the slots named by `remove` from self. Callers must not name
    /// base entries; see [`AclQualifier::is_base`].
    pub fn strip(&self, remove: &AclSpec) -> AclSpec {
        let entries = self
            .entries
            .iter()
            .filter(|e| !remove.entries.iter().any(|r| r.same_slot(e)))
            .cloned()
            .collect();
        AclSpec { entries }
    }

    /// Entries restricted to one scope.
    pub fn with_scope(&self, scope: AclScope) -> AclSpec {
        let entries = self
            .entries
            .iter()
            .filter(|e| e.scope == scope)
            .cloned()
            .collect();
        AclSpec { entries }
    }
}

impl Display for AclSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{entry}")?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for AclSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().is_empty() {
            return Err(Error::new(
                ErrorKind::ConfigInvalid,
                "acl spec must not be empty",
            ));
        }

        let entries = s
            .split(',')
            .map(|part| AclEntry::from_str(part.trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(AclSpec { entries })
    }
}

/// How an ACL change applies to each visited node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AclMode {
    /// Overwrite the full entry set at every node.
    Set,
    /// Merge the supplied entries into each node's existing ACL.
    Update,
    /// Strip only the named entries; base entries cannot be removed.
    Remove,
}

impl AclMode {
    /// Convert self into static str.
    pub fn into_static(self) -> &'static str {
        match self {
            AclMode::Set => "set",
            AclMode::Update => "update",
            AclMode::Remove => "remove",
        }
    }
}

impl Display for AclMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.into_static())
    }
}

/// Success and failure counters for one propagation invocation.
///
/// Counters are monotonically non-decreasing within one invocation; batches
/// only ever add to them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AclCounters {
    /// Directories changed successfully.
    pub directories_succeeded: u64,
    /// Files changed successfully.
    pub files_succeeded: u64,
    /// Nodes that could not be changed.
    pub failure_count: u64,
}

impl AclCounters {
    /// Fold another batch's counters into self.
    pub fn absorb(&mut self, other: AclCounters) {
        self.directories_succeeded += other.directories_succeeded;
        self.files_succeeded += other.files_succeeded;
        self.failure_count += other.failure_count;
    }

    /// Total nodes visited: successes plus failures.
    pub fn total(&self) -> u64 {
        self.directories_succeeded + self.files_succeeded + self.failure_count
    }
}

/// One node the service failed to change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AclFailedEntry {
    /// Path of the failed node.
    pub path: String,
    /// Whether the node is a directory.
    pub is_directory: bool,
    /// Service-reported reason.
    pub message: String,
}

/// A recursive ACL change over the subtree rooted at `root`.
#[derive(Clone, Debug)]
pub struct AclChangeRequest {
    root: String,
    acl: AclSpec,
    mode: AclMode,

    continuation: Option<String>,
    continue_on_failure: bool,
    max_failures: Option<u64>,
    batch_size: Option<usize>,
    max_batches: Option<usize>,
}

impl AclChangeRequest {
    fn new(root: impl Into<String>, acl: AclSpec, mode: AclMode) -> Self {
        Self {
            root: root.into(),
            acl,
            mode,
            continuation: None,
            continue_on_failure: false,
            max_failures: None,
            batch_size: None,
            max_batches: None,
        }
    }

    /// Overwrite the full ACL at every node under `root`.
    pub fn set(root: impl Into<String>, acl: AclSpec) -> Self {
        Self::new(root, acl, AclMode::Set)
    }

    /// Merge the supplied entries into every node under `root`.
    pub fn update(root: impl Into<String>, acl: AclSpec) -> Self {
        Self::new(root, acl, AclMode::Update)
    }

    /// Strip the named entries from every node under `root`.
    pub fn remove(root: impl Into<String>, acl: AclSpec) -> Self {
        Self::new(root, acl, AclMode::Remove)
    }

    /// Resume from a continuation token returned by a prior invocation.
    pub fn with_continuation(mut self, token: impl Into<String>) -> Self {
        self.continuation = Some(token.into());
        self
    }

    /// Count node failures and keep walking instead of halting on the first
    /// one.
    pub fn with_continue_on_failure(mut self) -> Self {
        self.continue_on_failure = true;
        self
    }

    /// Stop the walk once this many failures have been counted.
    pub fn with_max_failures(mut self, max_failures: u64) -> Self {
        self.max_failures = Some(max_failures);
        self
    }

    /// Ask the service for at most this many nodes per batch.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Pause after this many batches, returning a continuation token.
    pub fn with_max_batches(mut self, max_batches: usize) -> Self {
        self.max_batches = Some(max_batches);
        self
    }

    /// The subtree root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// The ACL spec to apply.
    pub fn acl(&self) -> &AclSpec {
        &self.acl
    }

    /// How the spec applies to each node.
    pub fn mode(&self) -> AclMode {
        self.mode
    }

    /// The resumption cursor, if any.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Whether node failures are counted instead of halting the walk.
    pub fn continue_on_failure(&self) -> bool {
        self.continue_on_failure
    }

    /// The failure threshold, if any.
    pub fn max_failures(&self) -> Option<u64> {
        self.max_failures
    }

    /// The requested batch size, if any.
    pub fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    /// The explicit-pause batch budget, if any.
    pub fn max_batches(&self) -> Option<usize> {
        self.max_batches
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |msg: &'static str| {
            Err(Error::new(ErrorKind::ConfigInvalid, msg).with_context("root", &self.root))
        };

        if self.root.trim_matches('/').is_empty() {
            return invalid("root path must not be empty");
        }
        if self.acl.is_empty() {
            return invalid("acl spec must not be empty");
        }
        if self.max_failures == Some(0) {
            return invalid("max_failures must be at least 1");
        }
        if self.batch_size == Some(0) {
            return invalid("batch_size must be at least 1");
        }
        if self.max_batches == Some(0) {
            return invalid("max_batches must be at least 1");
        }

        for entry in self.acl.entries() {
            match self.mode {
                AclMode::Remove => {
                    if entry.permissions.is_some() {
                        return invalid("remove specs must not carry permission bits");
                    }
                    if entry.qualifier.is_base() {
                        return invalid("base entries cannot be removed");
                    }
                }
                AclMode::Set | AclMode::Update => {
                    if entry.permissions.is_none() {
                        return invalid("set and update specs must carry permission bits");
                    }
                }
            }
        }

        Ok(())
    }
}

/// Outcome of one propagation invocation.
#[derive(Clone, Debug)]
pub struct AclChangeResult {
    counters: AclCounters,
    continuation: Option<String>,
    failures: Vec<AclFailedEntry>,
}

impl AclChangeResult {
    pub(crate) fn new(
        counters: AclCounters,
        continuation: Option<String>,
        failures: Vec<AclFailedEntry>,
    ) -> Self {
        Self {
            counters,
            continuation,
            failures,
        }
    }

    /// Success and failure counters for this invocation.
    pub fn counters(&self) -> AclCounters {
        self.counters
    }

    /// The cursor to resume from; present iff the walk stopped before the
    /// full subtree was visited.
    pub fn continuation(&self) -> Option<&str> {
        self.continuation.as_deref()
    }

    /// Per-node failure details for this invocation.
    pub fn failures(&self) -> &[AclFailedEntry] {
        &self.failures
    }

    /// Whether the full subtree has been visited.
    pub fn is_complete(&self) -> bool {
        self.continuation.is_none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn spec(s: &str) -> AclSpec {
        s.parse().expect("spec must parse")
    }

    #[test]
    fn test_parse_base_entries() {
        let acl = spec("user::rwx,group::r-x,other::r--");
        assert_eq!(acl.entries().len(), 3);
        assert_eq!(acl.to_string(), "user::rwx,group::r-x,other::r--");
    }

    #[test]
    fn test_parse_default_scope_named_entry() {
        let acl = spec("default:user:1234:r--");
        let entry = &acl.entries()[0];
        assert_eq!(entry.scope, AclScope::Default);
        assert_eq!(entry.qualifier, AclQualifier::User(Some("1234".to_string())));
        assert_eq!(acl.to_string(), "default:user:1234:r--");
    }

    #[test]
    fn test_parse_remove_spec_has_no_permissions() {
        let acl = spec("user:1234,default:user:1234");
        assert!(acl.entries().iter().all(|e| e.permissions.is_none()));
        assert_eq!(acl.to_string(), "user:1234,default:user:1234");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<AclSpec>().is_err());
        assert!("user::rwxx".parse::<AclSpec>().is_err());
        assert!("alien::rwx".parse::<AclSpec>().is_err());
        assert!("other:1234:rwx".parse::<AclSpec>().is_err());
        assert!("user::rq-".parse::<AclSpec>().is_err());
    }

    #[test]
    fn test_merge_replaces_matching_slot_only() {
        let base = spec("user::rwx,group::r-x,other::r--,user:1234:r--");
        let update = spec("user:1234:rwx");

        let merged = base.merge(&update);
        assert_eq!(
            merged.to_string(),
            "user::rwx,group::r-x,other::r--,user:1234:rwx"
        );
    }

    #[test]
    fn test_merge_appends_new_slot() {
        let base = spec("user::rwx,group::r-x,other::r--");
        let update = spec("user:9999:r--");

        let merged = base.merge(&update);
        assert_eq!(
            merged.to_string(),
            "user::rwx,group::r-x,other::r--,user:9999:r--"
        );
    }

    #[test]
    fn test_strip_removes_named_entry_and_keeps_base() {
        let base = spec("user::rwx,group::r-x,other::r--,user:1234:r--");
        let remove = spec("user:1234");

        let stripped = base.strip(&remove);
        assert_eq!(stripped.to_string(), "user::rwx,group::r-x,other::r--");
    }

    #[test]
    fn test_request_validation() {
        let acl = spec("user::rwx,group::r-x,other::r--");

        assert!(AclChangeRequest::set("data", acl.clone()).validate().is_ok());
        assert!(AclChangeRequest::set("", acl.clone()).validate().is_err());
        assert!(AclChangeRequest::set("data", acl.clone())
            .with_max_failures(0)
            .validate()
            .is_err());

        // Remove specs must name entries without permission bits, and must
        // not name base entries.
        assert!(AclChangeRequest::remove("data", spec("user:1234"))
            .validate()
            .is_ok());
        assert!(AclChangeRequest::remove("data", spec("user:1234:rwx"))
            .validate()
            .is_err());
        assert!(AclChangeRequest::remove("data", spec("user:"))
            .validate()
            .is_err());

        assert!(AclChangeRequest::update("data", spec("user:1234"))
            .validate()
            .is_err());
    }
}
