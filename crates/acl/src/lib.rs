#![deny(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `fscrawl_acl` models the access-control information the crawler reads off
//! filesystems and attaches to feed documents. An [`Acl`] carries four sets of
//! [`Principal`]s (allow/deny crossed with user/group) plus two flags: `public`
//! marks a resource readable by any authenticated user, and `determinate`
//! records whether resolution succeeded at all. A non-determinate ACL is a
//! sentinel — it must never be serialized into a feed; downstream consumers
//! fall back to per-request authorization instead.
//!
//! Principal rendering is controlled by [`AclFormat`], which mirrors the
//! notations accepted by the configuration surface (`user`, `domain\user`,
//! `user@domain`, and the group equivalents). [`AclBuilder`] turns raw access
//! control entries, as read from a filesystem, into a finished [`Acl`] under a
//! configured pair of formats.
//!
//! # Invariants
//!
//! - A public ACL carries no principals.
//! - A non-determinate ACL compares equal to [`Acl::use_head_request`] and is
//!   suppressed by every serialization path.
//! - Legacy (flat) ACL mode only populates the allow sets; deny sets are
//!   reserved for inheritance-aware feeds.

mod builder;
mod format;
mod principal;

pub use builder::{AceAccess, AceKind, AclBuilder, RawAce};
pub use format::{AceSecurityLevel, AclFormat};
pub use principal::{CaseSensitivity, Principal};

use thiserror::Error;

/// Error raised when a configuration string does not name a known ACL
/// format or security level.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized {what} {value:?}")]
pub struct AclConfigError {
    what: &'static str,
    value: String,
}

impl AclConfigError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_owned(),
        }
    }
}

/// An access-control list attached to a file, directory, or share.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Acl {
    allow_users: Vec<Principal>,
    allow_groups: Vec<Principal>,
    deny_users: Vec<Principal>,
    deny_groups: Vec<Principal>,
    public: bool,
    determinate: bool,
}

impl Acl {
    /// Builds an ACL from explicit principal sets.
    #[must_use]
    pub fn new(
        allow_users: Vec<Principal>,
        allow_groups: Vec<Principal>,
        deny_users: Vec<Principal>,
        deny_groups: Vec<Principal>,
    ) -> Self {
        Self {
            allow_users,
            allow_groups,
            deny_users,
            deny_groups,
            public: false,
            determinate: true,
        }
    }

    /// Returns a determinate ACL naming no principals.
    ///
    /// Used when a security level excludes a tier of ACLs: the document is
    /// not public, it simply carries no principals of its own.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), Vec::new(), Vec::new())
    }

    /// Returns the ACL marking a resource readable by any authenticated user.
    #[must_use]
    pub fn public() -> Self {
        Self {
            public: true,
            ..Self::empty()
        }
    }

    /// Returns the sentinel for an ACL that could not be resolved.
    ///
    /// Consumers must not emit this ACL; the per-request authorization path
    /// is used instead.
    #[must_use]
    pub fn use_head_request() -> Self {
        Self {
            public: true,
            determinate: false,
            ..Self::empty()
        }
    }

    /// Principals allowed as individual users.
    #[must_use]
    pub fn allow_users(&self) -> &[Principal] {
        &self.allow_users
    }

    /// Principals allowed as groups.
    #[must_use]
    pub fn allow_groups(&self) -> &[Principal] {
        &self.allow_groups
    }

    /// Principals denied as individual users.
    #[must_use]
    pub fn deny_users(&self) -> &[Principal] {
        &self.deny_users
    }

    /// Principals denied as groups.
    #[must_use]
    pub fn deny_groups(&self) -> &[Principal] {
        &self.deny_groups
    }

    /// True if any authenticated user may read the resource.
    #[must_use]
    pub const fn is_public(&self) -> bool {
        self.public
    }

    /// True if ACL resolution succeeded.
    #[must_use]
    pub const fn is_determinate(&self) -> bool {
        self.determinate
    }

    /// True if the ACL names at least one principal.
    #[must_use]
    pub fn has_principals(&self) -> bool {
        !(self.allow_users.is_empty()
            && self.allow_groups.is_empty()
            && self.deny_users.is_empty()
            && self.deny_groups.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_acl_carries_no_principals() {
        let acl = Acl::public();
        assert!(acl.is_public());
        assert!(acl.is_determinate());
        assert!(!acl.has_principals());
    }

    #[test]
    fn head_request_sentinel_is_not_determinate() {
        let acl = Acl::use_head_request();
        assert!(!acl.is_determinate());
        assert_eq!(acl, Acl::use_head_request());
    }

    #[test]
    fn explicit_acl_is_determinate_and_not_public() {
        let acl = Acl::new(
            vec![Principal::user("alice")],
            vec![Principal::group("eng")],
            Vec::new(),
            Vec::new(),
        );
        assert!(acl.is_determinate());
        assert!(!acl.is_public());
        assert!(acl.has_principals());
        assert_eq!(acl.allow_users().len(), 1);
        assert_eq!(acl.allow_groups().len(), 1);
    }
}
