use crate::{Acl, AclFormat, CaseSensitivity, Principal};

/// Whether an entry names an individual user or a group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AceKind {
    /// Individual user.
    User,
    /// Group of users.
    Group,
}

/// Whether an entry grants or withholds access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AceAccess {
    /// Entry grants read access.
    Allow,
    /// Entry withholds read access.
    Deny,
}

/// An access-control entry as read off a filesystem, before rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAce {
    /// Bare principal name.
    pub name: String,
    /// Identity domain, when the filesystem reports one.
    pub domain: Option<String>,
    /// User or group.
    pub kind: AceKind,
    /// Allow or deny.
    pub access: AceAccess,
}

impl RawAce {
    /// Convenience constructor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        domain: Option<&str>,
        kind: AceKind,
        access: AceAccess,
    ) -> Self {
        Self {
            name: name.into(),
            domain: domain.map(str::to_owned),
            kind,
            access,
        }
    }
}

/// Renders raw access-control entries into a finished [`Acl`].
///
/// The builder applies the configured user and group formats and, in legacy
/// (flat-ACL) mode, drops deny entries entirely: flat feeds cannot express
/// them, and emitting a partial deny set would be worse than omitting it.
#[derive(Clone, Debug)]
pub struct AclBuilder {
    user_format: AclFormat,
    group_format: AclFormat,
    namespace: Option<String>,
    case_sensitivity: CaseSensitivity,
    with_deny: bool,
}

impl AclBuilder {
    /// Creates a builder for inheritance-aware feeds (deny sets included).
    #[must_use]
    pub fn new(user_format: AclFormat, group_format: AclFormat) -> Self {
        Self {
            user_format,
            group_format,
            namespace: None,
            case_sensitivity: CaseSensitivity::default(),
            with_deny: true,
        }
    }

    /// Switches to legacy flat-ACL rendering: allow sets only.
    #[must_use]
    pub fn legacy(mut self) -> Self {
        self.with_deny = false;
        self
    }

    /// Stamps every rendered principal with an identity namespace.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Sets the comparison semantics advertised on rendered principals.
    #[must_use]
    pub fn case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    /// Renders `aces` into an [`Acl`].
    #[must_use]
    pub fn build(&self, aces: &[RawAce]) -> Acl {
        let mut allow_users = Vec::new();
        let mut allow_groups = Vec::new();
        let mut deny_users = Vec::new();
        let mut deny_groups = Vec::new();

        for ace in aces {
            let principal = self.render(ace);
            match (ace.access, ace.kind) {
                (AceAccess::Allow, AceKind::User) => allow_users.push(principal),
                (AceAccess::Allow, AceKind::Group) => allow_groups.push(principal),
                (AceAccess::Deny, _) if !self.with_deny => {}
                (AceAccess::Deny, AceKind::User) => deny_users.push(principal),
                (AceAccess::Deny, AceKind::Group) => deny_groups.push(principal),
            }
        }

        Acl::new(allow_users, allow_groups, deny_users, deny_groups)
    }

    fn render(&self, ace: &RawAce) -> Principal {
        let format = match ace.kind {
            AceKind::User => self.user_format,
            AceKind::Group => self.group_format,
        };
        let name = format.render(&ace.name, ace.domain.as_deref());
        let mut principal = match &ace.domain {
            Some(domain) => Principal::with_domain(name, domain.clone()),
            None => Principal::user(name),
        };
        if let Some(namespace) = &self.namespace {
            principal = principal.in_namespace(namespace.clone());
        }
        principal.with_case_sensitivity(self.case_sensitivity)
    }
}
