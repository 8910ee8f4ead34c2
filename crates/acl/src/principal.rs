/// How a downstream authorizer should compare this principal's name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CaseSensitivity {
    /// Names compare byte for byte.
    #[default]
    Sensitive,
    /// Names compare case-insensitively (Windows-style identities).
    Insensitive,
}

/// A user or group named by an access-control entry.
///
/// The rendered `name` already carries whatever domain notation the
/// configured [`AclFormat`](crate::AclFormat) prescribes; `domain` and
/// `namespace` are retained separately for consumers that key principals
/// by identity source rather than display string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    name: String,
    domain: Option<String>,
    namespace: Option<String>,
    case_sensitivity: CaseSensitivity,
}

impl Principal {
    /// Creates a user principal with a bare name and no domain.
    #[must_use]
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: None,
            namespace: None,
            case_sensitivity: CaseSensitivity::default(),
        }
    }

    /// Creates a group principal with a bare name and no domain.
    ///
    /// Identical in shape to [`Principal::user`]; the distinction between
    /// users and groups lives in which [`Acl`](crate::Acl) set the principal
    /// is stored in.
    #[must_use]
    pub fn group(name: impl Into<String>) -> Self {
        Self::user(name)
    }

    /// Creates a principal with an explicit domain.
    #[must_use]
    pub fn with_domain(name: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            domain: Some(domain.into()),
            namespace: None,
            case_sensitivity: CaseSensitivity::default(),
        }
    }

    /// Attaches an identity namespace.
    #[must_use]
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Overrides the comparison semantics advertised for this principal.
    #[must_use]
    pub fn with_case_sensitivity(mut self, case_sensitivity: CaseSensitivity) -> Self {
        self.case_sensitivity = case_sensitivity;
        self
    }

    /// The rendered principal name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The identity domain, if one was recorded.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// The identity namespace, if one was recorded.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Comparison semantics for this principal's name.
    #[must_use]
    pub const fn case_sensitivity(&self) -> CaseSensitivity {
        self.case_sensitivity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_defaults() {
        let p = Principal::user("alice");
        assert_eq!(p.name(), "alice");
        assert_eq!(p.domain(), None);
        assert_eq!(p.namespace(), None);
        assert_eq!(p.case_sensitivity(), CaseSensitivity::Sensitive);
    }

    #[test]
    fn builder_style_modifiers() {
        let p = Principal::with_domain("alice", "CORP")
            .in_namespace("ldap")
            .with_case_sensitivity(CaseSensitivity::Insensitive);
        assert_eq!(p.domain(), Some("CORP"));
        assert_eq!(p.namespace(), Some("ldap"));
        assert_eq!(p.case_sensitivity(), CaseSensitivity::Insensitive);
    }
}
