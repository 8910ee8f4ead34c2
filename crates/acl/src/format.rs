use crate::AclConfigError;

/// Notation used when rendering a principal for the feed.
///
/// The configuration surface spells these as `user`, `group`,
/// `domain\user`, `domain\group`, `user@domain`, and `group@domain`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AclFormat {
    /// Bare user name.
    User,
    /// Bare group name.
    Group,
    /// `DOMAIN\user`.
    DomainBackslashUser,
    /// `DOMAIN\group`.
    DomainBackslashGroup,
    /// `user@DOMAIN`.
    UserAtDomain,
    /// `group@DOMAIN`.
    GroupAtDomain,
}

impl AclFormat {
    /// Parses the configuration spelling of a format.
    pub fn from_config(value: &str) -> Result<Self, AclConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            "domain\\user" => Ok(Self::DomainBackslashUser),
            "domain\\group" => Ok(Self::DomainBackslashGroup),
            "user@domain" => Ok(Self::UserAtDomain),
            "group@domain" => Ok(Self::GroupAtDomain),
            _ => Err(AclConfigError::new("ACL format", value)),
        }
    }

    /// Renders a principal name under this format.
    ///
    /// Formats that reference a domain fall back to the bare name when the
    /// entry carried none.
    #[must_use]
    pub fn render(&self, name: &str, domain: Option<&str>) -> String {
        match (self, domain) {
            (Self::User | Self::Group, _) | (_, None) => name.to_owned(),
            (Self::DomainBackslashUser | Self::DomainBackslashGroup, Some(domain)) => {
                format!("{domain}\\{name}")
            }
            (Self::UserAtDomain | Self::GroupAtDomain, Some(domain)) => {
                format!("{name}@{domain}")
            }
        }
    }
}

/// Which ACLs gate access to a file, as configured by `aceSecurityLevel`.
///
/// The crawler does not evaluate access itself; the level decides which ACL
/// documents are emitted and how the inheritance chain is wired so the
/// downstream index reproduces the chosen conjunction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AceSecurityLevel {
    /// The file ACL alone decides.
    File,
    /// The share ACL alone decides.
    Share,
    /// Either ACL may grant access.
    FileOrShare,
    /// Both ACLs must grant access.
    #[default]
    FileAndShare,
}

impl AceSecurityLevel {
    /// Parses the configuration spelling of a security level.
    pub fn from_config(value: &str) -> Result<Self, AclConfigError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "FILE" => Ok(Self::File),
            "SHARE" => Ok(Self::Share),
            "FILEORSHARE" => Ok(Self::FileOrShare),
            "FILEANDSHARE" => Ok(Self::FileAndShare),
            _ => Err(AclConfigError::new("ACE security level", value)),
        }
    }

    /// True if file-level ACLs participate in the access decision.
    #[must_use]
    pub const fn includes_file(&self) -> bool {
        matches!(self, Self::File | Self::FileOrShare | Self::FileAndShare)
    }

    /// True if share-level ACLs participate in the access decision.
    #[must_use]
    pub const fn includes_share(&self) -> bool {
        matches!(self, Self::Share | Self::FileOrShare | Self::FileAndShare)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_format_spellings() {
        assert_eq!(AclFormat::from_config("user").unwrap(), AclFormat::User);
        assert_eq!(
            AclFormat::from_config("domain\\user").unwrap(),
            AclFormat::DomainBackslashUser
        );
        assert_eq!(
            AclFormat::from_config("Domain\\Group").unwrap(),
            AclFormat::DomainBackslashGroup
        );
        assert_eq!(
            AclFormat::from_config("group@domain").unwrap(),
            AclFormat::GroupAtDomain
        );
        assert!(AclFormat::from_config("sid").is_err());
    }

    #[test]
    fn renders_with_and_without_domain() {
        let fmt = AclFormat::DomainBackslashUser;
        assert_eq!(fmt.render("alice", Some("CORP")), "CORP\\alice");
        assert_eq!(fmt.render("alice", None), "alice");

        let fmt = AclFormat::UserAtDomain;
        assert_eq!(fmt.render("alice", Some("corp.example")), "alice@corp.example");

        let fmt = AclFormat::User;
        assert_eq!(fmt.render("alice", Some("CORP")), "alice");
    }

    #[test]
    fn security_level_participation() {
        assert!(AceSecurityLevel::File.includes_file());
        assert!(!AceSecurityLevel::File.includes_share());
        assert!(AceSecurityLevel::Share.includes_share());
        assert!(!AceSecurityLevel::Share.includes_file());
        assert!(AceSecurityLevel::FileAndShare.includes_file());
        assert!(AceSecurityLevel::FileAndShare.includes_share());
        assert_eq!(
            AceSecurityLevel::from_config("fileorshare").unwrap(),
            AceSecurityLevel::FileOrShare
        );
        assert!(AceSecurityLevel::from_config("none").is_err());
    }
}
