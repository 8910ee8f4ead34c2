//! Configuration surface: the recognized options, their defaults, and the
//! translation into the per-crate option structs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use fscrawl_acl::{AceSecurityLevel, AclConfigError, AclFormat};
use fscrawl_feed::FeedOptions;
use fscrawl_filters::{FilePatternMatcher, PatternError};
use fscrawl_lister::{ListerSettings, TraverserConfig};
use fscrawl_vfs::{AclConfig, Credentials};

/// Error raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration file '{path}': {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML.
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The configuration is well-formed but inconsistent.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// An include/exclude pattern failed to compile.
    #[error(transparent)]
    Pattern(#[from] PatternError),
    /// An ACL format or security level was not recognized.
    #[error(transparent)]
    Acl(#[from] AclConfigError),
}

/// The crawler's configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CrawlerConfig {
    /// Traversal options.
    #[serde(default)]
    pub crawl: CrawlSection,
    /// ACL options.
    #[serde(default)]
    pub acl: AclSection,
    /// Schedule options for the bundled interval schedule.
    #[serde(default)]
    pub schedule: ScheduleSection,
    /// SMB credentials.
    #[serde(default)]
    pub credentials: Option<CredentialsSection>,
    /// NFS share URL prefix to local mount point.
    #[serde(default)]
    pub mounts: BTreeMap<String, String>,
}

/// `[crawl]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CrawlSection {
    /// Roots to crawl.
    pub start_paths: Vec<String>,
    /// Include patterns; defaults to the start paths themselves.
    pub include_patterns: Vec<String>,
    /// Exclude patterns.
    pub exclude_patterns: Vec<String>,
    /// Parallel traversers per cycle.
    pub thread_pool_size: usize,
    /// Minutes subtracted from the incremental cutoff.
    pub if_modified_since_cushion_minutes: i64,
    /// Days between forced full traversals; negative disables forcing.
    pub full_traversal_interval_days: i64,
    /// Restore last-access time after reading SMB content.
    pub last_access_reset_for_smb: bool,
    /// Restore last-access time after reading local Windows content.
    pub last_access_reset_for_local_windows: bool,
    /// Largest content size fed downstream, in bytes.
    pub max_document_size: u64,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            start_paths: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            thread_pool_size: 10,
            if_modified_since_cushion_minutes: 60,
            full_traversal_interval_days: 1,
            last_access_reset_for_smb: true,
            last_access_reset_for_local_windows: true,
            max_document_size: 30 * 1024 * 1024,
        }
    }
}

/// `[acl]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AclSection {
    /// Emit ACL properties and documents.
    pub push_acls: bool,
    /// Mark everything public instead; mutually exclusive with `push_acls`.
    pub mark_all_documents_public: bool,
    /// Emit inheritance-aware ACL documents.
    pub supports_inherited_acls: bool,
    /// `FILE`, `SHARE`, `FILEORSHARE`, or `FILEANDSHARE`.
    pub ace_security_level: String,
    /// Principal notation for users.
    pub user_acl_format: String,
    /// Principal notation for groups.
    pub group_acl_format: String,
    /// Fall back to per-request authorization when an ACL read fails.
    pub use_authz_on_acl_error: bool,
    /// Identity namespace stamped on every principal.
    pub global_namespace: Option<String>,
}

impl Default for AclSection {
    fn default() -> Self {
        Self {
            push_acls: true,
            mark_all_documents_public: false,
            supports_inherited_acls: true,
            ace_security_level: "FILEANDSHARE".to_owned(),
            user_acl_format: "domain\\user".to_owned(),
            group_acl_format: "domain\\group".to_owned(),
            use_authz_on_acl_error: false,
            global_namespace: None,
        }
    }
}

/// `[schedule]` table, consumed by the bundled interval schedule.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ScheduleSection {
    /// Seconds between traversal passes; negative waits indefinitely.
    pub retry_delay_seconds: i64,
    /// Disables traversal entirely.
    pub disabled: bool,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            retry_delay_seconds: 300,
            disabled: false,
        }
    }
}

/// `[credentials]` table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialsSection {
    /// Authentication domain.
    #[serde(default)]
    pub domain: Option<String>,
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl CrawlerConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parses and validates configuration text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.start_paths.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one start path is required".to_owned(),
            ));
        }
        if self.acl.push_acls && self.acl.mark_all_documents_public {
            return Err(ConfigError::Invalid(
                "pushAcls and markAllDocumentsPublic are mutually exclusive".to_owned(),
            ));
        }
        // Surface bad formats and patterns at startup, not mid-crawl.
        AceSecurityLevel::from_config(&self.acl.ace_security_level)?;
        AclFormat::from_config(&self.acl.user_acl_format)?;
        AclFormat::from_config(&self.acl.group_acl_format)?;
        self.matcher()?;
        Ok(())
    }

    /// Compiles the include/exclude matcher. An empty include list admits
    /// exactly the trees under the start paths.
    pub fn matcher(&self) -> Result<FilePatternMatcher, ConfigError> {
        let includes = if self.crawl.include_patterns.is_empty() {
            &self.crawl.start_paths
        } else {
            &self.crawl.include_patterns
        };
        Ok(FilePatternMatcher::new(
            includes.iter().map(String::as_str),
            self.crawl.exclude_patterns.iter().map(String::as_str),
        )?)
    }

    /// Feed-shaping options for the document factory.
    #[must_use]
    pub fn feed_options(&self) -> FeedOptions {
        FeedOptions {
            push_acls: self.acl.push_acls,
            mark_all_documents_public: self.acl.mark_all_documents_public,
            supports_inherited_acls: self.acl.supports_inherited_acls,
        }
    }

    /// ACL handling knobs for the filesystem layer.
    pub fn acl_config(&self) -> Result<AclConfig, ConfigError> {
        Ok(AclConfig {
            user_format: AclFormat::from_config(&self.acl.user_acl_format)?,
            group_format: AclFormat::from_config(&self.acl.group_acl_format)?,
            security_level: AceSecurityLevel::from_config(&self.acl.ace_security_level)?,
            supports_inherited_acls: self.acl.supports_inherited_acls,
            use_authz_on_acl_error: self.acl.use_authz_on_acl_error,
            global_namespace: self.acl.global_namespace.clone(),
        })
    }

    /// Lister and traverser tuning.
    #[must_use]
    pub fn lister_settings(&self) -> ListerSettings {
        let days = self.crawl.full_traversal_interval_days;
        ListerSettings {
            start_paths: self.crawl.start_paths.clone(),
            thread_pool_size: self.crawl.thread_pool_size,
            traverser: TraverserConfig {
                if_modified_since_cushion_millis: self.crawl.if_modified_since_cushion_minutes
                    * 60
                    * 1000,
                full_traversal_interval_millis: if days >= 0 {
                    days * 24 * 60 * 60 * 1000
                } else {
                    days
                },
                ..TraverserConfig::default()
            },
        }
    }

    /// SMB credentials, when configured.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .as_ref()
            .map(|c| Credentials::new(c.domain.as_deref(), &c.user, &c.password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [crawl]
        start_paths = ["/data"]
    "#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = CrawlerConfig::from_toml(MINIMAL).expect("parse");
        assert_eq!(config.crawl.thread_pool_size, 10);
        assert_eq!(config.crawl.if_modified_since_cushion_minutes, 60);
        assert_eq!(config.crawl.full_traversal_interval_days, 1);
        assert!(config.acl.push_acls);
        assert_eq!(config.acl.ace_security_level, "FILEANDSHARE");

        let settings = config.lister_settings();
        assert_eq!(settings.start_paths, vec!["/data"]);
        assert_eq!(
            settings.traverser.if_modified_since_cushion_millis,
            60 * 60 * 1000
        );
        assert_eq!(
            settings.traverser.full_traversal_interval_millis,
            24 * 60 * 60 * 1000
        );
    }

    #[test]
    fn start_paths_are_required() {
        assert!(matches!(
            CrawlerConfig::from_toml("[crawl]\nstart_paths = []"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn public_and_push_acls_are_mutually_exclusive() {
        let text = r#"
            [crawl]
            start_paths = ["/data"]
            [acl]
            push_acls = true
            mark_all_documents_public = true
        "#;
        assert!(matches!(
            CrawlerConfig::from_toml(text),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn negative_full_traversal_interval_disables_forcing() {
        let text = r#"
            [crawl]
            start_paths = ["/data"]
            full_traversal_interval_days = -1
        "#;
        let config = CrawlerConfig::from_toml(text).expect("parse");
        assert_eq!(
            config.lister_settings().traverser.full_traversal_interval_millis,
            -1
        );
    }

    #[test]
    fn start_paths_double_as_include_patterns() {
        let config = CrawlerConfig::from_toml(MINIMAL).expect("parse");
        let matcher = config.matcher().expect("matcher");
        assert!(matcher.accepts("/data/reports/q1.txt"));
        assert!(!matcher.accepts("/elsewhere/file.txt"));
    }

    #[test]
    fn bad_patterns_fail_at_startup() {
        let text = r#"
            [crawl]
            start_paths = ["/data"]
            exclude_patterns = ["regexp:("]
        "#;
        assert!(matches!(
            CrawlerConfig::from_toml(text),
            Err(ConfigError::Pattern(_))
        ));
    }

    #[test]
    fn bad_security_level_fails_at_startup() {
        let text = r#"
            [crawl]
            start_paths = ["/data"]
            [acl]
            ace_security_level = "SOMETIMES"
        "#;
        assert!(matches!(
            CrawlerConfig::from_toml(text),
            Err(ConfigError::Acl(_))
        ));
    }

    #[test]
    fn credentials_and_mounts_parse() {
        let text = r#"
            [crawl]
            start_paths = ["nfs://filer/export"]
            [credentials]
            domain = "CORP"
            user = "svc-crawl"
            password = "secret"
            [mounts]
            "nfs://filer/export" = "/mnt/filer"
        "#;
        let config = CrawlerConfig::from_toml(text).expect("parse");
        let creds = config.credentials().expect("credentials");
        assert_eq!(creds.domain(), Some("CORP"));
        assert_eq!(config.mounts["nfs://filer/export"], "/mnt/filer");
    }
}
