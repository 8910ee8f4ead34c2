use std::fmt;
use std::io;
use std::sync::Arc;

use fscrawl_acl::{Acl, AclBuilder, RawAce};
use tracing::debug;

use crate::file::{AclConfig, ContentStream, Node};
use crate::order::traversal_cmp;
use crate::{Credentials, FileSystemKind, ReadonlyFile, VfsError};

const SMB_PREFIX: &str = "smb://";

/// Metadata snapshot for one SMB path.
#[derive(Clone, Debug, Default)]
pub struct SmbStat {
    /// Path exists on the share.
    pub exists: bool,
    /// Path is a directory.
    pub is_directory: bool,
    /// Path is a regular file.
    pub is_regular_file: bool,
    /// Content or listing is readable with the supplied credentials.
    pub can_read: bool,
    /// Hidden attribute is set.
    pub hidden: bool,
    /// Last-modified millis since epoch; `<= 0` means unknown.
    pub last_modified: i64,
    /// Length in bytes for regular files.
    pub length: u64,
}

/// Raw ACL material for one path, before rendering.
#[derive(Clone, Debug, Default)]
pub struct NodeAcls {
    /// Entries applied directly to the node.
    pub file: Vec<RawAce>,
    /// Entries inherited from ancestors.
    pub inherited: Vec<RawAce>,
    /// Entries subordinate directories would inherit (directories only).
    pub container_inherit: Vec<RawAce>,
    /// Entries subordinate files would inherit (directories only).
    pub file_inherit: Vec<RawAce>,
}

/// Supplier of raw ACL entries for ACL-capable filesystems.
///
/// Implemented by SMB delegates and, on Windows hosts, by a local
/// security-descriptor reader. Resolution against identity services is the
/// implementor's concern.
pub trait AclSource: Send + Sync + fmt::Debug {
    /// Raw ACL entries for `path`.
    fn node_acls(&self, path: &str) -> Result<NodeAcls, VfsError>;

    /// Raw share-level ACL entries for the share containing `path`, or
    /// `None` when the share exposes no separate ACL.
    fn share_acl(&self, path: &str) -> Result<Option<Vec<RawAce>>, VfsError>;
}

/// Concrete SMB wire access, injected by the embedding application.
///
/// All methods receive the full `smb://host/share/path` URL. Implementations
/// must apply network timeouts so a hung server cannot stall a crawl
/// indefinitely.
pub trait SmbDelegate: AclSource {
    /// Stats one path.
    fn stat(&self, url: &str, credentials: Option<&Credentials>) -> Result<SmbStat, VfsError>;

    /// Child names (not paths) of a directory.
    fn list(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, VfsError>;

    /// Opens a file's content.
    fn open(&self, url: &str, credentials: Option<&Credentials>) -> io::Result<ContentStream>;

    /// Reads the last-access time in millis since epoch.
    fn access_time(&self, url: &str) -> io::Result<i64>;

    /// Restores a previously captured last-access time.
    fn set_access_time(&self, url: &str, millis: i64) -> io::Result<()>;
}

/// Rendered ACL set for one node.
pub(crate) struct BuiltAcls {
    pub own: Acl,
    pub inherited: Option<Acl>,
    pub container_inherit: Option<Acl>,
    pub file_inherit: Option<Acl>,
    pub has_inherited: bool,
}

/// Renders a node's raw ACL entries under `config`.
///
/// On a non-transient read failure with `use_authz_on_acl_error` set, the
/// node degrades to the head-request sentinel instead of failing; transient
/// failures always propagate so the caller can retry.
pub(crate) fn build_node_acls(
    source: &dyn AclSource,
    config: &AclConfig,
    path: &str,
) -> Result<BuiltAcls, VfsError> {
    let raw = match source.node_acls(path) {
        Ok(raw) => raw,
        Err(e) if !e.is_transient() && config.use_authz_on_acl_error => {
            debug!(path, error = %e, "ACL read failed; deferring to authorization");
            return Ok(BuiltAcls {
                own: Acl::use_head_request(),
                inherited: None,
                container_inherit: None,
                file_inherit: None,
                has_inherited: false,
            });
        }
        Err(e) => return Err(e),
    };

    let builder = acl_builder(config);
    let own = if config.security_level.includes_file() {
        builder.build(&raw.file)
    } else {
        Acl::empty()
    };
    let built = |aces: &Vec<RawAce>| (!aces.is_empty()).then(|| builder.build(aces));

    Ok(BuiltAcls {
        own,
        inherited: built(&raw.inherited),
        container_inherit: built(&raw.container_inherit),
        file_inherit: built(&raw.file_inherit),
        has_inherited: !raw.inherited.is_empty(),
    })
}

/// Renders a share-level ACL under `config`, honoring the security level.
pub(crate) fn build_share_acl(
    source: &dyn AclSource,
    config: &AclConfig,
    path: &str,
) -> Result<Option<Acl>, VfsError> {
    if !config.security_level.includes_share() {
        return Ok(None);
    }
    match source.share_acl(path) {
        Ok(raw) => Ok(raw.map(|aces| acl_builder(config).build(&aces))),
        Err(e) if !e.is_transient() && config.use_authz_on_acl_error => {
            debug!(path, error = %e, "share ACL read failed; deferring to authorization");
            Ok(Some(Acl::use_head_request()))
        }
        Err(e) => Err(e),
    }
}

fn acl_builder(config: &AclConfig) -> AclBuilder {
    let mut builder = AclBuilder::new(config.user_format, config.group_format);
    if !config.supports_inherited_acls {
        builder = builder.legacy();
    }
    if let Some(namespace) = &config.global_namespace {
        builder = builder.namespace(namespace.clone());
    }
    builder
}

struct SmbShared {
    delegate: Arc<dyn SmbDelegate>,
    acl_config: AclConfig,
    preserve_access_time: bool,
}

impl fmt::Debug for SmbShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmbShared")
            .field("delegate", &self.delegate)
            .field("preserve_access_time", &self.preserve_access_time)
            .finish_non_exhaustive()
    }
}

/// SMB/CIFS share access through an injected [`SmbDelegate`].
#[derive(Clone, Debug)]
pub struct SmbFileSystem {
    shared: Arc<SmbShared>,
}

impl SmbFileSystem {
    /// Creates the filesystem type around a concrete delegate.
    #[must_use]
    pub fn new(
        delegate: Arc<dyn SmbDelegate>,
        acl_config: AclConfig,
        preserve_access_time: bool,
    ) -> Self {
        Self {
            shared: Arc::new(SmbShared {
                delegate,
                acl_config,
                preserve_access_time,
            }),
        }
    }

    /// True for `smb://` URLs, matched case-insensitively.
    #[must_use]
    pub fn is_path(&self, path: &str) -> bool {
        let trimmed = path.trim();
        trimmed.len() >= SMB_PREFIX.len()
            && trimmed[..SMB_PREFIX.len()].eq_ignore_ascii_case(SMB_PREFIX)
    }

    /// Creates a node for `url` under the supplied credentials.
    #[must_use]
    pub fn open(&self, url: &str, credentials: Option<&Credentials>) -> ReadonlyFile {
        ReadonlyFile::Smb(SmbFile {
            shared: Arc::clone(&self.shared),
            url: url.trim().to_owned(),
            credentials: credentials.cloned(),
        })
    }
}

/// One path on an SMB share.
#[derive(Clone, Debug)]
pub struct SmbFile {
    shared: Arc<SmbShared>,
    // Directory URLs end with '/'; file URLs do not.
    url: String,
    credentials: Option<Credentials>,
}

impl SmbFile {
    fn stat(&self) -> Result<SmbStat, VfsError> {
        self.shared.delegate.stat(&self.url, self.credentials.as_ref())
    }

    fn trimmed(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl Node for SmbFile {
    fn kind(&self) -> FileSystemKind {
        FileSystemKind::Smb
    }

    fn path(&self) -> String {
        if self.url.ends_with('/') || self.is_directory().unwrap_or(false) {
            let trimmed = self.trimmed();
            format!("{trimmed}/")
        } else {
            self.url.clone()
        }
    }

    fn name(&self) -> String {
        self.trimmed()
            .strip_prefix(SMB_PREFIX)
            .unwrap_or(self.trimmed())
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_owned()
    }

    fn parent(&self) -> Option<String> {
        let trimmed = self.trimmed();
        let rest = trimmed.strip_prefix(SMB_PREFIX)?;
        let (parent, _) = rest.rsplit_once('/')?;
        Some(format!("{SMB_PREFIX}{parent}/"))
    }

    fn exists(&self) -> Result<bool, VfsError> {
        Ok(self.stat()?.exists)
    }

    fn is_directory(&self) -> Result<bool, VfsError> {
        Ok(self.stat()?.is_directory)
    }

    fn is_regular_file(&self) -> Result<bool, VfsError> {
        Ok(self.stat()?.is_regular_file)
    }

    fn can_read(&self) -> Result<bool, VfsError> {
        Ok(self.stat()?.can_read)
    }

    fn is_hidden(&self) -> Result<bool, VfsError> {
        Ok(self.stat()?.hidden)
    }

    fn last_modified(&self) -> Result<i64, VfsError> {
        Ok(self.stat()?.last_modified)
    }

    fn length(&self) -> Result<u64, VfsError> {
        Ok(self.stat()?.length)
    }

    fn display_url(&self) -> String {
        self.url.clone()
    }

    fn open(&self) -> io::Result<ContentStream> {
        let delegate = Arc::clone(&self.shared.delegate);
        let stream = delegate.open(&self.url, self.credentials.as_ref())?;
        if self.shared.preserve_access_time {
            let atime = delegate.access_time(&self.url)?;
            Ok(Box::new(SmbAccessTimeGuard {
                inner: stream,
                delegate,
                url: self.url.clone(),
                atime,
            }))
        } else {
            Ok(stream)
        }
    }

    fn list_files(&self) -> Result<Vec<ReadonlyFile>, VfsError> {
        let names = self
            .shared
            .delegate
            .list(&self.url, self.credentials.as_ref())?;
        let base = self.trimmed();
        let mut children: Vec<SmbFile> = names
            .iter()
            .map(|name| SmbFile {
                shared: Arc::clone(&self.shared),
                url: format!("{base}/{name}"),
                credentials: self.credentials.clone(),
            })
            .collect();
        children.sort_by(|a, b| traversal_cmp(&a.path(), &b.path(), '/'));
        Ok(children.into_iter().map(ReadonlyFile::Smb).collect())
    }

    fn acl(&self) -> Result<Acl, VfsError> {
        let path = self.path();
        Ok(build_node_acls(&*self.shared.delegate, &self.shared.acl_config, &path)?.own)
    }

    fn has_inherited_acls(&self) -> Result<bool, VfsError> {
        let path = self.path();
        Ok(build_node_acls(&*self.shared.delegate, &self.shared.acl_config, &path)?.has_inherited)
    }

    fn inherited_acl(&self) -> Result<Option<Acl>, VfsError> {
        let path = self.path();
        Ok(build_node_acls(&*self.shared.delegate, &self.shared.acl_config, &path)?.inherited)
    }

    fn container_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        let path = self.path();
        Ok(
            build_node_acls(&*self.shared.delegate, &self.shared.acl_config, &path)?
                .container_inherit,
        )
    }

    fn file_inherit_acl(&self) -> Result<Option<Acl>, VfsError> {
        let path = self.path();
        Ok(build_node_acls(&*self.shared.delegate, &self.shared.acl_config, &path)?.file_inherit)
    }

    fn share_acl(&self) -> Result<Option<Acl>, VfsError> {
        let path = self.path();
        build_share_acl(&*self.shared.delegate, &self.shared.acl_config, &path)
    }

    fn is_modified_since(&self, millis: i64) -> Result<bool, VfsError> {
        let modified = self.stat()?.last_modified;
        Ok(modified <= 0 || modified >= millis)
    }
}

/// Restores the SMB last-access time when the content stream is dropped.
struct SmbAccessTimeGuard {
    inner: ContentStream,
    delegate: Arc<dyn SmbDelegate>,
    url: String,
    atime: i64,
}

impl io::Read for SmbAccessTimeGuard {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Drop for SmbAccessTimeGuard {
    fn drop(&mut self) {
        if let Err(error) = self.delegate.set_access_time(&self.url, self.atime) {
            tracing::warn!(url = %self.url, %error, "failed to restore last-access time");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct NullDelegate;

    impl AclSource for NullDelegate {
        fn node_acls(&self, _path: &str) -> Result<NodeAcls, VfsError> {
            Ok(NodeAcls::default())
        }

        fn share_acl(&self, _path: &str) -> Result<Option<Vec<RawAce>>, VfsError> {
            Ok(None)
        }
    }

    impl SmbDelegate for NullDelegate {
        fn stat(&self, url: &str, _c: Option<&Credentials>) -> Result<SmbStat, VfsError> {
            Ok(SmbStat {
                exists: true,
                is_directory: url.ends_with('/'),
                is_regular_file: !url.ends_with('/'),
                can_read: true,
                ..SmbStat::default()
            })
        }

        fn list(&self, _url: &str, _c: Option<&Credentials>) -> Result<Vec<String>, VfsError> {
            Ok(vec!["b.txt".to_owned(), "a.txt".to_owned()])
        }

        fn open(&self, _url: &str, _c: Option<&Credentials>) -> io::Result<ContentStream> {
            Ok(Box::new(io::Cursor::new(Vec::new())))
        }

        fn access_time(&self, _url: &str) -> io::Result<i64> {
            Ok(0)
        }

        fn set_access_time(&self, _url: &str, _millis: i64) -> io::Result<()> {
            Ok(())
        }
    }

    fn filesystem() -> SmbFileSystem {
        SmbFileSystem::new(Arc::new(NullDelegate), AclConfig::default(), false)
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        let fs = filesystem();
        assert!(fs.is_path("smb://host/share/"));
        assert!(fs.is_path("SMB://host/share/"));
        assert!(!fs.is_path("nfs://host/share/"));
        assert!(!fs.is_path("/local/path"));
    }

    #[test]
    fn names_and_parents_from_urls() {
        let fs = filesystem();
        let file = fs.open("smb://host/share/dir/f.txt", None);
        assert_eq!(file.name(), "f.txt");
        assert_eq!(file.parent().as_deref(), Some("smb://host/share/dir/"));

        let dir = fs.open("smb://host/share/dir/", None);
        assert_eq!(dir.name(), "dir");
        assert_eq!(dir.parent().as_deref(), Some("smb://host/share/"));
    }

    #[test]
    fn listing_sorts_children() {
        let fs = filesystem();
        let dir = fs.open("smb://host/share/", None);
        let names: Vec<String> = dir
            .list_files()
            .expect("list")
            .iter()
            .map(ReadonlyFile::name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }
}
