use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use fscrawl_acl::Principal;
use fscrawl_vfs::{ContentStream, ReadonlyFile, VfsError};

use crate::mime::MimeTypeDetector;

/// Docid prefix of the share-ACL document emitted at each crawl root.
pub const SHARE_ACL_PREFIX: &str = "shareAcl:";
/// Docid prefix of the ACL document subordinate directories inherit from.
pub const CONTAINER_INHERIT_ACL_PREFIX: &str = "foldersAcl:";
/// Docid prefix of the ACL document subordinate files inherit from.
pub const FILE_INHERIT_ACL_PREFIX: &str = "filesAcl:";

/// What a feed document represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    /// Content of one regular file.
    Content,
    /// Synthetic access-control record.
    Acl,
}

/// How a child's effective ACL composes with the ACL it inherits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InheritanceType {
    /// The child's own ACL wins over the inherited one.
    ChildOverrides,
    /// Both the child and the inherited ACL must permit access.
    AndBothPermit,
}

impl InheritanceType {
    /// Feed spelling of the inheritance type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ChildOverrides => "child-overrides",
            Self::AndBothPermit => "and-both-permit",
        }
    }
}

/// Where a document's ACL chain continues.
///
/// Resolution to a docid string happens at property-assembly time; the
/// variant keeps the graph explicit until then.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InheritFrom {
    /// The file-inherit ACL document of the parent directory.
    ParentFiles(String),
    /// The container-inherit ACL document of the parent directory.
    ParentContainers(String),
    /// The share-ACL document of the crawl root.
    Share(String),
    /// No inheritance (legacy flat ACLs).
    None,
}

impl InheritFrom {
    /// The docid this variant resolves to, if any.
    #[must_use]
    pub fn to_docid(&self) -> Option<String> {
        match self {
            Self::ParentFiles(parent) => Some(format!("{FILE_INHERIT_ACL_PREFIX}{parent}")),
            Self::ParentContainers(parent) => {
                Some(format!("{CONTAINER_INHERIT_ACL_PREFIX}{parent}"))
            }
            Self::Share(root) => Some(format!("{SHARE_ACL_PREFIX}{root}")),
            Self::None => None,
        }
    }
}

/// Names of the properties a document may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PropName {
    /// Stable document identifier.
    DocId,
    /// End-user URL.
    DisplayUrl,
    /// Feed delivery mode; always `contenturl`.
    FeedType,
    /// Last-modified millis since epoch.
    LastModified,
    /// Content length in bytes.
    ContentLength,
    /// Detected MIME type (lazy; see [`FileDocument::mime_type`]).
    MimeType,
    /// Document readable by any authenticated user.
    IsPublic,
    /// Allowed user principals.
    AclUsers,
    /// Allowed group principals.
    AclGroups,
    /// Denied user principals.
    AclDenyUsers,
    /// Denied group principals.
    AclDenyGroups,
    /// Docid of the ACL document this one inherits from.
    AclInheritFrom,
    /// Composition rule for inherited ACLs.
    AclInheritanceType,
    /// Marks synthetic ACL documents.
    DocumentType,
}

impl PropName {
    /// Feed spelling of the property name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DocId => "docid",
            Self::DisplayUrl => "displayUrl",
            Self::FeedType => "feedType",
            Self::LastModified => "lastModified",
            Self::ContentLength => "contentLength",
            Self::MimeType => "mimeType",
            Self::IsPublic => "isPublic",
            Self::AclUsers => "aclUsers",
            Self::AclGroups => "aclGroups",
            Self::AclDenyUsers => "aclDenyUsers",
            Self::AclDenyGroups => "aclDenyGroups",
            Self::AclInheritFrom => "aclInheritFrom",
            Self::AclInheritanceType => "aclInheritanceType",
            Self::DocumentType => "documentType",
        }
    }
}

/// One property value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropertyValue {
    /// Plain string.
    String(String),
    /// Integral value (lengths, timestamps).
    Long(i64),
    /// Boolean flag.
    Bool(bool),
    /// A rendered principal.
    Principal(Principal),
}

/// A feed document: a tag plus a multi-valued property bag, with lazy
/// content and MIME accessors backed by the underlying file node.
#[derive(Clone)]
pub struct FileDocument {
    docid: String,
    kind: DocumentKind,
    file: ReadonlyFile,
    properties: BTreeMap<PropName, Vec<PropertyValue>>,
    mime: Option<Arc<dyn MimeTypeDetector>>,
}

impl FileDocument {
    pub(crate) fn new(
        docid: String,
        kind: DocumentKind,
        file: ReadonlyFile,
        mime: Option<Arc<dyn MimeTypeDetector>>,
    ) -> Self {
        Self {
            docid,
            kind,
            file,
            properties: BTreeMap::new(),
            mime,
        }
    }

    /// Stable identifier: the path for content documents, a reserved-prefix
    /// string for ACL documents.
    #[must_use]
    pub fn docid(&self) -> &str {
        &self.docid
    }

    /// Content or synthetic-ACL document.
    #[must_use]
    pub const fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// The node this document was assembled from.
    #[must_use]
    pub fn file(&self) -> &ReadonlyFile {
        &self.file
    }

    /// All assembled properties, in stable order.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<PropName, Vec<PropertyValue>> {
        &self.properties
    }

    /// Values of one property, if present.
    #[must_use]
    pub fn find_property(&self, name: PropName) -> Option<&[PropertyValue]> {
        self.properties.get(&name).map(Vec::as_slice)
    }

    /// First string value of one property, if present.
    #[must_use]
    pub fn string_property(&self, name: PropName) -> Option<&str> {
        match self.find_property(name)?.first()? {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Opens the document's content.
    ///
    /// Deferred until requested: the acceptor frequently skips content when
    /// the document turns out to be unchanged.
    pub fn content(&self) -> Result<ContentStream, VfsError> {
        self.file
            .open()
            .map_err(|e| VfsError::from_io(self.file.path(), e))
    }

    /// Detects the document's MIME type.
    ///
    /// Deferred for the same reason as [`Self::content`]; returns `None`
    /// for synthetic ACL documents and non-regular files.
    pub fn mime_type(&self) -> Result<Option<String>, VfsError> {
        let Some(detector) = &self.mime else {
            return Ok(None);
        };
        if self.kind != DocumentKind::Content || !self.file.is_regular_file()? {
            return Ok(None);
        }
        detector
            .mime_type(&self.file.name(), &self.file)
            .map(Some)
            .map_err(|e| VfsError::from_io(self.file.path(), e))
    }

    pub(crate) fn add(&mut self, name: PropName, value: PropertyValue) {
        self.properties.entry(name).or_default().push(value);
    }

    pub(crate) fn add_string(&mut self, name: PropName, value: impl Into<String>) {
        self.add(name, PropertyValue::String(value.into()));
    }

    pub(crate) fn add_principals(&mut self, name: PropName, principals: &[Principal]) {
        for principal in principals {
            self.add(name, PropertyValue::Principal(principal.clone()));
        }
    }

    pub(crate) fn has_property(&self, name: PropName) -> bool {
        self.properties.contains_key(&name)
    }
}

impl fmt::Debug for FileDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDocument")
            .field("docid", &self.docid)
            .field("kind", &self.kind)
            .field("filesystem", &self.file.kind().name())
            .finish_non_exhaustive()
    }
}
