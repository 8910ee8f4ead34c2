use std::sync::Arc;

use fscrawl_acl::Acl;
use fscrawl_vfs::{ReadonlyFile, VfsError};
use tracing::{debug, warn};

use crate::acceptor::TraversalContext;
use crate::document::{
    DocumentKind, FileDocument, InheritFrom, InheritanceType, PropName, PropertyValue,
    CONTAINER_INHERIT_ACL_PREFIX, FILE_INHERIT_ACL_PREFIX, SHARE_ACL_PREFIX,
};
use crate::mime::MimeTypeDetector;

const FEED_TYPE_CONTENT_URL: &str = "contenturl";
const DOCUMENT_TYPE_ACL: &str = "acl";

/// Feed-shaping options, fixed at startup.
#[derive(Clone, Copy, Debug)]
pub struct FeedOptions {
    /// Emit ACL properties and synthetic ACL documents.
    pub push_acls: bool,
    /// Mark every document public and emit no ACLs at all. Mutually
    /// exclusive with `push_acls`.
    pub mark_all_documents_public: bool,
    /// Emit inheritance-aware ACL documents; otherwise use legacy flat ACLs.
    pub supports_inherited_acls: bool,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            push_acls: true,
            mark_all_documents_public: false,
            supports_inherited_acls: true,
        }
    }
}

/// Everything document assembly needs besides the file itself.
#[derive(Clone, Debug)]
pub struct DocumentContext {
    /// Feed-shaping options.
    pub options: FeedOptions,
    /// Lazy MIME detection.
    pub mime: Arc<dyn MimeTypeDetector>,
    /// Acceptor limits.
    pub traversal: TraversalContext,
}

impl DocumentContext {
    /// Creates a context with the given options and detector.
    #[must_use]
    pub fn new(
        options: FeedOptions,
        mime: Arc<dyn MimeTypeDetector>,
        traversal: TraversalContext,
    ) -> Self {
        Self {
            options,
            mime,
            traversal,
        }
    }
}

/// Produces the feed documents for one traversed node.
///
/// A directory under ACL push yields two synthetic ACL documents, one for
/// each inheritance audience. SMB allows a folder to hand different
/// permissions to subordinate folders than to subordinate files, and even
/// when the two ACLs are identical today an edit may split them tomorrow,
/// so children always inherit from the audience-correct document. Anything
/// else yields a single content document.
///
/// # Panics
///
/// Panics if called for a directory while inherited ACLs are disabled;
/// traversal never surfaces directories in that configuration.
pub fn get_documents(
    file: &ReadonlyFile,
    context: &DocumentContext,
    root: &ReadonlyFile,
) -> Result<Vec<FileDocument>, VfsError> {
    if file.is_directory()? && context.options.push_acls {
        assert!(
            context.options.supports_inherited_acls,
            "directories cannot be fed with legacy flat ACLs"
        );
        let path = file.path();
        let container_acl = file.container_inherit_acl()?.unwrap_or_else(Acl::empty);
        let file_acl = file.file_inherit_acl()?.unwrap_or_else(Acl::empty);
        Ok(vec![
            assemble(
                file,
                context,
                root,
                format!("{CONTAINER_INHERIT_ACL_PREFIX}{path}"),
                Some(container_acl),
            )?,
            assemble(
                file,
                context,
                root,
                format!("{FILE_INHERIT_ACL_PREFIX}{path}"),
                Some(file_acl),
            )?,
        ])
    } else {
        Ok(vec![assemble(file, context, root, file.path(), None)?])
    }
}

/// Builds the share-ACL document for a crawl root, or `None` when the root
/// has no resolvable share ACL.
pub fn create_root_share_acl(root: &ReadonlyFile) -> Result<Option<FileDocument>, VfsError> {
    let Some(share) = root.share_acl()? else {
        return Ok(None);
    };
    if !share.is_determinate() {
        debug!(root = %root.path(), "share ACL unresolved; suppressing share document");
        return Ok(None);
    }

    let docid = format!("{SHARE_ACL_PREFIX}{}", root.path());
    let mut doc = FileDocument::new(docid, DocumentKind::Acl, root.clone(), None);
    doc.add_principals(PropName::AclUsers, share.allow_users());
    doc.add_principals(PropName::AclGroups, share.allow_groups());
    doc.add_principals(PropName::AclDenyUsers, share.deny_users());
    doc.add_principals(PropName::AclDenyGroups, share.deny_groups());
    doc.add_string(PropName::DocId, doc.docid().to_owned());
    doc.add_string(PropName::FeedType, FEED_TYPE_CONTENT_URL);
    // Share and file permissions must both grant access.
    doc.add_string(
        PropName::AclInheritanceType,
        InheritanceType::AndBothPermit.as_str(),
    );
    Ok(Some(doc))
}

fn assemble(
    file: &ReadonlyFile,
    context: &DocumentContext,
    root: &ReadonlyFile,
    docid: String,
    given_acl: Option<Acl>,
) -> Result<FileDocument, VfsError> {
    let kind = if given_acl.is_some() {
        DocumentKind::Acl
    } else {
        DocumentKind::Content
    };
    let mut doc = FileDocument::new(docid, kind, file.clone(), Some(Arc::clone(&context.mime)));

    if file.is_directory()? {
        doc.add_string(PropName::DocumentType, DOCUMENT_TYPE_ACL);
        doc.add_string(
            PropName::AclInheritanceType,
            InheritanceType::ChildOverrides.as_str(),
        );
    } else {
        match file.length() {
            Ok(length) => doc.add(
                PropName::ContentLength,
                PropertyValue::Long(i64::try_from(length).unwrap_or(i64::MAX)),
            ),
            Err(e) => warn!(path = %file.path(), error = %e, "failed to read file length"),
        }
    }

    doc.add_string(PropName::FeedType, FEED_TYPE_CONTENT_URL);
    doc.add_string(PropName::DocId, doc.docid().to_owned());
    doc.add_string(PropName::DisplayUrl, file.display_url());

    match file.last_modified() {
        Ok(modified) if modified > 0 => {
            doc.add(PropName::LastModified, PropertyValue::Long(modified));
        }
        Ok(_) => {}
        Err(e) => warn!(path = %file.path(), error = %e, "failed to read last-modified time"),
    }

    fetch_acl(&mut doc, file, context, root, given_acl)?;
    Ok(doc)
}

fn fetch_acl(
    doc: &mut FileDocument,
    file: &ReadonlyFile,
    context: &DocumentContext,
    root: &ReadonlyFile,
    given_acl: Option<Acl>,
) -> Result<(), VfsError> {
    if context.options.mark_all_documents_public {
        doc.add(PropName::IsPublic, PropertyValue::Bool(true));
        return Ok(());
    }

    if context.options.push_acls {
        add_acl_for_file(doc, file, context, root, given_acl)?;
    }
    if !doc.has_property(PropName::IsPublic) {
        doc.add(PropName::IsPublic, PropertyValue::Bool(false));
    }
    Ok(())
}

fn add_acl_for_file(
    doc: &mut FileDocument,
    file: &ReadonlyFile,
    context: &DocumentContext,
    root: &ReadonlyFile,
    given_acl: Option<Acl>,
) -> Result<(), VfsError> {
    // ACLs are fetched lazily: for content documents we only pay for the
    // read when ACL push is actually on.
    let acl = match given_acl {
        Some(acl) => acl,
        None => file.acl()?,
    };

    if acl.is_public() {
        if acl.is_determinate() {
            doc.add(PropName::IsPublic, PropertyValue::Bool(true));
        }
        return Ok(());
    }

    add_acl_principals(doc, &acl, context);

    let root_path = root.path();
    let inherit_from = if root.kind().paths_equal(&root_path, &file.path()) {
        // The root inherits straight from the share; anything it inherits
        // from above the share root is flattened into its own ACL.
        if let Some(inherited) = file.inherited_acl()? {
            add_acl_principals(doc, &inherited, context);
        }
        InheritFrom::Share(root_path)
    } else if file.has_inherited_acls()? {
        match file.parent() {
            Some(parent) if file.is_directory()? => InheritFrom::ParentContainers(parent),
            Some(parent) => InheritFrom::ParentFiles(parent),
            None => InheritFrom::Share(root_path),
        }
    } else {
        InheritFrom::Share(root_path)
    };

    if context.options.supports_inherited_acls {
        if let Some(docid) = inherit_from.to_docid() {
            doc.add_string(PropName::AclInheritFrom, docid);
        }
    }
    Ok(())
}

fn add_acl_principals(doc: &mut FileDocument, acl: &Acl, context: &DocumentContext) {
    if !acl.is_determinate() {
        return;
    }
    doc.add_principals(PropName::AclUsers, acl.allow_users());
    doc.add_principals(PropName::AclGroups, acl.allow_groups());
    if context.options.supports_inherited_acls {
        doc.add_principals(PropName::AclDenyUsers, acl.deny_users());
        doc.add_principals(PropName::AclDenyGroups, acl.deny_groups());
    }
}
