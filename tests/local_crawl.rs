//! End-to-end crawls over a local POSIX tree.

use std::fs;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use fscrawl::{Connector, CrawlerConfig};
use fscrawl_feed::VecAcceptor;
use fscrawl_lister::TraversalSchedule;

#[derive(Debug)]
struct AlwaysOn;

impl TraversalSchedule for AlwaysOn {
    fn rate_docs_per_minute(&self) -> i64 {
        0
    }

    fn retry_delay_seconds(&self) -> i64 {
        -1
    }

    fn is_disabled(&self) -> bool {
        false
    }

    fn in_scheduled_interval(&self) -> bool {
        true
    }

    fn next_interval_seconds(&self) -> i64 {
        0
    }
}

fn public_config(root: &str, cushion_minutes: i64) -> CrawlerConfig {
    CrawlerConfig::from_toml(&format!(
        r#"
        [crawl]
        start_paths = ["{root}"]
        if_modified_since_cushion_minutes = {cushion_minutes}
        full_traversal_interval_days = -1
        [acl]
        push_acls = false
        mark_all_documents_public = true
        "#
    ))
    .expect("config")
}

fn set_mtime(path: &std::path::Path, time: SystemTime) {
    filetime::set_file_mtime(path, FileTime::from_system_time(time)).expect("set mtime");
}

#[test]
fn crawl_emits_depth_first_order() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path().join("root");
    fs::create_dir(&root).expect("mkdir");
    fs::write(root.join("a.txt"), b"a").expect("write");
    fs::create_dir(root.join("b")).expect("mkdir");
    fs::write(root.join("b/c.txt"), b"c").expect("write");

    let root_str = root.to_string_lossy().into_owned();
    let connector = Connector::from_config(public_config(&root_str, 60)).expect("connector");
    let acceptor = Arc::new(VecAcceptor::new());
    let (mut lister, _handle) = connector
        .lister(Arc::clone(&acceptor) as _, Arc::new(AlwaysOn));

    assert!(!lister.run_once());
    assert_eq!(
        acceptor.docids(),
        vec![
            format!("{root_str}/a.txt"),
            format!("{root_str}/b/c.txt"),
        ]
    );
    assert_eq!(acceptor.flushes(), 1);
}

#[test]
fn second_cycle_is_incremental() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path().join("root");
    fs::create_dir(&root).expect("mkdir");
    let stale = root.join("stale.txt");
    let fresh = root.join("fresh.txt");
    fs::write(&stale, b"s").expect("write");
    fs::write(&fresh, b"f").expect("write");

    let hour_ago = SystemTime::now() - Duration::from_secs(3600);
    set_mtime(&stale, hour_ago);
    set_mtime(&fresh, hour_ago);

    let root_str = root.to_string_lossy().into_owned();
    // Zero cushion so the cutoff is exactly the previous cycle's start.
    let connector = Connector::from_config(public_config(&root_str, 0)).expect("connector");
    let acceptor = Arc::new(VecAcceptor::new());
    let (mut lister, _handle) = connector
        .lister(Arc::clone(&acceptor) as _, Arc::new(AlwaysOn));

    assert!(!lister.run_once());
    assert_eq!(acceptor.len(), 2);
    acceptor.clear();

    // Touch one file after the first cycle; only it is re-fed.
    set_mtime(&fresh, SystemTime::now() + Duration::from_secs(60));
    assert!(!lister.run_once());
    assert_eq!(acceptor.docids(), vec![format!("{root_str}/fresh.txt")]);
}

#[cfg(unix)]
#[test]
fn forbidden_subtree_does_not_stop_siblings() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().expect("tempdir");
    let root = temp.path().join("root");
    fs::create_dir(&root).expect("mkdir");
    fs::write(root.join("open.txt"), b"o").expect("write");
    let private = root.join("private");
    fs::create_dir(&private).expect("mkdir");
    fs::write(private.join("secret.txt"), b"s").expect("write");
    fs::set_permissions(&private, fs::Permissions::from_mode(0o000)).expect("chmod");

    // Permission bits do not bind a privileged user; nothing to observe.
    if fs::read_dir(&private).is_ok() {
        fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).expect("chmod");
        return;
    }

    let root_str = root.to_string_lossy().into_owned();
    let connector = Connector::from_config(public_config(&root_str, 60)).expect("connector");
    let acceptor = Arc::new(VecAcceptor::new());
    let (mut lister, _handle) = connector
        .lister(Arc::clone(&acceptor) as _, Arc::new(AlwaysOn));

    lister.run_once();

    // Restore permissions so the tempdir can be removed.
    fs::set_permissions(&private, fs::Permissions::from_mode(0o755)).expect("chmod");

    assert_eq!(acceptor.docids(), vec![format!("{root_str}/open.txt")]);
}

#[test]
fn exclude_patterns_prune_files() {
    let temp = TempDir::new().expect("tempdir");
    let root = temp.path().join("root");
    fs::create_dir(&root).expect("mkdir");
    fs::write(root.join("keep.txt"), b"k").expect("write");
    fs::write(root.join("drop.bak"), b"d").expect("write");

    let root_str = root.to_string_lossy().into_owned();
    let config = CrawlerConfig::from_toml(&format!(
        r#"
        [crawl]
        start_paths = ["{root_str}"]
        exclude_patterns = ["regexp:\\.bak$"]
        [acl]
        push_acls = false
        mark_all_documents_public = true
        "#
    ))
    .expect("config");
    let connector = Connector::from_config(config).expect("connector");
    let acceptor = Arc::new(VecAcceptor::new());
    let (mut lister, _handle) = connector
        .lister(Arc::clone(&acceptor) as _, Arc::new(AlwaysOn));

    lister.run_once();
    assert_eq!(acceptor.docids(), vec![format!("{root_str}/keep.txt")]);
}
