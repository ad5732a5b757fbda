//! Collect mode: newer destination files flow back into the source.

use std::fs;
use std::time::{Duration, SystemTime};

use dotsync_core::{PassReport, Scheduler, SyncConfig};
use dotsync_fs::Capabilities;
use dotsync_test_utils::TestTree;
use pretty_assertions::assert_eq;

fn collecting(tree: &TestTree) -> SyncConfig {
    let mut config = SyncConfig::new(tree.src(), tree.dst());
    config.collect = true;
    config
}

fn run(config: &SyncConfig) -> PassReport {
    let caps = Capabilities::native();
    Scheduler::new(config, &caps).pass().unwrap()
}

fn src_mtime(tree: &TestTree, rel: &str) -> SystemTime {
    fs::metadata(tree.src_path(rel)).unwrap().modified().unwrap()
}

#[test]
fn newer_destination_replaces_source() {
    let tree = TestTree::new();
    tree.write_src("conf", "repo\n");
    tree.set_src_mtime("conf", 1_000);
    tree.write_dst("conf", "edited\n");
    tree.set_dst_mtime("conf", 2_000);

    let report = run(&collecting(&tree));

    assert!(report.changed);
    assert_eq!(report.stats.collected, 1);
    assert_eq!(report.stats.copied, 0);
    assert_eq!(tree.read_src("conf"), "edited\n");
    assert_eq!(tree.read_dst("conf"), "edited\n");
    assert_eq!(
        src_mtime(&tree, "conf"),
        SystemTime::UNIX_EPOCH + Duration::from_secs(2_000)
    );
    assert_eq!(
        fs::read_to_string(tree.src_path(".dotsync")).unwrap(),
        "conf\n"
    );
}

#[test]
fn older_destination_is_overwritten_as_usual() {
    let tree = TestTree::new();
    tree.write_src("conf", "repo\n");
    tree.set_src_mtime("conf", 2_000);
    tree.write_dst("conf", "stale\n");
    tree.set_dst_mtime("conf", 1_000);

    let report = run(&collecting(&tree));

    assert_eq!(report.stats.collected, 0);
    assert_eq!(report.stats.copied, 1);
    assert_eq!(tree.read_src("conf"), "repo\n");
    assert_eq!(tree.read_dst("conf"), "repo\n");
}

#[test]
fn missing_destination_is_copied() {
    let tree = TestTree::new();
    tree.write_src("conf", "repo\n");

    let report = run(&collecting(&tree));

    assert_eq!(report.stats.copied, 1);
    assert_eq!(tree.read_dst("conf"), "repo\n");
}

#[test]
fn collect_bypasses_the_watch_cache() {
    let tree = TestTree::new();
    tree.write_src("conf", "repo\n");
    tree.set_src_mtime("conf", 1_000);
    let mut config = collecting(&tree);
    config.watch = true;
    let caps = Capabilities::native();
    let mut scheduler = Scheduler::new(&config, &caps);

    scheduler.pass().unwrap();
    assert_eq!(tree.read_dst("conf"), "repo\n");

    tree.write_dst("conf", "edited in place\n");
    tree.set_dst_mtime("conf", 5_000);

    let report = scheduler.pass().unwrap();

    assert_eq!(report.stats.collected, 1);
    assert_eq!(tree.read_src("conf"), "edited in place\n");
}

#[cfg(unix)]
mod unix {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collected_source_keeps_its_own_mode() {
        let tree = TestTree::new();
        tree.write_src("secret", "repo\n");
        tree.set_src_mode("secret", 0o600);
        tree.set_src_mtime("secret", 1_000);
        tree.write_dst("secret", "edited\n");
        tree.set_dst_mode("secret", 0o644);
        tree.set_dst_mtime("secret", 2_000);

        run(&collecting(&tree));

        assert_eq!(tree.read_src("secret"), "edited\n");
        assert_eq!(tree.src_mode("secret"), 0o600);
    }
}
