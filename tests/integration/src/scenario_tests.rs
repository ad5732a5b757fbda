//! End-to-end scenarios across the whole engine
//!
//! Each test drives full passes through `Scheduler` against real temporary
//! trees and checks what ends up on disk.

use std::fs;

use dotsync_core::{PassReport, Scheduler, SyncConfig};
use dotsync_fs::Capabilities;
use dotsync_test_utils::TestTree;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn pass(config: &SyncConfig) -> PassReport {
    let caps = Capabilities::native();
    Scheduler::new(config, &caps).pass().unwrap()
}

fn tracked(tree: &TestTree) -> Vec<String> {
    fs::read_to_string(tree.src_path(".dotsync"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn mixed_tree_converges_and_stays_converged() {
    let tree = TestTree::new();
    tree.write_src(".bashrc", "export EDITOR=vi\n");
    tree.write_src(".config/app/settings", "theme=dark\n");
    tree.write_src("etc/hosts.lan-section", "10.0.0.2 nas\n");
    tree.write_dst("etc/hosts", "127.0.0.1 localhost\n");
    let config = SyncConfig::new(tree.src(), tree.dst());

    let first = pass(&config);
    assert!(first.changed);
    assert!(!first.has_partial_errors);
    assert_eq!(first.stats.copied, 2);
    assert_eq!(first.stats.sections_merged, 1);

    let snapshot: Vec<_> = [".bashrc", ".config/app/settings", "etc/hosts"]
        .iter()
        .map(|rel| (tree.read_dst(rel), tree.dst_mtime(rel)))
        .collect();

    let second = pass(&config);
    assert!(!second.changed);

    let after: Vec<_> = [".bashrc", ".config/app/settings", "etc/hosts"]
        .iter()
        .map(|rel| (tree.read_dst(rel), tree.dst_mtime(rel)))
        .collect();
    assert_eq!(after, snapshot);
    assert_eq!(
        tracked(&tree),
        vec![".bashrc", ".config/app/settings", "etc/hosts.lan-section"]
    );
}

#[test]
fn removing_a_source_directory_rolls_back_its_artifacts() {
    let tree = TestTree::new();
    tree.write_src("etc/conf", "x=1\n");
    tree.write_src("etc/hosts.lan-section", "10.0.0.2 nas\n");
    tree.write_src("keep.txt", "keep\n");
    tree.write_dst("etc/hosts", "127.0.0.1 localhost\n");
    let config = SyncConfig::new(tree.src(), tree.dst());

    pass(&config);
    fs::remove_dir_all(tree.src_path("etc")).unwrap();
    let report = pass(&config);

    assert!(report.changed);
    assert_eq!(report.stats.pruned_files, 1);
    assert_eq!(report.stats.pruned_sections, 1);
    tree.assert_dst_not_exists("etc/conf");
    assert_eq!(tree.read_dst("etc/hosts"), "127.0.0.1 localhost\n");
    assert_eq!(tree.read_dst("keep.txt"), "keep\n");
    assert_eq!(tracked(&tree), vec!["keep.txt"]);
}

#[rstest]
#[case::ascending(&["apples", "disks", "zebra"])]
#[case::descending(&["zebra", "disks", "apples"])]
#[case::interleaved(&["disks", "zebra", "apples"])]
fn sections_are_ordered_by_name_regardless_of_arrival(#[case] order: &[&str]) {
    let tree = TestTree::new();
    tree.write_dst("etc/fstab", "");
    let config = SyncConfig::new(tree.src(), tree.dst());

    for name in order {
        tree.write_src(&format!("etc/fstab.{name}-section"), format!("{name} body\n"));
        pass(&config);
    }

    assert_eq!(
        tree.read_dst("etc/fstab"),
        "# BEGIN apples\napples body\n# END apples\n\
         # BEGIN disks\ndisks body\n# END disks\n\
         # BEGIN zebra\nzebra body\n# END zebra\n"
    );
}

#[test]
fn malformed_target_is_left_alone_until_repaired() {
    let tree = TestTree::new();
    let broken = "# BEGIN disks\nUUID=old /data ext4\n";
    tree.write_dst("etc/fstab", broken);
    tree.write_src("etc/fstab.disks-section", "UUID=new /data ext4\n");
    let config = SyncConfig::new(tree.src(), tree.dst());

    let report = pass(&config);
    assert!(report.has_partial_errors);
    assert_eq!(tree.read_dst("etc/fstab"), broken);
    assert!(tracked(&tree).is_empty());

    tree.write_dst("etc/fstab", "# BEGIN disks\nUUID=old /data ext4\n# END disks\n");
    let report = pass(&config);

    assert!(!report.has_partial_errors);
    assert_eq!(
        tree.read_dst("etc/fstab"),
        "# BEGIN disks\nUUID=new /data ext4\n# END disks\n"
    );
    assert_eq!(tracked(&tree), vec!["etc/fstab.disks-section"]);
}

#[test]
fn section_edits_in_source_replace_block_in_place() {
    let tree = TestTree::new();
    tree.write_dst("etc/fstab", "head\n# BEGIN disks\nold\n# END disks\ntail\n");
    tree.write_src("etc/fstab.disks-section", "new 1\nnew 2\n");
    let config = SyncConfig::new(tree.src(), tree.dst());

    pass(&config);

    assert_eq!(
        tree.read_dst("etc/fstab"),
        "head\n# BEGIN disks\nnew 1\nnew 2\n# END disks\ntail\n"
    );
}

#[cfg(unix)]
mod unix {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn basic_sync_applies_umask() {
        let tree = TestTree::new();
        tree.write_src("a.txt", "hi\n");
        tree.set_src_mode("a.txt", 0o644);
        let mut config = SyncConfig::new(tree.src(), tree.dst());
        config.umask = 0o027;

        pass(&config);

        assert_eq!(tree.read_dst("a.txt"), "hi\n");
        assert_eq!(tree.dst_mode("a.txt"), 0o640);
    }

    #[test]
    fn collect_conflict_keeps_source_mode() {
        let tree = TestTree::new();
        tree.write_src("bin/tool", "#!/bin/sh\necho repo\n");
        tree.set_src_mode("bin/tool", 0o750);
        tree.set_src_mtime("bin/tool", 1_000);
        tree.write_dst("bin/tool", "#!/bin/sh\necho local\n");
        tree.set_dst_mode("bin/tool", 0o644);
        tree.set_dst_mtime("bin/tool", 2_000);
        let mut config = SyncConfig::new(tree.src(), tree.dst());
        config.collect = true;

        let report = pass(&config);

        assert_eq!(report.stats.collected, 1);
        assert_eq!(tree.read_src("bin/tool"), "#!/bin/sh\necho local\n");
        assert_eq!(tree.src_mode("bin/tool"), 0o750);
    }

    #[test]
    fn bindir_files_become_executable_before_copy() {
        let tree = TestTree::new();
        tree.write_src("bin/hello", "#!/bin/sh\n");
        tree.set_src_mode("bin/hello", 0o644);
        let mut config = SyncConfig::new(tree.src(), tree.dst());
        config.bin_dirs = vec!["bin".into()];

        pass(&config);

        assert_eq!(tree.src_mode("bin/hello"), 0o755);
        assert_eq!(tree.dst_mode("bin/hello"), 0o755);
    }
}
