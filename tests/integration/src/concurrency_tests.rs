//! Several engine instances racing on the same source and destination.

use std::fs::{self, OpenOptions};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use dotsync_core::{Scheduler, SyncConfig};
use dotsync_fs::Capabilities;
use dotsync_test_utils::TestTree;
use fs2::FileExt;
use pretty_assertions::assert_eq;

const FILES: usize = 20;

fn populate(tree: &TestTree) {
    for i in 0..FILES {
        tree.write_src(&format!("dir{}/file{i:02}", i % 3), format!("content {i}\n"));
    }
    tree.write_dst("etc/fstab", "base\n");
    tree.write_src("etc/fstab.alpha-section", "alpha\n");
    tree.write_src("etc/fstab.beta-section", "beta\n");
}

#[test]
fn concurrent_instances_converge_to_one_state() {
    let tree = TestTree::new();
    populate(&tree);
    let config = SyncConfig::new(tree.src(), tree.dst());

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let caps = Capabilities::native();
                let mut scheduler = Scheduler::new(&config, &caps);
                for _ in 0..3 {
                    let report = scheduler.pass().unwrap();
                    assert!(!report.has_partial_errors);
                }
            });
        }
    });

    for i in 0..FILES {
        let rel = format!("dir{}/file{i:02}", i % 3);
        assert_eq!(tree.read_dst(&rel), format!("content {i}\n"));
    }
    assert_eq!(
        tree.read_dst("etc/fstab"),
        "base\n# BEGIN alpha\nalpha\n# END alpha\n# BEGIN beta\nbeta\n# END beta\n"
    );

    let state = fs::read_to_string(tree.src_path(".dotsync")).unwrap();
    let lines: Vec<&str> = state.lines().collect();
    assert_eq!(lines.len(), FILES + 2);
    let mut sorted = lines.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, lines);
}

#[test]
fn pass_waits_for_a_held_state_lock() {
    let tree = TestTree::new();
    tree.write_src("a.txt", "hi\n");
    let holder = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(tree.src_path(".dotsync"))
        .unwrap();
    holder.lock_exclusive().unwrap();
    let config = SyncConfig::new(tree.src(), tree.dst());

    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        scope.spawn(|| {
            let caps = Capabilities::native();
            let report = Scheduler::new(&config, &caps).pass().unwrap();
            tx.send(report).unwrap();
        });

        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
        tree.assert_dst_not_exists("a.txt");

        FileExt::unlock(&holder).unwrap();
        let report = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(report.stats.copied, 1);
    });

    assert_eq!(tree.read_dst("a.txt"), "hi\n");
}

#[test]
fn pruning_and_syncing_instances_do_not_resurrect_files() {
    let tree = TestTree::new();
    populate(&tree);
    let config = SyncConfig::new(tree.src(), tree.dst());
    let caps = Capabilities::native();
    Scheduler::new(&config, &caps).pass().unwrap();

    fs::remove_dir_all(tree.src_path("dir0")).unwrap();
    fs::remove_file(tree.src_path("etc/fstab.alpha-section")).unwrap();

    thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                let caps = Capabilities::native();
                Scheduler::new(&config, &caps).pass().unwrap();
            });
        }
    });

    for i in (0..FILES).filter(|i| i % 3 == 0) {
        tree.assert_dst_not_exists(&format!("dir0/file{i:02}"));
    }
    assert_eq!(
        tree.read_dst("etc/fstab"),
        "base\n# BEGIN beta\nbeta\n# END beta\n"
    );
    let state = fs::read_to_string(tree.src_path(".dotsync")).unwrap();
    assert!(!state.contains("dir0/"));
    assert!(!state.contains("alpha"));
}
