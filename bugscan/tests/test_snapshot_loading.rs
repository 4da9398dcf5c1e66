use bugscan::domain::{Pid, SnapshotError, Tid};
use bugscan::snapshot::{Snapshot, SnapshotDraft, ThreadId};

#[test]
fn test_load_orders_processes_and_threads() {
    let snapshot = Snapshot::from_file("tests/fixtures/anr_snapshot.json").expect("Failed to load fixture");

    assert_eq!(snapshot.groups().len(), 1);
    assert_eq!(snapshot.process_count(), 2);
    assert_eq!(snapshot.thread_count(), 5);

    let pids: Vec<_> = snapshot.process_ids().map(|p| snapshot.process(p).pid).collect();
    assert_eq!(pids, vec![Pid(999), Pid(1234)], "processes are ordered by pid");

    let app = snapshot.process_ids().nth(1).unwrap();
    let tids: Vec<_> = snapshot.process(app).threads().iter().map(|&t| snapshot.thread(t).tid).collect();
    assert_eq!(tids, vec![Tid(1), Tid(7), Tid(11), Tid(12)], "threads are ordered by tid");
}

#[test]
fn test_load_preserves_frames_and_anchors() {
    let snapshot = Snapshot::from_file("tests/fixtures/anr_snapshot.json").expect("Failed to load fixture");

    let main = snapshot.thread(ThreadId(1));
    assert_eq!(main.name, "main");
    assert_eq!(main.wait_on, Some(Tid(7)));
    assert_eq!(main.anchor().as_str(), "stack_0_1234_1");
    assert_eq!(main.frames()[1].method, "com.example.Foo.bar");
    assert_eq!(main.frames()[1].location(), "Foo.java:42");
    assert_eq!(main.frames()[5].location(), "Unknown Source");
    assert_eq!(snapshot.process_of(ThreadId(1)).link().as_str(), "process_1234");
}

#[test]
fn test_cross_process_dependencies_resolve_within_group() {
    let snapshot = Snapshot::from_file("tests/fixtures/deadlock_snapshot.json").expect("Failed to load fixture");

    // Group 0: pids 100, 200, 300; group 1: pid 100 again
    assert_eq!(snapshot.process_count(), 4);
    let ss_main = ThreadId(0);
    let phone_binder = ThreadId(3);
    assert_eq!(snapshot.thread(ss_main).dependency(), Some(phone_binder));
    assert_eq!(snapshot.thread(phone_binder).dependency(), Some(ss_main));

    // worker-c points at a pid that was never captured
    let worker_c = ThreadId(6);
    assert_eq!(snapshot.thread(worker_c).name, "worker-c");
    assert_eq!(snapshot.thread(worker_c).dependency(), None, "dangling dependency is dropped");

    let later_main = ThreadId(7);
    assert_eq!(snapshot.group_name_of(later_main), "VM traces just now");
    assert_eq!(snapshot.thread(later_main).anchor().as_str(), "stack_1_100_1");
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Snapshot::from_file("tests/fixtures/does_not_exist.json").unwrap_err();
    assert!(matches!(err, SnapshotError::Io(_)), "got {err:?}");
}

#[test]
fn test_malformed_json_is_parse_error() {
    let err = SnapshotDraft::from_json(r#"{"groups": [{"name": "g", "processes": [{"pid": "x"}]}]}"#).unwrap_err();
    assert!(matches!(err, SnapshotError::ParseFailed(_)), "got {err:?}");
}

#[test]
fn test_duplicate_pid_in_group_is_rejected() {
    let json = r#"{"groups": [{"name": "g", "processes": [
        {"pid": 5, "name": "a", "threads": []},
        {"pid": 5, "name": "b", "threads": []}
    ]}]}"#;
    let err = SnapshotDraft::from_json(json).unwrap().build().unwrap_err();
    assert!(matches!(err, SnapshotError::DuplicateProcess { pid: Pid(5), .. }), "got {err:?}");
}

#[test]
fn test_empty_document_loads() {
    let snapshot = SnapshotDraft::from_json("{}").unwrap().build().unwrap();
    assert_eq!(snapshot.thread_count(), 0);
}
