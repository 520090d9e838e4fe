use std::path::Path;
use std::sync::Arc;

use dirtydag::fs::mock::MockFileSystem;
use dirtydag::{BuildFsState, StateOptions};
use dirtydag_test_utils::builders::{generated_root, module_target, source_root, ContextBuilder};
use dirtydag_test_utils::init_tracing;

fn state_with(fs: &MockFileSystem) -> BuildFsState {
    BuildFsState::with_file_system(StateOptions::default(), Arc::new(fs.clone()))
}

#[test]
fn event_stamp_after_build_start_is_detected() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);
    let file = Path::new("/b/y.txt");

    state.mark_initial_scan_performed(&target);
    context.set_compilation_start_stamp(&target, 1000);

    // The change physically predates the build start; only the event
    // delivery time exposes it.
    fs.set_last_modified(file, 900);
    state.mark_dirty(None, file, &root, None, true).unwrap();
    assert!(state.event_registration_stamp(file) > 1000);

    assert!(state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn mtime_in_the_build_window_is_detected() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);
    let file = Path::new("/b/y.txt");

    state.mark_initial_scan_performed(&target);
    context.set_compilation_start_stamp(&target, 1000);

    state.mark_dirty(None, file, &root, None, false).unwrap();
    fs.set_last_modified(file, 1500);

    assert!(state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn future_mtimes_are_clock_skew_and_ignored() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);
    let file = Path::new("/b/y.txt");

    state.mark_initial_scan_performed(&target);
    context.set_compilation_start_stamp(&target, 1000);

    state.mark_dirty(None, file, &root, None, false).unwrap();
    fs.set_last_modified(file, i64::MAX);

    assert!(!state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn no_build_in_progress_means_no_unprocessed_changes() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);

    state.mark_initial_scan_performed(&target);
    state.mark_dirty(None, Path::new("/b/y.txt"), &root, None, true).unwrap();

    // compilation start stamp stays 0
    assert!(!state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn unscanned_targets_report_no_unprocessed_changes() {
    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);

    context.set_compilation_start_stamp(&target, 1000);
    state.mark_dirty(None, Path::new("/b/y.txt"), &root, None, true).unwrap();

    assert!(!state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn files_under_generated_roots_are_ignored() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    // A generated root of some target also covers the file's directory.
    let gen = generated_root(2, &target, "/b/out");
    let context = ContextBuilder::new()
        .with_root(root.clone())
        .with_root(gen)
        .build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);
    let file = Path::new("/b/out/y.txt");

    state.mark_initial_scan_performed(&target);
    context.set_compilation_start_stamp(&target, 1000);
    state.mark_dirty(None, file, &root, None, true).unwrap();

    assert!(!state.has_unprocessed_changes(&context, &target).unwrap());
}

#[test]
fn out_of_scope_files_are_ignored() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/b");
    let context = ContextBuilder::new()
        .with_root(root.clone())
        .with_scope(&target, &["**/*.rs"])
        .build();
    let fs = MockFileSystem::new();
    let state = state_with(&fs);

    state.mark_initial_scan_performed(&target);
    context.set_compilation_start_stamp(&target, 1000);
    state.mark_dirty(None, Path::new("/b/y.txt"), &root, None, true).unwrap();

    assert!(!state.has_unprocessed_changes(&context, &target).unwrap());
}
