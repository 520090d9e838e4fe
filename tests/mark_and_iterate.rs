use std::path::{Path, PathBuf};
use std::sync::Arc;

use dirtydag::fs::mock::MockFileSystem;
use dirtydag::{BuildFsState, CompilationRound, StateOptions};
use dirtydag_test_utils::builders::{module_target, source_root, ContextBuilder};
use dirtydag_test_utils::init_tracing;

fn new_state() -> BuildFsState {
    BuildFsState::with_file_system(StateOptions::default(), Arc::new(MockFileSystem::new()))
}

#[test]
fn basic_mark_and_iterate() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/a");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let state = new_state();

    state.mark_initial_scan_performed(&target);
    let marked = state
        .mark_dirty(None, Path::new("/a/x.txt"), &root, None, false)
        .unwrap();
    assert!(marked);

    // Marking the same file again is not a new entry.
    let marked_again = state
        .mark_dirty(None, Path::new("/a/x.txt"), &root, None, false)
        .unwrap();
    assert!(!marked_again);

    assert!(state.has_work_to_do(&target));

    let mut visited = Vec::new();
    let completed = state
        .process_files_to_recompile(&context, &target, |t, file, rd| {
            visited.push((t.clone(), file.to_path_buf(), rd.root_id()));
            Ok(true)
        })
        .unwrap();
    assert!(completed);
    assert_eq!(visited, vec![(target.clone(), PathBuf::from("/a/x.txt"), 1)]);
}

#[test]
fn deletion_subsumes_pending_dirty_mark() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/a");
    let state = new_state();
    let file = Path::new("/a/x.txt");

    state.mark_initial_scan_performed(&target);
    state.mark_dirty(None, file, &root, None, false).unwrap();
    state.register_deleted(None, &target, file, None).unwrap();

    assert!(!state.is_marked_for_recompilation(None, CompilationRound::Next, &root, file));

    // While the path sits in the deleted set, conditional marking refuses.
    let marked = state
        .mark_dirty_if_not_deleted(None, CompilationRound::Next, file, &root, None)
        .unwrap();
    assert!(!marked);

    assert_eq!(
        state.get_and_clear_deleted_paths(&target),
        vec!["/a/x.txt".to_string()]
    );
    assert!(state.get_and_clear_deleted_paths(&target).is_empty());

    // Deleted set cleared, so the conditional mark goes through now.
    let marked = state
        .mark_dirty_if_not_deleted(None, CompilationRound::Next, file, &root, None)
        .unwrap();
    assert!(marked);
}

#[test]
fn unscanned_target_always_has_work_to_do() {
    let target = module_target("m");
    let state = new_state();

    assert!(state.has_work_to_do(&target));
    state.mark_initial_scan_performed(&target);
    assert!(!state.has_work_to_do(&target));
}

#[test]
fn always_scan_fs_distrusts_event_tracking() {
    let target = module_target("m");
    let options = StateOptions::from_toml_str("always_scan_fs = true").unwrap();
    let state = BuildFsState::with_file_system(options, Arc::new(MockFileSystem::new()));

    state.mark_initial_scan_performed(&target);
    assert!(!state.is_initial_scan_performed(&target));

    let state = new_state();
    state.mark_initial_scan_performed(&target);
    assert!(state.is_initial_scan_performed(&target));
}

#[test]
fn processor_returning_false_stops_the_walk() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/a");
    let context = ContextBuilder::new().with_root(root.clone()).build();
    let state = new_state();

    state.mark_dirty(None, Path::new("/a/x.txt"), &root, None, false).unwrap();
    state.mark_dirty(None, Path::new("/a/y.txt"), &root, None, false).unwrap();

    let mut visits = 0;
    let completed = state
        .process_files_to_recompile(&context, &target, |_, _, _| {
            visits += 1;
            Ok(false)
        })
        .unwrap();
    assert!(!completed);
    assert_eq!(visits, 1);
}

#[test]
fn iteration_respects_compile_scope() {
    init_tracing();

    let target = module_target("m");
    let root = source_root(1, &target, "/a");
    let context = ContextBuilder::new()
        .with_root(root.clone())
        .with_scope(&target, &["**/*.rs"])
        .build();
    let state = new_state();

    state.mark_dirty(None, Path::new("/a/x.txt"), &root, None, false).unwrap();
    state.mark_dirty(None, Path::new("/a/lib.rs"), &root, None, false).unwrap();

    let mut visited = Vec::new();
    state
        .process_files_to_recompile(&context, &target, |_, file, _| {
            visited.push(file.to_path_buf());
            Ok(true)
        })
        .unwrap();
    assert_eq!(visited, vec![PathBuf::from("/a/lib.rs")]);
}

#[test]
fn clear_recompile_drops_one_root() {
    let target = module_target("m");
    let root_a = source_root(1, &target, "/a");
    let root_b = source_root(2, &target, "/b");
    let state = new_state();

    state.mark_dirty(None, Path::new("/a/x.txt"), &root_a, None, false).unwrap();
    state.mark_dirty(None, Path::new("/b/y.txt"), &root_b, None, false).unwrap();

    state.clear_recompile(&root_a);

    assert!(!state.is_marked_for_recompilation(
        None,
        CompilationRound::Next,
        &root_a,
        Path::new("/a/x.txt")
    ));
    assert!(state.is_marked_for_recompilation(
        None,
        CompilationRound::Next,
        &root_b,
        Path::new("/b/y.txt")
    ));
}

#[test]
fn clear_all_resets_everything() {
    let target = module_target("m");
    let root = source_root(1, &target, "/a");
    let state = new_state();
    let file = Path::new("/a/x.txt");

    state.mark_initial_scan_performed(&target);
    state.mark_dirty(None, file, &root, None, true).unwrap();
    assert!(state.event_registration_stamp(file) > 0);

    state.clear_all();

    assert!(state.has_work_to_do(&target)); // scan record gone
    assert!(!state.is_marked_for_recompilation(None, CompilationRound::Next, &root, file));
    assert_eq!(state.event_registration_stamp(file), 0);
}
