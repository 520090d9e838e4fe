use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use dirtydag::{FilesDelta, StaticRootIndex};
use dirtydag_test_utils::builders::{module_target, source_root};

#[derive(Debug, Clone)]
enum Op {
    Mark(u8),
    MarkIfNotDeleted(u8),
    Delete(u8),
    ClearDeleted,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..8u8).prop_map(Op::Mark),
        (0..8u8).prop_map(Op::MarkIfNotDeleted),
        (0..8u8).prop_map(Op::Delete),
        Just(Op::ClearDeleted),
    ]
}

fn file_path(n: u8) -> PathBuf {
    PathBuf::from(format!("/p/file{n}.txt"))
}

proptest! {
    // Model-checked delta semantics: marking reports newness, deletion
    // subsumes pending marks, conditional marking refuses deleted paths.
    #[test]
    fn delta_matches_a_set_model(ops in proptest::collection::vec(op_strategy(), 0..48)) {
        let target = module_target("m");
        let root = source_root(1, &target, "/p");
        let delta = FilesDelta::new();

        let mut model_marked: HashSet<u8> = HashSet::new();
        let mut model_deleted: HashSet<u8> = HashSet::new();

        for op in ops {
            let mut guard = delta.lock();
            match op {
                Op::Mark(n) => {
                    let newly = guard.mark_recompile(&root, &file_path(n));
                    prop_assert_eq!(newly, model_marked.insert(n));
                }
                Op::MarkIfNotDeleted(n) => {
                    let marked = guard.mark_recompile_if_not_deleted(&root, &file_path(n));
                    if model_deleted.contains(&n) {
                        prop_assert!(!marked);
                    } else {
                        prop_assert_eq!(marked, model_marked.insert(n));
                    }
                }
                Op::Delete(n) => {
                    guard.add_deleted(&file_path(n));
                    model_marked.remove(&n);
                    model_deleted.insert(n);
                    prop_assert!(!guard.is_marked_recompile(&root, &file_path(n)));
                }
                Op::ClearDeleted => {
                    guard.clear_deleted_paths();
                    model_deleted.clear();
                }
            }
        }

        let guard = delta.lock();
        let marked_files: HashSet<PathBuf> = guard
            .sources_to_recompile()
            .get(&root)
            .map(|files| files.iter().cloned().collect())
            .unwrap_or_default();
        let expected_marked: HashSet<PathBuf> = model_marked.iter().map(|&n| file_path(n)).collect();
        prop_assert_eq!(marked_files, expected_marked);

        let expected_deleted: HashSet<String> = model_deleted
            .iter()
            .map(|&n| file_path(n).to_string_lossy().into_owned())
            .collect();
        prop_assert_eq!(guard.deleted_paths().clone(), expected_deleted);
    }

    // A merged delta is the union of its inputs and shares no mutable state
    // with them.
    #[test]
    fn merged_delta_is_an_independent_union(
        left in proptest::collection::vec(0..8u8, 0..16),
        right in proptest::collection::vec(0..8u8, 0..16),
        deleted in proptest::collection::vec(0..8u8, 0..8),
    ) {
        let target_a = module_target("a");
        let target_b = module_target("b");
        let root_a = source_root(1, &target_a, "/p");
        let root_b = source_root(2, &target_b, "/q");

        let delta_a = FilesDelta::new();
        for n in &left {
            delta_a.lock().mark_recompile(&root_a, &file_path(*n));
        }
        let delta_b = FilesDelta::new();
        for n in &right {
            delta_b.lock().mark_recompile(&root_b, &file_path(*n));
        }
        for n in &deleted {
            delta_b.lock().add_deleted(&file_path(*n));
        }

        let merged = FilesDelta::merged([&delta_a, &delta_b]);
        {
            let guard = merged.lock();
            for n in &left {
                prop_assert!(guard.is_marked_recompile(&root_a, &file_path(*n)));
            }
            for n in &right {
                let expect = !deleted.contains(n);
                prop_assert_eq!(guard.is_marked_recompile(&root_b, &file_path(*n)), expect);
            }
            for n in &deleted {
                prop_assert!(guard.deleted_paths().contains(
                    file_path(*n).to_string_lossy().as_ref()
                ));
            }
        }

        // Mutating the merged snapshot leaves the inputs alone.
        merged.lock().mark_recompile(&root_a, Path::new("/p/merged-only.txt"));
        prop_assert!(!delta_a.lock().is_marked_recompile(&root_a, Path::new("/p/merged-only.txt")));
    }

    // Whatever a delta writes, a fresh delta reads back element-wise.
    #[test]
    fn delta_save_load_round_trips(
        marks in proptest::collection::vec(0..8u8, 0..16),
        deletes in proptest::collection::vec(0..8u8, 0..8),
    ) {
        let target = module_target("m");
        let root = source_root(1, &target, "/p");
        let mut index = StaticRootIndex::new();
        index.register(root.clone());

        let delta = FilesDelta::new();
        {
            let mut guard = delta.lock();
            for n in &marks {
                guard.mark_recompile(&root, &file_path(*n));
            }
            for n in &deletes {
                guard.add_deleted(&file_path(*n));
            }
        }

        let mut buf = Vec::new();
        delta.lock().save(&mut buf).unwrap();

        let fresh = FilesDelta::new();
        fresh
            .lock()
            .load(&mut Cursor::new(buf), &target, &index)
            .unwrap();

        let original = delta.lock();
        let loaded = fresh.lock();
        prop_assert_eq!(
            original.sources_to_recompile().get(&root),
            loaded.sources_to_recompile().get(&root)
        );
        prop_assert_eq!(original.deleted_paths(), loaded.deleted_paths());
    }
}
