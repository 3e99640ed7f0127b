//! Cache behavior scenarios: cold/warm, rename, whitespace edits,
//! corruption, write denial, faults.

mod common;

use std::fs;

use common::{config_at, parser, src};
use semforge_ir::pipeline::Builder;
use tempfile::TempDir;

fn ten_function_file() -> String {
    let mut content = String::from("module pkga\n");
    for i in 0..10 {
        content.push_str(&format!("fn func{i} uses a{i} b{i}\n"));
    }
    content
}

#[test]
fn cold_then_warm_build_skips_semantic_work() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();
    let files = vec![src("pkg/a.py", &ten_function_file(), 100)];

    let cold = builder.build(&files, &config).unwrap();
    let after_cold = builder.semantic_stats();
    assert_eq!(after_cold.misses, 1, "one semantic miss per file on cold build");

    let warm = builder.build(&files, &config).unwrap();
    let after_warm = builder.semantic_stats();

    // No new misses; the warm build served everything from cache.
    assert_eq!(after_warm.misses, after_cold.misses);
    assert!(after_warm.hits() > after_cold.hits());
    assert_eq!(warm.telemetry().files_reused, 1);

    // Graphs are identical, and the graph itself came from cache.
    assert_eq!(cold.graph().digest(), warm.graph().digest());
    assert_eq!(builder.graph_stats().misses, 1);
}

#[test]
fn warm_build_across_processes_hits_l2() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let files = vec![src("pkg/a.py", &ten_function_file(), 100)];

    let first = Builder::new(parser(), &config).unwrap();
    let cold = first.build(&files, &config).unwrap();

    // Second builder over the same cache root simulates a new process:
    // L0/L1 are empty, L2 is shared.
    let second = Builder::new(parser(), &config).unwrap();
    let warm = second.build(&files, &config).unwrap();

    assert_eq!(second.semantic_stats().l2_hits, 1);
    assert_eq!(cold.graph().digest(), warm.graph().digest());
}

#[test]
fn rename_without_edit_hits_semantic_cache() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();
    let content = "module pkga\nfn solo uses x\n";

    let before = builder
        .build(&[src("a/b.py", content, 100)], &config)
        .unwrap();
    let misses_before = builder.semantic_stats().misses;

    // Rename only: new path, same bytes, fresh mtime.
    let after = builder
        .build(&[src("a/c.py", content, 200)], &config)
        .unwrap();

    assert_eq!(
        builder.semantic_stats().misses,
        misses_before,
        "rename must not miss the semantic cache"
    );
    assert_eq!(after.telemetry().files_reused, 1);

    // The snapshot carries the new path with the old content identity.
    let old_entry = before.file(&"a/b.py".into_file_id()).unwrap();
    let new_entry = after.file(&"a/c.py".into_file_id()).unwrap();
    assert_eq!(old_entry.metadata.content_hash, new_entry.metadata.content_hash);
    assert!(after.graph().contains_node("file:a/c.py"));
    assert!(!after.graph().contains_node("file:a/b.py"));
}

#[test]
fn whitespace_only_edit_keeps_structural_digest() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let original = "module pkga\nfn solo uses x\n";
    let padded = "module pkga\nfn solo uses x   \n";

    let before = builder
        .build(&[src("pkg/a.py", original, 100)], &config)
        .unwrap();
    let misses_before = builder.semantic_stats().misses;

    let after = builder
        .build(&[src("pkg/a.py", padded, 200)], &config)
        .unwrap();

    let entry_before = before.file(&"pkg/a.py".into_file_id()).unwrap();
    let entry_after = after.file(&"pkg/a.py".into_file_id()).unwrap();

    // Content identity changes, structural identity does not.
    assert_ne!(
        entry_before.metadata.content_hash,
        entry_after.metadata.content_hash
    );
    assert_eq!(entry_before.structural_digest, entry_after.structural_digest);

    // Default keying includes the content hash, so this is a miss.
    assert_eq!(builder.semantic_stats().misses, misses_before + 1);
}

#[test]
fn corrupt_l2_record_is_deleted_and_rebuilt() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let files = vec![src("pkg/a.py", "module pkga\nfn solo uses x\n", 100)];

    let first = Builder::new(parser(), &config).unwrap();
    first.build(&files, &config).unwrap();

    // Flip one byte in the committed semantic record.
    let semantic_dir = root
        .path()
        .join("semantic")
        .join(&config.engine_version)
        .join(config.schema_version.to_string());
    let record = fs::read_dir(&semantic_dir)
        .unwrap()
        .flatten()
        .map(|e| e.path())
        .find(|p| p.extension().and_then(|e| e.to_str()) == Some("sem"))
        .expect("committed semantic record");
    let mut bytes = fs::read(&record).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&record, &bytes).unwrap();

    // Fresh process: memory tiers empty, corrupt record on disk.
    let second = Builder::new(parser(), &config).unwrap();
    let snap = second.build(&files, &config).unwrap();

    assert!(!snap.is_partial(), "corruption must stay invisible to callers");
    let stats = second.semantic_stats();
    assert_eq!(stats.corrupt_entries, 1);
    assert_eq!(stats.misses, 1, "corrupt entry reads as a miss");

    // The rebuild re-committed a valid record.
    let third = Builder::new(parser(), &config).unwrap();
    third.build(&files, &config).unwrap();
    assert_eq!(third.semantic_stats().l2_hits, 1);
    assert_eq!(third.semantic_stats().corrupt_entries, 0);
}

#[cfg(unix)]
#[test]
fn denied_l2_writes_never_fail_the_build() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    // Make every namespace directory read-only before the first write.
    for namespace in ["structural", "semantic", "graph"] {
        let dir = root
            .path()
            .join(namespace)
            .join(&config.engine_version)
            .join(config.schema_version.to_string());
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o555)).unwrap();
    }

    let files = vec![src("pkg/a.py", "module pkga\nfn solo uses x\n", 100)];
    let snap = builder.build(&files, &config).unwrap();
    assert!(!snap.is_partial());

    let failed_writes: u64 = [
        builder.structural_stats(),
        builder.semantic_stats(),
        builder.graph_stats(),
    ]
    .iter()
    .map(|s| s.write_fails + s.disk_full_errors)
    .sum();
    assert!(failed_writes > 0, "denied writes must be counted");

    // Restore permissions so TempDir cleanup works.
    for namespace in ["structural", "semantic", "graph"] {
        let dir = root
            .path()
            .join(namespace)
            .join(&config.engine_version)
            .join(config.schema_version.to_string());
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o755)).unwrap();
    }
}

#[test]
fn parse_fault_yields_partial_snapshot() {
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let files = vec![
        src("pkg/good.py", "module pkga\nfn fine uses x\n", 100),
        src("pkg/bad.py", "module pkgb\n!!\n", 100),
    ];
    let snap = builder.build(&files, &config).unwrap();

    assert!(snap.is_partial());
    assert_eq!(snap.faults().len(), 1);
    assert_eq!(snap.faults()[0].file.as_str(), "pkg/bad.py");

    // The healthy file is fully built.
    let good = snap.file(&"pkg/good.py".into_file_id()).unwrap();
    assert!(good.semantic.is_some());
    // The faulty file contributes nothing.
    assert!(snap.file(&"pkg/bad.py".into_file_id()).is_none());
}

#[test]
fn tier_upgrade_reuses_structural_and_rebuilds_semantic() {
    use semforge_ir::features::semantic::domain::SemanticTier;

    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();
    let files = vec![src("pkg/a.py", "module pkga\nfn solo uses x\n", 100)];

    builder.build(&files, &config).unwrap();
    let semantic_misses = builder.semantic_stats().misses;
    let structural_hits = builder.structural_stats().hits();

    let mut extended = config.clone();
    extended.semantic_tier = SemanticTier::Extended;
    builder.build(&files, &extended).unwrap();

    // Structural artifacts are reused, semantic keys differ by config.
    assert!(builder.structural_stats().hits() > structural_hits);
    assert_eq!(builder.semantic_stats().misses, semantic_misses + 1);
    assert!(builder.semantic_stats().l2_hits == 0);
}

/// Tiny helper so tests read naturally.
trait IntoFileId {
    fn into_file_id(&self) -> semforge_ir::features::cache::FileId;
}

impl IntoFileId for &str {
    fn into_file_id(&self) -> semforge_ir::features::cache::FileId {
        semforge_ir::features::cache::FileId::new(self)
    }
}
