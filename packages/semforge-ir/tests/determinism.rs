//! Determinism and provenance properties across builds and builders.

mod common;

use common::{config_at, parser, src};
use pretty_assertions::assert_eq;
use semforge_ir::features::semantic::domain::SemanticTier;
use semforge_ir::pipeline::Builder;
use tempfile::TempDir;

const FILE_A: &str = "module pkga\nfn caller calls helper uses x\n";
const FILE_B: &str = "module pkgb\nfn helper uses y\n";

#[test]
fn same_inputs_same_graph_across_builders() {
    let files = vec![src("pkg/a.py", FILE_A, 100), src("pkg/b.py", FILE_B, 100)];

    let root1 = TempDir::new().unwrap();
    let config1 = config_at(root1.path());
    let builder1 = Builder::new(parser(), &config1).unwrap();
    let snap1 = builder1.build(&files, &config1).unwrap();

    // Fresh builder, fresh cache directory, same inputs.
    let root2 = TempDir::new().unwrap();
    let config2 = config_at(root2.path());
    let builder2 = Builder::new(parser(), &config2).unwrap();
    let snap2 = builder2.build(&files, &config2).unwrap();

    assert_eq!(snap1.graph().digest(), snap2.graph().digest());
    assert!(snap1.provenance().equivalent(snap2.provenance()));
}

#[test]
fn config_change_breaks_equivalence() {
    let files = vec![src("pkg/a.py", FILE_A, 100)];
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();
    let base = builder.build(&files, &config).unwrap();

    let mut full_config = config.clone();
    full_config.semantic_tier = SemanticTier::Full;
    let full = builder.build(&files, &full_config).unwrap();

    assert_ne!(
        base.provenance().config_fingerprint,
        full.provenance().config_fingerprint
    );
    assert!(!base.provenance().equivalent(full.provenance()));
    // The FULL graph strictly extends the BASE graph.
    assert!(full.graph().node_count() > base.graph().node_count());
}

#[test]
fn tier_layers_are_monotone_in_snapshots() {
    let files = vec![src("pkg/a.py", FILE_A, 100)];
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let layers_at = |tier: SemanticTier| {
        let mut config = config.clone();
        config.semantic_tier = tier;
        let snap = builder.build(&files, &config).unwrap();
        let entry = snap.files().values().next().unwrap().clone();
        entry.semantic.as_ref().unwrap().layers()
    };

    let base = layers_at(SemanticTier::Base);
    let extended = layers_at(SemanticTier::Extended);
    let full = layers_at(SemanticTier::Full);

    assert!(base.is_subset(&extended));
    assert!(extended.is_subset(&full));
    assert!(base.len() < extended.len());
    assert!(extended.len() < full.len());
}

#[test]
fn empty_incremental_equals_prior() {
    let files = vec![src("pkg/a.py", FILE_A, 100), src("pkg/b.py", FILE_B, 100)];
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let prior = builder.build(&files, &config).unwrap();
    let next = builder
        .build_incremental(Some(&prior), &files, &config)
        .unwrap();

    // Equal up to provenance timestamps and the snapshot id.
    assert_eq!(prior.graph().digest(), next.graph().digest());
    assert!(prior.provenance().equivalent(next.provenance()));
    assert_ne!(prior.id, next.id);
    assert_eq!(next.telemetry().files_rebuilt, 0);
}

#[test]
fn snapshot_ids_are_monotone() {
    let files = vec![src("pkg/a.py", FILE_A, 100)];
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let first = builder.build(&files, &config).unwrap();
    let second = builder.build(&files, &config).unwrap();
    assert!(second.id > first.id);
}

#[test]
fn missing_prior_falls_back_to_full_build() {
    let files = vec![src("pkg/a.py", FILE_A, 100)];
    let root = TempDir::new().unwrap();
    let config = config_at(root.path());
    let builder = Builder::new(parser(), &config).unwrap();

    let snap = builder.build_incremental(None, &files, &config).unwrap();
    assert_eq!(snap.file_count(), 1);
    assert!(!snap.is_partial());
}
