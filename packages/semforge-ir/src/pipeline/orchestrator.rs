//! Build orchestration.
//!
//! The coordinator is a state machine (Planning → Dispatch → Merge →
//! Commit → Idle); per-file work runs on a rayon pool fed through a
//! bounded channel (admission = workers × 2). A full task queue defers
//! the task to the next wave and records it; nothing is silently lost.
//! Cancellation is cooperative at task boundaries. Results merge through
//! sorted maps, so output order never depends on scheduling.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use prometheus::Registry;

use super::error::{BuildError, BuildFault, BuildResult, BuildStage};
use super::provenance::BuildProvenance;
use super::result::{BuildTelemetry, FileEntry, Snapshot, SnapshotId, StaleReport};
use crate::config::BuildConfig;
use crate::features::cache::{
    CacheStats, ContentHash, FileId, FileMetadata, Hash128, SemanticCacheKey, TieredCache,
    GRAPH_NS, SEMANTIC_NS, STRUCTURAL_NS,
};
use crate::features::graph::{FileDependencyGraph, FileInputs, GraphBuilder, GraphDocument};
use crate::features::incremental::{
    detect_changes, expand_scope, ReindexPolicy, SourceFile,
};
use crate::features::semantic::builder::ProjectContext;
use crate::features::semantic::{Planner, SemanticBuilder, SemanticIR, TierPlan};
use crate::features::storage::{MemoryStore, SnapshotRecord, SnapshotStatus, SnapshotStore};
use crate::features::structural::StructuralIR;
use crate::shared::ports::{
    LockPort, NoOpLock, NullTypeService, StructuralParser, TypeInferencePort,
};

/// Default drain timeout at shutdown.
pub const SHUTDOWN_FLUSH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordinatorState {
    Idle,
    Planning,
    Dispatch,
    Merge,
    Commit,
}

/// Cooperative cancellation token, checked at task boundaries.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Pipeline counters, registered next to the cache metrics.
#[derive(Clone)]
struct PipelineMetrics {
    builds_total: prometheus::IntCounter,
    files_processed: prometheus::IntCounter,
    files_cached: prometheus::IntCounter,
    files_failed: prometheus::IntCounter,
}

impl PipelineMetrics {
    fn new(registry: &Registry) -> Self {
        let counter = |name: &str, help: &str| {
            prometheus::register_int_counter_with_registry!(
                prometheus::Opts::new(format!("pipeline_{name}"), help.to_string()),
                registry
            )
            .expect("metric registration")
        };
        Self {
            builds_total: counter("builds_total", "Completed builds"),
            files_processed: counter("files_processed_total", "Files processed"),
            files_cached: counter("files_cached_total", "Files served from cache"),
            files_failed: counter("files_failed_total", "Files with build faults"),
        }
    }
}

struct ParseOutcome {
    file_id: FileId,
    metadata: Option<FileMetadata>,
    result: Result<Arc<StructuralIR>, BuildFault>,
}

struct SemanticOutcome {
    file_id: FileId,
    key: Hash128,
    result: Result<Arc<SemanticIR>, BuildFault>,
    reused: bool,
}

/// The builder: composition root over parser, type service, lock service,
/// caches and the snapshot store.
pub struct Builder {
    parser: Arc<dyn StructuralParser>,
    types: Arc<dyn TypeInferencePort>,
    lock: Arc<dyn LockPort>,
    store: Arc<dyn SnapshotStore>,
    structural_cache: TieredCache<StructuralIR>,
    semantic_cache: TieredCache<SemanticIR>,
    graph_cache: TieredCache<GraphDocument>,
    pool: rayon::ThreadPool,
    workers: usize,
    snapshot_seq: AtomicU64,
    cancel: CancellationToken,
    state: Mutex<CoordinatorState>,
    metrics: PipelineMetrics,
    registry: Registry,
}

impl Builder {
    pub fn new(parser: Arc<dyn StructuralParser>, config: &BuildConfig) -> BuildResult<Self> {
        config.validate()?;
        let registry = Registry::new();
        let settings = config.tier_settings();
        let root = config.cache_root.as_path();

        let structural_cache = TieredCache::new(root, STRUCTURAL_NS, &settings, &registry)
            .map_err(|e| BuildError::Init(e.to_string()))?;
        let semantic_cache = TieredCache::new(root, SEMANTIC_NS, &settings, &registry)
            .map_err(|e| BuildError::Init(e.to_string()))?;
        let graph_cache = TieredCache::new(root, GRAPH_NS, &settings, &registry)
            .map_err(|e| BuildError::Init(e.to_string()))?;

        let workers = config.parallel_workers.max(1) as usize;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("semforge-worker-{i}"))
            .build()
            .map_err(|e| BuildError::Init(e.to_string()))?;

        let metrics = PipelineMetrics::new(&registry);
        Ok(Self {
            parser,
            types: Arc::new(NullTypeService),
            lock: Arc::new(NoOpLock),
            store: Arc::new(MemoryStore::new()),
            structural_cache,
            semantic_cache,
            graph_cache,
            pool,
            workers,
            snapshot_seq: AtomicU64::new(1),
            cancel: CancellationToken::default(),
            state: Mutex::new(CoordinatorState::Idle),
            metrics,
            registry,
        })
    }

    pub fn with_types(mut self, types: Arc<dyn TypeInferencePort>) -> Self {
        self.types = types;
        self
    }

    pub fn with_lock(mut self, lock: Arc<dyn LockPort>) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn structural_stats(&self) -> CacheStats {
        self.structural_cache.stats()
    }

    pub fn semantic_stats(&self) -> CacheStats {
        self.semantic_cache.stats()
    }

    pub fn graph_stats(&self) -> CacheStats {
        self.graph_cache.stats()
    }

    pub fn metrics_registry(&self) -> &Registry {
        &self.registry
    }

    /// Full build of the requested file set.
    pub fn build(&self, files: &[SourceFile], config: &BuildConfig) -> BuildResult<Snapshot> {
        self.cancel.reset();
        self.set_state(CoordinatorState::Planning);
        config.validate()?;
        let plan = Planner::new().plan_override(config.semantic_tier, config)?;
        self.execute(files, BTreeMap::new(), config, plan, 0, Vec::new())
    }

    /// Incremental build against a prior snapshot. A missing prior falls
    /// back to a full build.
    pub fn build_incremental(
        &self,
        prior: Option<&Snapshot>,
        files: &[SourceFile],
        config: &BuildConfig,
    ) -> BuildResult<Snapshot> {
        self.build_incremental_with_policy(prior, files, config, ReindexPolicy::Balanced)
    }

    pub fn build_incremental_with_policy(
        &self,
        prior: Option<&Snapshot>,
        files: &[SourceFile],
        config: &BuildConfig,
        policy: ReindexPolicy,
    ) -> BuildResult<Snapshot> {
        let Some(prior) = prior else {
            tracing::warn!("prior snapshot missing, falling back to full build");
            return self.build(files, config);
        };

        self.cancel.reset();
        self.set_state(CoordinatorState::Planning);
        config.validate()?;
        let plan = Planner::new().plan_override(config.semantic_tier, config)?;

        let changes = detect_changes(&prior.metadata_map(), files);
        tracing::info!(
            added = changes.added.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            "incremental change detection"
        );

        // Stale-edge marking on a working copy of the prior graph. The
        // marked edges stay queryable (flagged) while the build runs;
        // re-validation happens against the committed graph, so a symbol
        // deleted inside a modified file is caught. Nothing stays stale
        // past the transition because the new graph is rebuilt from
        // per-file IR.
        let mut stale_marked = 0usize;
        let mut working = prior.graph().clone();
        for file in changes.changed().iter().chain(changes.deleted.iter()) {
            stale_marked += working.mark_stale_for_file(file);
        }
        let stale_targets: Vec<String> = working
            .edges
            .iter()
            .filter(|e| e.status == crate::features::graph::EdgeStatus::Stale)
            .map(|e| e.target.clone())
            .collect();

        // Scope expansion over the prior graph's reverse indexes.
        let prior_irs: Vec<Arc<StructuralIR>> = prior
            .files()
            .values()
            .map(|e| Arc::clone(&e.structural))
            .collect();
        let dep_graph = FileDependencyGraph::build(&prior_irs);
        let reindex = expand_scope(&changes, prior.graph(), &dep_graph, policy);
        tracing::info!(reindex = reindex.len(), policy = ?policy, "scope expansion");

        // Reuse prior entries for requested files outside the re-index
        // set; promote metadata for touched files.
        let mut reuse: BTreeMap<FileId, FileEntry> = BTreeMap::new();
        for file in files {
            if reindex.contains(&file.id) {
                continue;
            }
            if let Some(entry) = prior.file(&file.id) {
                let mut entry = entry.clone();
                entry.metadata.mtime_ns = file.mtime_ns;
                entry.metadata.size_bytes = file.size_bytes;
                reuse.insert(file.id.clone(), entry);
            }
        }

        self.execute(files, reuse, config, plan, stale_marked, stale_targets)
    }

    /// Shared pipeline: parse wave → project context → semantic wave →
    /// graph → commit.
    fn execute(
        &self,
        request: &[SourceFile],
        reuse: BTreeMap<FileId, FileEntry>,
        config: &BuildConfig,
        plan: TierPlan,
        stale_marked: usize,
        stale_targets: Vec<String>,
    ) -> BuildResult<Snapshot> {
        let started = Instant::now();
        let mut telemetry = BuildTelemetry {
            files_total: request.len(),
            files_reused: reuse.len(),
            stale: StaleReport {
                marked: stale_marked,
                ..StaleReport::default()
            },
            ..BuildTelemetry::default()
        };
        let mut faults: Vec<BuildFault> = Vec::new();

        // Purge L0 orphans for the request universe.
        let universe: HashSet<FileId> = request.iter().map(|f| f.id.clone()).collect();
        self.structural_cache.purge_orphans(&universe);
        self.semantic_cache.purge_orphans(&universe);

        let config_hash = config.config_hash();

        // ── Dispatch: parse wave ──
        self.set_state(CoordinatorState::Dispatch);
        let to_build: Vec<SourceFile> = request
            .iter()
            .filter(|f| !reuse.contains_key(&f.id))
            .cloned()
            .collect();
        telemetry.files_rebuilt = to_build.len();

        let stage_started = Instant::now();
        let (parsed, deferred) = self.dispatch(to_build, |file| self.parse_task(file));
        telemetry.deferred += deferred;
        telemetry
            .stage_durations
            .insert("parse", stage_started.elapsed());
        if self.cancel.is_cancelled() {
            self.set_state(CoordinatorState::Idle);
            return Err(BuildError::Cancelled);
        }

        let mut structural: BTreeMap<FileId, (Arc<StructuralIR>, FileMetadata)> = BTreeMap::new();
        for outcome in parsed {
            match (outcome.result, outcome.metadata) {
                (Ok(ir), Some(metadata)) => {
                    structural.insert(outcome.file_id, (ir, metadata));
                }
                (Err(fault), _) => faults.push(fault),
                (Ok(_), None) => unreachable!("parse success always carries metadata"),
            }
        }

        // ── Merge inputs: reused + fresh structural IR ──
        self.set_state(CoordinatorState::Merge);
        let mut all_irs: Vec<Arc<StructuralIR>> = reuse
            .values()
            .map(|e| Arc::clone(&e.structural))
            .collect();
        all_irs.extend(structural.values().map(|(ir, _)| Arc::clone(ir)));
        all_irs.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        let project = Arc::new(ProjectContext::from_structural(&all_irs));

        // ── Dispatch: semantic wave ──
        self.set_state(CoordinatorState::Dispatch);
        let stage_started = Instant::now();
        let semantic_inputs: Vec<(FileId, Arc<StructuralIR>, FileMetadata)> = structural
            .iter()
            .map(|(id, (ir, meta))| (id.clone(), Arc::clone(ir), *meta))
            .collect();
        let repo_id = config.repo_id.clone();
        let (semantic_outcomes, deferred) = self.dispatch(semantic_inputs, |(id, ir, meta)| {
            self.semantic_task(&repo_id, &project, plan, config_hash, id, ir, meta)
        });
        telemetry.deferred += deferred;
        telemetry
            .stage_durations
            .insert("semantic", stage_started.elapsed());
        if self.cancel.is_cancelled() {
            self.set_state(CoordinatorState::Idle);
            return Err(BuildError::Cancelled);
        }

        // ── Merge: assemble file entries in sorted order ──
        self.set_state(CoordinatorState::Merge);
        let mut semantic_by_file: BTreeMap<FileId, SemanticOutcome> = BTreeMap::new();
        for outcome in semantic_outcomes {
            semantic_by_file.insert(outcome.file_id.clone(), outcome);
        }

        let mut entries: BTreeMap<FileId, FileEntry> = reuse;
        let mut owned_keys: Vec<Hash128> = Vec::new();
        for (file_id, (ir, metadata)) in &structural {
            let semantic = match semantic_by_file.remove(file_id) {
                Some(outcome) => {
                    owned_keys.push(outcome.key);
                    if outcome.reused {
                        telemetry.files_reused += 1;
                    }
                    match outcome.result {
                        Ok(semantic) => Some(semantic),
                        Err(fault) => {
                            faults.push(fault);
                            None
                        }
                    }
                }
                None => None,
            };
            entries.insert(
                file_id.clone(),
                FileEntry {
                    metadata: *metadata,
                    structural: Arc::clone(ir),
                    structural_digest: ir.digest(),
                    semantic,
                },
            );
        }
        telemetry.files_failed = faults.len();

        // ── Graph materialization (cached by inputs ‖ config) ──
        let stage_started = Instant::now();
        let file_hashes: Vec<(FileId, ContentHash)> = entries
            .iter()
            .map(|(id, e)| (id.clone(), e.metadata.content_hash))
            .collect();
        let input_fingerprint =
            BuildProvenance::input_fingerprint(&config.repo_id, &file_hashes);
        let graph_key = Hash128::of_parts(&[
            input_fingerprint.as_bytes(),
            &config_hash.0.to_le_bytes(),
            b"graph",
        ]);

        let graph = match faults.is_empty() {
            true => self.graph_cache.get_keyed(graph_key),
            // Partial builds never reuse or publish graph cache entries.
            false => None,
        };
        let graph = match graph {
            Some(graph) => graph,
            None => {
                let inputs: BTreeMap<FileId, FileInputs> = entries
                    .iter()
                    .map(|(id, e)| {
                        (
                            id.clone(),
                            FileInputs {
                                structural: Arc::clone(&e.structural),
                                semantic: e.semantic.clone(),
                            },
                        )
                    })
                    .collect();
                let built = Arc::new(GraphBuilder::new(&config.repo_id).build(&inputs));
                if faults.is_empty() {
                    self.graph_cache.set_keyed(graph_key, Arc::clone(&built));
                    owned_keys.push(graph_key);
                }
                built
            }
        };
        telemetry
            .stage_durations
            .insert("graph", stage_started.elapsed());

        // Lazy re-validation of edges marked stale: a target that still
        // resolves in the committed graph is Valid again, a vanished one
        // is Invalid.
        for target in &stale_targets {
            if graph.contains_node(target) {
                telemetry.stale.revalidated_valid += 1;
            } else {
                telemetry.stale.revalidated_invalid += 1;
            }
        }

        // ── Commit ──
        self.set_state(CoordinatorState::Commit);
        telemetry.duration = started.elapsed();

        let provenance = BuildProvenance {
            input_fingerprint,
            builder_version: BuildProvenance::builder_version(config),
            config_fingerprint: config_hash,
            dependency_fingerprint: BuildProvenance::dependency_fingerprint(
                self.parser.version(),
                self.types.version(),
            ),
            timestamp: Utc::now(),
            duration: telemetry.duration,
            parallel_seed: BuildProvenance::derive_seed(&input_fingerprint, config_hash),
        };

        let id = SnapshotId(self.snapshot_seq.fetch_add(1, Ordering::SeqCst));
        owned_keys.sort();
        owned_keys.dedup();
        let record = SnapshotRecord {
            repo_id: config.repo_id.clone(),
            snapshot_id: id.0,
            git_commit: None,
            indexed_at: provenance.timestamp,
            status: SnapshotStatus::Committed,
            duration_ms: telemetry.duration.as_millis() as u64,
            tagged: false,
            provenance: provenance.clone(),
            owned_keys,
        };
        if let Err(err) = self.store.insert(record) {
            tracing::warn!(%err, "snapshot metadata insert failed");
        }

        self.metrics.builds_total.inc();
        self.metrics
            .files_processed
            .inc_by(telemetry.files_total as u64);
        self.metrics
            .files_cached
            .inc_by(telemetry.files_reused as u64);
        self.metrics.files_failed.inc_by(faults.len() as u64);

        let snapshot = Snapshot::new(
            id,
            config.repo_id.clone(),
            entries,
            graph,
            provenance,
            faults,
            telemetry,
        );
        self.set_state(CoordinatorState::Idle);
        tracing::info!(
            snapshot = %snapshot.id,
            files = snapshot.file_count(),
            faults = snapshot.faults().len(),
            "build committed"
        );
        Ok(snapshot)
    }

    /// Bounded-channel dispatch onto the worker pool. Admission is
    /// workers × 2; an overflowing task is deferred (and counted), then
    /// delivered with a blocking send so it is never lost.
    fn dispatch<T, R, F>(&self, tasks: Vec<T>, f: F) -> (Vec<R>, usize)
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        if tasks.is_empty() {
            return (Vec::new(), 0);
        }
        let admit = self.workers * 2;
        let (task_tx, task_rx) = crossbeam_channel::bounded::<T>(admit);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<R>();
        let deferred = AtomicUsize::new(0);
        let cancel = &self.cancel;
        let f = &f;

        // Producer stays on the coordinator thread; workers drain on the
        // pool. (A pool-resident producer could deadlock a full queue.)
        self.pool.in_place_scope(|scope| {
            for _ in 0..self.workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move |_| {
                    while let Ok(task) = task_rx.recv() {
                        // Cooperative cancellation at the task boundary:
                        // drain without doing the work.
                        if cancel.is_cancelled() {
                            continue;
                        }
                        let _ = result_tx.send(f(task));
                    }
                });
            }
            drop(task_rx);
            drop(result_tx);

            let mut queue: VecDeque<T> = tasks.into_iter().collect();
            while let Some(task) = queue.pop_front() {
                match task_tx.try_send(task) {
                    Ok(()) => {}
                    Err(crossbeam_channel::TrySendError::Full(task)) => {
                        deferred.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!("admission bound reached, deferring task");
                        if task_tx.send(task).is_err() {
                            break;
                        }
                    }
                    Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
                }
            }
            drop(task_tx);
        });

        (
            result_rx.into_iter().collect(),
            deferred.load(Ordering::Relaxed),
        )
    }

    /// Per-file parse with structural cache interaction.
    fn parse_task(&self, file: SourceFile) -> ParseOutcome {
        // Fast path: stat-identical file, no rehash.
        if let Some(ir) = self
            .structural_cache
            .fast_path(&file.id, file.mtime_ns, file.size_bytes)
        {
            let metadata = FileMetadata::new(file.mtime_ns, file.size_bytes, ir.content_hash);
            return ParseOutcome {
                file_id: file.id,
                metadata: Some(metadata),
                result: Ok(ir),
            };
        }

        let content_hash = file.content_hash();
        let metadata = FileMetadata::new(file.mtime_ns, file.size_bytes, content_hash);
        if let Some(ir) = self
            .structural_cache
            .get(&file.id, content_hash.0, &metadata)
        {
            // A rename hits through the content key; rebind the handle to
            // the requesting path (digest is path-independent).
            let ir = if ir.file_id == file.id {
                ir
            } else {
                Arc::new(ir.rebind(file.id.clone()))
            };
            return ParseOutcome {
                file_id: file.id,
                metadata: Some(metadata),
                result: Ok(ir),
            };
        }

        match self.parser.parse(&file.id, &file.bytes) {
            Ok(ir) => {
                let ir = ir.seal();
                if let Err(err) = ir.validate() {
                    return ParseOutcome {
                        file_id: file.id.clone(),
                        metadata: Some(metadata),
                        result: Err(BuildFault {
                            file: file.id,
                            stage: BuildStage::Parse,
                            reason: err.to_string(),
                        }),
                    };
                }
                let ir = Arc::new(ir);
                self.structural_cache
                    .set(&file.id, content_hash.0, Arc::clone(&ir), &metadata);
                ParseOutcome {
                    file_id: file.id,
                    metadata: Some(metadata),
                    result: Ok(ir),
                }
            }
            Err(err) => ParseOutcome {
                file_id: file.id.clone(),
                metadata: Some(metadata),
                result: Err(BuildFault {
                    file: file.id,
                    stage: BuildStage::Parse,
                    reason: err.to_string(),
                }),
            },
        }
    }

    /// Per-file semantic build with cache interaction and file lock.
    #[allow(clippy::too_many_arguments)]
    fn semantic_task(
        &self,
        repo_id: &str,
        project: &ProjectContext,
        plan: TierPlan,
        config_hash: crate::features::cache::ConfigHash,
        file_id: FileId,
        structural: Arc<StructuralIR>,
        metadata: FileMetadata,
    ) -> SemanticOutcome {
        let digest = structural.digest();
        let key = SemanticCacheKey::derive(&metadata.content_hash, &digest, config_hash).0;

        if let Some(semantic) = self.semantic_cache.get(&file_id, key, &metadata) {
            // Rename hit: the path plays no part in the key, only in the
            // handle we give back.
            let semantic = if semantic.file_id == file_id {
                semantic
            } else {
                let mut rebound = (*semantic).clone();
                rebound.file_id = file_id.clone();
                Arc::new(rebound)
            };
            return SemanticOutcome {
                file_id,
                key,
                result: Ok(semantic),
                reused: true,
            };
        }

        // File-granular lock; an unavailable lock degrades to an
        // unlocked build (L2 writes stay safe through atomic rename).
        let lease = match self.lock.acquire(repo_id, &file_id) {
            Ok(lease) => Some(lease),
            Err(err) => {
                tracing::warn!(%err, file = %file_id, "lock unavailable, building unlocked");
                None
            }
        };

        let builder = SemanticBuilder::new(project, self.types.as_ref(), plan.tier, plan.options);
        let result = match builder.build_file(&structural) {
            Ok(semantic) => {
                let semantic = Arc::new(semantic);
                self.semantic_cache
                    .set(&file_id, key, Arc::clone(&semantic), &metadata);
                Ok(semantic)
            }
            Err(err) => Err(BuildFault {
                file: file_id.clone(),
                stage: match err.stage {
                    "signatures" => BuildStage::Signatures,
                    "expressions" => BuildStage::Expressions,
                    "data_flow" => BuildStage::DataFlow,
                    "ssa" => BuildStage::Ssa,
                    _ => BuildStage::Flow,
                },
                reason: err.reason,
            }),
        };
        if let Some(lease) = lease {
            lease.release();
        }

        SemanticOutcome {
            file_id,
            key,
            result,
            reused: false,
        }
    }

    fn set_state(&self, next: CoordinatorState) {
        let mut state = self.state.lock();
        tracing::debug!(from = ?*state, to = ?next, "coordinator transition");
        *state = next;
    }

    /// Cooperative shutdown: cancel outstanding work and drop in-memory
    /// cache tiers. L2 writes are synchronous write-through, so there is
    /// nothing left to flush; the timeout bounds worker drain.
    pub fn shutdown(&self, timeout: Duration) {
        self.cancel.cancel();
        let deadline = Instant::now() + timeout;
        while *self.state.lock() != CoordinatorState::Idle {
            if Instant::now() >= deadline {
                tracing::warn!("shutdown drain timed out, aborting remaining work");
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        self.structural_cache.shutdown();
        self.semantic_cache.shutdown();
        self.graph_cache.shutdown();
    }
}
