//! Incremental build engine: change detection, scope expansion, impact
//! analysis and snapshot retention.

mod change_detector;
mod gc;
mod impact;
mod scope;

pub use change_detector::{detect_changes, ChangeSet, SourceFile};
pub use gc::{GarbageCollector, GcHandle, GcReport};
pub use impact::{analyze_impact, ImpactBudget, ImpactResult, SymbolChange, SymbolChangeKind};
pub use scope::{expand_scope, ReindexPolicy};
