/*
 * Codegraph MemModel - heap memory-model encoder
 *
 * Feature-First Architecture:
 * - shared/    : Consumed program representation (types, expressions, edges)
 * - features/  : Vertical slices (formula → ssa → layout → targets → snapshot
 *                → retention → assignment → edge translation → merge)
 * - config/    : Encoder configuration (presets, YAML)
 *
 * Snapshots are persistent maps; exploring many paths in parallel needs no
 * locking, every edge produces child snapshots by path copying.
 */

#![allow(clippy::too_many_arguments)] // Lowering threads state explicitly
#![allow(clippy::module_inception)] // Module naming intentional
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

pub mod config;
pub mod context;
pub mod errors;
pub mod features;
pub mod shared;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, EncoderConfig, MachineModelKind, Preset};
pub use context::{EncoderContext, ADDRESS_PREFIX};
pub use errors::{EncodingError, Result};

pub use features::assignment::{AssignmentEncoder, AssignmentState, Lvalue, Rvalue, TypedRvalue};
pub use features::edge_translation::{EdgeFormulaTranslator, ALLOCATION_PREFIX, RETURN_VARIABLE};
pub use features::formula::{BvOp, Constraints, Formula, Sort, Term};
pub use features::merge::{MergeEngine, MergeResult};
pub use features::path_formula::{PathFormula, PathFormulaManager};
pub use features::pointer_target::{PointerTarget, PointerTargetPattern, Precision};
pub use features::pointer_target_set::{
    CompositeField, DeferredAllocationPool, PointerTargetSet, PointerTargetSetBuilder,
};
pub use features::retention::RetentionConstraintGenerator;
pub use features::ssa::{SsaDifference, SsaMap, SsaMapBuilder, UNSET_INDEX};
pub use features::type_layout::{MachineModel, TypeLayout};
pub use shared::models::{CType, CanonicalType, CfaEdge, EdgeKind};
