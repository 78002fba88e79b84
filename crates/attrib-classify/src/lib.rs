//! # attrib-classify
//!
//! Pure heuristics of the attribution pipeline.
//!
//! - [`classify`] scores one [`RawChange`] as agent-like (attributable) or
//!   human-like. It is a pure function of the change, the classifier
//!   configuration and the clipboard snapshot.
//! - [`merge_ranges`] folds the attributable sub-ranges of one evaluation
//!   into a single [`AttributionRange`], or rejects the batch when the
//!   ranges are disjoint.
//! - [`LineIndex`] maps text offsets to line/column positions for reporting.
//!
//! Nothing in this crate performs I/O or holds state.

pub mod change;
pub mod classifier;
pub mod merge;

pub use change::{AttributionRange, LineIndex, LineSpan, Position, RawChange};
pub use classifier::{
    classify, classify_batch, ChangeSignals, ClassificationVerdict, ClassifierConfig,
    STRUCTURAL_CHARS,
};
pub use merge::{attributable_ranges, merge_ranges};
