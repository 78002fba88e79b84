// merge.rs: Fold attributable sub-ranges into one attribution span.
//
// Union by extension: the first candidate is the running span and each
// later candidate that starts at or before the running end moves the
// running end to the candidate's end. A contained candidate can pull the
// end back; this is extension, not interval union.
// A candidate starting strictly after the running end is a gap, and the
// whole batch is rejected. Disjoint simultaneous edits are treated as
// unrelated to a single agent action, so no multi-span output exists.
//
// Edits are assumed forward-monotonic; the running start never moves.

use crate::change::AttributionRange;
use crate::classifier::ClassificationVerdict;

/// Merge candidates (in batch order) into a single span.
///
/// Returns `None` for an empty input or when any gap is found.
pub fn merge_ranges(candidates: &[AttributionRange]) -> Option<AttributionRange> {
    let (first, rest) = candidates.split_first()?;
    let mut merged = *first;

    for candidate in rest {
        if candidate.start_offset > merged.end_offset {
            tracing::debug!(
                running_end = merged.end_offset,
                next_start = candidate.start_offset,
                "disjoint attributable ranges, rejecting batch"
            );
            return None;
        }
        merged.end_offset = candidate.end_offset;
    }

    Some(merged)
}

/// Ranges of the attributable verdicts, in input order.
pub fn attributable_ranges(verdicts: &[ClassificationVerdict<'_>]) -> Vec<AttributionRange> {
    verdicts
        .iter()
        .filter(|v| v.is_attributable)
        .map(|v| v.change.inserted_range())
        .collect()
}
