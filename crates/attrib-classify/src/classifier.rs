// classifier.rs: Agent-like vs human-like scoring for a single change.
//
// Decision rule:
//
//   verdict = (multi_line OR pure_insertion)
//             AND large_enough
//             AND NOT single_char_typing
//
// with a pre-filter: text identical to the clipboard is a manual paste and
// never attributable. The rule encodes the precision/recall tradeoff of
// the whole system; change it only together with the table tests below.

use crate::change::RawChange;

/// Characters that mark structurally rich (code-like) insertions.
pub const STRUCTURAL_CHARS: &[char] = &[';', '{', '}', '[', ']', '(', ')'];

/// Classifier tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierConfig {
    /// Minimum inserted length (in characters) for an attributable change.
    pub min_change_size: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self { min_change_size: 3 }
    }
}

/// The individual terms of the decision rule, exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeSignals {
    pub matches_clipboard: bool,
    pub is_multi_line: bool,
    pub is_pure_insertion: bool,
    pub is_large_enough: bool,
    pub has_structural_char: bool,
    pub is_single_char_typing: bool,
}

impl ChangeSignals {
    pub fn of(change: &RawChange, config: &ClassifierConfig, clipboard: Option<&str>) -> Self {
        let text = change.inserted_text.as_str();
        let n = change.inserted_len();
        let has_structural_char = text.contains(STRUCTURAL_CHARS);

        Self {
            matches_clipboard: clipboard.is_some_and(|clip| clip == text),
            is_multi_line: text.contains('\n'),
            is_pure_insertion: change.replaced_length == 0,
            is_large_enough: n >= config.min_change_size,
            has_structural_char,
            is_single_char_typing: n == 1 && !has_structural_char,
        }
    }

    pub fn verdict(&self) -> bool {
        if self.matches_clipboard {
            return false;
        }
        (self.is_multi_line || self.is_pure_insertion)
            && self.is_large_enough
            && !self.is_single_char_typing
    }
}

/// Whether `change` looks agent-authored.
///
/// `clipboard` is the snapshot read once for the whole evaluation window;
/// `None` means the clipboard is unavailable and paste detection is off.
pub fn classify(change: &RawChange, config: &ClassifierConfig, clipboard: Option<&str>) -> bool {
    ChangeSignals::of(change, config, clipboard).verdict()
}

/// A change paired with its verdict. Recomputed on every evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationVerdict<'a> {
    pub change: &'a RawChange,
    pub is_attributable: bool,
}

/// Classify every change of one evaluation against the same clipboard snapshot.
pub fn classify_batch<'a>(
    changes: &'a [RawChange],
    config: &ClassifierConfig,
    clipboard: Option<&str>,
) -> Vec<ClassificationVerdict<'a>> {
    changes
        .iter()
        .map(|change| {
            let is_attributable = classify(change, config, clipboard);
            tracing::trace!(
                start = change.start_offset,
                len = change.inserted_len(),
                replaced = change.replaced_length,
                is_attributable,
                "classified change"
            );
            ClassificationVerdict {
                change,
                is_attributable,
            }
        })
        .collect()
}
