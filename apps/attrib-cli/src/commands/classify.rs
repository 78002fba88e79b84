// classify.rs: `attrib classify`, explain the verdict for one change.

use std::io::Read;

use anyhow::Context;
use attrib_classify::{ChangeSignals, RawChange};
use attrib_engine::AttributionConfig;

pub fn execute(
    text: &str,
    replaced: usize,
    clipboard: Option<&str>,
    min_size: Option<usize>,
    config: &AttributionConfig,
) -> anyhow::Result<()> {
    let text = if text == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read change text from stdin")?;
        buf
    } else {
        text.to_string()
    };

    let mut classifier = config.classifier();
    if let Some(min_size) = min_size {
        classifier.min_change_size = min_size;
    }
    let change = RawChange::new(text, replaced, 0);
    let signals = ChangeSignals::of(&change, &classifier, clipboard);
    print!("{}", render(&change, &signals));
    Ok(())
}

fn render(change: &RawChange, signals: &ChangeSignals) -> String {
    let verdict = if signals.verdict() { "agent" } else { "human" };
    let mut out = format!(
        "verdict: {}\nlength: {} chars, replaced: {}\n",
        verdict,
        change.inserted_len(),
        change.replaced_length
    );
    for (name, value) in [
        ("matches_clipboard", signals.matches_clipboard),
        ("multi_line", signals.is_multi_line),
        ("pure_insertion", signals.is_pure_insertion),
        ("large_enough", signals.is_large_enough),
        ("structural_char", signals.has_structural_char),
        ("single_char_typing", signals.is_single_char_typing),
    ] {
        out.push_str(&format!("  {:<20}{}\n", name, value));
    }
    out
}
