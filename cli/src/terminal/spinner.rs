use colored::*;
use indicatif::ProgressStyle;
use subrank_core::enumerator::Progress;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

const TIP: &str = "Press Ctrl-C to stop early and score what was found";

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

pub fn style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Shows the spinner of `span` with the opening tip.
pub fn start(span: &Span) {
    span.pb_set_style(&style());
    span.pb_set_message(&format!("{}", TIP.italic().white()));
}

pub fn report_progress(span: &Span, progress: Progress) {
    span.pb_set_message(&progress_message(progress));
}

fn progress_message(progress: Progress) -> String {
    format!(
        "Checked {}/{} candidates, {} live so far...",
        progress.checked,
        progress.total,
        progress.live.to_string().green().bold()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_message_mentions_counts() {
        colored::control::set_override(false);
        let message = progress_message(Progress {
            checked: 50,
            total: 120,
            live: 3,
        });
        assert_eq!(message, "Checked 50/120 candidates, 3 live so far...");
    }
}
