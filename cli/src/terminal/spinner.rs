use colored::*;
use indicatif::ProgressStyle;
use tracing::Span;
use tracing_indicatif::span_ext::IndicatifSpanExt;

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

const TIP: &str = "Ctrl-C stops early and keeps what was found";

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Attaches the spinner style to `span` and shows the initial message.
pub fn attach(span: &Span, message: &str) {
    span.pb_set_style(&spinner_style());
    set_message(span, message);
}

pub fn set_message(span: &Span, message: &str) {
    span.pb_set_message(&format!("{message} {}", TIP.italic().bright_black()));
}

pub fn report_progress(span: &Span, done: usize) {
    set_message(
        span,
        &format!("Inventoried {} hosts so far...", done.to_string().green().bold()),
    );
}
