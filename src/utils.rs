//! The `utils` module contains helpers shared across the pipeline: tracing setup and the
//! progress bar styles.
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// The `trace_init` function installs the tracing subscriber, reading `RUST_LOG` and
/// defaulting to `info`. Safe to call more than once; later calls are ignored.
pub fn trace_init() {
    if tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init()
        .is_ok()
    {};
    info!("Subscriber initialized.");
}

/// The `progress_bar` function builds a progress bar in the house style.
pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )
    .unwrap();
    let bar = ProgressBar::new(len).with_style(style);
    bar.set_message(msg.to_string());
    bar
}
