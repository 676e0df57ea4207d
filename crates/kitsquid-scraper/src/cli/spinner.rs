//! Terminal spinner fed by pipeline progress events.

use crate::cli::output;
use crate::progress::{ProgressEventKind, ProgressReceiver};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct ProgressView {
    handle: Option<JoinHandle<()>>,
}

impl ProgressView {
    /// Start rendering events from `rx`. Quiet and JSON modes render
    /// nothing.
    pub fn start(rx: ProgressReceiver) -> Self {
        if output::is_quiet() || output::is_json() {
            return Self { handle: None };
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("  {spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            handle: Some(tokio::spawn(render(bar, rx))),
        }
    }

    /// Wait until every sender is gone and the spinner is cleared.
    pub async fn finish(self) {
        if let Some(handle) = self.handle {
            let _ = handle.await;
        }
    }
}

async fn render(bar: ProgressBar, mut rx: ProgressReceiver) {
    let (mut done, mut total) = (0usize, 0usize);
    loop {
        let event = match rx.recv().await {
            Ok(e) => e,
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => break,
        };
        match event.event {
            ProgressEventKind::PhaseStarted { phase, jobs } => {
                done = 0;
                total = jobs;
                bar.set_message(format!("{phase}: 0/{total}"));
            }
            ProgressEventKind::JobFinished { phase, .. }
            | ProgressEventKind::JobSkipped { phase, .. } => {
                done += 1;
                bar.set_message(format!("{phase}: {done}/{total}"));
            }
            ProgressEventKind::PhaseCompleted {
                phase,
                succeeded,
                failed,
                skipped,
                elapsed_ms,
            } => {
                bar.println(format!(
                    "  {phase}: {succeeded} ok, {failed} failed, {skipped} skipped ({:.1}s)",
                    elapsed_ms as f64 / 1000.0
                ));
            }
            ProgressEventKind::Warning { message } => {
                bar.println(format!("  warning: {message}"));
            }
        }
    }
    bar.finish_and_clear();
}
