//! Console progress reporting for the discovery stage.
//!
//! Rendering is a pure observer of the protocol flow: it runs in its own
//! task, touches no protocol state, and the stages never wait on it beyond
//! joining the render task when a scan attempt ends.

use std::io::{self, Write};
use std::time::Duration;

use colored::Colorize;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};
use tokio_util::sync::CancellationToken;

const BAR_WIDTH: usize = 40;
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

/// Per-attempt discovery status output.
pub struct ProgressReporter {
    verbose: bool,
}

impl ProgressReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Announces a discovery attempt. Verbose mode only.
    pub fn scan_attempt(&self, address: &str, attempt: usize, total: usize) {
        if self.verbose {
            println!(
                "Attempting to find device: {}, attempt {}/{}",
                address,
                attempt + 1,
                total
            );
        }
    }

    /// Reports a scan attempt that did not find the device.
    pub fn scan_missed(&self, attempt: usize, total: usize) {
        println!(
            "{}",
            format!(
                "Attempt {} of {}: Device not found. Retrying...",
                attempt + 1,
                total
            )
            .red()
        );
    }

    /// Starts the animated scan bar for one attempt. Returns `None` when
    /// not in verbose mode. The bar stops when the parent token fires or
    /// [`ScanIndicator::finish`] is called.
    pub fn begin_scan(&self, duration: Duration, parent: &CancellationToken) -> Option<ScanIndicator> {
        if !self.verbose {
            return None;
        }
        let token = parent.child_token();
        let handle = tokio::spawn(render_bar(duration, token.clone()));
        Some(ScanIndicator { token, handle })
    }
}

/// Handle to a running scan bar.
pub struct ScanIndicator {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl ScanIndicator {
    /// Stops the bar and waits for its final repaint.
    pub async fn finish(self) {
        self.token.cancel();
        let _ = self.handle.await;
    }
}

async fn render_bar(duration: Duration, token: CancellationToken) {
    let started = Instant::now();
    let mut tick = interval(REFRESH_INTERVAL);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tick.tick() => {
                let progress = if duration.is_zero() {
                    1.0
                } else {
                    (started.elapsed().as_secs_f64() / duration.as_secs_f64()).min(1.0)
                };
                let filled = (BAR_WIDTH as f64 * progress) as usize;
                let bar = format!(
                    "{}{}",
                    "#".repeat(filled).green(),
                    "-".repeat(BAR_WIDTH - filled)
                );
                print!("\rScanning: [{}] {:3.0}%", bar, progress * 100.0);
                let _ = io::stdout().flush();
                if progress >= 1.0 {
                    break;
                }
            }
        }
    }
    println!();
}
