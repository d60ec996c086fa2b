//! Progress bars for download batches
//!
//! A [`ProgressReporter`] hands out indicatif bars attached to one shared
//! `MultiProgress`. Bars are thread-safe, so pool workers update them
//! concurrently. When progress is disabled every bar is hidden and updates
//! are free.
//!
//! Log output must go through [`ProgressReporter::log_writer`] while bars are
//! drawn, otherwise log lines tear through them.

use std::io::{self, Write};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing_subscriber::fmt::MakeWriter;

const FILE_TEMPLATE: &str = "{msg:30!} [{bar:30.cyan/blue}] {bytes}/{total_bytes} {bytes_per_sec}";
const BATCH_TEMPLATE: &str = "{msg:30!} [{bar:30.green/white}] {pos}/{len} {elapsed_precise}";

/// Factory for per-file and per-batch progress bars
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    multi: Option<MultiProgress>,
}

impl ProgressReporter {
    /// Reporter whose bars are never drawn
    pub fn hidden() -> Self {
        Self { multi: None }
    }

    /// Reporter that draws to stderr when it is a terminal and `enabled` is set
    pub fn new(enabled: bool) -> Self {
        if enabled && atty::is(atty::Stream::Stderr) {
            Self {
                multi: Some(MultiProgress::new()),
            }
        } else {
            Self::hidden()
        }
    }

    /// Whether bars are actually drawn
    pub fn is_visible(&self) -> bool {
        self.multi.is_some()
    }

    /// stderr sink for the log subscriber that clears bars around each line
    pub fn log_writer(&self) -> LogWriter {
        LogWriter {
            multi: self.multi.clone(),
        }
    }

    /// Byte bar for one file; `total` of 0 means the length is unknown
    pub fn file_bar(&self, name: &str, total: u64) -> ProgressBar {
        self.attach(ProgressBar::new(total), FILE_TEMPLATE, name)
    }

    /// Count bar for a batch of `total` items
    pub fn batch_bar(&self, label: &str, total: u64) -> ProgressBar {
        self.attach(ProgressBar::new(total), BATCH_TEMPLATE, label)
    }

    fn attach(&self, bar: ProgressBar, template: &str, message: &str) -> ProgressBar {
        let Some(multi) = &self.multi else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
            return bar;
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let bar = multi.add(bar);
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar
    }
}

/// Writes log lines to stderr with the bars suspended
#[derive(Debug, Clone)]
pub struct LogWriter {
    multi: Option<MultiProgress>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &self.multi {
            Some(multi) => multi
                .suspend(|| io::stderr().write_all(buf))
                .map(|()| buf.len()),
            None => io::stderr().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}

impl<'a> MakeWriter<'a> for LogWriter {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs `f` and returns what it logged, one formatted line per event
#[cfg(test)]
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&captured.0.lock().unwrap()).into_owned();
    (result, logs)
}
