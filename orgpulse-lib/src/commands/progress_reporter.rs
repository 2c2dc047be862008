use crate::pipeline::Progress;
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;

type ProgressCallback = Box<dyn Fn() -> (u64, u64, String) + Send + Sync>;

const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const DETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}";
const DETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {pos}/{len} {msg}";
const INDETERMINATE_TEMPLATE: &str = "{prefix:>12.bold.cyan} {spinner} {elapsed} {msg}";
const INDETERMINATE_TEMPLATE_NO_COLOR: &str = "{prefix:>12} {spinner} {elapsed} {msg}";

/// Terminal progress bar for a crawl, shown only once the crawl has run for a while.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    visible_after: Instant,
    visible: Arc<AtomicBool>,
    callback: Arc<Mutex<ProgressCallback>>,
    refresh_task: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a reporter that stays hidden for `delay`.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden());
        let visible_after = Instant::now() + delay;
        let visible = Arc::new(AtomicBool::new(false));
        let callback = Arc::new(Mutex::new(Box::new(|| (0u64, 0u64, String::new())) as ProgressCallback));

        let refresh_task = tokio::spawn(refresh(bar.clone(), visible_after, Arc::clone(&visible), Arc::clone(&callback)));

        Self {
            bar,
            visible_after,
            visible,
            callback,
            refresh_task: Arc::new(refresh_task),
            use_colors,
        }
    }

    fn set_callback(&self, callback: ProgressCallback) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    fn template(&self, colored: &'static str, plain: &'static str) -> &'static str {
        if self.use_colors { colored } else { plain }
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
    }

    fn set_determinate(&self, callback: Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>) {
        self.set_callback(callback);
        self.bar.disable_steady_tick();
        self.bar.set_length(0);
        self.bar.set_position(0);

        let template = self.template(DETERMINATE_TEMPLATE, DETERMINATE_TEMPLATE_NO_COLOR);
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            self.bar.set_style(style.progress_chars("=> "));
        }
    }

    fn set_indeterminate(&self, callback: Box<dyn Fn() -> String + Send + Sync + 'static>) {
        self.set_callback(Box::new(move || (0, 0, callback())));
        self.bar.reset_elapsed();
        self.bar.enable_steady_tick(REFRESH_INTERVAL);

        let template = self.template(INDETERMINATE_TEMPLATE, INDETERMINATE_TEMPLATE_NO_COLOR);
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            self.bar.set_style(style.tick_chars("|/-\\ "));
        }
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("visible_after", &self.visible_after)
            .field("visible", &self.visible)
            .field("callback", &"<callback>")
            .field("refresh_task", &"<task>")
            .field("use_colors", &self.use_colors)
            .finish()
    }
}

/// Periodically pull state from the callback into the bar.
async fn refresh(bar: ProgressBar, visible_after: Instant, visible: Arc<AtomicBool>, callback: Arc<Mutex<ProgressCallback>>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !visible.load(Ordering::Relaxed) {
            if Instant::now() < visible_after {
                continue;
            }
            visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        let (length, position, message) = {
            let callback = callback.lock().unwrap_or_else(PoisonError::into_inner);
            callback()
        };

        if length > 0 {
            bar.set_length(length);
            bar.set_position(position);
        }
        bar.set_message(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hidden_reporter_accepts_updates() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), false);
        reporter.set_phase("Listing");
        reporter.set_indeterminate(Box::new(|| "repositories".to_string()));
        reporter.set_phase("Crawling");
        reporter.set_determinate(Box::new(|| (10, 3, "acme/widgets".to_string())));
        reporter.done();

        assert!(!reporter.visible.load(Ordering::Relaxed));
        assert!(format!("{reporter:?}").contains("ProgressReporter"));
    }
}
