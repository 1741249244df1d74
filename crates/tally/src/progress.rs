//! 📊 progress.rs: "Are we there yet?" Every pipeline, every time, forever.
//!
//! The bar's length is not known up front (nobody knows how big a bucket is,
//! that's the whole point of this program), so it grows as the lister enqueues
//! keys and advances as workers finish them.
//!
//! ⚠️ Watching this progress bar will not make it go faster. Science says no.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// 📊 A cheaply cloneable handle on the shared progress bar.
///
/// One clone for the lister, one per worker. `indicatif` does the locking.
#[derive(Clone)]
pub(crate) struct FetchProgress {
    progress_bar: ProgressBar,
}

impl std::fmt::Debug for FetchProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // -- 🎭 ProgressBar is a diva and doesn't derive Debug
        f.debug_struct("FetchProgress")
            .field("position", &self.progress_bar.position())
            .field("length", &self.progress_bar.length())
            .finish()
    }
}

impl FetchProgress {
    /// 🚀 A visible bar labelled with the bucket, or a hidden one that still counts.
    pub(crate) fn new(label: &str, enabled: bool) -> Self {
        if !enabled {
            return Self::hidden();
        }

        let progress_bar = ProgressBar::new(0);
        // -- 🎨 cyan because it's classy, blue because it's calm
        if let Ok(style) = ProgressStyle::with_template(
            "{msg}\n| [{bar:40.cyan/blue}] {pos}/{len} objects | {per_sec} | {elapsed_precise}",
        ) {
            progress_bar.set_style(style.progress_chars("=>-"));
        }
        progress_bar.set_message(format!("source: {}", label));
        Self { progress_bar }
    }

    pub(crate) fn hidden() -> Self {
        // -- Some(0), not ProgressBar::hidden(): a length of None would swallow inc_length
        Self {
            progress_bar: ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()),
        }
    }

    /// 📚 The lister just enqueued `count` more keys.
    pub(crate) fn listed(&self, count: u64) {
        self.progress_bar.inc_length(count);
    }

    /// ✅ A worker finished one key, whatever the outcome.
    pub(crate) fn processed(&self) {
        self.progress_bar.inc(1);
    }

    pub(crate) fn finish(&self) {
        self.progress_bar.finish_and_clear();
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> u64 {
        self.progress_bar.position()
    }

    #[cfg(test)]
    pub(crate) fn length(&self) -> Option<u64> {
        self.progress_bar.length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_a_hidden_bar_still_keeps_score() {
        let the_progress = FetchProgress::hidden();
        the_progress.listed(3);
        the_progress.listed(2);
        let the_clone = the_progress.clone();
        the_clone.processed();
        the_clone.processed();

        assert_eq!(the_progress.length(), Some(5));
        assert_eq!(the_progress.position(), 2);
    }
}
