use indicatif::MultiProgress;
use log::{Log, Metadata, Record, SetLoggerError};

/// `env_logger` output routed around live progress bars.
///
/// Each record is written while `progress` is suspended, so log lines land
/// above the bars instead of tearing them.
pub struct ProgressLogger {
    inner: env_logger::Logger,
    progress: MultiProgress,
}

impl ProgressLogger {
    pub const fn new(inner: env_logger::Logger, progress: MultiProgress) -> Self {
        Self { inner, progress }
    }

    /// Installs the logger globally with `inner`'s filter as the max level.
    pub fn init(inner: env_logger::Logger, progress: MultiProgress) -> Result<(), SetLoggerError> {
        let max_level = inner.filter();
        log::set_boxed_logger(Box::new(Self::new(inner, progress)))?;
        log::set_max_level(max_level);
        Ok(())
    }
}

impl Log for ProgressLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if self.inner.matches(record) {
            self.progress.suspend(|| self.inner.log(record));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::{ProgressBar, ProgressDrawTarget};
    use log::{Level, LevelFilter};

    fn logger(level: LevelFilter, progress: MultiProgress) -> ProgressLogger {
        let inner = env_logger::Builder::new()
            .filter_level(level)
            .is_test(true)
            .build();
        ProgressLogger::new(inner, progress)
    }

    #[test]
    fn test_filter_follows_inner_logger() {
        let logger = logger(LevelFilter::Warn, MultiProgress::new());
        let metadata = |level| Metadata::builder().level(level).target("depthmap_rs").build();

        assert!(logger.enabled(&metadata(Level::Error)));
        assert!(logger.enabled(&metadata(Level::Warn)));
        assert!(!logger.enabled(&metadata(Level::Info)));
    }

    #[test]
    fn test_logs_while_bars_are_active() {
        let progress = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let bar = progress.add(ProgressBar::new(10));
        bar.inc(3);
        let logger = logger(LevelFilter::Info, progress);

        logger.log(
            &Record::builder()
                .level(Level::Info)
                .target("depthmap_rs")
                .args(format_args!("Processing clip.mp4"))
                .build(),
        );
        logger.flush();
        assert_eq!(bar.position(), 3);
    }
}
