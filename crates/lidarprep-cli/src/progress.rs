use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar counting finished files
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{msg}\n[{bar:40.cyan/blue}] {pos}/{len} ({percent}%) ETA: {eta}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░ ");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Finish a progress bar with success message
pub fn finish_success(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("✓ {}", message));
}

/// Finish a progress bar with warning message
pub fn finish_warning(pb: &ProgressBar, message: &str) {
    pb.finish_with_message(format!("⚠ {}", message));
}

/// File progress for a running batch; hidden in JSON mode or on request
pub struct FileProgress {
    bar: ProgressBar,
}

impl FileProgress {
    pub fn new(enabled: bool) -> Self {
        let bar = if enabled { create_progress_bar("Downsampling") } else { ProgressBar::hidden() };
        Self { bar }
    }

    /// Record a finished file
    pub fn file_finished(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }

    /// Print above the bar without tearing it
    pub fn suspend<F: FnOnce()>(&self, f: F) {
        self.bar.suspend(f);
    }

    pub fn finish(&self, stopped: bool, finished: usize, total: usize) {
        let message = format!("{}/{} files finished", finished, total);
        if stopped {
            finish_warning(&self.bar, &format!("stopped, {}", message));
        } else {
            finish_success(&self.bar, &message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_progress_tracks_position() {
        let progress = FileProgress::new(false);
        progress.file_finished(2, 5);
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(5));
        progress.finish(false, 5, 5);
        assert!(progress.bar.is_finished());
    }
}
