use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

/// Terminal progress for CLI stages: spinners and bars on a TTY, plain
/// `==>` lines otherwise.
#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = ProgressBar::new_spinner();
            spinner.set_draw_target(ProgressDrawTarget::stderr());
            spinner.enable_steady_tick(Duration::from_millis(120));
            let style = ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            spinner.set_style(style);
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner), 0)
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None, 0)
        }
    }

    /// A stage with a known number of steps, e.g. frames to export.
    pub fn progress(&self, name: &str, total: u64) -> StageGuard {
        if self.use_pretty() {
            let bar = ProgressBar::new(total);
            bar.set_draw_target(ProgressDrawTarget::stderr());
            let style = ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar.set_message(name.to_string());
            StageGuard::new(name.to_string(), Some(bar), total)
        } else {
            eprintln!("==> {} ({} steps)", name, total);
            StageGuard::new(name.to_string(), None, total)
        }
    }
}

pub struct StageGuard {
    name: String,
    start: Instant,
    bar: Option<ProgressBar>,
    total: u64,
    done: u64,
}

impl StageGuard {
    fn new(name: String, bar: Option<ProgressBar>, total: u64) -> Self {
        Self {
            name,
            start: Instant::now(),
            bar,
            total,
            done: 0,
        }
    }

    /// One step finished; `detail` is shown on the bar or printed in plain mode.
    pub fn step(&mut self, detail: &str) {
        self.done += 1;
        match &self.bar {
            Some(bar) => {
                bar.inc(1);
                bar.set_message(format!("{} {}", self.name, detail));
            }
            None => eprintln!("    [{}/{}] {}", self.done, self.total, detail),
        }
    }

    pub fn steps_done(&self) -> u64 {
        self.done
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_elapsed(elapsed));
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

fn format_elapsed(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_mode_never_draws_bars() {
        let ui = Ui::from_args(Some("plain"), true, false);
        assert!(!ui.use_pretty());
        let mut stage = ui.progress("export", 2);
        stage.step("frame 0");
        stage.step("frame 1");
        assert_eq!(stage.steps_done(), 2);
    }

    #[test]
    fn auto_mode_respects_tty_and_opt_out() {
        assert!(Ui::from_args(None, true, false).use_pretty());
        assert!(!Ui::from_args(None, false, false).use_pretty());
        assert!(!Ui::from_args(None, true, true).use_pretty());
        assert!(Ui::from_args(Some("pretty"), true, true).use_pretty());
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(Duration::from_millis(250)), "250ms");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
    }
}
