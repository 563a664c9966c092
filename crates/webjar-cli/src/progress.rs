//! Step progress with TTY detection.
//!
//! Pipelines show a progress bar on an interactive stderr and fall back to
//! plain `[n/total] step` lines otherwise.

use std::io::IsTerminal;
use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// Whether stderr, where progress is drawn, is a terminal.
pub fn is_tty() -> bool {
    std::io::stderr().is_terminal()
}

pub struct ProgressReporter {
    is_tty: bool,
    total_steps: usize,
    /// 1-based; 0 before the first step.
    current_step: usize,
    current_name: String,
    progress_bar: Option<ProgressBar>,
    start_time: Instant,
}

impl ProgressReporter {
    pub fn new(total_steps: usize) -> Self {
        let is_tty = is_tty();
        let progress_bar = if is_tty {
            let pb = ProgressBar::new(total_steps as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{bar:20.cyan/blue} {pos}/{len} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        Self {
            is_tty,
            total_steps,
            current_step: 0,
            current_name: String::new(),
            progress_bar,
            start_time: Instant::now(),
        }
    }

    /// Never draws a bar, regardless of the terminal.
    pub fn silent(total_steps: usize) -> Self {
        Self {
            is_tty: false,
            total_steps,
            current_step: 0,
            current_name: String::new(),
            progress_bar: None,
            start_time: Instant::now(),
        }
    }

    /// Starting step `index` also marks every earlier step as done.
    pub fn set_step(&mut self, index: usize, name: &str) {
        self.current_step = index;
        self.current_name = name.to_string();

        let elapsed = self.start_time.elapsed();
        let msg = format!(
            "[{}/{}] {}... ({elapsed:.1?})",
            self.current_step, self.total_steps, self.current_name
        );
        match &self.progress_bar {
            Some(pb) => {
                pb.set_position(index.saturating_sub(1) as u64);
                pb.set_message(msg);
            }
            None => eprintln!("{msg}"),
        }
    }

    /// Print a line without tearing the bar.
    pub fn println(&self, line: &str) {
        match &self.progress_bar {
            Some(pb) if self.is_tty => pb.suspend(|| eprintln!("{line}")),
            _ => eprintln!("{line}"),
        }
    }

    pub fn finish(self) {
        let elapsed = self.start_time.elapsed();
        match self.progress_bar {
            Some(pb) => {
                pb.set_position(self.total_steps as u64);
                pb.finish_with_message(format!("done in {elapsed:.1?}"));
            }
            None => eprintln!(
                "Completed {}/{} steps in {elapsed:.1?}",
                self.total_steps, self.total_steps
            ),
        }
    }

    /// Leave the bar where the failing step stopped it.
    pub fn abandon(self) {
        if let Some(pb) = self.progress_bar {
            pb.abandon_with_message(format!(
                "[{}/{}] {} failed",
                self.current_step, self.total_steps, self.current_name
            ));
        }
    }
}
