//! Demo driver: prints filler output while the bar advances on the last row.
//!
//! Pass `--block-at STEP` to see the blocked color pair while the demo waits
//! for a line on stdin.

use anyhow::{Context, Result};
use clap::Parser;
use pinbar::config::AppConfig;
use pinbar::telemetry::init_tracing;
use pinbar::{Percentage, ScrollArea, TermInfoTerminal};
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const FILLER_WIDTH: usize = 30;
const FILLER_LINES: usize = 4;

#[derive(Debug, Parser)]
#[command(name = "pinbar", about = "Progress bar pinned to the last terminal row", version)]
struct DemoConfig {
    #[command(flatten)]
    app: AppConfig,

    /// Number of progress steps to run
    #[arg(long = "steps", default_value_t = 99)]
    steps: u32,

    /// Sleep between steps in milliseconds
    #[arg(long = "delay-ms", default_value_t = 300)]
    delay_ms: u64,

    /// Block the bar at this step and wait for a line on stdin
    #[arg(long = "block-at", value_name = "STEP")]
    block_at: Option<u32>,

    /// Print plain progress lines when stdout is not a usable terminal
    #[arg(long = "plain-fallback", default_value_t = false)]
    plain_fallback: bool,
}

impl DemoConfig {
    fn percentage_at(&self, step: u32) -> i32 {
        let steps = self.steps.max(1);
        let pct = u64::from(step.min(steps)) * 100 / u64::from(steps);
        i32::try_from(pct).unwrap_or(100)
    }

    fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Lowercase filler text; xorshift is plenty for demo noise.
struct Filler(u64);

impl Filler {
    fn seeded() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.subsec_nanos())
            .unwrap_or(0);
        Self(u64::from(nanos) | 1)
    }

    fn next_letter(&mut self) -> char {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        char::from(b'a' + (self.0 % 26) as u8)
    }

    fn line(&mut self) -> String {
        (0..FILLER_WIDTH).map(|_| self.next_letter()).collect()
    }
}

fn print_step_output(filler: &mut Filler) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "Here is some output")?;
    for _ in 0..FILLER_LINES {
        writeln!(out, "{}", filler.line())?;
    }
    writeln!(out, "\n\n{}", "-".repeat(66))?;
    writeln!(out, "\n\n Now sleeping briefly")?;
    out.flush()
}

fn wait_for_line() -> Result<String> {
    print!("User input: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read user input")?;
    Ok(line.trim_end().to_string())
}

fn run_pinned(
    config: &DemoConfig,
    mut area: ScrollArea<TermInfoTerminal, io::Stdout>,
) -> Result<()> {
    if config.app.trap_interrupts() {
        area.enable_trapping();
    }
    area.setup_scroll_area(config.app.show_statistics())?;

    let mut filler = Filler::seeded();
    for step in 0..config.steps {
        let pct = config.percentage_at(step);
        if config.block_at == Some(step) {
            println!("waiting for user input: ");
            area.block_progress_bar(pct)?;
            let answer = wait_for_line()?;
            tracing::debug!(step, answer_len = answer.len(), "user input received");
            continue;
        }
        print_step_output(&mut filler)?;
        thread::sleep(config.delay());
        area.draw_progress_bar(pct)?;
    }
    area.draw_progress_bar(100)?;
    area.destroy_scroll_area()?;
    Ok(())
}

fn run_plain(config: &DemoConfig) -> Result<()> {
    for step in 0..=config.steps {
        let pct = Percentage::new(config.percentage_at(step))?;
        println!("Progress {pct}");
        if config.block_at == Some(step) {
            wait_for_line()?;
        } else if step < config.steps {
            thread::sleep(config.delay());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let config = DemoConfig::parse();
    if init_tracing(&config.app) {
        tracing::debug!(steps = config.steps, "pinbar demo starting");
    }

    match ScrollArea::stdout() {
        Ok(area) => run_pinned(&config, area),
        Err(err) if err.is_terminal_unavailable() && config.plain_fallback => {
            tracing::debug!(error = %err, "falling back to plain progress lines");
            run_plain(&config)
        }
        Err(err) => Err(err.into()),
    }
}
