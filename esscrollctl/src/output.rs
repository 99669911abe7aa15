//! Rendering of search hits on stdout.

use std::io::{self, Write};
use std::ops::ControlFlow;

use clap::ValueEnum;
use esscroll_core::Batch;

const SEPARATOR_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Indented JSON per hit with separators and progress lines.
    #[default]
    Pretty,
    /// One compact JSON document per line, nothing else.
    Ndjson,
}

/// Writes hits as they arrive and stops once `limit` hits were written.
#[derive(Debug)]
pub struct HitPrinter<W: Write> {
    out: W,
    format: OutputFormat,
    quiet: bool,
    limit: Option<usize>,
    written: usize,
}

impl<W: Write> HitPrinter<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            quiet: false,
            limit: None,
            written: 0,
        }
    }

    /// Suppress progress and completion lines.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn written(&self) -> usize {
        self.written
    }

    fn remaining(&self) -> Option<usize> {
        self.limit.map(|limit| limit.saturating_sub(self.written))
    }

    pub fn write_batch(&mut self, batch: &Batch) -> io::Result<ControlFlow<()>> {
        let take = self.remaining().unwrap_or(usize::MAX);
        for hit in batch.iter().take(take) {
            match self.format {
                OutputFormat::Pretty => {
                    serde_json::to_writer_pretty(&mut self.out, hit)?;
                    writeln!(self.out)?;
                    writeln!(self.out, "{}", "-".repeat(SEPARATOR_WIDTH))?;
                }
                OutputFormat::Ndjson => {
                    serde_json::to_writer(&mut self.out, hit)?;
                    writeln!(self.out)?;
                }
            }
            self.written += 1;
        }

        if self.shows_progress() {
            writeln!(self.out, "Processed {} documents so far...", self.written)?;
        }
        self.out.flush()?;

        if self.remaining() == Some(0) {
            Ok(ControlFlow::Break(()))
        } else {
            Ok(ControlFlow::Continue(()))
        }
    }

    pub fn finish(&mut self) -> io::Result<()> {
        if self.shows_progress() {
            writeln!(self.out)?;
            writeln!(
                self.out,
                "Search completed. Total documents found: {}",
                self.written
            )?;
        }
        self.out.flush()
    }

    fn shows_progress(&self) -> bool {
        self.format == OutputFormat::Pretty && !self.quiet
    }
}
