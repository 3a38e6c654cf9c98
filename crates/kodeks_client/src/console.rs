//! Terminal rendering for both binaries.

use std::io::{self, Write};

use crate::client::ClientError;
use crate::consumer::{Analysis, StreamSink};
use crate::load::{LoadOptions, LoadReport};
use crate::messages::{Source, StreamEvent};
use crate::spinner::Spinner;

const WIDTH: usize = 50;

fn rule(out: &mut impl Write, ch: char) -> io::Result<()> {
    writeln!(out, "{}", ch.to_string().repeat(WIDTH))
}

fn seconds(ms: u64) -> String {
    format!("{:.2}s", ms as f64 / 1000.0)
}

/// Streams events to a terminal, keeping the spinner out of the way of text.
pub struct ConsoleSink<W: Write, S: Write + Send + 'static = io::Stdout> {
    out: W,
    spinner: Spinner<S>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), Spinner::stdout())
    }
}

impl<W: Write, S: Write + Send + 'static> ConsoleSink<W, S> {
    pub fn new(out: W, spinner: Spinner<S>) -> Self {
        Self { out, spinner }
    }

    pub fn into_inner(mut self) -> W {
        self.spinner.stop();
        self.out
    }

    /// Question banner and the "Connecting..." placeholder.
    pub fn header(&mut self, question: &str) -> io::Result<()> {
        writeln!(self.out, "📝 Question: {}\n", question)?;
        rule(&mut self.out, '─')?;
        write!(self.out, "Connecting... ")?;
        self.out.flush()
    }

    /// Stop the spinner, e.g. before an error is printed.
    pub fn stop(&mut self) {
        self.spinner.stop();
    }
}

fn sources_block(out: &mut impl Write, tool_name: &str, sources: &[Source]) -> io::Result<()> {
    write!(out, "\n\n")?;
    rule(out, '─')?;
    writeln!(out, "📚 Sources from: {}", tool_name)?;
    rule(out, '─')?;
    for source in sources {
        writeln!(out, "  • Type: {}", source.kind)?;
        writeln!(out, "    ID: {}", source.id)?;
        if let Some(fields) = &source.fields {
            let pretty = serde_json::to_string_pretty(fields).unwrap_or_default();
            writeln!(out, "    Fields: {}", pretty.replace('\n', "\n    "))?;
        }
    }
    rule(out, '─')?;
    out.flush()
}

fn finish_block(out: &mut impl Write, finish_reason: Option<&str>, all: &[Source]) -> io::Result<()> {
    write!(out, "\n\n")?;
    rule(out, '═')?;
    writeln!(out, "✅ Stream finished!")?;
    rule(out, '═')?;
    writeln!(out, "📊 Finish reason: {}", finish_reason.unwrap_or("unknown"))?;
    writeln!(out, "\n📚 Sources ({}):", all.len())?;
    for source in all {
        writeln!(out, "  • Type: {}, ID: {}", source.kind, source.id)?;
        if let Some(fields) = &source.fields {
            let compact = serde_json::to_string(fields).unwrap_or_default();
            writeln!(out, "    {}", compact)?;
        }
    }
    Ok(())
}

impl<W: Write, S: Write + Send + 'static> StreamSink for ConsoleSink<W, S> {
    fn connected(&mut self) {
        let _ = write!(self.out, "\r{}\r", " ".repeat(20));
        let _ = self.out.flush();
        self.spinner.start();
    }

    fn handle_event(&mut self, event: &StreamEvent, analysis: &Analysis) -> Result<(), ClientError> {
        match event {
            StreamEvent::TextDelta(delta) => {
                let out = &mut self.out;
                self.spinner.suspend(|| {
                    write!(out, "{}", delta)?;
                    out.flush()
                })?;
            }
            StreamEvent::Sources { tool_name, sources } => {
                let out = &mut self.out;
                self.spinner.suspend(|| sources_block(out, tool_name, sources))?;
            }
            StreamEvent::Finish { finish_reason, .. } => {
                self.spinner.stop();
                finish_block(&mut self.out, finish_reason.as_deref(), &analysis.sources)?;
            }
            StreamEvent::Unknown(kind) => {
                let out = &mut self.out;
                self.spinner.suspend(|| {
                    writeln!(out, "\n⚠️ Unknown event type: {}", kind)?;
                    out.flush()
                })?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), ClientError> {
        self.spinner.stop();
        self.out.flush()?;
        Ok(())
    }
}

/// Summary printed after a successful stream.
pub fn print_summary(out: &mut impl Write, analysis: &Analysis) -> io::Result<()> {
    write!(out, "\n\n")?;
    rule(out, '═')?;
    writeln!(out, "📋 FINAL SUMMARY")?;
    rule(out, '═')?;
    writeln!(
        out,
        "\nFull response length: {} characters",
        analysis.text.chars().count()
    )?;
    writeln!(out, "Total sources: {}", analysis.sources.len())
}

pub fn print_load_banner(out: &mut impl Write, options: &LoadOptions, endpoint: &str) -> io::Result<()> {
    writeln!(out, "🧪 ZapytajKodeks API Tester")?;
    rule(out, '═')?;
    writeln!(out, "📊 Requests: {}", options.count)?;
    writeln!(out, "⚡ Concurrency: {}", options.concurrency)?;
    writeln!(out, "🔗 Endpoint: {}", endpoint)?;
    rule(out, '═')?;
    writeln!(out)
}

/// Live counter, redrawn in place after every settled batch.
pub fn print_progress(out: &mut impl Write, success: usize, total: usize, failed: usize) -> io::Result<()> {
    write!(
        out,
        "\r✅ {}/{} passed | ❌ {} failed",
        success, total, failed
    )?;
    out.flush()
}

pub fn print_load_report(out: &mut impl Write, report: &LoadReport) -> io::Result<()> {
    let agg = &report.aggregate;
    write!(out, "\n\n")?;
    rule(out, '═')?;
    writeln!(out, "📋 RESULTS")?;
    rule(out, '═')?;
    writeln!(out, "✅ Passed: {}/{}", agg.success, agg.total)?;
    writeln!(out, "❌ Failed: {}/{}", agg.failed, agg.total)?;
    writeln!(out, "⏱️  Total time: {}", seconds(report.total_ms))?;
    if let (Some(avg), Some(min), Some(max)) = (agg.average_ms(), agg.min_ms(), agg.max_ms()) {
        writeln!(out, "📈 Avg response time: {:.2}s", avg / 1000.0)?;
        writeln!(out, "🚀 Min response time: {}", seconds(min))?;
        writeln!(out, "🐢 Max response time: {}", seconds(max))?;
    }

    if !agg.failures.is_empty() {
        writeln!(out)?;
        rule(out, '═')?;
        writeln!(out, "❌ FAILURES")?;
        rule(out, '═')?;
        for failure in &agg.failures {
            writeln!(out, "\n  Request #{}:", failure.index + 1)?;
            writeln!(out, "    Status: {}", failure.status)?;
            writeln!(
                out,
                "    Error: {}",
                failure.error.as_deref().unwrap_or("unknown error")
            )?;
            writeln!(out, "    Time: {}", seconds(failure.elapsed_ms))?;
        }
    }
    writeln!(out)
}
