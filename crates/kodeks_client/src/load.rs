//! Batch load driver for the non-streaming endpoint.
//!
//! Requests run in fixed-size batches: every request of a batch is started,
//! the whole batch is awaited, then the next batch starts. A failed request is
//! recorded as data and never cancels the rest of its batch.

use std::future::Future;
use std::ops::Range;
use std::time::Instant;

use futures_util::future::join_all;

use crate::client::Client;
use crate::config::LoadSection;

pub const DEFAULT_COUNT: usize = 100;
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Sample questions, used round-robin by request index.
pub const QUESTIONS: [&str; 5] = [
    "Jaki jest termin na złożenie odwołania od decyzji administracyjnej?",
    "Kiedy mogę poprosić sąd o warunkowe umorzenie sprawy karnej?",
    "Jakie są przesłanki odpowiedzialności za zwierzę?",
    "Czy pracodawca może zwolnić pracownika na zwolnieniu lekarskim?",
    "Ile wynosi okres wypowiedzenia umowy o pracę?",
];

pub fn question_for(index: usize) -> &'static str {
    QUESTIONS[index % QUESTIONS.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub count: usize,
    pub concurrency: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_COUNT,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl LoadOptions {
    /// Zero in either field falls back to the built-in default.
    pub fn new(count: usize, concurrency: usize) -> Self {
        let defaults = Self::default();
        Self {
            count: if count == 0 { defaults.count } else { count },
            concurrency: if concurrency == 0 {
                defaults.concurrency
            } else {
                concurrency
            },
        }
    }

    /// Defaults from the `load` section of the config file.
    pub fn from_config(section: &LoadSection) -> Self {
        Self::new(
            section.count.unwrap_or(0),
            section.concurrency.unwrap_or(0),
        )
    }

    /// Apply positional arguments `[count] [concurrency]` over `self`.
    /// Anything missing or not a positive integer keeps the current value.
    pub fn with_args<I, S>(self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = args.into_iter();
        let count = args.next().and_then(|a| parse_positive(a.as_ref()));
        let concurrency = args.next().and_then(|a| parse_positive(a.as_ref()));
        Self {
            count: count.unwrap_or(self.count),
            concurrency: concurrency.unwrap_or(self.concurrency),
        }
    }
}

/// Leading-digits integer parse: `" 12abc"` is 12, `"3.9"` is 3.
/// Zero, negatives and non-numeric input give `None`.
pub fn parse_positive(arg: &str) -> Option<usize> {
    let arg = arg.trim_start();
    let arg = arg.strip_prefix('+').unwrap_or(arg);
    let end = arg
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(arg.len());
    match arg[..end].parse::<usize>() {
        Ok(n) if n > 0 => Some(n),
        _ => None,
    }
}

/// Index ranges of each batch: `count = 7, size = 3` gives `0..3, 3..6, 6..7`.
pub fn batch_ranges(count: usize, size: usize) -> impl Iterator<Item = Range<usize>> {
    let size = size.max(1);
    (0..count)
        .step_by(size)
        .map(move |start| start..(start + size).min(count))
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub index: usize,
    pub success: bool,
    /// 0 when the request never got a status.
    pub status: u16,
    pub elapsed_ms: u64,
    pub text_len: Option<usize>,
    pub sources_count: Option<usize>,
    pub error: Option<String>,
}

impl RunResult {
    pub fn success(
        index: usize,
        status: u16,
        elapsed_ms: u64,
        text_len: usize,
        sources_count: usize,
    ) -> Self {
        Self {
            index,
            success: true,
            status,
            elapsed_ms,
            text_len: Some(text_len),
            sources_count: Some(sources_count),
            error: None,
        }
    }

    pub fn failure(index: usize, status: u16, elapsed_ms: u64, error: String) -> Self {
        Self {
            index,
            success: false,
            status,
            elapsed_ms,
            text_len: None,
            sources_count: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub times: Vec<u64>,
    pub failures: Vec<RunResult>,
}

impl Aggregate {
    pub fn record(&mut self, result: RunResult) {
        self.total += 1;
        self.times.push(result.elapsed_ms);
        if result.success {
            self.success += 1;
        } else {
            self.failed += 1;
            self.failures.push(result);
        }
    }

    pub fn average_ms(&self) -> Option<f64> {
        if self.times.is_empty() {
            return None;
        }
        let sum: u64 = self.times.iter().sum();
        Some(sum as f64 / self.times.len() as f64)
    }

    pub fn min_ms(&self) -> Option<u64> {
        self.times.iter().copied().min()
    }

    pub fn max_ms(&self) -> Option<u64> {
        self.times.iter().copied().max()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub aggregate: Aggregate,
    pub total_ms: u64,
    pub batches: usize,
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Run `options.count` requests through `send`, `options.concurrency` at a
/// time. `on_batch` sees the aggregate after each batch has settled.
pub async fn run_batches<F, Fut, P>(options: LoadOptions, mut send: F, mut on_batch: P) -> LoadReport
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = RunResult>,
    P: FnMut(&Aggregate),
{
    let start = Instant::now();
    let mut aggregate = Aggregate::default();
    let mut batches = 0;

    for range in batch_ranges(options.count, options.concurrency) {
        tracing::debug!(batch = batches, ?range, "starting batch");
        let results = join_all(range.map(&mut send)).await;
        batches += 1;
        for result in results {
            aggregate.record(result);
        }
        on_batch(&aggregate);
    }

    let report = LoadReport {
        aggregate,
        total_ms: elapsed_ms(start),
        batches,
    };
    tracing::info!(
        total = report.aggregate.total,
        success = report.aggregate.success,
        failed = report.aggregate.failed,
        batches = report.batches,
        total_ms = report.total_ms,
        "load run finished"
    );
    report
}

/// Send one request from the sample pool and time it. The clock stops when
/// the response headers arrive or the transport fails; reading the body is not
/// counted.
pub async fn send_request(client: &Client, index: usize) -> RunResult {
    let question = question_for(index);
    let start = Instant::now();
    let (elapsed, outcome) = match client.send_analysis(question).await {
        Ok(response) => {
            let elapsed = elapsed_ms(start);
            (elapsed, Client::read_analysis(response).await)
        }
        Err(e) => (elapsed_ms(start), Err(e)),
    };

    match outcome {
        Ok(reply) => RunResult::success(
            index,
            reply.status,
            elapsed,
            reply.body.text_len(),
            reply.body.sources_count(),
        ),
        Err(e) => {
            tracing::debug!(index, status = e.status(), error = %e, "request failed");
            RunResult::failure(index, e.status(), elapsed, e.to_string())
        }
    }
}

/// Drive the non-streaming endpoint of `client`.
pub async fn run_load<P>(client: &Client, options: LoadOptions, on_batch: P) -> LoadReport
where
    P: FnMut(&Aggregate),
{
    tracing::info!(
        count = options.count,
        concurrency = options.concurrency,
        endpoint = client.analysis_url(),
        "load run starting"
    );
    run_batches(options, |index| send_request(client, index), on_batch).await
}
