//! NDJSON stream consumer.
//!
//! Reads a chunked body, cuts it into lines, decodes each line into a
//! [`StreamEvent`] and folds it into an [`Analysis`]. Display is delegated to a
//! [`StreamSink`]; the consumer runs the same with [`NullSink`].

use futures_util::{Stream, StreamExt};

use crate::client::ClientError;
use crate::lines::LineBuffer;
use crate::messages::{Source, StreamEvent};

/// Everything accumulated from one stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Analysis {
    /// Every `text-delta` fragment, in arrival order.
    pub text: String,
    /// Every `sources` array, then the `finish` array, in arrival order.
    pub sources: Vec<Source>,
    pub finish_reason: Option<String>,
    pub finished: bool,
    /// Decoded events, unknown ones included.
    pub events: usize,
    /// Non-empty lines dropped because they were not valid UTF-8 or JSON.
    pub skipped_lines: usize,
}

impl Analysis {
    fn apply(&mut self, event: &StreamEvent) {
        self.events += 1;
        match event {
            StreamEvent::TextDelta(delta) => self.text.push_str(delta),
            StreamEvent::Sources { sources, .. } => self.sources.extend(sources.iter().cloned()),
            StreamEvent::Finish {
                finish_reason,
                sources,
            } => {
                self.finish_reason = finish_reason.clone();
                self.sources.extend(sources.iter().cloned());
                self.finished = true;
            }
            StreamEvent::Unknown(_) => {}
        }
    }
}

/// Receives events as they are decoded.
pub trait StreamSink {
    /// The response status was OK; the body is about to be read.
    fn connected(&mut self) {}

    /// Called after `event` has been folded into `analysis`.
    fn handle_event(&mut self, event: &StreamEvent, analysis: &Analysis) -> Result<(), ClientError>;

    /// The transport reported end of stream.
    fn finish(&mut self) -> Result<(), ClientError> {
        Ok(())
    }
}

/// Sink that only logs.
#[derive(Debug, Default)]
pub struct NullSink;

impl StreamSink for NullSink {
    fn handle_event(&mut self, event: &StreamEvent, _analysis: &Analysis) -> Result<(), ClientError> {
        tracing::trace!(?event, "stream event");
        Ok(())
    }
}

/// Consume a byte stream until the transport ends.
///
/// A transport error aborts with that error. Lines that are not UTF-8 or not
/// JSON are skipped. A trailing line without a newline is processed at end of
/// stream.
pub async fn consume<S, B, E, K>(chunks: S, sink: &mut K) -> Result<Analysis, ClientError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<ClientError>,
    K: StreamSink + ?Sized,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut buffer = LineBuffer::default();
    let mut analysis = Analysis::default();

    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(Into::into)?;
        buffer.extend(chunk.as_ref());
        while let Some(line) = buffer.next_line() {
            handle_line(line, &mut analysis, sink)?;
        }
    }
    if let Some(line) = buffer.take_remainder() {
        handle_line(line, &mut analysis, sink)?;
    }

    tracing::debug!(
        events = analysis.events,
        skipped = analysis.skipped_lines,
        finished = analysis.finished,
        "stream ended"
    );
    sink.finish()?;
    Ok(analysis)
}

fn handle_line<K: StreamSink + ?Sized>(
    line: Result<String, std::string::FromUtf8Error>,
    analysis: &mut Analysis,
    sink: &mut K,
) -> Result<(), ClientError> {
    let line = match line {
        Ok(line) if line.is_empty() => return Ok(()),
        Ok(line) => line,
        Err(e) => {
            tracing::debug!(error = %e, "skipping non-UTF-8 line");
            analysis.skipped_lines += 1;
            return Ok(());
        }
    };

    let event = match StreamEvent::parse_line(&line) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(error = %e, %line, "skipping malformed line");
            analysis.skipped_lines += 1;
            return Ok(());
        }
    };

    if let StreamEvent::Unknown(kind) = &event {
        tracing::debug!(%kind, "unknown event type");
    }
    analysis.apply(&event);
    sink.handle_event(&event, analysis)
}
