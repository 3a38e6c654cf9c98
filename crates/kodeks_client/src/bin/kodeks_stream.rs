//! kodeks-stream: asks one question on the streaming analysis endpoint and
//! prints the answer and sources as they arrive.
//!
//! Usage: kodeks-stream ["question"]

use kodeks_client::console::{self, ConsoleSink};
use kodeks_client::{logging, Client};
use std::io::{self, Write};
use std::process;

const DEFAULT_QUESTION: &str = "Kiedy mogę poprosić sąd o warunkowe umorzenie sprawy karnej";

fn fail(message: impl std::fmt::Display) -> ! {
    let _ = io::stdout().flush();
    eprintln!("\n❌ Error: {}", message);
    process::exit(1);
}

fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    // Credential and config are checked before any connection is made.
    let client = Client::from_env().unwrap_or_else(|e| fail(e));

    let question = std::env::args()
        .nth(1)
        .filter(|q| !q.is_empty())
        .unwrap_or_else(|| DEFAULT_QUESTION.to_string());

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(format!("failed to create runtime: {}", e)));

    rt.block_on(async {
        let mut sink = ConsoleSink::stdout();
        if let Err(e) = sink.header(&question) {
            fail(e);
        }

        let analysis = match client.stream_analysis(&question, &mut sink).await {
            Ok(analysis) => analysis,
            Err(e) => {
                sink.stop();
                fail(e);
            }
        };

        let mut out = sink.into_inner();
        if let Err(e) = console::print_summary(&mut out, &analysis) {
            fail(e);
        }
    });
}
