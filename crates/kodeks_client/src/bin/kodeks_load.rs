//! kodeks-load: sends a batch of questions to the non-streaming analysis
//! endpoint and reports latency and pass/fail statistics.
//!
//! Usage: kodeks-load [count] [concurrency]

use kodeks_client::console;
use kodeks_client::{config, logging, Client, LoadOptions};
use std::io;
use std::process;

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("❌ Error: {}", message);
    process::exit(1);
}

fn main() {
    dotenvy::dotenv().ok();
    logging::init();

    let api_key = config::api_key_from_env().unwrap_or_else(|e| fail(e));
    let cfg = config::resolve().unwrap_or_else(|e| fail(e));
    let client = Client::new(&cfg, api_key).unwrap_or_else(|e| fail(e));

    let options = LoadOptions::from_config(&cfg.load).with_args(std::env::args().skip(1));

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|e| fail(format!("failed to create runtime: {}", e)));

    rt.block_on(async {
        let stdout = io::stdout();
        let _ = console::print_load_banner(&mut stdout.lock(), &options, client.analysis_url());

        let report = kodeks_client::load::run_load(&client, options, |agg| {
            let _ = console::print_progress(&mut stdout.lock(), agg.success, agg.total, agg.failed);
        })
        .await;

        if let Err(e) = console::print_load_report(&mut stdout.lock(), &report) {
            tracing::error!(error = %e, "failed to write report");
        }
    });
}
