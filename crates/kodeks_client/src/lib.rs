//! Client library for the ZapytajKodeks analysis API (config, wire types,
//! NDJSON stream consumer, batch load driver). Used by `kodeks-stream` and
//! `kodeks-load`.

pub mod client;
pub mod config;
pub mod console;
pub mod consumer;
pub mod lines;
pub mod load;
pub mod logging;
pub mod messages;
pub mod spinner;

pub use client::{AnalysisReply, Client, ClientError};
pub use config::{default_config_path, ApiSection, Config, ConfigError, LoadSection};
pub use consumer::{consume, Analysis, NullSink, StreamSink};
pub use load::{Aggregate, LoadOptions, LoadReport, RunResult};
pub use messages::{AnalysisResponse, QueryMessage, Source, StreamEvent};
