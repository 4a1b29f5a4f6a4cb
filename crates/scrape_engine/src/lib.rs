//! Scrape engine: fetching, per-target pipelines, batch orchestration and output.
mod backoff;
mod batch;
mod decode;
mod fetch;
mod persist;
mod pipeline;
mod proxy;
mod sink;
mod user_agent;

pub use backoff::BackoffPolicy;
pub use batch::{BatchError, BatchRunner, BatchSettings};
pub use decode::{decode_body, DecodedBody};
pub use fetch::{
    block_signals, BlockSignal, FetchError, FetchFailure, FetchResult, FetchSettings, Fetcher,
    ReqwestFetcher,
};
pub use persist::{ensure_output_dir, write_report, AtomicFileWriter, PersistError, REPORT_FILE};
pub use pipeline::{Clock, Extracted, Pipeline, UnknownKindPolicy};
pub use proxy::{NoProxy, ProxyError, ProxyProvider, StaticProxyPool};
pub use sink::{JsonLinesSink, MemorySink, RecordSink, SinkError};
pub use user_agent::{random_user_agent, user_agents};
