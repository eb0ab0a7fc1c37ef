//! Turns orchestrator run logs into lineage events.
//!
//! The heart of the crate is [`accumulator`], a fold that splits a log into
//! run segments and summarizes each one. [`resolve`] supplies plugin config
//! from the manifest, [`mapper`] turns summaries into START/terminal event
//! pairs, and [`source`], [`project`] and [`sink`] are the file and network
//! adapters around them.

pub mod accumulator;
pub mod config;
pub mod mapper;
pub mod project;
pub mod resolve;
pub mod schema;
pub mod sink;
pub mod source;

pub use accumulator::{segment_runs, RunSegmenter, SegmentStats};
pub use config::{DiscardPolicy, ParseOptions, RunIdStrategy};
pub use mapper::to_events;
pub use resolve::resolve_config;
pub use source::{load_manifest, parse_log_file, ParseReport};
