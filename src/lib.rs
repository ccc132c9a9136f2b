//! Buffered Warp10 metric writer
//!
//! This library takes measurement samples from a monitoring agent, rewrites
//! their classnames through a configurable rule pipeline, buffers the
//! resulting wire lines, and pushes batches to one or more Warp10-compatible
//! ingestion endpoints on a timer. Undelivered batches are re-queued and
//! retried on a faster cadence; delivery is at-least-once, best-effort.

pub mod buffer;
pub mod config;
pub mod errors;
pub mod format;
pub mod registry;
pub mod rewrite;
pub mod sample;
pub mod transport;
pub mod writer;

pub use config::{ConfigNode, EndpointConfig, endpoints_from_config};
pub use errors::{Result, WriterError};
pub use format::{FormattedLine, Formatter};
pub use registry::WriterRegistry;
pub use rewrite::{Rewrite, RewriteEngine, RewriteFlag, RewriteRule};
pub use sample::{DataSource, DataSourceKind, DatasetResolver, Sample, StaticDatasets};
pub use transport::Warp10Transport;
pub use writer::EndpointWriter;
