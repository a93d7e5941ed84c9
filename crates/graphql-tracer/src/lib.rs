//! # GraphQL Request Tracer
//!
//! Per-request execution tracing for GraphQL servers. One [`RequestTracer`]
//! observes a single request's lifecycle (request start, execution start,
//! per-field resolution, errors, request end) and incrementally builds an
//! immutable trace record mirroring the shape of the response, ready for
//! hand-off to a reporting sink in the binary wire format defined by the
//! `graphql-trace-proto` crate.
//!
//! ## Architecture
//!
//! - [`path`]: response-position value type and its collision-free string key
//! - [`timing`]: monotonic duration capture and wall-clock wire timestamps
//! - [`policy`]: header/variable redaction policy resolution
//! - [`tree`]: the path-keyed trace tree builder
//! - [`rewrite`]: per-error rewrite hook application
//! - [`tracer`]: the request lifecycle orchestrator
//! - [`sink`]: fire-and-forget hand-off to the reporting agent
//!
//! Every tracer instance is request-scoped; concurrent requests share no
//! mutable state. Field resolutions may complete in any order — the tree
//! builder correlates start/end events purely by response path.

#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![deny(unreachable_pub)]

pub mod config;
pub mod error;
pub mod path;
pub mod policy;
pub mod rewrite;
pub mod sink;
pub mod timing;
pub mod tracer;
pub mod tree;

pub use config::{ClientInfo, ClientInfoHook, RequestMetadata, TracerConfig};
pub use error::TracerError;
pub use path::{PathSegment, ResponsePath};
pub use policy::{
    HeaderRule, LegacyRule, PolicyConfig, ReportPolicy, VariableRule, VariableTransform,
};
pub use rewrite::{GraphqlError, Location, RewriteHook, Rewritten};
pub use sink::{ChannelTraceSink, TraceReport, TraceSink};
pub use tracer::{FieldHandle, RequestSummary, RequestTracer};
