//! The per-request lifecycle orchestrator.
//!
//! One [`RequestTracer`] instance owns one request's trace from start to
//! hand-off. Construction seeds the tree root, starts the clocks, and
//! captures request metadata under the resolved redaction policy; lifecycle
//! hooks then drive the tree builder and error pipeline; and
//! [`RequestTracer::finish`] stamps the final duration and flags and
//! produces the immutable report. Nothing here locks: the tracer is request-scoped, and field
//! events are correlated purely by response path, so cross-path completion
//! order is unconstrained.

use std::sync::Arc;
use std::time::SystemTime;

use graphql_trace_proto::{trace, Trace};
use http::Method;
use tracing::debug;

use crate::config::{RequestMetadata, TracerConfig};
use crate::path::ResponsePath;
use crate::policy::ReportPolicy;
use crate::rewrite::{apply_rewrite, to_wire, GraphqlError};
use crate::sink::{TraceReport, TraceSink};
use crate::timing::{timestamp_from, TraceTimer};
use crate::tree::{NodeIndex, TraceTreeBuilder};

/// Token for a field resolution in flight. Returned by
/// [`RequestTracer::will_resolve_field`] and redeemed by
/// [`RequestTracer::field_did_resolve`]; any number may be outstanding at
/// once.
#[derive(Debug)]
#[must_use = "redeem with field_did_resolve to stamp the field's end time"]
pub struct FieldHandle {
    node: NodeIndex,
}

/// Flags and late-arriving identifiers the surrounding pipeline knows at
/// request end.
#[derive(Clone, Debug, Default)]
pub struct RequestSummary {
    /// Operation name surfaced by the pipeline, used only when none was
    /// captured during the request.
    pub operation_name: Option<String>,
    /// Normalized query signature, computed upstream.
    pub signature: Option<String>,
    pub full_query_cache_hit: bool,
    pub forbidden_operation: bool,
    pub registered_operation: bool,
    pub persisted_query_hit: bool,
    pub persisted_query_register: bool,
}

/// Observes one request's lifecycle and incrementally builds its trace.
pub struct RequestTracer {
    config: Arc<TracerConfig>,
    timer: TraceTimer,
    tree: TraceTreeBuilder,
    trace: Trace,
    operation_name: Option<String>,
    query: Option<String>,
}

impl RequestTracer {
    /// Starts tracing a request: seeds the tree root, captures the
    /// wall-clock start and monotonic baseline, and records HTTP and
    /// variable metadata under the resolved redaction policy.
    pub fn new(config: Arc<TracerConfig>, request: &RequestMetadata) -> Self {
        let policy = ReportPolicy::resolve(&config.policy);
        let timer = TraceTimer::start();
        let client = config.client_info_for(request);

        let trace = Trace {
            start_time: Some(timer.wall_start()),
            http: Some(trace::Http {
                method: wire_method(&request.method) as i32,
                // Host and path are not consumed downstream.
                host: String::new(),
                path: String::new(),
                request_headers: policy.record_headers(&request.headers),
            }),
            details: Some(trace::Details {
                operation_name: String::new(),
                variables_json: policy
                    .record_variables(&request.variables, request.query.as_deref()),
            }),
            client_name: client.name,
            client_version: client.version,
            client_reference_id: client.reference_id,
            ..Default::default()
        };

        RequestTracer {
            config,
            timer,
            tree: TraceTreeBuilder::new(),
            trace,
            operation_name: request.operation_name.clone(),
            query: request.query.clone(),
        }
    }

    /// Records the operation name surfaced once execution begins — but only
    /// when none was captured yet. A name explicitly supplied by the client
    /// is never clobbered by one inferred from the executing document.
    pub fn execution_did_start(&mut self, operation_name: Option<&str>) {
        if self.operation_name.is_none() {
            self.operation_name = operation_name.map(str::to_string);
        }
    }

    /// Registers a field resolution start: locates or creates the node for
    /// `path` (lazily synthesizing missing ancestors), stamps the declared
    /// types and the start offset, and returns the completion token.
    pub fn will_resolve_field(
        &mut self,
        path: &ResponsePath,
        field_type: &str,
        parent_type: &str,
    ) -> FieldHandle {
        let node = self.tree.ensure_node(path);
        self.tree
            .set_field(node, field_type, parent_type, self.timer.elapsed_ns());
        FieldHandle { node }
    }

    /// Stamps the end offset for a resolution started earlier.
    pub fn field_did_resolve(&mut self, handle: FieldHandle) {
        self.tree.set_end(handle.node, self.timer.elapsed_ns());
    }

    /// Runs each error through the rewrite hook and attaches the survivors
    /// to the node at their path (or the root). Suppression only affects
    /// the trace, never the client response.
    pub fn did_encounter_errors(&mut self, errors: &[GraphqlError]) {
        for error in errors {
            match apply_rewrite(self.config.rewrite_error.as_ref(), error) {
                Some(reported) => {
                    let record = to_wire(&reported);
                    self.tree.attach_error(reported.path.as_ref(), record);
                }
                None => debug!("Rewrite hook suppressed an error from the trace"),
            }
        }
    }

    /// Completes the trace: final monotonic duration, wall-clock end time,
    /// summary flags, resolved operation name (captured name, then the
    /// summary's, then empty), and the materialized node tree.
    pub fn finish(mut self, summary: RequestSummary) -> TraceReport {
        let operation_name = self
            .operation_name
            .or(summary.operation_name)
            .unwrap_or_default();

        self.trace.duration_ns = self.timer.elapsed_ns();
        self.trace.end_time = Some(timestamp_from(SystemTime::now()));
        self.trace.full_query_cache_hit = summary.full_query_cache_hit;
        self.trace.forbidden_operation = summary.forbidden_operation;
        self.trace.registered_operation = summary.registered_operation;
        self.trace.persisted_query_hit = summary.persisted_query_hit;
        self.trace.persisted_query_register = summary.persisted_query_register;
        if let Some(details) = self.trace.details.as_mut() {
            details.operation_name = operation_name.clone();
        }
        self.trace.root = Some(Box::new(self.tree.finish()));

        TraceReport {
            operation_name,
            signature: summary.signature.unwrap_or_default(),
            query: self.query,
            trace: self.trace,
        }
    }

    /// Completes the trace and hands it off. The hand-off is fire-and-forget
    /// from the request's point of view; a slow or full sink never delays
    /// request completion.
    pub async fn finish_into(self, summary: RequestSummary, sink: &dyn TraceSink) {
        let report = self.finish(summary);
        debug!(
            "Handing completed trace for operation '{}' to the reporting sink",
            report.operation_name
        );
        sink.submit(report).await;
    }
}

fn wire_method(method: &Method) -> trace::http::Method {
    match method.as_str() {
        "OPTIONS" => trace::http::Method::Options,
        "GET" => trace::http::Method::Get,
        "HEAD" => trace::http::Method::Head,
        "POST" => trace::http::Method::Post,
        "PUT" => trace::http::Method::Put,
        "DELETE" => trace::http::Method::Delete,
        "TRACE" => trace::http::Method::Trace,
        "CONNECT" => trace::http::Method::Connect,
        "PATCH" => trace::http::Method::Patch,
        _ => trace::http::Method::Unknown,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::policy::{HeaderRule, PolicyConfig, VariableRule};
    use crate::rewrite::Rewritten;
    use serde_json::json;

    fn request() -> RequestMetadata {
        let mut metadata = RequestMetadata {
            method: Method::POST,
            query: Some("query GetHero { hero { name } }".to_string()),
            ..Default::default()
        };
        metadata
            .variables
            .insert("a".to_string(), json!(1));
        metadata
    }

    fn tracer() -> RequestTracer {
        RequestTracer::new(Arc::new(TracerConfig::default()), &request())
    }

    #[test]
    fn test_captures_method_and_start_time() {
        let report = tracer().finish(RequestSummary::default());
        let http = report.trace.http.unwrap();
        assert_eq!(http.method, trace::http::Method::Post as i32);
        assert!(http.host.is_empty());
        assert!(report.trace.start_time.unwrap().seconds > 0);
        assert!(report.trace.end_time.is_some());
    }

    #[test]
    fn test_default_policy_redacts_variables_and_omits_headers() {
        let mut metadata = request();
        metadata
            .headers
            .insert("x-request-id", "abc".parse().unwrap());
        let tracer = RequestTracer::new(Arc::new(TracerConfig::default()), &metadata);
        let report = tracer.finish(RequestSummary::default());
        let details = report.trace.details.unwrap();
        assert_eq!(details.variables_json.get("a").unwrap(), "");
        assert!(report.trace.http.unwrap().request_headers.is_empty());
    }

    #[test]
    fn test_configured_policy_flows_through() {
        let config = TracerConfig {
            policy: PolicyConfig {
                send_headers: Some(HeaderRule::SendAll),
                send_variable_values: Some(VariableRule::SendAll),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut metadata = request();
        metadata
            .headers
            .insert("x-request-id", "abc".parse().unwrap());
        metadata
            .headers
            .insert("authorization", "Bearer s3cr3t".parse().unwrap());
        let tracer = RequestTracer::new(Arc::new(config), &metadata);
        let report = tracer.finish(RequestSummary::default());
        let headers = report.trace.http.unwrap().request_headers;
        assert_eq!(headers.get("x-request-id").unwrap().value, vec!["abc"]);
        assert!(!headers.contains_key("authorization"));
        let details = report.trace.details.unwrap();
        assert_eq!(details.variables_json.get("a").unwrap(), "1");
    }

    #[test]
    fn test_operation_name_precedence() {
        // Client-supplied name wins over the one surfaced at execution.
        let mut metadata = request();
        metadata.operation_name = Some("FromClient".to_string());
        let mut tracer = RequestTracer::new(Arc::new(TracerConfig::default()), &metadata);
        tracer.execution_did_start(Some("FromDocument"));
        let report = tracer.finish(RequestSummary::default());
        assert_eq!(report.operation_name, "FromClient");

        // Unset: execution fills it in.
        let mut tracer = tracer_without_name();
        tracer.execution_did_start(Some("FromDocument"));
        assert_eq!(
            tracer.finish(RequestSummary::default()).operation_name,
            "FromDocument"
        );

        // Still unset at the end: the summary's name, then empty.
        let tracer = tracer_without_name();
        let summary = RequestSummary {
            operation_name: Some("FromPipeline".to_string()),
            ..Default::default()
        };
        assert_eq!(tracer.finish(summary).operation_name, "FromPipeline");

        let report = tracer_without_name().finish(RequestSummary::default());
        assert_eq!(report.operation_name, "");
        assert_eq!(report.trace.details.unwrap().operation_name, "");
    }

    fn tracer_without_name() -> RequestTracer {
        let mut metadata = request();
        metadata.operation_name = None;
        RequestTracer::new(Arc::new(TracerConfig::default()), &metadata)
    }

    #[test]
    fn test_field_end_time_not_before_start() {
        let mut tracer = tracer();
        let path = ResponsePath::root().field("hero");
        let handle = tracer.will_resolve_field(&path, "Character", "Query");
        tracer.field_did_resolve(handle);
        let report = tracer.finish(RequestSummary::default());
        let hero = &report.trace.root.unwrap().child[0];
        assert!(hero.end_time >= hero.start_time);
        assert_eq!(hero.r#type, "Character");
        assert_eq!(hero.parent_type, "Query");
    }

    #[test]
    fn test_suppressed_error_leaves_trace_clean() {
        let config = TracerConfig {
            rewrite_error: Some(Arc::new(|_| Rewritten::Suppress)),
            ..Default::default()
        };
        let mut tracer = RequestTracer::new(Arc::new(config), &request());
        let boom = GraphqlError::new("boom");
        tracer.did_encounter_errors(std::slice::from_ref(&boom));
        // The client-bound error is untouched.
        assert_eq!(boom.message, "boom");
        let report = tracer.finish(RequestSummary::default());
        let root = report.trace.root.unwrap();
        assert!(root.error.is_empty());
        assert!(root.child.is_empty());
    }

    #[test]
    fn test_error_lands_on_its_node() {
        let mut tracer = tracer();
        let path = ResponsePath::root().field("hero");
        let handle = tracer.will_resolve_field(&path, "Character", "Query");
        tracer.field_did_resolve(handle);
        tracer.did_encounter_errors(&[
            GraphqlError::new("field broke").at_path(path.clone()),
            GraphqlError::new("request broke"),
        ]);
        let report = tracer.finish(RequestSummary::default());
        let root = report.trace.root.unwrap();
        assert_eq!(root.error.len(), 1);
        assert_eq!(root.error[0].message, "request broke");
        assert_eq!(root.child[0].error[0].message, "field broke");
    }

    #[test]
    fn test_summary_flags_recorded() {
        let summary = RequestSummary {
            full_query_cache_hit: true,
            persisted_query_hit: true,
            signature: Some("# GetHero\nquery GetHero{hero{name}}".to_string()),
            ..Default::default()
        };
        let report = tracer().finish(summary);
        assert!(report.trace.full_query_cache_hit);
        assert!(report.trace.persisted_query_hit);
        assert!(!report.trace.forbidden_operation);
        assert!(report.signature.starts_with("# GetHero"));
    }

    #[test]
    fn test_duration_is_monotonic_delta() {
        let tracer = tracer();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let report = tracer.finish(RequestSummary::default());
        assert!(report.trace.duration_ns >= 2_000_000);
    }

    #[test]
    fn test_wire_method_mapping() {
        assert_eq!(wire_method(&Method::GET), trace::http::Method::Get);
        assert_eq!(wire_method(&Method::POST), trace::http::Method::Post);
        let custom = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(wire_method(&custom), trace::http::Method::Unknown);
    }
}
