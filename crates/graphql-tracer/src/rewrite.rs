//! GraphQL error records and the user-supplied rewrite pipeline.
//!
//! Errors raised during a request pass through an optional rewrite hook
//! before being attached to the trace. The hook operates on a borrowed
//! error and returns a [`Rewritten`] decision, so it can never corrupt the
//! error object that is simultaneously being returned to the client. A
//! replacement merges only the message and extensions; locations and path
//! are always kept from the original so the error still attaches to the
//! correct tree node and retains its forensic fields.

use std::sync::Arc;

use graphql_trace_proto::trace;
use serde::Serialize;
use serde_json::Value;

use crate::path::ResponsePath;

/// A line/column position in the query document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// One error raised during request execution, in GraphQL response shape.
#[derive(Clone, Debug, Serialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<ResponsePath>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        GraphqlError {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: None,
        }
    }

    pub fn at_path(mut self, path: ResponsePath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn at_location(mut self, line: u32, column: u32) -> Self {
        self.locations.push(Location { line, column });
        self
    }
}

/// Decision returned by a rewrite hook.
///
/// `Suppress` drops the error from the trace only — never from the client
/// response. `Unchanged` reports the original as-is; it is also the fail-open
/// arm a hook should land on when it has nothing sensible to return, since
/// losing visibility silently is worse than a missed rewrite.
#[derive(Clone, Debug)]
pub enum Rewritten {
    Suppress,
    Unchanged,
    Replace(GraphqlError),
}

/// User-supplied per-error rewrite hook.
pub type RewriteHook = Arc<dyn Fn(&GraphqlError) -> Rewritten + Send + Sync>;

/// Applies the hook (if any) to one error. Returns the error to report, or
/// `None` when reporting is suppressed.
pub(crate) fn apply_rewrite(
    hook: Option<&RewriteHook>,
    error: &GraphqlError,
) -> Option<GraphqlError> {
    let Some(hook) = hook else {
        return Some(error.clone());
    };
    match hook(error) {
        Rewritten::Suppress => None,
        Rewritten::Unchanged => Some(error.clone()),
        Rewritten::Replace(replacement) => Some(GraphqlError {
            // Only the message and extensions come from the replacement.
            message: replacement.message,
            extensions: replacement.extensions,
            locations: error.locations.clone(),
            path: error.path.clone(),
        }),
    }
}

/// Converts a reportable error into its wire record: message, source
/// locations, and a full JSON serialization for forward compatibility.
pub(crate) fn to_wire(error: &GraphqlError) -> trace::Error {
    trace::Error {
        message: error.message.clone(),
        location: error
            .locations
            .iter()
            .map(|loc| trace::Location {
                line: loc.line,
                column: loc.column,
            })
            .collect(),
        time_ns: 0,
        json: serde_json::to_string(error).unwrap_or_default(),
    }
}
