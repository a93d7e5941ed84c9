//! Header and variable redaction policy.
//!
//! Two independently configured axes — request headers and operation
//! variables — each with a current structured form and a deprecated
//! boolean-or-list form. [`ReportPolicy::resolve`] reconciles both into one
//! set of decision functions, computed once per request, so no per-header or
//! per-variable shape inspection happens on the hot path.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use graphql_trace_proto::trace;
use serde_json::{Map, Value};

/// Headers withheld unconditionally, regardless of any configured policy.
const ALWAYS_BLOCKED_HEADERS: [&str; 3] = ["authorization", "cookie", "set-cookie"];

/// Recorded in place of a variable value that cannot be JSON-encoded.
const UNENCODABLE_VALUE: &str = "[Unable to convert value to JSON]";

/// Structured header policy. When no rule is configured at all, headers are
/// omitted from the trace entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeaderRule {
    /// Send every header except the always-blocked set.
    SendAll,
    /// Send no headers.
    SendNone,
    /// Send all except the named headers (case-insensitive).
    ExceptNames(Vec<String>),
}

/// Structured variable policy.
#[derive(Clone)]
pub enum VariableRule {
    /// Record every variable's JSON-encoded value.
    SendAll,
    /// Record every variable name with the empty-string redaction marker.
    SendNone,
    /// Redact only the named variables (case-sensitive).
    ExceptNames(Vec<String>),
    /// User-supplied replacement of the whole variable map.
    Transform(VariableTransform),
}

/// Receives the full variable map and the raw query text, returns a
/// replacement map. The result is filtered to the original key set: keys the
/// transform adds are dropped, keys it omits are simply not recorded.
pub type VariableTransform =
    Arc<dyn Fn(&Map<String, Value>, Option<&str>) -> Map<String, Value> + Send + Sync>;

impl fmt::Debug for VariableRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableRule::SendAll => f.write_str("SendAll"),
            VariableRule::SendNone => f.write_str("SendNone"),
            VariableRule::ExceptNames(names) => f.debug_tuple("ExceptNames").field(names).finish(),
            VariableRule::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// The deprecated boolean-or-list configuration shape, still accepted on
/// both axes. `Bool(true)` (and an absent value) means redact everything,
/// `Bool(false)` means send everything, a list redacts only its names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LegacyRule {
    Bool(bool),
    Names(Vec<String>),
}

impl LegacyRule {
    fn to_header_rule(&self) -> HeaderRule {
        match self {
            LegacyRule::Bool(true) => HeaderRule::SendNone,
            LegacyRule::Bool(false) => HeaderRule::SendAll,
            LegacyRule::Names(names) => HeaderRule::ExceptNames(names.clone()),
        }
    }

    fn to_variable_rule(&self) -> VariableRule {
        match self {
            LegacyRule::Bool(true) => VariableRule::SendNone,
            LegacyRule::Bool(false) => VariableRule::SendAll,
            LegacyRule::Names(names) => VariableRule::ExceptNames(names.clone()),
        }
    }
}

/// Raw configuration for both axes, current and deprecated forms.
#[derive(Clone, Debug, Default)]
pub struct PolicyConfig {
    pub send_headers: Option<HeaderRule>,
    /// Deprecated; superseded by `send_headers` when that is set.
    pub private_headers: Option<LegacyRule>,
    pub send_variable_values: Option<VariableRule>,
    /// Deprecated; superseded by `send_variable_values` when that is set.
    pub private_variables: Option<LegacyRule>,
}

/// The resolved, per-request decision functions.
#[derive(Clone, Debug)]
pub struct ReportPolicy {
    /// `None` means headers are omitted from the trace entirely.
    /// `ExceptNames` lists are lowercased here, once.
    headers: Option<HeaderRule>,
    variables: VariableRule,
}

impl ReportPolicy {
    /// Reconciles current and deprecated forms.
    ///
    /// The precedence is deliberately asymmetric and matches the original
    /// behavior exactly: the current form is used when it is set, or when
    /// the deprecated form is absent; only a set deprecated form paired
    /// with an unset current form falls back to the legacy translation.
    pub fn resolve(config: &PolicyConfig) -> Self {
        let headers = if config.send_headers.is_some() || config.private_headers.is_none() {
            config.send_headers.clone()
        } else {
            config.private_headers.as_ref().map(LegacyRule::to_header_rule)
        };
        let headers = headers.map(|rule| match rule {
            HeaderRule::ExceptNames(names) => HeaderRule::ExceptNames(
                names.into_iter().map(|name| name.to_ascii_lowercase()).collect(),
            ),
            other => other,
        });

        let variables =
            if config.send_variable_values.is_some() || config.private_variables.is_none() {
                config
                    .send_variable_values
                    .clone()
                    .unwrap_or(VariableRule::SendNone)
            } else {
                config
                    .private_variables
                    .as_ref()
                    .map(LegacyRule::to_variable_rule)
                    .unwrap_or(VariableRule::SendNone)
            };

        ReportPolicy { headers, variables }
    }

    /// Whether a header may appear in the trace. The always-blocked set is
    /// dropped before any configured rule is consulted.
    pub fn include_header(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        if ALWAYS_BLOCKED_HEADERS.contains(&name.as_str()) {
            return false;
        }
        match &self.headers {
            None | Some(HeaderRule::SendNone) => false,
            Some(HeaderRule::SendAll) => true,
            Some(HeaderRule::ExceptNames(names)) => !names.iter().any(|n| n == &name),
        }
    }

    /// Applies the header policy to a request's headers, preserving
    /// multi-valued headers. Values that are not valid UTF-8 are skipped.
    pub fn record_headers(&self, headers: &http::HeaderMap) -> HashMap<String, trace::http::Values> {
        let mut recorded = HashMap::new();
        for name in headers.keys() {
            if !self.include_header(name.as_str()) {
                continue;
            }
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok().map(str::to_string))
                .collect();
            if !values.is_empty() {
                recorded.insert(name.as_str().to_string(), trace::http::Values { value: values });
            }
        }
        recorded
    }

    /// Applies the variable policy, producing the trace's variables map.
    ///
    /// Redacted values record as the empty string, which is distinguishable
    /// from a literal empty-string value (that JSON-encodes to `"\"\""`).
    /// A value that fails to encode records a sentinel string instead of
    /// failing the request.
    pub fn record_variables(
        &self,
        variables: &Map<String, Value>,
        query: Option<&str>,
    ) -> HashMap<String, String> {
        match &self.variables {
            VariableRule::Transform(transform) => {
                let replaced = transform(variables, query);
                // Filter to the original key set: added keys are dropped,
                // omitted keys become absent.
                variables
                    .keys()
                    .filter_map(|name| {
                        replaced
                            .get(name)
                            .map(|value| (name.clone(), encode_variable(value)))
                    })
                    .collect()
            }
            rule => variables
                .iter()
                .map(|(name, value)| {
                    let redact = match rule {
                        VariableRule::SendAll => false,
                        VariableRule::SendNone => true,
                        VariableRule::ExceptNames(names) => names.iter().any(|n| n == name),
                        VariableRule::Transform(_) => unreachable!("handled above"),
                    };
                    let recorded = if redact {
                        String::new()
                    } else {
                        encode_variable(value)
                    };
                    (name.clone(), recorded)
                })
                .collect(),
        }
    }
}

fn encode_variable(value: &Value) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| format!("\"{UNENCODABLE_VALUE}\""))
}
