//! Wire-format messages for the GraphQL trace reporting protocol.
//!
//! These are hand-maintained `prost` definitions covering the subset of the
//! reporting schema this workspace populates. Field tags match the upstream
//! `.proto` schema, so payloads encoded here are readable by any consumer of
//! that schema. Keeping the types checked in (instead of a `prost-build`
//! step) means no `protoc` is required at build time.

#![deny(clippy::all)]

use std::collections::HashMap;

pub use prost_types::Timestamp;

/// One request's trace record: timing, shape, and error data destined for a
/// reporting backend.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trace {
    /// Wall clock time when the request ended.
    #[prost(message, optional, tag = "3")]
    pub end_time: Option<Timestamp>,
    /// Wall clock time when the request started.
    #[prost(message, optional, tag = "4")]
    pub start_time: Option<Timestamp>,
    #[prost(message, optional, tag = "6")]
    pub details: Option<trace::Details>,
    /// Client identity fields default to the empty string, never unset.
    #[prost(string, tag = "7")]
    pub client_name: String,
    #[prost(string, tag = "8")]
    pub client_version: String,
    #[prost(message, optional, tag = "10")]
    pub http: Option<trace::Http>,
    /// Total request duration as a monotonic delta, in nanoseconds.
    #[prost(uint64, tag = "11")]
    pub duration_ns: u64,
    #[prost(message, optional, boxed, tag = "14")]
    pub root: Option<Box<trace::Node>>,
    #[prost(bool, tag = "20")]
    pub full_query_cache_hit: bool,
    #[prost(bool, tag = "21")]
    pub persisted_query_hit: bool,
    #[prost(bool, tag = "22")]
    pub persisted_query_register: bool,
    #[prost(string, tag = "23")]
    pub client_reference_id: String,
    #[prost(bool, tag = "24")]
    pub registered_operation: bool,
    #[prost(bool, tag = "25")]
    pub forbidden_operation: bool,
}

pub mod trace {
    use super::HashMap;

    /// A line/column position in the source query document.
    #[derive(Clone, Copy, PartialEq, ::prost::Message)]
    pub struct Location {
        #[prost(uint32, tag = "1")]
        pub line: u32,
        #[prost(uint32, tag = "2")]
        pub column: u32,
    }

    /// An error attached to the node whose resolution raised it.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Error {
        #[prost(string, tag = "1")]
        pub message: String,
        #[prost(message, repeated, tag = "2")]
        pub location: Vec<Location>,
        #[prost(uint64, tag = "3")]
        pub time_ns: u64,
        /// Full JSON serialization of the original error, for fields the
        /// schema does not otherwise capture.
        #[prost(string, tag = "4")]
        pub json: String,
    }

    /// One resolved field or array element in the response tree.
    ///
    /// `start_time`/`end_time` are nanosecond offsets from the trace start,
    /// not absolute timestamps. Children appear in discovery order.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Node {
        #[prost(oneof = "node::Id", tags = "1, 2")]
        pub id: Option<node::Id>,
        #[prost(string, tag = "3")]
        pub r#type: String,
        #[prost(uint64, tag = "8")]
        pub start_time: u64,
        #[prost(uint64, tag = "9")]
        pub end_time: u64,
        #[prost(message, repeated, tag = "11")]
        pub error: Vec<Error>,
        #[prost(message, repeated, tag = "12")]
        pub child: Vec<Node>,
        #[prost(string, tag = "13")]
        pub parent_type: String,
        #[prost(string, tag = "14")]
        pub original_field_name: String,
    }

    pub mod node {
        /// A node is keyed by a response field name or an array index,
        /// mutually exclusive. The root node carries neither.
        #[derive(Clone, PartialEq, ::prost::Oneof)]
        pub enum Id {
            #[prost(string, tag = "1")]
            ResponseName(String),
            #[prost(uint32, tag = "2")]
            Index(u32),
        }
    }

    /// HTTP-level request metadata. Host and path are intentionally left
    /// empty: they are not consumed downstream.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Http {
        #[prost(enumeration = "http::Method", tag = "1")]
        pub method: i32,
        #[prost(string, tag = "2")]
        pub host: String,
        #[prost(string, tag = "3")]
        pub path: String,
        /// Redacted request headers; a name maps to every value it carried.
        #[prost(map = "string, message", tag = "4")]
        pub request_headers: HashMap<String, http::Values>,
    }

    pub mod http {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct Values {
            #[prost(string, repeated, tag = "1")]
            pub value: Vec<String>,
        }

        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
        )]
        #[repr(i32)]
        pub enum Method {
            Unknown = 0,
            Options = 1,
            Get = 2,
            Head = 3,
            Post = 4,
            Put = 5,
            Delete = 6,
            Trace = 7,
            Connect = 8,
            Patch = 9,
        }
    }

    /// Operation details: redacted variables and the operation name.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Details {
        #[prost(string, tag = "3")]
        pub operation_name: String,
        /// Variable name to JSON-encoded value; the empty string marks a
        /// redacted value (a literal empty string encodes as `"\"\""`).
        #[prost(map = "string, string", tag = "4")]
        pub variables_json: HashMap<String, String>,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_populated_trace_round_trips() {
        let root = trace::Node {
            id: None,
            child: vec![trace::Node {
                id: Some(trace::node::Id::ResponseName("hero".to_string())),
                r#type: "Character".to_string(),
                parent_type: "Query".to_string(),
                start_time: 100,
                end_time: 400,
                error: vec![trace::Error {
                    message: "boom".to_string(),
                    location: vec![trace::Location { line: 1, column: 3 }],
                    time_ns: 0,
                    json: "{\"message\":\"boom\"}".to_string(),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };
        let t = Trace {
            duration_ns: 12_345,
            root: Some(Box::new(root)),
            client_name: "web".to_string(),
            ..Default::default()
        };

        let bytes = t.encode_to_vec();
        let decoded = Trace::decode(bytes.as_slice()).unwrap();
        assert_eq!(decoded, t);
        let hero = &decoded.root.unwrap().child[0];
        assert_eq!(
            hero.id,
            Some(trace::node::Id::ResponseName("hero".to_string()))
        );
        assert_eq!(hero.error[0].location[0].column, 3);
    }

    #[test]
    fn test_unset_client_fields_encode_as_empty_strings() {
        let t = Trace::default();
        assert_eq!(t.client_name, "");
        assert_eq!(t.client_reference_id, "");
        // proto3 default: absent from the wire entirely.
        assert!(t.encode_to_vec().is_empty());
    }

    #[test]
    fn test_method_enum_values_match_schema() {
        assert_eq!(trace::http::Method::Unknown as i32, 0);
        assert_eq!(trace::http::Method::Get as i32, 2);
        assert_eq!(trace::http::Method::Post as i32, 4);
        assert_eq!(trace::http::Method::Patch as i32, 9);
    }
}
