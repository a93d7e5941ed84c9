//! The path-keyed trace tree builder.
//!
//! Field resolution events arrive asynchronously and in no particular
//! cross-path order; the only correlation key is the response path. The
//! builder is an arena: nodes live in a `Vec`, a map from path key to arena
//! slot links events to nodes, and parents reference children by slot index.
//! Missing ancestors are synthesized lazily, so the tree stays connected no
//! matter which event arrives first. The key registry exists only while the
//! trace is being built and is discarded by [`TraceTreeBuilder::finish`].

use std::collections::HashMap;

use graphql_trace_proto::trace;

use crate::path::{PathSegment, ResponsePath};

/// Arena slot index for one node. The root is always slot 0.
pub(crate) type NodeIndex = usize;

#[derive(Debug, Default)]
struct NodeState {
    id: Option<trace::node::Id>,
    type_name: String,
    parent_type: String,
    start_time: u64,
    end_time: u64,
    errors: Vec<trace::Error>,
    children: Vec<NodeIndex>,
}

/// Builds one request's trace tree from interleaved resolution events.
#[derive(Debug)]
pub struct TraceTreeBuilder {
    nodes: Vec<NodeState>,
    index: HashMap<String, NodeIndex>,
}

impl TraceTreeBuilder {
    /// Seeds the arena with the root node under the empty key, so lazy
    /// ancestor construction always terminates.
    pub fn new() -> Self {
        let mut index = HashMap::new();
        index.insert(String::new(), 0);
        TraceTreeBuilder {
            nodes: vec![NodeState::default()],
            index,
        }
    }

    pub(crate) fn root(&self) -> NodeIndex {
        0
    }

    /// Returns the node registered at `path`, creating it (and any missing
    /// ancestors) if needed. Idempotent per path key: a second call for the
    /// same path returns the existing slot.
    ///
    /// Synthesized ancestors carry zero-valued type and timing fields; a
    /// later event for that path fills them in.
    pub(crate) fn ensure_node(&mut self, path: &ResponsePath) -> NodeIndex {
        if let Some(&existing) = self.index.get(path.key()) {
            return existing;
        }
        let id = path.last().map(|segment| match segment {
            PathSegment::Field(name) => trace::node::Id::ResponseName(name.clone()),
            PathSegment::Index(i) => trace::node::Id::Index(*i as u32),
        });
        let slot = self.nodes.len();
        self.nodes.push(NodeState {
            id,
            ..Default::default()
        });
        self.index.insert(path.key().to_string(), slot);

        let parent = self.ensure_parent(path);
        self.nodes[parent].children.push(slot);
        slot
    }

    /// Locates the parent node for `path`, synthesizing it when no event has
    /// arrived for the intermediate position yet. The pre-registered root
    /// terminates the recursion.
    fn ensure_parent(&mut self, path: &ResponsePath) -> NodeIndex {
        match path.parent() {
            Some(parent_path) => self.ensure_node(&parent_path),
            None => self.root(),
        }
    }

    /// Stamps the field metadata and start time on a node.
    pub(crate) fn set_field(
        &mut self,
        node: NodeIndex,
        type_name: &str,
        parent_type: &str,
        start_ns: u64,
    ) {
        let state = &mut self.nodes[node];
        state.type_name = type_name.to_string();
        state.parent_type = parent_type.to_string();
        state.start_time = start_ns;
    }

    pub(crate) fn set_end(&mut self, node: NodeIndex, end_ns: u64) {
        self.nodes[node].end_time = end_ns;
    }

    /// Attaches an error to the node at `path` if one is registered, else to
    /// the root. Attachment never creates nodes: an error against a path the
    /// tracer has never seen belongs to the root.
    pub(crate) fn attach_error(&mut self, path: Option<&ResponsePath>, error: trace::Error) {
        let target = path
            .and_then(|p| self.index.get(p.key()).copied())
            .unwrap_or_else(|| self.root());
        self.nodes[target].errors.push(error);
    }

    #[cfg(test)]
    fn lookup(&self, key: &str) -> Option<NodeIndex> {
        self.index.get(key).copied()
    }

    /// Consumes the builder and materializes the nested wire-format tree.
    /// The path registry is discarded here; the result is immutable.
    pub(crate) fn finish(mut self) -> trace::Node {
        let root = self.root();
        self.build_node(root)
    }

    fn build_node(&mut self, index: NodeIndex) -> trace::Node {
        let children = std::mem::take(&mut self.nodes[index].children);
        let child = children
            .into_iter()
            .map(|c| self.build_node(c))
            .collect::<Vec<_>>();
        let state = std::mem::take(&mut self.nodes[index]);
        trace::Node {
            id: state.id,
            r#type: state.type_name,
            parent_type: state.parent_type,
            start_time: state.start_time,
            end_time: state.end_time,
            error: state.errors,
            child,
            original_field_name: String::new(),
        }
    }
}

impl Default for TraceTreeBuilder {
    fn default() -> Self {
        TraceTreeBuilder::new()
    }
}
