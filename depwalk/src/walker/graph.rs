use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Serialize, Serializer};

use crate::core::registry::document::{Maintainer, RepositoryPointer};
use crate::core::{NodeId, PackageDocument, VersionRecord};

/// Materialized record of a single package version.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: NodeId,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub deprecated: bool,
    pub keywords: Vec<String>,
    pub maintainers: Vec<Maintainer>,
    pub homepage: Option<String>,
    pub repository: Option<RepositoryPointer>,
    pub dist_tags: BTreeMap<String, String>,
    pub time: BTreeMap<String, String>,
}

impl GraphNode {
    /// Builds a node from the manifest of the resolved version, falling back to package-level
    /// metadata for fields the manifest does not declare.
    pub fn new(id: NodeId, document: &PackageDocument, record: &VersionRecord) -> Self {
        let keywords = if record.keywords.is_empty() {
            &document.keywords
        } else {
            &record.keywords
        };
        let maintainers = if record.maintainers.is_empty() {
            &document.maintainers
        } else {
            &record.maintainers
        };

        Self {
            name: record
                .name
                .clone()
                .unwrap_or_else(|| id.name.to_string()),
            version: record
                .version
                .clone()
                .unwrap_or_else(|| id.version.to_string()),
            description: record
                .description
                .clone()
                .or_else(|| document.description.clone()),
            license: record
                .license()
                .or_else(|| document.license.as_ref().and_then(|l| l.name()))
                .map(str::to_string),
            deprecated: record.is_deprecated(),
            keywords: keywords.to_vec(),
            maintainers: maintainers.iter().map(Maintainer::from).collect(),
            homepage: record
                .homepage
                .clone()
                .or_else(|| document.homepage.clone()),
            repository: record
                .repository
                .as_ref()
                .or(document.repository.as_ref())
                .and_then(|repo| repo.to_pointer()),
            dist_tags: document.dist_tags.clone(),
            time: document.time.clone(),
            id,
        }
    }
}

/// Directed `parent -> child` relation between two nodes.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Edge({self})")
    }
}

impl Serialize for Edge {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

enum NodeSlot {
    /// A worker owns this node and is expanding it.
    Claimed,
    Recorded(GraphNode),
}

/// Graph under construction, shared by all workers of a walk.
///
/// Nodes are deduplicated by id: [`Graph::try_claim`] grants each id to exactly one worker.
/// Edges are not deduplicated, a node reachable from two parents has two incoming edges.
#[derive(Default)]
pub struct Graph {
    nodes: DashMap<NodeId, NodeSlot>,
    edges: Mutex<Vec<Edge>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically reserve `id` for expansion.
    ///
    /// Returns `true` if the caller is the first one to see this id and should expand it,
    /// `false` if it has been claimed already.
    pub fn try_claim(&self, id: &NodeId) -> bool {
        match self.nodes.entry(id.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(NodeSlot::Claimed);
                true
            }
        }
    }

    /// Store the node of a previously claimed id.
    pub fn record_node(&self, node: GraphNode) {
        self.nodes
            .insert(node.id.clone(), NodeSlot::Recorded(node));
    }

    pub fn record_edge(&self, from: NodeId, to: NodeId) {
        self.edges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Edge { from, to });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Copy recorded nodes and edges out of this graph, sorted for stable output.
    ///
    /// Ids which were claimed but never recorded are skipped.
    pub fn snapshot(&self) -> ResolvedGraph {
        let mut nodes = self
            .nodes
            .iter()
            .filter_map(|entry| match entry.value() {
                NodeSlot::Recorded(node) => Some(node.clone()),
                NodeSlot::Claimed => None,
            })
            .collect::<Vec<_>>();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut edges = self
            .edges
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        edges.sort();

        ResolvedGraph { nodes, edges }
    }
}

/// Final result of a walk, serialized as `{ "nodes": [...], "edges": ["a@1.0.0->b@2.0.0"] }`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct ResolvedGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<Edge>,
}

impl ResolvedGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id.to_string() == id)
    }

    /// Number of edges pointing at node `id`.
    pub fn in_degree(&self, id: &str) -> usize {
        self.edges
            .iter()
            .filter(|edge| edge.to.to_string() == id)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use semver::Version;

    use super::{Graph, GraphNode};
    use crate::core::{NodeId, PackageDocument, PackageName, VersionRecord};

    fn id(name: &str, version: &str) -> NodeId {
        NodeId::new(PackageName::new(name), Version::parse(version).unwrap())
    }

    #[test]
    fn claim_once() {
        let graph = Graph::new();
        let foo = id("foo", "1.0.0");
        assert!(graph.try_claim(&foo));
        assert!(!graph.try_claim(&foo));
        assert!(graph.try_claim(&id("foo", "1.0.1")));
    }

    #[test]
    fn claimed_but_unrecorded_nodes_are_not_listed() {
        let graph = Graph::new();
        let foo = id("foo", "1.0.0");
        let bar = id("bar", "1.0.0");
        graph.try_claim(&foo);
        graph.try_claim(&bar);
        graph.record_node(GraphNode::new(
            bar.clone(),
            &PackageDocument::default(),
            &VersionRecord::default(),
        ));

        let resolved = graph.snapshot();
        assert_eq!(resolved.nodes.len(), 1);
        assert_eq!(resolved.nodes[0].id, bar);
        assert_eq!(resolved.nodes[0].name, "bar");
        assert_eq!(resolved.nodes[0].version, "1.0.0");
    }

    #[test]
    fn edges_are_not_deduplicated() {
        let graph = Graph::new();
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        graph.record_edge(a.clone(), b.clone());
        graph.record_edge(a.clone(), b.clone());
        assert_eq!(graph.edge_count(), 2);

        let resolved = graph.snapshot();
        assert_eq!(resolved.in_degree("b@1.0.0"), 2);
        assert_eq!(
            serde_json::to_value(&resolved.edges).unwrap(),
            serde_json::json!(["a@1.0.0->b@1.0.0", "a@1.0.0->b@1.0.0"])
        );
    }

    #[test]
    fn concurrent_claims_have_single_winner() {
        let graph = Arc::new(Graph::new());
        let winners = Arc::new(AtomicUsize::new(0));
        let target = id("shared", "1.0.0");

        let threads = (0..16)
            .map(|_| {
                let graph = graph.clone();
                let winners = winners.clone();
                let target = target.clone();
                std::thread::spawn(move || {
                    if graph.try_claim(&target) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect::<Vec<_>>();
        for thread in threads {
            thread.join().unwrap();
        }

        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert_eq!(graph.node_count(), 1);
    }
}
