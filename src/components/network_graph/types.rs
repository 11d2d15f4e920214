//! Graph model and conversion from network descriptions.

use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Insertion-ordered attribute map carried by nodes and edges.
pub type Attributes = serde_json::Map<String, Value>;

/// The kind of network a description encodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkType {
	/// Artificial neural network (layer graph).
	#[default]
	#[serde(rename = "ANN")]
	Ann,
	/// Spiking neural network.
	#[serde(rename = "SNN")]
	Snn,
	/// Biological connectome.
	Connectome,
}

impl NetworkType {
	/// Whether the network models biological tissue rather than a layer stack.
	pub fn is_biological(self) -> bool {
		matches!(self, NetworkType::Snn | NetworkType::Connectome)
	}
}

/// A node as supplied by the network description source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
	/// Unique node id.
	pub id: String,
	/// Layer or neuron type, e.g. `Linear` or `LIF`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Free-form attributes such as `in_features`.
	#[serde(default)]
	pub properties: Attributes,
}

/// A connection as supplied by the network description source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkConnection {
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	/// Signed connection strength.
	#[serde(default)]
	pub weight: f64,
	/// Free-form attributes.
	#[serde(default)]
	pub properties: Attributes,
}

/// An already-validated network description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkDescription {
	/// What kind of network this is.
	#[serde(rename = "type")]
	pub network_type: NetworkType,
	/// Layers or neurons.
	pub nodes: Vec<NetworkNode>,
	/// Directed connections between `nodes`.
	pub connections: Vec<NetworkConnection>,
}

/// One event of the live training feed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
	/// Epoch the values were taken at.
	pub epoch: u32,
	/// Training loss.
	pub loss: f64,
	/// Accuracy in `[0, 1]`, when measured.
	#[serde(default)]
	pub accuracy: Option<f64>,
	/// Gradient magnitude by node id.
	#[serde(default)]
	pub gradients: BTreeMap<String, f64>,
	/// Mean activation by node id.
	#[serde(default)]
	pub activations: BTreeMap<String, f64>,
	/// Anything else the trainer reports.
	#[serde(default, rename = "customMetrics", alias = "custom_metrics")]
	pub custom_metrics: Option<BTreeMap<String, f64>>,
}

/// A position in graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate, growing rightwards.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// A point at `(x, y)`.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Neither coordinate is NaN or infinite.
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}
}

/// A layer or neuron.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique id, shared with the description.
	pub id: String,
	/// Layer or neuron type.
	pub kind: String,
	/// Properties copied from the description.
	pub attributes: Attributes,
	/// `None` until a layout has run.
	pub position: Option<Point>,
	/// Fixed coordinates, exempt from physics.
	pub pinned: bool,
}

impl Node {
	/// An unplaced node without attributes.
	pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			kind: kind.into(),
			attributes: Attributes::new(),
			position: None,
			pinned: false,
		}
	}

	/// Display label built from the kind and the layer shape attributes.
	pub fn label(&self) -> String {
		let int = |key: &str| self.attributes.get(key).and_then(Value::as_u64);
		if let (Some(i), Some(o)) = (int("in_features"), int("out_features")) {
			return format!("{} {}→{}", self.kind, i, o);
		}
		match (int("in_channels"), int("out_channels")) {
			(Some(i), Some(o)) => format!("{} {}→{}ch", self.kind, i, o),
			_ => self.kind.clone(),
		}
	}
}

/// A weighted connection, referenced by node id.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	/// Source node id.
	pub source: String,
	/// Target node id.
	pub target: String,
	/// Finite signed weight.
	pub weight: f64,
	/// Properties copied from the description.
	pub attributes: Attributes,
}

impl Edge {
	/// An edge without attributes.
	pub fn new(source: impl Into<String>, target: impl Into<String>, weight: f64) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			weight,
			attributes: Attributes::new(),
		}
	}
}

/// Converts a description into nodes and edges, keeping input order.
///
/// Connections whose endpoints are not among the node ids are dropped with a
/// warning.
pub fn to_graph(description: &NetworkDescription) -> (Vec<Node>, Vec<Edge>) {
	let nodes: Vec<Node> = description
		.nodes
		.iter()
		.map(|n| Node {
			id: n.id.clone(),
			kind: n.kind.clone(),
			attributes: n.properties.clone(),
			position: None,
			pinned: false,
		})
		.collect();
	let ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();

	let edges = description
		.connections
		.iter()
		.filter(|c| {
			let ok = ids.contains(c.source.as_str()) && ids.contains(c.target.as_str());
			if !ok {
				warn!(
					"dropping connection {} -> {}: unknown endpoint",
					c.source, c.target
				);
			}
			ok
		})
		.map(|c| Edge {
			source: c.source.clone(),
			target: c.target.clone(),
			weight: if c.weight.is_finite() { c.weight } else { 0.0 },
			attributes: c.properties.clone(),
		})
		.collect();

	(nodes, edges)
}

/// Maps node ids to their slot in `nodes`.
pub fn index_by_id(nodes: &[Node]) -> HashMap<&str, usize> {
	nodes
		.iter()
		.enumerate()
		.map(|(i, n)| (n.id.as_str(), i))
		.collect()
}

/// Edges resolved to slot pairs; unresolved edges are skipped with a warning.
pub fn resolve_edges(nodes: &[Node], edges: &[Edge]) -> Vec<(usize, usize)> {
	let index = index_by_id(nodes);
	edges
		.iter()
		.filter_map(|e| match (index.get(e.source.as_str()), index.get(e.target.as_str())) {
			(Some(&s), Some(&t)) => Some((s, t)),
			_ => {
				warn!("edge {} -> {} does not resolve, skipping", e.source, e.target);
				None
			}
		})
		.collect()
}

/// Shape hints used to suggest a layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StructuralHints {
	/// At least one node has outgoing but no incoming edges.
	pub has_sources: bool,
	/// At least one node has incoming but no outgoing edges.
	pub has_sinks: bool,
}

impl StructuralHints {
	/// Counts in- and out-degrees over the resolvable edges.
	pub fn from_graph(nodes: &[Node], edges: &[Edge]) -> Self {
		let mut incoming = vec![0usize; nodes.len()];
		let mut outgoing = vec![0usize; nodes.len()];
		for (s, t) in resolve_edges(nodes, edges) {
			outgoing[s] += 1;
			incoming[t] += 1;
		}
		let pairs = || incoming.iter().zip(outgoing.iter());
		Self {
			has_sources: pairs().any(|(&i, &o)| i == 0 && o > 0),
			has_sinks: pairs().any(|(&i, &o)| o == 0 && i > 0),
		}
	}

	/// Both pure sources and pure sinks exist.
	pub fn is_layered(&self) -> bool {
		self.has_sources && self.has_sinks
	}
}

/// The engine's authoritative snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	/// Kind of the loaded network.
	pub network_type: NetworkType,
	/// Nodes in description order.
	pub nodes: Vec<Node>,
	/// Edges whose endpoints both exist.
	pub edges: Vec<Edge>,
}

impl Graph {
	/// Converts and validates a description; nothing is positioned yet.
	pub fn from_network(description: &NetworkDescription) -> Self {
		let (nodes, edges) = to_graph(description);
		Self {
			network_type: description.network_type,
			nodes,
			edges,
		}
	}

	/// Looks a node up by id.
	pub fn node(&self, id: &str) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Mutable lookup by id.
	pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	/// Ids adjacent to `id` in either direction, scanning every edge.
	///
	/// O(E) per call; there is no adjacency index.
	pub fn connected_nodes(&self, id: &str) -> HashSet<String> {
		let mut connected = HashSet::new();
		for edge in &self.edges {
			if edge.source == id {
				connected.insert(edge.target.clone());
			} else if edge.target == id {
				connected.insert(edge.source.clone());
			}
		}
		connected
	}

	/// Topmost node within `radius` of the graph-space point.
	pub fn node_at(&self, x: f64, y: f64, radius: f64) -> Option<&Node> {
		self.nodes.iter().rev().find(|n| match n.position {
			Some(p) => ((p.x - x).powi(2) + (p.y - y).powi(2)).sqrt() < radius,
			None => false,
		})
	}

	/// Structural hints of the current edges.
	pub fn hints(&self) -> StructuralHints {
		StructuralHints::from_graph(&self.nodes, &self.edges)
	}

	/// Largest absolute edge weight, or 0 for an edgeless graph.
	pub fn max_weight(&self) -> f64 {
		self.edges.iter().map(|e| e.weight.abs()).fold(0.0, f64::max)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn description() -> NetworkDescription {
		serde_json::from_value(json!({
			"type": "ANN",
			"nodes": [
				{"id": "in", "type": "Input", "properties": {}},
				{"id": "fc1", "type": "Linear", "properties": {"in_features": 784, "out_features": 128}},
				{"id": "out", "type": "Softmax", "properties": {}}
			],
			"connections": [
				{"source": "in", "target": "fc1", "weight": 0.5, "properties": {}},
				{"source": "fc1", "target": "out", "weight": -1.5, "properties": {}},
				{"source": "fc1", "target": "ghost", "weight": 1.0, "properties": {}}
			]
		}))
		.unwrap()
	}

	#[test]
	fn conversion_keeps_order_and_drops_dangling_connections() {
		let (nodes, edges) = to_graph(&description());
		let ids: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["in", "fc1", "out"]);
		assert_eq!(edges.len(), 2);
		assert!(edges.iter().all(|e| e.target != "ghost"));
		assert!(nodes.iter().all(|n| n.position.is_none() && !n.pinned));
	}

	#[test]
	fn metrics_accept_both_custom_metric_spellings() {
		let camel: TrainingMetrics = serde_json::from_value(json!({
			"epoch": 3, "loss": 0.25, "gradients": {"fc1": 0.9}, "activations": {},
			"customMetrics": {"lr": 0.01}
		}))
		.unwrap();
		let snake: TrainingMetrics = serde_json::from_value(json!({
			"epoch": 3, "loss": 0.25, "gradients": {"fc1": 0.9}, "activations": {},
			"custom_metrics": {"lr": 0.01}
		}))
		.unwrap();
		assert_eq!(camel, snake);
		assert_eq!(camel.accuracy, None);
	}

	#[test]
	fn labels_use_layer_shapes() {
		let (nodes, _) = to_graph(&description());
		assert_eq!(nodes[1].label(), "Linear 784→128");
		assert_eq!(nodes[0].label(), "Input");
	}

	#[test]
	fn connected_nodes_scan_both_directions() {
		let graph = Graph::from_network(&description());
		let connected = graph.connected_nodes("fc1");
		assert_eq!(connected.len(), 2);
		assert!(connected.contains("in") && connected.contains("out"));
		assert!(graph.connected_nodes("nobody").is_empty());
	}

	#[test]
	fn hints_detect_layered_structure() {
		let graph = Graph::from_network(&description());
		assert!(graph.hints().is_layered());

		let ring = vec![Node::new("a", "n"), Node::new("b", "n")];
		let edges = vec![Edge::new("a", "b", 1.0), Edge::new("b", "a", 1.0)];
		assert!(!StructuralHints::from_graph(&ring, &edges).is_layered());
	}

	#[test]
	fn node_at_finds_positioned_nodes() {
		let mut graph = Graph::from_network(&description());
		graph.nodes[1].position = Some(Point::new(10.0, 10.0));
		assert_eq!(graph.node_at(12.0, 11.0, 5.0).map(|n| n.id.as_str()), Some("fc1"));
		assert!(graph.node_at(100.0, 100.0, 5.0).is_none());
		assert_eq!(graph.max_weight(), 1.5);
	}
}
