//! Level-by-level placement by distance from the graph's roots.

use std::collections::VecDeque;

use super::super::types::{Edge, Node, Point, resolve_edges};
use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, finite_or, positive_or};

/// Which axis levels advance along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
	/// Levels flow top to bottom.
	#[default]
	Vertical,
	/// Levels flow left to right.
	Horizontal,
}

/// Parameters of the hierarchical layout.
#[derive(Clone, Debug, PartialEq)]
pub struct HierarchicalOptions {
	/// Canvas width.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Distance between consecutive levels along the primary axis.
	pub level_spacing: f64,
	/// Offset of level 0 from the canvas edge.
	pub padding: f64,
	/// Axis the levels advance along.
	pub orientation: Orientation,
}

impl HierarchicalOptions {
	/// Defaults for a `width` x `height` canvas.
	pub fn sized(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}
}

impl Default for HierarchicalOptions {
	fn default() -> Self {
		Self {
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
			level_spacing: 120.0,
			padding: 50.0,
			orientation: Orientation::Vertical,
		}
	}
}

/// Breadth-first depth of every node from the set of roots.
///
/// Roots are nodes without incoming edges. All roots start at level 0 and a
/// node keeps the level of its first visit, which is its shortest distance
/// from any root. Nodes never reached (including every node of a graph with
/// no root at all) stay at level 0.
pub fn levels(nodes: &[Node], edges: &[Edge]) -> Vec<usize> {
	let resolved = resolve_edges(nodes, edges);
	let mut incoming = vec![0usize; nodes.len()];
	let mut children = vec![Vec::new(); nodes.len()];
	for &(s, t) in &resolved {
		incoming[t] += 1;
		children[s].push(t);
	}

	let mut level = vec![0usize; nodes.len()];
	let mut visited = vec![false; nodes.len()];
	let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| incoming[i] == 0).collect();
	for &root in &queue {
		visited[root] = true;
	}

	while let Some(current) = queue.pop_front() {
		for &child in &children[current] {
			if !visited[child] {
				visited[child] = true;
				level[child] = level[current] + 1;
				queue.push_back(child);
			}
		}
	}
	level
}

pub(super) fn layout(mut nodes: Vec<Node>, edges: &[Edge], options: &HierarchicalOptions) -> Vec<Node> {
	let level = levels(&nodes, edges);
	let depth = level.iter().copied().max().map_or(0, |m| m + 1);

	let width = positive_or(options.width, DEFAULT_WIDTH);
	let height = positive_or(options.height, DEFAULT_HEIGHT);
	let spacing = positive_or(options.level_spacing, 120.0);
	let padding = finite_or(options.padding, 50.0).max(0.0);

	let mut members: Vec<Vec<usize>> = vec![Vec::new(); depth];
	for (i, &l) in level.iter().enumerate() {
		members[l].push(i);
	}

	let across = match options.orientation {
		Orientation::Vertical => width,
		Orientation::Horizontal => height,
	};
	for (l, band) in members.iter().enumerate() {
		let primary = padding + l as f64 * spacing;
		let step = across / (band.len() + 1) as f64;
		for (slot, &i) in band.iter().enumerate() {
			let secondary = step * (slot + 1) as f64;
			let (x, y) = match options.orientation {
				Orientation::Vertical => (secondary, primary),
				Orientation::Horizontal => (primary, secondary),
			};
			nodes[i].position = Some(Point::new(x, y));
			nodes[i].pinned = true;
		}
	}
	nodes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph(ids: &[&str], links: &[(&str, &str)]) -> (Vec<Node>, Vec<Edge>) {
		(
			ids.iter().map(|id| Node::new(*id, "Linear")).collect(),
			links.iter().map(|(s, t)| Edge::new(*s, *t, 1.0)).collect(),
		)
	}

	#[test]
	fn shortest_path_wins_on_diamonds() {
		// a -> b -> c -> d and a shortcut a -> d
		let (nodes, edges) = graph(
			&["a", "b", "c", "d"],
			&[("a", "b"), ("b", "c"), ("c", "d"), ("a", "d")],
		);
		assert_eq!(levels(&nodes, &edges), [0, 1, 2, 1]);
	}

	#[test]
	fn multiple_roots_start_together() {
		let (nodes, edges) = graph(&["x", "a", "y", "b"], &[("x", "y"), ("a", "b"), ("y", "b")]);
		assert_eq!(levels(&nodes, &edges), [0, 0, 1, 1]);
	}

	#[test]
	fn cycles_without_roots_collapse_to_level_zero() {
		let (nodes, edges) = graph(&["a", "b", "c"], &[("a", "b"), ("b", "c"), ("c", "a")]);
		assert_eq!(levels(&nodes, &edges), [0, 0, 0]);

		let laid = layout(nodes, &edges, &HierarchicalOptions::default());
		let ys: Vec<f64> = laid.iter().map(|n| n.position.unwrap().y).collect();
		assert!(ys.iter().all(|&y| y == 50.0));
	}

	#[test]
	fn dangling_edges_do_not_block_roots() {
		let (nodes, edges) = graph(&["a", "b"], &[("ghost", "a"), ("a", "b")]);
		assert_eq!(levels(&nodes, &edges), [0, 1]);
	}

	#[test]
	fn bands_are_evenly_spread_in_input_order() {
		let (nodes, edges) = graph(&["r", "a", "b", "c"], &[("r", "a"), ("r", "b"), ("r", "c")]);
		let options = HierarchicalOptions::sized(400.0, 300.0);
		let laid = layout(nodes, &edges, &options);
		let p: Vec<Point> = laid.iter().map(|n| n.position.unwrap()).collect();
		assert_eq!(p[0], Point::new(200.0, 50.0));
		assert_eq!(p[1], Point::new(100.0, 170.0));
		assert_eq!(p[2], Point::new(200.0, 170.0));
		assert_eq!(p[3], Point::new(300.0, 170.0));
		assert!(laid.iter().all(|n| n.pinned));
	}

	#[test]
	fn horizontal_swaps_axes() {
		let (nodes, edges) = graph(&["r", "a"], &[("r", "a")]);
		let options = HierarchicalOptions {
			orientation: Orientation::Horizontal,
			..HierarchicalOptions::sized(400.0, 300.0)
		};
		let laid = layout(nodes, &edges, &options);
		assert_eq!(laid[0].position, Some(Point::new(50.0, 150.0)));
		assert_eq!(laid[1].position, Some(Point::new(170.0, 150.0)));
	}
}
