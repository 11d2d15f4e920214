//! Even angular placement on one circle.

use std::f64::consts::TAU;

use super::super::types::{Node, Point};
use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, finite_or, positive_or};

/// Iteration order applied before angles are assigned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortBy {
	/// Input order.
	#[default]
	None,
	/// By node kind, input order within a kind.
	Type,
	/// By node id.
	Id,
}

/// Parameters of the circular layout.
#[derive(Clone, Debug, PartialEq)]
pub struct CircularOptions {
	/// Canvas width.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Defaults to a third of the shorter canvas side.
	pub radius: Option<f64>,
	/// Angle of the first node, in radians.
	pub start_angle: f64,
	/// End of the arc (exclusive), in radians.
	pub end_angle: f64,
	/// Order nodes take around the arc.
	pub sort_by: SortBy,
}

impl CircularOptions {
	/// Defaults for a `width` x `height` canvas.
	pub fn sized(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}

	fn radius(&self, width: f64, height: f64) -> f64 {
		let fallback = width.min(height) / 3.0;
		self.radius.map_or(fallback, |r| positive_or(r, fallback))
	}
}

impl Default for CircularOptions {
	fn default() -> Self {
		Self {
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
			radius: None,
			start_angle: 0.0,
			end_angle: TAU,
			sort_by: SortBy::None,
		}
	}
}

pub(super) fn layout(mut nodes: Vec<Node>, options: &CircularOptions) -> Vec<Node> {
	if nodes.is_empty() {
		return nodes;
	}
	let width = positive_or(options.width, DEFAULT_WIDTH);
	let height = positive_or(options.height, DEFAULT_HEIGHT);
	let radius = options.radius(width, height);
	let start = finite_or(options.start_angle, 0.0);
	let end = finite_or(options.end_angle, start + TAU);
	let step = (end - start) / nodes.len() as f64;
	let (cx, cy) = (width / 2.0, height / 2.0);

	let mut order: Vec<usize> = (0..nodes.len()).collect();
	match options.sort_by {
		SortBy::None => {}
		SortBy::Type => order.sort_by(|&a, &b| nodes[a].kind.cmp(&nodes[b].kind)),
		SortBy::Id => order.sort_by(|&a, &b| nodes[a].id.cmp(&nodes[b].id)),
	}

	for (rank, &i) in order.iter().enumerate() {
		let angle = start + rank as f64 * step;
		nodes[i].position = Some(Point::new(
			cx + radius * angle.cos(),
			cy + radius * angle.sin(),
		));
		nodes[i].pinned = true;
	}
	nodes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn angle_of(p: Point, options: &CircularOptions) -> f64 {
		(p.y - options.height / 2.0).atan2(p.x - options.width / 2.0)
	}

	#[test]
	fn empty_input_stays_empty() {
		assert!(layout(Vec::new(), &CircularOptions::default()).is_empty());
	}

	#[test]
	fn first_node_sits_at_start_angle() {
		let options = CircularOptions {
			radius: Some(100.0),
			start_angle: 0.5,
			end_angle: 2.5,
			..CircularOptions::sized(400.0, 400.0)
		};
		let nodes = (0..4).map(|i| Node::new(format!("n{i}"), "LIF")).collect();
		let laid = layout(nodes, &options);
		let angles: Vec<f64> = laid.iter().map(|n| angle_of(n.position.unwrap(), &options)).collect();

		assert!((angles[0] - 0.5).abs() < 1e-9);
		for pair in angles.windows(2) {
			assert!((pair[1] - pair[0] - 0.5).abs() < 1e-9);
		}
		let p = laid[0].position.unwrap();
		assert!(((p.x - 200.0).hypot(p.y - 200.0) - 100.0).abs() < 1e-9);
	}

	#[test]
	fn sorting_happens_before_placement() {
		let nodes = vec![
			Node::new("c", "Linear"),
			Node::new("a", "ReLU"),
			Node::new("b", "Conv2d"),
		];
		let options = CircularOptions {
			sort_by: SortBy::Id,
			..CircularOptions::sized(300.0, 300.0)
		};
		let laid = layout(nodes, &options);
		// output keeps input order, angles follow id order
		assert_eq!(laid[0].id, "c");
		let step = TAU / 3.0;
		let expected = [2.0 * step, 0.0, step];
		for (node, angle) in laid.iter().zip(expected) {
			let p = node.position.unwrap();
			let want = Point::new(150.0 + 100.0 * angle.cos(), 150.0 + 100.0 * angle.sin());
			assert!((p.x - want.x).abs() < 1e-9 && (p.y - want.y).abs() < 1e-9);
		}
	}

	#[test]
	fn malformed_radius_falls_back() {
		let options = CircularOptions {
			radius: Some(f64::NAN),
			..CircularOptions::sized(300.0, 600.0)
		};
		let laid = layout(vec![Node::new("only", "LIF")], &options);
		assert_eq!(laid[0].position, Some(Point::new(250.0, 300.0)));
	}
}
