//! Force-directed placement on top of `force_graph`.
//!
//! `force_graph` integrates charge repulsion between every pair of nodes.
//! Springs toward a rest length, the pull toward the canvas centre and the
//! canvas bounds are applied on each tick after its update, all scaled by
//! alpha, which decays geometrically from 1 until it drops below
//! `alpha_min`.

use std::f64::consts::PI;

use force_graph::{ForceGraph, NodeData, SimulationParameters};
use log::debug;

use super::super::types::{Edge, Node, Point, resolve_edges};
use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, finite_or, positive_or};

const NODE_MASS: f32 = 10.0;
const FRAME_DT: f32 = 0.016;
/// `force_graph` charge per unit of (negated) charge strength.
const CHARGE_SCALE: f64 = 5.0;
const ALPHA_DRAG_TARGET: f64 = 0.3;

/// Parameters of the force-directed layout.
#[derive(Clone, Debug, PartialEq)]
pub struct ForceOptions {
	/// Canvas width.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Negative values repel.
	pub charge_strength: f64,
	/// Rest length of an edge.
	pub link_distance: f64,
	/// Step budget of a synchronous run.
	pub iterations: usize,
	/// The simulation stops once alpha falls below this.
	pub alpha_min: f64,
	/// Keeps nodes this far from the canvas edges.
	pub margin: f64,
}

impl ForceOptions {
	/// Defaults for a `width` x `height` canvas.
	pub fn sized(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}
}

impl Default for ForceOptions {
	fn default() -> Self {
		Self {
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
			charge_strength: -30.0,
			link_distance: 100.0,
			iterations: 300,
			alpha_min: 0.001,
			margin: 20.0,
		}
	}
}

/// A live simulation over one graph snapshot.
///
/// Built fresh whenever force layout becomes active and dropped when it is
/// replaced; slots follow the order of the nodes it was built from.
pub struct ForceSimulation {
	graph: ForceGraph<usize, ()>,
	ids: Vec<String>,
	links: Vec<(usize, usize)>,
	degree: Vec<usize>,
	width: f64,
	height: f64,
	link_distance: f64,
	margin: f64,
	iterations: usize,
	max_iterations: usize,
	alpha: f64,
	alpha_min: f64,
	alpha_target: f64,
	alpha_decay: f64,
	ticks: usize,
}

impl ForceSimulation {
	/// Seeds a simulation from `nodes`, releasing any pinned coordinates.
	///
	/// Nodes that already have a position start from it, the rest are placed
	/// on a phyllotaxis spiral around the canvas centre.
	pub fn new(nodes: &[Node], edges: &[Edge], options: &ForceOptions) -> Self {
		let width = positive_or(options.width, DEFAULT_WIDTH);
		let height = positive_or(options.height, DEFAULT_HEIGHT);
		let charge = -finite_or(options.charge_strength, -30.0) * CHARGE_SCALE;
		let alpha_min = positive_or(options.alpha_min, 0.001).min(1.0);
		let max_iterations = if options.iterations == 0 { 300 } else { options.iterations };

		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: charge as f32,
			force_spring: 0.0,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		});
		let golden = PI * (3.0 - 5f64.sqrt());
		let mut seeds: Vec<Point> = Vec::with_capacity(nodes.len());
		for (slot, node) in nodes.iter().enumerate() {
			let (r, a) = (10.0 * (0.5 + slot as f64).sqrt(), slot as f64 * golden);
			let offset = Point::new(r * a.cos(), r * a.sin());
			let mut seed = node
				.position
				.filter(Point::is_finite)
				.unwrap_or(Point::new(width / 2.0 + offset.x, height / 2.0 + offset.y));
			// coincident nodes would see an undefined repulsion
			if seeds.contains(&seed) {
				seed.x += offset.x;
				seed.y += offset.y;
			}
			seeds.push(seed);
			graph.add_node(NodeData {
				x: seed.x as f32,
				y: seed.y as f32,
				mass: NODE_MASS,
				is_anchor: false,
				user_data: slot,
			});
		}

		let links: Vec<(usize, usize)> = resolve_edges(nodes, edges)
			.into_iter()
			.filter(|(s, t)| s != t)
			.collect();
		let mut degree = vec![0usize; nodes.len()];
		for &(s, t) in &links {
			degree[s] += 1;
			degree[t] += 1;
		}
		debug!(
			"force simulation seeded with {} nodes and {} links",
			nodes.len(),
			links.len()
		);

		Self {
			graph,
			ids: nodes.iter().map(|n| n.id.clone()).collect(),
			links,
			degree,
			width,
			height,
			link_distance: positive_or(options.link_distance, 100.0),
			margin: finite_or(options.margin, 20.0).clamp(0.0, width.min(height) / 2.0),
			iterations: 0,
			max_iterations,
			alpha: 1.0,
			alpha_min,
			alpha_target: 0.0,
			alpha_decay: 1.0 - alpha_min.powf(1.0 / max_iterations as f64),
			ticks: 0,
		}
	}

	/// Current energy, from 1 down towards 0.
	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	/// Ticks taken since the simulation was built.
	pub fn ticks(&self) -> usize {
		self.ticks
	}

	/// Whether another tick would still move nodes.
	pub fn is_hot(&self) -> bool {
		!self.ids.is_empty() && self.alpha >= self.alpha_min
	}

	/// One integration step. Returns whether the simulation is still hot.
	pub fn tick(&mut self) -> bool {
		if self.ids.is_empty() {
			return false;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.alpha_decay;
		self.graph.update(FRAME_DT * self.alpha as f32);

		let (mut pos, anchored) = self.read();
		self.apply_links(&mut pos, &anchored);
		self.apply_center(&mut pos, &anchored);
		self.apply_bounds(&mut pos, &anchored);
		self.graph.visit_nodes_mut(|node| {
			let p = pos[node.data.user_data];
			node.data.x = p.x as f32;
			node.data.y = p.y as f32;
		});

		self.ticks += 1;
		self.is_hot()
	}

	/// Ticks until cold or until the step budget is spent. Returns the number
	/// of steps taken.
	pub fn run(&mut self) -> usize {
		let mut steps = 0;
		while self.iterations < self.max_iterations && self.is_hot() {
			self.tick();
			self.iterations += 1;
			steps += 1;
		}
		steps
	}

	/// Current positions by slot.
	pub fn positions(&self) -> Vec<Point> {
		self.read().0
	}

	/// Copies positions into `nodes`, matching by id.
	pub fn write_into(&self, nodes: &mut [Node]) {
		let pos = self.positions();
		for node in nodes.iter_mut() {
			if let Some(slot) = self.slot(&node.id) {
				node.position = Some(pos[slot]);
				node.pinned = false;
			}
		}
	}

	/// Fixes a node under the pointer and reheats the simulation.
	pub fn anchor(&mut self, id: &str, at: Point) -> bool {
		let Some(slot) = self.slot(id) else {
			return false;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.data.user_data == slot {
				node.data.x = at.x as f32;
				node.data.y = at.y as f32;
				node.data.is_anchor = true;
			}
		});
		self.alpha_target = ALPHA_DRAG_TARGET;
		self.alpha = self.alpha.max(ALPHA_DRAG_TARGET);
		true
	}

	/// Lets a dragged node move again; the simulation cools from here.
	pub fn release(&mut self, id: &str) -> bool {
		let Some(slot) = self.slot(id) else {
			return false;
		};
		self.graph.visit_nodes_mut(|node| {
			if node.data.user_data == slot {
				node.data.is_anchor = false;
			}
		});
		self.alpha_target = 0.0;
		true
	}

	fn slot(&self, id: &str) -> Option<usize> {
		self.ids.iter().position(|i| i == id)
	}

	fn read(&self) -> (Vec<Point>, Vec<bool>) {
		let mut pos = vec![Point::default(); self.ids.len()];
		let mut anchored = vec![false; self.ids.len()];
		self.graph.visit_nodes(|node| {
			let slot = node.data.user_data;
			pos[slot] = Point::new(node.x() as f64, node.y() as f64);
			anchored[slot] = node.data.is_anchor;
		});
		(pos, anchored)
	}

	fn apply_links(&self, pos: &mut [Point], anchored: &[bool]) {
		for &(s, t) in &self.links {
			let (dx, dy) = (pos[t].x - pos[s].x, pos[t].y - pos[s].y);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 1e-6 {
				continue;
			}
			let (ds, dt) = (self.degree[s] as f64, self.degree[t] as f64);
			let strength = 1.0 / ds.min(dt);
			let k = (dist - self.link_distance) / dist * self.alpha * strength;
			let (fx, fy) = (dx * k, dy * k);
			let bias = ds / (ds + dt);
			if !anchored[t] {
				pos[t].x -= fx * bias;
				pos[t].y -= fy * bias;
			}
			if !anchored[s] {
				pos[s].x += fx * (1.0 - bias);
				pos[s].y += fy * (1.0 - bias);
			}
		}
	}

	fn apply_center(&self, pos: &mut [Point], anchored: &[bool]) {
		let free: Vec<usize> = (0..pos.len()).filter(|&i| !anchored[i]).collect();
		if free.is_empty() {
			return;
		}
		let n = free.len() as f64;
		let (sx, sy) = free
			.iter()
			.fold((0.0, 0.0), |(x, y), &i| (x + pos[i].x, y + pos[i].y));
		let (shift_x, shift_y) = (self.width / 2.0 - sx / n, self.height / 2.0 - sy / n);
		if !(shift_x.is_finite() && shift_y.is_finite()) {
			return;
		}
		for &i in &free {
			pos[i].x += shift_x;
			pos[i].y += shift_y;
		}
	}

	fn apply_bounds(&self, pos: &mut [Point], anchored: &[bool]) {
		let (cx, cy) = (self.width / 2.0, self.height / 2.0);
		for (p, &fixed) in pos.iter_mut().zip(anchored) {
			if fixed {
				continue;
			}
			if !p.is_finite() {
				*p = Point::new(cx, cy);
			}
			p.x = p.x.clamp(self.margin, self.width - self.margin);
			p.y = p.y.clamp(self.margin, self.height - self.margin);
		}
	}
}

/// Bounded synchronous run; nodes come back positioned and unpinned.
pub(super) fn layout(mut nodes: Vec<Node>, edges: &[Edge], options: &ForceOptions) -> Vec<Node> {
	let mut simulation = ForceSimulation::new(&nodes, edges, options);
	let steps = simulation.run();
	debug!("force layout settled after {} steps (alpha {:.4})", steps, simulation.alpha());
	simulation.write_into(&mut nodes);
	nodes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn complete(n: usize) -> (Vec<Node>, Vec<Edge>) {
		let nodes: Vec<Node> = (0..n).map(|i| Node::new(format!("n{i}"), "Linear")).collect();
		let mut edges = Vec::new();
		for i in 0..n {
			for j in (i + 1)..n {
				edges.push(Edge::new(format!("n{i}"), format!("n{j}"), 1.0));
			}
		}
		(nodes, edges)
	}

	#[test]
	fn empty_graph_runs_no_steps() {
		let mut simulation = ForceSimulation::new(&[], &[], &ForceOptions::default());
		assert!(!simulation.is_hot());
		assert_eq!(simulation.run(), 0);
		assert!(layout(Vec::new(), &[], &ForceOptions::default()).is_empty());
	}

	#[test]
	fn alpha_never_increases_and_run_is_bounded() {
		let (nodes, edges) = complete(5);
		let options = ForceOptions::sized(400.0, 400.0);
		let mut simulation = ForceSimulation::new(&nodes, &edges, &options);
		let mut last = simulation.alpha();
		while simulation.ticks() < 400 && simulation.tick() {
			assert!(simulation.alpha() <= last);
			last = simulation.alpha();
		}
		assert!(simulation.ticks() <= 301);

		let mut bounded = ForceSimulation::new(&nodes, &edges, &options);
		assert!(bounded.run() <= 300);
		assert!(!bounded.is_hot() || bounded.ticks() == 300);
	}

	#[test]
	fn fully_connected_graph_settles_inside_canvas() {
		let (nodes, edges) = complete(6);
		let options = ForceOptions::sized(400.0, 300.0);
		let laid = layout(nodes, &edges, &options);
		for node in &laid {
			let p = node.position.unwrap();
			assert!(p.is_finite());
			assert!((0.0..=400.0).contains(&p.x) && (0.0..=300.0).contains(&p.y));
			assert!(!node.pinned);
		}
	}

	#[test]
	fn pathological_graphs_terminate() {
		let mut nodes: Vec<Node> = (0..4).map(|i| Node::new(format!("n{i}"), "LIF")).collect();
		nodes[0].position = Some(Point::new(100.0, 100.0));
		nodes[1].position = Some(Point::new(100.0, 100.0));
		let edges = vec![
			Edge::new("n0", "n0", 1.0),
			Edge::new("n2", "n3", 1.0),
			Edge::new("n3", "ghost", 1.0),
		];
		let laid = layout(nodes, &edges, &ForceOptions::default());
		assert!(laid.iter().all(|n| n.position.is_some_and(|p| p.is_finite())));
	}

	#[test]
	fn pinned_nodes_are_released() {
		let mut nodes: Vec<Node> = (0..3).map(|i| Node::new(format!("n{i}"), "Linear")).collect();
		for (i, node) in nodes.iter_mut().enumerate() {
			node.position = Some(Point::new(100.0 + 50.0 * i as f64, 200.0));
			node.pinned = true;
		}
		let laid = layout(nodes, &[], &ForceOptions::default());
		assert!(laid.iter().all(|n| !n.pinned));
	}

	#[test]
	fn anchored_node_holds_its_position() {
		let (nodes, edges) = complete(3);
		let mut simulation = ForceSimulation::new(&nodes, &edges, &ForceOptions::default());
		assert!(simulation.anchor("n1", Point::new(40.0, 50.0)));
		assert!(!simulation.anchor("missing", Point::default()));
		for _ in 0..20 {
			simulation.tick();
		}
		assert_eq!(simulation.positions()[1], Point::new(40.0, 50.0));
		assert!(simulation.alpha() >= ALPHA_DRAG_TARGET - 1e-9);
		assert!(simulation.release("n1"));
	}
}
