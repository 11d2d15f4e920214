//! The engine facade: owns the graph snapshot and turns external events into
//! re-layouts, animation frames and redraws.
//!
//! Everything runs on one logical thread. The only suspension point is the
//! frame loop: the engine asks its [`FrameScheduler`] for a tick while a
//! simulation is hot or a highlight is lit, and the host calls
//! [`GraphEngine::on_frame`] when the tick fires. At most one tick is ever
//! outstanding.

use std::collections::HashSet;

use log::{debug, info, warn};

use super::animation::{AnimationState, HighlightTarget, OverlayChannel};
use super::config::{ConfigUpdate, GraphConfig, LayoutSettings};
use super::layout::{ForceSimulation, LayoutKind, LayoutOptions, apply_layout, suggest_layout};
use super::types::{Graph, NetworkDescription, Point, TrainingMetrics, index_by_id};

/// Draws a frame. Called after every layout application and animation tick;
/// must be idempotent for the same frame.
pub trait RenderSurface {
	/// Paints `frame`, replacing whatever was drawn before.
	fn draw(&mut self, frame: &RenderFrame);
}

/// Requests a single future call to [`GraphEngine::on_frame`].
pub trait FrameScheduler {
	/// Schedules one call to [`GraphEngine::on_frame`].
	fn request_tick(&mut self);
	/// Drops a scheduled call, if any.
	fn cancel(&mut self);
}

/// Output channel of the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
	/// A new network replaced the snapshot.
	NetworkLoaded {
		/// Nodes kept.
		nodes: usize,
		/// Edges kept after dropping dangling ones.
		edges: usize,
		/// Strategy recommended for this network.
		suggested: LayoutKind,
	},
	/// A strategy was applied.
	LayoutChanged(LayoutKind),
	/// A node was clicked.
	NodeClicked(String),
	/// The hovered node changed; `None` when the pointer left all nodes.
	NodeHovered(Option<String>),
	/// A node was right-clicked.
	NodeContextMenu(String),
	/// A training event was applied.
	MetricsApplied {
		/// Epoch of the event.
		epoch: u32,
		/// Loss of the event.
		loss: f64,
		/// Accuracy of the event, when reported.
		accuracy: Option<f64>,
	},
}

/// A node ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeView {
	/// Node id.
	pub id: String,
	/// Text drawn beside the node.
	pub label: String,
	/// Centre in graph space.
	pub position: Point,
	/// Radius, enlarged while hovered or connected.
	pub radius: f64,
	/// Fill colour.
	pub fill: String,
	/// 1 normally, lower when another node is hovered.
	pub alpha: f64,
	/// Under the pointer.
	pub hovered: bool,
	/// Adjacent to the hovered node.
	pub connected: bool,
	/// Placed by a static strategy.
	pub pinned: bool,
	/// Colour and remaining intensity of an active highlight.
	pub highlight: Option<(String, f64)>,
	/// Activation normalised by the channel peak, in `[-1, 1]`.
	pub activation: Option<f64>,
	/// Gradient magnitude normalised by the channel peak, in `[0, 1]`.
	pub gradient: Option<f64>,
}

/// An edge ready to draw.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkView {
	/// Source node centre.
	pub source: Point,
	/// Target node centre.
	pub target: Point,
	/// Signed weight; negative links are dashed.
	pub weight: f64,
	/// Stroke width.
	pub width: f64,
	/// Stroke opacity.
	pub alpha: f64,
	/// Colour and remaining intensity of an active highlight.
	pub highlight: Option<(String, f64)>,
}

/// Everything a surface needs to paint one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderFrame {
	/// Nodes in graph order.
	pub nodes: Vec<NodeView>,
	/// One entry per resolvable edge.
	pub links: Vec<LinkView>,
	/// Canvas width.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Base node radius.
	pub node_radius: f64,
	/// Draw arrow heads.
	pub directed: bool,
	/// Draw node labels.
	pub show_labels: bool,
	/// Draw edge weights.
	pub show_weights: bool,
	/// Canvas fill.
	pub background: String,
	/// Edge `"r, g, b"` triple.
	pub edge_color: String,
	/// Label `"r, g, b"` triple.
	pub label_color: String,
	/// Activation `"r, g, b"` triple.
	pub activation_color: String,
	/// Gradient ring colour.
	pub gradient_color: String,
	/// Timestamp the frame was built for.
	pub time: f64,
}

#[derive(Clone, Debug, Default)]
struct HoverState {
	node: Option<String>,
	connected: HashSet<String>,
}

/// Receives every [`EngineEvent`] in emission order.
pub type Listener = Box<dyn FnMut(&EngineEvent)>;

/// Owns one graph view: snapshot, layout state, highlights and the frame
/// loop. Drawing and tick scheduling are delegated to `R` and `S`.
pub struct GraphEngine<R, S> {
	config: GraphConfig,
	layouts: LayoutSettings,
	active: LayoutKind,
	graph: Graph,
	kinds: Vec<String>,
	simulation: Option<ForceSimulation>,
	animation: AnimationState,
	hover: HoverState,
	surface: R,
	scheduler: S,
	listeners: Vec<Listener>,
	frame_pending: bool,
	destroyed: bool,
}

impl<R: RenderSurface, S: FrameScheduler> GraphEngine<R, S> {
	/// An empty engine with force layout active.
	pub fn new(config: GraphConfig, surface: R, scheduler: S) -> Self {
		let layouts = LayoutSettings::sized(config.width, config.height);
		Self {
			config,
			layouts,
			active: LayoutKind::default(),
			graph: Graph::default(),
			kinds: Vec::new(),
			simulation: None,
			animation: AnimationState::new(),
			hover: HoverState::default(),
			surface,
			scheduler,
			listeners: Vec::new(),
			frame_pending: false,
			destroyed: false,
		}
	}

	/// Adds an event listener.
	pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) {
		if self.destroyed {
			return;
		}
		self.listeners.push(Box::new(listener));
	}

	/// Replaces the snapshot wholesale and lays it out with the active
	/// strategy. Overlays, highlights and hover state are dropped.
	pub fn set_network(&mut self, description: &NetworkDescription, now: f64) {
		if self.destroyed {
			return;
		}
		self.graph = Graph::from_network(description);
		self.kinds.clear();
		for node in &self.graph.nodes {
			if !self.kinds.contains(&node.kind) {
				self.kinds.push(node.kind.clone());
			}
		}
		self.animation.reset();
		self.hover = HoverState::default();
		info!(
			"loaded {:?} network: {} nodes, {} edges",
			self.graph.network_type,
			self.graph.nodes.len(),
			self.graph.edges.len()
		);
		self.relayout(now);
		let event = EngineEvent::NetworkLoaded {
			nodes: self.graph.nodes.len(),
			edges: self.graph.edges.len(),
			suggested: self.suggested_layout(),
		};
		self.emit(event);
	}

	/// Switches strategy. The running simulation, if any, is stopped before
	/// the new positions are computed and published.
	pub fn set_layout(&mut self, options: LayoutOptions, now: f64) {
		if self.destroyed {
			return;
		}
		let kind = options.kind();
		self.layouts.store(options);
		self.active = kind;
		self.relayout(now);
		self.emit(EngineEvent::LayoutChanged(kind));
	}

	/// Switches strategy keeping its stored parameters.
	pub fn set_layout_kind(&mut self, kind: LayoutKind, now: f64) {
		let options = self.layouts.options(kind);
		self.set_layout(options, now);
	}

	/// Strategy recommended for the loaded network.
	pub fn suggested_layout(&self) -> LayoutKind {
		suggest_layout(self.graph.network_type, self.graph.hints())
	}

	/// Applies one option. Layout-affecting options re-lay out the graph,
	/// the rest only redraw it.
	pub fn update_config(&mut self, update: ConfigUpdate, now: f64) {
		if self.destroyed {
			return;
		}
		let relayout = update.is_layout_affecting(self.active);
		self.config.apply(update, &mut self.layouts);
		if relayout {
			self.relayout(now);
		} else {
			self.redraw(now);
		}
	}

	/// Consumes one training event: overlays are updated and gradients at or
	/// above the threshold flash their node and its incoming connections.
	pub fn apply_metrics(&mut self, metrics: &TrainingMetrics, now: f64) {
		if self.destroyed {
			return;
		}
		self.animation
			.update_overlays(OverlayChannel::Activation, &metrics.activations);
		self.animation
			.update_overlays(OverlayChannel::Gradient, &metrics.gradients);

		let color = self.config.palette.gradient.clone();
		let duration = self.config.highlight_ms;
		for (id, gradient) in &metrics.gradients {
			if !gradient.is_finite()
				|| gradient.abs() < self.config.gradient_threshold
				|| self.graph.node(id).is_none()
			{
				continue;
			}
			self.animation
				.highlight(HighlightTarget::Node(id.clone()), &color, duration, now);
			for edge in self.graph.edges.iter().filter(|e| &e.target == id) {
				let target = HighlightTarget::connection(edge.source.clone(), edge.target.clone());
				self.animation.highlight(target, &color, duration, now);
			}
		}
		if self.animation.has_active(now) {
			self.ensure_loop();
		}
		self.redraw(now);
		self.emit(EngineEvent::MetricsApplied {
			epoch: metrics.epoch,
			loss: metrics.loss,
			accuracy: metrics.accuracy,
		});
	}

	/// Lights a node for `duration_ms` (configured default when `None`).
	/// Returns false for unknown ids.
	pub fn highlight_node(
		&mut self,
		id: &str,
		color: Option<&str>,
		duration_ms: Option<f64>,
		now: f64,
	) -> bool {
		if self.destroyed || self.graph.node(id).is_none() {
			return false;
		}
		self.highlight(HighlightTarget::Node(id.to_string()), color, duration_ms, now);
		true
	}

	/// Lights a connection. Returns false when no such edge exists.
	pub fn highlight_connection(
		&mut self,
		source: &str,
		target: &str,
		color: Option<&str>,
		duration_ms: Option<f64>,
		now: f64,
	) -> bool {
		if self.destroyed
			|| !self
				.graph
				.edges
				.iter()
				.any(|e| e.source == source && e.target == target)
		{
			return false;
		}
		self.highlight(HighlightTarget::connection(source, target), color, duration_ms, now);
		true
	}

	/// Turns every highlight off at once.
	pub fn clear_highlights(&mut self, now: f64) {
		if self.destroyed {
			return;
		}
		self.animation.clear_highlights();
		self.redraw(now);
	}

	/// Drops activation and gradient overlays.
	pub fn clear_overlays(&mut self, now: f64) {
		if self.destroyed {
			return;
		}
		self.animation.clear_overlays();
		self.redraw(now);
	}

	/// Hovering a node lights it and its neighbours; `None` clears.
	pub fn hover(&mut self, id: Option<&str>, now: f64) {
		if self.destroyed {
			return;
		}
		let id = id.filter(|id| self.graph.node(id).is_some());
		if self.hover.node.as_deref() == id {
			return;
		}
		self.hover = match id {
			Some(id) => HoverState {
				node: Some(id.to_string()),
				connected: self.graph.connected_nodes(id),
			},
			None => HoverState::default(),
		};
		self.redraw(now);
		self.emit(EngineEvent::NodeHovered(id.map(str::to_string)));
	}

	/// Reports a click on a known node.
	pub fn click(&mut self, id: &str) {
		if self.destroyed || self.graph.node(id).is_none() {
			return;
		}
		self.emit(EngineEvent::NodeClicked(id.to_string()));
	}

	/// Reports a right-click on a known node.
	pub fn context_menu(&mut self, id: &str) {
		if self.destroyed || self.graph.node(id).is_none() {
			return;
		}
		self.emit(EngineEvent::NodeContextMenu(id.to_string()));
	}

	/// Moves a node under the pointer. With the live simulation the node is
	/// anchored and the simulation reheated; otherwise the pinned coordinate
	/// moves.
	pub fn drag_node(&mut self, id: &str, to: Point, now: f64) {
		if self.destroyed || !to.is_finite() {
			return;
		}
		let Some(node) = self.graph.node_mut(id) else {
			return;
		};
		node.position = Some(to);
		if let Some(simulation) = self.simulation.as_mut() {
			simulation.anchor(id, to);
			self.ensure_loop();
		}
		self.redraw(now);
	}

	/// Ends a drag; the simulation may move the node again.
	pub fn release_node(&mut self, id: &str) {
		if self.destroyed {
			return;
		}
		if let Some(simulation) = self.simulation.as_mut() {
			simulation.release(id);
		}
	}

	/// One animation frame: advance the simulation, expire highlights, draw,
	/// and ask for another frame only while something is still moving.
	pub fn on_frame(&mut self, now: f64) {
		self.frame_pending = false;
		if self.destroyed {
			return;
		}
		let hot = match self.simulation.as_mut() {
			Some(simulation) if simulation.is_hot() => {
				let hot = simulation.tick();
				simulation.write_into(&mut self.graph.nodes);
				hot
			}
			_ => false,
		};
		let lit = self.animation.prune(now);
		self.redraw(now);
		if hot || lit {
			self.ensure_loop();
		} else {
			debug!("animation loop idle");
		}
	}

	/// Builds a frame for `now` and hands it to the surface.
	pub fn redraw(&mut self, now: f64) {
		if self.destroyed {
			return;
		}
		let frame = self.frame(now);
		self.surface.draw(&frame);
	}

	/// Stops the simulation and the frame loop; every later call is a no-op.
	pub fn destroy(&mut self) {
		if self.destroyed {
			return;
		}
		self.scheduler.cancel();
		self.frame_pending = false;
		self.simulation = None;
		self.animation.reset();
		self.listeners.clear();
		self.destroyed = true;
		info!("graph engine destroyed");
	}

	/// The current snapshot.
	pub fn graph(&self) -> &Graph {
		&self.graph
	}

	/// The current display options.
	pub fn config(&self) -> &GraphConfig {
		&self.config
	}

	/// The active strategy.
	pub fn layout_kind(&self) -> LayoutKind {
		self.active
	}

	/// Highlight and overlay state.
	pub fn animation(&self) -> &AnimationState {
		&self.animation
	}

	/// Alpha of the live simulation, if force layout is active.
	pub fn simulation_alpha(&self) -> Option<f64> {
		self.simulation.as_ref().map(ForceSimulation::alpha)
	}

	/// Whether a frame has been requested and not yet delivered.
	pub fn is_animating(&self) -> bool {
		self.frame_pending
	}

	/// Whether [`GraphEngine::destroy`] has run.
	pub fn is_destroyed(&self) -> bool {
		self.destroyed
	}

	/// The render surface.
	pub fn surface(&self) -> &R {
		&self.surface
	}

	/// The render surface, e.g. to change its view transform.
	pub fn surface_mut(&mut self) -> &mut R {
		&mut self.surface
	}

	fn highlight(
		&mut self,
		target: HighlightTarget,
		color: Option<&str>,
		duration_ms: Option<f64>,
		now: f64,
	) {
		let color = color.unwrap_or(self.config.palette.highlight.as_str()).to_string();
		let duration = duration_ms.unwrap_or(self.config.highlight_ms);
		self.animation.highlight(target, &color, duration, now);
		self.ensure_loop();
		self.redraw(now);
	}

	fn relayout(&mut self, now: f64) {
		// The old simulation must be gone before anything new is published.
		self.simulation = None;
		match self.active {
			LayoutKind::Force => {
				for node in &mut self.graph.nodes {
					node.pinned = false;
				}
				let simulation =
					ForceSimulation::new(&self.graph.nodes, &self.graph.edges, &self.layouts.force);
				simulation.write_into(&mut self.graph.nodes);
				if simulation.is_hot() {
					self.ensure_loop();
				}
				self.simulation = Some(simulation);
			}
			kind => {
				let options = self.layouts.options(kind);
				let (nodes, _) = apply_layout(&self.graph.nodes, &self.graph.edges, &options);
				self.graph.nodes = nodes;
			}
		}
		debug!("{} layout published", self.active);
		self.redraw(now);
	}

	fn ensure_loop(&mut self) {
		if !self.frame_pending {
			self.frame_pending = true;
			self.scheduler.request_tick();
		}
	}

	fn emit(&mut self, event: EngineEvent) {
		for listener in &mut self.listeners {
			listener(&event);
		}
	}

	fn frame(&self, now: f64) -> RenderFrame {
		let config = &self.config;
		let hovering = self.hover.node.is_some();
		let center = Point::new(config.width / 2.0, config.height / 2.0);
		let activation_peak = self.animation.overlay_peak(OverlayChannel::Activation);
		let gradient_peak = self.animation.overlay_peak(OverlayChannel::Gradient);
		let normalise = |value: Option<f64>, peak: f64| {
			value.map(|v| if peak > 0.0 { v / peak } else { 0.0 })
		};

		let nodes: Vec<NodeView> = self
			.graph
			.nodes
			.iter()
			.map(|node| {
				let hovered = self.hover.node.as_deref() == Some(node.id.as_str());
				let connected = self.hover.connected.contains(&node.id);
				let target = HighlightTarget::Node(node.id.clone());
				NodeView {
					id: node.id.clone(),
					label: node.label(),
					position: node.position.unwrap_or(center),
					radius: config.node_radius
						* if hovered {
							1.35
						} else if connected {
							1.2
						} else {
							1.0
						},
					fill: config.kind_color(&node.kind, &self.kinds).to_string(),
					alpha: if hovering && !hovered && !connected { 0.3 } else { 1.0 },
					hovered,
					connected,
					pinned: node.pinned,
					highlight: self
						.animation
						.entry(&target, now)
						.map(|e| (e.color.clone(), e.intensity(now))),
					activation: normalise(
						self.animation.overlay(OverlayChannel::Activation, &node.id),
						activation_peak,
					),
					gradient: normalise(
						self.animation.overlay(OverlayChannel::Gradient, &node.id),
						gradient_peak,
					)
					.map(f64::abs),
				}
			})
			.collect();

		let index = index_by_id(&self.graph.nodes);
		let max_weight = self.graph.max_weight();
		let links = self
			.graph
			.edges
			.iter()
			.filter_map(|edge| {
				let s = *index.get(edge.source.as_str())?;
				let t = *index.get(edge.target.as_str())?;
				let lit = self.hover.node.as_ref().is_some_and(|h| *h == edge.source || *h == edge.target);
				let target = HighlightTarget::connection(edge.source.clone(), edge.target.clone());
				let scale = if max_weight > 0.0 { 0.5 + edge.weight.abs() / max_weight } else { 1.0 };
				Some(LinkView {
					source: nodes[s].position,
					target: nodes[t].position,
					weight: edge.weight,
					width: config.edge_width * scale * if lit { 1.3 } else { 1.0 },
					alpha: match (hovering, lit) {
						(false, _) => 0.6,
						(true, true) => 0.9,
						(true, false) => 0.15,
					},
					highlight: self
						.animation
						.entry(&target, now)
						.map(|e| (e.color.clone(), e.intensity(now))),
				})
			})
			.collect();

		if self.graph.nodes.iter().any(|n| n.position.is_none()) {
			warn!("drawing nodes without a position at the canvas centre");
		}

		RenderFrame {
			nodes,
			links,
			width: config.width,
			height: config.height,
			node_radius: config.node_radius,
			directed: config.directed,
			show_labels: config.show_labels,
			show_weights: config.show_weights,
			background: config.palette.background.clone(),
			edge_color: config.palette.edge.clone(),
			label_color: config.palette.label.clone(),
			activation_color: config.palette.activation.clone(),
			gradient_color: config.palette.gradient.clone(),
			time: now,
		}
	}
}
