//! Runtime options, each settable on its own.

use log::warn;

use super::animation::DEFAULT_HIGHLIGHT_MS;
use super::layout::{
	CircularOptions, ForceOptions, GridOptions, HierarchicalOptions, LayoutKind, LayoutOptions,
	Orientation, SortBy, DEFAULT_HEIGHT, DEFAULT_WIDTH,
};

const KIND_COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

/// Colours used by the canvas surface. `edge`, `activation` and `label` are
/// bare `"r, g, b"` triples since the renderer varies their alpha.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
	/// Canvas fill.
	pub background: String,
	/// Node fill when no per-kind colour applies.
	pub node: String,
	/// Cycled through by node kind, in order of first appearance.
	pub kinds: Vec<String>,
	/// Edge stroke.
	pub edge: String,
	/// Default highlight glow.
	pub highlight: String,
	/// Activation overlay fill.
	pub activation: String,
	/// Gradient ring and gradient-driven highlights.
	pub gradient: String,
	/// Node labels and weight text.
	pub label: String,
}

impl Default for Palette {
	fn default() -> Self {
		Self {
			background: "#1a1a2e".into(),
			node: KIND_COLORS[0].into(),
			kinds: KIND_COLORS.iter().map(|c| c.to_string()).collect(),
			edge: "100, 180, 255".into(),
			highlight: "#ffd166".into(),
			activation: "255, 140, 66".into(),
			gradient: "#ef476f".into(),
			label: "255, 255, 255".into(),
		}
	}
}

/// Display options of one graph view.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphConfig {
	/// Canvas width in pixels.
	pub width: f64,
	/// Canvas height in pixels.
	pub height: f64,
	/// Base node radius.
	pub node_radius: f64,
	/// Base edge width, scaled by relative weight.
	pub edge_width: f64,
	/// Draw arrow heads.
	pub directed: bool,
	/// Draw node labels.
	pub show_labels: bool,
	/// Draw weights at edge midpoints.
	pub show_weights: bool,
	/// Colours.
	pub palette: Palette,
	/// Gradients at or above this magnitude flash their node.
	pub gradient_threshold: f64,
	/// Default highlight lifetime in milliseconds.
	pub highlight_ms: f64,
}

impl Default for GraphConfig {
	fn default() -> Self {
		Self {
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
			node_radius: 8.0,
			edge_width: 1.5,
			directed: true,
			show_labels: true,
			show_weights: false,
			palette: Palette::default(),
			gradient_threshold: 0.5,
			highlight_ms: DEFAULT_HIGHLIGHT_MS,
		}
	}
}

/// One options record per strategy, so switching back restores parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LayoutSettings {
	/// Force-directed parameters.
	pub force: ForceOptions,
	/// Hierarchical parameters.
	pub hierarchical: HierarchicalOptions,
	/// Circular parameters.
	pub circular: CircularOptions,
	/// Grid parameters.
	pub grid: GridOptions,
}

impl LayoutSettings {
	/// Defaults for a `width` x `height` canvas.
	pub fn sized(width: f64, height: f64) -> Self {
		Self {
			force: ForceOptions::sized(width, height),
			hierarchical: HierarchicalOptions::sized(width, height),
			circular: CircularOptions::sized(width, height),
			grid: GridOptions::sized(width, height),
		}
	}

	/// The stored record for `kind`.
	pub fn options(&self, kind: LayoutKind) -> LayoutOptions {
		match kind {
			LayoutKind::Force => LayoutOptions::Force(self.force.clone()),
			LayoutKind::Hierarchical => LayoutOptions::Hierarchical(self.hierarchical.clone()),
			LayoutKind::Circular => LayoutOptions::Circular(self.circular.clone()),
			LayoutKind::Grid => LayoutOptions::Grid(self.grid.clone()),
		}
	}

	/// Stores `options` as the record for its kind.
	pub fn store(&mut self, options: LayoutOptions) {
		match options {
			LayoutOptions::Force(o) => self.force = o,
			LayoutOptions::Hierarchical(o) => self.hierarchical = o,
			LayoutOptions::Circular(o) => self.circular = o,
			LayoutOptions::Grid(o) => self.grid = o,
		}
	}

	/// Moves every strategy onto a new canvas size.
	pub fn resize(&mut self, width: f64, height: f64) {
		(self.force.width, self.force.height) = (width, height);
		(self.hierarchical.width, self.hierarchical.height) = (width, height);
		(self.circular.width, self.circular.height) = (width, height);
		(self.grid.width, self.grid.height) = (width, height);
	}
}

/// A single named option change.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigUpdate {
	/// See [`GraphConfig::node_radius`].
	NodeRadius(f64),
	/// See [`GraphConfig::edge_width`].
	EdgeWidth(f64),
	/// See [`GraphConfig::directed`].
	Directed(bool),
	/// See [`GraphConfig::show_labels`].
	ShowLabels(bool),
	/// See [`GraphConfig::show_weights`].
	ShowWeights(bool),
	/// Paints every node in one colour, replacing the per-kind palette.
	NodeColor(String),
	/// Edge stroke as an `"r, g, b"` triple.
	EdgeColor(String),
	/// Default highlight glow.
	HighlightColor(String),
	/// See [`GraphConfig::gradient_threshold`].
	GradientThreshold(f64),
	/// See [`GraphConfig::highlight_ms`].
	HighlightDuration(f64),
	/// Canvas size; re-lays out whatever strategy is active.
	Size {
		/// New width in pixels.
		width: f64,
		/// New height in pixels.
		height: f64,
	},
	/// See [`ForceOptions::charge_strength`].
	ChargeStrength(f64),
	/// See [`ForceOptions::link_distance`].
	LinkDistance(f64),
	/// See [`HierarchicalOptions::level_spacing`].
	LevelSpacing(f64),
	/// See [`HierarchicalOptions::orientation`].
	Orientation(Orientation),
	/// See [`CircularOptions::radius`].
	CircleRadius(Option<f64>),
	/// See [`CircularOptions::sort_by`].
	SortBy(SortBy),
	/// See [`GridOptions::rows`].
	GridRows(Option<usize>),
	/// See [`GridOptions::columns`].
	GridColumns(Option<usize>),
}

impl ConfigUpdate {
	/// The strategy whose parameters this update changes, if any.
	pub fn layout_kind(&self) -> Option<LayoutKind> {
		match self {
			ConfigUpdate::ChargeStrength(_) | ConfigUpdate::LinkDistance(_) => Some(LayoutKind::Force),
			ConfigUpdate::LevelSpacing(_) | ConfigUpdate::Orientation(_) => {
				Some(LayoutKind::Hierarchical)
			}
			ConfigUpdate::CircleRadius(_) | ConfigUpdate::SortBy(_) => Some(LayoutKind::Circular),
			ConfigUpdate::GridRows(_) | ConfigUpdate::GridColumns(_) => Some(LayoutKind::Grid),
			_ => None,
		}
	}

	/// Whether applying this while `active` is shown needs a re-layout.
	pub fn is_layout_affecting(&self, active: LayoutKind) -> bool {
		matches!(self, ConfigUpdate::Size { .. }) || self.layout_kind() == Some(active)
	}
}

fn positive(name: &str, value: f64, current: f64) -> f64 {
	if value.is_finite() && value > 0.0 {
		value
	} else {
		warn!("{name} must be positive, keeping {current}");
		current
	}
}

impl GraphConfig {
	/// Applies `update` to the display options and the per-layout settings.
	/// Malformed numbers leave the previous value in place.
	pub fn apply(&mut self, update: ConfigUpdate, layouts: &mut LayoutSettings) {
		match update {
			ConfigUpdate::NodeRadius(r) => self.node_radius = positive("node radius", r, self.node_radius),
			ConfigUpdate::EdgeWidth(w) => self.edge_width = positive("edge width", w, self.edge_width),
			ConfigUpdate::Directed(d) => self.directed = d,
			ConfigUpdate::ShowLabels(s) => self.show_labels = s,
			ConfigUpdate::ShowWeights(s) => self.show_weights = s,
			ConfigUpdate::NodeColor(c) => {
				self.palette.node = c;
				self.palette.kinds.clear();
			}
			ConfigUpdate::EdgeColor(c) => self.palette.edge = c,
			ConfigUpdate::HighlightColor(c) => self.palette.highlight = c,
			ConfigUpdate::GradientThreshold(t) => {
				if t.is_finite() && t >= 0.0 {
					self.gradient_threshold = t;
				} else {
					warn!("gradient threshold {t} ignored");
				}
			}
			ConfigUpdate::HighlightDuration(ms) => {
				self.highlight_ms = positive("highlight duration", ms, self.highlight_ms)
			}
			ConfigUpdate::Size { width, height } => {
				self.width = positive("width", width, self.width);
				self.height = positive("height", height, self.height);
				layouts.resize(self.width, self.height);
			}
			ConfigUpdate::ChargeStrength(c) => {
				if c.is_finite() {
					layouts.force.charge_strength = c;
				}
			}
			ConfigUpdate::LinkDistance(d) => {
				layouts.force.link_distance = positive("link distance", d, layouts.force.link_distance)
			}
			ConfigUpdate::LevelSpacing(s) => {
				layouts.hierarchical.level_spacing =
					positive("level spacing", s, layouts.hierarchical.level_spacing)
			}
			ConfigUpdate::Orientation(o) => layouts.hierarchical.orientation = o,
			ConfigUpdate::CircleRadius(r) => layouts.circular.radius = r,
			ConfigUpdate::SortBy(s) => layouts.circular.sort_by = s,
			ConfigUpdate::GridRows(r) => layouts.grid.rows = r,
			ConfigUpdate::GridColumns(c) => layouts.grid.columns = c,
		}
	}

	/// Colour for a kind, stable by first appearance in `kinds_seen`.
	pub fn kind_color(&self, kind: &str, kinds_seen: &[String]) -> &str {
		match kinds_seen.iter().position(|k| k == kind) {
			Some(i) if !self.palette.kinds.is_empty() => {
				&self.palette.kinds[i % self.palette.kinds.len()]
			}
			_ => &self.palette.node,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_matching_layout_parameters_force_relayout() {
		assert!(ConfigUpdate::LinkDistance(50.0).is_layout_affecting(LayoutKind::Force));
		assert!(!ConfigUpdate::LinkDistance(50.0).is_layout_affecting(LayoutKind::Grid));
		assert!(ConfigUpdate::GridColumns(Some(3)).is_layout_affecting(LayoutKind::Grid));
		assert!(!ConfigUpdate::NodeRadius(4.0).is_layout_affecting(LayoutKind::Grid));
		let resize = ConfigUpdate::Size {
			width: 10.0,
			height: 10.0,
		};
		assert!(LayoutKind::ALL.iter().all(|&k| resize.is_layout_affecting(k)));
	}

	#[test]
	fn malformed_numbers_keep_previous_values() {
		let mut config = GraphConfig::default();
		let mut layouts = LayoutSettings::default();
		config.apply(ConfigUpdate::NodeRadius(f64::NAN), &mut layouts);
		config.apply(ConfigUpdate::EdgeWidth(-1.0), &mut layouts);
		config.apply(ConfigUpdate::LevelSpacing(0.0), &mut layouts);
		assert_eq!(config, GraphConfig::default());
		assert_eq!(layouts, LayoutSettings::default());
	}

	#[test]
	fn resize_reaches_every_layout() {
		let mut config = GraphConfig::default();
		let mut layouts = LayoutSettings::default();
		config.apply(
			ConfigUpdate::Size {
				width: 1024.0,
				height: 768.0,
			},
			&mut layouts,
		);
		assert_eq!(layouts, LayoutSettings::sized(1024.0, 768.0));
		assert_eq!((config.width, config.height), (1024.0, 768.0));
	}

	#[test]
	fn kind_colors_cycle_by_first_appearance() {
		let config = GraphConfig::default();
		let seen = vec!["Linear".to_string(), "ReLU".to_string()];
		assert_eq!(config.kind_color("ReLU", &seen), KIND_COLORS[1]);
		assert_eq!(config.kind_color("Unknown", &seen), config.palette.node);
	}

	#[test]
	fn node_color_overrides_kind_colors() {
		let mut config = GraphConfig::default();
		let mut layouts = LayoutSettings::default();
		config.apply(ConfigUpdate::NodeColor("#00ff00".into()), &mut layouts);
		let seen = vec!["Linear".to_string(), "ReLU".to_string()];
		assert_eq!(config.kind_color("Linear", &seen), "#00ff00");
		assert_eq!(config.kind_color("ReLU", &seen), "#00ff00");
	}
}
