//! Layout strategies and the dispatch table that selects between them.
//!
//! Every strategy is a function from `(nodes, edges, options)` to positioned
//! nodes. [`apply_layout`] runs the selected one on a copy of the caller's
//! state, so a failed or abandoned switch never touches the live snapshot.

mod circular;
mod force;
mod grid;
mod hierarchical;

use std::fmt;
use std::str::FromStr;

use log::debug;
use thiserror::Error;

use super::types::{Edge, NetworkType, Node, StructuralHints};

pub use circular::{CircularOptions, SortBy};
pub use force::{ForceOptions, ForceSimulation};
pub use grid::GridOptions;
pub use hierarchical::{HierarchicalOptions, Orientation, levels};

/// Canvas width assumed when none usable is given.
pub const DEFAULT_WIDTH: f64 = 800.0;
/// Canvas height assumed when none usable is given.
pub const DEFAULT_HEIGHT: f64 = 600.0;

/// Errors surfaced to callers that misuse the layout API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
	/// A layout name that names no strategy.
	#[error("unknown layout type `{0}`")]
	UnknownLayout(String),
}

/// The four available strategies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayoutKind {
	/// Live force-directed simulation.
	#[default]
	Force,
	/// Levels by distance from the roots.
	Hierarchical,
	/// Evenly spaced on a circle.
	Circular,
	/// Row-major grid.
	Grid,
}

impl LayoutKind {
	/// Every strategy, in menu order.
	pub const ALL: [LayoutKind; 4] = [
		LayoutKind::Force,
		LayoutKind::Hierarchical,
		LayoutKind::Circular,
		LayoutKind::Grid,
	];

	/// Lower-case name, as accepted by [`FromStr`].
	pub fn as_str(&self) -> &'static str {
		match self {
			LayoutKind::Force => "force",
			LayoutKind::Hierarchical => "hierarchical",
			LayoutKind::Circular => "circular",
			LayoutKind::Grid => "grid",
		}
	}
}

impl fmt::Display for LayoutKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for LayoutKind {
	type Err = LayoutError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"force" => Ok(LayoutKind::Force),
			"hierarchical" => Ok(LayoutKind::Hierarchical),
			"circular" => Ok(LayoutKind::Circular),
			"grid" => Ok(LayoutKind::Grid),
			_ => Err(LayoutError::UnknownLayout(s.to_string())),
		}
	}
}

/// Strategy selection together with its configuration.
#[derive(Clone, Debug, PartialEq)]
pub enum LayoutOptions {
	/// See [`ForceOptions`].
	Force(ForceOptions),
	/// See [`HierarchicalOptions`].
	Hierarchical(HierarchicalOptions),
	/// See [`CircularOptions`].
	Circular(CircularOptions),
	/// See [`GridOptions`].
	Grid(GridOptions),
}

impl LayoutOptions {
	/// The strategy these options select.
	pub fn kind(&self) -> LayoutKind {
		match self {
			LayoutOptions::Force(_) => LayoutKind::Force,
			LayoutOptions::Hierarchical(_) => LayoutKind::Hierarchical,
			LayoutOptions::Circular(_) => LayoutKind::Circular,
			LayoutOptions::Grid(_) => LayoutKind::Grid,
		}
	}

	/// Default options for `kind` on a canvas of the given size.
	pub fn for_kind(kind: LayoutKind, width: f64, height: f64) -> Self {
		match kind {
			LayoutKind::Force => LayoutOptions::Force(ForceOptions::sized(width, height)),
			LayoutKind::Hierarchical => {
				LayoutOptions::Hierarchical(HierarchicalOptions::sized(width, height))
			}
			LayoutKind::Circular => LayoutOptions::Circular(CircularOptions::sized(width, height)),
			LayoutKind::Grid => LayoutOptions::Grid(GridOptions::sized(width, height)),
		}
	}

	/// Default options for a layout named at runtime.
	pub fn parse(name: &str, width: f64, height: f64) -> Result<Self, LayoutError> {
		Ok(Self::for_kind(name.parse()?, width, height))
	}
}

/// Runs the selected strategy on copies of `nodes` and `edges`.
///
/// Force runs its bounded synchronous loop here; the live simulation is
/// driven by the engine instead.
pub fn apply_layout(
	nodes: &[Node],
	edges: &[Edge],
	options: &LayoutOptions,
) -> (Vec<Node>, Vec<Edge>) {
	debug!(
		"applying {} layout to {} nodes / {} edges",
		options.kind(),
		nodes.len(),
		edges.len()
	);
	let (nodes, edges) = (nodes.to_vec(), edges.to_vec());
	let nodes = match options {
		LayoutOptions::Force(o) => force::layout(nodes, &edges, o),
		LayoutOptions::Hierarchical(o) => hierarchical::layout(nodes, &edges, o),
		LayoutOptions::Circular(o) => circular::layout(nodes, o),
		LayoutOptions::Grid(o) => grid::layout(nodes, o),
	};
	(nodes, edges)
}

/// Recommends a strategy from the network type and its shape.
///
/// Layer stacks (pure sources and pure sinks) get hierarchical, flat
/// biological graphs get circular, anything else gets force.
pub fn suggest_layout(network_type: NetworkType, hints: StructuralHints) -> LayoutKind {
	if hints.is_layered() {
		LayoutKind::Hierarchical
	} else if network_type.is_biological() {
		LayoutKind::Circular
	} else {
		LayoutKind::Force
	}
}

/// `value` if it is finite and positive, otherwise `default`.
pub(crate) fn positive_or(value: f64, default: f64) -> f64 {
	if value.is_finite() && value > 0.0 { value } else { default }
}

/// `value` if it is finite, otherwise `default`.
pub(crate) fn finite_or(value: f64, default: f64) -> f64 {
	if value.is_finite() { value } else { default }
}

#[cfg(test)]
mod tests {
	use super::super::types::Point;
	use super::*;

	fn chain(n: usize) -> (Vec<Node>, Vec<Edge>) {
		let nodes = (0..n).map(|i| Node::new(format!("n{i}"), "Linear")).collect();
		let edges = (1..n)
			.map(|i| Edge::new(format!("n{}", i - 1), format!("n{i}"), 1.0))
			.collect();
		(nodes, edges)
	}

	fn positions(nodes: &[Node]) -> Vec<Point> {
		nodes.iter().map(|n| n.position.unwrap()).collect()
	}

	#[test]
	fn unknown_layout_is_an_error() {
		assert_eq!(
			"spiral".parse::<LayoutKind>(),
			Err(LayoutError::UnknownLayout("spiral".into()))
		);
		assert!(LayoutOptions::parse("Grid", 100.0, 100.0).is_ok());
		for kind in LayoutKind::ALL {
			assert_eq!(kind.as_str().parse::<LayoutKind>(), Ok(kind));
		}
	}

	#[test]
	fn every_layout_positions_every_node() {
		for n in [0, 1, 2, 7] {
			let (nodes, edges) = chain(n);
			for kind in LayoutKind::ALL {
				let options = LayoutOptions::for_kind(kind, 640.0, 480.0);
				let (laid, kept) = apply_layout(&nodes, &edges, &options);
				assert_eq!(laid.len(), n, "{kind} with {n} nodes");
				assert_eq!(kept, edges);
				assert!(laid.iter().all(|n| n.position.is_some_and(|p| p.is_finite())));
			}
		}
	}

	#[test]
	fn caller_state_is_untouched() {
		let (nodes, edges) = chain(4);
		let before = nodes.clone();
		let _ = apply_layout(&nodes, &edges, &LayoutOptions::for_kind(LayoutKind::Grid, 100.0, 100.0));
		assert_eq!(nodes, before);
	}

	#[test]
	fn pure_layouts_are_idempotent() {
		let (nodes, edges) = chain(9);
		for kind in [LayoutKind::Hierarchical, LayoutKind::Circular, LayoutKind::Grid] {
			let options = LayoutOptions::for_kind(kind, 800.0, 600.0);
			let (a, _) = apply_layout(&nodes, &edges, &options);
			let (b, _) = apply_layout(&nodes, &edges, &options);
			assert_eq!(positions(&a), positions(&b));
			assert!(a.iter().all(|n| n.pinned));
		}
	}

	#[test]
	fn suggestion_follows_shape() {
		let (nodes, edges) = chain(3);
		let layered = StructuralHints::from_graph(&nodes, &edges);
		assert_eq!(suggest_layout(NetworkType::Ann, layered), LayoutKind::Hierarchical);
		let flat = StructuralHints::default();
		assert_eq!(suggest_layout(NetworkType::Connectome, flat), LayoutKind::Circular);
		assert_eq!(suggest_layout(NetworkType::Ann, flat), LayoutKind::Force);
	}
}
