//! Time-bounded highlights and live value overlays.
//!
//! Times are millisecond timestamps supplied by the caller, so the state
//! machine never reads a clock itself.

use std::collections::{BTreeMap, HashMap};

use log::warn;

/// Lifetime of a highlight when the caller gives none.
pub const DEFAULT_HIGHLIGHT_MS: f64 = 1000.0;

/// Maps `t` in `[0, 1]` onto a curve that starts fast and settles.
pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// What a highlight is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HighlightTarget {
	/// A node, by id.
	Node(String),
	/// A directed connection between two node ids.
	Connection {
		/// Source node id.
		source: String,
		/// Target node id.
		target: String,
	},
}

impl HighlightTarget {
	/// Shorthand for [`HighlightTarget::Connection`].
	pub fn connection(source: impl Into<String>, target: impl Into<String>) -> Self {
		HighlightTarget::Connection {
			source: source.into(),
			target: target.into(),
		}
	}
}

/// One lit target and its timer.
#[derive(Clone, Debug, PartialEq)]
pub struct HighlightEntry {
	/// What is lit.
	pub target: HighlightTarget,
	/// CSS colour of the glow.
	pub color: String,
	/// Timestamp of the (latest) highlight request.
	pub created_at: f64,
	/// Lifetime in milliseconds.
	pub duration_ms: f64,
}

impl HighlightEntry {
	/// Timestamp at which the entry goes inactive.
	pub fn expires_at(&self) -> f64 {
		self.created_at + self.duration_ms
	}

	/// Whether the entry is still lit at `now`.
	pub fn is_active(&self, now: f64) -> bool {
		now < self.expires_at()
	}

	/// 1 when fresh, easing out to 0 at expiry.
	pub fn intensity(&self, now: f64) -> f64 {
		let t = ((now - self.created_at) / self.duration_ms).clamp(0.0, 1.0);
		1.0 - ease_out_cubic(t)
	}
}

/// Overlay channel fed by the training metrics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverlayChannel {
	/// Per-node activations.
	Activation,
	/// Per-node gradient magnitudes.
	Gradient,
}

/// Highlight timers plus the activation and gradient overlays.
#[derive(Clone, Debug, Default)]
pub struct AnimationState {
	highlights: HashMap<HighlightTarget, HighlightEntry>,
	activations: HashMap<String, f64>,
	gradients: HashMap<String, f64>,
}

impl AnimationState {
	/// Nothing lit, no overlays.
	pub fn new() -> Self {
		Self::default()
	}

	/// Activates `target` until `now + duration_ms`, restarting the timer if
	/// it is already lit. Malformed durations fall back to the default.
	pub fn highlight(&mut self, target: HighlightTarget, color: &str, duration_ms: f64, now: f64) {
		let duration_ms = if duration_ms.is_finite() && duration_ms > 0.0 {
			duration_ms
		} else {
			warn!("highlight duration {duration_ms} is not usable, using {DEFAULT_HIGHLIGHT_MS}");
			DEFAULT_HIGHLIGHT_MS
		};
		let entry = HighlightEntry {
			target: target.clone(),
			color: color.to_string(),
			created_at: now,
			duration_ms,
		};
		self.highlights.insert(target, entry);
	}

	/// Deactivates one target. Returns whether it was lit.
	pub fn clear(&mut self, target: &HighlightTarget) -> bool {
		self.highlights.remove(target).is_some()
	}

	/// Deactivates every target.
	pub fn clear_highlights(&mut self) {
		self.highlights.clear();
	}

	/// Whether `target` is lit at `now`.
	pub fn is_active(&self, target: &HighlightTarget, now: f64) -> bool {
		self.entry(target, now).is_some()
	}

	/// The entry for `target` if it has not yet expired.
	pub fn entry(&self, target: &HighlightTarget, now: f64) -> Option<&HighlightEntry> {
		self.highlights.get(target).filter(|e| e.is_active(now))
	}

	/// Drops expired entries and reports whether any remain.
	pub fn prune(&mut self, now: f64) -> bool {
		self.highlights.retain(|_, e| e.is_active(now));
		!self.highlights.is_empty()
	}

	/// Whether anything is lit at `now`.
	pub fn has_active(&self, now: f64) -> bool {
		self.highlights.values().any(|e| e.is_active(now))
	}

	/// Writes one overlay value; the last write per node wins.
	pub fn set_overlay(&mut self, channel: OverlayChannel, node_id: &str, value: f64) {
		if !value.is_finite() {
			warn!("ignoring non-finite {channel:?} value for {node_id}");
			return;
		}
		self.channel_mut(channel).insert(node_id.to_string(), value);
	}

	/// Merges one metrics map into `channel`; ids it does not name keep
	/// their previous value.
	pub fn update_overlays(&mut self, channel: OverlayChannel, values: &BTreeMap<String, f64>) {
		for (id, &value) in values {
			self.set_overlay(channel, id, value);
		}
	}

	/// Current overlay value of a node.
	pub fn overlay(&self, channel: OverlayChannel, node_id: &str) -> Option<f64> {
		self.channel(channel).get(node_id).copied()
	}

	/// Largest magnitude in a channel, used to normalise colours.
	pub fn overlay_peak(&self, channel: OverlayChannel) -> f64 {
		self.channel(channel).values().map(|v| v.abs()).fold(0.0, f64::max)
	}

	/// Drops both overlay channels; highlights are untouched.
	pub fn clear_overlays(&mut self) {
		self.activations.clear();
		self.gradients.clear();
	}

	/// Forgets everything, as on a fresh network.
	pub fn reset(&mut self) {
		self.clear_highlights();
		self.clear_overlays();
	}

	fn channel(&self, channel: OverlayChannel) -> &HashMap<String, f64> {
		match channel {
			OverlayChannel::Activation => &self.activations,
			OverlayChannel::Gradient => &self.gradients,
		}
	}

	fn channel_mut(&mut self, channel: OverlayChannel) -> &mut HashMap<String, f64> {
		match channel {
			OverlayChannel::Activation => &mut self.activations,
			OverlayChannel::Gradient => &mut self.gradients,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: &str) -> HighlightTarget {
		HighlightTarget::Node(id.into())
	}

	#[test]
	fn highlights_expire_on_their_own() {
		let mut state = AnimationState::new();
		state.highlight(node("fc1"), "#ff0", 100.0, 1_000.0);
		assert!(state.is_active(&node("fc1"), 1_050.0));
		assert_eq!(state.entry(&node("fc1"), 1_040.0).unwrap().expires_at(), 1_100.0);
		assert!(!state.is_active(&node("fc1"), 1_150.0));
		assert!(state.entry(&node("fc1"), 1_150.0).is_none());
		assert!(!state.prune(1_150.0));
	}

	#[test]
	fn rehighlighting_restarts_the_timer() {
		let mut state = AnimationState::new();
		state.highlight(node("a"), "red", 100.0, 0.0);
		state.highlight(node("a"), "blue", 100.0, 80.0);
		assert!(state.is_active(&node("a"), 150.0));
		assert_eq!(state.entry(&node("a"), 150.0).unwrap().color, "blue");
	}

	#[test]
	fn explicit_clear_deactivates() {
		let mut state = AnimationState::new();
		let link = HighlightTarget::connection("a", "b");
		state.highlight(link.clone(), "red", 500.0, 0.0);
		assert!(state.has_active(10.0));
		assert!(state.clear(&link));
		assert!(!state.has_active(10.0));
		assert!(!state.clear(&link));
	}

	#[test]
	fn bad_durations_use_the_default() {
		let mut state = AnimationState::new();
		state.highlight(node("a"), "red", f64::NAN, 0.0);
		state.highlight(node("b"), "red", -5.0, 0.0);
		assert!(state.is_active(&node("a"), DEFAULT_HIGHLIGHT_MS - 1.0));
		assert!(state.is_active(&node("b"), DEFAULT_HIGHLIGHT_MS - 1.0));
	}

	#[test]
	fn intensity_fades_to_zero() {
		let entry = HighlightEntry {
			target: node("a"),
			color: "red".into(),
			created_at: 0.0,
			duration_ms: 100.0,
		};
		assert_eq!(entry.intensity(0.0), 1.0);
		assert!(entry.intensity(50.0) < 1.0);
		assert_eq!(entry.intensity(100.0), 0.0);
	}

	#[test]
	fn overlays_are_last_write_wins_per_channel() {
		let mut state = AnimationState::new();
		state.set_overlay(OverlayChannel::Activation, "fc1", 0.3);
		state.set_overlay(OverlayChannel::Activation, "fc1", -0.8);
		state.set_overlay(OverlayChannel::Gradient, "fc1", 2.0);
		state.set_overlay(OverlayChannel::Gradient, "fc2", f64::INFINITY);
		assert_eq!(state.overlay(OverlayChannel::Activation, "fc1"), Some(-0.8));
		assert_eq!(state.overlay(OverlayChannel::Gradient, "fc1"), Some(2.0));
		assert_eq!(state.overlay(OverlayChannel::Gradient, "fc2"), None);
		assert_eq!(state.overlay_peak(OverlayChannel::Activation), 0.8);

		state.highlight(node("fc1"), "red", 100.0, 0.0);
		state.clear_overlays();
		assert_eq!(state.overlay(OverlayChannel::Activation, "fc1"), None);
		assert!(state.is_active(&node("fc1"), 10.0));
		state.reset();
		assert!(!state.has_active(10.0));
	}
}
