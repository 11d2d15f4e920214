use std::time::Duration;

use leptos::prelude::*;
use log::error;
use serde_json::json;

use crate::components::network_graph::config::ConfigUpdate;
use crate::components::network_graph::{
	EngineEvent, LayoutKind, NetworkDescription, NetworkGraphCanvas, TrainingMetrics,
};

/// A small classifier in the shape the PyTorch bridge emits.
fn sample_mlp() -> NetworkDescription {
	let layers = [
		("input", "Input", json!({"out_features": 784})),
		("fc1", "Linear", json!({"in_features": 784, "out_features": 256, "has_bias": true})),
		("relu1", "ReLU", json!({"inplace": false})),
		("dropout", "Dropout", json!({"p": 0.2})),
		("fc2", "Linear", json!({"in_features": 256, "out_features": 128, "has_bias": true})),
		("relu2", "ReLU", json!({"inplace": false})),
		("fc3", "Linear", json!({"in_features": 128, "out_features": 10, "has_bias": true})),
		("softmax", "Softmax", json!({})),
	];
	let nodes: Vec<_> = layers
		.iter()
		.map(|(id, kind, props)| json!({"id": id, "type": kind, "properties": props}))
		.collect();
	let connections: Vec<_> = layers
		.windows(2)
		.enumerate()
		.map(|(i, pair)| {
			json!({
				"source": pair[0].0,
				"target": pair[1].0,
				"weight": 0.2 + rand_simple(i),
				"properties": {"std_weight": rand_simple(i + 100) * 0.1}
			})
		})
		.collect();
	parse(json!({"type": "ANN", "nodes": nodes, "connections": connections}))
}

/// A ring-like connectome with a few random chords.
fn sample_connectome(n: usize) -> NetworkDescription {
	let nodes: Vec<_> = (0..n)
		.map(|i| {
			let kind = if i % 4 == 0 { "Inhibitory" } else { "Excitatory" };
			json!({"id": format!("neuron_{i}"), "type": kind, "properties": {}})
		})
		.collect();
	let mut connections: Vec<_> = (0..n)
		.map(|i| {
			json!({
				"source": format!("neuron_{i}"),
				"target": format!("neuron_{}", (i + 1) % n),
				"weight": rand_simple(i) * 2.0 - 1.0,
				"properties": {}
			})
		})
		.collect();
	connections.extend((0..n / 2).map(|i| {
		let target = (rand_simple(i + 7) * n as f64) as usize;
		json!({
			"source": format!("neuron_{}", i * 2),
			"target": format!("neuron_{target}"),
			"weight": rand_simple(i + 13),
			"properties": {}
		})
	}));
	parse(json!({"type": "Connectome", "nodes": nodes, "connections": connections}))
}

fn parse(value: serde_json::Value) -> NetworkDescription {
	serde_json::from_value(value).unwrap_or_else(|e| {
		error!("sample network does not parse: {e}");
		NetworkDescription::default()
	})
}

/// One fake training step for every node of `network`.
fn sample_metrics(network: &NetworkDescription, epoch: u32) -> TrainingMetrics {
	let seed = epoch as usize * 31;
	let mut metrics = TrainingMetrics {
		epoch,
		loss: 2.3 / (1.0 + 0.3 * epoch as f64) + rand_simple(seed) * 0.05,
		accuracy: Some((0.1 + 0.08 * epoch as f64).min(0.98)),
		..TrainingMetrics::default()
	};
	for (i, node) in network.nodes.iter().enumerate() {
		metrics
			.gradients
			.insert(node.id.clone(), rand_simple(seed + i) * 0.8);
		metrics
			.activations
			.insert(node.id.clone(), rand_simple(seed + i + 17) * 2.0 - 1.0);
	}
	metrics
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let network = RwSignal::new(sample_mlp());
	let layout = RwSignal::new(LayoutKind::Hierarchical);
	let metrics = RwSignal::new(None::<TrainingMetrics>);
	let training = RwSignal::new(false);
	let show_weights = RwSignal::new(false);
	let hovered = RwSignal::new(None::<String>);
	let selected = RwSignal::new(None::<String>);
	let suggested = RwSignal::new(None::<LayoutKind>);

	set_interval(
		move || {
			if !training.get_untracked() {
				return;
			}
			let epoch = metrics.with_untracked(|m| m.as_ref().map_or(1, |m| m.epoch + 1));
			let next = network.with_untracked(|n| sample_metrics(n, epoch));
			metrics.set(Some(next));
		},
		Duration::from_millis(700),
	);

	let config = Signal::derive(move || vec![ConfigUpdate::ShowWeights(show_weights.get())]);

	let on_event = move |event: EngineEvent| match event {
		EngineEvent::NodeHovered(id) => hovered.set(id),
		EngineEvent::NodeClicked(id) => selected.set(Some(id)),
		EngineEvent::NetworkLoaded { suggested: kind, .. } => suggested.set(Some(kind)),
		_ => {}
	};

	let load = move |description: NetworkDescription| {
		metrics.set(None);
		selected.set(None);
		network.set(description);
	};

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<NetworkGraphCanvas
					network=network
					layout=layout
					metrics=metrics
					config=config
					on_event=on_event
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Neuroscope"</h1>
					<p class="subtitle">"Hover a layer to trace its connections. Drag to reposition, scroll to zoom."</p>
					<div class="controls">
						<button on:click=move |_| load(sample_mlp())>"MLP"</button>
						<button on:click=move |_| load(sample_connectome(24))>"Connectome"</button>
					</div>
					<div class="controls">
						{LayoutKind::ALL
							.into_iter()
							.map(|kind| {
								view! {
									<button
										class:active=move || layout.get() == kind
										on:click=move |_| layout.set(kind)
									>
										{kind.as_str()}
									</button>
								}
							})
							.collect_view()}
						<button on:click=move |_| {
							if let Some(kind) = suggested.get_untracked() {
								layout.set(kind);
							}
						}>
							"suggested"
						</button>
					</div>
					<div class="controls">
						<button on:click=move |_| training.update(|t| *t = !*t)>
							{move || if training.get() { "Stop training" } else { "Simulate training" }}
						</button>
						<button on:click=move |_| show_weights.update(|w| *w = !*w)>
							{move || if show_weights.get() { "Hide weights" } else { "Show weights" }}
						</button>
					</div>
					<p class="metrics">
						{move || {
							metrics
								.get()
								.map(|m| {
									format!(
										"epoch {} · loss {:.3} · accuracy {:.0}%",
										m.epoch,
										m.loss,
										m.accuracy.unwrap_or(0.0) * 100.0,
									)
								})
								.unwrap_or_default()
						}}
					</p>
					<p class="hovered">
						{move || hovered.get().or_else(|| selected.get()).unwrap_or_default()}
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}
