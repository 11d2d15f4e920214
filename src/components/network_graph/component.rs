use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::config::{ConfigUpdate, GraphConfig};
use super::engine::{EngineEvent, FrameScheduler, GraphEngine};
use super::layout::LayoutKind;
use super::render::CanvasSurface;
use super::types::{NetworkDescription, TrainingMetrics};

type SharedClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;
type Engine = GraphEngine<CanvasSurface, RafScheduler>;
type SharedEngine = Rc<RefCell<Option<Engine>>>;

fn now() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map_or(0.0, |p| p.now())
}

/// Frame scheduler backed by `requestAnimationFrame`.
pub struct RafScheduler {
	callback: SharedClosure,
	handle: Option<i32>,
}

impl FrameScheduler for RafScheduler {
	fn request_tick(&mut self) {
		let Some(window) = web_sys::window() else {
			return;
		};
		if let Some(ref cb) = *self.callback.borrow() {
			self.handle = window
				.request_animation_frame(cb.as_ref().unchecked_ref())
				.ok();
		}
	}

	fn cancel(&mut self) {
		if let (Some(window), Some(handle)) = (web_sys::window(), self.handle.take()) {
			let _ = window.cancel_animation_frame(handle);
		}
	}
}

#[derive(Clone, Copy, Default)]
struct Pointer {
	down: bool,
	dragging: Option<usize>,
	start_x: f64,
	start_y: f64,
	transform_start_x: f64,
	transform_start_y: f64,
}

/// Canvas view of a neural network, driven by a [`GraphEngine`].
///
/// Pointer input maps onto the engine: hover lights neighbours, dragging a
/// node moves it, dragging the background pans, the wheel zooms.
#[component]
pub fn NetworkGraphCanvas(
	/// Network to show; replacing it resets highlights and overlays.
	#[prop(into)]
	network: Signal<NetworkDescription>,
	/// Active layout strategy.
	#[prop(into)]
	layout: Signal<LayoutKind>,
	/// Latest training event, if a feed is attached.
	#[prop(into, optional)]
	metrics: Option<Signal<Option<TrainingMetrics>>>,
	/// Option changes, applied in order whenever the signal changes.
	#[prop(into, optional)]
	config: Option<Signal<Vec<ConfigUpdate>>>,
	/// Receives every engine event.
	#[prop(into, optional)]
	on_event: Option<Callback<EngineEvent>>,
	/// Fill the window and follow its size.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed width; defaults to the parent's.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed height; defaults to the parent's.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let engine: SharedEngine = Rc::new(RefCell::new(None));
	let animate: SharedClosure = Rc::new(RefCell::new(None));
	let resize: SharedClosure = Rc::new(RefCell::new(None));
	let pointer = Rc::new(RefCell::new(Pointer::default()));
	let dragged: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

	let (engine_init, animate_init, resize_init) = (engine.clone(), animate.clone(), resize.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		if engine_init.borrow().is_some() {
			return;
		}
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window): Option<Window> = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			(
				window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(800.0),
				window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(600.0),
			)
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_height() as f64)
						.unwrap_or(600.0)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		{
			Some(ctx) => ctx,
			None => {
				warn!("canvas has no 2d context");
				return;
			}
		};

		let config = GraphConfig {
			width: w,
			height: h,
			..GraphConfig::default()
		};
		let scheduler = RafScheduler {
			callback: animate_init.clone(),
			handle: None,
		};
		let engine_anim = engine_init.clone();
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if let Some(ref mut e) = *engine_anim.borrow_mut() {
				e.on_frame(now());
			}
		}));

		let mut new_engine = GraphEngine::new(config, CanvasSurface::new(ctx), scheduler);
		if let Some(on_event) = on_event {
			new_engine.subscribe(move |event| on_event.run(event.clone()));
		}
		let t = now();
		new_engine.set_layout_kind(layout.get_untracked(), t);
		new_engine.set_network(&network.get_untracked(), t);
		*engine_init.borrow_mut() = Some(new_engine);

		if fullscreen {
			let (engine_resize, canvas_resize) = (engine_init.clone(), canvas.clone());
			*resize_init.borrow_mut() = Some(Closure::new(move || {
				let Some(win) = web_sys::window() else {
					return;
				};
				let (Some(nw), Some(nh)) = (
					win.inner_width().ok().and_then(|v| v.as_f64()),
					win.inner_height().ok().and_then(|v| v.as_f64()),
				) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(e) = engine_resize.borrow_mut().as_mut() {
					e.update_config(ConfigUpdate::Size { width: nw, height: nh }, now());
				}
			}));
			if let Some(cb) = resize_init.borrow().as_ref() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
	});

	let engine_net = engine.clone();
	Effect::new(move |prev: Option<()>| {
		let description = network.get();
		if prev.is_none() {
			return;
		}
		if let Some(ref mut e) = *engine_net.borrow_mut() {
			e.set_network(&description, now());
		}
	});

	let engine_layout = engine.clone();
	Effect::new(move |prev: Option<()>| {
		let kind = layout.get();
		if prev.is_none() {
			return;
		}
		if let Some(ref mut e) = *engine_layout.borrow_mut() {
			e.set_layout_kind(kind, now());
		}
	});

	let engine_metrics = engine.clone();
	Effect::new(move |_| {
		let Some(update) = metrics.and_then(|m| m.get()) else {
			return;
		};
		if let Some(ref mut e) = *engine_metrics.borrow_mut() {
			e.apply_metrics(&update, now());
		}
	});

	let engine_config = engine.clone();
	Effect::new(move |_| {
		let Some(updates) = config.map(|c| c.get()) else {
			return;
		};
		if let Some(ref mut e) = *engine_config.borrow_mut() {
			for update in updates {
				e.update_config(update, now());
			}
		}
	});

	let cleanup = StoredValue::new_local((engine.clone(), resize));
	on_cleanup(move || {
		cleanup.try_with_value(|(shared, resize)| {
			if let Some(e) = shared.borrow_mut().as_mut() {
				e.destroy();
			}
			if let (Some(window), Some(cb)) = (web_sys::window(), resize.borrow_mut().take()) {
				let _ = window
					.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		});
	});

	let local_position = move |ev: &MouseEvent| -> Option<(f64, f64)> {
		let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
		let rect = canvas.get_bounding_client_rect();
		Some((
			ev.client_x() as f64 - rect.left(),
			ev.client_y() as f64 - rect.top(),
		))
	};

	let (engine_md, pointer_md, dragged_md) = (engine.clone(), pointer.clone(), dragged.clone());
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(&ev) else {
			return;
		};
		if let Some(ref mut e) = *engine_md.borrow_mut() {
			let mut p = pointer_md.borrow_mut();
			let at = e.surface().transform.screen_to_graph(x, y);
			let radius = e.config().node_radius * 1.5;
			let hit = e.graph().node_at(at.x, at.y, radius).map(|n| n.id.clone());
			p.down = true;
			p.start_x = x;
			p.start_y = y;
			p.transform_start_x = e.surface().transform.x;
			p.transform_start_y = e.surface().transform.y;
			p.dragging = hit.as_ref().map(|_| 0);
			*dragged_md.borrow_mut() = hit;
		}
	};

	let (engine_mm, pointer_mm, dragged_mm) = (engine.clone(), pointer.clone(), dragged.clone());
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(&ev) else {
			return;
		};
		if let Some(ref mut e) = *engine_mm.borrow_mut() {
			let mut p = pointer_mm.borrow_mut();
			let at = e.surface().transform.screen_to_graph(x, y);
			let t = now();
			if !p.down {
				let radius = e.config().node_radius * 1.5;
				let hovered = e.graph().node_at(at.x, at.y, radius).map(|n| n.id.clone());
				e.hover(hovered.as_deref(), t);
			} else if let Some(id) = dragged_mm.borrow().as_deref() {
				p.dragging = p.dragging.map(|moves| moves + 1);
				e.drag_node(id, at, t);
			} else {
				let transform = &mut e.surface_mut().transform;
				transform.x = p.transform_start_x + (x - p.start_x);
				transform.y = p.transform_start_y + (y - p.start_y);
				e.surface().repaint();
			}
		}
	};

	let (engine_mu, pointer_mu, dragged_mu) = (engine.clone(), pointer.clone(), dragged.clone());
	let on_mouseup = move |_: MouseEvent| {
		let mut p = pointer_mu.borrow_mut();
		let id = dragged_mu.take();
		if let (Some(e), Some(id)) = (engine_mu.borrow_mut().as_mut(), id) {
			e.release_node(&id);
			// a press without movement is a click
			if p.dragging == Some(0) {
				e.click(&id);
			}
		}
		*p = Pointer::default();
	};

	let (engine_ml, pointer_ml, dragged_ml) = (engine.clone(), pointer.clone(), dragged.clone());
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut e) = *engine_ml.borrow_mut() {
			if let Some(id) = dragged_ml.take() {
				e.release_node(&id);
			}
			e.hover(None, now());
		}
		*pointer_ml.borrow_mut() = Pointer::default();
	};

	let engine_cm = engine.clone();
	let on_contextmenu = move |ev: MouseEvent| {
		let Some((x, y)) = local_position(&ev) else {
			return;
		};
		if let Some(ref mut e) = *engine_cm.borrow_mut() {
			let at = e.surface().transform.screen_to_graph(x, y);
			let radius = e.config().node_radius * 1.5;
			if let Some(id) = e.graph().node_at(at.x, at.y, radius).map(|n| n.id.clone()) {
				ev.prevent_default();
				e.context_menu(&id);
			}
		}
	};

	let engine_wh = engine.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let mouse: &MouseEvent = &ev;
		let Some((x, y)) = local_position(mouse) else {
			return;
		};
		if let Some(ref mut e) = *engine_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			e.surface_mut().transform.zoom_at(x, y, factor);
			e.surface().repaint();
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="network-graph-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:contextmenu=on_contextmenu
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}
