use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::engine::{LinkView, NodeView, RenderFrame, RenderSurface};
use super::types::Point;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}

	/// Zooms by `factor` keeping the screen point `(sx, sy)` fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.k;
		self.x = sx - (sx - self.x) * ratio;
		self.y = sy - (sy - self.y) * ratio;
		self.k = new_k;
	}
}

/// Draws engine frames onto a 2d canvas context.
pub struct CanvasSurface {
	ctx: CanvasRenderingContext2d,
	pub transform: ViewTransform,
	last: Option<RenderFrame>,
}

impl CanvasSurface {
	pub fn new(ctx: CanvasRenderingContext2d) -> Self {
		Self {
			ctx,
			transform: ViewTransform::default(),
			last: None,
		}
	}

	/// Draws the last frame again, e.g. after a pan or zoom.
	pub fn repaint(&self) {
		if let Some(frame) = &self.last {
			self.paint(frame);
		}
	}

	fn paint(&self, frame: &RenderFrame) {
		let ctx = &self.ctx;
		ctx.set_fill_style_str(&frame.background);
		ctx.fill_rect(0.0, 0.0, frame.width, frame.height);
		ctx.save();
		let _ = ctx.translate(self.transform.x, self.transform.y);
		let _ = ctx.scale(self.transform.k, self.transform.k);
		for link in &frame.links {
			draw_link(ctx, frame, link, self.transform.k);
		}
		// lit nodes last so they sit on top
		for node in frame.nodes.iter().filter(|n| !n.hovered && !n.connected) {
			draw_node(ctx, frame, node, self.transform.k);
		}
		for node in frame.nodes.iter().filter(|n| n.hovered || n.connected) {
			draw_node(ctx, frame, node, self.transform.k);
		}
		ctx.restore();
	}
}

impl RenderSurface for CanvasSurface {
	fn draw(&mut self, frame: &RenderFrame) {
		self.paint(frame);
		self.last = Some(frame.clone());
	}
}

fn draw_link(ctx: &CanvasRenderingContext2d, frame: &RenderFrame, link: &LinkView, k: f64) {
	let (x1, y1, x2, y2) = (link.source.x, link.source.y, link.target.x, link.target.y);
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}
	let radius = frame.node_radius;
	let arrow_size = 8.0 / k;
	let (ux, uy) = (dx / dist, dy / dist);
	let end_inset = if frame.directed { radius + arrow_size } else { radius };

	let base = format!("rgba({}, {})", frame.edge_color, link.alpha);
	let (start_x, start_y) = (x1 + ux * radius, y1 + uy * radius);
	let (end_x, end_y) = (x2 - ux * end_inset, y2 - uy * end_inset);
	let stroke = |style: &str| {
		ctx.set_stroke_style_str(style);
		ctx.set_line_width(link.width / k);
		if link.weight < 0.0 {
			let _ = ctx.set_line_dash(&js_sys::Array::of2(
				&JsValue::from_f64(6.0 / k),
				&JsValue::from_f64(4.0 / k),
			));
		}
		ctx.begin_path();
		ctx.move_to(start_x, start_y);
		ctx.line_to(end_x, end_y);
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		if frame.directed {
			ctx.set_fill_style_str(style);
			let (tip_x, tip_y) = (x2 - ux * radius, y2 - uy * radius);
			let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
			let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	};

	stroke(&base);
	// highlights fade over the base stroke
	if let Some((color, t)) = &link.highlight {
		ctx.set_global_alpha(t.clamp(0.0, 1.0));
		stroke(color);
		ctx.set_global_alpha(1.0);
	}

	if frame.show_weights {
		ctx.set_fill_style_str(&format!("rgba({}, {})", frame.label_color, link.alpha));
		ctx.set_font(&format!("{}px sans-serif", 9.0 / k.max(0.5)));
		let _ = ctx.fill_text(&format!("{:.2}", link.weight), (x1 + x2) / 2.0, (y1 + y2) / 2.0);
	}
}

fn draw_node(ctx: &CanvasRenderingContext2d, frame: &RenderFrame, node: &NodeView, k: f64) {
	let Point { x, y } = node.position;
	let radius = node.radius;

	if let Some((color, t)) = &node.highlight {
		let glow_radius = radius * (1.4 + 1.2 * t);
		if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
			let _ = gradient.add_color_stop(0.0, color);
			let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
			ctx.set_global_alpha(t.clamp(0.0, 1.0));
			ctx.begin_path();
			let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
			#[allow(deprecated)]
			ctx.set_fill_style(&gradient);
			ctx.fill();
		}
	}

	ctx.set_global_alpha(node.alpha);
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&node.fill);
	ctx.fill();

	if let Some(activation) = node.activation {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius * 0.6, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&format!(
			"rgba({}, {})",
			frame.activation_color,
			activation.abs().min(1.0)
		));
		ctx.fill();
	}
	if let Some(gradient) = node.gradient {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 3.0 / k, 0.0, 2.0 * PI * gradient.min(1.0));
		ctx.set_stroke_style_str(&frame.gradient_color);
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}
	if node.hovered {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str("rgba(255, 255, 255, 0.7)");
		ctx.set_line_width(1.5 / k);
		ctx.stroke();
	}

	if frame.show_labels {
		ctx.set_fill_style_str(&format!("rgba({}, {})", frame.label_color, node.alpha * 0.8));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&node.label, x + radius + 3.0, y + 3.0);
	}
	ctx.set_global_alpha(1.0);
}
