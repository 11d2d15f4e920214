//! Row-major placement on a near-square grid.

use super::super::types::{Node, Point};
use super::{DEFAULT_HEIGHT, DEFAULT_WIDTH, finite_or, positive_or};

/// Parameters of the grid layout.
#[derive(Clone, Debug, PartialEq)]
pub struct GridOptions {
	/// Canvas width.
	pub width: f64,
	/// Canvas height.
	pub height: f64,
	/// Fixed row count, derived when `None`.
	pub rows: Option<usize>,
	/// Fixed column count, derived when `None`.
	pub columns: Option<usize>,
	/// Empty border around the grid.
	pub padding: f64,
}

impl GridOptions {
	/// Defaults for a `width` x `height` canvas.
	pub fn sized(width: f64, height: f64) -> Self {
		Self {
			width,
			height,
			..Self::default()
		}
	}

	/// Resolved `(columns, rows)` for `n` nodes.
	///
	/// With neither given the grid is near-square; with one given the other
	/// is derived. Zero counts are treated as absent. Rows grow past a fixed
	/// count when the cells would not hold every node.
	pub fn dimensions(&self, n: usize) -> (usize, usize) {
		let n = n.max(1);
		let rows = self.rows.filter(|&r| r > 0);
		let columns = self.columns.filter(|&c| c > 0);
		match (columns, rows) {
			(Some(c), Some(r)) => (c, r.max(n.div_ceil(c))),
			(Some(c), None) => (c, n.div_ceil(c)),
			(None, Some(r)) => (n.div_ceil(r), r),
			(None, None) => {
				let c = (n as f64).sqrt().ceil() as usize;
				(c, n.div_ceil(c))
			}
		}
	}
}

impl Default for GridOptions {
	fn default() -> Self {
		Self {
			width: DEFAULT_WIDTH,
			height: DEFAULT_HEIGHT,
			rows: None,
			columns: None,
			padding: 50.0,
		}
	}
}

/// Grid cell `(column, row)` of the `index`-th node.
pub fn cell(index: usize, columns: usize) -> (usize, usize) {
	(index % columns, index / columns)
}

pub(super) fn layout(mut nodes: Vec<Node>, options: &GridOptions) -> Vec<Node> {
	let (columns, rows) = options.dimensions(nodes.len());
	let width = positive_or(options.width, DEFAULT_WIDTH);
	let height = positive_or(options.height, DEFAULT_HEIGHT);
	let padding = finite_or(options.padding, 50.0).max(0.0);
	let cell_w = (width - 2.0 * padding).max(0.0) / columns as f64;
	let cell_h = (height - 2.0 * padding).max(0.0) / rows as f64;

	for (i, node) in nodes.iter_mut().enumerate() {
		let (col, row) = cell(i, columns);
		node.position = Some(Point::new(
			padding + (col as f64 + 0.5) * cell_w,
			padding + (row as f64 + 0.5) * cell_h,
		));
		node.pinned = true;
	}
	nodes
}

#[cfg(test)]
mod tests {
	use super::*;

	fn nodes(n: usize) -> Vec<Node> {
		(0..n).map(|i| Node::new(format!("n{i}"), "Linear")).collect()
	}

	#[test]
	fn ten_nodes_five_columns() {
		let options = GridOptions {
			columns: Some(5),
			..GridOptions::sized(600.0, 300.0)
		};
		assert_eq!(options.dimensions(10), (5, 2));
		assert_eq!(cell(7, 5), (2, 1));

		let laid = layout(nodes(10), &options);
		// 500 x 200 drawable, cells of 100 x 100
		assert_eq!(laid[7].position, Some(Point::new(300.0, 200.0)));
		assert_eq!(laid[0].position, Some(Point::new(100.0, 100.0)));
	}

	#[test]
	fn auto_sizing_is_near_square() {
		let options = GridOptions::default();
		assert_eq!(options.dimensions(10), (4, 3));
		assert_eq!(options.dimensions(9), (3, 3));
		assert_eq!(options.dimensions(1), (1, 1));
		assert_eq!(options.dimensions(0), (1, 1));
	}

	#[test]
	fn one_side_derives_the_other() {
		let rows_only = GridOptions {
			rows: Some(3),
			..GridOptions::default()
		};
		assert_eq!(rows_only.dimensions(10), (4, 3));
		let zero = GridOptions {
			columns: Some(0),
			..GridOptions::default()
		};
		assert_eq!(zero.dimensions(4), (2, 2));
	}

	#[test]
	fn fixed_grid_too_small_grows_rows() {
		let options = GridOptions {
			rows: Some(2),
			columns: Some(2),
			..GridOptions::sized(300.0, 300.0)
		};
		assert_eq!(options.dimensions(7), (2, 4));
		assert_eq!(options.dimensions(3), (2, 2));
		for node in layout(nodes(7), &options) {
			let p = node.position.unwrap();
			assert!((50.0..=250.0).contains(&p.x) && (50.0..=250.0).contains(&p.y));
		}
	}

	#[test]
	fn single_node_is_centred() {
		let laid = layout(nodes(1), &GridOptions::sized(200.0, 100.0));
		assert_eq!(laid[0].position, Some(Point::new(100.0, 50.0)));
		assert!(laid[0].pinned);
	}
}
