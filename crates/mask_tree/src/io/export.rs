//! Rendering a vector tree to a raster, an SVG document, and centroid lists.
//!
//! All outputs use image coordinates: `x` is the column, `y` the row. The
//! canvas is the root's bounding box, shifted so its corner sits at the
//! origin.

use std::path::Path;

use image::{Rgb, RgbImage};
use imageproc::{
    drawing::{draw_line_segment_mut, draw_polygon_mut},
    point::Point,
};
use svg::{Document, node::element::Polygon};
use tracing::debug;

use crate::{
    error::Result,
    tree::VectorNode,
    types::{Color, color_or_black},
};

impl VectorNode {
    /// Corner and size of the root bounding box, as `([min_row, min_col], width, height)`.
    fn canvas(&self) -> ([f64; 2], u32, u32) {
        let [min, max] = self.bounds();
        let width = ((max[1] - min[1]) as u32).max(1);
        let height = ((max[0] - min[0]) as u32).max(1);
        (min, width, height)
    }

    /// Paint the tree: the canvas takes the root color (black when unset) and
    /// every descendant is filled in level order, so deeper nodes cover their
    /// ancestors.
    pub fn to_raster(&self) -> RgbImage {
        let (origin, width, height) = self.canvas();
        let mut canvas = RgbImage::from_pixel(width, height, color_or_black(self.color));

        let mut drawn = 0usize;
        for node in self.level_order(false) {
            let points = pixel_outline(&node.exterior, origin);
            let color = color_or_black(node.color);
            match points.as_slice() {
                [] => continue,
                // slivers inside one or two pixels
                [p] => put_pixel_checked(&mut canvas, *p, color),
                [a, b] => draw_line_segment_mut(&mut canvas, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color),
                _ => draw_polygon_mut(&mut canvas, &points, color),
            }
            drawn += 1;
        }

        debug!(drawn, width, height, "rasterized vector tree");
        canvas
    }

    pub fn save_raster(&self, path: impl AsRef<Path>) -> Result<()> {
        self.to_raster().save(path)?;
        Ok(())
    }

    /// One filled `<polygon>` per node, root included, in level order.
    pub fn to_svg(&self) -> Document {
        let (origin, width, height) = self.canvas();
        let mut document = Document::new()
            .set("width", width)
            .set("height", height)
            .set("viewBox", (0, 0, width, height));
        for node in self.level_order(true) {
            let points: Vec<String> = node
                .exterior
                .iter()
                .map(|&[row, col]| format!("{},{}", col - origin[1], row - origin[0]))
                .collect();
            let polygon = Polygon::new()
                .set("points", points.join(" "))
                .set("fill", svg_fill(node.color));
            document = document.add(polygon);
        }
        document
    }

    pub fn save_svg(&self, path: impl AsRef<Path>) -> Result<()> {
        svg::save(path, &self.to_svg())?;
        Ok(())
    }

    /// Centroid of every direct child, as `[x, y]`, in child order.
    pub fn child_centroids(&self) -> Vec<[f64; 2]> {
        self.children
            .iter()
            .map(|child| {
                let [row, col] = child.centroid();
                [col, row]
            })
            .collect()
    }

    pub fn save_centroids(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.child_centroids())?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Ring in integer canvas pixels with repeated points removed. The outline is
/// open; `draw_polygon_mut` closes it and rejects a repeated end point.
fn pixel_outline(ring: &[[f64; 2]], origin: [f64; 2]) -> Vec<Point<i32>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(ring.len());
    for &[row, col] in ring {
        let p = Point::new((col - origin[1]) as i32, (row - origin[0]) as i32);
        if points.last() != Some(&p) {
            points.push(p);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    points
}

fn put_pixel_checked(canvas: &mut RgbImage, point: Point<i32>, color: Rgb<u8>) {
    if point.x >= 0 && point.y >= 0 && (point.x as u32) < canvas.width() && (point.y as u32) < canvas.height() {
        canvas.put_pixel(point.x as u32, point.y as u32, color);
    }
}

/// SVG percentage color, black when unset.
fn svg_fill(color: Option<Color>) -> String {
    let [r, g, b] = color.unwrap_or([0.0; 3]).map(|c| c.clamp(0.0, 1.0) * 100.0);
    format!("rgb({r}%,{g}%,{b}%)")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn square(r: f64, c: f64, side: f64, color: Option<Color>, level: u32) -> VectorNode {
        VectorNode::new(vec![[r, c], [r + side, c], [r + side, c + side], [r, c + side]], None, color, level)
    }

    fn tree() -> VectorNode {
        let mut root = VectorNode::from_rectangle(40.0, 20.0, None, Some([0.0, 0.0, 1.0]));
        let mut child = square(2.0, 2.0, 10.0, Some([1.0, 0.0, 0.0]), 1);
        child.add_child(square(4.0, 4.0, 4.0, Some([0.0, 1.0, 0.0]), 2));
        root.add_child(child);
        root.add_child(square(5.0, 25.0, 6.0, None, 1));
        root
    }

    #[test]
    fn test_raster_paints_in_level_order() {
        let raster = tree().to_raster();
        assert_eq!(raster.dimensions(), (40, 20));
        assert_eq!(*raster.get_pixel(0, 0), Rgb([0, 0, 255]));
        assert_eq!(*raster.get_pixel(3, 3), Rgb([255, 0, 0]));
        // grandchild drawn over its parent
        assert_eq!(*raster.get_pixel(6, 6), Rgb([0, 255, 0]));
        // no color paints black
        assert_eq!(*raster.get_pixel(28, 8), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_raster_canvas_follows_root_bounds() {
        let mut root = square(10.0, 30.0, 5.0, Some([1.0, 1.0, 1.0]), 0);
        root.add_child(square(11.0, 31.0, 2.0, Some([0.0, 0.0, 0.0]), 1));
        let raster = root.to_raster();
        assert_eq!(raster.dimensions(), (5, 5));
        assert_eq!(*raster.get_pixel(1, 1), Rgb([0, 0, 0]));
        assert_eq!(*raster.get_pixel(4, 4), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_raster_paints_sub_pixel_children() {
        let mut root = VectorNode::from_rectangle(10.0, 10.0, None, Some([0.0, 0.0, 1.0]));
        // every corner truncates to the same pixel
        root.add_child(VectorNode::new(vec![[3.2, 3.2], [3.5, 3.2], [3.5, 3.6]], None, Some([1.0, 0.0, 0.0]), 1));
        // a sliver two pixels long
        root.add_child(VectorNode::new(vec![[6.1, 2.0], [6.2, 4.5], [6.3, 2.5]], None, Some([0.0, 1.0, 0.0]), 1));

        let raster = root.to_raster();
        assert_eq!(raster.dimensions(), (10, 10));
        assert_eq!(*raster.get_pixel(3, 3), Rgb([255, 0, 0]));
        assert_eq!(*raster.get_pixel(2, 6), Rgb([0, 255, 0]));
        assert_eq!(*raster.get_pixel(4, 6), Rgb([0, 255, 0]));
        assert_eq!(*raster.get_pixel(0, 0), Rgb([0, 0, 255]));
    }

    #[test]
    fn test_outline_outside_canvas_is_ignored() {
        let mut root = VectorNode::from_rectangle(4.0, 4.0, None, None);
        root.add_child(VectorNode::new(vec![[9.1, 9.1], [9.2, 9.3], [9.4, 9.2]], None, Some([1.0, 1.0, 1.0]), 1));
        let raster = root.to_raster();
        assert!(raster.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn test_svg_lists_every_node() {
        let svg = tree().to_svg().to_string();
        assert!(svg.contains("width=\"40\""));
        assert!(svg.contains("height=\"20\""));
        assert_eq!(svg.matches("<polygon").count(), 4);
        assert!(svg.contains("fill=\"rgb(100%,0%,0%)\""));
        assert!(svg.contains("points=\"2,2 2,12 12,12 12,2\""));
    }

    #[test]
    fn test_centroids_are_xy() {
        assert_eq!(tree().child_centroids(), vec![[7.0, 7.0], [28.0, 8.0]]);
    }

    #[test]
    fn test_outline_drops_repeats() {
        let ring = [[0.0, 0.0], [0.0, 0.0], [0.0, 3.0], [3.0, 3.0], [0.2, 0.1]];
        let points = pixel_outline(&ring, [0.0, 0.0]);
        assert_eq!(points, vec![Point::new(0, 0), Point::new(3, 0), Point::new(3, 3)]);
    }

    #[test]
    fn test_save_outputs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let tree = tree();
        tree.save_raster(dir.path().join("tree.png")).expect("png");
        tree.save_svg(dir.path().join("tree.svg")).expect("svg");
        tree.save_centroids(dir.path().join("centroids.json")).expect("centroids");

        let svg = std::fs::read_to_string(dir.path().join("tree.svg")).expect("read");
        assert_eq!(svg.matches("<polygon").count(), 4);

        let reloaded = image::open(dir.path().join("tree.png")).expect("open").to_rgb8();
        assert_eq!(reloaded, tree.to_raster());
        let centroids: Vec<[f64; 2]> =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("centroids.json")).expect("read"))
                .expect("json");
        assert_eq!(centroids.len(), 2);
    }
}
