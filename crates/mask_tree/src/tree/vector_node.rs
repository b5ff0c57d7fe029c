use std::{
    collections::{BTreeMap, VecDeque},
    f64::consts::PI,
};

use geo::{Area, BoundingRect, Centroid, Contains, ConvexHull, EuclideanLength, Intersects, Translate};
use geo_types::{Point, Polygon};
use serde::{Deserialize, Serialize};

use crate::{
    algorithms::robust_intersection,
    types::{Color, Ring, polygon_to_ring, ring_to_polygon},
};

/// One polygon of the vector tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorNode {
    /// Outer boundary as `[row, column]` points
    pub exterior: Ring,
    pub category: Option<u32>,
    pub color: Option<Color>,
    pub level: u32,
    /// Procedurally generated rather than traced from a mask
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default)]
    pub children: Vec<VectorNode>,
}

impl VectorNode {
    pub fn new(exterior: Ring, category: Option<u32>, color: Option<Color>, level: u32) -> Self {
        Self {
            exterior,
            category,
            color,
            level,
            synthetic: false,
            children: Vec::new(),
        }
    }

    /// Axis-aligned canvas rectangle of `width` columns by `height` rows.
    pub fn from_rectangle(width: f64, height: f64, category: Option<u32>, color: Option<Color>) -> Self {
        Self::new(
            vec![[0.0, 0.0], [height, 0.0], [height, width], [0.0, width]],
            category,
            color,
            0,
        )
    }

    pub fn add_child(&mut self, child: VectorNode) {
        self.children.push(child);
    }

    pub fn as_polygon(&self) -> Polygon<f64> {
        ring_to_polygon(&self.exterior)
    }

    /// Replace the ring with the exterior of `polygon`.
    pub fn set_polygon(&mut self, polygon: &Polygon<f64>) {
        self.exterior = polygon_to_ring(polygon);
    }

    /// Breadth-first walk, parents before children.
    pub fn level_order(&self, include_self: bool) -> Vec<&VectorNode> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&VectorNode> = VecDeque::new();
        if include_self {
            queue.push_back(self);
        } else {
            queue.extend(self.children.iter());
        }
        while let Some(node) = queue.pop_front() {
            out.push(node);
            queue.extend(node.children.iter());
        }
        out
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(VectorNode::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children_by_category(&self) -> BTreeMap<Option<u32>, Vec<&VectorNode>> {
        let mut groups: BTreeMap<Option<u32>, Vec<&VectorNode>> = BTreeMap::new();
        for child in &self.children {
            groups.entry(child.category).or_default().push(child);
        }
        groups
    }

    /// Count of traced (non-synthetic) children per category, optionally as a
    /// fraction of all children.
    pub fn category_density(&self, normalize: bool) -> Vec<(Option<u32>, f64)> {
        let mut counts: BTreeMap<Option<u32>, usize> = BTreeMap::new();
        for child in self.children.iter().filter(|c| !c.synthetic) {
            *counts.entry(child.category).or_default() += 1;
        }
        let total = self.children.len().max(1) as f64;
        counts
            .into_iter()
            .map(|(category, n)| (category, if normalize { n as f64 / total } else { n as f64 }))
            .collect()
    }

    /// Area centroid as `[row, column]`; falls back to the bounding-box center
    /// for degenerate rings.
    pub fn centroid(&self) -> [f64; 2] {
        match self.as_polygon().centroid() {
            Some(c) => [c.x(), c.y()],
            None => {
                let [min, max] = self.bounds();
                [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0]
            }
        }
    }

    /// Move this node and its whole subtree so the centroid lands on `centroid`.
    pub fn set_centroid(&mut self, centroid: [f64; 2]) {
        let current = self.centroid();
        self.translate(centroid[0] - current[0], centroid[1] - current[1]);
    }

    /// Shift this node and its whole subtree.
    pub fn translate(&mut self, d_row: f64, d_col: f64) {
        let moved = self.as_polygon().translate(d_row, d_col);
        self.set_polygon(&moved);
        for child in &mut self.children {
            child.translate(d_row, d_col);
        }
    }

    /// Ring points, optionally as `[column, row]` and relative to the centroid.
    pub fn coordinate_pairs(&self, yx: bool, normalized: bool) -> Vec<[f64; 2]> {
        let origin = if normalized { self.centroid() } else { [0.0, 0.0] };
        self.exterior
            .iter()
            .map(|&[r, c]| {
                let p = [r - origin[0], c - origin[1]];
                if yx { [p[1], p[0]] } else { p }
            })
            .collect()
    }

    pub fn area(&self) -> f64 {
        self.as_polygon().unsigned_area()
    }

    pub fn perimeter(&self) -> f64 {
        self.as_polygon().exterior().euclidean_length()
    }

    /// `[[min_row, min_col], [max_row, max_col]]`; zeros for an empty ring.
    pub fn bounds(&self) -> [[f64; 2]; 2] {
        match self.as_polygon().bounding_rect() {
            Some(rect) => [[rect.min().x, rect.min().y], [rect.max().x, rect.max().y]],
            None => [[0.0, 0.0], [0.0, 0.0]],
        }
    }

    /// Extent along the first (row) axis.
    pub fn bounding_width(&self) -> f64 {
        let [min, max] = self.bounds();
        max[0] - min[0]
    }

    /// Extent along the second (column) axis.
    pub fn bounding_height(&self) -> f64 {
        let [min, max] = self.bounds();
        max[1] - min[1]
    }

    pub fn polsby_popper_compactness(&self) -> f64 {
        4.0 * PI * (self.area() / self.perimeter().powi(2))
    }

    pub fn schwartzberg_compactness(&self) -> f64 {
        1.0 / (self.perimeter() / (2.0 * PI * (self.area() / PI).sqrt()))
    }

    pub fn length_width_ratio(&self) -> f64 {
        self.bounding_width() / self.bounding_height()
    }

    pub fn convex_hull(&self) -> Polygon<f64> {
        self.as_polygon().convex_hull()
    }

    pub fn convex_hull_score(&self) -> f64 {
        self.area() / self.convex_hull().unsigned_area()
    }

    /// Ratio of the smaller to the larger of area and perimeter.
    pub fn elongation(&self) -> f64 {
        let (area, perimeter) = (self.area(), self.perimeter());
        area.min(perimeter) / area.max(perimeter)
    }

    pub fn distance_to_point(&self, point: [f64; 2]) -> f64 {
        let c = self.centroid();
        (point[0] - c[0]).hypot(point[1] - c[1])
    }

    /// Centroid-to-centroid distance.
    pub fn distance_to_polygon(&self, other: &VectorNode) -> f64 {
        self.distance_to_point(other.centroid())
    }

    /// Angle from the centroid to `point`, `atan2(column delta, row delta)`.
    pub fn angle_to_point(&self, point: [f64; 2]) -> f64 {
        let c = self.centroid();
        (point[1] - c[1]).atan2(point[0] - c[0])
    }

    pub fn angle_to_polygon(&self, other: &VectorNode) -> f64 {
        self.angle_to_point(other.centroid())
    }

    fn intersection_area(&self, other: &VectorNode) -> f64 {
        robust_intersection(&self.as_polygon(), &other.as_polygon())
            .map(|mp| mp.unsigned_area())
            .unwrap_or(0.0)
    }

    /// Shared area as a fraction of the smaller polygon.
    pub fn overlap_percent(&self, other: &VectorNode) -> f64 {
        self.intersection_area(other) / self.area().min(other.area())
    }

    /// Whether `other` lies entirely inside this polygon, up to a relative
    /// area tolerance.
    pub fn is_fully_contained(&self, other: &VectorNode) -> bool {
        let area = other.area();
        (self.intersection_area(other) - area).abs() <= 1e-9 * area.max(1.0)
    }

    /// With `border_touching`, shared edges count; otherwise the overlap must
    /// have area.
    pub fn is_touching(&self, other: &VectorNode, border_touching: bool) -> bool {
        if border_touching {
            self.as_polygon().intersects(&other.as_polygon())
        } else {
            self.intersection_area(other) > 0.0
        }
    }

    pub fn contains_point(&self, point: [f64; 2]) -> bool {
        self.as_polygon().contains(&Point::new(point[0], point[1]))
    }
}
