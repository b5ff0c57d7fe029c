use std::panic::{AssertUnwindSafe, catch_unwind};

use geo::{Area, BooleanOps, Orient, orient::Direction};
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use tracing::{debug, warn};

use crate::tree::VectorNode;

/// Pieces smaller than this are treated as lines or points.
const MIN_PIECE_AREA: f64 = 1e-9;

/// Intersection of two polygons that never panics.
///
/// The sweep in `BooleanOps` can panic on self-intersecting or otherwise
/// invalid rings. When it does, both inputs are cleaned up and the
/// intersection is tried once more; a second failure gives `None`.
pub fn robust_intersection(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    if let Some(result) = try_intersection(a, b) {
        return Some(result);
    }
    debug!("polygon intersection failed, retrying with repaired rings");

    let (a, b) = (repair(a)?, repair(b)?);
    let result = catch_unwind(AssertUnwindSafe(|| a.intersection(&b))).ok();
    if result.is_none() {
        warn!("polygon intersection failed after repair");
    }
    result
}

fn try_intersection(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    catch_unwind(AssertUnwindSafe(|| a.intersection(b))).ok()
}

/// Rebuild a ring into a valid region: drop non-finite and repeated points,
/// straighten collinear runs, orient counter-clockwise, then union with
/// nothing so overlapping loops are resolved into proper pieces.
pub fn repair(polygon: &Polygon<f64>) -> Option<MultiPolygon<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for c in polygon.exterior().coords() {
        if !(c.x.is_finite() && c.y.is_finite()) {
            continue;
        }
        if points.last() != Some(c) {
            points.push(*c);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }

    let points = straighten(points);
    if points.len() < 3 {
        return None;
    }

    let cleaned = Polygon::new(LineString::from(points), vec![]).orient(Direction::Default);
    let result = catch_unwind(AssertUnwindSafe(|| {
        MultiPolygon::new(vec![cleaned]).union(&MultiPolygon::new(vec![]))
    }))
    .ok()?;
    (result.unsigned_area() > MIN_PIECE_AREA).then_some(result)
}

/// Remove every point that sits on the line through its neighbours,
/// including the tips of zero-width spikes.
fn straighten(mut points: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    loop {
        let n = points.len();
        if n < 3 {
            return points;
        }
        let drop = (0..n).find(|&i| {
            let a = points[(i + n - 1) % n];
            let b = points[i];
            let c = points[(i + 1) % n];
            (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x) == 0.0
        });
        match drop {
            Some(i) => {
                points.remove(i);
            }
            None => return points,
        }
    }
}

impl VectorNode {
    /// Clip every child to this node's polygon.
    ///
    /// Children with no area left are dropped. A child cut into several pieces
    /// is removed and each piece is appended as a copy of it (same category,
    /// color, level, and subtree). With `recursive`, every surviving child is
    /// then refit against its own children.
    pub fn refit_to_parent(&mut self, recursive: bool) {
        let parent = self.as_polygon();
        let children = std::mem::take(&mut self.children);
        let mut kept = Vec::with_capacity(children.len());
        let mut split = Vec::new();

        for mut child in children {
            let pieces: Vec<Polygon<f64>> = match robust_intersection(&parent, &child.as_polygon()) {
                Some(result) => result
                    .into_iter()
                    .filter(|p| p.unsigned_area() > MIN_PIECE_AREA)
                    .collect(),
                None => Vec::new(),
            };

            match pieces.len() {
                0 => debug!(level = child.level, "dropping child outside its parent"),
                1 => {
                    child.set_polygon(&pieces[0]);
                    kept.push(child);
                }
                n => {
                    debug!(level = child.level, pieces = n, "child split by parent outline");
                    for piece in &pieces {
                        let mut part = child.clone();
                        part.set_polygon(piece);
                        split.push(part);
                    }
                }
            }
        }

        kept.extend(split);
        self.children = kept;

        if recursive {
            for child in &mut self.children {
                child.refit_to_parent(true);
            }
        }
    }
}
