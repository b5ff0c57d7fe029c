use std::{f64::consts::FRAC_PI_4, ops::Range};

use geo::{Rotate, Scale};
use geo_types::Point;
use rand::{Rng, seq::SliceRandom};
use tracing::debug;

use crate::tree::VectorNode;

/// Knobs for [`VectorNode::synthesize_children`].
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    /// Copies to make; below 1 it is a fraction of the current child count.
    pub quantity: f64,
    /// Fraction of children, the most unusual ones, that may be copied.
    pub top: f64,
    /// Rotation bounds in radians.
    pub rotation_range: Option<(f64, f64)>,
    /// Per-axis scale bounds.
    pub scale_range: Option<(f64, f64)>,
}

impl Default for Synthesis {
    fn default() -> Self {
        Self {
            quantity: 1.0,
            top: 0.25,
            rotation_range: Some((-FRAC_PI_4, FRAC_PI_4)),
            scale_range: Some((8.0 / 9.0, 9.0 / 8.0)),
        }
    }
}

impl VectorNode {
    /// Rotate this subtree by `angle` radians around this node's centroid.
    pub fn rotate(&mut self, angle: f64) {
        let [r, c] = self.centroid();
        self.rotate_around(angle.to_degrees(), Point::new(r, c));
    }

    fn rotate_around(&mut self, degrees: f64, origin: Point<f64>) {
        let rotated = self.as_polygon().rotate_around_point(degrees, origin);
        self.set_polygon(&rotated);
        for child in &mut self.children {
            child.rotate_around(degrees, origin);
        }
    }

    /// Stretch this subtree around this node's centroid, `row_scale` along
    /// rows and `col_scale` along columns.
    pub fn scale(&mut self, row_scale: f64, col_scale: f64) {
        let [r, c] = self.centroid();
        self.scale_around(row_scale, col_scale, Point::new(r, c));
    }

    fn scale_around(&mut self, row_scale: f64, col_scale: f64, origin: Point<f64>) {
        let scaled = self
            .as_polygon()
            .scale_around_point(row_scale, col_scale, origin);
        self.set_polygon(&scaled);
        for child in &mut self.children {
            child.scale_around(row_scale, col_scale, origin);
        }
    }

    /// Append jittered copies of the most atypical children.
    ///
    /// Children are placed in a plane of min-max normalised area and
    /// Polsby-Popper compactness; the `top` fraction farthest from the
    /// `(1, 1)` corner become candidates. Each copy picks a random candidate,
    /// scales each axis and rotates within the configured ranges, and is
    /// flagged synthetic. Returns the index range of the new children.
    pub fn synthesize_children<R: Rng>(&mut self, synthesis: &Synthesis, rng: &mut R) -> Range<usize> {
        let start = self.children.len();
        if self.children.is_empty() || (synthesis.scale_range.is_none() && synthesis.rotation_range.is_none()) {
            return start..start;
        }

        let quantity = if synthesis.quantity < 1.0 {
            start as f64 * synthesis.quantity
        } else {
            synthesis.quantity
        } as usize;
        let top = ((start as f64 * synthesis.top) as usize).clamp(1, start);

        let areas = normalise(self.children.iter().map(VectorNode::area).collect());
        let compactness = normalise(
            self.children
                .iter()
                .map(VectorNode::polsby_popper_compactness)
                .collect(),
        );
        let mut ranked: Vec<(usize, f64)> = areas
            .iter()
            .zip(&compactness)
            .map(|(a, c)| (a - 1.0).hypot(c - 1.0))
            .enumerate()
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let candidates: Vec<usize> = ranked.into_iter().take(top).map(|(i, _)| i).collect();

        for _ in 0..quantity {
            let Some(&source) = candidates.choose(rng) else {
                break;
            };
            let mut copy = self.children[source].clone();
            if let Some(range) = synthesis.scale_range {
                let (sr, sc) = (uniform(rng, range), uniform(rng, range));
                copy.scale(sr, sc);
            }
            if let Some(range) = synthesis.rotation_range {
                copy.rotate(uniform(rng, range));
            }
            copy.synthetic = true;
            self.children.push(copy);
        }

        debug!(candidates = candidates.len(), added = quantity, "synthesized children");
        start..self.children.len()
    }
}

/// Rescale to 0-1; a constant series maps to all zeros.
fn normalise(values: Vec<f64>) -> Vec<f64> {
    let lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = hi - lo;
    values
        .into_iter()
        .map(|v| if span > 0.0 && span.is_finite() { (v - lo) / span } else { 0.0 })
        .collect()
}

fn uniform<R: Rng>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if lo < hi { rng.gen_range(lo..hi) } else { lo }
}
