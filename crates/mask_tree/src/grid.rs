//! Boolean grids over an image and the set operations the segmenter and the
//! mask tree are built from.

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{GrayImage, Luma};
use imageproc::{
    distance_transform::Norm,
    region_labelling::{Connectivity, connected_components},
};
use serde::{Deserialize, Serialize};

use crate::error::{MaskTreeError, Result};

/// A row-major boolean grid, `true` where a pixel belongs to the region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PackedMask", into = "PackedMask")]
pub struct BoolMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BoolMask {
    /// All-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// All-true mask (the full canvas).
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![true; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { width, height, data }
    }

    /// Any nonzero pixel is `true`.
    pub fn from_gray_image(image: &GrayImage) -> Self {
        Self::from_fn(image.width(), image.height(), |x, y| image.get_pixel(x, y)[0] > 0)
    }

    /// `true` becomes 255, `false` becomes 0.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 255 } else { 0 }])
        })
    }

    /// Gray image with `pad` pixels of background on every side.
    pub fn to_padded_gray_image(&self, pad: u32) -> GrayImage {
        GrayImage::from_fn(self.width + 2 * pad, self.height + 2 * pad, |x, y| {
            let inside = x >= pad && y >= pad && x - pad < self.width && y - pad < self.height;
            Luma([if inside && self.get(x - pad, y - pad) { 255 } else { 0 }])
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    fn coords(&self, index: usize) -> (u32, u32) {
        let w = self.width as usize;
        ((index % w) as u32, (index / w) as u32)
    }

    /// Out-of-bounds reads are `false`.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.data[self.index(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Number of `true` pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.data.iter().any(|&v| v)
    }

    /// Coordinates of every `true` pixel in row-major order.
    pub fn iter_set(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(|(i, _)| self.coords(i))
    }

    /// First `true` pixel in row-major order at or after the linear `start` index.
    pub fn first_set_from(&self, start: usize) -> Option<(usize, (u32, u32))> {
        self.data
            .iter()
            .skip(start)
            .position(|&v| v)
            .map(|offset| {
                let i = start + offset;
                (i, self.coords(i))
            })
    }

    pub fn first_set(&self) -> Option<(u32, u32)> {
        self.first_set_from(0).map(|(_, p)| p)
    }

    pub fn ensure_same_shape(&self, other: &BoolMask, context: &'static str) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(MaskTreeError::shape_mismatch(
                context,
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(())
    }

    fn zip_with(&self, other: &BoolMask, f: impl Fn(bool, bool) -> bool) -> BoolMask {
        debug_assert_eq!(self.dimensions(), other.dimensions());
        BoolMask {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    pub fn union(&self, other: &BoolMask) -> BoolMask {
        self.zip_with(other, |a, b| a || b)
    }

    pub fn intersection(&self, other: &BoolMask) -> BoolMask {
        self.zip_with(other, |a, b| a && b)
    }

    /// Pixels in `self` but not in `other`.
    pub fn difference(&self, other: &BoolMask) -> BoolMask {
        self.zip_with(other, |a, b| a && !b)
    }

    pub fn union_assign(&mut self, other: &BoolMask) {
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a |= b;
        }
    }

    pub fn difference_assign(&mut self, other: &BoolMask) {
        for (a, &b) in self.data.iter_mut().zip(&other.data) {
            *a &= !b;
        }
    }

    /// Size of `self ∩ other` without allocating the intersection.
    pub fn intersection_count(&self, other: &BoolMask) -> usize {
        self.data
            .iter()
            .zip(&other.data)
            .filter(|(a, b)| **a && **b)
            .count()
    }

    /// `true` when every pixel of `other` is also in `self`.
    pub fn contains(&self, other: &BoolMask) -> bool {
        self.intersection_count(other) == other.count()
    }

    /// 4-connected dilation repeated `iterations` times. With `within`, each
    /// step only adds pixels that are set in `within`.
    pub fn dilate(&self, iterations: u32, within: Option<&BoolMask>) -> BoolMask {
        let mut current = self.clone();
        for _ in 0..iterations {
            let grown = imageproc::morphology::dilate(&current.to_gray_image(), Norm::L1, 1);
            let mut next = BoolMask::from_gray_image(&grown);
            if let Some(within) = within {
                next = next.intersection(within);
                next.union_assign(&current);
            }
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// Overlap between `other` and a one-step dilation of `self`.
    pub fn is_touching(&self, other: &BoolMask) -> bool {
        self.dilate(1, None).intersection_count(other) > 0
    }

    /// Close every background region that is not 4-connected to the border.
    pub fn fill_holes(&self) -> BoolMask {
        let background = GrayImage::from_fn(self.width, self.height, |x, y| {
            Luma([if self.get(x, y) { 0 } else { 255 }])
        });
        let labels = connected_components(&background, Connectivity::Four, Luma([0u8]));

        let mut outside = vec![false; self.width as usize * self.height as usize + 1];
        let mut mark = |x: u32, y: u32| {
            let label = labels.get_pixel(x, y)[0] as usize;
            if label != 0 {
                outside[label] = true;
            }
        };
        for x in 0..self.width {
            mark(x, 0);
            mark(x, self.height.saturating_sub(1));
        }
        for y in 0..self.height {
            mark(0, y);
            mark(self.width.saturating_sub(1), y);
        }

        BoolMask::from_fn(self.width, self.height, |x, y| {
            let label = labels.get_pixel(x, y)[0] as usize;
            self.get(x, y) || (label != 0 && !outside.get(label).copied().unwrap_or(false))
        })
    }

    /// 4-connected components, ordered by their first pixel in row-major order.
    pub fn components(&self) -> Vec<BoolMask> {
        let labels = connected_components(&self.to_gray_image(), Connectivity::Four, Luma([0u8]));

        let mut slot: Vec<Option<usize>> = Vec::new();
        let mut masks: Vec<BoolMask> = Vec::new();
        for (x, y) in self.iter_set() {
            let label = labels.get_pixel(x, y)[0] as usize;
            if label >= slot.len() {
                slot.resize(label + 1, None);
            }
            let i = *slot[label].get_or_insert_with(|| {
                masks.push(BoolMask::new(self.width, self.height));
                masks.len() - 1
            });
            masks[i].set(x, y, true);
        }
        masks
    }

    /// Number of `true` pixels in the first and last `band` rows and columns.
    fn band_counts(&self, band: u32) -> [usize; 4] {
        let band_x = band.min(self.width);
        let band_y = band.min(self.height);
        let mut counts = [0usize; 4];
        for (x, y) in self.iter_set() {
            if x < band_x {
                counts[0] += 1;
            }
            if x >= self.width - band_x {
                counts[1] += 1;
            }
            if y < band_y {
                counts[2] += 1;
            }
            if y >= self.height - band_y {
                counts[3] += 1;
            }
        }
        counts
    }

    /// `true` when more than `min_pixels` pixels lie within `band` pixels of
    /// the left and right edges, or of the top and bottom edges.
    ///
    /// The band is the `band` outermost columns (or rows) on each side, the
    /// same width on both: `x < band` and `x >= width - band`. A pixel exactly
    /// `band` away from the near edge is outside it.
    pub fn touches_opposite_borders(&self, band: u32, min_pixels: usize) -> bool {
        if band == 0 {
            return false;
        }
        let [left, right, top, bottom] = self.band_counts(band);
        (left > min_pixels && right > min_pixels) || (top > min_pixels && bottom > min_pixels)
    }
}

/// Persisted form of a [`BoolMask`]: base64 of the row-major packed bits.
#[derive(Serialize, Deserialize)]
struct PackedMask {
    width: u32,
    height: u32,
    bits: String,
}

impl From<BoolMask> for PackedMask {
    fn from(mask: BoolMask) -> Self {
        let mut bytes = vec![0u8; mask.data.len().div_ceil(8)];
        for (i, _) in mask.data.iter().enumerate().filter(|(_, v)| **v) {
            bytes[i / 8] |= 1 << (i % 8);
        }
        PackedMask {
            width: mask.width,
            height: mask.height,
            bits: STANDARD.encode(bytes),
        }
    }
}

impl TryFrom<PackedMask> for BoolMask {
    type Error = MaskTreeError;

    fn try_from(packed: PackedMask) -> Result<Self> {
        let bytes = STANDARD.decode(packed.bits.as_bytes())?;
        let len = packed.width as usize * packed.height as usize;
        if bytes.len() != len.div_ceil(8) {
            return Err(MaskTreeError::Corrupt(format!(
                "mask of {}x{} needs {} packed bytes, found {}",
                packed.width,
                packed.height,
                len.div_ceil(8),
                bytes.len()
            )));
        }
        let data = (0..len).map(|i| bytes[i / 8] & (1 << (i % 8)) != 0).collect();
        Ok(BoolMask {
            width: packed.width,
            height: packed.height,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_mask() -> BoolMask {
        // 6x6 square outline from (2,2) to (7,7) with a hollow 4x4 center
        BoolMask::from_fn(12, 12, |x, y| {
            (2..=7).contains(&x) && (2..=7).contains(&y) && !((3..=6).contains(&x) && (3..=6).contains(&y))
        })
    }

    #[test]
    fn test_fill_holes_closes_interior() {
        let filled = ring_mask().fill_holes();
        assert_eq!(filled.count(), 36);
        assert!(filled.get(4, 4));
        assert!(!filled.get(0, 0));
    }

    #[test]
    fn test_fill_holes_is_idempotent() {
        let once = ring_mask().fill_holes();
        assert_eq!(once.fill_holes(), once);
    }

    #[test]
    fn test_fill_holes_keeps_open_bays() {
        // a "C" open to the right border keeps its bay as background
        let c = BoolMask::from_fn(8, 8, |x, y| (x == 1 && (1..=6).contains(&y)) || ((y == 1 || y == 6) && x >= 1));
        assert_eq!(c.fill_holes(), c);
    }

    #[test]
    fn test_set_operations() {
        let a = BoolMask::from_fn(4, 1, |x, _| x < 2);
        let b = BoolMask::from_fn(4, 1, |x, _| x >= 1 && x < 3);
        assert_eq!(a.union(&b).count(), 3);
        assert_eq!(a.intersection(&b).count(), 1);
        assert_eq!(a.difference(&b).iter_set().collect::<Vec<_>>(), vec![(0, 0)]);
        assert_eq!(a.intersection_count(&b), 1);
        assert!(a.union(&b).contains(&a));
    }

    #[test]
    fn test_dilate_within_mask() {
        let mut seed = BoolMask::new(7, 1);
        seed.set(0, 0, true);
        let within = BoolMask::from_fn(7, 1, |x, _| x != 3);
        let grown = seed.dilate(5, Some(&within));
        assert_eq!(grown.count(), 3);
        assert!(!grown.get(4, 0));
    }

    #[test]
    fn test_components_are_four_connected() {
        let diagonal = BoolMask::from_fn(3, 3, |x, y| x == y);
        let parts = diagonal.components();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].get(0, 0));
        assert!(parts[2].get(2, 2));
    }

    #[test]
    fn test_touching_and_first_set() {
        let a = BoolMask::from_fn(6, 6, |x, _| x < 2);
        let b = BoolMask::from_fn(6, 6, |x, _| x == 2);
        let c = BoolMask::from_fn(6, 6, |x, _| x == 4);
        assert!(a.is_touching(&b));
        assert!(!a.is_touching(&c));
        assert_eq!(c.first_set(), Some((4, 0)));
        assert_eq!(c.first_set_from(5), Some((10, (4, 1))));
    }

    #[test]
    fn test_opposite_borders() {
        let left_block = BoolMask::from_fn(100, 100, |x, _| x < 6);
        assert!(left_block.touches_opposite_borders(5, 0));

        let centered = BoolMask::from_fn(100, 100, |x, y| (40..60).contains(&x) && (40..60).contains(&y));
        assert!(!centered.touches_opposite_borders(5, 0));

        let left_only = BoolMask::from_fn(100, 100, |x, y| x < 3 && (40..60).contains(&y));
        assert!(!left_only.touches_opposite_borders(5, 0));
    }

    #[test]
    fn test_border_band_width_is_symmetric() {
        // columns 4 and 95 are the innermost band columns on each side
        let inside = BoolMask::from_fn(100, 100, |x, y| (x == 4 || x == 95) && y == 50);
        assert!(inside.touches_opposite_borders(5, 0));

        let near_edge_out = BoolMask::from_fn(100, 100, |x, y| (x == 5 || x == 95) && y == 50);
        assert!(!near_edge_out.touches_opposite_borders(5, 0));

        let far_edge_out = BoolMask::from_fn(100, 100, |x, y| (x == 4 || x == 94) && y == 50);
        assert!(!far_edge_out.touches_opposite_borders(5, 0));

        let rows = BoolMask::from_fn(100, 100, |x, y| (y == 0 || y == 99) && x == 50);
        assert!(rows.touches_opposite_borders(1, 0));
        assert!(!rows.touches_opposite_borders(1, 1));
    }

    #[test]
    fn test_packed_serde_round_trip() {
        let mask = ring_mask();
        let json = serde_json::to_string(&mask).expect("serialize");
        let back: BoolMask = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, mask);
    }

    #[test]
    fn test_packed_serde_rejects_wrong_length() {
        let json = r#"{"width":4,"height":4,"bits":"AA=="}"#;
        assert!(serde_json::from_str::<BoolMask>(json).is_err());
    }
}
