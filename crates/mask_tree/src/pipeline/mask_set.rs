use geo::Area;
use image::{Rgb32FImage, RgbImage};
use tracing::debug;

use crate::{
    algorithms::to_polygon,
    color::{ensure_image_shape, median_color},
    error::Result,
    grid::BoolMask,
    types::{color_to_rgb8, ring_to_polygon},
};

/// Edge band, in pixels, checked for masks spanning the image.
const BORDER_BAND: u32 = 5;
/// Masks with this many pixels or fewer in both opposite bands are kept.
const BORDER_PIXELS: usize = 1;
/// Smallest pixel count and outline area a mask may keep.
const MIN_MASK_AREA: usize = 10;
const MIN_OUTLINE_POINTS: usize = 4;

/// Non-overlapping masks collected from a generator, in admission order.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskSet {
    width: u32,
    height: u32,
    masks: Vec<BoolMask>,
}

impl MaskSet {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            masks: Vec::new(),
        }
    }

    pub fn masks(&self) -> &[BoolMask] {
        &self.masks
    }

    pub fn into_masks(self) -> Vec<BoolMask> {
        self.masks
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Admit `mask` minus everything already admitted.
    ///
    /// Refused when it spans the image between opposite edges, or when what is
    /// left after the subtraction is too small or has no usable outline.
    pub fn add_mask(&mut self, mask: &BoolMask) -> Result<bool> {
        mask.ensure_same_shape(&BoolMask::new(self.width, self.height), "mask set")?;

        if mask.touches_opposite_borders(BORDER_BAND, BORDER_PIXELS) {
            debug!("mask spans the image, refused");
            return Ok(false);
        }

        let mut fresh = mask.clone();
        for other in &self.masks {
            fresh.difference_assign(other);
        }
        if fresh.count() < MIN_MASK_AREA {
            return Ok(false);
        }

        let ring = match to_polygon(&fresh, BORDER_BAND) {
            Ok(ring) => ring,
            Err(err) if err.is_no_data() => return Ok(false),
            Err(err) => return Err(err),
        };
        if ring.len() < MIN_OUTLINE_POINTS || ring_to_polygon(&ring).unsigned_area() < MIN_MASK_AREA as f64 {
            return Ok(false);
        }

        self.masks.push(fresh);
        Ok(true)
    }

    /// Split `mask` into 4-connected pieces and admit each; returns how many
    /// were accepted.
    pub fn add_components(&mut self, mask: &BoolMask) -> Result<usize> {
        let mut added = 0;
        for component in mask.components() {
            if self.add_mask(&component)? {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Drop every mask covering pixel `(x, y)`; returns how many went.
    pub fn remove_at(&mut self, x: u32, y: u32) -> usize {
        let before = self.masks.len();
        self.masks.retain(|mask| !mask.get(x, y));
        before - self.masks.len()
    }

    /// Paint each mask with the median image color beneath it on black.
    pub fn flat_image(&self, image: &Rgb32FImage) -> Result<RgbImage> {
        let mut flat = RgbImage::new(self.width, self.height);
        for mask in &self.masks {
            ensure_image_shape(image, mask, "flat image")?;
            let color = color_to_rgb8(median_color(image, mask)?);
            for (x, y) in mask.iter_set() {
                flat.put_pixel(x, y, color);
            }
        }
        Ok(flat)
    }
}
