//! Color sampling under a mask and the per-call contrast stretch that precedes
//! segmentation.

use image::{Rgb, Rgb32FImage};

use crate::{
    error::{MaskTreeError, Result},
    grid::BoolMask,
    types::Color,
};

/// Fail fast when `mask` does not cover `image` pixel for pixel.
pub fn ensure_image_shape(image: &Rgb32FImage, mask: &BoolMask, context: &'static str) -> Result<()> {
    if image.dimensions() != mask.dimensions() {
        return Err(MaskTreeError::shape_mismatch(
            context,
            image.dimensions(),
            mask.dimensions(),
        ));
    }
    Ok(())
}

/// How a representative color is derived from the pixels under a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorStatistic {
    Mean,
    Median,
}

impl ColorStatistic {
    pub fn sample(self, image: &Rgb32FImage, mask: &BoolMask) -> Result<Color> {
        match self {
            Self::Mean => mean_color(image, mask),
            Self::Median => median_color(image, mask),
        }
    }
}

pub fn mean_color(image: &Rgb32FImage, mask: &BoolMask) -> Result<Color> {
    ensure_image_shape(image, mask, "mean color")?;

    let mut sum = [0f64; 3];
    let mut n = 0usize;
    for (x, y) in mask.iter_set() {
        let Rgb(p) = *image.get_pixel(x, y);
        for c in 0..3 {
            sum[c] += p[c] as f64;
        }
        n += 1;
    }
    if n == 0 {
        return Err(MaskTreeError::EmptySelection);
    }
    Ok(sum.map(|s| (s / n as f64) as f32))
}

/// Per-channel median; an even count averages the two middle values.
pub fn median_color(image: &Rgb32FImage, mask: &BoolMask) -> Result<Color> {
    ensure_image_shape(image, mask, "median color")?;

    let mut channels: [Vec<f32>; 3] = Default::default();
    for (x, y) in mask.iter_set() {
        let Rgb(p) = *image.get_pixel(x, y);
        for c in 0..3 {
            channels[c].push(p[c]);
        }
    }
    if channels[0].is_empty() {
        return Err(MaskTreeError::EmptySelection);
    }

    Ok(channels.map(|mut values| {
        values.sort_unstable_by(f32::total_cmp);
        let mid = values.len() / 2;
        if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        }
    }))
}

/// Stretch the image so the pixels under `mask` span 0–1, zeroing everything
/// outside the mask, then optionally push values apart with a sigmoid of
/// steepness `contrast` centred on 0.5.
///
/// A mask selecting nothing is [`MaskTreeError::EmptySelection`]. When every
/// selected channel value is identical the image is returned unchanged.
pub fn color_stretch(image: &Rgb32FImage, mask: &BoolMask, contrast: Option<f32>) -> Result<Rgb32FImage> {
    ensure_image_shape(image, mask, "color stretch")?;

    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for (x, y) in mask.iter_set() {
        for &v in image.get_pixel(x, y).0.iter() {
            lo = lo.min(v);
            hi = hi.max(v);
        }
    }
    if lo > hi {
        return Err(MaskTreeError::EmptySelection);
    }
    if lo == hi {
        return Ok(image.clone());
    }

    let scale = 1.0 / (hi - lo);
    let boost = contrast.filter(|k| *k >= 0.0);
    Ok(Rgb32FImage::from_fn(image.width(), image.height(), |x, y| {
        let amplified = if mask.get(x, y) {
            image.get_pixel(x, y).0.map(|v| (v - lo) * scale)
        } else {
            [0.0; 3]
        };
        Rgb(match boost {
            Some(k) => amplified.map(|v| 1.0 / (1.0 + (-k * v + k / 2.0).exp())),
            None => amplified,
        })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_image() -> Rgb32FImage {
        Rgb32FImage::from_fn(4, 1, |x, _| Rgb([x as f32 * 0.1, 0.2, 0.3]))
    }

    #[test]
    fn test_mean_and_median() {
        let image = gradient_image();
        let mask = BoolMask::from_fn(4, 1, |x, _| x != 1);

        let mean = mean_color(&image, &mask).expect("mean");
        assert!((mean[0] - (0.0 + 0.2 + 0.3) / 3.0).abs() < 1e-6);

        let median = median_color(&image, &mask).expect("median");
        assert!((median[0] - 0.2).abs() < 1e-6);
        assert!((median[1] - 0.2).abs() < 1e-6);

        let even = BoolMask::full(4, 1);
        let median = median_color(&image, &even).expect("median");
        assert!((median[0] - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_empty_selection() {
        let image = gradient_image();
        let empty = BoolMask::new(4, 1);
        assert!(matches!(mean_color(&image, &empty), Err(MaskTreeError::EmptySelection)));
        assert!(matches!(median_color(&image, &empty), Err(MaskTreeError::EmptySelection)));
        assert!(matches!(color_stretch(&image, &empty, None), Err(MaskTreeError::EmptySelection)));
    }

    #[test]
    fn test_shape_mismatch() {
        let image = gradient_image();
        let mask = BoolMask::full(3, 1);
        assert!(matches!(
            mean_color(&image, &mask),
            Err(MaskTreeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_stretch_range_and_outside_zeroed() {
        let image = gradient_image();
        let mask = BoolMask::from_fn(4, 1, |x, _| x < 3);
        let stretched = color_stretch(&image, &mask, None).expect("stretch");

        // selected values span 0.0..=0.3 across all channels
        assert!((stretched.get_pixel(0, 0)[0] - 0.0).abs() < 1e-6);
        assert!((stretched.get_pixel(0, 0)[2] - 1.0).abs() < 1e-6);
        assert_eq!(stretched.get_pixel(3, 0).0, [0.0; 3]);

        let boosted = color_stretch(&image, &mask, Some(10.0)).expect("stretch");
        assert!(boosted.get_pixel(0, 0)[0] < 0.01);
        assert!(boosted.get_pixel(0, 0)[2] > 0.99);
    }

    #[test]
    fn test_stretch_flat_selection_is_unchanged() {
        let image = Rgb32FImage::from_pixel(3, 3, Rgb([0.4, 0.4, 0.4]));
        let stretched = color_stretch(&image, &BoolMask::full(3, 3), Some(10.0)).expect("stretch");
        assert_eq!(stretched, image);
    }
}
