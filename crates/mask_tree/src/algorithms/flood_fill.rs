use image::Rgb32FImage;
use tracing::debug;

use crate::{
    color::{color_stretch, ensure_image_shape},
    config::SegmentationConfig,
    error::{MaskTreeError, Result},
    grid::BoolMask,
    traits::Segmenter,
};

/// Growth radius of each flood iteration, in 4-connected steps.
const GROWTH_STEPS: u8 = 2;

/// Region growing by color distance to the seed pixel.
#[derive(Debug, Clone, Default)]
pub struct FloodFillSegmenter {
    config: SegmentationConfig,
}

impl FloodFillSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    /// Grow the region around `seed` (as `(x, y)`) inside `candidate`.
    ///
    /// Every iteration looks at the pixels within two steps of the region
    /// that are still candidates. Those closer than the tolerance to the seed
    /// color join; the rest are struck from the candidates for good. Growth
    /// stops once an iteration adds nothing.
    pub fn flood(&self, image: &Rgb32FImage, candidate: &BoolMask, seed: (u32, u32)) -> Result<BoolMask> {
        ensure_image_shape(image, candidate, "flood fill")?;
        let (sx, sy) = seed;
        if !candidate.get(sx, sy) {
            return Err(MaskTreeError::InvalidSeed { x: sx, y: sy });
        }

        let (width, height) = candidate.dimensions();
        let seed_color = image.get_pixel(sx, sy).0;
        let tolerance = self.config.tolerance;

        let mut accepted = BoolMask::new(width, height);
        accepted.set(sx, sy, true);
        let mut candidate = candidate.clone();

        // pixels reached this iteration carry its stamp, so each is looked at once
        let mut stamp = vec![0u32; width as usize * height as usize];
        let mut newest = vec![seed];
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            let frontier = expand(&newest, &accepted, &candidate, &mut stamp, iteration);
            if frontier.is_empty() {
                break;
            }

            newest.clear();
            for (x, y) in frontier {
                let p = image.get_pixel(x, y).0;
                let distance = p
                    .iter()
                    .zip(&seed_color)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt();
                if distance < tolerance {
                    newest.push((x, y));
                } else {
                    candidate.set(x, y, false);
                }
            }

            if newest.is_empty() {
                break;
            }
            for &(x, y) in &newest {
                accepted.set(x, y, true);
            }
        }

        debug!(seed = ?seed, iterations = iteration, "flood fill finished");
        Ok(accepted)
    }
}

/// Candidate pixels within `GROWTH_STEPS` of the most recently accepted
/// pixels, stepping only through candidates that are not yet accepted.
///
/// Older accepted pixels need no revisit: everything within reach of them was
/// decided in an earlier iteration, and candidates only ever shrink.
fn expand(
    sources: &[(u32, u32)],
    accepted: &BoolMask,
    candidate: &BoolMask,
    stamp: &mut [u32],
    iteration: u32,
) -> Vec<(u32, u32)> {
    let (width, height) = accepted.dimensions();
    let mut frontier = Vec::new();
    let mut ring: Vec<(u32, u32)> = sources.to_vec();

    for _ in 0..GROWTH_STEPS {
        let mut next = Vec::new();
        for &(x, y) in &ring {
            let neighbours = [
                (x.wrapping_sub(1), y),
                (x + 1, y),
                (x, y.wrapping_sub(1)),
                (x, y + 1),
            ];
            for (nx, ny) in neighbours {
                if nx >= width || ny >= height {
                    continue;
                }
                let i = ny as usize * width as usize + nx as usize;
                if stamp[i] == iteration || accepted.get(nx, ny) || !candidate.get(nx, ny) {
                    continue;
                }
                stamp[i] = iteration;
                next.push((nx, ny));
                frontier.push((nx, ny));
            }
        }
        ring = next;
    }

    frontier
}

impl Segmenter for FloodFillSegmenter {
    fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    fn segment(&self, image: &Rgb32FImage, mask: &BoolMask) -> Result<Vec<BoolMask>> {
        let stretched = color_stretch(image, mask, self.config.contrast)?;

        let mut remaining = mask.clone();
        let mut regions = Vec::new();
        let mut cursor = 0usize;
        while let Some((index, seed)) = remaining.first_set_from(cursor) {
            let region = self.flood(&stretched, &remaining, seed)?;
            remaining.difference_assign(&region);
            regions.push(region);
            cursor = index + 1;
        }

        debug!(regions = regions.len(), "segmented mask");
        Ok(regions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn split_image(right: [f32; 3]) -> Rgb32FImage {
        Rgb32FImage::from_fn(100, 20, |x, _| if x < 50 { Rgb([0.0, 0.0, 0.0]) } else { Rgb(right) })
    }

    fn segmenter(tolerance: f32) -> FloodFillSegmenter {
        FloodFillSegmenter::new(SegmentationConfig {
            min_area: 1,
            tolerance,
            border_offset: 0,
            contrast: None,
            fold_duplicates_into_remainder: false,
        })
    }

    /// Same growth rule written directly with masked dilation.
    fn reference_flood(image: &Rgb32FImage, candidate: &BoolMask, seed: (u32, u32), tolerance: f32) -> BoolMask {
        let seed_color = image.get_pixel(seed.0, seed.1).0;
        let mut accepted = BoolMask::new(candidate.width(), candidate.height());
        accepted.set(seed.0, seed.1, true);
        let mut candidate = candidate.clone();
        loop {
            let frontier = accepted
                .dilate(GROWTH_STEPS as u32, Some(&candidate))
                .difference(&accepted);
            if frontier.is_empty() {
                break;
            }
            let mut grew = false;
            for (x, y) in frontier.iter_set() {
                let p = image.get_pixel(x, y).0;
                let d = p.iter().zip(&seed_color).map(|(a, b)| (a - b) * (a - b)).sum::<f32>().sqrt();
                if d < tolerance {
                    accepted.set(x, y, true);
                    grew = true;
                } else {
                    candidate.set(x, y, false);
                }
            }
            if !grew {
                break;
            }
        }
        accepted
    }

    #[test]
    fn test_tolerance_boundary_is_strict() {
        let image = split_image([0.05, 0.0, 0.0]);
        let everything = BoolMask::full(100, 20);

        let region = segmenter(0.05).flood(&image, &everything, (0, 0)).expect("flood");
        assert_eq!(region.count(), 50 * 20);
        assert!(region.iter_set().all(|(x, _)| x < 50));

        let region = segmenter(0.0501).flood(&image, &everything, (0, 0)).expect("flood");
        assert_eq!(region, everything);
    }

    #[test]
    fn test_flood_respects_candidate_mask() {
        let image = Rgb32FImage::from_pixel(10, 10, Rgb([0.5, 0.5, 0.5]));
        // a wall at x == 4 that is two pixels thick cannot be jumped
        let candidate = BoolMask::from_fn(10, 10, |x, _| x != 4 && x != 5);
        let region = segmenter(0.1).flood(&image, &candidate, (0, 0)).expect("flood");
        assert_eq!(region.count(), 40);
    }

    #[test]
    fn test_flood_reaches_across_single_rejected_pixel() {
        // growth radius is two steps, so one off-color pixel does not block
        let image = Rgb32FImage::from_fn(7, 1, |x, _| if x == 3 { Rgb([1.0, 0.0, 0.0]) } else { Rgb([0.0; 3]) });
        let region = segmenter(0.1).flood(&image, &BoolMask::full(7, 1), (0, 0)).expect("flood");
        assert_eq!(region.count(), 6);
        assert!(!region.get(3, 0));
    }

    #[test]
    fn test_flood_matches_dilation_reference() {
        let image = Rgb32FImage::from_fn(24, 18, |x, y| {
            let v = ((x * 7 + y * 13) % 11) as f32 / 10.0;
            Rgb([v, (x as f32 / 24.0), 0.3])
        });
        let candidate = BoolMask::from_fn(24, 18, |x, y| (x + y) % 9 != 0);
        let seed = candidate.first_set().expect("seed");
        for tolerance in [0.15, 0.3, 0.6] {
            let fast = segmenter(tolerance).flood(&image, &candidate, seed).expect("flood");
            let slow = reference_flood(&image, &candidate, seed, tolerance);
            assert_eq!(fast, slow, "tolerance {tolerance}");
        }
    }

    #[test]
    fn test_invalid_seed() {
        let image = split_image([1.0, 1.0, 1.0]);
        let candidate = BoolMask::new(100, 20);
        assert!(matches!(
            segmenter(0.1).flood(&image, &candidate, (3, 3)),
            Err(MaskTreeError::InvalidSeed { x: 3, y: 3 })
        ));
    }

    #[test]
    fn test_segment_partitions_mask() {
        let image = split_image([1.0, 1.0, 1.0]);
        let mask = BoolMask::from_fn(100, 20, |x, y| x >= 10 && y >= 2);
        let regions = segmenter(0.1).segment(&image, &mask).expect("segment");
        assert_eq!(regions.len(), 2);
        assert!(regions[0].get(10, 2));
        assert!(regions[1].get(50, 2));
        assert_eq!(regions[0].intersection_count(&regions[1]), 0);
        assert_eq!(regions[0].union(&regions[1]), mask);
    }

    #[test]
    fn test_segment_is_deterministic() {
        let image = Rgb32FImage::from_fn(40, 30, |x, y| Rgb([((x / 8 + y / 6) % 3) as f32 / 2.0, 0.2, 0.7]));
        let mask = BoolMask::full(40, 30);
        let first = segmenter(0.2).segment(&image, &mask).expect("segment");
        let second = segmenter(0.2).segment(&image, &mask).expect("segment");
        assert!(first.len() > 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_segment_empty_mask() {
        let image = split_image([1.0, 1.0, 1.0]);
        let empty = BoolMask::new(100, 20);
        assert!(matches!(
            segmenter(0.1).segment(&image, &empty),
            Err(MaskTreeError::EmptySelection)
        ));
    }

    #[test]
    fn test_segment_with_remainder_coverage() {
        let image = Rgb32FImage::from_fn(60, 60, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgb([0.9, 0.1, 0.1])
            } else if (35..38).contains(&x) && (35..38).contains(&y) {
                Rgb([0.1, 0.9, 0.1])
            } else {
                Rgb([0.1, 0.1, 0.9])
            }
        });
        let mask = BoolMask::full(60, 60);
        let segmenter = FloodFillSegmenter::new(SegmentationConfig {
            min_area: 20,
            tolerance: 0.1,
            border_offset: 5,
            contrast: None,
            fold_duplicates_into_remainder: false,
        });
        let result = segmenter.segment_with_remainder(&image, &mask).expect("segment");

        // the background touches every edge, the 3x3 square is too small
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].count(), 400);
        assert_eq!(result.remainder.count(), 60 * 60 - 400);
        assert_eq!(result.coverage(), mask);
    }
}
