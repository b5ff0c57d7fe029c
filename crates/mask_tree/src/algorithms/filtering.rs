use tracing::debug;

use crate::{config::SegmentationConfig, grid::BoolMask};

/// Accepted regions of one segmentation pass plus everything that was turned
/// away.
#[derive(Debug, Clone, PartialEq)]
pub struct Segmentation {
    pub segments: Vec<BoolMask>,
    pub remainder: BoolMask,
}

impl Segmentation {
    /// Apply the border, minimum-area and containment filters to raw
    /// candidate regions.
    ///
    /// Border-touching and undersized candidates are merged into the
    /// remainder. Survivors have their holes filled; one whose pixels all lie
    /// inside another survivor is then dropped, and only reaches the remainder
    /// when `fold_duplicates_into_remainder` is set.
    pub fn from_candidates(
        candidates: Vec<BoolMask>,
        (width, height): (u32, u32),
        config: &SegmentationConfig,
    ) -> Self {
        let total = candidates.len();
        let mut remainder = BoolMask::new(width, height);
        let mut kept = Vec::new();
        let (mut on_border, mut too_small) = (0usize, 0usize);

        for candidate in candidates {
            if candidate.touches_opposite_borders(config.border_offset, 0) {
                on_border += 1;
                remainder.union_assign(&candidate);
                continue;
            }
            if candidate.count() < config.min_area {
                too_small += 1;
                remainder.union_assign(&candidate);
                continue;
            }
            kept.push(candidate.fill_holes());
        }

        let areas: Vec<usize> = kept.iter().map(BoolMask::count).collect();
        let subsumed: Vec<bool> = (0..kept.len())
            .map(|i| {
                (0..kept.len()).any(|j| i != j && kept[i].intersection_count(&kept[j]) == areas[i])
            })
            .collect();

        let mut segments = Vec::with_capacity(kept.len());
        let mut duplicates = 0usize;
        for (mask, drop) in kept.into_iter().zip(subsumed) {
            if drop {
                duplicates += 1;
                if config.fold_duplicates_into_remainder {
                    remainder.union_assign(&mask);
                }
            } else {
                segments.push(mask);
            }
        }

        debug!(
            total,
            accepted = segments.len(),
            on_border,
            too_small,
            duplicates,
            "filtered segmentation candidates"
        );

        Self { segments, remainder }
    }

    /// Union of every accepted segment and the remainder.
    pub fn coverage(&self) -> BoolMask {
        self.segments
            .iter()
            .fold(self.remainder.clone(), |acc, s| acc.union(s))
    }
}
