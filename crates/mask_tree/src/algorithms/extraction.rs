use geo::Area;
use imageproc::contours::find_contours;
use tracing::debug;

use crate::{
    error::{MaskTreeError, Result},
    grid::BoolMask,
    types::{Ring, ring_to_polygon},
};

/// Outer boundary of a mask as a ring of `[row, column]` points.
///
/// The mask is padded with `pad` background pixels before tracing so regions
/// touching the image edge still close. Of all traced borders (outer and
/// hole) the one enclosing the largest area is kept; runs of collinear points
/// are collapsed.
pub fn to_polygon(mask: &BoolMask, pad: u32) -> Result<Ring> {
    if mask.is_empty() {
        return Err(MaskTreeError::EmptySelection);
    }

    let padded = mask.to_padded_gray_image(pad);
    let contours = find_contours::<i32>(&padded);
    debug!(contours = contours.len(), "traced mask borders");

    let offset = pad as f64;
    contours
        .into_iter()
        .map(|contour| {
            let ring: Ring = contour
                .points
                .iter()
                .map(|p| [p.y as f64 - offset, p.x as f64 - offset])
                .collect();
            compress_collinear(ring)
        })
        .filter(|ring| ring.len() >= 3)
        .map(|ring| (ring_to_polygon(&ring).unsigned_area(), ring))
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, ring)| ring)
        .ok_or(MaskTreeError::NoShape)
}

/// Drop points lying on the straight segment between their neighbours.
fn compress_collinear(ring: Ring) -> Ring {
    if ring.len() < 3 {
        return ring;
    }
    let n = ring.len();
    let kept: Ring = (0..n)
        .filter(|&i| {
            let [ax, ay] = ring[(i + n - 1) % n];
            let [bx, by] = ring[i];
            let [cx, cy] = ring[(i + 1) % n];
            let cross = (bx - ax) * (cy - by) - (by - ay) * (cx - bx);
            let backtrack = (bx - ax) * (cx - bx) + (by - ay) * (cy - by) < 0.0;
            cross != 0.0 || backtrack
        })
        .map(|i| ring[i])
        .collect();
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(w: u32, h: u32, x0: u32, y0: u32, rw: u32, rh: u32) -> BoolMask {
        BoolMask::from_fn(w, h, |x, y| x >= x0 && x < x0 + rw && y >= y0 && y < y0 + rh)
    }

    fn sorted(mut ring: Ring) -> Ring {
        ring.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        ring
    }

    #[test]
    fn test_rectangle_corners_in_row_column_order() {
        // 8 columns wide, 4 rows tall, top-left pixel at x = 3, y = 2
        let ring = to_polygon(&rect(20, 20, 3, 2, 8, 4), 5).expect("ring");
        assert_eq!(
            sorted(ring),
            vec![[2.0, 3.0], [2.0, 10.0], [5.0, 3.0], [5.0, 10.0]]
        );
    }

    #[test]
    fn test_region_on_image_edge_closes() {
        let ring = to_polygon(&rect(10, 10, 0, 0, 10, 4), 5).expect("ring");
        assert_eq!(
            sorted(ring),
            vec![[0.0, 0.0], [0.0, 9.0], [3.0, 0.0], [3.0, 9.0]]
        );
    }

    #[test]
    fn test_largest_of_several_regions() {
        let mask = rect(30, 30, 1, 1, 3, 3).union(&rect(30, 30, 10, 10, 12, 12));
        let ring = to_polygon(&mask, 5).expect("ring");
        let area = ring_to_polygon(&ring).unsigned_area();
        assert!((area - 121.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_masks() {
        let empty = BoolMask::new(5, 5);
        assert!(matches!(to_polygon(&empty, 5), Err(MaskTreeError::EmptySelection)));

        let mut dot = BoolMask::new(5, 5);
        dot.set(2, 2, true);
        assert!(matches!(to_polygon(&dot, 5), Err(MaskTreeError::NoShape)));

        let line = rect(5, 5, 0, 2, 5, 1);
        assert!(matches!(to_polygon(&line, 5), Err(MaskTreeError::NoShape)));
    }

    #[test]
    fn test_compress_keeps_spikes() {
        let ring = vec![[0.0, 0.0], [0.0, 1.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]];
        assert_eq!(
            compress_collinear(ring),
            vec![[0.0, 0.0], [0.0, 2.0], [2.0, 2.0], [2.0, 0.0]]
        );
    }
}
