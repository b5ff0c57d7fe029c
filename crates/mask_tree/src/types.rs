use geo_types::{Coord, LineString, Polygon};
use image::Rgb;

/// Representative color, three channels in the 0–1 range.
pub type Color = [f32; 3];

/// Closed polygon boundary as `[row, column]` points. The last point need not
/// repeat the first.
pub type Ring = Vec<[f64; 2]>;

/// Scale a 0–1 color to 8-bit channels, truncating like an integer cast.
pub fn color_to_rgb8(color: Color) -> Rgb<u8> {
    Rgb(color.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8))
}

/// Black stands in for nodes that never received a color.
pub fn color_or_black(color: Option<Color>) -> Rgb<u8> {
    color.map(color_to_rgb8).unwrap_or(Rgb([0, 0, 0]))
}

/// Ring → geo polygon (x = row, y = column); geo closes the ring itself.
pub fn ring_to_polygon(ring: &[[f64; 2]]) -> Polygon<f64> {
    let coords: Vec<Coord<f64>> = ring.iter().map(|&[x, y]| Coord { x, y }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Exterior of a geo polygon back to a ring, dropping the closing point.
pub fn polygon_to_ring(polygon: &Polygon<f64>) -> Ring {
    let mut ring: Ring = polygon.exterior().coords().map(|c| [c.x, c.y]).collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}
