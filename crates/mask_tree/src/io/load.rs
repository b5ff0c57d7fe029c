use std::path::{Path, PathBuf};

use image::Rgb32FImage;
use tracing::{debug, info};

use crate::{error::Result, grid::BoolMask};

/// Open any supported image as 0-1 float RGB.
pub fn load_image(path: impl AsRef<Path>) -> Result<Rgb32FImage> {
    Ok(image::open(path)?.to_rgb32f())
}

/// Open a grayscale or color image as a mask; any nonzero luma is set.
pub fn load_mask(path: impl AsRef<Path>) -> Result<BoolMask> {
    Ok(BoolMask::from_gray_image(&image::open(path)?.to_luma8()))
}

/// Every `.png` in `dir`, sorted by file name.
pub fn mask_paths(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
        if path.is_file() && is_png {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Load every mask in `dir` in file-name order.
pub fn load_mask_dir(dir: impl AsRef<Path>) -> Result<Vec<BoolMask>> {
    let dir = dir.as_ref();
    let masks = mask_paths(dir)?
        .into_iter()
        .map(|path| {
            debug!(path = %path.display(), "loading mask");
            load_mask(path)
        })
        .collect::<Result<Vec<_>>>()?;
    info!(count = masks.len(), dir = %dir.display(), "loaded masks");
    Ok(masks)
}
