//! Shared fixtures for tests.

use image::{Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Write a small gradient JPEG (no EXIF, no IPTC) and return its path.
pub fn write_test_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}
