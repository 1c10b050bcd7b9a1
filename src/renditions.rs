//! Rendition generation: the fixed ladder of resized variants.
//!
//! For each target width the source is resized preserving aspect ratio,
//! encoded as JPEG, written as `{stem}-{width}.jpg` (lowercased), and
//! uploaded to the `photos` container when storage is enabled.
//!
//! ## Compounding resizes
//!
//! The decoded image is resized **in place**: each step operates on the
//! output of the previous one, not on the original. That is why target
//! widths must be strictly decreasing — and why each recorded height
//! reflects the compounded chain of downscales rather than an independent
//! resize from the source. Published dimensions must stay byte-identical
//! across re-runs, so this chain is part of the contract, not an
//! optimization to "fix".
//!
//! The original file itself is archived separately under its identity stem
//! (`originals/{uniqueID}.jpg`) so a purchased download can be served later.

use crate::storage::{BlobStore, StorageError};
use crate::types::Link;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Container for resized renditions.
pub const PHOTOS_CONTAINER: &str = "photos";
/// Container for archived full-resolution originals.
pub const ORIGINALS_CONTAINER: &str = "originals";

#[derive(Error, Debug)]
pub enum RenditionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Target widths must be strictly decreasing, got {0:?}")]
    NonDescendingWidths(Vec<u32>),
}

/// Height that keeps the aspect ratio at `target_width`, rounded to the
/// nearest pixel.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    (f64::from(height) * f64::from(target_width) / f64::from(width)).round() as u32
}

/// Generate the rendition ladder for one photo.
///
/// Returns one [`Link`] per target width, largest first, each carrying the
/// dimensions actually written. Any write or upload failure aborts the
/// photo; nothing is retried.
pub fn generate_renditions(
    source: &Path,
    output_dir: &Path,
    base_url: &str,
    cloud_path: &str,
    widths: &[u32],
    quality: u8,
    store: Option<&dyn BlobStore>,
) -> Result<Vec<Link>, RenditionError> {
    if widths.is_empty() || !widths.windows(2).all(|w| w[0] > w[1]) {
        return Err(RenditionError::NonDescendingWidths(widths.to_vec()));
    }

    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut img = image::open(source)?;
    let mut links = Vec::with_capacity(widths.len());

    for &width in widths {
        let height = scaled_height(img.width(), img.height(), width);
        // Each step feeds the next; see module docs
        img = img.resize_exact(width, height, FilterType::Lanczos3);

        let file_name = format!("{stem}-{width}.jpg");
        let out_path = output_dir.join(&file_name);
        write_jpeg(&img, &out_path, quality)?;

        if let Some(store) = store {
            store.upload(&out_path, PHOTOS_CONTAINER, cloud_path)?;
        }

        links.push(Link {
            url: format!("{base_url}/{file_name}"),
            width: img.width(),
            height: img.height(),
        });
    }

    Ok(links)
}

/// Archive the untouched original under its identity stem and upload it to
/// the originals container root. Overwrites any previous archive copy.
pub fn archive_original(
    source: &Path,
    output_dir: &Path,
    unique_id: &str,
    store: Option<&dyn BlobStore>,
) -> Result<PathBuf, RenditionError> {
    let originals_dir = output_dir.join("originals");
    std::fs::create_dir_all(&originals_dir)?;

    let dest = originals_dir.join(format!("{unique_id}.jpg"));
    std::fs::copy(source, &dest)?;

    if let Some(store) = store {
        store.upload(&dest, ORIGINALS_CONTAINER, "")?;
    }
    Ok(dest)
}

fn write_jpeg(img: &image::DynamicImage, path: &Path, quality: u8) -> Result<(), RenditionError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    img.write_with_encoder(encoder)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::MockStore;
    use crate::test_helpers::write_test_jpeg;
    use tempfile::TempDir;

    #[test]
    fn scaled_height_preserves_aspect() {
        assert_eq!(scaled_height(6000, 4000, 2160), 1440);
        assert_eq!(scaled_height(2160, 1440, 1080), 720);
    }

    #[test]
    fn scaled_height_rounds_to_nearest() {
        // 360 * 220 / 540 = 146.66..
        assert_eq!(scaled_height(540, 360, 220), 147);
    }

    #[test]
    fn compounded_chain_matches_published_dimensions() {
        // The canonical ladder applied to a 6000x4000 source, each step
        // feeding the next exactly as generate_renditions does.
        let (mut w, mut h) = (6000u32, 4000u32);
        let mut heights = Vec::new();
        for target in [2160, 1080, 540, 220] {
            h = scaled_height(w, h, target);
            w = target;
            heights.push(h);
        }
        assert_eq!(heights, vec![1440, 720, 360, 147]);
    }

    #[test]
    fn rejects_non_descending_widths() {
        let dir = TempDir::new().unwrap();
        let source = write_test_jpeg(dir.path(), "DSCF1001.jpg", 60, 40);

        for widths in [vec![], vec![15, 30], vec![30, 30]] {
            let result = generate_renditions(
                &source,
                dir.path(),
                "https://x/a",
                "a",
                &widths,
                90,
                None,
            );
            assert!(matches!(
                result,
                Err(RenditionError::NonDescendingWidths(_))
            ));
        }
    }

    #[test]
    fn generates_descending_ladder_with_actual_dimensions() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_test_jpeg(dir.path(), "DSCF1001.jpg", 60, 40);

        let links = generate_renditions(
            &source,
            out.path(),
            "https://photos.example.net/harbour",
            "harbour",
            &[30, 15],
            90,
            None,
        )
        .unwrap();

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].url, "https://photos.example.net/harbour/dscf1001-30.jpg");
        assert_eq!((links[0].width, links[0].height), (30, 20));
        assert_eq!((links[1].width, links[1].height), (15, 10));
        assert!(links.windows(2).all(|pair| pair[0].width > pair[1].width));
        assert!(out.path().join("dscf1001-30.jpg").exists());
        assert!(out.path().join("dscf1001-15.jpg").exists());
    }

    #[test]
    fn uploads_each_rendition_to_photos_container() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_test_jpeg(dir.path(), "DSCF1001.jpg", 60, 40);
        let store = MockStore::new();

        generate_renditions(
            &source,
            out.path(),
            "https://x/harbour",
            "harbour",
            &[30, 15],
            90,
            Some(&store),
        )
        .unwrap();

        let uploads = store.recorded();
        assert_eq!(uploads.len(), 2);
        assert!(uploads.iter().all(|(_, container, path)| {
            container == PHOTOS_CONTAINER && path == "harbour"
        }));
    }

    #[test]
    fn archive_original_copies_under_identity_stem() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_test_jpeg(dir.path(), "DSCF1001.jpg", 60, 40);
        let store = MockStore::new();

        let dest = archive_original(&source, out.path(), "abc123", Some(&store)).unwrap();
        assert!(dest.ends_with("originals/abc123.jpg"));
        assert!(dest.exists());

        // Re-archiving replaces silently
        archive_original(&source, out.path(), "abc123", None).unwrap();

        let uploads = store.recorded();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, ORIGINALS_CONTAINER);
        assert_eq!(uploads[0].2, "");
    }
}
