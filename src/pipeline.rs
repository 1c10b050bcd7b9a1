//! End-to-end album assembly.
//!
//! Orchestrates one batch: load the catalog once, walk the input folder
//! (either a single album of JPEGs or a folder of album folders), push every
//! photo through identity → catalog merge → renditions → commerce, fold the
//! results into albums, and write the manifest exactly once at the end.
//!
//! Per photo, in order:
//!
//! 1. EXIF fields and capture time are read and reported.
//! 2. The identity is derived from the capture time and the filename stem —
//!    before any IPTC title override, so retitling in a photo editor never
//!    changes the ID.
//! 3. The original is archived under the identity stem.
//! 4. IPTC title/caption override the filename-derived title; catalog
//!    values then override both.
//! 5. The rendition ladder is generated and uploaded.
//! 6. If the photo is eligible, commerce reconciliation returns its
//!    payment link.
//!
//! Photos and albums are processed in directory-enumeration order. Nothing
//! here relies on that order — every per-photo operation is idempotent — so
//! it is left platform-defined rather than sorted.

use crate::catalog::{Catalog, CatalogError};
use crate::commerce::{CommerceApi, CommerceError, PhotoListing, ReconcileSettings, Reconciler};
use crate::config::RunConfig;
use crate::identity::derive_id;
use crate::iptc::read_iptc;
use crate::metadata::{MetadataError, read_photo_metadata};
use crate::renditions::{RenditionError, archive_original, generate_renditions};
use crate::storage::{BlobStore, StorageError};
use crate::types::{Album, AlbumGroup, Picture};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum rendition width offered as a checkout-page thumbnail.
const THUMBNAIL_MAX_WIDTH: u32 = 1000;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),
    #[error("Rendition error: {0}")]
    Rendition(#[from] RenditionError),
    #[error("Commerce error: {0}")]
    Commerce(#[from] CommerceError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// One configured batch run. Collaborators are injected so tests can swap
/// the commerce API and blob store for in-memory doubles.
pub struct Pipeline<'a> {
    config: &'a RunConfig,
    catalog: Catalog,
    reconciler: Option<Reconciler<'a>>,
    store: Option<&'a dyn BlobStore>,
}

impl<'a> Pipeline<'a> {
    /// Load the catalog and preload the remote product index.
    pub fn new(
        config: &'a RunConfig,
        api: Option<&'a dyn CommerceApi>,
        store: Option<&'a dyn BlobStore>,
    ) -> Result<Self, PipelineError> {
        let catalog = match &config.catalog.dir {
            Some(dir) => {
                let catalog = Catalog::load(dir)?;
                println!(
                    "Loaded catalog: {} known pictures from {}",
                    catalog.picture_count(),
                    dir.display()
                );
                catalog
            }
            None => Catalog::empty(),
        };

        let reconciler = match api {
            Some(api) if config.commerce.enabled => Some(Reconciler::new(
                api,
                ReconcileSettings {
                    update_products: config.commerce.update_products,
                    currency: config.commerce.currency.clone(),
                    unit_amount: config.commerce.unit_amount,
                    not_for_sale: config.commerce.not_for_sale.clone(),
                },
            )?),
            _ => None,
        };

        Ok(Self {
            config,
            catalog,
            reconciler,
            store,
        })
    }

    /// Process the whole batch and write the manifest.
    ///
    /// An input folder containing subfolders becomes an [`AlbumGroup`]
    /// (`group.json`); a flat folder of photos becomes a single [`Album`]
    /// (`album.json`).
    pub fn run(
        &mut self,
        input: &Path,
        output: &Path,
        base_url: &str,
    ) -> Result<(), PipelineError> {
        let base_url = base_url.trim_end_matches('/');
        fs::create_dir_all(output)?;

        let subfolders: Vec<PathBuf> = fs::read_dir(input)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_dir())
            .collect();

        if subfolders.is_empty() {
            let album = self.build_album(input, output, base_url.to_string())?;
            write_manifest(&output.join("album.json"), &album)
        } else {
            let mut group = AlbumGroup {
                title: folder_name(input),
                ..AlbumGroup::default()
            };
            for subfolder in &subfolders {
                let name = folder_name(subfolder).to_lowercase();
                let album = self.build_album(
                    subfolder,
                    &output.join(&name),
                    format!("{base_url}/{name}"),
                )?;
                group.albums.push(album);
            }
            write_manifest(&output.join("group.json"), &group)
        }
    }

    fn build_album(
        &mut self,
        dir: &Path,
        out_dir: &Path,
        base_url: String,
    ) -> Result<Album, PipelineError> {
        println!("Processing album: {}", folder_name(dir));

        let mut album = Album {
            title: folder_name(dir).to_lowercase(),
            base_url,
            ..Album::default()
        };
        album.pictures = self.process_photos(dir, out_dir, &album.base_url)?;
        if album.pictures.iter().any(|p| p.payment_link.is_some()) {
            album.outputs = vec!["html".to_string(), "purchase".to_string()];
        }
        self.catalog.merge_album(&mut album);
        Ok(album)
    }

    fn process_photos(
        &mut self,
        dir: &Path,
        out_dir: &Path,
        base_url: &str,
    ) -> Result<Vec<Picture>, PipelineError> {
        fs::create_dir_all(out_dir)?;
        let cloud_path = cloud_path(&self.config.storage.public_root, base_url);

        let mut pictures = Vec::new();
        for file in jpeg_files(dir)? {
            pictures.push(self.process_photo(&file, out_dir, base_url, &cloud_path)?);
        }
        Ok(pictures)
    }

    fn process_photo(
        &mut self,
        file: &Path,
        out_dir: &Path,
        base_url: &str,
        cloud_path: &str,
    ) -> Result<Picture, PipelineError> {
        let stem_title = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        println!("  {stem_title}");

        let file_size_mb = fs::metadata(file)?.len() / 1_048_576;
        let (width, height) = image::image_dimensions(file)?;
        let meta = read_photo_metadata(file)?;
        if let Some(ts) = meta.capture_time {
            println!("    captured {ts}");
        }

        // Identity is seeded by the title at discovery (the filename stem),
        // never the IPTC title, so curation doesn't move the ID.
        let unique_id = derive_id(
            meta.capture_time,
            &stem_title,
            self.config.secrets.hash_key.as_bytes(),
        );

        if self.config.renditions.enabled {
            archive_original(file, out_dir, &unique_id, self.store)?;
        }

        let iptc = read_iptc(file);
        let mut picture = Picture {
            title: iptc.title.unwrap_or(stem_title),
            unique_id,
            caption: iptc.caption.unwrap_or_default(),
            camera: meta.camera,
            lens: meta.lens,
            focal_length: meta.focal_length,
            f_stop: meta.f_stop,
            date_time_original: meta.capture_time,
            ..Picture::default()
        };
        self.catalog.merge_picture(&mut picture);

        if self.config.renditions.enabled {
            picture.links = generate_renditions(
                file,
                out_dir,
                base_url,
                &cloud_path.to_string(),
                &self.config.renditions.widths,
                self.config.renditions.quality,
                self.store,
            )?;
        }

        if let Some(reconciler) = &mut self.reconciler {
            if reconciler.is_eligible(&picture.unique_id, width, height) {
                let thumbnails = picture
                    .links
                    .iter()
                    .filter(|l| l.width <= THUMBNAIL_MAX_WIDTH)
                    .map(|l| l.url.clone())
                    .collect();
                let url = reconciler.reconcile(&PhotoListing {
                    unique_id: picture.unique_id.clone(),
                    title: picture.title.clone(),
                    caption: picture.caption.clone(),
                    file_size_mb,
                    width,
                    height,
                    thumbnails,
                })?;
                picture.payment_link = Some(url);
            }
        }

        Ok(picture)
    }
}

/// The logical blob path for an album: its base URL with the public CDN
/// root stripped off.
fn cloud_path(public_root: &str, base_url: &str) -> String {
    let root = public_root.trim_end_matches('/');
    base_url
        .strip_prefix(root)
        .filter(|_| !root.is_empty())
        .unwrap_or(base_url)
        .trim_matches('/')
        .to_string()
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn jpeg_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    Ok(fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .map(|e| e.eq_ignore_ascii_case("jpg"))
                    .unwrap_or(false)
        })
        .collect())
}

/// Serialize the finished object graph, echo it for inspection, and write
/// it in one shot — no partial manifests.
fn write_manifest<T: serde::Serialize>(path: &Path, manifest: &T) -> Result<(), PipelineError> {
    let json = serde_json::to_string_pretty(manifest)?;
    println!("{json}");
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commerce::tests::MockCommerce;
    use crate::config::{CommerceConfig, Secrets, StorageConfig};
    use crate::storage::tests::MockStore;
    use crate::test_helpers::write_test_jpeg;
    use tempfile::TempDir;

    const HASH_KEY: &str = "test-hash-key";

    fn test_config() -> RunConfig {
        RunConfig {
            secrets: Secrets {
                hash_key: HASH_KEY.into(),
                ..Secrets::default()
            },
            storage: StorageConfig {
                enabled: false,
                public_root: "https://photos.example.net".into(),
            },
            ..RunConfig::default()
        }
    }

    fn small_widths(config: &mut RunConfig) {
        config.renditions.widths = vec![30, 15];
    }

    #[test]
    fn flat_folder_produces_album_manifest() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_test_jpeg(input.path(), "DSCF1001.jpg", 60, 40);
        write_test_jpeg(input.path(), "DSCF1002.jpg", 60, 40);

        let mut config = test_config();
        small_widths(&mut config);
        let api = MockCommerce::new();
        let mut pipeline = Pipeline::new(&config, Some(&api), None).unwrap();
        pipeline
            .run(input.path(), output.path(), "https://photos.example.net/harbour/")
            .unwrap();

        let manifest = fs::read_to_string(output.path().join("album.json")).unwrap();
        let album: Album = serde_json::from_str(&manifest).unwrap();
        // Trailing slash stripped before URL construction
        assert_eq!(album.base_url, "https://photos.example.net/harbour");
        assert_eq!(album.pictures.len(), 2);
        // Every photo sold: both outputs present
        assert_eq!(album.outputs, vec!["html", "purchase"]);
        for picture in &album.pictures {
            assert_eq!(picture.links.len(), 2);
            assert!(picture.links[0].width > picture.links[1].width);
            assert!(picture.payment_link.is_some());
        }
    }

    #[test]
    fn folder_of_folders_produces_group_manifest() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let sub_a = input.path().join("Harbour");
        let sub_b = input.path().join("Forest");
        fs::create_dir_all(&sub_a).unwrap();
        fs::create_dir_all(&sub_b).unwrap();
        write_test_jpeg(&sub_a, "DSCF1001.jpg", 60, 40);
        write_test_jpeg(&sub_b, "DSCF2001.jpg", 60, 40);

        let mut config = test_config();
        small_widths(&mut config);
        config.commerce.enabled = false;
        let mut pipeline = Pipeline::new(&config, None, None).unwrap();
        pipeline
            .run(input.path(), output.path(), "https://photos.example.net")
            .unwrap();

        let manifest = fs::read_to_string(output.path().join("group.json")).unwrap();
        let group: AlbumGroup = serde_json::from_str(&manifest).unwrap();
        assert_eq!(group.albums.len(), 2);

        let mut base_urls: Vec<&str> =
            group.albums.iter().map(|a| a.base_url.as_str()).collect();
        base_urls.sort();
        assert_eq!(
            base_urls,
            vec![
                "https://photos.example.net/forest",
                "https://photos.example.net/harbour"
            ]
        );
        // Nothing sold, so no outputs were added
        assert!(group.albums.iter().all(|a| a.outputs.is_empty()));
    }

    #[test]
    fn second_run_reuses_commerce_objects() {
        let input = TempDir::new().unwrap();
        write_test_jpeg(input.path(), "DSCF1001.jpg", 60, 40);

        let mut config = test_config();
        small_widths(&mut config);
        let api = MockCommerce::new();

        let run = |output: &Path| -> Album {
            let mut pipeline = Pipeline::new(&config, Some(&api), None).unwrap();
            pipeline.run(input.path(), output, "https://x/a").unwrap();
            serde_json::from_str(&fs::read_to_string(output.join("album.json")).unwrap())
                .unwrap()
        };

        let out1 = TempDir::new().unwrap();
        let out2 = TempDir::new().unwrap();
        let album1 = run(out1.path());
        let album2 = run(out2.path());

        // Identity stable across runs, payment link identical, one of each
        // remote object ever created
        assert_eq!(album1.pictures[0].unique_id, album2.pictures[0].unique_id);
        assert_eq!(album1.pictures[0].payment_link, album2.pictures[0].payment_link);
        assert_eq!(*api.created_products.lock().unwrap(), 1);
        assert_eq!(*api.created_prices.lock().unwrap(), 1);
        assert_eq!(*api.created_links.lock().unwrap(), 1);
    }

    #[test]
    fn catalog_recovers_curated_picture_and_album_fields() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let catalog_dir = TempDir::new().unwrap();
        write_test_jpeg(input.path(), "DSCF1001.jpg", 60, 40);

        // The test JPEG has no EXIF time, so the identity is derivable here
        let id = crate::identity::derive_id(None, "DSCF1001", HASH_KEY.as_bytes());
        fs::write(
            catalog_dir.path().join("harbour.md"),
            format!(
                "# Harbour\n\n{{\"Title\": \"Harbour, revisited\", \"Description\": \"Handwritten.\", \"BaseURL\": \"https://x/a\", \"Featured\": 4, \"Pictures\": [{{\"uniqueID\": \"{id}\", \"Title\": \"The Lighthouse\", \"Caption\": \"Still my favourite\"}}]}}\n"
            ),
        )
        .unwrap();

        let mut config = test_config();
        small_widths(&mut config);
        config.commerce.enabled = false;
        config.catalog.dir = Some(catalog_dir.path().to_path_buf());

        let mut pipeline = Pipeline::new(&config, None, None).unwrap();
        pipeline.run(input.path(), output.path(), "https://x/a").unwrap();

        let album: Album =
            serde_json::from_str(&fs::read_to_string(output.path().join("album.json")).unwrap())
                .unwrap();
        assert_eq!(album.title, "Harbour, revisited");
        assert_eq!(album.description, "Handwritten.");
        assert_eq!(album.featured, 4);
        assert_eq!(album.pictures[0].title, "The Lighthouse");
        assert_eq!(album.pictures[0].caption, "Still my favourite");
    }

    #[test]
    fn renditions_disabled_yields_no_links_but_archives_nothing() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_test_jpeg(input.path(), "DSCF1001.jpg", 60, 40);

        let mut config = test_config();
        config.renditions.enabled = false;
        config.commerce.enabled = false;

        let mut pipeline = Pipeline::new(&config, None, None).unwrap();
        pipeline.run(input.path(), output.path(), "https://x/a").unwrap();

        let album: Album =
            serde_json::from_str(&fs::read_to_string(output.path().join("album.json")).unwrap())
                .unwrap();
        assert!(album.pictures[0].links.is_empty());
        assert!(!output.path().join("originals").exists());
    }

    #[test]
    fn not_for_sale_photo_gets_no_payment_link() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        // Large enough that max(width, height) >= the print threshold
        write_test_jpeg(input.path(), "DSCF1001.jpg", 3200, 2000);

        let mut config = test_config();
        config.renditions.widths = vec![100, 50];
        let id = crate::identity::derive_id(None, "DSCF1001", HASH_KEY.as_bytes());
        config.commerce = CommerceConfig {
            not_for_sale: vec![id],
            ..CommerceConfig::default()
        };

        let api = MockCommerce::new();
        let mut pipeline = Pipeline::new(&config, Some(&api), None).unwrap();
        pipeline.run(input.path(), output.path(), "https://x/a").unwrap();

        let album: Album =
            serde_json::from_str(&fs::read_to_string(output.path().join("album.json")).unwrap())
                .unwrap();
        assert!(album.pictures[0].payment_link.is_none());
        assert!(album.outputs.is_empty());
        assert_eq!(*api.created_products.lock().unwrap(), 0);
    }

    #[test]
    fn uploads_go_to_album_cloud_path() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write_test_jpeg(input.path(), "DSCF1001.jpg", 60, 40);

        let mut config = test_config();
        small_widths(&mut config);
        config.commerce.enabled = false;
        config.storage.enabled = true;

        let store = MockStore::new();
        let mut pipeline = Pipeline::new(&config, None, Some(&store)).unwrap();
        pipeline
            .run(input.path(), output.path(), "https://photos.example.net/harbour")
            .unwrap();

        let uploads = store.recorded();
        // One archived original + two renditions
        assert_eq!(uploads.len(), 3);
        assert!(uploads.iter().any(|(_, c, p)| c == "originals" && p.is_empty()));
        assert_eq!(
            uploads.iter().filter(|(_, c, p)| c == "photos" && p == "harbour").count(),
            2
        );
    }

    #[test]
    fn cloud_path_strips_public_root() {
        assert_eq!(
            cloud_path("https://photos.example.net", "https://photos.example.net/harbour"),
            "harbour"
        );
        // Without a configured root the URL passes through untouched
        assert_eq!(cloud_path("", "https://elsewhere/x"), "https://elsewhere/x");
    }
}
