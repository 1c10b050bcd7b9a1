//! Catalog loading and curated-field merging.
//!
//! Published albums live as markdown documents with one embedded JSON album
//! record each (the substring between the first `{` and the last `}`). At
//! startup the whole directory is loaded into a read-only index; every photo
//! processed afterwards consults it so that automated re-runs never clobber
//! human edits made to the published documents:
//!
//! - **Pictures** (keyed by `uniqueID`): `Title` and `Caption` are restored
//!   from the catalog; all EXIF-derived fields stay freshly computed.
//! - **Albums** (keyed by `BaseURL`): `Title`, `Description`, and `Featured`
//!   are restored; pictures are always rebuilt from disk.
//!
//! A document that fails to parse is skipped with a note — one mangled file
//! must not take down the whole catalog load. Duplicate `uniqueID`s across
//! documents: first occurrence wins.

use crate::types::{Album, Picture};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only index of previously-published albums and pictures.
///
/// Built once before processing begins; never written back. Merges copy
/// curated fields onto freshly-computed records, not the other way around.
#[derive(Debug, Default)]
pub struct Catalog {
    albums: HashMap<String, Album>,
    pictures: HashMap<String, Picture>,
}

impl Catalog {
    /// An empty catalog: every lookup misses, every merge is a no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load all `*.md` album documents from a directory.
    ///
    /// Unreadable directories and files are fatal; an individual document
    /// that yields no parseable album record is skipped.
    pub fn load(dir: &Path) -> Result<Self, CatalogError> {
        let mut catalog = Self::default();

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_md = path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case("md"))
                    .unwrap_or(false);
            if !is_md {
                continue;
            }

            let content = fs::read_to_string(&path)?;
            match parse_album_document(&content) {
                Some(album) => catalog.index_album(album),
                None => println!("Skipping catalog document {}: no album record", path.display()),
            }
        }

        Ok(catalog)
    }

    fn index_album(&mut self, album: Album) {
        for picture in &album.pictures {
            if !picture.unique_id.is_empty() {
                // First occurrence wins across documents
                self.pictures
                    .entry(picture.unique_id.clone())
                    .or_insert_with(|| picture.clone());
            }
        }
        self.albums
            .entry(album.base_url.clone())
            .or_insert(album);
    }

    pub fn album(&self, base_url: &str) -> Option<&Album> {
        self.albums.get(base_url)
    }

    pub fn picture(&self, unique_id: &str) -> Option<&Picture> {
        self.pictures.get(unique_id)
    }

    pub fn picture_count(&self) -> usize {
        self.pictures.len()
    }

    /// Restore curated album fields from the catalog entry with the same
    /// `BaseURL`, if any. Folder-derived values stand otherwise.
    pub fn merge_album(&self, fresh: &mut Album) {
        if let Some(existing) = self.album(&fresh.base_url) {
            fresh.title = existing.title.clone();
            fresh.description = existing.description.clone();
            fresh.featured = existing.featured;
        }
    }

    /// Restore curated picture fields from the catalog entry with the same
    /// `uniqueID`, if any. EXIF-derived fields are left freshly computed.
    pub fn merge_picture(&self, fresh: &mut Picture) {
        if let Some(existing) = self.picture(&fresh.unique_id) {
            fresh.title = existing.title.clone();
            fresh.caption = existing.caption.clone();
        }
    }
}

/// Extract and parse the album record embedded in a markdown document.
///
/// The record is the substring between the first `{` and the last `}` —
/// front matter and prose around it are ignored.
fn parse_album_document(content: &str) -> Option<Album> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}
