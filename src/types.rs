//! Shared manifest types.
//!
//! These types define the published JSON shape: the manifest written at the
//! end of a run (`album.json` / `group.json`) and the embedded album records
//! read back from previously-authored catalog documents. Field names are part
//! of the published contract — existing album documents use PascalCase with
//! two legacy exceptions (`uniqueID`, `fStop`) — so renames here would orphan
//! every already-published album.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A named collection of albums, produced when the input path contains
/// subfolders. Written once as `group.json`; never persisted incrementally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct AlbumGroup {
    pub title: String,
    pub description: String,
    pub featured: i64,
    pub albums: Vec<Album>,
}

/// One published album. Identity for catalog-merge purposes is `base_url`:
/// a freshly-scanned album with the same `BaseURL` as a catalog entry is the
/// same album, and the catalog's curated fields (title, description,
/// featured rank) win over the folder-derived ones.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Album {
    /// Publication targets, e.g. `["html", "purchase"]`. Set automatically
    /// when any picture carries a payment link.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub title: String,
    pub description: String,
    #[serde(rename = "BaseURL")]
    pub base_url: String,
    pub featured: i64,
    #[serde(rename = "startDate", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<FixedOffset>>,
    #[serde(rename = "Date", skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<FixedOffset>>,
    pub pictures: Vec<Picture>,
}

/// The atomic unit of the gallery: one source photograph.
///
/// `title` and `caption` are human-editable and recovered from the catalog on
/// re-runs; everything EXIF-derived (`camera`, `lens`, `focal_length`,
/// `f_stop`, `date_time_original`) is recomputed from the current file every
/// run and never merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Picture {
    pub title: String,
    /// Stable keyed-hash identity; see [`crate::identity`]. Doubles as the
    /// remote product key and the archived original's filename stem.
    #[serde(rename = "uniqueID")]
    pub unique_id: String,
    pub caption: String,
    pub latitude: String,
    pub longitude: String,
    pub camera: String,
    pub lens: String,
    pub focal_length: String,
    #[serde(rename = "fStop")]
    pub f_stop: String,
    /// Capture time with offset when the file carried one.
    pub date_time_original: Option<DateTime<FixedOffset>>,
    /// Resized renditions, largest first.
    pub links: Vec<Link>,
    /// Purchase URL; present only when the photo was reconciled for sale.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
}

/// One resized rendition: where it was published and the pixel dimensions
/// actually written (not the requested width — encoders round).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct Link {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picture_serializes_published_field_names() {
        let pic = Picture {
            title: "Dusk".into(),
            unique_id: "abc123".into(),
            f_stop: "2.8".into(),
            ..Picture::default()
        };
        let json = serde_json::to_value(&pic).unwrap();
        assert_eq!(json["Title"], "Dusk");
        assert_eq!(json["uniqueID"], "abc123");
        assert_eq!(json["fStop"], "2.8");
        // Absent payment link is omitted entirely
        assert!(json.get("PaymentLink").is_none());
        // Absent capture time serializes as an explicit null
        assert!(json["DateTimeOriginal"].is_null());
    }

    #[test]
    fn album_round_trips_through_json() {
        let album = Album {
            title: "harbour".into(),
            base_url: "https://photos.example.net/harbour".into(),
            featured: 2,
            pictures: vec![Picture::default()],
            ..Album::default()
        };
        let json = serde_json::to_string(&album).unwrap();
        let back: Album = serde_json::from_str(&json).unwrap();
        assert_eq!(back.base_url, album.base_url);
        assert_eq!(back.featured, 2);
        assert_eq!(back.pictures.len(), 1);
    }

    #[test]
    fn album_tolerates_sparse_catalog_documents() {
        // Old hand-authored documents omit most fields
        let back: Album =
            serde_json::from_str(r#"{"Title":"old","BaseURL":"https://x/y"}"#).unwrap();
        assert_eq!(back.title, "old");
        assert!(back.pictures.is_empty());
        assert_eq!(back.featured, 0);
    }

    #[test]
    fn group_serializes_albums_in_order() {
        let group = AlbumGroup {
            title: "2024".into(),
            albums: vec![
                Album {
                    title: "a".into(),
                    ..Album::default()
                },
                Album {
                    title: "b".into(),
                    ..Album::default()
                },
            ],
            ..AlbumGroup::default()
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["Albums"][0]["Title"], "a");
        assert_eq!(json["Albums"][1]["Title"], "b");
    }
}
