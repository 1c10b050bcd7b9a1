//! gallery-maker turns folders of edited JPEGs into publishable albums:
//! resized renditions, durable blob storage, commerce objects, and a JSON
//! manifest tying it all together.
//!
//! ## How a run works
//!
//! Point it at a folder of JPEGs (one album) or a folder of folders (an
//! album group), an output folder, and the public base URL the album will
//! be served from. For every photo it:
//!
//! 1. reads EXIF (camera, lens, aperture, capture time) and IPTC
//!    (title, caption),
//! 2. derives a stable `uniqueID` from the capture time and filename,
//! 3. merges any hand-curated titles and captions from the catalog,
//! 4. generates the rendition ladder and archives the original,
//! 5. uploads everything to blob storage,
//! 6. reconciles product, price, and payment link with the commerce
//!    account,
//!
//! then writes `album.json` (or `group.json`) describing the result.
//!
//! Runs repeat on the same photos. Every step is an idempotent upsert, so
//! re-running after a curation pass refreshes what changed and recreates
//! nothing.
//!
//! ## Module map
//!
//! | Module       | Responsibility                                     |
//! |--------------|----------------------------------------------------|
//! | [`types`]    | Album/picture object graph and its JSON shape      |
//! | [`identity`] | Keyed-hash `uniqueID` derivation                   |
//! | [`catalog`]  | Loading and merging previously-published albums    |
//! | [`metadata`] | EXIF extraction and formatting                     |
//! | [`iptc`]     | IPTC title/caption extraction from JPEG APP13      |
//! | [`renditions`] | The resize ladder and original archiving         |
//! | [`storage`]  | Blob uploads behind the [`storage::BlobStore`] seam |
//! | [`commerce`] | Product/price/payment-link reconciliation          |
//! | [`config`]   | TOML configuration and secrets                     |
//! | [`pipeline`] | Orchestration and manifest writing                 |

pub mod catalog;
pub mod commerce;
pub mod config;
pub mod identity;
pub mod iptc;
pub mod metadata;
pub mod pipeline;
pub mod renditions;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
