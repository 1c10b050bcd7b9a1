//! Stable photo identity derivation.
//!
//! Every photo gets a `uniqueID` that survives re-runs: a keyed hash of its
//! capture timestamp and its title at discovery time (the filename stem).
//! The ID keys the catalog merge, names the archived original, and keys the
//! remote commerce product — so the same physical photo stays associated with
//! the same product, price, and payment link across runs, while a replaced
//! file (different EXIF content) gets a fresh identity.
//!
//! This is not a security boundary. Reversibility is irrelevant; only
//! determinism and collision avoidance matter. The key exists so that IDs
//! aren't guessable from public filenames, which keeps direct-download URLs
//! for purchased originals private.
//!
//! ## Seed construction
//!
//! `"<timestamp><title>"`, where the timestamp is the capture time rendered
//! in universal sortable form in UTC (`YYYY-MM-DD HH:MM:SSZ`), or the empty
//! string when the file carries no capture time. Two photos that share a
//! filename and both lack EXIF time therefore collide — accepted behavior,
//! not defended against.

use chrono::{DateTime, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Universal sortable timestamp form, rendered in UTC.
const SEED_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%SZ";

/// Derive the stable identity for a photo.
///
/// Deterministic: the same `(capture_time, title, key)` always produces the
/// same 32-character lowercase hex string.
pub fn derive_id(capture_time: Option<DateTime<FixedOffset>>, title: &str, key: &[u8]) -> String {
    let seed = match capture_time {
        Some(ts) => format!(
            "{}{}",
            ts.with_timezone(&Utc).format(SEED_TIME_FORMAT),
            title
        ),
        None => title.to_string(),
    };

    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(seed.as_bytes());
    format!("{:x}", mac.finalize().into_bytes())
}
