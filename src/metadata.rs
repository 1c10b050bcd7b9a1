//! EXIF field extraction and display formatting.
//!
//! Everything here is recomputed from the current file on every run — none
//! of it is merged from the catalog. The raw Exif IFD values need a fair bit
//! of massaging before they are fit for a gallery page:
//!
//! - **Camera**: make + model, deduplicated when the model already repeats
//!   the make (`"FUJIFILM" + "FUJIFILM X-T5"` → `"FUJIFILM X-T5"`).
//! - **Lens**: lens make + model, with the common `55mmF1.8` spelling
//!   expanded to `55mm F1.8`.
//! - **Focal length**: reported only for zoom lenses (a prime's focal length
//!   is already in the lens name), flattened from the EXIF rational.
//! - **f-stop**: EXIF rational flattened, so `28/10` displays as `2.8`.
//! - **Capture time**: `DateTimeOriginal`, combined with
//!   `OffsetTimeOriginal` when present; offset-less times are interpreted in
//!   the local zone.
//!
//! Files without an Exif segment are normal (exports often strip it); they
//! yield empty display fields and no capture time.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use exif::{In, Tag, Value};
use regex::Regex;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Zoom lenses carry a range in their model name, e.g. `16-80mm`.
static ZOOM_LENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d.-\d.mm").expect("zoom lens pattern is valid"));

/// EXIF-derived fields for one photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoMetadata {
    pub camera: String,
    pub lens: String,
    pub focal_length: String,
    pub f_stop: String,
    pub capture_time: Option<DateTime<FixedOffset>>,
}

/// Read and format the EXIF fields of a photo.
///
/// A missing file is an error; a file without a parseable Exif segment is
/// not — it produces default (empty) metadata.
pub fn read_photo_metadata(path: &Path) -> Result<PhotoMetadata, MetadataError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(&file);
    let exif = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif) => exif,
        Err(_) => return Ok(PhotoMetadata::default()),
    };

    let ascii = |tag: Tag| -> Option<String> {
        exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Ascii(v) => v.first().map(|bytes| {
                String::from_utf8_lossy(bytes)
                    .trim_end_matches('\0')
                    .trim()
                    .to_string()
            }),
            _ => None,
        })
    };
    let rational = |tag: Tag| -> Option<String> {
        exif.get_field(tag, In::PRIMARY).and_then(|f| match &f.value {
            Value::Rational(v) => v.first().map(|r| format!("{}/{}", r.num, r.denom)),
            _ => None,
        })
    };

    let camera = camera_name(ascii(Tag::Make).as_deref(), ascii(Tag::Model).as_deref());
    let lens = lens_info(
        ascii(Tag::LensMake).as_deref(),
        ascii(Tag::LensModel).as_deref(),
    );

    // Primes carry their focal length in the lens name already
    let focal_length = if ZOOM_LENS.is_match(&lens) {
        rational(Tag::FocalLength)
            .map(|f| flatten_fraction(&f))
            .unwrap_or_default()
    } else {
        String::new()
    };

    let f_stop = rational(Tag::FNumber)
        .map(|f| flatten_fraction(&f))
        .unwrap_or_default();

    let capture_time = ascii(Tag::DateTimeOriginal)
        .and_then(|dt| parse_capture_time(&dt, ascii(Tag::OffsetTimeOriginal).as_deref()));

    Ok(PhotoMetadata {
        camera,
        lens,
        focal_length,
        f_stop,
        capture_time,
    })
}

/// Compose the display camera name from make and model.
pub fn camera_name(make: Option<&str>, model: Option<&str>) -> String {
    let make = make.unwrap_or("").trim();
    let model = model.unwrap_or("").trim();

    if make.is_empty() {
        return model.to_string();
    }
    if model.is_empty() {
        return make.to_string();
    }
    if model.contains(make) {
        model.to_string()
    } else {
        format!("{make} {model}")
    }
}

/// Compose the display lens name from lens make and model.
pub fn lens_info(make: Option<&str>, model: Option<&str>) -> String {
    let mut lens = make.unwrap_or("").trim().to_string();
    if let Some(model) = model {
        if !lens.is_empty() {
            lens.push(' ');
        }
        // "55mmF1.8" is how several vendors spell it
        lens.push_str(&model.replace("mmF", "mm F"));
    }
    lens
}

/// Flatten an EXIF fraction string to its decimal form.
///
/// `"5500/100"` → `"55"`, `"28/10"` → `"2.8"`. Strings without a slash, and
/// strings whose parts don't parse, come back unchanged. Division follows
/// float semantics, so a `0/0` fraction renders as `NaN` rather than
/// aborting the run.
pub fn flatten_fraction(fraction: &str) -> String {
    let Some((num, denom)) = fraction.split_once('/') else {
        return fraction.to_string();
    };
    match (num.trim().parse::<i64>(), denom.trim().parse::<i64>()) {
        (Ok(num), Ok(denom)) => format!("{}", num as f64 / denom as f64),
        _ => fraction.to_string(),
    }
}

/// Parse an EXIF capture timestamp (`YYYY:MM:DD HH:MM:SS`), attaching the
/// original offset when the file recorded one and the local zone otherwise.
pub fn parse_capture_time(datetime: &str, offset: Option<&str>) -> Option<DateTime<FixedOffset>> {
    match offset {
        Some(offset) => DateTime::parse_from_str(
            &format!("{datetime} {offset}"),
            "%Y:%m:%d %H:%M:%S %:z",
        )
        .ok(),
        None => {
            let naive = NaiveDateTime::parse_from_str(datetime, "%Y:%m:%d %H:%M:%S").ok()?;
            Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.fixed_offset())
        }
    }
}
