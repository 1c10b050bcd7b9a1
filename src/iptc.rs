//! Minimal IPTC-IIM reader for JPEG files.
//!
//! Pulls the two fields photographers actually curate in Lightroom/Capture
//! One: ObjectName (2:05, the "Title" field) and Caption-Abstract (2:120,
//! the "Caption" field). Both override the mechanical filename-derived title
//! during processing — but only for display; identity derivation happens
//! before this override so renaming a title in Lightroom doesn't change the
//! photo's `uniqueID`.
//!
//! JPEG stores IPTC inside the APP13 marker as a Photoshop 8BIM resource
//! (id 0x0404) whose payload is raw IIM datasets. Parse failures of any kind
//! degrade to empty metadata; a photo without curated fields is normal.

use std::path::Path;

/// Curated metadata embedded in a photo file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IptcFields {
    pub title: Option<String>,
    pub caption: Option<String>,
}

/// Read IPTC title/caption from a JPEG file. Missing files, non-JPEG data,
/// and absent APP13 segments all yield empty fields.
pub fn read_iptc(path: &Path) -> IptcFields {
    match std::fs::read(path) {
        Ok(bytes) => find_app13_iptc(&bytes)
            .map(parse_iim_datasets)
            .unwrap_or_default(),
        Err(_) => IptcFields::default(),
    }
}

const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const RESOURCE_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

const DATASET_OBJECT_NAME: u8 = 5;
const DATASET_CAPTION: u8 = 120;

/// Parse raw IIM bytes. Each dataset is:
/// `0x1C | record | dataset | len (be u16) | data`.
/// Only Record 2 (Application Record) matters here.
fn parse_iim_datasets(data: &[u8]) -> IptcFields {
    let mut fields = IptcFields::default();
    let mut pos = 0;

    while pos + 5 <= data.len() {
        if data[pos] != 0x1C {
            pos += 1;
            continue;
        }
        let record = data[pos + 1];
        let dataset = data[pos + 2];
        let len = u16::from_be_bytes([data[pos + 3], data[pos + 4]]) as usize;
        pos += 5;
        if pos + len > data.len() {
            break;
        }

        if record == 2 {
            let value = String::from_utf8_lossy(&data[pos..pos + len])
                .trim()
                .to_string();
            if !value.is_empty() {
                match dataset {
                    DATASET_OBJECT_NAME => fields.title = Some(value),
                    DATASET_CAPTION => fields.caption = Some(value),
                    _ => {}
                }
            }
        }
        pos += len;
    }

    fields
}

/// Walk the JPEG marker stream for an APP13 segment carrying the IPTC
/// resource. Stops at SOS — metadata never follows image data.
fn find_app13_iptc(data: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;
    while pos + 4 < data.len() {
        if data[pos] == 0xFF && data[pos + 1] == 0xED {
            let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
            let seg_end = (pos + 2 + seg_len).min(data.len());
            if let Some(iptc) = iptc_resource(&data[pos + 4..seg_end]) {
                return Some(iptc);
            }
        }

        if data[pos] == 0xFF && pos + 3 < data.len() && data[pos + 1] != 0x00 {
            let marker = data[pos + 1];
            if marker == 0xDA {
                break;
            }
            if marker == 0xD8 || marker == 0xD9 || (0xD0..=0xD7).contains(&marker) {
                pos += 2;
            } else {
                let len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + len;
            }
        } else {
            pos += 1;
        }
    }
    None
}

/// Scan Photoshop 8BIM resource blocks for the IPTC resource (0x0404).
///
/// Block layout: `"8BIM" | id (be u16) | pascal name (padded even) |
/// len (be u32) | data (padded even)`.
fn iptc_resource(segment: &[u8]) -> Option<&[u8]> {
    let data = segment
        .strip_prefix(PHOTOSHOP_HEADER)
        .unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        if &data[pos..pos + 4] != RESOURCE_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        if pos + 2 > data.len() {
            break;
        }
        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        if pos >= data.len() {
            break;
        }
        let name_len = data[pos] as usize;
        pos += 1 + name_len + ((1 + name_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if pos + res_len > data.len() {
            break;
        }
        if resource_id == IPTC_RESOURCE_ID {
            return Some(&data[pos..pos + res_len]);
        }
        pos += res_len + (res_len % 2);
    }
    None
}
