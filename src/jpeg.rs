//! JPEG parameters stored as UTF-16BE text between two byte markers.
//!
//! The generator writes its parameters as UTF-16BE text inside the EXIF
//! block. The codec does not walk the segment structure; it treats the bytes
//! between the first `00 3C` and the following `FF DB` (the quantization
//! table marker) as the text region. Since the region is delimited by
//! content rather than a length prefix, its size may change freely.

use std::path::Path;

use crate::backup;
use crate::error::{MetadataError, Result, read_file};

/// Start of the text region (`"\0<"`).
pub const START_MARKER: [u8; 2] = [0x00, 0x3C];
/// End of the text region (DQT marker).
pub const END_MARKER: [u8; 2] = [0xFF, 0xDB];

/// Read the parameters text from a JPEG file.
///
/// Missing markers or undecodable text yield an empty string.
pub fn extract(path: &Path) -> Result<String> {
    let bytes = read_file(path)?;
    Ok(extract_from_bytes(&bytes))
}

/// Replace the text region of a JPEG file on disk.
///
/// Fails without touching the file when either marker is missing.
pub fn write(path: &Path, text: &str, make_backup: bool) -> Result<()> {
    let bytes = read_file(path)?;
    let updated = rewrite(&bytes, text)?;
    backup::commit(path, &updated, make_backup)
}

pub fn extract_from_bytes(bytes: &[u8]) -> String {
    let Some((start, end)) = find_region(bytes) else {
        log::debug!("No metadata markers found in JPEG");
        return String::new();
    };
    match decode_utf16be(&bytes[start..end]) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Ignoring undecodable JPEG metadata: {e}");
            String::new()
        }
    }
}

/// Splice `text` (as UTF-16BE) between the markers, keeping both markers
/// and everything outside them.
pub fn rewrite(bytes: &[u8], text: &str) -> Result<Vec<u8>> {
    let (start, end) =
        find_region(bytes).ok_or_else(|| MetadataError::format("cannot find metadata section"))?;

    let encoded = encode_utf16be(text);
    let mut out = Vec::with_capacity(bytes.len() - (end - start) + encoded.len());
    out.extend_from_slice(&bytes[..start]);
    out.extend_from_slice(&encoded);
    out.extend_from_slice(&bytes[end..]);
    Ok(out)
}

/// Byte range strictly between the start marker and the first end marker
/// that follows it.
fn find_region(bytes: &[u8]) -> Option<(usize, usize)> {
    let start = find(bytes, &START_MARKER)? + START_MARKER.len();
    let end = start + find(&bytes[start..], &END_MARKER)?;
    Some((start, end))
}

fn find(haystack: &[u8], needle: &[u8; 2]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn encode_utf16be(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|c| c.to_be_bytes()).collect()
}

fn decode_utf16be(bytes: &[u8]) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(MetadataError::Encoding(format!(
            "odd UTF-16 byte count ({})",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| MetadataError::Encoding(e.to_string()))
}
