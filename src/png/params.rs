use std::path::Path;

use super::chunk::{self, Chunk, IDAT};
use crate::backup;
use crate::error::{MetadataError, Result, read_file};

/// Keyword under which the generator stores its parameters.
pub const KEYWORD: &[u8] = b"parameters";

const TEXT: &[u8; 4] = b"tEXt";
const ITXT: &[u8; 4] = b"iTXt";

/// Read the parameters text from a PNG file.
///
/// Returns an empty string when the file has no `parameters` chunk.
pub fn extract(path: &Path) -> Result<String> {
    let bytes = read_file(path)?;
    extract_from_bytes(&bytes)
}

/// Replace (or insert) the parameters text of a PNG file on disk.
pub fn write(path: &Path, text: &str, make_backup: bool) -> Result<()> {
    let bytes = read_file(path)?;
    let updated = rewrite(&bytes, text)?;
    backup::commit(path, &updated, make_backup)
}

/// Find the first `tEXt`/`iTXt` chunk keyed `parameters` and decode it.
pub fn extract_from_bytes(bytes: &[u8]) -> Result<String> {
    for chunk in chunk::parse(bytes)? {
        let Some(body) = parameters_body(&chunk) else {
            continue;
        };
        if chunk.is(TEXT) {
            return Ok(decode_latin1(body));
        }
        return decode_itxt(body);
    }
    Ok(String::new())
}

/// Produce a new PNG byte stream carrying `text` as its parameters.
///
/// Every existing `parameters` chunk is replaced in place by a `tEXt` chunk.
/// When there is none, the new chunk goes right before the first `IDAT`.
/// All other chunks keep their order and payload.
pub fn rewrite(bytes: &[u8], text: &str) -> Result<Vec<u8>> {
    let chunks = chunk::parse(bytes)?;
    let replacement = text_chunk(text);
    let has_existing = chunks.iter().any(|c| parameters_body(c).is_some());

    let mut out = Vec::with_capacity(chunks.len() + 1);
    let mut inserted = false;
    for c in chunks {
        if parameters_body(&c).is_some() {
            log::debug!("Replacing {} parameters chunk", c.kind_str());
            out.push(replacement.clone());
            continue;
        }
        if !has_existing && !inserted && c.is(IDAT) {
            log::debug!("Inserting parameters chunk before first IDAT");
            out.push(replacement.clone());
            inserted = true;
        }
        out.push(c);
    }

    if !has_existing && !inserted {
        return Err(MetadataError::format("no IDAT chunk to place metadata before"));
    }

    chunk::serialize(&out)
}

/// Payload after the `parameters\0` keyword, if this is a text chunk
/// carrying that keyword.
fn parameters_body(chunk: &Chunk) -> Option<&[u8]> {
    if !chunk.is(TEXT) && !chunk.is(ITXT) {
        return None;
    }
    let nul = chunk.data.iter().position(|&b| b == 0)?;
    (&chunk.data[..nul] == KEYWORD).then(|| &chunk.data[nul + 1..])
}

fn text_chunk(text: &str) -> Chunk {
    let mut data = Vec::with_capacity(KEYWORD.len() + 1 + text.len());
    data.extend_from_slice(KEYWORD);
    data.push(0);
    data.extend(encode_latin1(text));
    Chunk::new(*TEXT, data)
}

// iTXt body: flag(1) method(1) language\0 translated_keyword\0 text
fn decode_itxt(body: &[u8]) -> Result<String> {
    if body.len() < 2 {
        return Err(MetadataError::format("truncated iTXt chunk"));
    }
    let compressed = body[0] != 0;

    let mut start = 2;
    for _ in 0..2 {
        if let Some(nul) = body[start..].iter().position(|&b| b == 0) {
            start += nul + 1;
        }
    }
    let raw = &body[start..];

    let text = if compressed {
        miniz_oxide::inflate::decompress_to_vec_zlib(raw).map_err(|e| {
            MetadataError::format(format!("cannot inflate iTXt text: {:?}", e.status))
        })?
    } else {
        raw.to_vec()
    };

    String::from_utf8(text)
        .map_err(|e| MetadataError::Encoding(format!("iTXt text is not UTF-8: {e}")))
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Latin-1 encode, substituting `?` for anything outside U+0000..U+00FF.
fn encode_latin1(text: &str) -> impl Iterator<Item = u8> + '_ {
    text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
}
