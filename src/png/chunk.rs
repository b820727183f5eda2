use crc::{CRC_32_ISO_HDLC, Crc};

use crate::error::{MetadataError, Result};

/// The fixed 8-byte signature that opens every PNG file.
pub const SIGNATURE: &[u8; 8] = b"\x89PNG\r\n\x1a\n";

pub const IEND: &[u8; 4] = b"IEND";
pub const IDAT: &[u8; 4] = b"IDAT";

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

// length (4) + type (4) ... payload ... crc (4)
const CHUNK_OVERHEAD: usize = 12;

/// One length-prefixed, CRC-checked record of a PNG stream.
///
/// `crc` holds the value read from disk. It is never trusted on output:
/// [`serialize`] recomputes it from `kind` and `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub kind: [u8; 4],
    pub data: Vec<u8>,
    pub crc: u32,
}

impl Chunk {
    /// Build a chunk with a freshly computed CRC.
    pub fn new(kind: [u8; 4], data: Vec<u8>) -> Self {
        let crc = checksum(&kind, &data);
        Self { kind, data, crc }
    }

    pub fn is(&self, kind: &[u8; 4]) -> bool {
        &self.kind == kind
    }

    /// Chunk type as text, for log messages.
    pub fn kind_str(&self) -> String {
        String::from_utf8_lossy(&self.kind).into_owned()
    }
}

/// CRC-32 over the chunk type followed by its payload.
pub fn checksum(kind: &[u8; 4], data: &[u8]) -> u32 {
    let mut digest = CRC32.digest();
    digest.update(kind);
    digest.update(data);
    digest.finalize()
}

/// Split a PNG byte stream into its chunks.
///
/// Walks the buffer strictly in order and stops after the first `IEND`
/// chunk, ignoring anything that trails it. Stored CRCs are kept as read and
/// not verified.
pub fn parse(bytes: &[u8]) -> Result<Vec<Chunk>> {
    if bytes.len() < SIGNATURE.len() || &bytes[..SIGNATURE.len()] != SIGNATURE {
        return Err(MetadataError::format("not a valid PNG file"));
    }

    let mut chunks = Vec::new();
    let mut pos = SIGNATURE.len();

    while pos < bytes.len() {
        if bytes.len() - pos < CHUNK_OVERHEAD {
            return Err(MetadataError::format(format!(
                "truncated chunk header at offset {pos}"
            )));
        }

        let length = u32::from_be_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]])
            as usize;
        let kind = [bytes[pos + 4], bytes[pos + 5], bytes[pos + 6], bytes[pos + 7]];
        let data_start = pos + 8;

        let end = data_start
            .checked_add(length)
            .and_then(|e| e.checked_add(4))
            .filter(|&e| e <= bytes.len())
            .ok_or_else(|| {
                MetadataError::format(format!(
                    "chunk {} at offset {pos} declares {length} bytes, past end of file",
                    String::from_utf8_lossy(&kind)
                ))
            })?;

        let data_end = data_start + length;
        let crc = u32::from_be_bytes([
            bytes[data_end],
            bytes[data_end + 1],
            bytes[data_end + 2],
            bytes[data_end + 3],
        ]);

        chunks.push(Chunk {
            kind,
            data: bytes[data_start..data_end].to_vec(),
            crc,
        });
        pos = end;

        if &kind == IEND {
            break;
        }
    }

    log::trace!("Parsed {} PNG chunks", chunks.len());
    Ok(chunks)
}

/// Re-emit the signature and every chunk, recomputing lengths and CRCs.
pub fn serialize(chunks: &[Chunk]) -> Result<Vec<u8>> {
    let total: usize = chunks.iter().map(|c| c.data.len() + CHUNK_OVERHEAD).sum();
    let mut out = Vec::with_capacity(SIGNATURE.len() + total);
    out.extend_from_slice(SIGNATURE);

    for chunk in chunks {
        let length = u32::try_from(chunk.data.len()).map_err(|_| {
            MetadataError::format(format!(
                "chunk {} is too large to encode",
                chunk.kind_str()
            ))
        })?;
        out.extend_from_slice(&length.to_be_bytes());
        out.extend_from_slice(&chunk.kind);
        out.extend_from_slice(&chunk.data);
        out.extend_from_slice(&checksum(&chunk.kind, &chunk.data).to_be_bytes());
    }

    Ok(out)
}
