//! Binary image of a [`VectorIndex`].
//!
//! Layout, little endian throughout:
//!
//! ```text
//! magic "VCNX" | version u16 | dimension u32 | count u64
//! companion digest (32 bytes)
//! count * dimension f32
//! blake3 digest (32 bytes) of everything above
//! ```
//!
//! An index with no established dimension is written with dimension 0 and
//! count 0. The companion digest is the blake3 hash of the artifact the
//! vectors are paired with (the image's `chunks.json`), or all zeros when
//! the blob stands alone.

use vicinity_core::{Error, Result};

use crate::index::VectorIndex;

/// File magic.
pub const MAGIC: &[u8; 4] = b"VCNX";

/// Current format version.
pub const VERSION: u16 = 2;

const DIGEST_LEN: usize = 32;
const HEADER_LEN: usize = 4 + 2 + 4 + 8 + DIGEST_LEN;

/// Digest of the artifact a vector blob is paired with.
pub type Companion = [u8; DIGEST_LEN];

/// Companion value of a standalone blob.
pub const NO_COMPANION: Companion = [0; DIGEST_LEN];

/// Encode `index` with no companion.
pub fn encode(index: &VectorIndex) -> Vec<u8> {
    encode_paired(index, &NO_COMPANION)
}

/// Encode `index`, recording the digest of its companion artifact.
pub fn encode_paired(index: &VectorIndex, companion: &Companion) -> Vec<u8> {
    let data = index.raw();
    let dimension = index.dimension().unwrap_or(0);
    let mut buf = Vec::with_capacity(HEADER_LEN + data.len() * 4 + DIGEST_LEN);

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_le_bytes());
    buf.extend_from_slice(&(dimension as u32).to_le_bytes());
    buf.extend_from_slice(&(index.len() as u64).to_le_bytes());
    buf.extend_from_slice(companion);
    for value in data {
        buf.extend_from_slice(&value.to_le_bytes());
    }

    let digest = blake3::hash(&buf);
    buf.extend_from_slice(digest.as_bytes());
    buf
}

/// Decode bytes produced by [`encode`], ignoring the companion digest.
pub fn decode(bytes: &[u8]) -> Result<VectorIndex> {
    decode_paired(bytes).map(|(index, _)| index)
}

/// Decode bytes produced by [`encode_paired`].
pub fn decode_paired(bytes: &[u8]) -> Result<(VectorIndex, Companion)> {
    let mut reader = Reader::new(bytes);

    if reader.take(4)? != MAGIC {
        return Err(Error::corrupt_index("bad magic"));
    }
    let version = reader.u16()?;
    if version != VERSION {
        return Err(Error::corrupt_index(format!("unsupported version {version}")));
    }
    let dimension = reader.u32()? as usize;
    let count = usize::try_from(reader.u64()?)
        .map_err(|_| Error::corrupt_index("vector count out of range"))?;
    let mut companion = NO_COMPANION;
    companion.copy_from_slice(reader.take(DIGEST_LEN)?);

    let floats = count
        .checked_mul(dimension)
        .ok_or_else(|| Error::corrupt_index("vector count overflows"))?;
    let expected = floats
        .checked_mul(4)
        .and_then(|n| n.checked_add(HEADER_LEN + DIGEST_LEN))
        .ok_or_else(|| Error::corrupt_index("vector count overflows"))?;
    if bytes.len() != expected {
        return Err(Error::corrupt_index(format!(
            "expected {expected} bytes, found {}",
            bytes.len()
        )));
    }

    let body_end = bytes.len() - DIGEST_LEN;
    if blake3::hash(&bytes[..body_end]).as_bytes() != &bytes[body_end..] {
        return Err(Error::corrupt_index("digest mismatch"));
    }

    if dimension == 0 {
        if count != 0 {
            return Err(Error::corrupt_index("vectors present without a dimension"));
        }
        return Ok((VectorIndex::new(), companion));
    }

    let data: Vec<f32> = reader
        .take(floats * 4)?
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((VectorIndex::from_parts(Some(dimension), data), companion))
}

/// Bounds-checked cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| Error::corrupt_index("truncated"))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_le_bytes(arr))
    }
}

// ============================================================================
// Tests
// ============================================================================
