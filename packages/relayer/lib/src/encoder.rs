//! The header encoder turns source chain headers into the bytes the bridge hashes and stores.
//!
//! The bridge identifies a header by `keccak256` of its RLP encoding, exactly like the source
//! chain does. An encoding that is off by a single byte would make the bridge record a header
//! under a hash the source chain never produced, so [`encode_header`] refuses to hand out any
//! encoding that does not hash back to the reported block hash.

use alloy::{
    consensus::Header,
    primitives::{keccak256, Bytes, B256},
    rlp::Encodable,
};

use crate::{
    chain::{EncodedHeader, SourceHeader},
    error::RelayError,
};

/// Returns the canonical RLP encoding of a header.
#[must_use]
pub fn header_rlp(header: &Header) -> Bytes {
    let mut buf = Vec::with_capacity(header.length());
    header.encode(&mut buf);
    buf.into()
}

/// Returns the block hash of a header, computed from its canonical encoding.
#[must_use]
pub fn header_hash(header: &Header) -> B256 {
    keccak256(header_rlp(header))
}

/// Encodes a source header for submission.
///
/// # Errors
/// Returns [`RelayError::EncodingMismatch`] if the encoding does not hash to the hash reported
/// by the source chain.
pub fn encode_header(source: &SourceHeader) -> Result<EncodedHeader, RelayError> {
    let encoded = header_rlp(&source.header);
    let computed = keccak256(&encoded);
    if computed != source.hash {
        return Err(RelayError::EncodingMismatch {
            number: source.number(),
            expected: source.hash,
            computed,
        });
    }

    Ok(EncodedHeader::new(encoded))
}
