// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ContentInfo envelope detection and synthesis.
//!
//! Signed firmware payloads often carry a bare `SignedData` without the
//! `ContentInfo` wrapper that decoders expect. [normalize] probes a few
//! fixed offsets to tell the two apart and synthesizes a wrapper when
//! needed. The probe is shallow. Full decoding validates the structure.

use {crate::Pkcs7Error, log::debug, std::ops::Deref};

/// DER content octets of the `signedData` OID (1.2.840.113549.1.7.2).
const SIGNED_DATA_OID: [u8; 9] = [0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x01, 0x07, 0x02];

/// Length of a synthesized `ContentInfo` header.
const HEADER_LEN: usize = 19;

/// Bytes between the end of the outer length field and the wrapped payload.
const OUTER_OVERHEAD: usize = HEADER_LEN - 4;

/// Bytes that must be present for the probe to inspect.
const PROBE_LEN: usize = 17;

/// Largest bare `SignedData` that fits the 16-bit wrapper length fields.
pub const MAX_SYNTHESIZED_PAYLOAD: usize = u16::MAX as usize - OUTER_OVERHEAD;

/// A `ContentInfo` envelope, either borrowed from the input or synthesized.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Envelope<'a> {
    /// Input was already wrapped and is returned as-is.
    Wrapped(&'a [u8]),
    /// Input was bare `SignedData` and a new envelope was allocated.
    Synthesized(Vec<u8>),
}

impl<'a> Envelope<'a> {
    /// Whether the input already carried a `ContentInfo`.
    pub fn is_already_wrapped(&self) -> bool {
        matches!(self, Self::Wrapped(_))
    }

    /// Whether this envelope owns a newly allocated buffer.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Synthesized(_))
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Wrapped(data) => data,
            Self::Synthesized(data) => data.as_slice(),
        }
    }

    /// Obtain the envelope as an owned buffer, copying if borrowed.
    pub fn into_vec(self) -> Vec<u8> {
        match self {
            Self::Wrapped(data) => data.to_vec(),
            Self::Synthesized(data) => data,
        }
    }
}

impl<'a> Deref for Envelope<'a> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl<'a> AsRef<[u8]> for Envelope<'a> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Whether data looks like a `ContentInfo` holding `signedData`.
///
/// Checks for `06 09 <signedData OID> A0 82` at offset 4, which is what a
/// DER `ContentInfo` with 2 byte lengths looks like. Inputs too short to
/// hold the pattern are reported as unwrapped.
pub fn is_content_info(data: &[u8]) -> bool {
    data.len() >= PROBE_LEN
        && data[4] == 0x06
        && data[5] == 0x09
        && data[6..15] == SIGNED_DATA_OID
        && data[15] == 0xa0
        && data[16] == 0x82
}

/// Ensure PKCS #7 data is wrapped in a `ContentInfo`.
///
/// Already wrapped data is returned borrowed and unmodified. Otherwise a
/// 19 byte header is synthesized in front of a copy of the input:
///
/// ```text
/// 30 82 <L+15 big-endian u16> 06 09 <signedData OID> A0 82 <L big-endian u16>
/// ```
///
/// Fails if the allocation fails or if `L + 15` does not fit the 16-bit
/// length field.
pub fn normalize(data: &[u8]) -> Result<Envelope<'_>, Pkcs7Error> {
    if is_content_info(data) {
        debug!("input of {} bytes already carries a ContentInfo", data.len());
        return Ok(Envelope::Wrapped(data));
    }

    if data.len() > MAX_SYNTHESIZED_PAYLOAD {
        return Err(Pkcs7Error::EnvelopeTooLarge(data.len()));
    }

    let inner_len = data.len() as u16;
    let outer_len = inner_len + OUTER_OVERHEAD as u16;

    let mut wrapped = Vec::new();
    wrapped.try_reserve_exact(HEADER_LEN + data.len())?;

    wrapped.extend_from_slice(&[0x30, 0x82]);
    wrapped.extend_from_slice(&outer_len.to_be_bytes());
    wrapped.extend_from_slice(&[0x06, 0x09]);
    wrapped.extend_from_slice(&SIGNED_DATA_OID);
    wrapped.extend_from_slice(&[0xa0, 0x82]);
    wrapped.extend_from_slice(&inner_len.to_be_bytes());
    wrapped.extend_from_slice(data);

    debug!(
        "synthesized ContentInfo of {} bytes around bare SignedData",
        wrapped.len()
    );

    Ok(Envelope::Synthesized(wrapped))
}
