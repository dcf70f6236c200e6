// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! PKCS #7 SignedData verification for firmware payloads

This crate verifies PKCS #7 (RFC 2315) `SignedData` structures the way
platform firmware authenticates signed payloads such as authenticated
variables and Authenticode-style blobs. Input is treated as hostile:
every byte buffer is decoded with `bcder` and every certificate is
parsed with `x509-certificate` before anything is trusted.

Functionality includes:

* Normalizing a bare `SignedData` blob into a `ContentInfo` envelope
  ([normalize]).
* Extracting the signer certificates of a message into a length-prefixed
  [CertificateList] ([get_signers]).
* Partitioning embedded certificates into the signer's issuance chain and
  the leftovers ([build_chain], [get_certificate_lists]).
* Verifying a message against a single trust anchor ([verify]).
* Extracting the raw signature of a single-signer message
  ([get_signature], [copy_signature]).

# Verification Policy

[verify] applies a fixed [VerificationPolicy]: chains may end at a
non-root anchor, certificate validity windows are never consulted, and
no certificate purpose is required. The policy is not configurable.

Revocation checking is not performed.

# Certificate List Format

Several entry points emit a [CertificateList]. The serialized form is a
single count byte followed by, for each certificate, a 4 byte
little-endian length and the certificate's DER. Lists are built by
popping certificates off the end of a sequence, so serialized order is
the reverse of logical order. See [CertificateList::encode_stack].
*/

pub mod algorithm;
pub mod asn1;
mod certificate_list;
mod chain;
mod envelope;
mod message;
mod signature;
mod signers;
mod trust;
mod verify;

pub use {
    bcder::Oid,
    bytes::Bytes,
    certificate_list::{CertificateList, MAX_CERTIFICATES},
    chain::{build_chain, get_certificate_lists, CertificateLists, ChainPartition},
    envelope::{is_content_info, normalize, Envelope, MAX_SYNTHESIZED_PAYLOAD},
    message::{SignedMessage, SignerInfo},
    signature::{copy_signature, get_signature, signature_length},
    signers::{get_signers, SignerCertificates},
    trust::{TrustAnchor, VerificationPolicy},
    verify::{verify, verify_detailed, verify_with_anchor},
    x509_certificate::CapturedX509Certificate,
};

use {bcder::decode::DecodeError, std::convert::Infallible, thiserror::Error};

/// The largest input accepted by any entry point.
///
/// Firmware callers pass lengths as signed 32-bit integers.
pub const MAX_INPUT_LEN: usize = i32::MAX as usize;

/// Errors that can occur when handling PKCS #7 data.
#[derive(Debug, Error)]
pub enum Pkcs7Error {
    #[error("{what} of {len} bytes exceeds the {max} byte limit")]
    InputTooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("destination of {available} bytes cannot hold {needed} bytes")]
    DestinationTooSmall { needed: usize, available: usize },

    #[error("memory allocation failed: {0}")]
    Allocation(#[from] std::collections::TryReserveError),

    #[error("SignedData of {0} bytes is too large to wrap in a ContentInfo")]
    EnvelopeTooLarge(usize),

    #[error("error when decoding ASN.1 data: {0}")]
    Asn1Decode(#[from] DecodeError<Infallible>),

    #[error("content type {0} is not PKCS #7 signed data")]
    NotSignedData(Oid),

    #[error("ContentInfo does not carry content")]
    MissingContent,

    #[error("no signers found in SignedData")]
    NoSigners,

    #[error("expected exactly one signer; found {0}")]
    UnexpectedSignerCount(usize),

    #[error("certificate for signer could not be found")]
    SignerCertificateNotFound,

    #[error("certificate list cannot hold more than {max} certificates")]
    CertificateListOverflow { max: usize },

    #[error("certificate of {0} bytes is too large for a certificate list")]
    CertificateTooLarge(usize),

    #[error("malformed certificate list: {0}")]
    MalformedCertificateList(&'static str),

    #[error("X.509 certificate error: {0}")]
    X509Certificate(#[from] x509_certificate::X509CertificateError),

    #[error("error decoding PEM data: {0}")]
    Pem(#[from] pem::PemError),

    #[error("unexpected PEM tag {0}; expected CERTIFICATE")]
    UnexpectedPemTag(String),

    #[error("unknown digest algorithm: {0}")]
    UnknownDigestAlgorithm(Oid),

    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(&'static str),

    #[error("message-digest attribute not present in authenticated attributes")]
    MissingMessageDigest,

    #[error("message-digest attribute is malformed")]
    MalformedMessageDigest,

    #[error("digest of content does not match message-digest attribute")]
    MessageDigestMismatch,

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("no certificate chain leads from the signer to the trust anchor")]
    UntrustedChain,

    #[error("issuing certificate is not allowed to sign certificates: {0}")]
    IssuerNotCertificateAuthority(String),

    #[error("certificate carries unhandled critical extension {0}")]
    UnhandledCriticalExtension(Oid),
}

/// Reject inputs whose length cannot be expressed as a signed 32-bit count.
pub(crate) fn check_input_len(what: &'static str, data: &[u8]) -> Result<(), Pkcs7Error> {
    if data.len() > MAX_INPUT_LEN {
        Err(Pkcs7Error::InputTooLarge {
            what,
            len: data.len(),
            max: MAX_INPUT_LEN,
        })
    } else {
        Ok(())
    }
}
