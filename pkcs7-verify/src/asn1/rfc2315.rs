// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! ASN.1 data structures defined by RFC 2315 (PKCS #7 v1.5).

The types defined in this module are intended to be extremely low-level
and only to be used for deserialization. See [crate::SignedMessage] for
higher-level functionality.

Only the `signedData` content type is modeled. Certificates are kept as
captured BER/DER so they can be handed to `x509-certificate` verbatim.
*/

use {
    bcder::{
        decode::{Constructed, DecodeError, Source},
        Captured, ConstOid, Integer, Mode, OctetString, Oid, Tag,
    },
    bytes::Bytes,
    std::convert::Infallible,
    x509_certificate::{rfc3280::Name, rfc5280::AlgorithmIdentifier, rfc5652::Attribute},
};

/// The data content type.
///
/// 1.2.840.113549.1.7.1
pub const OID_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 1]);

/// The signed-data content type.
///
/// 1.2.840.113549.1.7.2
pub const OID_SIGNED_DATA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 7, 2]);

/// Identifies the content-type attribute.
///
/// 1.2.840.113549.1.9.3
pub const OID_CONTENT_TYPE: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 3]);

/// Identifies the message-digest attribute.
///
/// 1.2.840.113549.1.9.4
pub const OID_MESSAGE_DIGEST: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 9, 4]);

/// Content info.
///
/// ```ASN.1
/// ContentInfo ::= SEQUENCE {
///   contentType ContentType,
///   content [0] EXPLICIT ANY DEFINED BY contentType OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct ContentInfo {
    pub content_type: Oid,
    pub content: Option<Captured>,
}

impl ContentInfo {
    /// Decode an outer `ContentInfo` from BER.
    pub fn decode_ber(data: &[u8]) -> Result<Self, DecodeError<Infallible>> {
        Constructed::decode(data, Mode::Ber, Self::take_from)
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let content_type = Oid::take_from(cons)?;
            let content = cons.take_opt_constructed_if(Tag::CTX_0, |cons| cons.capture_all())?;

            Ok(Self {
                content_type,
                content,
            })
        })
    }
}

/// Signed data.
///
/// ```ASN.1
/// SignedData ::= SEQUENCE {
///   version Version,
///   digestAlgorithms DigestAlgorithmIdentifiers,
///   contentInfo ContentInfo,
///   certificates
///      [0] IMPLICIT ExtendedCertificatesAndCertificates
///        OPTIONAL,
///   crls
///     [1] IMPLICIT CertificateRevocationLists OPTIONAL,
///   signerInfos SignerInfos }
/// ```
#[derive(Clone, Debug)]
pub struct SignedData {
    pub version: u8,
    pub digest_algorithms: Vec<AlgorithmIdentifier>,
    pub content_info: ContentInfo,
    /// Each embedded certificate, as captured from the input.
    ///
    /// Order is the order of appearance, which is the pool iteration
    /// order used by chain building.
    pub certificates: Option<Vec<Captured>>,
    pub signer_infos: Vec<SignerInfo>,
}

impl SignedData {
    /// Decode the content of a `ContentInfo` whose type is `signedData`.
    pub fn decode_content(content: Captured) -> Result<Self, DecodeError<Infallible>> {
        content.decode(Self::take_from)
    }

    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let version = cons.take_u8()?;

            let digest_algorithms = cons.take_set(|cons| {
                let mut algorithms = Vec::new();

                while let Some(algorithm) = AlgorithmIdentifier::take_opt_from(cons)? {
                    algorithms.push(algorithm);
                }

                Ok(algorithms)
            })?;

            let content_info = ContentInfo::take_from(cons)?;

            let certificates = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
                let mut certificates = Vec::new();

                // Only the `certificate` choice is supported. An extended
                // certificate stops the loop and trips the trailing data check.
                loop {
                    let captured = cons.capture(|cons| {
                        cons.take_opt_sequence(|cons| cons.skip_all())?;
                        Ok(())
                    })?;

                    if captured.is_empty() {
                        break;
                    }

                    certificates.push(captured);
                }

                Ok(certificates)
            })?;

            // Revocation lists are never consulted.
            cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?;

            let signer_infos = cons.take_set(|cons| {
                let mut infos = Vec::new();

                while let Some(info) = SignerInfo::take_opt_from(cons)? {
                    infos.push(info);
                }

                Ok(infos)
            })?;

            Ok(Self {
                version,
                digest_algorithms,
                content_info,
                certificates,
                signer_infos,
            })
        })
    }
}

/// Per-signer information.
///
/// ```ASN.1
/// SignerInfo ::= SEQUENCE {
///   version Version,
///   issuerAndSerialNumber IssuerAndSerialNumber,
///   digestAlgorithm DigestAlgorithmIdentifier,
///   authenticatedAttributes
///     [0] IMPLICIT Attributes OPTIONAL,
///   digestEncryptionAlgorithm
///     DigestEncryptionAlgorithmIdentifier,
///   encryptedDigest EncryptedDigest,
///   unauthenticatedAttributes
///     [1] IMPLICIT Attributes OPTIONAL }
/// ```
#[derive(Clone, Debug)]
pub struct SignerInfo {
    pub version: u8,
    pub issuer_and_serial_number: IssuerAndSerialNumber,
    pub digest_algorithm: AlgorithmIdentifier,
    pub authenticated_attributes: Option<Vec<Attribute>>,
    pub digest_encryption_algorithm: AlgorithmIdentifier,
    pub encrypted_digest: Bytes,

    /// Raw content octets of `authenticatedAttributes`.
    ///
    /// Signatures are computed over these exact bytes, so they are kept
    /// instead of re-encoding the parsed attributes.
    pub authenticated_attributes_data: Option<Vec<u8>>,
}

impl SignerInfo {
    pub fn take_opt_from<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Option<Self>, DecodeError<S::Error>> {
        cons.take_opt_sequence(|cons| Self::from_sequence(cons))
    }

    pub fn from_sequence<S: Source>(
        cons: &mut Constructed<S>,
    ) -> Result<Self, DecodeError<S::Error>> {
        let version = cons.take_u8()?;
        let issuer_and_serial_number = IssuerAndSerialNumber::take_from(cons)?;
        let digest_algorithm = AlgorithmIdentifier::take_from(cons)?;

        let authenticated_attributes = cons.take_opt_constructed_if(Tag::CTX_0, |cons| {
            let der = cons.capture_all()?;
            let der_data = der.as_slice().to_vec();

            let attributes = Constructed::decode(der.as_slice(), Mode::Der, |cons| {
                let mut attributes = Vec::new();

                while let Some(attribute) = Attribute::take_opt_from(cons)? {
                    attributes.push(attribute);
                }

                Ok(attributes)
            })
            .map_err(|err| err.convert())?;

            Ok((attributes, der_data))
        })?;

        let (authenticated_attributes, authenticated_attributes_data) =
            match authenticated_attributes {
                Some((attributes, data)) => (Some(attributes), Some(data)),
                None => (None, None),
            };

        let digest_encryption_algorithm = AlgorithmIdentifier::take_from(cons)?;
        let encrypted_digest = OctetString::take_from(cons)?.into_bytes();

        cons.take_opt_constructed_if(Tag::CTX_1, |cons| cons.skip_all())?;

        Ok(Self {
            version,
            issuer_and_serial_number,
            digest_algorithm,
            authenticated_attributes,
            digest_encryption_algorithm,
            encrypted_digest,
            authenticated_attributes_data,
        })
    }

    /// Obtain the bytes a signature over authenticated attributes covers.
    ///
    /// The attributes are transmitted with an IMPLICIT `[0]` tag but are
    /// signed as an explicit `SET OF`, so the stored content is prefixed
    /// with a `0x31` tag and a DER length.
    pub fn authenticated_attributes_digested_content(&self) -> Option<Vec<u8>> {
        let data = self.authenticated_attributes_data.as_ref()?;

        let mut buffer = Vec::with_capacity(data.len() + 6);
        buffer.push(0x31);
        encode_definite_length(data.len(), &mut buffer);
        buffer.extend_from_slice(data);

        Some(buffer)
    }
}

/// Append a DER definite length to a buffer.
fn encode_definite_length(len: usize, buffer: &mut Vec<u8>) {
    if len < 0x80 {
        buffer.push(len as u8);
    } else {
        let octets = len.to_be_bytes();
        let skip = octets.iter().take_while(|b| **b == 0).count();
        buffer.push(0x80 | (octets.len() - skip) as u8);
        buffer.extend_from_slice(&octets[skip..]);
    }
}

/// Issuer and serial number.
///
/// ```ASN.1
/// IssuerAndSerialNumber ::= SEQUENCE {
///   issuer Name,
///   serialNumber CertificateSerialNumber }
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct IssuerAndSerialNumber {
    pub issuer: Name,
    pub serial_number: Integer,
}

impl IssuerAndSerialNumber {
    pub fn take_from<S: Source>(cons: &mut Constructed<S>) -> Result<Self, DecodeError<S::Error>> {
        cons.take_sequence(|cons| {
            let issuer = Name::take_from(cons)?;
            let serial_number = Integer::take_from(cons)?;

            Ok(Self {
                issuer,
                serial_number,
            })
        })
    }
}
