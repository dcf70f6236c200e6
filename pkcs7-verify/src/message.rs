// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! High-level interface to a decoded PKCS #7 `SignedData`.

use {
    crate::{
        algorithm,
        asn1::rfc2315::{self, ContentInfo, OID_MESSAGE_DIGEST, OID_SIGNED_DATA},
        check_input_len,
        envelope::normalize,
        Pkcs7Error,
    },
    bcder::{Captured, Integer, OctetString, Oid},
    bytes::Bytes,
    log::{debug, warn},
    x509_certificate::{
        rfc3280::Name, rfc5280::AlgorithmIdentifier, CapturedX509Certificate, KeyAlgorithm,
    },
};

/// A decoded `SignedData` with parsed embedded certificates.
///
/// Instances own everything decoded from the input and are meant to live
/// for a single extraction or verification call.
#[derive(Clone, Debug)]
pub struct SignedMessage {
    version: u8,
    digest_algorithms: Vec<AlgorithmIdentifier>,
    content_type: Oid,
    certificates: Vec<CapturedX509Certificate>,
    signers: Vec<SignerInfo>,
}

impl SignedMessage {
    /// Decode PKCS #7 data, wrapping bare `SignedData` in a `ContentInfo` first.
    pub fn from_p7(data: &[u8]) -> Result<Self, Pkcs7Error> {
        check_input_len("PKCS #7 data", data)?;

        let envelope = normalize(data)?;

        Self::from_content_info_ber(&envelope)
    }

    /// Decode a BER `ContentInfo` which must hold `signedData`.
    pub fn from_content_info_ber(data: &[u8]) -> Result<Self, Pkcs7Error> {
        let content_info = ContentInfo::decode_ber(data)?;

        if content_info.content_type != OID_SIGNED_DATA {
            return Err(Pkcs7Error::NotSignedData(content_info.content_type));
        }

        let content = content_info.content.ok_or(Pkcs7Error::MissingContent)?;
        let signed_data = rfc2315::SignedData::decode_content(content)?;

        Self::try_from(signed_data)
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Digest algorithms declared at the `SignedData` level.
    pub fn digest_algorithms(&self) -> &[AlgorithmIdentifier] {
        &self.digest_algorithms
    }

    /// Content type of the signed content.
    pub fn content_type(&self) -> &Oid {
        &self.content_type
    }

    /// Embedded certificates, in order of appearance.
    pub fn certificates(&self) -> &[CapturedX509Certificate] {
        &self.certificates
    }

    pub fn signers(&self) -> &[SignerInfo] {
        &self.signers
    }

    /// Find the embedded certificate a signer references.
    pub fn signer_certificate(&self, signer: &SignerInfo) -> Option<&CapturedX509Certificate> {
        self.certificates
            .iter()
            .find(|cert| signer.is_issued_to(cert))
    }

    /// Resolve the certificate of every signer, in `SignerInfo` order.
    ///
    /// Fails if there are no signers or if any signer's certificate is not
    /// embedded.
    pub fn signer_certificates(&self) -> Result<Vec<&CapturedX509Certificate>, Pkcs7Error> {
        if self.signers.is_empty() {
            return Err(Pkcs7Error::NoSigners);
        }

        self.signers
            .iter()
            .map(|signer| {
                self.signer_certificate(signer).ok_or_else(|| {
                    warn!(
                        "no embedded certificate matches signer with serial {}",
                        hex::encode(signer.serial_number().as_slice())
                    );
                    Pkcs7Error::SignerCertificateNotFound
                })
            })
            .collect()
    }

    /// Obtain the only signer, failing if there is not exactly one.
    pub fn single_signer(&self) -> Result<&SignerInfo, Pkcs7Error> {
        match self.signers.as_slice() {
            [signer] => Ok(signer),
            signers => Err(Pkcs7Error::UnexpectedSignerCount(signers.len())),
        }
    }
}

impl TryFrom<rfc2315::SignedData> for SignedMessage {
    type Error = Pkcs7Error;

    fn try_from(raw: rfc2315::SignedData) -> Result<Self, Self::Error> {
        let certificates = raw
            .certificates
            .unwrap_or_default()
            .into_iter()
            .map(|captured| CapturedX509Certificate::from_ber(captured.as_slice().to_vec()))
            .collect::<Result<Vec<_>, _>>()?;

        let signers = raw
            .signer_infos
            .into_iter()
            .map(SignerInfo::from)
            .collect::<Vec<_>>();

        debug!(
            "decoded SignedData with {} certificates and {} signers",
            certificates.len(),
            signers.len()
        );

        Ok(Self {
            version: raw.version,
            digest_algorithms: raw.digest_algorithms,
            content_type: raw.content_info.content_type,
            certificates,
            signers,
        })
    }
}

/// An entity that signed a [SignedMessage].
#[derive(Clone, Debug)]
pub struct SignerInfo {
    issuer: Name,
    serial_number: Integer,
    digest_algorithm: AlgorithmIdentifier,
    signature_algorithm: AlgorithmIdentifier,
    encrypted_digest: Bytes,
    message_digest: Option<Captured>,
    digested_attributes: Option<Vec<u8>>,
}

impl From<rfc2315::SignerInfo> for SignerInfo {
    fn from(raw: rfc2315::SignerInfo) -> Self {
        let digested_attributes = raw.authenticated_attributes_digested_content();

        let message_digest = raw.authenticated_attributes.as_ref().and_then(|attributes| {
            attributes
                .iter()
                .find(|attribute| attribute.typ == OID_MESSAGE_DIGEST)
                .map(|attribute| {
                    attribute
                        .values
                        .first()
                        .map(|value| Captured::clone(value))
                        .unwrap_or_else(|| Captured::empty(bcder::Mode::Der))
                })
        });

        Self {
            issuer: raw.issuer_and_serial_number.issuer,
            serial_number: raw.issuer_and_serial_number.serial_number,
            digest_algorithm: raw.digest_algorithm,
            signature_algorithm: raw.digest_encryption_algorithm,
            encrypted_digest: raw.encrypted_digest,
            message_digest,
            digested_attributes,
        }
    }
}

impl SignerInfo {
    /// Issuer name of the signing certificate.
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Serial number of the signing certificate.
    pub fn serial_number(&self) -> &Integer {
        &self.serial_number
    }

    pub fn digest_algorithm(&self) -> &AlgorithmIdentifier {
        &self.digest_algorithm
    }

    pub fn signature_algorithm(&self) -> &AlgorithmIdentifier {
        &self.signature_algorithm
    }

    /// The raw `encryptedDigest`, i.e. the signature.
    pub fn signature(&self) -> &[u8] {
        &self.encrypted_digest
    }

    pub fn has_authenticated_attributes(&self) -> bool {
        self.digested_attributes.is_some()
    }

    /// Whether a certificate is the one this signer references.
    pub fn is_issued_to(&self, cert: &CapturedX509Certificate) -> bool {
        cert.issuer_name() == &self.issuer && cert.serial_number_asn1() == &self.serial_number
    }

    /// Value of the `messageDigest` authenticated attribute, if present.
    pub fn message_digest(&self) -> Result<Option<Bytes>, Pkcs7Error> {
        match &self.message_digest {
            Some(captured) => captured
                .clone()
                .decode(OctetString::take_from)
                .map(|digest| Some(digest.into_bytes()))
                .map_err(|_| Pkcs7Error::MalformedMessageDigest),
            None => Ok(None),
        }
    }

    /// The bytes covered by the signature for the given detached content.
    ///
    /// With authenticated attributes, the `messageDigest` attribute is first
    /// checked against `content` and the re-tagged attributes are returned.
    /// Otherwise the content itself is signed.
    pub fn signed_content<'a>(&'a self, content: &'a [u8]) -> Result<&'a [u8], Pkcs7Error> {
        match &self.digested_attributes {
            Some(attributes) => {
                self.verify_message_digest(content)?;
                Ok(attributes.as_slice())
            }
            None => Ok(content),
        }
    }

    /// Check the `messageDigest` attribute against the digest of content.
    pub fn verify_message_digest(&self, content: &[u8]) -> Result<(), Pkcs7Error> {
        let wanted = self
            .message_digest()?
            .ok_or(Pkcs7Error::MissingMessageDigest)?;

        let digest_algorithm = algorithm::registry().digest_algorithm(&self.digest_algorithm.algorithm)?;
        let got = digest_algorithm.digest_data(content);

        if wanted.as_ref() == got.as_slice() {
            Ok(())
        } else {
            Err(Pkcs7Error::MessageDigestMismatch)
        }
    }

    /// Verify this signer's signature over detached content.
    ///
    /// Only the cryptographic signature is checked. The certificate is not
    /// validated.
    pub fn verify_signature(
        &self,
        cert: &CapturedX509Certificate,
        content: &[u8],
    ) -> Result<(), Pkcs7Error> {
        let registry = algorithm::registry();

        let digest_algorithm = registry.digest_algorithm(&self.digest_algorithm.algorithm)?;
        let key_algorithm = KeyAlgorithm::try_from(cert.key_algorithm_oid())?;
        let verification_algorithm = registry.verification_algorithm(
            &self.signature_algorithm.algorithm,
            digest_algorithm,
            key_algorithm,
        )?;

        let signed_content = self.signed_content(content)?;

        cert.verify_signed_data_with_algorithm(
            signed_content,
            self.signature(),
            verification_algorithm,
        )
        .map_err(|_| Pkcs7Error::SignatureVerificationFailed)
    }
}
