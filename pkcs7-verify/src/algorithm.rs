// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Process-wide registry of digest and signature algorithms.
//!
//! Signers in the wild identify digests with plain hash OIDs, with
//! `*WithRSAEncryption` OIDs and with the legacy OIW `sha1WithRSA` OID.
//! The registry maps all of these onto [DigestAlgorithm]. It is built once
//! on first use and shared by every call.

use {
    crate::Pkcs7Error,
    bcder::{ConstOid, Oid},
    bytes::Bytes,
    log::{debug, warn},
    once_cell::sync::Lazy,
    std::collections::{HashMap, HashSet},
    x509_certificate::{DigestAlgorithm, KeyAlgorithm, SignatureAlgorithm},
};

/// MD5.
///
/// 1.2.840.113549.2.5
const OID_MD5: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 2, 5]);

/// SHA-1.
///
/// 1.3.14.3.2.26
const OID_SHA1: ConstOid = Oid(&[43, 14, 3, 2, 26]);

/// SHA-256.
///
/// 2.16.840.1.101.3.4.2.1
const OID_SHA256: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 1]);

/// SHA-384.
///
/// 2.16.840.1.101.3.4.2.2
const OID_SHA384: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 2]);

/// SHA-512.
///
/// 2.16.840.1.101.3.4.2.3
const OID_SHA512: ConstOid = Oid(&[96, 134, 72, 1, 101, 3, 4, 2, 3]);

/// RSA encryption.
///
/// 1.2.840.113549.1.1.1
const OID_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 1]);

/// MD5 with RSA encryption.
///
/// 1.2.840.113549.1.1.4
const OID_MD5_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 4]);

/// SHA-1 with RSA encryption.
///
/// 1.2.840.113549.1.1.5
const OID_SHA1_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 5]);

/// SHA-256 with RSA encryption.
///
/// 1.2.840.113549.1.1.11
const OID_SHA256_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 11]);

/// SHA-384 with RSA encryption.
///
/// 1.2.840.113549.1.1.12
const OID_SHA384_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 12]);

/// SHA-512 with RSA encryption.
///
/// 1.2.840.113549.1.1.13
const OID_SHA512_RSA: ConstOid = Oid(&[42, 134, 72, 134, 247, 13, 1, 1, 13]);

/// Legacy OIW SHA-1 with RSA signature.
///
/// 1.3.14.3.2.29
pub const OID_OIW_SHA1_RSA: ConstOid = Oid(&[43, 14, 3, 2, 29]);

static REGISTRY: Lazy<AlgorithmRegistry> = Lazy::new(AlgorithmRegistry::with_defaults);

/// Obtain the process-wide algorithm registry.
///
/// The registry is initialized on first call. Subsequent and concurrent
/// calls observe the same instance.
pub fn registry() -> &'static AlgorithmRegistry {
    &REGISTRY
}

#[derive(Clone, Copy, Debug)]
enum DigestEntry {
    Supported(DigestAlgorithm),
    /// Recognized, but no implementation is available.
    Unsupported(&'static str),
}

/// Maps algorithm OIDs found in `SignerInfo` structures to implementations.
#[derive(Debug)]
pub struct AlgorithmRegistry {
    digests: HashMap<Oid, DigestEntry>,

    /// Signature OIDs naming an RSA signature.
    ///
    /// The digest of such signatures is taken from the signer's digest
    /// algorithm rather than from the OID.
    rsa_signatures: HashSet<Oid>,
}

fn owned(oid: ConstOid) -> Oid {
    Oid(Bytes::from_static(oid.0))
}

impl AlgorithmRegistry {
    fn with_defaults() -> Self {
        let mut digests = HashMap::new();

        for (oid, alg) in [
            (OID_SHA1, DigestAlgorithm::Sha1),
            (OID_SHA1_RSA, DigestAlgorithm::Sha1),
            (OID_OIW_SHA1_RSA, DigestAlgorithm::Sha1),
            (OID_SHA256, DigestAlgorithm::Sha256),
            (OID_SHA256_RSA, DigestAlgorithm::Sha256),
            (OID_SHA384, DigestAlgorithm::Sha384),
            (OID_SHA384_RSA, DigestAlgorithm::Sha384),
            (OID_SHA512, DigestAlgorithm::Sha512),
            (OID_SHA512_RSA, DigestAlgorithm::Sha512),
        ] {
            digests.insert(owned(oid), DigestEntry::Supported(alg));
        }

        digests.insert(owned(OID_MD5), DigestEntry::Unsupported("MD5"));
        digests.insert(owned(OID_MD5_RSA), DigestEntry::Unsupported("MD5"));

        let rsa_signatures = [
            OID_RSA,
            OID_SHA1_RSA,
            OID_OIW_SHA1_RSA,
            OID_SHA256_RSA,
            OID_SHA384_RSA,
            OID_SHA512_RSA,
        ]
        .into_iter()
        .map(owned)
        .collect::<HashSet<_>>();

        debug!(
            "registered {} digest and {} RSA signature algorithm identifiers",
            digests.len(),
            rsa_signatures.len()
        );

        Self {
            digests,
            rsa_signatures,
        }
    }

    /// Whether an OID is known as a digest algorithm, supported or not.
    pub fn is_registered_digest(&self, oid: &Oid) -> bool {
        self.digests.contains_key(oid)
    }

    /// Resolve a digest algorithm OID.
    pub fn digest_algorithm(&self, oid: &Oid) -> Result<DigestAlgorithm, Pkcs7Error> {
        match self.digests.get(oid) {
            Some(DigestEntry::Supported(alg)) => Ok(*alg),
            Some(DigestEntry::Unsupported(name)) => {
                warn!("rejecting {} digest algorithm", name);
                Err(Pkcs7Error::UnsupportedDigestAlgorithm(name))
            }
            None => Err(Pkcs7Error::UnknownDigestAlgorithm(oid.clone())),
        }
    }

    /// Resolve the signature algorithm of a `SignerInfo`.
    ///
    /// RSA signature OIDs always resolve using `digest`, whatever hash the
    /// OID itself names.
    pub fn signature_algorithm(
        &self,
        oid: &Oid,
        digest: DigestAlgorithm,
    ) -> Result<SignatureAlgorithm, Pkcs7Error> {
        if self.rsa_signatures.contains(oid) {
            Ok(match digest {
                DigestAlgorithm::Sha1 => SignatureAlgorithm::RsaSha1,
                DigestAlgorithm::Sha256 => SignatureAlgorithm::RsaSha256,
                DigestAlgorithm::Sha384 => SignatureAlgorithm::RsaSha384,
                DigestAlgorithm::Sha512 => SignatureAlgorithm::RsaSha512,
            })
        } else {
            Ok(SignatureAlgorithm::from_oid_and_digest_algorithm(
                oid, digest,
            )?)
        }
    }

    /// Resolve the `ring` verification algorithm for a signature.
    pub fn verification_algorithm(
        &self,
        oid: &Oid,
        digest: DigestAlgorithm,
        key_algorithm: KeyAlgorithm,
    ) -> Result<&'static dyn ring::signature::VerificationAlgorithm, Pkcs7Error> {
        let signature_algorithm = self.signature_algorithm(oid, digest)?;

        Ok(signature_algorithm.resolve_verification_algorithm(key_algorithm)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registry_is_shared() {
        let first = registry() as *const AlgorithmRegistry;

        let handles = (0..4)
            .map(|_| std::thread::spawn(|| registry() as *const AlgorithmRegistry as usize))
            .collect::<Vec<_>>();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), first as usize);
        }
    }

    #[test]
    fn digest_lookup() {
        let registry = registry();

        assert_eq!(
            registry.digest_algorithm(&owned(OID_SHA256)).unwrap(),
            DigestAlgorithm::Sha256
        );
        assert_eq!(
            registry.digest_algorithm(&owned(OID_SHA512)).unwrap(),
            DigestAlgorithm::Sha512
        );
        assert_eq!(
            registry.digest_algorithm(&owned(OID_OIW_SHA1_RSA)).unwrap(),
            DigestAlgorithm::Sha1
        );
        assert_eq!(
            registry.digest_algorithm(&owned(OID_SHA1_RSA)).unwrap(),
            DigestAlgorithm::Sha1
        );
    }

    #[test]
    fn md5_is_recognized_but_unsupported() {
        let registry = registry();

        assert!(registry.is_registered_digest(&owned(OID_MD5)));
        assert!(matches!(
            registry.digest_algorithm(&owned(OID_MD5)),
            Err(Pkcs7Error::UnsupportedDigestAlgorithm("MD5"))
        ));
    }

    #[test]
    fn unknown_digest() {
        let oid = owned(OID_RSA);

        assert!(!registry().is_registered_digest(&oid));
        assert!(matches!(
            registry().digest_algorithm(&oid),
            Err(Pkcs7Error::UnknownDigestAlgorithm(_))
        ));
    }

    #[test]
    fn rsa_signatures_follow_digest() {
        let registry = registry();

        assert_eq!(
            registry
                .signature_algorithm(&owned(OID_RSA), DigestAlgorithm::Sha384)
                .unwrap(),
            SignatureAlgorithm::RsaSha384
        );
        assert_eq!(
            registry
                .signature_algorithm(&owned(OID_OIW_SHA1_RSA), DigestAlgorithm::Sha1)
                .unwrap(),
            SignatureAlgorithm::RsaSha1
        );
        assert_eq!(
            registry
                .signature_algorithm(&owned(OID_SHA1_RSA), DigestAlgorithm::Sha256)
                .unwrap(),
            SignatureAlgorithm::RsaSha256
        );
        assert!(registry
            .signature_algorithm(&owned(OID_SHA256), DigestAlgorithm::Sha256)
            .is_err());
    }

    #[test]
    fn verification_algorithm_requires_matching_key() {
        let registry = registry();

        assert!(registry
            .verification_algorithm(&owned(OID_RSA), DigestAlgorithm::Sha256, KeyAlgorithm::Rsa)
            .is_ok());
        assert!(registry
            .verification_algorithm(
                &owned(OID_RSA),
                DigestAlgorithm::Sha256,
                KeyAlgorithm::Ed25519
            )
            .is_err());
    }
}
