// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signer chain construction over embedded certificates.

use {
    crate::{certificate_list::CertificateList, message::SignedMessage, Pkcs7Error},
    log::debug,
    x509_certificate::CapturedX509Certificate,
};

/// Embedded certificates split by whether they are on the signer's chain.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChainPartition {
    /// The signer certificate followed by each issuer found, in walk order.
    pub chained: Vec<CapturedX509Certificate>,

    /// Embedded certificates not consumed by the walk, in original order.
    pub unchained: Vec<CapturedX509Certificate>,
}

impl ChainPartition {
    /// Walk issuer links from the signer of a single-signer message.
    ///
    /// The signer certificate is removed from the pool up front. From the
    /// signer, the walk repeatedly takes the first pool certificate whose
    /// subject equals the current certificate's issuer, removing it from the
    /// pool. It stops when no issuer is found or when the issuer found is
    /// the current certificate itself. A chain that does not reach a root is
    /// a valid outcome.
    pub fn from_message(message: &SignedMessage) -> Result<Self, Pkcs7Error> {
        let signer = message.single_signer()?;
        let signer_cert = message
            .signer_certificate(signer)
            .ok_or(Pkcs7Error::SignerCertificateNotFound)?;

        let mut pool = message.certificates().to_vec();
        if let Some(index) = pool.iter().position(|cert| cert == signer_cert) {
            pool.remove(index);
        }

        let mut chained = vec![signer_cert.clone()];

        while let Some(current) = chained.last() {
            let index = match pool
                .iter()
                .position(|cert| cert.subject_name() == current.issuer_name())
            {
                Some(index) => index,
                None => {
                    debug!("no issuer found in pool; chain ends");
                    break;
                }
            };

            if &pool[index] == current {
                debug!("chain reached self-issued certificate");
                break;
            }

            let issuer = pool.remove(index);
            debug!(
                "chained issuer {}",
                issuer
                    .subject_common_name()
                    .unwrap_or_else(|| "<unnamed>".to_string())
            );
            chained.push(issuer);
        }

        Ok(Self {
            chained,
            unchained: pool,
        })
    }
}

/// Serialized form of a [ChainPartition].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateLists {
    /// Chained certificates, popped from the walk order: the certificate
    /// furthest from the signer comes first and the signer comes last.
    pub chained: CertificateList,

    /// Unchained certificates, popped from the original order.
    pub unchained: CertificateList,
}

/// Partition the embedded certificates of PKCS #7 data around its signer.
///
/// Requires exactly one signer. See [ChainPartition::from_message].
pub fn build_chain(data: &[u8]) -> Result<ChainPartition, Pkcs7Error> {
    let message = SignedMessage::from_p7(data)?;

    ChainPartition::from_message(&message)
}

/// Obtain the chained and unchained certificates of PKCS #7 data as lists.
///
/// Both lists are serialized by popping their sequence, so each is the
/// reverse of the corresponding [ChainPartition] field. An empty side is
/// serialized as an empty list.
pub fn get_certificate_lists(data: &[u8]) -> Result<CertificateLists, Pkcs7Error> {
    let partition = build_chain(data)?;

    fn der(certs: &[CapturedX509Certificate]) -> Vec<&[u8]> {
        certs.iter().map(|cert| cert.constructed_data()).collect()
    }

    Ok(CertificateLists {
        chained: CertificateList::encode_stack(der(&partition.chained))?,
        unchained: CertificateList::encode_stack(der(&partition.unchained))?,
    })
}
