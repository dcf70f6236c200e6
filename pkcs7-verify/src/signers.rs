// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signer certificate extraction.

use {
    crate::{certificate_list::CertificateList, message::SignedMessage, Pkcs7Error},
    log::debug,
};

/// Certificates of the signers of a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignerCertificates {
    /// Signer certificates, serialized by popping the `SignerInfo` ordered
    /// sequence. The certificate of the last signer comes first.
    pub certificates: CertificateList,

    /// DER of the last popped certificate, i.e. the first signer's.
    pub trusted: Vec<u8>,
}

/// Extract the signer certificates of PKCS #7 data.
///
/// The input may be a `ContentInfo` or a bare `SignedData`. Each
/// `SignerInfo` is matched to an embedded certificate by issuer and serial
/// number. The resulting sequence is drained from its end into a
/// [CertificateList] and the last certificate drained is designated as
/// `trusted`.
///
/// Fails if the data is not signed data, if there are no signers, or if a
/// signer's certificate is not embedded.
pub fn get_signers(data: &[u8]) -> Result<SignerCertificates, Pkcs7Error> {
    let message = SignedMessage::from_p7(data)?;

    let stack = message
        .signer_certificates()?
        .into_iter()
        .map(|cert| cert.constructed_data())
        .collect::<Vec<_>>();

    // Popping drains the stack from its end, so its first element is popped last.
    let trusted = *stack.first().ok_or(Pkcs7Error::NoSigners)?;

    let mut owned = Vec::new();
    owned.try_reserve_exact(trusted.len())?;
    owned.extend_from_slice(trusted);

    let certificates = CertificateList::encode_stack(stack)?;

    debug!("extracted {} signer certificates", certificates.len());

    Ok(SignerCertificates {
        certificates,
        trusted: owned,
    })
}
