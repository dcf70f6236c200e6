// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signature and trust verification of PKCS #7 data.

use {
    crate::{
        algorithm, check_input_len,
        message::SignedMessage,
        trust::{TrustAnchor, TrustStore},
        Pkcs7Error,
    },
    log::debug,
};

/// Verify PKCS #7 data over detached content against a DER trust anchor.
///
/// Returns `true` only if every signer's signature verifies over `content`
/// and every signer's certificate has a path to `trust_anchor` under
/// [crate::VerificationPolicy::FIRMWARE]. The reason for a failure is
/// logged at debug level; use [verify_detailed] to obtain it.
pub fn verify(p7: &[u8], trust_anchor: &[u8], content: &[u8]) -> bool {
    match verify_detailed(p7, trust_anchor, content) {
        Ok(()) => true,
        Err(err) => {
            debug!("rejecting PKCS #7 signed data: {}", err);
            false
        }
    }
}

/// Like [verify] but reports why verification failed.
pub fn verify_detailed(p7: &[u8], trust_anchor: &[u8], content: &[u8]) -> Result<(), Pkcs7Error> {
    check_input_len("PKCS #7 data", p7)?;
    check_input_len("trust anchor", trust_anchor)?;
    check_input_len("content", content)?;

    let anchor = TrustAnchor::from_der(trust_anchor)?;

    verify_with_anchor(p7, &anchor, content)
}

/// Verify PKCS #7 data over detached content against a parsed anchor.
pub fn verify_with_anchor(
    p7: &[u8],
    anchor: &TrustAnchor,
    content: &[u8],
) -> Result<(), Pkcs7Error> {
    // Digest lookups below rely on the registry being populated.
    algorithm::registry();

    let message = SignedMessage::from_p7(p7)?;
    let signer_certs = message.signer_certificates()?;
    let store = TrustStore::new(anchor);

    for (signer, cert) in message.signers().iter().zip(signer_certs) {
        signer.verify_signature(cert, content)?;
        store.validate(cert, message.certificates())?;
    }

    debug!("verified {} signers", message.signers().len());

    Ok(())
}
