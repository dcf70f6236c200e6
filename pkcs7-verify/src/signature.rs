// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Raw signature extraction.

use {
    crate::{message::SignedMessage, Pkcs7Error},
    bytes::Bytes,
};

/// Obtain the `encryptedDigest` of the only signer of PKCS #7 data.
///
/// No cryptographic operation is performed. Fails unless the data has
/// exactly one `SignerInfo`.
pub fn get_signature(data: &[u8]) -> Result<Bytes, Pkcs7Error> {
    let message = SignedMessage::from_p7(data)?;
    let signer = message.single_signer()?;

    Ok(Bytes::copy_from_slice(signer.signature()))
}

/// Length of the signature [get_signature] would return.
///
/// Use to size the destination passed to [copy_signature].
pub fn signature_length(data: &[u8]) -> Result<usize, Pkcs7Error> {
    Ok(get_signature(data)?.len())
}

/// Copy the signature of the only signer into `dest`.
///
/// Returns the number of bytes written, which equals [signature_length].
pub fn copy_signature(data: &[u8], dest: &mut [u8]) -> Result<usize, Pkcs7Error> {
    let signature = get_signature(data)?;
    let available = dest.len();

    let dest = dest
        .get_mut(..signature.len())
        .ok_or(Pkcs7Error::DestinationTooSmall {
            needed: signature.len(),
            available,
        })?;
    dest.copy_from_slice(&signature);

    Ok(signature.len())
}

#[cfg(test)]
mod test {
    use super::*;

    const CHAIN_SHA256: &[u8] = include_bytes!("testdata/chain-sha256.p7");
    const TWO_SIGNERS: &[u8] = include_bytes!("testdata/two-signers.p7");
    const NO_CERTS: &[u8] = include_bytes!("testdata/no-certs.p7");

    #[test]
    fn raw_encrypted_digest() {
        let signature = get_signature(CHAIN_SHA256).unwrap();

        // The encrypted digest is the final field of the message.
        assert_eq!(signature.len(), 256);
        assert_eq!(signature.as_ref(), &CHAIN_SHA256[CHAIN_SHA256.len() - 256..]);

        assert_eq!(get_signature(&CHAIN_SHA256[19..]).unwrap(), signature);
    }

    #[test]
    fn two_phase_copy() {
        let len = signature_length(CHAIN_SHA256).unwrap();

        let mut dest = vec![0u8; len];
        let copied = copy_signature(CHAIN_SHA256, &mut dest).unwrap();

        assert_eq!(copied, len);
        assert_eq!(dest.as_slice(), get_signature(CHAIN_SHA256).unwrap().as_ref());

        let mut larger = vec![0xffu8; len + 8];
        assert_eq!(copy_signature(CHAIN_SHA256, &mut larger).unwrap(), len);
        assert_eq!(&larger[..len], dest.as_slice());
        assert_eq!(&larger[len..], &[0xff; 8]);
    }

    #[test]
    fn destination_too_small() {
        let mut dest = vec![0u8; 255];

        assert!(matches!(
            copy_signature(CHAIN_SHA256, &mut dest),
            Err(Pkcs7Error::DestinationTooSmall {
                needed: 256,
                available: 255
            })
        ));
        assert!(dest.iter().all(|b| *b == 0));
    }

    #[test]
    fn requires_single_signer() {
        assert!(matches!(
            get_signature(TWO_SIGNERS),
            Err(Pkcs7Error::UnexpectedSignerCount(2))
        ));
        assert!(signature_length(TWO_SIGNERS).is_err());
    }

    #[test]
    fn certificates_not_required() {
        assert_eq!(signature_length(NO_CERTS).unwrap(), 256);
    }
}
