// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Length-prefixed certificate list serialization.

use crate::Pkcs7Error;

/// Maximum number of certificates a list can hold.
///
/// The count is stored in a single byte.
pub const MAX_CERTIFICATES: usize = u8::MAX as usize;

/// Size of the length prefix preceding each certificate.
const LENGTH_PREFIX: usize = 4;

/// An ordered list of DER certificates in firmware wire format.
///
/// ```text
/// u8 count
/// count * {
///     u32 length (little-endian)
///     [u8; length] DER certificate
/// }
/// ```
///
/// The count always equals the number of certificates appended. An empty
/// list serializes as a single `00` byte. Dropping the list releases its
/// buffer.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateList {
    data: Vec<u8>,
}

impl Default for CertificateList {
    fn default() -> Self {
        Self { data: vec![0] }
    }
}

impl CertificateList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize a sequence of certificates by popping from its end.
    ///
    /// The last element of `stack` is written first, so the serialized
    /// order is the reverse of the sequence order.
    pub fn encode_stack<T: AsRef<[u8]>>(mut stack: Vec<T>) -> Result<Self, Pkcs7Error> {
        let mut list = Self::new();

        while let Some(cert) = stack.pop() {
            list.push(cert.as_ref())?;
        }

        Ok(list)
    }

    /// Append a DER certificate to the end of the list.
    pub fn push(&mut self, der: &[u8]) -> Result<(), Pkcs7Error> {
        let count = self.len();
        if count >= MAX_CERTIFICATES {
            return Err(Pkcs7Error::CertificateListOverflow {
                max: MAX_CERTIFICATES,
            });
        }

        let len =
            u32::try_from(der.len()).map_err(|_| Pkcs7Error::CertificateTooLarge(der.len()))?;

        self.data.try_reserve(LENGTH_PREFIX + der.len())?;
        self.data.extend_from_slice(&len.to_le_bytes());
        self.data.extend_from_slice(der);
        self.data[0] = (count + 1) as u8;

        Ok(())
    }

    /// Number of certificates in the list.
    pub fn len(&self) -> usize {
        self.data.first().copied().unwrap_or(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The serialized list.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Construct an instance from a serialized buffer, validating it.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, Pkcs7Error> {
        Self::decode(&data)?;

        Ok(Self { data })
    }

    /// Iterate over certificates in serialized order.
    pub fn iter(&self) -> CertificateListIter<'_> {
        CertificateListIter {
            remaining: self.data.get(1..).unwrap_or_default(),
            count: self.len(),
        }
    }

    /// Parse a serialized list into its certificates, in serialized order.
    ///
    /// The whole buffer must be consumed by exactly `count` entries.
    pub fn decode(data: &[u8]) -> Result<Vec<&[u8]>, Pkcs7Error> {
        let (count, mut remaining) = data
            .split_first()
            .ok_or(Pkcs7Error::MalformedCertificateList("missing count"))?;

        let mut certs = Vec::with_capacity(*count as usize);

        for _ in 0..*count {
            if remaining.len() < LENGTH_PREFIX {
                return Err(Pkcs7Error::MalformedCertificateList(
                    "truncated length prefix",
                ));
            }

            let (prefix, rest) = remaining.split_at(LENGTH_PREFIX);
            let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

            if rest.len() < len {
                return Err(Pkcs7Error::MalformedCertificateList(
                    "certificate extends past end of buffer",
                ));
            }

            let (cert, rest) = rest.split_at(len);
            certs.push(cert);
            remaining = rest;
        }

        if !remaining.is_empty() {
            return Err(Pkcs7Error::MalformedCertificateList(
                "trailing data after last certificate",
            ));
        }

        Ok(certs)
    }
}

impl AsRef<[u8]> for CertificateList {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<'a> IntoIterator for &'a CertificateList {
    type Item = &'a [u8];
    type IntoIter = CertificateListIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the certificates of a [CertificateList].
pub struct CertificateListIter<'a> {
    remaining: &'a [u8],
    count: usize,
}

impl<'a> Iterator for CertificateListIter<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.count == 0 || self.remaining.len() < LENGTH_PREFIX {
            return None;
        }

        let (prefix, rest) = self.remaining.split_at(LENGTH_PREFIX);
        let len = u32::from_le_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;
        let cert = rest.get(..len)?;

        self.remaining = &rest[len..];
        self.count -= 1;

        Some(cert)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn fake_cert(i: usize) -> Vec<u8> {
        vec![(i % 256) as u8; i % 7 + 1]
    }

    #[test]
    fn wire_format() {
        let mut list = CertificateList::new();
        list.push(&[0xaa, 0xbb]).unwrap();
        list.push(&[0xcc]).unwrap();

        assert_eq!(
            list.as_bytes(),
            &[0x02, 0x02, 0x00, 0x00, 0x00, 0xaa, 0xbb, 0x01, 0x00, 0x00, 0x00, 0xcc]
        );
    }

    #[test]
    fn empty_list() {
        let list = CertificateList::new();

        assert_eq!(list.as_bytes(), &[0x00]);
        assert!(list.is_empty());
        assert!(CertificateList::decode(list.as_bytes()).unwrap().is_empty());
        assert_eq!(list.iter().count(), 0);
    }

    #[test]
    fn encode_decode_counts() {
        for count in [0usize, 1, MAX_CERTIFICATES] {
            let certs = (0..count).map(fake_cert).collect::<Vec<_>>();

            let mut list = CertificateList::new();
            for cert in &certs {
                list.push(cert).unwrap();
            }

            assert_eq!(list.len(), count);
            assert_eq!(list.as_bytes()[0] as usize, count);

            let decoded = CertificateList::decode(list.as_bytes()).unwrap();
            assert_eq!(decoded.len(), count);
            for (got, wanted) in decoded.iter().zip(certs.iter()) {
                assert_eq!(*got, wanted.as_slice());
            }

            assert_eq!(list.iter().collect::<Vec<_>>(), decoded);
        }
    }

    #[test]
    fn count_overflow() {
        let mut list = CertificateList::new();
        for i in 0..MAX_CERTIFICATES {
            list.push(&fake_cert(i)).unwrap();
        }

        let before = list.clone();
        assert!(matches!(
            list.push(&[0x30]),
            Err(Pkcs7Error::CertificateListOverflow { .. })
        ));
        assert_eq!(list, before);

        let stack = (0..MAX_CERTIFICATES + 1).map(fake_cert).collect::<Vec<_>>();
        assert!(CertificateList::encode_stack(stack).is_err());
    }

    #[test]
    fn encode_stack_pops_from_end() {
        let stack = vec![vec![1u8], vec![2u8, 2], vec![3u8, 3, 3]];
        let list = CertificateList::encode_stack(stack).unwrap();

        let decoded = CertificateList::decode(list.as_bytes()).unwrap();
        assert_eq!(decoded, vec![&[3u8, 3, 3][..], &[2u8, 2][..], &[1u8][..]]);
    }

    #[test]
    fn malformed_lists_rejected() {
        assert!(CertificateList::decode(&[]).is_err());
        // Truncated length prefix.
        assert!(CertificateList::decode(&[0x01, 0x02, 0x00]).is_err());
        // Length past end.
        assert!(CertificateList::decode(&[0x01, 0x05, 0x00, 0x00, 0x00, 0xaa]).is_err());
        // Trailing data.
        assert!(CertificateList::decode(&[0x01, 0x01, 0x00, 0x00, 0x00, 0xaa, 0xbb]).is_err());
        // Count larger than entries.
        assert!(CertificateList::decode(&[0x02, 0x01, 0x00, 0x00, 0x00, 0xaa]).is_err());

        assert!(CertificateList::from_bytes(vec![0x01]).is_err());
        let list = CertificateList::from_bytes(vec![0x01, 0x01, 0x00, 0x00, 0x00, 0xaa]).unwrap();
        assert_eq!(list.len(), 1);
    }
}
