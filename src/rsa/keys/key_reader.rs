use std::cmp::Ordering;
use crate::rsa::error::{Result, RsaError};
use crate::rsa::keys::asn1::{parse_integer, parse_tlv, TAG_SEQUENCE};
use crate::rsa::keys::{Key, KeyKind, KeyPair, PEM_FOOTER, PEM_HEADER};
use crate::rsa::math::BigMath;

/// Extracts the base64 body framed by a header and footer line.
pub struct KeyReader<'a> {
    body: &'a str,
}

impl<'a> KeyReader<'a> {
    pub fn new(text: &'a str, header: &'static str, footer: &'static str) -> Result<Self> {
        let start = text.find(header).ok_or(RsaError::PemMarkerNotFound(header))? + header.len();
        let end = text[start..].find(footer).ok_or(RsaError::PemMarkerNotFound(footer))? + start;
        Ok(Self { body: &text[start..end] })
    }

    pub fn read_all(&self) -> Result<Vec<u8>> {
        let content: String = self.body.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        Ok(base64::decode(content)?)
    }
}

/// Parses a PKCS#1 `RSAPrivateKey` PEM block. Only version, modulus, public
/// and private exponent are read; any CRT fields after them are ignored.
pub fn decode_private_key_pem<M: BigMath>(pem: &str) -> Result<KeyPair<M>> {
    let der = KeyReader::new(pem, PEM_HEADER, PEM_FOOTER)?.read_all()?;
    let (seq, _) = parse_tlv(&der, 0)?;
    if seq.tag != TAG_SEQUENCE {
        return Err(RsaError::UnexpectedTag { expected: TAG_SEQUENCE, found: seq.tag });
    }
    if !seq.constructed {
        return Err(RsaError::NotConstructed(seq.tag));
    }
    let (_version, pos) = parse_integer(seq.content, 0)?;
    let (n, pos) = parse_integer(seq.content, pos)?;
    let (e, pos) = parse_integer(seq.content, pos)?;
    let (d, _) = parse_integer(seq.content, pos)?;

    let public_key: Key<M> = Key::from_bytes(&n, &e, KeyKind::Public)?;
    let private_key: Key<M> = Key::from_bytes(&n, &d, KeyKind::Private)?;
    let modulus = public_key.modulus();
    let two = M::from_u64(2);
    if M::compare_abs(modulus, &two) != Ordering::Greater {
        return Err(RsaError::InconsistentKeyTriple);
    }
    let c = M::pow_mod(&two, public_key.exponent(), modulus);
    if M::pow_mod(&c, private_key.exponent(), modulus) != two {
        return Err(RsaError::InconsistentKeyTriple);
    }
    log::debug!("loaded {}-bit key pair from PEM", public_key.bit_length());
    KeyPair::from_keys(public_key, private_key)
}
