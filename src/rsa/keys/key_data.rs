use std::fmt::{Display, Formatter};
use std::io::{Cursor, Read};
use std::str::FromStr;
use crate::rsa::error::{Result, RsaError};
use crate::rsa::keys::KeyKind;
use crate::rsa::math::{BigMath, NativeMath};

/// One half of an RSA key pair: the shared modulus and either the public or
/// the private exponent.
#[derive(Debug, Clone)]
pub struct Key<M: BigMath = NativeMath> {
    modulus: M::Int,
    exponent: M::Int,
    kind: KeyKind,
    bit_length: usize,
}

impl<M: BigMath> PartialEq for Key<M> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.modulus == other.modulus && self.exponent == other.exponent
    }
}

impl<M: BigMath> Key<M> {
    pub fn new(modulus: M::Int, exponent: M::Int, kind: KeyKind) -> Result<Self> {
        if M::is_zero(&modulus) {
            return Err(RsaError::InvalidKeyData("modulus is zero".to_string()));
        }
        if M::is_zero(&exponent) {
            return Err(RsaError::InvalidKeyData("exponent is zero".to_string()));
        }
        let bit_length = M::bit_length(&modulus);
        Ok(Self { modulus, exponent, kind, bit_length })
    }

    /// Builds a key from little-endian modulus and exponent bytes.
    pub fn from_bytes(modulus: &[u8], exponent: &[u8], kind: KeyKind) -> Result<Self> {
        Self::new(M::bytes_to_int(modulus), M::bytes_to_int(exponent), kind)
    }

    pub fn modulus(&self) -> &M::Int {
        &self.modulus
    }

    pub fn exponent(&self) -> &M::Int {
        &self.exponent
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    pub fn byte_length(&self) -> usize {
        (self.bit_length + 7) / 8
    }

    pub fn to_bytes(&self) -> (Vec<u8>, Vec<u8>) {
        (M::int_to_bytes(&self.modulus), M::int_to_bytes(&self.exponent))
    }

    /// Base64 text of: modulus length (u32 LE), exponent length (u32 LE),
    /// backend name length (u8), modulus, exponent, backend name, kind tag.
    pub fn serialize(&self) -> String {
        let (m, base) = self.to_bytes();
        let backend = M::backend_name().as_bytes();
        let mut data = Vec::with_capacity(9 + m.len() + base.len() + backend.len() + 7);
        data.extend_from_slice(&(m.len() as u32).to_le_bytes());
        data.extend_from_slice(&(base.len() as u32).to_le_bytes());
        data.push(backend.len() as u8);
        data.extend_from_slice(&m);
        data.extend_from_slice(&base);
        data.extend_from_slice(backend);
        data.extend_from_slice(self.kind.tag());
        base64::encode(data)
    }

    /// Parses the output of [`Key::serialize`]. The backend named in the
    /// string does not have to be `M`, all backends share the byte format.
    pub fn deserialize(s: &str) -> Result<Self> {
        let content = base64::decode(s.trim())
            .map_err(|e| RsaError::MalformedKeyString(format!("invalid base64: {}", e)))?;
        let mut cur = Cursor::new(content.as_slice());
        let mut len_m = [0u8; 4];
        let mut len_base = [0u8; 4];
        let mut len_backend = [0u8; 1];
        cur.read_exact(&mut len_m)
            .and_then(|_| cur.read_exact(&mut len_base))
            .and_then(|_| cur.read_exact(&mut len_backend))
            .map_err(|_| RsaError::MalformedKeyString("truncated length prefix".to_string()))?;
        let (len_m, len_base, len_backend) = (
            u32::from_le_bytes(len_m) as usize,
            u32::from_le_bytes(len_base) as usize,
            len_backend[0] as usize,
        );
        let expected = 9usize
            .checked_add(len_m)
            .and_then(|x| x.checked_add(len_base))
            .map(|x| x + len_backend + 7);
        if expected != Some(content.len()) {
            return Err(RsaError::MalformedKeyString(format!(
                "declared field lengths do not match the {} bytes of data", content.len())));
        }
        let data = &content[9..];
        let (m, rest) = data.split_at(len_m);
        let (base, rest) = rest.split_at(len_base);
        let (backend, tag) = rest.split_at(len_backend);
        let backend = std::str::from_utf8(backend)
            .map_err(|_| RsaError::MalformedKeyString("backend name is not utf-8".to_string()))?;
        let kind = KeyKind::from_tag(tag)
            .ok_or_else(|| RsaError::MalformedKeyString(format!("unknown key type tag {:x?}", tag)))?;
        if backend != M::backend_name() {
            log::debug!("loading {} key created by backend `{}` into `{}`", kind, backend, M::backend_name());
        }
        Self::from_bytes(m, base, kind)
    }
}

impl<M: BigMath> Display for Key<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialize())
    }
}

impl<M: BigMath> FromStr for Key<M> {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::deserialize(s)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use crate::rsa::math::SoftMath;
    use super::*;

    fn sample() -> Key {
        Key::from_bytes(&[0x35, 0x12, 0xcd, 0xab], &[0x01, 0x00, 0x01], KeyKind::Public).unwrap()
    }

    #[test]
    fn test_construct() -> Result<(), Box<dyn Error>> {
        let key = sample();
        assert_eq!(key.bit_length(), 32);
        assert_eq!(key.byte_length(), 4);
        assert_eq!(key.kind(), KeyKind::Public);
        assert_eq!(*key.exponent(), NativeMath::from_u64(65537));
        assert_eq!(key.to_bytes(), (vec![0x35, 0x12, 0xcd, 0xab], vec![0x01, 0x00, 0x01]));
        assert!(matches!(Key::<NativeMath>::from_bytes(&[0, 0], &[3], KeyKind::Public), Err(RsaError::InvalidKeyData(_))));
        assert!(matches!(Key::<NativeMath>::from_bytes(&[7], &[], KeyKind::Private), Err(RsaError::InvalidKeyData(_))));
        Ok(())
    }

    #[test]
    fn test_equality_includes_kind() {
        let public = sample();
        let (m, e) = public.to_bytes();
        let private: Key = Key::from_bytes(&m, &e, KeyKind::Private).unwrap();
        assert_ne!(public, private);
        assert_eq!(public, sample());
    }

    #[test]
    fn test_serialize_round_trip() -> Result<(), Box<dyn Error>> {
        let key = sample();
        let s = key.serialize();
        assert_eq!(Key::deserialize(&s)?, key);
        let parsed: Key = s.parse()?;
        assert_eq!(parsed, key);
        assert_eq!(key.to_string(), s);
        Ok(())
    }

    #[test]
    fn test_serialize_across_backends() -> Result<(), Box<dyn Error>> {
        let key = sample();
        let soft: Key<SoftMath> = Key::deserialize(&key.serialize())?;
        assert_eq!(soft.to_bytes(), key.to_bytes());
        let back: Key = Key::deserialize(&soft.serialize())?;
        assert_eq!(back, key);
        Ok(())
    }

    #[test]
    fn test_malformed_strings() {
        let data = base64::decode(sample().serialize()).unwrap();
        let check = |bytes: &[u8]| {
            let r = Key::<NativeMath>::deserialize(&base64::encode(bytes));
            assert!(matches!(r, Err(RsaError::MalformedKeyString(_))), "{:?}", r);
        };
        // truncated length prefix
        check(&data[..6]);
        // missing kind tag
        check(&data[..data.len() - 7]);
        // trailing garbage
        let mut longer = data.clone();
        longer.push(0);
        check(&longer);
        // unknown kind tag
        let mut tagged = data.clone();
        let n = tagged.len();
        tagged[n - 7..].copy_from_slice(b"SECRET_");
        check(&tagged);
        assert!(matches!(Key::<NativeMath>::deserialize("not base64!"), Err(RsaError::MalformedKeyString(_))));
    }
}
