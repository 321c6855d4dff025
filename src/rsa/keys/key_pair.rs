use crate::rsa::error::{Result, RsaError};
use crate::rsa::keys::{decode_private_key_pem, encode_private_key_pem, Key, KeyKind};
use crate::rsa::math::{BigMath, NativeMath};

/// Matching public and private keys sharing one modulus.
#[derive(Debug, Clone)]
pub struct KeyPair<M: BigMath = NativeMath> {
    pub(crate) public_key: Key<M>,
    pub(crate) private_key: Key<M>,
    pub(crate) bit_length: usize,
}

impl<M: BigMath> PartialEq for KeyPair<M> {
    fn eq(&self, other: &Self) -> bool {
        self.public_key == other.public_key && self.private_key == other.private_key
    }
}

impl<M: BigMath> KeyPair<M> {
    pub fn from_keys(public_key: Key<M>, private_key: Key<M>) -> Result<Self> {
        if public_key.kind() != KeyKind::Public || private_key.kind() != KeyKind::Private {
            return Err(RsaError::InvalidKeyData("key pair needs one public and one private key".to_string()));
        }
        if public_key.modulus() != private_key.modulus() {
            return Err(RsaError::InvalidKeyData("public and private key moduli differ".to_string()));
        }
        let bit_length = public_key.bit_length();
        Ok(Self { public_key, private_key, bit_length })
    }

    pub fn public_key(&self) -> &Key<M> {
        &self.public_key
    }

    pub fn private_key(&self) -> &Key<M> {
        &self.private_key
    }

    pub fn bit_length(&self) -> usize {
        self.bit_length
    }

    pub fn into_keys(self) -> (Key<M>, Key<M>) {
        (self.public_key, self.private_key)
    }

    pub fn from_pem(pem: &str) -> Result<Self> {
        decode_private_key_pem(pem)
    }

    pub fn to_pem(&self) -> Result<String> {
        encode_private_key_pem(self)
    }
}
