use std::sync::Arc;
use lazy_static::lazy_static;
use sha2::{Digest, Sha256};
use crate::rsa::error::RsaError;
use crate::rsa::keys::Key;
use crate::rsa::math::{BigMath, NativeMath};
use crate::rsa::prime_gen::DEFAULT_ROUNDS;

/// Digest applied to documents before signing and verification.
pub type HashFunc = Arc<dyn Fn(&[u8]) -> Vec<u8> + Send + Sync>;

/// Observer called with every error the engine returns.
pub type ErrorHandler = Arc<dyn Fn(&RsaError) + Send + Sync>;

pub fn sha256(data: &[u8]) -> Vec<u8> {
    Sha256::digest(data).to_vec()
}

/// Engine settings. `None` leaves the current value unchanged when merged
/// with [`crate::RSA::set_params`].
pub struct Params<M: BigMath = NativeMath> {
    pub enc_key: Option<Key<M>>,
    pub dec_key: Option<Key<M>>,
    pub public_key: Option<Key<M>>,
    pub private_key: Option<Key<M>>,
    /// Defaults to SHA-256.
    pub hash_func: Option<HashFunc>,
    /// Worker threads for block exponentiation, defaults to 1.
    pub threads: Option<usize>,
    pub error_handler: Option<ErrorHandler>,
}

impl<M: BigMath> Default for Params<M> {
    fn default() -> Self {
        Self {
            enc_key: None,
            dec_key: None,
            public_key: None,
            private_key: None,
            hash_func: None,
            threads: None,
            error_handler: None,
        }
    }
}

impl<M: BigMath> Clone for Params<M> {
    fn clone(&self) -> Self {
        Self {
            enc_key: self.enc_key.clone(),
            dec_key: self.dec_key.clone(),
            public_key: self.public_key.clone(),
            private_key: self.private_key.clone(),
            hash_func: self.hash_func.clone(),
            threads: self.threads,
            error_handler: self.error_handler.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: String,
    pub key: String,
    pub input: String,
    pub output: String,
    pub signature: String,
    pub bits: usize,
    pub rounds: u32,
    pub threads: usize,
    pub silent: bool,
}

lazy_static! {
    pub static ref CONFIG_DEF: Config = Config {
        mode: String::from("generate"),
        key: String::from("key"),
        input: String::from("stdin"),
        output: String::from("stdout"),
        signature: String::from("signature.bin"),
        bits: 1024,
        rounds: DEFAULT_ROUNDS,
        threads: num_cpus::get(),
        silent: false,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_default() {
        let digest = sha256(b"abc");
        assert_eq!(digest.len(), 32);
        assert_eq!(&digest[..4], &[0xba, 0x78, 0x16, 0xbf]);
    }

    #[test]
    fn test_config_defaults() {
        assert_eq!(CONFIG_DEF.mode, "generate");
        assert!(CONFIG_DEF.threads >= 1);
        let params: Params = Params::default();
        assert!(params.enc_key.is_none() && params.threads.is_none());
    }
}
