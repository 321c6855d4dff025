use std::sync::Arc;
use std::thread;
use crossbeam_channel::bounded;

pub mod config;
pub mod error;
pub mod keys;
pub mod math;
pub mod padding;
pub mod prime_gen;
pub mod random;

pub use config::*;
pub use error::*;
pub use keys::*;
pub use math::{BigMath, NativeMath, SoftMath};
pub use prime_gen::*;
pub use random::*;

/// Encryption, decryption, signing and verification with configured or
/// per call keys.
pub struct RSA<M: BigMath = NativeMath> {
    enc_key: Option<Key<M>>,
    dec_key: Option<Key<M>>,
    public_key: Option<Key<M>>,
    private_key: Option<Key<M>>,
    hash_func: HashFunc,
    threads: usize,
    error_handler: Option<ErrorHandler>,
}

impl<M: BigMath> Default for RSA<M> {
    fn default() -> Self {
        Self {
            enc_key: None,
            dec_key: None,
            public_key: None,
            private_key: None,
            hash_func: Arc::new(sha256),
            threads: 1,
            error_handler: None,
        }
    }
}

fn check_kind<M: BigMath>(key: Option<&Key<M>>, kind: KeyKind, name: &str) -> Result<()> {
    match key {
        Some(key) if key.kind() != kind => Err(RsaError::InvalidKeyData(
            format!("{} must be a {} key, got a {} key", name, kind, key.kind()))),
        _ => Ok(()),
    }
}

impl<M: BigMath> RSA<M> {
    pub fn new(params: Params<M>) -> Result<Self> {
        let mut rsa = Self::default();
        rsa.set_params(params)?;
        Ok(rsa)
    }

    /// Validates `params` and applies every field that is set. Nothing is
    /// applied if validation fails.
    pub fn set_params(&mut self, params: Params<M>) -> Result<()> {
        let checked = check_kind(params.enc_key.as_ref(), KeyKind::Public, "enc_key")
            .and(check_kind(params.dec_key.as_ref(), KeyKind::Private, "dec_key"))
            .and(check_kind(params.public_key.as_ref(), KeyKind::Public, "public_key"))
            .and(check_kind(params.private_key.as_ref(), KeyKind::Private, "private_key"));
        if let Err(e) = checked {
            if let Some(handler) = params.error_handler.as_ref().or(self.error_handler.as_ref()) {
                handler(&e);
            }
            return Err(e);
        }
        if params.error_handler.is_some() { self.error_handler = params.error_handler; }
        if params.enc_key.is_some() { self.enc_key = params.enc_key; }
        if params.dec_key.is_some() { self.dec_key = params.dec_key; }
        if params.public_key.is_some() { self.public_key = params.public_key; }
        if params.private_key.is_some() { self.private_key = params.private_key; }
        if let Some(hash_func) = params.hash_func { self.hash_func = hash_func; }
        if let Some(threads) = params.threads { self.threads = threads.max(1); }
        Ok(())
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn report<T>(&self, res: Result<T>) -> Result<T> {
        if let (Err(e), Some(handler)) = (&res, &self.error_handler) {
            handler(e);
        }
        res
    }

    /// Raises every block to the key's exponent, spreading the work over
    /// `self.threads` workers. Output order follows input order.
    fn process(&self, blocks: Vec<M::Int>, key: &Key<M>) -> Vec<M::Int> {
        let threads = self.threads.min(blocks.len());
        if threads <= 1 {
            return blocks.iter().map(|b| M::pow_mod(b, key.exponent(), key.modulus())).collect();
        }
        log::debug!("processing {} blocks in {} threads", blocks.len(), threads);
        let (map_tx, map_rx) = bounded::<(usize, M::Int)>(threads);
        let (reduce_tx, reduce_rx) = bounded::<(usize, M::Int)>(threads);
        thread::scope(|s| {
            for _ in 0..threads {
                let r = map_rx.clone();
                let tx = reduce_tx.clone();
                s.spawn(move || {
                    for (index, block) in r.iter() {
                        let res = M::pow_mod(&block, key.exponent(), key.modulus());
                        if tx.send((index, res)).is_err() { break; }
                    }
                });
            }
            drop(map_rx);
            drop(reduce_tx);
            s.spawn(move || {
                for item in blocks.into_iter().enumerate() {
                    if map_tx.send(item).is_err() { break; }
                }
            });
            let mut res_collect: Vec<(usize, M::Int)> = reduce_rx.iter().collect();
            res_collect.sort_by_key(|x| x.0);
            res_collect.into_iter().map(|x| x.1).collect()
        })
    }

    pub fn encrypt<R: RandomGenerator + ?Sized>(&self, data: &[u8], rng: &mut R) -> Result<Vec<u8>> {
        let key = self.enc_key.as_ref().ok_or(RsaError::MissingParameter("enc_key"));
        self.report(key.and_then(|key| self.encrypt_blocks(data, key, rng)))
    }

    pub fn encrypt_with_key<R: RandomGenerator + ?Sized>(&self, data: &[u8], key: &Key<M>, rng: &mut R) -> Result<Vec<u8>> {
        self.report(self.encrypt_blocks(data, key, rng))
    }

    fn encrypt_blocks<R: RandomGenerator + ?Sized>(&self, data: &[u8], key: &Key<M>, rng: &mut R) -> Result<Vec<u8>> {
        check_kind(Some(key), KeyKind::Public, "encryption key")?;
        if data.is_empty() {
            return Ok(vec![]);
        }
        let k = key.byte_length();
        let size = padding::chunk_size(k);
        if size == 0 {
            return Err(RsaError::MessageTooLong { len: data.len(), max: 0 });
        }
        let blocks = data.chunks(size)
            .map(|chunk| padding::pad_encrypt(chunk, k, rng).map(|b| padding::os2ip::<M>(&b)))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("encrypting {} bytes as {} blocks of {} bytes", data.len(), blocks.len(), k);
        let mut res = Vec::with_capacity(blocks.len() * k);
        for c in self.process(blocks, key) {
            res.extend(padding::i2osp::<M>(&c, k)?);
        }
        Ok(res)
    }

    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let key = self.dec_key.as_ref().ok_or(RsaError::MissingParameter("dec_key"));
        self.report(key.and_then(|key| self.decrypt_blocks(data, key)))
    }

    pub fn decrypt_with_key(&self, data: &[u8], key: &Key<M>) -> Result<Vec<u8>> {
        self.report(self.decrypt_blocks(data, key))
    }

    fn decrypt_blocks(&self, data: &[u8], key: &Key<M>) -> Result<Vec<u8>> {
        check_kind(Some(key), KeyKind::Private, "decryption key")?;
        let k = key.byte_length();
        if data.len() % k != 0 {
            return Err(RsaError::InvalidCiphertextLength { len: data.len(), block: k });
        }
        let blocks: Vec<M::Int> = data.chunks(k).map(padding::os2ip::<M>).collect();
        if blocks.iter().any(|c| M::compare_abs(c, key.modulus()).is_ge()) {
            return Err(RsaError::PaddingCheckFailed("ciphertext block out of range"));
        }
        log::debug!("decrypting {} blocks of {} bytes", blocks.len(), k);
        let mut res = Vec::with_capacity(data.len());
        for m in self.process(blocks, key) {
            let block = padding::i2osp::<M>(&m, k)?;
            res.extend_from_slice(padding::unpad_encrypt(&block, k)?);
        }
        Ok(res)
    }

    pub fn create_sign(&self, document: &[u8]) -> Result<Vec<u8>> {
        let key = self.private_key.as_ref().ok_or(RsaError::MissingParameter("private_key"));
        self.report(key.and_then(|key| self.sign_digest(document, key)))
    }

    pub fn create_sign_with_key(&self, document: &[u8], key: &Key<M>) -> Result<Vec<u8>> {
        self.report(self.sign_digest(document, key))
    }

    fn sign_digest(&self, document: &[u8], key: &Key<M>) -> Result<Vec<u8>> {
        check_kind(Some(key), KeyKind::Private, "signing key")?;
        let k = key.byte_length();
        let digest = (self.hash_func)(document);
        let block = padding::pad_sign(&digest, k)?;
        let s = M::pow_mod(&padding::os2ip::<M>(&block), key.exponent(), key.modulus());
        padding::i2osp::<M>(&s, k)
    }

    /// `Ok(false)` for any signature that does not match, errors only when
    /// no usable verification key is available.
    pub fn validate_sign(&self, document: &[u8], signature: &[u8]) -> Result<bool> {
        let key = self.public_key.as_ref().ok_or(RsaError::MissingParameter("public_key"));
        self.report(key.and_then(|key| self.verify_digest(document, signature, key)))
    }

    pub fn validate_sign_with_key(&self, document: &[u8], signature: &[u8], key: &Key<M>) -> Result<bool> {
        self.report(self.verify_digest(document, signature, key))
    }

    fn verify_digest(&self, document: &[u8], signature: &[u8], key: &Key<M>) -> Result<bool> {
        check_kind(Some(key), KeyKind::Public, "verification key")?;
        let k = key.byte_length();
        if signature.len() != k {
            log::debug!("signature has {} bytes, expected {}", signature.len(), k);
            return Ok(false);
        }
        let s = padding::os2ip::<M>(signature);
        if M::compare_abs(&s, key.modulus()).is_ge() {
            return Ok(false);
        }
        let m = M::pow_mod(&s, key.exponent(), key.modulus());
        let block = match padding::i2osp::<M>(&m, k) {
            Ok(block) => block,
            Err(_) => return Ok(false),
        };
        let digest = (self.hash_func)(document);
        Ok(padding::unpad_sign(&block) == Some(digest.as_slice()))
    }
}
