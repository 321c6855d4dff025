use chrono::Local;
use crate::rsa::error::{Result, RsaError};
use crate::rsa::keys::{Key, KeyKind, KeyPair};
use crate::rsa::math::BigMath;
use crate::rsa::random::RandomGenerator;

pub const DEFAULT_EXPONENT: u64 = 0x10001;
pub const DEFAULT_ROUNDS: u32 = 20;
pub const MIN_KEY_BITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyGenOptions {
    /// Public exponent `e`, odd and greater than one.
    pub exponent: u64,
    /// Miller-Rabin rounds per candidate.
    pub rounds: u32,
}

impl Default for KeyGenOptions {
    fn default() -> Self {
        Self { exponent: DEFAULT_EXPONENT, rounds: DEFAULT_ROUNDS }
    }
}

/// Draws primes of exactly `bits` bits until one satisfies
/// `gcd(e, p - 1) = 1` and differs from `avoid`.
fn generate_one_prime<M: BigMath, R: RandomGenerator + ?Sized>(
    bits: usize, e: &M::Int, avoid: Option<&M::Int>, rounds: u32, rng: &mut R,
) -> (M::Int, u64) {
    let mut try_times = 0;
    loop {
        let (p, tries) = M::random_prime(bits, rounds, rng);
        try_times += tries;
        if avoid == Some(&p) {
            log::trace!("drew the other prime again, retrying");
            continue;
        }
        if M::is_one(&M::gcd(e, &M::decrement(&p))) {
            return (p, try_times);
        }
        log::trace!("prime {:?} rejected, gcd(e, p - 1) != 1", p);
    }
}

/// Fails unless `d * e = 1 (mod f)`.
fn check_key_set<M: BigMath>(d: &M::Int, e: &M::Int, f: &M::Int) -> Result<()> {
    let res = M::rem(&M::mul(d, e), f);
    if !M::is_one(&res) {
        return Err(RsaError::KeyGenerationFailed(format!("(d * e) % f = {:?}, expected 1", res)));
    }
    Ok(())
}

impl<M: BigMath> KeyPair<M> {
    /// Generates a pair whose modulus has exactly `bit_length` bits (rounded
    /// up to whole bytes) with public exponent 65537.
    pub fn generate<R: RandomGenerator + ?Sized>(bit_length: usize, rng: &mut R) -> Result<Self> {
        Self::generate_with(bit_length, &KeyGenOptions::default(), rng)
    }

    pub fn generate_with<R: RandomGenerator + ?Sized>(bit_length: usize, options: &KeyGenOptions, rng: &mut R) -> Result<Self> {
        if bit_length < MIN_KEY_BITS {
            return Err(RsaError::InvalidKeyLength(bit_length));
        }
        if options.exponent < 3 || options.exponent % 2 == 0 {
            return Err(RsaError::KeyGenerationFailed(format!(
                "public exponent {} must be odd and greater than one", options.exponent)));
        }
        let bit_length = (bit_length + 7) / 8 * 8;
        let p_len = (bit_length + 1) / 2;
        let q_len = bit_length - p_len;
        let e = M::from_u64(options.exponent);
        let start = Local::now().timestamp_millis();
        let mut try_times = 0u64;
        let mut attempts = 0u64;
        let (p, q, n) = loop {
            attempts += 1;
            let (p, tries) = generate_one_prime::<M, R>(p_len, &e, None, options.rounds, rng);
            try_times += tries;
            let (q, tries) = generate_one_prime::<M, R>(q_len, &e, Some(&p), options.rounds, rng);
            try_times += tries;
            let (p, q) = if M::compare_abs(&p, &q).is_lt() { (q, p) } else { (p, q) };
            let n = M::mul(&p, &q);
            if M::bit_length(&n) == bit_length {
                break (p, q, n);
            }
            log::trace!("modulus has {} bits instead of {}, drawing new primes", M::bit_length(&n), bit_length);
        };
        let f = M::mul(&M::decrement(&p), &M::decrement(&q));
        let d = M::inv_mod(&e, &f)
            .map_err(|e| RsaError::KeyGenerationFailed(format!("cannot invert public exponent: {}", e)))?;
        check_key_set::<M>(&d, &e, &f)?;
        log::info!(
            "Done {}-bit key generation in {} tries ({} prime pairs) after {} ms",
            bit_length, try_times, attempts, Local::now().timestamp_millis() - start
        );
        let public_key = Key::new(n.clone(), e, KeyKind::Public)?;
        let private_key = Key::new(n, d, KeyKind::Private)?;
        Ok(Self { public_key, private_key, bit_length })
    }

    /// Replaces both keys with a freshly generated pair. `None` keeps the
    /// current bit length. On error the pair is left untouched.
    pub fn regenerate<R: RandomGenerator + ?Sized>(&mut self, bit_length: Option<usize>, rng: &mut R) -> Result<()> {
        self.regenerate_with(bit_length, &KeyGenOptions::default(), rng)
    }

    pub fn regenerate_with<R: RandomGenerator + ?Sized>(
        &mut self, bit_length: Option<usize>, options: &KeyGenOptions, rng: &mut R,
    ) -> Result<()> {
        let fresh = Self::generate_with(bit_length.unwrap_or(self.bit_length), options, rng)?;
        *self = fresh;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::rsa::math::{NativeMath, SoftMath};
    use crate::rsa::random::FnGenerator;
    use super::*;

    fn check_pair<M: BigMath>(pair: &KeyPair<M>, bits: usize, rng: &mut StdRng) {
        let (public, private) = (pair.public_key(), pair.private_key());
        assert_eq!(pair.bit_length(), bits);
        assert_eq!(public.bit_length(), bits);
        assert_eq!(M::bit_length(public.modulus()), bits);
        assert_eq!(public.modulus(), private.modulus());
        assert_eq!(*public.exponent(), M::from_u64(DEFAULT_EXPONENT));
        for _ in 0..8 {
            let m = M::rem(&M::random_bits(bits, rng, false), public.modulus());
            let c = M::pow_mod(&m, public.exponent(), public.modulus());
            assert_eq!(M::pow_mod(&c, private.exponent(), private.modulus()), m);
        }
    }

    #[test]
    fn test_exact_bit_lengths() -> Result<(), Box<dyn Error>> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for bits in [16, 32, 64, 128, 256, 512, 1024] {
            let pair: KeyPair = KeyPair::generate(bits, &mut rng)?;
            check_pair(&pair, bits, &mut rng);
        }
        Ok(())
    }

    #[test]
    fn test_soft_backend() -> Result<(), Box<dyn Error>> {
        let mut rng = StdRng::seed_from_u64(11);
        for bits in [24, 40, 256] {
            let pair: KeyPair<SoftMath> = KeyPair::generate(bits, &mut rng)?;
            check_pair(&pair, bits, &mut rng);
        }
        Ok(())
    }

    #[test]
    fn test_round_up_to_bytes() -> Result<(), Box<dyn Error>> {
        let mut rng = StdRng::seed_from_u64(5);
        let pair: KeyPair = KeyPair::generate(57, &mut rng)?;
        assert_eq!(pair.bit_length(), 64);
        Ok(())
    }

    #[test]
    fn test_invalid_length() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(KeyPair::<NativeMath>::generate(15, &mut rng), Err(RsaError::InvalidKeyLength(15))));
        assert!(matches!(KeyPair::<NativeMath>::generate(0, &mut rng), Err(RsaError::InvalidKeyLength(0))));
    }

    #[test]
    fn test_deterministic_with_seed() -> Result<(), Box<dyn Error>> {
        let a: KeyPair = KeyPair::generate(32, &mut StdRng::seed_from_u64(2005))?;
        let b: KeyPair = KeyPair::generate(32, &mut StdRng::seed_from_u64(2005))?;
        assert_eq!(a, b);
        let soft: KeyPair<SoftMath> = KeyPair::generate(32, &mut StdRng::seed_from_u64(2005))?;
        assert_eq!(soft.private_key().to_bytes(), a.private_key().to_bytes());
        Ok(())
    }

    #[test]
    fn test_custom_exponent_and_generator() -> Result<(), Box<dyn Error>> {
        let mut state = 0x2545_f491u32;
        let mut gen = FnGenerator(move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        });
        let options = KeyGenOptions { exponent: 3, rounds: 10 };
        let pair: KeyPair = KeyPair::generate_with(128, &options, &mut gen)?;
        assert_eq!(*pair.public_key().exponent(), NativeMath::from_u64(3));
        let bad = KeyGenOptions { exponent: 4, rounds: 10 };
        assert!(matches!(KeyPair::<NativeMath>::generate_with(128, &bad, &mut gen), Err(RsaError::KeyGenerationFailed(_))));
        Ok(())
    }

    #[test]
    fn test_regenerate() -> Result<(), Box<dyn Error>> {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pair: KeyPair = KeyPair::generate(64, &mut rng)?;
        let old = pair.clone();
        pair.regenerate(None, &mut rng)?;
        assert_eq!(pair.bit_length(), 64);
        assert_ne!(pair, old);
        pair.regenerate(Some(96), &mut rng)?;
        assert_eq!(pair.bit_length(), 96);
        assert_eq!(pair.public_key().modulus(), pair.private_key().modulus());

        let before = pair.clone();
        assert!(pair.regenerate(Some(8), &mut rng).is_err());
        assert_eq!(pair, before);
        Ok(())
    }
}
