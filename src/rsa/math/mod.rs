use std::cmp::Ordering;
use std::fmt::Debug;
use crate::rsa::error::Result;
use crate::rsa::random::RandomGenerator;

pub mod native;
pub mod soft;

pub use native::NativeMath;
pub use soft::SoftMath;

/// Odd primes below 256, used to reject most candidates before Miller-Rabin.
const SMALL_PRIMES: [u64; 53] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73,
    79, 83, 89, 97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157,
    163, 167, 173, 179, 181, 191, 193, 197, 199, 211, 223, 227, 229, 233, 239,
    241, 251,
];

pub trait BigMath: Clone + Debug + Default + PartialEq + Send + Sync + 'static {
    type Int: Clone + Debug + PartialEq + Send + Sync;

    /// Stored in serialized keys.
    fn backend_name() -> &'static str;

    fn from_u64(v: u64) -> Self::Int;

    fn bytes_to_int(bytes: &[u8]) -> Self::Int;

    /// Integer to little-endian bytes without high zero bytes, zero is `[0]`.
    fn int_to_bytes(n: &Self::Int) -> Vec<u8>;

    fn add(a: &Self::Int, b: &Self::Int) -> Self::Int;

    /// `a - b`, saturating at zero.
    fn sub(a: &Self::Int, b: &Self::Int) -> Self::Int;

    fn mul(a: &Self::Int, b: &Self::Int) -> Self::Int;

    fn div(a: &Self::Int, b: &Self::Int) -> Self::Int;

    fn rem(a: &Self::Int, b: &Self::Int) -> Self::Int;

    fn pow_mod(base: &Self::Int, exp: &Self::Int, modulus: &Self::Int) -> Self::Int;

    fn gcd(a: &Self::Int, b: &Self::Int) -> Self::Int;

    /// `x` with `a * x = 1 (mod m)`, fails with `NotInvertible` when
    /// `gcd(a, m) != 1`.
    fn inv_mod(a: &Self::Int, m: &Self::Int) -> Result<Self::Int>;

    fn is_zero(n: &Self::Int) -> bool;

    fn is_one(n: &Self::Int) -> bool;

    fn decrement(n: &Self::Int) -> Self::Int;

    fn compare_abs(a: &Self::Int, b: &Self::Int) -> Ordering;

    fn bit_length(n: &Self::Int) -> usize;

    fn is_odd(n: &Self::Int) -> bool {
        Self::int_to_bytes(n)[0] & 1 == 1
    }

    /// Uniform integer below `2^bits`. With `force_top_bit` the result has
    /// exactly `bits` bits.
    fn random_bits<R: RandomGenerator + ?Sized>(bits: usize, rng: &mut R, force_top_bit: bool) -> Self::Int {
        if bits == 0 {
            return Self::from_u64(0);
        }
        let mut buf = vec![0u8; (bits + 7) / 8];
        rng.fill(&mut buf);
        let excess = buf.len() * 8 - bits;
        let top = buf.len() - 1;
        buf[top] &= 0xff >> excess;
        if force_top_bit {
            buf[top] |= 0x80 >> excess;
        }
        Self::bytes_to_int(&buf)
    }

    /// Trial division by small primes followed by `rounds` Miller-Rabin
    /// rounds with witnesses drawn from `rng`.
    fn is_probable_prime<R: RandomGenerator + ?Sized>(n: &Self::Int, rounds: u32, rng: &mut R) -> bool {
        let two = Self::from_u64(2);
        match Self::compare_abs(n, &two) {
            Ordering::Less => return false,
            Ordering::Equal => return true,
            Ordering::Greater => {}
        }
        if !Self::is_odd(n) {
            return false;
        }
        for p in SMALL_PRIMES {
            let p = Self::from_u64(p);
            if Self::compare_abs(n, &p) == Ordering::Equal {
                return true;
            }
            if Self::is_zero(&Self::rem(n, &p)) {
                return false;
            }
        }
        // n > 251 from here on
        let n_minus_one = Self::decrement(n);
        let mut d = n_minus_one.clone();
        let mut s = 0u32;
        while !Self::is_odd(&d) {
            d = Self::div(&d, &two);
            s += 1;
        }
        let witness_range = Self::sub(n, &Self::from_u64(3));
        let bits = Self::bit_length(n);
        'witness: for _ in 0..rounds {
            let a = Self::add(&Self::rem(&Self::random_bits(bits, rng, false), &witness_range), &two);
            let mut x = Self::pow_mod(&a, &d, n);
            if Self::is_one(&x) || x == n_minus_one {
                continue;
            }
            for _ in 1..s {
                x = Self::pow_mod(&x, &two, n);
                if x == n_minus_one {
                    continue 'witness;
                }
            }
            return false;
        }
        true
    }

    /// Draws odd integers of exactly `bits` bits until one passes
    /// `is_probable_prime`. Returns the prime and the number of draws.
    fn random_prime<R: RandomGenerator + ?Sized>(bits: usize, rounds: u32, rng: &mut R) -> (Self::Int, u64) {
        let one = Self::from_u64(1);
        let mut tries = 0u64;
        loop {
            tries += 1;
            let mut candidate = Self::random_bits(bits, rng, true);
            if !Self::is_odd(&candidate) {
                candidate = Self::add(&candidate, &one);
            }
            if Self::bit_length(&candidate) == bits && Self::is_probable_prime(&candidate, rounds, rng) {
                return (candidate, tries);
            }
        }
    }
}
