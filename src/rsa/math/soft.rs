use std::cmp::Ordering;
use num::Integer;
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};
use crate::rsa::error::{Result, RsaError};
use crate::rsa::math::BigMath;

/// Signed `BigInt` backend with hand written square-and-multiply and
/// extended Euclid. Values are kept non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SoftMath;

impl SoftMath {
    pub fn fast_modular_exponent(mut a: BigInt, mut q: BigInt, n: &BigInt) -> BigInt {
        let mut r: BigInt = BigInt::one() % n;
        a %= n;
        while !q.is_zero() {
            if q.bit(0) { r = (r * &a) % n; }
            q >>= 1;
            a = (&a * &a) % n;
        }
        r
    }

    // returns (gcd, x, y) with a * x + b * y = gcd
    fn extended_euclid(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
        if b.is_zero() {
            return (a.clone(), BigInt::one(), BigInt::zero());
        }
        let (d, x, y) = SoftMath::extended_euclid(b, &(a % b));
        let y2 = x - a / b * &y;
        (d, y, y2)
    }
}

impl BigMath for SoftMath {
    type Int = BigInt;

    fn backend_name() -> &'static str {
        "num-bigint-soft"
    }

    fn from_u64(v: u64) -> BigInt {
        BigInt::from(v)
    }

    fn bytes_to_int(bytes: &[u8]) -> BigInt {
        BigInt::from_bytes_le(Sign::Plus, bytes)
    }

    fn int_to_bytes(n: &BigInt) -> Vec<u8> {
        n.to_bytes_le().1
    }

    fn add(a: &BigInt, b: &BigInt) -> BigInt {
        a + b
    }

    fn sub(a: &BigInt, b: &BigInt) -> BigInt {
        if a < b { BigInt::zero() } else { a - b }
    }

    fn mul(a: &BigInt, b: &BigInt) -> BigInt {
        a * b
    }

    fn div(a: &BigInt, b: &BigInt) -> BigInt {
        a / b
    }

    fn rem(a: &BigInt, b: &BigInt) -> BigInt {
        a % b
    }

    fn pow_mod(base: &BigInt, exp: &BigInt, modulus: &BigInt) -> BigInt {
        SoftMath::fast_modular_exponent(base.clone(), exp.clone(), modulus)
    }

    fn gcd(a: &BigInt, b: &BigInt) -> BigInt {
        a.gcd(b)
    }

    fn inv_mod(a: &BigInt, m: &BigInt) -> Result<BigInt> {
        if m.is_zero() {
            return Err(RsaError::NotInvertible);
        }
        let (d, x, _) = SoftMath::extended_euclid(a, m);
        if !d.is_one() {
            return Err(RsaError::NotInvertible);
        }
        Ok((x % m + m) % m)
    }

    fn is_zero(n: &BigInt) -> bool {
        n.is_zero()
    }

    fn is_one(n: &BigInt) -> bool {
        n.is_one()
    }

    fn decrement(n: &BigInt) -> BigInt {
        Self::sub(n, &BigInt::one())
    }

    fn compare_abs(a: &BigInt, b: &BigInt) -> Ordering {
        a.abs().cmp(&b.abs())
    }

    fn bit_length(n: &BigInt) -> usize {
        n.bits() as usize
    }
}
