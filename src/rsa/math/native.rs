use std::cmp::Ordering;
use num::Integer;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, Zero};
use crate::rsa::error::{Result, RsaError};
use crate::rsa::math::BigMath;

/// `BigUint` backend relying on num-bigint's own modular exponentiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeMath;

impl BigMath for NativeMath {
    type Int = BigUint;

    fn backend_name() -> &'static str {
        "num-biguint"
    }

    fn from_u64(v: u64) -> BigUint {
        BigUint::from(v)
    }

    fn bytes_to_int(bytes: &[u8]) -> BigUint {
        BigUint::from_bytes_le(bytes)
    }

    fn int_to_bytes(n: &BigUint) -> Vec<u8> {
        n.to_bytes_le()
    }

    fn add(a: &BigUint, b: &BigUint) -> BigUint {
        a + b
    }

    fn sub(a: &BigUint, b: &BigUint) -> BigUint {
        if a < b { BigUint::zero() } else { a - b }
    }

    fn mul(a: &BigUint, b: &BigUint) -> BigUint {
        a * b
    }

    fn div(a: &BigUint, b: &BigUint) -> BigUint {
        a / b
    }

    fn rem(a: &BigUint, b: &BigUint) -> BigUint {
        a % b
    }

    fn pow_mod(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
        base.modpow(exp, modulus)
    }

    fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
        a.gcd(b)
    }

    fn inv_mod(a: &BigUint, m: &BigUint) -> Result<BigUint> {
        if m.is_zero() {
            return Err(RsaError::NotInvertible);
        }
        let (a, m) = (BigInt::from_biguint(Sign::Plus, a.clone()), BigInt::from_biguint(Sign::Plus, m.clone()));
        let res = a.extended_gcd(&m);
        if !res.gcd.is_one() {
            return Err(RsaError::NotInvertible);
        }
        let x = res.x.mod_floor(&m);
        debug_assert!(!x.is_negative());
        Ok(x.magnitude().clone())
    }

    fn is_zero(n: &BigUint) -> bool {
        n.is_zero()
    }

    fn is_one(n: &BigUint) -> bool {
        n.is_one()
    }

    fn decrement(n: &BigUint) -> BigUint {
        Self::sub(n, &BigUint::one())
    }

    fn compare_abs(a: &BigUint, b: &BigUint) -> Ordering {
        a.cmp(b)
    }

    fn bit_length(n: &BigUint) -> usize {
        n.bits() as usize
    }

    fn is_odd(n: &BigUint) -> bool {
        n.is_odd()
    }
}
