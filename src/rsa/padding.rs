use crate::rsa::error::{Result, RsaError};
use crate::rsa::math::BigMath;
use crate::rsa::random::RandomGenerator;

pub const BLOCK_TYPE_SIGN: u8 = 0x01;
pub const BLOCK_TYPE_ENCRYPT: u8 = 0x02;
pub const MIN_PADDING_LEN: usize = 8;
/// Leading zero, block type, minimum padding and separator.
pub const PADDING_OVERHEAD: usize = 3 + MIN_PADDING_LEN;

/// Marker in front of each chunk when the modulus is too short for type 0x02.
const COMPACT_MARKER: u8 = 0x01;

/// Moduli of at most this many bytes use compact framing.
fn is_compact(k: usize) -> bool {
    k <= PADDING_OVERHEAD
}

pub fn chunk_size(k: usize) -> usize {
    if is_compact(k) { k.saturating_sub(2) } else { k - PADDING_OVERHEAD }
}

/// `0x00 || 0x02 || nonzero random bytes || 0x00 || chunk`, exactly `k` bytes.
pub fn pad_encrypt<R: RandomGenerator + ?Sized>(chunk: &[u8], k: usize, rng: &mut R) -> Result<Vec<u8>> {
    let max = chunk_size(k);
    if chunk.len() > max {
        return Err(RsaError::MessageTooLong { len: chunk.len(), max });
    }
    let mut block = Vec::with_capacity(k);
    if is_compact(k) {
        block.resize(k - chunk.len() - 1, 0);
        block.push(COMPACT_MARKER);
    } else {
        block.push(0x00);
        block.push(BLOCK_TYPE_ENCRYPT);
        for _ in 0..k - chunk.len() - 3 {
            block.push(rng.next_nonzero_byte());
        }
        block.push(0x00);
    }
    block.extend_from_slice(chunk);
    Ok(block)
}

pub fn unpad_encrypt(block: &[u8], k: usize) -> Result<&[u8]> {
    if is_compact(k) {
        let start = block.iter().position(|b| *b != 0)
            .ok_or(RsaError::PaddingCheckFailed("empty block"))?;
        if start == 0 || block[start] != COMPACT_MARKER {
            return Err(RsaError::PaddingCheckFailed("missing chunk marker"));
        }
        return Ok(&block[start + 1..]);
    }
    if block.len() < PADDING_OVERHEAD || block[0] != 0x00 || block[1] != BLOCK_TYPE_ENCRYPT {
        return Err(RsaError::PaddingCheckFailed("wrong block type"));
    }
    let sep = block[2..].iter().position(|b| *b == 0)
        .ok_or(RsaError::PaddingCheckFailed("no zero separator"))? + 2;
    if sep < 2 + MIN_PADDING_LEN {
        return Err(RsaError::PaddingCheckFailed("padding shorter than 8 bytes"));
    }
    Ok(&block[sep + 1..])
}

/// `0x00 || 0x01 || 0xff.. || 0x00 || digest`, exactly `k` bytes.
pub fn pad_sign(digest: &[u8], k: usize) -> Result<Vec<u8>> {
    let max = k.saturating_sub(PADDING_OVERHEAD);
    if k < PADDING_OVERHEAD || digest.len() > max {
        return Err(RsaError::MessageTooLong { len: digest.len(), max });
    }
    let mut block = Vec::with_capacity(k);
    block.push(0x00);
    block.push(BLOCK_TYPE_SIGN);
    block.resize(k - digest.len() - 1, 0xff);
    block.push(0x00);
    block.extend_from_slice(digest);
    Ok(block)
}

/// Returns the digest of a well formed signature block.
pub fn unpad_sign(block: &[u8]) -> Option<&[u8]> {
    if block.len() < PADDING_OVERHEAD || block[0] != 0x00 || block[1] != BLOCK_TYPE_SIGN {
        return None;
    }
    let fill = block[2..].iter().take_while(|b| **b == 0xff).count();
    let sep = 2 + fill;
    if fill < MIN_PADDING_LEN || block.get(sep) != Some(&0x00) {
        return None;
    }
    Some(&block[sep + 1..])
}

pub fn os2ip<M: BigMath>(block: &[u8]) -> M::Int {
    let le: Vec<u8> = block.iter().rev().copied().collect();
    M::bytes_to_int(&le)
}

/// Integer to exactly `k` big-endian bytes, left padded with zeros.
pub fn i2osp<M: BigMath>(n: &M::Int, k: usize) -> Result<Vec<u8>> {
    let mut le = M::int_to_bytes(n);
    while le.len() > 1 && le.last() == Some(&0) {
        le.pop();
    }
    if le.len() > k {
        return Err(RsaError::MessageTooLong { len: le.len(), max: k });
    }
    le.resize(k, 0);
    le.reverse();
    Ok(le)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use crate::rsa::math::NativeMath;
    use super::*;

    #[test]
    fn test_pad_encrypt_layout() {
        let mut rng = StdRng::seed_from_u64(1);
        let data = b"Hello";
        let block = pad_encrypt(data, 64, &mut rng).unwrap();
        assert_eq!(block.len(), 64);
        assert_eq!(&block[..2], &[0x00, 0x02]);
        assert_eq!(block[64 - data.len() - 1], 0x00);
        assert!(block[2..64 - data.len() - 1].iter().all(|b| *b != 0));
        assert_eq!(unpad_encrypt(&block, 64).unwrap(), data);
    }

    #[test]
    fn test_pad_encrypt_limits() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(chunk_size(64), 53);
        assert!(pad_encrypt(&[0u8; 53], 64, &mut rng).is_ok());
        assert!(matches!(pad_encrypt(&[0u8; 54], 64, &mut rng), Err(RsaError::MessageTooLong { len: 54, max: 53 })));
        let block = pad_encrypt(&[], 12, &mut rng).unwrap();
        assert_eq!(unpad_encrypt(&block, 12).unwrap(), &[] as &[u8]);
    }

    #[test]
    fn test_compact_framing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(chunk_size(4), 2);
        assert_eq!(chunk_size(2), 0);
        let block = pad_encrypt(&[0x00, 0x31], 4, &mut rng).unwrap();
        assert_eq!(block, vec![0x00, 0x01, 0x00, 0x31]);
        assert_eq!(unpad_encrypt(&block, 4).unwrap(), &[0x00, 0x31]);
        let block = pad_encrypt(&[0x7f], 4, &mut rng).unwrap();
        assert_eq!(block, vec![0x00, 0x00, 0x01, 0x7f]);
        assert!(matches!(unpad_encrypt(&[0x00, 0x02, 0x00, 0x31], 4), Err(RsaError::PaddingCheckFailed(_))));
        assert!(matches!(unpad_encrypt(&[0x01, 0x00, 0x00, 0x31], 4), Err(RsaError::PaddingCheckFailed(_))));
        assert!(matches!(unpad_encrypt(&[0; 4], 4), Err(RsaError::PaddingCheckFailed(_))));
    }

    #[test]
    fn test_invalid_encrypt_padding() {
        let mut block = vec![0x00, 0x02];
        block.extend([0xaa; 7]);
        block.push(0x00);
        block.extend(b"data");
        assert!(matches!(unpad_encrypt(&block, block.len()), Err(RsaError::PaddingCheckFailed(_))));
        block[1] = 0x01;
        assert!(matches!(unpad_encrypt(&block, block.len()), Err(RsaError::PaddingCheckFailed(_))));
        let no_separator = [0x00, 0x02, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert!(matches!(unpad_encrypt(&no_separator, 13), Err(RsaError::PaddingCheckFailed(_))));
    }

    #[test]
    fn test_sign_padding() {
        let digest = [0x12, 0x34];
        let block = pad_sign(&digest, 16).unwrap();
        assert_eq!(block, vec![0x00, 0x01, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00, 0x12, 0x34]);
        assert_eq!(unpad_sign(&block), Some(&digest[..]));
        assert!(matches!(pad_sign(&[0; 6], 16), Err(RsaError::MessageTooLong { len: 6, max: 5 })));
        assert!(matches!(pad_sign(&[0; 1], 4), Err(RsaError::MessageTooLong { .. })));
        assert!(matches!(pad_sign(&[], 4), Err(RsaError::MessageTooLong { len: 0, max: 0 })));
        assert!(matches!(pad_sign(&[], 2), Err(RsaError::MessageTooLong { len: 0, max: 0 })));
        assert_eq!(pad_sign(&[], 11).unwrap().len(), 11);
        let mut short_fill = block.clone();
        short_fill[5] = 0x00;
        assert_eq!(unpad_sign(&short_fill), None);
        let mut wrong_type = block.clone();
        wrong_type[1] = 0x02;
        assert_eq!(unpad_sign(&wrong_type), None);
        assert_eq!(unpad_sign(&[0xff; 16]), None);
    }

    #[test]
    fn test_integer_conversion() {
        let n = os2ip::<NativeMath>(&[0x00, 0x01, 0x00, 0x01]);
        assert_eq!(n, NativeMath::from_u64(0x10001));
        assert_eq!(i2osp::<NativeMath>(&n, 6).unwrap(), vec![0, 0, 0, 1, 0, 1]);
        assert_eq!(i2osp::<NativeMath>(&NativeMath::from_u64(0), 3).unwrap(), vec![0, 0, 0]);
        assert!(i2osp::<NativeMath>(&n, 2).is_err());
    }
}
