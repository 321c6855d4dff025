use crate::rsa::error::{Result, RsaError};

pub const TAG_INTEGER: u32 = 0x02;
pub const TAG_SEQUENCE: u32 = 0x10;

const CONSTRUCTED: u8 = 0x20;

/// One decoded TLV. `tag` is the tag number with class and constructed bits
/// stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asn1Node<'a> {
    pub tag: u32,
    pub constructed: bool,
    pub content: &'a [u8],
}

fn take(buffer: &[u8], pos: usize, need: usize) -> Result<&[u8]> {
    let have = buffer.len().saturating_sub(pos);
    if need > have {
        return Err(RsaError::TruncatedInput { pos, need, have });
    }
    Ok(&buffer[pos..pos + need])
}

/// Reads the TLV starting at `pos`, returning it with the position right
/// after its content.
pub fn parse_tlv(buffer: &[u8], mut pos: usize) -> Result<(Asn1Node<'_>, usize)> {
    let first = take(buffer, pos, 1)?[0];
    pos += 1;
    let constructed = first & CONSTRUCTED != 0;
    let mut tag = (first & 0x1f) as u32;
    if tag == 0x1f {
        tag = 0;
        loop {
            let b = take(buffer, pos, 1)?[0];
            pos += 1;
            if tag > (u32::MAX >> 7) {
                return Err(RsaError::UnexpectedTag { expected: 0x1f, found: tag });
            }
            tag = (tag << 7) | (b & 0x7f) as u32;
            if b & 0x80 == 0 { break; }
        }
    }
    let first_len = take(buffer, pos, 1)?[0];
    pos += 1;
    let len = if first_len & 0x80 == 0 {
        first_len as usize
    } else {
        let count = (first_len & 0x7f) as usize;
        // indefinite length is not DER
        if count == 0 || count > std::mem::size_of::<usize>() {
            return Err(RsaError::TruncatedInput { pos, need: count, have: buffer.len().saturating_sub(pos) });
        }
        let bytes = take(buffer, pos, count)?;
        pos += count;
        bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize)
    };
    let content = take(buffer, pos, len)?;
    Ok((Asn1Node { tag, constructed, content }, pos + len))
}

pub fn parse_integer(buffer: &[u8], pos: usize) -> Result<(Vec<u8>, usize)> {
    let (node, pos) = parse_tlv(buffer, pos)?;
    if node.tag != TAG_INTEGER || node.constructed {
        return Err(RsaError::UnexpectedTag { expected: TAG_INTEGER, found: node.tag });
    }
    let mut bytes = node.content.to_vec();
    bytes.reverse();
    Ok((bytes, pos))
}

fn encode_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
}

/// Single byte identifier (universal class), tag numbers below 31.
pub fn encode_tlv(tag: u32, constructed: bool, content: &[u8]) -> Vec<u8> {
    debug_assert!(tag < 0x1f);
    let mut out = Vec::with_capacity(content.len() + 6);
    out.push(tag as u8 | if constructed { CONSTRUCTED } else { 0 });
    encode_length(content.len(), &mut out);
    out.extend_from_slice(content);
    out
}

pub fn encode_integer(le_bytes: &[u8]) -> Vec<u8> {
    let mut be: Vec<u8> = le_bytes.iter().rev().skip_while(|b| **b == 0).copied().collect();
    if be.first().map_or(true, |b| b & 0x80 != 0) {
        be.insert(0, 0);
    }
    encode_tlv(TAG_INTEGER, false, &be)
}

pub fn encode_sequence(items: &[Vec<u8>]) -> Vec<u8> {
    encode_tlv(TAG_SEQUENCE, true, &items.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_and_long_length() {
        let (node, pos) = parse_tlv(&[0x02, 0x01, 0x05, 0xff], 0).unwrap();
        assert_eq!(node, Asn1Node { tag: 2, constructed: false, content: &[5] });
        assert_eq!(pos, 3);

        let mut data = vec![0x04, 0x82, 0x01, 0x00];
        data.extend(vec![0xaa; 256]);
        let (node, pos) = parse_tlv(&data, 0).unwrap();
        assert_eq!(node.tag, 4);
        assert_eq!(node.content.len(), 256);
        assert_eq!(pos, data.len());
    }

    #[test]
    fn test_multi_byte_tag() {
        let (node, pos) = parse_tlv(&[0x1f, 0x81, 0x01, 0x00], 0).unwrap();
        assert_eq!(node.tag, 0x81);
        assert!(node.content.is_empty());
        assert_eq!(pos, 4);
    }

    #[test]
    fn test_truncated() {
        assert!(matches!(parse_tlv(&[0x02, 0x03, 0x01], 0), Err(RsaError::TruncatedInput { need: 3, have: 1, .. })));
        assert!(matches!(parse_tlv(&[0x02], 0), Err(RsaError::TruncatedInput { .. })));
        assert!(matches!(parse_tlv(&[0x30, 0x84, 0x01], 0), Err(RsaError::TruncatedInput { .. })));
        assert!(matches!(parse_tlv(&[0x30, 0x80], 0), Err(RsaError::TruncatedInput { .. })));
        assert!(matches!(parse_tlv(&[], 0), Err(RsaError::TruncatedInput { .. })));
        assert!(matches!(parse_tlv(&[0x02, 0x00], 5), Err(RsaError::TruncatedInput { .. })));
    }

    #[test]
    fn test_integer() {
        let (bytes, pos) = parse_integer(&[0x02, 0x03, 0x00, 0x80, 0x01, 0x05], 0).unwrap();
        assert_eq!(bytes, vec![0x01, 0x80, 0x00]);
        assert_eq!(pos, 5);
        assert!(matches!(parse_integer(&[0x04, 0x01, 0x00], 0), Err(RsaError::UnexpectedTag { expected: 2, found: 4 })));
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_integer(&[0x00]), vec![0x02, 0x01, 0x00]);
        assert_eq!(encode_integer(&[]), vec![0x02, 0x01, 0x00]);
        assert_eq!(encode_integer(&[0x01, 0x00, 0x01]), vec![0x02, 0x03, 0x01, 0x00, 0x01]);
        assert_eq!(encode_integer(&[0x01, 0x80, 0x00]), vec![0x02, 0x03, 0x00, 0x80, 0x01]);
        let seq = encode_sequence(&[encode_integer(&[0x00]), vec![0u8; 200]]);
        assert_eq!(&seq[..3], &[0x30, 0x81, 203]);
        let (node, _) = parse_tlv(&seq, 0).unwrap();
        assert_eq!(node.tag, TAG_SEQUENCE);
        assert!(node.constructed);
        assert_eq!(node.content.len(), 203);
    }
}
