//! TLV encoding for names and version vectors.
//!
//! Every element is written as `TYPE LENGTH VALUE`, where TYPE and LENGTH
//! are VAR-NUMBERs:
//! - 0..=252 encode as a single byte
//! - up to 0xFFFF encode as `0xFD` followed by 2 big-endian bytes
//! - up to 0xFFFF_FFFF encode as `0xFE` followed by 4 big-endian bytes
//! - anything larger encodes as `0xFF` followed by 8 big-endian bytes
//!
//! Non-negative integers carried inside a VALUE use the smallest of
//! 1, 2, 4 or 8 bytes. Encoding is deterministic: the same input always
//! produces the same bytes.

use crate::error::{CoreError, Result};

/// Assigned TLV type numbers.
pub mod types {
    pub const NAME: u64 = 7;
    pub const GENERIC_NAME_COMPONENT: u64 = 8;
    pub const STATE_VECTOR: u64 = 201;
    pub const STATE_VECTOR_ENTRY: u64 = 202;
    pub const SEQ_NO: u64 = 204;
}

/// Append a VAR-NUMBER.
pub fn encode_var_number(buf: &mut Vec<u8>, n: u64) {
    if n < 253 {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(0xfd);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(0xfe);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(0xff);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Number of bytes `encode_var_number` writes for `n`.
pub fn var_number_len(n: u64) -> usize {
    if n < 253 {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Append a non-negative integer using the smallest valid width.
pub fn encode_non_negative_integer(buf: &mut Vec<u8>, n: u64) {
    if n <= 0xff {
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Number of bytes `encode_non_negative_integer` writes for `n`.
pub fn non_negative_integer_len(n: u64) -> usize {
    if n <= 0xff {
        1
    } else if n <= 0xffff {
        2
    } else if n <= 0xffff_ffff {
        4
    } else {
        8
    }
}

/// Decode a non-negative integer VALUE (1, 2, 4 or 8 bytes).
pub fn decode_non_negative_integer(value: &[u8]) -> Result<u64> {
    match value.len() {
        1 => Ok(value[0] as u64),
        2 => Ok(u16::from_be_bytes([value[0], value[1]]) as u64),
        4 => Ok(u32::from_be_bytes([value[0], value[1], value[2], value[3]]) as u64),
        8 => {
            let mut arr = [0u8; 8];
            arr.copy_from_slice(value);
            Ok(u64::from_be_bytes(arr))
        }
        n => Err(CoreError::InvalidIntegerWidth(n)),
    }
}

/// Append a TLV header (type and length).
pub fn encode_header(buf: &mut Vec<u8>, typ: u64, len: usize) {
    encode_var_number(buf, typ);
    encode_var_number(buf, len as u64);
}

/// Append a complete TLV element.
pub fn encode_tlv(buf: &mut Vec<u8>, typ: u64, value: &[u8]) {
    encode_header(buf, typ, value.len());
    buf.extend_from_slice(value);
}

/// Append a TLV element whose value is a non-negative integer.
pub fn encode_non_negative_integer_tlv(buf: &mut Vec<u8>, typ: u64, n: u64) {
    encode_header(buf, typ, non_negative_integer_len(n));
    encode_non_negative_integer(buf, n);
}

/// Total encoded size of a TLV element with a value of `value_len` bytes.
pub fn tlv_len(typ: u64, value_len: usize) -> usize {
    var_number_len(typ) + var_number_len(value_len as u64) + value_len
}

/// A parsed TLV element borrowing from the input buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// TLV type number.
    pub typ: u64,
    /// The VALUE bytes.
    pub value: &'a [u8],
}

impl<'a> Element<'a> {
    /// Fail unless this element has the given type.
    pub fn expect_type(&self, expected: u64) -> Result<()> {
        if self.typ != expected {
            return Err(CoreError::UnexpectedType {
                expected,
                actual: self.typ,
            });
        }
        Ok(())
    }

    /// Iterate the nested elements of this element's value.
    pub fn children(&self) -> Reader<'a> {
        Reader::new(self.value)
    }
}

/// Sequential TLV reader over a byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// True once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CoreError::Truncated(what))?;
        if end > self.buf.len() {
            return Err(CoreError::Truncated(what));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Read one VAR-NUMBER.
    pub fn read_var_number(&mut self) -> Result<u64> {
        let first = self.take(1, "var-number")?[0];
        match first {
            0xfd => {
                let b = self.take(2, "var-number")?;
                Ok(u16::from_be_bytes([b[0], b[1]]) as u64)
            }
            0xfe => {
                let b = self.take(4, "var-number")?;
                Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as u64)
            }
            0xff => {
                let b = self.take(8, "var-number")?;
                let mut arr = [0u8; 8];
                arr.copy_from_slice(b);
                Ok(u64::from_be_bytes(arr))
            }
            n => Ok(n as u64),
        }
    }

    /// Read the next complete element.
    pub fn read_element(&mut self) -> Result<Element<'a>> {
        let typ = self.read_var_number()?;
        let len = self.read_var_number()?;
        let len = usize::try_from(len).map_err(|_| CoreError::Truncated("length"))?;
        let value = self.take(len, "value")?;
        Ok(Element { typ, value })
    }

    /// Read the next element and require its type.
    pub fn expect(&mut self, typ: u64) -> Result<Element<'a>> {
        let element = self.read_element()?;
        element.expect_type(typ)?;
        Ok(element)
    }
}

impl<'a> Iterator for Reader<'a> {
    type Item = Result<Element<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let item = self.read_element();
        if item.is_err() {
            // Stop after the first error; the remaining bytes are unframed.
            self.pos = self.buf.len();
        }
        Some(item)
    }
}

/// Parse exactly one element spanning all of `bytes`.
pub fn decode_single<'a>(bytes: &'a [u8], typ: u64, what: &'static str) -> Result<Element<'a>> {
    let mut reader = Reader::new(bytes);
    let element = reader.expect(typ)?;
    if !reader.is_empty() {
        return Err(CoreError::TrailingBytes(what));
    }
    Ok(element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_number_encoding() {
        let mut buf = Vec::new();

        encode_var_number(&mut buf, 0);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        encode_var_number(&mut buf, 252);
        assert_eq!(buf, vec![0xfc]);

        buf.clear();
        encode_var_number(&mut buf, 253);
        assert_eq!(buf, vec![0xfd, 0x00, 0xfd]);

        buf.clear();
        encode_var_number(&mut buf, 0x1_0000);
        assert_eq!(buf, vec![0xfe, 0x00, 0x01, 0x00, 0x00]);

        buf.clear();
        encode_var_number(&mut buf, 0x1_0000_0000);
        assert_eq!(buf, vec![0xff, 0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[test]
    fn test_var_number_len_matches_encoding() {
        for n in [0u64, 252, 253, 0xffff, 0x1_0000, 0xffff_ffff, u64::MAX] {
            let mut buf = Vec::new();
            encode_var_number(&mut buf, n);
            assert_eq!(buf.len(), var_number_len(n), "n = {n}");
            assert_eq!(Reader::new(&buf).read_var_number().unwrap(), n);
        }
    }

    #[test]
    fn test_non_negative_integer_widths() {
        let cases: [(u64, usize); 6] = [
            (0, 1),
            (255, 1),
            (256, 2),
            (65536, 4),
            (0xffff_ffff, 4),
            (0x1_0000_0000, 8),
        ];
        for (n, width) in cases {
            let mut buf = Vec::new();
            encode_non_negative_integer(&mut buf, n);
            assert_eq!(buf.len(), width);
            assert_eq!(non_negative_integer_len(n), width);
            assert_eq!(decode_non_negative_integer(&buf).unwrap(), n);
        }
    }

    #[test]
    fn test_non_negative_integer_rejects_odd_widths() {
        assert_eq!(
            decode_non_negative_integer(&[1, 2, 3]),
            Err(CoreError::InvalidIntegerWidth(3))
        );
        assert!(decode_non_negative_integer(&[]).is_err());
    }

    #[test]
    fn test_seq_no_tlv() {
        let mut buf = Vec::new();
        encode_non_negative_integer_tlv(&mut buf, types::SEQ_NO, 300);
        assert_eq!(buf, vec![0xcc, 0x02, 0x01, 0x2c]);

        let element = decode_single(&buf, types::SEQ_NO, "seq").unwrap();
        assert_eq!(decode_non_negative_integer(element.value).unwrap(), 300);
    }

    #[test]
    fn test_truncated_value() {
        // Declares 5 value bytes, provides 2.
        let bytes = [0x08, 0x05, b'a', b'b'];
        let err = Reader::new(&bytes).read_element().unwrap_err();
        assert!(matches!(err, CoreError::Truncated(_)));
    }

    #[test]
    fn test_decode_single_rejects_trailing() {
        let bytes = [0x08, 0x01, b'a', 0x00];
        assert_eq!(
            decode_single(&bytes, types::GENERIC_NAME_COMPONENT, "component"),
            Err(CoreError::TrailingBytes("component"))
        );
    }

    fn first_component(name: &[u8]) -> Result<&[u8]> {
        let what = "name";
        let element = decode_single(name, 7, what)?;
        let first = element.children().read_element()?;
        Ok(first.value)
    }

    #[test]
    fn test_decode_single_borrows_from_input() {
        let mut inner = Vec::new();
        encode_tlv(&mut inner, 8, b"xy");
        let mut outer = Vec::new();
        encode_tlv(&mut outer, 7, &inner);

        let value = first_component(&outer).unwrap();
        assert_eq!(value, b"xy");
    }

    #[test]
    fn test_reader_iterates_children() {
        let mut inner = Vec::new();
        encode_tlv(&mut inner, 8, b"a");
        encode_tlv(&mut inner, 8, b"bc");
        let mut outer = Vec::new();
        encode_tlv(&mut outer, 7, &inner);

        let element = decode_single(&outer, 7, "name").unwrap();
        let children: Vec<_> = element.children().collect::<Result<_>>().unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(children[1].value, b"bc");
        assert_eq!(tlv_len(7, inner.len()), outer.len());
    }
}
