use std::fmt;

use crate::error::Result;

const ALIGN: usize = 8;

#[derive(Debug, Default)]
pub struct Serializer {
    buf: Vec<u8>,
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn with_buffer(buf: Vec<u8>) -> Self {
        Self { buf }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn into_string(self) -> Result<String> {
        Ok(String::from_utf8(self.buf)?)
    }

    pub fn ensure_room(&mut self, additional: usize) {
        let len = self.buf.len();
        let cap = self.buf.capacity();
        if cap - len >= additional {
            return;
        }
        let grown = (2 * cap).max(cap + additional.max(cap / 2));
        let target = grown.max(len + additional).div_ceil(ALIGN) * ALIGN;
        self.buf.reserve_exact(target - len);
    }

    #[inline]
    pub fn push(&mut self, byte: u8) {
        self.ensure_room(1);
        self.buf.push(byte);
    }

    #[inline]
    pub fn extend(&mut self, bytes: &[u8]) {
        self.ensure_room(bytes.len());
        self.buf.extend_from_slice(bytes);
    }

    #[inline]
    pub fn push_str(&mut self, s: &str) {
        self.extend(s.as_bytes());
    }

    #[inline]
    pub(crate) fn peek_back(&self, n: usize) -> Option<u8> {
        let len = self.buf.len();
        if n == 0 || n > len {
            return None;
        }
        Some(self.buf[len - n])
    }

    #[inline]
    pub(crate) fn poke_back(&mut self, n: usize, byte: u8) {
        let len = self.buf.len();
        if n > 0 && n <= len {
            self.buf[len - n] = byte;
        }
    }

    #[inline]
    pub(crate) fn pop_back(&mut self) -> Option<u8> {
        self.buf.pop()
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.buf.truncate(len);
    }

    pub(crate) fn remove(&mut self, pos: usize, count: usize) {
        let end = (pos + count).min(self.buf.len());
        if pos < end {
            self.buf.drain(pos..end);
        }
    }

    pub(crate) fn tail(&self, start: usize) -> &[u8] {
        &self.buf[start..]
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub(crate) fn push_ident(&mut self, part: &str, quote: u8) {
        self.ensure_room(part.len() + 2);
        self.buf.push(quote);
        let mut last = 0;
        let bytes = part.as_bytes();
        for (index, byte) in bytes.iter().enumerate() {
            if *byte == quote {
                self.buf.extend_from_slice(&bytes[last..=index]);
                self.buf.push(quote);
                last = index + 1;
            }
        }
        self.extend(&bytes[last..]);
        self.buf.push(quote);
    }

    pub(crate) fn push_qualified(&mut self, name: &str, quote: u8) {
        for (i, part) in name.split('.').enumerate() {
            if i > 0 {
                self.push(b'.');
            }
            if part == "*" {
                self.push(b'*');
            } else {
                self.push_ident(part, quote);
            }
        }
    }
}

impl fmt::Write for Serializer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth() {
        let mut ser = Serializer::with_capacity(10);
        ser.ensure_room(4);
        ser.extend(b"0123456789");
        ser.ensure_room(1);
        // max(2 * 10, 10 + max(1, 5)) rounded to 8
        assert!(ser.capacity() >= 24);
    }

    #[test]
    fn test_backpatch() {
        let mut ser = Serializer::new();
        ser.push_str("select [");
        assert_eq!(Some(b'['), ser.peek_back(1));
        ser.poke_back(1, b'(');
        assert_eq!(Some(b'('), ser.pop_back());
        assert_eq!(None, ser.peek_back(100));
        ser.push_str("xyz");
        ser.remove(7, 2);
        assert_eq!("select z", ser.into_string().unwrap());
    }

    #[test]
    fn test_ident_quoting() {
        let mut ser = Serializer::new();
        ser.push_ident("us\"ers", b'"');
        ser.push(b' ');
        ser.push_ident("us`ers", b'"');
        ser.push(b' ');
        ser.push_ident("us`ers", b'`');
        assert_eq!(r#""us""ers" "us`ers" `us``ers`"#, ser.into_string().unwrap());
    }

    #[test]
    fn test_qualified() {
        let mut ser = Serializer::new();
        ser.push_qualified("some space.x.*", b'"');
        assert_eq!(r#""some space"."x".*"#, ser.into_string().unwrap());
    }

    #[test]
    fn test_existing_buffer() {
        let mut ser = Serializer::with_buffer(b"prefix:".to_vec());
        ser.push_str("1");
        assert_eq!("prefix:1", ser.into_string().unwrap());
    }
}
