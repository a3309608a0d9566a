//! Protobuf wire-format primitives.
//!
//! Wire types: 0 varint, 1 fixed64, 2 length-delimited, 5 fixed32.
//! Repeated int64 fields are written unpacked, which every protobuf
//! parser accepts regardless of the schema's packed default.

use crate::error::OnnxError;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Append-only protobuf message writer.
pub(crate) struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn varint(&mut self, mut v: u64) {
        loop {
            let byte = (v & 0x7f) as u8;
            v >>= 7;
            if v == 0 {
                self.buf.push(byte);
                return;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn tag(&mut self, field: u32, wire: u8) {
        self.varint(((field as u64) << 3) | wire as u64);
    }

    /// int64 field (negative values take the full 10-byte encoding).
    pub fn int64(&mut self, field: u32, v: i64) {
        self.tag(field, WIRE_VARINT);
        self.varint(v as u64);
    }

    pub fn float32(&mut self, field: u32, v: f32) {
        self.tag(field, WIRE_FIXED32);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn string(&mut self, field: u32, s: &str) {
        self.bytes(field, s.as_bytes());
    }

    pub fn bytes(&mut self, field: u32, b: &[u8]) {
        self.tag(field, WIRE_LEN);
        self.varint(b.len() as u64);
        self.buf.extend_from_slice(b);
    }

    /// Embedded message field, built by the closure.
    pub fn message(&mut self, field: u32, build: impl FnOnce(&mut ProtoWriter)) {
        let mut inner = ProtoWriter::new();
        build(&mut inner);
        self.bytes(field, &inner.buf);
    }
}

/// Decoded value of a single field.
pub(crate) enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

/// Cursor over an encoded protobuf message.
pub(crate) struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn varint(&mut self) -> Result<u64, OnnxError> {
        let mut v: u64 = 0;
        let mut shift = 0u32;
        loop {
            let byte = *self
                .buf
                .get(self.pos)
                .ok_or_else(|| OnnxError::Malformed("truncated varint".into()))?;
            self.pos += 1;
            if shift >= 64 {
                return Err(OnnxError::Malformed("varint overflow".into()));
            }
            v |= ((byte & 0x7f) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(v);
            }
            shift += 7;
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], OnnxError> {
        if self.pos + n > self.buf.len() {
            return Err(OnnxError::Malformed("truncated field".into()));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Next (field number, value) pair; `None` at end of message.
    /// Unknown fields are the caller's to skip — every wire type is
    /// decoded, so skipping is just ignoring the returned value.
    pub fn next_field(&mut self) -> Result<Option<(u32, WireValue<'a>)>, OnnxError> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }
        let key = self.varint()?;
        let field = (key >> 3) as u32;
        let value = match (key & 0x7) as u8 {
            WIRE_VARINT => WireValue::Varint(self.varint()?),
            WIRE_FIXED64 => {
                let b = self.take(8)?;
                WireValue::Fixed64(u64::from_le_bytes(b.try_into().unwrap()))
            }
            WIRE_LEN => {
                let n = self.varint()? as usize;
                WireValue::Bytes(self.take(n)?)
            }
            WIRE_FIXED32 => {
                let b = self.take(4)?;
                WireValue::Fixed32(u32::from_le_bytes(b.try_into().unwrap()))
            }
            w => {
                return Err(OnnxError::Malformed(format!(
                    "unsupported wire type {w} for field {field}"
                )))
            }
        };
        Ok(Some((field, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_roundtrip() {
        let mut w = ProtoWriter::new();
        for (i, v) in [0i64, 1, 127, 128, 300, 1 << 40].iter().enumerate() {
            w.int64(i as u32 + 1, *v);
        }
        let bytes = w.into_bytes();
        let mut r = ProtoReader::new(&bytes);
        for v in [0u64, 1, 127, 128, 300, 1 << 40] {
            match r.next_field().unwrap().unwrap() {
                (_, WireValue::Varint(got)) => assert_eq!(got, v),
                _ => panic!("expected varint"),
            }
        }
        assert!(r.next_field().unwrap().is_none());
    }

    #[test]
    fn string_and_message_roundtrip() {
        let mut w = ProtoWriter::new();
        w.string(2, "speaker_encoder");
        w.message(7, |g| {
            g.string(2, "graph");
            g.int64(1, 12);
        });
        let bytes = w.into_bytes();

        let mut r = ProtoReader::new(&bytes);
        let (field, value) = r.next_field().unwrap().unwrap();
        assert_eq!(field, 2);
        match value {
            WireValue::Bytes(b) => assert_eq!(b, b"speaker_encoder"),
            _ => panic!("expected bytes"),
        }
        let (field, value) = r.next_field().unwrap().unwrap();
        assert_eq!(field, 7);
        let inner = match value {
            WireValue::Bytes(b) => b,
            _ => panic!("expected bytes"),
        };
        let mut ir = ProtoReader::new(inner);
        let (field, _) = ir.next_field().unwrap().unwrap();
        assert_eq!(field, 2);
        let (field, value) = ir.next_field().unwrap().unwrap();
        assert_eq!(field, 1);
        assert!(matches!(value, WireValue::Varint(12)));
    }

    #[test]
    fn float32_fixed() {
        let mut w = ProtoWriter::new();
        w.float32(2, 1e-5);
        let bytes = w.into_bytes();
        let mut r = ProtoReader::new(&bytes);
        match r.next_field().unwrap().unwrap() {
            (2, WireValue::Fixed32(raw)) => assert_eq!(f32::from_bits(raw), 1e-5),
            _ => panic!("expected fixed32"),
        }
    }

    #[test]
    fn truncated_input_errors() {
        // Length-delimited field claiming more bytes than present.
        let bytes = [0x0a, 0x05, 0x01];
        let mut r = ProtoReader::new(&bytes);
        assert!(r.next_field().is_err());
    }
}
