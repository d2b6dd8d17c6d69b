//! Minimal protobuf wire format, just what the ONNX messages need.

use crate::{FormatErr, Result};

pub(super) const VARINT: u32 = 0;
pub(super) const FIXED64: u32 = 1;
pub(super) const LEN: u32 = 2;
pub(super) const FIXED32: u32 = 5;

/// Appends protobuf fields to a byte buffer.
#[derive(Default)]
pub(super) struct ProtobufWriter {
    buf: Vec<u8>,
}

impl ProtobufWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8 & 0x7F) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn tag(&mut self, field: u32, wire_type: u32) {
        self.varint(((field << 3) | wire_type) as u64);
    }

    pub fn int64(&mut self, field: u32, v: i64) {
        self.tag(field, VARINT);
        self.varint(v as u64);
    }

    /// Negative values are sign extended to ten bytes, as protobuf mandates for `int32`.
    pub fn int32(&mut self, field: u32, v: i32) {
        self.int64(field, v as i64);
    }

    pub fn float(&mut self, field: u32, v: f32) {
        self.tag(field, FIXED32);
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, field: u32, v: &[u8]) {
        self.tag(field, LEN);
        self.varint(v.len() as u64);
        self.buf.extend_from_slice(v);
    }

    /// Empty strings are the proto default and are left out.
    pub fn string(&mut self, field: u32, v: &str) {
        if !v.is_empty() {
            self.bytes(field, v.as_bytes());
        }
    }

    pub fn message<F>(&mut self, field: u32, write: F)
    where
        F: FnOnce(&mut ProtobufWriter),
    {
        let mut nested = ProtobufWriter::new();
        write(&mut nested);
        self.bytes(field, &nested.buf);
    }
}

/// Reads protobuf fields from a byte slice.
pub(super) struct ProtobufReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ProtobufReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn has_more(&self) -> bool {
        self.pos < self.data.len()
    }

    pub fn read_tag(&mut self) -> Result<(u32, u32)> {
        let varint = self.read_varint()?;
        Ok(((varint >> 3) as u32, (varint & 0x7) as u32))
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0;

        loop {
            let Some(&byte) = self.data.get(self.pos) else {
                return Err(FormatErr::Protobuf("unexpected end of data".into()));
            };
            self.pos += 1;

            result |= ((byte & 0x7F) as u64) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }

            shift += 7;
            if shift >= 64 {
                return Err(FormatErr::Protobuf("varint overflow".into()));
            }
        }
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_varint()? as usize;
        let bytes = self.take(len)?;
        Ok(bytes)
    }

    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| FormatErr::Protobuf("invalid utf-8 in string field".into()))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let b = self.take(4)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Skips the value of a field the caller is not interested in.
    pub fn skip(&mut self, wire_type: u32) -> Result<()> {
        match wire_type {
            VARINT => self.read_varint().map(|_| ()),
            FIXED64 => self.take(8).map(|_| ()),
            LEN => self.read_bytes().map(|_| ()),
            FIXED32 => self.take(4).map(|_| ()),
            other => Err(FormatErr::Protobuf(format!("unknown wire type {other}"))),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(FormatErr::Protobuf(format!(
                "field of {n} bytes at {} extends past the end ({})",
                self.pos,
                self.data.len()
            )));
        };

        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}
