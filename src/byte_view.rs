//! Bounded, explicit little-endian access over a byte buffer.
//!
//! `ByteReader` never panics on out-of-range access; every primitive
//! returns a `Result` tagged with the caller-supplied context string (the
//! lump role name, or `"header"`/`"directory"`) so failures read like
//! "Faces: truncated" rather than a bare index-out-of-bounds panic.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

pub struct ByteReader<'a> {
    buf: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    fn slice(&self, ctx: &'static str, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.buf
            .get(offset..offset + len)
            .ok_or(Error::Truncated { lump: ctx })
    }

    pub fn read_bytes(&self, ctx: &'static str, offset: usize, len: usize) -> Result<&'a [u8]> {
        self.slice(ctx, offset, len)
    }

    pub fn read_u8(&self, ctx: &'static str, offset: usize) -> Result<u8> {
        Ok(self.slice(ctx, offset, 1)?[0])
    }

    pub fn read_u16(&self, ctx: &'static str, offset: usize) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.slice(ctx, offset, 2)?))
    }

    pub fn read_i16(&self, ctx: &'static str, offset: usize) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.slice(ctx, offset, 2)?))
    }

    pub fn read_u32(&self, ctx: &'static str, offset: usize) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.slice(ctx, offset, 4)?))
    }

    pub fn read_i32(&self, ctx: &'static str, offset: usize) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.slice(ctx, offset, 4)?))
    }

    pub fn read_f32(&self, ctx: &'static str, offset: usize) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.slice(ctx, offset, 4)?))
    }
}

/// Append-only little-endian byte sink used by every `save_*` rebuilder.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter { buf: Vec::new() }
    }

    pub fn with_capacity(cap: usize) -> Self {
        ByteWriter { buf: Vec::with_capacity(cap) }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn push_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn push_u16(&mut self, v: u16) {
        let mut tmp = [0u8; 2];
        LittleEndian::write_u16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn push_i16(&mut self, v: i16) {
        let mut tmp = [0u8; 2];
        LittleEndian::write_i16(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn push_u32(&mut self, v: u32) {
        let mut tmp = [0u8; 4];
        LittleEndian::write_u32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn push_i32(&mut self, v: i32) {
        let mut tmp = [0u8; 4];
        LittleEndian::write_i32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn push_f32(&mut self, v: f32) {
        let mut tmp = [0u8; 4];
        LittleEndian::write_f32(&mut tmp, v);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Rounds `len` up to the next multiple of 4, the on-disk lump padding unit.
pub fn pad4(len: usize) -> usize {
    (len + 3) & !3
}
