use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use super::error::DecodeError;
use crate::common::typedefs::serializable_pubkey::SerializablePubkey;

/// Bounds-checked little-endian reader over account bytes.
///
/// Offsets reported in errors are absolute: `base` is added to the cursor position so that a
/// reader created over a sub-slice (e.g. a TLV payload) still points into the account.
pub struct ByteReader<'a> {
    cursor: Cursor<&'a [u8]>,
    base: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_base(data, 0)
    }

    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        ByteReader {
            cursor: Cursor::new(data),
            base,
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn offset(&self) -> usize {
        self.base + self.position()
    }

    pub fn remaining(&self) -> usize {
        self.cursor.get_ref().len().saturating_sub(self.position())
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn ensure(&self, field: &'static str, needed: usize) -> Result<(), DecodeError> {
        let remaining = self.remaining();
        if remaining < needed {
            return Err(DecodeError::UnexpectedEof {
                field,
                offset: self.offset(),
                needed,
                remaining,
            });
        }
        Ok(())
    }

    fn eof(&self, field: &'static str, needed: usize) -> DecodeError {
        DecodeError::UnexpectedEof {
            field,
            offset: self.offset(),
            needed,
            remaining: self.remaining(),
        }
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.ensure(field, 1)?;
        self.cursor.read_u8().map_err(|_| self.eof(field, 1))
    }

    pub fn read_u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.ensure(field, 2)?;
        self.cursor
            .read_u16::<LittleEndian>()
            .map_err(|_| self.eof(field, 2))
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.ensure(field, 4)?;
        self.cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| self.eof(field, 4))
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.ensure(field, 8)?;
        self.cursor
            .read_u64::<LittleEndian>()
            .map_err(|_| self.eof(field, 8))
    }

    /// Borsh bool: 0 or 1, anything else is malformed.
    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, DecodeError> {
        let offset = self.offset();
        match self.read_u8(field)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidValue {
                field,
                offset,
                value: value as u64,
            }),
        }
    }

    pub fn read_bytes(&mut self, field: &'static str, len: usize) -> Result<&'a [u8], DecodeError> {
        self.ensure(field, len)?;
        let start = self.position();
        let data: &'a [u8] = *self.cursor.get_ref();
        let bytes = &data[start..start + len];
        self.cursor.set_position((start + len) as u64);
        Ok(bytes)
    }

    pub fn skip(&mut self, field: &'static str, len: usize) -> Result<(), DecodeError> {
        self.read_bytes(field, len).map(|_| ())
    }

    pub fn read_array32(&mut self, field: &'static str) -> Result<[u8; 32], DecodeError> {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.read_bytes(field, 32)?);
        Ok(out)
    }

    pub fn read_pubkey(&mut self, field: &'static str) -> Result<SerializablePubkey, DecodeError> {
        self.read_array32(field).map(SerializablePubkey::from)
    }

    /// 32 raw bytes where all zeros encodes `None`.
    pub fn read_nonzero_pubkey(
        &mut self,
        field: &'static str,
    ) -> Result<Option<SerializablePubkey>, DecodeError> {
        self.read_array32(field)
            .map(SerializablePubkey::from_nonzero_bytes)
    }

    /// u32 length prefix followed by UTF-8 bytes. Invalid UTF-8 is replaced rather than
    /// rejected, since names on chain are not validated by every program.
    pub fn read_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u32(field)? as usize;
        let bytes = self.read_bytes(field, len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Borsh `Option<T>`: a bool tag followed by the value when set.
    pub fn read_option<T>(
        &mut self,
        field: &'static str,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Option<T>, DecodeError> {
        if self.read_bool(field)? {
            read(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Borsh `Vec<T>`: u32 count then `count` items. The count is checked against the bytes
    /// left so a corrupt length cannot trigger a huge allocation.
    pub fn read_vec<T>(
        &mut self,
        field: &'static str,
        min_item_len: usize,
        mut read: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let count = self.read_u32(field)? as usize;
        self.ensure(field, count.saturating_mul(min_item_len))?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(read(self)?);
        }
        Ok(items)
    }
}

/// Fixed-width on-chain strings are padded with NULs up to their maximum length.
pub fn trim_nul_padding(value: &str) -> String {
    value.trim_end_matches('\0').to_string()
}
