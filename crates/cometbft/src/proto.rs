//! Minimal protobuf wire-format reader.
//!
//! Cosmos transactions are protobuf envelopes whose interesting fields are
//! all varints, strings, and nested messages. Rather than pulling in the
//! whole cosmos-sdk proto stack, this module walks the wire format
//! directly; `decode` maps field numbers to the handful of message shapes
//! the actions care about.

use scribe_core::error::{ChainError, ChainResult};

/// A decoded wire value.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FieldValue<'a> {
    /// Wire type 0.
    Varint(u64),
    /// Wire type 1.
    Fixed64(u64),
    /// Wire type 2: length-delimited payload (string, bytes, or nested
    /// message).
    Bytes(&'a [u8]),
    /// Wire type 5.
    Fixed32(u32),
}

/// One field of a protobuf message.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Field<'a> {
    pub number: u32,
    pub value: FieldValue<'a>,
}

/// Cursor over one protobuf message body.
pub(crate) struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn err(&self, message: &str) -> ChainError {
        ChainError::TxDecode(format!("{message} at offset {}", self.pos))
    }

    fn read_varint(&mut self) -> ChainResult<u64> {
        let mut value: u64 = 0;
        for shift in 0..10 {
            let Some(&byte) = self.buf.get(self.pos) else {
                return Err(self.err("truncated varint"));
            };
            self.pos += 1;
            value |= u64::from(byte & 0x7f) << (shift * 7);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(self.err("varint longer than 10 bytes"))
    }

    fn take(&mut self, len: usize) -> ChainResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| self.err("length-delimited field overruns buffer"))?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Read the next field, or `None` at end of buffer.
    pub fn next_field(&mut self) -> ChainResult<Option<Field<'a>>> {
        if self.pos >= self.buf.len() {
            return Ok(None);
        }

        let key = self.read_varint()?;
        let number = (key >> 3) as u32;
        if number == 0 {
            return Err(self.err("field number 0"));
        }

        let value = match key & 0x07 {
            0 => FieldValue::Varint(self.read_varint()?),
            1 => {
                let bytes = self.take(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                FieldValue::Fixed64(u64::from_le_bytes(raw))
            }
            2 => {
                let len = self.read_varint()? as usize;
                FieldValue::Bytes(self.take(len)?)
            }
            5 => {
                let bytes = self.take(4)?;
                let mut raw = [0u8; 4];
                raw.copy_from_slice(bytes);
                FieldValue::Fixed32(u32::from_le_bytes(raw))
            }
            wire => return Err(self.err(&format!("unsupported wire type {wire}"))),
        };

        Ok(Some(Field { number, value }))
    }
}

/// Interpret a length-delimited field as UTF-8.
pub(crate) fn utf8_field(bytes: &[u8], what: &str) -> ChainResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ChainError::TxDecode(format!("{what} is not valid UTF-8")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_varint_and_bytes_fields() {
        // field 1 varint 300, field 2 bytes "hi"
        let buf = [0x08, 0xac, 0x02, 0x12, 0x02, b'h', b'i'];
        let mut reader = ProtoReader::new(&buf);

        let first = reader.next_field().unwrap().unwrap();
        assert_eq!(first.number, 1);
        assert!(matches!(first.value, FieldValue::Varint(300)));

        let second = reader.next_field().unwrap().unwrap();
        assert_eq!(second.number, 2);
        match second.value {
            FieldValue::Bytes(b) => assert_eq!(b, b"hi"),
            other => panic!("expected bytes, got {other:?}"),
        }

        assert!(reader.next_field().unwrap().is_none());
    }

    #[test]
    fn rejects_truncated_input() {
        // declares a 10-byte payload with only 2 remaining
        let buf = [0x12, 0x0a, 0x01, 0x02];
        let mut reader = ProtoReader::new(&buf);
        assert!(reader.next_field().is_err());

        // varint that never terminates
        let buf = [0x08, 0xff];
        let mut reader = ProtoReader::new(&buf);
        assert!(reader.next_field().is_err());
    }

    #[test]
    fn rejects_field_number_zero() {
        let buf = [0x00, 0x01];
        let mut reader = ProtoReader::new(&buf);
        assert!(reader.next_field().is_err());
    }
}
