//! Incoming packet decoding.
//!
//! [`PacketReader`] owns a received packet buffer and a read cursor. Every
//! read is bounds-checked; underflow fails with a protocol error and leaves
//! the cursor where it was. Reads mirror the builder: Big Endian integers,
//! u32-byte-length UTF-8 strings, width-aware IDs.

use bytes::Bytes;

use super::id_sizes::IdSizes;
use crate::error::{JdwpError, Result};
use crate::types::{FieldID, FrameID, MethodID, ObjectID, ReferenceTypeID, ThreadID};

/// Cursor-based decoder over a received packet, header included.
pub struct PacketReader {
    buf: Bytes,
    pos: usize,
    id_sizes: IdSizes,
}

impl PacketReader {
    /// Wrap a complete packet buffer.
    pub fn new(buf: Bytes, id_sizes: IdSizes) -> Self {
        Self {
            buf,
            pos: 0,
            id_sizes,
        }
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Current cursor position from the start of the packet.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Advance the cursor without interpreting the bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        if self.remaining() < count {
            return Err(invalid_packet());
        }
        self.pos += count;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        if self.remaining() < N {
            return Err(invalid_packet());
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Read a boolean byte; any non-zero value is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read an unsigned 16-bit integer.
    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read a signed 32-bit integer.
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    /// Read an unsigned 32-bit integer.
    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Read a signed 64-bit integer.
    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Read an unsigned 64-bit integer.
    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    /// Read a string: u32 byte length, then that many UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        if self.remaining() < length {
            return Err(invalid_packet());
        }
        let bytes = self.buf[self.pos..self.pos + length].to_vec();
        self.pos += length;
        String::from_utf8(bytes).map_err(|e| JdwpError::Protocol(e.to_string()))
    }

    fn read_id(&mut self, size: i32) -> Result<u64> {
        match size {
            4 => Ok(u64::from(self.read_u32()?)),
            8 => self.read_u64(),
            other => Err(JdwpError::Protocol(format!(
                "Unsupported ID size: {other}"
            ))),
        }
    }

    /// Read an object ID at the negotiated object width.
    pub fn read_object_id(&mut self) -> Result<ObjectID> {
        let size = self.id_sizes.object_size()?;
        Ok(ObjectID::new(self.read_id(size)?))
    }

    /// Read a thread ID. Threads are objects, so this uses the object width.
    pub fn read_thread_id(&mut self) -> Result<ThreadID> {
        let size = self.id_sizes.object_size()?;
        Ok(ThreadID::new(self.read_id(size)?))
    }

    /// Read a reference type ID at the negotiated width.
    pub fn read_reference_type_id(&mut self) -> Result<ReferenceTypeID> {
        let size = self.id_sizes.reference_type_size()?;
        Ok(ReferenceTypeID::new(self.read_id(size)?))
    }

    /// Read a method ID at the negotiated width.
    pub fn read_method_id(&mut self) -> Result<MethodID> {
        let size = self.id_sizes.method_size()?;
        Ok(MethodID::new(self.read_id(size)?))
    }

    /// Read a field ID at the negotiated width.
    pub fn read_field_id(&mut self) -> Result<FieldID> {
        let size = self.id_sizes.field_size()?;
        Ok(FieldID::new(self.read_id(size)?))
    }

    /// Read a frame ID at the negotiated width.
    pub fn read_frame_id(&mut self) -> Result<FrameID> {
        let size = self.id_sizes.frame_size()?;
        Ok(FrameID::new(self.read_id(size)?))
    }
}

fn invalid_packet() -> JdwpError {
    JdwpError::Protocol("Invalid JDWP packet".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::builder::CommandBuilder;
    use crate::protocol::wire_format::HEADER_SIZE;

    fn reader_over(payload: &[u8], id_sizes: IdSizes) -> PacketReader {
        PacketReader::new(Bytes::copy_from_slice(payload), id_sizes)
    }

    #[test]
    fn test_primitive_reads_mirror_builder() {
        let sizes = IdSizes::new(8, 8, 8, 8, 8);
        let mut builder = CommandBuilder::new(1, 1, 7, sizes);
        builder
            .put_u8(0x7F)
            .put_bool(true)
            .put_i32(-42)
            .put_u32(42)
            .put_i64(-1)
            .put_u64(0xDEAD_BEEF)
            .put_string("Ljava/lang/Object;");
        let packet = builder.finish();

        let mut reader = PacketReader::new(packet, sizes);
        reader.skip(HEADER_SIZE).unwrap();
        assert_eq!(reader.read_u8().unwrap(), 0x7F);
        assert!(reader.read_bool().unwrap());
        assert_eq!(reader.read_i32().unwrap(), -42);
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.read_i64().unwrap(), -1);
        assert_eq!(reader.read_u64().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.read_string().unwrap(), "Ljava/lang/Object;");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_id_reads_both_widths() {
        for (size, encoded) in [
            (4, vec![0x01u8, 0x02, 0x03, 0x04]),
            (8, vec![0, 0, 0, 0, 0x01, 0x02, 0x03, 0x04]),
        ] {
            let sizes = IdSizes::new(size, size, size, size, size);
            let mut reader = reader_over(&encoded, sizes);
            assert_eq!(reader.read_reference_type_id().unwrap().raw(), 0x01020304);
            assert_eq!(reader.remaining(), 0);
        }
    }

    #[test]
    fn test_all_id_reads_share_the_width_dispatch() {
        let sizes = IdSizes::new(4, 4, 4, 4, 4);
        let bytes = [0u8, 0, 0, 9];
        assert_eq!(reader_over(&bytes, sizes).read_object_id().unwrap().raw(), 9);
        assert_eq!(reader_over(&bytes, sizes).read_thread_id().unwrap().raw(), 9);
        assert_eq!(reader_over(&bytes, sizes).read_method_id().unwrap().raw(), 9);
        assert_eq!(reader_over(&bytes, sizes).read_field_id().unwrap().raw(), 9);
        assert_eq!(reader_over(&bytes, sizes).read_frame_id().unwrap().raw(), 9);
    }

    #[test]
    fn test_underflow_fails_without_advancing() {
        let mut reader = reader_over(&[0x01, 0x02], IdSizes::new_unknown());
        let err = reader.read_u32().unwrap_err();
        assert!(err.to_string().contains("Invalid JDWP packet"));
        // Cursor untouched; the two bytes are still readable.
        assert_eq!(reader.remaining(), 2);
        assert_eq!(reader.read_u16().unwrap(), 0x0102);
    }

    #[test]
    fn test_string_with_truncated_body() {
        // Claims 10 bytes, provides 3.
        let mut reader = reader_over(&[0, 0, 0, 10, b'a', b'b', b'c'], IdSizes::new_unknown());
        assert!(reader.read_string().is_err());
    }

    #[test]
    fn test_string_invalid_utf8_is_protocol_error() {
        let mut reader = reader_over(&[0, 0, 0, 2, 0xC3, 0x28], IdSizes::new_unknown());
        let err = reader.read_string().unwrap_err();
        assert!(matches!(err, JdwpError::Protocol(_)));
    }

    #[test]
    fn test_id_read_before_negotiation_is_protocol_error() {
        let mut reader = reader_over(&[0; 8], IdSizes::new_unknown());
        let err = reader.read_object_id().unwrap_err();
        assert!(err.to_string().contains("not negotiated"));
    }

    #[test]
    fn test_unsupported_id_width_is_protocol_error() {
        let sizes = IdSizes::new(2, 2, 2, 2, 2);
        let mut reader = reader_over(&[0; 8], sizes);
        let err = reader.read_field_id().unwrap_err();
        assert!(err.to_string().contains("Unsupported ID size"));
    }

    #[test]
    fn test_skip_past_end_fails() {
        let mut reader = reader_over(&[0; 4], IdSizes::new_unknown());
        assert!(reader.skip(5).is_err());
        assert_eq!(reader.remaining(), 4);
    }
}
