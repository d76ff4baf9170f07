//! Outgoing command packet assembly.
//!
//! [`CommandBuilder`] writes the 11-byte command header with a zeroed
//! length up front, appends big-endian payload fields behind it, and
//! back-patches the length prefix when the packet is finished.

use bytes::{BufMut, Bytes, BytesMut};

use super::id_sizes::IdSizes;
use super::wire_format::FLAG_COMMAND;
use crate::types::{FieldID, MethodID, ObjectID, ReferenceTypeID, ThreadID};

/// Builder for a single outgoing command packet.
///
/// All multi-byte integers are written Big Endian. ID fields are written at
/// the negotiated width; building an ID field before negotiation panics
/// (see [`IdSizes`]).
///
/// # Example
///
/// ```
/// use jdwp_client::protocol::{command_sets, vm_commands, CommandBuilder, IdSizes};
///
/// let mut builder = CommandBuilder::new(
///     1,
///     command_sets::VIRTUAL_MACHINE,
///     vm_commands::CLASSES_BY_SIGNATURE,
///     IdSizes::new_unknown(),
/// );
/// builder.put_string("Ljava/lang/String;");
/// let packet = builder.finish();
/// assert_eq!(&packet[0..4], &(packet.len() as u32).to_be_bytes());
/// ```
pub struct CommandBuilder {
    buf: BytesMut,
    id: u32,
    id_sizes: IdSizes,
}

impl CommandBuilder {
    /// Start a command packet with the given id, command set and command.
    pub fn new(id: u32, command_set: u8, command: u8, id_sizes: IdSizes) -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u32(0); // length, back-patched in finish()
        buf.put_u32(id);
        buf.put_u8(FLAG_COMMAND);
        buf.put_u8(command_set);
        buf.put_u8(command);
        Self { buf, id, id_sizes }
    }

    /// The packet id assigned to this command.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Append a single byte.
    pub fn put_u8(&mut self, value: u8) -> &mut Self {
        self.buf.put_u8(value);
        self
    }

    /// Append a boolean as a single byte (0 or 1).
    pub fn put_bool(&mut self, value: bool) -> &mut Self {
        self.buf.put_u8(value as u8);
        self
    }

    /// Append a signed 32-bit integer.
    pub fn put_i32(&mut self, value: i32) -> &mut Self {
        self.buf.put_i32(value);
        self
    }

    /// Append an unsigned 32-bit integer.
    pub fn put_u32(&mut self, value: u32) -> &mut Self {
        self.buf.put_u32(value);
        self
    }

    /// Append a signed 64-bit integer.
    pub fn put_i64(&mut self, value: i64) -> &mut Self {
        self.buf.put_i64(value);
        self
    }

    /// Append an unsigned 64-bit integer.
    pub fn put_u64(&mut self, value: u64) -> &mut Self {
        self.buf.put_u64(value);
        self
    }

    /// Append a string: u32 length in **bytes**, then the raw UTF-8 bytes.
    /// No NUL terminator.
    pub fn put_string(&mut self, value: &str) -> &mut Self {
        self.buf.put_u32(value.len() as u32);
        self.buf.put_slice(value.as_bytes());
        self
    }

    /// Append an object ID at the negotiated object width.
    pub fn put_object_id(&mut self, id: ObjectID) -> &mut Self {
        let size = self.id_sizes.expect_object_size();
        self.put_id(id.raw(), size)
    }

    /// Append a thread ID. Threads are objects, so this uses the object
    /// width.
    pub fn put_thread_id(&mut self, id: ThreadID) -> &mut Self {
        let size = self.id_sizes.expect_object_size();
        self.put_id(id.raw(), size)
    }

    /// Append a reference type ID at the negotiated width.
    pub fn put_reference_type_id(&mut self, id: ReferenceTypeID) -> &mut Self {
        let size = self.id_sizes.expect_reference_type_size();
        self.put_id(id.raw(), size)
    }

    /// Append a method ID at the negotiated width.
    pub fn put_method_id(&mut self, id: MethodID) -> &mut Self {
        let size = self.id_sizes.expect_method_size();
        self.put_id(id.raw(), size)
    }

    /// Append a field ID at the negotiated width.
    pub fn put_field_id(&mut self, id: FieldID) -> &mut Self {
        let size = self.id_sizes.expect_field_size();
        self.put_id(id.raw(), size)
    }

    fn put_id(&mut self, raw: u64, size: i32) -> &mut Self {
        match size {
            4 => self.buf.put_u32(raw as u32),
            8 => self.buf.put_u64(raw),
            other => panic!("JDWP ID width must be 4 or 8, got {other}"),
        }
        self
    }

    /// Back-patch the length prefix and yield the finished packet.
    pub fn finish(self) -> Bytes {
        let mut buf = self.buf;
        let length = buf.len() as u32;
        buf[0..4].copy_from_slice(&length.to_be_bytes());
        buf.freeze()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::wire_format::{command_sets, vm_commands, HEADER_SIZE};

    fn builder_with_sizes(size: i32) -> CommandBuilder {
        CommandBuilder::new(
            7,
            command_sets::VIRTUAL_MACHINE,
            vm_commands::ID_SIZES,
            IdSizes::new(size, size, size, size, size),
        )
    }

    #[test]
    fn test_header_layout() {
        let builder = CommandBuilder::new(0x01020304, 15, 2, IdSizes::new_unknown());
        let packet = builder.finish();

        assert_eq!(packet.len(), HEADER_SIZE);
        // Length prefix covers the whole packet.
        assert_eq!(&packet[0..4], &[0, 0, 0, 11]);
        // Id, Big Endian.
        assert_eq!(&packet[4..8], &[0x01, 0x02, 0x03, 0x04]);
        // Command flags, command set, command.
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 15);
        assert_eq!(packet[10], 2);
    }

    #[test]
    fn test_length_back_patch_includes_payload() {
        let mut builder = builder_with_sizes(8);
        builder.put_i32(-1).put_u8(0xAB);
        let packet = builder.finish();

        assert_eq!(packet.len(), HEADER_SIZE + 5);
        assert_eq!(&packet[0..4], &(packet.len() as u32).to_be_bytes());
        assert_eq!(&packet[HEADER_SIZE..HEADER_SIZE + 4], &[0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(packet[HEADER_SIZE + 4], 0xAB);
    }

    #[test]
    fn test_string_length_is_in_bytes() {
        let mut builder = builder_with_sizes(8);
        // 'é' is two bytes in UTF-8; the prefix counts bytes, not chars.
        builder.put_string("é");
        let packet = builder.finish();

        assert_eq!(&packet[HEADER_SIZE..HEADER_SIZE + 4], &[0, 0, 0, 2]);
        assert_eq!(&packet[HEADER_SIZE + 4..], "é".as_bytes());
    }

    #[test]
    fn test_bool_encoding() {
        let mut builder = builder_with_sizes(8);
        builder.put_bool(true).put_bool(false);
        let packet = builder.finish();
        assert_eq!(&packet[HEADER_SIZE..], &[1, 0]);
    }

    #[test]
    fn test_id_width_8() {
        let mut builder = builder_with_sizes(8);
        builder.put_object_id(ObjectID::new(0x0102030405060708));
        let packet = builder.finish();
        assert_eq!(
            &packet[HEADER_SIZE..],
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn test_id_width_4_truncates() {
        let mut builder = builder_with_sizes(4);
        builder.put_method_id(MethodID::new(0xAABB_CCDD_0102_0304));
        let packet = builder.finish();
        assert_eq!(&packet[HEADER_SIZE..], &[0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    #[should_panic(expected = "ID sizes used before negotiation")]
    fn test_id_append_before_negotiation_panics() {
        let mut builder = CommandBuilder::new(1, 1, 1, IdSizes::new_unknown());
        builder.put_object_id(ObjectID::new(1));
    }

    #[test]
    #[should_panic(expected = "ID width must be 4 or 8")]
    fn test_unsupported_id_width_panics() {
        let mut builder = builder_with_sizes(2);
        builder.put_field_id(FieldID::new(1));
    }
}
