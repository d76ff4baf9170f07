//! Wire format constants.
//!
//! Every JDWP packet starts with an 11-byte header:
//! ```text
//! ┌──────────┬──────────┬────────┬───────────────────────────┐
//! │ Length   │ Id       │ Flags  │ Command set + command, or │
//! │ 4 bytes  │ 4 bytes  │ 1 byte │ reply error code          │
//! │ uint32 BE│ uint32 BE│        │ 2 bytes                   │
//! └──────────┴──────────┴────────┴───────────────────────────┘
//! ```
//! `Length` counts the whole packet, header included. All multi-byte
//! integers are Big Endian.

/// Header size in bytes (fixed, exactly 11).
pub const HEADER_SIZE: usize = 11;

/// Maximum accepted packet length, header included (10 MiB).
pub const MAX_PACKET_SIZE: u32 = 10 * 1024 * 1024;

/// The 14 ASCII bytes exchanged in each direction to open a session.
pub const HANDSHAKE: &[u8] = b"JDWP-Handshake";

/// Flags byte of a command packet.
pub const FLAG_COMMAND: u8 = 0x00;

/// Flags byte of a reply packet.
pub const FLAG_REPLY: u8 = 0x80;

/// Command set identifiers.
pub mod command_sets {
    pub const VIRTUAL_MACHINE: u8 = 1;
    pub const REFERENCE_TYPE: u8 = 2;
    pub const THREAD_REFERENCE: u8 = 11;
    pub const EVENT_REQUEST: u8 = 15;
}

/// VirtualMachine commands (set 1).
pub mod vm_commands {
    pub const VERSION: u8 = 1;
    pub const CLASSES_BY_SIGNATURE: u8 = 2;
    pub const ID_SIZES: u8 = 7;
    pub const SUSPEND: u8 = 8;
    pub const RESUME: u8 = 9;
}

/// ReferenceType commands (set 2).
pub mod reference_type_commands {
    pub const METHODS: u8 = 5;
}

/// ThreadReference commands (set 11).
pub mod thread_reference_commands {
    pub const NAME: u8 = 1;
}

/// EventRequest commands (set 15).
pub mod event_request_commands {
    pub const SET: u8 = 1;
    pub const CLEAR: u8 = 2;
    pub const CLEAR_ALL_BREAKPOINTS: u8 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_is_14_ascii_bytes() {
        assert_eq!(HANDSHAKE.len(), 14);
        assert_eq!(HANDSHAKE, b"JDWP-Handshake");
    }

    #[test]
    fn test_max_packet_size() {
        assert_eq!(MAX_PACKET_SIZE, 10 * 1024 * 1024);
        assert!(MAX_PACKET_SIZE > HEADER_SIZE as u32);
    }
}
