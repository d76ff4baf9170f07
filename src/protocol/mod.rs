//! Protocol module - wire constants, ID sizes, packet encode/decode.
//!
//! This module implements the binary layer of JDWP:
//! - the 11-byte packet header and command constants
//! - the negotiated ID widths ([`IdSizes`])
//! - outgoing packet assembly ([`CommandBuilder`])
//! - incoming packet decoding ([`PacketReader`])

mod builder;
mod id_sizes;
mod reader;
mod wire_format;

pub use builder::CommandBuilder;
pub use id_sizes::IdSizes;
pub use reader::PacketReader;
pub use wire_format::{
    command_sets, event_request_commands, reference_type_commands, thread_reference_commands,
    vm_commands, FLAG_COMMAND, FLAG_REPLY, HANDSHAKE, HEADER_SIZE, MAX_PACKET_SIZE,
};
