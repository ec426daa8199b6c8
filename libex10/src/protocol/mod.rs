// libex10-rs/libex10/src/protocol/mod.rs

//! Wire protocol: command frames, response parsing and EventFifo packets.

pub mod commands;
pub mod crc16;
pub mod event_fifo;
pub mod parser;
pub mod responses;
pub mod transactor;

pub use commands::Command;
pub use crc16::{CRC16_SEED, compute_crc16, compute_crc16_partial};
pub use event_fifo::{
    EventFifoPacket, PacketData, PacketHeader, PacketIter, PacketType, make_packet_header,
    parse_event_packet,
};
pub use transactor::CommandTransactor;
