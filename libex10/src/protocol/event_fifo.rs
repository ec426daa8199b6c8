// libex10-rs/libex10/src/protocol/event_fifo.rs
//! EventFifo packet format.
//!
//! Every packet starts with an 8 byte header:
//!
//! | offset | size | field                                  |
//! |--------|------|----------------------------------------|
//! | 0      | 1    | packet length in 32-bit words          |
//! | 1      | 1    | packet type                            |
//! | 2      | 2    | format sentinel `0xbf4b`, little-endian |
//! | 4      | 4    | microsecond counter, little-endian     |
//!
//! The header is followed by a static payload whose size depends only on the
//! type, then by optional dynamic data, padded to a 4 byte boundary.

use log::{error, warn};

use crate::constants::EVENT_FIFO_SHA;
use crate::error::Module;
use crate::protocol::parser::{byte_at, le_u16_at, le_u32_at};
use crate::utils::hex_dump;
use crate::{Error, Result};

/// Bytes in every packet header.
pub const PACKET_HEADER_SIZE: usize = 8;

/// Packet type byte of the header.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PacketType {
    TxRampUp = 0x01,
    TxRampDown = 0x02,
    InventoryRoundSummary = 0x03,
    QChanged = 0x04,
    TagRead = 0x05,
    TagReadExtended = 0x06,
    Gen2Transaction = 0x07,
    ContinuousInventorySummary = 0x08,
    HelloWorld = 0x09,
    Custom = 0x0a,
    PowerControlLoopSummary = 0x0b,
    AggregateOpSummary = 0x0d,
    Halted = 0x0e,
    InvalidPacket = 0xf0,
    FifoOverflowPacket = 0xf1,
    Ex10ResultPacket = 0xf2,
    SjcMeasurement = 0xfe,
    Debug = 0xff,
}

impl PacketType {
    /// `None` for type bytes the firmware does not define.
    pub fn from_u8(raw: u8) -> Option<Self> {
        let t = match raw {
            0x01 => Self::TxRampUp,
            0x02 => Self::TxRampDown,
            0x03 => Self::InventoryRoundSummary,
            0x04 => Self::QChanged,
            0x05 => Self::TagRead,
            0x06 => Self::TagReadExtended,
            0x07 => Self::Gen2Transaction,
            0x08 => Self::ContinuousInventorySummary,
            0x09 => Self::HelloWorld,
            0x0a => Self::Custom,
            0x0b => Self::PowerControlLoopSummary,
            0x0d => Self::AggregateOpSummary,
            0x0e => Self::Halted,
            0xf0 => Self::InvalidPacket,
            0xf1 => Self::FifoOverflowPacket,
            0xf2 => Self::Ex10ResultPacket,
            0xfe => Self::SjcMeasurement,
            0xff => Self::Debug,
            _ => return None,
        };
        Some(t)
    }

    /// Size of the fixed payload that follows the header.
    pub fn static_payload_len(self) -> usize {
        match self {
            Self::TxRampUp | Self::TxRampDown => 4,
            Self::InventoryRoundSummary => 20,
            Self::QChanged => 12,
            Self::TagRead => 12,
            Self::TagReadExtended => 20,
            Self::Gen2Transaction => 12,
            Self::ContinuousInventorySummary => 16,
            Self::HelloWorld | Self::Custom => 4,
            Self::PowerControlLoopSummary => 8,
            Self::AggregateOpSummary => 16,
            Self::Halted | Self::InvalidPacket | Self::FifoOverflowPacket => 4,
            Self::Ex10ResultPacket => 8,
            Self::SjcMeasurement => 12,
            Self::Debug => 4,
        }
    }

    /// Whether a packet of this type may appear in a well formed stream.
    pub fn is_valid(self) -> bool {
        self != Self::InvalidPacket
    }
}

/// Static payload size of a raw type byte; unknown types have none.
pub fn static_payload_len(raw_type: u8) -> usize {
    PacketType::from_u8(raw_type).map_or(0, PacketType::static_payload_len)
}

/// Raw packet header, before any validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    /// Packet length in 32-bit words, header included.
    pub packet_length: u8,
    /// Raw [`PacketType`] byte.
    pub packet_type: u8,
    /// Format sentinel, [`EVENT_FIFO_SHA`] for a matching firmware.
    pub sha: u16,
    /// Device microsecond counter when the packet was written.
    pub us_counter: u32,
}

impl PacketHeader {
    /// Fails when fewer than [`PACKET_HEADER_SIZE`] bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            packet_length: byte_at(bytes, 0)?,
            packet_type: byte_at(bytes, 1)?,
            sha: le_u16_at(bytes, 2)?,
            us_counter: le_u32_at(bytes, 4)?,
        })
    }

    #[allow(missing_docs)]
    pub fn to_bytes(&self) -> [u8; PACKET_HEADER_SIZE] {
        let sha = self.sha.to_le_bytes();
        let us = self.us_counter.to_le_bytes();
        [
            self.packet_length,
            self.packet_type,
            sha[0],
            sha[1],
            us[0],
            us[1],
            us[2],
            us[3],
        ]
    }

    /// Packet length in bytes.
    pub fn packet_len_bytes(&self) -> usize {
        self.packet_length as usize * 4
    }
}

/// Header for a packet carrying only its static payload.
pub fn make_packet_header(packet_type: PacketType) -> PacketHeader {
    PacketHeader {
        packet_length: ((PACKET_HEADER_SIZE + packet_type.static_payload_len()) / 4) as u8,
        packet_type: packet_type as u8,
        sha: EVENT_FIFO_SHA,
        us_counter: 0,
    }
}

/// A packet borrowed from an EventFifo buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFifoPacket<'a> {
    /// `InvalidPacket` for the placeholder.
    pub packet_type: PacketType,
    /// Device microsecond counter from the header.
    pub us_counter: u32,
    /// Fixed-size payload for the type.
    pub static_data: &'a [u8],
    /// Variable payload, padding included.
    pub dynamic_data: &'a [u8],
    /// False when the packet failed validation.
    pub is_valid: bool,
}

impl<'a> EventFifoPacket<'a> {
    /// Placeholder returned when a buffer cannot be parsed any further.
    pub fn invalid() -> Self {
        Self {
            packet_type: PacketType::InvalidPacket,
            us_counter: 0,
            static_data: &[],
            dynamic_data: &[],
            is_valid: false,
        }
    }

    /// Packet built on the host, e.g. for InsertFifoEvent.
    pub fn new(packet_type: PacketType, static_data: &'a [u8], dynamic_data: &'a [u8]) -> Self {
        Self {
            packet_type,
            us_counter: 0,
            static_data,
            dynamic_data,
            is_valid: true,
        }
    }

    /// Header plus payload, before padding.
    pub fn unpadded_len(&self) -> usize {
        PACKET_HEADER_SIZE + self.static_data.len() + self.dynamic_data.len()
    }

    /// Length on the wire, padded to whole 32-bit words.
    pub fn wire_len(&self) -> usize {
        let n = self.unpadded_len();
        n + (4 - n % 4) % 4
    }

    /// Serialize with a freshly built header and zero padding.
    pub fn encode(&self) -> Result<Vec<u8>> {
        if self.static_data.len() != self.packet_type.static_payload_len() {
            return Err(Error::BadParamLength {
                module: Module::EventParser,
                expected: self.packet_type.static_payload_len(),
                actual: self.static_data.len(),
            });
        }
        let wire_len = self.wire_len();
        if wire_len / 4 > u8::MAX as usize {
            return Err(Error::BadParamValue {
                module: Module::EventParser,
                reason: "packet longer than 255 words",
            });
        }
        let mut header = make_packet_header(self.packet_type);
        header.packet_length = (wire_len / 4) as u8;
        header.us_counter = self.us_counter;

        let mut out = Vec::with_capacity(wire_len);
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(self.static_data);
        out.extend_from_slice(self.dynamic_data);
        out.resize(wire_len, 0);
        Ok(out)
    }

    /// Decode the static payload into typed fields. Packets that failed
    /// validation have nothing to decode.
    pub fn decode(&self) -> Result<PacketData> {
        if !self.is_valid {
            return Err(Error::InvalidEventFifoPacket {
                module: Module::EventParser,
            });
        }
        let s = self.static_data;
        let data = match self.packet_type {
            PacketType::TxRampUp => PacketData::TxRampUp {
                carrier_frequency: le_u32_at(s, 0)?,
            },
            PacketType::TxRampDown => PacketData::TxRampDown {
                reason: byte_at(s, 0)?,
            },
            PacketType::HelloWorld => PacketData::HelloWorld {
                sku: le_u16_at(s, 0)?,
                reset_reason: byte_at(s, 2)?,
                crash_info_conditional: byte_at(s, 3)?,
            },
            PacketType::Custom => PacketData::Custom {
                payload_len: le_u32_at(s, 0)?,
            },
            PacketType::Halted => PacketData::Halted {
                halted_handle: le_u16_at(s, 0)?,
                reason: byte_at(s, 2)?,
            },
            PacketType::FifoOverflowPacket => PacketData::FifoOverflow {
                num_bytes_over: le_u16_at(s, 0)?,
                overflowing_packet_type: byte_at(s, 2)?,
            },
            PacketType::TagRead => PacketData::TagRead(TagRead::from_bytes(s)?),
            PacketType::InventoryRoundSummary => {
                PacketData::InventoryRoundSummary(InventoryRoundSummary::from_bytes(s)?)
            }
            _ => PacketData::Raw,
        };
        Ok(data)
    }
}

/// Typed view of a packet's static payload. Field names follow the
/// firmware packet layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PacketData {
    TxRampUp {
        carrier_frequency: u32,
    },
    TxRampDown {
        reason: u8,
    },
    HelloWorld {
        sku: u16,
        reset_reason: u8,
        crash_info_conditional: u8,
    },
    Custom {
        payload_len: u32,
    },
    Halted {
        halted_handle: u16,
        reason: u8,
    },
    FifoOverflow {
        num_bytes_over: u16,
        overflowing_packet_type: u8,
    },
    TagRead(TagRead),
    InventoryRoundSummary(InventoryRoundSummary),
    /// No typed decoding; use `static_data` directly.
    Raw,
}

/// What the dynamic data of a TagRead packet contains.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TagReadType {
    Epc = 1,
    EpcWithTid = 2,
    EpcWithFastIdTid = 3,
}

/// Static payload of a TagRead packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagRead {
    /// Log-encoded RSSI.
    pub rssi: u16,
    /// RF phase at the start of the reply.
    pub rf_phase_begin: u16,
    /// RF phase at the end of the reply.
    pub rf_phase_end: u16,
    /// RxGainControl in effect.
    pub rx_gain_settings: u16,
    /// Raw [`TagReadType`].
    pub read_type: u8,
    /// Offset of the TID in the dynamic data.
    pub tid_offset: u8,
    /// The sequencer halted on this tag.
    pub halted_on_tag: bool,
    /// The reply failed its parity check.
    pub memory_parity_err: bool,
}

impl TagRead {
    /// Decode the static payload.
    pub fn from_bytes(s: &[u8]) -> Result<Self> {
        let flags = byte_at(s, 10)?;
        Ok(Self {
            rssi: le_u16_at(s, 0)?,
            rf_phase_begin: le_u16_at(s, 2)?,
            rf_phase_end: le_u16_at(s, 4)?,
            rx_gain_settings: le_u16_at(s, 6)?,
            read_type: byte_at(s, 8)?,
            tid_offset: byte_at(s, 9)?,
            halted_on_tag: flags & 0x01 != 0,
            memory_parity_err: flags & 0x02 != 0,
        })
    }
}

/// Static payload of an InventoryRoundSummary packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct InventoryRoundSummary {
    pub duration_us: u32,
    pub total_slots: u32,
    pub num_slots: u16,
    pub empty_slots: u16,
    pub single_slots: u16,
    pub collided_slots: u16,
    pub reason: u8,
    pub final_q: u8,
    pub min_q_count: u8,
    pub queries_since_valid_epc_count: u8,
}

impl InventoryRoundSummary {
    /// Decode the static payload.
    pub fn from_bytes(s: &[u8]) -> Result<Self> {
        Ok(Self {
            duration_us: le_u32_at(s, 0)?,
            total_slots: le_u32_at(s, 4)?,
            num_slots: le_u16_at(s, 8)?,
            empty_slots: le_u16_at(s, 10)?,
            single_slots: le_u16_at(s, 12)?,
            collided_slots: le_u16_at(s, 14)?,
            reason: byte_at(s, 16)?,
            final_q: byte_at(s, 17)?,
            min_q_count: byte_at(s, 18)?,
            queries_since_valid_epc_count: byte_at(s, 19)?,
        })
    }
}

const PC_LENGTH_SHIFT: u16 = 3;
const PC_LENGTH_MASK: u16 = 0x001f;
const PC_XI: u16 = 0x0002;
const XPC_W1_XEB: u16 = 0x0080;
const TID_LENGTH: usize = 12;
const GEN2_REPLY_HEADER_LENGTH: usize = 1;
const GEN2_REPLY_HANDLE_LENGTH: usize = 2;
const CRC_LENGTH: usize = 2;

/// Fields of a tag's ACK reply carried in TagRead dynamic data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TagReadFields<'a> {
    /// Protocol control word.
    pub pc: u16,
    /// First extended PC word, when XI is set.
    pub xpc_w1: Option<u16>,
    /// Second extended PC word, when XEB is set.
    pub xpc_w2: Option<u16>,
    #[allow(missing_docs)]
    pub epc: &'a [u8],
    /// CRC stored in tag memory, FastID replies only.
    pub stored_crc: Option<u16>,
    /// Empty unless the read type carries a TID.
    pub tid: &'a [u8],
}

/// Split TagRead dynamic data into PC, XPC, EPC and TID.
///
/// Returns `None` when the data is shorter than the length encoded in the
/// PC word. FastID replies from Monza 4/5 tags carry a stored CRC between
/// EPC and TID; newer tags do not.
pub fn tag_read_fields(
    dynamic: &[u8],
    read_type: TagReadType,
    tid_offset: u8,
) -> Option<TagReadFields<'_>> {
    if dynamic.len() < 2 {
        return None;
    }
    let pc = u16::from_le_bytes([dynamic[0], dynamic[1]]);
    let mut pc_len = ((pc >> PC_LENGTH_SHIFT) & PC_LENGTH_MASK) as usize * 2;
    let mut min_len = pc_len + 4;
    if dynamic.len() < min_len {
        warn!(
            "tag reply length from PC is {} bytes, received {}",
            min_len,
            dynamic.len()
        );
        return None;
    }

    let word = move |idx: usize| -> Option<u16> {
        dynamic
            .get(idx..idx + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    };

    let mut xpc_len = 0usize;
    let mut xpc_w1 = None;
    let mut xpc_w2 = None;
    if pc & PC_XI != 0 {
        let w1 = word(2)?;
        xpc_w1 = Some(w1);
        xpc_len += 2;
        if w1 & XPC_W1_XEB != 0 {
            xpc_w2 = Some(word(4)?);
            xpc_len += 2;
        }
    }
    let epc_start = 2 + xpc_len;
    pc_len = pc_len.saturating_sub(xpc_len);

    let tid_at = move |offset: usize| dynamic.get(offset..offset + TID_LENGTH);
    let (epc_len, stored_crc, tid): (usize, bool, &[u8]) = match read_type {
        TagReadType::Epc => (pc_len, true, &[]),
        TagReadType::EpcWithTid => {
            min_len += TID_LENGTH + GEN2_REPLY_HEADER_LENGTH + GEN2_REPLY_HANDLE_LENGTH + CRC_LENGTH;
            if dynamic.len() < min_len {
                return None;
            }
            let tid = tid_at(tid_offset as usize + GEN2_REPLY_HEADER_LENGTH)?;
            (pc_len, true, tid)
        }
        TagReadType::EpcWithFastIdTid => match tid_at(tid_offset as usize) {
            Some(tid) if is_monza4_or_monza5(tid) => {
                if pc_len >= TID_LENGTH + CRC_LENGTH {
                    (pc_len - TID_LENGTH - CRC_LENGTH, true, tid)
                } else {
                    (pc_len, true, &[])
                }
            }
            Some(tid) if pc_len >= TID_LENGTH => (pc_len - TID_LENGTH, false, tid),
            _ => (pc_len, true, &[]),
        },
    };

    let epc = dynamic.get(epc_start..epc_start + epc_len)?;
    let stored_crc = if stored_crc {
        let at = epc_start + epc_len;
        dynamic.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]))
    } else {
        None
    };
    Some(TagReadFields {
        pc,
        xpc_w1,
        xpc_w2,
        epc,
        stored_crc,
        tid,
    })
}

fn is_monza4_or_monza5(tid: &[u8]) -> bool {
    if tid.len() < 4 {
        return false;
    }
    let short_tid = u32::from_be_bytes([tid[0], tid[1], tid[2], tid[3]]);
    matches!(
        short_tid,
        0xe280_1100 | 0xe280_1104 | 0xe280_1105 | 0xe280_110c | 0xe280_1114 | 0xe280_1130
            | 0xe280_1132
    )
}

/// Parse the packet at the front of `bytes` and advance past it.
///
/// A packet that fails validation empties `bytes`, so iteration over the
/// current buffer stops, and an invalid placeholder is returned.
pub fn parse_event_packet<'a>(bytes: &mut &'a [u8]) -> EventFifoPacket<'a> {
    let data: &'a [u8] = *bytes;
    let header = match PacketHeader::from_bytes(data) {
        Ok(h) => h,
        Err(_) => {
            error!("EventFifo buffer ends inside a packet header ({} bytes left)", data.len());
            *bytes = &[];
            return EventFifoPacket::invalid();
        }
    };

    let packet_type = PacketType::from_u8(header.packet_type);
    let static_len = static_payload_len(header.packet_type);
    let min_len = PACKET_HEADER_SIZE + static_len;
    let packet_len = header.packet_len_bytes();

    let is_valid = packet_type.is_some_and(PacketType::is_valid)
        && header.sha == EVENT_FIFO_SHA
        && packet_len >= min_len
        && packet_len <= data.len()
        && !data.is_empty();

    let packet_type = match packet_type {
        Some(t) if is_valid => t,
        _ => {
            if header.sha != EVENT_FIFO_SHA {
                error!(
                    "EventFifo packet with invalid sha: expected {:#06x}, received {:#06x}; \
                     SDK and firmware versions probably differ",
                    EVENT_FIFO_SHA, header.sha
                );
            } else {
                error!(
                    "unknown EventFifo packet: type {:#04x}, static length {}, data {}",
                    header.packet_type,
                    static_len,
                    hex_dump(data, 64)
                );
            }
            *bytes = &[];
            return EventFifoPacket::invalid();
        }
    };

    let packet = EventFifoPacket {
        packet_type,
        us_counter: header.us_counter,
        static_data: &data[PACKET_HEADER_SIZE..min_len],
        dynamic_data: &data[min_len..packet_len],
        is_valid: true,
    };
    *bytes = &data[packet_len..];
    packet
}

/// Iterator over the packets of one EventFifo buffer.
#[derive(Debug, Clone)]
pub struct PacketIter<'a> {
    remaining: &'a [u8],
}

impl<'a> PacketIter<'a> {
    /// Iterate from the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { remaining: bytes }
    }

    /// Bytes not yet parsed.
    pub fn remaining(&self) -> &'a [u8] {
        self.remaining
    }
}

impl<'a> Iterator for PacketIter<'a> {
    type Item = EventFifoPacket<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }
        Some(parse_event_packet(&mut self.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_world() -> Vec<u8> {
        let mut p = make_packet_header(PacketType::HelloWorld).to_bytes().to_vec();
        p.extend_from_slice(&[0x10, 0x07, 0x02, 0x00]);
        p
    }

    #[test]
    fn header_layout() {
        let h = make_packet_header(PacketType::TagRead);
        assert_eq!(h.packet_length, 5);
        assert_eq!(h.to_bytes(), [5, 0x05, 0x4b, 0xbf, 0, 0, 0, 0]);
        assert_eq!(PacketHeader::from_bytes(&h.to_bytes()).unwrap(), h);
    }

    #[test]
    fn parse_two_packets() {
        let mut buf = hello_world();
        let custom = EventFifoPacket::new(PacketType::Custom, &[3, 0, 0, 0], &[1, 2, 3]);
        buf.extend_from_slice(&custom.encode().unwrap());

        let packets: Vec<_> = PacketIter::new(&buf).collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].packet_type, PacketType::HelloWorld);
        assert_eq!(
            packets[0].decode().unwrap(),
            PacketData::HelloWorld {
                sku: 0x0710,
                reset_reason: 2,
                crash_info_conditional: 0
            }
        );
        assert_eq!(packets[1].packet_type, PacketType::Custom);
        // 3 dynamic bytes plus one byte of padding
        assert_eq!(packets[1].dynamic_data, &[1, 2, 3, 0]);
    }

    #[test]
    fn bad_sha_stops_iteration() {
        let mut buf = hello_world();
        buf[2] = 0x00;
        buf.extend_from_slice(&hello_world());
        let mut it = PacketIter::new(&buf);
        let p = it.next().unwrap();
        assert!(!p.is_valid);
        assert_eq!(p.packet_type, PacketType::InvalidPacket);
        assert!(it.next().is_none());
    }

    #[test]
    fn length_past_buffer_is_invalid() {
        let mut buf = hello_world();
        buf[0] = 10;
        let mut slice: &[u8] = &buf;
        let p = parse_event_packet(&mut slice);
        assert!(!p.is_valid);
        assert!(slice.is_empty());
        assert!(matches!(
            p.decode(),
            Err(Error::InvalidEventFifoPacket {
                module: Module::EventParser
            })
        ));
    }

    #[test]
    fn unknown_and_invalid_types_rejected() {
        let mut buf = hello_world();
        buf[1] = 0x0c;
        assert!(!parse_event_packet(&mut &buf[..]).is_valid);
        buf[1] = PacketType::InvalidPacket as u8;
        assert!(!parse_event_packet(&mut &buf[..]).is_valid);
        assert_eq!(static_payload_len(0x0c), 0);
    }

    #[test]
    fn short_header_is_invalid() {
        let buf = [2u8, 0x09, 0x4b];
        let mut slice: &[u8] = &buf;
        assert!(!parse_event_packet(&mut slice).is_valid);
        assert!(slice.is_empty());
    }

    #[test]
    fn encode_rejects_wrong_static_len() {
        let p = EventFifoPacket::new(PacketType::TxRampUp, &[0; 2], &[]);
        assert!(matches!(p.encode(), Err(Error::BadParamLength { .. })));
    }

    #[test]
    fn tag_read_epc_only() {
        // PC with length 2 words, EPC 4 bytes, stored CRC
        let pc: u16 = 2 << 3;
        let mut dynamic = pc.to_le_bytes().to_vec();
        dynamic.extend_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0x12, 0x34]);
        let f = tag_read_fields(&dynamic, TagReadType::Epc, 0).unwrap();
        assert_eq!(f.epc, &[0xaa, 0xbb, 0xcc, 0xdd]);
        assert_eq!(f.stored_crc, Some(0x1234));
        assert!(f.tid.is_empty());
        assert!(f.xpc_w1.is_none());
    }

    #[test]
    fn tag_read_too_short() {
        let pc: u16 = 6 << 3;
        let dynamic = pc.to_le_bytes();
        assert!(tag_read_fields(&dynamic, TagReadType::Epc, 0).is_none());
    }
}
