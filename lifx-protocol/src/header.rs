//! The fixed 36-byte LIFX header.
//!
//! Layout (all integers little endian):
//!
//! ```text
//! frame           size:u16  protocol|addressable|tagged|origin:u16  source:u32
//! frame address   target:[u8;8]  reserved:[u8;6]  flags:u8  sequence:u8
//! protocol header reserved:u64  type:u16  reserved:u16
//! ```

use bytes::{Buf, BufMut};

use crate::error::CodecError;
use crate::message::Message;
use crate::types::HardwareAddress;

pub const HEADER_SIZE: usize = 36;
pub const PROTOCOL_NUMBER: u16 = 1024;

const PROTOCOL_MASK: u16 = 0x0fff;
const ADDRESSABLE_BIT: u16 = 1 << 12;
const TAGGED_BIT: u16 = 1 << 13;
const RES_REQUIRED_BIT: u8 = 0b01;
const ACK_REQUIRED_BIT: u8 = 0b10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total datagram size, header included
    pub size: u16,
    pub tagged: bool,
    pub source: u32,
    pub target: HardwareAddress,
    pub ack_required: bool,
    pub res_required: bool,
    pub sequence: u8,
    pub type_code: u16,
}

impl Header {
    pub fn for_message(message: &Message) -> Self {
        let kind = message.message_type();
        Self {
            size: (HEADER_SIZE + kind.payload_size()) as u16,
            tagged: message.is_tagged(),
            source: message.source,
            target: message.target,
            ack_required: message.ack_required,
            res_required: message.res_required,
            sequence: message.sequence,
            type_code: kind.code(),
        }
    }

    pub fn put(&self, buf: &mut impl BufMut) {
        let mut frame = PROTOCOL_NUMBER | ADDRESSABLE_BIT;
        if self.tagged {
            frame |= TAGGED_BIT;
        }
        buf.put_u16_le(self.size);
        buf.put_u16_le(frame);
        buf.put_u32_le(self.source);

        buf.put_slice(self.target.as_bytes());
        buf.put_bytes(0, 2);
        buf.put_bytes(0, 6);
        let mut flags = 0u8;
        if self.res_required {
            flags |= RES_REQUIRED_BIT;
        }
        if self.ack_required {
            flags |= ACK_REQUIRED_BIT;
        }
        buf.put_u8(flags);
        buf.put_u8(self.sequence);

        buf.put_u64_le(0);
        buf.put_u16_le(self.type_code);
        buf.put_u16_le(0);
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::Truncated {
                actual: bytes.len(),
                needed: HEADER_SIZE,
            });
        }
        let mut buf = &bytes[..HEADER_SIZE];

        let size = buf.get_u16_le();
        let frame = buf.get_u16_le();
        let protocol = frame & PROTOCOL_MASK;
        if protocol != PROTOCOL_NUMBER {
            return Err(CodecError::UnsupportedProtocol(protocol));
        }
        let source = buf.get_u32_le();

        let mut mac = [0u8; 6];
        buf.copy_to_slice(&mut mac);
        buf.advance(2 + 6);
        let flags = buf.get_u8();
        let sequence = buf.get_u8();

        buf.advance(8);
        let type_code = buf.get_u16_le();

        Ok(Self {
            size,
            tagged: frame & TAGGED_BIT != 0,
            source,
            target: HardwareAddress::new(mac),
            ack_required: flags & ACK_REQUIRED_BIT != 0,
            res_required: flags & RES_REQUIRED_BIT != 0,
            sequence,
            type_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Payload;

    // Tagged GetService from source 2 with res_required set
    const GET_SERVICE_BROADCAST: [u8; 36] = [
        0x24, 0x00, 0x00, 0x34, 0x02, 0x00, 0x00, 0x00, // frame
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // target
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, // reserved, flags, sequence
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // reserved
        0x02, 0x00, 0x00, 0x00, // type, reserved
    ];

    #[test]
    fn test_put_matches_reference_bytes() {
        let msg = Message::new(Payload::GetService)
            .with_source(2)
            .with_res_required(true);
        let mut buf = Vec::new();
        Header::for_message(&msg).put(&mut buf);
        assert_eq!(buf, GET_SERVICE_BROADCAST);
    }

    #[test]
    fn test_parse_reference_bytes() {
        let header = Header::parse(&GET_SERVICE_BROADCAST).unwrap();
        assert_eq!(header.size, 36);
        assert!(header.tagged);
        assert_eq!(header.source, 2);
        assert!(header.target.is_broadcast());
        assert!(header.res_required);
        assert!(!header.ack_required);
        assert_eq!(header.type_code, 2);
    }

    #[test]
    fn test_parse_rejects_short_buffer() {
        let err = Header::parse(&GET_SERVICE_BROADCAST[..20]).unwrap_err();
        assert_eq!(err, CodecError::Truncated { actual: 20, needed: 36 });
    }

    #[test]
    fn test_parse_rejects_wrong_protocol() {
        let mut bytes = GET_SERVICE_BROADCAST;
        bytes[2] = 0x01;
        bytes[3] = 0x14;
        assert!(matches!(
            Header::parse(&bytes),
            Err(CodecError::UnsupportedProtocol(0x401))
        ));
    }

    #[test]
    fn test_target_and_flags_round_trip() {
        let mac = HardwareAddress::new([0xd0, 0x73, 0xd5, 0xaa, 0xbb, 0xcc]);
        let msg = Message::new(Payload::GetLabel)
            .with_target(mac)
            .with_ack_required(true)
            .with_sequence(9);
        let mut buf = Vec::new();
        Header::for_message(&msg).put(&mut buf);

        let header = Header::parse(&buf).unwrap();
        assert_eq!(header.target, mac);
        assert!(!header.tagged);
        assert!(header.ack_required);
        assert!(!header.res_required);
        assert_eq!(header.sequence, 9);
    }
}
