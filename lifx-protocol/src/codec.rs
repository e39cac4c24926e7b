//! Encoding and decoding of whole messages.
//!
//! The exchange engine only ever talks to the [`Codec`] trait, so tests can
//! swap in their own implementation and the engine never needs to know the
//! byte layout.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::CodecError;
use crate::header::{Header, HEADER_SIZE};
use crate::message::{Message, MessageType, Payload, LABEL_SIZE};
use crate::types::{Hsbk, Waveform};

/// Boundary between typed messages and datagram bytes.
pub trait Codec: Send + Sync {
    fn encode(&self, message: &Message) -> Vec<u8>;

    fn decode(&self, bytes: &[u8]) -> Result<Message, CodecError>;
}

/// The LIFX LAN binary format.
#[derive(Debug, Clone, Copy, Default)]
pub struct LanCodec;

impl Codec for LanCodec {
    fn encode(&self, message: &Message) -> Vec<u8> {
        let header = Header::for_message(message);
        let mut buf = BytesMut::with_capacity(header.size as usize);
        header.put(&mut buf);
        put_payload(&message.payload, &mut buf);
        buf.to_vec()
    }

    fn decode(&self, bytes: &[u8]) -> Result<Message, CodecError> {
        let header = Header::parse(bytes)?;
        let declared = header.size as usize;
        if declared > bytes.len() {
            return Err(CodecError::Truncated {
                actual: bytes.len(),
                needed: declared,
            });
        }
        if declared != bytes.len() || declared < HEADER_SIZE {
            return Err(CodecError::SizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let kind = MessageType::from_code(header.type_code)
            .ok_or(CodecError::UnknownType(header.type_code))?;
        let body = &bytes[HEADER_SIZE..declared];
        if body.len() != kind.payload_size() {
            return Err(CodecError::PayloadSize {
                kind,
                expected: kind.payload_size(),
                actual: body.len(),
            });
        }

        Ok(Message {
            source: header.source,
            target: header.target,
            sequence: header.sequence,
            ack_required: header.ack_required,
            res_required: header.res_required,
            payload: read_payload(kind, body)?,
        })
    }
}

/// Cut a label to the 32-byte wire field without splitting a character.
pub fn truncate_label(label: &str) -> &str {
    if label.len() <= LABEL_SIZE {
        return label;
    }
    let mut end = LABEL_SIZE;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    &label[..end]
}

fn put_label(label: &str, buf: &mut impl BufMut) {
    let label = truncate_label(label).as_bytes();
    buf.put_slice(label);
    buf.put_bytes(0, LABEL_SIZE - label.len());
}

fn get_label(buf: &mut &[u8]) -> String {
    let raw = &buf[..LABEL_SIZE];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(LABEL_SIZE);
    let label = String::from_utf8_lossy(&raw[..end]).into_owned();
    buf.advance(LABEL_SIZE);
    label
}

fn put_hsbk(color: &Hsbk, buf: &mut impl BufMut) {
    for component in color.components() {
        buf.put_u16_le(component);
    }
}

// Colours reported by devices are taken as-is; range checks only apply to
// values a caller builds.
fn get_hsbk(buf: &mut &[u8]) -> Hsbk {
    Hsbk {
        hue: buf.get_u16_le(),
        saturation: buf.get_u16_le(),
        brightness: buf.get_u16_le(),
        kelvin: buf.get_u16_le(),
    }
}

fn get_uuid(buf: &mut &[u8]) -> [u8; 16] {
    let mut id = [0u8; 16];
    buf.copy_to_slice(&mut id);
    id
}

fn put_payload(payload: &Payload, buf: &mut BytesMut) {
    match payload {
        Payload::StateService { service, port } => {
            buf.put_u8(*service);
            buf.put_u32_le(*port);
        }
        Payload::StateHostFirmware { build, version }
        | Payload::StateWifiFirmware { build, version } => {
            buf.put_u64_le(*build);
            buf.put_u64_le(0);
            buf.put_u32_le(*version);
        }
        Payload::StateWifiInfo { signal, tx, rx } => {
            buf.put_f32_le(*signal);
            buf.put_u32_le(*tx);
            buf.put_u32_le(*rx);
            buf.put_i16_le(0);
        }
        Payload::SetPower { level }
        | Payload::StatePower { level }
        | Payload::LightStatePower { level } => buf.put_u16_le(*level),
        Payload::SetLabel { label } | Payload::StateLabel { label } => put_label(label, buf),
        Payload::StateVersion {
            vendor,
            product,
            version,
        } => {
            buf.put_u32_le(*vendor);
            buf.put_u32_le(*product);
            buf.put_u32_le(*version);
        }
        Payload::StateInfo {
            time,
            uptime,
            downtime,
        } => {
            buf.put_u64_le(*time);
            buf.put_u64_le(*uptime);
            buf.put_u64_le(*downtime);
        }
        Payload::StateLocation {
            location: id,
            label,
            updated_at,
        }
        | Payload::StateGroup {
            group: id,
            label,
            updated_at,
        } => {
            buf.put_slice(id);
            put_label(label, buf);
            buf.put_u64_le(*updated_at);
        }
        Payload::LightSetColor { color, duration } => {
            buf.put_u8(0);
            put_hsbk(color, buf);
            buf.put_u32_le(*duration);
        }
        Payload::LightSetWaveform {
            transient,
            color,
            period,
            cycles,
            skew_ratio,
            waveform,
        } => {
            buf.put_u8(0);
            buf.put_u8(u8::from(*transient));
            put_hsbk(color, buf);
            buf.put_u32_le(*period);
            buf.put_f32_le(*cycles);
            buf.put_i16_le(*skew_ratio);
            buf.put_u8(*waveform as u8);
        }
        Payload::LightState { color, power, label } => {
            put_hsbk(color, buf);
            buf.put_i16_le(0);
            buf.put_u16_le(*power);
            put_label(label, buf);
            buf.put_u64_le(0);
        }
        Payload::LightSetPower { level, duration } => {
            buf.put_u16_le(*level);
            buf.put_u32_le(*duration);
        }
        Payload::GetService
        | Payload::GetHostFirmware
        | Payload::GetWifiInfo
        | Payload::GetWifiFirmware
        | Payload::GetPower
        | Payload::GetLabel
        | Payload::GetVersion
        | Payload::GetInfo
        | Payload::Acknowledgement
        | Payload::GetLocation
        | Payload::GetGroup
        | Payload::LightGet
        | Payload::LightGetPower => {}
    }
}

/// `body` has already been checked against `kind.payload_size()`.
fn read_payload(kind: MessageType, body: &[u8]) -> Result<Payload, CodecError> {
    let mut buf = body;
    let payload = match kind {
        MessageType::GetService => Payload::GetService,
        MessageType::StateService => Payload::StateService {
            service: buf.get_u8(),
            port: buf.get_u32_le(),
        },
        MessageType::GetHostFirmware => Payload::GetHostFirmware,
        MessageType::StateHostFirmware => {
            let build = buf.get_u64_le();
            buf.advance(8);
            Payload::StateHostFirmware {
                build,
                version: buf.get_u32_le(),
            }
        }
        MessageType::GetWifiInfo => Payload::GetWifiInfo,
        MessageType::StateWifiInfo => Payload::StateWifiInfo {
            signal: buf.get_f32_le(),
            tx: buf.get_u32_le(),
            rx: buf.get_u32_le(),
        },
        MessageType::GetWifiFirmware => Payload::GetWifiFirmware,
        MessageType::StateWifiFirmware => {
            let build = buf.get_u64_le();
            buf.advance(8);
            Payload::StateWifiFirmware {
                build,
                version: buf.get_u32_le(),
            }
        }
        MessageType::GetPower => Payload::GetPower,
        MessageType::SetPower => Payload::SetPower {
            level: buf.get_u16_le(),
        },
        MessageType::StatePower => Payload::StatePower {
            level: buf.get_u16_le(),
        },
        MessageType::GetLabel => Payload::GetLabel,
        MessageType::SetLabel => Payload::SetLabel {
            label: get_label(&mut buf),
        },
        MessageType::StateLabel => Payload::StateLabel {
            label: get_label(&mut buf),
        },
        MessageType::GetVersion => Payload::GetVersion,
        MessageType::StateVersion => Payload::StateVersion {
            vendor: buf.get_u32_le(),
            product: buf.get_u32_le(),
            version: buf.get_u32_le(),
        },
        MessageType::GetInfo => Payload::GetInfo,
        MessageType::StateInfo => Payload::StateInfo {
            time: buf.get_u64_le(),
            uptime: buf.get_u64_le(),
            downtime: buf.get_u64_le(),
        },
        MessageType::Acknowledgement => Payload::Acknowledgement,
        MessageType::GetLocation => Payload::GetLocation,
        MessageType::StateLocation => Payload::StateLocation {
            location: get_uuid(&mut buf),
            label: get_label(&mut buf),
            updated_at: buf.get_u64_le(),
        },
        MessageType::GetGroup => Payload::GetGroup,
        MessageType::StateGroup => Payload::StateGroup {
            group: get_uuid(&mut buf),
            label: get_label(&mut buf),
            updated_at: buf.get_u64_le(),
        },
        MessageType::LightGet => Payload::LightGet,
        MessageType::LightSetColor => {
            buf.advance(1);
            Payload::LightSetColor {
                color: get_hsbk(&mut buf),
                duration: buf.get_u32_le(),
            }
        }
        MessageType::LightSetWaveform => {
            buf.advance(1);
            let transient = buf.get_u8() != 0;
            let color = get_hsbk(&mut buf);
            let period = buf.get_u32_le();
            let cycles = buf.get_f32_le();
            let skew_ratio = buf.get_i16_le();
            let code = buf.get_u8();
            let waveform = Waveform::try_from(code).map_err(|_| CodecError::InvalidField {
                kind,
                field: "waveform",
                value: code.to_string(),
            })?;
            Payload::LightSetWaveform {
                transient,
                color,
                period,
                cycles,
                skew_ratio,
                waveform,
            }
        }
        MessageType::LightState => {
            let color = get_hsbk(&mut buf);
            buf.advance(2);
            let power = buf.get_u16_le();
            Payload::LightState {
                color,
                power,
                label: get_label(&mut buf),
            }
        }
        MessageType::LightGetPower => Payload::LightGetPower,
        MessageType::LightSetPower => Payload::LightSetPower {
            level: buf.get_u16_le(),
            duration: buf.get_u32_le(),
        },
        MessageType::LightStatePower => Payload::LightStatePower {
            level: buf.get_u16_le(),
        },
    };
    Ok(payload)
}
