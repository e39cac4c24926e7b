//! Typed LIFX messages.
//!
//! A [`Message`] is a header (session id, target, sequence and the two
//! reply-request flags) plus a typed [`Payload`]. The numeric type code on
//! the wire is derived from the payload variant, so a message can never
//! claim one type and carry another.

use std::fmt;

use crate::types::{HardwareAddress, Hsbk, Waveform};

/// Wire type codes for every message this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum MessageType {
    GetService = 2,
    StateService = 3,
    GetHostFirmware = 14,
    StateHostFirmware = 15,
    GetWifiInfo = 16,
    StateWifiInfo = 17,
    GetWifiFirmware = 18,
    StateWifiFirmware = 19,
    GetPower = 20,
    SetPower = 21,
    StatePower = 22,
    GetLabel = 23,
    SetLabel = 24,
    StateLabel = 25,
    GetVersion = 32,
    StateVersion = 33,
    GetInfo = 34,
    StateInfo = 35,
    Acknowledgement = 45,
    GetLocation = 48,
    StateLocation = 50,
    GetGroup = 51,
    StateGroup = 53,
    LightGet = 101,
    LightSetColor = 102,
    LightSetWaveform = 103,
    LightState = 107,
    LightGetPower = 116,
    LightSetPower = 117,
    LightStatePower = 118,
}

impl MessageType {
    pub const ALL: [MessageType; 30] = [
        MessageType::GetService,
        MessageType::StateService,
        MessageType::GetHostFirmware,
        MessageType::StateHostFirmware,
        MessageType::GetWifiInfo,
        MessageType::StateWifiInfo,
        MessageType::GetWifiFirmware,
        MessageType::StateWifiFirmware,
        MessageType::GetPower,
        MessageType::SetPower,
        MessageType::StatePower,
        MessageType::GetLabel,
        MessageType::SetLabel,
        MessageType::StateLabel,
        MessageType::GetVersion,
        MessageType::StateVersion,
        MessageType::GetInfo,
        MessageType::StateInfo,
        MessageType::Acknowledgement,
        MessageType::GetLocation,
        MessageType::StateLocation,
        MessageType::GetGroup,
        MessageType::StateGroup,
        MessageType::LightGet,
        MessageType::LightSetColor,
        MessageType::LightSetWaveform,
        MessageType::LightState,
        MessageType::LightGetPower,
        MessageType::LightSetPower,
        MessageType::LightStatePower,
    ];

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.code() == code)
    }

    /// Exact payload length in bytes for this type
    pub fn payload_size(self) -> usize {
        match self {
            MessageType::StateService => 5,
            MessageType::StateHostFirmware | MessageType::StateWifiFirmware => 20,
            MessageType::StateWifiInfo => 14,
            MessageType::SetPower | MessageType::StatePower => 2,
            MessageType::SetLabel | MessageType::StateLabel => LABEL_SIZE,
            MessageType::StateVersion => 12,
            MessageType::StateInfo => 24,
            MessageType::StateLocation | MessageType::StateGroup => 56,
            MessageType::LightSetColor => 13,
            MessageType::LightSetWaveform => 21,
            MessageType::LightState => 52,
            MessageType::LightSetPower => 6,
            MessageType::LightStatePower => 2,
            MessageType::GetService
            | MessageType::GetHostFirmware
            | MessageType::GetWifiInfo
            | MessageType::GetWifiFirmware
            | MessageType::GetPower
            | MessageType::GetLabel
            | MessageType::GetVersion
            | MessageType::GetInfo
            | MessageType::Acknowledgement
            | MessageType::GetLocation
            | MessageType::GetGroup
            | MessageType::LightGet
            | MessageType::LightGetPower => 0,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

/// Fixed width of every label field on the wire
pub const LABEL_SIZE: usize = 32;

/// Service code advertised in `StateService` for the UDP transport
pub const SERVICE_UDP: u8 = 1;

/// Typed payload of a LIFX message.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    GetService,
    StateService { service: u8, port: u32 },
    GetHostFirmware,
    StateHostFirmware { build: u64, version: u32 },
    GetWifiInfo,
    StateWifiInfo { signal: f32, tx: u32, rx: u32 },
    GetWifiFirmware,
    StateWifiFirmware { build: u64, version: u32 },
    GetPower,
    SetPower { level: u16 },
    StatePower { level: u16 },
    GetLabel,
    SetLabel { label: String },
    StateLabel { label: String },
    GetVersion,
    StateVersion { vendor: u32, product: u32, version: u32 },
    GetInfo,
    StateInfo { time: u64, uptime: u64, downtime: u64 },
    Acknowledgement,
    GetLocation,
    StateLocation { location: [u8; 16], label: String, updated_at: u64 },
    GetGroup,
    StateGroup { group: [u8; 16], label: String, updated_at: u64 },
    LightGet,
    LightSetColor { color: Hsbk, duration: u32 },
    LightSetWaveform {
        transient: bool,
        color: Hsbk,
        period: u32,
        cycles: f32,
        skew_ratio: i16,
        waveform: Waveform,
    },
    LightState { color: Hsbk, power: u16, label: String },
    LightGetPower,
    LightSetPower { level: u16, duration: u32 },
    LightStatePower { level: u16 },
}

impl Payload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Payload::GetService => MessageType::GetService,
            Payload::StateService { .. } => MessageType::StateService,
            Payload::GetHostFirmware => MessageType::GetHostFirmware,
            Payload::StateHostFirmware { .. } => MessageType::StateHostFirmware,
            Payload::GetWifiInfo => MessageType::GetWifiInfo,
            Payload::StateWifiInfo { .. } => MessageType::StateWifiInfo,
            Payload::GetWifiFirmware => MessageType::GetWifiFirmware,
            Payload::StateWifiFirmware { .. } => MessageType::StateWifiFirmware,
            Payload::GetPower => MessageType::GetPower,
            Payload::SetPower { .. } => MessageType::SetPower,
            Payload::StatePower { .. } => MessageType::StatePower,
            Payload::GetLabel => MessageType::GetLabel,
            Payload::SetLabel { .. } => MessageType::SetLabel,
            Payload::StateLabel { .. } => MessageType::StateLabel,
            Payload::GetVersion => MessageType::GetVersion,
            Payload::StateVersion { .. } => MessageType::StateVersion,
            Payload::GetInfo => MessageType::GetInfo,
            Payload::StateInfo { .. } => MessageType::StateInfo,
            Payload::Acknowledgement => MessageType::Acknowledgement,
            Payload::GetLocation => MessageType::GetLocation,
            Payload::StateLocation { .. } => MessageType::StateLocation,
            Payload::GetGroup => MessageType::GetGroup,
            Payload::StateGroup { .. } => MessageType::StateGroup,
            Payload::LightGet => MessageType::LightGet,
            Payload::LightSetColor { .. } => MessageType::LightSetColor,
            Payload::LightSetWaveform { .. } => MessageType::LightSetWaveform,
            Payload::LightState { .. } => MessageType::LightState,
            Payload::LightGetPower => MessageType::LightGetPower,
            Payload::LightSetPower { .. } => MessageType::LightSetPower,
            Payload::LightStatePower { .. } => MessageType::LightStatePower,
        }
    }
}

/// A complete LIFX message: header fields plus payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Session id of the client that started the exchange
    pub source: u32,
    /// Device the message is for (requests) or from (replies)
    pub target: HardwareAddress,
    pub sequence: u8,
    pub ack_required: bool,
    pub res_required: bool,
    pub payload: Payload,
}

impl Message {
    /// Build a broadcast message with no flags set
    pub fn new(payload: Payload) -> Self {
        Self {
            source: 0,
            target: HardwareAddress::BROADCAST,
            sequence: 0,
            ack_required: false,
            res_required: false,
            payload,
        }
    }

    pub fn with_source(mut self, source: u32) -> Self {
        self.source = source;
        self
    }

    pub fn with_target(mut self, target: HardwareAddress) -> Self {
        self.target = target;
        self
    }

    pub fn with_sequence(mut self, sequence: u8) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_ack_required(mut self, ack_required: bool) -> Self {
        self.ack_required = ack_required;
        self
    }

    pub fn with_res_required(mut self, res_required: bool) -> Self {
        self.res_required = res_required;
        self
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    /// Broadcast messages set the `tagged` bit on the wire
    pub fn is_tagged(&self) -> bool {
        self.target.is_broadcast()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} source={} target={} seq={} ack={} res={}",
            self.message_type(),
            self.source,
            self.target,
            self.sequence,
            self.ack_required,
            self.res_required
        )
    }
}
