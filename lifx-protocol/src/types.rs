//! Value types carried inside LIFX messages.
//!
//! These are the parameter domains the protocol accepts. Constructors that
//! take caller input validate it and fail with
//! [`ProtocolError::InvalidParameter`] so that nothing invalid ever reaches
//! the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result};

/// Six-byte hardware (MAC) address, the unique identity of a device.
///
/// On the wire it occupies the first six bytes of the 8-byte target field.
/// The all-zero address is the broadcast pseudo-address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    /// Target that addresses every device on the LAN
    pub const BROADCAST: HardwareAddress = HardwareAddress([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl FromStr for HardwareAddress {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| ProtocolError::invalid_parameter("hardware address", s))?;
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| ProtocolError::invalid_parameter("hardware address", s))?;
        }
        if parts.next().is_some() {
            return Err(ProtocolError::invalid_parameter("hardware address", s));
        }
        Ok(Self(bytes))
    }
}

impl From<[u8; 6]> for HardwareAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

/// Binary power state of a device.
///
/// The protocol encodes power as a `u16` level where only `0` and `65535`
/// are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Power {
    On,
    Off,
}

impl Power {
    pub const ON_LEVEL: u16 = u16::MAX;
    pub const OFF_LEVEL: u16 = 0;

    pub fn level(self) -> u16 {
        match self {
            Power::On => Self::ON_LEVEL,
            Power::Off => Self::OFF_LEVEL,
        }
    }

    /// Interpret a level reported by a device. Anything above zero is on.
    pub fn from_reported_level(level: u16) -> Self {
        if level > 0 {
            Power::On
        } else {
            Power::Off
        }
    }

    pub fn is_on(self) -> bool {
        self == Power::On
    }
}

impl From<bool> for Power {
    fn from(on: bool) -> Self {
        if on {
            Power::On
        } else {
            Power::Off
        }
    }
}

impl TryFrom<u16> for Power {
    type Error = ProtocolError;

    fn try_from(level: u16) -> Result<Self> {
        match level {
            Self::ON_LEVEL | 1 => Ok(Power::On),
            Self::OFF_LEVEL => Ok(Power::Off),
            other => Err(ProtocolError::invalid_parameter("power level", other)),
        }
    }
}

impl FromStr for Power {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" | "1" | "true" | "65535" => Ok(Power::On),
            "off" | "0" | "false" => Ok(Power::Off),
            _ => Err(ProtocolError::invalid_parameter("power level", s)),
        }
    }
}

impl fmt::Display for Power {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Power::On => f.write_str("on"),
            Power::Off => f.write_str("off"),
        }
    }
}

/// Hue, saturation, brightness and kelvin, the LIFX colour representation.
///
/// The fields are public so colours reported by devices can be held as
/// received. Colours built by hand should go through [`Hsbk::new`]; anything
/// sent to a device is checked with [`Hsbk::validate`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

impl Hsbk {
    pub const MIN_KELVIN: u16 = 1500;
    pub const MAX_KELVIN: u16 = 9000;

    pub fn new(hue: u16, saturation: u16, brightness: u16, kelvin: u16) -> Result<Self> {
        let color = Self {
            hue,
            saturation,
            brightness,
            kelvin,
        };
        color.validate()?;
        Ok(color)
    }

    /// Check the kelvin range. Every other component accepts any value.
    pub fn validate(&self) -> Result<()> {
        if !(Self::MIN_KELVIN..=Self::MAX_KELVIN).contains(&self.kelvin) {
            return Err(ProtocolError::InvalidParameter(format!(
                "kelvin {} is out of range [{}, {}]",
                self.kelvin,
                Self::MIN_KELVIN,
                Self::MAX_KELVIN
            )));
        }
        Ok(())
    }

    pub fn components(&self) -> [u16; 4] {
        [self.hue, self.saturation, self.brightness, self.kelvin]
    }
}

impl TryFrom<&[u16]> for Hsbk {
    type Error = ProtocolError;

    fn try_from(components: &[u16]) -> Result<Self> {
        match *components {
            [hue, saturation, brightness, kelvin] => Hsbk::new(hue, saturation, brightness, kelvin),
            _ => Err(ProtocolError::InvalidParameter(format!(
                "{:?} is not a valid color: expected 4 components, got {}",
                components,
                components.len()
            ))),
        }
    }
}

/// Shape of a `SetWaveform` effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Waveform {
    Saw = 0,
    Sine = 1,
    HalfSine = 2,
    Triangle = 3,
    Pulse = 4,
}

impl TryFrom<u8> for Waveform {
    type Error = ProtocolError;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Waveform::Saw),
            1 => Ok(Waveform::Sine),
            2 => Ok(Waveform::HalfSine),
            3 => Ok(Waveform::Triangle),
            4 => Ok(Waveform::Pulse),
            other => Err(ProtocolError::invalid_parameter("waveform", other)),
        }
    }
}

/// Firmware version split into its major and minor halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
}

/// Split a raw version word: the high 16 bits are the major version and the
/// low 16 bits the minor.
///
/// Some clients keep only the low byte as the minor, which misreports any
/// minor above 255. The full half-word is kept here.
impl From<u32> for FirmwareVersion {
    fn from(raw: u32) -> Self {
        Self {
            major: (raw >> 16) as u16,
            minor: (raw & 0xffff) as u16,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_hardware_address_display_and_parse() {
        let mac = HardwareAddress::new([0xd0, 0x73, 0xd5, 0x01, 0x02, 0x0a]);
        assert_eq!(mac.to_string(), "d0:73:d5:01:02:0a");
        assert_eq!("d0:73:d5:01:02:0a".parse::<HardwareAddress>().unwrap(), mac);
    }

    #[rstest]
    #[case("d0:73:d5:01:02")]
    #[case("d0:73:d5:01:02:03:04")]
    #[case("zz:73:d5:01:02:03")]
    #[case("")]
    fn test_hardware_address_rejects_malformed(#[case] input: &str) {
        assert!(input.parse::<HardwareAddress>().is_err());
    }

    #[test]
    fn test_broadcast_address() {
        assert!(HardwareAddress::BROADCAST.is_broadcast());
        assert!(!HardwareAddress::new([1, 0, 0, 0, 0, 0]).is_broadcast());
    }

    #[rstest]
    #[case("on", Power::On)]
    #[case("ON", Power::On)]
    #[case("true", Power::On)]
    #[case("1", Power::On)]
    #[case("off", Power::Off)]
    #[case("0", Power::Off)]
    fn test_power_from_str(#[case] input: &str, #[case] expected: Power) {
        assert_eq!(input.parse::<Power>().unwrap(), expected);
    }

    #[test]
    fn test_power_rejects_unknown_values() {
        assert!("dim".parse::<Power>().is_err());
        assert!(Power::try_from(300u16).is_err());
        assert_eq!(Power::try_from(65535u16).unwrap(), Power::On);
        assert_eq!(Power::try_from(0u16).unwrap(), Power::Off);
    }

    #[test]
    fn test_power_levels() {
        assert_eq!(Power::On.level(), 65535);
        assert_eq!(Power::Off.level(), 0);
        assert_eq!(Power::from(true), Power::On);
        assert_eq!(Power::from_reported_level(12), Power::On);
    }

    #[test]
    fn test_hsbk_requires_four_components() {
        let color: &[u16] = &[0, 65535, 65535, 3500];
        assert!(Hsbk::try_from(color).is_ok());

        let short: &[u16] = &[0, 65535, 65535];
        let err = Hsbk::try_from(short).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidParameter(_)));
    }

    #[test]
    fn test_hsbk_kelvin_range() {
        assert!(Hsbk::new(0, 0, 0, 1499).is_err());
        assert!(Hsbk::new(0, 0, 0, 9001).is_err());
        assert!(Hsbk::new(0, 0, 0, 2700).is_ok());
    }

    #[rstest]
    #[case(Hsbk::default(), false)]
    #[case(Hsbk { kelvin: 0, hue: 100, saturation: 200, brightness: 300 }, false)]
    #[case(Hsbk { kelvin: 9000, ..Hsbk::default() }, true)]
    #[case(Hsbk { kelvin: 1500, ..Hsbk::default() }, true)]
    fn test_hand_built_colors_are_validated(#[case] color: Hsbk, #[case] valid: bool) {
        assert_eq!(color.validate().is_ok(), valid);
    }

    #[test]
    fn test_waveform_codes() {
        assert_eq!(Waveform::try_from(4).unwrap(), Waveform::Pulse);
        assert!(Waveform::try_from(5).is_err());
    }

    #[test]
    fn test_firmware_version_split() {
        let version = FirmwareVersion::from((2u32 << 16) | 80);
        assert_eq!(version.major, 2);
        assert_eq!(version.minor, 80);
        assert_eq!(version.to_string(), "2.80");
    }

    #[test]
    fn test_firmware_minor_keeps_high_byte() {
        let version = FirmwareVersion::from((3u32 << 16) | 0x0146);
        assert_eq!(version.major, 3);
        assert_eq!(version.minor, 0x146);
        assert_eq!(version.to_string(), "3.326");
    }
}
