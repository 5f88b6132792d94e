use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Numeric device identifier as reported by endpoint hardware
pub type DeviceId = u32;

/// Canonical "nothing is routed here" value used by every name feedback
pub const NO_SOURCE: &str = "$off";

/// Signal type bit flags carried by ports and tie lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SignalType(u8);

impl SignalType {
    pub const NONE: SignalType = SignalType(0);
    pub const AUDIO: SignalType = SignalType(1);
    pub const VIDEO: SignalType = SignalType(2);
    pub const AUDIO_VIDEO: SignalType = SignalType(1 | 2);
    pub const USB_OUTPUT: SignalType = SignalType(8);
    pub const USB_INPUT: SignalType = SignalType(16);
    pub const SECONDARY_AUDIO: SignalType = SignalType(32);

    const NAMED: [(SignalType, &'static str); 5] = [
        (SignalType::AUDIO, "Audio"),
        (SignalType::VIDEO, "Video"),
        (SignalType::USB_OUTPUT, "UsbOutput"),
        (SignalType::USB_INPUT, "UsbInput"),
        (SignalType::SECONDARY_AUDIO, "SecondaryAudio"),
    ];

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True when every flag in `other` is also set in `self`
    pub const fn contains(self, other: SignalType) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: SignalType) -> bool {
        self.0 & other.0 != 0
    }

    /// True when `self` is non-empty and fits inside `capability`
    pub const fn fits(self, capability: SignalType) -> bool {
        !self.is_empty() && capability.contains(self)
    }
}

impl BitOr for SignalType {
    type Output = SignalType;

    fn bitor(self, rhs: Self) -> Self::Output {
        SignalType(self.0 | rhs.0)
    }
}

impl BitOrAssign for SignalType {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SignalType {
    type Output = SignalType;

    fn bitand(self, rhs: Self) -> Self::Output {
        SignalType(self.0 & rhs.0)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("None");
        }
        let mut rest = *self;
        let mut parts: Vec<&str> = Vec::new();
        if rest.contains(SignalType::AUDIO_VIDEO) {
            parts.push("AudioVideo");
            rest = SignalType(rest.0 & !SignalType::AUDIO_VIDEO.0);
        }
        for (flag, name) in SignalType::NAMED {
            if rest.contains(flag) {
                parts.push(name);
            }
        }
        f.write_str(&parts.join("|"))
    }
}

impl FromStr for SignalType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut flags = SignalType::NONE;
        for part in s.split('|').map(str::trim) {
            let flag = match part {
                p if p.eq_ignore_ascii_case("none") => SignalType::NONE,
                p if p.eq_ignore_ascii_case("audiovideo") => SignalType::AUDIO_VIDEO,
                other => SignalType::NAMED
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(other))
                    .map(|(flag, _)| *flag)
                    .ok_or_else(|| format!("unknown signal type '{}'", other))?,
            };
            flags |= flag;
        }
        Ok(flags)
    }
}

impl TryFrom<String> for SignalType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SignalType> for String {
    fn from(value: SignalType) -> Self {
        value.to_string()
    }
}

/// Physical or logical connector kind of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionType {
    #[default]
    None,
    BackplaneOnly,
    Hdmi,
    DisplayPort,
    Dvi,
    Vga,
    Sdi,
    HdBaseT,
    DmCat,
    LineAudio,
    DigitalAudio,
    Speaker,
    Streaming,
    UsbC,
}

/// Port direction (Input sorts before Output for display)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortDirection::Input => f.write_str("input"),
            PortDirection::Output => f.write_str("output"),
        }
    }
}

/// Device-specific token mapping a port back to a physical connector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Number(u32),
    Name(String),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Number(n) => write!(f, "{}", n),
            Selector::Name(name) => f.write_str(name),
        }
    }
}
