//! Channel color groups.
//!
//! A color identifies a channel to listeners (the "green channel") and is
//! fixed for the channel's lifetime. The display values are owned by the
//! server so that clients never need an update when the palette changes.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelColor {
    Yellow,
    Red,
    Green,
    Blue,
}

impl ChannelColor {
    pub const ALL: [ChannelColor; 4] = [Self::Yellow, Self::Red, Self::Green, Self::Blue];

    pub const fn slug(self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::Green => "green",
            Self::Blue => "blue",
        }
    }

    /// Hex RGBA used for foreground elements.
    pub const fn opaque(self) -> &'static str {
        match self {
            Self::Yellow => "#ffb100ba",
            Self::Red => "#dc322fba",
            Self::Green => "#429900ba",
            Self::Blue => "#268bd2ba",
        }
    }

    /// Hex RGBA used for backgrounds.
    pub const fn transparent(self) -> &'static str {
        match self {
            Self::Yellow => "#ffb10042",
            Self::Red => "#dc322f42",
            Self::Green => "#45ff0042",
            Self::Blue => "#268bd242",
        }
    }
}

impl fmt::Display for ChannelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ChannelColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(Self::Yellow),
            "red" => Ok(Self::Red),
            "green" => Ok(Self::Green),
            "blue" => Ok(Self::Blue),
            _ => Err(Error::InvalidColor(s.to_string())),
        }
    }
}
