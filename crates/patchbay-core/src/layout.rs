//! Named multichannel layouts and the canonical channel-role ordering.
//!
//! Roles follow the usual interleaved speaker order (front left, front right,
//! center, LFE, back pair, side pair). A [`ChannelLayout`] is a fixed prefix
//! selection of those roles; it sets the playback channel count and labels
//! each output channel for metering.

use core::fmt;
use core::str::FromStr;

use crate::error::ConfigurationError;

/// A named speaker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ChannelRole {
    /// Front left.
    Left,
    /// Front right.
    Right,
    /// Front center.
    Center,
    /// Low-frequency effects (subwoofer).
    Sub,
    /// Back (rear) left.
    BackLeft,
    /// Back (rear) right.
    BackRight,
    /// Side left.
    SideLeft,
    /// Side right.
    SideRight,
}

impl ChannelRole {
    /// All roles in canonical order.
    pub const ALL: [ChannelRole; 8] = [
        ChannelRole::Left,
        ChannelRole::Right,
        ChannelRole::Center,
        ChannelRole::Sub,
        ChannelRole::BackLeft,
        ChannelRole::BackRight,
        ChannelRole::SideLeft,
        ChannelRole::SideRight,
    ];

    /// Human-readable name, used for device channel labels.
    pub fn name(self) -> &'static str {
        match self {
            ChannelRole::Left => "Left",
            ChannelRole::Right => "Right",
            ChannelRole::Center => "Center",
            ChannelRole::Sub => "Subwoofer",
            ChannelRole::BackLeft => "Back Left",
            ChannelRole::BackRight => "Back Right",
            ChannelRole::SideLeft => "Side Left",
            ChannelRole::SideRight => "Side Right",
        }
    }

    /// Short meter label.
    pub fn short_label(self) -> &'static str {
        match self {
            ChannelRole::Left => "L",
            ChannelRole::Right => "R",
            ChannelRole::Center => "C",
            ChannelRole::Sub => "LFE",
            ChannelRole::BackLeft => "BL",
            ChannelRole::BackRight => "BR",
            ChannelRole::SideLeft => "SL",
            ChannelRole::SideRight => "SR",
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MONO: &[ChannelRole] = &[ChannelRole::Center];
const STEREO: &[ChannelRole] = &[ChannelRole::Left, ChannelRole::Right];
const TWO_POINT_ONE: &[ChannelRole] = &[ChannelRole::Left, ChannelRole::Right, ChannelRole::Sub];
const QUAD: &[ChannelRole] = &[
    ChannelRole::Left,
    ChannelRole::Right,
    ChannelRole::BackLeft,
    ChannelRole::BackRight,
];
const FIVE_POINT_ONE: &[ChannelRole] = &[
    ChannelRole::Left,
    ChannelRole::Right,
    ChannelRole::Center,
    ChannelRole::Sub,
    ChannelRole::BackLeft,
    ChannelRole::BackRight,
];
const SEVEN_POINT_ONE: &[ChannelRole] = &ChannelRole::ALL;

/// A playback channel layout.
///
/// Selected once per session. The layout's channel count must match the
/// number of outputs in the [`ChannelMapping`](crate::ChannelMapping).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// One channel (center).
    Mono,
    /// Left/right.
    #[default]
    Stereo,
    /// Left/right plus LFE.
    TwoPointOne,
    /// Front and back pairs.
    Quad,
    /// 5.1 with back surrounds.
    FivePointOne,
    /// 7.1 with back and side surrounds.
    SevenPointOne,
}

impl ChannelLayout {
    /// Every layout, smallest first.
    pub const ALL: [ChannelLayout; 6] = [
        ChannelLayout::Mono,
        ChannelLayout::Stereo,
        ChannelLayout::TwoPointOne,
        ChannelLayout::Quad,
        ChannelLayout::FivePointOne,
        ChannelLayout::SevenPointOne,
    ];

    /// Ordered channel roles of this layout.
    pub fn roles(self) -> &'static [ChannelRole] {
        match self {
            ChannelLayout::Mono => MONO,
            ChannelLayout::Stereo => STEREO,
            ChannelLayout::TwoPointOne => TWO_POINT_ONE,
            ChannelLayout::Quad => QUAD,
            ChannelLayout::FivePointOne => FIVE_POINT_ONE,
            ChannelLayout::SevenPointOne => SEVEN_POINT_ONE,
        }
    }

    /// Number of playback channels.
    pub fn channel_count(self) -> usize {
        self.roles().len()
    }

    /// Role of the given output channel, if it exists in this layout.
    pub fn role(self, channel: usize) -> Option<ChannelRole> {
        self.roles().get(channel).copied()
    }

    /// Display names of the output channels, in order.
    pub fn channel_names(self) -> Vec<&'static str> {
        self.roles().iter().map(|r| r.name()).collect()
    }

    /// Short identifier used in config files and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelLayout::Mono => "mono",
            ChannelLayout::Stereo => "stereo",
            ChannelLayout::TwoPointOne => "2.1",
            ChannelLayout::Quad => "quad",
            ChannelLayout::FivePointOne => "5.1",
            ChannelLayout::SevenPointOne => "7.1",
        }
    }

    /// Largest layout that fits in a device with `channels` outputs.
    ///
    /// Returns `None` for zero channels.
    pub fn from_channel_count(channels: usize) -> Option<ChannelLayout> {
        Self::ALL
            .iter()
            .rev()
            .find(|l| l.channel_count() <= channels)
            .copied()
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelLayout {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mono" | "1.0" => Ok(ChannelLayout::Mono),
            "stereo" | "2.0" => Ok(ChannelLayout::Stereo),
            "2.1" => Ok(ChannelLayout::TwoPointOne),
            "quad" | "4.0" => Ok(ChannelLayout::Quad),
            "5.1" | "surround51" => Ok(ChannelLayout::FivePointOne),
            "7.1" | "surround71" => Ok(ChannelLayout::SevenPointOne),
            _ => Err(ConfigurationError::UnknownLayout(s.to_string())),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ChannelLayout {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ChannelLayout {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_counts() {
        assert_eq!(ChannelLayout::Mono.channel_count(), 1);
        assert_eq!(ChannelLayout::Stereo.channel_count(), 2);
        assert_eq!(ChannelLayout::TwoPointOne.channel_count(), 3);
        assert_eq!(ChannelLayout::Quad.channel_count(), 4);
        assert_eq!(ChannelLayout::FivePointOne.channel_count(), 6);
        assert_eq!(ChannelLayout::SevenPointOne.channel_count(), 8);
    }

    #[test]
    fn seven_one_uses_canonical_order() {
        assert_eq!(ChannelLayout::SevenPointOne.roles(), &ChannelRole::ALL);
        assert_eq!(ChannelLayout::SevenPointOne.role(3), Some(ChannelRole::Sub));
        assert_eq!(ChannelLayout::SevenPointOne.role(8), None);
    }

    #[test]
    fn from_channel_count_picks_largest_fit() {
        assert_eq!(ChannelLayout::from_channel_count(0), None);
        assert_eq!(ChannelLayout::from_channel_count(1), Some(ChannelLayout::Mono));
        assert_eq!(ChannelLayout::from_channel_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_channel_count(5), Some(ChannelLayout::Quad));
        assert_eq!(ChannelLayout::from_channel_count(6), Some(ChannelLayout::FivePointOne));
        assert_eq!(ChannelLayout::from_channel_count(32), Some(ChannelLayout::SevenPointOne));
    }

    #[test]
    fn parse_and_display() {
        for layout in ChannelLayout::ALL {
            let parsed: ChannelLayout = layout.to_string().parse().unwrap();
            assert_eq!(parsed, layout);
        }
        assert_eq!("Stereo".parse::<ChannelLayout>().unwrap(), ChannelLayout::Stereo);
        assert!(matches!(
            "9.2.4".parse::<ChannelLayout>(),
            Err(ConfigurationError::UnknownLayout(_))
        ));
    }

    #[test]
    fn channel_names_follow_roles() {
        assert_eq!(
            ChannelLayout::TwoPointOne.channel_names(),
            vec!["Left", "Right", "Subwoofer"]
        );
        assert_eq!(ChannelRole::Sub.short_label(), "LFE");
    }
}
