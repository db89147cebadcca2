/// Channel roles and layouts
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Speaker position a channel is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelRole {
    /// Unknown or unassigned position
    Unknown,
    /// Mono
    Mono,
    /// Front left
    Left,
    /// Front right
    Right,
    /// Front center
    Center,
    /// Low-frequency effects
    Lfe,
    /// Side left
    SideLeft,
    /// Side right
    SideRight,
    /// Back center
    BackCenter,
    /// Back left
    BackLeft,
    /// Back right
    BackRight,
    /// Front left of center
    CenterLeft,
    /// Front right of center
    CenterRight,
}

impl ChannelRole {
    /// All roles, in label table order
    pub const ALL: [Self; 13] = [
        Self::Unknown,
        Self::Mono,
        Self::Left,
        Self::Right,
        Self::Center,
        Self::Lfe,
        Self::SideLeft,
        Self::SideRight,
        Self::BackCenter,
        Self::BackLeft,
        Self::BackRight,
        Self::CenterLeft,
        Self::CenterRight,
    ];

    /// Roles in WAVE_FORMAT_EXTENSIBLE channel-mask bit order
    const MASK_ORDER: [Self; 11] = [
        Self::Left,
        Self::Right,
        Self::Center,
        Self::Lfe,
        Self::BackLeft,
        Self::BackRight,
        Self::CenterLeft,
        Self::CenterRight,
        Self::BackCenter,
        Self::SideLeft,
        Self::SideRight,
    ];

    /// Short label used in layout strings ("L", "LFE", ...)
    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "X",
            Self::Mono => "M",
            Self::Left => "L",
            Self::Right => "R",
            Self::Center => "C",
            Self::Lfe => "LFE",
            Self::SideLeft => "SL",
            Self::SideRight => "SR",
            Self::BackCenter => "BC",
            Self::BackLeft => "BL",
            Self::BackRight => "BR",
            Self::CenterLeft => "CL",
            Self::CenterRight => "CR",
        }
    }

    /// Parse a short label, case-insensitively
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered list of channel roles; position `i` is interleave slot `i`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout(Vec<ChannelRole>);

impl ChannelLayout {
    /// Create a layout from roles
    pub fn new(roles: Vec<ChannelRole>) -> Self {
        Self(roles)
    }

    /// Single mono channel
    pub fn mono() -> Self {
        Self(vec![ChannelRole::Mono])
    }

    /// Left/right stereo
    pub fn stereo() -> Self {
        Self(vec![ChannelRole::Left, ChannelRole::Right])
    }

    /// Conventional layout for a bare channel count (WAV defaults)
    pub fn default_for(channels: u16) -> Self {
        use ChannelRole::*;
        let known: &[ChannelRole] = match channels {
            1 => &[Mono],
            2 => &[Left, Right],
            3 => &[Left, Right, Center],
            4 => &[Left, Right, BackLeft, BackRight],
            5 => &[Left, Right, Center, BackLeft, BackRight],
            6 => &[Left, Right, Center, Lfe, BackLeft, BackRight],
            7 => &[Left, Right, Center, Lfe, BackCenter, SideLeft, SideRight],
            _ => &[Left, Right, Center, Lfe, BackLeft, BackRight, SideLeft, SideRight],
        };
        Self::padded(known, channels)
    }

    /// Layout from a WAVE_FORMAT_EXTENSIBLE style speaker mask
    ///
    /// Channels beyond the bits set in `mask` are [`ChannelRole::Unknown`];
    /// a zero mask falls back to [`ChannelLayout::default_for`].
    pub fn from_mask(mask: u32, channels: u16) -> Self {
        if mask == 0 {
            return Self::default_for(channels);
        }
        if channels == 1 {
            return Self::mono();
        }
        let roles: Vec<ChannelRole> = ChannelRole::MASK_ORDER
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, role)| *role)
            .collect();
        Self::padded(&roles, channels)
    }

    fn padded(roles: &[ChannelRole], channels: u16) -> Self {
        let count = usize::from(channels);
        let mut out: Vec<ChannelRole> = roles.iter().copied().take(count).collect();
        out.resize(count, ChannelRole::Unknown);
        Self(out)
    }

    /// Number of channels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-channel layout
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Roles in interleave order
    pub fn roles(&self) -> &[ChannelRole] {
        &self.0
    }

    /// Whether two layouts name the same multiset of roles, in any order
    pub fn same_roles(&self, other: &Self) -> bool {
        let mut a = self.0.clone();
        let mut b = other.0.clone();
        a.sort_by_key(|r| r.label());
        b.sort_by_key(|r| r.label());
        a == b
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, role) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(role.label())?;
        }
        Ok(())
    }
}

impl FromStr for ChannelLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .map(|label| {
                ChannelRole::from_label(label).ok_or_else(|| format!("unknown channel label '{label}'"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        let layout: ChannelLayout = "L,R,C,LFE,BL,BR".parse().unwrap();
        assert_eq!(layout.len(), 6);
        assert_eq!(layout.to_string(), "L,R,C,LFE,BL,BR");
    }

    #[test]
    fn parse_rejects_unknown_label() {
        assert!("L,Q".parse::<ChannelLayout>().is_err());
    }

    #[test]
    fn defaults_match_channel_count() {
        for channels in 1..=12u16 {
            assert_eq!(ChannelLayout::default_for(channels).len(), usize::from(channels));
        }
        assert_eq!(ChannelLayout::default_for(1), ChannelLayout::mono());
        assert_eq!(ChannelLayout::default_for(2), ChannelLayout::stereo());
    }

    #[test]
    fn mask_follows_bit_order() {
        // FL | FR | FC | LFE | BL | BR
        let layout = ChannelLayout::from_mask(0b11_1111, 6);
        assert_eq!(layout.to_string(), "L,R,C,LFE,BL,BR");

        // FL | FR | SL | SR, fewer bits than channels
        let layout = ChannelLayout::from_mask(0b110_0000_0011, 5);
        assert_eq!(layout.to_string(), "L,R,SL,SR,X");
    }

    #[test]
    fn same_roles_ignores_order() {
        let a: ChannelLayout = "L,R,C".parse().unwrap();
        let b: ChannelLayout = "C,L,R".parse().unwrap();
        let c: ChannelLayout = "L,R,LFE".parse().unwrap();
        assert!(a.same_roles(&b));
        assert!(!a.same_roles(&c));
    }
}
