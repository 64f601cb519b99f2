//! Aura state and subject identity.

use serde::{Deserialize, Serialize};

/// What kind of subject owns an aura.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// An individual user account.
    User,
    /// A group chat.
    Group,
}

impl SubjectKind {
    /// Stable string form used as the storage key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }

    /// Parse the storage string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "group" => Some(Self::Group),
            _ => None,
        }
    }

    /// Aura written when a subject of this kind is created.
    pub fn initial_aura(&self) -> AuraState {
        match self {
            Self::User => AuraState::USER_INITIAL,
            Self::Group => AuraState::GROUP_INITIAL,
        }
    }
}

impl std::fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an aura owner. No subject ever has more than one aura.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId {
    pub kind: SubjectKind,
    pub id: String,
}

impl SubjectId {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::User,
            id: id.into(),
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            kind: SubjectKind::Group,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for SubjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A 3-channel colour, each channel in `0..=255`.
///
/// Channels are stored as `u8`, so the bound holds by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuraState {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl AuraState {
    /// Light gray given to new users.
    pub const USER_INITIAL: AuraState = AuraState::new(211, 211, 211);

    /// Mid gray given to new groups.
    pub const GROUP_INITIAL: AuraState = AuraState::new(128, 128, 128);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels in `[r, g, b]` order (index 0 = red).
    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_channels([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }

    /// Pack as an opaque ARGB integer (alpha = 0xFF), the layout older
    /// clients persisted aura colours in.
    pub fn to_argb(&self) -> u32 {
        0xFF00_0000 | (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Unpack an ARGB integer. Alpha is ignored.
    pub fn from_argb(argb: u32) -> Self {
        Self {
            r: ((argb >> 16) & 0xFF) as u8,
            g: ((argb >> 8) & 0xFF) as u8,
            b: (argb & 0xFF) as u8,
        }
    }

    /// `#rrggbb` form for display layers.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl std::fmt::Display for AuraState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.r, self.g, self.b)
    }
}

pub(crate) fn clamp_channel(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
