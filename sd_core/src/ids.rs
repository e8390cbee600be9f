//! Typed entity identifiers and the monotonic per-kind counters they are
//! allocated from.
//!
//! Every identifier is a thin newtype over a numeric suffix so call sites
//! can't accidentally compare a `CharacterId` to a `LocationId`, while still
//! (de)serializing to the plain prefixed string (`"C0"`, `"PB001"`, ...) that
//! the project directory format uses on disk.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of entity a monotonic counter is tracked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Character,
    Location,
    Scene,
    OpenLoop,
    Relationship,
    Faction,
    Lore,
    PlotBeat,
}

impl EntityKind {
    fn prefix(self) -> &'static str {
        match self {
            EntityKind::Character => "C",
            EntityKind::Location => "L",
            EntityKind::Scene => "S",
            EntityKind::OpenLoop => "OL",
            EntityKind::Relationship => "R",
            EntityKind::Faction => "F",
            EntityKind::Lore => "LR",
            EntityKind::PlotBeat => "PB",
        }
    }

    /// Zero-padding width of the numeric suffix; only Scene and PlotBeat
    /// are zero-padded per the project directory convention.
    fn pad_width(self) -> usize {
        match self {
            EntityKind::Scene => 3,
            EntityKind::PlotBeat => 3,
            _ => 0,
        }
    }

    fn format_id(self, n: u32) -> String {
        let width = self.pad_width();
        if width == 0 {
            format!("{}{}", self.prefix(), n)
        } else {
            format!("{}{:0width$}", self.prefix(), n, width = width)
        }
    }
}

macro_rules! typed_id {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            pub const KIND: EntityKind = $kind;

            pub fn new(n: u32) -> Self {
                $name(n)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", $kind.format_id(self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.to_string())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                parse_suffix(&raw, $kind)
                    .map($name)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid {} id: {raw}", stringify!($name))))
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                parse_suffix(raw, $kind).map($name).ok_or_else(|| format!("invalid {} id: {raw}", stringify!($name)))
            }
        }
    };
}

typed_id!(CharacterId, EntityKind::Character);
typed_id!(LocationId, EntityKind::Location);
typed_id!(SceneId, EntityKind::Scene);
typed_id!(OpenLoopId, EntityKind::OpenLoop);
typed_id!(RelationshipId, EntityKind::Relationship);
typed_id!(FactionId, EntityKind::Faction);
typed_id!(LoreId, EntityKind::Lore);
typed_id!(PlotBeatId, EntityKind::PlotBeat);

/// Parse the numeric suffix of a prefixed id string, validating the prefix
/// matches the expected kind.
fn parse_suffix(raw: &str, kind: EntityKind) -> Option<u32> {
    let prefix = kind.prefix();
    let suffix = raw.strip_prefix(prefix)?;
    suffix.parse::<u32>().ok()
}

/// Monotonic per-kind counters, the sole source of truth for the next id of
/// each kind. Never decremented; persisted as `counters.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    pub character: u32,
    pub location: u32,
    pub scene: u32,
    pub open_loop: u32,
    pub relationship: u32,
    pub faction: u32,
    pub lore: u32,
    pub plot_beat: u32,
}

impl Default for Counters {
    /// Every kind starts at 0 except `PlotBeat`, which §3 numbers from
    /// `PB001`.
    fn default() -> Self {
        Counters {
            character: 0,
            location: 0,
            scene: 0,
            open_loop: 0,
            relationship: 0,
            faction: 0,
            lore: 0,
            plot_beat: 1,
        }
    }
}

impl Counters {
    /// Allocate the next id of `kind`, incrementing the counter.
    pub fn next(&mut self, kind: EntityKind) -> u32 {
        let slot = match kind {
            EntityKind::Character => &mut self.character,
            EntityKind::Location => &mut self.location,
            EntityKind::Scene => &mut self.scene,
            EntityKind::OpenLoop => &mut self.open_loop,
            EntityKind::Relationship => &mut self.relationship,
            EntityKind::Faction => &mut self.faction,
            EntityKind::Lore => &mut self.lore,
            EntityKind::PlotBeat => &mut self.plot_beat,
        };
        let n = *slot;
        *slot += 1;
        n
    }

    /// Ensure the counter for `kind` is at least `seen + 1`, used when
    /// reconciling counters against ids observed on disk (invariant #5).
    pub fn observe(&mut self, kind: EntityKind, seen: u32) {
        let slot = match kind {
            EntityKind::Character => &mut self.character,
            EntityKind::Location => &mut self.location,
            EntityKind::Scene => &mut self.scene,
            EntityKind::OpenLoop => &mut self.open_loop,
            EntityKind::Relationship => &mut self.relationship,
            EntityKind::Faction => &mut self.faction,
            EntityKind::Lore => &mut self.lore,
            EntityKind::PlotBeat => &mut self.plot_beat,
        };
        if seen + 1 > *slot {
            *slot = seen + 1;
        }
    }
}
