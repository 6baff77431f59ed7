use serde::{Deserialize, Serialize};

use crate::common::GameError;

pub const DEFAULT_WIDTH: u32 = 12;
pub const DEFAULT_HEIGHT: u32 = 12;
/// One ship of each length.
pub const DEFAULT_FLEET: [u32; 4] = [5, 3, 2, 1];

/// Largest accepted frame payload in bytes. Real messages are at most 12.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1024;

/// Number of ships of one length in a fleet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetEntry {
    pub length: u32,
    pub count: u32,
}

/// Grid size and fleet, fixed for the lifetime of a session.
///
/// Deserialization goes through the same checks as [`SessionConfig::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSessionConfig")]
pub struct SessionConfig {
    width: u32,
    height: u32,
    fleet: Vec<FleetEntry>,
}

/// Unchecked wire shape of a [`SessionConfig`].
#[derive(Deserialize)]
struct RawSessionConfig {
    width: u32,
    height: u32,
    fleet: Vec<FleetEntry>,
}

impl TryFrom<RawSessionConfig> for SessionConfig {
    type Error = GameError;

    fn try_from(raw: RawSessionConfig) -> Result<Self, Self::Error> {
        Self::from_fleet(raw.width, raw.height, raw.fleet)
    }
}

impl SessionConfig {
    /// Build a configuration from a list of ship lengths. Repeated lengths
    /// are folded into one entry; entries are ordered by decreasing length.
    pub fn new(width: u32, height: u32, ship_lengths: &[u32]) -> Result<Self, GameError> {
        let fleet = ship_lengths
            .iter()
            .map(|&length| FleetEntry { length, count: 1 })
            .collect();
        Self::from_fleet(width, height, fleet)
    }

    /// Build a configuration from fleet entries, folding entries of equal
    /// length.
    pub fn from_fleet(
        width: u32,
        height: u32,
        entries: Vec<FleetEntry>,
    ) -> Result<Self, GameError> {
        if width == 0 || height == 0 {
            return Err(GameError::InvalidConfig("grid dimensions must be non-zero"));
        }
        if width > i32::MAX as u32 || height > i32::MAX as u32 {
            return Err(GameError::InvalidConfig("grid dimensions exceed coordinate range"));
        }
        if entries.is_empty() {
            return Err(GameError::InvalidConfig("fleet must contain at least one ship"));
        }
        let longest_side = width.max(height);
        let mut fleet: Vec<FleetEntry> = Vec::new();
        for entry in entries {
            if entry.length == 0 {
                return Err(GameError::InvalidConfig("ship length must be non-zero"));
            }
            if entry.count == 0 {
                return Err(GameError::InvalidConfig("ship count must be non-zero"));
            }
            if entry.length > longest_side {
                return Err(GameError::InvalidConfig("ship does not fit on the grid"));
            }
            match fleet.iter_mut().find(|e| e.length == entry.length) {
                Some(existing) => {
                    existing.count = existing
                        .count
                        .checked_add(entry.count)
                        .ok_or(GameError::InvalidConfig("fleet has more cells than the grid"))?;
                }
                None => fleet.push(entry),
            }
        }
        fleet.sort_by(|a, b| b.length.cmp(&a.length));

        let total = fleet.iter().try_fold(0u64, |sum, e| {
            sum.checked_add(e.length as u64 * e.count as u64)
        });
        match total {
            Some(cells) if cells <= (width as u64) * (height as u64) && cells <= u32::MAX as u64 => {}
            _ => return Err(GameError::InvalidConfig("fleet has more cells than the grid")),
        }
        Ok(Self { width, height, fleet })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fleet entries, longest ships first.
    pub fn fleet(&self) -> &[FleetEntry] {
        &self.fleet
    }

    /// Total number of cells covered by a complete fleet. Construction
    /// guarantees it fits in a `u32`.
    pub fn max_ship_cells(&self) -> u32 {
        self.fleet.iter().map(|e| e.length * e.count).sum()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fleet: DEFAULT_FLEET
                .iter()
                .map(|&length| FleetEntry { length, count: 1 })
                .collect(),
        }
    }
}

/// Endpoint addressing and framing limits for the TCP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetConfig {
    /// Local address the acceptor binds to.
    pub listen: String,
    /// Address of the peer's acceptor.
    pub peer: String,
    pub max_frame_size: u32,
    /// Optional bound on one outbound connect-and-send. `None` blocks until
    /// the peer answers or the connection fails.
    pub send_timeout_ms: Option<u64>,
}

impl NetConfig {
    pub fn new(listen: impl Into<String>, peer: impl Into<String>) -> Self {
        Self {
            listen: listen.into(),
            peer: peer.into(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            send_timeout_ms: None,
        }
    }
}
