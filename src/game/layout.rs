//! Play-field layout shared by spawning and judging
//!
//! Play-field: x in [-10, 10], y in [-2, 10], obstacles travel toward +z.
//! Five lanes sit 3 units apart. Gates stand on the ground line and their
//! opening runs from the ground up to roughly the crown.

use serde::{Deserialize, Serialize};

/// Lateral lane positions, left to right
pub const LANES: [f32; 5] = [-6.0, -3.0, 0.0, 3.0, 6.0];

/// Ground height gates (and trees) stand on
pub const GATE_Y: f32 = -2.0;

/// Horizontal half-width of a gate opening
pub const GATE_HALF_WIDTH: f32 = 1.8;

/// Vertical extent of a gate opening, measured up from `GATE_Y`
pub const GATE_OPEN_HEIGHT: f32 = 3.2;

/// Speed at score 0 (world units per second)
pub const BASE_SPEED: f32 = 18.0;
/// Speed ceiling
pub const MAX_SPEED: f32 = 38.0;
/// Speed gained per point scored
pub const SPEED_PER_POINT: f32 = 0.2;
/// Score points per difficulty level
pub const POINTS_PER_LEVEL: u32 = 5;

/// Distance in front of the player where waves appear
pub const SPAWN_DISTANCE: f32 = 100.0;
/// Distance behind the player where obstacles are recycled
pub const DESPAWN_DISTANCE: f32 = 14.0;
/// Seconds between waves
pub const SPAWN_INTERVAL: f32 = 2.2;

/// Upper bound on a single frame's delta, prevents tunnelling on stalls
pub const MAX_FRAME_DELTA: f32 = 0.04;

/// Obstacle variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    /// The passable arch, one per wave
    Gate,
    /// Floating ring hazard
    Ring,
    /// Ground tree hazard
    Tree,
}

impl ObstacleKind {
    pub const COUNT: usize = 3;
    pub const ALL: [ObstacleKind; Self::COUNT] =
        [ObstacleKind::Gate, ObstacleKind::Ring, ObstacleKind::Tree];

    /// Slot in enum-indexed tables
    pub const fn index(self) -> usize {
        match self {
            ObstacleKind::Gate => 0,
            ObstacleKind::Ring => 1,
            ObstacleKind::Tree => 2,
        }
    }

    /// Hazards are judged by intersection, gates by the opening rule
    pub const fn is_hazard(self) -> bool {
        !matches!(self, ObstacleKind::Gate)
    }

    /// Normalized model size (largest dimension) in world units
    pub const fn world_size(self) -> f32 {
        match self {
            ObstacleKind::Gate => 3.5,
            ObstacleKind::Ring => 1.2,
            ObstacleKind::Tree => 2.2,
        }
    }
}

/// Obstacle speed for a given score
pub fn speed_for_score(score: u32) -> f32 {
    (BASE_SPEED + score as f32 * SPEED_PER_POINT).min(MAX_SPEED)
}

/// Difficulty level for a given score
pub fn difficulty_for_score(score: u32) -> u32 {
    score / POINTS_PER_LEVEL
}
