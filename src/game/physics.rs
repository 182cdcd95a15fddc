//! Bounding volumes and player movement

use glam::Vec3;

/// Player model size (largest dimension) in world units
pub const PLAYER_SIZE: f32 = 0.8;
/// Player spawn pose
pub const PLAYER_START: Vec3 = Vec3::new(0.0, 1.5, 0.0);
/// Target point speed under steering input (units per second)
pub const MOVE_SPEED: f32 = 10.0;
/// How quickly the player eases toward its target
pub const LERP_FACTOR: f32 = 6.0;
/// Forgiveness margin shaved off the player's box before hazard tests
pub const COLLISION_MARGIN: f32 = 0.08;

/// Reachable region for the player's target point
#[derive(Debug, Clone, Copy)]
pub struct PlayerBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

pub const PLAYER_BOUNDS: PlayerBounds = PlayerBounds {
    min_x: -8.0,
    max_x: 8.0,
    min_y: -1.0,
    max_y: 6.0,
};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Touching faces count as intersecting
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Grow (positive) or shrink (negative) on every side
    pub fn expand_by_scalar(&self, amount: f32) -> Self {
        let delta = Vec3::splat(amount);
        let min = self.min - delta;
        let max = self.max + delta;
        // A box shrunk past its center collapses to that center
        let center = (self.min + self.max) * 0.5;
        Self {
            min: min.min(center),
            max: max.max(center),
        }
    }
}

/// Steering input for one frame; values are clamped to [-1, 1]
#[derive(Debug, Clone, Copy, Default)]
pub struct SteerInput {
    /// Left (-1) to right (+1)
    pub horizontal: f32,
    /// Down (-1) to up (+1)
    pub vertical: f32,
    /// Direct pointer drag in world units, applied on top of the keys
    pub drag: Option<(f32, f32)>,
}

/// Player position plus the target point it eases toward
#[derive(Debug, Clone)]
pub struct PlayerController {
    pub position: Vec3,
    pub target: Vec3,
}

impl PlayerController {
    pub fn new() -> Self {
        Self {
            position: PLAYER_START,
            target: PLAYER_START,
        }
    }

    /// Snap back to the start pose
    pub fn reset(&mut self) {
        self.position = PLAYER_START;
        self.target = PLAYER_START;
    }

    /// Advance movement by `dt` seconds
    pub fn update(&mut self, input: &SteerInput, dt: f32) {
        let horizontal = input.horizontal.clamp(-1.0, 1.0);
        let vertical = input.vertical.clamp(-1.0, 1.0);

        self.target.x += horizontal * MOVE_SPEED * dt;
        self.target.y += vertical * MOVE_SPEED * dt;

        if let Some((dx, dy)) = input.drag {
            self.target.x += dx;
            self.target.y += dy;
        }

        self.target.x = self.target.x.clamp(PLAYER_BOUNDS.min_x, PLAYER_BOUNDS.max_x);
        self.target.y = self.target.y.clamp(PLAYER_BOUNDS.min_y, PLAYER_BOUNDS.max_y);

        // Ease toward the target without overshooting on long frames
        let t = (LERP_FACTOR * dt).min(1.0);
        self.position.x += (self.target.x - self.position.x) * t;
        self.position.y += (self.target.y - self.position.y) * t;
    }

    /// Collision box, already shrunk by the forgiveness margin
    pub fn hit_box(&self) -> Aabb {
        Aabb::from_center_half_extents(self.position, Vec3::splat(PLAYER_SIZE * 0.5))
            .expand_by_scalar(-COLLISION_MARGIN)
    }
}

impl Default for PlayerController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_intersect_on_overlap_only() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::splat(0.5), Vec3::splat(2.0));
        let c = Aabb::new(Vec3::new(1.5, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn shrinking_never_inverts_a_box() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.1));
        let shrunk = a.expand_by_scalar(-1.0);
        assert!(shrunk.min.cmple(shrunk.max).all());
        assert_eq!(shrunk.min, Vec3::ZERO);
        assert_eq!(shrunk.max, Vec3::ZERO);
    }

    #[test]
    fn target_is_clamped_to_bounds() {
        let mut player = PlayerController::new();
        let input = SteerInput {
            horizontal: 5.0,
            vertical: -5.0,
            drag: None,
        };
        for _ in 0..200 {
            player.update(&input, 0.04);
        }
        assert_eq!(player.target.x, PLAYER_BOUNDS.max_x);
        assert_eq!(player.target.y, PLAYER_BOUNDS.min_y);
        assert!(player.position.x <= PLAYER_BOUNDS.max_x + 1e-4);
        assert!(player.position.x > 7.5);
    }

    #[test]
    fn hit_box_is_smaller_than_model() {
        let player = PlayerController::new();
        let hit = player.hit_box();
        let width = hit.max.x - hit.min.x;
        assert!((width - (PLAYER_SIZE - 2.0 * COLLISION_MARGIN)).abs() < 1e-5);
    }
}
