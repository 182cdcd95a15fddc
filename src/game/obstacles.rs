//! Obstacle motion, gate judging and hazard collision

use glam::Vec3;
use tracing::debug;

use super::layout::{
    ObstacleKind, BASE_SPEED, DESPAWN_DISTANCE, GATE_HALF_WIDTH, GATE_OPEN_HEIGHT,
    SPAWN_DISTANCE, SPAWN_INTERVAL,
};
use super::physics::Aabb;
use super::pool::{ObstaclePool, Scene};
use super::spawner::{Placement, WaveSpawner};

/// Motion and spawn tuning
#[derive(Debug, Clone, Copy)]
pub struct FieldOptions {
    /// World units per second toward the player
    pub speed: f32,
    pub spawn_distance: f32,
    pub despawn_distance: f32,
    /// Seconds between waves
    pub spawn_interval: f32,
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self {
            speed: BASE_SPEED,
            spawn_distance: SPAWN_DISTANCE,
            despawn_distance: DESPAWN_DISTANCE,
            spawn_interval: SPAWN_INTERVAL,
        }
    }
}

/// Vertical range a gate can be flown through
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateOpening {
    pub min_y: f32,
    pub max_y: f32,
}

/// Outcome of a gate crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgement {
    /// Flew through the opening
    Pass,
    /// Flew over, around or into the pillars
    Miss,
}

/// A live obstacle
#[derive(Debug, Clone)]
pub struct ObstacleInstance<H> {
    pub handle: H,
    pub kind: ObstacleKind,
    /// Set once the obstacle reaches the player's depth
    pub passed: bool,
    pub hit_box: Aabb,
    pub lane_x: f32,
    pub position: Vec3,
    /// Present only for gates
    pub opening: Option<GateOpening>,
}

/// Pass/miss rule for a gate reaching the player
pub fn judge_gate(lane_x: f32, opening: &GateOpening, player: Vec3) -> Judgement {
    let within_x = (lane_x - player.x).abs() < GATE_HALF_WIDTH;
    let within_y = player.y >= opening.min_y && player.y <= opening.max_y;
    if within_x && within_y {
        Judgement::Pass
    } else {
        Judgement::Miss
    }
}

/// Owns the active obstacles, their pool and the wave spawner
pub struct ObstacleField<S: Scene> {
    scene: S,
    pool: ObstaclePool<S::Handle>,
    active: Vec<ObstacleInstance<S::Handle>>,
    spawner: WaveSpawner,
    spawn_timer: f32,
    options: FieldOptions,
}

impl<S: Scene> ObstacleField<S> {
    pub fn new(scene: S, options: FieldOptions, seed: u64) -> Self {
        Self {
            scene,
            pool: ObstaclePool::new(),
            active: Vec::new(),
            spawner: WaveSpawner::new(seed),
            spawn_timer: 0.0,
            options,
        }
    }

    /// Release everything back to the pool and zero the counters
    pub fn reset(&mut self) {
        for obstacle in self.active.drain(..) {
            self.pool.release(&mut self.scene, obstacle.kind, obstacle.handle);
        }
        self.spawn_timer = 0.0;
        self.spawner.reset();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.options.speed = speed;
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.spawner.set_difficulty(difficulty);
    }

    /// Advance one frame. Returns the judgements of gates that reached the
    /// player this frame.
    pub fn update(&mut self, dt: f32, player: Vec3) -> Vec<Judgement> {
        let mut judgements = Vec::new();

        self.spawn_timer += dt;
        if self.spawn_timer >= self.options.spawn_interval {
            self.spawn_timer = 0.0;
            self.spawn_wave();
        }

        let step = self.options.speed * dt;
        for obstacle in self.active.iter_mut() {
            obstacle.position.z += step;
            self.scene.place(&obstacle.handle, obstacle.position);
            obstacle.hit_box = self
                .scene
                .bounds(&obstacle.handle, obstacle.kind, obstacle.position);

            if !obstacle.passed && obstacle.position.z >= player.z {
                obstacle.passed = true;

                if let Some(opening) = &obstacle.opening {
                    let judgement = judge_gate(obstacle.lane_x, opening, player);
                    debug!(
                        lane_x = obstacle.lane_x,
                        player_x = player.x,
                        player_y = player.y,
                        ?judgement,
                        "Gate reached player"
                    );
                    judgements.push(judgement);
                }
            }
        }

        // Despawn behind the player
        let mut i = 0;
        while i < self.active.len() {
            if self.active[i].position.z > self.options.despawn_distance {
                let obstacle = self.active.swap_remove(i);
                self.pool
                    .release(&mut self.scene, obstacle.kind, obstacle.handle);
            } else {
                i += 1;
            }
        }

        judgements
    }

    /// True if the player's box touches any hazard. Gates are judged only by
    /// the opening rule.
    pub fn check_collision(&self, player_box: &Aabb) -> bool {
        self.active
            .iter()
            .filter(|o| o.kind.is_hazard())
            .any(|o| player_box.intersects(&o.hit_box))
    }

    /// Emit the next wave at the spawn plane
    pub fn spawn_wave(&mut self) {
        let wave = self.spawner.next_wave();
        debug!(
            wave = wave.index,
            pattern = wave.pattern,
            difficulty = self.spawner.difficulty(),
            obstacles = wave.plan.placements.len(),
            "Spawning wave"
        );
        for placement in &wave.plan.placements {
            self.spawn(placement);
        }
    }

    pub(crate) fn spawn(&mut self, placement: &Placement) {
        let handle = self.pool.acquire(&mut self.scene, placement.kind);
        let position = Vec3::new(
            placement.x(),
            placement.y,
            -(self.options.spawn_distance + placement.approach),
        );
        self.scene.attach(&handle, position);
        let hit_box = self.scene.bounds(&handle, placement.kind, position);

        let opening = (placement.kind == ObstacleKind::Gate).then(|| GateOpening {
            min_y: placement.y,
            max_y: placement.y + GATE_OPEN_HEIGHT,
        });

        self.active.push(ObstacleInstance {
            handle,
            kind: placement.kind,
            passed: false,
            hit_box,
            lane_x: placement.x(),
            position,
            opening,
        });
    }

    pub fn active(&self) -> &[ObstacleInstance<S::Handle>] {
        &self.active
    }

    pub fn pool(&self) -> &ObstaclePool<S::Handle> {
        &self.pool
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn options(&self) -> &FieldOptions {
        &self.options
    }
}
