//! Wave patterns and difficulty-gated rotation
//!
//! Rules every pattern follows:
//! 1. exactly one gate per wave, the player must fly through it;
//! 2. hazards go in other lanes, or ahead of the gate as approach obstacles;
//! 3. at least two lanes stay free of hazards.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::layout::{ObstacleKind, GATE_Y, LANES};

/// Number of hand-authored patterns
pub const PATTERN_COUNT: u64 = 8;

/// One obstacle to place
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub kind: ObstacleKind,
    /// Index into `LANES`
    pub lane: usize,
    pub y: f32,
    /// Extra distance beyond the spawn plane; approach hazards are met
    /// before the gate
    pub approach: f32,
}

impl Placement {
    pub fn x(&self) -> f32 {
        LANES[self.lane]
    }
}

/// A wave's placements plus the lanes the gate claimed
#[derive(Debug, Clone, Default)]
pub struct WavePlan {
    pub placements: Vec<Placement>,
    occupied: [bool; LANES.len()],
}

impl WavePlan {
    fn gate(&mut self, lane: usize) {
        self.occupied[lane] = true;
        self.placements.push(Placement {
            kind: ObstacleKind::Gate,
            lane,
            y: GATE_Y,
            approach: 0.0,
        });
    }

    fn hazard(&mut self, kind: ObstacleKind, lane: usize, y: f32, approach: f32) {
        self.placements.push(Placement {
            kind,
            lane,
            y,
            approach,
        });
    }

    /// A random lane the gate does not use, if any
    fn pick_clear<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        let free: Vec<usize> = (0..LANES.len()).filter(|&l| !self.occupied[l]).collect();
        if free.is_empty() {
            None
        } else {
            Some(pick(rng, &free))
        }
    }

    pub fn gate_count(&self) -> usize {
        self.placements
            .iter()
            .filter(|p| p.kind == ObstacleKind::Gate)
            .count()
    }

    pub fn gate_lane(&self) -> Option<usize> {
        self.placements
            .iter()
            .find(|p| p.kind == ObstacleKind::Gate)
            .map(|p| p.lane)
    }

    /// Lanes holding at least one hazard
    pub fn hazard_lanes(&self) -> [bool; LANES.len()] {
        let mut lanes = [false; LANES.len()];
        for p in self.placements.iter().filter(|p| p.kind.is_hazard()) {
            lanes[p.lane] = true;
        }
        lanes
    }
}

fn pick<R: Rng>(rng: &mut R, candidates: &[usize]) -> usize {
    candidates[rng.gen_range(0..candidates.len())]
}

/// How many patterns are unlocked at `difficulty`
pub fn max_pattern(difficulty: u32) -> u64 {
    (2 + u64::from(difficulty) / 2).min(PATTERN_COUNT)
}

/// Build the layout for `pattern`
pub fn plan_pattern<R: Rng>(pattern: u64, rng: &mut R) -> WavePlan {
    use ObstacleKind::{Ring, Tree};

    let mut plan = WavePlan::default();
    match pattern {
        // Lone centre gate
        0 => plan.gate(2),
        // Off-centre gate
        1 => plan.gate(pick(rng, &[1, 3])),
        // Gate plus a tree on the approach
        2 => {
            plan.gate(pick(rng, &[1, 2, 3]));
            if let Some(lane) = plan.pick_clear(rng) {
                plan.hazard(Tree, lane, GATE_Y, 8.0);
            }
        }
        // Centre gate, flanking trees
        3 => {
            plan.gate(2);
            plan.hazard(Tree, 0, GATE_Y, 6.0);
            plan.hazard(Tree, 4, GATE_Y, 6.0);
        }
        // Ring floating in front of another lane
        4 => {
            plan.gate(pick(rng, &[1, 2, 3]));
            if let Some(lane) = plan.pick_clear(rng) {
                plan.hazard(Ring, lane, 1.5, 12.0);
            }
        }
        // Two approach trees, a ring off-centre, centre gate
        5 => {
            plan.gate(2);
            plan.hazard(Tree, 0, GATE_Y, 10.0);
            plan.hazard(Tree, 4, GATE_Y, 10.0);
            plan.hazard(Ring, pick(rng, &[1, 3]), 2.0, 15.0);
        }
        // Ring high over the gate lane (duck under), tree to the side
        6 => {
            let gate = pick(rng, &[1, 2, 3]);
            plan.gate(gate);
            plan.hazard(Ring, gate, 3.5, 14.0);
            if let Some(lane) = plan.pick_clear(rng) {
                plan.hazard(Tree, lane, GATE_Y, 8.0);
            }
        }
        // Gauntlet: tree corridor, ring and trailing tree share a side lane
        7 => {
            plan.gate(2);
            plan.hazard(Tree, 0, GATE_Y, 10.0);
            plan.hazard(Tree, 4, GATE_Y, 10.0);
            let side = pick(rng, &[1, 3]);
            plan.hazard(Ring, side, 2.0, 18.0);
            plan.hazard(Tree, side, GATE_Y, 22.0);
        }
        _ => plan.gate(2),
    }
    plan
}

/// Rotates through the unlocked patterns, one wave per call
#[derive(Debug, Clone)]
pub struct WaveSpawner {
    wave: u64,
    difficulty: u32,
    rng: ChaCha8Rng,
}

impl WaveSpawner {
    pub fn new(seed: u64) -> Self {
        Self {
            wave: 0,
            difficulty: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn set_difficulty(&mut self, difficulty: u32) {
        self.difficulty = difficulty;
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn waves_spawned(&self) -> u64 {
        self.wave
    }

    /// Zero the counters; the RNG stream continues
    pub fn reset(&mut self) {
        self.wave = 0;
        self.difficulty = 0;
    }

    /// Plan the next wave and advance the wave counter
    pub fn next_wave(&mut self) -> Wave {
        let index = self.wave;
        self.wave += 1;
        let pattern = index % max_pattern(self.difficulty);
        Wave {
            index,
            pattern,
            plan: plan_pattern(pattern, &mut self.rng),
        }
    }
}

/// One planned wave
#[derive(Debug, Clone)]
pub struct Wave {
    /// 0-based position in the run
    pub index: u64,
    pub pattern: u64,
    pub plan: WavePlan,
}
