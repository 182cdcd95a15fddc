//! Reusable obstacle handles
//!
//! Renderable objects are expensive to build, so despawned obstacles park
//! their handle in a per-kind bucket and the next spawn of that kind takes
//! it back out.

use glam::Vec3;
use std::collections::HashSet;

use super::layout::ObstacleKind;
use super::physics::Aabb;

/// Renderer-side collaborator that owns the actual visuals.
///
/// The engine never looks inside a handle; it only asks the scene to
/// create, show, move and hide it, and to report its bounds.
pub trait Scene {
    type Handle;

    /// Build a fresh renderable for `kind`
    fn instantiate(&mut self, kind: ObstacleKind) -> Self::Handle;

    /// Make the handle visible at `position`
    fn attach(&mut self, handle: &Self::Handle, position: Vec3);

    /// Hide the handle and take it out of the visible scene
    fn detach(&mut self, handle: &Self::Handle);

    /// Move an attached handle
    fn place(&mut self, handle: &Self::Handle, position: Vec3);

    /// World-space bounds of the handle if it sat at `position`
    fn bounds(&self, handle: &Self::Handle, kind: ObstacleKind, position: Vec3) -> Aabb;
}

/// Enum-indexed free lists, one bucket per obstacle kind
pub struct ObstaclePool<H> {
    buckets: [Vec<H>; ObstacleKind::COUNT],
    created: [usize; ObstacleKind::COUNT],
}

impl<H> ObstaclePool<H> {
    pub fn new() -> Self {
        Self {
            buckets: [Vec::new(), Vec::new(), Vec::new()],
            created: [0; ObstacleKind::COUNT],
        }
    }

    /// Take a parked handle or build a new one. The caller must attach it.
    pub fn acquire<S>(&mut self, scene: &mut S, kind: ObstacleKind) -> H
    where
        S: Scene<Handle = H>,
    {
        match self.buckets[kind.index()].pop() {
            Some(handle) => handle,
            None => {
                self.created[kind.index()] += 1;
                scene.instantiate(kind)
            }
        }
    }

    /// Hide a handle and park it for reuse
    pub fn release<S>(&mut self, scene: &mut S, kind: ObstacleKind, handle: H)
    where
        S: Scene<Handle = H>,
    {
        scene.detach(&handle);
        self.buckets[kind.index()].push(handle);
    }

    /// Parked handles of `kind`
    pub fn available(&self, kind: ObstacleKind) -> usize {
        self.buckets[kind.index()].len()
    }

    /// Handles of `kind` ever instantiated through this pool
    pub fn created(&self, kind: ObstacleKind) -> usize {
        self.created[kind.index()]
    }

    pub fn parked(&self, kind: ObstacleKind) -> &[H] {
        &self.buckets[kind.index()]
    }
}

impl<H> Default for ObstaclePool<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque id for handles created by [`HeadlessScene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u32);

/// Scene without a renderer. Tracks which handles are visible so server-side
/// simulation and tests can run the engine unchanged.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    next_id: u32,
    visible: HashSet<HandleId>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, handle: HandleId) -> bool {
        self.visible.contains(&handle)
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    /// Half extents of the normalized model for each kind
    fn half_extents(kind: ObstacleKind) -> Vec3 {
        let half = kind.world_size() * 0.5;
        match kind {
            // Arches are wide and tall but thin along the track
            ObstacleKind::Gate => Vec3::new(half, half, 0.15),
            // Rings face the player
            ObstacleKind::Ring => Vec3::new(half, half, 0.1),
            ObstacleKind::Tree => Vec3::new(half * 0.55, half, half * 0.55),
        }
    }
}

impl Scene for HeadlessScene {
    type Handle = HandleId;

    fn instantiate(&mut self, _kind: ObstacleKind) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;
        id
    }

    fn attach(&mut self, handle: &HandleId, _position: Vec3) {
        self.visible.insert(*handle);
    }

    fn detach(&mut self, handle: &HandleId) {
        self.visible.remove(handle);
    }

    fn place(&mut self, _handle: &HandleId, _position: Vec3) {}

    fn bounds(&self, _handle: &HandleId, kind: ObstacleKind, position: Vec3) -> Aabb {
        let half = Self::half_extents(kind);
        // Ground-standing models have their origin at the base
        let center = match kind {
            ObstacleKind::Ring => position,
            ObstacleKind::Gate | ObstacleKind::Tree => position + Vec3::new(0.0, half.y, 0.0),
        };
        Aabb::from_center_half_extents(center, half)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_handles_are_reused_before_new_ones() {
        let mut scene = HeadlessScene::new();
        let mut pool = ObstaclePool::new();

        let a = pool.acquire(&mut scene, ObstacleKind::Tree);
        scene.attach(&a, Vec3::ZERO);
        pool.release(&mut scene, ObstacleKind::Tree, a);
        assert!(!scene.is_visible(a));
        assert_eq!(pool.available(ObstacleKind::Tree), 1);

        let b = pool.acquire(&mut scene, ObstacleKind::Tree);
        assert_eq!(a, b);
        assert_eq!(pool.created(ObstacleKind::Tree), 1);
        assert_eq!(pool.available(ObstacleKind::Tree), 0);
    }

    #[test]
    fn buckets_are_separate_per_kind() {
        let mut scene = HeadlessScene::new();
        let mut pool = ObstaclePool::new();

        let ring = pool.acquire(&mut scene, ObstacleKind::Ring);
        pool.release(&mut scene, ObstacleKind::Ring, ring);

        let gate = pool.acquire(&mut scene, ObstacleKind::Gate);
        assert_ne!(gate, ring);
        assert_eq!(pool.available(ObstacleKind::Ring), 1);
        assert_eq!(pool.created(ObstacleKind::Gate), 1);
    }
}
