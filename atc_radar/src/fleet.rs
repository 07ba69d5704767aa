//! Shared tracked-aircraft set.
//!
//! The radar admits and retires planes; the relay looks them up to
//! apply commands. Aircraft identity is the plane id, never the memory
//! address — ids are unique within the tracked set at any instant.

use crate::plane::Plane;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Concurrent registry of tracked aircraft.
#[derive(Default)]
pub struct Fleet {
    planes: RwLock<Vec<Arc<Plane>>>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a plane. Duplicate ids are rejected silently (the caller
    /// already holds an equivalent aircraft).
    pub fn insert(&self, plane: Arc<Plane>) -> bool {
        let mut planes = self.planes.write();
        if planes.iter().any(|p| p.id() == plane.id()) {
            debug!(plane = plane.id(), "duplicate id, ignoring admission");
            return false;
        }
        planes.push(plane);
        true
    }

    /// Look up a tracked plane by id.
    pub fn get(&self, id: i32) -> Option<Arc<Plane>> {
        self.planes.read().iter().find(|p| p.id() == id).cloned()
    }

    /// Remove a plane from tracking, returning its handle.
    pub fn remove(&self, id: i32) -> Option<Arc<Plane>> {
        let mut planes = self.planes.write();
        let index = planes.iter().position(|p| p.id() == id)?;
        Some(planes.swap_remove(index))
    }

    /// Handles on every tracked plane, for sweeping.
    pub fn handles(&self) -> Vec<Arc<Plane>> {
        self.planes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.planes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop every integrator thread.
    pub fn stop_all(&self) {
        for plane in self.handles() {
            plane.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atc_common::geometry::Vec3;

    fn plane(id: i32) -> Arc<Plane> {
        Arc::new(Plane::new(
            id,
            Vec3::new(1000.0, 1000.0, 5000.0),
            Vec3::ZERO,
        ))
    }

    #[test]
    fn insert_and_lookup() {
        let fleet = Fleet::new();
        assert!(fleet.insert(plane(1)));
        assert!(fleet.insert(plane(2)));
        assert_eq!(fleet.len(), 2);
        assert_eq!(fleet.get(1).unwrap().id(), 1);
        assert!(fleet.get(3).is_none());
    }

    #[test]
    fn duplicate_ids_rejected() {
        let fleet = Fleet::new();
        assert!(fleet.insert(plane(1)));
        assert!(!fleet.insert(plane(1)));
        assert_eq!(fleet.len(), 1);
    }

    #[test]
    fn remove_returns_handle() {
        let fleet = Fleet::new();
        fleet.insert(plane(1));
        let removed = fleet.remove(1).unwrap();
        assert_eq!(removed.id(), 1);
        assert!(fleet.is_empty());
        assert!(fleet.remove(1).is_none());
    }
}
