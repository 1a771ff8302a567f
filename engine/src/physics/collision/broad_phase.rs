//! Sweep-and-prune broadphase along the x axis.

use crate::physics::types::Aabb;

/// Candidate pair finder over world AABBs.
///
/// Proxies are keyed by body slot index. Pairs come back with the smaller
/// slot first, sorted, so narrowphase order is deterministic.
#[derive(Debug, Default)]
pub struct SweepAndPrune {
    proxies: Vec<(usize, Aabb)>,
    pairs: Vec<(usize, usize)>,
}

impl SweepAndPrune {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.proxies.clear();
        self.pairs.clear();
    }

    pub fn insert(&mut self, slot: usize, aabb: Aabb) {
        self.proxies.push((slot, aabb));
    }

    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }

    /// Sort proxies by `min.x`, sweep, and return every overlapping pair.
    pub fn compute_pairs(&mut self) -> &[(usize, usize)] {
        self.pairs.clear();
        self.proxies
            .sort_by(|a, b| a.1.min.x.total_cmp(&b.1.min.x).then(a.0.cmp(&b.0)));
        for (i, (slot_a, aabb_a)) in self.proxies.iter().enumerate() {
            for (slot_b, aabb_b) in &self.proxies[i + 1..] {
                if aabb_b.min.x > aabb_a.max.x {
                    break;
                }
                if aabb_a.intersects(aabb_b) {
                    self.pairs
                        .push(((*slot_a).min(*slot_b), (*slot_a).max(*slot_b)));
                }
            }
        }
        self.pairs.sort_unstable();
        &self.pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_overlapping_pairs_only() {
        let mut sap = SweepAndPrune::new();
        sap.insert(2, Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
        sap.insert(0, Aabb::from_center_half_extents(Vec3::new(1.5, 0.0, 0.0), Vec3::ONE));
        sap.insert(1, Aabb::from_center_half_extents(Vec3::new(10.0, 0.0, 0.0), Vec3::ONE));
        sap.insert(3, Aabb::from_center_half_extents(Vec3::new(1.0, 5.0, 0.0), Vec3::ONE));
        assert_eq!(sap.compute_pairs(), &[(0, 2)]);
    }

    #[test]
    fn test_clear_resets() {
        let mut sap = SweepAndPrune::new();
        sap.insert(0, Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
        sap.insert(1, Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE));
        assert_eq!(sap.compute_pairs().len(), 1);
        sap.clear();
        assert!(sap.is_empty());
        assert!(sap.compute_pairs().is_empty());
    }
}
