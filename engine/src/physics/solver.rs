//! Sequential impulse contact solver.
//!
//! Projected Gauss-Seidel over every contact point: one non-penetration row
//! plus two friction rows per point. Velocity targets use a speculative term
//! for separated points (`vn >= -d/dt`) and Baumgarte correction beyond the
//! allowed slop for penetrating ones. No restitution, no warm starting; the
//! accumulated normal impulse is written back to each contact point.

use glam::{Mat3, Vec3};

use super::collision::ContactManifold;

/// Solver tuning.
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    pub iterations: usize,
    /// Fraction of penetration corrected per step.
    pub baumgarte: f32,
    /// Penetration left uncorrected (meters).
    pub penetration_slop: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            baumgarte: 0.2,
            penetration_slop: 0.01,
        }
    }
}

/// Velocity state of one body while the solver runs.
#[derive(Debug, Clone, Copy)]
pub struct SolverBody {
    pub center: Vec3,
    pub inverse_mass: f32,
    pub inverse_inertia: Mat3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub friction: f32,
}

impl SolverBody {
    /// Infinite-mass body at rest (static, sleeping or removed).
    pub fn fixed(center: Vec3, friction: f32) -> Self {
        Self {
            center,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            friction,
        }
    }

    #[inline]
    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    #[inline]
    fn apply_impulse(&mut self, impulse: Vec3, r: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity += self.inverse_inertia * r.cross(impulse);
    }

    fn effective_mass(&self, r: Vec3, axis: Vec3) -> f32 {
        let rxn = r.cross(axis);
        self.inverse_mass + (self.inverse_inertia * rxn).cross(r).dot(axis)
    }
}

#[derive(Debug, Clone, Copy)]
struct ContactConstraint {
    body_a: usize,
    body_b: usize,
    manifold: usize,
    point: usize,
    r_a: Vec3,
    r_b: Vec3,
    /// Unit normal from B toward A.
    normal: Vec3,
    tangents: [Vec3; 2],
    normal_mass: f32,
    tangent_mass: [f32; 2],
    target_velocity: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

fn inverse_or_zero(value: f32) -> f32 {
    if value > f32::EPSILON { 1.0 / value } else { 0.0 }
}

fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a >= items.len() || b >= items.len() {
        return None;
    }
    if a < b {
        let (left, right) = items.split_at_mut(b);
        Some((&mut left[a], &mut right[0]))
    } else {
        let (left, right) = items.split_at_mut(a);
        Some((&mut right[0], &mut left[b]))
    }
}

/// Projected Gauss-Seidel contact solver.
#[derive(Debug, Default)]
pub struct SequentialImpulseSolver {
    config: SolverConfig,
    constraints: Vec<ContactConstraint>,
}

impl SequentialImpulseSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            constraints: Vec::new(),
        }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Solve all manifold contacts for one sub-step of length `dt`.
    ///
    /// `bodies` is indexed by body slot; manifolds refer to it through their
    /// handles' indices.
    pub fn solve(&mut self, bodies: &mut [SolverBody], manifolds: &mut [ContactManifold], dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.prepare(bodies, manifolds, dt);

        for _ in 0..self.config.iterations {
            for c in self.constraints.iter_mut() {
                let Some((a, b)) = pair_mut(bodies, c.body_a, c.body_b) else {
                    continue;
                };

                let rel = a.velocity_at(c.r_a) - b.velocity_at(c.r_b);
                let vn = rel.dot(c.normal);
                let delta = c.normal_mass * (c.target_velocity - vn);
                let old = c.normal_impulse;
                c.normal_impulse = (old + delta).max(0.0);
                let applied = c.normal_impulse - old;
                a.apply_impulse(c.normal * applied, c.r_a);
                b.apply_impulse(-c.normal * applied, c.r_b);

                let limit = c.friction * c.normal_impulse;
                for k in 0..2 {
                    let tangent = c.tangents[k];
                    let rel = a.velocity_at(c.r_a) - b.velocity_at(c.r_b);
                    let delta = -c.tangent_mass[k] * rel.dot(tangent);
                    let old = c.tangent_impulse[k];
                    c.tangent_impulse[k] = (old + delta).clamp(-limit, limit);
                    let applied = c.tangent_impulse[k] - old;
                    a.apply_impulse(tangent * applied, c.r_a);
                    b.apply_impulse(-tangent * applied, c.r_b);
                }
            }
        }

        for c in &self.constraints {
            if let Some(point) = manifolds
                .get_mut(c.manifold)
                .and_then(|m| m.points_mut().get_mut(c.point))
            {
                point.applied_impulse = c.normal_impulse;
            }
        }
    }

    fn prepare(&mut self, bodies: &[SolverBody], manifolds: &mut [ContactManifold], dt: f32) {
        self.constraints.clear();
        let inv_dt = 1.0 / dt;
        for (m_index, manifold) in manifolds.iter_mut().enumerate() {
            let ia = manifold.body0().index();
            let ib = manifold.body1().index();
            let (Some(a), Some(b)) = (bodies.get(ia), bodies.get(ib)) else {
                continue;
            };
            let dynamic = a.inverse_mass > 0.0 || b.inverse_mass > 0.0;
            let friction = a.friction * b.friction;

            for (p_index, point) in manifold.points_mut().iter_mut().enumerate() {
                point.applied_impulse = 0.0;
                if !dynamic {
                    continue;
                }
                let normal = point.normal_world_on_b;
                let r_a = point.position_world_on_a - a.center;
                let r_b = point.position_world_on_b - b.center;
                let (t1, t2) = normal.any_orthonormal_pair();

                let target_velocity = if point.distance > 0.0 {
                    -point.distance * inv_dt
                } else {
                    self.config.baumgarte
                        * inv_dt
                        * (-point.distance - self.config.penetration_slop).max(0.0)
                };

                self.constraints.push(ContactConstraint {
                    body_a: ia,
                    body_b: ib,
                    manifold: m_index,
                    point: p_index,
                    r_a,
                    r_b,
                    normal,
                    tangents: [t1, t2],
                    normal_mass: inverse_or_zero(
                        a.effective_mass(r_a, normal) + b.effective_mass(r_b, normal),
                    ),
                    tangent_mass: [
                        inverse_or_zero(a.effective_mass(r_a, t1) + b.effective_mass(r_b, t1)),
                        inverse_or_zero(a.effective_mass(r_a, t2) + b.effective_mass(r_b, t2)),
                    ],
                    target_velocity,
                    friction,
                    normal_impulse: 0.0,
                    tangent_impulse: [0.0; 2],
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::BodyHandle;
    use crate::physics::collision::ContactPoint;
    use approx::assert_relative_eq;

    fn moving(mass: f32, center: Vec3, velocity: Vec3) -> SolverBody {
        SolverBody {
            center,
            inverse_mass: 1.0 / mass,
            inverse_inertia: Mat3::from_diagonal(Vec3::splat(1.0 / mass)),
            linear_velocity: velocity,
            angular_velocity: Vec3::ZERO,
            friction: 0.5,
        }
    }

    #[test]
    fn test_head_on_impulse_stops_approach() {
        // A at the origin moving +z into B; the contact normal on B points back at A.
        let mut bodies = vec![
            moving(35.0, Vec3::ZERO, Vec3::new(0.0, 0.0, 24.0)),
            moving(1000.0, Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO),
        ];
        let point = ContactPoint::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z, -0.005);
        let mut manifolds =
            vec![ContactManifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0)).with_point(point)];

        let mut solver = SequentialImpulseSolver::new(SolverConfig::default());
        solver.solve(&mut bodies, &mut manifolds, 1.0 / 60.0);

        let reduced_mass = 35.0 * 1000.0 / 1035.0;
        let impulse = manifolds[0].points()[0].applied_impulse;
        assert_relative_eq!(impulse, reduced_mass * 24.0, max_relative = 1e-3);
        assert_relative_eq!(
            bodies[0].linear_velocity.z,
            bodies[1].linear_velocity.z,
            epsilon = 1e-3
        );
    }

    #[test]
    fn test_separating_contact_has_no_impulse() {
        let mut bodies = vec![
            moving(1.0, Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0)),
            SolverBody::fixed(Vec3::new(0.0, 0.0, 2.0), 0.5),
        ];
        let point = ContactPoint::new(Vec3::new(0.0, 0.0, 1.0), -Vec3::Z, 0.01);
        let mut manifolds =
            vec![ContactManifold::new(BodyHandle::new(0, 0), BodyHandle::new(1, 0)).with_point(point)];
        SequentialImpulseSolver::default().solve(&mut bodies, &mut manifolds, 1.0 / 60.0);
        assert_eq!(manifolds[0].points()[0].applied_impulse, 0.0);
        assert_eq!(bodies[0].linear_velocity.z, -1.0);
    }
}
