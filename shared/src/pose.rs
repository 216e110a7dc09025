use std::ops::Mul;

use glam::{EulerRot, Quat, Vec3};

/// A position + orientation value describing an entity's placement in
/// world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Composes `self ∘ offset`: the pose of `offset` expressed in the
    /// space of `self`. Used to resolve mounted entities.
    pub fn transform(&self, offset: &Pose) -> Pose {
        Pose {
            position: self.position + self.rotation * offset.position,
            rotation: self.rotation * offset.rotation,
        }
    }

    /// Returns the same pose with the rotation flattened to its yaw
    /// component. Used when full rotation is not replicated.
    pub fn yaw_only(&self) -> Pose {
        let (yaw, _, _) = self.rotation.to_euler(EulerRot::YXZ);
        Pose {
            position: self.position,
            rotation: Quat::from_rotation_y(yaw),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        self.transform(&rhs)
    }
}

/// Default blend function for poses: linear position interpolation and
/// spherical rotation interpolation. Velocity estimates are unused here;
/// a caller wanting hermite-style blending can supply its own function.
pub fn blend_pose(v1: &Pose, v2: &Pose, _w1: &Vec3, _w2: &Vec3, t: f64, _dt: f64) -> Pose {
    let t = t as f32;
    Pose {
        position: v1.position.lerp(v2.position, t),
        rotation: v1.rotation.slerp(v2.rotation, t),
    }
}

/// Default forward-extrapolation for poses: advances position along the
/// velocity estimate, holds rotation.
pub fn advance_pose(latest: &Pose, velocity: &Vec3, elapsed: f64) -> Pose {
    Pose {
        position: latest.position + *velocity * elapsed as f32,
        rotation: latest.rotation,
    }
}
