//! Physics world adapter
//!
//! The simulation core only sees the [`PhysicsWorld`] trait: bodies, pin joints,
//! gravity, ray queries and begun-contact notifications. Bodies and joints are
//! addressed by Rapier's generational handles, so a stale handle to a removed
//! segment never aliases a newer body.
//!
//! [`RapierWorld`] is the backend used by the driver and the tests.

pub mod world;

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use rapier2d::prelude::{ImpulseJointHandle, RigidBodyHandle};

pub use world::RapierWorld;

use crate::error::Result;

bitflags::bitflags! {
    /// Category bits used for collision and contact filtering
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        const CROCODILE = 1 << 0;
        const VINE_HOLDER = 1 << 1;
        const VINE = 1 << 2;
        const PRIZE = 1 << 3;
    }
}

/// Handle to a rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub RigidBodyHandle);

/// Handle to a pin joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JointHandle(pub ImpulseJointHandle);

/// Name tag shared by every segment of one vine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChainId(pub u32);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collision shape, centered on the body position (no rotation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Circle { radius: f32 },
    Rect { half_extents: Vec2 },
}

impl Shape {
    pub fn rect(size: Vec2) -> Self {
        Shape::Rect {
            half_extents: size * 0.5,
        }
    }

    pub fn width(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius * 2.0,
            Shape::Rect { half_extents } => half_extents.x * 2.0,
        }
    }

    pub fn height(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => radius * 2.0,
            Shape::Rect { half_extents } => half_extents.y * 2.0,
        }
    }

    pub fn area(&self) -> f32 {
        match *self {
            Shape::Circle { radius } => std::f32::consts::PI * radius * radius,
            Shape::Rect { half_extents } => 4.0 * half_extents.x * half_extents.y,
        }
    }
}

/// Description of a body to add to the world
#[derive(Debug, Clone)]
pub struct BodyDesc {
    pub shape: Shape,
    pub position: Vec2,
    pub category: Category,
    /// Categories this body bounces off (a static body accepts any)
    pub collides_with: Category,
    /// Categories whose overlap with this body is reported as a contact
    pub contact_test: Category,
    pub is_static: bool,
    pub density: f32,
    pub tag: Option<ChainId>,
}

impl BodyDesc {
    /// A dynamic body with default density
    pub fn dynamic(shape: Shape) -> Self {
        Self {
            shape,
            position: Vec2::ZERO,
            category: Category::empty(),
            collides_with: Category::empty(),
            contact_test: Category::empty(),
            is_static: false,
            density: 1.0,
            tag: None,
        }
    }

    /// A static body that never moves
    pub fn fixed(shape: Shape) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(shape)
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_collides_with(mut self, mask: Category) -> Self {
        self.collides_with = mask;
        self
    }

    pub fn with_contact_test(mut self, mask: Category) -> Self {
        self.contact_test = mask;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_tag(mut self, tag: ChainId) -> Self {
        self.tag = Some(tag);
        self
    }
}

/// A pin joint between two bodies at a world-space anchor (as created)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinJoint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub anchor: Vec2,
}

/// The physics engine as seen by the level simulation
///
/// All calls happen on the host's frame thread; nothing here blocks.
pub trait PhysicsWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Pin `a` and `b` together at `anchor` (world space)
    fn add_pin_joint(&mut self, a: BodyHandle, b: BodyHandle, anchor: Vec2)
    -> Result<JointHandle>;

    /// Remove a body together with every joint attached to it.
    /// Returns false if the body was already gone.
    fn remove_body(&mut self, body: BodyHandle) -> bool;

    /// Every body whose shape intersects the segment `start..end`, in no particular order
    fn ray_query(&self, start: Vec2, end: Vec2) -> Vec<BodyHandle>;

    fn set_gravity(&mut self, gravity: Vec2);

    /// Advance the simulation by `dt` seconds
    fn step(&mut self, dt: f32);

    fn contains_body(&self, body: BodyHandle) -> bool;

    fn body_position(&self, body: BodyHandle) -> Option<Vec2>;

    /// Teleport a body (velocity is discarded)
    fn set_body_position(&mut self, body: BodyHandle, position: Vec2) -> Result<()>;

    fn body_shape(&self, body: BodyHandle) -> Option<Shape>;

    fn body_tag(&self, body: BodyHandle) -> Option<ChainId>;

    /// All live bodies carrying `tag`
    fn bodies_tagged(&self, tag: ChainId) -> Vec<BodyHandle>;

    fn contains_joint(&self, joint: JointHandle) -> bool;

    fn joint(&self, joint: JointHandle) -> Option<PinJoint>;

    /// Contacts that began since the last call, as unordered body pairs
    fn drain_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)>;

    fn body_count(&self) -> usize;

    fn joint_count(&self) -> usize;
}
