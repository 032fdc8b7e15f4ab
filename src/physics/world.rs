//! Rapier-backed physics world
//!
//! Positions are in points. Gravity is configured in m/s² and scaled by
//! `POINTS_PER_METER` when stepping. Every body carries exactly one collider.
//!
//! Category masks map onto Rapier groups:
//! - collision groups admit every pair with a category, so begun contacts are
//!   seen for all of them and then filtered by the contact-test masks;
//! - solver groups carry `collides_with`. A static body never moves, so it
//!   accepts a response from any dynamic body that asks for one.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use glam::Vec2;
use rapier2d::prelude::*;

use super::{BodyDesc, BodyHandle, Category, ChainId, JointHandle, PhysicsWorld, PinJoint, Shape};
use crate::consts::{POINTS_PER_METER, SOLVER_ITERATIONS};
use crate::error::{GameError, Result};

// ---------------------------------------------------------------------------
// glam <-> nalgebra
// ---------------------------------------------------------------------------

fn vec2_to_na(v: Vec2) -> Vector<Real> {
    vector![v.x, v.y]
}

fn na_to_vec2(v: &Vector<Real>) -> Vec2 {
    Vec2::new(v.x, v.y)
}

fn group(category: Category) -> Group {
    Group::from_bits_truncate(category.bits())
}

/// What the world remembers about a body besides its Rapier state
#[derive(Debug, Clone, Copy)]
struct BodyInfo {
    shape: Shape,
    category: Category,
    contact_test: Category,
    tag: Option<ChainId>,
}

/// Collects started collisions during a step
#[derive(Default)]
struct ContactCollector {
    started: Mutex<Vec<(ColliderHandle, ColliderHandle)>>,
}

impl ContactCollector {
    fn drain(&self) -> Vec<(ColliderHandle, ColliderHandle)> {
        let mut started = self.started.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *started)
    }
}

impl EventHandler for ContactCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        if let CollisionEvent::Started(a, b, _) = event {
            self.started
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((a, b));
        }
    }

    fn handle_contact_force_event(
        &self,
        _dt: Real,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: Real,
    ) {
    }
}

/// [`PhysicsWorld`] over a Rapier pipeline
pub struct RapierWorld {
    /// Meters/s²
    gravity: Vec2,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    collector: ContactCollector,
    info: HashMap<RigidBodyHandle, BodyInfo>,
    /// World-space anchor each joint was created with
    anchors: HashMap<ImpulseJointHandle, Vec2>,
    begun: Vec<(BodyHandle, BodyHandle)>,
}

impl Default for RapierWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl RapierWorld {
    pub fn new() -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.length_unit = POINTS_PER_METER;
        integration_parameters.num_solver_iterations =
            NonZeroUsize::new(SOLVER_ITERATIONS).unwrap_or(NonZeroUsize::MIN);

        Self {
            gravity: Vec2::ZERO,
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collector: ContactCollector::default(),
            info: HashMap::new(),
            anchors: HashMap::new(),
            begun: Vec::new(),
        }
    }

    /// Gravity in meters/s²
    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn body_of(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.colliders.get(collider)?.parent()
    }

    /// Does either body ask to be told about touching the other?
    fn wants_contact(&self, a: RigidBodyHandle, b: RigidBodyHandle) -> bool {
        match (self.info.get(&a), self.info.get(&b)) {
            (Some(a), Some(b)) => {
                a.contact_test.intersects(b.category) || b.contact_test.intersects(a.category)
            }
            _ => false,
        }
    }
}

impl PhysicsWorld for RapierWorld {
    fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let body = if desc.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        }
        .translation(vec2_to_na(desc.position))
        .build();
        let handle = self.bodies.insert(body);

        let responds_to = if desc.is_static {
            Group::ALL
        } else {
            group(desc.collides_with)
        };
        let collider = match desc.shape {
            Shape::Circle { radius } => ColliderBuilder::ball(radius),
            Shape::Rect { half_extents } => ColliderBuilder::cuboid(half_extents.x, half_extents.y),
        }
        .density(desc.density)
        .collision_groups(InteractionGroups::new(group(desc.category), Group::ALL))
        .solver_groups(InteractionGroups::new(group(desc.category), responds_to))
        .active_events(ActiveEvents::COLLISION_EVENTS)
        .build();
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);

        self.info.insert(
            handle,
            BodyInfo {
                shape: desc.shape,
                category: desc.category,
                contact_test: desc.contact_test,
                tag: desc.tag,
            },
        );
        self.query_pipeline.update(&self.colliders);
        BodyHandle(handle)
    }

    fn add_pin_joint(&mut self, a: BodyHandle, b: BodyHandle, anchor: Vec2) -> Result<JointHandle> {
        let pos_a = *self
            .bodies
            .get(a.0)
            .ok_or(GameError::UnknownBody(a))?
            .position();
        let pos_b = *self
            .bodies
            .get(b.0)
            .ok_or(GameError::UnknownBody(b))?
            .position();

        let pivot = point![anchor.x, anchor.y];
        let joint = RevoluteJointBuilder::new()
            .local_anchor1(pos_a.inverse_transform_point(&pivot))
            .local_anchor2(pos_b.inverse_transform_point(&pivot))
            .contacts_enabled(false)
            .build();
        let handle = self.impulse_joints.insert(a.0, b.0, joint, true);
        self.anchors.insert(handle, anchor);
        Ok(JointHandle(handle))
    }

    fn remove_body(&mut self, body: BodyHandle) -> bool {
        let removed = self.bodies.remove(
            body.0,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        if removed.is_none() {
            return false;
        }
        self.info.remove(&body.0);
        let joints = &self.impulse_joints;
        self.anchors.retain(|handle, _| joints.get(*handle).is_some());
        self.begun.retain(|(a, b)| *a != body && *b != body);
        self.query_pipeline.update(&self.colliders);
        true
    }

    fn ray_query(&self, start: Vec2, end: Vec2) -> Vec<BodyHandle> {
        let dir = end - start;
        if dir.length_squared() <= f32::EPSILON {
            return Vec::new();
        }
        // max toi of 1 covers exactly start..end
        let ray = Ray::new(point![start.x, start.y], vec2_to_na(dir));
        let mut hits = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
            |collider, _| {
                if let Some(body) = self.body_of(collider) {
                    hits.push(BodyHandle(body));
                }
                true
            },
        );
        hits
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        let gravity = vec2_to_na(self.gravity * POINTS_PER_METER);
        self.physics_pipeline.step(
            &gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.collector,
        );

        for (a, b) in self.collector.drain() {
            let (Some(a), Some(b)) = (self.body_of(a), self.body_of(b)) else {
                continue;
            };
            if self.wants_contact(a, b) {
                self.begun.push((BodyHandle(a), BodyHandle(b)));
            }
        }
    }

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.bodies.contains(body.0)
    }

    fn body_position(&self, body: BodyHandle) -> Option<Vec2> {
        self.bodies.get(body.0).map(|rb| na_to_vec2(rb.translation()))
    }

    /// Colliders follow the body on the next step
    fn set_body_position(&mut self, body: BodyHandle, position: Vec2) -> Result<()> {
        let rb = self
            .bodies
            .get_mut(body.0)
            .ok_or(GameError::UnknownBody(body))?;
        rb.set_translation(vec2_to_na(position), true);
        rb.set_linvel(vector![0.0, 0.0], true);
        rb.set_angvel(0.0, true);
        Ok(())
    }

    fn body_shape(&self, body: BodyHandle) -> Option<Shape> {
        self.info.get(&body.0).map(|info| info.shape)
    }

    fn body_tag(&self, body: BodyHandle) -> Option<ChainId> {
        self.info.get(&body.0).and_then(|info| info.tag)
    }

    fn bodies_tagged(&self, tag: ChainId) -> Vec<BodyHandle> {
        self.bodies
            .iter()
            .filter(|(handle, _)| self.info.get(handle).is_some_and(|i| i.tag == Some(tag)))
            .map(|(handle, _)| BodyHandle(handle))
            .collect()
    }

    fn contains_joint(&self, joint: JointHandle) -> bool {
        self.impulse_joints.get(joint.0).is_some()
    }

    fn joint(&self, joint: JointHandle) -> Option<PinJoint> {
        let data = self.impulse_joints.get(joint.0)?;
        let anchor = *self.anchors.get(&joint.0)?;
        Some(PinJoint {
            body_a: BodyHandle(data.body1),
            body_b: BodyHandle(data.body2),
            anchor,
        })
    }

    fn drain_contacts(&mut self) -> Vec<(BodyHandle, BodyHandle)> {
        std::mem::take(&mut self.begun)
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;

    fn ball(pos: Vec2) -> BodyDesc {
        BodyDesc::dynamic(Shape::Circle { radius: 5.0 }).with_position(pos)
    }

    fn run(world: &mut RapierWorld, seconds: f32) {
        let steps = (seconds / SIM_DT).round() as usize;
        for _ in 0..steps {
            world.step(SIM_DT);
        }
    }

    #[test]
    fn test_dynamic_body_falls_static_body_stays() {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, -9.8));
        let falling = world.add_body(ball(Vec2::new(0.0, 100.0)));
        let fixed = world.add_body(
            BodyDesc::fixed(Shape::Circle { radius: 5.0 }).with_position(Vec2::new(50.0, 100.0)),
        );

        run(&mut world, 0.5);

        assert!(world.body_position(falling).unwrap().y < 100.0);
        assert_eq!(world.body_position(fixed), Some(Vec2::new(50.0, 100.0)));
    }

    #[test]
    fn test_pin_joint_holds_pendulum_length() {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, -9.8));
        let pivot = world.add_body(
            BodyDesc::fixed(Shape::Circle { radius: 2.0 }).with_position(Vec2::new(0.0, 100.0)),
        );
        let bob = world.add_body(ball(Vec2::new(30.0, 100.0)));
        let joint = world.add_pin_joint(pivot, bob, Vec2::new(0.0, 100.0)).unwrap();
        assert_eq!(world.joint(joint).unwrap().anchor, Vec2::new(0.0, 100.0));

        run(&mut world, 2.0);

        let bob_pos = world.body_position(bob).unwrap();
        let dist = bob_pos.distance(Vec2::new(0.0, 100.0));
        assert!((dist - 30.0).abs() < 1.5, "pendulum length drifted to {dist}");
        // It swung down
        assert!(bob_pos.y < 100.0);
    }

    #[test]
    fn test_heavy_load_does_not_stretch_rope() {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, -9.8));
        let anchor = Vec2::new(200.0, 540.0);
        let holder = world.add_body(
            BodyDesc::fixed(Shape::Circle { radius: 8.0 }).with_position(anchor),
        );

        // Ten 4x12 links, each pinned at the previous link's center
        let mut previous = holder;
        let mut pivot = anchor;
        for i in 0..10 {
            let link = world.add_body(
                BodyDesc::dynamic(Shape::rect(Vec2::new(4.0, 12.0)))
                    .with_position(anchor - Vec2::new(0.0, 12.0 * (i + 1) as f32))
                    .with_category(Category::VINE),
            );
            world.add_pin_joint(previous, link, pivot).unwrap();
            pivot = world.body_position(link).unwrap();
            previous = link;
        }
        let prize = world.add_body(
            BodyDesc::dynamic(Shape::Circle { radius: 30.0 })
                .with_position(pivot - Vec2::new(0.0, 6.0))
                .with_density(0.5),
        );
        world.add_pin_joint(previous, prize, pivot).unwrap();

        run(&mut world, 4.0);

        // Fully taut the prize hangs 126 points below the anchor
        let dist = world.body_position(prize).unwrap().distance(anchor);
        assert!(dist < 126.0 * 1.1, "rope stretched to {dist}");
    }

    #[test]
    fn test_remove_body_removes_attached_joints() {
        let mut world = RapierWorld::new();
        let a = world.add_body(ball(Vec2::ZERO));
        let b = world.add_body(ball(Vec2::new(0.0, -10.0)));
        let c = world.add_body(ball(Vec2::new(0.0, -20.0)));
        let ab = world.add_pin_joint(a, b, Vec2::ZERO).unwrap();
        let bc = world.add_pin_joint(b, c, Vec2::new(0.0, -10.0)).unwrap();
        let ac = world.add_pin_joint(a, c, Vec2::ZERO).unwrap();

        assert!(world.remove_body(b));
        assert!(!world.contains_joint(ab));
        assert!(!world.contains_joint(bc));
        assert!(world.contains_joint(ac));
        assert_eq!(world.joint(bc), None);
        assert_eq!(world.joint_count(), 1);
        assert_eq!(world.body_count(), 2);
        assert!(!world.remove_body(b));
    }

    #[test]
    fn test_pin_joint_unknown_body() {
        let mut world = RapierWorld::new();
        let a = world.add_body(ball(Vec2::ZERO));
        let b = world.add_body(ball(Vec2::ONE));
        world.remove_body(b);
        assert_eq!(
            world.add_pin_joint(a, b, Vec2::ZERO),
            Err(GameError::UnknownBody(b))
        );
        assert_eq!(
            world.set_body_position(b, Vec2::ZERO),
            Err(GameError::UnknownBody(b))
        );
    }

    #[test]
    fn test_ray_query_hits_only_crossed_bodies() {
        let mut world = RapierWorld::new();
        let hit = world.add_body(ball(Vec2::new(50.0, 0.0)));
        let miss = world.add_body(ball(Vec2::new(50.0, 40.0)));
        let beyond = world.add_body(ball(Vec2::new(150.0, 0.0)));

        let hits = world.ray_query(Vec2::new(0.0, 0.0), Vec2::new(100.0, 0.0));
        assert_eq!(hits, vec![hit]);
        assert!(!hits.contains(&miss));
        assert!(!hits.contains(&beyond));

        assert!(world.ray_query(Vec2::new(50.0, 0.0), Vec2::new(50.0, 0.0)).is_empty());
    }

    #[test]
    fn test_tags_and_shapes() {
        let mut world = RapierWorld::new();
        let tagged = world.add_body(
            BodyDesc::dynamic(Shape::rect(Vec2::new(4.0, 12.0))).with_tag(ChainId(3)),
        );
        let plain = world.add_body(ball(Vec2::ZERO));
        assert_eq!(world.body_tag(tagged), Some(ChainId(3)));
        assert_eq!(world.body_tag(plain), None);
        assert_eq!(world.bodies_tagged(ChainId(3)), vec![tagged]);
        assert_eq!(
            world.body_shape(tagged),
            Some(Shape::rect(Vec2::new(4.0, 12.0)))
        );
        world.remove_body(tagged);
        assert!(world.bodies_tagged(ChainId(3)).is_empty());
        assert_eq!(world.body_shape(tagged), None);
    }

    #[test]
    fn test_collides_with_mask_controls_response() {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, -9.8));
        world.add_body(
            BodyDesc::fixed(Shape::rect(Vec2::new(200.0, 20.0)))
                .with_category(Category::VINE_HOLDER),
        );
        let lands = world.add_body(
            ball(Vec2::new(-30.0, 50.0))
                .with_category(Category::VINE)
                .with_collides_with(Category::VINE_HOLDER),
        );
        let passes = world.add_body(
            ball(Vec2::new(30.0, 50.0))
                .with_category(Category::PRIZE)
                .with_collides_with(Category::CROCODILE),
        );

        run(&mut world, 2.0);

        let landed = world.body_position(lands).unwrap().y;
        assert!(landed > 5.0 && landed < 20.0, "masked body at y = {landed}");
        assert!(world.body_position(passes).unwrap().y < -50.0);
    }

    #[test]
    fn test_contacts_reported_once_per_overlap() {
        let mut world = RapierWorld::new();
        world.set_gravity(Vec2::new(0.0, -9.8));
        let sensor = world.add_body(
            BodyDesc::fixed(Shape::rect(Vec2::new(40.0, 200.0)))
                .with_category(Category::CROCODILE)
                .with_contact_test(Category::PRIZE),
        );
        let prize = world.add_body(
            BodyDesc::dynamic(Shape::Circle { radius: 5.0 })
                .with_position(Vec2::new(0.0, 130.0))
                .with_category(Category::PRIZE),
        );
        // Falls through the same region without a matching contact mask
        world.add_body(ball(Vec2::new(10.0, 130.0)).with_category(Category::VINE));

        let mut begun = Vec::new();
        for _ in 0..60 {
            world.step(SIM_DT);
            begun.extend(world.drain_contacts());
        }
        assert_eq!(begun.len(), 1);
        let (a, b) = begun[0];
        assert!((a, b) == (sensor, prize) || (a, b) == (prize, sensor));
    }
}
