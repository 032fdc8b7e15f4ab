//! Vine chains
//!
//! A vine is a static holder plus `length` rect segments hanging straight down
//! from it, pinned together into a simple path. Joint 0 pins the holder to
//! segment 0 at the holder's center; joint `i` pins segment `i-1` to segment `i`
//! at segment `i-1`'s center. The free end can then be pinned to another body.
//!
//! The chain owns its handles; a renderer only borrows them.

use glam::Vec2;

use crate::consts::{ATTACH_HEIGHT_FRACTION, MAX_VINE_LENGTH};
use crate::error::{GameError, Result};
use crate::physics::{BodyDesc, BodyHandle, Category, ChainId, JointHandle, PhysicsWorld, Shape};

/// Default segment extent (points)
pub const DEFAULT_SEGMENT_SIZE: Vec2 = Vec2::new(4.0, 12.0);
/// Default holder radius (points)
pub const DEFAULT_HOLDER_RADIUS: f32 = 8.0;

/// A joint this chain created, with the two bodies it pins
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointLink {
    pub handle: JointHandle,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
}

impl JointLink {
    pub fn references(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }
}

#[derive(Debug, Clone)]
pub struct VineChain {
    id: ChainId,
    anchor_position: Vec2,
    length: usize,
    segment_size: Vec2,
    holder_radius: f32,
    holder: Option<BodyHandle>,
    segments: Vec<BodyHandle>,
    joints: Vec<JointLink>,
    attached_body: Option<BodyHandle>,
    severed: bool,
}

impl VineChain {
    /// Plan a vine of `length` segments hanging below `anchor_position`
    pub fn new(length: usize, anchor_position: Vec2, id: ChainId) -> Result<Self> {
        if length == 0 {
            return Err(GameError::Configuration(format!(
                "vine {id} must have at least one segment"
            )));
        }
        if length > MAX_VINE_LENGTH as usize {
            return Err(GameError::Configuration(format!(
                "vine {id} has {length} segments, at most {MAX_VINE_LENGTH} allowed"
            )));
        }
        Ok(Self {
            id,
            anchor_position,
            length,
            segment_size: DEFAULT_SEGMENT_SIZE,
            holder_radius: DEFAULT_HOLDER_RADIUS,
            holder: None,
            segments: Vec::with_capacity(length),
            joints: Vec::with_capacity(length + 1),
            attached_body: None,
            severed: false,
        })
    }

    pub fn with_segment_size(mut self, size: Vec2) -> Self {
        self.segment_size = size;
        self
    }

    pub fn with_holder_radius(mut self, radius: f32) -> Self {
        self.holder_radius = radius;
        self
    }

    /// Where segment `index` is placed when materialized: each one a full
    /// segment height below the previous, touching end to end
    pub fn planned_position(&self, index: usize) -> Vec2 {
        let offset = self.segment_size.y * (index + 1) as f32;
        Vec2::new(self.anchor_position.x, self.anchor_position.y - offset)
    }

    /// Register the holder, the segments and their joints with the world
    pub fn materialize<W: PhysicsWorld + ?Sized>(&mut self, world: &mut W) -> Result<()> {
        if self.holder.is_some() {
            return Err(GameError::Ordering("vine already materialized"));
        }

        let holder = world.add_body(
            BodyDesc::fixed(Shape::Circle {
                radius: self.holder_radius,
            })
            .with_position(self.anchor_position)
            .with_category(Category::VINE_HOLDER),
        );
        self.holder = Some(holder);

        for i in 0..self.length {
            let segment = world.add_body(
                BodyDesc::dynamic(Shape::rect(self.segment_size))
                    .with_position(self.planned_position(i))
                    .with_category(Category::VINE)
                    .with_collides_with(Category::VINE_HOLDER)
                    .with_tag(self.id),
            );
            self.segments.push(segment);
        }

        self.pin(world, holder, self.segments[0], self.anchor_position)?;
        for i in 1..self.length {
            let (a, b) = (self.segments[i - 1], self.segments[i]);
            let center = world.body_position(a).ok_or(GameError::UnknownBody(a))?;
            self.pin(world, a, b, center)?;
        }

        log::debug!(
            "Vine {} materialized: {} segments below {:?}",
            self.id,
            self.length,
            self.anchor_position
        );
        Ok(())
    }

    /// Move the last segment onto `target`'s attachment point and pin it there
    pub fn attach_end<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        target: BodyHandle,
    ) -> Result<JointHandle> {
        if self.holder.is_none() {
            return Err(GameError::Ordering("attach_end called before materialize"));
        }
        if self.attached_body.is_some() {
            return Err(GameError::Ordering("vine end already attached"));
        }
        let last = *self
            .segments
            .last()
            .ok_or(GameError::Ordering("vine has no segment left to attach"))?;

        let target_pos = world
            .body_position(target)
            .ok_or(GameError::UnknownBody(target))?;
        let target_height = world.body_shape(target).map_or(0.0, |s| s.height());
        let end = target_pos + Vec2::new(0.0, target_height * ATTACH_HEIGHT_FRACTION);

        world.set_body_position(last, end)?;
        let handle = self.pin(world, last, target, end)?;
        self.attached_body = Some(target);
        Ok(handle)
    }

    fn pin<W: PhysicsWorld + ?Sized>(
        &mut self,
        world: &mut W,
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor: Vec2,
    ) -> Result<JointHandle> {
        let handle = world.add_pin_joint(body_a, body_b, anchor)?;
        self.joints.push(JointLink {
            handle,
            body_a,
            body_b,
        });
        Ok(handle)
    }

    /// Forget a segment that left the world, along with every joint that
    /// referenced it. Any removal severs the chain.
    pub fn remove_segment(&mut self, segment: BodyHandle) -> bool {
        let Some(pos) = self.segments.iter().position(|s| *s == segment) else {
            return false;
        };
        self.segments.remove(pos);
        self.joints.retain(|j| !j.references(segment));
        self.severed = true;
        true
    }

    /// Is this chain still holding `body` up?
    pub fn supports(&self, body: BodyHandle) -> bool {
        !self.severed && self.attached_body == Some(body)
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn anchor_position(&self) -> Vec2 {
        self.anchor_position
    }

    pub fn holder(&self) -> Option<BodyHandle> {
        self.holder
    }

    pub fn segments(&self) -> &[BodyHandle] {
        &self.segments
    }

    pub fn joints(&self) -> &[JointLink] {
        &self.joints
    }

    pub fn attached_body(&self) -> Option<BodyHandle> {
        self.attached_body
    }

    pub fn segment_size(&self) -> Vec2 {
        self.segment_size
    }

    /// Live segment count
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_severed(&self) -> bool {
        self.severed
    }

    pub fn is_materialized(&self) -> bool {
        self.holder.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::RapierWorld;
    use proptest::prelude::*;

    fn prize(world: &mut RapierWorld, pos: Vec2) -> BodyHandle {
        world.add_body(
            BodyDesc::dynamic(Shape::Circle { radius: 30.0 })
                .with_position(pos)
                .with_category(Category::PRIZE),
        )
    }

    /// Walk the joint links from the holder and check they form one simple path
    fn assert_simple_path(vine: &VineChain) {
        let holder = vine.holder().unwrap();
        let segments = vine.segments();
        assert_eq!(vine.joints()[0].body_a, holder);
        assert_eq!(vine.joints()[0].body_b, segments[0]);
        for i in 1..segments.len() {
            assert_eq!(vine.joints()[i].body_a, segments[i - 1]);
            assert_eq!(vine.joints()[i].body_b, segments[i]);
        }
        // Every segment appears once
        let seen: std::collections::HashSet<_> = segments.iter().collect();
        assert_eq!(seen.len(), segments.len());
    }

    #[test]
    fn test_zero_length_is_configuration_error() {
        assert!(matches!(
            VineChain::new(0, Vec2::new(100.0, 500.0), ChainId(0)),
            Err(GameError::Configuration(_))
        ));
    }

    #[test]
    fn test_oversized_vine_is_configuration_error() {
        assert!(matches!(
            VineChain::new(4_000_000_000, Vec2::new(100.0, 500.0), ChainId(0)),
            Err(GameError::Configuration(_))
        ));
        assert!(VineChain::new(MAX_VINE_LENGTH as usize, Vec2::ZERO, ChainId(0)).is_ok());
    }

    #[test]
    fn test_attach_before_materialize_is_ordering_error() {
        let mut world = RapierWorld::new();
        let target = prize(&mut world, Vec2::new(100.0, 400.0));
        let mut vine = VineChain::new(3, Vec2::new(100.0, 500.0), ChainId(0)).unwrap();
        assert!(matches!(
            vine.attach_end(&mut world, target),
            Err(GameError::Ordering(_))
        ));
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn test_double_materialize_is_ordering_error() {
        let mut world = RapierWorld::new();
        let mut vine = VineChain::new(2, Vec2::new(100.0, 500.0), ChainId(0)).unwrap();
        vine.materialize(&mut world).unwrap();
        assert!(matches!(
            vine.materialize(&mut world),
            Err(GameError::Ordering(_))
        ));
        assert_eq!(world.body_count(), 3);
    }

    #[test]
    fn test_segments_hang_end_to_end() {
        let mut world = RapierWorld::new();
        let anchor = Vec2::new(100.0, 500.0);
        let mut vine = VineChain::new(3, anchor, ChainId(7)).unwrap();
        vine.materialize(&mut world).unwrap();

        let positions: Vec<_> = vine
            .segments()
            .iter()
            .map(|s| world.body_position(*s).unwrap())
            .collect();
        assert_eq!(positions[0], Vec2::new(100.0, 488.0));
        assert_eq!(positions[1], Vec2::new(100.0, 476.0));
        assert_eq!(positions[2], Vec2::new(100.0, 464.0));
        for s in vine.segments() {
            assert_eq!(world.body_tag(*s), Some(ChainId(7)));
        }
        assert_eq!(world.body_tag(vine.holder().unwrap()), None);
    }

    #[test]
    fn test_joint_anchors_at_earlier_body_center() {
        let mut world = RapierWorld::new();
        let anchor = Vec2::new(100.0, 500.0);
        let mut vine = VineChain::new(3, anchor, ChainId(0)).unwrap();
        vine.materialize(&mut world).unwrap();

        let joints = vine.joints();
        assert_eq!(world.joint(joints[0].handle).unwrap().anchor, anchor);
        assert_eq!(
            world.joint(joints[1].handle).unwrap().anchor,
            Vec2::new(100.0, 488.0)
        );
        assert_eq!(
            world.joint(joints[2].handle).unwrap().anchor,
            Vec2::new(100.0, 476.0)
        );
    }

    #[test]
    fn test_attach_end_moves_last_segment_onto_target() {
        let mut world = RapierWorld::new();
        let target = prize(&mut world, Vec2::new(100.0, 400.0));
        let mut vine = VineChain::new(3, Vec2::new(100.0, 500.0), ChainId(0)).unwrap();
        vine.materialize(&mut world).unwrap();
        let joint = vine.attach_end(&mut world, target).unwrap();

        // Radius 30 => height 60 => attachment 6 points above the center
        let expected = Vec2::new(100.0, 406.0);
        let last = *vine.segments().last().unwrap();
        assert_eq!(world.body_position(last), Some(expected));

        let pin = world.joint(joint).unwrap();
        assert_eq!((pin.body_a, pin.body_b, pin.anchor), (last, target, expected));
        assert_eq!(vine.joints().len(), 4);
        assert!(vine.supports(target));

        assert!(matches!(
            vine.attach_end(&mut world, target),
            Err(GameError::Ordering(_))
        ));
    }

    #[test]
    fn test_attach_to_missing_body() {
        let mut world = RapierWorld::new();
        let target = prize(&mut world, Vec2::new(100.0, 400.0));
        world.remove_body(target);
        let mut vine = VineChain::new(1, Vec2::new(100.0, 500.0), ChainId(0)).unwrap();
        vine.materialize(&mut world).unwrap();
        assert_eq!(
            vine.attach_end(&mut world, target),
            Err(GameError::UnknownBody(target))
        );
    }

    #[test]
    fn test_remove_segment_drops_its_joints_and_severs() {
        let mut world = RapierWorld::new();
        let target = prize(&mut world, Vec2::new(100.0, 400.0));
        let mut vine = VineChain::new(3, Vec2::new(100.0, 500.0), ChainId(0)).unwrap();
        vine.materialize(&mut world).unwrap();
        vine.attach_end(&mut world, target).unwrap();

        let middle = vine.segments()[1];
        assert!(vine.remove_segment(middle));
        assert!(!vine.remove_segment(middle));
        assert!(vine.is_severed());
        assert!(!vine.supports(target));
        assert_eq!(vine.len(), 2);
        // holder-seg0 and seg2-prize remain
        assert_eq!(vine.joints().len(), 2);
        assert!(vine.joints().iter().all(|j| !j.references(middle)));
    }

    proptest! {
        #[test]
        fn prop_materialized_chain_is_a_simple_path(length in 1usize..40) {
            let mut world = RapierWorld::new();
            let mut vine = VineChain::new(length, Vec2::new(50.0, 900.0), ChainId(1)).unwrap();
            vine.materialize(&mut world).unwrap();

            prop_assert_eq!(vine.len(), length);
            prop_assert_eq!(vine.joints().len(), length);
            prop_assert_eq!(world.joint_count(), length);
            prop_assert_eq!(world.body_count(), length + 1);
            assert_simple_path(&vine);

            // Consecutive segments touch without overlapping
            for pair in vine.segments().windows(2) {
                let a = world.body_position(pair[0]).unwrap();
                let b = world.body_position(pair[1]).unwrap();
                prop_assert!((a.y - b.y - vine.segment_size().y).abs() < 1e-3);
            }
        }
    }
}
