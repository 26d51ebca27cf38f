// Lamp animation state machine

use super::config::{ConfigError, LampConfig};
use super::easing::ease_out_sine;
use super::jump::JumpPlan;
use super::pose::{Pose, PoseTween};
use super::rig::LampRig;
use crate::scene::SceneGraph;
use rand::rngs::StdRng;
use rand::Rng;
use std::f32::consts::FRAC_PI_2;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RandomPose,
    Reset,
    Jump,
}

/// What the UI layer is allowed to do with the lamp.
pub trait LampControl {
    fn request_random_pose(&mut self);
    fn request_reset(&mut self);
    fn request_jump(&mut self);
    fn is_animating(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnimationState {
    Idle,
    RandomPosing(PoseTween),
    Resetting(PoseTween),
    JumpPreparing { tween: PoseTween, plan: JumpPlan },
    JumpFlight(JumpPlan),
}

impl AnimationState {
    pub fn label(&self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::RandomPosing(_) => "random pose",
            AnimationState::Resetting(_) => "resetting",
            AnimationState::JumpPreparing { .. } => "crouching",
            AnimationState::JumpFlight(_) => "jumping",
        }
    }
}

/// Picks a random in-range target for the lower arm, upper arm and head.
///
/// When the lower arm leans far enough to put the upper arm into the table,
/// the upper arm's sampling floor is raised.
pub fn random_target<R: Rng + ?Sized>(rng: &mut R, pose: &Pose, config: &LampConfig) -> Pose {
    let lower = &config.lower_pitch;
    let upper = &config.upper_pitch;
    let lower_pitch = rng.gen_range(lower.min..=lower.max);

    let upper_min = if lower_pitch <= config.coupling_threshold {
        upper.min.max(config.coupling_floor).min(upper.max)
    } else {
        upper.min
    };
    let upper_pitch = rng.gen_range(upper_min..=upper.max);

    Pose {
        lower_pitch,
        upper_pitch,
        head_yaw: rng.gen_range(config.head_yaw.min..=config.head_yaw.max),
        head_pitch: rng.gen_range(config.head_pitch.min..=config.head_pitch.max),
        ..*pose
    }
}

/// Drives the lamp's joints through random poses, resets and jumps.
///
/// Only one command runs at a time. Requests made while a command is running
/// are dropped; nothing can cancel a running command.
#[derive(Debug)]
pub struct LampAnimator {
    config: LampConfig,
    rig: LampRig,
    /// Last committed pose.
    pose: Pose,
    /// Pose shown this frame.
    current: Pose,
    elevation: f32,
    state: AnimationState,
    pending: Option<Command>,
    started_at: Instant,
    rng: StdRng,
}

impl LampAnimator {
    pub fn with_rng(config: LampConfig, rig: LampRig, rng: StdRng) -> Result<Self, ConfigError> {
        config.validate()?;
        let pose = Pose::rest(&config, config.home);
        Ok(Self {
            config,
            rig,
            pose,
            current: pose,
            elevation: 0.0,
            state: AnimationState::Idle,
            pending: None,
            started_at: Instant::now(),
            rng,
        })
    }

    #[cfg(test)]
    pub fn config(&self) -> &LampConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn rig(&self) -> &LampRig {
        &self.rig
    }

    /// Last committed pose.
    #[cfg(test)]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Pose as of the last tick, mid-animation included.
    #[cfg(test)]
    pub fn current_pose(&self) -> Pose {
        self.current
    }

    #[cfg(test)]
    pub fn elevation(&self) -> f32 {
        self.elevation
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    /// Seconds since the running phase started.
    pub fn elapsed_seconds(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.started_at).as_secs_f32()
    }

    /// Advances the state machine and writes the pose into the lamp's joints.
    pub fn update(&mut self, now: Instant, graph: &mut SceneGraph) {
        self.tick(now);
        self.rig.apply(graph, &self.current, self.elevation);
    }

    /// Advances the state machine to `now` without touching the scene.
    pub fn tick(&mut self, now: Instant) {
        if let Some(command) = self.pending.take() {
            if self.state == AnimationState::Idle {
                self.begin(command, now);
            } else {
                log::debug!("dropping {command:?}: lamp is busy");
            }
        }

        // A phase that ended between frames hands the rest of the frame to
        // the one that follows it.
        while self.step(now) {}
    }

    /// Advances the running phase. Returns true when it ended and a follow-up
    /// phase began at the instant it ended.
    fn step(&mut self, now: Instant) -> bool {
        let elapsed = self.elapsed_seconds(now);
        let state = std::mem::replace(&mut self.state, AnimationState::Idle);
        let (state, followed) = match state {
            AnimationState::Idle => (AnimationState::Idle, false),
            AnimationState::RandomPosing(tween) => {
                let state = self
                    .advance(tween, elapsed)
                    .map_or(AnimationState::Idle, AnimationState::RandomPosing);
                (state, false)
            }
            AnimationState::Resetting(tween) => {
                let state = self
                    .advance(tween, elapsed)
                    .map_or(AnimationState::Idle, AnimationState::Resetting);
                (state, false)
            }
            AnimationState::JumpPreparing { tween, plan } => match self.advance(tween, elapsed) {
                Some(tween) => (AnimationState::JumpPreparing { tween, plan }, false),
                None => {
                    log::debug!("crouched, taking off towards {}", plan.target);
                    let phase = tween.settle_phase(self.config.settle_epsilon, self.config.landing_epsilon);
                    self.started_at += phase_duration(phase, self.config.tween_speed);
                    (AnimationState::JumpFlight(plan), true)
                }
            },
            AnimationState::JumpFlight(plan) => self.fly(plan, elapsed),
        };
        self.state = state;
        followed
    }

    fn begin(&mut self, command: Command, now: Instant) {
        self.started_at = now;
        self.state = match command {
            Command::RandomPose => {
                let target = random_target(&mut self.rng, &self.pose, &self.config);
                log::info!(
                    "random pose: lower {:.1} upper {:.1} head {:.1}/{:.1}",
                    target.lower_pitch,
                    target.upper_pitch,
                    target.head_yaw,
                    target.head_pitch
                );
                AnimationState::RandomPosing(PoseTween::new(self.pose, target))
            }
            Command::Reset => {
                log::info!("resetting lamp pose");
                AnimationState::Resetting(self.reset_tween())
            }
            Command::Jump => {
                let plan = JumpPlan::plan(&mut self.rng, &self.pose, &self.config);
                log::info!(
                    "jump from {} to {}: distance {:.2}, turn {:.1}, apex {:.2}",
                    plan.start,
                    plan.target,
                    plan.distance,
                    plan.turn,
                    plan.apex_height
                );
                AnimationState::JumpPreparing {
                    tween: PoseTween::new(self.pose, plan.compression),
                    plan,
                }
            }
        };
    }

    fn reset_tween(&self) -> PoseTween {
        PoseTween::new(self.pose, Pose::rest(&self.config, self.pose.position))
    }

    /// Moves a tween along; commits and returns `None` once it has settled.
    fn advance(&mut self, tween: PoseTween, elapsed: f32) -> Option<PoseTween> {
        let t = ease_out_sine(elapsed * self.config.tween_speed);
        if tween.is_settled(t, self.config.settle_epsilon, self.config.landing_epsilon) {
            self.pose = tween.target();
            self.current = self.pose;
            debug_assert!(self.pose.within_ranges(&self.config), "{:?}", self.pose);
            None
        } else {
            self.current = tween.sample(t);
            Some(tween)
        }
    }

    fn fly(&mut self, plan: JumpPlan, elapsed: f32) -> (AnimationState, bool) {
        let t = plan.progress(elapsed);
        let (pose, elevation) = plan.flight_pose(t, &self.config);
        if plan.has_landed(t, pose.position, self.config.landing_epsilon) {
            self.pose = plan.landing_pose();
            self.current = self.pose;
            self.elevation = 0.0;
            log::info!("landed at {}", self.pose.position);

            // Always settle back to the default pose after touching down.
            self.started_at += phase_duration(FRAC_PI_2, plan.angular_speed);
            (AnimationState::Resetting(self.reset_tween()), true)
        } else {
            self.current = pose;
            self.elevation = elevation;
            (AnimationState::JumpFlight(plan), false)
        }
    }

    fn request(&mut self, command: Command) {
        if self.is_animating() {
            log::debug!("ignoring {command:?} while animating");
        } else {
            self.pending = Some(command);
        }
    }
}

/// Time it takes an eased phase to reach `phase` radians at `speed`.
fn phase_duration(phase: f32, speed: f32) -> Duration {
    Duration::try_from_secs_f32(phase / speed).unwrap_or(Duration::ZERO)
}

impl LampControl for LampAnimator {
    fn request_random_pose(&mut self) {
        self.request(Command::RandomPose);
    }

    fn request_reset(&mut self) {
        self.request(Command::Reset);
    }

    fn request_jump(&mut self) {
        self.request(Command::Jump);
    }

    fn is_animating(&self) -> bool {
        self.pending.is_some() || self.state != AnimationState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lamp::rig::{LampDimensions, RigParts};
    use crate::math::Transform;
    use crate::scene::{LightId, ModelId, NodeId};
    use glam::{Vec2, Vec3};
    use rand::SeedableRng;

    fn parts() -> RigParts {
        RigParts {
            base: ModelId(0),
            joint: ModelId(1),
            arm: ModelId(2),
            head: ModelId(3),
            ear: ModelId(4),
            tail: ModelId(5),
            bulb: LightId(0),
        }
    }

    fn animator(seed: u64) -> (SceneGraph, NodeId, LampAnimator) {
        let config = LampConfig::default();
        let mut graph = SceneGraph::new();
        let root = graph.group("scene");
        let pose = Pose::rest(&config, config.home);
        let rig = LampRig::build(
            &mut graph,
            root,
            Vec3::new(0.0, 4.0, 0.0),
            LampDimensions::for_table(13.58, 7.8),
            parts(),
            &pose,
        );
        let animator = LampAnimator::with_rng(config, rig, StdRng::seed_from_u64(seed))
            .expect("default config is valid");
        (graph, root, animator)
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    /// Ticks far enough past every phase for any command to finish.
    fn run_to_idle(animator: &mut LampAnimator, now: &mut Instant) {
        for _ in 0..8 {
            *now += secs(60.0);
            animator.tick(*now);
            if !animator.is_animating() {
                return;
            }
        }
        panic!("animation never finished: {:?}", animator.state());
    }

    #[test]
    fn random_poses_always_commit_within_ranges() {
        let (_, _, mut animator) = animator(11);
        let config = animator.config().clone();
        let mut now = Instant::now();
        for _ in 0..10_000 {
            animator.request_random_pose();
            animator.tick(now);
            now += secs(2.0);
            animator.tick(now);
            assert!(!animator.is_animating());
            assert!(animator.pose().within_ranges(&config), "{:?}", animator.pose());
        }
    }

    #[test]
    fn coupled_upper_floor_holds_for_low_lower_arm() {
        let config = LampConfig::default();
        let mut rng = StdRng::seed_from_u64(5);
        let pose = Pose::rest(&config, Vec2::ZERO);
        let mut coupled = 0;
        for _ in 0..10_000 {
            let target = random_target(&mut rng, &pose, &config);
            if target.lower_pitch <= config.coupling_threshold {
                coupled += 1;
                assert!(target.upper_pitch >= config.coupling_floor);
            }
            assert!(target.within_ranges(&config));
        }
        assert!(coupled > 0);
    }

    #[test]
    fn tween_follows_sine_ease_out() {
        let (_, _, mut animator) = animator(2);
        let start = animator.pose();
        let t0 = Instant::now();
        animator.request_random_pose();
        animator.tick(t0);
        let target = match animator.state() {
            AnimationState::RandomPosing(tween) => tween.target(),
            other => panic!("unexpected state {other:?}"),
        };

        animator.tick(t0 + secs(0.5));
        let expected = start.lower_pitch + (target.lower_pitch - start.lower_pitch) * 0.5_f32.sin();
        approx::assert_abs_diff_eq!(animator.current_pose().lower_pitch, expected, epsilon = 1e-3);
        // Nothing is committed mid-tween.
        assert_eq!(animator.pose(), start);
    }

    /// Crouch length and flight length of the jump that was just accepted.
    fn jump_phases(animator: &LampAnimator) -> (JumpPlan, f32, f32) {
        match animator.state() {
            AnimationState::JumpPreparing { tween, plan } => {
                let config = animator.config();
                let crouch = tween.settle_phase(config.settle_epsilon, config.landing_epsilon) / config.tween_speed;
                (*plan, crouch, FRAC_PI_2 / plan.angular_speed)
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    fn assert_same_frame(a: &LampAnimator, b: &LampAnimator) {
        assert_eq!(a.state().label(), b.state().label());
        let (pa, pb) = (a.current_pose(), b.current_pose());
        for (x, y) in pa.angles().iter().zip(pb.angles()) {
            approx::assert_abs_diff_eq!(*x, y, epsilon = 1e-3);
        }
        assert!(pa.position.abs_diff_eq(pb.position, 1e-4), "{} != {}", pa.position, pb.position);
        approx::assert_abs_diff_eq!(a.elevation(), b.elevation(), epsilon = 1e-4);
    }

    #[test]
    fn pose_depends_on_elapsed_time_not_frame_count() {
        let (_, _, mut fine) = animator(9);
        let (_, _, mut coarse) = animator(9);
        let t0 = Instant::now();
        fine.request_jump();
        coarse.request_jump();
        fine.tick(t0);
        coarse.tick(t0);
        let (_, crouch, flight) = jump_phases(&fine);

        // Inside the crouch, mid-flight, and inside the reset after landing.
        let samples = [0.3, crouch + 0.6 * flight, crouch + flight + 0.3];
        let labels = ["crouching", "jumping", "resetting"];
        let frame = secs(0.016);
        let mut fine_now = t0;
        for (at, label) in samples.into_iter().zip(labels) {
            let sample = t0 + secs(at);
            while fine_now + frame < sample {
                fine_now += frame;
                fine.tick(fine_now);
            }
            fine.tick(sample);
            coarse.tick(sample);
            assert_eq!(coarse.state().label(), label);
            assert_same_frame(&fine, &coarse);
        }
    }

    #[test]
    fn a_late_frame_skips_ahead_within_the_jump() {
        let (_, _, mut animator) = animator(14);
        let t0 = Instant::now();
        animator.request_jump();
        animator.tick(t0);
        let (plan, crouch, flight) = jump_phases(&animator);

        // The frame that ends the crouch lands halfway through the flight.
        animator.tick(t0 + secs(crouch + 0.5 * flight));
        assert!(matches!(animator.state(), AnimationState::JumpFlight(_)));
        let expected = plan.start.lerp(plan.target, plan.progress(0.5 * flight));
        assert!(animator.current_pose().position.abs_diff_eq(expected, 1e-3));

        // One very late frame finishes the flight and the reset after it.
        animator.tick(t0 + secs(crouch + flight + 60.0));
        assert!(!animator.is_animating());
        assert_eq!(animator.pose().position, plan.target);
    }

    #[test]
    fn reset_at_rest_finishes_on_the_same_tick() {
        let (_, _, mut animator) = animator(3);
        let before = animator.current_pose();
        animator.request_reset();
        assert!(animator.is_animating());
        animator.tick(Instant::now());
        assert!(!animator.is_animating());
        assert_eq!(animator.current_pose(), before);
        assert_eq!(animator.pose(), before);
    }

    #[test]
    fn reset_returns_every_joint_to_default() {
        let (_, _, mut animator) = animator(4);
        let mut now = Instant::now();
        animator.request_random_pose();
        animator.tick(now);
        run_to_idle(&mut animator, &mut now);

        animator.request_reset();
        animator.tick(now);
        run_to_idle(&mut animator, &mut now);
        let rest = Pose::rest(animator.config(), animator.pose().position);
        assert_eq!(animator.pose(), rest);
    }

    #[test]
    fn commands_are_ignored_while_animating() {
        let (_, _, mut animator) = animator(6);
        let t0 = Instant::now();
        animator.request_random_pose();
        animator.tick(t0);
        let frame = t0 + secs(0.4);
        animator.tick(frame);

        let state = animator.state().clone();
        let pose = animator.current_pose();
        assert!(animator.is_animating());
        animator.request_jump();
        animator.request_reset();
        animator.tick(frame);

        assert_eq!(animator.state(), &state);
        assert_eq!(animator.current_pose(), pose);
    }

    #[test]
    fn a_second_request_before_the_tick_is_dropped() {
        let (_, _, mut animator) = animator(8);
        animator.request_reset();
        animator.request_jump();
        animator.tick(Instant::now());
        assert_eq!(animator.state(), &AnimationState::Idle);
    }

    #[test]
    fn jump_lands_on_target_then_resets() {
        let (mut graph, root, mut animator) = animator(12);
        let home = animator.pose().position;
        let mut now = Instant::now();

        animator.request_random_pose();
        animator.tick(now);
        run_to_idle(&mut animator, &mut now);

        animator.request_jump();
        animator.update(now, &mut graph);
        let plan = match animator.state() {
            AnimationState::JumpPreparing { plan, .. } => *plan,
            other => panic!("unexpected state {other:?}"),
        };
        assert!(plan.distance >= animator.config().flight.min_travel);
        assert_ne!(plan.target, home);

        let (_, crouch, flight) = jump_phases(&animator);

        // Crouch.
        assert_eq!(animator.state().label(), "crouching");
        animator.update(now + secs(crouch + 0.01), &mut graph);
        assert!(matches!(animator.state(), AnimationState::JumpFlight(_)));
        assert_eq!(animator.pose(), plan.compression);

        // Mid-air.
        animator.update(now + secs(crouch + 0.3), &mut graph);
        assert!(animator.elevation() > 0.0);

        // Touch down.
        now += secs(crouch + flight + 0.01);
        animator.update(now, &mut graph);
        assert!(matches!(animator.state(), AnimationState::Resetting(_)));
        assert_eq!(animator.pose().position, plan.target);
        assert_eq!(animator.elevation(), 0.0);
        assert!(animator.is_animating());

        run_to_idle(&mut animator, &mut now);
        let config = animator.config().clone();
        let pose = animator.pose();
        assert_eq!(pose.position, plan.target);
        assert_eq!(pose, Pose::rest(&config, plan.target));

        // The rig's placement follows the committed position.
        animator.update(now, &mut graph);
        graph.propagate(root, Transform::identity());
        let placed = graph.world(animator.rig().placement()).translation_vec();
        let expected = Vec3::new(plan.target.x, 4.0, plan.target.y);
        assert!(placed.abs_diff_eq(expected, 1e-5), "{placed} != {expected}");
    }
}
