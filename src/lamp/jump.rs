// Jump planning and flight curves

use super::config::LampConfig;
use super::easing::{arc, cubic_blend, ease_out_sine, heading_towards, shortest_turn};
use super::pose::Pose;
use glam::Vec2;
use rand::Rng;

/// Table rectangle the base centre may land in, or `None` if the margins
/// leave no room.
fn landing_area(config: &LampConfig) -> Option<(Vec2, Vec2)> {
    let margin = Vec2::splat(config.lamp_radius);
    let min = config.table.min + margin;
    let max = config.table.max - margin;
    (min.x <= max.x && min.y <= max.y).then_some((min, max))
}

/// Longest hop the landing area allows.
pub fn max_distance(config: &LampConfig) -> f32 {
    landing_area(config).map_or(0.0, |(min, max)| min.distance(max))
}

fn is_clear(candidate: Vec2, current: Vec2, config: &LampConfig) -> bool {
    candidate.distance(current) >= config.flight.min_travel
        && config
            .table
            .accessories
            .iter()
            .all(|a| candidate.distance(a.center) >= a.radius + config.lamp_radius)
}

/// Rejection-samples a landing spot, giving up after the configured number
/// of attempts.
pub fn sample_destination<R: Rng + ?Sized>(
    rng: &mut R,
    current: Vec2,
    config: &LampConfig,
) -> Option<Vec2> {
    let (min, max) = landing_area(config)?;
    (0..config.flight.max_sampling_attempts)
        .map(|_| Vec2::new(rng.gen_range(min.x..=max.x), rng.gen_range(min.y..=max.y)))
        .find(|&candidate| is_clear(candidate, current, config))
}

/// Everything about a jump that is fixed once it has been accepted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpPlan {
    pub start: Vec2,
    pub target: Vec2,
    pub distance: f32,
    /// Signed yaw change in degrees, always the shorter way round.
    pub turn: f32,
    pub apex_height: f32,
    /// Flight phase speed in radians per second.
    pub angular_speed: f32,
    /// Crouched pose reached before take-off.
    pub compression: Pose,
}

impl JumpPlan {
    /// Picks a destination and plans the jump; hops in place when no
    /// destination can be found.
    pub fn plan<R: Rng + ?Sized>(rng: &mut R, pose: &Pose, config: &LampConfig) -> Self {
        let target = sample_destination(rng, pose.position, config).unwrap_or_else(|| {
            log::warn!(
                "no landing spot after {} attempts, jumping in place",
                config.flight.max_sampling_attempts
            );
            pose.position
        });
        Self::towards(pose, target, config)
    }

    pub fn towards(pose: &Pose, target: Vec2, config: &LampConfig) -> Self {
        let flight = &config.flight;
        let delta = target - pose.position;
        let distance = delta.length();

        let turn = if distance > f32::EPSILON {
            shortest_turn(heading_towards(delta.x, delta.y) - pose.base_yaw)
        } else {
            0.0
        };

        let apex_height = flight.apex_base + flight.apex_per_unit * distance;
        let angular_speed = flight.speed_constant / apex_height;

        let reach = max_distance(config);
        let crouch = if reach > 0.0 {
            (distance / reach).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let compression = Pose {
            lower_pitch: config
                .lower_pitch
                .clamp(config.lower_pitch.default + flight.crouch_lower * crouch),
            upper_pitch: config
                .upper_pitch
                .clamp(config.upper_pitch.default + flight.crouch_upper * crouch),
            head_yaw: config.head_yaw.default,
            head_pitch: config.head_pitch.default,
            ..*pose
        };

        Self {
            start: pose.position,
            target,
            distance,
            turn,
            apex_height,
            angular_speed,
            compression,
        }
    }

    /// Eased flight parameter after `elapsed` seconds in the air.
    pub fn progress(&self, elapsed: f32) -> f32 {
        ease_out_sine(elapsed * self.angular_speed)
    }

    /// Pose and height above the table at flight parameter `t`.
    pub fn flight_pose(&self, t: f32, config: &LampConfig) -> (Pose, f32) {
        let flight = &config.flight;
        let crouched = self.compression;
        let swing = cubic_blend(0.0, flight.yaw_anticipation, flight.yaw_overshoot, 1.0, t);
        let stretch = cubic_blend(0.0, flight.stretch_rise, flight.stretch_fall, 0.0, t);

        let pose = Pose {
            base_yaw: crouched.base_yaw + self.turn * swing,
            upper_pitch: config
                .upper_pitch
                .clamp(crouched.upper_pitch + flight.stretch * stretch),
            position: self.start.lerp(self.target, t),
            ..crouched
        };
        (pose, arc(self.apex_height, t))
    }

    pub fn has_landed(&self, t: f32, position: Vec2, epsilon: f32) -> bool {
        t >= 1.0 && (self.target - position).abs().max_element() < epsilon
    }

    /// The pose committed on touchdown.
    pub fn landing_pose(&self) -> Pose {
        Pose {
            base_yaw: shortest_turn(self.compression.base_yaw + self.turn),
            position: self.target,
            ..self.compression
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lamp::config::{Accessory, TableBounds};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rest(config: &LampConfig) -> Pose {
        Pose::rest(config, config.home)
    }

    #[test]
    fn sampled_destinations_respect_margins() {
        let mut config = LampConfig::default();
        config.table.accessories.push(Accessory {
            center: Vec2::new(3.0, 0.0),
            radius: 0.8,
        });
        let mut rng = StdRng::seed_from_u64(7);
        let current = Vec2::ZERO;
        for _ in 0..2000 {
            let target = sample_destination(&mut rng, current, &config).expect("room to land");
            assert!(target.x >= config.table.min.x + config.lamp_radius);
            assert!(target.x <= config.table.max.x - config.lamp_radius);
            assert!(target.y >= config.table.min.y + config.lamp_radius);
            assert!(target.y <= config.table.max.y - config.lamp_radius);
            assert!(target.distance(current) >= config.flight.min_travel);
            assert!(target.distance(Vec2::new(3.0, 0.0)) >= 0.8 + config.lamp_radius);
        }
    }

    #[test]
    fn degenerate_table_falls_back_to_jumping_in_place() {
        let config = LampConfig::default().with_table(
            TableBounds {
                min: Vec2::new(-1.0, -1.0),
                max: Vec2::new(1.0, 1.0),
                accessories: Vec::new(),
            },
            Vec2::ZERO,
            1.4,
        );
        let mut rng = StdRng::seed_from_u64(1);
        let pose = rest(&config);
        assert_eq!(sample_destination(&mut rng, pose.position, &config), None);

        let plan = JumpPlan::plan(&mut rng, &pose, &config);
        assert_eq!(plan.target, pose.position);
        assert_eq!(plan.distance, 0.0);
        assert_eq!(plan.turn, 0.0);
        assert!(plan.apex_height > 0.0 && plan.angular_speed.is_finite());
    }

    #[test]
    fn unreachable_min_travel_exhausts_attempts_then_falls_back() {
        let mut config = LampConfig::default();
        config.flight.min_travel = 1000.0;
        config.flight.max_sampling_attempts = 16;
        let mut rng = StdRng::seed_from_u64(3);
        let pose = rest(&config);
        let plan = JumpPlan::plan(&mut rng, &pose, &config);
        assert_eq!(plan.target, pose.position);
    }

    #[test]
    fn longer_jumps_go_higher_and_slower() {
        let config = LampConfig::default();
        let pose = rest(&config);
        let mut last_height = 0.0;
        let mut last_speed = f32::INFINITY;
        for step in 1..=8 {
            let plan = JumpPlan::towards(&pose, Vec2::new(step as f32 * 0.6, 0.0), &config);
            assert!(plan.apex_height > last_height);
            assert!(plan.angular_speed < last_speed);
            last_height = plan.apex_height;
            last_speed = plan.angular_speed;
        }
    }

    #[test]
    fn turn_is_shortest_and_faces_the_target() {
        let config = LampConfig::default();
        for &yaw in &[-170.0_f32, -90.0, 0.0, 45.0, 135.0, 179.0] {
            for &(dx, dz) in &[(2.0_f32, -1.5_f32), (-2.0, -1.5), (-2.0, 1.5), (2.0, 1.5)] {
                let pose = Pose {
                    base_yaw: yaw,
                    ..rest(&config)
                };
                let plan = JumpPlan::towards(&pose, Vec2::new(dx, dz), &config);
                assert!((-180.0..=180.0).contains(&plan.turn));

                let heading = shortest_turn(yaw + plan.turn).to_radians();
                let direction = Vec2::new(dx, dz).normalize();
                assert_abs_diff_eq!(heading.cos(), direction.x, epsilon = 1e-4);
                assert_abs_diff_eq!(-heading.sin(), direction.y, epsilon = 1e-4);
            }
        }
    }

    #[test]
    fn compression_scales_with_distance_and_stays_in_range() {
        let config = LampConfig::default();
        let pose = rest(&config);
        let short = JumpPlan::towards(&pose, Vec2::new(1.5, 0.0), &config);
        let long = JumpPlan::towards(&pose, Vec2::new(5.0, 1.0), &config);
        assert!(long.compression.lower_pitch > short.compression.lower_pitch);
        assert!(long.compression.upper_pitch < short.compression.upper_pitch);
        assert!(short.compression.within_ranges(&config));
        assert!(long.compression.within_ranges(&config));
        assert_eq!(long.compression.head_yaw, config.head_yaw.default);
    }

    #[test]
    fn flight_rises_and_lands_on_target() {
        let config = LampConfig::default();
        let pose = rest(&config);
        let plan = JumpPlan::towards(&pose, Vec2::new(4.0, -1.0), &config);

        let (start, lift) = plan.flight_pose(0.0, &config);
        assert_eq!(lift, 0.0);
        assert_eq!(start.position, plan.start);

        let (_, apex) = plan.flight_pose(0.5, &config);
        assert_abs_diff_eq!(apex, 0.75 * plan.apex_height, epsilon = 1e-5);

        let t = plan.progress(10.0);
        let (end, landing_lift) = plan.flight_pose(t, &config);
        assert_eq!(t, 1.0);
        assert_abs_diff_eq!(landing_lift, 0.0, epsilon = 1e-5);
        assert!(plan.has_landed(t, end.position, config.landing_epsilon));
        assert!(!plan.has_landed(plan.progress(0.1), end.position, config.landing_epsilon));
        assert_eq!(plan.landing_pose().position, plan.target);
    }
}
