// Lamp pose vector and the shared pose tween

use super::config::LampConfig;
use glam::Vec2;

/// Joint angles in degrees plus where the base sits on the table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub base_yaw: f32,
    pub lower_pitch: f32,
    pub upper_pitch: f32,
    pub head_yaw: f32,
    pub head_pitch: f32,
    pub position: Vec2,
}

impl Pose {
    /// Every joint at its default angle, standing on `position`.
    pub fn rest(config: &LampConfig, position: Vec2) -> Self {
        Self {
            base_yaw: config.base_yaw.default,
            lower_pitch: config.lower_pitch.default,
            upper_pitch: config.upper_pitch.default,
            head_yaw: config.head_yaw.default,
            head_pitch: config.head_pitch.default,
            position,
        }
    }

    pub fn angles(&self) -> [f32; 5] {
        [
            self.base_yaw,
            self.lower_pitch,
            self.upper_pitch,
            self.head_yaw,
            self.head_pitch,
        ]
    }

    fn with_angles(self, angles: [f32; 5]) -> Self {
        let [base_yaw, lower_pitch, upper_pitch, head_yaw, head_pitch] = angles;
        Self {
            base_yaw,
            lower_pitch,
            upper_pitch,
            head_yaw,
            head_pitch,
            ..self
        }
    }

    /// True when every angle lies inside its declared range.
    pub fn within_ranges(&self, config: &LampConfig) -> bool {
        config.base_yaw.contains(self.base_yaw)
            && config.lower_pitch.contains(self.lower_pitch)
            && config.upper_pitch.contains(self.upper_pitch)
            && config.head_yaw.contains(self.head_yaw)
            && config.head_pitch.contains(self.head_pitch)
    }
}

/// Interpolation from one pose to another, driven by an eased parameter.
///
/// Every angle moves by plain `target - start`, so a pose whose angles are in
/// range stays in range all the way through. Committing yields the target
/// exactly, not the last interpolated value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTween {
    from: Pose,
    to: Pose,
    angle_delta: [f32; 5],
    position_delta: Vec2,
}

impl PoseTween {
    pub fn new(from: Pose, to: Pose) -> Self {
        let a = from.angles();
        let b = to.angles();
        Self {
            from,
            to,
            angle_delta: std::array::from_fn(|i| b[i] - a[i]),
            position_delta: to.position - from.position,
        }
    }

    pub fn target(&self) -> Pose {
        self.to
    }

    pub fn sample(&self, t: f32) -> Pose {
        let start = self.from.angles();
        let angles = std::array::from_fn(|i| start[i] + self.angle_delta[i] * t);
        Pose {
            position: self.from.position + self.position_delta * t,
            ..self.from.with_angles(angles)
        }
    }

    /// Whether what is left of the tween at `t` is below tolerance everywhere.
    pub fn is_settled(&self, t: f32, angle_epsilon: f32, position_epsilon: f32) -> bool {
        let remaining = 1.0 - t;
        self.angle_delta
            .iter()
            .all(|delta| (delta * remaining).abs() < angle_epsilon)
            && (self.position_delta * remaining).abs().max_element() < position_epsilon
    }

    /// Eased phase in radians at which the tween first counts as settled.
    pub fn settle_phase(&self, angle_epsilon: f32, position_epsilon: f32) -> f32 {
        let angle = self.angle_delta.iter().fold(0.0_f32, |m, d| m.max(d.abs()));
        let position = self.position_delta.abs().max_element();
        let t = (1.0 - angle_epsilon / angle).max(1.0 - position_epsilon / position);
        t.clamp(0.0, 1.0).asin()
    }
}
