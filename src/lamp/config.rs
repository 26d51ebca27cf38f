// Tunables for the lamp animator

use glam::Vec2;
use thiserror::Error;

/// Inclusive angle range of one joint, in degrees, with its rest angle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointRange {
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

impl JointRange {
    pub const fn new(min: f32, max: f32, default: f32) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, angle: f32) -> bool {
        (self.min..=self.max).contains(&angle)
    }

    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.min, self.max)
    }

    fn validate(&self, joint: &'static str) -> Result<(), ConfigError> {
        if !(self.min <= self.max) {
            return Err(ConfigError::InvertedRange {
                joint,
                min: self.min,
                max: self.max,
            });
        }
        if !self.contains(self.default) {
            return Err(ConfigError::DefaultOutOfRange {
                joint,
                default: self.default,
            });
        }
        Ok(())
    }
}

/// A fixed object on the table the lamp must not land on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Accessory {
    pub center: Vec2,
    pub radius: f32,
}

/// Table top rectangle in the lamp's (x, z) placement space.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBounds {
    pub min: Vec2,
    pub max: Vec2,
    pub accessories: Vec<Accessory>,
}

/// Constants shaping the jump.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightConfig {
    /// Shortest hop a sampled destination may ask for.
    pub min_travel: f32,
    /// Rejection-sampling budget before jumping in place.
    pub max_sampling_attempts: u32,
    /// Apex height is `apex_base + apex_per_unit * distance`.
    pub apex_base: f32,
    pub apex_per_unit: f32,
    /// Flight angular speed is `speed_constant / apex_height`.
    pub speed_constant: f32,
    /// Crouch offsets from the default pose at maximum distance.
    pub crouch_lower: f32,
    pub crouch_upper: f32,
    /// Inner control points of the yaw swing blend (endpoints 0 and 1).
    pub yaw_anticipation: f32,
    pub yaw_overshoot: f32,
    /// Inner control points of the upper-arm stretch blend (endpoints 0 and 0).
    pub stretch_rise: f32,
    pub stretch_fall: f32,
    /// Upper-arm stretch amplitude in degrees.
    pub stretch: f32,
}

impl Default for FlightConfig {
    fn default() -> Self {
        Self {
            min_travel: 1.5,
            max_sampling_attempts: 64,
            apex_base: 0.8,
            apex_per_unit: 0.35,
            speed_constant: 1.6,
            crouch_lower: 30.0,
            crouch_upper: -10.0,
            yaw_anticipation: -0.15,
            yaw_overshoot: 1.25,
            stretch_rise: 1.0,
            stretch_fall: 0.3,
            stretch: 60.0,
        }
    }
}

/// Everything the animator needs to know, none of it hard-coded.
#[derive(Debug, Clone, PartialEq)]
pub struct LampConfig {
    pub base_yaw: JointRange,
    pub lower_pitch: JointRange,
    pub upper_pitch: JointRange,
    pub head_yaw: JointRange,
    pub head_pitch: JointRange,

    /// Lower-arm angle at or below which the upper arm would hit the table.
    pub coupling_threshold: f32,
    /// Upper-arm sampling floor applied under the threshold.
    pub coupling_floor: f32,

    /// Per-joint completion tolerance in degrees.
    pub settle_epsilon: f32,
    /// Horizontal landing tolerance in table units.
    pub landing_epsilon: f32,
    /// Phase speed of the pose tween; 1.0 settles after pi/2 seconds.
    pub tween_speed: f32,

    /// Where the lamp rests on the table at start.
    pub home: Vec2,
    pub lamp_radius: f32,
    pub table: TableBounds,
    pub flight: FlightConfig,
}

impl Default for LampConfig {
    fn default() -> Self {
        Self {
            base_yaw: JointRange::new(-180.0, 180.0, 0.0),
            lower_pitch: JointRange::new(-70.0, 70.0, 30.0),
            upper_pitch: JointRange::new(-100.0, 0.0, -90.0),
            head_yaw: JointRange::new(-90.0, 90.0, 0.0),
            head_pitch: JointRange::new(-30.0, 80.0, -10.0),
            coupling_threshold: -35.0,
            coupling_floor: -20.0,
            settle_epsilon: 0.1,
            landing_epsilon: 1e-3,
            tween_speed: 1.0,
            home: Vec2::ZERO,
            lamp_radius: 1.4,
            table: TableBounds {
                min: Vec2::new(-6.8, -2.8),
                max: Vec2::new(6.8, 2.8),
                accessories: Vec::new(),
            },
            flight: FlightConfig::default(),
        }
    }
}

impl LampConfig {
    /// Replaces the table placement constants.
    pub fn with_table(mut self, table: TableBounds, home: Vec2, lamp_radius: f32) -> Self {
        self.table = table;
        self.home = home;
        self.lamp_radius = lamp_radius;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.base_yaw.validate("base yaw")?;
        self.lower_pitch.validate("lower pitch")?;
        self.upper_pitch.validate("upper pitch")?;
        self.head_yaw.validate("head yaw")?;
        self.head_pitch.validate("head pitch")?;

        positive("settle_epsilon", self.settle_epsilon)?;
        positive("landing_epsilon", self.landing_epsilon)?;
        positive("tween_speed", self.tween_speed)?;
        positive("lamp_radius", self.lamp_radius)?;
        positive("flight.apex_base", self.flight.apex_base)?;
        positive("flight.speed_constant", self.flight.speed_constant)?;
        if !(self.flight.apex_per_unit >= 0.0) {
            return Err(ConfigError::NotPositive {
                field: "flight.apex_per_unit",
                value: self.flight.apex_per_unit,
            });
        }
        if self.flight.max_sampling_attempts == 0 {
            return Err(ConfigError::NoSamplingAttempts);
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{joint} range is inverted: min {min} > max {max}")]
    InvertedRange { joint: &'static str, min: f32, max: f32 },

    #[error("{joint} default {default} lies outside its range")]
    DefaultOutOfRange { joint: &'static str, default: f32 },

    #[error("{field} must be positive, got {value}")]
    NotPositive { field: &'static str, value: f32 },

    #[error("jump sampling needs at least one attempt")]
    NoSamplingAttempts,
}
