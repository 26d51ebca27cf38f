// Procedurally animated desk lamp

pub mod animator;
pub mod config;
pub mod easing;
pub mod jump;
pub mod pose;
pub mod rig;

pub use animator::{LampAnimator, LampControl};
pub use config::{Accessory, ConfigError, LampConfig, TableBounds};
pub use rig::{LampDimensions, LampRig, RigParts};
