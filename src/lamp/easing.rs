// Easing and heading helpers shared by the tweens and the jump

use std::f32::consts::FRAC_PI_2;

/// Sine ease-out over a phase in radians.
///
/// The phase saturates at pi/2, so `t` reaches exactly 1 and stays there no
/// matter how late the frame that crosses the peak arrives.
pub fn ease_out_sine(phase: f32) -> f32 {
    if phase >= FRAC_PI_2 {
        1.0
    } else {
        phase.max(0.0).sin()
    }
}

/// Cubic Bezier blend with endpoints `start`, `end` and inner control points
/// `c1`, `c2`.
pub fn cubic_blend(start: f32, c1: f32, c2: f32, end: f32, t: f32) -> f32 {
    let u = 1.0 - t;
    u * u * u * start + 3.0 * c1 * t * u * u + 3.0 * c2 * t * t * u + t * t * t * end
}

/// Rise-and-fall arc that starts and ends at zero and peaks at `height`.
pub fn arc(height: f32, t: f32) -> f32 {
    cubic_blend(0.0, height, height, 0.0, t)
}

/// Wraps an angle in degrees into [-180, 180).
pub fn shortest_turn(degrees: f32) -> f32 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Yaw in degrees that faces along (dx, dz).
///
/// Yaw 0 faces +X and positive yaw turns toward -Z. The acute reference angle
/// comes from `asin(|dz| / distance)` and the sign pattern picks the quadrant.
pub fn heading_towards(dx: f32, dz: f32) -> f32 {
    let distance = (dx * dx + dz * dz).sqrt();
    if distance <= f32::EPSILON {
        return 0.0;
    }
    let reference = (dz.abs() / distance).min(1.0).asin().to_degrees();
    match (dx >= 0.0, dz <= 0.0) {
        (true, true) => reference,
        (false, true) => 180.0 - reference,
        (false, false) => reference - 180.0,
        (true, false) => -reference,
    }
}
