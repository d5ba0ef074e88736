// Differential drive kinematics for a two-wheel Roboteq base
// Converts a body twist (linear x, angular z) into per-wheel motor commands.

use std::f64::consts::PI;

/// Default wheel geometry (meters)
pub const WHEEL_AXLE_LENGTH: f64 = 0.395;
pub const WHEEL_RADIUS: f64 = 0.155;

/// Default max RPM configured on the controller (MXRPM)
pub const MAX_RPM: f64 = 3000.0;

/// `!G` takes a value in per-mille of max RPM (or power in open loop)
pub const COMMAND_LIMIT: i32 = 1000;

/// Fixed robot geometry used to convert velocities into wheel commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveGeometry {
    pub wheel_axle_length: f64,
    pub wheel_radius: f64,
    pub max_rpm: f64,
}

impl Default for DriveGeometry {
    fn default() -> Self {
        Self {
            wheel_axle_length: WHEEL_AXLE_LENGTH,
            wheel_radius: WHEEL_RADIUS,
            max_rpm: MAX_RPM,
        }
    }
}

impl DriveGeometry {
    pub fn wheel_circumference(&self) -> f64 {
        2.0 * PI * self.wheel_radius
    }
}

/// Per-wheel targets, both expressed in the controller's -1000..1000 range.
///
/// These are the physical wheel targets; the wire encoding negates the left
/// wheel because channel 2 is mounted mirrored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveCommand {
    pub right: i32, // channel 1
    pub left: i32,  // channel 2
}

impl DriveCommand {
    pub fn new(right: i32, left: i32) -> Self {
        Self { right, left }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Values as sent on channels [1, 2]
    pub fn channel_values(&self) -> [i32; 2] {
        [self.right, -self.left]
    }
}

/// Scale a wheel surface speed (m/s) to the controller command range
fn wheel_speed_to_command(speed: f64, geometry: &DriveGeometry) -> f64 {
    speed / geometry.wheel_circumference() * 60.0 / geometry.max_rpm * 1000.0
}

fn to_command(value: f64) -> i32 {
    let rounded = value.round();
    if rounded.is_nan() {
        return 0;
    }
    (rounded as i64).clamp(-(COMMAND_LIMIT as i64), COMMAND_LIMIT as i64) as i32
}

/// Convert a twist to wheel commands
///
/// # Arguments
/// * `linear_x` - Forward velocity in m/s
/// * `angular_z` - Yaw rate in rad/s (positive = counter-clockwise)
pub fn twist_to_drive(linear_x: f64, angular_z: f64, geometry: &DriveGeometry) -> DriveCommand {
    let half_axle = geometry.wheel_axle_length / 2.0;
    let v_right = linear_x + angular_z * half_axle;
    let v_left = linear_x - angular_z * half_axle;

    DriveCommand {
        right: to_command(wheel_speed_to_command(v_right, geometry)),
        left: to_command(wheel_speed_to_command(v_left, geometry)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(speed: f64, geometry: &DriveGeometry) -> i32 {
        (speed / geometry.wheel_circumference() * 60.0 / geometry.max_rpm * 1000.0).round() as i32
    }

    #[test]
    fn test_zero_velocity() {
        let cmd = twist_to_drive(0.0, 0.0, &DriveGeometry::default());
        assert_eq!(cmd, DriveCommand::zero());
        assert_eq!(cmd.channel_values(), [0, 0]);
    }

    #[test]
    fn test_forward_motion() {
        let geometry = DriveGeometry::default();
        let cmd = twist_to_drive(1.0, 0.0, &geometry);

        // 1 m/s over a 0.974 m circumference at 3000 max rpm -> ~20.5 per-mille
        assert_eq!(cmd.right, expected(1.0, &geometry));
        assert_eq!(cmd.right, 21);
        assert_eq!(cmd.left, cmd.right);

        // Channel 2 is mounted mirrored
        assert_eq!(cmd.channel_values(), [21, -21]);
    }

    #[test]
    fn test_rotation_only() {
        let geometry = DriveGeometry::default();
        let cmd = twist_to_drive(0.0, 2.0, &geometry);

        let wheel_speed = 2.0 * geometry.wheel_axle_length / 2.0;
        assert_eq!(cmd.right, expected(wheel_speed, &geometry));
        assert_eq!(cmd.left, -cmd.right);
        // Both channels spin the same electrical direction for a pure turn
        let [ch1, ch2] = cmd.channel_values();
        assert_eq!(ch1, ch2);
    }

    #[test]
    fn test_mixed_twist_matches_formula() {
        let geometry = DriveGeometry {
            wheel_axle_length: 0.5,
            wheel_radius: 0.1,
            max_rpm: 1000.0,
        };
        for &(x, z) in &[(0.3, 0.4), (-0.2, 1.0), (0.05, -0.7)] {
            let cmd = twist_to_drive(x, z, &geometry);
            assert_eq!(cmd.right, expected(x + z * 0.25, &geometry));
            assert_eq!(cmd.left, expected(x - z * 0.25, &geometry));
        }
    }

    #[test]
    fn test_command_clamped() {
        let cmd = twist_to_drive(500.0, 0.0, &DriveGeometry::default());
        assert_eq!(cmd.right, COMMAND_LIMIT);
        assert_eq!(cmd.left, COMMAND_LIMIT);

        let cmd = twist_to_drive(-500.0, 0.0, &DriveGeometry::default());
        assert_eq!(cmd.right, -COMMAND_LIMIT);
    }

    #[test]
    fn test_nan_input_is_zero() {
        let cmd = twist_to_drive(f64::NAN, 0.0, &DriveGeometry::default());
        assert_eq!(cmd, DriveCommand::zero());
    }
}
