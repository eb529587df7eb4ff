use std::f32::consts::PI;

use glam::DVec3;

/// Camera position and orientation, owned by the main thread. The render
/// side derives view matrices from it; this core only writes it through
/// teleport commands.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: DVec3,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 64.0, 0.0),
            yaw: 0.0,
            pitch: PI,
        }
    }
}

impl Camera {
    /// Applies an absolute server teleport. The wire carries degrees with
    /// the server's handedness; the camera keeps radians with the client's.
    pub fn apply_teleport(&mut self, position: DVec3, yaw_deg: f32, pitch_deg: f32) {
        self.position = position;
        self.yaw = -yaw_deg.to_radians();
        self.pitch = -pitch_deg.to_radians() + PI;
    }
}
