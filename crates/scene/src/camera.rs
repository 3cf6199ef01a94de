use framestep_common::Cached;
use framestep_input::{Action, InputSnapshot};
use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_4, PI, TAU};

/// Tunable camera parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: Vec3,
    /// World units per second.
    pub speed: f32,
    /// Radians per unit of mouse motion.
    pub sensitivity: f32,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, -5.0),
            speed: 5.0,
            sensitivity: 0.001,
            fov_y: 0.25 * PI,
            near: 0.1,
            far: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ViewState {
    position: Vec3,
    pitch: f32,
    yaw: f32,
}

/// Left-handed look-direction camera driven by pitch and yaw.
///
/// The view matrix is cached against (position, pitch, yaw) and rebuilt only
/// when one of them changed. The projection is rebuilt only on
/// [`Camera::update_projection`].
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    pitch: f32,
    yaw: f32,
    forward: Vec3,
    config: CameraConfig,
    view: Cached<ViewState, (Mat4, Vec3)>,
    projection: Mat4,
    viewport: (u32, u32),
    projection_updates: u64,
}

/// Rotate +Z by roll-pitch-yaw with zero roll.
fn look_direction(pitch: f32, yaw: f32) -> Vec3 {
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, 0.0) * Vec3::Z
}

fn derive_view(state: &ViewState) -> (Mat4, Vec3) {
    let forward = look_direction(state.pitch, state.yaw);
    (Mat4::look_to_lh(state.position, forward, Vec3::Y), forward)
}

impl Camera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            position: config.position,
            pitch: 0.0,
            yaw: 0.0,
            forward: Vec3::Z,
            config,
            view: Cached::new((Mat4::IDENTITY, Vec3::Z)),
            projection: Mat4::IDENTITY,
            viewport: (1, 1),
            projection_updates: 0,
        };
        camera.recompute_view();
        camera
    }

    /// Apply held-key translation, then rebuild the view if anything moved.
    /// Returns whether the view matrix was rebuilt.
    ///
    /// Translation uses the direction implied by the current pitch and yaw,
    /// so a mouse-look earlier in the same frame already steers movement.
    pub fn update(&mut self, input: &InputSnapshot, dt: f32) -> bool {
        let forward = look_direction(self.pitch, self.yaw);
        let right = Vec3::Y.cross(forward).normalize_or_zero();
        let step = self.config.speed * dt;

        let mut delta = Vec3::ZERO;
        for action in input.held().filter(|a| a.is_movement()) {
            delta += match action {
                Action::MoveForward => forward,
                Action::MoveBackward => -forward,
                Action::StrafeLeft => -right,
                Action::StrafeRight => right,
                Action::Ascend => Vec3::Y,
                Action::Descend => -Vec3::Y,
                Action::Quit => continue,
            };
        }
        self.position += delta * step;

        self.recompute_view()
    }

    /// Accumulate mouse motion into yaw and pitch.
    ///
    /// Yaw wraps by a single turn per call once it leaves (-2π, 2π). Pitch is
    /// clamped to ±π/4.
    pub fn mouse_look(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.config.sensitivity;
        self.pitch += dy * self.config.sensitivity;

        if self.yaw > TAU {
            self.yaw -= TAU;
        }
        if self.yaw < -TAU {
            self.yaw += TAU;
        }
        self.pitch = self.pitch.clamp(-FRAC_PI_4, FRAC_PI_4);
    }

    /// Rebuild the projection for a new viewport. Zero dimensions are
    /// treated as 1.
    pub fn update_projection(&mut self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        self.viewport = (width, height);
        self.projection = Mat4::perspective_lh(
            self.config.fov_y,
            width as f32 / height as f32,
            self.config.near,
            self.config.far,
        );
        self.projection_updates += 1;
        tracing::debug!(width, height, "camera projection updated");
    }

    /// Rebuild the view matrix if position, pitch or yaw changed.
    pub fn recompute_view(&mut self) -> bool {
        let ran = self.view.get_or_recompute(self.state(), derive_view);
        if ran {
            self.forward = self.view.value().1;
            tracing::trace!(position = ?self.position, "view recomputed");
        }
        ran
    }

    /// Rebuild the view matrix unconditionally.
    pub fn force_view_recompute(&mut self) {
        self.view.force(self.state(), derive_view);
        self.forward = self.view.value().1;
    }

    fn state(&self) -> ViewState {
        ViewState {
            position: self.position,
            pitch: self.pitch,
            yaw: self.yaw,
        }
    }

    pub fn view(&self) -> Mat4 {
        self.view.value().0
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Look direction as of the last view rebuild.
    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn view_recompute_count(&self) -> u64 {
        self.view.recompute_count()
    }

    pub fn projection_update_count(&self) -> u64 {
        self.projection_updates
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn defaults_match_sample() {
        let cam = Camera::default();
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, -5.0));
        assert_eq!(cam.forward(), Vec3::Z);
        assert_eq!(cam.config().speed, 5.0);
        assert_eq!(cam.view_recompute_count(), 1);
    }

    #[test]
    fn default_view_looks_down_z() {
        let cam = Camera::default();
        let origin_in_view = cam.view().transform_point3(Vec3::ZERO);
        assert!(origin_in_view.abs_diff_eq(Vec3::new(0.0, 0.0, 5.0), 1e-6));
    }

    #[test]
    fn idle_update_skips_view_rebuild() {
        let mut cam = Camera::default();
        let idle = InputSnapshot::default();
        let before = cam.view();
        assert!(!cam.update(&idle, 0.016));
        assert!(!cam.update(&idle, 0.016));
        assert_eq!(cam.view_recompute_count(), 1);
        assert_eq!(cam.view(), before);
    }

    #[test]
    fn gated_and_forced_views_are_bit_identical() {
        let mut gated = Camera::default();
        gated.mouse_look(321.0, -123.0);
        gated.update(&InputSnapshot::default().with_held(Action::MoveForward), 0.37);

        let mut forced = gated.clone();
        forced.force_view_recompute();
        let a = gated.view().to_cols_array();
        let b = forced.view().to_cols_array();
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn movement_follows_keys() {
        let cases = [
            (Action::MoveForward, Vec3::new(0.0, 0.0, 0.0)),
            (Action::MoveBackward, Vec3::new(0.0, 0.0, -10.0)),
            (Action::StrafeLeft, Vec3::new(-5.0, 0.0, -5.0)),
            (Action::StrafeRight, Vec3::new(5.0, 0.0, -5.0)),
            (Action::Ascend, Vec3::new(0.0, 5.0, -5.0)),
            (Action::Descend, Vec3::new(0.0, -5.0, -5.0)),
        ];
        for (action, expected) in cases {
            let mut cam = Camera::default();
            assert!(cam.update(&InputSnapshot::default().with_held(action), 1.0));
            assert!(
                cam.position().abs_diff_eq(expected, 1e-5),
                "{action:?}: {:?}",
                cam.position()
            );
        }
    }

    #[test]
    fn quit_does_not_move() {
        let mut cam = Camera::default();
        assert!(!cam.update(&InputSnapshot::default().with_held(Action::Quit), 1.0));
    }

    #[test]
    fn movement_uses_post_look_direction() {
        let mut cam = Camera::default();
        cam.mouse_look(FRAC_PI_2 / 0.001, 0.0);
        cam.update(&InputSnapshot::default().with_held(Action::MoveForward), 1.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(5.0, 0.0, -5.0), 1e-3));
        assert!(cam.forward().abs_diff_eq(Vec3::X, 1e-3));
    }

    #[test]
    fn positive_pitch_looks_down() {
        let mut cam = Camera::default();
        cam.mouse_look(0.0, 500.0);
        cam.recompute_view();
        assert!(cam.forward().y < 0.0);
    }

    #[test]
    fn yaw_wraps_once_past_two_pi() {
        let mut cam = Camera::default();
        cam.mouse_look(6283.0, 0.0);
        let before = cam.yaw();
        assert!(before < TAU);

        cam.mouse_look(1.0, 0.0);
        let mut expected = before;
        expected += 0.001;
        expected -= TAU;
        assert_eq!(cam.yaw(), expected);
        assert!(cam.yaw() > -TAU && cam.yaw() < TAU);
    }

    #[test]
    fn yaw_wraps_negative() {
        let mut cam = Camera::default();
        cam.mouse_look(-6283.0, 0.0);
        let before = cam.yaw();
        assert!(before > -TAU);

        cam.mouse_look(-1.0, 0.0);
        let mut expected = before;
        expected -= 0.001;
        expected += TAU;
        assert_eq!(cam.yaw(), expected);
        assert!(cam.yaw() > -TAU && cam.yaw() < TAU);
    }

    #[test]
    fn pitch_clamps_at_quarter_pi() {
        let mut cam = Camera::default();
        for _ in 0..10 {
            cam.mouse_look(0.0, 1000.0);
            assert!(cam.pitch() <= FRAC_PI_4);
        }
        assert_eq!(cam.pitch(), FRAC_PI_4);

        for _ in 0..10 {
            cam.mouse_look(0.0, -1000.0);
        }
        assert_eq!(cam.pitch(), -FRAC_PI_4);
    }

    #[test]
    fn projection_is_aspect_sensitive() {
        let mut cam = Camera::default();
        cam.update_projection(1280, 720);
        let wide = cam.projection();
        cam.update_projection(720, 1280);
        assert_ne!(wide, cam.projection());
        assert_eq!(cam.projection_update_count(), 2);
    }

    #[test]
    fn square_viewport_is_symmetric() {
        let mut cam = Camera::default();
        cam.update_projection(500, 500);
        let p = cam.projection();
        assert_eq!(p.x_axis.x, p.y_axis.y);
    }

    #[test]
    fn zero_viewport_is_clamped() {
        let mut cam = Camera::default();
        cam.update_projection(0, 0);
        assert_eq!(cam.viewport(), (1, 1));
        assert!(cam.projection().is_finite());

        cam.update_projection(800, 0);
        assert_eq!(cam.viewport(), (800, 1));
        assert!(cam.projection().is_finite());
    }

    #[test]
    fn projection_maps_near_and_far_to_unit_depth() {
        let mut cam = Camera::default();
        cam.update_projection(1280, 720);
        let near = cam.projection().project_point3(Vec3::new(0.0, 0.0, 0.1));
        let far = cam.projection().project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!((near.z - 0.0).abs() < 1e-5);
        assert!((far.z - 1.0).abs() < 1e-5);
    }
}
