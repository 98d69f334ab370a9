use glam::{Mat4, Quat, Vec2, Vec3};
use scenehost_input::MouseButton;
use std::time::Duration;

const ROTATE_SPEED: f32 = 2.0;
const ZOOM_FRACTION: f32 = 2.5;
const TRANSLATE_SPEED: f32 = 0.5;
/// Squared length below which `up` counts as parallel to the view direction.
const POLE_EPSILON: f32 = 1e-8;

/// Derived matrices tracked by a dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matrix {
    View,
    Projection,
}

/// Orbit camera looking at a target point.
///
/// The view and projection matrices are cheap to compute and always built on
/// demand; the dirty flags only tell the caller whether a re-upload is due.
/// Fresh cameras have a dirty projection and a clean view.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    position: Vec3,
    target: Vec3,
    up: Vec3,

    horizontal: Vec3,
    vertical: Vec3,
    /// World-space size of the image plane at the target distance.
    display: Vec2,

    viewport: Vec2,
    /// Vertical field of view, degrees.
    fov: f32,
    near: f32,
    far: f32,

    view_dirty: bool,
    projection_dirty: bool,
}

impl OrbitCamera {
    pub fn new(position: Vec3, width: u32, height: u32) -> Self {
        let mut camera = Self {
            position,
            target: Vec3::ZERO,
            up: Vec3::Y,
            horizontal: Vec3::X,
            vertical: Vec3::Y,
            display: Vec2::ZERO,
            viewport: Vec2::new(width as f32, height as f32),
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            view_dirty: false,
            projection_dirty: true,
        };
        camera.update_basis();
        camera.view_dirty = false;
        camera
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.update_basis();
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.update_basis();
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Unit vector pointing right on the image plane.
    pub fn horizontal(&self) -> Vec3 {
        self.horizontal
    }

    /// Unit vector pointing up on the image plane.
    pub fn vertical(&self) -> Vec3 {
        self.vertical
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = degrees;
        self.projection_dirty = true;
        self.update_display();
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near;
        self.projection_dirty = true;
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_far(&mut self, far: f32) {
        self.far = far;
        self.projection_dirty = true;
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    /// Track the framebuffer size. A zero-sized viewport (minimized window)
    /// is remembered but keeps the previous aspect ratio out of the math.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
        self.projection_dirty = true;
        self.update_display();
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return 1.0;
        }
        self.viewport.x / self.viewport.y
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.vertical)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov.to_radians(),
            self.aspect_ratio(),
            self.near,
            self.far,
        )
    }

    pub fn is_dirty(&self, matrix: Matrix) -> bool {
        match matrix {
            Matrix::View => self.view_dirty,
            Matrix::Projection => self.projection_dirty,
        }
    }

    pub fn set_dirty(&mut self, matrix: Matrix, dirty: bool) {
        match matrix {
            Matrix::View => self.view_dirty = dirty,
            Matrix::Projection => self.projection_dirty = dirty,
        }
    }

    /// Orbit around the target. Deltas are fractions of the viewport.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let horizontal_angle = ROTATE_SPEED * dy;
        let vertical_angle = -ROTATE_SPEED * dx;

        let rotation = Quat::from_axis_angle(self.horizontal, horizontal_angle)
            * Quat::from_axis_angle(self.vertical, vertical_angle);

        self.position = self.target + rotation * (self.position - self.target);
        self.update_basis();
    }

    /// Exponential zoom toward the target; never reaches or crosses it.
    pub fn zoom(&mut self, dz: f32) {
        let factor = 2.0_f32.powf(-dz * ZOOM_FRACTION);
        self.position = self.target + (self.position - self.target) * factor;
        self.update_basis();
    }

    /// Move position and target together. Parallel pans follow the image
    /// plane at a speed proportional to the visible area; otherwise `dy`
    /// dollies along the view direction.
    pub fn pan(&mut self, dx: f32, dy: f32, parallel_to_view_plane: bool) {
        let offset = if parallel_to_view_plane {
            self.horizontal * (self.display.x * dx) + self.vertical * (self.display.y * dy)
        } else {
            (self.target - self.position) * dy
        };

        self.position += offset * TRANSLATE_SPEED;
        self.target += offset * TRANSLATE_SPEED;
        self.view_dirty = true;
    }

    /// Apply a mouse drag that started at `pressed_at`: left orbits, middle
    /// zooms, right pans. Deltas are normalized by the viewport and scaled by
    /// the frame time so the motion does not depend on frame rate.
    pub fn handle_mouse_drag(
        &mut self,
        button: MouseButton,
        cursor: Vec2,
        pressed_at: Vec2,
        dt: Duration,
    ) {
        if self.viewport.x <= 0.0 || self.viewport.y <= 0.0 {
            return;
        }
        let seconds = dt.as_secs_f32();
        let dx = (cursor.x - pressed_at.x) / self.viewport.x * seconds;
        let dy = (pressed_at.y - cursor.y) / self.viewport.y * seconds;

        match button {
            MouseButton::Left => self.rotate(dx, dy),
            MouseButton::Middle => self.zoom(dy),
            MouseButton::Right => self.pan(-dx, -dy, true),
            _ => {}
        }
    }

    fn update_basis(&mut self) {
        self.view_dirty = true;

        let Some(view_dir) = (self.target - self.position).try_normalize() else {
            tracing::warn!("camera position coincides with its target, keeping basis");
            return;
        };

        // Gram-Schmidt: up with its view-direction component removed.
        let projected_up = self.up - view_dir * self.up.dot(view_dir);
        self.vertical = if projected_up.length_squared() > POLE_EPSILON {
            projected_up.normalize()
        } else {
            // Looking along `up`: keep the previous right vector instead.
            let right = (self.horizontal - view_dir * self.horizontal.dot(view_dir))
                .try_normalize()
                .unwrap_or_else(|| view_dir.any_orthonormal_vector());
            right.cross(view_dir).normalize()
        };
        self.horizontal = view_dir.cross(self.vertical).normalize();
        self.update_display();
    }

    fn update_display(&mut self) {
        let distance = (self.target - self.position).length();
        self.display.y = 2.0 * distance * (0.5 * self.fov.to_radians()).tan();
        self.display.x = self.display.y * self.aspect_ratio();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(Vec3::new(0.0, 0.0, 10.0), 800, 600)
    }

    fn assert_orthonormal(camera: &OrbitCamera) {
        let h = camera.horizontal();
        let v = camera.vertical();
        assert!((h.length() - 1.0).abs() < EPS);
        assert!((v.length() - 1.0).abs() < EPS);
        assert!(h.dot(v).abs() < EPS);
        let view_dir = (camera.target() - camera.position()).normalize();
        assert!(h.dot(view_dir).abs() < EPS);
        assert!(v.dot(view_dir).abs() < EPS);
    }

    #[test]
    fn initial_flags_and_basis() {
        let cam = camera();
        assert!(cam.is_dirty(Matrix::Projection));
        assert!(!cam.is_dirty(Matrix::View));
        assert!(cam.horizontal().abs_diff_eq(Vec3::X, EPS));
        assert!(cam.vertical().abs_diff_eq(Vec3::Y, EPS));
        assert_eq!(cam.fov(), 45.0);
        assert_eq!(cam.near(), 0.1);
        assert_eq!(cam.far(), 100.0);
    }

    #[test]
    fn rotate_zero_is_identity() {
        let mut cam = camera();
        let (h, v) = (cam.horizontal(), cam.vertical());
        cam.rotate(0.0, 0.0);
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 10.0));
        assert_eq!(cam.target(), Vec3::ZERO);
        assert!(cam.horizontal().abs_diff_eq(h, EPS));
        assert!(cam.vertical().abs_diff_eq(v, EPS));
        assert!(cam.is_dirty(Matrix::View));
    }

    #[test]
    fn zoom_zero_keeps_position() {
        let mut cam = camera();
        cam.zoom(0.0);
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn zoom_is_multiplicative_and_never_crosses_target() {
        let mut cam = camera();
        cam.zoom(0.4);
        let expected = 10.0 * 2.0_f32.powf(-1.0);
        assert!((cam.position().z - expected).abs() < EPS);

        for _ in 0..50 {
            cam.zoom(1.0);
        }
        assert!(cam.position().z > 0.0);
    }

    #[test]
    fn rotate_preserves_distance_and_orthonormality() {
        let mut cam = camera();
        cam.rotate(0.1, 0.05);
        cam.rotate(-0.3, 0.2);
        assert!((cam.position().length() - 10.0).abs() < 1e-3);
        assert_orthonormal(&cam);
    }

    #[test]
    fn horizontal_drag_orbits_about_vertical_axis() {
        let mut cam = camera();
        // A quarter turn: angle = -2 * dx.
        cam.rotate(-std::f32::consts::FRAC_PI_4, 0.0);
        assert!(cam.position().abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-3));
    }

    #[test]
    fn orbit_through_the_pole_keeps_basis_orthonormal() {
        let mut cam = camera();
        // A quarter turn up the vertical axis ends looking along `up`.
        cam.rotate(0.0, std::f32::consts::FRAC_PI_4);
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, -10.0, 0.0), 1e-3));
        assert_orthonormal(&cam);
        assert!(cam.horizontal().abs_diff_eq(Vec3::X, 1e-3));
        assert!(cam.view().is_finite());

        cam.rotate(0.0, 0.1);
        assert_orthonormal(&cam);
        assert!(cam.view().is_finite());
    }

    #[test]
    fn position_above_target_has_finite_view() {
        let mut cam = camera();
        cam.set_position(Vec3::new(0.0, 10.0, 0.0));
        assert_orthonormal(&cam);
        assert!(cam.view().is_finite());
        let eye = cam.view().transform_point3(cam.position());
        assert!(eye.abs_diff_eq(Vec3::ZERO, 1e-4));
    }

    #[test]
    fn parallel_pan_moves_target_with_position() {
        let mut cam = camera();
        cam.set_dirty(Matrix::View, false);
        cam.pan(1.0, 0.0, true);

        let display_x = 2.0 * 10.0 * (22.5_f32).to_radians().tan() * (800.0 / 600.0);
        let expected = Vec3::new(display_x * TRANSLATE_SPEED, 0.0, 0.0);
        assert!(cam.target().abs_diff_eq(expected, 1e-3));
        assert!(cam.position().abs_diff_eq(expected + Vec3::Z * 10.0, 1e-3));
        assert!(cam.is_dirty(Matrix::View));
    }

    #[test]
    fn dolly_moves_along_view_direction() {
        let mut cam = camera();
        cam.pan(0.0, 0.5, false);
        // offset = (target - pos) * 0.5 = (0,0,-5); scaled by speed.
        assert!(cam.position().abs_diff_eq(Vec3::new(0.0, 0.0, 7.5), EPS));
        assert!(cam.target().abs_diff_eq(Vec3::new(0.0, 0.0, -2.5), EPS));
    }

    #[test]
    fn projection_setters_mark_projection_only() {
        let mut cam = camera();
        cam.set_dirty(Matrix::Projection, false);
        cam.set_fov(60.0);
        assert!(cam.is_dirty(Matrix::Projection));
        assert!(!cam.is_dirty(Matrix::View));

        cam.set_dirty(Matrix::Projection, false);
        cam.set_near(0.5);
        assert!(cam.is_dirty(Matrix::Projection));
        cam.set_dirty(Matrix::Projection, false);
        cam.set_far(500.0);
        assert!(cam.is_dirty(Matrix::Projection));
        cam.set_dirty(Matrix::Projection, false);
        cam.set_viewport(1024, 768);
        assert!(cam.is_dirty(Matrix::Projection));
    }

    #[test]
    fn set_position_marks_view() {
        let mut cam = camera();
        cam.set_position(Vec3::new(5.0, 5.0, 5.0));
        assert!(cam.is_dirty(Matrix::View));
        assert_orthonormal(&cam);
    }

    #[test]
    fn projection_uses_radians() {
        let cam = camera();
        let expected = Mat4::perspective_rh(45.0_f32.to_radians(), 800.0 / 600.0, 0.1, 100.0);
        assert!(cam.projection().abs_diff_eq(expected, EPS));
    }

    #[test]
    fn zero_viewport_does_not_poison_matrices() {
        let mut cam = camera();
        cam.set_viewport(0, 0);
        assert!(cam.projection().is_finite());
        cam.handle_mouse_drag(
            MouseButton::Left,
            Vec2::new(10.0, 10.0),
            Vec2::ZERO,
            Duration::from_millis(16),
        );
        assert_eq!(cam.position(), Vec3::new(0.0, 0.0, 10.0));
    }

    #[test]
    fn mouse_drag_routes_by_button() {
        let dt = Duration::from_secs(1);
        let pressed = Vec2::new(400.0, 300.0);
        let cursor = Vec2::new(400.0, 240.0);

        let mut zoomed = camera();
        zoomed.handle_mouse_drag(MouseButton::Middle, cursor, pressed, dt);
        // dy = 60 / 600 = 0.1, factor 2^-0.25
        let expected = 10.0 * 2.0_f32.powf(-0.25);
        assert!((zoomed.position().z - expected).abs() < 1e-4);

        let mut panned = camera();
        panned.handle_mouse_drag(MouseButton::Right, cursor, pressed, dt);
        assert!(panned.target().y < 0.0);

        let mut untouched = camera();
        untouched.handle_mouse_drag(MouseButton::Back, cursor, pressed, dt);
        assert_eq!(untouched.position(), Vec3::new(0.0, 0.0, 10.0));
    }
}
