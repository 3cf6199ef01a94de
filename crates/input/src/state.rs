use crate::action::Action;
use glam::Vec2;
use std::collections::BTreeSet;

/// Accumulates host input events between frames.
///
/// Held actions persist until released. Mouse motion accumulates until the
/// next `snapshot`, which hands it off and starts a new frame at zero.
#[derive(Debug, Default)]
pub struct InputState {
    held: BTreeSet<Action>,
    mouse_delta: Vec2,
    look_held: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&mut self, action: Action) {
        if self.held.insert(action) {
            tracing::trace!(?action, "pressed");
        }
    }

    pub fn release(&mut self, action: Action) {
        if self.held.remove(&action) {
            tracing::trace!(?action, "released");
        }
    }

    /// Route a press or release.
    pub fn set(&mut self, action: Action, pressed: bool) {
        if pressed {
            self.press(action);
        } else {
            self.release(action);
        }
    }

    pub fn add_mouse_motion(&mut self, dx: f32, dy: f32) {
        self.mouse_delta += Vec2::new(dx, dy);
    }

    /// Mouse look is only applied while this button is down.
    pub fn set_look_button(&mut self, down: bool) {
        self.look_held = down;
    }

    pub fn look_held(&self) -> bool {
        self.look_held
    }

    /// Capture this frame's input and reset the accumulated mouse delta.
    pub fn snapshot(&mut self) -> InputSnapshot {
        InputSnapshot {
            held: self.held.clone(),
            mouse_delta: std::mem::take(&mut self.mouse_delta),
            look_held: self.look_held,
        }
    }

    /// Drop all held state, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
        self.mouse_delta = Vec2::ZERO;
        self.look_held = false;
    }
}

/// One frame's worth of input, handed to the scene by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    held: BTreeSet<Action>,
    mouse_delta: Vec2,
    look_held: bool,
}

impl InputSnapshot {
    pub fn with_held(mut self, action: Action) -> Self {
        self.held.insert(action);
        self
    }

    pub fn with_mouse(mut self, dx: f32, dy: f32, look_held: bool) -> Self {
        self.mouse_delta = Vec2::new(dx, dy);
        self.look_held = look_held;
        self
    }

    pub fn is_held(&self, action: Action) -> bool {
        self.held.contains(&action)
    }

    pub fn held(&self) -> impl Iterator<Item = Action> + '_ {
        self.held.iter().copied()
    }

    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    pub fn look_held(&self) -> bool {
        self.look_held
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_actions_persist_across_snapshots() {
        let mut input = InputState::new();
        input.press(Action::MoveForward);
        assert!(input.snapshot().is_held(Action::MoveForward));
        assert!(input.snapshot().is_held(Action::MoveForward));
        input.release(Action::MoveForward);
        assert!(!input.snapshot().is_held(Action::MoveForward));
    }

    #[test]
    fn mouse_delta_accumulates_then_resets() {
        let mut input = InputState::new();
        input.add_mouse_motion(3.0, -1.0);
        input.add_mouse_motion(2.0, 4.0);
        let snap = input.snapshot();
        assert_eq!(snap.mouse_delta(), Vec2::new(5.0, 3.0));
        assert_eq!(input.snapshot().mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn look_button_is_sticky() {
        let mut input = InputState::new();
        input.set_look_button(true);
        assert!(input.snapshot().look_held());
        assert!(input.look_held());
        input.set_look_button(false);
        assert!(!input.snapshot().look_held());
    }

    #[test]
    fn set_routes_press_and_release() {
        let mut input = InputState::new();
        input.set(Action::Quit, true);
        assert!(input.snapshot().is_held(Action::Quit));
        input.set(Action::Quit, false);
        assert_eq!(input.snapshot().held().count(), 0);
    }

    #[test]
    fn clear_drops_everything() {
        let mut input = InputState::new();
        input.press(Action::Ascend);
        input.add_mouse_motion(1.0, 1.0);
        input.set_look_button(true);
        input.clear();
        assert_eq!(input.snapshot(), InputSnapshot::default());
    }

    #[test]
    fn snapshot_builders() {
        let snap = InputSnapshot::default()
            .with_held(Action::StrafeLeft)
            .with_mouse(10.0, 0.0, true);
        assert!(snap.is_held(Action::StrafeLeft));
        assert!(!snap.is_held(Action::StrafeRight));
        assert_eq!(snap.mouse_delta().x, 10.0);
        assert!(snap.look_held());
    }
}
