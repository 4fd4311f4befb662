use winit::event::{ElementState, MouseButton, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Wheel angle units per notch (eighths of a degree).
const ANGLE_UNITS_PER_LINE: f32 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    Quit,
    TopView,
    BottomView,
    SideView(u8),
    ToggleHover,
}

#[derive(Default, Debug, Clone, Copy)]
pub struct InputState {
    pub cursor: Option<(f32, f32)>,
    dragging: bool,
}

impl InputState {
    pub fn handle_key(&mut self, key: PhysicalKey, pressed: bool) -> InputAction {
        if !pressed {
            return InputAction::None;
        }
        match key {
            PhysicalKey::Code(KeyCode::Escape) => InputAction::Quit,
            PhysicalKey::Code(KeyCode::KeyT) => InputAction::TopView,
            PhysicalKey::Code(KeyCode::KeyB) => InputAction::BottomView,
            PhysicalKey::Code(KeyCode::Digit1) => InputAction::SideView(0),
            PhysicalKey::Code(KeyCode::Digit2) => InputAction::SideView(1),
            PhysicalKey::Code(KeyCode::Digit3) => InputAction::SideView(2),
            PhysicalKey::Code(KeyCode::Digit4) => InputAction::SideView(3),
            PhysicalKey::Code(KeyCode::KeyH) => InputAction::ToggleHover,
            _ => InputAction::None,
        }
    }

    pub fn handle_button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.dragging = state == ElementState::Pressed;
        }
    }

    /// Records the new cursor position. Returns the drag delta while the
    /// left button is held.
    pub fn handle_cursor(&mut self, x: f32, y: f32) -> Option<(f32, f32)> {
        let previous = self.cursor.replace((x, y));
        if !self.dragging {
            return None;
        }
        previous.map(|(px, py)| (x - px, y - py))
    }

    pub fn cursor_left(&mut self) {
        self.cursor = None;
        self.dragging = false;
    }
}

/// Wheel movement in eighths of a degree, positive away from the user.
pub fn wheel_angle(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y * ANGLE_UNITS_PER_LINE,
        MouseScrollDelta::PixelDelta(position) => position.y as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    #[test]
    fn view_keys_map_on_press_only() {
        let mut input = InputState::default();
        let key = PhysicalKey::Code(KeyCode::KeyT);
        assert_eq!(input.handle_key(key, true), InputAction::TopView);
        assert_eq!(input.handle_key(key, false), InputAction::None);
        assert_eq!(
            input.handle_key(PhysicalKey::Code(KeyCode::Digit3), true),
            InputAction::SideView(2)
        );
        assert_eq!(
            input.handle_key(PhysicalKey::Code(KeyCode::KeyQ), true),
            InputAction::None
        );
    }

    #[test]
    fn drag_reports_deltas_only_while_pressed() {
        let mut input = InputState::default();
        assert_eq!(input.handle_cursor(10.0, 10.0), None);
        input.handle_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.handle_cursor(15.0, 8.0), Some((5.0, -2.0)));
        input.handle_button(MouseButton::Left, ElementState::Released);
        assert_eq!(input.handle_cursor(20.0, 8.0), None);
        assert_eq!(input.cursor, Some((20.0, 8.0)));
    }

    #[test]
    fn leaving_the_window_stops_dragging() {
        let mut input = InputState::default();
        input.handle_button(MouseButton::Left, ElementState::Pressed);
        input.handle_cursor(1.0, 1.0);
        input.cursor_left();
        assert_eq!(input.handle_cursor(5.0, 5.0), None);
    }

    #[test]
    fn wheel_lines_become_angle_units() {
        assert_eq!(wheel_angle(MouseScrollDelta::LineDelta(0.0, 1.0)), 120.0);
        assert_eq!(
            wheel_angle(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -30.0))),
            -30.0
        );
    }
}
