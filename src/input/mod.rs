use winit::event::MouseScrollDelta;
use winit::keyboard::KeyCode;

/// One-shot commands of the shadow demo, consumed once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CycleDisplayMode,
    ToggleLightMotion,
    ToggleGround,
    ToggleStencilMode,
    Quit,
}

#[derive(Default)]
pub struct InputState {
    pub extent_up: bool,
    pub extent_down: bool,
    pub zoom_in: bool,
    pub zoom_out: bool,
    pub dragging: bool,
    pub mouse_x: f32,
    pub mouse_y: f32,
    drag_delta: (f32, f32),
    wheel: f32,
    commands: Vec<Command>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key_press(&mut self, keycode: KeyCode) {
        match keycode {
            KeyCode::ArrowUp => self.extent_up = true,
            KeyCode::ArrowDown => self.extent_down = true,
            KeyCode::ArrowLeft => self.zoom_in = true,
            KeyCode::ArrowRight => self.zoom_out = true,
            KeyCode::Digit1 => self.commands.push(Command::CycleDisplayMode),
            KeyCode::Digit2 => self.commands.push(Command::ToggleLightMotion),
            KeyCode::Digit3 => self.commands.push(Command::ToggleGround),
            KeyCode::Digit4 => self.commands.push(Command::ToggleStencilMode),
            KeyCode::Escape => self.commands.push(Command::Quit),
            _ => {}
        }
    }

    pub fn handle_key_release(&mut self, keycode: KeyCode) {
        match keycode {
            KeyCode::ArrowUp => self.extent_up = false,
            KeyCode::ArrowDown => self.extent_down = false,
            KeyCode::ArrowLeft => self.zoom_in = false,
            KeyCode::ArrowRight => self.zoom_out = false,
            _ => {}
        }
    }

    pub fn handle_mouse_button_press(&mut self) {
        self.dragging = true;
    }

    pub fn handle_mouse_button_release(&mut self) {
        self.dragging = false;
    }

    pub fn update_mouse_position(&mut self, x: f32, y: f32) {
        if self.dragging {
            self.drag_delta.0 += x - self.mouse_x;
            self.drag_delta.1 += y - self.mouse_y;
        }
        self.mouse_x = x;
        self.mouse_y = y;
    }

    pub fn handle_wheel(&mut self, delta: MouseScrollDelta) {
        self.wheel += match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(p) => p.y as f32 / 40.0,
        };
    }

    /// Mouse movement while dragging since the last call, in pixels.
    pub fn take_drag(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.drag_delta)
    }

    /// Wheel lines since the last call; positive scrolls away from the user.
    pub fn take_wheel(&mut self) -> f32 {
        std::mem::take(&mut self.wheel)
    }

    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// -1, 0 or 1 from a pair of opposing held keys.
    pub fn axis(negative: bool, positive: bool) -> f32 {
        (positive as i32 - negative as i32) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_keys_queue_commands_once() {
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::Digit1);
        input.handle_key_press(KeyCode::Digit4);
        input.handle_key_release(KeyCode::Digit1);
        assert_eq!(
            input.take_commands(),
            vec![Command::CycleDisplayMode, Command::ToggleStencilMode]
        );
        assert!(input.take_commands().is_empty());
    }

    #[test]
    fn drag_only_accumulates_while_pressed() {
        let mut input = InputState::new();
        input.update_mouse_position(10.0, 10.0);
        input.handle_mouse_button_press();
        input.update_mouse_position(15.0, 7.0);
        input.handle_mouse_button_release();
        input.update_mouse_position(50.0, 50.0);
        assert_eq!(input.take_drag(), (5.0, -3.0));
        assert_eq!(input.take_drag(), (0.0, 0.0));
    }

    #[test]
    fn held_arrows_form_axes() {
        let mut input = InputState::new();
        input.handle_key_press(KeyCode::ArrowUp);
        assert_eq!(InputState::axis(input.extent_down, input.extent_up), 1.0);
        input.handle_key_release(KeyCode::ArrowUp);
        assert_eq!(InputState::axis(input.extent_down, input.extent_up), 0.0);
    }
}
