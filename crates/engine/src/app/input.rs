#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Quit,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::Quit => 5,
        }
    }
}

/// Input state frozen for one simulation tick. `interact_pressed` is an edge:
/// it is true on exactly one tick per key press.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    interact_pressed: bool,
    actions: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(quit_requested: bool, interact_pressed: bool, actions: ActionStates) -> Self {
        Self {
            quit_requested,
            interact_pressed,
            actions,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn interact_pressed(&self) -> bool {
        self.interact_pressed
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_interact_pressed(mut self, interact_pressed: bool) -> Self {
        self.interact_pressed = interact_pressed;
        self
    }

    /// Unit-less movement axis from the held move actions, in `-1..=1` per
    /// axis. Opposing keys cancel.
    pub fn move_axis(&self) -> (f32, f32) {
        let axis = |negative: InputAction, positive: InputAction| {
            let mut value = 0.0;
            if self.is_down(negative) {
                value -= 1.0;
            }
            if self.is_down(positive) {
                value += 1.0;
            }
            value
        };
        (
            axis(InputAction::MoveLeft, InputAction::MoveRight),
            axis(InputAction::MoveUp, InputAction::MoveDown),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposing_moves_cancel() {
        let snapshot = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true)
            .with_action_down(InputAction::MoveDown, true);
        assert_eq!(snapshot.move_axis(), (0.0, 1.0));
    }

    #[test]
    fn empty_snapshot_has_nothing_down() {
        let snapshot = InputSnapshot::empty();
        assert_eq!(snapshot.move_axis(), (0.0, 0.0));
        assert!(!snapshot.is_down(InputAction::Quit));
        assert!(!snapshot.interact_pressed());
    }
}
