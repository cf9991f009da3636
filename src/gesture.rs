use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// A discrete press or release delivered by the input hook. Transient,
/// never persisted.
#[derive(Debug, Clone, Copy)]
pub struct ButtonEvent {
    pub button: MouseButton,
    pub pressed: bool,
    pub at: Instant,
}

/// Recognizes the left+right chord from a stream of button events.
///
/// A chord fires when both buttons are pressed within the configured
/// threshold of each other and the debounce window since the previous
/// fire has elapsed. Firing consumes both press timestamps, so the chord
/// cannot fire again until each button has gone through a real
/// release-then-press transition. Down events for a button that is
/// already held are ignored.
#[derive(Debug)]
pub struct GestureDetector {
    threshold: Duration,
    debounce: Duration,
    left_down: bool,
    right_down: bool,
    left_pressed_at: Option<Instant>,
    right_pressed_at: Option<Instant>,
    last_trigger_at: Option<Instant>,
}

impl GestureDetector {
    pub fn new(threshold: Duration, debounce: Duration) -> Self {
        Self {
            threshold,
            debounce,
            left_down: false,
            right_down: false,
            left_pressed_at: None,
            right_pressed_at: None,
            last_trigger_at: None,
        }
    }

    /// Feed one event. Returns `true` when the chord fired.
    pub fn handle(&mut self, event: ButtonEvent) -> bool {
        if event.pressed {
            self.on_down(event.button, event.at)
        } else {
            self.on_up(event.button);
            false
        }
    }

    fn on_down(&mut self, button: MouseButton, at: Instant) -> bool {
        match button {
            MouseButton::Left => {
                if self.left_down {
                    return false;
                }
                self.left_down = true;
                self.left_pressed_at = Some(at);
            }
            MouseButton::Right => {
                if self.right_down {
                    return false;
                }
                self.right_down = true;
                self.right_pressed_at = Some(at);
            }
        }

        let (left_at, right_at) = match (self.left_pressed_at, self.right_pressed_at) {
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };

        let spread = left_at.max(right_at).duration_since(left_at.min(right_at));
        if spread > self.threshold {
            return false;
        }

        if let Some(last) = self.last_trigger_at {
            if at.duration_since(last) < self.debounce {
                return false;
            }
        }

        self.last_trigger_at = Some(at);
        self.left_pressed_at = None;
        self.right_pressed_at = None;
        true
    }

    fn on_up(&mut self, button: MouseButton) {
        match button {
            MouseButton::Left => {
                self.left_down = false;
                self.left_pressed_at = None;
            }
            MouseButton::Right => {
                self.right_down = false;
                self.right_pressed_at = None;
            }
        }
    }
}
