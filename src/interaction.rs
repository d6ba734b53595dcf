//! Mouse and keyboard state machine.
//!
//! The machine only tracks pointer state and timers. Everything touching the
//! plot is returned as [`Effect`]s which the plot applies in order.
use glam::Vec2;

use crate::constants::{LONG_CLICK_TIME, SINGLE_CLICK_DELAY};

/// Modifier keys held during an input event.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

/// Action a modifier key can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    Select,
    Merge,
    Rotate,
}

/// Binding of modifier keys to actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyMap {
    pub alt: Option<KeyAction>,
    pub ctrl: Option<KeyAction>,
    pub meta: Option<KeyAction>,
    pub shift: Option<KeyAction>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self {
            alt: Some(KeyAction::Rotate),
            ctrl: None,
            meta: Some(KeyAction::Merge),
            shift: Some(KeyAction::Select),
        }
    }
}

impl KeyMap {
    pub fn is_active(&self, modifiers: Modifiers, action: KeyAction) -> bool {
        [
            (modifiers.alt, self.alt),
            (modifiers.ctrl, self.ctrl),
            (modifiers.meta, self.meta),
            (modifiers.shift, self.shift),
        ]
        .into_iter()
        .any(|(held, bound)| held && bound == Some(action))
    }
}

/// What a primary-button drag does without modifiers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseMode {
    #[default]
    PanZoom,
    Lasso,
    Rotate,
}

impl MouseMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "panZoom" => Some(Self::PanZoom),
            "lasso" => Some(Self::Lasso),
            "rotate" => Some(Self::Rotate),
            _ => None,
        }
    }
}

/// A pointer event in canvas pixels.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub position: Vec2,
    /// Timestamp in milliseconds.
    pub time: f64,
    pub modifiers: Modifiers,
    /// Bit mask of the pressed buttons, `1` being the primary button.
    pub buttons: u16,
}

/// Settings consulted by the state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    pub mouse_mode: MouseMode,
    pub key_map: KeyMap,
    pub select_on_long_press: bool,
    pub long_press_time: f64,
    pub select_min_dist: f32,
    pub select_initiator: bool,
    pub deselect_on_dbl_click: bool,
    pub deselect_on_escape: bool,
    pub camera_fixed: bool,
}

/// Requests from the state machine to the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Effect {
    /// Hit-test the pointer position and hover the result.
    Hover,
    Unhover,
    ExtendSelection,
    EndSelection { merge: bool },
    /// Hit-test the click position and select the result. Misses are
    /// reported back through [`Interaction::click_missed`].
    ClickSelect { merge: bool },
    ShowInitiator(Vec2),
    HideInitiator,
    ShowLongPressIndicator(Vec2),
    HideLongPressIndicator,
    Deselect,
    /// Pan by a pixel offset.
    Pan(Vec2),
    /// Rotate around the canvas center, following the pointer from the first
    /// to the second position.
    Rotate(Vec2, Vec2),
    /// Zoom by a factor around a pixel position.
    Zoom { factor: f32, anchor: Vec2 },
    Redraw,
}

/// Observable phase of the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    MouseDown,
    Selecting,
    /// A click into empty space is waiting to show the initiator.
    AwaitingClick,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Press {
    position: Vec2,
    time: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PointerState {
    Idle,
    MouseDown(Press),
    Selecting(Press),
}

/// The pointer state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    state: PointerState,
    last_press: Option<Press>,
    pointer: Option<Vec2>,
    in_canvas: bool,
    long_press_deadline: Option<f64>,
    initiator_deadline: Option<(f64, Vec2)>,
}

impl Default for Interaction {
    fn default() -> Self {
        Self {
            state: PointerState::Idle,
            last_press: None,
            pointer: None,
            in_canvas: false,
            long_press_deadline: None,
            initiator_deadline: None,
        }
    }
}

impl Interaction {
    pub fn phase(&self) -> Phase {
        match self.state {
            PointerState::MouseDown(_) => Phase::MouseDown,
            PointerState::Selecting(_) => Phase::Selecting,
            PointerState::Idle if self.initiator_deadline.is_some() => Phase::AwaitingClick,
            PointerState::Idle => Phase::Idle,
        }
    }

    pub fn is_mouse_down(&self) -> bool {
        !matches!(self.state, PointerState::Idle)
    }

    pub fn is_selecting(&self) -> bool {
        matches!(self.state, PointerState::Selecting(_))
    }

    /// Last known pointer position in canvas pixels.
    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer
    }

    pub fn is_in_canvas(&self) -> bool {
        self.in_canvas
    }

    pub fn mouse_enter(&mut self) {
        self.in_canvas = true;
    }

    pub fn mouse_leave(&mut self) -> Vec<Effect> {
        self.in_canvas = false;
        vec![Effect::Unhover, Effect::Redraw]
    }

    pub fn mouse_down(&mut self, input: PointerInput, config: &InteractionConfig, points_drawn: bool) -> Vec<Effect> {
        if !points_drawn || input.buttons != 1 {
            return Vec::new();
        }

        let press = Press {
            position: input.position,
            time: input.time,
        };
        self.pointer = Some(input.position);
        self.last_press = Some(press);

        let select = config.mouse_mode == MouseMode::Lasso
            || config.key_map.is_active(input.modifiers, KeyAction::Select);
        if select {
            self.state = PointerState::Selecting(press);
            return vec![Effect::Redraw];
        }

        self.state = PointerState::MouseDown(press);
        if config.select_on_long_press {
            self.long_press_deadline = Some(input.time + config.long_press_time);
            return vec![Effect::ShowLongPressIndicator(input.position), Effect::Redraw];
        }

        vec![Effect::Redraw]
    }

    pub fn mouse_move(&mut self, input: PointerInput, config: &InteractionConfig) -> Vec<Effect> {
        let previous = self.pointer.replace(input.position);
        self.in_canvas = true;
        let mut effects = Vec::new();

        match self.state {
            PointerState::Selecting(_) => effects.push(Effect::ExtendSelection),
            PointerState::Idle => effects.push(Effect::Hover),
            PointerState::MouseDown(press) => {
                effects.push(Effect::Hover);
                let moved = press.position.distance(input.position) >= config.select_min_dist;
                if moved && self.long_press_deadline.take().is_some() {
                    effects.push(Effect::HideLongPressIndicator);
                }

                if let Some(previous) = previous {
                    let rotate = config.mouse_mode == MouseMode::Rotate
                        || config.key_map.is_active(input.modifiers, KeyAction::Rotate);
                    if !config.camera_fixed && previous != input.position {
                        if rotate {
                            effects.push(Effect::Rotate(previous, input.position));
                        } else {
                            effects.push(Effect::Pan(input.position - previous));
                        }
                    }
                }
            }
        }

        if self.is_mouse_down() {
            effects.push(Effect::Redraw);
        }
        effects
    }

    pub fn mouse_up(&mut self, input: PointerInput, config: &InteractionConfig) -> Vec<Effect> {
        self.long_press_deadline = None;
        let mut effects = Vec::new();

        if let PointerState::Selecting(_) = self.state {
            let merge = config.key_map.is_active(input.modifiers, KeyAction::Merge);
            effects.push(Effect::EndSelection { merge });
        }
        effects.push(Effect::HideLongPressIndicator);

        self.state = PointerState::Idle;
        effects
    }

    pub fn click(&mut self, input: PointerInput, config: &InteractionConfig) -> Vec<Effect> {
        let Some(press) = self.last_press.take() else {
            return Vec::new();
        };
        if press.position.distance(input.position) >= config.select_min_dist {
            return Vec::new();
        }

        let click_time = input.time - press.time;
        if config.select_initiator && click_time >= LONG_CLICK_TIME {
            return Vec::new();
        }

        let merge = config.key_map.is_active(input.modifiers, KeyAction::Merge);
        vec![Effect::ClickSelect { merge }]
    }

    /// A click did not hit a point: show the initiator after a short delay
    /// unless a double click supersedes it.
    pub fn click_missed(&mut self, input: PointerInput, config: &InteractionConfig) {
        if config.select_initiator && self.initiator_deadline.is_none() {
            self.initiator_deadline = Some((input.time + SINGLE_CLICK_DELAY, input.position));
        }
    }

    pub fn dbl_click(&mut self, config: &InteractionConfig) -> Vec<Effect> {
        self.initiator_deadline = None;
        let mut effects = vec![Effect::HideInitiator];
        if config.deselect_on_dbl_click {
            effects.push(Effect::Deselect);
        }
        effects
    }

    pub fn wheel(&mut self, input: PointerInput, delta_y: f32, config: &InteractionConfig) -> Vec<Effect> {
        self.pointer = Some(input.position);
        if config.camera_fixed || delta_y == 0.0 {
            return vec![Effect::Redraw];
        }

        let factor = (-delta_y / 500.0).exp();
        vec![
            Effect::Zoom {
                factor,
                anchor: input.position,
            },
            Effect::Redraw,
        ]
    }

    pub fn key_up(&mut self, key: &str, config: &InteractionConfig) -> Vec<Effect> {
        match key {
            "Escape" if config.deselect_on_escape => vec![Effect::Deselect],
            _ => Vec::new(),
        }
    }

    /// Losing focus releases the pointer without merging.
    pub fn blur(&mut self) -> Vec<Effect> {
        self.long_press_deadline = None;
        self.in_canvas = false;
        let mut effects = Vec::new();
        if self.is_selecting() {
            effects.push(Effect::EndSelection { merge: false });
        }
        effects.push(Effect::HideLongPressIndicator);
        self.state = PointerState::Idle;
        effects
    }

    /// Fires expired timers.
    pub fn tick(&mut self, now: f64) -> Vec<Effect> {
        let mut effects = Vec::new();

        if let Some(deadline) = self.long_press_deadline {
            if now >= deadline {
                self.long_press_deadline = None;
                if let PointerState::MouseDown(press) = self.state {
                    self.state = PointerState::Selecting(press);
                    effects.push(Effect::Redraw);
                }
            }
        }

        if let Some((deadline, position)) = self.initiator_deadline {
            if now >= deadline {
                self.initiator_deadline = None;
                effects.push(Effect::ShowInitiator(position));
            }
        }

        effects
    }
}
