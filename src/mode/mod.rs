//! Interaction modes and their dispatcher
//!
//! Exactly one mode owns the full input/render callback surface at any
//! time. The bank holds one instance per variant and hot-swaps the active
//! one with an ordered teardown/setup pair; every input event and the
//! render/update tick are forwarded unconditionally to the active mode.

mod compose;
mod omni;
mod perform;
mod settings;
mod strum;


pub use compose::ComposeMode;
pub use omni::OmniMode;
pub use perform::PerformMode;
pub use settings::SettingsMode;
pub use strum::StrumMode;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MidiConfig;
use crate::engine::SharedFlags;
use crate::hw::Display;
use crate::input::InputEvent;
use crate::transport::MidiFanout;

/// The closed set of interaction modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Compose,
    Strum,
    Perform,
    Omni,
    Settings,
}

impl ModeKind {
    pub const ALL: [ModeKind; 5] = [
        ModeKind::Compose,
        ModeKind::Strum,
        ModeKind::Perform,
        ModeKind::Omni,
        ModeKind::Settings,
    ];

    pub fn index(self) -> usize {
        match self {
            ModeKind::Compose => 0,
            ModeKind::Strum => 1,
            ModeKind::Perform => 2,
            ModeKind::Omni => 3,
            ModeKind::Settings => 4,
        }
    }

    /// Inverse of [`index`](Self::index); out-of-range values wrap.
    pub fn from_index(index: u8) -> Self {
        Self::ALL[index as usize % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            ModeKind::Compose => "Compose",
            ModeKind::Strum => "Strum",
            ModeKind::Perform => "Perform",
            ModeKind::Omni => "Omni",
            ModeKind::Settings => "Settings",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compose" => Ok(ModeKind::Compose),
            "strum" => Ok(ModeKind::Strum),
            "perform" => Ok(ModeKind::Perform),
            "omni" => Ok(ModeKind::Omni),
            "settings" => Ok(ModeKind::Settings),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Context handed to every mode callback: the MIDI fan-out to play through
/// and the shared flags for requesting mode switches or shutdown.
pub struct EventCx<'a> {
    pub midi: &'a MidiFanout,
    pub flags: &'a SharedFlags,
}

/// The callback surface a mode owns while active.
///
/// `setup` runs before the mode receives any event, `teardown` after its
/// last; a mode must release everything it holds (sounding notes, display
/// claims) in `teardown`.
pub trait Mode: Send {
    fn setup(&mut self, cx: &mut EventCx);

    fn teardown(&mut self, cx: &mut EventCx);

    /// Per-frame state advance, after `draw` on the render tick.
    fn update(&mut self, _cx: &mut EventCx) {}

    /// Redraw the full frame; the display was cleared before this call.
    fn draw(&mut self, _display: &mut dyn Display) {}

    fn key_down(&mut self, _key: u8, _cx: &mut EventCx) {}

    fn key_up(&mut self, _key: u8, _cx: &mut EventCx) {}

    fn button_down(&mut self, _button: u8, _cx: &mut EventCx) {}

    /// Double-click on a click-aware control. Opens Settings unless the
    /// mode overrides the gesture.
    fn button_double_down(&mut self, _button: u8, cx: &mut EventCx) {
        cx.flags.request_mode(ModeKind::Settings);
    }

    fn button_up(&mut self, _button: u8, _cx: &mut EventCx) {}

    fn touch_down(&mut self, _position: f32, _size: f32, _cx: &mut EventCx) {}

    fn touch_up(&mut self, _cx: &mut EventCx) {}
}

/// Registry of all mode instances plus the active-variant index.
///
/// The bank is shared between the two scheduler contexts behind a mutex;
/// holding the lock across `switch_to` is what makes the teardown/setup
/// pair atomic with respect to input dispatch.
pub struct ModeBank {
    modes: [Box<dyn Mode>; 5],
    active: ModeKind,
}

impl ModeBank {
    /// Build the five production modes. Compose starts active; call
    /// [`start`](Self::start) before any dispatch.
    pub fn new(midi: &MidiConfig) -> Self {
        Self::with_modes([
            Box::new(ComposeMode::new(midi)),
            Box::new(StrumMode::new(midi)),
            Box::new(PerformMode::new(midi)),
            Box::new(OmniMode::new(midi)),
            Box::new(SettingsMode::new()),
        ])
    }

    /// Build a bank from explicit instances, ordered per [`ModeKind::ALL`].
    pub fn with_modes(modes: [Box<dyn Mode>; 5]) -> Self {
        Self {
            modes,
            active: ModeKind::Compose,
        }
    }

    pub fn active(&self) -> ModeKind {
        self.active
    }

    /// Run the initial mode's setup. Must happen before the scheduler
    /// contexts start dispatching.
    pub fn start(&mut self, cx: &mut EventCx) {
        self.modes[self.active.index()].setup(cx);
    }

    /// Ordered transition: old teardown, then new setup. No event reaches a
    /// mode that has been torn down or not yet set up.
    pub fn switch_to(&mut self, kind: ModeKind, cx: &mut EventCx) {
        if kind == self.active {
            return;
        }

        info!("mode {} -> {}", self.active, kind);
        self.modes[self.active.index()].teardown(cx);
        self.modes[kind.index()].setup(cx);
        self.active = kind;
    }

    /// Forward one input event to the active mode.
    pub fn dispatch(&mut self, event: InputEvent, cx: &mut EventCx) {
        let mode = &mut self.modes[self.active.index()];
        match event {
            InputEvent::ButtonDown(b) => mode.button_down(b, cx),
            InputEvent::ButtonDoubleDown(b) => mode.button_double_down(b, cx),
            InputEvent::ButtonUp(b) => mode.button_up(b, cx),
            InputEvent::KeyDown(k) => mode.key_down(k, cx),
            InputEvent::KeyUp(k) => mode.key_up(k, cx),
            InputEvent::TouchDown { position, size } => mode.touch_down(position, size, cx),
            InputEvent::TouchUp => mode.touch_up(cx),
            // Scheduler-level escape hatch, never a mode event
            InputEvent::MaintenanceCombo => {}
        }
    }

    pub fn update(&mut self, cx: &mut EventCx) {
        self.modes[self.active.index()].update(cx);
    }

    pub fn draw(&mut self, display: &mut dyn Display) {
        self.modes[self.active.index()].draw(display);
    }
}
