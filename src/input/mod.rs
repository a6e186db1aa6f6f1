//! Input event generation
//!
//! Turns the level-triggered hardware state (control buttons, momentary key
//! row, touch strip) into the discrete and level-triggered events the active
//! mode consumes.

mod buttons;
mod touch;

pub use buttons::{ControlScanner, KeyScanner};
pub use touch::TouchTracker;

use serde::{Deserialize, Serialize};

/// One configured control input: a logical identity plus its capability
/// flags, decoupled from any physical pin addressing. The position in the
/// configured list is the line index asked of the input port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub id: u8,
    /// Double-click-aware inputs defer their down event to the click
    /// tracker; plain inputs fire synchronously on the edge.
    #[serde(default)]
    pub double_click: bool,
}

/// Semantic input event delivered to the active mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    ButtonDown(u8),
    ButtonDoubleDown(u8),
    ButtonUp(u8),
    KeyDown(u8),
    KeyUp(u8),
    /// Level-triggered: re-emitted every tick while the touch is held.
    TouchDown { position: f32, size: f32 },
    TouchUp,
    /// The designated maintenance input combination was observed. Consumed
    /// by the scheduler, never forwarded to a mode.
    MaintenanceCombo,
}
