//! Touchord control core
//!
//! Event generation, mode dispatch and MIDI fan-out for the Touchord
//! touch-chord controller. Raw hardware state (control buttons, a momentary
//! key row, a continuous touch strip) becomes semantic input events, routed
//! to exactly one active interaction mode, whose musical output fans out
//! identically to USB, TRS and Bluetooth MIDI. Hardware sits behind the
//! traits in [`hw`]; the binary wires host-side backends for bring-up.

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod hw;
pub mod input;
pub mod midi;
pub mod mode;
pub mod transport;

pub use config::AppConfig;
pub use engine::{FastLoop, RenderLoop, SharedFlags};
pub use midi::{MidiMessage, NoteStatus};
pub use mode::{Mode, ModeBank, ModeKind};
pub use transport::{MidiFanout, TrsJack, TrsPort};
