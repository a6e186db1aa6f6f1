//! Hardware interface boundary
//!
//! Every external collaborator of the control core sits behind one of these
//! traits: the instrument firmware binds them to real peripherals, the host
//! rig and the tests bind them to the simulated backends in [`sim`] and the
//! `midir`-based port in [`midir_port`].
//!
//! All hot-path methods take `&self`; backends use interior mutability so
//! handles can be shared across the two scheduler contexts as `Arc<dyn ...>`.

pub mod midir_port;
pub mod sim;

pub use midir_port::MidirUsb;
pub use sim::{
    ConsoleDisplay, LogBle, LogLed, LogMux, LogSerialLine, RecordingSink, SimBootloader, SimInput,
    SimTouch, SimUsb,
};

/// One sink of the MIDI fan-out.
///
/// Writes are fire-and-forget: a transport that is not currently connected
/// absorbs the packet, and the core never inspects a result.
pub trait MidiSink: Send + Sync {
    fn write_packet(&self, bytes: &[u8]);
}

/// A bank of discrete digital input lines, pull-up idle-high convention:
/// a released line reads `true`, a pressed line reads `false`.
///
/// The index is the logical position in the configured descriptor list; the
/// backend owns the mapping to physical pins.
pub trait InputPort: Send + Sync {
    fn read_line(&self, index: usize) -> bool;
}

/// Continuous touch strip driver.
///
/// `read_frame` latches one sensor frame; `position` reports the normalized
/// touch position of that frame or a negative sentinel when nothing touches
/// the strip; `size` reports the touch width for a valid position.
pub trait TouchSensor: Send + Sync {
    fn read_frame(&self);
    fn position(&self) -> f32;
    fn size(&self, position: f32) -> f32;
}

/// Character-cell display. The render context owns the display exclusively:
/// clear, let the active mode draw, present.
pub trait Display: Send {
    fn clear(&mut self);
    fn draw_text(&mut self, x: u8, y: u8, scale: u8, text: &str);
    fn present(&mut self);
}

/// USB connection state as reported by the device stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbState {
    NotMounted,
    Mounted,
    Suspended,
}

/// USB MIDI transport: a fan-out sink plus the housekeeping hooks the fast
/// scheduler context drives every tick.
pub trait UsbMidi: MidiSink {
    /// Service the device stack (enumeration, endpoint upkeep).
    fn poll(&self);

    /// Whether the MIDI streaming endpoint is mounted. Input scanning is
    /// gated on this.
    fn mounted(&self) -> bool;

    fn state(&self) -> UsbState;
}

/// Write-only serial line feeding the TRS jack, one byte at a time,
/// blocking on the underlying wire. No FIFO, no flow control.
pub trait SerialLine: Send + Sync {
    fn write_byte(&self, byte: u8);
}

/// Two control lines of the analog switch that routes the TRS wire between
/// the two physical jack presets.
pub trait MuxControl: Send + Sync {
    fn set_lines(&self, in1: bool, in2: bool);
}

/// Zero-argument reboot-into-bootloader request. The device resets; nothing
/// returns.
pub trait Bootloader: Send + Sync {
    fn reboot_to_bootloader(&self);
}

/// Status LED driven by the fast loop heartbeat.
pub trait Led: Send + Sync {
    fn set(&self, on: bool);
}
