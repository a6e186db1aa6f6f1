//! Simulated and logging hardware backends
//!
//! Used by the host rig and the tests: the same binary that runs on the
//! instrument can be exercised on a desk with no hardware attached, with
//! input levels and touch frames driven from the diagnostic console.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace};

use super::{
    Bootloader, Display, InputPort, Led, MidiSink, MuxControl, SerialLine, TouchSensor, UsbMidi,
    UsbState,
};
use crate::midi::format_hex;

/// Digital input bank with REPL-settable levels. Lines idle released
/// (`true`, pull-up convention).
pub struct SimInput {
    levels: Mutex<Vec<bool>>,
}

impl SimInput {
    pub fn new(lines: usize) -> Self {
        Self {
            levels: Mutex::new(vec![true; lines]),
        }
    }

    /// Drive one line: `pressed` pulls it low.
    pub fn set_pressed(&self, index: usize, pressed: bool) {
        let mut levels = self.levels.lock();
        if index < levels.len() {
            levels[index] = !pressed;
        }
    }
}

impl InputPort for SimInput {
    fn read_line(&self, index: usize) -> bool {
        self.levels.lock().get(index).copied().unwrap_or(true)
    }
}

/// Touch strip stand-in holding one latched frame.
pub struct SimTouch {
    frame: Mutex<(f32, f32)>,
}

impl SimTouch {
    pub fn new() -> Self {
        Self {
            // Negative position = nothing touching the strip
            frame: Mutex::new((-1.0, 0.0)),
        }
    }

    pub fn set_touch(&self, position: f32, size: f32) {
        *self.frame.lock() = (position, size);
    }

    pub fn clear_touch(&self) {
        *self.frame.lock() = (-1.0, 0.0);
    }
}

impl Default for SimTouch {
    fn default() -> Self {
        Self::new()
    }
}

impl TouchSensor for SimTouch {
    fn read_frame(&self) {
        // The simulated frame is latched by set_touch; nothing to sample.
    }

    fn position(&self) -> f32 {
        self.frame.lock().0
    }

    fn size(&self, _position: f32) -> f32 {
        self.frame.lock().1
    }
}

/// Character-cell display rendered to the log. Keeps the last presented
/// frame behind a shared handle so tests and the status command can read it.
pub struct ConsoleDisplay {
    cells: Vec<(u8, u8, String)>,
    frame: Arc<Mutex<String>>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self {
            cells: Vec::new(),
            frame: Arc::new(Mutex::new(String::new())),
        }
    }

    /// Handle to the last presented frame contents.
    pub fn frame_handle(&self) -> Arc<Mutex<String>> {
        Arc::clone(&self.frame)
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConsoleDisplay {
    fn clear(&mut self) {
        self.cells.clear();
    }

    fn draw_text(&mut self, x: u8, y: u8, _scale: u8, text: &str) {
        self.cells.push((x, y, text.to_string()));
    }

    fn present(&mut self) {
        let mut rows = self.cells.clone();
        rows.sort_by_key(|&(x, y, _)| (y, x));
        let rendered = rows
            .iter()
            .map(|(_, _, text)| text.as_str())
            .collect::<Vec<_>>()
            .join(" | ");

        let mut frame = self.frame.lock();
        if *frame != rendered {
            debug!("display: {}", rendered);
            *frame = rendered;
        }
    }
}

/// USB MIDI stand-in with a settable connection state (defaults to
/// not-mounted, like a device waiting for enumeration).
pub struct SimUsb {
    state: Mutex<UsbState>,
}

impl SimUsb {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(UsbState::NotMounted),
        }
    }

    pub fn set_state(&self, state: UsbState) {
        info!("usb state -> {:?}", state);
        *self.state.lock() = state;
    }
}

impl Default for SimUsb {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSink for SimUsb {
    fn write_packet(&self, bytes: &[u8]) {
        trace!("usb <- {}", format_hex(bytes));
    }
}

impl UsbMidi for SimUsb {
    fn poll(&self) {}

    fn mounted(&self) -> bool {
        matches!(*self.state.lock(), UsbState::Mounted)
    }

    fn state(&self) -> UsbState {
        *self.state.lock()
    }
}

/// BLE MIDI stand-in: packets go to the trace log and nowhere else.
pub struct LogBle;

impl MidiSink for LogBle {
    fn write_packet(&self, bytes: &[u8]) {
        trace!("ble <- {}", format_hex(bytes));
    }
}

/// Serial line stand-in for the TRS wire.
pub struct LogSerialLine;

impl SerialLine for LogSerialLine {
    fn write_byte(&self, byte: u8) {
        trace!("trs <- {:02X}", byte);
    }
}

/// Mux control stand-in.
pub struct LogMux;

impl MuxControl for LogMux {
    fn set_lines(&self, in1: bool, in2: bool) {
        debug!("trs mux lines: {} {}", in1 as u8, in2 as u8);
    }
}

/// Heartbeat LED stand-in.
pub struct LogLed {
    on: AtomicBool,
}

impl LogLed {
    pub fn new() -> Self {
        Self {
            on: AtomicBool::new(false),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Relaxed)
    }
}

impl Default for LogLed {
    fn default() -> Self {
        Self::new()
    }
}

impl Led for LogLed {
    fn set(&self, on: bool) {
        self.on.store(on, Ordering::Relaxed);
    }
}

/// Bootloader stand-in counting reboot requests.
pub struct SimBootloader {
    requests: AtomicUsize,
}

impl SimBootloader {
    pub fn new() -> Self {
        Self {
            requests: AtomicUsize::new(0),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Default for SimBootloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Bootloader for SimBootloader {
    fn reboot_to_bootloader(&self) {
        info!("reboot into firmware-update mode requested");
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Sink capturing every packet it receives, in order.
pub struct RecordingSink {
    packets: Mutex<Vec<Vec<u8>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            packets: Mutex::new(Vec::new()),
        }
    }

    pub fn packets(&self) -> Vec<Vec<u8>> {
        self.packets.lock().clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiSink for RecordingSink {
    fn write_packet(&self, bytes: &[u8]) {
        self.packets.lock().push(bytes.to_vec());
    }
}
