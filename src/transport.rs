//! MIDI transport fan-out
//!
//! Every musical action is encoded once and the identical byte sequence is
//! written to the three physical transports in a fixed order: USB streaming
//! endpoint, TRS serial line, Bluetooth MIDI stream. Writes are best-effort;
//! a disconnected transport absorbs its copy.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::hw::{MidiSink, MuxControl, SerialLine};
use crate::midi::{format_hex, MidiMessage, NoteStatus};

/// Physical TRS jack preset selected by the output mux.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrsJack {
    A,
    B,
}

impl TrsJack {
    pub fn toggled(self) -> Self {
        match self {
            TrsJack::A => TrsJack::B,
            TrsJack::B => TrsJack::A,
        }
    }

    /// Levels for the two analog-switch control lines.
    fn mux_lines(self) -> (bool, bool) {
        match self {
            TrsJack::A => (false, false),
            TrsJack::B => (true, true),
        }
    }
}

/// TRS serial transport: bytes go out one at a time over the line, and a
/// 2-position mux routes the wire to one of two physical jack presets.
/// Switching the jack changes only the electrical routing, never which
/// logical transport receives data.
pub struct TrsPort {
    line: Box<dyn SerialLine>,
    mux: Box<dyn MuxControl>,
    jack: Mutex<TrsJack>,
}

impl TrsPort {
    pub fn new(line: Box<dyn SerialLine>, mux: Box<dyn MuxControl>, jack: TrsJack) -> Self {
        let (in1, in2) = jack.mux_lines();
        mux.set_lines(in1, in2);

        Self {
            line,
            mux,
            jack: Mutex::new(jack),
        }
    }

    pub fn select_jack(&self, jack: TrsJack) {
        let (in1, in2) = jack.mux_lines();
        self.mux.set_lines(in1, in2);
        *self.jack.lock() = jack;
        debug!("TRS jack -> {:?}", jack);
    }

    pub fn jack(&self) -> TrsJack {
        *self.jack.lock()
    }
}

impl MidiSink for TrsPort {
    fn write_packet(&self, bytes: &[u8]) {
        for &byte in bytes {
            self.line.write_byte(byte);
        }
    }
}

/// Fan-out over the three MIDI transports.
pub struct MidiFanout {
    usb: Arc<dyn MidiSink>,
    trs: Arc<TrsPort>,
    ble: Arc<dyn MidiSink>,
}

impl MidiFanout {
    pub fn new(usb: Arc<dyn MidiSink>, trs: Arc<TrsPort>, ble: Arc<dyn MidiSink>) -> Self {
        Self { usb, trs, ble }
    }

    /// Encode once, write everywhere. Fixed order: USB, TRS, BLE.
    pub fn send(&self, msg: MidiMessage) {
        let bytes = msg.encode();
        trace!("midi out: {} ({})", format_hex(&bytes), msg);

        self.usb.write_packet(&bytes);
        self.trs.write_packet(&bytes);
        self.ble.write_packet(&bytes);
    }

    pub fn send_note(&self, status: NoteStatus, channel: u8, note: u8, velocity: u8) {
        self.send(MidiMessage::note(status, channel, note, velocity));
    }

    /// Expand a chord into one note message per entry, transmitted in array
    /// order. Notes go out sequentially; there is no simultaneity guarantee
    /// across them.
    pub fn send_chord(&self, status: NoteStatus, channel: u8, notes: &[u8], velocity: u8) {
        for &note in notes {
            self.send_note(status, channel, note, velocity);
        }
    }

    pub fn send_cc(&self, channel: u8, cc: u8, value: u8) {
        self.send(MidiMessage::ControlChange { channel, cc, value });
    }

    pub fn send_poly_pressure(&self, channel: u8, note: u8, pressure: u8) {
        self.send(MidiMessage::PolyPressure {
            channel,
            note,
            pressure,
        });
    }

    pub fn send_channel_pressure(&self, channel: u8, pressure: u8) {
        self.send(MidiMessage::ChannelPressure { channel, pressure });
    }

    pub fn select_trs_jack(&self, jack: TrsJack) {
        self.trs.select_jack(jack);
    }

    pub fn trs_jack(&self) -> TrsJack {
        self.trs.jack()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::RecordingSink;

    struct RecordingLine {
        bytes: Mutex<Vec<u8>>,
    }

    impl RecordingLine {
        fn new() -> Self {
            Self {
                bytes: Mutex::new(Vec::new()),
            }
        }
    }

    impl SerialLine for Arc<RecordingLine> {
        fn write_byte(&self, byte: u8) {
            self.bytes.lock().push(byte);
        }
    }

    struct RecordingMux {
        lines: Mutex<Vec<(bool, bool)>>,
    }

    impl RecordingMux {
        fn new() -> Self {
            Self {
                lines: Mutex::new(Vec::new()),
            }
        }
    }

    impl MuxControl for Arc<RecordingMux> {
        fn set_lines(&self, in1: bool, in2: bool) {
            self.lines.lock().push((in1, in2));
        }
    }

    fn make_fanout() -> (MidiFanout, Arc<RecordingSink>, Arc<RecordingLine>, Arc<RecordingSink>) {
        let usb = Arc::new(RecordingSink::new());
        let ble = Arc::new(RecordingSink::new());
        let line = Arc::new(RecordingLine::new());
        let mux = Arc::new(RecordingMux::new());
        let trs = Arc::new(TrsPort::new(
            Box::new(Arc::clone(&line)),
            Box::new(mux),
            TrsJack::A,
        ));

        let fanout = MidiFanout::new(usb.clone(), trs, ble.clone());
        (fanout, usb, line, ble)
    }

    #[test]
    fn test_identical_bytes_on_all_transports() {
        let (fanout, usb, line, ble) = make_fanout();

        fanout.send_note(NoteStatus::On, 5, 60, 100);

        let expected = vec![0x95u8, 60, 100];
        assert_eq!(usb.packets(), vec![expected.clone()]);
        assert_eq!(ble.packets(), vec![expected.clone()]);
        // TRS receives the same bytes, one at a time
        assert_eq!(*line.bytes.lock(), expected);
    }

    #[test]
    fn test_chord_is_sequential_per_transport() {
        let (fanout, usb, line, ble) = make_fanout();

        fanout.send_chord(NoteStatus::On, 0, &[60, 64, 67], 90);

        let expected: Vec<Vec<u8>> = vec![
            vec![0x90, 60, 90],
            vec![0x90, 64, 90],
            vec![0x90, 67, 90],
        ];
        assert_eq!(usb.packets(), expected);
        assert_eq!(ble.packets(), expected);
        assert_eq!(
            *line.bytes.lock(),
            vec![0x90, 60, 90, 0x90, 64, 90, 0x90, 67, 90]
        );
    }

    #[test]
    fn test_channel_pressure_two_bytes_everywhere() {
        let (fanout, usb, line, _ble) = make_fanout();

        fanout.send_channel_pressure(2, 55);

        assert_eq!(usb.packets(), vec![vec![0xD2, 55]]);
        assert_eq!(*line.bytes.lock(), vec![0xD2, 55]);
    }

    #[test]
    fn test_trs_jack_toggle_drives_mux_lines() {
        let line = Arc::new(RecordingLine::new());
        let mux = Arc::new(RecordingMux::new());
        let trs = TrsPort::new(
            Box::new(Arc::clone(&line)),
            Box::new(Arc::clone(&mux)),
            TrsJack::A,
        );

        assert_eq!(trs.jack(), TrsJack::A);
        trs.select_jack(TrsJack::B);
        assert_eq!(trs.jack(), TrsJack::B);

        // Construction applied jack A, the switch applied jack B
        assert_eq!(*mux.lines.lock(), vec![(false, false), (true, true)]);
    }

    #[test]
    fn test_jack_switch_does_not_affect_data_path() {
        let (fanout, usb, line, _ble) = make_fanout();

        fanout.send_cc(0, 7, 100);
        fanout.select_trs_jack(TrsJack::B);
        fanout.send_cc(0, 7, 101);

        assert_eq!(usb.packets(), vec![vec![0xB0, 7, 100], vec![0xB0, 7, 101]]);
        assert_eq!(*line.bytes.lock(), vec![0xB0, 7, 100, 0xB0, 7, 101]);
    }
}
