//! MIDI message types and encoding
//!
//! The control core only ever emits MIDI: a message is constructed, encoded
//! and handed to the transport fan-out per call, never stored or parsed back.

use std::fmt;

/// Status nibble selector for note-class messages sent through the fan-out
/// chord/note helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteStatus {
    On,
    Off,
}

/// MIDI messages produced by the interaction modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note On: channel (0-15), note (0-127), velocity (0-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127). Two bytes on the wire.
    ChannelPressure { channel: u8, pressure: u8 },
}

impl MidiMessage {
    /// Build a note message for the given status nibble.
    pub fn note(status: NoteStatus, channel: u8, note: u8, velocity: u8) -> Self {
        match status {
            NoteStatus::On => MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            },
            NoteStatus::Off => MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            },
        }
    }

    /// Encode the message to raw MIDI bytes.
    ///
    /// The channel is masked into the low nibble of the status byte; an
    /// out-of-range channel wraps silently. Data bytes are masked to 7 bits
    /// the same way, never rejected.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => {
                vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
        }
    }

    /// Channel the message is addressed to (0-15, pre-mask)
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOn { channel, .. }
            | MidiMessage::NoteOff { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. } => channel,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOff {
                channel,
                note,
                velocity,
            } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::PolyPressure {
                channel,
                note,
                pressure,
            } => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
        }
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_note_on() {
        let msg = MidiMessage::NoteOn {
            channel: 5,
            note: 60,
            velocity: 100,
        };

        assert_eq!(msg.encode(), vec![0x95, 60, 100]);
    }

    #[test]
    fn test_encode_note_off() {
        let msg = MidiMessage::NoteOff {
            channel: 0,
            note: 64,
            velocity: 0,
        };

        assert_eq!(msg.encode(), vec![0x80, 64, 0]);
    }

    #[test]
    fn test_channel_wraps_silently() {
        // Channel 21 & 0x0F == 5; out-of-range channels wrap, never error
        let msg = MidiMessage::NoteOn {
            channel: 21,
            note: 60,
            velocity: 100,
        };

        assert_eq!(msg.encode()[0], 0x95);
    }

    #[test]
    fn test_data_bytes_masked() {
        let msg = MidiMessage::ControlChange {
            channel: 0,
            cc: 200,
            value: 255,
        };

        assert_eq!(msg.encode(), vec![0xB0, 200 & 0x7F, 255 & 0x7F]);
    }

    #[test]
    fn test_channel_pressure_is_two_bytes() {
        let msg = MidiMessage::ChannelPressure {
            channel: 3,
            pressure: 90,
        };

        assert_eq!(msg.encode(), vec![0xD3, 90]);
    }

    #[test]
    fn test_note_constructor() {
        assert_eq!(
            MidiMessage::note(NoteStatus::On, 1, 60, 90),
            MidiMessage::NoteOn {
                channel: 1,
                note: 60,
                velocity: 90
            }
        );
        assert_eq!(
            MidiMessage::note(NoteStatus::Off, 1, 60, 0),
            MidiMessage::NoteOff {
                channel: 1,
                note: 60,
                velocity: 0
            }
        );
    }

    #[test]
    fn test_format_hex() {
        assert_eq!(format_hex(&[0x95, 60, 100]), "95 3C 64");
    }
}
