//! Perform mode: keys play directly, touch pressure rides the channel.

use super::{EventCx, Mode};
use crate::hw::Display;
use crate::midi::NoteStatus;

pub struct PerformMode {
    channel: u8,
    velocity: u8,
    root: u8,
    sounding: Option<u8>,
}

impl PerformMode {
    pub fn new(midi: &crate::config::MidiConfig) -> Self {
        Self {
            channel: midi.channel,
            velocity: midi.velocity,
            root: midi.root_note,
            sounding: None,
        }
    }
}

impl Mode for PerformMode {
    fn setup(&mut self, _cx: &mut EventCx) {
        self.sounding = None;
    }

    fn teardown(&mut self, cx: &mut EventCx) {
        if let Some(note) = self.sounding.take() {
            cx.midi.send_note(NoteStatus::Off, self.channel, note, 0);
        }
        cx.midi.send_channel_pressure(self.channel, 0);
    }

    fn draw(&mut self, display: &mut dyn Display) {
        display.draw_text(0, 0, 2, "Perform");
    }

    fn key_down(&mut self, key: u8, cx: &mut EventCx) {
        if let Some(prev) = self.sounding.take() {
            cx.midi.send_note(NoteStatus::Off, self.channel, prev, 0);
        }
        let note = (self.root as i16 + key as i16).clamp(0, 127) as u8;
        cx.midi.send_note(NoteStatus::On, self.channel, note, self.velocity);
        self.sounding = Some(note);
    }

    fn key_up(&mut self, key: u8, cx: &mut EventCx) {
        let note = (self.root as i16 + key as i16).clamp(0, 127) as u8;
        if self.sounding == Some(note) {
            self.sounding = None;
            cx.midi.send_note(NoteStatus::Off, self.channel, note, 0);
        }
    }

    fn touch_down(&mut self, position: f32, _size: f32, cx: &mut EventCx) {
        let pressure = (position.clamp(0.0, 1.0) * 127.0) as u8;
        cx.midi.send_channel_pressure(self.channel, pressure);
    }

    fn touch_up(&mut self, cx: &mut EventCx) {
        cx.midi.send_channel_pressure(self.channel, 0);
    }
}
