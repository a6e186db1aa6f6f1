//! Compose mode: the key row plays notes, the touch strip adds polyphonic
//! pressure on the sounding note, buttons shift the octave.

use super::{EventCx, Mode};
use crate::hw::Display;
use crate::midi::NoteStatus;

pub struct ComposeMode {
    channel: u8,
    velocity: u8,
    root: u8,
    octave: i8,
    sounding: Option<u8>,
}

impl ComposeMode {
    pub fn new(midi: &crate::config::MidiConfig) -> Self {
        Self {
            channel: midi.channel,
            velocity: midi.velocity,
            root: midi.root_note,
            octave: 0,
            sounding: None,
        }
    }

    fn note_for_key(&self, key: u8) -> u8 {
        (self.root as i16 + self.octave as i16 * 12 + key as i16).clamp(0, 127) as u8
    }

    fn release_sounding(&mut self, cx: &mut EventCx) {
        if let Some(note) = self.sounding.take() {
            cx.midi.send_note(NoteStatus::Off, self.channel, note, 0);
        }
    }
}

impl Mode for ComposeMode {
    fn setup(&mut self, _cx: &mut EventCx) {
        self.octave = 0;
        self.sounding = None;
    }

    fn teardown(&mut self, cx: &mut EventCx) {
        self.release_sounding(cx);
    }

    fn draw(&mut self, display: &mut dyn Display) {
        display.draw_text(0, 0, 2, "Compose");
        display.draw_text(0, 24, 1, &format!("oct {:+}", self.octave));
    }

    fn key_down(&mut self, key: u8, cx: &mut EventCx) {
        // Monophonic row: a new press takes over the voice
        self.release_sounding(cx);
        let note = self.note_for_key(key);
        cx.midi.send_note(NoteStatus::On, self.channel, note, self.velocity);
        self.sounding = Some(note);
    }

    fn key_up(&mut self, key: u8, cx: &mut EventCx) {
        if self.sounding == Some(self.note_for_key(key)) {
            self.release_sounding(cx);
        }
    }

    fn button_down(&mut self, button: u8, _cx: &mut EventCx) {
        match button {
            0 => self.octave = (self.octave - 1).max(-3),
            1 => self.octave = (self.octave + 1).min(3),
            _ => {}
        }
    }

    fn touch_down(&mut self, position: f32, _size: f32, cx: &mut EventCx) {
        if let Some(note) = self.sounding {
            let pressure = (position.clamp(0.0, 1.0) * 127.0) as u8;
            cx.midi.send_poly_pressure(self.channel, note, pressure);
        }
    }

    fn touch_up(&mut self, cx: &mut EventCx) {
        if let Some(note) = self.sounding {
            cx.midi.send_poly_pressure(self.channel, note, 0);
        }
    }
}
