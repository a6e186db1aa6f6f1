//! Strum mode: a held key arms a note, sweeping the touch strip strums it
//! across octave zones.

use super::{EventCx, Mode};
use crate::hw::Display;
use crate::midi::NoteStatus;

const ZONES: u8 = 3;

pub struct StrumMode {
    channel: u8,
    velocity: u8,
    root: u8,
    armed: Option<u8>,
    last_zone: Option<u8>,
    sounding: Vec<u8>,
}

impl StrumMode {
    pub fn new(midi: &crate::config::MidiConfig) -> Self {
        Self {
            channel: midi.channel,
            velocity: midi.velocity,
            root: midi.root_note,
            armed: None,
            last_zone: None,
            sounding: Vec::new(),
        }
    }

    fn flush(&mut self, cx: &mut EventCx) {
        for note in self.sounding.drain(..) {
            cx.midi.send_note(NoteStatus::Off, self.channel, note, 0);
        }
    }
}

impl Mode for StrumMode {
    fn setup(&mut self, _cx: &mut EventCx) {
        self.armed = None;
        self.last_zone = None;
        self.sounding.clear();
    }

    fn teardown(&mut self, cx: &mut EventCx) {
        self.flush(cx);
    }

    fn draw(&mut self, display: &mut dyn Display) {
        display.draw_text(0, 0, 2, "Strum");
        match self.armed {
            Some(key) => display.draw_text(0, 24, 1, &format!("key {}", key)),
            None => display.draw_text(0, 24, 1, "hold a key"),
        }
    }

    fn key_down(&mut self, key: u8, _cx: &mut EventCx) {
        self.armed = Some(key);
    }

    fn key_up(&mut self, key: u8, cx: &mut EventCx) {
        if self.armed == Some(key) {
            self.armed = None;
            self.flush(cx);
        }
    }

    fn touch_down(&mut self, position: f32, _size: f32, cx: &mut EventCx) {
        let Some(key) = self.armed else { return };

        // Crossing into a new zone plucks the armed note one octave apart
        let zone = (position.clamp(0.0, 1.0) * ZONES as f32).min(ZONES as f32 - 1.0) as u8;
        if self.last_zone == Some(zone) {
            return;
        }
        self.last_zone = Some(zone);

        let note =
            (self.root as i16 + key as i16 + zone as i16 * 12).clamp(0, 127) as u8;
        cx.midi.send_note(NoteStatus::On, self.channel, note, self.velocity);
        self.sounding.push(note);
    }

    fn touch_up(&mut self, cx: &mut EventCx) {
        self.last_zone = None;
        self.flush(cx);
    }
}
