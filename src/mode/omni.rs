//! Omni mode: everything on the surface is forwarded raw. Keys become
//! notes, buttons become switch CCs, the strip becomes the mod wheel.
//! Useful as a generic controller surface for external mapping.

use super::{EventCx, Mode};
use crate::hw::Display;
use crate::midi::NoteStatus;

// General purpose controllers 80..
const BUTTON_CC_BASE: u8 = 80;
const MOD_WHEEL_CC: u8 = 1;

pub struct OmniMode {
    channel: u8,
    velocity: u8,
    root: u8,
}

impl OmniMode {
    pub fn new(midi: &crate::config::MidiConfig) -> Self {
        Self {
            channel: midi.channel,
            velocity: midi.velocity,
            root: midi.root_note,
        }
    }

    fn note_for_key(&self, key: u8) -> u8 {
        (self.root as i16 + key as i16).clamp(0, 127) as u8
    }
}

impl Mode for OmniMode {
    fn setup(&mut self, _cx: &mut EventCx) {}

    fn teardown(&mut self, cx: &mut EventCx) {
        cx.midi.send_cc(self.channel, MOD_WHEEL_CC, 0);
    }

    fn draw(&mut self, display: &mut dyn Display) {
        display.draw_text(0, 0, 2, "Omni");
    }

    fn key_down(&mut self, key: u8, cx: &mut EventCx) {
        cx.midi
            .send_note(NoteStatus::On, self.channel, self.note_for_key(key), self.velocity);
    }

    fn key_up(&mut self, key: u8, cx: &mut EventCx) {
        cx.midi
            .send_note(NoteStatus::Off, self.channel, self.note_for_key(key), 0);
    }

    fn button_down(&mut self, button: u8, cx: &mut EventCx) {
        cx.midi
            .send_cc(self.channel, BUTTON_CC_BASE.saturating_add(button), 127);
    }

    fn button_up(&mut self, button: u8, cx: &mut EventCx) {
        cx.midi
            .send_cc(self.channel, BUTTON_CC_BASE.saturating_add(button), 0);
    }

    fn touch_down(&mut self, position: f32, _size: f32, cx: &mut EventCx) {
        let value = (position.clamp(0.0, 1.0) * 127.0) as u8;
        cx.midi.send_cc(self.channel, MOD_WHEEL_CC, value);
    }

    fn touch_up(&mut self, cx: &mut EventCx) {
        cx.midi.send_cc(self.channel, MOD_WHEEL_CC, 0);
    }
}
