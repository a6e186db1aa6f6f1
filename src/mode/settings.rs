//! Settings mode: picks the next interaction mode and toggles the TRS jack.
//!
//! Button 0 cycles the selection through the musical modes, button 1 applies
//! it (the render loop performs the actual switch), button 2 toggles the TRS
//! jack routing.

use super::{EventCx, Mode, ModeKind};
use crate::hw::Display;
use crate::transport::TrsJack;

const CYCLE: [ModeKind; 4] = [
    ModeKind::Compose,
    ModeKind::Strum,
    ModeKind::Perform,
    ModeKind::Omni,
];

pub struct SettingsMode {
    selection: usize,
    jack: TrsJack,
}

impl SettingsMode {
    pub fn new() -> Self {
        Self {
            selection: 0,
            jack: TrsJack::A,
        }
    }
}

impl Default for SettingsMode {
    fn default() -> Self {
        Self::new()
    }
}

impl Mode for SettingsMode {
    fn setup(&mut self, cx: &mut EventCx) {
        self.jack = cx.midi.trs_jack();
    }

    fn teardown(&mut self, _cx: &mut EventCx) {}

    fn draw(&mut self, display: &mut dyn Display) {
        display.draw_text(0, 0, 2, "Settings");
        display.draw_text(0, 24, 1, &format!("> {}", CYCLE[self.selection]));
        display.draw_text(0, 40, 1, &format!("trs {:?}", self.jack));
    }

    fn button_down(&mut self, button: u8, cx: &mut EventCx) {
        match button {
            0 => self.selection = (self.selection + 1) % CYCLE.len(),
            1 => cx.flags.request_mode(CYCLE[self.selection]),
            2 => {
                self.jack = self.jack.toggled();
                cx.midi.select_trs_jack(self.jack);
            }
            _ => {}
        }
    }

    // Double-click already lives here; keep the gesture inert.
    fn button_double_down(&mut self, _button: u8, _cx: &mut EventCx) {}
}
