//! Touch strip event generation
//!
//! The sensor reports a continuous position (negative = no touch). While a
//! touch is active the tracker re-emits a down/move event every tick; the
//! active-to-inactive transition emits exactly one up event.

use super::InputEvent;
use crate::hw::TouchSensor;

pub struct TouchTracker {
    active: bool,
}

impl TouchTracker {
    pub fn new() -> Self {
        Self { active: false }
    }

    pub fn poll(&mut self, sensor: &dyn TouchSensor, events: &mut Vec<InputEvent>) {
        sensor.read_frame();
        let position = sensor.position();

        let active = position >= 0.0;
        if active {
            events.push(InputEvent::TouchDown {
                position,
                size: sensor.size(position),
            });
        } else if self.active {
            events.push(InputEvent::TouchUp);
        }
        self.active = active;
    }
}

impl Default for TouchTracker {
    fn default() -> Self {
        Self::new()
    }
}
