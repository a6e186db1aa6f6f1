//! Debounced control-button and key-row scanners
//!
//! Both scanners sample their lines once per fast-loop tick and emit edge
//! events. Controls support optional double-click disambiguation; the key
//! row is monophonic: only the last-pressed key is tracked, and a new press
//! preempts tracking of the previous key without requiring its release.

use std::time::{Duration, Instant};

use tracing::debug;

use super::{InputDescriptor, InputEvent};
use crate::hw::InputPort;

/// Pending click state. At most one input is tracked at a time; the count is
/// only meaningful until the inter-click window elapses.
struct ClickTracker {
    input: Option<u8>,
    clicks: u8,
    last_edge: Instant,
}

impl ClickTracker {
    fn idle(now: Instant) -> Self {
        Self {
            input: None,
            clicks: 0,
            last_edge: now,
        }
    }
}

/// Scanner for the discrete control buttons.
pub struct ControlScanner {
    inputs: Vec<InputDescriptor>,
    /// Last sampled level per line, `true` = released (pull-up idle-high).
    levels: Vec<bool>,
    maintenance_combo: [u8; 3],
    window: Duration,
    tracker: ClickTracker,
}

impl ControlScanner {
    pub fn new(inputs: Vec<InputDescriptor>, maintenance_combo: [u8; 3], window: Duration) -> Self {
        let levels = vec![true; inputs.len()];
        Self {
            inputs,
            levels,
            maintenance_combo,
            window,
            tracker: ClickTracker::idle(Instant::now()),
        }
    }

    /// Sample every control line once and append the resulting events.
    pub fn scan(&mut self, port: &dyn InputPort, now: Instant, events: &mut Vec<InputEvent>) {
        // Out-of-band click resolution: once the window since the last
        // tracked click elapses, the accumulated count becomes the event.
        if let Some(input) = self.tracker.input {
            if now.duration_since(self.tracker.last_edge) > self.window {
                match self.tracker.clicks {
                    0 => {}
                    1 => events.push(InputEvent::ButtonDown(input)),
                    _ => events.push(InputEvent::ButtonDoubleDown(input)),
                }
                self.tracker = ClickTracker::idle(now);
            }
        }

        for (i, desc) in self.inputs.iter().enumerate() {
            let level = port.read_line(i);
            let was = self.levels[i];

            if was && !level {
                // Falling edge: press (active low)
                if desc.double_click {
                    if self.tracker.input == Some(desc.id)
                        && now.duration_since(self.tracker.last_edge) < self.window
                    {
                        self.tracker.clicks += 1;
                        self.tracker.last_edge = now;
                    } else {
                        // A different input interrupts tracking
                        self.tracker = ClickTracker {
                            input: Some(desc.id),
                            clicks: 1,
                            last_edge: now,
                        };
                    }
                } else {
                    // Plain controls stay latency-free: down fires on the
                    // edge itself, bypassing the click window.
                    events.push(InputEvent::ButtonDown(desc.id));
                }
            } else if !was && level {
                // Rising edge: release, independent of click tracking
                events.push(InputEvent::ButtonUp(desc.id));
            }

            self.levels[i] = level;
        }

        if self.maintenance_combo_active() {
            debug!("maintenance input combination observed");
            events.push(InputEvent::MaintenanceCombo);
        }
    }

    /// The three designated inputs simultaneously in their released state
    /// open the firmware escape hatch.
    fn maintenance_combo_active(&self) -> bool {
        self.maintenance_combo.iter().all(|&id| {
            self.inputs
                .iter()
                .position(|d| d.id == id)
                .map(|i| self.levels[i])
                .unwrap_or(false)
        })
    }
}

/// Scanner for the momentary key row. Monophonic: at most one new press is
/// registered per tick, and a release is honored only for the key pressed
/// last.
pub struct KeyScanner {
    levels: Vec<bool>,
    last_key: Option<u8>,
}

impl KeyScanner {
    pub fn new(keys: usize) -> Self {
        Self {
            levels: vec![true; keys],
            last_key: None,
        }
    }

    pub fn scan(&mut self, port: &dyn InputPort, events: &mut Vec<InputEvent>) {
        for i in 0..self.levels.len() {
            let level = port.read_line(i);
            let was = self.levels[i];

            if was && !level {
                events.push(InputEvent::KeyDown(i as u8));
                self.last_key = Some(i as u8);
                self.levels[i] = level;
                // One new press per tick; remaining keys wait for the next scan
                break;
            } else if !was && level && self.last_key == Some(i as u8) {
                events.push(InputEvent::KeyUp(i as u8));
            }

            self.levels[i] = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::SimInput;
    use proptest::prelude::*;

    const WINDOW: Duration = Duration::from_millis(300);

    fn plain_controls(n: u8) -> Vec<InputDescriptor> {
        (0..n)
            .map(|id| InputDescriptor {
                id,
                double_click: false,
            })
            .collect()
    }

    fn scanner_with_dc() -> (ControlScanner, SimInput) {
        // Control 0 is plain, control 1 is double-click-aware
        let inputs = vec![
            InputDescriptor {
                id: 0,
                double_click: false,
            },
            InputDescriptor {
                id: 1,
                double_click: true,
            },
        ];
        // Combo on ids that don't exist so it never fires here
        (
            ControlScanner::new(inputs, [10, 11, 12], WINDOW),
            SimInput::new(2),
        )
    }

    fn step(
        scanner: &mut ControlScanner,
        port: &SimInput,
        now: Instant,
    ) -> Vec<InputEvent> {
        let mut events = Vec::new();
        scanner.scan(port, now, &mut events);
        events
    }

    #[test]
    fn test_plain_button_down_is_synchronous() {
        let (mut scanner, port) = scanner_with_dc();
        let t0 = Instant::now();

        port.set_pressed(0, true);
        assert_eq!(step(&mut scanner, &port, t0), vec![InputEvent::ButtonDown(0)]);

        port.set_pressed(0, false);
        assert_eq!(step(&mut scanner, &port, t0), vec![InputEvent::ButtonUp(0)]);
    }

    #[test]
    fn test_single_click_resolves_to_plain_down_after_window() {
        let (mut scanner, port) = scanner_with_dc();
        let t0 = Instant::now();

        port.set_pressed(1, true);
        assert!(step(&mut scanner, &port, t0).is_empty());
        port.set_pressed(1, false);
        assert_eq!(step(&mut scanner, &port, t0), vec![InputEvent::ButtonUp(1)]);

        // Nothing until the window elapses
        assert!(step(&mut scanner, &port, t0 + Duration::from_millis(200)).is_empty());
        assert_eq!(
            step(&mut scanner, &port, t0 + Duration::from_millis(400)),
            vec![InputEvent::ButtonDown(1)]
        );
        // Resolution happens exactly once
        assert!(step(&mut scanner, &port, t0 + Duration::from_millis(800)).is_empty());
    }

    #[test]
    fn test_double_click_resolves_once() {
        let (mut scanner, port) = scanner_with_dc();
        let t0 = Instant::now();

        // Press / release / press / release inside the window
        port.set_pressed(1, true);
        assert!(step(&mut scanner, &port, t0).is_empty());
        port.set_pressed(1, false);
        step(&mut scanner, &port, t0 + Duration::from_millis(50));
        port.set_pressed(1, true);
        assert!(step(&mut scanner, &port, t0 + Duration::from_millis(100)).is_empty());
        port.set_pressed(1, false);
        step(&mut scanner, &port, t0 + Duration::from_millis(150));

        let resolved = step(&mut scanner, &port, t0 + Duration::from_millis(600));
        assert_eq!(resolved, vec![InputEvent::ButtonDoubleDown(1)]);
    }

    #[test]
    fn test_triple_click_yields_one_double_and_no_plain_down() {
        let (mut scanner, port) = scanner_with_dc();
        let t0 = Instant::now();
        let mut all = Vec::new();

        for i in 0..3u64 {
            port.set_pressed(1, true);
            all.extend(step(&mut scanner, &port, t0 + Duration::from_millis(i * 80)));
            port.set_pressed(1, false);
            all.extend(step(
                &mut scanner,
                &port,
                t0 + Duration::from_millis(i * 80 + 40),
            ));
        }
        all.extend(step(&mut scanner, &port, t0 + Duration::from_millis(900)));

        let doubles = all
            .iter()
            .filter(|e| matches!(e, InputEvent::ButtonDoubleDown(1)))
            .count();
        let plain = all
            .iter()
            .filter(|e| matches!(e, InputEvent::ButtonDown(1)))
            .count();
        assert_eq!(doubles, 1);
        assert_eq!(plain, 0);
    }

    #[test]
    fn test_up_fires_regardless_of_click_tracking() {
        let (mut scanner, port) = scanner_with_dc();
        let t0 = Instant::now();

        port.set_pressed(1, true);
        step(&mut scanner, &port, t0);
        port.set_pressed(1, false);
        let events = step(&mut scanner, &port, t0 + Duration::from_millis(10));
        assert_eq!(events, vec![InputEvent::ButtonUp(1)]);
    }

    #[test]
    fn test_maintenance_combo_on_released_inputs() {
        let inputs = plain_controls(5);
        let mut scanner = ControlScanner::new(inputs, [0, 2, 4], WINDOW);
        let port = SimInput::new(5);

        // All lines idle released: combo observed immediately
        let events = step(&mut scanner, &port, Instant::now());
        assert!(events.contains(&InputEvent::MaintenanceCombo));

        // Holding one combo input pressed suppresses it
        port.set_pressed(2, true);
        let events = step(&mut scanner, &port, Instant::now());
        assert!(!events.contains(&InputEvent::MaintenanceCombo));
    }

    #[test]
    fn test_key_row_is_monophonic() {
        let mut scanner = KeyScanner::new(8);
        let port = SimInput::new(8);
        let mut events = Vec::new();

        port.set_pressed(2, true);
        scanner.scan(&port, &mut events);
        assert_eq!(events, vec![InputEvent::KeyDown(2)]);

        // A later press preempts tracking of key 2
        events.clear();
        port.set_pressed(5, true);
        scanner.scan(&port, &mut events);
        assert_eq!(events, vec![InputEvent::KeyDown(5)]);

        // Releasing the preempted key is not honored
        events.clear();
        port.set_pressed(2, false);
        scanner.scan(&port, &mut events);
        assert!(events.is_empty());

        // Releasing the tracked key is
        events.clear();
        port.set_pressed(5, false);
        scanner.scan(&port, &mut events);
        assert_eq!(events, vec![InputEvent::KeyUp(5)]);
    }

    #[test]
    fn test_key_row_one_press_per_tick() {
        let mut scanner = KeyScanner::new(8);
        let port = SimInput::new(8);
        let mut events = Vec::new();

        port.set_pressed(1, true);
        port.set_pressed(3, true);
        scanner.scan(&port, &mut events);
        assert_eq!(events, vec![InputEvent::KeyDown(1)]);

        // The second press surfaces on the next tick
        events.clear();
        scanner.scan(&port, &mut events);
        assert_eq!(events, vec![InputEvent::KeyDown(3)]);
    }

    proptest! {
        /// For a plain control, downs and ups strictly alternate starting
        /// with a down, whatever the level sequence sampled.
        #[test]
        fn prop_plain_down_up_alternate(levels in proptest::collection::vec(any::<bool>(), 1..64)) {
            let mut scanner = ControlScanner::new(plain_controls(1), [10, 11, 12], WINDOW);
            let port = SimInput::new(1);
            let t0 = Instant::now();
            let mut expect_down = true;

            for (tick, pressed) in levels.into_iter().enumerate() {
                port.set_pressed(0, pressed);
                let mut events = Vec::new();
                scanner.scan(&port, t0 + Duration::from_millis(tick as u64 * 10), &mut events);

                for event in events {
                    match event {
                        InputEvent::ButtonDown(0) => {
                            prop_assert!(expect_down, "down without preceding up");
                            expect_down = false;
                        }
                        InputEvent::ButtonUp(0) => {
                            prop_assert!(!expect_down, "up without preceding down");
                            expect_down = true;
                        }
                        _ => {}
                    }
                }
            }
        }
    }
}
