//! Dual-context scheduler
//!
//! Two cooperating execution contexts share a handful of flags and the mode
//! bank. The fast loop services USB, scans the discrete inputs and pumps the
//! diagnostic command channel; the render loop polls the touch strip,
//! applies pending mode switches and drives the display. Neither context
//! blocks the other; both throttle with small fixed sleeps.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::info;

use crate::commands::{CommandPort, CommandProcessor, LineBuffer};
use crate::hw::{Bootloader, Display, InputPort, Led, TouchSensor, UsbMidi, UsbState};
use crate::input::{ControlScanner, InputEvent, KeyScanner, TouchTracker};
use crate::mode::{EventCx, ModeBank};
use crate::transport::MidiFanout;

/// Heartbeat blink period per USB connection state.
pub const BLINK_NOT_MOUNTED_MS: u64 = 250;
pub const BLINK_MOUNTED_MS: u64 = 1000;
pub const BLINK_SUSPENDED_MS: u64 = 2500;

/// Process-wide flags crossing the two scheduler contexts.
///
/// Each flag has one writing site per direction and readers that tolerate a
/// one-tick-stale view, so relaxed atomics are sufficient; there is no
/// ordering dependency between the flags.
pub struct SharedFlags {
    /// True for the operating lifetime. Only ever transitions true -> false.
    running: AtomicBool,
    /// Raised by the fast context on the maintenance input combination,
    /// observed by the render context.
    maintenance: AtomicBool,
    /// Desired mode index, written by the active mode or the command
    /// channel, applied by the render context between frames.
    desired_mode: AtomicU8,
    /// Heartbeat period, written by the fast context from the USB state.
    heartbeat_ms: AtomicU64,
}

impl SharedFlags {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            maintenance: AtomicBool::new(false),
            desired_mode: AtomicU8::new(crate::mode::ModeKind::Compose.index() as u8),
            heartbeat_ms: AtomicU64::new(BLINK_NOT_MOUNTED_MS),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn request_maintenance(&self) {
        self.maintenance.store(true, Ordering::Relaxed);
    }

    pub fn maintenance_requested(&self) -> bool {
        self.maintenance.load(Ordering::Relaxed)
    }

    pub fn request_mode(&self, kind: crate::mode::ModeKind) {
        self.desired_mode.store(kind.index() as u8, Ordering::Relaxed);
    }

    pub fn desired_mode(&self) -> crate::mode::ModeKind {
        crate::mode::ModeKind::from_index(self.desired_mode.load(Ordering::Relaxed))
    }

    pub fn set_heartbeat_ms(&self, ms: u64) {
        self.heartbeat_ms.store(ms, Ordering::Relaxed);
    }

    pub fn heartbeat_ms(&self) -> u64 {
        self.heartbeat_ms.load(Ordering::Relaxed)
    }
}

impl Default for SharedFlags {
    fn default() -> Self {
        Self::new()
    }
}

/// Fast context: USB housekeeping, input scanning, LED heartbeat, command
/// channel pump.
pub struct FastLoop {
    pub flags: Arc<SharedFlags>,
    pub bank: Arc<Mutex<ModeBank>>,
    pub midi: Arc<MidiFanout>,
    pub usb: Arc<dyn UsbMidi>,
    pub led: Arc<dyn Led>,
    pub control_port: Arc<dyn InputPort>,
    pub key_port: Arc<dyn InputPort>,
    pub controls: ControlScanner,
    pub keys: KeyScanner,
    pub command_port: Arc<dyn CommandPort>,
    pub commands: CommandProcessor,
    pub poll_interval: Duration,
}

impl FastLoop {
    pub async fn run(mut self) {
        let mut events: Vec<InputEvent> = Vec::new();
        let mut line = LineBuffer::new();
        let mut led_on = false;
        let mut last_blink = Instant::now();

        info!("fast loop started");

        while self.flags.is_running() {
            self.usb.poll();
            self.flags.set_heartbeat_ms(match self.usb.state() {
                UsbState::NotMounted => BLINK_NOT_MOUNTED_MS,
                UsbState::Mounted => BLINK_MOUNTED_MS,
                UsbState::Suspended => BLINK_SUSPENDED_MS,
            });

            // Discrete inputs are only polled while USB MIDI is mounted
            if self.usb.mounted() {
                let now = Instant::now();
                events.clear();
                self.controls.scan(&*self.control_port, now, &mut events);
                self.keys.scan(&*self.key_port, &mut events);

                if !events.is_empty() {
                    let mut bank = self.bank.lock();
                    let mut cx = EventCx {
                        midi: &self.midi,
                        flags: &self.flags,
                    };
                    for event in events.drain(..) {
                        if matches!(event, InputEvent::MaintenanceCombo) {
                            self.flags.request_maintenance();
                            continue;
                        }
                        bank.dispatch(event, &mut cx);
                    }
                }
            }

            if last_blink.elapsed() >= Duration::from_millis(self.flags.heartbeat_ms()) {
                led_on = !led_on;
                self.led.set(led_on);
                last_blink = Instant::now();
            }

            while let Some(byte) = self.command_port.read_byte() {
                if let Some(cmd_line) = line.push(byte) {
                    self.commands.process_line(&cmd_line);
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }

        info!("fast loop stopped");
    }
}

/// Render context: touch polling, mode switching, display presentation.
pub struct RenderLoop {
    pub flags: Arc<SharedFlags>,
    pub bank: Arc<Mutex<ModeBank>>,
    pub midi: Arc<MidiFanout>,
    pub touch_sensor: Arc<dyn TouchSensor>,
    pub display: Box<dyn Display>,
    pub bootloader: Arc<dyn Bootloader>,
    pub startup_delay: Duration,
    pub frame_interval: Duration,
}

impl RenderLoop {
    pub async fn run(mut self) {
        tokio::time::sleep(self.startup_delay).await;

        let mut touch = TouchTracker::new();
        let mut events: Vec<InputEvent> = Vec::new();
        self.display.clear();

        info!("render loop started");

        loop {
            if !self.flags.is_running() {
                break;
            }
            if self.flags.maintenance_requested() {
                self.flags.stop();
                break;
            }

            {
                // Holding the bank across the switch keeps teardown/setup
                // atomic with respect to the fast context's dispatch.
                let mut bank = self.bank.lock();
                let mut cx = EventCx {
                    midi: &self.midi,
                    flags: &self.flags,
                };

                let desired = self.flags.desired_mode();
                if desired != bank.active() {
                    bank.switch_to(desired, &mut cx);
                }

                events.clear();
                touch.poll(&*self.touch_sensor, &mut events);
                for event in events.drain(..) {
                    bank.dispatch(event, &mut cx);
                }

                self.display.clear();
                bank.draw(self.display.as_mut());
                bank.update(&mut cx);
            }
            self.display.present();

            tokio::time::sleep(self.frame_interval).await;
        }

        // Fixed shutdown banner, then hand the device to the bootloader.
        // No in-flight MIDI is flushed; the reset is unconditional.
        self.display.clear();
        self.display.draw_text(10, 24, 2, "Firm Mode");
        self.display.present();
        self.bootloader.reboot_to_bootloader();

        info!("render loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::BytePipe;
    use crate::config::MidiConfig;
    use crate::hw::{
        ConsoleDisplay, LogLed, LogMux, LogSerialLine, RecordingSink, SimBootloader, SimInput,
        SimTouch, SimUsb,
    };
    use crate::input::InputDescriptor;
    use crate::mode::ModeKind;
    use crate::transport::{TrsJack, TrsPort};

    struct Rig {
        flags: Arc<SharedFlags>,
        bank: Arc<Mutex<ModeBank>>,
        usb_sink: Arc<RecordingSink>,
        controls: Arc<SimInput>,
        keys: Arc<SimInput>,
        touch: Arc<SimTouch>,
        bootloader: Arc<SimBootloader>,
        frame: Arc<Mutex<String>>,
        fast: FastLoop,
        render: RenderLoop,
    }

    fn make_rig() -> Rig {
        let flags = Arc::new(SharedFlags::new());
        let usb = Arc::new(SimUsb::new());
        usb.set_state(crate::hw::UsbState::Mounted);

        let usb_sink = Arc::new(RecordingSink::new());
        let trs = Arc::new(TrsPort::new(
            Box::new(LogSerialLine),
            Box::new(LogMux),
            TrsJack::A,
        ));
        let midi = Arc::new(MidiFanout::new(
            usb_sink.clone() as Arc<dyn crate::hw::MidiSink>,
            trs,
            Arc::new(RecordingSink::new()),
        ));

        let midi_config = MidiConfig::default();
        let bank = Arc::new(Mutex::new(ModeBank::new(&midi_config)));
        {
            let mut cx = EventCx {
                midi: &midi,
                flags: &flags,
            };
            bank.lock().start(&mut cx);
        }

        let controls = Arc::new(SimInput::new(5));
        let keys = Arc::new(SimInput::new(12));
        let touch = Arc::new(SimTouch::new());
        let bootloader = Arc::new(SimBootloader::new());
        let display = ConsoleDisplay::new();
        let frame = display.frame_handle();

        let descriptors: Vec<InputDescriptor> = (0..5)
            .map(|id| InputDescriptor {
                id,
                double_click: false,
            })
            .collect();

        let fast = FastLoop {
            flags: flags.clone(),
            bank: bank.clone(),
            midi: midi.clone(),
            usb: usb.clone(),
            led: Arc::new(LogLed::new()),
            control_port: controls.clone(),
            key_port: keys.clone(),
            controls: ControlScanner::new(descriptors, [0, 2, 4], Duration::from_millis(300)),
            keys: KeyScanner::new(12),
            command_port: Arc::new(BytePipe::new()),
            commands: CommandProcessor::new(flags.clone(), midi.clone()),
            poll_interval: Duration::from_millis(1),
        };

        let render = RenderLoop {
            flags: flags.clone(),
            bank: bank.clone(),
            midi: midi.clone(),
            touch_sensor: touch.clone(),
            display: Box::new(display),
            bootloader: bootloader.clone(),
            startup_delay: Duration::from_millis(1),
            frame_interval: Duration::from_millis(1),
        };

        Rig {
            flags,
            bank,
            usb_sink,
            controls,
            keys,
            touch,
            bootloader,
            frame,
            fast,
            render,
        }
    }

    #[tokio::test]
    async fn test_maintenance_combo_reboots_once() {
        let rig = make_rig();
        let flags = rig.flags.clone();
        let bootloader = rig.bootloader.clone();
        let frame = rig.frame.clone();

        // Boot with every maintenance input released: the combo raises the
        // flag, the render loop observes it, banners and reboots exactly once.
        let fast = tokio::spawn(rig.fast.run());
        let render = tokio::spawn(rig.render.run());

        tokio::time::timeout(Duration::from_secs(5), async {
            fast.await.unwrap();
            render.await.unwrap();
        })
        .await
        .expect("loops did not shut down");

        assert!(!flags.is_running());
        assert_eq!(bootloader.requests(), 1);
        assert!(frame.lock().contains("Firm Mode"));
    }

    #[tokio::test]
    async fn test_render_loop_applies_requested_mode() {
        let rig = make_rig();
        // Hold one maintenance input pressed so the combo stays quiet
        rig.controls.set_pressed(0, true);

        let flags = rig.flags.clone();
        let bank = rig.bank.clone();

        let fast = tokio::spawn(rig.fast.run());
        let render = tokio::spawn(rig.render.run());

        flags.request_mode(ModeKind::Strum);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(bank.lock().active(), ModeKind::Strum);

        flags.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            fast.await.unwrap();
            render.await.unwrap();
        })
        .await
        .expect("loops did not shut down");
    }

    #[tokio::test]
    async fn test_key_press_reaches_active_mode_and_transports() {
        let rig = make_rig();
        rig.controls.set_pressed(0, true);

        let flags = rig.flags.clone();
        let keys = rig.keys.clone();
        let usb_sink = rig.usb_sink.clone();

        let fast = tokio::spawn(rig.fast.run());
        let render = tokio::spawn(rig.render.run());

        tokio::time::sleep(Duration::from_millis(20)).await;
        keys.set_pressed(0, true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        keys.set_pressed(0, false);
        tokio::time::sleep(Duration::from_millis(20)).await;

        flags.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            fast.await.unwrap();
            render.await.unwrap();
        })
        .await
        .expect("loops did not shut down");

        // Compose is active by default: key 0 plays the root note
        let packets = usb_sink.packets();
        assert!(packets.iter().any(|p| p[0] & 0xF0 == 0x90));
        assert!(packets.iter().any(|p| p[0] & 0xF0 == 0x80));
    }

    #[test]
    fn test_flags_defaults() {
        let flags = SharedFlags::new();
        assert!(flags.is_running());
        assert!(!flags.maintenance_requested());
        assert_eq!(flags.desired_mode(), ModeKind::Compose);
        assert_eq!(flags.heartbeat_ms(), BLINK_NOT_MOUNTED_MS);
    }

    #[tokio::test]
    async fn test_touch_stream_reaches_mode() {
        let rig = make_rig();
        rig.controls.set_pressed(0, true);

        let flags = rig.flags.clone();
        let touch = rig.touch.clone();
        let keys = rig.keys.clone();
        let usb_sink = rig.usb_sink.clone();

        let fast = tokio::spawn(rig.fast.run());
        let render = tokio::spawn(rig.render.run());

        // Hold a key so Compose has a sounding note, then touch the strip
        tokio::time::sleep(Duration::from_millis(20)).await;
        keys.set_pressed(3, true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        touch.set_touch(0.5, 1.0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        touch.clear_touch();
        tokio::time::sleep(Duration::from_millis(20)).await;

        flags.stop();
        tokio::time::timeout(Duration::from_secs(5), async {
            fast.await.unwrap();
            render.await.unwrap();
        })
        .await
        .expect("loops did not shut down");

        // Compose forwards strip position as poly pressure on the held note
        assert!(usb_sink
            .packets()
            .iter()
            .any(|p| p[0] & 0xF0 == 0xA0));
    }
}
