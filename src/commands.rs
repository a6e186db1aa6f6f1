//! Diagnostic command channel
//!
//! Line-buffered ASCII commands arrive one byte at a time (on the device,
//! over the USB serial port; on the rig, from the interactive console). The
//! fast loop pumps the bytes through [`LineBuffer`] and hands complete lines
//! to [`CommandProcessor`]. Bad input is logged and dropped, never fatal.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::SharedFlags;
use crate::hw::{SimInput, SimTouch, SimUsb, UsbState};
use crate::mode::ModeKind;
use crate::transport::{MidiFanout, TrsJack};

/// Maximum command line length, terminator included. Bytes beyond it are
/// dropped until the next terminator.
pub const MAX_LINE_LEN: usize = 1024;

/// Byte source the fast loop drains every tick.
pub trait CommandPort: Send + Sync {
    fn read_byte(&self) -> Option<u8>;
}

/// In-memory byte queue: the console thread pushes, the fast loop drains.
pub struct BytePipe {
    queue: Mutex<VecDeque<u8>>,
}

impl BytePipe {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_byte(&self, byte: u8) {
        self.queue.lock().push_back(byte);
    }

    /// Queue a full line, newline-terminated.
    pub fn push_line(&self, line: &str) {
        let mut queue = self.queue.lock();
        queue.extend(line.bytes());
        queue.push_back(b'\n');
    }
}

impl Default for BytePipe {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandPort for BytePipe {
    fn read_byte(&self) -> Option<u8> {
        self.queue.lock().pop_front()
    }
}

/// Assembles CR/LF-terminated lines from a byte stream.
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
        }
    }

    /// Feed one byte; returns a complete line on a terminator. Empty lines
    /// are swallowed, overflow bytes are dropped.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == b'\r' || byte == b'\n' {
            if self.buf.is_empty() {
                return None;
            }
            let line = String::from_utf8_lossy(&self.buf).into_owned();
            self.buf.clear();
            return Some(line);
        }

        if self.buf.len() < MAX_LINE_LEN - 1 {
            self.buf.push(byte);
        }
        None
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command '{0}'")]
    Unknown(String),

    #[error("missing argument for '{0}'")]
    MissingArg(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArg(String),
}

/// Parsed diagnostic command.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagCommand {
    Status,
    Mode(ModeKind),
    Trs(TrsJack),
    /// Drive a simulated control line.
    Press(u8),
    Release(u8),
    /// Drive a simulated key-row line.
    Key { key: u8, down: bool },
    /// Drive the simulated touch strip.
    Touch { position: f32, size: f32 },
    TouchOff,
    /// Drive the simulated USB connection state.
    Usb(UsbState),
    Quit,
}

impl DiagCommand {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut parts = line.split_whitespace();
        let head = parts.next().unwrap_or("");

        match head.to_lowercase().as_str() {
            "status" => Ok(DiagCommand::Status),
            "mode" => {
                let arg = parts.next().ok_or(CommandError::MissingArg("mode"))?;
                let kind = arg.parse::<ModeKind>().map_err(CommandError::InvalidArg)?;
                Ok(DiagCommand::Mode(kind))
            }
            "trs" => match parts.next() {
                Some(a) if a.eq_ignore_ascii_case("a") => Ok(DiagCommand::Trs(TrsJack::A)),
                Some(b) if b.eq_ignore_ascii_case("b") => Ok(DiagCommand::Trs(TrsJack::B)),
                Some(other) => Err(CommandError::InvalidArg(format!("trs jack '{}'", other))),
                None => Err(CommandError::MissingArg("trs")),
            },
            "press" | "release" => {
                let arg = parts.next().ok_or(CommandError::MissingArg("press"))?;
                let index: u8 = arg
                    .parse()
                    .map_err(|_| CommandError::InvalidArg(format!("control '{}'", arg)))?;
                if head.eq_ignore_ascii_case("press") {
                    Ok(DiagCommand::Press(index))
                } else {
                    Ok(DiagCommand::Release(index))
                }
            }
            "key" => {
                let arg = parts.next().ok_or(CommandError::MissingArg("key"))?;
                let key: u8 = arg
                    .parse()
                    .map_err(|_| CommandError::InvalidArg(format!("key '{}'", arg)))?;
                match parts.next() {
                    Some(d) if d.eq_ignore_ascii_case("down") => {
                        Ok(DiagCommand::Key { key, down: true })
                    }
                    Some(u) if u.eq_ignore_ascii_case("up") => {
                        Ok(DiagCommand::Key { key, down: false })
                    }
                    Some(other) => Err(CommandError::InvalidArg(format!(
                        "key direction '{}'",
                        other
                    ))),
                    None => Err(CommandError::MissingArg("key")),
                }
            }
            "touch" => match parts.next() {
                Some(off) if off.eq_ignore_ascii_case("off") => Ok(DiagCommand::TouchOff),
                Some(pos) => {
                    let position: f32 = pos
                        .parse()
                        .map_err(|_| CommandError::InvalidArg(format!("position '{}'", pos)))?;
                    let size: f32 = match parts.next() {
                        Some(s) => s
                            .parse()
                            .map_err(|_| CommandError::InvalidArg(format!("size '{}'", s)))?,
                        None => 1.0,
                    };
                    Ok(DiagCommand::Touch { position, size })
                }
                None => Err(CommandError::MissingArg("touch")),
            },
            "usb" => match parts.next() {
                Some(s) if s.eq_ignore_ascii_case("unmounted") => {
                    Ok(DiagCommand::Usb(UsbState::NotMounted))
                }
                Some(s) if s.eq_ignore_ascii_case("mounted") => {
                    Ok(DiagCommand::Usb(UsbState::Mounted))
                }
                Some(s) if s.eq_ignore_ascii_case("suspended") => {
                    Ok(DiagCommand::Usb(UsbState::Suspended))
                }
                Some(other) => Err(CommandError::InvalidArg(format!("usb state '{}'", other))),
                None => Err(CommandError::MissingArg("usb")),
            },
            "quit" | "exit" => Ok(DiagCommand::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

/// Handles to the simulated hardware the sim-only commands drive.
pub struct SimHooks {
    pub controls: Arc<SimInput>,
    pub keys: Arc<SimInput>,
    pub touch: Arc<SimTouch>,
    pub usb: Option<Arc<SimUsb>>,
}

/// Applies parsed commands to the running core.
pub struct CommandProcessor {
    flags: Arc<SharedFlags>,
    midi: Arc<MidiFanout>,
    hooks: Option<SimHooks>,
}

impl CommandProcessor {
    pub fn new(flags: Arc<SharedFlags>, midi: Arc<MidiFanout>) -> Self {
        Self {
            flags,
            midi,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: SimHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn process_line(&self, line: &str) {
        match DiagCommand::parse(line) {
            Ok(cmd) => self.apply(cmd),
            Err(e) => warn!("command rejected: {}", e),
        }
    }

    fn apply(&self, cmd: DiagCommand) {
        match cmd {
            DiagCommand::Status => {
                info!(
                    "status: running={} mode={} trs={:?}",
                    self.flags.is_running(),
                    self.flags.desired_mode(),
                    self.midi.trs_jack()
                );
            }
            DiagCommand::Mode(kind) => self.flags.request_mode(kind),
            DiagCommand::Trs(jack) => self.midi.select_trs_jack(jack),
            DiagCommand::Quit => self.flags.stop(),

            DiagCommand::Press(i) => self.with_sim(|h| h.controls.set_pressed(i as usize, true)),
            DiagCommand::Release(i) => self.with_sim(|h| h.controls.set_pressed(i as usize, false)),
            DiagCommand::Key { key, down } => {
                self.with_sim(|h| h.keys.set_pressed(key as usize, down))
            }
            DiagCommand::Touch { position, size } => {
                self.with_sim(|h| h.touch.set_touch(position, size))
            }
            DiagCommand::TouchOff => self.with_sim(|h| h.touch.clear_touch()),
            DiagCommand::Usb(state) => self.with_sim(|h| match &h.usb {
                Some(usb) => usb.set_state(state),
                None => warn!("usb state is not simulated on this rig"),
            }),
        }
    }

    fn with_sim(&self, f: impl FnOnce(&SimHooks)) {
        match &self.hooks {
            Some(hooks) => f(hooks),
            None => warn!("no simulated hardware attached"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_terminators() {
        let mut buf = LineBuffer::new();

        for &b in b"status" {
            assert_eq!(buf.push(b), None);
        }
        assert_eq!(buf.push(b'\n'), Some("status".to_string()));

        // CR also terminates; the following LF is swallowed as empty
        for &b in b"quit" {
            buf.push(b);
        }
        assert_eq!(buf.push(b'\r'), Some("quit".to_string()));
        assert_eq!(buf.push(b'\n'), None);
    }

    #[test]
    fn test_line_buffer_overflow_drops_excess() {
        let mut buf = LineBuffer::new();

        for _ in 0..2000 {
            assert_eq!(buf.push(b'x'), None);
        }
        let line = buf.push(b'\n').unwrap();
        assert_eq!(line.len(), MAX_LINE_LEN - 1);

        // Buffer is reusable afterwards
        buf.push(b'a');
        assert_eq!(buf.push(b'\n'), Some("a".to_string()));
    }

    #[test]
    fn test_parse_core_commands() {
        assert_eq!(DiagCommand::parse("status").unwrap(), DiagCommand::Status);
        assert_eq!(
            DiagCommand::parse("mode strum").unwrap(),
            DiagCommand::Mode(ModeKind::Strum)
        );
        assert_eq!(
            DiagCommand::parse("trs b").unwrap(),
            DiagCommand::Trs(TrsJack::B)
        );
        assert_eq!(DiagCommand::parse("quit").unwrap(), DiagCommand::Quit);
        assert_eq!(
            DiagCommand::parse("key 3 down").unwrap(),
            DiagCommand::Key { key: 3, down: true }
        );
        assert_eq!(
            DiagCommand::parse("touch 0.5").unwrap(),
            DiagCommand::Touch {
                position: 0.5,
                size: 1.0
            }
        );
        assert_eq!(DiagCommand::parse("touch off").unwrap(), DiagCommand::TouchOff);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            DiagCommand::parse("frobnicate"),
            Err(CommandError::Unknown(_))
        ));
        assert!(matches!(
            DiagCommand::parse("mode"),
            Err(CommandError::MissingArg(_))
        ));
        assert!(matches!(
            DiagCommand::parse("mode disco"),
            Err(CommandError::InvalidArg(_))
        ));
        assert!(matches!(
            DiagCommand::parse("trs c"),
            Err(CommandError::InvalidArg(_))
        ));
    }

    #[test]
    fn test_byte_pipe_fifo() {
        let pipe = BytePipe::new();
        pipe.push_line("ab");

        assert_eq!(pipe.read_byte(), Some(b'a'));
        assert_eq!(pipe.read_byte(), Some(b'b'));
        assert_eq!(pipe.read_byte(), Some(b'\n'));
        assert_eq!(pipe.read_byte(), None);
    }
}
