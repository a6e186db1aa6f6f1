//! USB MIDI backend over `midir`
//!
//! On the host rig the instrument's USB MIDI endpoint is played by a real
//! MIDI output port, found by case-insensitive substring match.

use anyhow::{Context, Result};
use colored::Colorize;
use midir::{MidiOutput, MidiOutputConnection};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{MidiSink, UsbMidi, UsbState};
use crate::midi::format_hex;

/// USB MIDI transport backed by a `midir` output connection.
pub struct MidirUsb {
    conn: Mutex<MidiOutputConnection>,
    port_name: String,
}

impl MidirUsb {
    /// Connect to the first output port whose name contains `pattern`
    /// (case-insensitive).
    pub fn connect(pattern: &str) -> Result<Self> {
        let midi_out = MidiOutput::new("Touchord").context("Failed to create MIDI output")?;

        let mut found = None;
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                if name.to_lowercase().contains(&pattern.to_lowercase()) {
                    debug!("Found port '{}' matching pattern '{}'", name, pattern);
                    found = Some((port, name));
                    break;
                }
            }
        }

        let (port, port_name) = found
            .ok_or_else(|| anyhow::anyhow!("MIDI output port '{}' not found", pattern))?;

        let conn = midi_out
            .connect(&port, "touchord-usb")
            .map_err(|e| anyhow::anyhow!("Failed to connect to '{}': {}", port_name, e))?;

        info!("Connected USB MIDI to output port: {}", port_name);

        Ok(Self {
            conn: Mutex::new(conn),
            port_name,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// List available MIDI output ports
    pub fn list_ports() -> Result<Vec<String>> {
        let midi_out = MidiOutput::new("Touchord-Scanner")?;

        let mut port_names = Vec::new();
        for port in midi_out.ports() {
            if let Ok(name) = midi_out.port_name(&port) {
                port_names.push(name);
            }
        }

        Ok(port_names)
    }
}

impl MidiSink for MidirUsb {
    fn write_packet(&self, bytes: &[u8]) {
        // Fire-and-forget: a failed write is absorbed, never surfaced
        if let Err(e) = self.conn.lock().send(bytes) {
            warn!("USB MIDI write failed ({}): {}", format_hex(bytes), e);
        }
    }
}

impl UsbMidi for MidirUsb {
    fn poll(&self) {
        // midir services the port on its own thread; nothing to pump here.
    }

    fn mounted(&self) -> bool {
        true
    }

    fn state(&self) -> UsbState {
        UsbState::Mounted
    }
}

/// Print available MIDI output ports to the terminal.
pub fn list_ports_formatted() {
    println!("\n{}", "=== MIDI Output Ports ===".bold().cyan());

    match MidirUsb::list_ports() {
        Ok(ports) if ports.is_empty() => {
            println!("  {}", "(no ports available)".yellow());
        }
        Ok(ports) => {
            for (i, name) in ports.iter().enumerate() {
                println!("  {} {}", format!("[{}]", i).green(), name);
            }
        }
        Err(e) => {
            println!("  {} {}", "Failed to enumerate ports:".red(), e);
        }
    }
}
