//! Interactive diagnostic console
//!
//! Feeds typed lines into the command channel byte stream, the same path the
//! device's USB serial port uses.

use std::sync::Arc;

use rustyline::DefaultEditor;
use tracing::warn;

use crate::commands::BytePipe;
use crate::engine::SharedFlags;

/// Spawn the console on its own thread. Ctrl-D / read errors clear the
/// running flag, same as the `quit` command.
pub fn spawn_repl(pipe: Arc<BytePipe>, flags: Arc<SharedFlags>) {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                warn!("diagnostic console unavailable: {}", e);
                return;
            }
        };

        while flags.is_running() {
            match rl.readline("touchord> ") {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        let _ = rl.add_history_entry(&line);
                        pipe.push_line(&line);
                    }
                }
                Err(_) => {
                    flags.stop();
                    break;
                }
            }
        }
    });
}
