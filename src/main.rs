//! Touchord control core - host bring-up rig
//!
//! Runs the instrument's control core against host-side hardware backends:
//! a real MIDI output port for the USB transport when one is configured,
//! logging stand-ins for the TRS and BLE transports, and a diagnostic
//! console that drives the simulated inputs.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use touchord::commands::{BytePipe, CommandProcessor, SimHooks};
use touchord::config::AppConfig;
use touchord::engine::{FastLoop, RenderLoop, SharedFlags};
use touchord::hw::{
    midir_port::list_ports_formatted, ConsoleDisplay, Display, LogBle, LogLed, LogMux,
    LogSerialLine, MidiSink, MidirUsb, SimBootloader, SimInput, SimTouch, SimUsb, UsbMidi,
    UsbState,
};
use touchord::input::{ControlScanner, KeyScanner};
use touchord::mode::{EventCx, ModeBank};
use touchord::transport::{MidiFanout, TrsPort};

/// Touchord - control core for the touch-chord MIDI controller
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "touchord.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI output ports
    #[arg(long)]
    list_ports: bool,

    /// Start with the simulated USB transport already mounted
    #[arg(long)]
    mounted: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting Touchord control core...");

    if args.list_ports {
        list_ports_formatted();
        return Ok(());
    }

    let config = AppConfig::load_or_default(&args.config).await?;
    info!("Configuration loaded ({})", args.config);

    let flags = Arc::new(SharedFlags::new());

    // USB MIDI: a real midir port when configured, simulated otherwise
    let sim_usb = Arc::new(SimUsb::new());
    let (usb, usb_sink): (Arc<dyn UsbMidi>, Arc<dyn MidiSink>) = match &config.midi.usb_port {
        Some(pattern) => {
            let port = Arc::new(MidirUsb::connect(pattern)?);
            (port.clone(), port)
        }
        None => {
            if args.mounted {
                sim_usb.set_state(UsbState::Mounted);
            }
            (sim_usb.clone(), sim_usb.clone())
        }
    };

    let trs = Arc::new(TrsPort::new(
        Box::new(LogSerialLine),
        Box::new(LogMux),
        config.trs.jack,
    ));
    let ble = Arc::new(LogBle);
    let midi = Arc::new(MidiFanout::new(usb_sink, trs, ble));

    let bank = Arc::new(Mutex::new(ModeBank::new(&config.midi)));

    // Simulated surface, driven from the diagnostic console
    let controls = Arc::new(SimInput::new(config.inputs.controls.len()));
    let keys = Arc::new(SimInput::new(config.inputs.keys));
    let touch = Arc::new(SimTouch::new());

    let mut display = ConsoleDisplay::new();

    // Startup banner, then the initial mode comes up before either
    // scheduler context starts dispatching
    display.clear();
    display.draw_text(10, 24, 2, "Touchord");
    display.present();
    {
        let mut cx = EventCx {
            midi: &midi,
            flags: &flags,
        };
        bank.lock().start(&mut cx);
    }

    let pipe = Arc::new(BytePipe::new());
    touchord::cli::spawn_repl(pipe.clone(), flags.clone());

    let hooks = SimHooks {
        controls: controls.clone(),
        keys: keys.clone(),
        touch: touch.clone(),
        usb: config.midi.usb_port.is_none().then(|| sim_usb.clone()),
    };
    let commands = CommandProcessor::new(flags.clone(), midi.clone()).with_hooks(hooks);

    let fast = FastLoop {
        flags: flags.clone(),
        bank: bank.clone(),
        midi: midi.clone(),
        usb,
        led: Arc::new(LogLed::new()),
        control_port: controls,
        key_port: keys,
        controls: ControlScanner::new(
            config.inputs.controls.clone(),
            config.inputs.maintenance_combo,
            config.timing.double_click_window(),
        ),
        keys: KeyScanner::new(config.inputs.keys),
        command_port: pipe,
        commands,
        poll_interval: config.timing.poll_interval(),
    };

    let render = RenderLoop {
        flags: flags.clone(),
        bank,
        midi,
        touch_sensor: touch,
        display: Box::new(display),
        bootloader: Arc::new(SimBootloader::new()),
        startup_delay: config.timing.startup_delay(),
        frame_interval: config.timing.frame_interval(),
    };

    // Ctrl-C clears the running flag, same as the quit command
    {
        let flags = flags.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                flags.stop();
            }
        });
    }

    let fast_task = tokio::spawn(fast.run());
    let render_task = tokio::spawn(render.run());

    let _ = tokio::join!(fast_task, render_task);

    info!("Touchord shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
