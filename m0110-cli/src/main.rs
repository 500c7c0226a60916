mod layout;
mod trace;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use m0110::{Config, Converter, HostLeds, KeyEvent, ReplayPort};
use m0110_keymap::{keycode, resolve_layer, NUM_LAYERS};
use std::fs;
use std::io::{self, Write};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use layout::LayerTable;

#[derive(Parser)]
#[command(name = "m0110-cli")]
#[command(about = "Host tools for the M0110 keyboard converter")]
struct Cli {
    /// Log every command exchange and decoded key
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a recorded response trace through the converter
    Replay {
        /// Path to the trace (hex bytes, `#` comments)
        trace: String,
        /// Treat Caps Lock as a latching key
        #[arg(long)]
        locking_caps: bool,
        /// Replay as if the host's Caps Lock LED were lit
        #[arg(long)]
        caps_led: bool,
        /// Report ghost rows after each cycle
        #[arg(long)]
        ghost: bool,
    },
    /// Decode raw event bytes
    Decode {
        /// Event bytes in hex
        #[arg(required = true)]
        bytes: Vec<String>,
        /// The bytes followed a keypad prefix
        #[arg(long)]
        keypad: bool,
    },
    /// Print a keymap layer as a matrix table
    Keymap {
        #[arg(long, default_value_t = 0)]
        layer: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Replay {
            trace,
            locking_caps,
            caps_led,
            ghost,
        } => {
            let contents =
                fs::read_to_string(&trace).with_context(|| format!("reading {}", trace))?;
            let bytes = trace::parse_trace(&contents).context("parsing trace")?;
            info!("{}: {} response bytes", trace, bytes.len());

            let config = Config {
                locking_caps,
                ghost_detection: ghost,
            };
            let leds = if caps_led {
                HostLeds(HostLeds::CAPS_LOCK)
            } else {
                HostLeds::default()
            };
            replay(&bytes, config, leds, &mut io::stdout().lock())?;
        }
        Command::Decode { bytes, keypad } => {
            for token in &bytes {
                let raw = trace::parse_byte(token)?;
                let event = if keypad {
                    KeyEvent::decode_keypad(raw)
                } else {
                    KeyEvent::decode(raw)
                };
                println!("{:02X} -> {}", raw, describe(event, 0));
            }
        }
        Command::Keymap { layer } => {
            if layer >= NUM_LAYERS {
                bail!("layer {} does not exist (keymap has {})", layer, NUM_LAYERS);
            }
            print!("{}", LayerTable(layer));
        }
    }

    Ok(())
}

/// Logs go to stderr; `RUST_LOG` overrides the level picked by `-v`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Initialize a converter on the trace and scan until it is used up.
fn replay(bytes: &[u8], config: Config, leds: HostLeds, out: &mut impl Write) -> Result<()> {
    let mut converter = Converter::new(ReplayPort::new(bytes), config);

    let diag = converter.init();
    match diag.model {
        Ok(model) => info!("model: {:?}", model),
        Err(err) => warn!("model query failed: {}", err),
    }
    match diag.self_test {
        Ok(result) => info!("self test: {:?}", result),
        Err(err) => warn!("self test failed: {}", err),
    }

    let mut cycle = 0usize;
    while !converter.keyboard().port().is_exhausted() {
        cycle += 1;
        let applied = converter.scan(leds);
        let layer = resolve_layer(converter.matrix());
        for &event in &applied {
            writeln!(out, "{:4}: {}", cycle, describe(event, layer))?;
        }
        if converter.has_ghost() {
            writeln!(out, "{:4}: ghost", cycle)?;
        }
    }

    writeln!(out, "{} cycles", cycle)?;
    write!(out, "{}", converter.matrix())?;
    Ok(())
}

fn describe(event: KeyEvent, layer: usize) -> String {
    let kc = keycode(layer, event);
    let name = if kc.is_transparent() {
        "-"
    } else {
        kc.display_name()
    };
    format!(
        "{:02X} {:<4} r{:X} c{} {}",
        event.code(),
        if event.is_release() { "up" } else { "down" },
        event.row(),
        event.col(),
        name
    )
}
