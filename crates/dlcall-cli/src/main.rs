//! dlcall - load a native shared library and call its exported entry points.

use anyhow::{Context, Result};
use clap::Parser;
use dlcall_ffi::{EntryPoints, SignatureFile};
use env_logger::Env;
use log::{debug, info};
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod driver;

use config::{ConfigLoader, DlcallConfig, LoadedConfig, LogLevel};
use driver::Driver;

#[derive(Parser)]
#[command(
    name = "dlcall",
    version = env!("CARGO_PKG_VERSION"),
    about = "Load a native shared library and call its exported functions",
    long_about = r#"
dlcall opens a native shared library (.so, .dylib, .dll) and calls three
functions it exports over the C ABI:

  say_hello: () -> void
  compute:   (f64, f64, cstr) -> f64
  transform: (ptr_mut<f64>, usize) -> void

Examples:
  dlcall target/debug/libdlcall_demo.so
  dlcall --op mul --first 6 --second 7 ./libdemo.so
  dlcall --signatures demo.ffi ./libdemo.so
  dlcall --print-signatures > demo.ffi
"#,
    after_help = r#"
Environment Variables:
  DLCALL_CONFIG=<path>        Path to configuration file
  DLCALL_DEBUG=1              Enable debug logging
  DLCALL_LOG_LEVEL=debug      Set log level (error, warn, info, debug, trace)
  DLCALL_FIRST=<f64>          First operand for compute
  DLCALL_SECOND=<f64>         Second operand for compute
  DLCALL_OP=<op>              Opcode for compute
  DLCALL_LEN=<n>              Number of values handed to transform
  DLCALL_SIGNATURES=<path>    Signature file to check the library against
"#
)]
struct Cli {
    /// Path to the native shared library to load
    #[arg(required_unless_present_any = ["generate_config", "print_signatures"])]
    library: Option<PathBuf>,

    /// First operand for compute
    #[arg(long, allow_negative_numbers = true)]
    first: Option<f64>,

    /// Second operand for compute
    #[arg(long, allow_negative_numbers = true)]
    second: Option<f64>,

    /// Opcode for compute (add, sub, mul, div)
    #[arg(long)]
    op: Option<String>,

    /// Number of values handed to transform
    #[arg(long)]
    len: Option<usize>,

    /// Signature file (.ffi) the library's exports are checked against
    #[arg(long, value_name = "PATH")]
    signatures: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, env = "DLCALL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Set log level
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Print a sample configuration file and exit
    #[arg(long)]
    generate_config: bool,

    /// Print the built-in entry point signatures in .ffi format and exit
    #[arg(long)]
    print_signatures: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.generate_config {
        println!("{}", ConfigLoader::generate_sample_config());
        return Ok(());
    }
    if cli.print_signatures {
        print!("{}", EntryPoints::signatures());
        return Ok(());
    }

    let LoadedConfig { mut config, source } = ConfigLoader::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, &cli);

    env_logger::Builder::from_env(Env::default().default_filter_or("warn"))
        .filter_level(config.logging.effective_filter())
        .format(format_log_record)
        .init();

    info!("dlcall v{} starting", env!("CARGO_PKG_VERSION"));
    match &source {
        Some(path) => info!("Loaded configuration from: {}", path.display()),
        None => debug!("No configuration file found, using defaults"),
    }
    debug!("Configuration loaded: {config:?}");

    let signatures = config
        .library
        .signatures
        .as_deref()
        .map(|path| {
            SignatureFile::parse_file(path)
                .with_context(|| format!("Failed to load signatures from {}", path.display()))
        })
        .transpose()?;

    // Presence is enforced by clap unless one of the early-exit flags was given.
    let library = cli
        .library
        .context("missing path to the native library")?;

    let driver = Driver::new(library, config.call, signatures);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    driver.run(&mut out)?;
    out.flush()?;
    Ok(())
}

fn apply_cli_overrides(config: &mut DlcallConfig, cli: &Cli) {
    if let Some(first) = cli.first {
        config.call.first = first;
    }
    if let Some(second) = cli.second {
        config.call.second = second;
    }
    if let Some(op) = &cli.op {
        config.call.op = op.clone();
    }
    if let Some(len) = cli.len {
        config.call.len = len;
    }
    if let Some(path) = &cli.signatures {
        config.library.signatures = Some(path.clone());
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.debug {
        config.logging.debug = true;
    }
}

fn format_log_record(
    buf: &mut env_logger::fmt::Formatter,
    record: &log::Record,
) -> std::io::Result<()> {
    let timestamp = buf.timestamp_millis();
    writeln!(
        buf,
        "[{} {:>5} {}] {}",
        timestamp,
        record.level(),
        record.target(),
        record.args()
    )
}
