//! # memref
//!
//! Raw memory access for a managed heap: pointer arithmetic and address formatting,
//! precision-safe 64-bit integer codecs, buffer reinterpretation and scanning, and
//! managed object references embedded in raw memory as weak or persistent handles.
//!
//! All heap access goes through [`Runtime::mutate`]; the exported operations live in
//! [`bindings`].
use clap::{Parser, Subcommand};
use std::{path::PathBuf, process::ExitCode};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub mod bindings;
pub mod error;
pub mod memory;
pub mod native;
pub mod types;
pub mod value;
pub mod vm;

pub use error::{AccessError, NativeError, ParseIntError, RefError};
pub use value::{Buffer, BufferRef, ObjectRef, Value, WideInt};
pub use vm::{CallContext, GCHandle, Runtime, RuntimeOptions};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Inspect the raw memory model of the host platform"
)]
pub struct Args {
    /// Directory searched for native libraries by file-name prefix
    #[arg(short, long, value_name = "FOLDER")]
    pub library_path: Option<PathBuf>,
    /// Largest length a view may be created with
    #[arg(long, value_name = "BYTES", default_value_t = memory::MAX_LENGTH)]
    pub max_length: usize,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the size and alignment of every primitive type
    Sizes,
    /// Print the machine byte order
    Endianness,
    /// Print the hex address of an exported symbol
    Symbol {
        #[arg(value_name = "LIBRARY")]
        library: String,
        #[arg(value_name = "SYMBOL")]
        symbol: String,
    },
}

fn init_tracing() {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::new("warn"),
    };
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run_cli() -> ExitCode {
    let args = Args::parse();
    init_tracing();

    match args.command {
        Command::Sizes => {
            println!("{:<12} {:>5} {:>6}", "type", "size", "align");
            for p in types::PRIMITIVES {
                println!("{:<12} {:>5} {:>6}", p.name, p.size, p.align);
            }
            ExitCode::SUCCESS
        }
        Command::Endianness => {
            println!("{}", memory::endianness().as_str());
            ExitCode::SUCCESS
        }
        Command::Symbol { library, symbol } => {
            let runtime = Runtime::with_options(RuntimeOptions {
                max_length: args.max_length,
                library_path: args.library_path,
            });
            let result = runtime.mutate(|ctx| -> Result<String, RefError> {
                let view = ctx.symbol_view(&library, &symbol)?;
                match bindings::call(ctx, "hexAddress", &[view.into()])? {
                    Value::String(hex) => Ok(hex),
                    other => Err(RefError::runtime(
                        "hexAddress",
                        format!("unexpected result {other:?}"),
                    )),
                }
            });
            match result {
                Ok(hex) => {
                    println!("{symbol} @ 0x{hex}");
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    eprintln!("Error resolving symbol: {e}");
                    ExitCode::from(1)
                }
            }
        }
    }
}
