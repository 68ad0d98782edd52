//! Check DC files, and pack or unpack values against their types.
//!
//! Usage:
//!   dcparse [OPTIONS] [FILE.dc ...]
//!   dcparse < file.dc
//!
//! All files are loaded into one module, in order, so later files may use names
//! declared by earlier ones.
//!
//! Options:
//!   --human, -H           Human-readable diagnostics
//!   --pack TYPE VALUE     Compile VALUE as TYPE and print the bytes as hex
//!   --unpack TYPE HEX     Decode HEX as TYPE and print it as a value literal
//!
//! TYPE is any type expression (`uint16(0-100)`, `string`, `Point[]`, a class name, ...).
//! Set RUST_LOG (e.g. `RUST_LOG=dcfile=debug`) for tracing output.

use anyhow::{bail, Context};
use dcfile::{parse_dcfile_into, parse_type, parse_value, Diagnostic, Module, WireReader};
use std::io::{self, Read};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy)]
enum OutputStyle {
    Compact,
    Human,
}

enum Action {
    Check,
    Pack { ty: String, value: String },
    Unpack { ty: String, hex: String },
}

fn print_diagnostic(path: &str, d: &Diagnostic, style: OutputStyle) {
    let (line, column) = d.span.map_or((0, 0), |s| (s.line, s.column));
    match style {
        OutputStyle::Compact => {
            println!("{}:{}:{}: error: {} [{}]", path, line, column, d.message, d.kind);
        }
        OutputStyle::Human => {
            println!("  {} {}:{}: {}", path, line, column, d.message);
            println!("    kind: {}", d.kind);
        }
    }
}

/// Remove `flag` and the `n` arguments after it.
fn take_flag(args: &mut Vec<String>, flag: &str, n: usize) -> anyhow::Result<Option<Vec<String>>> {
    let Some(pos) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    if pos + n >= args.len() {
        bail!("{} expects {} argument(s)", flag, n);
    }
    let taken: Vec<String> = args.drain(pos..=pos + n).skip(1).collect();
    Ok(Some(taken))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let style = if let Some(pos) = args.iter().position(|a| a == "--human" || a == "-H") {
        args.remove(pos);
        OutputStyle::Human
    } else {
        OutputStyle::Compact
    };
    let action = if let Some(mut v) = take_flag(&mut args, "--pack", 2)? {
        let value = v.pop().unwrap_or_default();
        let ty = v.pop().unwrap_or_default();
        Action::Pack { ty, value }
    } else if let Some(mut v) = take_flag(&mut args, "--unpack", 2)? {
        let hex = v.pop().unwrap_or_default();
        let ty = v.pop().unwrap_or_default();
        Action::Unpack { ty, hex }
    } else {
        Action::Check
    };

    let mut module = Module::new();
    let mut total_errors = 0usize;

    if args.is_empty() {
        if matches!(action, Action::Check) {
            let mut src = String::new();
            io::stdin().read_to_string(&mut src)?;
            let diags = parse_dcfile_into(&mut module, &src);
            for d in &diags {
                print_diagnostic("<stdin>", d, style);
            }
            total_errors += diags.len();
        }
    } else {
        for path in &args {
            let path = Path::new(path);
            let src = match std::fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    total_errors += 1;
                    continue;
                }
            };
            let diags = parse_dcfile_into(&mut module, &src);
            let display_path = path.display().to_string();
            for d in &diags {
                print_diagnostic(&display_path, d, style);
            }
            total_errors += diags.len();
        }
    }

    if total_errors > 0 {
        eprintln!("dcparse: {} error(s)", total_errors);
        std::process::exit(1);
    }

    match action {
        Action::Check => {
            eprintln!(
                "dcparse: ok ({} class(es), {} struct(s))",
                module.classes().len(),
                module.structs().len()
            );
        }
        Action::Pack { ty, value } => {
            let ty = parse_type(&mut module, &ty).map_err(|d| anyhow::anyhow!("type: {}", d))?;
            let bytes = parse_value(&ty, &value).map_err(|d| anyhow::anyhow!("value: {}", d))?;
            println!("{}", hex::encode(bytes));
        }
        Action::Unpack { ty, hex } => {
            let ty = parse_type(&mut module, &ty).map_err(|d| anyhow::anyhow!("type: {}", d))?;
            let bytes = hex::decode(hex.trim()).context("invalid hex input")?;
            let mut reader = WireReader::new(&bytes);
            let value = reader.read_value(&ty)?;
            if reader.remaining() > 0 {
                eprintln!("dcparse: {} trailing byte(s) not decoded", reader.remaining());
            }
            println!("{}", value);
        }
    }
    Ok(())
}
