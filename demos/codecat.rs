//! Compresses or decompresses a file (or stdin) to stdout.
//!
//! ```text
//! cargo run --example codecat -- --format lz4 notes.txt > notes.txt.lz4
//! cargo run --example codecat -- --format lz4 --decompress notes.txt.lz4
//! ```
#[path = "common/logsetup.rs"]
mod logsetup;

use std::{
    fs,
    io::{self, BufWriter, Read},
    process,
};

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use codec_stream::{BufferKind, BufferLength, Converter, FilterOptions, Format};
use log::*;

#[derive(Parser, Debug)]
struct Args {
    /// Verbosity (-v, -vv, -vvv, etc.)
    #[clap(short, long, parse(from_occurrences))]
    verbose: u8,

    #[clap(short, long, arg_enum, default_value = "auto")]
    color: logsetup::Color,

    /// none, zstd or lz4
    #[clap(short, long, default_value = "zstd")]
    format: Format,

    #[clap(short, long)]
    decompress: bool,

    /// Length of the input and output buffers, in bytes. Defaults to the codec's preference.
    #[clap(short, long)]
    buffer_length: Option<usize>,

    /// Never reallocate buffers after they are first allocated.
    #[clap(long)]
    fixed: bool,

    /// Read from stdin if omitted.
    input: Option<Utf8PathBuf>,
}

fn options(args: &Args) -> FilterOptions {
    let length = args
        .buffer_length
        .map(BufferLength::Bytes)
        .unwrap_or_default();
    let kind = if args.fixed {
        BufferKind::Fixed
    } else {
        BufferKind::Heap
    };
    FilterOptions::new()
        .input_buffer_length(length)
        .output_buffer_length(length)
        .buffer_kind(kind)
}

fn run() -> Result<()> {
    let args = Args::parse();
    logsetup::init_logger(args.verbose, args.color);

    let reader: Box<dyn Read> = match &args.input {
        Some(path) => {
            Box::new(fs::File::open(path).with_context(|| format!("Couldn't open {path}"))?)
        }
        None => Box::new(io::stdin().lock()),
    };
    let writer = BufWriter::new(io::stdout().lock());

    let written = if args.decompress {
        Converter::with_options(args.format.decoder(), options(&args))?
            .convert_stream(reader, writer)
    } else {
        Converter::with_options(args.format.encoder(), options(&args))?
            .convert_stream(reader, writer)
    }
    .with_context(|| format!("{} conversion failed", args.format))?;

    info!("wrote {written} bytes");
    Ok(())
}

fn main() {
    run().unwrap_or_else(|e| {
        error!("{:?}", e);
        process::exit(1);
    });
}
