mod decode;
mod encode;
mod show;

#[macro_use]
extern crate clap;
use clap::Parser;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::slice::from_raw_parts;

fn main() {
    use Commands::*;
    let cli = Cli::parse();

    let level = cli.log.unwrap_or(LevelFilter::Info);
    if let Err(e) = SimpleLogger::new().with_level(level).init() {
        eprintln!("{ERR}{e}");
    }

    match cli.command {
        Show(args) => args.show(),
        Encode(args) => args.encode(),
        Decode(args) => args.decode(),
    }
}

#[derive(Parser)]
#[clap(name = "vwb-utils")]
#[clap(version, about, long_about = None)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace
    #[clap(long, global = true)]
    log: Option<LevelFilter>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the header and tensors of a weight blob
    Show(show::ShowArgs),
    /// Encode raw int8 tensors into a weight blob
    Encode(encode::EncodeArgs),
    /// Decode a weight blob into raw int8 tensors
    Decode(decode::DecodeArgs),
}

const YES: &str = "✔️  ";
const ERR: &str = "❌  ";

#[inline]
fn as_i8(data: &[u8]) -> &[i8] {
    unsafe { from_raw_parts(data.as_ptr().cast(), data.len()) }
}

#[inline]
fn as_u8(data: &[i8]) -> &[u8] {
    unsafe { from_raw_parts(data.as_ptr().cast(), data.len()) }
}

#[test]
fn test_log_level() {
    let cli = Cli::try_parse_from(["vwb-utils", "--log", "debug", "show", "a.vwb"]).unwrap();
    assert_eq!(cli.log, Some(LevelFilter::Debug));

    let cli = Cli::try_parse_from(["vwb-utils", "show", "a.vwb"]).unwrap();
    assert_eq!(cli.log, None);

    assert!(Cli::try_parse_from(["vwb-utils", "--log", "loud", "show", "a.vwb"]).is_err());
}
