use std::path::PathBuf;
use std::process;

use clap::Parser;

use minifat::{DiskImage, FatFs};

/// Format a new minifat disk image.
#[derive(Parser)]
#[command(name = "makefs")]
struct Cli {
    /// Path of the disk image to create.
    image: PathBuf,

    /// Block size in bytes (512, 1024, 2048 or 4096).
    block_size: u16,
}

fn main() {
    env_logger::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            eprintln!("{error}");
            process::exit(1);
        }
    };

    if let Err(error) = run(&cli) {
        eprintln!("{error}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> minifat::Result<()> {
    let device = DiskImage::create(&cli.image)?;
    FatFs::format(device, cli.block_size)?;
    Ok(())
}
