use std::error::Error;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use minifat::{normalize, DiskImage, FatFs};

/// Operate on a minifat disk image.
#[derive(Parser)]
#[command(name = "fsutil")]
struct Cli {
    /// Path of the disk image.
    image: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a directory.
    Mkdir { path: String },
    /// List a directory, or a single file.
    Dir { path: String },
    /// Delete a directory recursively.
    Rmdir { path: String },
    /// Copy a host file into the image.
    Write { dst_path: String, src_path: PathBuf },
    /// Copy a file out of the image onto the host.
    Read { src_path: String, dst_path: PathBuf },
    /// Delete a file.
    Del { path: String },
    /// Add or remove permission bits, e.g. `+rw` or `+r-w`.
    Chmod {
        #[arg(allow_hyphen_values = true)]
        mode: String,
        path: String,
    },
    /// Print allocation and tree diagnostics.
    Dumpfs,
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

    if let Err(error) = run(cli) {
        eprintln!("{error}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let device = DiskImage::open(&cli.image)?;
    let mut fs = FatFs::open(device)?;

    match cli.command {
        Command::Mkdir { path } => fs.create_directory(&normalize(&path))?,
        Command::Dir { path } => dir(&mut fs, &normalize(&path))?,
        Command::Rmdir { path } => fs.delete_directory(&normalize(&path))?,
        Command::Write { dst_path, src_path } => write(&mut fs, &normalize(&dst_path), &src_path)?,
        Command::Read { src_path, dst_path } => read(&mut fs, &normalize(&src_path), &dst_path)?,
        Command::Del { path } => fs.delete_file(&normalize(&path))?,
        Command::Chmod { mode, path } => fs.chmod(&normalize(&path), &mode)?,
        Command::Dumpfs => print!("{}", fs.dump()?),
    }
    Ok(())
}

fn dir(fs: &mut FatFs<DiskImage>, path: &str) -> minifat::Result<()> {
    let list = fs.list_directory(path)?;

    // Right-justify sizes to the widest one in the listing.
    let width = list
        .iter()
        .map(|attributes| attributes.size.max(0).to_string().len())
        .max()
        .unwrap_or(1);

    for attributes in &list {
        println!(
            "{}{}{} {} {} {:>width$} {}",
            if attributes.is_directory { 'd' } else { '-' },
            if attributes.can_read { 'r' } else { '-' },
            if attributes.can_write { 'w' } else { '-' },
            time_to_string(attributes.created),
            time_to_string(attributes.last_modified),
            attributes.size,
            attributes.name,
        );
    }
    Ok(())
}

fn write(fs: &mut FatFs<DiskImage>, dst_path: &str, src_path: &Path) -> Result<(), Box<dyn Error>> {
    let data = std::fs::read(src_path)?;
    fs.write_file(dst_path, &data)?;

    // Mirror the host file's owner read/write bits into the entry.
    let mode = std::fs::metadata(src_path)?.permissions().mode();
    let mut attributes = fs.read_attributes(dst_path)?;
    attributes.can_read = mode & 0o400 != 0;
    attributes.can_write = mode & 0o200 != 0;
    fs.write_attributes(dst_path, attributes)?;
    Ok(())
}

fn read(fs: &mut FatFs<DiskImage>, src_path: &str, dst_path: &Path) -> Result<(), Box<dyn Error>> {
    let data = fs.read_file(src_path)?;
    std::fs::write(dst_path, &data)?;

    // Mirror the entry's permission bits onto the host file's owner bits.
    let attributes = fs.read_attributes(src_path)?;
    let mut mode = 0;
    if attributes.can_read {
        mode |= 0o400;
    }
    if attributes.can_write {
        mode |= 0o200;
    }
    std::fs::set_permissions(dst_path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

/// Formats a nanosecond Unix timestamp as ISO-8601 UTC.
fn time_to_string(nanos: i64) -> String {
    let secs = nanos.div_euclid(1_000_000_000);
    let days = secs.div_euclid(86_400);
    let rem = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        rem / 3600,
        rem % 3600 / 60,
        rem % 60
    )
}

/// Gregorian calendar date for a day count relative to 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let days = days + 719_468;
    let era = days.div_euclid(146_097);
    let doe = days.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 4;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}
