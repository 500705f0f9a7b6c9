mod boot;
mod collaborators;

use std::fs::OpenOptions;
use std::path::PathBuf;

use clap::Parser;

use collaborators::{FsInfoWriter, NoRescueDirectory, StdinOracle};
use fatfsck_engine::{BootBlock, ClusterWidth, Status};

/// Check and repair a FAT12/16/32 allocation table.
#[derive(Parser)]
#[command(name = "fatfsck")]
#[command(about = "Check and repair a FAT12/16/32 file allocation table", long_about = None)]
struct Cli {
    /// Path to the device or disk image to check
    device: PathBuf,

    /// Assume "yes" to every question instead of prompting
    #[arg(short = 'y', long)]
    yes: bool,

    /// Open read-only; report problems but never write
    #[arg(short = 'n', long = "read-only")]
    read_only: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut file = OpenOptions::new()
        .read(true)
        .write(!cli.read_only)
        .open(&cli.device)?;

    let mut boot = boot::Bpb::read(&mut file)?;
    let mut oracle = StdinOracle { auto_yes: cli.yes };

    // FAT12 carries no clean-dismount bit; checkdirty always answers
    // `false` for it, which would otherwise make every FAT12 volume
    // print this notice regardless of how it was last unmounted.
    let has_dirty_bit = matches!(boot.cluster_width(), ClusterWidth::Fat16 | ClusterWidth::Fat32);
    if has_dirty_bit && !fatfsck_engine::checkdirty(&mut file, &boot)? {
        println!("** {} was not properly dismounted", cli.device.display());
    }

    let (mut fat, mut status) =
        fatfsck_engine::readfat(&mut file, &boot, cli.read_only, &mut oracle)?;
    status |= fatfsck_engine::scan(&mut fat, &mut boot, &mut oracle);

    // Directory traversal - the step that would clear the head bit of
    // every cluster chain actually referenced from a directory entry -
    // is a separate collaborator this binary does not implement. Every
    // head `scan` left standing is therefore treated as lost.
    let mut reconnect = NoRescueDirectory;
    {
        let mut fsinfo_writer = FsInfoWriter {
            file: &mut file,
            fs_info_sector: boot.fs_info_sector(),
            bytes_per_sector: boot.bytes_per_sector(),
        };
        status |= fatfsck_engine::checklost(
            &mut fat,
            &mut boot,
            &mut oracle,
            &mut reconnect,
            &mut fsinfo_writer,
        );
    }

    if status.contains(Status::FATMOD) && !cli.read_only {
        status |= fatfsck_engine::writefat(&mut file, &fat, &boot)?;
    }

    if status.contains(Status::FATAL) {
        eprintln!("** {}: unrecoverable error", cli.device.display());
        std::process::exit(8);
    }
    if status.contains(Status::ERROR) {
        println!("** {}: unrepaired errors remain", cli.device.display());
        std::process::exit(1);
    }
    if status.contains(Status::FATMOD) {
        println!("** {}: corrected", cli.device.display());
    } else {
        println!("** {}: clean", cli.device.display());
    }

    Ok(())
}
