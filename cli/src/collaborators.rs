// Concrete collaborators the engine needs but doesn't own: the
// interactive prompt, lost-chain reconnection, and FSInfo persistence.

use std::fs::File;
use std::io::{self, BufRead, Seek, SeekFrom, Write};

use fatfsck_engine::{BootBlock, Oracle, ReconnectSink, ReconnectStatus, Status, WriteFsInfo};

/// Prompts on stdin/stdout, unless `-y` was given, in which case every
/// question is answered with its default the way `fsck -y` would.
pub struct StdinOracle {
    pub auto_yes: bool,
}

impl Oracle for StdinOracle {
    fn ask(&mut self, default: bool, prompt: &str) -> bool {
        if self.auto_yes {
            println!("{prompt}? yes");
            return true;
        }

        print!("{prompt}? [{}] ", if default { "y" } else { "n" });
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return default;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }
    }
}

/// Reconnecting a lost chain into a rescue directory needs a directory
/// tree walker this crate doesn't have; every chain is reported as
/// unsupported so the operator is offered a plain clear instead.
pub struct NoRescueDirectory;

impl ReconnectSink for NoRescueDirectory {
    fn reconnect(&mut self, _head: u32, _length: usize) -> ReconnectStatus {
        ReconnectStatus::NotSupported
    }
}

/// Writes the reconciled free-cluster count and next-free hint back to
/// the FAT32 FSInfo sector.
pub struct FsInfoWriter<'a> {
    pub file: &'a mut File,
    pub fs_info_sector: u16,
    pub bytes_per_sector: u32,
}

impl WriteFsInfo for FsInfoWriter<'_> {
    fn write_fsinfo(&mut self, boot: &dyn BootBlock) -> Status {
        let off = self.fs_info_sector as u64 * self.bytes_per_sector as u64;
        let write = || -> io::Result<()> {
            self.file.seek(SeekFrom::Start(off + 0x1e8))?;
            self.file.write_all(&boot.fs_free().to_le_bytes())?;
            self.file.seek(SeekFrom::Start(off + 0x1ec))?;
            self.file.write_all(&boot.fs_next().to_le_bytes())?;
            Ok(())
        };
        match write() {
            Ok(()) => Status::FATMOD,
            Err(e) => {
                log::error!("unable to write FSInfo: {e}");
                Status::ERROR
            }
        }
    }
}
