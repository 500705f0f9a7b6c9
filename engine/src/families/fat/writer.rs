// Writes the repaired table back to every FAT copy on the volume.
//
// When the primary copy was memory-mapped, the kernel has already
// flushed those changes in place; writing it out again would be
// redundant (and wrong if the mapping and the file ever diverged), so
// that copy is skipped and only the remaining copies are rewritten.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};

use fatfsck_core::FsckResult;

use super::collaborators::BootBlock;
use super::descriptor::FatDescriptor;
use super::status::Status;

/// Write the repaired buffer to every FAT copy except a memory-mapped
/// primary. A failure on one copy does not abort the loop: every
/// remaining copy is still attempted, and the first error encountered
/// is reported (as `Status::FATAL`) only after all copies were tried.
pub fn writefat(file: &mut File, fat: &FatDescriptor, boot: &dyn BootBlock) -> FsckResult<Status> {
    let start = if fat.is_mapped() { 1 } else { 0 };
    let mut any_failed = false;

    for i in start..boot.num_fats() {
        let off = (boot.reserved_sectors() as u64 + i as u64 * boot.fat_sectors() as u64)
            * boot.bytes_per_sector() as u64;
        let result = file
            .seek(SeekFrom::Start(off))
            .and_then(|_| file.write_all(fat.raw()));
        if let Err(e) = result {
            log::error!("failed to write FAT copy {i}: {e}");
            any_failed = true;
        }
    }

    if any_failed {
        Ok(Status::FATAL)
    } else {
        Ok(Status::OK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::fat::codec::ClusterWidth;
    use crate::families::fat::descriptor::FatBuffer;
    use std::io::Read;
    use tempfile::tempfile;

    struct FixedBoot;
    impl BootBlock for FixedBoot {
        fn cluster_width(&self) -> ClusterWidth {
            ClusterWidth::Fat16
        }
        fn num_clusters(&self) -> u32 {
            8
        }
        fn fat_sectors(&self) -> u32 {
            1
        }
        fn bytes_per_sector(&self) -> u32 {
            16
        }
        fn reserved_sectors(&self) -> u32 {
            1
        }
        fn num_fats(&self) -> u8 {
            2
        }
        fn media(&self) -> u8 {
            0xf8
        }
        fn fs_info_present(&self) -> bool {
            false
        }
        fn fs_free(&self) -> u32 {
            0
        }
        fn set_fs_free(&mut self, _value: u32) {}
        fn fs_next(&self) -> u32 {
            0
        }
        fn set_fs_next(&mut self, _value: u32) {}
        fn num_free(&self) -> u32 {
            0
        }
        fn set_num_free(&mut self, _value: u32) {}
        fn num_bad(&self) -> u32 {
            0
        }
        fn set_num_bad(&mut self, _value: u32) {}
    }

    #[test]
    fn writes_every_fat_copy_when_not_mapped() {
        let boot = FixedBoot;
        let mut file = tempfile().unwrap();
        file.set_len(48).unwrap();

        let buf = vec![0xabu8; 16];
        let fat = FatDescriptor::new(ClusterWidth::Fat16, 8, FatBuffer::Heap(buf), false).unwrap();

        let status = writefat(&mut file, &fat, &boot).unwrap();
        assert_eq!(status, Status::OK);

        for copy in 0..2u64 {
            let mut out = vec![0u8; 16];
            file.seek(SeekFrom::Start(16 + copy * 16)).unwrap();
            file.read_exact(&mut out).unwrap();
            assert_eq!(out, vec![0xabu8; 16]);
        }
    }
}
