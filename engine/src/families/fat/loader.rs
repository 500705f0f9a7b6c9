// Loads a FAT copy into memory and validates its opening signature.
//
// The first two (FAT12/16) or four (FAT32) bytes of a FAT are a
// pseudo-entry: the low byte echoes the BPB media descriptor and the
// rest is padding fixed at 0xff, except that some Windows versions
// repurpose a couple of bits as a "dismounted cleanly" flag. Loading a
// FAT means getting these bytes into memory (mapped if possible, a
// heap copy otherwise) and deciding what they say about the volume.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use fatfsck_core::{FsckError, FsckResult};
use memmap2::MmapOptions;

use super::collaborators::{BootBlock, Oracle};
use super::codec::ClusterWidth;
use super::descriptor::{FatBuffer, FatDescriptor};
use super::status::Status;

/// Quick pre-check of the volume's clean-dismount flag, without loading
/// the whole FAT: reads just the sector holding the first FAT entries.
///
/// Only meaningful for FAT16/32 (FAT12 carries no such flag). Returns
/// `true` only when the opening bytes match a signature this checker
/// understands *and* both the "cleanly dismounted" and "no I/O error"
/// bits are set; an unrecognized signature is treated pessimistically,
/// the same as a volume that was not cleanly dismounted.
pub fn checkdirty(file: &mut File, boot: &dyn BootBlock) -> FsckResult<bool> {
    if !matches!(boot.cluster_width(), ClusterWidth::Fat16 | ClusterWidth::Fat32) {
        return Ok(false);
    }

    let off = boot.reserved_sectors() as u64 * boot.bytes_per_sector() as u64;
    let mut buf = vec![0u8; boot.bytes_per_sector() as usize];
    file.seek(SeekFrom::Start(off)).map_err(FsckError::Io)?;
    file.read_exact(&mut buf).map_err(FsckError::Io)?;

    if buf[0] != boot.media() || buf[1] != 0xff {
        return Ok(false);
    }
    let clean = match boot.cluster_width() {
        ClusterWidth::Fat16 => {
            if (buf[2] & 0xf8) != 0xf8 || (buf[3] & 0x3f) != 0x3f {
                return Ok(false);
            }
            (buf[3] & 0xc0) == 0xc0
        }
        ClusterWidth::Fat32 => {
            if buf[2] != 0xff
                || (buf[3] & 0x0f) != 0x0f
                || (buf[4] & 0xf8) != 0xf8
                || buf[5] != 0xff
                || buf[6] != 0xff
                || (buf[7] & 0x03) != 0x03
            {
                return Ok(false);
            }
            (buf[7] & 0x0c) == 0x0c
        }
        ClusterWidth::Fat12 => unreachable!(),
    };
    Ok(clean)
}

fn try_mmap(file: &File, offset: u64, len: usize) -> Option<memmap2::MmapMut> {
    unsafe { MmapOptions::new().offset(offset).len(len).map_mut(file).ok() }
}

fn load_bytes(file: &mut File, offset: u64, len: usize, rdonly: bool) -> FsckResult<FatBuffer> {
    if !rdonly {
        if let Some(map) = try_mmap(file, offset, len) {
            return Ok(FatBuffer::Mapped(map));
        }
    }

    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| FsckError::Fatal(format!("no space for FAT sectors ({len} bytes)")))?;
    buf.resize(len, 0);
    file.seek(SeekFrom::Start(offset)).map_err(FsckError::Io)?;
    file.read_exact(&mut buf).map_err(FsckError::Io)?;
    Ok(FatBuffer::Heap(buf))
}

/// Expected padding bytes following the media byte, by width. FAT12's
/// entry 1 only fills two bytes, so only bytes 1-2 are checked; FAT16
/// adds a third all-ones byte; FAT32's wider entry 0/1 pair checks five
/// more bytes, with both low nibbles reserved at 0xf.
fn expected_signature(width: ClusterWidth) -> &'static [u8] {
    match width {
        ClusterWidth::Fat12 => &[0xff, 0xff],
        ClusterWidth::Fat16 => &[0xff, 0xff, 0xff],
        ClusterWidth::Fat32 => &[0xff, 0xff, 0x0f, 0xff, 0xff, 0xff, 0x0f],
    }
}

/// OSR2-variant padding some Windows versions write on a dirty dismount.
fn osr2_signature(width: ClusterWidth) -> Option<&'static [u8]> {
    match width {
        ClusterWidth::Fat16 => Some(&[0xff, 0xff, 0x7f]),
        ClusterWidth::Fat32 => Some(&[0xff, 0xff, 0x0f, 0xff, 0xff, 0xff, 0x07]),
        ClusterWidth::Fat12 => None,
    }
}

fn signature_matches(buf: &[u8], media: u8, expected: &[u8]) -> bool {
    buf[0] == media && buf[1..1 + expected.len()] == *expected
}

/// Whether the opening bytes are an acceptable (not necessarily
/// canonical) signature. FAT16 requires an exact match; FAT32's bytes 3
/// and 7 are only constrained in their low nibble (the high nibble is
/// reserved and not checked), matching the reference checker's
/// `(buffer[3]&0x0f) != 0x0f` / `(buffer[7]&0x0f) != 0x0f` tests rather
/// than full-byte equality.
fn signature_acceptable(buf: &[u8], media: u8, width: ClusterWidth) -> bool {
    if buf[0] != media || buf[1] != 0xff || buf[2] != 0xff {
        return false;
    }
    match width {
        ClusterWidth::Fat12 => true,
        ClusterWidth::Fat16 => buf[3] == 0xff,
        ClusterWidth::Fat32 => {
            (buf[3] & 0x0f) == 0x0f && buf[4] == 0xff && buf[5] == 0xff && buf[6] == 0xff && (buf[7] & 0x0f) == 0x0f
        }
    }
}

/// Load (map or read) the primary FAT copy and validate its opening
/// signature, correcting it in place if the operator agrees.
pub fn readfat(
    file: &mut File,
    boot: &dyn BootBlock,
    rdonly: bool,
    oracle: &mut dyn Oracle,
) -> FsckResult<(FatDescriptor, Status)> {
    let mut status = Status::OK;
    let width = boot.cluster_width();
    let fatsize = boot.fat_sectors() as usize * boot.bytes_per_sector() as usize;
    let offset = boot.reserved_sectors() as u64 * boot.bytes_per_sector() as u64;

    let buffer = load_bytes(file, offset, fatsize, rdonly)?;
    let mut fat = FatDescriptor::new(width, boot.num_clusters(), buffer, rdonly)?;

    let expected = expected_signature(width);
    let raw = fat.raw();
    if !signature_acceptable(raw, boot.media(), width) {
        if let Some(osr2) = osr2_signature(width) {
            if signature_matches(raw, boot.media(), osr2) {
                return Ok((fat, status | Status::FSDIRTY));
            }
        }

        let shown: Vec<String> = raw[..1 + expected.len()].iter().map(|b| format!("{b:02x}")).collect();
        log::warn!("FAT starts with odd byte sequence ({})", shown.join(""));

        if !rdonly && oracle.ask(true, "Correct") {
            let mut patched = vec![boot.media()];
            patched.extend_from_slice(expected);
            fat.patch_raw(&patched);
            status |= Status::FATMOD;
        } else {
            status |= Status::ERROR;
        }
    }

    Ok((fat, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempfile;

    struct FixedBoot {
        width: ClusterWidth,
        num_clusters: u32,
        reserved_sectors: u32,
        bytes_per_sector: u32,
        fat_sectors: u32,
        media: u8,
    }

    impl BootBlock for FixedBoot {
        fn cluster_width(&self) -> ClusterWidth {
            self.width
        }
        fn num_clusters(&self) -> u32 {
            self.num_clusters
        }
        fn fat_sectors(&self) -> u32 {
            self.fat_sectors
        }
        fn bytes_per_sector(&self) -> u32 {
            self.bytes_per_sector
        }
        fn reserved_sectors(&self) -> u32 {
            self.reserved_sectors
        }
        fn num_fats(&self) -> u8 {
            2
        }
        fn media(&self) -> u8 {
            self.media
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

    struct AlwaysAnswer(bool);
    impl Oracle for AlwaysAnswer {
        fn ask(&mut self, _default: bool, _prompt: &str) -> bool {
            self.0
        }
    }

    fn fat16_boot() -> FixedBoot {
        FixedBoot {
            width: ClusterWidth::Fat16,
            num_clusters: 8,
            reserved_sectors: 1,
            bytes_per_sector: 16,
            fat_sectors: 1,
            media: 0xf8,
        }
    }

    fn fat32_boot() -> FixedBoot {
        FixedBoot {
            width: ClusterWidth::Fat32,
            num_clusters: 70_000,
            reserved_sectors: 1,
            bytes_per_sector: 32,
            fat_sectors: 1,
            media: 0xf8,
        }
    }

    fn image_with_fat(reserved_bytes: usize, fat_bytes: &[u8]) -> File {
        let mut file = tempfile().unwrap();
        file.write_all(&vec![0u8; reserved_bytes]).unwrap();
        file.write_all(fat_bytes).unwrap();
        file
    }

    #[test]
    fn checkdirty_reports_clean_when_both_flags_are_set() {
        let boot = fat16_boot();
        let mut fat = vec![0u8; 16];
        fat[0] = 0xf8;
        fat[1] = 0xff;
        fat[2] = 0xf8; // low 3 bits of the reserved byte set
        fat[3] = 0xff; // both ClnShutBitMask and HrdErrBitMask set
        let mut file = image_with_fat(16, &fat);
        assert!(checkdirty(&mut file, &boot).unwrap());
    }

    #[test]
    fn checkdirty_reports_not_clean_when_unrecognized() {
        let boot = fat16_boot();
        let fat = vec![0u8; 16];
        let mut file = image_with_fat(16, &fat);
        assert!(!checkdirty(&mut file, &boot).unwrap());
    }

    #[test]
    fn readfat_accepts_a_clean_signature_without_asking() {
        let boot = fat16_boot();
        let mut fat = vec![0u8; 16];
        fat[0] = 0xf8;
        fat[1] = 0xff;
        fat[2] = 0xff;
        fat[3] = 0xff;
        let mut file = image_with_fat(16, &fat);
        let mut oracle = AlwaysAnswer(false);
        let (descriptor, status) = readfat(&mut file, &boot, true, &mut oracle).unwrap();
        assert!(status.is_ok());
        assert_eq!(descriptor.raw()[..4], fat[..4]);
    }

    #[test]
    fn readfat_accepts_fat32_reserved_high_nibbles_without_asking() {
        // Bytes 3 and 7 only constrain their low nibble; the high
        // nibble (here garbage 0xa/0x5) is reserved and must not be
        // rejected as an odd byte sequence.
        let boot = fat32_boot();
        let mut fat = vec![0u8; 32];
        fat[0] = 0xf8;
        fat[1] = 0xff;
        fat[2] = 0xff;
        fat[3] = 0xaf;
        fat[4] = 0xff;
        fat[5] = 0xff;
        fat[6] = 0xff;
        fat[7] = 0x5f;
        let mut file = image_with_fat(32, &fat);
        let mut oracle = AlwaysAnswer(false);
        let (descriptor, status) = readfat(&mut file, &boot, true, &mut oracle).unwrap();
        assert!(status.is_ok());
        assert_eq!(descriptor.raw()[..8], fat[..8]);
    }

    #[test]
    fn readfat_corrects_an_odd_signature_when_asked() {
        let boot = fat16_boot();
        let fat = vec![0u8; 16];
        let mut file = image_with_fat(16, &fat);
        let mut oracle = AlwaysAnswer(true);
        let (descriptor, status) = readfat(&mut file, &boot, false, &mut oracle).unwrap();
        assert!(status.contains(Status::FATMOD));
        assert_eq!(&descriptor.raw()[..4], &[0xf8, 0xff, 0xff, 0xff]);
    }

    #[test]
    fn readfat_detects_the_osr2_dirty_variant_without_asking() {
        let boot = fat16_boot();
        let mut fat = vec![0u8; 16];
        fat[0] = 0xf8;
        fat[1] = 0xff;
        fat[2] = 0xff;
        fat[3] = 0x7f;
        let mut file = image_with_fat(16, &fat);
        let mut oracle = AlwaysAnswer(false);
        let (_descriptor, status) = readfat(&mut file, &boot, true, &mut oracle).unwrap();
        assert!(status.contains(Status::FSDIRTY));
        assert!(!status.contains(Status::FATMOD));
    }
}
