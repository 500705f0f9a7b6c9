// Minimal BPB reader.
//
// Parses just enough of the BIOS Parameter Block to hand the FAT engine
// a cluster width, a cluster count, and the geometry of the table
// itself. Directory-entry fields, volume label, and anything past the
// FSInfo sector are outside what the engine needs and aren't read.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

use fatfsck_core::{FsckError, FsckResult};
use fatfsck_engine::{BootBlock, ClusterWidth};

const FSINFO_LEAD_SIG: u32 = 0x4161_5252;
const FSINFO_STRUC_SIG: u32 = 0x6141_7272;

pub struct Bpb {
    bytes_per_sector: u16,
    reserved_sectors: u16,
    num_fats: u8,
    media: u8,
    fat_size: u32,
    num_clusters: u32,
    width: ClusterWidth,

    fs_info_present: bool,
    fs_info_sector: u16,
    fs_free: u32,
    fs_next: u32,

    num_free: u32,
    num_bad: u32,
}

fn u16le(b: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([b[off], b[off + 1]])
}

fn u32le(b: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([b[off], b[off + 1], b[off + 2], b[off + 3]])
}

impl Bpb {
    pub fn read(file: &mut File) -> FsckResult<Bpb> {
        let mut sector0 = vec![0u8; 512];
        file.seek(SeekFrom::Start(0)).map_err(FsckError::Io)?;
        file.read_exact(&mut sector0).map_err(FsckError::Io)?;

        let bytes_per_sector = u16le(&sector0, 0x0b);
        let sectors_per_cluster = sector0[0x0d] as u32;
        let reserved_sectors = u16le(&sector0, 0x0e);
        let num_fats = sector0[0x10];
        let root_entries = u16le(&sector0, 0x11) as u32;
        let total_sectors16 = u16le(&sector0, 0x13) as u32;
        let media = sector0[0x15];
        let fat_size16 = u16le(&sector0, 0x16) as u32;
        let total_sectors32 = u32le(&sector0, 0x20);

        let fat_size32 = u32le(&sector0, 0x24);
        let fs_info_sector = u16le(&sector0, 0x30);

        if bytes_per_sector == 0 || sectors_per_cluster == 0 {
            return Err(FsckError::FatalCorruption(
                "zero bytes-per-sector or sectors-per-cluster in BPB".into(),
            ));
        }

        let fat_size = if fat_size16 != 0 { fat_size16 } else { fat_size32 };
        let total_sectors = if total_sectors16 != 0 { total_sectors16 } else { total_sectors32 };
        let root_dir_sectors =
            ((root_entries * 32) + (bytes_per_sector as u32 - 1)) / bytes_per_sector as u32;
        let data_sectors = total_sectors
            .saturating_sub(reserved_sectors as u32 + num_fats as u32 * fat_size + root_dir_sectors);
        // CountofClusters per the Microsoft BPB convention: width detection
        // keys off this raw count, but the engine's `num_clusters` is the
        // exclusive cluster-number bound, offset by the two reserved
        // pseudo-entries (see `CLUST_FIRST`).
        let count_of_clusters = data_sectors / sectors_per_cluster;
        let num_clusters = count_of_clusters + fatfsck_engine::CLUST_FIRST;

        let width = if count_of_clusters < 4085 {
            ClusterWidth::Fat12
        } else if count_of_clusters < 65525 {
            ClusterWidth::Fat16
        } else {
            ClusterWidth::Fat32
        };

        let mut bpb = Bpb {
            bytes_per_sector,
            reserved_sectors,
            num_fats,
            media,
            fat_size,
            num_clusters,
            width,
            fs_info_present: false,
            fs_info_sector,
            fs_free: 0xffff_ffff,
            fs_next: 0xffff_ffff,
            num_free: 0,
            num_bad: 0,
        };

        if width == ClusterWidth::Fat32 && fs_info_sector != 0 && fs_info_sector != 0xffff {
            bpb.read_fsinfo(file)?;
        }

        Ok(bpb)
    }

    fn read_fsinfo(&mut self, file: &mut File) -> FsckResult<()> {
        let off = self.fs_info_sector as u64 * self.bytes_per_sector as u64;
        let mut buf = vec![0u8; 512];
        file.seek(SeekFrom::Start(off)).map_err(FsckError::Io)?;
        file.read_exact(&mut buf).map_err(FsckError::Io)?;

        if u32le(&buf, 0) == FSINFO_LEAD_SIG && u32le(&buf, 0x1e4) == FSINFO_STRUC_SIG {
            self.fs_info_present = true;
            self.fs_free = u32le(&buf, 0x1e8);
            self.fs_next = u32le(&buf, 0x1ec);
        }
        Ok(())
    }

    pub fn fs_info_sector(&self) -> u16 {
        self.fs_info_sector
    }
}

impl BootBlock for Bpb {
    fn cluster_width(&self) -> ClusterWidth {
        self.width
    }
    fn num_clusters(&self) -> u32 {
        self.num_clusters
    }
    fn fat_sectors(&self) -> u32 {
        self.fat_size
    }
    fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector as u32
    }
    fn reserved_sectors(&self) -> u32 {
        self.reserved_sectors as u32
    }
    fn num_fats(&self) -> u8 {
        self.num_fats
    }
    fn media(&self) -> u8 {
        self.media
    }
    fn fs_info_present(&self) -> bool {
        self.fs_info_present
    }
    fn fs_free(&self) -> u32 {
        self.fs_free
    }
    fn set_fs_free(&mut self, value: u32) {
        self.fs_free = value;
    }
    fn fs_next(&self) -> u32 {
        self.fs_next
    }
    fn set_fs_next(&mut self, value: u32) {
        self.fs_next = value;
    }
    fn num_free(&self) -> u32 {
        self.num_free
    }
    fn set_num_free(&mut self, value: u32) {
        self.num_free = value;
    }
    fn num_bad(&self) -> u32 {
        self.num_bad
    }
    fn set_num_bad(&mut self, value: u32) {
        self.num_bad = value;
    }
}
