// In-memory FAT: the raw table bytes plus the used/head bitmaps built
// over it while scanning.

use memmap2::MmapMut;

use fatfsck_core::{FsckError, FsckResult};

use super::bitmap::{Bitmap, Initial};
use super::codec::ClusterWidth;
use super::common::{CLUST_DEAD, CLUST_FIRST};

/// Either the FAT is mapped straight onto the device file, or it's a
/// heap copy read in because mapping wasn't available (e.g. the backing
/// file isn't mmap-able, or the platform lacks shared writable maps).
pub(crate) enum FatBuffer {
    Mapped(MmapMut),
    Heap(Vec<u8>),
}

impl FatBuffer {
    fn as_slice(&self) -> &[u8] {
        match self {
            FatBuffer::Mapped(m) => &m[..],
            FatBuffer::Heap(v) => &v[..],
        }
    }

    fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            FatBuffer::Mapped(m) => &mut m[..],
            FatBuffer::Heap(v) => &mut v[..],
        }
    }
}

/// A loaded FAT table: the decoded entry width, the raw bytes, and the
/// used/head bitmaps maintained as the table is traversed and repaired.
///
/// Does not itself know about the boot sector beyond the cluster count
/// it was constructed with; every operation that needs BPB fields (the
/// media byte, FSInfo, ...) takes a `&dyn BootBlock` alongside it.
pub struct FatDescriptor {
    width: ClusterWidth,
    num_clusters: u32,
    buffer: FatBuffer,
    used: Bitmap,
    head: Bitmap,
    rdonly: bool,
}

impl FatDescriptor {
    pub(crate) fn new(
        width: ClusterWidth,
        num_clusters: u32,
        buffer: FatBuffer,
        rdonly: bool,
    ) -> FsckResult<Self> {
        let used = Bitmap::new(num_clusters as usize, Initial::AllZero)?;
        let head = Bitmap::new(num_clusters as usize, Initial::AllOne)?;
        Ok(FatDescriptor {
            width,
            num_clusters,
            buffer,
            used,
            head,
            rdonly,
        })
    }

    pub fn cluster_width(&self) -> ClusterWidth {
        self.width
    }

    pub fn num_clusters(&self) -> u32 {
        self.num_clusters
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.buffer, FatBuffer::Mapped(_))
    }

    pub fn is_read_only(&self) -> bool {
        self.rdonly
    }

    pub fn raw(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Overwrite the leading pseudo-entry bytes directly. Entries 0/1
    /// hold BPB echo bits rather than real cluster links, so correcting
    /// them bypasses the width codec.
    pub(crate) fn patch_raw(&mut self, bytes: &[u8]) {
        self.buffer.as_mut_slice()[..bytes.len()].copy_from_slice(bytes);
    }

    /// Whether `cl` is a valid, in-range data cluster number.
    pub fn is_valid(&self, cl: u32) -> bool {
        cl >= CLUST_FIRST && cl < self.num_clusters
    }

    /// Decode the entry for `cl`. Returns `CLUST_DEAD` for an
    /// out-of-range cluster rather than panicking; callers that must
    /// distinguish "dead" from a real dead-cluster value should check
    /// `is_valid` first.
    pub fn get_next(&self, cl: u32) -> u32 {
        if !self.is_valid(cl) {
            return CLUST_DEAD;
        }
        self.width.decode(self.buffer.as_slice(), cl)
    }

    pub fn set_next(&mut self, cl: u32, next: u32) -> FsckResult<()> {
        if self.rdonly {
            return Err(FsckError::ReadOnly(format!("cluster {cl}")));
        }
        if !self.is_valid(cl) {
            return Err(FsckError::FatalCorruption(format!("invalid cluster number {cl}")));
        }
        self.width.encode(self.buffer.as_mut_slice(), cl, next);
        Ok(())
    }

    pub fn is_used(&self, cl: u32) -> bool {
        self.used.test(cl as usize)
    }

    pub fn set_used(&mut self, cl: u32) {
        self.used.set(cl as usize);
    }

    pub fn clear_used(&mut self, cl: u32) {
        self.used.clear(cl as usize);
    }

    pub fn is_head(&self, cl: u32) -> bool {
        self.head.test(cl as usize)
    }

    pub fn clear_head(&mut self, cl: u32) {
        self.head.clear(cl as usize);
    }

    /// True unless the whole word covering `cl` is known to hold no
    /// head clusters, letting a sweep skip a full word at a time.
    pub fn head_word_is_empty(&self, cl: u32) -> bool {
        self.head.word_is_empty(cl as usize)
    }

    pub fn head_count(&self) -> usize {
        self.head.count()
    }
}
