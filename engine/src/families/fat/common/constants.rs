// Reserved cluster-value sentinels and width masks.
//
// Values are kept in the "sign-extended" domain used throughout the
// engine: a raw width-masked entry that falls at or above CLUST_BAD gets
// its high bits set to 1 at decode time (see `codec`), so the rest of the
// engine can compare against one canonical set of sentinels regardless of
// whether the table is FAT12, FAT16, or FAT32.

/// First cluster usable for data; clusters 0 and 1 hold BPB signature bits.
pub const CLUST_FIRST: u32 = 2;

/// A cluster that belongs to no chain.
pub const CLUST_FREE: u32 = 0;

/// Reserved cluster band, low boundary (sign-extended domain).
pub const CLUST_RSRVD: u32 = 0xffff_fff0;

/// The single "bad cluster" sentinel (sign-extended domain).
pub const CLUST_BAD: u32 = 0xffff_fff7;

/// Low boundary of the end-of-file band (sign-extended domain).
pub const CLUST_EOFS: u32 = 0xffff_fff8;

/// Canonical end-of-file marker written when truncating a chain.
pub const CLUST_EOF: u32 = 0xffff_ffff;

/// Sentinel returned by accessors on a fatal/out-of-range access.
pub const CLUST_DEAD: u32 = 1;

/// FAT12 entries are 12 bits wide.
pub const CLUST12_MASK: u32 = 0x0000_0fff;

/// FAT16 entries are 16 bits wide.
pub const CLUST16_MASK: u32 = 0x0000_ffff;

/// FAT32 entries are 28 usable bits within a 32-bit slot.
pub const CLUST32_MASK: u32 = 0x0fff_ffff;

static_assertions::const_assert!(CLUST_RSRVD < CLUST_BAD);
static_assertions::const_assert!(CLUST_BAD < CLUST_EOFS);
static_assertions::const_assert!(CLUST_EOFS <= CLUST_EOF);

/// Describe a bad chain continuation for warning messages: below the
/// reserved band it's simply out of range, at or above it it's one of
/// the reserved sentinel values read back as a (bogus) successor.
pub fn continuation_label(next: u32) -> &'static str {
    if next < CLUST_RSRVD {
        "out of range"
    } else {
        "reserved"
    }
}
