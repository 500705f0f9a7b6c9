// FAT12/16/32 consistency-checker engine.
//
// Loads a FAT table, walks every cluster chain, detects structural
// damage, and writes repairs back to disk. Boot-sector parsing,
// directory traversal, lost-chain reconnection into a rescue directory,
// and the interactive prompt are supplied by whatever embeds this
// engine; see `families::fat::collaborators` for the contracts.

pub mod families;

pub use families::fat::{
    checkchain, checkdirty, checklost, clearchain, readfat, scan, writefat, Bitmap, BootBlock,
    ChainOutcome, ClusterWidth, FatDescriptor, Initial, Oracle, ReconnectSink, ReconnectStatus,
    Status, WriteFsInfo, CLUST_FIRST,
};
