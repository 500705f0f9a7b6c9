// The FAT consistency-checking engine.
//
// Loads a FAT12/16/32 allocation table into memory, walks every cluster
// chain, detects structural damage, and writes repaired tables back to
// every FAT copy on disk. Boot-sector parsing, directory traversal, lost
// chain reconnection, and the interactive prompt itself are external
// collaborators — see `collaborators`.

pub mod bitmap;
pub mod chain_checker;
pub mod chain_clear;
pub mod codec;
pub mod collaborators;
pub mod common;
pub mod descriptor;
pub mod loader;
pub mod lost_chain;
pub mod scanner;
pub mod status;
pub mod writer;

pub use bitmap::{Bitmap, Initial};
pub use chain_checker::{checkchain, ChainOutcome};
pub use chain_clear::clearchain;
pub use codec::ClusterWidth;
pub use collaborators::{BootBlock, Oracle, ReconnectSink, ReconnectStatus, WriteFsInfo};
pub use common::CLUST_FIRST;
pub use descriptor::FatDescriptor;
pub use loader::{checkdirty, readfat};
pub use lost_chain::checklost;
pub use scanner::scan;
pub use status::Status;
pub use writer::writefat;
