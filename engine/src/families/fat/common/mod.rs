// Shared constants for the FAT cluster-value domain.

pub mod constants;

pub use constants::*;
