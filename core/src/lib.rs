pub mod error;

pub use error::{FsckError, FsckResult};
