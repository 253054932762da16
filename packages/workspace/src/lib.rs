//! Host-side implementations of the code writer boundaries.

pub mod diff_command;
pub mod errors;
pub mod fs_writer;
pub mod key_cleaner;
pub mod navigator;

pub use diff_command::CommandDiffRequester;
pub use errors::{AdapterError, AdapterResult};
pub use fs_writer::FsWriteApplier;
pub use key_cleaner::{FsKeyCleaner, DEFAULT_KEY_ATTRIBUTE};
pub use navigator::{extract_range, FsSourceNavigator};
