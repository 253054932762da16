pub mod clean;
pub mod init;
pub mod replay;

pub use clean::{clean, CleanArgs};
pub use init::{init, InitArgs};
pub use replay::{replay, ReplayArgs};
