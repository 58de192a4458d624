mod block;
mod diskemu;
#[cfg(test)]
pub(crate) mod faulty;

pub use block::{BlockNumber, BlockStorage};
pub use diskemu::{FileBlockEmulator, FileBlockEmulatorBuilder};
