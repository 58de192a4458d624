//! Allocation and inode management for a small Unix style file system laid
//! out over fixed 4K blocks.
//!
//! The image holds a reserved superblock, an inode bitmap, a block bitmap, a
//! packed inode table and the data region. [`SFS`] ties the bitmap allocators
//! and the inode serializer to a bounded in-core inode cache exposed through
//! `iget`/`iput`.
pub mod alloc;
pub mod cache;
mod fs;
pub mod inode;
pub mod io;

pub use crate::alloc::State;
pub use crate::cache::{InodeCache, SlotId, DEFAULT_INCORE_CAPACITY};
pub use crate::fs::{
    Result, SFSError, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, DATA_FIRST_BLOCK, INODE_BITMAP_BLOCK,
    INODE_BLOCKS, INODE_COUNT, INODE_FIRST_BLOCK, SFS, SUPERBLOCK_INDEX,
};
pub use crate::inode::{Inode, InodeLocation, INODE_PTR_COUNT, INODE_SIZE};
