use std::ops::Range;

use crate::fs::{Result, BLOCK_SIZE, INODE_FIRST_BLOCK};
use crate::io::{BlockNumber, BlockStorage};

use log::trace;
use zerocopy::{AsBytes, FromBytes};

/// Number of direct block pointers carried by every inode.
pub const INODE_PTR_COUNT: usize = 16;
/// Serialized size of an inode record in the inode table.
pub const INODE_SIZE: usize = 64;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;

#[repr(C)]
#[derive(AsBytes, FromBytes, Debug, Default, Clone, Copy, PartialEq, Eq)]
/// This structure __must be exactly 64 bytes__ with no implicit padding, the
/// in-core copy is written to disk byte for byte.
pub struct Inode {
    /// The total size of the file in bytes.
    pub size: u32,
    /// Number of holders of the in-core copy. Stored on disk along with the
    /// rest of the record but meaningless once reloaded.
    pub ref_count: u32,
    /// Index of this inode in the inode table.
    pub inode_num: u32,
    /// The id of the owning user.
    pub owner_id: u16,
    /// Direct pointers for the data blocks that belong to the file, 0 marks
    /// an unassigned entry.
    pub block_ptr: [u16; INODE_PTR_COUNT],
    pub permissions: u8,
    /// File type and attribute bits.
    pub flags: u8,
    /// The number of links to this file.
    pub link_count: u8,
    reserved: [u8; 15],
}

impl Inode {
    /// An empty inode bound to `inode_num`.
    pub fn new(inode_num: u32) -> Self {
        Self {
            inode_num,
            ..Self::default()
        }
    }

    /// Clears the file attributes and block pointers. The inode number and
    /// reference count are left alone.
    pub fn initialize(&mut self) {
        self.size = 0;
        self.owner_id = 0;
        self.permissions = 0;
        self.flags = 0;
        self.link_count = 0;
        self.block_ptr = [0; INODE_PTR_COUNT];
    }
}

/// Position of an inode record inside the inode table.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InodeLocation {
    pub block: BlockNumber,
    pub offset: usize,
}

impl InodeLocation {
    pub fn of(inode_num: u32) -> Self {
        let byte = inode_num as usize * INODE_SIZE;
        Self {
            block: INODE_FIRST_BLOCK + byte / BLOCK_SIZE,
            offset: byte % BLOCK_SIZE,
        }
    }

    fn range(&self) -> Range<usize> {
        self.offset..self.offset + INODE_SIZE
    }
}

/// Stores `node` in the inode table slot named by its `inode_num`. The
/// containing block is read first so records sharing it are preserved.
pub fn write_inode<T: BlockStorage>(dev: &mut T, node: &Inode) -> Result<()> {
    let loc = InodeLocation::of(node.inode_num);
    let mut block_buffer = [0; BLOCK_SIZE];
    dev.read_block(loc.block, &mut block_buffer)?;
    block_buffer[loc.range()].copy_from_slice(node.as_bytes());
    dev.write_block(loc.block, &block_buffer)?;
    trace!(
        "Wrote inode {} to block {} offset {}.",
        node.inode_num,
        loc.block,
        loc.offset
    );
    Ok(())
}

/// Loads the record stored for `inode_num` into `dest` verbatim.
pub fn read_inode<T: BlockStorage>(dev: &mut T, dest: &mut Inode, inode_num: u32) -> Result<()> {
    let loc = InodeLocation::of(inode_num);
    let mut block_buffer = [0; BLOCK_SIZE];
    dev.read_block(loc.block, &mut block_buffer)?;
    dest.as_bytes_mut().copy_from_slice(&block_buffer[loc.range()]);
    trace!(
        "Read inode {} from block {} offset {}.",
        inode_num,
        loc.block,
        loc.offset
    );
    Ok(())
}
