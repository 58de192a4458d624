use crate::alloc::{self, State};
use crate::cache::{InodeCache, SlotId, DEFAULT_INCORE_CAPACITY};
use crate::inode::{self, Inode, INODES_PER_BLOCK};
use crate::io::{BlockNumber, BlockStorage};

use log::{debug, info};
use thiserror::Error;

pub const BLOCK_SIZE: usize = 4096;

/// Known locations.
pub const SUPERBLOCK_INDEX: BlockNumber = 0;
pub const INODE_BITMAP_BLOCK: BlockNumber = 1;
pub const BLOCK_BITMAP_BLOCK: BlockNumber = 2;
pub const INODE_FIRST_BLOCK: BlockNumber = 3;
/// Blocks reserved for the inode table by `SFS::create`.
pub const INODE_BLOCKS: usize = 4;
pub const DATA_FIRST_BLOCK: BlockNumber = INODE_FIRST_BLOCK + INODE_BLOCKS;
/// Inodes addressable by a formatted image.
pub const INODE_COUNT: usize = INODE_BLOCKS * INODES_PER_BLOCK;

/// Units tracked by a single bitmap block.
const BITMAP_CAPACITY: usize = BLOCK_SIZE * 8;

#[derive(Error, Debug)]
pub enum SFSError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("block device error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SFSError>;

/// A file system image split into a reserved superblock, an inode bitmap, a
/// block bitmap, the inode table and the data region.
///
/// # Layout
/// ==============================================================================
/// | SuperBlock | Bitmap (inodes) | Bitmap (data region) | Inodes | Data Region |
/// ==============================================================================
///
/// Inodes are handed out through a bounded in-core cache. `iget` returns a
/// `SlotId` that stays valid until the matching `iput`; slot contents are only
/// persisted when the caller asks for it with `write_slot`.
pub struct SFS<T: BlockStorage> {
    dev: T,
    cache: InodeCache,
}

impl<T: BlockStorage> SFS<T> {
    /// Formats owned block storage and opens it with the default cache size.
    ///
    /// Every metadata block is marked used in the block bitmap so the first
    /// allocation lands on `DATA_FIRST_BLOCK`, as is every bit beyond the
    /// device's last block. Inode numbers the table has no room for are marked
    /// used in the inode bitmap.
    pub fn create(mut dev: T) -> Result<Self> {
        // Reusable buffer for writing blocks.
        let mut block_buffer = [0; BLOCK_SIZE];

        dev.write_block(SUPERBLOCK_INDEX, &block_buffer)?;
        for blocknr in INODE_FIRST_BLOCK..DATA_FIRST_BLOCK {
            dev.write_block(blocknr, &block_buffer)?;
        }

        for inum in INODE_COUNT..BITMAP_CAPACITY {
            alloc::set_free(&mut block_buffer, inum, State::Used);
        }
        dev.write_block(INODE_BITMAP_BLOCK, &block_buffer)?;

        // Blocks past the end of the device can never be handed out.
        let device_end = std::cmp::min(dev.block_count(), BITMAP_CAPACITY);
        let mut block_buffer = [0; BLOCK_SIZE];
        for blocknr in SUPERBLOCK_INDEX..DATA_FIRST_BLOCK {
            alloc::set_free(&mut block_buffer, blocknr, State::Used);
        }
        for blocknr in device_end..BITMAP_CAPACITY {
            alloc::set_free(&mut block_buffer, blocknr, State::Used);
        }
        dev.write_block(BLOCK_BITMAP_BLOCK, &block_buffer)?;
        dev.sync_disk()?;

        info!(
            "Formatted {} block image with {} inodes, data region starts at block {}.",
            device_end, INODE_COUNT, DATA_FIRST_BLOCK
        );
        Ok(Self::open(dev))
    }

    /// Attaches to an already formatted device. Nothing on disk is validated.
    pub fn open(dev: T) -> Self {
        Self::open_with_capacity(dev, DEFAULT_INCORE_CAPACITY)
    }

    pub fn open_with_capacity(dev: T, capacity: usize) -> Self {
        info!("Opened image with {} in-core inode slots.", capacity);
        SFS {
            dev,
            cache: InodeCache::new(capacity),
        }
    }

    /// Flushes and closes the device. Cached inodes are not written back.
    pub fn close(self) -> Result<()> {
        info!(
            "Closing image with {} inode slots still referenced.",
            self.cache.in_use()
        );
        self.dev.close()?;
        Ok(())
    }

    /// Gives the device back without closing it.
    pub fn into_device(self) -> T {
        self.dev
    }

    pub fn cache(&self) -> &InodeCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut InodeCache {
        &mut self.cache
    }

    pub fn alloc(&mut self) -> Result<Option<BlockNumber>> {
        alloc::alloc(&mut self.dev)
    }

    pub fn free(&mut self, blocknr: BlockNumber) -> Result<()> {
        if blocknr >= std::cmp::min(self.dev.block_count(), BITMAP_CAPACITY) {
            return Err(SFSError::InvalidArgument(format!(
                "block {} is past the end of the device",
                blocknr
            )));
        }
        alloc::free(&mut self.dev, blocknr)
    }

    pub fn ialloc(&mut self) -> Result<Option<Inode>> {
        alloc::ialloc(&mut self.dev)
    }

    pub fn ifree(&mut self, inode_num: u32) -> Result<()> {
        if inode_num as usize >= BITMAP_CAPACITY {
            return Err(SFSError::InvalidArgument(format!(
                "inode {} is outside the inode bitmap",
                inode_num
            )));
        }
        alloc::ifree(&mut self.dev, inode_num)
    }

    /// Number of unallocated blocks in the block bitmap.
    pub fn free_blocks(&mut self) -> Result<usize> {
        self.count_free(BLOCK_BITMAP_BLOCK)
    }

    /// Number of unallocated inode numbers in the inode bitmap.
    pub fn free_inodes(&mut self) -> Result<usize> {
        self.count_free(INODE_BITMAP_BLOCK)
    }

    fn count_free(&mut self, bitmap_block: BlockNumber) -> Result<usize> {
        let mut block_buffer = [0; BLOCK_SIZE];
        self.dev.read_block(bitmap_block, &mut block_buffer)?;
        Ok(alloc::count_free(&block_buffer))
    }

    pub fn read_inode(&mut self, dest: &mut Inode, inode_num: u32) -> Result<()> {
        inode::read_inode(&mut self.dev, dest, inode_num)
    }

    pub fn write_inode(&mut self, node: &Inode) -> Result<()> {
        inode::write_inode(&mut self.dev, node)
    }

    /// Acquires inode `inode_num` through the in-core cache.
    ///
    /// A free slot still holding `inode_num` is reused as is. Otherwise the
    /// lowest free slot is bound to `inode_num` and loaded from disk. Returns
    /// `None` when every slot is referenced.
    ///
    /// An inode that is already referenced is never shared: acquiring it again
    /// loads a second copy into a different slot.
    pub fn iget(&mut self, inode_num: u32) -> Result<Option<SlotId>> {
        if let Some(slot) = self.cache.find(inode_num) {
            debug!("Inode {} reused from slot {}.", inode_num, slot.index());
            self.cache.get_mut(slot).ref_count = 1;
            return Ok(Some(slot));
        }

        let slot = match self.cache.find_free() {
            Some(slot) => slot,
            None => {
                debug!("No free in-core slot for inode {}.", inode_num);
                return Ok(None);
            }
        };

        // Load off to the side so a failed read leaves the slot as it was.
        let mut loaded = Inode::default();
        inode::read_inode(&mut self.dev, &mut loaded, inode_num)?;
        // The record on disk may predate this inode number being assigned.
        loaded.inode_num = inode_num;
        loaded.ref_count = 1;
        *self.cache.get_mut(slot) = loaded;
        debug!("Inode {} loaded into slot {}.", inode_num, slot.index());
        Ok(Some(slot))
    }

    /// Releases one reference to a slot. Releasing a free slot does nothing.
    pub fn iput(&mut self, slot: SlotId) {
        let node = self.cache.get_mut(slot);
        if node.ref_count > 0 {
            node.ref_count -= 1;
        }
    }

    pub fn inode(&self, slot: SlotId) -> &Inode {
        self.cache.get(slot)
    }

    pub fn inode_mut(&mut self, slot: SlotId) -> &mut Inode {
        self.cache.get_mut(slot)
    }

    /// Writes the cached copy held in `slot` to the inode table.
    pub fn write_slot(&mut self, slot: SlotId) -> Result<()> {
        inode::write_inode(&mut self.dev, self.cache.get(slot))
    }
}
