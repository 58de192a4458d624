use crate::fs::{Result, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, INODE_BITMAP_BLOCK};
use crate::inode::Inode;
use crate::io::{BlockNumber, BlockStorage};

use log::{debug, trace};

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
    Free,
    Used,
}

/// Sets the allocation state of unit `index` in a raw bitmap buffer.
///
/// Bit `i` lives in byte `i / 8` at position `i % 8`, least significant bit
/// first. A set bit marks the unit as used. `index` must fall inside the buffer.
pub fn set_free(bitmap: &mut [u8], index: usize, state: State) {
    let mask = 0b01_u8 << (index % 8);
    match state {
        State::Used => bitmap[index / 8] |= mask,
        State::Free => bitmap[index / 8] &= !mask,
    }
}

/// Reads the allocation state of unit `index`.
pub fn get(bitmap: &[u8], index: usize) -> State {
    match (bitmap[index / 8] >> (index % 8)) & 0b01 {
        0 => State::Free,
        _ => State::Used,
    }
}

/// Returns the lowest free index in the bitmap or `None` if every bit is set.
pub fn find_free(bitmap: &[u8]) -> Option<usize> {
    FreeBits::new(bitmap).next()
}

/// Counts the free units tracked by the bitmap.
pub fn count_free(bitmap: &[u8]) -> usize {
    bitmap.iter().map(|byte| byte.count_zeros() as usize).sum()
}

/// Walks a bitmap yielding free unit indices in ascending order. Fully used
/// bytes are skipped without testing each bit.
pub struct FreeBits<'a> {
    /// Keeps track of the next starting place for looking for available units.
    marker: usize,
    bitmap: &'a [u8],
}

impl<'a> FreeBits<'a> {
    pub fn new(bitmap: &'a [u8]) -> Self {
        Self { marker: 0, bitmap }
    }
}

impl<'a> Iterator for FreeBits<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let cap = self.bitmap.len() * 8;
        while self.marker < cap {
            let i = self.marker;
            if i % 8 == 0 && self.bitmap[i / 8] == 0xFF {
                self.marker += 8;
                continue;
            }
            self.marker += 1;
            if let State::Free = get(self.bitmap, i) {
                return Some(i);
            }
        }
        None
    }
}

/// Claims the first free unit of the bitmap stored in `bitmap_block`. The
/// block is only written back when a unit was found.
fn claim<T: BlockStorage>(dev: &mut T, bitmap_block: BlockNumber) -> Result<Option<usize>> {
    let mut block_buffer = [0; BLOCK_SIZE];
    dev.read_block(bitmap_block, &mut block_buffer)?;

    let index = match find_free(&block_buffer) {
        Some(index) => index,
        None => return Ok(None),
    };
    set_free(&mut block_buffer, index, State::Used);
    dev.write_block(bitmap_block, &block_buffer)?;
    trace!("Marked unit {} used in bitmap block {}.", index, bitmap_block);
    Ok(Some(index))
}

fn release<T: BlockStorage>(dev: &mut T, bitmap_block: BlockNumber, index: usize) -> Result<()> {
    let mut block_buffer = [0; BLOCK_SIZE];
    dev.read_block(bitmap_block, &mut block_buffer)?;
    set_free(&mut block_buffer, index, State::Free);
    dev.write_block(bitmap_block, &block_buffer)?;
    trace!("Marked unit {} free in bitmap block {}.", index, bitmap_block);
    Ok(())
}

/// Allocates the lowest numbered free block. Returns `None` when the block
/// bitmap is exhausted, in which case the device is left untouched.
pub fn alloc<T: BlockStorage>(dev: &mut T) -> Result<Option<BlockNumber>> {
    let blocknr = claim(dev, BLOCK_BITMAP_BLOCK)?;
    debug!("Block allocation returned {:?}.", blocknr);
    Ok(blocknr)
}

/// Returns a block to the free pool.
pub fn free<T: BlockStorage>(dev: &mut T, blocknr: BlockNumber) -> Result<()> {
    debug!("Freeing block {}.", blocknr);
    release(dev, BLOCK_BITMAP_BLOCK, blocknr)
}

/// Allocates the lowest free inode number and hands back a zeroed record
/// bound to it. The record is neither cached nor written to the inode table.
pub fn ialloc<T: BlockStorage>(dev: &mut T) -> Result<Option<Inode>> {
    let inode = claim(dev, INODE_BITMAP_BLOCK)?.map(|inum| Inode::new(inum as u32));
    debug!(
        "Inode allocation returned {:?}.",
        inode.as_ref().map(|node| node.inode_num)
    );
    Ok(inode)
}

/// Returns an inode number to the free pool.
pub fn ifree<T: BlockStorage>(dev: &mut T, inum: u32) -> Result<()> {
    debug!("Freeing inode {}.", inum);
    release(dev, INODE_BITMAP_BLOCK, inum as usize)
}
