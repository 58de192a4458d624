use crate::inode::Inode;

/// Number of in-core inode slots used when no capacity is given.
pub const DEFAULT_INCORE_CAPACITY: usize = 64;

/// Reference count written into every slot by [`InodeCache::all_used`].
const SATURATED_REF_COUNT: u32 = 1;

/// Inode number held by slots that were never bound to an inode. Keeps a
/// fresh slot from passing as a cached copy of inode 0.
pub const UNBOUND_INODE: u32 = u32::MAX;

/// Stable handle to one slot of an [`InodeCache`]. Handles stay valid for the
/// lifetime of the cache since slots are never removed.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Fixed table of in-core inodes.
///
/// A slot whose `ref_count` is zero is free. Freed slots keep the number and
/// contents of the inode they last held so a later lookup for the same number
/// can reuse them without going back to disk.
pub struct InodeCache {
    slots: Box<[Inode]>,
}

impl InodeCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Inode::new(UNBOUND_INODE); capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots currently holding at least one reference.
    pub fn in_use(&self) -> usize {
        self.slots.iter().filter(|node| node.ref_count > 0).count()
    }

    /// Returns the lowest free slot.
    pub fn find_free(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|node| node.ref_count == 0)
            .map(SlotId)
    }

    /// Returns the lowest free slot still bound to `inode_num`. Referenced
    /// slots never match, their holder may still be changing them.
    pub fn find(&self, inode_num: u32) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|node| node.ref_count == 0 && node.inode_num == inode_num)
            .map(SlotId)
    }

    /// Marks every slot as referenced without touching its contents.
    pub fn all_used(&mut self) {
        for node in self.slots.iter_mut() {
            node.ref_count = SATURATED_REF_COUNT;
        }
    }

    /// Drops every reference without touching slot contents.
    pub fn free_all(&mut self) {
        for node in self.slots.iter_mut() {
            node.ref_count = 0;
        }
    }

    pub fn get(&self, id: SlotId) -> &Inode {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut Inode {
        &mut self.slots[id.0]
    }
}

impl Default for InodeCache {
    fn default() -> Self {
        Self::new(DEFAULT_INCORE_CAPACITY)
    }
}
