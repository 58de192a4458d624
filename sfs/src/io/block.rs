use std::path::Path;

/// Index of a 4K block on the device, 0 up to `block_count() - 1`.
pub type BlockNumber = usize;

/// Raw block device the file system is laid out on.
///
/// Transfers are always whole blocks addressed by number. The file system
/// never looks past this trait, so an image file, a partition or a test double
/// can all stand in as the device.
pub trait BlockStorage {
    /// Attaches to an existing image holding `nblocks` blocks. Nothing on the
    /// image is checked.
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> std::io::Result<Self>
    where
        Self: std::marker::Sized;
    /// Fills `buf` with the contents of block `blocknr`.
    ///
    /// # Errors
    ///
    /// Fails for block numbers past the end of the device and for buffers
    /// shorter than one block.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Stores `buf` as block `blocknr`. Bytes beyond one block are dropped.
    ///
    /// # Errors
    ///
    /// Fails for block numbers past the end of the device.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Waits until every completed write has reached the medium.
    fn sync_disk(&mut self) -> std::io::Result<()>;
    /// Number of addressable blocks.
    fn block_count(&self) -> usize;
    /// Flushes outstanding writes and releases the device.
    fn close(mut self) -> std::io::Result<()>
    where
        Self: std::marker::Sized,
    {
        self.sync_disk()
    }
}
