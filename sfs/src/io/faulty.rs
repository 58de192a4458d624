use std::cell::Cell;
use std::io::ErrorKind;
use std::path::Path;
use std::rc::Rc;

use crate::io::{BlockNumber, BlockStorage, FileBlockEmulator, FileBlockEmulatorBuilder};

/// Switches shared between a test and the device it handed away.
#[derive(Default)]
pub struct Faults {
    reads: Cell<bool>,
    writes: Cell<bool>,
}

impl Faults {
    pub fn fail_reads(&self, fail: bool) {
        self.reads.set(fail);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.writes.set(fail);
    }
}

/// Emulated disk whose reads and writes can be made to fail on demand. A
/// failing call returns before touching the underlying image.
pub struct FaultyDevice {
    inner: FileBlockEmulator,
    faults: Rc<Faults>,
}

impl FaultyDevice {
    pub fn new(blocks: usize) -> Self {
        let inner = FileBlockEmulatorBuilder::from(tempfile::tempfile().unwrap())
            .with_block_size(blocks)
            .build()
            .expect("Could not initialize disk emulator.");
        Self {
            inner,
            faults: Rc::new(Faults::default()),
        }
    }

    pub fn faults(&self) -> Rc<Faults> {
        Rc::clone(&self.faults)
    }
}

fn injected(op: &str) -> std::io::Error {
    std::io::Error::new(ErrorKind::Other, format!("injected {} failure", op))
}

impl BlockStorage for FaultyDevice {
    fn open_disk<P: AsRef<Path>>(path: P, nblocks: usize) -> std::io::Result<Self> {
        Ok(Self {
            inner: FileBlockEmulator::open_disk(path, nblocks)?,
            faults: Rc::new(Faults::default()),
        })
    }

    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        if self.faults.reads.get() {
            return Err(injected("read"));
        }
        self.inner.read_block(blocknr, buf)
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        if self.faults.writes.get() {
            return Err(injected("write"));
        }
        self.inner.write_block(blocknr, buf)
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        self.inner.sync_disk()
    }

    fn block_count(&self) -> usize {
        self.inner.block_count()
    }
}
