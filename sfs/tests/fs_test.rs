use sfs::alloc::{self, State};
use sfs::io::{BlockStorage, FileBlockEmulator, FileBlockEmulatorBuilder};
use sfs::{Inode, BLOCK_BITMAP_BLOCK, BLOCK_SIZE, DATA_FIRST_BLOCK, INODE_BITMAP_BLOCK, SFS};
use tempfile::NamedTempFile;

const DISK_BLOCKS: usize = 64;

fn format(disk: &NamedTempFile) {
    let dev = FileBlockEmulatorBuilder::from(disk.reopen().unwrap())
        .with_block_size(DISK_BLOCKS)
        .build()
        .unwrap();
    SFS::create(dev).unwrap().close().unwrap();
}

fn reopen(disk: &NamedTempFile) -> SFS<FileBlockEmulator> {
    let dev = FileBlockEmulator::open_disk(disk.path(), DISK_BLOCKS).unwrap();
    SFS::open(dev)
}

fn bitmap_with_free(bits: &[usize]) -> Vec<u8> {
    let mut bmp = vec![0xFF; BLOCK_SIZE];
    for &i in bits {
        alloc::set_free(&mut bmp, i, State::Free);
    }
    bmp
}

#[test]
fn allocations_survive_reopen() {
    let disk = NamedTempFile::new().unwrap();
    format(&disk);

    let mut fs = reopen(&disk);
    assert_eq!(fs.alloc().unwrap(), Some(DATA_FIRST_BLOCK));
    let node = fs.ialloc().unwrap().unwrap();
    assert_eq!(node, Inode::new(0));
    fs.close().unwrap();

    let mut fs = reopen(&disk);
    assert_eq!(fs.alloc().unwrap(), Some(DATA_FIRST_BLOCK + 1));
    assert_eq!(fs.ialloc().unwrap().unwrap().inode_num, 1);
}

#[test]
fn alloc_exhausts_exactly_the_free_bits() {
    let disk = NamedTempFile::new().unwrap();
    format(&disk);

    let mut dev = FileBlockEmulator::open_disk(disk.path(), DISK_BLOCKS).unwrap();
    dev.write_block(BLOCK_BITMAP_BLOCK, &bitmap_with_free(&[4, 6, 15, 24]))
        .unwrap();
    let mut fs = SFS::open(dev);

    let allocated: Vec<usize> = (0..4).filter_map(|_| fs.alloc().unwrap()).collect();
    assert_eq!(allocated, vec![4, 6, 15, 24]);
    assert_eq!(fs.alloc().unwrap(), None);
    assert_eq!(fs.free_blocks().unwrap(), 0);
}

#[test]
fn ialloc_hands_out_high_inode_numbers() {
    let disk = NamedTempFile::new().unwrap();
    format(&disk);

    let mut dev = FileBlockEmulator::open_disk(disk.path(), DISK_BLOCKS).unwrap();
    dev.write_block(
        INODE_BITMAP_BLOCK,
        &bitmap_with_free(&[30000, 30500, 31000, 32000]),
    )
    .unwrap();
    let mut fs = SFS::open(dev);

    for &expected in [30000, 30500, 31000, 32000].iter() {
        assert_eq!(fs.ialloc().unwrap(), Some(Inode::new(expected)));
    }
    assert_eq!(fs.ialloc().unwrap(), None);
}

#[test]
fn inode_written_through_cache_is_visible_after_reopen() {
    let disk = NamedTempFile::new().unwrap();
    format(&disk);

    let mut fs = reopen(&disk);
    let node = fs.ialloc().unwrap().unwrap();
    let slot = fs.iget(node.inode_num).unwrap().unwrap();
    let block = fs.alloc().unwrap().unwrap();
    {
        let cached = fs.inode_mut(slot);
        cached.initialize();
        cached.owner_id = 1000;
        cached.permissions = 0o6;
        cached.link_count = 1;
        cached.block_ptr[0] = block as u16;
    }
    fs.write_slot(slot).unwrap();
    fs.iput(slot);
    fs.close().unwrap();

    let mut fs = reopen(&disk);
    let slot = fs.iget(node.inode_num).unwrap().unwrap();
    let cached = fs.inode(slot);
    assert_eq!(cached.owner_id, 1000);
    assert_eq!(cached.block_ptr[0] as usize, DATA_FIRST_BLOCK);
    assert_eq!(cached.ref_count, 1);

    let mut untouched = Inode::new(5);
    fs.read_inode(&mut untouched, 0).unwrap();
    assert_eq!(untouched.owner_id, 1000);
    fs.read_inode(&mut untouched, 1).unwrap();
    assert_eq!(untouched, Inode::default());
}

#[test]
fn saturated_cache_recovers_after_release() {
    let disk = NamedTempFile::new().unwrap();
    format(&disk);
    let dev = FileBlockEmulator::open_disk(disk.path(), DISK_BLOCKS).unwrap();
    let mut fs = SFS::open_with_capacity(dev, 2);

    let a = fs.iget(1).unwrap().unwrap();
    let b = fs.iget(1).unwrap().unwrap();
    assert_ne!(a, b);
    assert_eq!(fs.iget(2).unwrap(), None);

    fs.iput(b);
    let c = fs.iget(2).unwrap().unwrap();
    assert_eq!(c, b);
    assert_eq!(fs.inode(c).inode_num, 2);
}
