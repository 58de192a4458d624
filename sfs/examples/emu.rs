use sfs::io::FileBlockEmulatorBuilder;
use sfs::SFS;

pub fn main() {
    let tmp = tempfile::tempfile().unwrap();
    let dev = FileBlockEmulatorBuilder::from(tmp)
        .with_block_size(64)
        .build()
        .expect("Could not initialize disk emulator.");

    // Format the device, then create a file owning a single data block.
    let mut fs = SFS::create(dev).expect("should create");
    let node = fs.ialloc().unwrap().expect("fresh image has free inodes");
    let slot = fs.iget(node.inode_num).unwrap().expect("cache is empty");
    let block = fs.alloc().unwrap().expect("fresh image has free blocks");
    {
        let cached = fs.inode_mut(slot);
        cached.link_count = 1;
        cached.block_ptr[0] = block as u16;
    }
    fs.write_slot(slot).unwrap();
    fs.iput(slot);

    println!(
        "inode {} owns block {}, {} blocks and {} inodes left",
        node.inode_num,
        block,
        fs.free_blocks().unwrap(),
        fs.free_inodes().unwrap()
    );
    fs.close().unwrap();
}
