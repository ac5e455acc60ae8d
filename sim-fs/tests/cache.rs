mod common;

use common::{file, fs, fs_with, rw};
use sim_fs::{BlockDevice, FsConfig, BLOCK_SIZE};

#[test]
fn eviction_is_transparent() {
    let mut fs = fs_with(FsConfig {
        cache_capacity: 4,
        ..Default::default()
    });

    for i in 0..10u8 {
        file(&mut fs, &format!("f{i}"), &[i; BLOCK_SIZE + 1]);
    }
    for i in 0..10u8 {
        assert_eq!(vec![i; BLOCK_SIZE + 1], fs.read_file(&format!("f{i}")).unwrap());
    }

    let stats = fs.cache_stats();
    assert!(stats.evictions > 0);
    assert!(stats.write_backs > 0);
    assert!(stats.misses >= stats.evictions);
}

#[test]
fn dirty_blocks_reach_the_device_on_flush() {
    let mut fs = fs();
    file(&mut fs, "a", b"hello");

    // 首个文件的首个块是 0 号块
    let mut on_disk = [0; BLOCK_SIZE];
    fs.block_device().read_block(0, &mut on_disk);
    assert_eq!([0; BLOCK_SIZE], on_disk);
    assert_eq!(b"hello", &fs.read_block(0).unwrap()[..5]);

    assert_eq!(1, fs.dirty_blocks());
    fs.flush();
    assert_eq!(0, fs.dirty_blocks());
    fs.block_device().read_block(0, &mut on_disk);
    assert_eq!(b"hello", &on_disk[..5]);
}

#[test]
fn unmount_flushes() {
    let mut fs = fs();
    fs.create("a", 0, rw()).unwrap();
    fs.write_file("a", b"bye").unwrap();

    let device = fs.block_device().clone();
    fs.unmount();

    let mut on_disk = [0; BLOCK_SIZE];
    device.read_block(0, &mut on_disk);
    assert_eq!(b"bye", &on_disk[..3]);
}

#[test]
fn hits_are_counted() {
    let mut fs = fs();
    file(&mut fs, "a", b"cached");
    let before = fs.cache_stats();

    fs.read_file("a").unwrap();
    let after = fs.cache_stats();
    assert_eq!(before.hits + 1, after.hits);
    assert_eq!(before.misses, after.misses);
}
