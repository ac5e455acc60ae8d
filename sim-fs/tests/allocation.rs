mod common;

use common::{file, fs, fs_with, rw, small};
use sim_fs::{Error, FsConfig, BLOCK_SIZE, MAX_FILE_SIZE};

#[test]
fn block_accounting() {
    let mut fs = fs();
    fs.create("empty", 0, rw()).unwrap();
    fs.create("two", 100, rw()).unwrap();
    fs.create("full", MAX_FILE_SIZE, rw()).unwrap();

    let sb = fs.super_block();
    assert_eq!(1024 - 14, sb.free_blocks);
    assert_eq!(256 - 3, sb.free_inodes);
    assert_eq!(14, sb.used_blocks());
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn create_then_delete_restores_everything() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    let sb = fs.super_block();
    let nodes = fs.namespace().len();

    fs.create("docs/a.txt", 200, rw()).unwrap();
    assert_ne!(sb, fs.super_block());
    fs.delete("docs/a.txt").unwrap();

    assert_eq!(sb, fs.super_block());
    assert_eq!(nodes, fs.namespace().len());
    assert_eq!(Err(Error::NotFound), fs.stat("docs/a.txt").map(drop));
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn file_size_is_capped() {
    let mut fs = fs();
    assert_eq!(
        Err(Error::FileTooLarge),
        fs.create("big", MAX_FILE_SIZE + 1, rw())
    );
    assert!(fs.create("big", MAX_FILE_SIZE, rw()).is_ok());
}

#[test]
fn out_of_blocks() {
    let mut fs = fs_with(small(32));
    fs.create("a", MAX_FILE_SIZE, rw()).unwrap();
    fs.create("b", MAX_FILE_SIZE, rw()).unwrap();

    assert_eq!(Err(Error::NoFreeBlocks), fs.create("c", MAX_FILE_SIZE, rw()));
    assert_eq!(8, fs.super_block().free_blocks);
    assert_eq!(Err(Error::NotFound), fs.stat("c").map(drop));
    assert!(fs.create("c", 8 * BLOCK_SIZE, rw()).is_ok());
    assert_eq!(0, fs.super_block().free_blocks);
}

#[test]
fn out_of_inodes() {
    let mut fs = fs_with(FsConfig {
        inode_count: 2,
        ..Default::default()
    });
    fs.create("a", 0, rw()).unwrap();
    fs.create("b", 0, rw()).unwrap();
    assert_eq!(Err(Error::NoFreeInodes), fs.create("c", 0, rw()));

    fs.delete("a").unwrap();
    assert!(fs.create("c", 0, rw()).is_ok());
}

#[test]
fn delete_directory_releases_its_files() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    fs.create_dir("docs/sub").unwrap();
    fs.create("docs/a", 64, rw()).unwrap();
    fs.create("docs/b", 128, rw()).unwrap();
    fs.create("docs/sub/c", 10, rw()).unwrap();
    fs.create("keep", 64, rw()).unwrap();

    let before = fs.super_block();
    fs.delete("/docs").unwrap();
    let after = fs.super_block();

    assert_eq!(before.free_inodes + 3, after.free_inodes);
    assert_eq!(before.free_blocks + 4, after.free_blocks);
    assert_eq!(Err(Error::NotFound), fs.stat("docs/sub").map(drop));
    assert!(fs.stat("keep").is_ok());
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn delete_errors() {
    let mut fs = fs();
    assert_eq!(Err(Error::NotFound), fs.delete("missing"));
    assert_eq!(Err(Error::InvalidPath), fs.delete("/"));

    fs.create_dir("docs").unwrap();
    file(&mut fs, "docs/a", b"busy");
    let fd = fs.open("docs/a").unwrap();
    assert_eq!(Err(Error::Busy), fs.delete("docs"));
    assert_eq!(Err(Error::Busy), fs.delete("docs/a"));

    fs.close(fd).unwrap();
    assert_eq!(Ok(()), fs.delete("docs"));
}

#[test]
fn create_errors() {
    let mut fs = fs();
    fs.create("a", 0, rw()).unwrap();
    assert_eq!(Err(Error::AlreadyExists), fs.create("a", 0, rw()));
    assert_eq!(Err(Error::AlreadyExists), fs.create_dir("a"));
    assert_eq!(Err(Error::NotFound), fs.create("missing/a", 0, rw()));
    assert_eq!(Err(Error::NotADirectory), fs.create("a/b", 0, rw()));
    assert_eq!(Err(Error::InvalidPath), fs.create("", 0, rw()));
    assert_eq!(256 - 1, fs.super_block().free_inodes);
}

#[test]
fn freed_blocks_are_zeroed() {
    let mut fs = fs();
    file(&mut fs, "a", b"secret");
    fs.delete("a").unwrap();

    // 首次适配，拿到的就是刚释放的块
    fs.create("b", BLOCK_SIZE, rw()).unwrap();
    assert_eq!(vec![0; BLOCK_SIZE], fs.read_file("b").unwrap());
}
