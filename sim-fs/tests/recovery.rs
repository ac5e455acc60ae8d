mod common;

use std::sync::Arc;

use common::{file, fs, fs_with, rw};
use sim_fs::{
    BlockDevice, Error, FsConfig, Journal, JournalRecord, Permission, RamDisk, RecoveryReport, SimFileSystem,
    BLOCK_SIZE,
};

fn mount(journal: Journal) -> (SimFileSystem, RecoveryReport) {
    mount_with(FsConfig::default(), journal)
}

fn mount_with(config: FsConfig, journal: Journal) -> (SimFileSystem, RecoveryReport) {
    SimFileSystem::mount(Arc::new(RamDisk::new(config.total_blocks)), config, journal).unwrap()
}

#[test]
fn replays_a_single_block_write() {
    let mut journal = Journal::new(100);
    journal
        .append(&JournalRecord::Write {
            block_id: 5,
            data: vec![b'X'; BLOCK_SIZE],
        })
        .unwrap();

    let (mut fs, report) = mount(journal);
    assert_eq!(1, report.replayed);
    assert_eq!([b'X'; BLOCK_SIZE], fs.read_block(5).unwrap());

    // 恢复结束时已写回
    let mut on_disk = [0; BLOCK_SIZE];
    fs.block_device().read_block(5, &mut on_disk);
    assert_eq!([b'X'; BLOCK_SIZE], on_disk);
}

#[test]
fn crash_and_recover() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    file(&mut fs, "docs/a.txt", b"hello world");
    fs.create("b", 100, rw()).unwrap();
    fs.rename("b", "docs/b").unwrap();
    fs.set_permissions("docs/b", Permission::Read.into()).unwrap();
    fs.create_dir("tmp").unwrap();
    fs.rename_directory("tmp", "scratch").unwrap();
    let sb = fs.super_block();

    let (mut fs, report) = mount(fs.into_journal());
    assert_eq!(0, report.skipped);
    assert!(report.malformed.is_empty());

    assert_eq!(b"hello world".to_vec(), fs.read_file("docs/a.txt").unwrap());
    let stat = fs.stat("docs/b").unwrap();
    assert_eq!(100, stat.size);
    assert_eq!(stat.perm, Permission::Read);
    assert_eq!(Err(Error::NotFound), fs.stat("b").map(drop));
    assert!(fs.stat("scratch").is_ok());
    assert_eq!(sb, fs.super_block());
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn deletions_are_replayed() {
    let mut fs = fs();
    file(&mut fs, "a", &[3; 3 * BLOCK_SIZE]);
    fs.create("b", 10, rw()).unwrap();
    fs.delete("a").unwrap();

    let (mut fs, _) = mount(fs.into_journal());
    assert_eq!(Err(Error::NotFound), fs.stat("a").map(drop));
    assert_eq!(1024 - 1, fs.super_block().free_blocks);
    // 释放的块已清零
    assert_eq!([0; BLOCK_SIZE], fs.read_block(0).unwrap());
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn writes_after_rename_follow_the_file() {
    let mut fs = fs();
    fs.create("a", 0, rw()).unwrap();
    let fd = fs.open("a").unwrap();
    fs.rename("a", "b").unwrap();
    fs.write(fd, b"moved").unwrap();
    fs.close(fd).unwrap();

    let (mut fs, report) = mount(fs.into_journal());
    assert_eq!(0, report.skipped);
    assert_eq!(b"moved".to_vec(), fs.read_file("b").unwrap());
}

#[test]
fn malformed_records_are_reported() {
    let mut journal = Journal::new(8);
    journal
        .append(&JournalRecord::MakeDir {
            path: "docs".into(),
        })
        .unwrap();
    journal.append_raw(vec![0xff, 0xff]);
    journal
        .append(&JournalRecord::Create {
            path: "docs/a".into(),
            size: 10,
            perm: 0b110,
        })
        .unwrap();

    let (fs, report) = mount(journal);
    assert_eq!(vec![1], report.malformed);
    assert_eq!(2, report.replayed);
    assert_eq!(rw(), fs.stat("docs/a").unwrap().perm);
}

#[test]
fn failed_records_are_skipped() {
    let mut journal = Journal::new(8);
    let create = JournalRecord::Create {
        path: "a".into(),
        size: 0,
        perm: 0b110,
    };
    journal.append(&create).unwrap();
    journal.append(&create).unwrap();
    journal
        .append(&JournalRecord::Delete {
            path: "missing".into(),
        })
        .unwrap();

    let (fs, report) = mount(journal);
    assert_eq!(1, report.replayed);
    assert_eq!(2, report.skipped);
    assert!(fs.stat("a").is_ok());
}

#[test]
fn only_the_newest_records_survive() {
    let config = FsConfig {
        journal_capacity: 4,
        ..Default::default()
    };
    let mut fs = fs_with(config);
    for i in 0..6 {
        fs.create_dir(&format!("d{i}")).unwrap();
    }
    let journal = fs.into_journal();
    assert_eq!(4, journal.len());
    assert_eq!(2, journal.overwritten());

    let (fs, report) = mount_with(config, journal);
    assert_eq!(4, report.replayed);
    assert_eq!(Err(Error::NotFound), fs.stat("d1").map(drop));
    assert!(fs.stat("d2").is_ok());
    assert!(fs.stat("d5").is_ok());
}

#[test]
fn recovered_fs_keeps_journaling() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    let (mut fs, _) = mount(fs.into_journal());
    assert_eq!(1, fs.journal().len());

    fs.create_dir("more").unwrap();
    assert_eq!(2, fs.journal().len());

    let (fs, _) = mount(fs.into_journal());
    assert!(fs.stat("docs").is_ok());
    assert!(fs.stat("more").is_ok());
}

#[test]
fn oversized_block_map_is_rejected_before_claiming() {
    let mut journal = Journal::new(8);
    journal
        .append(&JournalRecord::Create {
            path: "a".into(),
            size: 0,
            perm: 0b110,
        })
        .unwrap();
    let mut blocks = vec![None; 12];
    blocks.push(Some(500));
    journal
        .append(&JournalRecord::Extend {
            path: "a".into(),
            size: 0,
            blocks,
        })
        .unwrap();
    journal
        .append(&JournalRecord::Extend {
            path: "a".into(),
            size: 10,
            blocks: vec![Some(5000)],
        })
        .unwrap();

    let (fs, report) = mount(journal);
    assert_eq!(1, report.replayed);
    assert_eq!(2, report.skipped);
    assert_eq!(1024, fs.super_block().free_blocks);
    assert_eq!(0, fs.stat("a").unwrap().size);
    assert_eq!(Ok(()), fs.check());
}

#[test]
fn orphaned_writes_leave_free_blocks_zeroed() {
    let config = FsConfig {
        journal_capacity: 3,
        ..Default::default()
    };
    let mut fs = fs_with(config);
    file(&mut fs, "a", b"secret");
    fs.delete("a").unwrap();

    // 创建记录已被覆盖，只剩写入、扩展与删除
    let (mut fs, report) = mount_with(config, fs.into_journal());
    assert_eq!(1, report.replayed);
    assert_eq!(2, report.skipped);

    fs.create("b", BLOCK_SIZE, rw()).unwrap();
    assert_eq!(vec![0; BLOCK_SIZE], fs.read_file("b").unwrap());

    let mut on_disk = [0xff; BLOCK_SIZE];
    fs.block_device().read_block(0, &mut on_disk);
    assert_eq!([0; BLOCK_SIZE], on_disk);
}
