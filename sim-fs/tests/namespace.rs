mod common;

use common::{file, fs, rw};
use sim_fs::{DirEntryType, Error, Permission};

#[test]
fn resolve_nested_path() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    fs.create_dir("docs/notes").unwrap();

    let ns = fs.namespace();
    let notes = ns.lookup("docs/notes").unwrap();
    assert_eq!(Some(notes), ns.resolve_path(ns.root(), "docs/notes"));
    assert_eq!(None, ns.resolve_path(ns.root(), "docs/missing/notes"));
    assert_eq!("notes", ns.node(notes).unwrap().name());
}

#[test]
fn rename_onto_existing_name_changes_nothing() {
    let mut fs = fs();
    let draft = fs.create("draft.txt", 0, rw()).unwrap();
    let last = fs.create("final.txt", 0, rw()).unwrap();
    let journaled = fs.journal().len();

    assert_eq!(Err(Error::AlreadyExists), fs.rename("draft.txt", "final.txt"));
    assert_eq!(Some(draft), fs.stat("draft.txt").unwrap().inode);
    assert_eq!(Some(last), fs.stat("final.txt").unwrap().inode);
    assert_eq!(journaled, fs.journal().len());
}

#[test]
fn rename_moves_between_directories() {
    let mut fs = fs();
    fs.create_dir("archive").unwrap();
    let inode = file(&mut fs, "draft.txt", b"v1");

    assert_eq!(Err(Error::NotFound), fs.rename("missing", "x"));
    fs.rename("draft.txt", "archive/v1.txt").unwrap();

    assert_eq!(Err(Error::NotFound), fs.stat("draft.txt").map(drop));
    assert_eq!(Some(inode), fs.stat("archive/v1.txt").unwrap().inode);
    assert_eq!(b"v1".to_vec(), fs.read_file("archive/v1.txt").unwrap());
}

#[test]
fn directory_cannot_move_into_itself() {
    let mut fs = fs();
    fs.create_dir("a").unwrap();
    fs.create_dir("a/b").unwrap();

    assert_eq!(Err(Error::InvalidPath), fs.rename("a", "a/b/c"));
    assert!(fs.rename("a/b", "b").is_ok());
    assert!(fs.stat("b").is_ok());
}

#[test]
fn rename_directory_in_place() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    fs.create_dir("docs/notes").unwrap();
    fs.create_dir("papers").unwrap();
    file(&mut fs, "docs/notes/a", b"kept");

    assert_eq!(Err(Error::AlreadyExists), fs.rename_directory("docs", "papers"));
    assert_eq!(Err(Error::NotADirectory), fs.rename_directory("docs/notes/a", "b"));
    assert_eq!(Err(Error::InvalidPath), fs.rename_directory("docs", "x/y"));

    fs.rename_directory("docs", "old").unwrap();
    assert_eq!(b"kept".to_vec(), fs.read_file("old/notes/a").unwrap());
    assert_eq!(Err(Error::NotFound), fs.stat("docs").map(drop));
}

#[test]
fn listing_and_search() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    file(&mut fs, "docs/a.txt", &[1; 100]);
    file(&mut fs, "docs/b.md", &[2; 30]);
    fs.create_dir("docs/txt").unwrap();
    file(&mut fs, "readme.txt", &[3; 5]);

    let entries = fs.readdir("/").unwrap();
    let names: Vec<_> = entries.iter().map(|entry| entry.name.as_str()).collect();
    assert_eq!(vec!["docs", "readme.txt"], names);
    assert_eq!(DirEntryType::Directory, entries[0].ty);
    assert_eq!(None, entries[0].inode);
    assert_eq!(Err(Error::NotADirectory), fs.readdir("readme.txt").map(drop));

    assert_eq!(
        vec!["/docs/a.txt", "/docs/txt", "/readme.txt"],
        fs.search("txt")
    );
    assert_eq!(Ok(130), fs.directory_size("docs"));
    assert_eq!(Ok(135), fs.directory_size("/"));

    let depths: Vec<_> = fs
        .walk("/")
        .unwrap()
        .map(|entry| (entry.depth, entry.node.name().to_string()))
        .collect();
    assert_eq!(
        vec![
            (0, "docs".to_string()),
            (1, "a.txt".to_string()),
            (1, "b.md".to_string()),
            (1, "txt".to_string()),
            (0, "readme.txt".to_string()),
        ],
        depths
    );
}

#[test]
fn permissions_can_change() {
    let mut fs = fs();
    fs.create_dir("docs").unwrap();
    file(&mut fs, "a", b"rw");

    fs.set_permissions("a", Permission::Read.into()).unwrap();
    assert_eq!(Err(Error::PermissionDenied), fs.write_file("a", b"no"));
    assert_eq!(b"rw".to_vec(), fs.read_file("a").unwrap());

    fs.set_permissions("docs", Permission::Read | Permission::Execute)
        .unwrap();
    let stat = fs.stat("docs").unwrap();
    assert_eq!(DirEntryType::Directory, stat.mode);
    assert!(!stat.perm.contains(Permission::Write));
    assert_eq!(Err(Error::NotFound), fs.set_permissions("missing", rw()));
}
