#![no_std]

extern crate alloc;

mod dirent;
mod error;
mod perm;
mod stat;

pub use self::{
    dirent::{DirEntry, DirEntryType},
    error::{Error, Result},
    perm::Permission,
    stat::Stat,
};
