//! 在模拟文件系统上逐行执行脚本命令


mod command;

use std::fmt::Write;
use std::sync::Arc;

use derive_more::{Display, From};
use log::{debug, info};
use sim_fs::{DirEntryType, Error, FsConfig, RamDisk, RecoveryReport, SimFileSystem};

pub use self::command::{parse_perm, perm_string, Command, ParseError};

#[derive(Debug, Display, Clone, PartialEq, Eq, From)]
pub enum ShellError {
    #[display(fmt = "{}", _0)]
    Parse(ParseError),
    #[display(fmt = "{}", _0)]
    Fs(Error),
}

pub struct Shell {
    fs: SimFileSystem,
}

impl Shell {
    pub fn new(config: FsConfig) -> Result<Self, Error> {
        let fs = SimFileSystem::format(Arc::new(RamDisk::new(config.total_blocks)), config)?;
        Ok(Self { fs })
    }

    #[inline]
    pub fn fs(&self) -> &SimFileSystem {
        &self.fs
    }

    /// 解析并执行一行，返回需要打印的内容
    pub fn run(&mut self, line: &str) -> Result<String, ShellError> {
        match Command::parse(line)? {
            Some(command) => {
                debug!("{command:?}");
                Ok(self.execute(command)?)
            }
            None => Ok(String::new()),
        }
    }

    pub fn execute(&mut self, command: Command) -> Result<String, Error> {
        let fs = &mut self.fs;
        let mut out = String::new();

        match command {
            Command::MakeDir(path) => fs.create_dir(&path)?,
            Command::Create { path, size, perm } => {
                let inode = fs.create(&path, size, perm)?;
                let _ = write!(out, "inode {inode}");
            }
            Command::Write { path, text } => {
                let written = fs.write_file(&path, text.as_bytes())?;
                let _ = write!(out, "{written} bytes written");
            }
            Command::Cat(path) => {
                out = String::from_utf8_lossy(&fs.read_file(&path)?).into_owned();
            }
            Command::Remove(path) => fs.delete(&path)?,
            Command::Move { old, new } => fs.rename(&old, &new)?,
            Command::RenameDir { path, name } => fs.rename_directory(&path, &name)?,
            Command::Chmod { path, perm } => fs.set_permissions(&path, perm)?,
            Command::Stat(path) => {
                let stat = fs.stat(&path)?;
                let kind = match stat.mode {
                    DirEntryType::Directory => "directory",
                    DirEntryType::Regular => "file",
                };
                let _ = write!(out, "{path}: {kind} {}", perm_string(stat.perm));
                if let Some(inode) = stat.inode {
                    let _ = write!(
                        out,
                        ", inode {inode}, {} bytes in {} blocks, ctime {} mtime {} atime {}",
                        stat.size, stat.blocks, stat.ctime, stat.mtime, stat.atime,
                    );
                }
            }
            Command::List(path) => {
                let entries = fs.readdir(path.as_deref().unwrap_or("/"))?;
                for entry in entries {
                    let suffix = match entry.ty {
                        DirEntryType::Directory => "/",
                        DirEntryType::Regular => "",
                    };
                    push_line(&mut out, format_args!("{}{suffix}", entry.name));
                }
            }
            Command::Tree => {
                push_line(&mut out, format_args!("/"));
                for entry in fs.walk("/")? {
                    let suffix = if entry.node.is_dir() { "/" } else { "" };
                    let indent = "  ".repeat(entry.depth + 1);
                    push_line(&mut out, format_args!("{indent}{}{suffix}", entry.node.name()));
                }
            }
            Command::Find(term) => {
                for path in fs.search(&term) {
                    push_line(&mut out, format_args!("{path}"));
                }
            }
            Command::Du(path) => {
                let size = fs.directory_size(&path)?;
                let _ = write!(out, "{size}\t{path}");
            }
            Command::Df => {
                let sb = fs.super_block();
                let cache = fs.cache_stats();
                let _ = write!(
                    out,
                    "blocks {}/{} used, inodes {}/{} used, journal {}/{}, \
                     cache {} dirty {} hits {} misses {} evictions",
                    sb.used_blocks(),
                    sb.total_blocks,
                    sb.used_inodes(),
                    sb.total_inodes,
                    fs.journal().len(),
                    fs.journal().capacity(),
                    fs.dirty_blocks(),
                    cache.hits,
                    cache.misses,
                    cache.evictions,
                );
            }
            Command::Sync => fs.flush(),
            Command::Crash => {
                let report = self.crash()?;
                let _ = write!(
                    out,
                    "recovered: {} replayed, {} skipped, {} malformed",
                    report.replayed,
                    report.skipped,
                    report.malformed.len(),
                );
            }
            Command::Check => {
                fs.check()?;
                out.push_str("ok");
            }
        }
        Ok(out)
    }

    /// 换上一块空白的设备，仅凭日志重建文件系统
    pub fn crash(&mut self) -> Result<RecoveryReport, Error> {
        let config = self.fs.config();
        let journal = self.fs.journal().clone();
        info!("crash: recovering from {} journal records", journal.len());

        let (fs, report) =
            SimFileSystem::mount(Arc::new(RamDisk::new(config.total_blocks)), config, journal)?;
        self.fs = fs;
        Ok(report)
    }

    pub fn unmount(self) {
        self.fs.unmount();
    }
}

fn push_line(out: &mut String, line: std::fmt::Arguments) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = out.write_fmt(line);
}
