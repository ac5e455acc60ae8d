use derive_more::Display;

/// 文件系统操作的失败原因。
///
/// 所有错误都是局部、可恢复的，交由调用者处理。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 没有空闲数据块
    #[display(fmt = "no free blocks left")]
    NoFreeBlocks,
    /// 没有空闲 inode
    #[display(fmt = "no free inodes left")]
    NoFreeInodes,
    /// 打开文件表已满
    #[display(fmt = "too many open files")]
    TooManyOpenFiles,
    /// 超出单个文件的块数上限
    #[display(fmt = "file too large")]
    FileTooLarge,
    #[display(fmt = "no such file or directory")]
    NotFound,
    #[display(fmt = "permission denied")]
    PermissionDenied,
    #[display(fmt = "file exists")]
    AlreadyExists,
    /// 文件描述符未打开或越界
    #[display(fmt = "bad file descriptor")]
    BadDescriptor,
    /// 日志记录无法解码
    #[display(fmt = "malformed journal entry")]
    MalformedJournal,
    #[display(fmt = "is a directory")]
    IsADirectory,
    #[display(fmt = "not a directory")]
    NotADirectory,
    /// 空路径、空名字或包含分隔符的名字
    #[display(fmt = "invalid path")]
    InvalidPath,
    /// 目标仍被打开的文件描述符引用
    #[display(fmt = "resource busy")]
    Busy,
    #[display(fmt = "invalid configuration")]
    InvalidConfig,
    /// 超级块计数与位图/inode 表不符
    #[display(fmt = "file system is inconsistent")]
    Inconsistent,
}

pub type Result<T> = core::result::Result<T, Error>;
