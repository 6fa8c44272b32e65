use core::fmt;

use block_dev::DevError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// 底层块设备读写失败，内存中的元数据保持原样
    Io(DevError),
    /// 超级块或 FAT 与本构建的布局常量不符
    CorruptLayout,
    DiskFull,
    DirectoryFull,
    NameTooLong,
    DuplicateName,
    NotFound,
    AlreadyOpenConflictingMode,
    TooManyOpenFiles,
    InvalidHandle,
    NotReadMode,
    NotAppendMode,
    InUse,
}

impl From<DevError> for Error {
    fn from(e: DevError) -> Self {
        Self::Io(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "virtual disk i/o error: {e}"),
            Self::CorruptLayout => write!(f, "on-disk layout mismatch"),
            Self::DiskFull => write!(f, "no free blocks left"),
            Self::DirectoryFull => write!(f, "root directory is full"),
            Self::NameTooLong => write!(f, "file name too long"),
            Self::DuplicateName => write!(f, "file name already exists"),
            Self::NotFound => write!(f, "file not found"),
            Self::AlreadyOpenConflictingMode => {
                write!(f, "file already open in a conflicting mode")
            }
            Self::TooManyOpenFiles => write!(f, "open file table is full"),
            Self::InvalidHandle => write!(f, "invalid file handle"),
            Self::NotReadMode => write!(f, "handle not open for reading"),
            Self::NotAppendMode => write!(f, "handle not open for appending"),
            Self::InUse => write!(f, "file has open handles"),
        }
    }
}

impl core::error::Error for Error {}
