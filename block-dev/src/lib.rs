//! # 块设备接口层
//!
//! 块设备是以**块**为单位存储数据的设备；[`BlockDevice`] 就是对
//! 读写块设备的抽象，实现了此特质的类型称为**块设备驱动**。
//!
//! 虚拟磁盘（宿主机上的普通文件）也是一种块设备。

#![no_std]

use core::fmt;

/// 块设备驱动特质
///
/// 块编号从 0 开始；`buf` 的长度即为一个块的大小，
/// 由上层文件系统决定。
pub trait BlockDevice: Send + Sync + fmt::Debug {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DevError>;
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DevError>;

    /// 确保已写入的块落盘
    fn flush(&self) -> Result<(), DevError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevError {
    /// 目标块超出设备末尾
    OutOfRange,
    ReadFailed,
    WriteFailed,
}

impl fmt::Display for DevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "block out of device range"),
            Self::ReadFailed => write!(f, "block read failed"),
            Self::WriteFailed => write!(f, "block write failed"),
        }
    }
}

impl core::error::Error for DevError {}
