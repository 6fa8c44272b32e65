//! # vsfs
//!
//! 架在单个虚拟磁盘（宿主机文件）之上的 FAT 式文件系统，自上而下：

#![cfg_attr(not(test), no_std)]

extern crate alloc;

// 会话层：挂载中的文件系统，实现文件创建、打开、读写等操作
mod fs;
pub use fs::{FileStat, VsFileSystem};

// 打开文件表：会话内的文件句柄
mod open_table;
pub use open_table::{Fd, Mode};

// 根目录层：文件名到目录项的映射
mod dir;

// 磁盘数据结构层：表示磁盘文件系统的数据结构
mod layout;

// 块缓存层：数据块在内存上的缓存
mod block_cache;

// 错误类型
mod error;
pub use error::{Error, Result};

pub use block_dev::BlockDevice;

/// 块大小在编译期固定，挂载时会与超级块校验
pub const BLOCK_SIZE: usize = 2048;

/// 文件名的最大字节数
pub const NAME_MAX_LEN: usize = 30;

/// 根目录的槽位数
pub const DIR_CAPACITY: usize = 128;

/// 同时打开文件数的上限
pub const MAX_OPEN_FILES: usize = 128;

type DataBlock = [u8; BLOCK_SIZE];
