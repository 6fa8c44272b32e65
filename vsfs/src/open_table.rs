//! # 打开文件表
//!
//! 句柄只存在于一次挂载会话之内，从不落盘。
//! 它引用目录槽位，并携带访问模式与顺序读游标；
//! 存储本身始终归目录与 FAT 所有。

use alloc::vec;
use alloc::vec::Vec;

use derive_more::{Display, From, Into};

use crate::{Error, Result, MAX_OPEN_FILES};

/// 会话内的文件句柄
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, From, Into)]
pub struct Fd(usize);

/// 访问模式：顺序读或尾部追加，二选一
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Read,
    Append,
}

#[derive(Debug)]
pub(crate) struct OpenEntry {
    /// 所引用的目录槽位
    pub dir_index: usize,
    pub mode: Mode,
    /// 读游标：已消费的字节数，跨多次 `read` 推进
    pub pos: u32,
    /// 读游标当前所在的数据块
    pub block: u32,
}

#[derive(Debug)]
pub(crate) struct OpenTable {
    slots: Vec<Option<OpenEntry>>,
}

impl OpenTable {
    pub fn new() -> Self {
        Self {
            slots: (0..MAX_OPEN_FILES).map(|_| None).collect(),
        }
    }

    /// 占用第一个空槽位
    pub fn open(&mut self, entry: OpenEntry) -> Result<Fd> {
        let free = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(Error::TooManyOpenFiles)?;
        self.slots[free] = Some(entry);
        Ok(Fd(free))
    }

    /// 某目录槽位是否已有句柄，有则返回之
    pub fn find(&self, dir_index: usize) -> Option<(Fd, &OpenEntry)> {
        self.slots.iter().enumerate().find_map(|(i, slot)| {
            slot.as_ref()
                .filter(|entry| entry.dir_index == dir_index)
                .map(|entry| (Fd(i), entry))
        })
    }

    pub fn is_open(&self, dir_index: usize) -> bool {
        self.find(dir_index).is_some()
    }

    pub fn get(&self, fd: Fd) -> Result<&OpenEntry> {
        self.slots
            .get(fd.0)
            .and_then(Option::as_ref)
            .ok_or(Error::InvalidHandle)
    }

    pub fn get_mut(&mut self, fd: Fd) -> Result<&mut OpenEntry> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidHandle)
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.slots
            .get_mut(fd.0)
            .and_then(Option::take)
            .map(|_| ())
            .ok_or(Error::InvalidHandle)
    }
}
