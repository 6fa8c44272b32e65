//! # 根目录层
//!
//! 扁平的定容目录：128个槽位的数组，按名字线性查找。
//! 没有子目录，也没有路径解析。

use alloc::vec;
use alloc::vec::Vec;

use crate::layout::{DirEntry, DIR_BLOCKS};
use crate::{Result, BLOCK_SIZE, DIR_CAPACITY};

#[derive(Debug)]
pub struct RootDir {
    entries: Vec<DirEntry>,
}

impl RootDir {
    pub fn empty() -> Self {
        Self {
            entries: vec![DirEntry::default(); DIR_CAPACITY],
        }
    }

    /// 从根目录区的字节流恢复；记录连续排列，区尾填零。
    /// 每条活动记录的名字都要过校验，乱码目录区在挂载时即被拒绝。
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        assert_eq!(bytes.len(), DIR_BLOCKS * BLOCK_SIZE);
        let mut entries = Vec::with_capacity(DIR_CAPACITY);
        for raw in bytes.chunks_exact(DirEntry::SIZE).take(DIR_CAPACITY) {
            let mut entry = DirEntry::default();
            entry.as_bytes_mut().copy_from_slice(raw);
            entry.validate()?;
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; DIR_BLOCKS * BLOCK_SIZE];
        for (chunk, entry) in bytes.chunks_exact_mut(DirEntry::SIZE).zip(&self.entries) {
            chunk.copy_from_slice(entry.as_bytes());
        }
        bytes
    }

    /// 按名字线性查找活动记录，返回槽位下标
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| !entry.is_vacant() && entry.name() == name)
    }

    /// 第一个空槽位
    pub fn vacant(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_vacant)
    }

    #[inline]
    pub fn get(&self, index: usize) -> &DirEntry {
        &self.entries[index]
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> &mut DirEntry {
        &mut self.entries[index]
    }

    /// 所有活动记录
    pub fn live(&self) -> impl Iterator<Item = &DirEntry> + '_ {
        self.entries.iter().filter(|entry| !entry.is_vacant())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_vacancy() {
        let mut dir = RootDir::empty();
        assert_eq!(dir.vacant(), Some(0));

        *dir.get_mut(0) = DirEntry::new("a.txt", 0);
        *dir.get_mut(1) = DirEntry::new("b.txt", 1);
        assert_eq!(dir.lookup("b.txt"), Some(1));
        assert_eq!(dir.lookup("c.txt"), None);
        assert_eq!(dir.vacant(), Some(2));

        dir.get_mut(0).clear();
        assert_eq!(dir.lookup("a.txt"), None);
        assert_eq!(dir.vacant(), Some(0));
        assert_eq!(dir.live().count(), 1);
    }

    #[test]
    fn survives_serialization() {
        let mut dir = RootDir::empty();
        *dir.get_mut(3) = DirEntry::new("hello", 5);
        dir.get_mut(3).grow(4096);

        let restored = RootDir::from_bytes(&dir.to_bytes()).unwrap();
        let index = restored.lookup("hello").unwrap();
        assert_eq!(index, 3);
        assert_eq!(restored.get(index).size(), 4096);
        assert_eq!(restored.get(index).start(), Some(5));
    }

    #[test]
    fn rejects_mangled_name_field() {
        let mut bytes = RootDir::empty().to_bytes();
        // 首条记录整个填满 0xFF：名字无结尾也非 UTF-8
        bytes[..DirEntry::SIZE].fill(0xFF);
        assert_eq!(
            RootDir::from_bytes(&bytes).unwrap_err(),
            crate::Error::CorruptLayout
        );
    }
}
