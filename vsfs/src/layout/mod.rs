//! # 磁盘数据结构层
//!
//! vsfs 的磁盘布局：
//! 超级块 | FAT 区 | 根目录区 | 数据区
//!
//! 数据块编号从 0 开始，实际落在元数据区之后，
//! 换算见 [`data_block_id`]。

use alloc::vec;
use alloc::vec::Vec;
use core::ops::Range;

use block_dev::BlockDevice;

use crate::{Result, BLOCK_SIZE};

mod super_block;
pub use super_block::SuperBlock;

mod fat;
pub use fat::{Fat, FatSlot};

/// 目录项，也属于磁盘文件系统数据结构
mod dir_entry;
pub use dir_entry::DirEntry;

pub const SUPERBLOCK_BLOCKS: usize = 1;
pub const FAT_BLOCKS: usize = 32;
pub const DIR_BLOCKS: usize = 8;

/// FAT 的槽位总数，也即数据块编号的上界
pub const FAT_CAPACITY: usize = BLOCK_SIZE * FAT_BLOCKS / core::mem::size_of::<FatSlot>();

/// 数据区之前的元数据块数
pub const DATA_AREA_START: usize = SUPERBLOCK_BLOCKS + FAT_BLOCKS + DIR_BLOCKS;

pub const fn fat_region() -> Range<usize> {
    SUPERBLOCK_BLOCKS..SUPERBLOCK_BLOCKS + FAT_BLOCKS
}

pub const fn dir_region() -> Range<usize> {
    SUPERBLOCK_BLOCKS + FAT_BLOCKS..DATA_AREA_START
}

/// 数据块编号换算为设备块编号
pub const fn data_block_id(block: u32) -> usize {
    block as usize + DATA_AREA_START
}

/// 把一段连续的元数据区整体读入内存
pub fn read_region(dev: &dyn BlockDevice, region: Range<usize>) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; region.len() * BLOCK_SIZE];
    for (chunk, block_id) in bytes.chunks_exact_mut(BLOCK_SIZE).zip(region) {
        dev.read_block(block_id, chunk)?;
    }
    Ok(bytes)
}

/// 把内存中的元数据区整体写回设备
pub fn write_region(dev: &dyn BlockDevice, region: Range<usize>, bytes: &[u8]) -> Result<()> {
    assert_eq!(bytes.len(), region.len() * BLOCK_SIZE);
    for (chunk, block_id) in bytes.chunks_exact(BLOCK_SIZE).zip(region) {
        dev.write_block(block_id, chunk)?;
    }
    Ok(())
}
