use core::{ptr, slice};

use crate::layout::{DATA_AREA_START, DIR_BLOCKS, FAT_BLOCKS, FAT_CAPACITY};
use crate::{Error, Result, BLOCK_SIZE};

/// 超级块：
/// - 提供文件系统合法性校验；
/// - 记录格式化时的磁盘尺寸
///
/// 四个字段在格式化时定死，每次挂载都要与本构建的常量核对。
#[derive(Debug, Default, Clone)]
#[repr(C)]
pub struct SuperBlock {
    block_size: u32,
    fat_blocks: u32,
    dir_blocks: u32,
    disk_size: u32,
}

impl SuperBlock {
    /// 记录大小恒为16字节，位于0号块的开头
    pub const SIZE: usize = 16;

    #[inline]
    pub fn new(disk_size: u32) -> Self {
        Self {
            block_size: BLOCK_SIZE as u32,
            fat_blocks: FAT_BLOCKS as u32,
            dir_blocks: DIR_BLOCKS as u32,
            disk_size,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut sb = Self::default();
        sb.as_bytes_mut().copy_from_slice(&bytes[..Self::SIZE]);
        sb
    }

    pub fn validate(&self) -> Result<()> {
        if self.block_size != BLOCK_SIZE as u32
            || self.fat_blocks != FAT_BLOCKS as u32
            || self.dir_blocks != DIR_BLOCKS as u32
            || (self.disk_size as usize) < (DATA_AREA_START + 1) * BLOCK_SIZE
        {
            return Err(Error::CorruptLayout);
        }
        Ok(())
    }

    #[inline]
    pub fn disk_size(&self) -> u32 {
        self.disk_size
    }

    /// 数据区实际可用的块数：受磁盘尺寸与FAT槽位数双重限制
    pub fn data_blocks(&self) -> usize {
        let blocks = self.disk_size as usize / BLOCK_SIZE;
        FAT_CAPACITY.min(blocks.saturating_sub(DATA_AREA_START))
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { slice::from_raw_parts(ptr::from_ref(self).cast(), Self::SIZE) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { slice::from_raw_parts_mut(ptr::from_mut(self).cast(), Self::SIZE) }
    }
}
