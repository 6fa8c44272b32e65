//! # 会话层
//!
//! [`VsFileSystem`] 是一次挂载会话：独占持有超级块、FAT、
//! 根目录与打开文件表的内存副本，生命周期为
//! `format|mount → 各种文件操作 → unmount`。
//!
//! 元数据只在挂载、卸载时与设备整体往返；
//! 数据块的读写经由块缓存随用随取。
//! 设备出错时调用原样返回，内存中的元数据不动。

use alloc::sync::Arc;

use block_dev::BlockDevice;

use crate::block_cache::CacheManager;
use crate::dir::RootDir;
use crate::layout::{self, DirEntry, Fat, SuperBlock};
use crate::open_table::{OpenEntry, OpenTable};
use crate::{DataBlock, Error, Fd, Mode, Result};
use crate::{BLOCK_SIZE, NAME_MAX_LEN};

#[derive(Debug)]
pub struct VsFileSystem {
    dev: Arc<dyn BlockDevice>,
    super_block: SuperBlock,
    fat: Fat,
    root: RootDir,
    open: OpenTable,
    cache: CacheManager,
}

/// 一个文件的概况：字节数与占据的链表块数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size: u32,
    pub blocks: u32,
}

impl VsFileSystem {
    /// 在一块新的、已清零的虚拟磁盘上铺设布局并返回会话。
    ///
    /// `disk_size` 必须是块大小的整数倍，且至少容纳
    /// 全部元数据区加一个数据块；不满足时干净地失败，
    /// 不碰设备。
    pub fn format(dev: Arc<dyn BlockDevice>, disk_size: u64) -> Result<Self> {
        let floor = ((layout::DATA_AREA_START + 1) * BLOCK_SIZE) as u64;
        if disk_size < floor || disk_size > u32::MAX as u64 {
            return Err(Error::DiskFull);
        }
        if disk_size % BLOCK_SIZE as u64 != 0 {
            return Err(Error::CorruptLayout);
        }

        let super_block = SuperBlock::new(disk_size as u32);
        let fat = Fat::empty(super_block.data_blocks());
        let root = RootDir::empty();

        let mut block = [0u8; BLOCK_SIZE];
        block[..SuperBlock::SIZE].copy_from_slice(super_block.as_bytes());
        dev.write_block(0, &block)?;
        layout::write_region(&*dev, layout::fat_region(), fat.as_bytes())?;
        layout::write_region(&*dev, layout::dir_region(), &root.to_bytes())?;
        dev.flush()?;

        log::debug!(
            "formatted: disk_size={disk_size} data_blocks={}",
            super_block.data_blocks()
        );

        Ok(Self {
            cache: CacheManager::new(dev.clone()),
            dev,
            super_block,
            fat,
            root,
            open: OpenTable::new(),
        })
    }

    /// 读入并校验超级块，把 FAT 与根目录载入内存
    pub fn mount(dev: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut block)?;
        let super_block = SuperBlock::from_bytes(&block[..SuperBlock::SIZE]);
        super_block.validate()?;

        let fat_bytes = layout::read_region(&*dev, layout::fat_region())?;
        let fat = Fat::from_bytes(&fat_bytes, super_block.data_blocks());
        let dir_bytes = layout::read_region(&*dev, layout::dir_region())?;
        let root = RootDir::from_bytes(&dir_bytes)?;

        log::debug!(
            "mounted: disk_size={} free_blocks={}",
            super_block.disk_size(),
            fat.free_slots()
        );

        Ok(Self {
            cache: CacheManager::new(dev.clone()),
            dev,
            super_block,
            fat,
            root,
            open: OpenTable::new(),
        })
    }

    /// 结束会话：元数据写回设备并落盘。
    /// 这是唯一的持久化时机，中途掉电丢失未卸载的改动。
    pub fn unmount(self) -> Result<()> {
        self.cache.sync_all()?;

        let mut block = [0u8; BLOCK_SIZE];
        block[..SuperBlock::SIZE].copy_from_slice(self.super_block.as_bytes());
        self.dev.write_block(0, &block)?;
        layout::write_region(&*self.dev, layout::fat_region(), self.fat.as_bytes())?;
        layout::write_region(&*self.dev, layout::dir_region(), &self.root.to_bytes())?;
        self.dev.flush()?;

        log::debug!("unmounted: free_blocks={}", self.fat.free_slots());
        Ok(())
    }

    /// 建立空文件。即使尺寸为零也预分配一个起始块，
    /// 与磁盘格式的既有策略保持一致。
    pub fn create(&mut self, name: &str) -> Result<()> {
        // 空名会与空槽标记混淆，和超长名字一并拒绝
        if name.is_empty() || name.len() > NAME_MAX_LEN {
            return Err(Error::NameTooLong);
        }
        if self.root.lookup(name).is_some() {
            return Err(Error::DuplicateName);
        }

        let slot = self.root.vacant().ok_or(Error::DirectoryFull)?;
        let start = self.fat.alloc().ok_or(Error::DiskFull)?;
        *self.root.get_mut(slot) = DirEntry::new(name, start);

        log::debug!("create {name:?}: slot={slot} start={start}");
        Ok(())
    }

    /// 打开文件。同名同模式的重复打开退化为句柄别名
    /// （返回既有句柄，游标共享），不同模式则互斥。
    pub fn open(&mut self, name: &str, mode: Mode) -> Result<Fd> {
        let dir_index = self.root.lookup(name).ok_or(Error::NotFound)?;

        if let Some((fd, entry)) = self.open.find(dir_index) {
            return if entry.mode == mode {
                Ok(fd)
            } else {
                Err(Error::AlreadyOpenConflictingMode)
            };
        }

        let start = self
            .root
            .get(dir_index)
            .start()
            .ok_or(Error::CorruptLayout)?;
        self.open.open(OpenEntry {
            dir_index,
            mode,
            pos: 0,
            block: start,
        })
    }

    pub fn close(&mut self, fd: Fd) -> Result<()> {
        self.open.close(fd)
    }

    /// 文件当前的字节数
    pub fn size(&self, fd: Fd) -> Result<u32> {
        let entry = self.open.get(fd)?;
        Ok(self.root.get(entry.dir_index).size())
    }

    /// 顺序读：从句柄游标处起，逐块拷贝至多 `buf.len()` 字节。
    /// 游标跨调用持续推进，文件读尽后返回 0。
    pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
        let (dir_index, mode, mut pos, mut block) = {
            let entry = self.open.get(fd)?;
            (entry.dir_index, entry.mode, entry.pos, entry.block)
        };
        if mode != Mode::Read {
            return Err(Error::NotReadMode);
        }

        let size = self.root.get(dir_index).size();
        let n = buf.len().min((size - pos) as usize);

        let mut copied = 0;
        while copied < n {
            let offset = pos as usize % BLOCK_SIZE;
            let take = (BLOCK_SIZE - offset).min(n - copied);
            self.cache
                .get(layout::data_block_id(block))?
                .lock()
                .map(0, |data: &DataBlock| {
                    buf[copied..copied + take].copy_from_slice(&data[offset..offset + take]);
                });
            copied += take;
            pos += take as u32;

            // 整块读完且文件未尽，游标挪到下一块；
            // 尺寸未读尽时链表必然还有后继
            if pos as usize % BLOCK_SIZE == 0 && pos < size {
                block = self.fat.next(block)?.ok_or(Error::CorruptLayout)?;
            }
        }

        let entry = self.open.get_mut(fd)?;
        entry.pos = pos;
        entry.block = block;
        Ok(copied)
    }

    /// 尾部追加：先填满末块剩余空间，再逐块分配、挂链、写入。
    /// 磁盘中途耗尽时按**短写**处理：已写入的字节保留、
    /// 计入尺寸并返回实际写入数；一个字节都写不进才报
    /// [`Error::DiskFull`]。
    ///
    /// 设备中途出错时新挂的块会被退链，已写入的字节同样保留
    /// 并计入尺寸，链表与尺寸保持一致，随后错误原样返回。
    pub fn append(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
        let (dir_index, mode) = {
            let entry = self.open.get(fd)?;
            (entry.dir_index, entry.mode)
        };
        if mode != Mode::Append {
            return Err(Error::NotAppendMode);
        }

        let entry = self.root.get(dir_index);
        let size = entry.size() as usize;
        let start = entry.start().ok_or(Error::CorruptLayout)?;
        let mut tail = self.fat.tail(start)?;

        let mut written = 0;

        // 末块的剩余空间
        let offset = size % BLOCK_SIZE;
        let space = if size == 0 {
            BLOCK_SIZE
        } else if offset == 0 {
            0
        } else {
            BLOCK_SIZE - offset
        };
        let take = space.min(buf.len());
        if take > 0 {
            self.cache
                .get(layout::data_block_id(tail))?
                .lock()
                .map_mut(0, |data: &mut DataBlock| {
                    data[offset..offset + take].copy_from_slice(&buf[..take]);
                });
            written += take;
        }

        while written < buf.len() {
            let Some(block) = self.fat.alloc() else {
                log::debug!("append: disk full after {written} bytes");
                break;
            };
            self.fat.link(tail, block);

            // 新块来自清零过的空闲区，无需先读设备
            let cache = match self.cache.get_zeroed(layout::data_block_id(block)) {
                Ok(cache) => cache,
                Err(e) => {
                    // 退链后再报错，链表不会多出尺寸未计的块
                    self.fat.unlink(tail, block);
                    self.root.get_mut(dir_index).grow(written as u32);
                    return Err(e);
                }
            };
            tail = block;

            let take = BLOCK_SIZE.min(buf.len() - written);
            cache.lock().map_mut(0, |data: &mut DataBlock| {
                data[..take].copy_from_slice(&buf[written..written + take]);
            });
            written += take;
        }

        if written == 0 && !buf.is_empty() {
            return Err(Error::DiskFull);
        }
        self.root.get_mut(dir_index).grow(written as u32);
        Ok(written)
    }

    /// 删除文件并释放整条链表。
    /// 删除即擦除：被释放的数据块全部清零。
    /// 尚有句柄引用的文件拒绝删除。
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let dir_index = self.root.lookup(name).ok_or(Error::NotFound)?;
        if self.open.is_open(dir_index) {
            return Err(Error::InUse);
        }

        if let Some(start) = self.root.get(dir_index).start() {
            let freed = self.fat.free_chain(start)?;
            for &block in &freed {
                self.cache.get_zeroed(layout::data_block_id(block))?;
            }
            log::debug!("delete {name:?}: freed {} blocks", freed.len());
        }
        self.root.get_mut(dir_index).clear();
        Ok(())
    }

    /// 按名字查看文件概况
    pub fn stat(&self, name: &str) -> Result<FileStat> {
        let entry = self.root.get(self.root.lookup(name).ok_or(Error::NotFound)?);
        let blocks = match entry.start() {
            Some(start) => self.fat.chain_len(start)? as u32,
            None => 0,
        };
        Ok(FileStat {
            size: entry.size(),
            blocks,
        })
    }

    /// 根目录下所有文件的名字与尺寸
    pub fn entries(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.root.live().map(|entry| (entry.name(), entry.size()))
    }

    /// 数据区的空闲块数
    pub fn free_blocks(&self) -> usize {
        self.fat.free_slots()
    }

    /// 格式化时记录的磁盘尺寸
    pub fn disk_size(&self) -> u64 {
        self.super_block.disk_size() as u64
    }
}
