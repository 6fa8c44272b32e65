//! # 块缓存层
//!
//! 数据块的读写都经过内存缓冲区，重复触碰同一块时不再访问设备。
//! 缓存由挂载会话**独占持有**，多个会话互不干扰；
//! 元数据区不走缓存，只在挂载、卸载时整体往返。
//!
//! 脏块在被换出或 [`CacheManager::sync_all`] 时写回设备。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem;

use block_dev::BlockDevice;
use spin::Mutex;

use crate::{DataBlock, Result, BLOCK_SIZE};

/// 会话持有的缓存管理器，缓存、调度块缓存
#[derive(Debug)]
pub struct CacheManager {
    dev: Arc<dyn BlockDevice>,
    queue: Vec<(usize, Arc<Mutex<BlockCache>>)>,
}

/// 内存中的块缓存
pub struct BlockCache {
    /// 缓存的数据
    data: DataBlock,
    /// 对应的块ID
    block_id: usize,
    /// 底层块设备的引用
    dev: Arc<dyn BlockDevice>,
    /// 是否为脏块
    modified: bool,
}

impl CacheManager {
    /// 块缓存个数的上限
    const CAPACITY: usize = 16;

    pub fn new(dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            dev,
            queue: Vec::new(),
        }
    }

    // 块缓存调度策略：踢走闲置块
    pub fn get(&mut self, block_id: usize) -> Result<Arc<Mutex<BlockCache>>> {
        // 尝试从缓冲区中读取块
        if let Some(cache) = self
            .queue
            .iter()
            .find_map(|(id, cache)| (block_id == *id).then_some(cache))
        {
            return Ok(Arc::clone(cache));
        };

        self.evict()?;

        // 缓存新块
        let cache = Arc::new(Mutex::new(BlockCache::new(block_id, self.dev.clone())?));
        self.queue.push((block_id, cache.clone()));

        Ok(cache)
    }

    /// 获取一个内容全零的块缓存，不读设备。
    /// 仅用于即将被整体覆盖或擦除的块。
    pub fn get_zeroed(&mut self, block_id: usize) -> Result<Arc<Mutex<BlockCache>>> {
        if let Some(cache) = self
            .queue
            .iter()
            .find_map(|(id, cache)| (block_id == *id).then_some(cache))
        {
            cache.lock().zeroize();
            return Ok(Arc::clone(cache));
        };

        self.evict()?;

        let cache = Arc::new(Mutex::new(BlockCache::zeroed(block_id, self.dev.clone())));
        self.queue.push((block_id, cache.clone()));

        Ok(cache)
    }

    pub fn sync_all(&self) -> Result<()> {
        for (_, cache) in &self.queue {
            cache.lock().sync()?;
        }
        Ok(())
    }

    /// 触及上限时写回并移除一个闲置块
    fn evict(&mut self) -> Result<()> {
        if self.queue.len() == Self::CAPACITY {
            let index = self
                .queue
                .iter()
                .position(|(_, cache)| Arc::strong_count(cache) == 1) // 没有其它引用的才能写回
                .expect("run out of block cache");
            self.queue[index].1.lock().sync()?;
            self.queue.remove(index);
        }
        Ok(())
    }
}

impl BlockCache {
    pub fn new(block_id: usize, dev: Arc<dyn BlockDevice>) -> Result<Self> {
        let mut data = [0; BLOCK_SIZE];
        dev.read_block(block_id, &mut data)?;

        Ok(Self {
            data,
            block_id,
            dev,
            modified: false,
        })
    }

    fn zeroed(block_id: usize, dev: Arc<dyn BlockDevice>) -> Self {
        Self {
            data: [0; BLOCK_SIZE],
            block_id,
            dev,
            modified: true,
        }
    }

    pub fn sync(&mut self) -> Result<()> {
        if self.modified {
            self.dev.write_block(self.block_id, &self.data)?;
            self.modified = false;
        }
        Ok(())
    }

    #[inline]
    pub fn zeroize(&mut self) {
        self.data.fill(0);
        self.modified = true;
    }

    pub fn get<T: Sized>(&self, offset: usize) -> &T {
        let type_size = mem::size_of::<T>();
        assert!(type_size + offset <= BLOCK_SIZE);
        let addr: *const u8 = &self.data[offset];
        unsafe { &*addr.cast() }
    }

    pub fn get_mut<T: Sized>(&mut self, offset: usize) -> &mut T {
        let type_size = mem::size_of::<T>();
        assert!(type_size + offset <= BLOCK_SIZE);
        self.modified = true;
        let addr: *mut u8 = &mut self.data[offset];
        unsafe { &mut *addr.cast() }
    }

    #[inline]
    pub fn map<T: Sized, V>(&self, offset: usize, f: impl FnOnce(&T) -> V) -> V {
        f(self.get(offset))
    }

    #[inline]
    pub fn map_mut<T: Sized, V>(&mut self, offset: usize, f: impl FnOnce(&mut T) -> V) -> V {
        f(self.get_mut(offset))
    }
}

impl Drop for BlockCache {
    fn drop(&mut self) {
        // 卸载时已显式同步过；这里只为会话中途丢弃兜底
        let _ = self.sync();
    }
}

impl core::fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlockCache")
            .field("block_id", &self.block_id)
            .field("modified", &self.modified)
            .finish()
    }
}
