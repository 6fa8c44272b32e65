use core::{ptr, slice};

use crate::{Error, Result, NAME_MAX_LEN};

/// 名字字段宽度，尾部至少留一个 \0
const NAME_FIELD: usize = NAME_MAX_LEN + 2;

/// 根目录中的一条文件记录
#[derive(Debug, Clone)]
#[repr(C)]
pub struct DirEntry {
    // 空槽位以 name[0] == 0 标记
    name: [u8; NAME_FIELD],
    size: u32,
    start: i32,
}

impl DirEntry {
    /// 记录大小恒为40字节
    pub const SIZE: usize = 40;

    #[inline]
    pub fn new(name: &str, start: u32) -> Self {
        let bytes = name.as_bytes();
        debug_assert!(!bytes.is_empty() && bytes.len() <= NAME_MAX_LEN);
        let mut field = [0; NAME_FIELD];
        field[..bytes.len()].copy_from_slice(bytes);

        Self {
            name: field,
            size: 0,
            start: start as i32,
        }
    }

    pub fn name(&self) -> &str {
        // 挂载时经过 [`Self::validate`]，这里不会失败
        let len = self.name.iter().position(|&c| c == 0).unwrap();
        core::str::from_utf8(&self.name[..len]).unwrap()
    }

    /// 校验名字字段：活动记录必须有 \0 结尾、不超长的合法 UTF-8 名字。
    /// 超级块通过而目录区是乱码的镜像在这里被拦下。
    pub fn validate(&self) -> Result<()> {
        if self.is_vacant() {
            return Ok(());
        }
        let len = self
            .name
            .iter()
            .position(|&c| c == 0)
            .ok_or(Error::CorruptLayout)?;
        if len > NAME_MAX_LEN || core::str::from_utf8(&self.name[..len]).is_err() {
            return Err(Error::CorruptLayout);
        }
        Ok(())
    }

    #[inline]
    pub fn is_vacant(&self) -> bool {
        self.name[0] == 0
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn grow(&mut self, n: u32) {
        self.size += n;
    }

    /// 链表起始块；空文件尚未分配时为 `None`
    #[inline]
    pub fn start(&self) -> Option<u32> {
        (self.start >= 0).then_some(self.start as u32)
    }

    /// 清空槽位：名字抹零、尺寸归零、起始块失效
    pub fn clear(&mut self) {
        *self = Self::default();
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

impl Default for DirEntry {
    fn default() -> Self {
        Self {
            name: [0; NAME_FIELD],
            size: 0,
            start: -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_forty_bytes() {
        assert_eq!(core::mem::size_of::<DirEntry>(), DirEntry::SIZE);
    }

    #[test]
    fn new_entry_fields() {
        let entry = DirEntry::new("a.txt", 7);
        assert!(!entry.is_vacant());
        assert_eq!(entry.name(), "a.txt");
        assert_eq!(entry.size(), 0);
        assert_eq!(entry.start(), Some(7));
    }

    #[test]
    fn validate_spots_mangled_names() {
        assert_eq!(DirEntry::new("a.txt", 7).validate(), Ok(()));
        // 空槽位随便什么尺寸都合法
        assert_eq!(DirEntry::default().validate(), Ok(()));

        // 名字字段没有 \0 结尾
        let mut entry = DirEntry::default();
        entry.as_bytes_mut()[..NAME_FIELD].fill(0xFF);
        assert_eq!(entry.validate(), Err(Error::CorruptLayout));

        // 有结尾但不是 UTF-8
        let mut entry = DirEntry::default();
        entry.as_bytes_mut()[..2].copy_from_slice(&[0xFF, 0x00]);
        assert_eq!(entry.validate(), Err(Error::CorruptLayout));

        // \0 出现得太晚，名字超长
        let mut entry = DirEntry::default();
        entry.as_bytes_mut()[..NAME_FIELD - 1].fill(b'x');
        assert_eq!(entry.validate(), Err(Error::CorruptLayout));
    }

    #[test]
    fn cleared_entry_is_vacant() {
        let mut entry = DirEntry::new("a.txt", 7);
        entry.grow(123);
        entry.clear();
        assert!(entry.is_vacant());
        assert_eq!(entry.size(), 0);
        assert_eq!(entry.start(), None);
    }
}
