use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use block_dev::{BlockDevice, DevError};
use send_wrapper::SendWrapper;
use vsfs::BLOCK_SIZE;

/// A host file serving as the virtual disk.
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
}

impl BlockFile {
    pub fn new(fd: File) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
        }
    }

    fn seek_to(file: &mut File, block_id: usize) -> Result<(), DevError> {
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map(|_| ())
            .map_err(|_| DevError::OutOfRange)
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DevError> {
        let mut file = self.inner.borrow_mut();
        Self::seek_to(&mut file, block_id)?;
        match file.read(buf) {
            Ok(n) if n == buf.len() => Ok(()),
            // Short count: the image is smaller than the requested block
            Ok(_) => Err(DevError::OutOfRange),
            Err(_) => Err(DevError::ReadFailed),
        }
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DevError> {
        let mut file = self.inner.borrow_mut();

        // Writing past the end of a regular file would silently grow the
        // image; refuse instead, matching the fixed-size disk contract.
        let len = file.metadata().map_err(|_| DevError::WriteFailed)?.len();
        if ((block_id + 1) * BLOCK_SIZE) as u64 > len {
            return Err(DevError::OutOfRange);
        }

        Self::seek_to(&mut file, block_id)?;
        file.write_all(buf).map_err(|_| DevError::WriteFailed)
    }

    fn flush(&self) -> Result<(), DevError> {
        self.inner
            .borrow_mut()
            .sync_all()
            .map_err(|_| DevError::WriteFailed)
    }
}
