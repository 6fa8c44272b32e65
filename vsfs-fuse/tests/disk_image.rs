use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use vsfs::{Error, Mode, VsFileSystem, BLOCK_SIZE};
use vsfs_fuse::BlockFile;

fn image_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("vsfs-{name}-{}.img", std::process::id()))
}

fn create_image(path: &Path, size: u64) -> VsFileSystem {
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .unwrap();
    fd.set_len(size).unwrap();
    VsFileSystem::format(Arc::new(BlockFile::new(fd)), size).unwrap()
}

fn reopen_image(path: &Path) -> VsFileSystem {
    let fd = OpenOptions::new().read(true).write(true).open(path).unwrap();
    VsFileSystem::mount(Arc::new(BlockFile::new(fd))).unwrap()
}

#[test]
fn scenario_survives_remount() {
    let path = image_path("scenario");
    let mut fs = create_image(&path, 1 << 20);

    let head: Vec<u8> = (0..3000u32).map(|i| (i % 256) as u8).collect();
    let tail = [0x42u8; 100];

    fs.create("a.txt").unwrap();
    let fd = fs.open("a.txt", Mode::Append).unwrap();
    assert_eq!(fs.append(fd, &head).unwrap(), 3000);
    assert_eq!(fs.append(fd, &tail).unwrap(), 100);
    fs.close(fd).unwrap();
    fs.unmount().unwrap();

    let mut fs = reopen_image(&path);
    let stat = fs.stat("a.txt").unwrap();
    assert_eq!(stat.size, 3100);
    assert_eq!(stat.blocks, 2);

    // Stream it back out in block-sized chunks, like `cat` does
    let fd = fs.open("a.txt", Mode::Read).unwrap();
    let mut back = Vec::new();
    let mut buf = [0u8; BLOCK_SIZE];
    loop {
        let n = fs.read(fd, &mut buf).unwrap();
        if n == 0 {
            break;
        }
        back.extend_from_slice(&buf[..n]);
    }
    assert_eq!(back.len(), 3100);
    assert_eq!(back[..3000], head);
    assert_eq!(back[3000..], tail);

    fs.close(fd).unwrap();
    fs.unmount().unwrap();
    fs::remove_file(&path).unwrap();
}

#[test]
fn deleted_files_do_not_survive_remount() {
    let path = image_path("delete");
    let mut fs = create_image(&path, 1 << 20);

    fs.create("keep").unwrap();
    fs.create("drop").unwrap();
    let free = fs.free_blocks();
    fs.delete("drop").unwrap();
    fs.unmount().unwrap();

    let fs = reopen_image(&path);
    let names: Vec<_> = fs.entries().map(|(name, _)| name.to_owned()).collect();
    assert_eq!(names, ["keep"]);
    assert_eq!(fs.free_blocks(), free + 1);

    fs.unmount().unwrap();
    fs::remove_file(&path).unwrap();
}

#[test]
fn undersized_image_fails_cleanly() {
    let path = image_path("undersized");
    let fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    fd.set_len(1 << 16).unwrap();

    let result = VsFileSystem::format(Arc::new(BlockFile::new(fd)), 1 << 16);
    assert_eq!(result.unwrap_err(), Error::DiskFull);

    // The failed format must leave the store untouched
    assert!(fs::read(&path).unwrap().iter().all(|&b| b == 0));
    fs::remove_file(&path).unwrap();
}

#[test]
fn mount_rejects_non_vsfs_image() {
    let path = image_path("foreign");
    let mut fd = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .unwrap();
    fd.write_all(&vec![0x55u8; 1 << 20]).unwrap();

    let result = VsFileSystem::mount(Arc::new(BlockFile::new(fd)));
    assert_eq!(result.unwrap_err(), Error::CorruptLayout);
    fs::remove_file(&path).unwrap();
}

#[test]
fn image_never_grows_beyond_its_disk_size() {
    let path = image_path("fixed-size");
    let mut fs = create_image(&path, 1 << 17);

    fs.create("big").unwrap();
    let fd = fs.open("big", Mode::Append).unwrap();
    let data = vec![0xA5u8; 1 << 17];
    let written = fs.append(fd, &data).unwrap();
    assert!(written < data.len());
    fs.close(fd).unwrap();
    fs.unmount().unwrap();

    assert_eq!(fs::metadata(&path).unwrap().len(), 1 << 17);
    fs::remove_file(&path).unwrap();
}
