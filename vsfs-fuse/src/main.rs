mod cli;

use std::error::Error;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use typed_bytesize::ByteSizeIec;
use vsfs::{Mode, VsFileSystem, BLOCK_SIZE};
use vsfs_fuse::BlockFile;

use self::cli::{Cli, Command};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    match Cli::parse().command {
        Command::Format { image, exponent } => {
            let size = 1u64
                .checked_shl(exponent)
                .ok_or("size exponent out of range")?;
            let fd = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&image)?;
            fd.set_len(size)?;

            let fs = VsFileSystem::format(Arc::new(BlockFile::new(fd)), size)?;
            println!(
                "{}: {} total, {} usable",
                image.display(),
                ByteSizeIec(size),
                ByteSizeIec((fs.free_blocks() * BLOCK_SIZE) as u64)
            );
            fs.unmount()?;
        }

        Command::Put {
            image,
            source,
            name,
        } => {
            let name = match name {
                Some(name) => name,
                None => source
                    .file_name()
                    .and_then(|name| name.to_str())
                    .ok_or("source has no usable file name")?
                    .to_owned(),
            };
            let mut data = Vec::new();
            File::open(&source)?.read_to_end(&mut data)?;

            let mut fs = open_image(&image)?;
            fs.create(&name)?;
            let fd = fs.open(&name, Mode::Append)?;
            let written = fs.append(fd, &data)?;
            fs.close(fd)?;
            fs.unmount()?;

            if written < data.len() {
                return Err(format!("short write: {written}/{} bytes, disk full", data.len()).into());
            }
            log::info!("put {name:?}: {written} bytes");
        }

        Command::Cat { image, name } => {
            let mut fs = open_image(&image)?;
            let fd = fs.open(&name, Mode::Read)?;

            let mut stdout = io::stdout().lock();
            let mut buf = [0u8; BLOCK_SIZE];
            loop {
                let n = fs.read(fd, &mut buf)?;
                if n == 0 {
                    break;
                }
                stdout.write_all(&buf[..n])?;
            }
            fs.close(fd)?;
            fs.unmount()?;
        }

        Command::Ls { image } => {
            let fs = open_image(&image)?;
            for (name, size) in fs.entries() {
                println!("{size:>10}  {name}");
            }
            println!("free: {}", ByteSizeIec((fs.free_blocks() * BLOCK_SIZE) as u64));
            fs.unmount()?;
        }

        Command::Rm { image, name } => {
            let mut fs = open_image(&image)?;
            fs.delete(&name)?;
            fs.unmount()?;
        }
    }

    Ok(())
}

fn open_image(path: &Path) -> Result<VsFileSystem, Box<dyn Error>> {
    let fd = OpenOptions::new().read(true).write(true).open(path)?;
    Ok(VsFileSystem::mount(Arc::new(BlockFile::new(fd)))?)
}
