use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Operate on vsfs disk images
#[derive(Parser)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create and format a fresh disk image of 2^m bytes
    Format {
        image: PathBuf,

        /// Size exponent m
        #[arg(long, short)]
        exponent: u32,
    },

    /// Copy a host file into the image
    Put {
        image: PathBuf,
        source: PathBuf,

        /// Name inside the image; defaults to the source file name
        #[arg(long, short)]
        name: Option<String>,
    },

    /// Write a file's contents to stdout
    Cat { image: PathBuf, name: String },

    /// List files and free space
    Ls { image: PathBuf },

    /// Delete a file
    Rm { image: PathBuf, name: String },
}
