//! Partition content: raw byte blobs or populated FAT filesystems.
//!
//! - `raw` - copies a source file verbatim into the partition region
//! - `fat` - formats the region and fills it with files and directories
//! - `materialize` - recursive directory copy used by `fat`

mod fat;
mod materialize;
mod raw;

pub use fat::{ContentEntry, FsContent, FsType};
pub(crate) use fat::entry_content_size;
pub use materialize::{fat_components, materialize_dir, write_file};
pub use raw::RawContent;

use std::fs::File;

use anyhow::Result;

use crate::config::SectorSize;
use crate::layout::PartitionExtent;

/// Where one partition lives inside the image file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionSlot {
    /// 1-based partition index, as in the partition table.
    pub index: usize,
    /// Byte offset of the region.
    pub offset: u64,
    /// Byte length of the region (a whole number of sectors).
    pub len: u64,
    pub sector_size: SectorSize,
}

impl PartitionSlot {
    pub fn new(index: usize, extent: &PartitionExtent, sector_size: SectorSize) -> Self {
        Self {
            index,
            offset: extent.start * sector_size.bytes(),
            len: extent.sectors() * sector_size.bytes(),
            sector_size,
        }
    }

    /// Byte offset one past the end of the region.
    pub fn end(&self) -> u64 {
        self.offset + self.len
    }
}

/// Payload of a partition.
#[derive(Debug)]
pub enum Content {
    Raw(RawContent),
    Filesystem(FsContent),
}

impl Content {
    /// Logical size in bytes, before rounding to the sector grid.
    pub fn size(&self) -> Result<u64> {
        match self {
            Content::Raw(raw) => raw.size(),
            Content::Filesystem(fs) => Ok(fs.size()),
        }
    }

    /// Write the content into its region of `image`.
    ///
    /// Consumes the content; any source handle is closed when this returns.
    pub fn write(self, image: &mut File, slot: &PartitionSlot) -> Result<()> {
        match self {
            Content::Raw(raw) => raw.write(image, slot),
            Content::Filesystem(fs) => fs.write(image, slot),
        }
    }

    /// Short description for progress output.
    pub fn kind(&self) -> String {
        match self {
            Content::Raw(raw) => format!("raw ({})", raw.path().display()),
            Content::Filesystem(fs) => format!(
                "{} ({} bytes, {} entries)",
                fs.fs_type(),
                fs.size(),
                fs.entries().len()
            ),
        }
    }
}
