//! FAT filesystem partitions.

use std::fmt;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fatfs::{FatType, FileSystem, FormatVolumeOptions, FsOptions};
use fscommon::StreamSlice;

use super::materialize::{materialize_dir, write_file};
use super::PartitionSlot;

/// Filesystem types a partition can be formatted with.
///
/// The numeric codes are the values of the script's `FsType` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsType {
    Fat32,
    Fat16,
    Fat12,
}

impl FsType {
    pub const ALL: [FsType; 3] = [FsType::Fat32, FsType::Fat16, FsType::Fat12];

    pub fn code(self) -> u64 {
        match self {
            FsType::Fat32 => 0,
            FsType::Fat16 => 1,
            FsType::Fat12 => 2,
        }
    }

    pub fn from_code(code: u64) -> Result<Self> {
        match Self::ALL.iter().find(|t| t.code() == code) {
            Some(fs_type) => Ok(*fs_type),
            None => bail!("unknown filesystem type: {}", code),
        }
    }

    /// Name as bound in the script's `FsType` table.
    pub fn name(self) -> &'static str {
        match self {
            FsType::Fat32 => "Fat32",
            FsType::Fat16 => "Fat16",
            FsType::Fat12 => "Fat12",
        }
    }

    fn fat_type(self) -> FatType {
        match self {
            FsType::Fat32 => FatType::Fat32,
            FsType::Fat16 => FatType::Fat16,
            FsType::Fat12 => FatType::Fat12,
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host file or directory to place inside a filesystem partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub src: PathBuf,
    /// `/`-separated path inside the filesystem.
    pub dest: String,
    /// Directories are only accepted when set.
    pub recursive: bool,
}

impl ContentEntry {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>, recursive: bool) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            recursive,
        }
    }
}

/// A partition formatted with a FAT filesystem and populated from host files.
#[derive(Debug)]
pub struct FsContent {
    capacity: u64,
    fs_type: FsType,
    entries: Vec<ContentEntry>,
}

impl FsContent {
    pub fn new(capacity: u64, fs_type: FsType) -> Self {
        Self {
            capacity,
            fs_type,
            entries: Vec::new(),
        }
    }

    /// Declared capacity; independent of how much content is added.
    pub fn size(&self) -> u64 {
        self.capacity
    }

    pub fn fs_type(&self) -> FsType {
        self.fs_type
    }

    pub fn entries(&self) -> &[ContentEntry] {
        &self.entries
    }

    pub fn push(&mut self, entry: ContentEntry) {
        self.entries.push(entry);
    }

    pub fn write(self, image: &mut File, slot: &PartitionSlot) -> Result<()> {
        let mut region = StreamSlice::new(&mut *image, slot.offset, slot.end())
            .with_context(|| format!("partition {}: failed to open region", slot.index))?;

        let options = FormatVolumeOptions::new()
            .fat_type(self.fs_type.fat_type())
            .bytes_per_sector(slot.sector_size.bytes() as u16);
        fatfs::format_volume(&mut region, options).with_context(|| {
            format!(
                "partition {}: failed to format {} bytes as {}",
                slot.index, slot.len, self.fs_type
            )
        })?;

        let fs = FileSystem::new(region, FsOptions::new())
            .with_context(|| format!("partition {}: failed to open filesystem", slot.index))?;

        for entry in &self.entries {
            let meta = fs::metadata(&entry.src).with_context(|| {
                format!("partition {}: cannot access {}", slot.index, entry.src.display())
            })?;

            let copied = if meta.is_dir() {
                if !entry.recursive {
                    bail!(
                        "partition {}: expected a file, got directory: {}",
                        slot.index,
                        entry.src.display()
                    );
                }
                materialize_dir(&fs, &entry.src, &entry.dest)
            } else {
                write_file(&fs, &entry.src, &entry.dest)
            };
            copied.with_context(|| {
                format!(
                    "partition {}: failed to copy {} to {}",
                    slot.index,
                    entry.src.display(),
                    entry.dest
                )
            })?;
        }

        fs.unmount()
            .with_context(|| format!("partition {}: failed to flush filesystem", slot.index))?;
        log::debug!(
            "partition {}: {} populated with {} entries",
            slot.index,
            self.fs_type,
            self.entries.len()
        );
        Ok(())
    }
}

/// Bytes of host content an entry will copy, following symlinks.
pub(crate) fn entry_content_size(src: &Path) -> Result<u64> {
    let mut total = 0;
    for entry in walkdir::WalkDir::new(src).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        if entry.file_type().is_file() {
            total += entry
                .metadata()
                .with_context(|| format!("failed to stat {}", entry.path().display()))?
                .len();
        }
    }
    Ok(total)
}
