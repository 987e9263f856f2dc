//! Build configuration for one image.
//!
//! A `Configuration` starts from built-in defaults, is mutated by the
//! configuration script through the methods below, and is then moved into
//! [`crate::image::build_image`]. Each host function exposed to the script
//! maps to exactly one method here.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use crate::content::{Content, ContentEntry, FsContent, FsType, RawContent};
use crate::partition::{Partition, PartitionType};

/// Image file name used when the script does not call `SetName`.
pub const DEFAULT_IMAGE_NAME: &str = "default.img";

/// First usable sector when the script does not call `SetFirstSector` (1 MiB at 512 B).
pub const DEFAULT_FIRST_SECTOR: u64 = 2048;

/// Logical sector size of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SectorSize {
    #[default]
    B512,
    B4096,
}

impl SectorSize {
    pub fn bytes(self) -> u64 {
        match self {
            SectorSize::B512 => 512,
            SectorSize::B4096 => 4096,
        }
    }

    /// Sectors taken by the protective MBR, primary GPT header and a
    /// 128-entry partition array.
    pub fn gpt_reserved_sectors(self) -> u64 {
        let entry_array = 128 * 128;
        2 + entry_array / self.bytes()
    }
}

impl TryFrom<u64> for SectorSize {
    type Error = anyhow::Error;

    fn try_from(value: u64) -> Result<Self> {
        match value {
            512 => Ok(SectorSize::B512),
            4096 => Ok(SectorSize::B4096),
            other => bail!("invalid sector size (use one of 512, 4096): {}", other),
        }
    }
}

impl From<SectorSize> for gpt::disk::LogicalBlockSize {
    fn from(size: SectorSize) -> Self {
        match size {
            SectorSize::B512 => gpt::disk::LogicalBlockSize::Lb512,
            SectorSize::B4096 => gpt::disk::LogicalBlockSize::Lb4096,
        }
    }
}

/// Handle to a filesystem partition, returned by `NewFsPartition`.
///
/// Carries the 1-based partition index so content can be declared later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FsPartitionHandle {
    pub index: usize,
}

/// Everything needed to build one image.
#[derive(Debug)]
pub struct Configuration {
    /// Image file name inside `dest`.
    pub name: String,
    /// Destination directory of the image.
    pub dest: PathBuf,
    pub sector_size: SectorSize,
    /// First sector available to partitions; everything before it belongs
    /// to the MBR and the primary GPT.
    pub first_sector: u64,
    pub protective_mbr: bool,
    /// Partitions in on-disk and table order.
    pub partitions: Vec<Partition>,
    /// Optional boot code patched into the first bytes of the image.
    pub bootsector: Option<PathBuf>,
}

impl Configuration {
    /// Create a configuration with defaults, writing into `dest`.
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self {
            name: DEFAULT_IMAGE_NAME.to_string(),
            dest: dest.into(),
            sector_size: SectorSize::default(),
            first_sector: DEFAULT_FIRST_SECTOR,
            protective_mbr: false,
            partitions: Vec::new(),
            bootsector: None,
        }
    }

    /// Full path of the image file.
    pub fn image_path(&self) -> PathBuf {
        self.dest.join(&self.name)
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_sector_size(&mut self, bytes: u64) -> Result<()> {
        self.sector_size = SectorSize::try_from(bytes)?;
        Ok(())
    }

    pub fn set_first_sector(&mut self, sector: u64) {
        self.first_sector = sector;
    }

    pub fn set_bootsector(&mut self, path: impl Into<PathBuf>) {
        self.bootsector = Some(path.into());
    }

    pub fn use_protective_mbr(&mut self) {
        self.protective_mbr = true;
    }

    /// Declare a partition copied verbatim from `source`.
    ///
    /// The source is opened right away and held open until the build writes it.
    pub fn add_raw_partition(&mut self, name: &str, part_type: &str, source: &Path) -> Result<()> {
        let index = self.partitions.len() + 1;
        let part_type = PartitionType::parse(part_type)
            .with_context(|| format!("partition {}", index))?;

        let file = File::open(source).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                anyhow!("partition {}: file {} does not exist", index, source.display())
            } else {
                anyhow!("partition {}: failed to open {}: {}", index, source.display(), e)
            }
        })?;

        log::debug!("partition {}: raw content from {}", index, source.display());
        self.partitions.push(Partition::new(
            name,
            part_type,
            Content::Raw(RawContent::new(source, file)),
        ));
        Ok(())
    }

    /// Declare a partition formatted as `fs_type` with `capacity` bytes.
    ///
    /// The returned handle is used to add content with [`Self::put_file`] and
    /// [`Self::put_dir`].
    pub fn add_fs_partition(
        &mut self,
        name: &str,
        part_type: &str,
        capacity: u64,
        fs_type: u64,
    ) -> Result<FsPartitionHandle> {
        let index = self.partitions.len() + 1;
        let part_type = PartitionType::parse(part_type)
            .with_context(|| format!("partition {}", index))?;
        let fs_type = FsType::from_code(fs_type)
            .with_context(|| format!("partition {}", index))?;

        log::debug!(
            "partition {}: {} filesystem, {} bytes",
            index,
            fs_type,
            capacity
        );
        self.partitions.push(Partition::new(
            name,
            part_type,
            Content::Filesystem(FsContent::new(capacity, fs_type)),
        ));
        Ok(FsPartitionHandle { index })
    }

    /// Add a single file to a filesystem partition.
    pub fn put_file(&mut self, handle: FsPartitionHandle, src: &Path, dest: &str) -> Result<()> {
        self.fs_content_mut(handle)?
            .push(ContentEntry::new(src, dest, false));
        Ok(())
    }

    /// Add a directory tree to a filesystem partition.
    pub fn put_dir(&mut self, handle: FsPartitionHandle, src: &Path, dest: &str) -> Result<()> {
        self.fs_content_mut(handle)?
            .push(ContentEntry::new(src, dest, true));
        Ok(())
    }

    fn fs_content_mut(&mut self, handle: FsPartitionHandle) -> Result<&mut FsContent> {
        let partition = handle
            .index
            .checked_sub(1)
            .and_then(|i| self.partitions.get_mut(i))
            .ok_or_else(|| anyhow!("partition {} does not exist", handle.index))?;

        match &mut partition.content {
            Content::Filesystem(fs) => Ok(fs),
            Content::Raw(_) => bail!("partition {} is not a filesystem partition", handle.index),
        }
    }

    /// Print configuration summary.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Image:          {}", self.image_path().display());
        println!("  Sector size:    {}", self.sector_size.bytes());
        println!("  First sector:   {}", self.first_sector);
        println!("  Protective MBR: {}", if self.protective_mbr { "yes" } else { "no" });
        match &self.bootsector {
            Some(path) => println!("  Bootsector:     {}", path.display()),
            None => println!("  Bootsector:     none"),
        }
        println!("  Partitions:     {}", self.partitions.len());
        for (i, partition) in self.partitions.iter().enumerate() {
            println!(
                "    {}. {} [{}] {}",
                i + 1,
                partition.name,
                partition.part_type,
                partition.content.kind()
            );
        }
    }
}
