//! Raw partition content copied verbatim from a host file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::PartitionSlot;

/// A partition filled byte for byte from an already opened source file.
#[derive(Debug)]
pub struct RawContent {
    path: PathBuf,
    file: File,
}

impl RawContent {
    pub fn new(path: impl Into<PathBuf>, file: File) -> Self {
        Self {
            path: path.into(),
            file,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte length of the source file.
    pub fn size(&self) -> Result<u64> {
        let meta = self
            .file
            .metadata()
            .with_context(|| format!("failed to stat {}", self.path.display()))?;
        Ok(meta.len())
    }

    pub fn write(mut self, image: &mut File, slot: &PartitionSlot) -> Result<()> {
        image
            .seek(SeekFrom::Start(slot.offset))
            .context("failed to seek to partition start")?;

        let mut source = (&mut self.file).take(slot.len);
        let copied = io::copy(&mut source, image).with_context(|| {
            format!(
                "partition {}: failed to copy {}",
                slot.index,
                self.path.display()
            )
        })?;

        // The source grew after the layout was planned
        if self.file.read(&mut [0u8; 1])? != 0 {
            bail!(
                "partition {}: {} is larger than its {} byte region",
                slot.index,
                self.path.display(),
                slot.len
            );
        }

        log::debug!(
            "partition {}: wrote {} bytes from {} at offset {}",
            slot.index,
            copied,
            self.path.display(),
            slot.offset
        );
        Ok(())
    }
}
