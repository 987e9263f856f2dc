//! Sector layout of the image.
//!
//! Partitions are packed back to back starting at the first usable sector,
//! each rounded up to a whole number of sectors.

use anyhow::{anyhow, Context, Result};

use crate::config::{Configuration, SectorSize};

/// Round `value` up to the next multiple of `to`, or `None` on overflow.
pub fn ceil_to(value: u64, to: u64) -> Option<u64> {
    Some(value.checked_add(to - 1)? / to * to)
}

/// Sector range of one partition; `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionExtent {
    pub start: u64,
    pub end: u64,
}

impl PartitionExtent {
    pub fn sectors(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Planned placement of every partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    sector_size: SectorSize,
    first_sector: u64,
    extents: Vec<PartitionExtent>,
    total_bytes: u64,
}

impl Layout {
    /// Plan extents for partitions of the given byte sizes, in order.
    ///
    /// Fails when a size or the image as a whole cannot be addressed in
    /// 64-bit byte offsets.
    pub fn plan<I>(sector_size: SectorSize, first_sector: u64, sizes: I) -> Result<Self>
    where
        I: IntoIterator<Item = u64>,
    {
        let bytes = sector_size.bytes();
        let mut current = first_sector;
        let mut extents = Vec::new();

        for (i, size) in sizes.into_iter().enumerate() {
            let sectors = ceil_to(size, bytes)
                .ok_or_else(|| anyhow!("partition {}: size of {} bytes is too large", i + 1, size))?
                / bytes;
            let start = current;
            current = current.checked_add(sectors).ok_or_else(|| {
                anyhow!(
                    "partition {}: ends past the last addressable sector (starts at {})",
                    i + 1,
                    start
                )
            })?;
            extents.push(PartitionExtent { start, end: current });
        }

        let total_bytes = current.checked_mul(bytes).ok_or_else(|| {
            anyhow!(
                "image of {} sectors of {} bytes is too large",
                current,
                bytes
            )
        })?;

        Ok(Self {
            sector_size,
            first_sector,
            extents,
            total_bytes,
        })
    }

    /// Plan the layout of a configuration's partitions.
    pub fn for_config(config: &Configuration) -> Result<Self> {
        let sizes = config
            .partitions
            .iter()
            .enumerate()
            .map(|(i, p)| {
                p.content
                    .size()
                    .with_context(|| format!("partition {}: failed to determine size", i + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::plan(config.sector_size, config.first_sector, sizes)
            .context("failed to plan the image layout")
    }

    pub fn sector_size(&self) -> SectorSize {
        self.sector_size
    }

    pub fn first_sector(&self) -> u64 {
        self.first_sector
    }

    pub fn extents(&self) -> &[PartitionExtent] {
        &self.extents
    }

    /// Sector one past the last partition.
    pub fn end_sector(&self) -> u64 {
        self.extents
            .last()
            .map(|e| e.end)
            .unwrap_or(self.first_sector)
    }

    /// Size of the whole image in sectors.
    pub fn total_sectors(&self) -> u64 {
        self.end_sector()
    }

    /// Size of the whole image in bytes.
    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}
