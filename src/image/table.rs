//! GUID partition table construction.

use std::collections::BTreeMap;
use std::fs::File;

use anyhow::{bail, Context, Result};
use gpt::mbr::ProtectiveMBR;
use gpt::GptConfig;
use uuid::Uuid;

use crate::layout::Layout;
use crate::partition::{Partition, MAX_NAME_LEN};

/// Write the protective MBR (if requested) and a fresh GPT describing
/// `partitions` at the sectors planned in `layout`.
pub fn write_partition_table(
    image: &mut File,
    partitions: &[Partition],
    layout: &Layout,
    protective_mbr: bool,
) -> Result<()> {
    let sector_size = layout.sector_size();
    let reserved = sector_size.gpt_reserved_sectors();
    if layout.first_sector() < reserved {
        bail!(
            "first sector {} leaves no room for the partition table (needs at least {})",
            layout.first_sector(),
            reserved
        );
    }

    if protective_mbr {
        let mbr = ProtectiveMBR::with_lb_size(
            u32::try_from(layout.total_sectors().saturating_sub(1)).unwrap_or(0xFF_FF_FF_FF),
        );
        mbr.overwrite_lba0(image)
            .context("failed to write protective MBR")?;
        log::debug!("protective MBR written");
    }

    let mut entries = BTreeMap::new();
    for (i, (partition, extent)) in partitions.iter().zip(layout.extents()).enumerate() {
        let index = i + 1;
        println!(
            "> Partition {} (name: {}, type: {}, start: {}, end: {})",
            index, partition.name, partition.part_type, extent.start, extent.end
        );

        if partition.name.encode_utf16().count() > MAX_NAME_LEN {
            bail!(
                "partition {}: name '{}' is longer than {} characters",
                index,
                partition.name,
                MAX_NAME_LEN
            );
        }
        if extent.is_empty() {
            log::warn!("partition {} is empty and is left out of the partition table", index);
            continue;
        }
        if partition.part_type.is_unused() {
            log::warn!("partition {} has the unused type and will not appear in the table", index);
        }

        entries.insert(
            index as u32,
            gpt::partition::Partition {
                part_type_guid: partition.part_type.to_gpt(),
                part_guid: Uuid::new_v4(),
                first_lba: extent.start,
                last_lba: extent.end - 1,
                flags: 0,
                name: partition.name.clone(),
            },
        );
    }

    let mut disk = GptConfig::new()
        .initialized(false)
        .writable(true)
        .logical_block_size(sector_size.into())
        .create_from_device(Box::new(&mut *image), None)
        .context("failed to create GPT structure in image")?;
    disk.update_partitions(entries)
        .context("failed to update GPT partitions")?;
    disk.write().context("failed to write partition table")?;

    Ok(())
}
