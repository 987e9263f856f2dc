//! Raw disk image builder.
//!
//! Build process (each step depends on the previous one):
//! 1. Plan the layout and compute the image size
//! 2. Remove any image left by a previous run
//! 3. Create the destination directory
//! 4. Allocate the image file at its final size, then load the boot sector
//! 5. Write the protective MBR and GPT
//! 6. Write every partition's content in table order
//! 7. Patch the boot sector into the first bytes of the image
//!
//! Any failure aborts the build. The image left on disk is then garbage.

pub mod bootsector;
pub mod table;

pub use bootsector::{load_bootsector, patch_bootsector, MAX_BOOTSECTOR_SIZE};
pub use table::write_partition_table;

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Configuration;
use crate::content::PartitionSlot;
use crate::layout::Layout;
use crate::timing::Timer;

/// Build the image described by `config` and return its path.
pub fn build_image(config: Configuration) -> Result<PathBuf> {
    let image_path = config.image_path();
    println!("Creating image {}", config.name);

    // Step 1: Layout and total size
    let layout = Layout::for_config(&config)?;
    log::debug!(
        "image size: {} bytes ({} sectors of {})",
        layout.total_bytes(),
        layout.total_sectors(),
        layout.sector_size().bytes()
    );

    // Step 2: Start from scratch
    remove_stale_image(&image_path)?;

    // Step 3: Destination directory
    fs::create_dir_all(&config.dest).with_context(|| {
        format!(
            "failed to create destination directory {}",
            config.dest.display()
        )
    })?;

    // Step 4: Allocate the backing file
    let mut image = allocate_image(&image_path, layout.total_bytes())?;
    let bootsector = config
        .bootsector
        .as_deref()
        .map(load_bootsector)
        .transpose()?;

    // Step 5: Partition table
    println!("Partitioning...");
    let timer = Timer::start("Partitioning");
    write_partition_table(
        &mut image,
        &config.partitions,
        &layout,
        config.protective_mbr,
    )?;
    timer.finish();

    // Step 6: Partition contents
    println!("Writing partitions...");
    let timer = Timer::start("Writing partitions");
    for (i, (partition, extent)) in config
        .partitions
        .into_iter()
        .zip(layout.extents())
        .enumerate()
    {
        let slot = PartitionSlot::new(i + 1, extent, layout.sector_size());
        let name = partition.name;
        partition
            .content
            .write(&mut image, &slot)
            .with_context(|| format!("failed to write partition {} ({})", slot.index, name))?;
    }
    timer.finish();

    // Step 7: Boot code
    if let Some(code) = bootsector {
        println!("Writing bootsector...");
        patch_bootsector(&mut image, &code)?;
        println!("> Bootsector (size: {})", code.len());
    }

    image
        .sync_all()
        .with_context(|| format!("failed to flush {}", image_path.display()))?;
    println!("Done");

    Ok(image_path)
}

/// Delete an image from a previous run. A missing file is fine.
fn remove_stale_image(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {
            log::debug!("removed previous image {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
    }
}

/// Create the image file at its final size.
fn allocate_image(path: &Path, size: u64) -> Result<File> {
    let file = File::options()
        .create(true)
        .truncate(true)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("failed to create image {}", path.display()))?;
    file.set_len(size)
        .with_context(|| format!("failed to allocate {} bytes for {}", size, path.display()))?;
    Ok(file)
}
