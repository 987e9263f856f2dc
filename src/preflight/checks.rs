//! Individual configuration checks.

use std::fs;
use std::path::Component;

use crate::config::Configuration;
use crate::content::{entry_content_size, Content, FsContent};
use crate::image::MAX_BOOTSECTOR_SIZE;
use crate::layout::Layout;

use super::types::CheckResult;

/// Image name must be a plain file name inside the destination directory.
pub fn check_image_name(config: &Configuration) -> CheckResult {
    const NAME: &str = "Image name";
    let mut components = std::path::Path::new(&config.name).components();

    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => CheckResult::pass_with(NAME, &config.name),
        _ if config.name.is_empty() => CheckResult::fail(NAME, "image name is empty"),
        _ => CheckResult::fail(
            NAME,
            format!("'{}' is not a plain file name", config.name),
        ),
    }
}

/// Partitions must start after the protective MBR and primary GPT.
pub fn check_first_sector(config: &Configuration) -> CheckResult {
    const NAME: &str = "First sector";
    let reserved = config.sector_size.gpt_reserved_sectors();

    if config.first_sector < reserved {
        CheckResult::fail(
            NAME,
            format!(
                "{} overlaps the partition table (needs at least {} with {} byte sectors)",
                config.first_sector,
                reserved,
                config.sector_size.bytes()
            ),
        )
    } else {
        CheckResult::pass_with(NAME, config.first_sector.to_string())
    }
}

/// Partition sizes and the first sector must give an addressable image.
pub fn check_layout(config: &Configuration) -> CheckResult {
    const NAME: &str = "Layout";
    match Layout::for_config(config) {
        Ok(layout) => CheckResult::pass_with(
            NAME,
            format!(
                "{} bytes ({} sectors)",
                layout.total_bytes(),
                layout.total_sectors()
            ),
        ),
        Err(e) => CheckResult::fail(NAME, format!("{:#}", e)),
    }
}

pub fn check_bootsector(config: &Configuration) -> Option<CheckResult> {
    const NAME: &str = "Bootsector";
    let path = config.bootsector.as_ref()?;

    let result = match fs::metadata(path) {
        Err(e) => CheckResult::fail(NAME, format!("{}: {}", path.display(), e)),
        Ok(meta) if meta.len() > MAX_BOOTSECTOR_SIZE as u64 => CheckResult::fail(
            NAME,
            format!(
                "{} is {} bytes (maximum {})",
                path.display(),
                meta.len(),
                MAX_BOOTSECTOR_SIZE
            ),
        ),
        Ok(meta) => CheckResult::pass_with(NAME, format!("{} bytes", meta.len())),
    };
    Some(result)
}

/// Check every partition's content.
pub fn check_partitions(config: &Configuration) -> Vec<CheckResult> {
    let mut checks = Vec::new();

    if config.partitions.is_empty() {
        checks.push(CheckResult::warn("Partitions", "no partitions declared"));
    }

    for (i, partition) in config.partitions.iter().enumerate() {
        let name = format!("Partition {} ({})", i + 1, partition.name);
        match &partition.content {
            Content::Raw(raw) => checks.push(match raw.size() {
                Ok(0) => CheckResult::warn(
                    &name,
                    format!("{} is empty", raw.path().display()),
                ),
                Ok(size) => CheckResult::pass_with(&name, format!("{} bytes", size)),
                Err(e) => CheckResult::fail(&name, format!("{:#}", e)),
            }),
            Content::Filesystem(fs) => checks.extend(check_fs_content(&name, fs)),
        }
    }

    checks
}

fn check_fs_content(name: &str, content: &FsContent) -> Vec<CheckResult> {
    let mut checks = Vec::new();
    let mut total = 0u64;

    for entry in content.entries() {
        let meta = match fs::metadata(&entry.src) {
            Ok(meta) => meta,
            Err(e) => {
                checks.push(CheckResult::fail(
                    name,
                    format!("{}: {}", entry.src.display(), e),
                ));
                continue;
            }
        };

        if meta.is_dir() && !entry.recursive {
            checks.push(CheckResult::fail(
                name,
                format!(
                    "expected a file, got directory: {} (use PutDir)",
                    entry.src.display()
                ),
            ));
            continue;
        }

        match entry_content_size(&entry.src) {
            Ok(size) => total += size,
            Err(e) => checks.push(CheckResult::fail(name, format!("{:#}", e))),
        }
    }

    if total > content.size() {
        checks.push(CheckResult::fail(
            name,
            format!(
                "{} bytes of content will not fit in {} bytes",
                total,
                content.size()
            ),
        ));
    } else if checks.is_empty() {
        checks.push(CheckResult::pass_with(
            name,
            format!(
                "{}, {} of {} bytes used by content",
                content.fs_type(),
                total,
                content.size()
            ),
        ));
    }

    checks
}
