//! Constant tables pre-bound into every configuration script.

use crate::content::FsType;
use crate::partition::PART_TYPES;

/// `Size` table: byte multipliers.
pub const SIZE_TABLE: &[(&str, u64)] = &[
    ("KB", 1024),
    ("MB", 1024 * 1024),
    ("GB", 1024 * 1024 * 1024),
];

/// `PartType` table: GPT type GUID strings.
pub const PART_TYPE_TABLE: &[(&str, &str)] = PART_TYPES;

/// `FsType` table: filesystem selectors accepted by `NewFsPartition`.
pub fn fs_type_table() -> Vec<(&'static str, u64)> {
    FsType::ALL
        .iter()
        .map(|fs_type| (fs_type.name(), fs_type.code()))
        .collect()
}
