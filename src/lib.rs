//! mkimg - partitioned raw disk image builder.
//!
//! A Lua configuration script declares partitions; the builder lays them out
//! on the sector grid, writes a GUID partition table, fills every partition
//! with raw bytes or a populated FAT filesystem and optionally patches legacy
//! boot code into the first sector.
//!
//! - `config` / `partition` - the build configuration
//! - `script` - Lua host functions that populate the configuration
//! - `preflight` - configuration checks run before building
//! - `layout` - sector layout planning
//! - `content` - raw and filesystem partition contents
//! - `image` - the build pipeline

pub mod config;
pub mod content;
pub mod image;
pub mod layout;
pub mod partition;
pub mod preflight;
pub mod script;
pub mod timing;

pub use config::{Configuration, FsPartitionHandle, SectorSize};
pub use image::build_image;
pub use layout::Layout;
