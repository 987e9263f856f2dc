//! Shared test utilities for mkimg tests.
#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use fscommon::StreamSlice;
use tempfile::TempDir;

/// Test environment with a scratch input directory and an output directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Host files used as partition content
    pub input: PathBuf,
    /// Destination directory for images
    pub out: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let input = temp_dir.path().join("input");
        let out = temp_dir.path().join("out");
        fs::create_dir_all(&input).expect("Failed to create input dir");

        Self {
            _temp_dir: temp_dir,
            input,
            out,
        }
    }

    /// Write `content` to `rel` under the input directory, creating parents.
    pub fn write_input(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.input.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write input file");
        path
    }
}

/// Deterministic, non-repeating-looking test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// One decoded GPT partition entry.
#[derive(Debug)]
pub struct GptEntry {
    pub type_guid: [u8; 16],
    pub first_lba: u64,
    pub last_lba: u64,
    pub name: String,
}

fn le_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}

/// Check the primary GPT header signature at LBA 1.
pub fn has_gpt_header(image: &[u8], sector_size: u64) -> bool {
    let start = sector_size as usize;
    &image[start..start + 8] == b"EFI PART"
}

/// Decode entry `slot` (0-based) of the primary partition entry array at LBA 2.
pub fn read_gpt_entry(image: &[u8], sector_size: u64, slot: usize) -> GptEntry {
    let start = 2 * sector_size as usize + slot * 128;
    let entry = &image[start..start + 128];

    let mut type_guid = [0u8; 16];
    type_guid.copy_from_slice(&entry[..16]);

    let name: Vec<u16> = entry[56..128]
        .chunks(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|c| *c != 0)
        .collect();

    GptEntry {
        type_guid,
        first_lba: le_u64(&entry[32..40]),
        last_lba: le_u64(&entry[40..48]),
        name: String::from_utf16(&name).expect("GPT name is not UTF-16"),
    }
}

/// Read `path` from the FAT filesystem stored at `[offset, offset + len)` of `image`.
pub fn read_fat_file(image: &Path, offset: u64, len: u64, path: &str) -> Vec<u8> {
    let file = File::open(image).expect("Failed to open image");
    let region = StreamSlice::new(file, offset, offset + len).expect("Failed to slice image");
    let fs = fatfs::FileSystem::new(region, fatfs::FsOptions::new()).expect("Not a FAT filesystem");

    let mut content = Vec::new();
    fs.root_dir()
        .open_file(path)
        .unwrap_or_else(|e| panic!("{} not found in filesystem: {}", path, e))
        .read_to_end(&mut content)
        .expect("Failed to read file from filesystem");
    content
}

/// Check whether `path` is a directory in the FAT filesystem at `[offset, offset + len)`.
pub fn fat_dir_exists(image: &Path, offset: u64, len: u64, path: &str) -> bool {
    let file = File::open(image).expect("Failed to open image");
    let region = StreamSlice::new(file, offset, offset + len).expect("Failed to slice image");
    let fs = fatfs::FileSystem::new(region, fatfs::FsOptions::new()).expect("Not a FAT filesystem");
    let exists = fs.root_dir().open_dir(path).is_ok();
    exists
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}
