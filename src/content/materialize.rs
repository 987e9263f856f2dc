//! Copying host files and directory trees into a FAT filesystem.

use std::fs;
use std::io::{Read, Seek, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use fatfs::{Dir, FileSystem};
use walkdir::WalkDir;

/// Split a `/`-separated filesystem path into its components.
///
/// Leading, trailing and repeated separators and `.` components are dropped,
/// so `"/a//b/"` and `"a/./b"` both name `["a", "b"]`.
pub fn fat_components(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .map(str::to_string)
        .collect()
}

/// Open the directory at `components`, creating any that are missing.
fn create_dir_all<'a, T: Read + Write + Seek>(
    fs: &'a FileSystem<T>,
    components: &[String],
) -> Result<Dir<'a, T>> {
    let mut dir = fs.root_dir();
    for (depth, name) in components.iter().enumerate() {
        dir = dir
            .create_dir(name)
            .with_context(|| format!("failed to create /{}", components[..=depth].join("/")))?;
    }
    Ok(dir)
}

fn write_file_at<T: Read + Write + Seek>(
    fs: &FileSystem<T>,
    src: &Path,
    components: &[String],
) -> Result<()> {
    let (name, parents) = components
        .split_last()
        .ok_or_else(|| anyhow!("no destination file name for {}", src.display()))?;

    let data = fs::read(src).with_context(|| format!("failed to read {}", src.display()))?;

    let dir = create_dir_all(fs, parents)?;
    let mut file = dir
        .create_file(name)
        .with_context(|| format!("failed to create /{}", components.join("/")))?;
    file.truncate()?;
    file.write_all(&data)
        .with_context(|| format!("failed to write /{}", components.join("/")))?;
    file.flush()?;
    Ok(())
}

/// Copy one host file to `dest` inside the filesystem.
///
/// Missing parent directories are created.
pub fn write_file<T: Read + Write + Seek>(fs: &FileSystem<T>, src: &Path, dest: &str) -> Result<()> {
    write_file_at(fs, src, &fat_components(dest))
}

/// Recursively copy the host directory `src` to `dest` inside the filesystem.
///
/// `dest` is created even when `src` is empty. Entries are visited in file
/// name order and symbolic links are followed.
pub fn materialize_dir<T: Read + Write + Seek>(
    fs: &FileSystem<T>,
    src: &Path,
    dest: &str,
) -> Result<()> {
    let root = fat_components(dest);
    create_dir_all(fs, &root)?;

    for entry in WalkDir::new(src)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("failed to read directory {}", src.display()))?;
        let relative = entry.path().strip_prefix(src)?;

        let mut target = root.clone();
        for component in relative.components() {
            let name = component.as_os_str().to_str().ok_or_else(|| {
                anyhow!("file name is not valid UTF-8: {}", entry.path().display())
            })?;
            target.push(name.to_string());
        }

        if entry.file_type().is_dir() {
            create_dir_all(fs, &target)?;
        } else {
            write_file_at(fs, entry.path(), &target)?;
        }
    }

    Ok(())
}
