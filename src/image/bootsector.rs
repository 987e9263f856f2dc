//! Legacy boot code patched into the first bytes of the image.

use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Boot code must end before the MBR disk signature and partition records.
pub const MAX_BOOTSECTOR_SIZE: usize = 440;

/// Read boot code from `path`, rejecting anything over [`MAX_BOOTSECTOR_SIZE`].
pub fn load_bootsector(path: &Path) -> Result<Vec<u8>> {
    let code = fs::read(path)
        .with_context(|| format!("failed to read bootsector {}", path.display()))?;

    if code.len() > MAX_BOOTSECTOR_SIZE {
        bail!(
            "bootsector exceeds maximum size of {} bytes ({} bytes)",
            MAX_BOOTSECTOR_SIZE,
            code.len()
        );
    }
    Ok(code)
}

/// Write boot code at offset 0, leaving the rest of the first sector intact.
pub fn patch_bootsector(image: &mut File, code: &[u8]) -> Result<()> {
    image.seek(SeekFrom::Start(0))?;
    image
        .write_all(code)
        .context("failed to write bootsector")?;
    Ok(())
}
