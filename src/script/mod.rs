//! Lua configuration scripts.
//!
//! A script describes the image by calling host functions that mutate a
//! [`Configuration`]. The configuration is stored as the Lua state's app data
//! for the duration of the run; every host function reaches it through
//! [`with_config`] and delegates to one `Configuration` method.
//!
//! ```lua
//! SetName("disk.img")
//! UseProtectiveMbr()
//! local efi = NewFsPartition("EFI", PartType.ESP, Size.MB * 64, FsType.Fat32)
//! efi:PutFile("BOOTX64.EFI", "/EFI/BOOT/BOOTX64.EFI")
//! efi:PutDir("loader", "/loader")
//! NewRawPartition("root", PartType.LinuxFs, "root.img")
//! ```

mod constants;

pub use constants::{fs_type_table, PART_TYPE_TABLE, SIZE_TABLE};

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use mlua::{Lua, LuaOptions, StdLib, UserData, UserDataMethods};

use crate::config::{Configuration, FsPartitionHandle};

/// Run the script at `path` and return the configuration it describes.
pub fn load_config(path: &Path, dest: &Path) -> Result<Configuration> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration script {}", path.display()))?;
    run_script(&source, &path.display().to_string(), Configuration::new(dest))
}

/// Run script `source` against `config`, returning the mutated configuration.
///
/// `chunk_name` is used in Lua error messages.
pub fn run_script(source: &str, chunk_name: &str, config: Configuration) -> Result<Configuration> {
    let lua = Lua::new_with(
        StdLib::MATH | StdLib::STRING | StdLib::TABLE,
        LuaOptions::new(),
    )
    .map_err(|e| anyhow!("failed to create Lua state: {}", e))?;

    lua.set_app_data(config);
    register(&lua).map_err(|e| anyhow!("failed to register host functions: {}", e))?;

    lua.load(source)
        .set_name(format!("@{}", chunk_name))
        .exec()
        .map_err(|e| anyhow!("configuration script failed:\n{}", e))?;

    lua.remove_app_data::<Configuration>()
        .ok_or_else(|| anyhow!("configuration was lost during script execution"))
}

/// Run `f` against the configuration owned by `lua`.
fn with_config<R>(
    lua: &Lua,
    f: impl FnOnce(&mut Configuration) -> Result<R>,
) -> mlua::Result<R> {
    let mut config = lua
        .app_data_mut::<Configuration>()
        .ok_or_else(|| mlua::Error::RuntimeError("no configuration bound".to_string()))?;
    f(&mut *config).map_err(|e| mlua::Error::RuntimeError(format!("{:#}", e)))
}

impl UserData for FsPartitionHandle {
    fn add_methods<'lua, M: UserDataMethods<'lua, Self>>(methods: &mut M) {
        methods.add_method("PutFile", |lua, this, (src, dest): (String, String)| {
            with_config(lua, |config| config.put_file(*this, Path::new(&src), &dest))
        });
        methods.add_method("PutDir", |lua, this, (src, dest): (String, String)| {
            with_config(lua, |config| config.put_dir(*this, Path::new(&src), &dest))
        });
    }
}

/// Bind the constant tables and host functions into the global namespace.
fn register(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    let size = lua.create_table()?;
    for (name, value) in SIZE_TABLE {
        size.set(*name, *value)?;
    }
    globals.set("Size", size)?;

    let fs_type = lua.create_table()?;
    for (name, code) in fs_type_table() {
        fs_type.set(name, code)?;
    }
    globals.set("FsType", fs_type)?;

    let part_type = lua.create_table()?;
    for (name, guid) in PART_TYPE_TABLE {
        part_type.set(*name, *guid)?;
    }
    globals.set("PartType", part_type)?;

    globals.set(
        "SetName",
        lua.create_function(|lua, name: String| {
            with_config(lua, |config| {
                config.set_name(name);
                Ok(())
            })
        })?,
    )?;

    globals.set(
        "SetSectorSize",
        lua.create_function(|lua, bytes: u64| {
            with_config(lua, |config| config.set_sector_size(bytes))
        })?,
    )?;

    globals.set(
        "SetFirstSector",
        lua.create_function(|lua, sector: u64| {
            with_config(lua, |config| {
                config.set_first_sector(sector);
                Ok(())
            })
        })?,
    )?;

    globals.set(
        "SetBootsector",
        lua.create_function(|lua, path: String| {
            with_config(lua, |config| {
                config.set_bootsector(PathBuf::from(path));
                Ok(())
            })
        })?,
    )?;

    globals.set(
        "UseProtectiveMbr",
        lua.create_function(|lua, ()| {
            with_config(lua, |config| {
                config.use_protective_mbr();
                Ok(())
            })
        })?,
    )?;

    globals.set(
        "NewRawPartition",
        lua.create_function(|lua, (name, part_type, path): (String, String, String)| {
            with_config(lua, |config| {
                config.add_raw_partition(&name, &part_type, Path::new(&path))
            })
        })?,
    )?;

    globals.set(
        "NewFsPartition",
        lua.create_function(
            |lua, (name, part_type, capacity, fs_type): (String, String, u64, u64)| {
                with_config(lua, |config| {
                    config.add_fs_partition(&name, &part_type, capacity, fs_type)
                })
            },
        )?,
    )?;

    Ok(())
}
