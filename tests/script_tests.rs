//! Configuration script tests.
//!
//! Scripts are run through the same host functions the binary uses, then
//! the resulting configuration is inspected or built.

mod helpers;

use std::fs;
use std::path::Path;

use helpers::{pattern, read_fat_file, read_gpt_entry, TestEnv};
use mkimg::content::{Content, FsType};
use mkimg::script::{load_config, run_script};
use mkimg::{build_image, Configuration, SectorSize};

const MIB: u64 = 1024 * 1024;

/// Quote a host path as a Lua string literal.
fn lua_path(path: &Path) -> String {
    format!("{:?}", path.display().to_string())
}

fn run(env: &TestEnv, source: &str) -> anyhow::Result<Configuration> {
    run_script(source, "test.lua", Configuration::new(&env.out))
}

// =============================================================================
// Settings
// =============================================================================

#[test]
fn test_empty_script_keeps_defaults() {
    let env = TestEnv::new();
    let config = run(&env, "").unwrap();

    assert_eq!(config.name, "default.img");
    assert_eq!(config.sector_size, SectorSize::B512);
    assert_eq!(config.first_sector, 2048);
    assert!(!config.protective_mbr);
    assert!(config.bootsector.is_none());
    assert!(config.partitions.is_empty());
}

#[test]
fn test_settings_functions() {
    let env = TestEnv::new();
    let config = run(
        &env,
        r#"
            SetName("disk.img")
            SetSectorSize(4096)
            SetFirstSector(256)
            UseProtectiveMbr()
            SetBootsector("boot.bin")
        "#,
    )
    .unwrap();

    assert_eq!(config.name, "disk.img");
    assert_eq!(config.sector_size, SectorSize::B4096);
    assert_eq!(config.first_sector, 256);
    assert!(config.protective_mbr);
    assert_eq!(config.bootsector.as_deref(), Some(Path::new("boot.bin")));
    assert_eq!(config.image_path(), env.out.join("disk.img"));
}

#[test]
fn test_invalid_sector_size() {
    let env = TestEnv::new();
    let err = run(&env, "SetSectorSize(1024)").unwrap_err();
    let msg = format!("{:#}", err);
    assert!(
        msg.contains("invalid sector size (use one of 512, 4096): 1024"),
        "unexpected error: {}",
        msg
    );
}

#[test]
fn test_constant_tables() {
    let env = TestEnv::new();
    let config = run(
        &env,
        r#"
            assert(Size.KB == 1024)
            assert(Size.MB == 1024 * 1024)
            assert(Size.GB == 1024 * 1024 * 1024)
            assert(FsType.Fat32 == 0)
            assert(PartType.ESP == "C12A7328-F81F-11D2-BA4B-00A0C93EC93B")
            SetFirstSector(Size.KB)
        "#,
    )
    .unwrap();
    assert_eq!(config.first_sector, 1024);
}

#[test]
fn test_script_error_reports_chunk() {
    let env = TestEnv::new();
    let err = run(&env, "error('boom')").unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("boom"), "unexpected error: {}", msg);
    assert!(msg.contains("test.lua"), "unexpected error: {}", msg);
}

#[test]
fn test_io_library_not_available() {
    let env = TestEnv::new();
    assert!(run(&env, "io.open('/etc/passwd')").is_err());
    assert!(run(&env, "os.execute('true')").is_err());
}

// =============================================================================
// Partitions
// =============================================================================

#[test]
fn test_raw_partition_declaration() {
    let env = TestEnv::new();
    let src = env.write_input("root.img", pattern(3000));

    let config = run(
        &env,
        &format!(
            r#"NewRawPartition("ROOT", PartType.LinuxFs, {})"#,
            lua_path(&src)
        ),
    )
    .unwrap();

    assert_eq!(config.partitions.len(), 1);
    let part = &config.partitions[0];
    assert_eq!(part.name, "ROOT");
    assert!(matches!(part.content, Content::Raw(_)));
    assert_eq!(part.content.size().unwrap(), 3000);
}

#[test]
fn test_raw_partition_missing_file() {
    let env = TestEnv::new();
    let err = run(
        &env,
        r#"
            local efi = NewFsPartition("EFI", PartType.ESP, Size.MB * 16, FsType.Fat16)
            NewRawPartition("ROOT", PartType.LinuxFs, "/nonexistent/root.img")
        "#,
    )
    .unwrap_err();

    let msg = format!("{:#}", err);
    assert!(
        msg.contains("partition 2: file /nonexistent/root.img does not exist"),
        "unexpected error: {}",
        msg
    );
}

#[test]
fn test_unknown_partition_type() {
    let env = TestEnv::new();
    let src = env.write_input("root.img", pattern(10));
    let result = run(
        &env,
        &format!(r#"NewRawPartition("ROOT", "NotAType", {})"#, lua_path(&src)),
    );
    assert!(result.is_err());
}

#[test]
fn test_unknown_fs_type() {
    let env = TestEnv::new();
    let err = run(
        &env,
        r#"NewFsPartition("DATA", PartType.BasicData, Size.MB * 16, 7)"#,
    )
    .unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("unknown filesystem type: 7"), "unexpected error: {}", msg);
}

#[test]
fn test_fs_partition_handle_methods() {
    let env = TestEnv::new();
    let config = run(
        &env,
        r#"
            local efi = NewFsPartition("EFI", PartType.ESP, Size.MB * 16, FsType.Fat16)
            local data = NewFsPartition("DATA", PartType.BasicData, Size.MB * 64, FsType.Fat32)
            data:PutFile("local.txt", "/remote.txt")
            efi:PutDir("loader", "/loader")
            data:PutDir("assets", "/")
        "#,
    )
    .unwrap();

    assert_eq!(config.partitions.len(), 2);

    let Content::Filesystem(efi) = &config.partitions[0].content else {
        panic!("EFI should be a filesystem partition");
    };
    assert_eq!(efi.fs_type(), FsType::Fat16);
    assert_eq!(efi.size(), 16 * MIB);
    assert_eq!(efi.entries().len(), 1);
    assert!(efi.entries()[0].recursive);
    assert_eq!(efi.entries()[0].dest, "/loader");

    let Content::Filesystem(data) = &config.partitions[1].content else {
        panic!("DATA should be a filesystem partition");
    };
    assert_eq!(data.fs_type(), FsType::Fat32);
    assert_eq!(data.entries().len(), 2);
    assert!(!data.entries()[0].recursive);
    assert_eq!(data.entries()[0].src, Path::new("local.txt"));
    assert_eq!(data.entries()[0].dest, "/remote.txt");
    assert!(data.entries()[1].recursive);
}

// =============================================================================
// Scripts to images
// =============================================================================

#[test]
fn test_data_partition_script_builds() {
    let env = TestEnv::new();
    let local = env.write_input("local.txt", "written by a script\n");

    let config = run(
        &env,
        &format!(
            r#"
                local part = NewFsPartition("DATA", PartType.BasicData, Size.MB * 64, FsType.Fat32)
                part:PutFile({}, "/remote.txt")
            "#,
            lua_path(&local)
        ),
    )
    .unwrap();

    let image_path = build_image(config).unwrap();
    let image = fs::read(&image_path).unwrap();
    assert_eq!(image.len() as u64, 2048 * 512 + 64 * MIB);

    let entry = read_gpt_entry(&image, 512, 0);
    assert_eq!(entry.name, "DATA");
    assert_eq!(entry.first_lba, 2048);

    let content = read_fat_file(&image_path, 2048 * 512, 64 * MIB, "remote.txt");
    assert_eq!(content, b"written by a script\n");
}

#[test]
fn test_fat32_data_partition_of_16_mib() {
    let env = TestEnv::new();
    let local = env.write_input("local.txt", "small fat32 volume\n");

    let config = run(
        &env,
        &format!(
            r#"
                local part = NewFsPartition("DATA", PartType.Unused, Size.MB*16, FsType.Fat32)
                part:PutFile({}, "/remote.txt")
            "#,
            lua_path(&local)
        ),
    )
    .unwrap();

    let image_path = build_image(config).unwrap();
    let image = fs::read(&image_path).unwrap();
    assert_eq!(image.len() as u64, 2048 * 512 + 16 * MIB);

    let content = read_fat_file(&image_path, 2048 * 512, 16 * MIB, "/remote.txt");
    assert_eq!(content, b"small fat32 volume\n");
}

#[test]
fn test_custom_partition_type_guid() {
    let env = TestEnv::new();
    let src = env.write_input("blob.bin", pattern(700));
    let custom = "4A3B2C1D-0E0F-4A4B-8C8D-9E9FA0A1A2A3";

    let config = run(
        &env,
        &format!(
            r#"NewRawPartition("VENDOR", "{}", {})"#,
            custom.to_lowercase(),
            lua_path(&src)
        ),
    )
    .unwrap();

    let image = fs::read(build_image(config).unwrap()).unwrap();
    let entry = read_gpt_entry(&image, 512, 0);
    assert_eq!(entry.name, "VENDOR");
    assert_eq!(
        entry.type_guid,
        uuid::Uuid::parse_str(custom).unwrap().to_bytes_le()
    );
}

#[test]
fn test_first_sector_beyond_addressable_bytes() {
    let env = TestEnv::new();
    let src = env.write_input("blob.bin", pattern(10));

    let config = run(
        &env,
        &format!(
            r#"
                SetFirstSector(math.maxinteger)
                NewRawPartition("BLOB", PartType.BasicData, {})
            "#,
            lua_path(&src)
        ),
    )
    .unwrap();
    let image_path = config.image_path();

    let err = build_image(config).unwrap_err();
    assert!(
        format!("{:#}", err).contains("failed to plan the image layout"),
        "unexpected error: {:#}",
        err
    );
    assert!(!image_path.exists());
}

#[test]
fn test_load_config_from_file() {
    let env = TestEnv::new();
    let raw = pattern(2000);
    let raw_src = env.write_input("root.img", &raw);
    env.write_input("tree/a.txt", "alpha");
    env.write_input("tree/a/b.txt", "beta");

    let script = env.write_input(
        "mkimg.lua",
        format!(
            r#"
                SetName("full.img")
                UseProtectiveMbr()
                local efi = NewFsPartition("EFI", PartType.ESP, Size.MB * 16, FsType.Fat16)
                efi:PutDir({}, "/")
                NewRawPartition("ROOT", PartType.LinuxFs, {})
            "#,
            lua_path(&env.input.join("tree")),
            lua_path(&raw_src)
        ),
    );

    let config = load_config(&script, &env.out).unwrap();
    let image_path = build_image(config).unwrap();
    assert_eq!(image_path, env.out.join("full.img"));

    let image = fs::read(&image_path).unwrap();
    assert_eq!(image[450], 0xEE);

    let (off, len) = (2048 * 512, 16 * MIB);
    assert_eq!(read_fat_file(&image_path, off, len, "a.txt"), b"alpha");
    assert_eq!(read_fat_file(&image_path, off, len, "a/b.txt"), b"beta");

    let root = read_gpt_entry(&image, 512, 1);
    let root_off = (root.first_lba * 512) as usize;
    assert_eq!(root.first_lba, 2048 + 16 * MIB / 512);
    assert_eq!(&image[root_off..root_off + raw.len()], raw.as_slice());
}

#[test]
fn test_load_config_missing_script() {
    let env = TestEnv::new();
    let err = load_config(&env.input.join("missing.lua"), &env.out).unwrap_err();
    assert!(format!("{:#}", err).contains("missing.lua"));
}
