//! mkimg - build a partitioned raw disk image from a Lua configuration script.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use mkimg::{image, preflight, script};

#[derive(Parser)]
#[command(name = "mkimg")]
#[command(about = "Build a GPT disk image from a Lua configuration script")]
#[command(
    after_help = "SCRIPT FUNCTIONS:\n  SetName, SetSectorSize, SetFirstSector, SetBootsector, UseProtectiveMbr\n  NewRawPartition(name, type, path)\n  NewFsPartition(name, type, size, fstype) -> part, part:PutFile(src, dest), part:PutDir(src, dest)"
)]
struct Cli {
    /// Configuration file (lua)
    #[arg(long, env = "MKIMG_CONFIG", default_value = "mkimg.lua")]
    config: PathBuf,

    /// Destination directory for the generated image
    #[arg(long, env = "MKIMG_DEST", default_value = "./")]
    dest: PathBuf,
}

fn main() -> Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let config = script::load_config(&cli.config, &cli.dest)?;
    config.print();
    println!();

    preflight::run_preflight_or_fail(&config)?;

    let image_path = image::build_image(config)?;
    println!("Image written to {}", image_path.display());

    Ok(())
}
