//! Producing the save file and placing it where the game looks for saves
//!
//! The voxelizer and converter are opaque external programs. Their contract
//! is "exit 0 and the expected file exists"; nothing else they print is
//! consumed.

use holecheck_common::config::{
    ConverterConfig, VoxelizerConfig, INPUT_PLACEHOLDER, SCALE_PLACEHOLDER,
};
use holecheck_common::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

/// Turn a model or schematic into a save file, returning its absolute path
pub async fn convert(config: &ConverterConfig, input: &Path) -> Result<PathBuf> {
    let schematic = match &config.voxelizer {
        Some(voxelizer) => voxelize(voxelizer, input).await?,
        None => input.to_path_buf(),
    };

    let output = absolute(&config.output)?;
    remove_stale(&output).await?;

    let args = substitute(&config.args, &schematic, config.scale);
    run_step("converter", &config.program, &args).await?;

    if !output.is_file() {
        return Err(Error::Converter(format!(
            "converter exited cleanly but {} was not written",
            output.display()
        )));
    }

    info!("Converted {} to {}", input.display(), output.display());
    Ok(output)
}

async fn voxelize(config: &VoxelizerConfig, model: &Path) -> Result<PathBuf> {
    let stem = model.file_stem().ok_or_else(|| {
        Error::Converter(format!("model path {} has no file name", model.display()))
    })?;
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(&config.extension);
    let schematic = config.output_dir.join(name);
    remove_stale(&schematic).await?;

    let args = substitute(&config.args, model, 0);
    run_step("voxelizer", &config.program, &args).await?;

    if !schematic.is_file() {
        return Err(Error::Converter(format!(
            "voxelizer exited cleanly but {} was not written",
            schematic.display()
        )));
    }
    Ok(schematic)
}

/// Copy the save into the game's save directory, returning the name the
/// game knows it by
pub async fn place_in_saves(artifact: &Path, saves_dir: &Path) -> Result<String> {
    let name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            Error::Converter(format!("save path {} has no usable name", artifact.display()))
        })?
        .to_string();

    tokio::fs::create_dir_all(saves_dir).await?;
    let dest = saves_dir.join(&name);

    // Copying a file onto itself truncates it
    if dest.exists()
        && tokio::fs::canonicalize(artifact).await? == tokio::fs::canonicalize(&dest).await?
    {
        info!("Save already in place at {}", dest.display());
        return Ok(name);
    }

    tokio::fs::copy(artifact, &dest).await?;
    info!("Placed save at {}", dest.display());
    Ok(name)
}

/// Delete a previous run's output so only a fresh write counts
async fn remove_stale(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn substitute(args: &[String], input: &Path, scale: u32) -> Vec<String> {
    let input = input.to_string_lossy();
    let scale = scale.to_string();
    args.iter()
        .map(|arg| {
            arg.replace(INPUT_PLACEHOLDER, &input)
                .replace(SCALE_PLACEHOLDER, &scale)
        })
        .collect()
}

async fn run_step(step: &str, program: &Path, args: &[String]) -> Result<()> {
    debug!("Running {}: {} {}", step, program.display(), args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Converter(format!("failed to run {} {}: {}", step, program.display(), e)))?;

    if !output.status.success() {
        return Err(Error::Converter(format!(
            "{} exited with {}: {}",
            step,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
