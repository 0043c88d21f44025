//! Pack command - build bundle files and a manifest from directories.
//!
//! Every sub-directory of the input becomes one bundle named after the
//! directory. Files below it become entries keyed by their `/`-separated
//! relative path and are listed as the bundle's assets. An optional
//! `bundle.deps` file names dependencies, one per line.

use std::fs;
use std::path::{Path, PathBuf};

use bundlelayer::bundle::BundleBuilder;
use bundlelayer::fetch::sha256_hex;
use bundlelayer::manifest::{BundleInfo, Manifest, MANIFEST_FILE_NAME};
use clap::Args;
use console::style;
use tracing::info;

use super::format_size;
use crate::error::CliError;

/// Dependency list inside a bundle directory; not packed as an entry.
pub const DEPS_FILE_NAME: &str = "bundle.deps";

#[derive(Debug, Args)]
pub struct PackArgs {
    /// Directory whose sub-directories become bundles
    pub input: PathBuf,

    /// Directory receiving the bundle files and manifest.json
    pub output: PathBuf,

    /// Manifest build number
    #[arg(long, default_value_t = 1)]
    pub build: u32,

    /// Manifest release tag
    #[arg(long, default_value = "")]
    pub tag: String,
}

pub fn run(args: PackArgs) -> Result<(), CliError> {
    let manifest = pack(&args.input, &args.output, args.build, &args.tag)?;

    for info in manifest.bundles() {
        println!(
            "  {:>10}  {} ({} assets)",
            format_size(info.size),
            info.name,
            info.assets.len()
        );
    }
    println!(
        "{} Packed {} bundles into {}",
        style("✓").green(),
        manifest.len(),
        args.output.display()
    );
    Ok(())
}

/// Pack `input` into `output` and return the written manifest.
pub fn pack(input: &Path, output: &Path, build: u32, tag: &str) -> Result<Manifest, CliError> {
    let dirs = bundle_dirs(input)?;
    if dirs.is_empty() {
        return Err(CliError::EmptyInput(input.to_path_buf()));
    }

    fs::create_dir_all(output).map_err(|e| CliError::io("create", output, e))?;

    let mut infos = Vec::with_capacity(dirs.len());
    for (name, dir) in dirs {
        let info = pack_bundle(&name, &dir, output)?;
        info!(bundle = %info.name, size = info.size, "Packed bundle");
        infos.push(info);
    }

    let manifest = Manifest::new(build, tag, infos)?;
    let manifest_path = output.join(MANIFEST_FILE_NAME);
    fs::write(&manifest_path, manifest.to_json()?)
        .map_err(|e| CliError::io("write", &manifest_path, e))?;

    Ok(manifest)
}

fn pack_bundle(name: &str, dir: &Path, output: &Path) -> Result<BundleInfo, CliError> {
    let mut files = Vec::new();
    collect_files(dir, dir, &mut files)?;

    let mut builder = BundleBuilder::new();
    let mut assets = Vec::with_capacity(files.len());
    for (rel, path) in files {
        if rel == DEPS_FILE_NAME {
            continue;
        }
        let data = fs::read(&path).map_err(|e| CliError::io("read", &path, e))?;
        builder.add_entry(rel.clone(), data);
        assets.push(rel);
    }

    let raw = builder.build()?;
    let target = output.join(name);
    fs::write(&target, &raw).map_err(|e| CliError::io("write", &target, e))?;

    let mut info = BundleInfo::new(name, sha256_hex(&raw), raw.len() as u64);
    info.dependencies = read_deps(&dir.join(DEPS_FILE_NAME))?;
    info.assets = assets;
    Ok(info)
}

/// Non-hidden sub-directories of `input`, sorted by name.
fn bundle_dirs(input: &Path) -> Result<Vec<(String, PathBuf)>, CliError> {
    let mut dirs = Vec::new();
    for entry in sorted_entries(input)? {
        if entry.is_dir() {
            if let Some(name) = visible_name(&entry) {
                dirs.push((name, entry));
            }
        }
    }
    Ok(dirs)
}

/// Recursively collect `(relative path, absolute path)` for every file.
fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut Vec<(String, PathBuf)>,
) -> Result<(), CliError> {
    for path in sorted_entries(dir)? {
        if visible_name(&path).is_none() {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push((rel, path));
        }
    }
    Ok(())
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CliError> {
    let read = fs::read_dir(dir).map_err(|e| CliError::io("read", dir, e))?;
    let mut paths = Vec::new();
    for entry in read {
        let entry = entry.map_err(|e| CliError::io("read", dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn visible_name(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy().into_owned();
    (!name.starts_with('.')).then_some(name)
}

/// Dependency names from a deps file; blank lines and `#` comments skipped.
fn read_deps(path: &Path) -> Result<Vec<String>, CliError> {
    if !path.is_file() {
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path).map_err(|e| CliError::io("read", path, e))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bundlelayer::bundle::Bundle;
    use bytes::Bytes;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, data: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_pack_writes_bundles_and_manifest() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "core/shaders/basic.glsl", "void main() {}");
        write(input.path(), "level1/scenes/level1.scene", "scene-data");
        write(input.path(), "level1/bundle.deps", "# engine\ncore\n\n");

        let manifest = pack(input.path(), output.path(), 7, "rc1").unwrap();

        assert_eq!(manifest.build(), 7);
        assert_eq!(manifest.tag(), "rc1");
        assert_eq!(manifest.len(), 2);

        let level = manifest.get("level1").unwrap();
        assert_eq!(level.dependencies, vec!["core"]);
        assert_eq!(level.assets, vec!["scenes/level1.scene"]);

        let raw = fs::read(output.path().join("level1")).unwrap();
        assert_eq!(raw.len() as u64, level.size);
        assert_eq!(sha256_hex(&raw), level.checksum);

        let bundle = Bundle::parse("level1", Bytes::from(raw)).unwrap();
        assert_eq!(
            bundle.entry("scenes/level1.scene").map(|b| &b[..]),
            Some(&b"scene-data"[..])
        );
        assert!(!bundle.contains(DEPS_FILE_NAME));

        let json = fs::read_to_string(output.path().join(MANIFEST_FILE_NAME)).unwrap();
        let reloaded = Manifest::from_json(&json).unwrap();
        assert_eq!(reloaded.get("core"), manifest.get("core"));
    }

    #[test]
    fn test_pack_skips_hidden_entries() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "ui/icons/play.png", "png");
        write(input.path(), "ui/.DS_Store", "junk");
        write(input.path(), ".git/HEAD", "ref");

        let manifest = pack(input.path(), output.path(), 1, "").unwrap();

        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest.get("ui").unwrap().assets, vec!["icons/play.png"]);
    }

    #[test]
    fn test_pack_empty_input() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "loose-file.txt", "not a bundle");

        let err = pack(input.path(), output.path(), 1, "").unwrap_err();
        assert!(matches!(err, CliError::EmptyInput(_)));
    }

    #[test]
    fn test_pack_dependency_cycle_rejected() {
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        write(input.path(), "core/a.txt", "a");
        write(input.path(), "core/bundle.deps", "level1");
        write(input.path(), "level1/b.txt", "b");
        write(input.path(), "level1/bundle.deps", "core");

        let err = pack(input.path(), output.path(), 1, "").unwrap_err();
        assert!(matches!(err, CliError::Manifest(_)));
    }
}
