//! Discovery, extraction and packing of `courseAlgo_*.zip` result archives.

use crate::domain::model::{ArchiveName, Axis};
use crate::utils::error::{AnalysisError, Result};
use regex::Regex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

const ARCHIVE_PREFIX: &str = "courseAlgo";

fn archive_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^courseAlgo_([^_]+)_([^_]+)_([^_]+)\.zip$").expect("static regex")
    })
}

fn raw_result_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+)(agents|courseLimit)_(\d+)weight\.csv$").expect("static regex")
    })
}

impl ArchiveName {
    /// Parses `courseAlgo_<date>_<axis>_x<weight>.zip`.
    pub fn parse(file_name: &str) -> Result<Self> {
        let invalid = || AnalysisError::ArchiveNameError {
            name: file_name.to_string(),
        };

        let caps = archive_name_regex().captures(file_name).ok_or_else(invalid)?;
        let axis: Axis = caps[2].parse().map_err(|_| invalid())?;
        let tag = caps[3].to_string();
        let weight = tag
            .strip_prefix('x')
            .and_then(|w| w.parse::<u32>().ok())
            .ok_or_else(invalid)?;

        Ok(Self {
            date: caps[1].to_string(),
            axis,
            tag,
            weight,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: ArchiveName,
    pub path: PathBuf,
}

/// Lists result archives in `dir`, sorted by file name.
pub fn discover_archives(dir: &Path) -> Result<Vec<ArchiveEntry>> {
    if !dir.is_dir() {
        return Err(AnalysisError::IoError(io::Error::new(
            io::ErrorKind::NotFound,
            format!("archive directory {} does not exist", dir.display()),
        )));
    }

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if !file_name.starts_with(ARCHIVE_PREFIX) || !file_name.ends_with(".zip") {
            continue;
        }

        match ArchiveName::parse(&file_name) {
            Ok(name) => entries.push(ArchiveEntry {
                name,
                path: entry.path(),
            }),
            Err(e) => tracing::debug!("Skipping {}: {}", file_name, e),
        }
    }

    entries.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(entries)
}

/// Extracts every entry of `archive` under `dest`, returning the number of files written.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<usize> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    fs::create_dir_all(dest)?;

    let mut written = 0;
    for i in 0..zip.len() {
        let mut file = zip.by_index(i)?;
        let relative = file.enclosed_name().ok_or_else(|| {
            AnalysisError::data_format(
                archive.display().to_string(),
                format!("entry '{}' escapes the extraction directory", file.name()),
            )
        })?;
        let out_path = dest.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut file, &mut out)?;
        written += 1;
    }

    tracing::debug!(
        "Extracted {} files from {} into {}",
        written,
        archive.display(),
        dest.display()
    );
    Ok(written)
}

/// Zips the contents of `src_dir` into `zip_path`, entries relative to `src_dir`.
pub fn create_archive(src_dir: &Path, zip_path: &Path) -> Result<usize> {
    if let Some(parent) = zip_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut files = Vec::new();
    collect_files(src_dir, src_dir, &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(File::create(zip_path)?);
    for relative in &files {
        // zip 條目一律使用 '/' 分隔
        let entry_name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file::<_, ()>(entry_name, FileOptions::default())?;
        let data = fs::read(src_dir.join(relative))?;
        zip.write_all(&data)?;
    }
    zip.finish()?;

    Ok(files.len())
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(root, &path, files)?;
        } else if let Ok(relative) = path.strip_prefix(root) {
            files.push(relative.to_path_buf());
        }
    }
    Ok(())
}

/// Re-bundles raw simulator output into `courseAlgo_<date>_<axis>_x<w>.zip` archives.
///
/// Raw zips in `raw_dir` are unpacked in place first. Every
/// `<n><axis>_<w>weight.csv` found in an algorithm directory is then moved to
/// `staging_dir/<axis>/x<w>/<algorithm dir>/<n><axis>.csv`, and each
/// `staging_dir/<axis>/x<w>` tree becomes one archive in `archives_dir`.
pub fn pack_raw_results(
    raw_dir: &Path,
    staging_dir: &Path,
    archives_dir: &Path,
    date: &str,
) -> Result<Vec<PathBuf>> {
    for entry in fs::read_dir(raw_dir)? {
        let path = entry?.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_file() && name.starts_with(ARCHIVE_PREFIX) && name.ends_with(".zip") {
            tracing::info!("📦 Unpacking raw archive {}", name);
            extract_archive(&path, raw_dir)?;
        }
    }

    let mut moved = 0;
    for algo_entry in fs::read_dir(raw_dir)? {
        let algo_dir = algo_entry?.path();
        if !algo_dir.is_dir() {
            continue;
        }
        let algo_name = algo_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        for file_entry in fs::read_dir(&algo_dir)? {
            let file_path = file_entry?.path();
            let file_name = file_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let caps = raw_result_regex().captures(&file_name).ok_or_else(|| {
                AnalysisError::data_format(
                    file_path.display().to_string(),
                    "expected <n><agents|courseLimit>_<w>weight.csv",
                )
            })?;

            let axis = &caps[2];
            let target_dir = staging_dir
                .join(axis)
                .join(format!("x{}", &caps[3]))
                .join(&algo_name);
            fs::create_dir_all(&target_dir)?;
            fs::rename(
                &file_path,
                target_dir.join(format!("{}{}.csv", &caps[1], axis)),
            )?;
            moved += 1;
        }
    }
    tracing::debug!("Staged {} raw result files", moved);

    let mut created = Vec::new();
    if !staging_dir.is_dir() {
        return Ok(created);
    }

    let mut axis_dirs: Vec<PathBuf> = fs::read_dir(staging_dir)?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    axis_dirs.sort();

    for axis_dir in axis_dirs {
        let axis: Axis = axis_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
            .parse()?;

        let mut weight_dirs: Vec<PathBuf> = fs::read_dir(&axis_dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        weight_dirs.sort();

        for weight_dir in weight_dirs {
            let tag = weight_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = ArchiveName::parse(&format!("courseAlgo_{}_{}_{}.zip", date, axis, tag))?;
            let zip_path = archives_dir.join(name.file_name());
            let files = create_archive(&weight_dir, &zip_path)?;
            tracing::info!("🗜️ Created {} ({} files)", zip_path.display(), files);
            created.push(zip_path);
        }
    }

    Ok(created)
}
