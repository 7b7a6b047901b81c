use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::ArtifactLayout;
use crate::error::PipelineError;

/// One compressed bundle written by [`archive_outputs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBundle {
    pub source: PathBuf,
    pub archive: PathBuf,
    pub files: usize,
}

/// Zips the HTML, document and JSON directories into separate archives under
/// the archive directory. Existing archives are replaced.
pub fn archive_outputs(layout: &ArtifactLayout) -> Result<Vec<ArchiveBundle>, PipelineError> {
    let archive_dir = layout.archive_dir();
    fs::create_dir_all(&archive_dir).map_err(|e| PipelineError::io(&archive_dir, e))?;

    let targets = [
        (layout.html_dir(), "html_files.zip"),
        (layout.document_dir(), "pdf_files.zip"),
        (layout.json_dir(), "json_files.zip"),
    ];

    let mut bundles = Vec::with_capacity(targets.len());
    for (source, name) in targets {
        let archive = archive_dir.join(name);
        let files = zip_directory(&source, &archive)?;
        info!(source = %source.display(), archive = %archive.display(), files, "archive written");
        bundles.push(ArchiveBundle {
            source,
            archive,
            files,
        });
    }
    Ok(bundles)
}

/// Writes every file under `source` into a zip at `dest`, with paths relative
/// to `source`. A missing source directory yields an empty archive.
fn zip_directory(source: &Path, dest: &Path) -> Result<usize, PipelineError> {
    let mut files = Vec::new();
    if source.is_dir() {
        collect_files(source, &mut files)?;
    }
    files.sort();

    let mut temp_name = dest.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let out = File::create(&temp_path).map_err(|e| PipelineError::io(&temp_path, e))?;
    let mut writer = ZipWriter::new(out);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in &files {
        let name = entry_name(source, path);
        writer.start_file(name, options)?;
        let mut input = File::open(path).map_err(|e| PipelineError::io(path, e))?;
        io::copy(&mut input, &mut writer).map_err(|e| PipelineError::io(path, e))?;
    }
    writer.finish()?;

    fs::rename(&temp_path, dest).map_err(|e| PipelineError::io(dest, e))?;
    Ok(files.len())
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), PipelineError> {
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if !path.extension().is_some_and(|ext| ext == "tmp") {
            files.push(path);
        }
    }
    Ok(())
}

// Zip entry names always use forward slashes.
fn entry_name(source: &Path, path: &Path) -> String {
    path.strip_prefix(source)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
