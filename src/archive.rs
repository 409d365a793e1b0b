//! Archive expansion and re-archiving.
//!
//! Archives given as inputs are unpacked into a sibling directory named after the
//! archive, scanned like any folder, and optionally packed again once the images
//! inside have been compressed. [`ArchiveMappings`] keeps track of every expansion so
//! that the rebuild step and the final cleanup know which directories belong to which
//! archive.

use crate::classify::{classify, PathKind};
use crate::constants::ARCHIVE_METADATA_MARKERS;
use crate::error::{CompressionError, Result};
use crate::formats::ArchiveFormat;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// One archive input and the directory it was unpacked into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedArchive {
    /// The archive path as given on the command line
    pub archive: PathBuf,
    /// Sibling directory holding the unpacked entries
    pub extracted_dir: PathBuf,
    /// Directory whose top level holds the archive's content
    pub content_root: PathBuf,
    /// Whether `extracted_dir` was created by us and still has to be removed
    pub cleanup_pending: bool,
}

/// Bookkeeping for every archive expanded during a run
#[derive(Debug, Default)]
pub struct ArchiveMappings {
    entries: Vec<ExtractedArchive>,
}

impl ArchiveMappings {
    pub fn insert(&mut self, extracted: ExtractedArchive) {
        self.entries.retain(|e| e.archive != extracted.archive);
        self.entries.push(extracted);
    }

    pub fn get(&self, archive: &Path) -> Option<&ExtractedArchive> {
        self.entries.iter().find(|e| e.archive == archive)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedArchive> {
        self.entries.iter()
    }

    /// Stop tracking the extraction directory of `archive` for removal
    fn release(&mut self, archive: &Path) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.archive == archive) {
            entry.cleanup_pending = false;
        }
    }

    /// Keep extraction directories that hold any of `outputs`.
    ///
    /// Without re-archiving those directories are the only place the compressed
    /// images end up, so [`cleanup`](Self::cleanup) must leave them alone.
    pub fn retain_outputs<'a>(&mut self, outputs: impl IntoIterator<Item = &'a Path>) {
        let outputs: Vec<&Path> = outputs.into_iter().collect();
        for entry in self.entries.iter_mut().filter(|e| e.cleanup_pending) {
            let dir = entry
                .extracted_dir
                .canonicalize()
                .unwrap_or_else(|_| entry.extracted_dir.clone());
            if outputs.iter().any(|output| output.starts_with(&dir)) {
                debug!("Keeping {:?}, it holds compressed images", entry.extracted_dir);
                entry.cleanup_pending = false;
            }
        }
    }

    /// Remove every extraction directory we created that has not been consumed yet
    pub fn cleanup(&mut self) {
        for entry in self.entries.iter_mut().filter(|e| e.cleanup_pending) {
            match fs::remove_dir_all(&entry.extracted_dir) {
                Ok(()) => debug!("Removed extraction directory {:?}", entry.extracted_dir),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {:?}: {}", entry.extracted_dir, e),
            }
            entry.cleanup_pending = false;
        }
    }
}

fn is_metadata_entry(name: &Path) -> bool {
    name.components().any(|component| match component {
        Component::Normal(part) => {
            let part = part.to_string_lossy();
            ARCHIVE_METADATA_MARKERS.iter().any(|marker| part == *marker)
        }
        _ => false,
    })
}

fn file_stem_string(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .ok_or_else(|| CompressionError::UnsupportedFormat(format!("Invalid file name: {:?}", path)))
}

/// `<parent>/<stem>.<extension>` for an input path
pub fn sibling_archive_path(path: &Path, format: ArchiveFormat) -> Result<PathBuf> {
    let stem = file_stem_string(path)?;
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(parent.join(format!("{}.{}", stem, format.extension())))
}

/// Unpack `archive_path` into a sibling directory named after its base name.
///
/// The format is picked from the extension, unknown extensions are read as zip.
/// macOS metadata entries are skipped and entries escaping the target directory
/// are rejected.
pub fn expand_archive(archive_path: &Path) -> Result<ExtractedArchive> {
    let stem = file_stem_string(archive_path)?;
    let parent = archive_path.parent().unwrap_or_else(|| Path::new(""));
    let extracted_dir = parent.join(stem);

    let created = !extracted_dir.exists();
    fs::create_dir_all(&extracted_dir)?;

    let result = match ArchiveFormat::for_path(archive_path) {
        ArchiveFormat::Zip => extract_zip(archive_path, &extracted_dir),
        ArchiveFormat::Tar => {
            let file = BufReader::new(File::open(archive_path)?);
            extract_tar(file, &extracted_dir)
        }
        ArchiveFormat::Tgz => {
            let file = BufReader::new(File::open(archive_path)?);
            extract_tar(GzDecoder::new(file), &extracted_dir)
        }
    };

    if let Err(e) = result {
        if created {
            let _ = fs::remove_dir_all(&extracted_dir);
        }
        return Err(e);
    }

    let content_root = content_root(&extracted_dir)?;
    debug!(
        "Expanded {:?} into {:?} (content root {:?})",
        archive_path, extracted_dir, content_root
    );

    Ok(ExtractedArchive {
        archive: archive_path.to_path_buf(),
        extracted_dir,
        content_root,
        cleanup_pending: created,
    })
}

/// A directory holding nothing but a single folder is unwrapped to that folder
fn content_root(extracted_dir: &Path) -> Result<PathBuf> {
    let mut children = Vec::new();
    for entry in fs::read_dir(extracted_dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        children.push(entry.path());
    }

    if children.len() == 1 && children[0].is_dir() {
        Ok(children.remove(0))
    } else {
        Ok(extracted_dir.to_path_buf())
    }
}

fn extract_zip(archive_path: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| CompressionError::InvalidArchiveEntry(entry.name().to_string()))?;

        if is_metadata_entry(&name) {
            continue;
        }

        let out_path = target.join(&name);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = BufWriter::new(File::create(&out_path)?);
        io::copy(&mut entry, &mut out)?;
        out.flush()?;
    }

    Ok(())
}

fn extract_tar<R: Read>(reader: R, target: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.into_owned();
        if is_metadata_entry(&name) {
            continue;
        }
        // unpack_in refuses paths that would land outside of `target`
        if !entry.unpack_in(target)? {
            return Err(CompressionError::InvalidArchiveEntry(
                name.to_string_lossy().into_owned(),
            ));
        }
    }

    Ok(())
}

/// Build an archive in a temporary file beside `dest` and move it into place.
///
/// `dest` is only replaced once the archive is complete; a failed build leaves any
/// existing file at `dest` untouched.
fn write_staged<F>(dest: &Path, build: F) -> Result<()>
where
    F: FnOnce(BufWriter<&mut File>) -> Result<()>,
{
    let dir = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::NamedTempFile::new_in(dir)?;
    build(BufWriter::new(staged.as_file_mut()))?;
    if let Ok(metadata) = fs::metadata(dest) {
        fs::set_permissions(staged.path(), metadata.permissions())?;
    }
    staged.persist(dest).map_err(|e| CompressionError::Io(e.error))?;
    Ok(())
}

/// Pack a directory tree into `dest`, keeping the directory name as top-level entry
pub fn archive_directory(dir: &Path, dest: &Path, format: ArchiveFormat) -> Result<()> {
    let base = dir
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| CompressionError::UnsupportedFormat(format!("Invalid directory: {:?}", dir)))?;

    write_staged(dest, |writer| {
        match format {
            ArchiveFormat::Zip => {
                let mut zip = ZipWriter::new(writer);
                let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

                for entry in WalkDir::new(dir).sort_by_file_name() {
                    let entry = entry?;
                    let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
                    let name = zip_entry_name(&base.join(relative));
                    if entry.file_type().is_dir() {
                        zip.add_directory(name, options)?;
                    } else if entry.file_type().is_file() {
                        zip.start_file(name, options)?;
                        let mut input = File::open(entry.path())?;
                        io::copy(&mut input, &mut zip)?;
                    }
                }
                zip.finish()?.flush()?;
            }
            ArchiveFormat::Tar => {
                let mut tar = tar::Builder::new(writer);
                tar.append_dir_all(&base, dir)?;
                tar.into_inner()?.flush()?;
            }
            ArchiveFormat::Tgz => {
                let mut tar = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
                tar.append_dir_all(&base, dir)?;
                tar.into_inner()?.finish()?.flush()?;
            }
        }
        Ok(())
    })
}

/// Pack a single file into `dest` as the only entry
pub fn archive_file(file: &Path, dest: &Path, format: ArchiveFormat) -> Result<()> {
    let name = file
        .file_name()
        .map(PathBuf::from)
        .ok_or_else(|| CompressionError::UnsupportedFormat(format!("Invalid file name: {:?}", file)))?;

    write_staged(dest, |writer| {
        match format {
            ArchiveFormat::Zip => {
                let mut zip = ZipWriter::new(writer);
                let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
                zip.start_file(zip_entry_name(&name), options)?;
                let mut input = File::open(file)?;
                io::copy(&mut input, &mut zip)?;
                zip.finish()?.flush()?;
            }
            ArchiveFormat::Tar => {
                let mut tar = tar::Builder::new(writer);
                tar.append_path_with_name(file, &name)?;
                tar.into_inner()?.flush()?;
            }
            ArchiveFormat::Tgz => {
                let mut tar = tar::Builder::new(GzEncoder::new(writer, Compression::default()));
                tar.append_path_with_name(file, &name)?;
                tar.into_inner()?.finish()?.flush()?;
            }
        }
        Ok(())
    })
}

fn zip_entry_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Replace an expanded archive with a freshly packed one built from its directory
fn rebuild_archive(extracted: &ExtractedArchive, format: ArchiveFormat) -> Result<PathBuf> {
    let dest = sibling_archive_path(&extracted.archive, format)?;
    archive_directory(&extracted.content_root, &dest, format)?;
    if dest != extracted.archive {
        fs::remove_file(&extracted.archive)?;
    }
    if extracted.cleanup_pending {
        fs::remove_dir_all(&extracted.extracted_dir)?;
    }
    Ok(dest)
}

fn archive_input(
    input: &Path,
    extracted: Option<&ExtractedArchive>,
    format: ArchiveFormat,
) -> Result<Option<PathBuf>> {
    if !input.exists() {
        warn!("{:?} no longer exists, not archived", input);
        return Ok(None);
    }

    match classify(input) {
        PathKind::Archive => match extracted {
            Some(extracted) => rebuild_archive(extracted, format).map(Some),
            None => Ok(None),
        },
        PathKind::Directory => {
            // `.` and `..` have no file name of their own
            let dir = input.canonicalize()?;
            let dest = sibling_archive_path(&dir, format)?;
            archive_directory(&dir, &dest, format)?;
            Ok(Some(dest))
        }
        PathKind::Image => {
            let dest = sibling_archive_path(input, format)?;
            archive_file(input, &dest, format)?;
            Ok(Some(dest))
        }
        PathKind::Unknown => Ok(None),
    }
}

/// Archive every original input concurrently.
///
/// Each input is handled on its own blocking task so a failure in one does not stop
/// the others. Returns the archives that were written, or the first error once all
/// inputs have been attempted.
pub async fn archive_inputs(
    inputs: &[PathBuf],
    format: ArchiveFormat,
    mappings: &mut ArchiveMappings,
) -> Result<Vec<PathBuf>> {
    let handles: Vec<_> = inputs
        .iter()
        .map(|input| {
            let input = input.clone();
            let extracted = mappings.get(&input).cloned();
            tokio::task::spawn_blocking(move || {
                let result = archive_input(&input, extracted.as_ref(), format);
                (input, result)
            })
        })
        .collect();

    let mut created = Vec::new();
    let mut first_error = None;

    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok((input, Ok(written))) => {
                if written.is_some() {
                    mappings.release(&input);
                }
                if let Some(path) = written {
                    debug!("Created archive {:?}", path);
                    created.push(path);
                }
            }
            Ok((input, Err(e))) => {
                warn!("Failed to archive {:?}: {}", input, e);
                if let Some(extracted) = mappings.get(&input).filter(|extracted| extracted.cleanup_pending) {
                    warn!("Keeping {:?} with the compressed contents", extracted.extracted_dir);
                }
                mappings.release(&input);
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(CompressionError::Task(e));
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(created),
    }
}
