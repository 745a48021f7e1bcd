use std::fs::{self, File};
use std::path::{Path, PathBuf};

use time::{Duration, OffsetDateTime};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::constants::{DATA_HEADER, DATE_FORMAT};
use super::error::ArchiveError;

/// Yesterday's UTC date, formatted as it appears in data log filenames.
pub fn yesterday() -> Result<String, ArchiveError> {
    let date = OffsetDateTime::now_utc().date() - Duration::days(1);
    Ok(date.format(DATE_FORMAT)?)
}

/// Locate the single data log in `log_dir` whose name carries `date_str`.
///
/// Zero candidates and more than one candidate are both errors; the archive
/// step refuses to guess which file a day's data lives in.
pub fn find_file_to_archive(log_dir: &Path, date_str: &str) -> Result<PathBuf, ArchiveError> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    for item in log_dir.read_dir()? {
        let item_path = item?.path();
        if !item_path.is_file() {
            continue;
        }
        if let Some(name) = item_path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with("_data.log") && name.contains(date_str) {
                candidates.push(item_path);
            }
        }
    }

    match candidates.len() {
        0 => Err(ArchiveError::NoMatchingFiles(
            date_str.to_string(),
            log_dir.to_path_buf(),
        )),
        1 => Ok(candidates.remove(0)),
        _ => Err(ArchiveError::MultipleMatchingFiles(
            date_str.to_string(),
            log_dir.to_path_buf(),
        )),
    }
}

/// Prepend the CSV header if the file does not already begin with it.
///
/// The router writes the header at file creation, so this is normally a no-op;
/// it covers logs produced by older deployments that wrote bare rows.
pub fn prepend_header(path: &Path) -> Result<(), ArchiveError> {
    let contents = fs::read_to_string(path)?;
    if contents.starts_with(DATA_HEADER) {
        return Ok(());
    }
    fs::write(path, format!("{DATA_HEADER}\n{contents}"))?;
    Ok(())
}

/// Compress a file to `<file>.zip` next to it, returning the archive path.
pub fn compress_file(path: &Path) -> Result<PathBuf, ArchiveError> {
    let out_path = PathBuf::from(format!("{}.zip", path.to_string_lossy()));
    let arc_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut outzip = ZipWriter::new(File::create(&out_path)?);
    outzip.start_file(
        arc_name,
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )?;
    let mut infile = File::open(path)?;
    std::io::copy(&mut infile, &mut outzip)?;
    outzip.finish()?;

    Ok(out_path)
}

/// Archive the data log for a specific date in `log_dir`.
///
/// Selects the single matching file, makes sure it carries the header,
/// compresses it, and (optionally) deletes the original.
pub fn archive_date(
    log_dir: &Path,
    date_str: &str,
    delete_original: bool,
) -> Result<PathBuf, ArchiveError> {
    log::info!("Attempting to archive the data file for {date_str} in {log_dir:?}");
    let data_file = find_file_to_archive(log_dir, date_str)?;
    prepend_header(&data_file)?;
    let zip_path = compress_file(&data_file)?;
    if delete_original {
        fs::remove_file(&data_file)?;
    }
    log::info!("Data log archived to {zip_path:?}");
    Ok(zip_path)
}

/// Archive yesterday's data log in `log_dir`.
pub fn archive_yesterday(log_dir: &Path, delete_original: bool) -> Result<PathBuf, ArchiveError> {
    archive_date(log_dir, &yesterday()?, delete_original)
}
