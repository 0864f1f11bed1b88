use crate::domain::model::ArchiveEntry;
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Build a deflate-compressed zip archive in memory.
pub fn write_zip(entries: &[ArchiveEntry]) -> Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for entry in entries {
        zip.start_file(entry.path.as_str(), options)?;
        zip.write_all(&entry.data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
