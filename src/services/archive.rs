use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppResult;
use crate::models::NamedBlob;

/// Pack blobs into a deflate-compressed ZIP, one flat member per blob, in order.
pub fn create_zip(files: &[NamedBlob]) -> AppResult<Vec<u8>> {
    let mut zip_buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_buffer));
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for file in files {
            zip.start_file(file.filename.as_str(), options)?;
            zip.write_all(&file.content)?;
        }
        zip.finish()?;
    }

    tracing::debug!(entries = files.len(), archive_size = zip_buffer.len(), "ZIP archive created");
    Ok(zip_buffer)
}
