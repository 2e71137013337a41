use crate::ebook::variant::DateTime;
use std::io::{self, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime as ZipDateTime};

pub(crate) trait ZipFileOptionsExt {
    fn zip_compression_level(self, level: Option<u8>) -> Self;

    fn zip_last_modified_date(self, date: &DateTime) -> Self;
}

impl ZipFileOptionsExt for SimpleFileOptions {
    fn zip_compression_level(self, level: Option<u8>) -> Self {
        match level {
            Some(0) => self
                .compression_method(CompressionMethod::Stored)
                .compression_level(None),
            Some(level) => self
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level.min(9)))),
            None => self.compression_method(CompressionMethod::Deflated),
        }
    }

    fn zip_last_modified_date(self, datetime: &DateTime) -> Self {
        let date = datetime.date();
        let time = datetime.time();

        // Zip timestamps cover 1980-2107 only
        let datetime = ZipDateTime::from_date_and_time(
            date.year().clamp(1980, 2107) as u16,
            date.month(),
            date.day(),
            time.hour(),
            time.minute(),
            time.second(),
        )
        .unwrap_or_default();

        self.last_modified_time(datetime)
    }
}

/// Streaming zip output; entries are finalized when the next one starts.
pub(crate) struct ZipWriter<W: Write> {
    inner: zip::ZipWriter<zip::write::StreamWriter<W>>,
    options: SimpleFileOptions,
}

impl<W: Write> ZipWriter<W> {
    pub(crate) fn new(writer: W, compression_level: Option<u8>) -> Self {
        let options = SimpleFileOptions::default()
            .zip_compression_level(compression_level)
            .zip_last_modified_date(&DateTime::now());

        Self {
            inner: zip::ZipWriter::new_stream(writer),
            options,
        }
    }

    pub(crate) fn start_file(&mut self, name: &str, stored: bool) -> io::Result<()> {
        let options = if stored {
            // Stored entries reject a compression level
            self.options
                .compression_method(CompressionMethod::Stored)
                .compression_level(None)
        } else {
            self.options
        };

        self.inner.start_file(name, options).map_err(from_zip_error)
    }

    pub(crate) fn finish(self) -> io::Result<W> {
        self.inner
            .finish()
            .map_err(from_zip_error)
            .map(|stream_writer| stream_writer.into_inner())
    }
}

impl<W: Write> Write for ZipWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn from_zip_error(error: zip::result::ZipError) -> io::Error {
    match error {
        zip::result::ZipError::Io(error) => error,
        error => io::Error::other(error),
    }
}
