//! ZIP export
//!
//! One archive with `index.html`, `style.css` and `script.js` at its root.
//! Entry timestamps are fixed so the same project always exports to the
//! same bytes.

use std::fs::File;
use std::io::{Cursor, Seek, Write};
use std::path::Path;
use tracing::info;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use codeplay_core::{Language, SourceTriple};

use crate::error::ServiceError;

/// Default archive name offered for download.
pub const EXPORT_FILE_NAME: &str = "codeplay-project.zip";

/// Writes the project archive to `writer` and hands the writer back.
pub fn export_zip<W: Write + Seek>(sources: &SourceTriple, writer: W) -> Result<W, ServiceError> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());

    let mut zip = ZipWriter::new(writer);
    for (language, text) in sources.iter() {
        zip.start_file(language.file_name(), options)?;
        zip.write_all(text.as_bytes())?;
    }
    Ok(zip.finish()?)
}

pub fn export_bytes(sources: &SourceTriple) -> Result<Vec<u8>, ServiceError> {
    Ok(export_zip(sources, Cursor::new(Vec::new()))?.into_inner())
}

/// Writes the archive to `path`, replacing any existing file.
pub fn export_to_path(sources: &SourceTriple, path: impl AsRef<Path>) -> Result<(), ServiceError> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut file = export_zip(sources, file)?;
    file.flush()?;
    info!(
        path = %path.display(),
        files = Language::ALL.len(),
        "project exported"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut entry = archive.by_name(name).unwrap();
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_archive_has_three_files() {
        let sources = SourceTriple::new("<h1>Hi</h1>", "h1 { color: red; }", "console.log('ü');");
        let bytes = export_bytes(&sources).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();

        assert_eq!(archive.len(), 3);
        assert_eq!(read_entry(&mut archive, "index.html"), sources.html);
        assert_eq!(read_entry(&mut archive, "style.css"), sources.css);
        assert_eq!(read_entry(&mut archive, "script.js"), sources.js);
    }

    #[test]
    fn test_export_is_reproducible() {
        let sources = SourceTriple::default();
        assert_eq!(export_bytes(&sources).unwrap(), export_bytes(&sources).unwrap());
    }

    #[test]
    fn test_export_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(EXPORT_FILE_NAME);
        export_to_path(&SourceTriple::new("", "", ""), &path).unwrap();

        let archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["index.html", "script.js", "style.css"]);
    }
}
