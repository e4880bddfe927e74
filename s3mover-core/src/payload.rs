//! Loads a source file into an uploadable payload.
//!
//! Without gzip the open file handle is passed through and streamed by the
//! storage client. With gzip the whole file is compressed in memory through a
//! pooled buffer; the buffer is back in the pool before [`load`] returns.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::buffer_pool::BufferPool;
use crate::contract::PayloadBody;

/// Body, length and modification time of one source file.
#[derive(Debug)]
pub struct Payload {
    pub body: PayloadBody,
    pub length: u64,
    pub mod_time: SystemTime,
}

/// Opens `path` and prepares it for upload.
///
/// `gzip_level` is only consulted when `gzip` is set.
pub fn load(path: &Path, gzip: bool, gzip_level: u32, pool: &BufferPool) -> io::Result<Payload> {
    let mut file = File::open(path)?;
    let stat = file.metadata()?;
    let mod_time = stat.modified()?;

    if !gzip {
        return Ok(Payload {
            body: PayloadBody::File(file),
            length: stat.len(),
            mod_time,
        });
    }

    let mut buf = pool.acquire();
    let mut encoder = GzEncoder::new(&mut *buf, Compression::new(gzip_level));
    io::copy(&mut file, &mut encoder)?;
    encoder.finish()?;
    let compressed = Bytes::copy_from_slice(&buf);
    drop(buf);

    Ok(Payload {
        length: compressed.len() as u64,
        body: PayloadBody::Bytes(compressed),
        mod_time,
    })
}

/// Lists candidate files directly inside `dir`.
///
/// Directories and names starting with `.` are skipped; nothing is recursed into.
pub fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() || entry.file_name().to_string_lossy().starts_with('.') {
            continue;
        }
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::{Read, Write};
    use tempfile::tempdir;

    fn write_fixture(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    fn fixture_content() -> Vec<u8> {
        let line = b"The quick brown fox jumps over the lazy dog.\n";
        let mut content: Vec<u8> = line.iter().copied().cycle().take(401).collect();
        content[400] = b'\n';
        content
    }

    #[test]
    fn test_load_raw_streams_file_unchanged() {
        let tmp = tempdir().unwrap();
        let content = fixture_content();
        let path = write_fixture(tmp.path(), "raw.txt", &content);
        let pool = BufferPool::default();

        let payload = load(&path, false, 0, &pool).expect("raw load should succeed");
        assert_eq!(payload.length, 401);
        assert!(matches!(payload.body, PayloadBody::File(_)));
        assert_eq!(payload.body.into_vec().unwrap(), content);
        assert_eq!(pool.stats().created, 0, "raw loads never touch the pool");
    }

    #[test]
    fn test_load_gzip_compresses_and_returns_buffer() {
        let tmp = tempdir().unwrap();
        let content = fixture_content();
        let path = write_fixture(tmp.path(), "raw.txt", &content);
        let pool = BufferPool::default();

        let payload = load(&path, true, 6, &pool).expect("gzip load should succeed");
        assert!(payload.length < 401, "expected size reduced, got {}", payload.length);
        assert_eq!(pool.idle(), 1, "buffer must be back in the pool");

        let compressed = payload.body.into_vec().unwrap();
        assert_eq!(compressed.len() as u64, payload.length);
        let mut decoded = Vec::new();
        GzDecoder::new(&compressed[..]).read_to_end(&mut decoded).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn test_load_reports_file_mod_time() {
        let tmp = tempdir().unwrap();
        let path = write_fixture(tmp.path(), "stamp", b"x");
        let expected = fs::metadata(&path).unwrap().modified().unwrap();
        let payload = load(&path, true, 1, &BufferPool::default()).unwrap();
        assert_eq!(payload.mod_time, expected);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let tmp = tempdir().unwrap();
        let err = load(&tmp.path().join("nope"), false, 0, &BufferPool::default()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_list_files_skips_dotfiles_and_directories() {
        let tmp = tempdir().unwrap();
        for name in ["foo", "foo.txt", ".foo.bar", "bar", "bar.txt"] {
            write_fixture(tmp.path(), name, name.as_bytes());
        }
        fs::create_dir(tmp.path().join("subdir")).unwrap();
        write_fixture(&tmp.path().join("subdir"), "nested", b"n");

        let names: Vec<String> = list_files(tmp.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["bar", "bar.txt", "foo", "foo.txt"]);
    }
}
