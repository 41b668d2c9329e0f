// ABOUTME: Tar packing helpers for the archive-based container file protocol
// ABOUTME: Builds single-entry archives for uploads and extracts file entries from downloads

use std::io::{self, Read};
use std::time::{SystemTime, UNIX_EPOCH};
use tar::{Archive, Builder, EntryType, Header};

/// Default mode for files written into a sandbox
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// One regular file read out of an archive
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveEntry {
    pub path: String,
    pub mode: u32,
    pub contents: Vec<u8>,
}

/// Package `contents` as a tar archive holding exactly one file called `name`
pub fn pack_file(name: &str, contents: &[u8], mode: u32) -> io::Result<Vec<u8>> {
    pack_entries(&[ArchiveEntry {
        path: name.to_string(),
        mode,
        contents: contents.to_vec(),
    }])
}

pub fn pack_entries(entries: &[ArchiveEntry]) -> io::Result<Vec<u8>> {
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut builder = Builder::new(Vec::new());
    for entry in entries {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(entry.contents.len() as u64);
        header.set_mode(entry.mode);
        header.set_mtime(mtime);
        builder.append_data(&mut header, &entry.path, entry.contents.as_slice())?;
    }
    builder.into_inner()
}

/// Contents of the first regular file in the archive, if any
pub fn first_file(archive: &[u8]) -> io::Result<Option<Vec<u8>>> {
    let mut archive = Archive::new(archive);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.header().entry_type().is_file() {
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            return Ok(Some(contents));
        }
    }
    Ok(None)
}

/// Every regular file in the archive, in archive order
pub fn read_entries(archive: &[u8]) -> io::Result<Vec<ArchiveEntry>> {
    let mut archive = Archive::new(archive);
    let mut files = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let path = entry.path()?.to_string_lossy().to_string();
        let mode = entry.header().mode()?;
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        files.push(ArchiveEntry {
            path,
            mode,
            contents,
        });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_entry_archive_preserves_name_and_mode() {
        let archive = pack_file(".netrc", b"machine github.com\n", 0o600).unwrap();
        let entries = read_entries(&archive).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, ".netrc");
        assert_eq!(entries[0].mode & 0o777, 0o600);
        assert_eq!(entries[0].contents, b"machine github.com\n".to_vec());
    }

    #[test]
    fn test_first_file_on_empty_archive() {
        let archive = pack_entries(&[]).unwrap();
        assert_eq!(first_file(&archive).unwrap(), None);
    }

    #[test]
    fn test_first_file_keeps_non_utf8_bytes() {
        let bytes = vec![0xff, 0x00, 0xfe, b'a'];
        let archive = pack_file("blob.bin", &bytes, DEFAULT_FILE_MODE).unwrap();
        assert_eq!(first_file(&archive).unwrap(), Some(bytes));
    }

    #[test]
    fn test_garbage_is_an_error_not_a_panic() {
        let result = read_entries(&[1, 2, 3]);
        // A truncated header block is either rejected or yields nothing
        assert!(result.map(|e| e.is_empty()).unwrap_or(true));
    }
}
