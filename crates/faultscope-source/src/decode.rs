//! Text decoding and archive member enumeration

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;
use tracing::debug;
use zip::ZipArchive;

use crate::SourceError;

/// Leading bytes of a zip local file header and of an empty archive
const ZIP_MAGIC: [&[u8; 4]; 2] = [b"PK\x03\x04", b"PK\x05\x06"];

/// Upper bound on the buffer reserved up front for one member
const MAX_CAPACITY_HINT: u64 = 64 << 20;

/// Whether a path holds a single text file or a container of members
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File,
    Archive,
}

impl SourceKind {
    /// Inspect a path by extension, then by leading bytes
    pub fn detect(path: &Path) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::NotFound(path.to_path_buf()));
        }

        let has_zip_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if has_zip_extension {
            return Ok(Self::Archive);
        }

        let mut head = [0u8; 4];
        let mut file = File::open(path)?;
        let read = file.read(&mut head)?;
        if read == head.len() && ZIP_MAGIC.iter().any(|magic| **magic == head) {
            Ok(Self::Archive)
        } else {
            Ok(Self::File)
        }
    }
}

/// Resolve a WHATWG encoding label such as `utf-8` or `euc-kr`
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding, SourceError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| SourceError::UnsupportedEncoding(label.to_string()))
}

/// Decode bytes to text, replacing invalid sequences instead of failing
pub fn decode(bytes: &[u8], encoding: &'static Encoding, origin: &str) -> String {
    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        debug!(
            origin,
            encoding = actual.name(),
            "replaced invalid byte sequences"
        );
    }
    text.into_owned()
}

/// One archive member selected for parsing
#[derive(Debug)]
pub struct Member {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Open a container, failing with `SourceUnavailable` when it cannot be read
pub fn open_archive(path: &Path) -> Result<ZipArchive<File>, SourceError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_path_buf()),
        _ => SourceError::unavailable(path, e),
    })?;
    ZipArchive::new(file).map_err(|e| SourceError::unavailable(path, e))
}

/// Read every member whose name ends in `suffix`, in the archive's own order
pub fn read_members(path: &Path, suffix: &str) -> Result<Vec<Member>, SourceError> {
    let mut archive = open_archive(path)?;
    let mut members = Vec::new();

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| SourceError::unavailable(path, e))?;
        if entry.is_dir() || !entry.name().ends_with(suffix) {
            continue;
        }

        let name = entry.name().to_string();
        let mut bytes = Vec::with_capacity(capacity_hint(entry.size()));
        entry
            .read_to_end(&mut bytes)
            .map_err(|e| SourceError::unavailable(member_path(path, &name), e))?;
        debug!(member = %name, bytes = bytes.len(), "read archive member");
        members.push(Member { name, bytes });
    }

    Ok(members)
}

/// Declared member sizes come from the archive header, so only a capped
/// amount is reserved; the read grows the buffer past it as needed.
fn capacity_hint(declared: u64) -> usize {
    usize::try_from(declared.min(MAX_CAPACITY_HINT)).unwrap_or(0)
}

fn member_path(archive: &Path, member: &str) -> PathBuf {
    let mut path = archive.as_os_str().to_owned();
    path.push("!");
    path.push(member);
    path.into()
}
