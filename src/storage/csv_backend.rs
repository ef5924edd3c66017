use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{core::utils::ensure_dir, errors::Result};

use super::LedgerSink;

/// File name suffix of every ledger sink.
pub const SINK_SUFFIX: &str = "_poker_records.csv";
const TMP_SUFFIX: &str = "tmp";
const ESCAPE: char = '_';

/// Stores each identity's ledger as `{encoded identity}_poker_records.csv`
/// under a single directory. See [`encode_identity`] for the file stem.
#[derive(Debug, Clone)]
pub struct CsvStorage {
    root: PathBuf,
}

impl CsvStorage {
    pub fn new(root: PathBuf) -> Result<Self> {
        ensure_dir(&root)?;
        Ok(Self { root })
    }

    pub fn sink_path(&self, identity: &str) -> PathBuf {
        self.root
            .join(format!("{}{}", encode_identity(identity), SINK_SUFFIX))
    }
}

impl LedgerSink for CsvStorage {
    fn read(&self, identity: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.sink_path(identity)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, identity: &str, bytes: &[u8]) -> Result<()> {
        let path = self.sink_path(identity);
        let tmp = tmp_path(&path);
        write_atomic(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "ledger sink written");
        Ok(())
    }

    fn remove(&self, identity: &str) -> Result<bool> {
        match fs::remove_file(self.sink_path(identity)) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn identities(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(SINK_SUFFIX) else {
                continue;
            };
            match decode_identity(stem) {
                Some(identity) => entries.push(identity),
                None => tracing::debug!(file = %name, "skipping file without an encoded identity"),
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn location(&self, identity: &str) -> PathBuf {
        self.sink_path(identity)
    }
}

/// File stem for `identity`.
///
/// `[a-z0-9-]` pass through; every other byte of the UTF-8 form is written
/// as `_` plus two lowercase hex digits. The mapping is one-to-one, so
/// identities differing only in case or punctuation never share a file. The
/// empty identity is `_`.
pub fn encode_identity(identity: &str) -> String {
    if identity.is_empty() {
        return ESCAPE.to_string();
    }
    let mut encoded = String::with_capacity(identity.len());
    for ch in identity.chars() {
        if is_plain(ch) {
            encoded.push(ch);
            continue;
        }
        let mut buf = [0u8; 4];
        for byte in ch.encode_utf8(&mut buf).bytes() {
            encoded.push(ESCAPE);
            encoded.push_str(&format!("{byte:02x}"));
        }
    }
    encoded
}

/// Inverse of [`encode_identity`]; `None` for stems it never produces.
pub fn decode_identity(stem: &str) -> Option<String> {
    if stem == "_" {
        return Some(String::new());
    }
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if byte == ESCAPE as u8 {
            let hex = stem.get(idx + 1..idx + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            idx += 3;
        } else if is_plain(byte as char) {
            decoded.push(byte);
            idx += 1;
        } else {
            return None;
        }
    }
    let identity = String::from_utf8(decoded).ok()?;
    (encode_identity(&identity) == stem).then_some(identity)
}

fn is_plain(ch: char) -> bool {
    matches!(ch, 'a'..='z' | '0'..='9' | '-')
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    Ok(())
}
