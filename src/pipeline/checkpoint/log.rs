//! Line-oriented file operations behind the checkpoint store.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::codec::identity;
use crate::constants::STRUCTURED_RECORD_SET;
use crate::domain::Value;
use crate::pipeline::processing::normalize::identity_name;

/// Creates the file with `header` unless it already exists. Returns whether
/// it was created.
pub fn ensure_with_header(path: &Path, header: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    writeln!(file, "{}", header)?;
    file.sync_data()?;
    Ok(true)
}

/// Data lines of a checkpoint file: header and blank lines dropped.
pub fn read_entries(path: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Appends one line and forces it to disk before returning.
pub fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?;

    // A file cut off mid-write may lack its final newline
    if needs_separator(&mut file)? {
        file.write_all(b"\n")?;
    }
    writeln!(file, "{}", line)?;
    file.flush()?;
    file.sync_data()
}

fn needs_separator(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Rewrites a delimited file without the line whose identity column equals
/// `name`. The header line is always kept. Returns whether a line was dropped.
pub fn remove_entry(path: &Path, name: &str) -> io::Result<bool> {
    let content = fs::read_to_string(path)?;
    let mut lines = content.lines();
    let mut kept: Vec<&str> = lines.next().into_iter().collect();
    let mut removed = false;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if identity(line) == Some(name) {
            removed = true;
        } else {
            kept.push(line);
        }
    }
    if removed {
        let mut body = kept.join("\n");
        body.push('\n');
        replace_contents(path, body.as_bytes())?;
    }
    Ok(removed)
}

/// Same as [`remove_entry`] for a structured-object file: drops every record
/// object whose second value is `name`.
pub fn remove_structured_entry(path: &Path, name: &str) -> io::Result<bool> {
    let content = fs::read_to_string(path)?;
    let mut document: serde_json::Value = serde_json::from_str(&content)?;
    let Some(serde_json::Value::Array(records)) = document.get_mut(STRUCTURED_RECORD_SET) else {
        return Ok(false);
    };
    let before = records.len();
    records.retain(|record| {
        let identity = record
            .as_object()
            .and_then(|map| map.values().nth(1))
            .map(|value| identity_name(&Value::from(value)));
        identity.as_deref() != Some(name)
    });
    if records.len() == before {
        return Ok(false);
    }
    let body = serde_json::to_string_pretty(&document)?;
    replace_contents(path, body.as_bytes())?;
    Ok(true)
}

/// Writes a sibling temp file and renames it over `path`, so a crash leaves
/// either the old or the new contents.
fn replace_contents(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = temp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
