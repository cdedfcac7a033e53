//! Physical container boundary: the package as a ZIP archive.
//!
//! The editor core never touches ZIP framing; it exchanges an ordered list
//! of `(member path, bytes)` entries with this module. Media members are
//! stored uncompressed, everything else is deflated, matching the layout
//! third-party readers produce.

use crate::error::Result;
use crate::opc::is_media_path;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Extract every member of a ZIP archive, preserving member order.
pub fn extract_all(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut member = archive.by_index(index)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let mut data = Vec::with_capacity(member.size() as usize);
        member.read_to_end(&mut data)?;
        entries.push((name, data));
    }
    Ok(entries)
}

/// Build a ZIP archive from ordered `(member path, bytes)` entries.
pub fn build<'a, I>(entries: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in entries {
        let options = if is_media_path(name) { stored } else { deflated };
        writer.start_file(name, options)?;
        writer.write_all(data)?;
    }
    Ok(writer.finish()?.into_inner())
}
