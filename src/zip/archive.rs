use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use super::parser::ZipParser;
use super::structures::{dos_date, dos_time};

/// One fully decoded archive member.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    /// Inflated bytes, shared so resolved image handles are cheap
    /// refcounted views rather than copies.
    pub data: Arc<[u8]>,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub is_directory: bool,
}

impl ArchiveEntry {
    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        dos_date(self.last_mod_date)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        dos_time(self.last_mod_time)
    }
}

/// A `.kmz` buffer decoded into memory: an immutable mapping from entry
/// name to bytes, in the archive's stored order.
///
/// Built once per dropped file and replaced wholesale by the next decode.
/// Every member is inflated eagerly; the single KMZ shape this crate
/// targets (one KML document plus a handful of icons) makes that cheap.
pub struct Archive {
    entries: Vec<ArchiveEntry>,
    /// Name lookup; on duplicate names the first occurrence wins.
    index: HashMap<String, usize>,
}

impl Archive {
    /// Decode a complete ZIP buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is not a valid ZIP container or an
    /// entry uses an unsupported compression method.
    pub fn parse(buffer: &[u8]) -> Result<Self> {
        let parser = ZipParser::new(buffer);

        let records = parser.central_directory()?;
        let mut entries = Vec::with_capacity(records.len());
        let mut index = HashMap::with_capacity(records.len());

        for record in records {
            let data: Arc<[u8]> = if record.is_directory {
                Arc::from(Vec::new())
            } else {
                Arc::from(parser.entry_data(&record)?)
            };

            index.entry(record.name.clone()).or_insert(entries.len());
            entries.push(ArchiveEntry {
                name: record.name,
                data,
                compressed_size: record.compressed_size,
                uncompressed_size: record.uncompressed_size,
                crc32: record.crc32,
                last_mod_time: record.last_mod_time,
                last_mod_date: record.last_mod_date,
                is_directory: record.is_directory,
            });
        }

        Ok(Self { entries, index })
    }

    /// Look up an entry by its exact name.
    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    /// All entries, in the archive's stored order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use ::zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn lookup_by_exact_name() {
        let buffer = build_zip(&[("doc.kml", b"<kml/>"), ("images/pin.png", b"\x89PNG")]);
        let archive = Archive::parse(&buffer).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(&*archive.get("images/pin.png").unwrap().data, b"\x89PNG");
        assert!(archive.get("pin.png").is_none());
    }

    #[test]
    fn duplicate_names_resolve_to_first_occurrence() {
        let buffer = build_zip(&[("pin.png", b"first"), ("pin.png", b"second")]);
        let archive = Archive::parse(&buffer).unwrap();

        assert_eq!(archive.len(), 2);
        assert_eq!(&*archive.get("pin.png").unwrap().data, b"first");
    }

    #[test]
    fn directories_kept_with_empty_bytes() {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .add_directory("images/", FileOptions::default())
            .unwrap();
        writer.start_file("doc.kml", FileOptions::default()).unwrap();
        writer.write_all(b"<kml/>").unwrap();
        let buffer = writer.finish().unwrap().into_inner();

        let archive = Archive::parse(&buffer).unwrap();
        let dir = archive.get("images/").unwrap();
        assert!(dir.is_directory);
        assert!(dir.data.is_empty());
    }
}
