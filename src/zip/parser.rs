//! Low-level ZIP container parser.
//!
//! Parses the structures of a ZIP archive held entirely in memory, which
//! is the shape drag-and-drop delivers a `.kmz` file in: one contiguous
//! byte buffer, no streaming.
//!
//! ## Parsing strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the buffer's end
//! 2. Read the Central Directory to get metadata for all entries
//! 3. For each entry, read its Local File Header to locate the data,
//!    then inflate it
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only (all a KMZ authoring tool emits)
//! - No ZIP64, encryption, or multi-disk support

use byteorder::{LittleEndian, ReadBytesExt};
use flate2::read::DeflateDecoder;
use std::io::{Cursor, Read};

use anyhow::{Context, Result, bail};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: usize = 65535;

/// Borrowing parser over a complete in-memory ZIP buffer.
///
/// Typically used through [`Archive`](super::Archive) rather than
/// directly.
pub struct ZipParser<'a> {
    data: &'a [u8],
}

impl<'a> ZipParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Handles both the common case (no archive comment, EOCD flush with
    /// the end of the buffer) and commented archives by searching
    /// backwards for the signature.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid EOCD can be found, indicating the
    /// buffer is not a valid ZIP archive.
    pub fn find_eocd(&self) -> Result<EndOfCentralDirectory> {
        // Fast path: no comment, EOCD sits exactly at the end.
        if self.data.len() >= EndOfCentralDirectory::SIZE {
            let offset = self.data.len() - EndOfCentralDirectory::SIZE;
            let tail = &self.data[offset..];

            if &tail[0..4] == EndOfCentralDirectory::SIGNATURE && &tail[20..22] == b"\x00\x00" {
                return EndOfCentralDirectory::from_bytes(tail);
            }
        }

        // EOCD not at the expected location, so the archive carries a
        // comment. Search backwards from the end for the signature.
        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE).min(self.data.len());
        let search_start = self.data.len() - search_size;
        let window = &self.data[search_start..];

        for i in (0..window.len().saturating_sub(EndOfCentralDirectory::SIZE)).rev() {
            if &window[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // Candidate found. The comment-length field must account
                // for every byte remaining after the record.
                let comment_len = u16::from_le_bytes([window[i + 20], window[i + 21]]) as usize;

                if comment_len == window.len() - i - EndOfCentralDirectory::SIZE {
                    return EndOfCentralDirectory::from_bytes(
                        &window[i..i + EndOfCentralDirectory::SIZE],
                    );
                }
            }
        }

        bail!("Not a valid ZIP archive")
    }

    /// Parse every Central Directory record, in the archive's stored order.
    ///
    /// Stored order matters downstream: when a KMZ carries more than one
    /// `.kml` member, the first one in this order is the one that wins.
    pub fn central_directory(&self) -> Result<Vec<CentralDirEntry>> {
        let eocd = self.find_eocd()?;

        let cd_offset = eocd.cd_offset as usize;
        let cd_size = eocd.cd_size as usize;
        let cd_end = cd_offset
            .checked_add(cd_size)
            .filter(|end| *end <= self.data.len())
            .context("Central Directory extends past end of archive")?;

        let cd_data = &self.data[cd_offset..cd_end];
        let mut cursor = Cursor::new(cd_data);

        let mut entries = Vec::with_capacity(eocd.total_entries as usize);
        for _ in 0..eocd.total_entries {
            entries.push(Self::parse_cdfh(&mut cursor)?);
        }

        Ok(entries)
    }

    /// Parse one Central Directory File Header from the cursor.
    fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<CentralDirEntry> {
        // Signature check (PK\x01\x02)
        let mut sig = [0u8; 4];
        cursor.read_exact(&mut sig)?;
        if sig != CDFH_SIGNATURE {
            bail!("Invalid Central Directory File Header");
        }

        let _version_made_by = cursor.read_u16::<LittleEndian>()?;
        let _version_needed = cursor.read_u16::<LittleEndian>()?;
        let _flags = cursor.read_u16::<LittleEndian>()?;
        let compression_method = cursor.read_u16::<LittleEndian>()?;
        let last_mod_time = cursor.read_u16::<LittleEndian>()?;
        let last_mod_date = cursor.read_u16::<LittleEndian>()?;
        let crc32 = cursor.read_u32::<LittleEndian>()?;
        let compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
        let file_name_length = cursor.read_u16::<LittleEndian>()?;
        let extra_field_length = cursor.read_u16::<LittleEndian>()?;
        let file_comment_length = cursor.read_u16::<LittleEndian>()?;
        let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
        let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
        let _external_attrs = cursor.read_u32::<LittleEndian>()?;
        let lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

        let mut file_name_bytes = vec![0u8; file_name_length as usize];
        cursor.read_exact(&mut file_name_bytes)?;
        // Lossy conversion keeps archives with non-UTF8 names readable
        let name = String::from_utf8_lossy(&file_name_bytes).to_string();

        // Directory entries end with '/'
        let is_directory = name.ends_with('/');

        // Skip extra field and comment; nothing in them is needed here
        let skip = extra_field_length as u64 + file_comment_length as u64;
        cursor.set_position(cursor.position() + skip);

        Ok(CentralDirEntry {
            name,
            compression_method: CompressionMethod::from_u16(compression_method),
            compressed_size,
            uncompressed_size,
            crc32,
            lfh_offset,
            last_mod_time,
            last_mod_date,
            is_directory,
        })
    }

    /// Compute where an entry's compressed data begins.
    ///
    /// The Local File Header repeats the filename and extra field with
    /// lengths that may differ from the Central Directory's copy, so the
    /// LFH itself has to be consulted.
    fn data_offset(&self, entry: &CentralDirEntry) -> Result<usize> {
        let lfh_offset = entry.lfh_offset as usize;
        let lfh_end = lfh_offset
            .checked_add(LFH_SIZE)
            .filter(|end| *end <= self.data.len())
            .context("Local File Header extends past end of archive")?;

        let lfh = &self.data[lfh_offset..lfh_end];
        if &lfh[0..4] != LFH_SIGNATURE {
            bail!("Invalid Local File Header");
        }

        // Filename and extra-field lengths sit at fixed offsets 26 and 28
        let file_name_length = u16::from_le_bytes([lfh[26], lfh[27]]) as usize;
        let extra_field_length = u16::from_le_bytes([lfh[28], lfh[29]]) as usize;

        Ok(lfh_offset + LFH_SIZE + file_name_length + extra_field_length)
    }

    /// Read and decompress one entry's data.
    pub fn entry_data(&self, entry: &CentralDirEntry) -> Result<Vec<u8>> {
        let start = self.data_offset(entry)?;
        let end = start
            .checked_add(entry.compressed_size as usize)
            .filter(|end| *end <= self.data.len())
            .context("Entry data extends past end of archive")?;

        let raw = &self.data[start..end];

        match entry.compression_method {
            CompressionMethod::Stored => Ok(raw.to_vec()),
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(entry.uncompressed_size as usize);
                DeflateDecoder::new(raw)
                    .read_to_end(&mut out)
                    .with_context(|| format!("Failed to inflate entry {}", entry.name))?;
                Ok(out)
            }
            CompressionMethod::Unknown(method) => {
                bail!(
                    "Unsupported compression method {} for entry {}",
                    method,
                    entry.name
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use ::zip::write::FileOptions;

    fn build_zip(entries: &[(&str, &[u8])], comment: Option<&str>) -> Vec<u8> {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            FileOptions::default().compression_method(::zip::CompressionMethod::Deflated);
        for (name, data) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
        if let Some(comment) = comment {
            writer.set_comment(comment);
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn central_directory_preserves_stored_order() {
        let buffer = build_zip(&[("z.txt", b"z"), ("a.txt", b"a")], None);
        let parser = ZipParser::new(&buffer);
        let entries = parser.central_directory().unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["z.txt", "a.txt"]);
    }

    #[test]
    fn entry_data_inflates_deflated_members() {
        let buffer = build_zip(&[("doc.kml", b"<kml/>".repeat(100).as_slice())], None);
        let parser = ZipParser::new(&buffer);
        let entries = parser.central_directory().unwrap();
        assert_eq!(
            parser.entry_data(&entries[0]).unwrap(),
            b"<kml/>".repeat(100)
        );
    }

    #[test]
    fn eocd_found_behind_archive_comment() {
        let buffer = build_zip(&[("doc.kml", b"<kml/>")], Some("made by a map tool"));
        let parser = ZipParser::new(&buffer);
        let entries = parser.central_directory().unwrap();
        assert_eq!(entries[0].name, "doc.kml");
    }

    #[test]
    fn unsupported_compression_method_is_rejected() {
        let mut writer = ::zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("doc.kml", FileOptions::default())
            .unwrap();
        writer.write_all(b"<kml/>").unwrap();
        let mut buffer = writer.finish().unwrap().into_inner();

        // Patch the central directory record's compression-method field
        // (offset 10 from the CDFH signature) to an unsupported id.
        let cdfh = buffer
            .windows(4)
            .position(|w| w == CDFH_SIGNATURE)
            .unwrap();
        buffer[cdfh + 10] = 12;
        buffer[cdfh + 11] = 0;

        let parser = ZipParser::new(&buffer);
        let entries = parser.central_directory().unwrap();
        let err = parser.entry_data(&entries[0]).unwrap_err();
        assert!(err.to_string().contains("Unsupported compression method"));
    }

    #[test]
    fn garbage_buffer_is_rejected() {
        let parser = ZipParser::new(b"this is not a zip archive at all");
        assert!(parser.find_eocd().is_err());
    }

    #[test]
    fn truncated_archive_is_rejected() {
        let buffer = build_zip(&[("doc.kml", b"<kml/>")], None);
        // Keep the EOCD but cut into the central directory
        let mut broken = buffer[buffer.len() - EndOfCentralDirectory::SIZE..].to_vec();
        let parser = ZipParser::new(&broken);
        assert!(parser.central_directory().is_err());
        broken.clear();
        assert!(ZipParser::new(&broken).find_eocd().is_err());
    }
}
