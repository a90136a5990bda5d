//! Wordlist ingestion as a lazy candidate stream
//!
//! Turns an on-disk wordlist (plain text, a gzip stream, or a single-entry
//! zip archive) into a restartable sequence of candidate seeds, one per
//! non-empty line in file order. The decompressed content is never held in
//! memory as a whole; counting is a streaming side pass.

use crate::{Error, Result};
use flate2::read::MultiGzDecoder;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Wordlist container format, detected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WordlistFormat {
    Plain,
    Gzip,
    Zip,
}

impl WordlistFormat {
    fn detect(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
        {
            Some(ext) if ext == "gz" => Self::Gzip,
            Some(ext) if ext == "zip" => Self::Zip,
            _ => Self::Plain,
        }
    }
}

/// One candidate seed: a position in the wordlist plus the line itself
///
/// Indices are strictly increasing and contiguous over non-empty lines, which
/// is what makes resume-from-offset well-defined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub index: u64,
    pub value: String,
}

/// Handle to an on-disk wordlist
#[derive(Debug, Clone)]
pub struct Wordlist {
    path: PathBuf,
    format: WordlistFormat,
}

impl Wordlist {
    /// Open a wordlist file, detecting the container format
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("wordlist {} does not exist", path.display()),
            )));
        }
        let format = WordlistFormat::detect(&path);
        debug!(path = %path.display(), ?format, "Opened wordlist");
        Ok(Self { path, format })
    }

    pub fn format(&self) -> WordlistFormat {
        self.format
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Count candidates with a streaming side pass
    ///
    /// Fails with `Empty` when the wordlist holds zero non-empty lines.
    pub fn count(&self) -> Result<u64> {
        let mut total = 0u64;
        for candidate in self.candidates()? {
            candidate?;
            total += 1;
        }
        if total == 0 {
            return Err(Error::Empty);
        }
        Ok(total)
    }

    /// Stream all candidates in file order
    pub fn candidates(&self) -> Result<Candidates> {
        self.candidates_from(0)
    }

    /// Count candidates and hand back a stream over the same bytes
    ///
    /// Counting is a full pass. For seekable sources (plain files, the
    /// spilled zip member) the pass rewinds and the stream reuses the same
    /// handle, so an archive member is decompressed exactly once. A gzip
    /// stream cannot rewind and is decoded twice.
    pub fn counted_candidates(&self) -> Result<(u64, Candidates)> {
        let mut file = match self.format {
            WordlistFormat::Plain => File::open(&self.path)?,
            WordlistFormat::Zip => self.spill_zip_member(File::open(&self.path)?)?,
            WordlistFormat::Gzip => {
                let total = self.count()?;
                return Ok((total, self.candidates()?));
            }
        };

        let mut counting = Candidates {
            reader: Box::new(BufReader::new(file.try_clone()?)),
            format: self.format,
            next_index: 0,
        };
        let mut total = 0u64;
        for candidate in &mut counting {
            candidate?;
            total += 1;
        }
        if total == 0 {
            return Err(Error::Empty);
        }

        // The clone shares the cursor; one seek rewinds for the real pass
        file.seek(SeekFrom::Start(0))?;
        Ok((
            total,
            Candidates {
                reader: Box::new(BufReader::new(file)),
                format: self.format,
                next_index: 0,
            },
        ))
    }

    /// Stream candidates starting at a zero-based candidate index
    pub fn candidates_from(&self, start: u64) -> Result<Candidates> {
        let mut stream = Candidates {
            reader: self.open_reader()?,
            format: self.format,
            next_index: 0,
        };
        // Discard candidates below the start index without retaining them
        while stream.next_index < start {
            match stream.next() {
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e),
                None => break,
            }
        }
        Ok(stream)
    }

    fn open_reader(&self) -> Result<Box<dyn BufRead + Send>> {
        let file = File::open(&self.path)?;
        match self.format {
            WordlistFormat::Plain => Ok(Box::new(BufReader::new(file))),
            // MultiGzDecoder: a .gz file may be several concatenated members
            // (RFC 1952) and all of them hold candidates
            WordlistFormat::Gzip => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
            WordlistFormat::Zip => Ok(Box::new(BufReader::new(self.spill_zip_member(file)?))),
        }
    }

    /// Spill the single archive member to an anonymous temp file
    ///
    /// A zip member cannot be streamed independently of the archive handle,
    /// so it is decompressed once onto disk and read back lazily. Memory use
    /// stays bounded either way. The returned handle is rewound to the start.
    fn spill_zip_member(&self, file: File) -> Result<File> {
        let mut archive = zip::ZipArchive::new(BufReader::new(file))
            .map_err(|e| Error::Corrupt(format!("Unreadable zip archive: {}", e)))?;

        let mut file_indices = Vec::new();
        for i in 0..archive.len() {
            let entry = archive
                .by_index(i)
                .map_err(|e| Error::Corrupt(format!("Unreadable zip member: {}", e)))?;
            if entry.is_file() {
                file_indices.push(i);
            }
        }

        let member_index = match file_indices.as_slice() {
            [] => {
                return Err(Error::InvalidFormat(
                    "Archive contains no file members".to_string(),
                ))
            }
            [only] => *only,
            more => {
                return Err(Error::InvalidFormat(format!(
                    "Archive contains {} file members, expected exactly one",
                    more.len()
                )))
            }
        };

        let mut member = archive
            .by_index(member_index)
            .map_err(|e| Error::Corrupt(format!("Unreadable zip member: {}", e)))?;
        let mut spill = tempfile::tempfile()?;
        io::copy(&mut member, &mut spill)
            .map_err(|e| Error::Corrupt(format!("Failed to decompress archive member: {}", e)))?;
        spill.seek(SeekFrom::Start(0))?;
        debug!(member = member.name(), "Spilled archive member to temp file");
        Ok(spill)
    }
}

/// Lazy candidate stream over a wordlist reader
pub struct Candidates {
    reader: Box<dyn BufRead + Send>,
    format: WordlistFormat,
    next_index: u64,
}

impl Iterator for Candidates {
    type Item = Result<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut raw = Vec::new();
            match self.reader.read_until(b'\n', &mut raw) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    // A mid-stream failure in a compressed container means the
                    // container itself is damaged
                    return Some(Err(match self.format {
                        WordlistFormat::Plain => Error::Io(e),
                        _ => Error::Corrupt(format!("Decompression failed mid-stream: {}", e)),
                    }));
                }
            }
            // Trim the trailing line terminator only; interior whitespace is
            // part of the candidate
            if raw.last() == Some(&b'\n') {
                raw.pop();
            }
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            if raw.is_empty() {
                continue;
            }
            let index = self.next_index;
            self.next_index += 1;
            return Some(Ok(Candidate {
                index,
                value: decode_line(raw),
            }));
        }
    }
}

/// Decode a line as UTF-8, falling back to Latin-1 for legacy wordlists
fn decode_line(raw: Vec<u8>) -> String {
    match String::from_utf8(raw) {
        Ok(s) => s,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    }
}
