//! Low-level loaders for the files of a sealed index.
//!
//! Everything here validates as it reads: a count, offset or length that
//! does not fit is reported as [`Error::IndexCorrupt`] and the index is
//! never constructed.

use crate::error::{Error, Result};
use crate::index::dir::IndexDir;
use crate::index::types::*;
use crate::utils::{read_u16_le, read_u32_le, read_u64_le};
use memmap2::Mmap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::ops::Deref;
use std::path::Path;

/// Read-only bytes of a data file: memory-mapped, or empty for zero-length files
pub(crate) enum FileBytes {
    Mapped(Mmap),
    Empty,
}

impl FileBytes {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(FileBytes::Empty);
        }
        // SAFETY: sealed index files are never modified after the build
        let map = unsafe { Mmap::map(&file)? };
        Ok(FileBytes::Mapped(map))
    }
}

impl Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileBytes::Mapped(map) => map,
            FileBytes::Empty => &[],
        }
    }
}

/// Map a truncated read to a corruption error for `path`
fn truncated(dir: &IndexDir, file: &str) -> impl Fn(io::Error) -> Error {
    let path = dir.file(file);
    move |e| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::corrupt(&path, "file is truncated")
        } else {
            Error::Io(e)
        }
    }
}

/// Read the document table and check it against the metadata
pub(crate) fn read_documents(dir: &IndexDir, meta: &IndexMeta) -> Result<Vec<DocEntry>> {
    let path = dir.file(DOCS_FILE);
    let on_eof = truncated(dir, DOCS_FILE);
    let mut file = BufReader::new(File::open(&path)?);

    let count = read_u32_le(&mut file).map_err(&on_eof)?;
    if count != meta.stats.num_docs {
        return Err(Error::corrupt(
            &path,
            format!("{count} documents on disk, meta says {}", meta.stats.num_docs),
        ));
    }

    let mut documents = Vec::with_capacity(count as usize);
    let mut total_terms = 0u64;

    for expected_id in 0..count {
        let doc = read_doc_entry(&mut file).map_err(&on_eof)?;
        if doc.doc_id != expected_id {
            return Err(Error::corrupt(
                &path,
                format!("entry {expected_id} has doc id {}", doc.doc_id),
            ));
        }
        if doc.label != NO_LABEL && doc.label as usize >= meta.labels.len() {
            return Err(Error::corrupt(
                &path,
                format!("doc {} has unknown label {}", doc.doc_id, doc.label),
            ));
        }
        total_terms += doc.length;
        documents.push(doc);
    }

    if total_terms != meta.stats.total_terms {
        return Err(Error::corrupt(
            &path,
            format!(
                "document lengths sum to {total_terms}, meta says {}",
                meta.stats.total_terms
            ),
        ));
    }

    Ok(documents)
}

fn read_doc_entry<R: Read>(file: &mut R) -> io::Result<DocEntry> {
    Ok(DocEntry {
        doc_id: read_u32_le(file)?,
        length: read_u64_le(file)?,
        unique_terms: read_u32_le(file)?,
        label: read_u32_le(file)?,
        forward_offset: read_u64_le(file)?,
        forward_len: read_u32_le(file)?,
    })
}

/// Read the vocabulary in term id order
pub(crate) fn read_vocab(dir: &IndexDir, meta: &IndexMeta) -> Result<Vec<TermEntry>> {
    let path = dir.file(VOCAB_FILE);
    let on_eof = truncated(dir, VOCAB_FILE);
    let mut file = BufReader::new(File::open(&path)?);

    let count = read_u32_le(&mut file).map_err(&on_eof)?;
    if count != meta.stats.vocab_size {
        return Err(Error::corrupt(
            &path,
            format!("{count} terms on disk, meta says {}", meta.stats.vocab_size),
        ));
    }

    let mut entries = Vec::with_capacity(count as usize);

    for _ in 0..count {
        let term_len = read_u16_le(&mut file).map_err(&on_eof)? as usize;
        let mut term_bytes = vec![0u8; term_len];
        file.read_exact(&mut term_bytes).map_err(&on_eof)?;
        let term = String::from_utf8(term_bytes)
            .map_err(|_| Error::corrupt(&path, "term is not valid UTF-8"))?;

        entries.push(TermEntry {
            term,
            offset: read_u64_le(&mut file).map_err(&on_eof)?,
            length: read_u32_le(&mut file).map_err(&on_eof)?,
            doc_freq: read_u32_le(&mut file).map_err(&on_eof)?,
            total_term_freq: read_u64_le(&mut file).map_err(&on_eof)?,
        });
    }

    Ok(entries)
}

/// Check that `offset..offset + len` lies inside a file of `file_len` bytes
pub(crate) fn check_range(
    path: &Path,
    what: &str,
    offset: u64,
    len: u32,
    file_len: usize,
) -> Result<()> {
    let end = offset.checked_add(len as u64);
    match end {
        Some(end) if end <= file_len as u64 => Ok(()),
        _ => Err(Error::corrupt(
            path,
            format!("{what} range {offset}+{len} exceeds file size {file_len}"),
        )),
    }
}

/// Check that the `(offset, len)` records, in id order, cover a file of
/// `file_len` bytes back to back with no gap or overlap
pub(crate) fn check_layout<I>(path: &Path, what: &str, ranges: I, file_len: usize) -> Result<()>
where
    I: IntoIterator<Item = (u64, u32)>,
{
    let mut expected = 0u64;
    for (offset, len) in ranges {
        check_range(path, what, offset, len, file_len)?;
        if offset != expected {
            return Err(Error::corrupt(
                path,
                format!("{what} range starts at {offset}, previous one ends at {expected}"),
            ));
        }
        expected = offset + len as u64;
    }
    if expected != file_len as u64 {
        return Err(Error::corrupt(
            path,
            format!("{what} ranges end at {expected}, file size is {file_len}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_accepts_contiguous_ranges() {
        let path = Path::new("postings.bin");
        assert!(check_layout(path, "postings", [(0, 4), (4, 0), (4, 6)], 10).is_ok());
        assert!(check_layout(path, "postings", std::iter::empty(), 0).is_ok());
    }

    #[test]
    fn test_layout_rejects_gaps_overlaps_and_slack() {
        let path = Path::new("postings.bin");
        for (ranges, file_len) in [
            (vec![(0, 4), (5, 5)], 10),
            (vec![(0, 6), (4, 6)], 10),
            (vec![(0, 4), (4, 4)], 10),
            (vec![(0, 4), (4, 8)], 10),
        ] {
            assert!(
                matches!(
                    check_layout(path, "postings", ranges.clone(), file_len),
                    Err(Error::IndexCorrupt { .. })
                ),
                "{ranges:?} over {file_len} bytes"
            );
        }
    }
}
