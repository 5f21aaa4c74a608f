//src/fastx.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::SeqQcError;
use crate::types::SequenceRecord;

/// A forward-only, single-pass supply of records.
///
/// End of input is `has_next() == false`; calling `next_record` after that
/// fails with `SeqQcError::NoMoreRecords`. The underlying stream is released
/// when the source is dropped.
pub trait RecordSource {
    fn has_next(&self) -> bool;
    fn next_record(&mut self) -> Result<SequenceRecord, SeqQcError>;
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn has_next(&self) -> bool {
        (**self).has_next()
    }

    fn next_record(&mut self) -> Result<SequenceRecord, SeqQcError> {
        (**self).next_record()
    }
}

/// Line-level parsing of one record format. `Ok(None)` means clean EOF at a
/// record boundary.
pub trait RecordParser {
    fn parse_next(&mut self) -> Result<Option<SequenceRecord>, SeqQcError>;
}

/// Wraps a parser and keeps one record (or the error that stopped parsing)
/// buffered ahead of the consumer.
pub struct PrefetchReader<P: RecordParser> {
    parser: P,
    lookahead: Option<Result<SequenceRecord, SeqQcError>>,
    finished: bool,
    records_read: u64,
}

pub type FastaReader<R> = PrefetchReader<FastaParser<R>>;
pub type FastqReader<R> = PrefetchReader<FastqParser<R>>;

impl<P: RecordParser> PrefetchReader<P> {
    fn with_parser(parser: P) -> Self {
        let mut reader = Self {
            parser,
            lookahead: None,
            finished: false,
            records_read: 0,
        };
        reader.prefetch();
        reader
    }

    fn prefetch(&mut self) {
        if self.finished {
            return;
        }
        match self.parser.parse_next() {
            Ok(Some(record)) => self.lookahead = Some(Ok(record)),
            Ok(None) => self.finished = true,
            Err(e) => {
                // Nothing after a broken record is trustworthy
                self.finished = true;
                self.lookahead = Some(Err(e));
            }
        }
    }

    /// Records handed out so far.
    pub fn records_read(&self) -> u64 {
        self.records_read
    }
}

impl<P: RecordParser> RecordSource for PrefetchReader<P> {
    fn has_next(&self) -> bool {
        self.lookahead.is_some()
    }

    fn next_record(&mut self) -> Result<SequenceRecord, SeqQcError> {
        let next = self.lookahead.take().ok_or(SeqQcError::NoMoreRecords)?;
        if next.is_ok() {
            self.records_read += 1;
            self.prefetch();
        }
        next
    }
}

impl<P: RecordParser> Iterator for PrefetchReader<P> {
    type Item = Result<SequenceRecord, SeqQcError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_next() {
            Some(self.next_record())
        } else {
            None
        }
    }
}

impl<P: RecordParser> Drop for PrefetchReader<P> {
    fn drop(&mut self) {
        log::debug!("Closing record source after {} record(s)", self.records_read);
    }
}

// ---------------------------------------------------------------------------
//  FASTA
// ---------------------------------------------------------------------------

/// `>`-delimited records; body lines are trimmed and concatenated.
///
/// Lines are read as raw bytes: residues are never required to be UTF-8, and
/// headers are decoded lossily.
pub struct FastaParser<R> {
    reader: R,
    line: Vec<u8>,
    pending_id: Option<String>,
    seq_buf: Vec<u8>,
}

impl<R: BufRead> FastaReader<R> {
    pub fn new(reader: R) -> Self {
        PrefetchReader::with_parser(FastaParser {
            reader,
            line: Vec::new(),
            pending_id: None,
            seq_buf: Vec::new(),
        })
    }
}

impl<R: BufRead> RecordParser for FastaParser<R> {
    fn parse_next(&mut self) -> Result<Option<SequenceRecord>, SeqQcError> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                // EOF: flush whatever record is still open
                return Ok(self.pending_id.take().map(|id| SequenceRecord {
                    id,
                    seq: std::mem::take(&mut self.seq_buf),
                }));
            }

            let line = self.line.trim_ascii();
            if let Some(header) = line.strip_prefix(b">") {
                let id = header_id(header);
                match self.pending_id.replace(id) {
                    Some(prev) => {
                        let seq = std::mem::take(&mut self.seq_buf);
                        return Ok(Some(SequenceRecord { id: prev, seq }));
                    }
                    None => self.seq_buf.clear(),
                }
            } else if self.pending_id.is_some() {
                self.seq_buf.extend_from_slice(line);
            }
            // Lines before the first header are ignored
        }
    }
}

fn header_id(header: &[u8]) -> String {
    String::from_utf8_lossy(header.trim_ascii()).into_owned()
}

// ---------------------------------------------------------------------------
//  FASTQ
// ---------------------------------------------------------------------------

/// `@`-delimited 4-line records. The quality line is read and discarded.
pub struct FastqParser<R> {
    reader: R,
    line: Vec<u8>,
    line_no: u64,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        PrefetchReader::with_parser(FastqParser {
            reader,
            line: Vec::new(),
            line_no: 0,
        })
    }
}

impl<R: BufRead> FastqParser<R> {
    fn read_line(&mut self) -> Result<Option<&[u8]>, SeqQcError> {
        self.line.clear();
        if self.reader.read_until(b'\n', &mut self.line)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        Ok(Some(self.line.trim_ascii()))
    }

    fn expect_line(&mut self, id: &str, what: &str) -> Result<Vec<u8>, SeqQcError> {
        let missing_line = self.line_no + 1;
        self.read_line()?.map(<[u8]>::to_vec).ok_or_else(|| {
            SeqQcError::malformed(
                missing_line,
                format!("record '{id}' ends before its {what} line"),
            )
        })
    }
}

impl<R: BufRead> RecordParser for FastqParser<R> {
    fn parse_next(&mut self) -> Result<Option<SequenceRecord>, SeqQcError> {
        // 1) header; anything that is not a header is skipped
        let id = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) => {
                    if let Some(header) = line.strip_prefix(b"@") {
                        break header_id(header);
                    }
                }
            }
        };

        // 2) sequence, 3) separator, 4) quality
        let seq = self.expect_line(&id, "sequence")?;
        self.expect_line(&id, "separator")?;
        self.expect_line(&id, "quality")?;

        Ok(Some(SequenceRecord { id, seq }))
    }
}

// ---------------------------------------------------------------------------
//  Format detection and opening
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceFormat {
    Fasta,
    Fastq,
}

/// What the file name says about its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    pub format: SequenceFormat,
    pub gzipped: bool,
}

/// Infer the format from the extension (`.fa/.fasta/.fna/.fas`, `.fq/.fastq`,
/// optionally followed by `.gz`). Does not touch the file.
pub fn detect_format<P: AsRef<Path>>(path: P) -> Result<InputFormat, SeqQcError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let (stem, gzipped) = match name.strip_suffix(".gz") {
        Some(stem) => (stem, true),
        None => (name.as_str(), false),
    };

    let format = match stem.rsplit_once('.').map(|(_, ext)| ext) {
        Some("fa" | "fasta" | "fna" | "fas") => SequenceFormat::Fasta,
        Some("fq" | "fastq") => SequenceFormat::Fastq,
        _ => return Err(SeqQcError::UnsupportedFormat(path.display().to_string())),
    };

    Ok(InputFormat { format, gzipped })
}

/// Open `path` for buffered reading; ".gz" files go through a `MultiGzDecoder`.
pub fn open_reader<P: AsRef<Path>>(
    path: P,
    gzipped: bool,
) -> std::io::Result<Box<dyn BufRead + Send>> {
    let f = File::open(path)?;
    let reader: Box<dyn BufRead + Send> = if gzipped {
        Box::new(BufReader::with_capacity(1 << 16, MultiGzDecoder::new(f)))
    } else {
        Box::new(BufReader::with_capacity(1 << 16, f))
    };
    Ok(reader)
}

/// Detect the format of `path` and open the matching record source.
pub fn open_record_source<P: AsRef<Path>>(
    path: P,
) -> Result<Box<dyn RecordSource + Send>, SeqQcError> {
    let path = path.as_ref();
    let input = detect_format(path)?;
    log::info!(
        "Opening {} as {:?}{}",
        path.display(),
        input.format,
        if input.gzipped { " (gzip)" } else { "" }
    );

    let reader = open_reader(path, input.gzipped)?;
    Ok(match input.format {
        SequenceFormat::Fasta => Box::new(FastaReader::new(reader)),
        SequenceFormat::Fastq => Box::new(FastqReader::new(reader)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Cursor, Write};

    fn collect<S: RecordSource>(mut source: S) -> Vec<SequenceRecord> {
        let mut out = Vec::new();
        while source.has_next() {
            out.push(source.next_record().expect("record"));
        }
        out
    }

    #[test]
    fn test_fasta_multiline_and_trimming() {
        let data = "junk before header\n>s1 first  \n  ACGT \nacgt\n\n>s2\nNNNN\r\n>empty\n";
        let records = collect(FastaReader::new(Cursor::new(data)));
        assert_eq!(
            records,
            vec![
                SequenceRecord::new("s1 first", "ACGTacgt"),
                SequenceRecord::new("s2", "NNNN"),
                SequenceRecord::new("empty", ""),
            ]
        );
    }

    #[test]
    fn test_fasta_empty_input() {
        let mut reader = FastaReader::new(Cursor::new(""));
        assert!(!reader.has_next());
        assert!(matches!(reader.next_record(), Err(SeqQcError::NoMoreRecords)));
    }

    #[test]
    fn test_next_after_exhaustion_fails() {
        let mut reader = FastaReader::new(Cursor::new(">a\nAC\n"));
        assert!(reader.has_next());
        assert_eq!(reader.next_record().unwrap().seq, b"AC");
        assert!(!reader.has_next());
        assert!(matches!(reader.next_record(), Err(SeqQcError::NoMoreRecords)));
        assert_eq!(reader.records_read(), 1);
    }

    #[test]
    fn test_fastq_records() {
        let data = "@r1 desc\nACGT\n+\nIIII\n\n@r2\nGGNN\n+r2\n!!!!\n";
        let records: Vec<_> = FastqReader::new(Cursor::new(data))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            records,
            vec![
                SequenceRecord::new("r1 desc", "ACGT"),
                SequenceRecord::new("r2", "GGNN"),
            ]
        );
    }

    #[test]
    fn test_fastq_missing_sequence_is_malformed() {
        let mut reader = FastqReader::new(Cursor::new("@r1\nACGT\n+\nIIII\n@r2\n"));
        assert_eq!(reader.next_record().unwrap().id, "r1");
        assert!(reader.has_next());
        match reader.next_record() {
            Err(SeqQcError::MalformedInput { line, .. }) => assert_eq!(line, 6),
            other => panic!("expected MalformedInput, got {other:?}"),
        }
        assert!(!reader.has_next());
    }

    #[test]
    fn test_non_utf8_bytes_are_residues() {
        let data = &b">s1 caf\xe9\nAC\xe9GT\n>s2\nACGT\n"[..];
        let records = collect(FastaReader::new(Cursor::new(data)));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "s1 caf\u{FFFD}");
        assert_eq!(records[0].seq, b"AC\xe9GT");
        assert_eq!(records[1].seq, b"ACGT");

        let fq = &b"@r\xff1\nAC\xffT\n+\nIIII\n"[..];
        let records = collect(FastqReader::new(Cursor::new(fq)));
        assert_eq!(records, vec![SequenceRecord::new("r\u{FFFD}1", &b"AC\xffT"[..])]);
    }

    #[test]
    fn test_fastq_missing_quality_is_malformed() {
        let mut reader = FastqReader::new(Cursor::new("@r1\nACGT\n+\n"));
        assert!(matches!(
            reader.next_record(),
            Err(SeqQcError::MalformedInput { line: 4, .. })
        ));
    }

    #[test]
    fn test_detect_format() {
        let fa = detect_format("genome.FASTA").unwrap();
        assert_eq!(fa.format, SequenceFormat::Fasta);
        assert!(!fa.gzipped);

        let fq = detect_format("/data/reads.fq.gz").unwrap();
        assert_eq!(fq.format, SequenceFormat::Fastq);
        assert!(fq.gzipped);

        assert_eq!(detect_format("x.fna").unwrap().format, SequenceFormat::Fasta);
        assert!(matches!(
            detect_format("reads.bam"),
            Err(SeqQcError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format("reads.gz"),
            Err(SeqQcError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            detect_format("fasta"),
            Err(SeqQcError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_unsupported_format_does_not_open_file() {
        // The file does not exist; detection must fail first.
        assert!(matches!(
            open_record_source("/nonexistent/reads.txt"),
            Err(SeqQcError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            open_record_source("/nonexistent/reads.fa"),
            Err(SeqQcError::Io(_))
        ));
    }

    #[test]
    fn test_open_gzipped_fastq() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fastq.gz");
        let mut enc = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        enc.write_all(b"@r1\nACGTN\n+\nIIIII\n").unwrap();
        enc.finish().unwrap();

        let records = collect(open_record_source(&path).unwrap());
        assert_eq!(records, vec![SequenceRecord::new("r1", "ACGTN")]);
    }
}
