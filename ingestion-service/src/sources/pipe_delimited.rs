use std::io::{self, BufRead, Lines};

use meter_client::domain::REQUIRED_HEADERS;

use crate::pipeline::IngestionError;

const BOM: char = '\u{feff}';

/// Reject uploads that are empty or are not `.txt` files before touching
/// their contents.
pub fn check_upload(file_name: &str, len: usize) -> Result<(), IngestionError> {
    if len == 0 {
        return Err(IngestionError::NoFile);
    }
    if !file_name.ends_with(".txt") {
        return Err(IngestionError::InvalidFileType);
    }
    Ok(())
}

/// Data lines of a pipe-delimited registry upload.
///
/// Construction reads up to and including the header and fails if it does
/// not match [`REQUIRED_HEADERS`]; nothing is yielded from a file with a bad
/// header. After that, lines are read lazily as the iterator is driven, blank
/// lines are skipped, and the first read error ends the sequence.
pub struct PipeDelimitedLines<R> {
    lines: Lines<R>,
    done: bool,
}

impl<R: BufRead> PipeDelimitedLines<R> {
    pub fn open(reader: R) -> Result<Self, IngestionError> {
        let mut lines = reader.lines();

        let header = loop {
            let Some(line) = lines.next() else {
                return Err(IngestionError::EmptyFile);
            };
            let line = line?;
            let line = line.trim_start_matches(BOM);
            if !line.trim().is_empty() {
                break line.to_string();
            }
        };

        check_header(&header)?;
        tracing::debug!("upload header accepted");

        Ok(Self { lines, done: false })
    }
}

fn check_header(line: &str) -> Result<(), IngestionError> {
    let tokens = line.split('|').map(str::trim);
    if tokens.eq(REQUIRED_HEADERS) {
        Ok(())
    } else {
        tracing::debug!(header = line, "upload header mismatch");
        Err(IngestionError::HeaderMismatch)
    }
}

impl<R: BufRead> Iterator for PipeDelimitedLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            match self.lines.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Ok(line)) if line.trim().is_empty() => continue,
                Some(Ok(line)) => return Some(Ok(line)),
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const HEADER: &str = "MPAN|MeterSerial|DateOfInstallation|AddressLine1|PostCode";

    fn open(text: &str) -> Result<PipeDelimitedLines<Cursor<Vec<u8>>>, IngestionError> {
        PipeDelimitedLines::open(Cursor::new(text.as_bytes().to_vec()))
    }

    fn collect(text: &str) -> Vec<String> {
        open(text)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn yields_data_lines_after_header_skipping_blanks() {
        let text = format!("{HEADER}\n\n1|a\n   \n2|b\r\n\n");
        assert_eq!(collect(&text), vec!["1|a".to_string(), "2|b".to_string()]);
    }

    #[test]
    fn header_may_be_preceded_by_blank_lines_and_padded() {
        let text = "\n  \n MPAN | MeterSerial|DateOfInstallation |AddressLine1|PostCode \n1|a\n";
        assert_eq!(collect(text), vec!["1|a".to_string()]);
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let text = format!("\u{feff}{HEADER}\n1|a\n");
        assert_eq!(collect(&text), vec!["1|a".to_string()]);
    }

    #[test]
    fn header_only_file_yields_nothing() {
        assert!(collect(HEADER).is_empty());
    }

    #[test]
    fn empty_or_blank_file_is_rejected() {
        assert!(matches!(open(""), Err(IngestionError::EmptyFile)));
        assert!(matches!(open("\n  \n\t\n"), Err(IngestionError::EmptyFile)));
    }

    #[test]
    fn header_mismatches_are_rejected() {
        let wrong_order = "MeterSerial|MPAN|DateOfInstallation|AddressLine1|PostCode\n1|a";
        let missing = "MPAN|MeterSerial|DateOfInstallation|AddressLine1\n1|a";
        let extra = "MPAN|MeterSerial|DateOfInstallation|AddressLine1|PostCode|Notes\n1|a";
        let wrong_case = "mpan|MeterSerial|DateOfInstallation|AddressLine1|PostCode\n1|a";

        for text in [wrong_order, missing, extra, wrong_case] {
            assert!(
                matches!(open(text), Err(IngestionError::HeaderMismatch)),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn lines_are_read_lazily() {
        let text = format!("{HEADER}\n1|a\n2|b\n3|c\n");
        let mut lines = open(&text).unwrap();
        assert_eq!(lines.next().unwrap().unwrap(), "1|a");
        assert_eq!(lines.next().unwrap().unwrap(), "2|b");
        assert_eq!(lines.next().unwrap().unwrap(), "3|c");
        assert!(lines.next().is_none());
        assert!(lines.next().is_none());
    }

    #[test]
    fn invalid_utf8_ends_the_sequence_with_an_error() {
        let mut bytes = format!("{HEADER}\n1|a\n").into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"2|b\n");

        let mut lines = PipeDelimitedLines::open(Cursor::new(bytes)).unwrap();
        assert_eq!(lines.next().unwrap().unwrap(), "1|a");
        assert!(lines.next().unwrap().is_err());
        assert!(lines.next().is_none());
    }

    #[test]
    fn upload_checks_reject_empty_and_non_text_files() {
        assert!(matches!(check_upload("meters.txt", 0), Err(IngestionError::NoFile)));
        assert!(matches!(
            check_upload("meters.csv", 10),
            Err(IngestionError::InvalidFileType)
        ));
        assert!(check_upload("meters.txt", 10).is_ok());
    }
}
