//! Very thin Fasta reader. Only support batch IO.
use std::io::{BufRead, BufReader};
pub type FASTARecord = (String, Vec<u8>);

/// Read file or stdin, return parsed fasta records.
pub fn read_fasta<P: AsRef<std::path::Path>>(
    file: &Option<P>,
) -> std::io::Result<Vec<FASTARecord>> {
    let stdin = std::io::stdin();
    let mut reader: Box<dyn BufRead> = match file {
        Some(file) => std::fs::File::open(file)
            .map(BufReader::new)
            .map(Box::new)?,
        None => {
            let lock = stdin.lock();
            Box::new(BufReader::new(lock))
        }
    };
    let mut contents = vec![];
    reader.read_to_end(&mut contents)?;
    Ok(parse_fasta(&contents))
}

/// Parse records. Anything before the first '>' is ignored,
/// and a record without a name line is dropped.
pub fn parse_fasta(contents: &[u8]) -> Vec<FASTARecord> {
    contents
        .split(|&x| x == b'>')
        .skip(1)
        .filter_map(|record| {
            let mut record = record.splitn(2, |&x| x == b'\n');
            let header = record.next()?;
            let id = header
                .split(|x| x.is_ascii_whitespace())
                .find(|x| !x.is_empty())?;
            let seq: Vec<_> = record
                .next()
                .unwrap_or(&[])
                .iter()
                .filter(|x| !x.is_ascii_whitespace())
                .copied()
                .collect();
            Some((String::from_utf8_lossy(id).to_string(), seq))
        })
        .collect()
}
