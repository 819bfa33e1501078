//! Line-oriented `ItemSource` implementations
//!
//! Records are newline-delimited. A line starting with [`DATASET_SIZE_MARKER`]
//! carries the expected dataset size (`dataset-size:<items>,<values>`) and is
//! consumed by the source instead of being returned as a record.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Stdin};
use std::path::Path;

use contracts::{ContractError, DatasetSize, ItemSource};
use tracing::{debug, instrument};

/// Prefix of the in-band dataset size line
pub const DATASET_SIZE_MARKER: &str = "dataset-size:";

const READ_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Newline-delimited record reader over any `BufRead`
pub struct LineSource<R> {
    name: String,
    reader: R,
    line: Vec<u8>,
    dataset_size: Option<DatasetSize>,
}

impl LineSource<BufReader<Stdin>> {
    /// Read records from standard input
    pub fn stdin() -> Self {
        Self::new("stdin", BufReader::with_capacity(READ_BUFFER_SIZE, io::stdin()))
    }
}

impl LineSource<BufReader<File>> {
    /// Read records from a file
    #[instrument(name = "line_source_open", skip(path), fields(path = %path.display()))]
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        debug!("opened input file");
        Ok(Self::new(
            path.display().to_string(),
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
        ))
    }
}

impl<R: BufRead + Send> LineSource<R> {
    pub fn new(name: impl Into<String>, reader: R) -> Self {
        Self {
            name: name.into(),
            reader,
            line: Vec::with_capacity(4096),
            dataset_size: None,
        }
    }
}

impl<R: BufRead + Send> ItemSource for LineSource<R> {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_record(&mut self) -> Result<Option<&[u8]>, ContractError> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }

            let end = trimmed_len(&self.line);
            if self.line[..end].starts_with(DATASET_SIZE_MARKER.as_bytes()) {
                let size = parse_dataset_size(&self.line[..end])
                    .map_err(|message| ContractError::input_format(&self.name, message))?;
                debug!(source = %self.name, items = size.items, values = size.values, "dataset size announced");
                self.dataset_size = Some(size);
                continue;
            }

            return Ok(Some(&self.line[..end]));
        }
    }

    fn dataset_size(&self) -> Option<DatasetSize> {
        self.dataset_size
    }
}

/// Length of `line` without its trailing "\n" or "\r\n"
fn trimmed_len(line: &[u8]) -> usize {
    let mut end = line.len();
    if end > 0 && line[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && line[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}

/// Parse a `dataset-size:<items>,<values>` line
pub fn parse_dataset_size(line: &[u8]) -> Result<DatasetSize, String> {
    let text = std::str::from_utf8(line)
        .map_err(|e| format!("dataset size marker is not utf-8: {e}"))?;
    let body = text
        .strip_prefix(DATASET_SIZE_MARKER)
        .ok_or_else(|| format!("missing '{DATASET_SIZE_MARKER}' prefix"))?;

    let (items, values) = body
        .split_once(',')
        .ok_or_else(|| format!("malformed dataset size marker: {text:?}"))?;

    let items = items
        .trim()
        .parse()
        .map_err(|e| format!("invalid item total in {text:?}: {e}"))?;
    let values = values
        .trim()
        .parse()
        .map_err(|e| format!("invalid value total in {text:?}: {e}"))?;

    Ok(DatasetSize { items, values })
}
