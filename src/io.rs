//! Reading and writing elements as JSON Lines.
//!
//! One element per line, in the tagged JSON shape of [`Element`]. Blank
//! lines are skipped so files survive manual editing.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::elements::Element;

/// Read elements from a JSON Lines stream.
pub fn read_elements<R: BufRead>(reader: R) -> Result<Vec<Element>> {
    let mut elements = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", index + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let element: Element = serde_json::from_str(&line)
            .with_context(|| format!("malformed element on line {}", index + 1))?;
        elements.push(element);
    }
    Ok(elements)
}

/// Read elements from a JSON Lines file.
pub fn read_elements_jsonl(path: &Path) -> Result<Vec<Element>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    read_elements(BufReader::new(file))
        .with_context(|| format!("failed to read elements from {}", path.display()))
}

/// Write elements as JSON Lines.
pub fn write_elements<'a, W, I>(mut writer: W, elements: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Element>,
{
    for element in elements {
        serde_json::to_writer(&mut writer, element).context("failed to serialize element")?;
        writer.write_all(b"\n").context("failed to write element")?;
    }
    writer.flush().context("failed to flush output")?;
    Ok(())
}

/// Write elements to a JSON Lines file.
pub fn write_elements_jsonl(path: &Path, elements: &[Element]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_elements(BufWriter::new(file), elements)
        .with_context(|| format!("failed to write elements to {}", path.display()))
}
