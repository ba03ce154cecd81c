pub mod decoder;
pub mod dom;
pub mod extractor;
pub mod report;

use std::fs;
use std::path::Path;

use anyhow::Context;

pub use crate::decoder::{
    classify_as_base64, decode_base64, extract_payload, DecodedPayload, PayloadKind,
};
pub use crate::dom::XmlNode;
pub use crate::extractor::{extract_items, ResultItem};
pub use crate::report::{build_entries, render, PayloadBlock, ReportEntry};

/// Runs the whole conversion: the attack XML at `input_path` becomes a
/// self-contained HTML report at `output_path`, overwriting any existing
/// file there. Returns the number of report entries written.
///
/// Input bytes are decoded permissively, so malformed sequences degrade
/// into replacement characters instead of failing the run. Unreadable input
/// and malformed XML are fatal; payload-level oddities are not.
pub fn run(input_path: impl AsRef<Path>, output_path: impl AsRef<Path>) -> anyhow::Result<usize> {
    let input_path = input_path.as_ref();
    let output_path = output_path.as_ref();

    let raw = fs::read(input_path)
        .with_context(|| format!("failed to read '{}'", input_path.display()))?;
    let text = String::from_utf8_lossy(&raw);

    let document = dom::parse(&text)
        .with_context(|| format!("failed to parse '{}' as XML", input_path.display()))?;

    let items = extractor::extract_items(&document);
    let entries = report::build_entries(&items);
    let html = report::render(&entries);

    fs::write(output_path, html)
        .with_context(|| format!("failed to write '{}'", output_path.display()))?;

    Ok(entries.len())
}
