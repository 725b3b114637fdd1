//! Command handlers for the embedload CLI

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, ContentArrangement, Row, Table, presets::UTF8_FULL};
use humansize::{DECIMAL, format_size};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;

use embedload::{
    DecoderOptions, FetchOptions, ImportRequest, ImportWorker, IngestConfig, MemoryRecordStore,
    NormalizedRecord, NpyDecoder, TensorDescriptor, WorkerMessage, acquire,
};

use crate::utils::{create_bytes_bar, create_fraction_bar, format_shape, fraction_position, is_url};

// ============================================================================
// Tensor inspection
// ============================================================================

/// Reads `source` from disk or over HTTP, showing a byte bar for downloads.
async fn read_source(source: &str) -> Result<Vec<u8>> {
    if !is_url(source) {
        return std::fs::read(source).with_context(|| format!("Failed to read '{}'", source));
    }

    let pb = create_bytes_bar()?;
    let bar = pb.clone();
    let options = FetchOptions::new().with_progress(move |received, total| {
        if total > 0 && bar.length() != Some(total) {
            bar.set_length(total);
        }
        bar.set_position(received);
    });
    let bytes = acquire(source, options)
        .await
        .with_context(|| format!("Failed to fetch '{}'", source))?;
    pb.finish_and_clear();
    Ok(bytes)
}

/// Loads and decodes a `.npy` source. Also returns the size of the raw file.
pub async fn load_tensor(source: &str, options: DecoderOptions) -> Result<(TensorDescriptor, usize)> {
    let bytes = read_source(source).await?;
    let tensor = NpyDecoder::new(options)
        .decode(&bytes)
        .with_context(|| format!("Failed to decode '{}'", source))?;
    Ok((tensor, bytes.len()))
}

/// Print a summary table for a decoded tensor
pub fn print_tensor_summary(source: &str, tensor: &TensorDescriptor, file_bytes: usize) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(Row::from(vec![Cell::new("Source"), Cell::new(source)]));
    table.add_row(Row::from(vec![
        Cell::new("DType"),
        Cell::new(tensor.dtype.name()),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("Decoded as"),
        Cell::new(tensor.data.kind()),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("Shape"),
        Cell::new(format_shape(&tensor.shape)),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("Memory order"),
        Cell::new(format!("{:?}", tensor.memory_order)),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("Elements"),
        Cell::new(tensor.data.len()),
    ]));

    let payload = tensor.data.len() * tensor.dtype.byte_size();
    table.add_row(Row::from(vec![
        Cell::new("Payload size"),
        Cell::new(format_size(payload, DECIMAL)),
    ]));
    table.add_row(Row::from(vec![
        Cell::new("File size"),
        Cell::new(format_size(file_bytes, DECIMAL)),
    ]));
    if !tensor.shape_matches_data() {
        table.add_row(Row::from(vec![
            Cell::new("Warning"),
            Cell::new(format!(
                "shape declares {} elements, payload holds {}",
                tensor.num_elements(),
                tensor.data.len()
            )),
        ]));
    }

    println!("{}", table);
}

/// First `count` values, rendered the way `serde_json` prints them.
pub fn preview_values(tensor: &TensorDescriptor, count: usize) -> Vec<String> {
    match serde_json::to_value(&tensor.data) {
        Ok(serde_json::Value::Object(map)) => match map.get("values") {
            Some(serde_json::Value::Array(values)) => {
                values.iter().take(count).map(|v| v.to_string()).collect()
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

pub fn print_values_preview(tensor: &TensorDescriptor, count: usize) {
    let values = preview_values(tensor, count);
    let more = if tensor.data.len() > values.len() { ", ..." } else { "" };
    println!("Values: [{}{}]", values.join(", "), more);
}

// ============================================================================
// Record import
// ============================================================================

/// Runs one import on a background worker, drawing a bar from its messages.
///
/// Returns the store and the number of records processed.
pub async fn import_records(url: &str, progress_interval: u64) -> Result<(Arc<MemoryRecordStore>, u64)> {
    if !is_url(url) {
        bail!("Import source must be an http(s) URL, got '{}'", url);
    }

    let store = Arc::new(MemoryRecordStore::new());
    let config = IngestConfig {
        progress_interval,
        ..IngestConfig::default()
    };
    let mut worker = ImportWorker::spawn(Arc::clone(&store), config);
    worker.send(ImportRequest::new(url));

    let pb = create_fraction_bar()?;
    let processed = loop {
        let Some(message) = worker.recv().await else {
            pb.abandon();
            bail!("Import worker stopped before finishing '{}'", url);
        };
        match message {
            WorkerMessage::Failure(failure) => {
                pb.abandon_with_message("failed");
                bail!("Import of '{}' failed: {}", url, failure.error);
            }
            WorkerMessage::Progress(progress) => {
                pb.set_position(fraction_position(progress.progress));
                pb.set_message(format!("{} records", progress.processed_items));
                if progress.completed {
                    pb.finish_with_message(format!("{} records", progress.processed_items));
                    break progress.processed_items;
                }
            }
        }
    };
    worker.terminate();

    Ok((store, processed))
}

/// Print the first `limit` records
pub fn print_records_table(records: &[NormalizedRecord], limit: usize) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "ID", "Title", "Label", "Rating", "Chapters", "Tags"]);
    for (i, record) in records.iter().take(limit).enumerate() {
        table.add_row(Row::from(vec![
            Cell::new(i),
            Cell::new(&record.fiction_id),
            Cell::new(&record.title),
            Cell::new(&record.label),
            Cell::new(format!("{:.2}", record.rating)),
            Cell::new(record.chapters),
            Cell::new(record.tags.join(", ")),
        ]));
    }
    println!("{}", table);
    if records.len() > limit {
        println!("... and {} more", records.len() - limit);
    }
}

/// Writes `records` to `output` as a pretty-printed JSON array.
pub fn write_records(records: &[NormalizedRecord], output: &str) -> Result<()> {
    if Path::new(output).exists() {
        bail!(
            "Output file '{}' already exists. Please remove it or choose a different name.",
            output
        );
    }
    let file = File::create(output).with_context(|| format!("Failed to create '{}'", output))?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)
        .with_context(|| format!("Failed to write records to '{}'", output))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedload::{DType, MemoryOrder, TensorData, encode};
    use tempfile::tempdir;

    fn sample_tensor() -> TensorDescriptor {
        TensorDescriptor {
            dtype: DType::Float32,
            shape: vec![2, 3],
            memory_order: MemoryOrder::RowMajor,
            data: TensorData::F32(vec![0.5, 1.0, 1.5, 2.0, 2.5, 3.0]),
        }
    }

    fn sample_record(id: &str) -> NormalizedRecord {
        embedload::record::parse_line(&format!(
            r#"{{"fictionId": "{}", "title": "Tale {}", "url": "https://example.test/{}"}}"#,
            id, id, id
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_load_tensor_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.npy");
        let bytes = encode(&sample_tensor()).unwrap();
        std::fs::write(&path, &bytes).unwrap();

        let (tensor, file_bytes) = load_tensor(path.to_str().unwrap(), DecoderOptions::default())
            .await
            .unwrap();
        assert_eq!(tensor, sample_tensor());
        assert_eq!(file_bytes, bytes.len());
    }

    #[tokio::test]
    async fn test_load_tensor_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.npy");
        let result = load_tensor(path.to_str().unwrap(), DecoderOptions::default()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_load_tensor_not_npy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("garbage.npy");
        std::fs::write(&path, b"not a tensor").unwrap();
        let result = load_tensor(path.to_str().unwrap(), DecoderOptions::default()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_preview_values() {
        let tensor = sample_tensor();
        assert_eq!(preview_values(&tensor, 2), vec!["0.5", "1.0"]);
        assert_eq!(preview_values(&tensor, 100).len(), 6);
    }

    #[tokio::test]
    async fn test_import_rejects_local_path() {
        assert!(import_records("records.jsonl", 100).await.is_err());
    }

    #[test]
    fn test_write_records_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        let output = path.to_str().unwrap();
        let records = vec![sample_record("1"), sample_record("2")];

        write_records(&records, output).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<NormalizedRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_write_records_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, b"[]").unwrap();
        assert!(write_records(&[sample_record("1")], path.to_str().unwrap()).is_err());
    }
}
