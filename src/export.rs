use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use tracing::info;

use crate::error::Result;
use crate::models::domain::PacketRecord;
use crate::models::dto::PacketRecordDTO;

pub const JSON_EXPORT: &str = "extracted_data.json";
pub const CSV_EXPORT: &str = "trafic.csv";

/// Columns A..H owned by the export; anything to their right belongs to the user.
pub const EXPORT_COLUMNS: usize = 8;

pub fn write_json(records: &[PacketRecord], path: &Path) -> Result<()> {
    let dtos: Vec<PacketRecordDTO> = records.iter().map(PacketRecordDTO::from).collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &dtos)?;
    info!(path = %path.display(), records = dtos.len(), "json export written");
    Ok(())
}

fn export_row(record: &PacketRecord) -> [String; EXPORT_COLUMNS] {
    let dto = PacketRecordDTO::from(record);
    [
        dto.timestamp,
        dto.source_ip,
        dto.source_port.map(|p| p.to_string()).unwrap_or_default(),
        dto.destination_ip,
        dto.destination_port.map(|p| p.to_string()).unwrap_or_default(),
        dto.protocol.to_string(),
        dto.size.to_string(),
        // flags: not extracted
        String::new(),
    ]
}

fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reader = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(file);
    let mut rows = Vec::new();
    for record in reader.records() {
        let record: StringRecord = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Merges records into columns A..H of an existing CSV sheet.
///
/// Row 0 of an existing sheet is kept as-is. Data row `i` gets record `i - 1`,
/// or blanks once records run out; columns past H are left untouched. A new or
/// empty sheet gets one row per record with no header.
pub fn merge_rows(existing: Vec<Vec<String>>, records: &[PacketRecord]) -> Vec<Vec<String>> {
    let mut existing = existing.into_iter();
    let mut merged = Vec::new();
    if let Some(header) = existing.next() {
        merged.push(header);
    }

    let mut records = records.iter();
    loop {
        let (current, record) = (existing.next(), records.next());
        if current.is_none() && record.is_none() {
            break;
        }

        let mut row = current.unwrap_or_default();
        if row.len() < EXPORT_COLUMNS {
            row.resize(EXPORT_COLUMNS, String::new());
        }
        match record {
            Some(record) => {
                for (cell, value) in row.iter_mut().zip(export_row(record)) {
                    *cell = value;
                }
            }
            None => row[..EXPORT_COLUMNS].iter_mut().for_each(String::clear),
        }
        merged.push(row);
    }
    merged
}

pub fn merge_csv(records: &[PacketRecord], path: &Path) -> Result<()> {
    let rows = merge_rows(read_rows(path)?, records);

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = WriterBuilder::new().flexible(true).from_path(&tmp)?;
        for row in &rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    info!(path = %path.display(), rows = rows.len(), "csv export updated");
    Ok(())
}
