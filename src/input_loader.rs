use std::fmt;
use std::fs::File;
use std::path::Path;
use log::{info, error};
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;

pub const DEFAULT_DELIMITER: u8 = b';';

/// One input row: a tool and its five links. Identity is the row position.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct ToolRecord {
    #[serde(rename = "Tool Name", alias = "tool name", alias = "App name", default)]
    pub name: String,
    #[serde(rename = "Homepage", alias = "homepage", default)]
    pub homepage: String,
    #[serde(rename = "Privacy/Legal Link", alias = "privacy", default)]
    pub privacy: String,
    #[serde(rename = "DSGVO/GDPR Link", alias = "gdpr", default)]
    pub gdpr: String,
    #[serde(rename = "Storage/Hosting Link", alias = "storage", default)]
    pub storage: String,
    #[serde(rename = "DPA/AVV Link", alias = "dpa", default)]
    pub dpa: String,
}

/// The link columns of a [`ToolRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkField {
    Homepage,
    Privacy,
    Gdpr,
    Storage,
    Dpa,
}

impl LinkField {
    pub const ALL: [LinkField; 5] = [
        LinkField::Homepage,
        LinkField::Privacy,
        LinkField::Gdpr,
        LinkField::Storage,
        LinkField::Dpa,
    ];

    /// Fields that may be replaced from the homepage's links.
    pub const REPLACEABLE: [LinkField; 4] = [
        LinkField::Privacy,
        LinkField::Gdpr,
        LinkField::Storage,
        LinkField::Dpa,
    ];

    /// Column header as it appears in the input file.
    pub fn column(self) -> &'static str {
        match self {
            LinkField::Homepage => "Homepage",
            LinkField::Privacy => "Privacy/Legal Link",
            LinkField::Gdpr => "DSGVO/GDPR Link",
            LinkField::Storage => "Storage/Hosting Link",
            LinkField::Dpa => "DPA/AVV Link",
        }
    }
}

impl fmt::Display for LinkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl ToolRecord {
    pub fn link(&self, field: LinkField) -> &str {
        match field {
            LinkField::Homepage => &self.homepage,
            LinkField::Privacy => &self.privacy,
            LinkField::Gdpr => &self.gdpr,
            LinkField::Storage => &self.storage,
            LinkField::Dpa => &self.dpa,
        }
    }

    pub fn set_link(&mut self, field: LinkField, url: String) {
        match field {
            LinkField::Homepage => self.homepage = url,
            LinkField::Privacy => self.privacy = url,
            LinkField::Gdpr => self.gdpr = url,
            LinkField::Storage => self.storage = url,
            LinkField::Dpa => self.dpa = url,
        }
    }

    /// Label used in logs; falls back to the row position when the name is blank.
    pub fn display_name(&self, line_number: usize) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("Tool #{}", line_number)
        } else {
            name.to_string()
        }
    }
}

pub fn load_records<P: AsRef<Path>>(filename: P, delimiter: u8) -> Result<Vec<ToolRecord>, ProcessError> {
    let path_ref = filename.as_ref();
    if !path_ref.exists() {
        error!("Input file {:?} does not exist.", path_ref);
        return Err(ProcessError::MissingInput(path_ref.display().to_string()));
    }

    let file = File::open(path_ref)?;
    let records = read_records(file, delimiter);
    info!("Loaded {} records from CSV {:?}", records.len(), path_ref);
    Ok(records)
}

/// Header names accepted for each column, in `ToolRecord` field order.
const COLUMN_NAMES: [&[&str]; 6] = [
    &["Tool Name", "tool name", "App name"],
    &["Homepage", "homepage"],
    &["Privacy/Legal Link", "privacy"],
    &["DSGVO/GDPR Link", "gdpr"],
    &["Storage/Hosting Link", "storage"],
    &["DPA/AVV Link", "dpa"],
];

fn column_slot(header: &str) -> Option<usize> {
    COLUMN_NAMES.iter().position(|names| names.contains(&header))
}

/// Reads records from any reader. Every data row yields exactly one record at
/// its position: undecodable bytes are replaced, and a row the reader cannot
/// split at all is logged and kept as an empty record.
pub fn read_records<R: std::io::Read>(reader: R, delimiter: u8) -> Vec<ToolRecord> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let slots: Vec<Option<usize>> = match rdr.byte_headers() {
        Ok(headers) => headers
            .iter()
            .map(|h| column_slot(String::from_utf8_lossy(h).trim()))
            .collect(),
        Err(e) => {
            error!("Error reading CSV header: {}", e);
            return Vec::new();
        }
    };

    let mut records = Vec::new();
    for (idx, result) in rdr.byte_records().enumerate() {
        let mut record = ToolRecord::default();
        match result {
            Ok(row) => {
                for (value, slot) in row.iter().zip(&slots) {
                    let Some(slot) = slot else { continue };
                    let text = String::from_utf8_lossy(value).trim().to_string();
                    match *slot {
                        0 => record.name = text,
                        1 => record.homepage = text,
                        2 => record.privacy = text,
                        3 => record.gdpr = text,
                        4 => record.storage = text,
                        _ => record.dpa = text,
                    }
                }
            }
            Err(e) => error!("Error parsing CSV record {}: {}", idx + 1, e),
        }
        records.push(record);
    }
    records
}

pub fn write_records<P: AsRef<Path>>(filename: P, records: &[ToolRecord], delimiter: u8) -> Result<(), ProcessError> {
    let file = File::create(filename.as_ref())?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(file);

    if records.is_empty() {
        // serde only emits the header alongside the first row
        let mut header = vec!["Tool Name"];
        header.extend(LinkField::ALL.iter().map(|f| f.column()));
        writer.write_record(&header)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!("Wrote {} records to {:?}", records.len(), filename.as_ref());
    Ok(())
}
