//! The `import` module parses the BAN department CSV files into typed records.
//!
//! Two file kinds exist, distinguished by filename: `adresses-<DPT>.csv` carries full
//! street-and-number rows, `lieux-dits-<DPT>-beta.csv` carries named places without numbers.
//! Each kind owns a column map; everything else about a row is read identically. Rows that
//! fail a type or bounds check are dropped and counted, never fatal.
use crate::error::GeocoderResult;
use crate::normalize;
use crate::record::{self, LAT_MAX, LAT_MIN, LON_MAX, LON_MIN, VOIE_TEXT};
use std::path::Path;
use strum::EnumIter;
use tracing::{info, trace};

/// The `Columns` struct maps the semantic fields of a BAN row to 0-based column positions.
/// `numero`, `repetition` and `complementaire` are absent from the lieux-dits layout.
#[derive(Debug, Clone, Copy)]
pub struct Columns {
    /// Street name (or lieu-dit name).
    pub voie: usize,
    /// House number.
    pub numero: Option<usize>,
    /// Repetition marker after the number ("bis", "A", ...).
    pub repetition: Option<usize>,
    /// Postal code.
    pub code_postal: usize,
    /// INSEE commune identifier.
    pub code_insee: usize,
    /// Commune name.
    pub nom_commune: usize,
    /// Fallback commune name when the primary one normalizes to nothing.
    pub complementaire: Option<usize>,
    /// Longitude in floating degrees.
    pub longitude: usize,
    /// Latitude in floating degrees.
    pub latitude: usize,
}

const ADRESSES_COLUMNS: Columns = Columns {
    voie: 4,
    numero: Some(2),
    repetition: Some(3),
    code_postal: 5,
    code_insee: 6,
    nom_commune: 7,
    complementaire: Some(16),
    longitude: 12,
    latitude: 13,
};

const LIEUX_DITS_COLUMNS: Columns = Columns {
    voie: 1,
    numero: None,
    repetition: None,
    code_postal: 2,
    code_insee: 3,
    nom_commune: 4,
    complementaire: None,
    longitude: 9,
    latitude: 10,
};

/// The `FileKind` enum tags the two BAN file layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum FileKind {
    /// Full street-and-number rows from `adresses-<DPT>.csv`.
    Adresses,
    /// Named places without numbers from `lieux-dits-<DPT>-beta.csv`.
    LieuxDits,
}

impl FileKind {
    /// The `columns` method returns the column map for this file kind.
    pub fn columns(&self) -> &'static Columns {
        match self {
            Self::Adresses => &ADRESSES_COLUMNS,
            Self::LieuxDits => &LIEUX_DITS_COLUMNS,
        }
    }

    /// The `csv_name` method returns the decompressed file name for a department.
    pub fn csv_name(&self, department: &str) -> String {
        match self {
            Self::Adresses => format!("adresses-{department}.csv"),
            Self::LieuxDits => format!("lieux-dits-{department}-beta.csv"),
        }
    }

    /// The `gz_name` method returns the downloaded archive name for a department.
    pub fn gz_name(&self, department: &str) -> String {
        format!("{}.gz", self.csv_name(department))
    }

    /// The `from_path` method recognizes the file kind and department code from a file name,
    /// e.g. `adresses-2A.csv` or `lieux-dits-974-beta.csv`.
    pub fn from_path(path: &Path) -> Option<(Self, String)> {
        let stem = path.file_stem()?.to_str()?;
        if let Some(rest) = stem.strip_prefix("lieux-dits-") {
            let department = rest.strip_suffix("-beta")?;
            return Some((Self::LieuxDits, department.to_string()));
        }
        if let Some(department) = stem.strip_prefix("adresses-") {
            return Some((Self::Adresses, department.to_string()));
        }
        None
    }
}

/// The `RawRecord` struct is one parsed and normalized BAN row, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Postal code.
    pub postal: u32,
    /// Normalized commune name (search key).
    pub commune_norm: String,
    /// Display commune name.
    pub commune_disp: String,
    /// INSEE commune identifier.
    pub insee: String,
    /// Normalized voie name (search key).
    pub voie_norm: String,
    /// Display voie name.
    pub voie_disp: String,
    /// House number; 0 for lieux-dits.
    pub number: u32,
    /// Normalized repetition suffix; empty for lieux-dits.
    pub suffix: String,
    /// Fixed-point longitude.
    pub longitude: i32,
    /// Fixed-point latitude.
    pub latitude: i32,
}

/// The `read_file` function parses every row of one decompressed BAN file, dropping rows that
/// fail type or bounds checks and logging the dropped count.
pub fn read_file(path: &Path, kind: FileKind) -> GeocoderResult<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let mut records = Vec::new();
    let mut dropped = 0;
    for row in reader.records() {
        let row = row?;
        match parse_row(&row, kind) {
            Some(record) => records.push(record),
            None => {
                trace!("Dropping row: {:?}", row);
                dropped += 1;
            }
        }
    }
    info!(
        "{}: {} records read, {} dropped.",
        path.display(),
        records.len(),
        dropped
    );
    Ok(records)
}

/// Parses one CSV row against its column map. `None` drops the row: numeric parse failure on
/// postal, number or coordinates, an empty or cap-exceeding voie name, an empty commune name,
/// or a coordinate outside French bounds.
fn parse_row(row: &csv::StringRecord, kind: FileKind) -> Option<RawRecord> {
    let columns = kind.columns();

    let postal = row.get(columns.code_postal)?.trim().parse::<u32>().ok()?;
    let longitude = row.get(columns.longitude)?.trim().parse::<f64>().ok()?;
    let latitude = row.get(columns.latitude)?.trim().parse::<f64>().ok()?;
    let longitude = record::degree_to_int(longitude, LON_MIN, LON_MAX)?;
    let latitude = record::degree_to_int(latitude, LAT_MIN, LAT_MAX)?;

    let (commune_norm, commune_disp) = commune_names(row, columns)?;
    let insee = row.get(columns.code_insee)?.trim().to_string();

    let voie_raw = row.get(columns.voie)?;
    let voie_norm = normalize::uniform_adresse(voie_raw);
    let voie_disp = normalize::uniform(voie_raw);
    if voie_norm.is_empty() || voie_norm.len() > VOIE_TEXT || voie_disp.len() > VOIE_TEXT {
        return None;
    }

    let (number, suffix) = match kind {
        FileKind::Adresses => {
            let number = row.get(columns.numero?)?.trim().parse::<u32>().ok()?;
            let suffix = columns
                .repetition
                .and_then(|index| row.get(index))
                .map(normalize::uniform_repetition)
                .unwrap_or_default();
            (number, suffix)
        }
        FileKind::LieuxDits => (0, String::new()),
    };

    Some(RawRecord {
        postal,
        commune_norm,
        commune_disp,
        insee,
        voie_norm,
        voie_disp,
        number,
        suffix,
        longitude,
        latitude,
    })
}

/// Resolves the commune name pair, falling back to the `nom_complementaire` column when the
/// primary name normalizes to nothing.
fn commune_names(row: &csv::StringRecord, columns: &Columns) -> Option<(String, String)> {
    let mut candidates = vec![columns.nom_commune];
    if let Some(index) = columns.complementaire {
        candidates.push(index);
    }
    for index in candidates {
        let raw = match row.get(index) {
            Some(text) => text,
            None => continue,
        };
        let norm = normalize::uniform_commune(raw);
        if !norm.is_empty() {
            return Some((norm, normalize::uniform(raw)));
        }
    }
    None
}
