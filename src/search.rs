//! The `search` module resolves `(postal code, city, address)` requests against the mapped
//! tables.
//!
//! Resolution descends the hierarchy one level at a time: postal code by binary search over
//! the sort index, commune and voie by exact key equality with a fuzzy fallback, house number
//! by binary search within the voie's slice. Each level that fails to resolve degrades the
//! quality code instead of erroring; a search always produces a result.
use crate::database::Database;
use crate::normalize;
use crate::parser::Parser;
use crate::record::{Commune, Postal, Voie, int_to_degree};
use serde::Serialize;
use std::collections::BTreeSet;

/// Minimum similarity score for a fuzzy commune or voie match.
pub const SIMILARITY_THRESHOLD: f64 = 0.6;

/// The `Quality` enum grades how exact a forward-search match was, 1 (exact address) through
/// 6 (nothing found).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, derive_more::Display,
)]
#[serde(into = "u8")]
#[repr(u8)]
pub enum Quality {
    /// The requested house number was found on the resolved street.
    #[display("successful")]
    Exact = 1,
    /// Street found, requested number absent; the street mean is returned.
    #[display("precise number was not found")]
    NumberNotFound = 2,
    /// Street found and the input had no number; the street mean is returned.
    #[display("no number in the input")]
    NoNumber = 3,
    /// Commune found, street not found; the commune mean is returned.
    #[display("street was not found")]
    StreetNotFound = 4,
    /// Postal code found, commune not found; the first commune's coordinate is returned.
    #[display("city was not found")]
    CityNotFound = 5,
    /// Nothing found; coordinates are undefined.
    #[display("nothing was found")]
    NotFound = 6,
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality as u8
    }
}

/// The `Position` struct is the result of a forward search: a coordinate, the quality grade,
/// and the display names of the resolved commune and voie when those levels resolved.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    /// Longitude in floating degrees; NaN when nothing was found.
    pub longitude: f64,
    /// Latitude in floating degrees; NaN when nothing was found.
    pub latitude: f64,
    /// How exact the match was.
    pub quality: Quality,
    /// Display name of the resolved commune.
    pub commune: Option<String>,
    /// Display name of the resolved voie.
    pub voie: Option<String>,
}

impl Position {
    fn not_found() -> Self {
        Self {
            longitude: f64::NAN,
            latitude: f64::NAN,
            quality: Quality::NotFound,
            commune: None,
            voie: None,
        }
    }
}

/// The `similarity` function scores two normalized names in [0, 1]: half token-set Jaccard,
/// half Levenshtein ratio.
pub fn similarity(a: &str, b: &str) -> f64 {
    let tokens_a = a.split(' ').filter(|t| !t.is_empty()).collect::<BTreeSet<&str>>();
    let tokens_b = b.split(' ').filter(|t| !t.is_empty()).collect::<BTreeSet<&str>>();
    let union = tokens_a.union(&tokens_b).count();
    let jaccard = if union == 0 {
        0.0
    } else {
        tokens_a.intersection(&tokens_b).count() as f64 / union as f64
    };
    let longest = a.chars().count().max(b.chars().count());
    let edit = if longest == 0 {
        0.0
    } else {
        strsim::levenshtein(a, b) as f64 / longest as f64
    };
    0.5 * jaccard + 0.5 * (1.0 - edit)
}

/// The `find` function resolves a forward search. Never fails: bad input degrades the quality
/// code, down to [`Quality::NotFound`] with NaN coordinates.
pub fn find(db: &Database, postal: &str, city: Option<&str>, address: Option<&str>) -> Position {
    // Postal code.
    let code = match postal.trim().parse::<u32>() {
        Ok(code) => code,
        Err(_) => return Position::not_found(),
    };
    let postal_row = match lookup_postal(db, code) {
        Some(row) => row,
        None => return Position::not_found(),
    };
    let postal_record = db.postals.get(postal_row);

    // Commune.
    let city_key = normalize::uniform_commune(city.unwrap_or_default());
    let commune_row = resolve_commune(db, postal_row, &postal_record, &city_key);
    let (commune_row, commune) = match commune_row {
        Some(row) => (row, db.communes.get(row)),
        None => {
            // The first commune under the postal code stands in for an unresolved city.
            let first = db.communes.get(postal_record.commune_start as usize);
            return Position {
                longitude: int_to_degree(first.lon_mean),
                latitude: int_to_degree(first.lat_mean),
                quality: Quality::CityNotFound,
                commune: None,
                voie: None,
            };
        }
    };

    // Voie.
    let address_text = address.unwrap_or_default();
    let voie_key = normalize::uniform_adresse(address_text);
    let voie_row = resolve_voie(db, commune_row, &commune, &voie_key);
    let (_, voie) = match voie_row {
        Some(row) => (row, db.voies.get(row)),
        None => {
            return Position {
                longitude: int_to_degree(commune.lon_mean),
                latitude: int_to_degree(commune.lat_mean),
                quality: Quality::StreetNotFound,
                commune: Some(commune.name_display),
                voie: None,
            };
        }
    };

    // House number.
    let (quality, longitude, latitude) = match Parser::house_number(address_text) {
        None => (Quality::NoNumber, voie.lon_mean, voie.lat_mean),
        Some((number, suffix)) => match lookup_number(db, &voie, number, &suffix) {
            Some(point) => (Quality::Exact, point.0, point.1),
            None => (Quality::NumberNotFound, voie.lon_mean, voie.lat_mean),
        },
    };
    Position {
        longitude: int_to_degree(longitude),
        latitude: int_to_degree(latitude),
        quality,
        commune: Some(commune.name_display),
        voie: Some(voie.name_display),
    }
}

/// Binary search over the postal sort index; returns the postal row holding `code`.
fn lookup_postal(db: &Database, code: u32) -> Option<usize> {
    let len = db.postal_index.len();
    let first = partition_point(len, |slot| {
        db.postals.get(db.postal_index.get(slot) as usize).code < code
    });
    if first < len {
        let row = db.postal_index.get(first) as usize;
        if db.postals.get(row).code == code {
            return Some(row);
        }
    }
    None
}

/// Resolves the commune under a postal row: exact key equality through the commune sort
/// index, then the best fuzzy candidate in the postal's slice.
fn resolve_commune(db: &Database, postal_row: usize, postal: &Postal, key: &str) -> Option<usize> {
    if !key.is_empty() {
        // Exact: candidates from the sort index, filtered back to this postal row.
        let len = db.commune_index.len();
        let mut slot = partition_point(len, |slot| {
            db.communes
                .get(db.commune_index.get(slot) as usize)
                .name_normalized
                .as_str()
                < key
        });
        while slot < len {
            let row = db.commune_index.get(slot) as usize;
            let commune = db.communes.get(row);
            if commune.name_normalized != key {
                break;
            }
            if commune.postal == postal_row as u32 {
                return Some(row);
            }
            slot += 1;
        }
    }
    // Fuzzy: best-scoring commune in the slice. Rows are in ascending key order and the
    // comparison is strict, so ties resolve to the lexicographically smaller name.
    let mut best: Option<(f64, usize)> = None;
    for row in postal.commune_start as usize..postal.commune_end as usize {
        let commune = db.communes.get(row);
        let score = similarity(key, &commune.name_normalized);
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, row));
        }
    }
    best.filter(|&(score, _)| score >= SIMILARITY_THRESHOLD)
        .map(|(_, row)| row)
}

/// Resolves the voie under a commune row, same strategy as the commune level.
fn resolve_voie(db: &Database, commune_row: usize, commune: &Commune, key: &str) -> Option<usize> {
    if !key.is_empty() {
        let len = db.voie_index.len();
        let mut slot = partition_point(len, |slot| {
            db.voies
                .get(db.voie_index.get(slot) as usize)
                .name_normalized
                .as_str()
                < key
        });
        while slot < len {
            let row = db.voie_index.get(slot) as usize;
            let voie = db.voies.get(row);
            if voie.name_normalized != key {
                break;
            }
            if voie.commune == commune_row as u32 {
                return Some(row);
            }
            slot += 1;
        }
    }
    let mut best: Option<(f64, usize)> = None;
    for row in commune.voie_start as usize..commune.voie_end as usize {
        let voie = db.voies.get(row);
        let score = similarity(key, &voie.name_normalized);
        if best.is_none_or(|(best_score, _)| score > best_score) {
            best = Some((score, row));
        }
    }
    best.filter(|&(score, _)| score >= SIMILARITY_THRESHOLD)
        .map(|(_, row)| row)
}

/// Binary search for `(number, suffix)` within a voie's localisation slice, which is ordered
/// by number then suffix.
fn lookup_number(db: &Database, voie: &Voie, number: u32, suffix: &str) -> Option<(i32, i32)> {
    let start = voie.loc_start as usize;
    let len = voie.loc_end as usize - start;
    let first = partition_point(len, |offset| {
        let loc = db.localisations.get(start + offset);
        (loc.number, loc.suffix.as_str()) < (number, suffix)
    });
    if first < len {
        let loc = db.localisations.get(start + first);
        if loc.number == number && loc.suffix == suffix {
            return Some((loc.longitude, loc.latitude));
        }
    }
    None
}

/// The first index in `[0, len)` where `pred` flips from true to false; `pred` must be
/// monotonic, as over sorted rows.
fn partition_point(len: usize, pred: impl Fn(usize) -> bool) -> usize {
    let mut low = 0;
    let mut high = len;
    while low < high {
        let mid = (low + high) / 2;
        if pred(mid) {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low
}
