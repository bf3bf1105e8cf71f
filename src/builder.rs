//! The `builder` module aggregates raw records into the five address tables and their sort
//! indices.
//!
//! Records arrive in any order and settle into a four-level ordered map, postal code down to
//! the set of localisations on a voie. Flushing a department walks the map in key order,
//! emitting contiguous child slices and computing integer mean coordinates on the way up, so
//! every table row lands next to its siblings and parents only ever hold half-open ranges.
use crate::error::{GeocoderError, GeocoderResult};
use crate::import::RawRecord;
use crate::record::{Commune, Department, Localisation, Postal, Voie};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

/// Leaf key: one deduplicated point on a voie.
type LocalisationKey = (u32, String, i32, i32);
/// Voie key: normalized name first so siblings sort by search key.
type VoieKey = (String, String);
/// Commune key: normalized name, display name, INSEE code.
type CommuneKey = (String, String, String);
/// One department's pending aggregation.
type PostalMap = BTreeMap<u32, BTreeMap<CommuneKey, BTreeMap<VoieKey, BTreeSet<LocalisationKey>>>>;

/// The `Builder` struct consumes raw records department by department and produces the
/// finished [`Tables`].
#[derive(Debug, Default)]
pub struct Builder {
    departments: Vec<Department>,
    postals: Vec<Postal>,
    communes: Vec<Commune>,
    voies: Vec<Voie>,
    localisations: Vec<Localisation>,
    pending: PostalMap,
}

impl Builder {
    /// The `new` method creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `insert` method files one record under the department currently being aggregated.
    pub fn insert(&mut self, record: RawRecord) {
        let commune_key = (record.commune_norm, record.commune_disp, record.insee);
        let voie_key = (record.voie_norm, record.voie_disp);
        let point = (
            record.number,
            record.suffix,
            record.longitude,
            record.latitude,
        );
        self.pending
            .entry(record.postal)
            .or_default()
            .entry(commune_key)
            .or_default()
            .entry(voie_key)
            .or_default()
            .insert(point);
    }

    /// The `flush_department` method emits one department row covering everything inserted
    /// since the previous flush. Both files of a department are inserted before its flush, so
    /// a department appears exactly once however many files fed it.
    pub fn flush_department(&mut self, name: &str) {
        let postal_start = self.postals.len() as u32;
        let department_id = self.departments.len() as u32;
        for (code, communes) in std::mem::take(&mut self.pending) {
            let postal_id = self.postals.len() as u32;
            let commune_start = self.communes.len() as u32;
            for ((name_normalized, name_display, insee), voies) in communes {
                self.flush_commune(name_normalized, name_display, insee, voies, postal_id);
            }
            self.postals.push(Postal {
                code,
                commune_start,
                commune_end: self.communes.len() as u32,
                department: department_id,
            });
        }
        self.departments.push(Department {
            name: name.to_string(),
            postal_start,
            postal_end: self.postals.len() as u32,
        });
    }

    fn flush_commune(
        &mut self,
        name_normalized: String,
        name_display: String,
        insee: String,
        voies: BTreeMap<VoieKey, BTreeSet<LocalisationKey>>,
        postal_id: u32,
    ) {
        let commune_id = self.communes.len() as u32;
        let voie_start = self.voies.len() as u32;
        let mut voie_means = Vec::with_capacity(voies.len());
        for ((voie_normalized, voie_display), points) in voies {
            let voie_id = self.voies.len() as u32;
            let loc_start = self.localisations.len() as u32;
            let mut coordinates = Vec::with_capacity(points.len());
            for (number, suffix, longitude, latitude) in points {
                coordinates.push((longitude, latitude));
                self.localisations.push(Localisation {
                    number,
                    suffix,
                    longitude,
                    latitude,
                    voie: voie_id,
                });
            }
            let (lon_mean, lat_mean) = integer_mean(&coordinates);
            voie_means.push((lon_mean, lat_mean));
            self.voies.push(Voie {
                name_normalized: voie_normalized,
                name_display: voie_display,
                lon_mean,
                lat_mean,
                loc_start,
                loc_end: self.localisations.len() as u32,
                commune: commune_id,
            });
        }
        let (lon_mean, lat_mean) = integer_mean(&voie_means);
        self.communes.push(Commune {
            name_normalized,
            name_display,
            insee,
            lon_mean,
            lat_mean,
            voie_start,
            voie_end: self.voies.len() as u32,
            postal: postal_id,
        });
    }

    /// The `finish` method closes the build, producing the tables and sort indices. Fails with
    /// [`GeocoderError::EmptyBuild`] when nothing was aggregated, so a bad run never replaces
    /// a good database.
    pub fn finish(self) -> GeocoderResult<Tables> {
        if self.localisations.is_empty() {
            return Err(GeocoderError::EmptyBuild);
        }
        let postal_index = argsort(&self.postals, |postal| postal.code);
        let commune_index = argsort(&self.communes, |commune| commune.name_normalized.clone());
        let voie_index = argsort(&self.voies, |voie| voie.name_normalized.clone());
        info!(
            "Build complete: {} departments, {} postal codes, {} communes, {} voies, {} localisations.",
            self.departments.len(),
            self.postals.len(),
            self.communes.len(),
            self.voies.len(),
            self.localisations.len()
        );
        Ok(Tables {
            departments: self.departments,
            postals: self.postals,
            communes: self.communes,
            voies: self.voies,
            localisations: self.localisations,
            postal_index,
            commune_index,
            voie_index,
        })
    }
}

/// The `Tables` struct holds the finished build: the five tables in parent-before-child
/// emission order plus the three sort indices over their primary keys.
#[derive(Debug)]
pub struct Tables {
    /// Department rows.
    pub departments: Vec<Department>,
    /// Postal rows, grouped by department.
    pub postals: Vec<Postal>,
    /// Commune rows, grouped by postal code.
    pub communes: Vec<Commune>,
    /// Voie rows, grouped by commune.
    pub voies: Vec<Voie>,
    /// Localisation rows, grouped by voie.
    pub localisations: Vec<Localisation>,
    /// Postal rows argsorted by code.
    pub postal_index: Vec<u32>,
    /// Commune rows argsorted by normalized name.
    pub commune_index: Vec<u32>,
    /// Voie rows argsorted by normalized name.
    pub voie_index: Vec<u32>,
}

/// Stable argsort of `[0, N)` by a key of each row.
fn argsort<T, K: Ord>(rows: &[T], key: impl Fn(&T) -> K) -> Vec<u32> {
    let mut index = (0..rows.len() as u32).collect::<Vec<u32>>();
    index.sort_by_key(|&row| key(&rows[row as usize]));
    index
}

/// Integer arithmetic mean of fixed-point coordinate pairs, summed in i64, truncated.
fn integer_mean(points: &[(i32, i32)]) -> (i32, i32) {
    let count = points.len() as i64;
    if count == 0 {
        return (0, 0);
    }
    let lon = points.iter().map(|&(lon, _)| lon as i64).sum::<i64>() / count;
    let lat = points.iter().map(|&(_, lat)| lat as i64).sum::<i64>() / count;
    (lon as i32, lat as i32)
}
