//! The `database` module opens a built database directory and answers queries against it.
//!
//! A [`Database`] maps all nine files read-only at open and never mutates them, so one handle
//! serves any number of threads without coordination. Queries are memory reads from the maps;
//! there is no I/O after open.
use crate::error::{GeocoderError, GeocoderResult};
use crate::kdtree;
use crate::record::{
    COORDINATE_SCALE, Commune, Department, KdNode, Localisation, Postal, Voie, int_to_degree,
};
use crate::search::{self, Position};
use crate::store::{
    COMMUNE_FILE, COMMUNE_INDEX_FILE, DEPARTEMENT_FILE, KDTREE_FILE, LOCALISATION_FILE,
    POSTAL_FILE, POSTAL_INDEX_FILE, Table, VOIE_FILE, VOIE_INDEX_FILE,
};
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// The `Database` struct is a read-only handle over one built database directory: the five
/// tables, the three sort indices and the persisted k-d tree.
#[derive(Debug)]
pub struct Database {
    /// Department table.
    pub departments: Table<Department>,
    /// Postal table.
    pub postals: Table<Postal>,
    /// Commune table.
    pub communes: Table<Commune>,
    /// Voie table.
    pub voies: Table<Voie>,
    /// Localisation table.
    pub localisations: Table<Localisation>,
    /// Postal sort index.
    pub postal_index: Table<u32>,
    /// Commune sort index.
    pub commune_index: Table<u32>,
    /// Voie sort index.
    pub voie_index: Table<u32>,
    /// Persisted k-d tree.
    pub kdtree: Table<KdNode>,
}

impl Database {
    /// The `open` method maps every table of a database directory. Structural failure here is
    /// fatal to the caller; a half-present database cannot answer queries.
    pub fn open(directory: &Path) -> GeocoderResult<Self> {
        if !directory.is_dir() {
            return Err(GeocoderError::MissingData(format!(
                "no database at {} - run `index` first",
                directory.display()
            )));
        }
        let db = Self {
            departments: Table::open(&directory.join(DEPARTEMENT_FILE))?,
            postals: Table::open(&directory.join(POSTAL_FILE))?,
            communes: Table::open(&directory.join(COMMUNE_FILE))?,
            voies: Table::open(&directory.join(VOIE_FILE))?,
            localisations: Table::open(&directory.join(LOCALISATION_FILE))?,
            postal_index: Table::open(&directory.join(POSTAL_INDEX_FILE))?,
            commune_index: Table::open(&directory.join(COMMUNE_INDEX_FILE))?,
            voie_index: Table::open(&directory.join(VOIE_INDEX_FILE))?,
            kdtree: Table::open(&directory.join(KDTREE_FILE))?,
        };
        info!(
            "Database opened: {} localisations across {} communes.",
            db.localisations.len(),
            db.communes.len()
        );
        Ok(db)
    }

    /// The `find` method resolves `(postal code, city, address)` to a coordinate and quality
    /// grade. Any argument may be empty; the result degrades instead of failing.
    pub fn find(&self, postal: &str, city: Option<&str>, address: Option<&str>) -> Position {
        search::find(self, postal, city, address)
    }

    /// The `near` method returns the known address nearest to a coordinate in floating
    /// degrees. `None` only when the localisation table is empty.
    pub fn near(&self, longitude: f64, latitude: f64) -> Option<Nearest> {
        let lon = (longitude * COORDINATE_SCALE).round() as i32;
        let lat = (latitude * COORDINATE_SCALE).round() as i32;
        let neighbor = kdtree::nearest(&self.kdtree, lon, lat)?;
        let localisation = self.localisations.get(neighbor.payload as usize);
        let voie = self.voies.get(localisation.voie as usize);
        let commune = self.communes.get(voie.commune as usize);
        Some(Nearest {
            commune: commune.name_display,
            voie: voie.name_display,
            numero: localisation.number,
            suffix: localisation.suffix,
            longitude: int_to_degree(localisation.longitude),
            latitude: int_to_degree(localisation.latitude),
        })
    }
}

/// The `Nearest` struct is the result of a reverse search: the closest stored localisation
/// with its commune and voie resolved through the upward links.
#[derive(Debug, Clone, Serialize)]
pub struct Nearest {
    /// Display name of the commune.
    pub commune: String,
    /// Display name of the voie.
    pub voie: String,
    /// House number; 0 for a lieu-dit.
    pub numero: u32,
    /// Repetition suffix, empty when absent.
    pub suffix: String,
    /// Stored longitude in floating degrees.
    pub longitude: f64,
    /// Stored latitude in floating degrees.
    pub latitude: f64,
}
