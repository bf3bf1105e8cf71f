//! The `store` module writes the address tables as flat binary files and reads them back
//! through a memory-mapping view.
//!
//! A table file is a dense little-endian array of fixed-width records. The store never
//! interprets rows; [`Table`] only turns a byte offset into a decoded record. Writes go to a
//! staging directory that replaces `database/` in one rename, so an interrupted build leaves
//! the previous database intact.
use crate::builder::Tables;
use crate::error::{GeocoderError, GeocoderResult};
use crate::record::FixedRecord;
use memmap2::Mmap;
use std::fs::{self, File};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the database directory under the data directory.
pub const DATABASE_DIR: &str = "database";
/// Department table file.
pub const DEPARTEMENT_FILE: &str = "departement.dat";
/// Postal table file.
pub const POSTAL_FILE: &str = "postal.dat";
/// Commune table file.
pub const COMMUNE_FILE: &str = "commune.dat";
/// Voie table file.
pub const VOIE_FILE: &str = "voie.dat";
/// Localisation table file.
pub const LOCALISATION_FILE: &str = "localisation.dat";
/// Postal sort-index file.
pub const POSTAL_INDEX_FILE: &str = "postal_index.dat";
/// Commune sort-index file.
pub const COMMUNE_INDEX_FILE: &str = "commune_index.dat";
/// Voie sort-index file.
pub const VOIE_INDEX_FILE: &str = "voie_index.dat";
/// Persisted k-d tree file.
pub const KDTREE_FILE: &str = "kdtree.dat";

/// The `write_table` function encodes a record slice into one flat binary file.
pub fn write_table<T: FixedRecord>(records: &[T], path: &Path) -> GeocoderResult<()> {
    let mut buf = Vec::with_capacity(records.len() * T::SIZE);
    for record in records {
        record.encode(&mut buf);
    }
    fs::write(path, buf)?;
    Ok(())
}

/// The `store_tables` function writes a finished build into a staging directory and swaps it
/// in as `database/`. The previous database survives any failure before the final rename.
pub fn store_tables(tables: &Tables, data_dir: &Path) -> GeocoderResult<()> {
    let staging = data_dir.join("database.staging");
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    write_table(&tables.departments, &staging.join(DEPARTEMENT_FILE))?;
    write_table(&tables.postals, &staging.join(POSTAL_FILE))?;
    write_table(&tables.communes, &staging.join(COMMUNE_FILE))?;
    write_table(&tables.voies, &staging.join(VOIE_FILE))?;
    write_table(&tables.localisations, &staging.join(LOCALISATION_FILE))?;
    write_table(&tables.postal_index, &staging.join(POSTAL_INDEX_FILE))?;
    write_table(&tables.commune_index, &staging.join(COMMUNE_INDEX_FILE))?;
    write_table(&tables.voie_index, &staging.join(VOIE_INDEX_FILE))?;

    let target = data_dir.join(DATABASE_DIR);
    if target.exists() {
        fs::remove_dir_all(&target)?;
    }
    fs::rename(&staging, &target)?;
    info!("Database stored at {}.", target.display());
    Ok(())
}

/// The `write_kdtree` function persists the k-d tree into an existing database directory,
/// staging through a sibling file so readers never see a half-written tree.
pub fn write_kdtree<T: FixedRecord>(nodes: &[T], database_dir: &Path) -> GeocoderResult<()> {
    let staging = database_dir.join("kdtree.dat.staging");
    write_table(nodes, &staging)?;
    fs::rename(&staging, database_dir.join(KDTREE_FILE))?;
    Ok(())
}

/// The `Table` struct is a read-only typed view over one memory-mapped table file. Rows are
/// decoded on access; the mapping itself is shared freely across threads.
#[derive(Debug)]
pub struct Table<T> {
    map: Mmap,
    path: PathBuf,
    marker: PhantomData<T>,
}

impl<T: FixedRecord> Table<T> {
    /// The `open` method maps a table file read-only, checking that its size is a whole
    /// number of records.
    pub fn open(path: &Path) -> GeocoderResult<Self> {
        let file = File::open(path)?;
        // Safety: the database directory is immutable once built; files are only ever
        // replaced wholesale by rename.
        let map = unsafe { Mmap::map(&file)? };
        if map.len() % T::SIZE != 0 {
            return Err(GeocoderError::Corrupt {
                path: path.to_path_buf(),
                reason: format!(
                    "file size {} is not a multiple of record width {}",
                    map.len(),
                    T::SIZE
                ),
            });
        }
        Ok(Self {
            map,
            path: path.to_path_buf(),
            marker: PhantomData,
        })
    }

    /// The `len` method returns the number of records in the table.
    pub fn len(&self) -> usize {
        self.map.len() / T::SIZE
    }

    /// The `is_empty` method reports whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The `get` method decodes the record at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of bounds, like slice indexing.
    pub fn get(&self, index: usize) -> T {
        assert!(
            index < self.len(),
            "row {} out of bounds for {}",
            index,
            self.path.display()
        );
        T::decode(&self.map[index * T::SIZE..(index + 1) * T::SIZE])
    }

    /// The `iter` method walks every record in row order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        (0..self.len()).map(|index| self.get(index))
    }
}
