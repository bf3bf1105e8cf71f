//! The `cli` module provides the command-line interface and drives the build pipeline.
//!
//! The pipeline is single-threaded and synchronous: download, decompress, index, reverse.
//! Each subcommand checks that its input step ran and aborts with a hint otherwise;
//! `update` chains all of them and stops early when the BAN manifest has not changed.
use crate::builder::Builder;
use crate::config::Config;
use crate::download;
use crate::error::{GeocoderError, GeocoderResult};
use crate::import::{self, FileKind};
use crate::kdtree;
use crate::record::Localisation;
use crate::store::{self, LOCALISATION_FILE, Table};
use crate::utils::progress_bar;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// The `Cli` struct provides the command-line interface for the `geocodage` pipeline.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The `command` field specifies the pipeline step to run.
    #[command(subcommand)]
    pub command: Command,
    /// The `data_dir` field specifies the directory holding raw files, content manifests and
    /// the database.
    #[arg(
        short = 'd',
        long,
        default_value = "data",
        help = "Path to the data directory."
    )]
    pub data_dir: PathBuf,
}

/// The `Command` enum lists the pipeline steps.
#[derive(Subcommand)]
pub enum Command {
    /// Download the BAN archives if the remote manifest changed.
    Download,
    /// Decompress downloaded archives into raw CSV files.
    Decompress,
    /// Build the address database from decompressed CSV files.
    Index,
    /// Build the k-d tree for reverse search.
    Reverse,
    /// Run download, decompress, index and reverse, then remove raw files.
    Update,
    /// Remove raw scratch files.
    Clean,
}

impl Cli {
    /// The `run` method executes the selected subcommand against the configuration.
    pub fn run(&self, config: &Config) -> GeocoderResult<()> {
        match self.command {
            Command::Download => {
                download::download(config)?;
                Ok(())
            }
            Command::Decompress => download::decompress(config),
            Command::Index => index(config),
            Command::Reverse => reverse(config),
            Command::Update => update(config),
            Command::Clean => download::clean(config),
        }
    }
}

/// The `index` function aggregates every decompressed CSV file into the database tables and
/// swaps the result in as the new database.
pub fn index(config: &Config) -> GeocoderResult<()> {
    let raw = config.raw_dir();
    if !raw.is_dir() {
        return Err(GeocoderError::MissingData(
            "no raw data found - run `decompress` first".to_string(),
        ));
    }

    // Group the CSV files by department so both kinds flush into one department row.
    let mut files: BTreeMap<String, Vec<(FileKind, PathBuf)>> = BTreeMap::new();
    for entry in fs::read_dir(&raw)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "csv") {
            if let Some((kind, department)) = FileKind::from_path(&path) {
                files.entry(department).or_default().push((kind, path));
            }
        }
    }
    if files.is_empty() {
        return Err(GeocoderError::MissingData(
            "no CSV file found - run `decompress` first".to_string(),
        ));
    }

    let bar = progress_bar(files.len() as u64, "Process files");
    let mut builder = Builder::new();
    for (department, entries) in &files {
        for (kind, path) in entries {
            for record in import::read_file(path, *kind)? {
                builder.insert(record);
            }
        }
        builder.flush_department(department);
        bar.inc(1);
    }
    bar.finish();

    let tables = builder.finish()?;
    store::store_tables(&tables, &config.data_dir)?;
    if !config.local_db {
        info!(
            "LOCAL_DB is off; an external mirror may now upload {} to {}.",
            config.database_dir().display(),
            config.s3_endpoint.as_deref().unwrap_or("the object store")
        );
    }
    Ok(())
}

/// The `reverse` function builds the k-d tree over the stored localisation table and persists
/// it next to the tables.
pub fn reverse(config: &Config) -> GeocoderResult<()> {
    let database_dir = config.database_dir();
    if !database_dir.is_dir() {
        return Err(GeocoderError::MissingData(
            "no database found - run `index` first".to_string(),
        ));
    }
    let table: Table<Localisation> = Table::open(&database_dir.join(LOCALISATION_FILE))?;
    let localisations = table.iter().collect::<Vec<Localisation>>();
    if localisations.is_empty() {
        return Err(GeocoderError::EmptyBuild);
    }
    info!("Loading kd-tree: {} localisations.", localisations.len());
    let nodes = kdtree::build(&localisations);
    store::write_kdtree(&nodes, &database_dir)?;
    info!("Saved kd-tree: {} nodes.", nodes.len());
    Ok(())
}

/// The `update` function runs the whole pipeline, then removes the raw scratch files. A
/// second run against an unchanged BAN reports up to date and performs no work.
pub fn update(config: &Config) -> GeocoderResult<()> {
    if !download::download(config)? {
        return Ok(());
    }
    download::decompress(config)?;
    index(config)?;
    reverse(config)?;
    download::clean(config)
}
