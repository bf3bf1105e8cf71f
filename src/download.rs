//! The `download` module keeps the raw BAN files current.
//!
//! The remote folder listing doubles as a change manifest: its md5 against the cached copy
//! from the last completed download decides whether anything needs fetching at all, which is
//! what lets `update` run as a no-op when the BAN has not moved. Individual department files
//! that fail to download are logged and skipped; the manifest itself failing is fatal.
use crate::config::Config;
use crate::error::{GeocoderError, GeocoderResult};
use crate::import::FileKind;
use crate::utils::progress_bar;
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io;
use std::path::Path;
use strum::IntoEnumIterator;
use tracing::{error, info};

/// Base URL of the BAN department archives.
pub const BAN_URL: &str = "https://adresse.data.gouv.fr/data/ban/adresses-odbl/latest/csv/";

/// The `client` function builds the blocking HTTP client, honoring the `SSL_VERIFICATION`
/// switch.
pub fn client(config: &Config) -> GeocoderResult<Client> {
    let client = Client::builder()
        .danger_accept_invalid_certs(!config.ssl_verification)
        .build()?;
    Ok(client)
}

/// Fetches a URL into a local file, treating any non-success status as fatal.
fn fetch_to_file(client: &Client, url: &str, path: &Path) -> GeocoderResult<()> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(GeocoderError::BadStatus {
            url: url.to_string(),
            status: response.status().as_u16(),
        });
    }
    fs::write(path, response.bytes()?)?;
    Ok(())
}

/// The `manifests_match` function compares the md5 digests of two manifest files; a missing
/// file never matches.
pub fn manifests_match(server: &Path, local: &Path) -> bool {
    match (md5_digest(server), md5_digest(local)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn md5_digest(path: &Path) -> GeocoderResult<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", md5::compute(bytes)))
}

/// The `need_to_download` function fetches the remote folder listing and decides whether the
/// local raw data is stale. An unchanged manifest with an existing database means up to date.
pub fn need_to_download(config: &Config, client: &Client) -> GeocoderResult<bool> {
    if !config.local_content_file().exists() {
        return Ok(true);
    }
    fetch_to_file(client, BAN_URL, &config.server_content_file())?;
    if manifests_match(&config.server_content_file(), &config.local_content_file())
        && config.database_dir().exists()
    {
        info!("BAN database is already up to date. No need to download it again.");
        fs::remove_file(config.server_content_file())?;
        return Ok(false);
    }
    Ok(true)
}

/// The `download` function fetches every department archive when the manifest changed.
/// Returns whether a download was performed.
pub fn download(config: &Config) -> GeocoderResult<bool> {
    fs::create_dir_all(config.content_dir())?;
    let client = client(config)?;
    if !need_to_download(config, &client)? {
        return Ok(false);
    }
    info!("A new version of the BAN base is available.");
    fetch_to_file(&client, BAN_URL, &config.local_content_file())?;

    let raw = config.raw_dir();
    if raw.exists() {
        fs::remove_dir_all(&raw)?;
    }
    fs::create_dir_all(&raw)?;

    let departments = config.departments();
    let bar = progress_bar(departments.len() as u64, "Downloading BAN files");
    for department in departments {
        for kind in FileKind::iter() {
            let name = kind.gz_name(department);
            let url = format!("{BAN_URL}{name}");
            if let Err(e) = fetch_to_file(&client, &url, &raw.join(&name)) {
                error!("Impossible to download {}: {}", name, e);
            }
        }
        bar.inc(1);
    }
    bar.finish();
    Ok(true)
}

/// The `decompress` function extracts every downloaded archive into its CSV file and removes
/// the archive. A missing archive aborts after the pass with a hint to run `download`.
pub fn decompress(config: &Config) -> GeocoderResult<()> {
    let raw = config.raw_dir();
    let mut missing = 0;
    for department in config.departments() {
        for kind in FileKind::iter() {
            let archive = raw.join(kind.gz_name(department));
            if !archive.is_file() {
                error!("Decompression unsuccessful: nonexistent file {}", archive.display());
                missing += 1;
                continue;
            }
            let csv_path = raw.join(kind.csv_name(department));
            info!("Extracting file {}", csv_path.display());
            let mut decoder = GzDecoder::new(File::open(&archive)?);
            let mut out = File::create(&csv_path)?;
            io::copy(&mut decoder, &mut out)?;
            remove_file(&archive);
        }
    }
    if missing > 0 {
        return Err(GeocoderError::MissingData(format!(
            "{missing} archives absent - run `download` first"
        )));
    }
    Ok(())
}

/// The `clean` function removes every raw scratch file, compressed and decompressed.
pub fn clean(config: &Config) -> GeocoderResult<()> {
    let raw = config.raw_dir();
    if raw.exists() {
        for department in config.departments() {
            for kind in FileKind::iter() {
                remove_file(&raw.join(kind.gz_name(department)));
                remove_file(&raw.join(kind.csv_name(department)));
            }
        }
        fs::remove_dir_all(&raw)?;
    }
    Ok(())
}

/// Best-effort deletion; a file already gone is not worth failing the pipeline over.
fn remove_file(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        info!("Could not delete {}: {}", path.display(), e);
    }
}
