//! The `config` module reads the environment surface into an explicit handle passed by
//! reference through the pipeline; nothing else in the crate touches `std::env`.
use std::env;
use std::path::PathBuf;

/// Every metropolitan and overseas department covered by the BAN.
pub const DEPARTMENTS: &[&str] = &[
    "01", "02", "03", "04", "05", "06", "07", "08", "09", "10", "11", "12", "13", "14", "15",
    "16", "17", "18", "19", "2A", "2B", "21", "22", "23", "24", "25", "26", "27", "28", "29",
    "30", "31", "32", "33", "34", "35", "36", "37", "38", "39", "40", "41", "42", "43", "44",
    "45", "46", "47", "48", "49", "50", "51", "52", "53", "54", "55", "56", "57", "58", "59",
    "60", "61", "62", "63", "64", "65", "66", "67", "68", "69", "70", "71", "72", "73", "74",
    "75", "76", "77", "78", "79", "80", "81", "82", "83", "84", "85", "86", "87", "88", "89",
    "90", "91", "92", "93", "94", "95", "971", "972", "973", "974", "975", "976", "977", "978",
    "984", "986", "987", "988", "989",
];

/// Department list used when `DEBUG` restricts the build to a single department.
const DEBUG_DEPARTMENTS: &[&str] = &["01"];

/// The `Config` struct holds the runtime configuration: the data directory layout and the
/// switches read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for raw files, content manifests and the database.
    pub data_dir: PathBuf,
    /// `DEBUG`: restrict the pipeline to department 01, used by the tests.
    pub debug: bool,
    /// `LOCAL_DB`: keep the database on the local filesystem. Object-storage mirroring is the
    /// job of an external collaborator; this crate only records the intent.
    pub local_db: bool,
    /// `SSL_VERIFICATION`: verify TLS certificates when fetching from the BAN website.
    pub ssl_verification: bool,
    /// `S3_ENDPOINT_URL`: endpoint an external mirroring collaborator would use.
    pub s3_endpoint: Option<String>,
}

impl Config {
    /// The `from_env` method builds the configuration from the environment, anchored at
    /// `data_dir`. Unset variables fall back to local, unverified, non-debug defaults.
    pub fn from_env(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            debug: env_flag("DEBUG"),
            local_db: env::var("LOCAL_DB").map(|v| truthy(&v)).unwrap_or(true),
            ssl_verification: env_flag("SSL_VERIFICATION"),
            s3_endpoint: env::var("S3_ENDPOINT_URL").ok(),
        }
    }

    /// The `departments` method returns the department codes the pipeline covers.
    pub fn departments(&self) -> &'static [&'static str] {
        if self.debug {
            DEBUG_DEPARTMENTS
        } else {
            DEPARTMENTS
        }
    }

    /// Directory of downloaded and decompressed raw files.
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    /// Directory of the cached content manifests.
    pub fn content_dir(&self) -> PathBuf {
        self.data_dir.join("content")
    }

    /// The built database directory.
    pub fn database_dir(&self) -> PathBuf {
        self.data_dir.join(crate::store::DATABASE_DIR)
    }

    /// Cached copy of the remote folder listing from the last completed download.
    pub fn local_content_file(&self) -> PathBuf {
        self.content_dir().join("local_content_v2.txt")
    }

    /// Freshly fetched remote folder listing, compared against the local copy.
    pub fn server_content_file(&self) -> PathBuf {
        self.content_dir().join("server_content_v2.txt")
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).map(|value| truthy(&value)).unwrap_or(false)
}

fn truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "t")
}
