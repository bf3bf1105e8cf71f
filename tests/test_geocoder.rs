//! End-to-end tests over a synthetic single-department build: raw CSV text through the real
//! pipeline (import, builder, store, k-d tree) into a mapped database answering queries.
use geocodage::record::{FixedRecord, KdNode, int_to_degree};
use geocodage::search::Quality;
use geocodage::store::KDTREE_FILE;
use geocodage::{Config, Database, cli, download};
use std::fs;
use std::path::Path;
use tracing::info;

/// Header rows are skipped by the reader; only the column positions matter.
fn header(width: usize) -> String {
    (0..width)
        .map(|i| format!("col_{i}"))
        .collect::<Vec<String>>()
        .join(";")
}

/// One row of `adresses-01.csv`: numero=2, repetition=3, nom_voie=4, code_postal=5,
/// code_insee=6, nom_commune=7, longitude=12, latitude=13.
fn adresse(
    numero: &str,
    repetition: &str,
    voie: &str,
    postal: &str,
    insee: &str,
    commune: &str,
    lon: &str,
    lat: &str,
) -> String {
    let mut fields = vec![""; 17];
    fields[2] = numero;
    fields[3] = repetition;
    fields[4] = voie;
    fields[5] = postal;
    fields[6] = insee;
    fields[7] = commune;
    fields[12] = lon;
    fields[13] = lat;
    fields.join(";")
}

/// One row of `lieux-dits-01-beta.csv`: nom_lieu_dit=1, code_postal=2, code_insee=3,
/// nom_commune=4, longitude=9, latitude=10.
fn lieu_dit(voie: &str, postal: &str, insee: &str, commune: &str, lon: &str, lat: &str) -> String {
    let mut fields = vec![""; 11];
    fields[1] = voie;
    fields[2] = postal;
    fields[3] = insee;
    fields[4] = commune;
    fields[9] = lon;
    fields[10] = lat;
    fields.join(";")
}

/// Count of rows above that survive ingestion (dropped and duplicate rows excluded).
const VALID_ROWS: usize = 7;

fn write_fixture(config: &Config) {
    let raw = config.raw_dir();
    fs::create_dir_all(&raw).unwrap();

    let mut adresses = vec![header(17)];
    // Rue du Professeur Christian Cabrol, Ambérieu-en-Bugey.
    adresses.push(adresse(
        "1", "", "Rue du Professeur Christian Cabrol", "01500", "01004", "Ambérieu-en-Bugey",
        "5.3500000", "45.9800000",
    ));
    adresses.push(adresse(
        "2", "", "Rue du Professeur Christian Cabrol", "01500", "01004", "Ambérieu-en-Bugey",
        "5.3500200", "45.9800200",
    ));
    adresses.push(adresse(
        "3", "bis", "Rue du Professeur Christian Cabrol", "01500", "01004", "Ambérieu-en-Bugey",
        "5.3500400", "45.9800400",
    ));
    // An exact duplicate deduplicates away.
    adresses.push(adresse(
        "1", "", "Rue du Professeur Christian Cabrol", "01500", "01004", "Ambérieu-en-Bugey",
        "5.3500000", "45.9800000",
    ));
    // A second voie in the same commune.
    adresses.push(adresse(
        "10", "", "Avenue Roger Salengro", "01500", "01004", "Ambérieu-en-Bugey", "5.3400000",
        "45.9700000",
    ));
    // A second commune under the same postal code.
    adresses.push(adresse(
        "4", "", "Rue des Écoles", "01500", "01007", "Ambronay", "5.3600000", "46.0000000",
    ));
    // Dropped: unparsable latitude.
    adresses.push(adresse(
        "5", "", "Rue des Écoles", "01500", "01007", "Ambronay", "5.3600000", "abc",
    ));
    // Dropped: longitude outside French bounds.
    adresses.push(adresse(
        "6", "", "Rue des Écoles", "01500", "01007", "Ambronay", "100.0", "46.0000000",
    ));
    // Dropped: empty street name.
    adresses.push(adresse(
        "7", "", "", "01500", "01007", "Ambronay", "5.3600000", "46.0000000",
    ));
    // Dropped: unparsable house number.
    adresses.push(adresse(
        "xx", "", "Rue des Écoles", "01500", "01007", "Ambronay", "5.3600000", "46.0000000",
    ));
    fs::write(raw.join("adresses-01.csv"), adresses.join("\n")).unwrap();

    let mut lieux = vec![header(11)];
    lieux.push(lieu_dit(
        "la Chèvre", "01400", "01093", "Châtillon-sur-Chalaronne", "4.9100000", "46.1300000",
    ));
    lieux.push(lieu_dit(
        "les Granges", "01400", "01093", "Châtillon-sur-Chalaronne", "4.9200000", "46.1400000",
    ));
    fs::write(raw.join("lieux-dits-01-beta.csv"), lieux.join("\n")).unwrap();
}

fn build_database(data_dir: &Path) -> Database {
    let config = Config {
        data_dir: data_dir.to_path_buf(),
        debug: true,
        local_db: true,
        ssl_verification: false,
        s3_endpoint: None,
    };
    write_fixture(&config);
    cli::index(&config).unwrap();
    cli::reverse(&config).unwrap();
    Database::open(&config.database_dir()).unwrap()
}

#[test_log::test]
fn forward_search_grades_quality() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());

    // Quality 1: exact house number.
    let hit = db.find(
        "01500",
        Some("Ambérieu-en-Bugey"),
        Some("1 Rue du Professeur Christian Cabrol"),
    );
    assert_eq!(hit.quality, Quality::Exact);
    assert!((hit.longitude - 5.35).abs() < 1e-6);
    assert!((hit.latitude - 45.98).abs() < 1e-6);
    assert_eq!(hit.commune.as_deref(), Some("AMBERIEU EN BUGEY"));
    assert_eq!(hit.voie.as_deref(), Some("RUE DU PROFESSEUR CHRISTIAN CABROL"));

    // Quality 1: number with a bis marker.
    let hit = db.find(
        "01500",
        Some("Ambérieu-en-Bugey"),
        Some("3 bis Rue du Professeur Christian Cabrol"),
    );
    assert_eq!(hit.quality, Quality::Exact);
    assert!((hit.longitude - 5.35004).abs() < 1e-6);

    // Quality 2: street found, number absent; the street mean comes back.
    let hit = db.find(
        "01500",
        Some("Ambérieu-en-Bugey"),
        Some("99 Rue du Professeur Christian Cabrol"),
    );
    assert_eq!(hit.quality, Quality::NumberNotFound);
    assert!((hit.longitude - 5.35002).abs() < 1e-6);
    assert!((hit.latitude - 45.98002).abs() < 1e-6);

    // Quality 3: no number in the input.
    let hit = db.find(
        "01500",
        Some("Ambérieu-en-Bugey"),
        Some("Rue du Professeur Christian Cabrol"),
    );
    assert_eq!(hit.quality, Quality::NoNumber);
    assert!((hit.longitude - 5.35002).abs() < 1e-6);

    // Quality 4: street not found; the commune mean comes back.
    let hit = db.find("01500", Some("Ambérieu-en-Bugey"), Some("Rue Inexistante Quelconque"));
    assert_eq!(hit.quality, Quality::StreetNotFound);
    assert!(hit.voie.is_none());

    // Quality 5: no city supplied.
    let hit = db.find("01500", None, None);
    assert_eq!(hit.quality, Quality::CityNotFound);
    assert!(hit.longitude.is_finite());

    // Quality 6: postal code not present in the BAN.
    let hit = db.find("98000", Some("Anywhere"), Some("Anything"));
    assert_eq!(hit.quality, Quality::NotFound);
    assert!(hit.longitude.is_nan());
    assert!(hit.latitude.is_nan());
    info!("Quality grades read.");
}

#[test_log::test]
fn forward_search_is_diacritic_insensitive() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());
    let accented = db.find(
        "01500",
        Some("Ambérieu-en-Bugey"),
        Some("Rue du Professeur Christian Cabrol"),
    );
    let folded = db.find(
        "01500",
        Some("amberieu en bugey"),
        Some("rue du professeur christian cabrol"),
    );
    assert_eq!(accented.quality, folded.quality);
    assert_eq!(accented.longitude, folded.longitude);
    assert_eq!(accented.latitude, folded.latitude);
}

#[test_log::test]
fn forward_search_resolves_lieux_dits() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());

    // The lieu-dit stores number 0, so "630" degrades to the voie mean, which is the
    // lieu-dit's own centroid.
    let hit = db.find(
        "01400",
        Some("Châtillon-sur-Chalaronne"),
        Some("630, la Chèvre"),
    );
    assert_eq!(hit.quality, Quality::NumberNotFound);
    assert!((hit.longitude - 4.91).abs() < 1e-6);
    assert!((hit.latitude - 46.13).abs() < 1e-6);

    // Without a city the first commune of the postal code stands in.
    let hit = db.find("01400", None, Some("630, la Chèvre"));
    assert_eq!(hit.quality, Quality::CityNotFound);
    assert!((hit.longitude - 4.91).abs() < 0.05);
    assert!((hit.latitude - 46.13).abs() < 0.05);
}

#[test_log::test]
fn reverse_search_returns_stored_points() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());

    // Every stored localisation is its own nearest neighbor.
    for localisation in db.localisations.iter() {
        let hit = db
            .near(
                int_to_degree(localisation.longitude),
                int_to_degree(localisation.latitude),
            )
            .unwrap();
        assert!((hit.longitude - int_to_degree(localisation.longitude)).abs() < f64::EPSILON);
        assert!((hit.latitude - int_to_degree(localisation.latitude)).abs() < f64::EPSILON);
    }

    // A faraway query still resolves to the nearest available department.
    let hit = db.near(2.2099, 48.7099).unwrap();
    assert!(!hit.commune.is_empty());
    assert!(!hit.voie.is_empty());
    info!("Nearest to Paris in a department 01 build: {:?}", hit);
}

#[test_log::test]
fn ingestion_drops_invalid_rows() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());
    assert_eq!(db.localisations.len(), VALID_ROWS);
}

#[test_log::test]
fn tables_hold_their_invariants() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());

    // Sort indices are permutations of [0, N).
    for (index, len) in [
        (&db.postal_index, db.postals.len()),
        (&db.commune_index, db.communes.len()),
        (&db.voie_index, db.voies.len()),
    ] {
        let mut rows = index.iter().collect::<Vec<u32>>();
        rows.sort_unstable();
        assert_eq!(rows, (0..len as u32).collect::<Vec<u32>>());
    }

    // Child slices are non-empty and point back to their parents.
    for row in 0..db.postals.len() {
        let postal = db.postals.get(row);
        assert!(postal.commune_start < postal.commune_end);
        for child in postal.commune_start..postal.commune_end {
            assert_eq!(db.communes.get(child as usize).postal, row as u32);
        }
    }
    for row in 0..db.communes.len() {
        let commune = db.communes.get(row);
        assert!(commune.voie_start < commune.voie_end);
        for child in commune.voie_start..commune.voie_end {
            assert_eq!(db.voies.get(child as usize).commune, row as u32);
        }
    }

    // Voie means are the integer arithmetic means of their localisations.
    for row in 0..db.voies.len() {
        let voie = db.voies.get(row);
        assert!(voie.loc_start < voie.loc_end);
        let count = (voie.loc_end - voie.loc_start) as i64;
        let mut lon = 0i64;
        let mut lat = 0i64;
        for child in voie.loc_start..voie.loc_end {
            let localisation = db.localisations.get(child as usize);
            assert_eq!(localisation.voie, row as u32);
            lon += localisation.longitude as i64;
            lat += localisation.latitude as i64;
        }
        assert_eq!(voie.lon_mean as i64, lon / count);
        assert_eq!(voie.lat_mean as i64, lat / count);
    }
}

#[test_log::test]
fn kdtree_is_tight_and_balanced() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());
    assert_eq!(db.kdtree.len(), db.localisations.len());
    let size = check_node(&db, 0);
    assert_eq!(size, db.kdtree.len());

    fn check_node(db: &Database, index: i32) -> usize {
        if index < 0 {
            return 0;
        }
        let node = db.kdtree.get(index as usize);
        // The node's point sits inside its own bounding box.
        assert!(node.min_lon <= node.longitude && node.longitude <= node.max_lon);
        assert!(node.min_lat <= node.latitude && node.latitude <= node.max_lat);
        // Children's boxes nest inside the parent's.
        for child in [node.left, node.right] {
            if child >= 0 {
                let inner = db.kdtree.get(child as usize);
                assert!(node.min_lon <= inner.min_lon && inner.max_lon <= node.max_lon);
                assert!(node.min_lat <= inner.min_lat && inner.max_lat <= node.max_lat);
            }
        }
        let left = check_node(db, node.left);
        let right = check_node(db, node.right);
        // Median splits keep siblings within one node of each other.
        assert!(left.abs_diff(right) <= 1, "unbalanced siblings: {left} vs {right}");
        left + right + 1
    }
}

#[test_log::test]
fn kdtree_file_is_a_whole_number_of_nodes() {
    let dir = tempfile::tempdir().unwrap();
    let db = build_database(dir.path());
    let config = Config {
        data_dir: dir.path().to_path_buf(),
        debug: true,
        local_db: true,
        ssl_verification: false,
        s3_endpoint: None,
    };
    let size = fs::metadata(config.database_dir().join(KDTREE_FILE)).unwrap().len();
    assert_eq!(size as usize, db.kdtree.len() * KdNode::SIZE);
}

#[test_log::test]
fn unchanged_manifest_means_up_to_date() {
    let dir = tempfile::tempdir().unwrap();
    let server = dir.path().join("server_content_v2.txt");
    let local = dir.path().join("local_content_v2.txt");
    fs::write(&server, "adresses-01.csv.gz 2026-01-01\n").unwrap();
    fs::write(&local, "adresses-01.csv.gz 2026-01-01\n").unwrap();
    assert!(download::manifests_match(&server, &local));

    fs::write(&server, "adresses-01.csv.gz 2026-02-01\n").unwrap();
    assert!(!download::manifests_match(&server, &local));

    fs::remove_file(&local).unwrap();
    assert!(!download::manifests_match(&server, &local));
}
