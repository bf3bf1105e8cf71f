//! The `record` module defines the fixed-width records of the five address tables and of the
//! k-d tree, together with the fixed-point coordinate representation they share.
//!
//! Every record serializes to a packed little-endian byte layout through [`FixedRecord`], so a
//! table file is a dense array directly addressable by row index. Records are decoded field by
//! field from the mapped bytes; nothing is ever transmuted.
use derive_new::new;

/// Scale of the fixed-point coordinate representation: degrees × 10^7 as an `i32`.
pub const COORDINATE_SCALE: f64 = 1e7;

/// Western longitude bound of French territory (metropolitan + overseas), fixed-point.
pub const LON_MIN: i32 = -62_0000000;
/// Eastern longitude bound, fixed-point.
pub const LON_MAX: i32 = 55_0000000;
/// Southern latitude bound, fixed-point.
pub const LAT_MIN: i32 = -22_0000000;
/// Northern latitude bound, fixed-point.
pub const LAT_MAX: i32 = 52_0000000;

/// Width of the department name field.
pub const DEPARTMENT_TEXT: usize = 3;
/// Width of the commune name fields, sized for the longest French commune name
/// (Saint-Remy-en-Bouzemont-Saint-Genest-et-Isson, 45 characters).
pub const COMMUNE_TEXT: usize = 45;
/// Width of the INSEE code field.
pub const INSEE_TEXT: usize = 5;
/// Width of the voie name fields; entries normalizing past this cap are dropped at ingestion.
pub const VOIE_TEXT: usize = 48;
/// Width of the house-number repetition suffix field.
pub const SUFFIX_TEXT: usize = 2;

/// The `degree_to_int` function converts floating degrees to the fixed-point representation,
/// rejecting coordinates outside French bounds.
pub fn degree_to_int(degrees: f64, min: i32, max: i32) -> Option<i32> {
    if !degrees.is_finite() {
        return None;
    }
    let scaled = (degrees * COORDINATE_SCALE).round();
    if scaled < min as f64 || scaled > max as f64 {
        return None;
    }
    Some(scaled as i32)
}

/// The `int_to_degree` function converts a fixed-point coordinate back to floating degrees.
pub fn int_to_degree(fixed: i32) -> f64 {
    fixed as f64 / COORDINATE_SCALE
}

/// The `FixedRecord` trait gives a record type its packed binary layout: a constant width,
/// an append-only encoder and a positional decoder. Table files are arrays of these.
pub trait FixedRecord: Sized {
    /// Exact byte width of one encoded record.
    const SIZE: usize;
    /// Appends the encoded record to `buf`.
    fn encode(&self, buf: &mut Vec<u8>);
    /// Decodes one record from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Self;
}

/// Cursor over one encoded record, consumed field by field in layout order.
struct Fields<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Fields<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    fn u8(&mut self) -> u8 {
        let value = self.bytes[self.at];
        self.at += 1;
        value
    }

    fn u32(&mut self) -> u32 {
        let value = u32::from_le_bytes(self.bytes[self.at..self.at + 4].try_into().unwrap());
        self.at += 4;
        value
    }

    fn i32(&mut self) -> i32 {
        let value = i32::from_le_bytes(self.bytes[self.at..self.at + 4].try_into().unwrap());
        self.at += 4;
        value
    }

    fn text(&mut self, width: usize) -> String {
        let raw = &self.bytes[self.at..self.at + width];
        self.at += width;
        let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}

/// Appends `text` as a NUL-padded field of `width` bytes, truncating on overflow.
fn put_text(buf: &mut Vec<u8>, text: &str, width: usize) {
    let bytes = text.as_bytes();
    let take = bytes.len().min(width);
    buf.extend_from_slice(&bytes[..take]);
    buf.resize(buf.len() + width - take, 0);
}

/// The `Department` struct is one row of the department table: a 2- or 3-character code and a
/// half-open slice into the postal table.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Department {
    /// Department code, e.g. "01", "2A" or "974".
    pub name: String,
    /// First postal row belonging to this department.
    pub postal_start: u32,
    /// One past the last postal row.
    pub postal_end: u32,
}

impl FixedRecord for Department {
    const SIZE: usize = DEPARTMENT_TEXT + 8;

    fn encode(&self, buf: &mut Vec<u8>) {
        put_text(buf, &self.name, DEPARTMENT_TEXT);
        buf.extend_from_slice(&self.postal_start.to_le_bytes());
        buf.extend_from_slice(&self.postal_end.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            name: fields.text(DEPARTMENT_TEXT),
            postal_start: fields.u32(),
            postal_end: fields.u32(),
        }
    }
}

/// The `Postal` struct is one row of the postal table: a postal code within one department and
/// a half-open slice into the commune table.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct Postal {
    /// Postal code as an integer, e.g. 01500 stored as 1500.
    pub code: u32,
    /// First commune row under this postal code.
    pub commune_start: u32,
    /// One past the last commune row.
    pub commune_end: u32,
    /// Row index of the owning department.
    pub department: u32,
}

impl FixedRecord for Postal {
    const SIZE: usize = 16;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.code.to_le_bytes());
        buf.extend_from_slice(&self.commune_start.to_le_bytes());
        buf.extend_from_slice(&self.commune_end.to_le_bytes());
        buf.extend_from_slice(&self.department.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            code: fields.u32(),
            commune_start: fields.u32(),
            commune_end: fields.u32(),
            department: fields.u32(),
        }
    }
}

/// The `Commune` struct is one row of the commune table: the normalized and display names, the
/// INSEE code, the mean coordinate of its voies and a half-open slice into the voie table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commune {
    /// Search key, from [`crate::normalize::uniform_commune`].
    pub name_normalized: String,
    /// Display form, from [`crate::normalize::uniform`].
    pub name_display: String,
    /// INSEE commune identifier.
    pub insee: String,
    /// Integer mean longitude over the commune's voies.
    pub lon_mean: i32,
    /// Integer mean latitude over the commune's voies.
    pub lat_mean: i32,
    /// First voie row under this commune.
    pub voie_start: u32,
    /// One past the last voie row.
    pub voie_end: u32,
    /// Row index of the owning postal code.
    pub postal: u32,
}

impl FixedRecord for Commune {
    const SIZE: usize = COMMUNE_TEXT * 2 + INSEE_TEXT + 20;

    fn encode(&self, buf: &mut Vec<u8>) {
        put_text(buf, &self.name_normalized, COMMUNE_TEXT);
        put_text(buf, &self.name_display, COMMUNE_TEXT);
        put_text(buf, &self.insee, INSEE_TEXT);
        buf.extend_from_slice(&self.lon_mean.to_le_bytes());
        buf.extend_from_slice(&self.lat_mean.to_le_bytes());
        buf.extend_from_slice(&self.voie_start.to_le_bytes());
        buf.extend_from_slice(&self.voie_end.to_le_bytes());
        buf.extend_from_slice(&self.postal.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            name_normalized: fields.text(COMMUNE_TEXT),
            name_display: fields.text(COMMUNE_TEXT),
            insee: fields.text(INSEE_TEXT),
            lon_mean: fields.i32(),
            lat_mean: fields.i32(),
            voie_start: fields.u32(),
            voie_end: fields.u32(),
            postal: fields.u32(),
        }
    }
}

/// The `Voie` struct is one row of the voie table: a street or lieu-dit under one commune, its
/// mean coordinate and a half-open slice into the localisation table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voie {
    /// Search key, from [`crate::normalize::uniform_adresse`].
    pub name_normalized: String,
    /// Display form, from [`crate::normalize::uniform`].
    pub name_display: String,
    /// Integer mean longitude over the voie's localisations.
    pub lon_mean: i32,
    /// Integer mean latitude over the voie's localisations.
    pub lat_mean: i32,
    /// First localisation row on this voie.
    pub loc_start: u32,
    /// One past the last localisation row.
    pub loc_end: u32,
    /// Row index of the owning commune.
    pub commune: u32,
}

impl FixedRecord for Voie {
    const SIZE: usize = VOIE_TEXT * 2 + 20;

    fn encode(&self, buf: &mut Vec<u8>) {
        put_text(buf, &self.name_normalized, VOIE_TEXT);
        put_text(buf, &self.name_display, VOIE_TEXT);
        buf.extend_from_slice(&self.lon_mean.to_le_bytes());
        buf.extend_from_slice(&self.lat_mean.to_le_bytes());
        buf.extend_from_slice(&self.loc_start.to_le_bytes());
        buf.extend_from_slice(&self.loc_end.to_le_bytes());
        buf.extend_from_slice(&self.commune.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            name_normalized: fields.text(VOIE_TEXT),
            name_display: fields.text(VOIE_TEXT),
            lon_mean: fields.i32(),
            lat_mean: fields.i32(),
            loc_start: fields.u32(),
            loc_end: fields.u32(),
            commune: fields.u32(),
        }
    }
}

/// The `Localisation` struct is one row of the localisation table: a single geocoded point, a
/// house number on a voie or the centroid of a lieu-dit (stored with number 0).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Localisation {
    /// House number; 0 for a lieu-dit entry.
    pub number: u32,
    /// Repetition suffix ("B", "T", ...), empty when absent.
    pub suffix: String,
    /// Fixed-point longitude.
    pub longitude: i32,
    /// Fixed-point latitude.
    pub latitude: i32,
    /// Row index of the owning voie.
    pub voie: u32,
}

impl FixedRecord for Localisation {
    const SIZE: usize = SUFFIX_TEXT + 16;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.number.to_le_bytes());
        put_text(buf, &self.suffix, SUFFIX_TEXT);
        buf.extend_from_slice(&self.longitude.to_le_bytes());
        buf.extend_from_slice(&self.latitude.to_le_bytes());
        buf.extend_from_slice(&self.voie.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            number: fields.u32(),
            suffix: fields.text(SUFFIX_TEXT),
            longitude: fields.i32(),
            latitude: fields.i32(),
            voie: fields.u32(),
        }
    }
}

/// Sort-index entries are bare row indices.
impl FixedRecord for u32 {
    const SIZE: usize = 4;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        u32::from_le_bytes(bytes[..4].try_into().unwrap())
    }
}

/// The `KdNode` struct is one node of the persisted 2-D k-d tree: the point, the tight
/// bounding box of its subtree, the split axis, child indices (-1 when absent) and the
/// localisation row it stands for.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct KdNode {
    /// Fixed-point longitude of the point.
    pub longitude: i32,
    /// Fixed-point latitude of the point.
    pub latitude: i32,
    /// Western edge of the subtree bounding box.
    pub min_lon: i32,
    /// Southern edge of the subtree bounding box.
    pub min_lat: i32,
    /// Eastern edge of the subtree bounding box.
    pub max_lon: i32,
    /// Northern edge of the subtree bounding box.
    pub max_lat: i32,
    /// Split axis: 0 for longitude, 1 for latitude.
    pub axis: u8,
    /// Index of the left child, -1 when absent.
    pub left: i32,
    /// Index of the right child, -1 when absent.
    pub right: i32,
    /// Row index into the localisation table.
    pub payload: u32,
}

impl FixedRecord for KdNode {
    const SIZE: usize = 37;

    fn encode(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.longitude.to_le_bytes());
        buf.extend_from_slice(&self.latitude.to_le_bytes());
        buf.extend_from_slice(&self.min_lon.to_le_bytes());
        buf.extend_from_slice(&self.min_lat.to_le_bytes());
        buf.extend_from_slice(&self.max_lon.to_le_bytes());
        buf.extend_from_slice(&self.max_lat.to_le_bytes());
        buf.push(self.axis);
        buf.extend_from_slice(&self.left.to_le_bytes());
        buf.extend_from_slice(&self.right.to_le_bytes());
        buf.extend_from_slice(&self.payload.to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Self {
        let mut fields = Fields::new(bytes);
        Self {
            longitude: fields.i32(),
            latitude: fields.i32(),
            min_lon: fields.i32(),
            min_lat: fields.i32(),
            max_lon: fields.i32(),
            max_lat: fields.i32(),
            axis: fields.u8(),
            left: fields.i32(),
            right: fields.i32(),
            payload: fields.u32(),
        }
    }
}
