//! The `kdtree` module builds, persists and queries the 2-D k-d tree used for reverse search.
//!
//! Construction partitions on the median of the split axis, alternating axes with depth, which
//! keeps sibling subtrees within one node of each other in size and bounds the query depth.
//! Nodes land in the output array in pre-order, root first, so the serialized tree needs no
//! separate header.
use crate::record::{KdNode, Localisation};
use crate::store::Table;

/// One point under construction: fixed-point coordinates and the localisation row index.
type Point = (i32, i32, u32);

/// The `build` function constructs a balanced k-d tree over every localisation row. The seed
/// ordering (argsort by longitude, then row index) makes tie-breaking deterministic when many
/// points share an axis value.
pub fn build(localisations: &[Localisation]) -> Vec<KdNode> {
    let mut points = localisations
        .iter()
        .enumerate()
        .map(|(row, loc)| (loc.longitude, loc.latitude, row as u32))
        .collect::<Vec<Point>>();
    points.sort_by_key(|&(lon, _, payload)| (lon, payload));
    let mut nodes = Vec::with_capacity(points.len());
    build_node(&mut nodes, &mut points, 0);
    nodes
}

/// Emits the subtree over `points` in pre-order and returns its root index, -1 when empty.
fn build_node(nodes: &mut Vec<KdNode>, points: &mut [Point], depth: usize) -> i32 {
    if points.is_empty() {
        return -1;
    }
    let axis = (depth % 2) as u8;
    if axis == 0 {
        points.sort_by_key(|&(lon, _, payload)| (lon, payload));
    } else {
        points.sort_by_key(|&(_, lat, payload)| (lat, payload));
    }
    let median = points.len() / 2;
    let (longitude, latitude, payload) = points[median];
    let index = nodes.len();
    nodes.push(KdNode::new(
        longitude, latitude, longitude, latitude, longitude, latitude, axis, -1, -1, payload,
    ));

    let (below, rest) = points.split_at_mut(median);
    let above = &mut rest[1..];
    let left = build_node(nodes, below, depth + 1);
    let right = build_node(nodes, above, depth + 1);
    nodes[index].left = left;
    nodes[index].right = right;

    // Tighten the bounding box over both subtrees.
    for child in [left, right] {
        if child >= 0 {
            let (min_lon, min_lat, max_lon, max_lat) = {
                let node = &nodes[child as usize];
                (node.min_lon, node.min_lat, node.max_lon, node.max_lat)
            };
            let node = &mut nodes[index];
            node.min_lon = node.min_lon.min(min_lon);
            node.min_lat = node.min_lat.min(min_lat);
            node.max_lon = node.max_lon.max(max_lon);
            node.max_lat = node.max_lat.max(max_lat);
        }
    }
    index as i32
}

/// The `Neighbor` struct is the result of a nearest-neighbor query: the stored point and the
/// localisation row it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    /// Row index into the localisation table.
    pub payload: u32,
    /// Fixed-point longitude of the stored point.
    pub longitude: i32,
    /// Fixed-point latitude of the stored point.
    pub latitude: i32,
}

/// The `nearest` function finds the localisation closest to a query point, by squared
/// Euclidean distance in fixed-point space. Ties go to the smaller row index. Returns `None`
/// only for an empty tree.
pub fn nearest(tree: &Table<KdNode>, longitude: i32, latitude: i32) -> Option<Neighbor> {
    if tree.is_empty() {
        return None;
    }
    let mut best: Option<(i64, Neighbor)> = None;
    descend(tree, 0, longitude, latitude, &mut best);
    best.map(|(_, neighbor)| neighbor)
}

fn descend(
    tree: &Table<KdNode>,
    index: i32,
    longitude: i32,
    latitude: i32,
    best: &mut Option<(i64, Neighbor)>,
) {
    if index < 0 {
        return;
    }
    let node = tree.get(index as usize);
    let distance = squared_distance(longitude, latitude, node.longitude, node.latitude);
    let better = match best {
        None => true,
        Some((best_distance, neighbor)) => {
            distance < *best_distance
                || (distance == *best_distance && node.payload < neighbor.payload)
        }
    };
    if better {
        *best = Some((
            distance,
            Neighbor {
                payload: node.payload,
                longitude: node.longitude,
                latitude: node.latitude,
            },
        ));
    }

    let towards_left = if node.axis == 0 {
        longitude <= node.longitude
    } else {
        latitude <= node.latitude
    };
    let (near, far) = if towards_left {
        (node.left, node.right)
    } else {
        (node.right, node.left)
    };
    descend(tree, near, longitude, latitude, best);
    if far >= 0 {
        let bound = bounding_box_distance(&tree.get(far as usize), longitude, latitude);
        if best.as_ref().is_none_or(|(best_distance, _)| bound <= *best_distance) {
            descend(tree, far, longitude, latitude, best);
        }
    }
}

/// Squared Euclidean distance between two fixed-point points. Differences are widened to i64
/// first; a query point may lie far outside French bounds.
fn squared_distance(lon_a: i32, lat_a: i32, lon_b: i32, lat_b: i32) -> i64 {
    let dlon = lon_a as i64 - lon_b as i64;
    let dlat = lat_a as i64 - lat_b as i64;
    dlon * dlon + dlat * dlat
}

/// Squared distance from a query point to the nearest edge of a node's bounding box, zero
/// when the point lies inside.
fn bounding_box_distance(node: &KdNode, longitude: i32, latitude: i32) -> i64 {
    let dlon = if longitude < node.min_lon {
        node.min_lon as i64 - longitude as i64
    } else if longitude > node.max_lon {
        longitude as i64 - node.max_lon as i64
    } else {
        0
    };
    let dlat = if latitude < node.min_lat {
        node.min_lat as i64 - latitude as i64
    } else if latitude > node.max_lat {
        latitude as i64 - node.max_lat as i64
    } else {
        0
    };
    dlon * dlon + dlat * dlat
}
