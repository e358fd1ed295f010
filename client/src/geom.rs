//! Planar helpers over map coordinates.

use isoline_shared::{Coord, Geometry, Ring};

pub fn distance_sq(a: Coord, b: Coord) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Squared distance from `p` to the segment `a`-`b`.
pub fn segment_distance_sq(p: Coord, a: Coord, b: Coord) -> f64 {
    let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance_sq(p, a);
    }
    let t = (((p[0] - a[0]) * dx + (p[1] - a[1]) * dy) / len_sq).clamp(0.0, 1.0);
    distance_sq(p, [a[0] + t * dx, a[1] + t * dy])
}

pub fn path_distance_sq(p: Coord, path: &[Coord]) -> f64 {
    match path {
        [] => f64::INFINITY,
        [only] => distance_sq(p, *only),
        _ => path
            .windows(2)
            .map(|w| segment_distance_sq(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Ring edges including the closing edge when the ring is left open.
pub fn ring_distance_sq(p: Coord, ring: &[Coord]) -> f64 {
    let open = path_distance_sq(p, ring);
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if first != last => {
            open.min(segment_distance_sq(p, *last, *first))
        }
        _ => open,
    }
}

/// Even-odd containment over all rings, so holes are excluded.
pub fn polygon_contains(rings: &[Ring], p: Coord) -> bool {
    let mut inside = false;
    for ring in rings {
        let n = ring.len();
        if n < 3 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[i], ring[j]);
            if (a[1] > p[1]) != (b[1] > p[1])
                && p[0] < (b[0] - a[0]) * (p[1] - a[1]) / (b[1] - a[1]) + a[0]
            {
                inside = !inside;
            }
            j = i;
        }
    }
    inside
}

pub fn ring_area(ring: &[Coord]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    let mut j = n - 1;
    for i in 0..n {
        twice += (ring[j][0] + ring[i][0]) * (ring[j][1] - ring[i][1]);
        j = i;
    }
    (twice / 2.0).abs()
}

pub fn path_length(path: &[Coord]) -> f64 {
    path.windows(2).map(|w| distance_sq(w[0], w[1]).sqrt()).sum()
}

/// Point halfway along a path.
pub fn path_midpoint(path: &[Coord]) -> Option<Coord> {
    let first = *path.first()?;
    let half = path_length(path) / 2.0;
    let mut walked = 0.0;
    for w in path.windows(2) {
        let seg = distance_sq(w[0], w[1]).sqrt();
        if seg > 0.0 && walked + seg >= half {
            let t = (half - walked) / seg;
            return Some([
                w[0][0] + t * (w[1][0] - w[0][0]),
                w[0][1] + t * (w[1][1] - w[0][1]),
            ]);
        }
        walked += seg;
    }
    Some(first)
}

/// A point inside the polygon: the middle of the widest interior span on the
/// horizontal line through the middle of the bounding box.
pub fn interior_point(rings: &[Ring]) -> Option<Coord> {
    let exterior = rings.first()?;
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);
    for c in exterior {
        min_y = min_y.min(c[1]);
        max_y = max_y.max(c[1]);
    }
    if !min_y.is_finite() {
        return None;
    }
    let y = (min_y + max_y) / 2.0;

    let mut crossings = Vec::new();
    for ring in rings {
        let n = ring.len();
        if n < 2 {
            continue;
        }
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (ring[j], ring[i]);
            if (a[1] <= y && b[1] > y) || (b[1] <= y && a[1] > y) {
                crossings.push((y - a[1]) / (b[1] - a[1]) * (b[0] - a[0]) + a[0]);
            }
            j = i;
        }
    }
    crossings.sort_by(f64::total_cmp);

    let mut best: Option<(f64, f64)> = None;
    for pair in crossings.chunks_exact(2) {
        let width = pair[1] - pair[0];
        if best.is_none_or(|(w, _)| width > w) {
            best = Some((width, (pair[0] + pair[1]) / 2.0));
        }
    }
    match best {
        Some((_, x)) => Some([x, y]),
        // Degenerate ring: fall back to the first vertex
        None => exterior.first().copied(),
    }
}

/// Anchor for a text label on the geometry.
pub fn label_anchor(geometry: &Geometry) -> Option<Coord> {
    match geometry {
        Geometry::Point(c) => Some(*c),
        Geometry::MultiPoint(cs) => cs.first().copied(),
        Geometry::LineString(path) => path_midpoint(path),
        Geometry::MultiLineString(lines) => lines
            .iter()
            .max_by(|a, b| path_length(a).total_cmp(&path_length(b)))
            .and_then(|l| path_midpoint(l)),
        Geometry::Polygon(rings) => interior_point(rings),
        Geometry::MultiPolygon(polys) => polys
            .iter()
            .max_by(|a, b| {
                let area = |rings: &Vec<Ring>| rings.first().map_or(0.0, |r| ring_area(r));
                area(a).total_cmp(&area(b))
            })
            .and_then(|rings| interior_point(rings)),
        Geometry::Collection(members) => members.iter().find_map(label_anchor),
    }
}
