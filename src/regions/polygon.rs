use super::{Bounds, Point};
use serde::{Deserialize, Serialize};

/// Added to the edge denominator so horizontal edges never divide by zero
const EDGE_EPSILON: f64 = 1e-12;

/// A closed ring of (lon, lat) vertices. The closing edge is implicit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub vertices: Vec<Point>,
}

impl Ring {
    pub fn from_vertices(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Build from `[lon, lat]` pairs, dropping a repeated closing vertex
    pub fn from_lon_lat(coords: &[[f64; 2]]) -> Self {
        let mut vertices: Vec<Point> = coords.iter().map(|c| Point::new(c[0], c[1])).collect();
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }
        Self { vertices }
    }

    pub fn is_closed(&self) -> bool {
        self.vertices.len() >= 3
    }

    /// Point-in-ring test using ray casting along +lon
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        if !self.is_closed() {
            return false;
        }

        let mut inside = false;
        let n = self.vertices.len();

        let mut j = n - 1;
        for i in 0..n {
            let vi = &self.vertices[i];
            let vj = &self.vertices[j];

            if (vi.lat > lat) != (vj.lat > lat) {
                let x_cross =
                    (vj.lon - vi.lon) * (lat - vi.lat) / (vj.lat - vi.lat + EDGE_EPSILON) + vi.lon;
                if lon < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }

        inside
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.vertices)
    }

    /// Get edges as vertex pairs, including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = (&Point, &Point)> {
        let n = self.vertices.len();
        (0..n).map(move |i| (&self.vertices[i], &self.vertices[(i + 1) % n]))
    }
}

/// Outer boundary plus holes. Ring 0 is the outer boundary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    pub fn outer(&self) -> Option<&Ring> {
        self.rings.first()
    }

    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }

    /// Inside the outer ring and inside no hole
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.contains_exterior(lat, lon) && !self.holes().iter().any(|h| h.contains(lat, lon))
    }

    /// Inside the outer ring, holes ignored
    pub fn contains_exterior(&self, lat: f64, lon: f64) -> bool {
        self.outer().is_some_and(|r| r.contains(lat, lon))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.outer().and_then(Ring::bounds)
    }
}
