use super::{Bounds, RegionGeometry};

/// Fast-reject margin around the boundary's bounding box, degrees
pub const BBOX_MARGIN_DEG: f64 = 0.5;

/// "Is this coordinate inside the country" predicate.
///
/// Without geometry the mask fails open and admits every point, so rendering
/// is never blocked on the boundary load.
#[derive(Debug, Clone, Default)]
pub struct RegionMask {
    geometry: Option<RegionGeometry>,
    /// Bounding box already grown by the margin
    reject_box: Option<Bounds>,
}

impl RegionMask {
    /// Mask with no boundary yet (admits everything)
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(geometry: RegionGeometry) -> Self {
        Self::with_margin(geometry, BBOX_MARGIN_DEG)
    }

    pub fn with_margin(geometry: RegionGeometry, margin: f64) -> Self {
        let reject_box = geometry.bounds().map(|b| b.expanded(margin));
        Self {
            geometry: Some(geometry),
            reject_box,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.geometry.is_some()
    }

    pub fn geometry(&self) -> Option<&RegionGeometry> {
        self.geometry.as_ref()
    }

    /// Tight bounding box of the boundary
    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.as_ref().and_then(RegionGeometry::bounds)
    }

    pub fn inside_region(&self, lat: f64, lon: f64) -> bool {
        let Some(geometry) = &self.geometry else {
            return true;
        };
        match &self.reject_box {
            Some(b) if !b.contains(lat, lon) => false,
            _ => geometry.contains(lat, lon),
        }
    }

    /// True when the point passes the bounding-box stage
    pub fn passes_fast_reject(&self, lat: f64, lon: f64) -> bool {
        self.reject_box.map_or(true, |b| b.contains(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::{Polygon, Ring};

    fn square_mask(min: f64, max: f64) -> RegionMask {
        let ring = Ring::from_lon_lat(&[[min, min], [max, min], [max, max], [min, max]]);
        RegionMask::new(RegionGeometry::Polygon(Polygon::new(vec![ring])))
    }

    #[test]
    fn test_empty_mask_fails_open() {
        let mask = RegionMask::empty();
        assert!(!mask.is_loaded());
        assert!(mask.inside_region(89.0, -179.0));
    }

    #[test]
    fn test_inside_and_outside() {
        let mask = square_mask(100.0, 110.0);
        // lat/lon both inside [100, 110]
        assert!(mask.inside_region(105.0, 105.0));
        assert!(!mask.inside_region(105.0, 110.3));
    }

    #[test]
    fn test_repeated_calls_agree() {
        let mask = square_mask(0.0, 10.0);
        for &(lat, lon) in &[(5.0, 5.0), (10.2, 5.0), (50.0, 50.0)] {
            let first = mask.inside_region(lat, lon);
            for _ in 0..5 {
                assert_eq!(mask.inside_region(lat, lon), first);
            }
        }
    }

    #[test]
    fn test_fast_reject_only_outside_margin() {
        // A huge ring would contain everything if tested exactly, but a tight
        // reject box around a different ring proves the fast path decides.
        let huge = Ring::from_lon_lat(&[
            [-170.0, -80.0],
            [170.0, -80.0],
            [170.0, 80.0],
            [-170.0, 80.0],
        ]);
        let geometry = RegionGeometry::Polygon(Polygon::new(vec![huge]));
        let mut mask = RegionMask::new(geometry);
        mask.reject_box = Some(Bounds::new(0.0, 0.0, 10.0, 10.0).expanded(BBOX_MARGIN_DEG));

        assert!(!mask.inside_region(40.0, 40.0));
        assert!(!mask.passes_fast_reject(40.0, 40.0));
        // Within the margin the exact test still runs
        assert!(mask.inside_region(10.4, 10.4));
        assert!(mask.passes_fast_reject(-0.4, 5.0));
    }

    #[test]
    fn test_reject_box_includes_margin() {
        let mask = square_mask(0.0, 10.0);
        assert!(mask.passes_fast_reject(10.45, 5.0));
        assert!(!mask.passes_fast_reject(10.55, 5.0));
        // Inside margin but outside the ring
        assert!(!mask.inside_region(10.45, 5.0));
    }
}
