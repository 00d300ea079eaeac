use super::coords::{LatLon, OsmLatLon, MAX_LONGITUDE, MIN_LONGITUDE};
use crate::errors::{Error, Result};

/// An immutable latitude/longitude rectangle.
///
/// Only the latitudes are ordered. A box whose minimum longitude is greater
/// than its maximum longitude wraps around the 180th meridian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    min: OsmLatLon,
    max: OsmLatLon,
}

impl BoundingBox {
    pub fn new(min: OsmLatLon, max: OsmLatLon) -> Result<Self> {
        if min.latitude() > max.latitude() {
            return Err(Error::validation(format!(
                "min latitude {} is greater than max latitude {}",
                min.latitude(),
                max.latitude()
            )));
        }
        Ok(BoundingBox { min, max })
    }

    pub fn from_bounds(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self> {
        BoundingBox::new(
            OsmLatLon::new(min_lat, min_lon)?,
            OsmLatLon::new(max_lat, max_lon)?,
        )
    }

    pub fn min(&self) -> OsmLatLon {
        self.min
    }

    pub fn max(&self) -> OsmLatLon {
        self.max
    }

    pub fn min_latitude(&self) -> f64 {
        self.min.latitude()
    }

    pub fn min_longitude(&self) -> f64 {
        self.min.longitude()
    }

    pub fn max_latitude(&self) -> f64 {
        self.max.latitude()
    }

    pub fn max_longitude(&self) -> f64 {
        self.max.longitude()
    }

    pub fn crosses_180th_meridian(&self) -> bool {
        self.min_longitude() > self.max_longitude()
    }

    /// Splits a box wrapping the 180th meridian into its western and eastern
    /// halves. Boxes that do not wrap come back unchanged.
    pub fn split_at_180th_meridian(&self) -> Vec<BoundingBox> {
        if !self.crosses_180th_meridian() {
            return vec![*self];
        }
        // Latitudes are already ordered and the longitudes are the limits, so
        // neither half can fail validation.
        vec![
            BoundingBox {
                min: self.min,
                max: OsmLatLon::new_unchecked(self.max_latitude(), MAX_LONGITUDE),
            },
            BoundingBox {
                min: OsmLatLon::new_unchecked(self.min_latitude(), MIN_LONGITUDE),
                max: self.max,
            },
        ]
    }

    pub fn contains(&self, pos: &impl LatLon) -> bool {
        let lat = pos.latitude();
        let lon = pos.longitude();
        if lat < self.min_latitude() || lat > self.max_latitude() {
            return false;
        }
        if self.crosses_180th_meridian() {
            lon >= self.min_longitude() || lon <= self.max_longitude()
        } else {
            lon >= self.min_longitude() && lon <= self.max_longitude()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    use proptest::prelude::*;

    use super::*;
    use crate::data::coords::{MAX_LATITUDE, MIN_LATITUDE};

    fn hash_of(bbox: &BoundingBox) -> u64 {
        let mut hasher = DefaultHasher::new();
        bbox.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_rejects_inverted_latitudes() {
        let err = BoundingBox::from_bounds(10.0, 0.0, 5.0, 1.0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_allows_inverted_longitudes() {
        let bbox = BoundingBox::from_bounds(0.0, 170.0, 10.0, -170.0).unwrap();
        assert!(bbox.crosses_180th_meridian());
    }

    #[test]
    fn test_split_non_crossing_is_identity() {
        let bbox = BoundingBox::from_bounds(-10.0, -20.0, 10.0, 20.0).unwrap();
        assert_eq!(bbox.split_at_180th_meridian(), vec![bbox]);

        let degenerate = BoundingBox::from_bounds(0.0, 5.0, 0.0, 5.0).unwrap();
        assert_eq!(degenerate.split_at_180th_meridian(), vec![degenerate]);
    }

    #[test]
    fn test_split_crossing() {
        let bbox = BoundingBox::from_bounds(-10.0, 170.0, 10.0, -170.0).unwrap();
        let parts = bbox.split_at_180th_meridian();
        assert_eq!(
            parts,
            vec![
                BoundingBox::from_bounds(-10.0, 170.0, 10.0, 180.0).unwrap(),
                BoundingBox::from_bounds(-10.0, -180.0, 10.0, -170.0).unwrap(),
            ]
        );
        for part in &parts {
            assert!(!part.crosses_180th_meridian());
            assert_ne!(*part, bbox);
        }
    }

    #[test]
    fn test_equality_uses_all_bounds() {
        let a = BoundingBox::from_bounds(1.0, 2.0, 3.0, 4.0).unwrap();
        let b = BoundingBox::from_bounds(1.0, 2.0, 3.0, 4.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
        assert_ne!(a, BoundingBox::from_bounds(1.0, 2.0, 3.0, 5.0).unwrap());
        assert_ne!(a, BoundingBox::from_bounds(0.0, 2.0, 3.0, 4.0).unwrap());
    }

    #[test]
    fn test_hash_depends_on_bound_positions() {
        let a = BoundingBox::from_bounds(10.0, 20.0, 30.0, 40.0).unwrap();
        let swapped_lat_lon = BoundingBox::from_bounds(20.0, 10.0, 40.0, 30.0).unwrap();
        let swapped_lons = BoundingBox::from_bounds(10.0, 40.0, 30.0, 20.0).unwrap();
        assert_ne!(hash_of(&a), hash_of(&swapped_lat_lon));
        assert_ne!(hash_of(&a), hash_of(&swapped_lons));
    }

    #[test]
    fn test_signed_zero_bounds_are_one_box() {
        let a = BoundingBox::from_bounds(0.0, 0.0, 1.0, 1.0).unwrap();
        let b = BoundingBox::from_bounds(-0.0, -0.0, 1.0, 1.0).unwrap();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let set: HashSet<_> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    fn ordered(a: f64, b: f64) -> (f64, f64) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    proptest! {
        #[test]
        fn prop_split_non_crossing_is_identity(
            lat_a in MIN_LATITUDE..=MAX_LATITUDE,
            lat_b in MIN_LATITUDE..=MAX_LATITUDE,
            lon_a in MIN_LONGITUDE..=MAX_LONGITUDE,
            lon_b in MIN_LONGITUDE..=MAX_LONGITUDE,
        ) {
            let (min_lat, max_lat) = ordered(lat_a, lat_b);
            let (min_lon, max_lon) = ordered(lon_a, lon_b);
            let bbox = BoundingBox::from_bounds(min_lat, min_lon, max_lat, max_lon).unwrap();
            prop_assert!(!bbox.crosses_180th_meridian());
            prop_assert_eq!(bbox.split_at_180th_meridian(), vec![bbox]);
        }

        #[test]
        fn prop_split_crossing_gives_two_halves(
            lat_a in MIN_LATITUDE..=MAX_LATITUDE,
            lat_b in MIN_LATITUDE..=MAX_LATITUDE,
            lon_a in MIN_LONGITUDE..=MAX_LONGITUDE,
            lon_b in MIN_LONGITUDE..=MAX_LONGITUDE,
        ) {
            prop_assume!(lon_a != lon_b);
            let (min_lat, max_lat) = ordered(lat_a, lat_b);
            let (max_lon, min_lon) = ordered(lon_a, lon_b);
            let bbox = BoundingBox::from_bounds(min_lat, min_lon, max_lat, max_lon).unwrap();
            prop_assert!(bbox.crosses_180th_meridian());

            let parts = bbox.split_at_180th_meridian();
            for part in &parts {
                prop_assert!(!part.crosses_180th_meridian());
            }
            prop_assert_eq!(
                parts,
                vec![
                    BoundingBox::from_bounds(min_lat, min_lon, max_lat, MAX_LONGITUDE).unwrap(),
                    BoundingBox::from_bounds(min_lat, MIN_LONGITUDE, max_lat, max_lon).unwrap(),
                ]
            );
        }
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox::from_bounds(0.0, 0.0, 10.0, 10.0).unwrap();
        assert!(bbox.contains(&OsmLatLon::new(5.0, 5.0).unwrap()));
        assert!(!bbox.contains(&OsmLatLon::new(5.0, 11.0).unwrap()));

        let wrapping = BoundingBox::from_bounds(0.0, 170.0, 10.0, -170.0).unwrap();
        assert!(wrapping.contains(&OsmLatLon::new(5.0, 179.0).unwrap()));
        assert!(wrapping.contains(&OsmLatLon::new(5.0, -175.0).unwrap()));
        assert!(!wrapping.contains(&OsmLatLon::new(5.0, 0.0).unwrap()));
    }
}
