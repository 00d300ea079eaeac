use std::hash::{Hash, Hasher};

use crate::errors::{Error, Result};

pub const MIN_LATITUDE: f64 = -90.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MIN_LONGITUDE: f64 = -180.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Number of decimal places the server stores coordinates with.
const FIXED_SCALE: f64 = 1e7;

/// A position on the globe in degrees.
pub trait LatLon {
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

/// Converts degrees to the 7-decimal fixed-point representation.
/// Halves are rounded away from zero.
pub fn to_fixed(value: f64) -> i32 {
    (value * FIXED_SCALE).round() as i32
}

pub fn to_double(value: i32) -> f64 {
    value as f64 / FIXED_SCALE
}

fn check_latitude(lat: f64) -> Result<()> {
    if (MIN_LATITUDE..=MAX_LATITUDE).contains(&lat) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "latitude {lat} is not in [{MIN_LATITUDE}, {MAX_LATITUDE}]"
        )))
    }
}

fn check_longitude(lon: f64) -> Result<()> {
    if (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&lon) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "longitude {lon} is not in [{MIN_LONGITUDE}, {MAX_LONGITUDE}]"
        )))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OsmLatLon {
    lat: f64,
    lon: f64,
}

impl OsmLatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        check_latitude(lat)?;
        check_longitude(lon)?;
        Ok(OsmLatLon { lat, lon })
    }

    /// Caller guarantees both components are in range.
    pub(crate) fn new_unchecked(lat: f64, lon: f64) -> Self {
        OsmLatLon { lat, lon }
    }

    pub fn from_lat_lon(other: &impl LatLon) -> Result<Self> {
        OsmLatLon::new(other.latitude(), other.longitude())
    }
}

impl LatLon for OsmLatLon {
    fn latitude(&self) -> f64 {
        self.lat
    }

    fn longitude(&self) -> f64 {
        self.lon
    }
}

impl Hash for OsmLatLon {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // `-0.0 + 0.0` is `0.0`, so both zeros hash alike, as `eq` treats them.
        (self.lat + 0.0).to_bits().hash(state);
        (self.lon + 0.0).to_bits().hash(state);
    }
}

impl Eq for OsmLatLon {}

impl PartialEq for OsmLatLon {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

/// Stores both components as `degrees * 10^7`, trading a division on every
/// read for half the memory of [`OsmLatLon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedLatLon {
    lat: i32,
    lon: i32,
}

impl FixedLatLon {
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        check_latitude(lat)?;
        check_longitude(lon)?;
        Ok(FixedLatLon {
            lat: to_fixed(lat),
            lon: to_fixed(lon),
        })
    }

    pub fn fixed_latitude(&self) -> i32 {
        self.lat
    }

    pub fn fixed_longitude(&self) -> i32 {
        self.lon
    }
}

impl LatLon for FixedLatLon {
    fn latitude(&self) -> f64 {
        to_double(self.lat)
    }

    fn longitude(&self) -> f64 {
        to_double(self.lon)
    }
}

impl PartialEq<FixedLatLon> for OsmLatLon {
    fn eq(&self, other: &FixedLatLon) -> bool {
        self.latitude() == other.latitude() && self.longitude() == other.longitude()
    }
}

impl PartialEq<OsmLatLon> for FixedLatLon {
    fn eq(&self, other: &OsmLatLon) -> bool {
        other == self
    }
}

impl From<FixedLatLon> for OsmLatLon {
    fn from(value: FixedLatLon) -> Self {
        OsmLatLon::new_unchecked(value.latitude(), value.longitude())
    }
}
