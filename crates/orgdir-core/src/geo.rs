//! Great-circle distance and the radius / box queries built on it.
//!
//! Both queries work over any candidate set implementing [`Located`]. The
//! database layer narrows candidates with [`GeoQuery::candidate_box`] before
//! handing them over; the in-memory backend passes everything.

use std::f64::consts::FRAC_PI_2;

use serde::Serialize;

use crate::error::{check_limit, invalid};
use crate::Result;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude used by the prefilter rectangle.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Floor for `|cos(lat)|` so the longitude span stays finite near the poles.
const MIN_COS_LAT: f64 = 0.01;

pub const DEFAULT_GEO_LIMIT: usize = 200;
pub const MAX_GEO_LIMIT: usize = 500;

/// An entity with a stable id and a position in degrees.
pub trait Located {
    fn id(&self) -> i64;
    fn latitude(&self) -> f64;
    fn longitude(&self) -> f64;
}

impl<T: Located + ?Sized> Located for &T {
    fn id(&self) -> i64 {
        (**self).id()
    }

    fn latitude(&self) -> f64 {
        (**self).latitude()
    }

    fn longitude(&self) -> f64 {
        (**self).longitude()
    }
}

/// Haversine distance in meters between two points given in degrees.
#[must_use]
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // rounding can push `a` a hair outside [0, 1] for antipodal points
    let a = a.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Inclusive latitude/longitude rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Rectangle containing every point within `radius_m` of the center.
    ///
    /// The spans use 111,320 m/degree with the cosine floor, widened to the
    /// exact spherical extent where that is larger. The longitude span covers
    /// the whole globe when the circle reaches a pole or crosses the
    /// antimeridian, since a clamped rectangle would miss the wrapped side.
    #[must_use]
    pub fn around(lat: f64, lon: f64, radius_m: f64) -> Self {
        let angular = radius_m / EARTH_RADIUS_M;

        let lat_delta = (radius_m / METERS_PER_DEGREE_LAT).max(angular.to_degrees());
        let min_lat = (lat - lat_delta).max(-90.0);
        let max_lat = (lat + lat_delta).min(90.0);

        let cos_lat = lat.to_radians().cos().abs();
        let mut lon_delta = radius_m / (METERS_PER_DEGREE_LAT * cos_lat.max(MIN_COS_LAT));
        let reaches_pole = max_lat >= 90.0 || min_lat <= -90.0 || angular >= FRAC_PI_2;
        if !reaches_pole && angular.sin() < cos_lat {
            lon_delta = lon_delta.max((angular.sin() / cos_lat).asin().to_degrees());
        }

        let (min_lon, max_lon) =
            if reaches_pole || lon - lon_delta < -180.0 || lon + lon_delta > 180.0 {
                (-180.0, 180.0)
            } else {
                (lon - lon_delta, lon + lon_delta)
            };

        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    #[must_use]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// See [`BoundingBox::around`].
#[must_use]
pub fn bounding_box(lat: f64, lon: f64, radius_m: f64) -> BoundingBox {
    BoundingBox::around(lat, lon, radius_m)
}

/// Rejects NaN and values outside `[-90, 90]` / `[-180, 180]`.
///
/// # Errors
///
/// Returns `InvalidParameter` naming the offending coordinate.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(invalid(format!("lat must be between -90 and 90, got {lat}")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(invalid(format!(
            "lon must be between -180 and 180, got {lon}"
        )));
    }
    Ok(())
}

/// A match from a geo query. `distance_m` is only set in radius mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoMatch<T> {
    #[serde(flatten)]
    pub item: T,
    pub distance_m: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusQuery {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub radius_m: Option<f64>,
    pub limit: usize,
}

impl RadiusQuery {
    #[must_use]
    pub fn new(lat: f64, lon: f64, radius_m: f64) -> Self {
        Self {
            lat: Some(lat),
            lon: Some(lon),
            radius_m: Some(radius_m),
            limit: DEFAULT_GEO_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Returns `(lat, lon, radius_m)` once every parameter checks out.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a missing center, a missing or non-positive
    /// radius, out-of-range coordinates, or a limit outside `1..=500`.
    pub fn validate(&self) -> Result<(f64, f64, f64)> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(invalid("lat and lon must be provided for radius mode"));
        };
        let radius_m = match self.radius_m {
            Some(r) if r.is_finite() && r > 0.0 => r,
            _ => return Err(invalid("radius_m must be provided and > 0 for radius mode")),
        };
        validate_coordinates(lat, lon)?;
        check_limit(self.limit, MAX_GEO_LIMIT)?;
        Ok((lat, lon, radius_m))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxQuery {
    pub min_lat: Option<f64>,
    pub max_lat: Option<f64>,
    pub min_lon: Option<f64>,
    pub max_lon: Option<f64>,
    pub limit: usize,
}

impl BoxQuery {
    #[must_use]
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat: Some(min_lat),
            max_lat: Some(max_lat),
            min_lon: Some(min_lon),
            max_lon: Some(max_lon),
            limit: DEFAULT_GEO_LIMIT,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// # Errors
    ///
    /// `InvalidParameter` when a bound is missing, out of range, or a
    /// minimum exceeds its maximum, or when the limit is outside `1..=500`.
    pub fn validate(&self) -> Result<BoundingBox> {
        let (Some(min_lat), Some(max_lat), Some(min_lon), Some(max_lon)) =
            (self.min_lat, self.max_lat, self.min_lon, self.max_lon)
        else {
            return Err(invalid(
                "min_lat, max_lat, min_lon, max_lon must be provided for bbox mode",
            ));
        };
        validate_coordinates(min_lat, min_lon)?;
        validate_coordinates(max_lat, max_lon)?;
        if min_lat > max_lat {
            return Err(invalid("min_lat must be <= max_lat"));
        }
        if min_lon > max_lon {
            return Err(invalid("min_lon must be <= max_lon"));
        }
        check_limit(self.limit, MAX_GEO_LIMIT)?;
        Ok(BoundingBox {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }
}

/// Candidates within `radius_m` of the center, nearest first.
///
/// Ties in distance are broken by ascending id.
///
/// # Errors
///
/// Returns `InvalidParameter` if the query fails [`RadiusQuery::validate`].
pub fn query_radius<T, I>(candidates: I, query: &RadiusQuery) -> Result<Vec<GeoMatch<T>>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let (lat, lon, radius_m) = query.validate()?;
    let prefilter = BoundingBox::around(lat, lon, radius_m);

    let mut matches: Vec<GeoMatch<T>> = candidates
        .into_iter()
        .filter(|c| prefilter.contains(c.latitude(), c.longitude()))
        .filter_map(|c| {
            let d = haversine_meters(lat, lon, c.latitude(), c.longitude());
            (d <= radius_m).then_some(GeoMatch {
                item: c,
                distance_m: Some(d),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        let da = a.distance_m.unwrap_or(0.0);
        let db = b.distance_m.unwrap_or(0.0);
        da.total_cmp(&db).then_with(|| a.item.id().cmp(&b.item.id()))
    });
    matches.truncate(query.limit);
    Ok(matches)
}

/// Candidates inside the inclusive rectangle, ordered by id, without distance.
///
/// # Errors
///
/// Returns `InvalidParameter` if the query fails [`BoxQuery::validate`].
pub fn query_box<T, I>(candidates: I, query: &BoxQuery) -> Result<Vec<GeoMatch<T>>>
where
    T: Located,
    I: IntoIterator<Item = T>,
{
    let rect = query.validate()?;

    let mut matches: Vec<GeoMatch<T>> = candidates
        .into_iter()
        .filter(|c| rect.contains(c.latitude(), c.longitude()))
        .map(|c| GeoMatch {
            item: c,
            distance_m: None,
        })
        .collect();

    matches.sort_by_key(|m| m.item.id());
    matches.truncate(query.limit);
    Ok(matches)
}

/// Radius or box mode, as chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoQuery {
    Radius(RadiusQuery),
    BBox(BoxQuery),
}

impl GeoQuery {
    #[must_use]
    pub fn limit(&self) -> usize {
        match self {
            GeoQuery::Radius(q) => q.limit,
            GeoQuery::BBox(q) => q.limit,
        }
    }

    /// Validates the query and returns the rectangle every match lies in.
    ///
    /// # Errors
    ///
    /// Returns `InvalidParameter` for invalid input in either mode.
    pub fn candidate_box(&self) -> Result<BoundingBox> {
        match self {
            GeoQuery::Radius(q) => {
                let (lat, lon, radius_m) = q.validate()?;
                Ok(BoundingBox::around(lat, lon, radius_m))
            }
            GeoQuery::BBox(q) => q.validate(),
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidParameter` for invalid input in either mode.
    pub fn run<T, I>(&self, candidates: I) -> Result<Vec<GeoMatch<T>>>
    where
        T: Located,
        I: IntoIterator<Item = T>,
    {
        match self {
            GeoQuery::Radius(q) => query_radius(candidates, q),
            GeoQuery::BBox(q) => query_box(candidates, q),
        }
    }
}
