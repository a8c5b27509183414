use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic position in signed decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// One earthquake event from the feed.
///
/// The `id` is assigned at construction and exists only to give observers a
/// stable identity for a record within one reload; it carries no meaning from
/// the source data. Everything else comes straight from the parsed line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earthquake {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub coordinates: Coordinates,
    pub depth_km: Option<f64>,
    pub magnitude: Option<f64>,
}

impl Earthquake {
    pub fn new(
        occurred_at: DateTime<Utc>,
        coordinates: Coordinates,
        depth_km: Option<f64>,
        magnitude: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            occurred_at,
            coordinates,
            depth_km,
            magnitude,
        }
    }
}

impl fmt::Display for Earthquake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.occurred_at.to_rfc3339(), self.coordinates)?;
        if let Some(depth) = self.depth_km {
            write!(f, " depth {depth} km")?;
        }
        if let Some(mag) = self.magnitude {
            write!(f, " M{mag:.1}")?;
        }
        Ok(())
    }
}
