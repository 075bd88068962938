//! Tracking data value objects.

use serde::{Deserialize, Serialize};

/// Placeholder substituted for any field the page did not render.
pub const MISSING_FIELD: &str = "N/A";

/// One row of the shipment's event history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub date: String,
    pub time: String,
    pub status: String,
    pub courier: String,
}

impl Default for TrackingEvent {
    fn default() -> Self {
        Self {
            date: MISSING_FIELD.to_string(),
            time: MISSING_FIELD.to_string(),
            status: MISSING_FIELD.to_string(),
            courier: MISSING_FIELD.to_string(),
        }
    }
}

/// Parcel summary sourced from the page's attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParcelInfo {
    pub tracking_number: String,
    pub origin: String,
    pub destination: String,
    pub courier: String,
    pub days_in_transit: String,
    pub tracking_link: String,
}

impl Default for ParcelInfo {
    fn default() -> Self {
        Self {
            tracking_number: MISSING_FIELD.to_string(),
            origin: MISSING_FIELD.to_string(),
            destination: MISSING_FIELD.to_string(),
            courier: MISSING_FIELD.to_string(),
            days_in_transit: MISSING_FIELD.to_string(),
            tracking_link: MISSING_FIELD.to_string(),
        }
    }
}

/// Success payload returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingReport {
    pub tracking_details: Vec<TrackingEvent>,
    pub parcel_info: ParcelInfo,
}
