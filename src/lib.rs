//! parceltrack - shipment tracking acquisition via stealth browser automation.
//!
//! Fetches shipment-tracking pages through a detection-resistant Chromium
//! session and converts the rendered page into structured tracking data:
//! an ordered list of tracking events plus a parcel summary.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod scrape;
pub mod server;
