//! Datetime aliases shared by entities and services

use chrono::{DateTime as ChronoDateTime, Utc};

/// Database DateTime type used for every TIMESTAMPTZ column
/// (`created_at`, `updated_at`, `deleted_at`, `applied_at`, ...)
pub type DBDateTime = ChronoDateTime<Utc>;

/// UTC DateTime used in service-level structs and summaries
pub type UtcDateTime = ChronoDateTime<Utc>;
