//! shopscan - storefront directory crawler and integration fingerprint prober.
//!
//! Crawls a paginated storefront directory for domains in one zone, then
//! probes candidate storefronts for third-party integration fingerprints,
//! streaming every result to append-only CSV files as it is found.

pub mod config;
pub mod directory;
pub mod http;
pub mod pipeline;
pub mod signals;
pub mod sink;
