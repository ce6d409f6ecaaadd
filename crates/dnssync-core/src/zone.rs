//! Zone ownership resolution
//!
//! Maps a fully-qualified name to the configured zone that owns it. The
//! longest matching suffix wins, so a managed zone may itself be a subdomain
//! of another managed zone.

use std::fmt;

use crate::endpoint::trim_dot;
use crate::error::{Error, Result};

/// A managed zone, stored without its trailing dot
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Zone(String);

impl Zone {
    pub fn new(name: &str) -> Self {
        Self(trim_dot(name.trim()).to_ascii_lowercase())
    }

    /// Name without a trailing dot, as used in registrar API paths
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Dot-terminated form
    pub fn fqdn(&self) -> String {
        format!("{}.", self.0)
    }

    /// Whether `name` equals this zone or lies beneath it
    pub fn contains(&self, name: &str) -> bool {
        let name = trim_dot(name);
        if name.len() < self.0.len() {
            return false;
        }
        let split = name.len() - self.0.len();
        if !name.is_char_boundary(split) || !name[split..].eq_ignore_ascii_case(&self.0) {
            return false;
        }
        split == 0 || name.as_bytes()[split - 1] == b'.'
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolves names against an immutable set of configured zones
#[derive(Debug, Clone)]
pub struct ZoneResolver {
    zones: Vec<Zone>,
}

impl ZoneResolver {
    /// Build a resolver; duplicate zones collapse into one
    pub fn new<S: AsRef<str>>(zones: &[S]) -> Self {
        let mut zones: Vec<Zone> = zones
            .iter()
            .map(|z| Zone::new(z.as_ref()))
            .filter(|z| !z.name().is_empty())
            .collect();
        zones.sort();
        zones.dedup();
        Self { zones }
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Longest configured zone containing `name`, without any fallback
    pub fn matching_zone(&self, name: &str) -> Option<&Zone> {
        self.zones
            .iter()
            .filter(|zone| zone.contains(name))
            .max_by_key(|zone| zone.name().len())
    }

    /// Zone owning `name`
    ///
    /// When nothing matches and exactly one zone is configured, that zone is
    /// returned: single-zone deployments route every name to their zone.
    pub fn resolve(&self, name: &str) -> Result<&Zone> {
        if let Some(zone) = self.matching_zone(name) {
            return Ok(zone);
        }
        if let [only] = self.zones.as_slice() {
            tracing::debug!("No zone suffix matches {}, falling back to {}", name, only);
            return Ok(only);
        }
        Err(Error::zone_not_found(name))
    }
}
