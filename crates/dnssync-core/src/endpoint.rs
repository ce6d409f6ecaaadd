//! Generic and wire-level record model
//!
//! [`Endpoint`] and [`Changes`] mirror the JSON exchanged with external-dns.
//! [`ZoneRecord`] is the registrar-side shape a [`crate::RecordStore`] works with.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Provider property carrying the remote record id
pub const PROP_RECORD_ID: &str = "zoneee/record-id";

/// Provider property carrying the concrete remote record type
pub const PROP_RECORD_TYPE: &str = "zoneee/record-type";

/// Record types the adapter manages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    A,
    Cname,
    Txt,
    Mx,
    Srv,
}

impl RecordType {
    /// Every supported type, in listing order
    pub const ALL: [RecordType; 5] = [
        RecordType::A,
        RecordType::Cname,
        RecordType::Txt,
        RecordType::Mx,
        RecordType::Srv,
    ];

    /// Canonical upper-case name ("A", "CNAME", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Txt => "TXT",
            RecordType::Mx => "MX",
            RecordType::Srv => "SRV",
        }
    }

    /// Lower-case name used in registrar API paths
    pub fn path_segment(&self) -> &'static str {
        match self {
            RecordType::A => "a",
            RecordType::Cname => "cname",
            RecordType::Txt => "txt",
            RecordType::Mx => "mx",
            RecordType::Srv => "srv",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "CNAME" => Ok(RecordType::Cname),
            "TXT" => Ok(RecordType::Txt),
            "MX" => Ok(RecordType::Mx),
            "SRV" => Ok(RecordType::Srv),
            _ => Err(Error::unsupported_record_type(s)),
        }
    }
}

/// Validated remote record identifier (numeric text)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    /// The only place remote identifiers are validated
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::missing_identifier("record identifier is empty"));
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_identifier(format!(
                "'{}' is not a numeric record id",
                raw
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registrar-side record for one zone and one record type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecord {
    /// Remote id; absent on create/update payloads
    pub id: Option<RecordId>,
    /// Dot-terminated FQDN
    pub name: String,
    /// Host, address or text payload depending on the type
    pub destination: String,
    /// MX and SRV only
    pub priority: Option<u16>,
    /// SRV only
    pub weight: Option<u16>,
    /// SRV only
    pub port: Option<u16>,
}

impl ZoneRecord {
    /// A record with only a name and destination
    pub fn new(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            destination: destination.into(),
            priority: None,
            weight: None,
            port: None,
        }
    }

    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_srv(mut self, priority: u16, weight: u16, port: u16) -> Self {
        self.priority = Some(priority);
        self.weight = Some(weight);
        self.port = Some(port);
        self
    }
}

/// Provider-specific key/value pair carried on an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecificProperty {
    pub name: String,
    pub value: String,
}

/// Generic DNS record as exchanged with external-dns
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub dns_name: String,
    #[serde(default)]
    pub targets: Vec<String>,
    pub record_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,
    #[serde(rename = "recordTTL", default, skip_serializing_if = "is_unset_ttl")]
    pub record_ttl: i64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

fn is_unset_ttl(ttl: &i64) -> bool {
    *ttl <= 0
}

impl Endpoint {
    /// Create an endpoint with the given targets
    pub fn new(
        dns_name: impl Into<String>,
        record_type: impl Into<String>,
        targets: Vec<String>,
    ) -> Self {
        Self {
            dns_name: dns_name.into(),
            record_type: record_type.into(),
            targets,
            ..Self::default()
        }
    }

    pub fn with_set_identifier(mut self, id: impl Into<String>) -> Self {
        self.set_identifier = id.into();
        self
    }

    pub fn with_ttl(mut self, ttl: i64) -> Self {
        self.record_ttl = ttl;
        self
    }

    /// Set (or replace) a provider-specific property
    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.provider_specific.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.provider_specific.push(ProviderSpecificProperty {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.provider_specific
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }

    /// Parsed record type
    pub fn parsed_type(&self) -> Result<RecordType> {
        self.record_type.parse()
    }

    /// Remote identity: the id property wins over `set_identifier`
    pub fn record_id(&self) -> Result<RecordId> {
        let raw = self
            .property(PROP_RECORD_ID)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.set_identifier.as_str());
        if raw.trim().is_empty() {
            return Err(Error::missing_identifier(format!(
                "{} has no set identifier or {} property",
                self.identity(),
                PROP_RECORD_ID
            )));
        }
        RecordId::parse(raw)
    }

    /// Concrete remote type: the type property wins over `record_type`
    pub fn concrete_type(&self) -> Result<RecordType> {
        match self.property(PROP_RECORD_TYPE) {
            Some(t) if !t.trim().is_empty() => t.parse(),
            _ => self.parsed_type(),
        }
    }

    /// Short human identity used in logs and failure reports
    pub fn identity(&self) -> String {
        format!("{} {}", self.dns_name, self.record_type)
    }
}

/// Already-computed change set, as posted by external-dns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Changes {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub create: Vec<Endpoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub update_old: Vec<Endpoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub update_new: Vec<Endpoint>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub delete: Vec<Endpoint>,
}

// external-dns (Go) encodes empty slices as null
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Endpoint>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Endpoint>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Changes {
    /// `true` when there is nothing to apply
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update_new.is_empty() && self.delete.is_empty()
    }

    /// Update pairs as (old, new); old is `None` when the lists disagree in length
    pub fn updates(&self) -> impl Iterator<Item = (Option<&Endpoint>, &Endpoint)> {
        self.update_new
            .iter()
            .enumerate()
            .map(|(i, new)| (self.update_old.get(i), new))
    }
}

/// Capability answer for the webhook negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub can_adjust_endpoints: bool,
}

/// Append a trailing dot when missing
pub fn to_fqdn(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{}.", name)
    }
}

/// Strip exactly one trailing dot
pub fn trim_dot(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}
