//! Translation between [`Endpoint`] targets and registrar records
//!
//! | Type  | Endpoint target                      |
//! |-------|--------------------------------------|
//! | A     | destination                          |
//! | CNAME | destination, dot-terminated          |
//! | TXT   | destination, verbatim                |
//! | MX    | `<priority> <destination>`           |
//! | SRV   | `<priority> <weight> <port> <dest>`  |

use crate::endpoint::{
    to_fqdn, Endpoint, RecordType, ZoneRecord, PROP_RECORD_ID, PROP_RECORD_TYPE,
};
use crate::error::{Error, Result};

/// Parsed MX target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxTarget {
    pub priority: u16,
    pub destination: String,
}

impl MxTarget {
    pub fn parse(target: &str) -> Result<Self> {
        let fields: Vec<&str> = target.split_whitespace().collect();
        let [priority, destination] = fields.as_slice() else {
            return Err(Error::invalid_target(format!(
                "MX target '{}' must be '<priority> <destination>', got {} field(s)",
                target,
                fields.len()
            )));
        };
        Ok(Self {
            priority: parse_number("MX", "priority", target, priority)?,
            destination: destination.to_string(),
        })
    }

    pub fn format(&self) -> String {
        format!("{} {}", self.priority, self.destination)
    }
}

/// Parsed SRV target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub destination: String,
}

impl SrvTarget {
    pub fn parse(target: &str) -> Result<Self> {
        let fields: Vec<&str> = target.split_whitespace().collect();
        let [priority, weight, port, destination] = fields.as_slice() else {
            return Err(Error::invalid_target(format!(
                "SRV target '{}' must be '<priority> <weight> <port> <destination>', got {} field(s)",
                target,
                fields.len()
            )));
        };
        Ok(Self {
            priority: parse_number("SRV", "priority", target, priority)?,
            weight: parse_number("SRV", "weight", target, weight)?,
            port: parse_number("SRV", "port", target, port)?,
            destination: destination.to_string(),
        })
    }

    pub fn format(&self) -> String {
        format!(
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.destination
        )
    }
}

fn parse_number(kind: &str, field: &str, target: &str, raw: &str) -> Result<u16> {
    raw.parse().map_err(|_| {
        Error::invalid_target(format!(
            "{} target '{}': {} '{}' is not an integer in 0..=65535",
            kind, target, field, raw
        ))
    })
}

/// CNAME destinations that look like host names get a trailing dot
fn normalize_cname(destination: &str) -> String {
    if destination.contains('.') && !destination.ends_with('.') {
        format!("{}.", destination)
    } else {
        destination.to_string()
    }
}

fn require(field: Option<u16>, name: &str, record_type: RecordType, record: &ZoneRecord) -> Result<u16> {
    field.ok_or_else(|| {
        Error::decode(format!(
            "{} record {} has no {}",
            record_type, record.name, name
        ))
    })
}

/// Target string for a wire record
pub fn decode_target(record: &ZoneRecord, record_type: RecordType) -> Result<String> {
    Ok(match record_type {
        RecordType::A | RecordType::Txt => record.destination.clone(),
        RecordType::Cname => normalize_cname(&record.destination),
        RecordType::Mx => MxTarget {
            priority: require(record.priority, "priority", record_type, record)?,
            destination: record.destination.clone(),
        }
        .format(),
        RecordType::Srv => SrvTarget {
            priority: require(record.priority, "priority", record_type, record)?,
            weight: require(record.weight, "weight", record_type, record)?,
            port: require(record.port, "port", record_type, record)?,
            destination: record.destination.clone(),
        }
        .format(),
    })
}

/// Convert a wire record into an endpoint fragment
///
/// `ttl` is the configured default; the registrar has no TTL of its own.
pub fn decode(record: &ZoneRecord, record_type: RecordType, ttl: i64) -> Result<Endpoint> {
    let target = decode_target(record, record_type)?;
    let mut endpoint =
        Endpoint::new(to_fqdn(&record.name), record_type.as_str(), vec![target]).with_ttl(ttl);
    if let Some(id) = &record.id {
        endpoint.set_identifier = id.to_string();
        endpoint.set_property(PROP_RECORD_ID, id.as_str());
    }
    endpoint.set_property(PROP_RECORD_TYPE, record_type.as_str());
    Ok(endpoint)
}

/// Convert one endpoint target into a wire payload (without id)
pub fn encode(endpoint: &Endpoint, record_type: RecordType, target: &str) -> Result<ZoneRecord> {
    let name = to_fqdn(&endpoint.dns_name);
    Ok(match record_type {
        RecordType::A | RecordType::Txt => ZoneRecord::new(name, target),
        RecordType::Cname => ZoneRecord::new(name, normalize_cname(target)),
        RecordType::Mx => {
            let mx = MxTarget::parse(target)?;
            ZoneRecord::new(name, mx.destination).with_priority(mx.priority)
        }
        RecordType::Srv => {
            let srv = SrvTarget::parse(target)?;
            ZoneRecord::new(name, srv.destination).with_srv(srv.priority, srv.weight, srv.port)
        }
    })
}
