//! Workplace and floor directory.
mod repository;
mod seed;

pub use repository::*;
pub use seed::*;

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

static HOSTNAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^TSS-WS-(\d+)").ok());

/// Addresses whose floor is known.
const KNOWN_ADDRESSES: &[(&str, i64)] = &[
    ("172.20.30.107", 2),
    ("172.20.30.110", 2),
    ("172.20.30.132", 2),
    ("172.20.30.36", 4),
    ("172.20.30.48", 4),
    ("172.20.31.1", 5),
    ("172.20.31.27", 5),
];
const FIFTH_FLOOR_SUBNET: &str = "172.20.31.";

/// Workplace as saved on database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Workplace {
    pub id: i64,
    pub number: String,
    pub department: String,
    pub location: String,
    pub floor: Option<i64>,
    pub primary_pc: Option<String>,
    pub peripherals: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewWorkplace {
    #[validate(length(min = 1, max = 20, message = "Number must be 1 to 20 characters long."))]
    pub number: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub department: String,
    #[serde(default)]
    #[validate(length(max = 100))]
    pub location: String,
    pub floor: Option<i64>,
    pub primary_pc: Option<String>,
    pub peripherals: Option<String>,
}

/// Guess a floor from a `TSS-WS-<digits>` hostname, case insensitive.
///
/// Hosts numbered `5xxx` sit on floor 5, `2xxx` on floor 2, other
/// workstations on floor 4. `None` for anything that is not a workstation.
pub fn floor_from_hostname(hostname: &str) -> Option<i64> {
    let hostname = hostname.trim().to_uppercase();
    let caps = HOSTNAME.as_ref()?.captures(&hostname)?;
    let digits = caps.get(1)?.as_str();

    Some(match digits {
        d if d.starts_with('5') => 5,
        d if d.starts_with('2') => 2,
        _ => 4,
    })
}

/// Guess a floor from the machine address, falling back to its hostname.
pub fn floor_from_ip(ip: &str, hostname: Option<&str>) -> Option<i64> {
    let ip = ip.trim();

    if let Some((_, floor)) = KNOWN_ADDRESSES.iter().find(|(addr, _)| *addr == ip) {
        return Some(*floor);
    }

    if ip.starts_with(FIFTH_FLOOR_SUBNET) {
        return Some(5);
    }

    hostname.and_then(floor_from_hostname)
}
