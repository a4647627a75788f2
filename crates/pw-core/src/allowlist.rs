//! # Pingback Origin Allowlist
//!
//! Decides whether a pingback's source address belongs to the gateway.
//! IPv4 only; no DNS resolution.

use crate::error::{GatewayError, GatewayResult};
use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};

/// First address of the gateway's pingback subnet
pub const GATEWAY_RANGE_START: Ipv4Addr = Ipv4Addr::new(216, 127, 71, 0);

/// Last address of the gateway's pingback subnet
pub const GATEWAY_RANGE_END: Ipv4Addr = Ipv4Addr::new(216, 127, 71, 255);

/// Individual hosts used by the previous generation of the pingback service
pub const LEGACY_GATEWAY_HOSTS: &[Ipv4Addr] = &[
    Ipv4Addr::new(174, 36, 92, 186),
    Ipv4Addr::new(174, 36, 96, 66),
    Ipv4Addr::new(174, 36, 92, 187),
    Ipv4Addr::new(174, 36, 92, 192),
    Ipv4Addr::new(174, 37, 14, 28),
];

/// Allowlist policy, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpAllowlist {
    /// Inclusive IPv4 range
    Range { start: Ipv4Addr, end: Ipv4Addr },
    /// Exact-match set of addresses
    Exact(BTreeSet<Ipv4Addr>),
}

impl IpAllowlist {
    /// Inclusive range policy
    pub fn range(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        IpAllowlist::Range { start, end }
    }

    /// Exact-match policy
    pub fn exact(addresses: impl IntoIterator<Item = Ipv4Addr>) -> Self {
        IpAllowlist::Exact(addresses.into_iter().collect())
    }

    /// The gateway's current pingback subnet, `216.127.71.0`–`216.127.71.255`
    pub fn gateway_default() -> Self {
        Self::range(GATEWAY_RANGE_START, GATEWAY_RANGE_END)
    }

    /// The previous generation's fixed host list
    pub fn legacy_gateway_hosts() -> Self {
        Self::exact(LEGACY_GATEWAY_HOSTS.iter().copied())
    }

    /// Parse a configuration value.
    ///
    /// `a.b.c.d-e.f.g.h` gives a range; `a.b.c.d,e.f.g.h,...` gives an exact set.
    pub fn parse(value: &str) -> GatewayResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(GatewayError::Configuration(
                "IP allowlist must not be empty".to_string(),
            ));
        }

        if let Some((start, end)) = value.split_once('-') {
            return Ok(Self::range(parse_ipv4(start)?, parse_ipv4(end)?));
        }

        let addresses = value
            .split(',')
            .map(parse_ipv4)
            .collect::<GatewayResult<BTreeSet<_>>>()?;
        Ok(IpAllowlist::Exact(addresses))
    }

    /// Check a textual source address.
    ///
    /// Unparseable and non-IPv4 addresses are rejected. IPv4-mapped IPv6
    /// addresses (`::ffff:a.b.c.d`) are treated as their IPv4 form.
    pub fn is_allowed(&self, address: &str) -> bool {
        address
            .trim()
            .parse::<IpAddr>()
            .map(|ip| self.is_allowed_addr(ip))
            .unwrap_or(false)
    }

    /// Check a parsed source address
    pub fn is_allowed_addr(&self, address: IpAddr) -> bool {
        let ip = match address {
            IpAddr::V4(ip) => ip,
            IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
                Some(ip) => ip,
                None => return false,
            },
        };

        match self {
            IpAllowlist::Range { start, end } => {
                let value = u32::from(ip);
                u32::from(*start) <= value && value <= u32::from(*end)
            }
            IpAllowlist::Exact(addresses) => addresses.contains(&ip),
        }
    }
}

impl Default for IpAllowlist {
    fn default() -> Self {
        Self::gateway_default()
    }
}

fn parse_ipv4(value: &str) -> GatewayResult<Ipv4Addr> {
    value
        .trim()
        .parse()
        .map_err(|_| GatewayError::InvalidAddress {
            address: value.trim().to_string(),
        })
}
