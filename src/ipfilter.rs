//! IP address filtering against network ranges.
//!
//! `ips_in_ranges` is called from a templating/expression context, so its
//! arguments arrive as loosely-typed JSON values and are validated here
//! before any parsing. It has no CLI surface of its own.

use std::net::IpAddr;

use ipnet::IpNet;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("{0}")]
    Validation(String),
}

fn as_string_list<'a>(value: &'a Value, what: &str) -> Result<Vec<&'a str>, FilterError> {
    let items = value
        .as_array()
        .ok_or_else(|| FilterError::Validation(format!("{} must be a list", what)))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| FilterError::Validation(format!("{} must be a list of strings", what)))
        })
        .collect()
}

/// Parse a network spec. A bare address is accepted as a host-length
/// network.
fn parse_network(spec: &str) -> Result<IpNet, FilterError> {
    if let Ok(net) = spec.parse::<IpNet>() {
        return Ok(net);
    }
    spec.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|e| FilterError::Validation(format!("Error processing IP: {}", e)))
}

/// Return the addresses that fall inside at least one of the networks.
///
/// Input order of `addresses` is preserved; an address is emitted once per
/// network it matches, so one address inside two networks appears twice.
/// Any unparsable address or network fails the whole call with the original
/// parse error message.
pub fn ips_in_ranges(addresses: &Value, networks: &Value) -> Result<Vec<String>, FilterError> {
    let addresses = as_string_list(addresses, "addresses")?;
    let networks = as_string_list(networks, "networks")?;

    let mut matched = Vec::new();
    for address in addresses {
        let ip: IpAddr = address
            .parse()
            .map_err(|e| FilterError::Validation(format!("Error processing IP: {}", e)))?;
        for network in &networks {
            if parse_network(network)?.contains(&ip) {
                matched.push(address.to_string());
            }
        }
    }
    Ok(matched)
}
