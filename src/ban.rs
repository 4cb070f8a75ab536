//! Administrative ban list.
//!
//! Membership here is independent of behavioural scoring and never expires.

use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScoringError};

/// An IP network in CIDR notation, e.g. `192.168.0.0/16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressBlock {
    network: IpAddr,
    prefix_len: u8,
}

impl AddressBlock {
    pub fn new(network: IpAddr, prefix_len: u8) -> Result<Self> {
        let max_len = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };
        if prefix_len > max_len {
            return Err(ScoringError::InvalidAddressBlock(format!("{}/{}", network, prefix_len)));
        }

        Ok(Self {
            network: mask(network, prefix_len),
            prefix_len,
        })
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || ScoringError::InvalidAddressBlock(s.to_string());

        let (addr, len) = s.split_once('/').ok_or_else(invalid)?;
        let network: IpAddr = addr.trim().parse().map_err(|_| invalid())?;
        let prefix_len: u8 = len.trim().parse().map_err(|_| invalid())?;
        Self::new(network, prefix_len)
    }

    pub fn network(&self) -> IpAddr {
        self.network
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// IPv4-mapped IPv6 addresses are matched as the IPv4 address they carry.
    pub fn contains(&self, address: IpAddr) -> bool {
        let address = address.to_canonical();
        match (self.network, address) {
            (IpAddr::V4(_), IpAddr::V4(_)) | (IpAddr::V6(_), IpAddr::V6(_)) => {
                mask(address, self.prefix_len) == self.network
            }
            _ => false,
        }
    }
}

fn mask(address: IpAddr, prefix_len: u8) -> IpAddr {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let m = if prefix_len == 0 { 0 } else { u32::MAX << (32 - prefix_len as u32) };
            IpAddr::V4((bits & m).into())
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let m = if prefix_len == 0 { 0 } else { u128::MAX << (128 - prefix_len as u32) };
            IpAddr::V6((bits & m).into())
        }
    }
}

impl fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for AddressBlock {
    type Err = ScoringError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AddressBlock {
    type Error = ScoringError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<AddressBlock> for String {
    fn from(block: AddressBlock) -> String {
        block.to_string()
    }
}

#[derive(Debug, Default, Clone)]
pub struct BannedAddressTable {
    addresses: HashSet<IpAddr>,
    blocks: Vec<AddressBlock>,
}

impl BannedAddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the address was already banned. Mapped IPv6 forms
    /// are stored as their IPv4 address.
    pub fn add(&mut self, address: IpAddr) -> bool {
        self.addresses.insert(address.to_canonical())
    }

    /// Returns false if the address was not banned.
    pub fn remove(&mut self, address: IpAddr) -> bool {
        self.addresses.remove(&address.to_canonical())
    }

    pub fn add_block(&mut self, block: AddressBlock) -> bool {
        if self.blocks.contains(&block) {
            return false;
        }
        self.blocks.push(block);
        true
    }

    pub fn remove_block(&mut self, block: &AddressBlock) -> bool {
        let before = self.blocks.len();
        self.blocks.retain(|b| b != block);
        self.blocks.len() != before
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        let address = address.to_canonical();
        self.addresses.contains(&address) || self.blocks.iter().any(|b| b.contains(address))
    }

    pub fn addresses(&self) -> impl Iterator<Item = &IpAddr> {
        self.addresses.iter()
    }

    pub fn blocks(&self) -> &[AddressBlock] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty() && self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_clears_host_bits() {
        let ip: IpAddr = "10.1.2.3".parse().unwrap();
        assert_eq!(mask(ip, 8), "10.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(mask(ip, 0), "0.0.0.0".parse::<IpAddr>().unwrap());
        assert_eq!(mask(ip, 32), ip);

        let ip6: IpAddr = "2001:db8::1".parse().unwrap();
        assert_eq!(mask(ip6, 32), "2001:db8::".parse::<IpAddr>().unwrap());
    }
}
