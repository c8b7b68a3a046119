// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects and Subnet Allocation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IPv4 address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefixLength(u8),

    #[error("Invalid subnet mask: /{0} (must be /16-/28)")]
    InvalidSubnetMask(u8),

    #[error("Subnet /{mask} does not fit in {vpc} (address space exhausted)")]
    AddressSpaceExhausted { vpc: String, mask: u8 },

    #[error("Requested {requested} availability zones but only {available} are configured")]
    NotEnoughZones { requested: usize, available: usize },
}

/// IPv4 CIDR block value object
///
/// Invariants:
/// - Valid IPv4 address
/// - Prefix length 0-32
/// - Stored in canonical form (host bits cleared)
///
/// # Examples
///
/// ```rust
/// use fargate_stacks::domain::Ipv4Cidr;
///
/// let cidr = Ipv4Cidr::new("10.229.0.0/16").unwrap();
/// assert_eq!(cidr.prefix_length(), 16);
/// assert_eq!(cidr.size(), 65536);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ipv4Cidr {
    network: Ipv4Addr,
    prefix_length: u8,
}

impl Ipv4Cidr {
    /// Block for crate constants, which have no host bits set
    pub(crate) const fn literal(network: Ipv4Addr, prefix_length: u8) -> Self {
        Self {
            network,
            prefix_length,
        }
    }

    /// Parse CIDR notation (e.g. "10.229.0.0/16")
    ///
    /// Host bits are cleared, so "10.229.1.7/16" becomes "10.229.0.0/16".
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();
        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = Ipv4Addr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length)
    }

    /// Create from an address and prefix length
    pub fn from_parts(address: Ipv4Addr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > 32 {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        let network = Ipv4Addr::from(u32::from(address) & Self::mask_bits(prefix_length));
        Ok(Self {
            network,
            prefix_length,
        })
    }

    fn mask_bits(prefix_length: u8) -> u32 {
        if prefix_length == 0 {
            0
        } else {
            u32::MAX << (32 - u32::from(prefix_length))
        }
    }

    /// Network address
    pub fn network(&self) -> Ipv4Addr {
        self.network
    }

    /// Prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Number of addresses in the block
    pub fn size(&self) -> u64 {
        1u64 << (32 - u32::from(self.prefix_length))
    }

    fn first(&self) -> u64 {
        u64::from(u32::from(self.network))
    }

    fn end(&self) -> u64 {
        self.first() + self.size()
    }

    /// Whether `other` lies entirely inside this block
    pub fn contains(&self, other: &Ipv4Cidr) -> bool {
        other.first() >= self.first() && other.end() <= self.end()
    }

    /// Whether two blocks share any address
    pub fn overlaps(&self, other: &Ipv4Cidr) -> bool {
        self.first() < other.end() && other.first() < self.end()
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_length)
    }
}

impl FromStr for Ipv4Cidr {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Ipv4Cidr {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Ipv4Cidr {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::new(&raw).map_err(serde::de::Error::custom)
    }
}

/// Subnet mask size value object
///
/// Invariants:
/// - /16 to /28, the range AWS accepts for VPC subnets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SubnetMask(u8);

impl SubnetMask {
    /// Largest subnet AWS allows
    pub const MIN: u8 = 16;

    /// Smallest subnet AWS allows
    pub const MAX: u8 = 28;

    /// Create a new subnet mask with validation
    pub fn new(mask: u8) -> Result<Self, NetworkError> {
        if !(Self::MIN..=Self::MAX).contains(&mask) {
            return Err(NetworkError::InvalidSubnetMask(mask));
        }
        Ok(Self(mask))
    }

    /// Mask for crate constants, which are all within range
    pub(crate) const fn literal(mask: u8) -> Self {
        Self(mask)
    }

    /// Get the mask value
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for SubnetMask {
    type Error = NetworkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SubnetMask> for u8 {
    fn from(mask: SubnetMask) -> Self {
        mask.0
    }
}

impl fmt::Display for SubnetMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.0)
    }
}

/// Routing tier of a subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubnetType {
    /// Default route to the internet gateway
    Public,
    /// Default route through the NAT gateway
    PrivateWithNat,
    /// No default route
    PrivateIsolated,
}

impl SubnetType {
    /// Whether instances in this tier get a public IP on launch
    pub fn maps_public_ip(&self) -> bool {
        matches!(self, Self::Public)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "Public",
            Self::PrivateWithNat => "Private",
            Self::PrivateIsolated => "Isolated",
        }
    }
}

/// One tier of the subnet layout, replicated in every zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetTier {
    /// Tier name, used in logical ids ("Public", "Private", "Db")
    pub name: String,
    pub subnet_type: SubnetType,
    pub mask: SubnetMask,
}

impl SubnetTier {
    pub fn new(name: impl Into<String>, subnet_type: SubnetType, mask: SubnetMask) -> Self {
        Self {
            name: name.into(),
            subnet_type,
            mask,
        }
    }
}

/// A subnet carved out of the VPC block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedSubnet {
    pub tier: String,
    pub subnet_type: SubnetType,
    /// 1-based index within the tier
    pub index: usize,
    pub availability_zone: String,
    pub cidr: Ipv4Cidr,
}

/// Carve subnets sequentially out of `vpc`.
///
/// Tiers are allocated in declaration order, each tier once per zone. Every
/// block starts at the next address aligned to its own size, so a /24 that
/// follows two /28s skips to the next /24 boundary.
pub fn allocate_subnets(
    vpc: &Ipv4Cidr,
    tiers: &[SubnetTier],
    zones: &[String],
) -> Result<Vec<AllocatedSubnet>, NetworkError> {
    let mut next = vpc.first();
    let mut subnets = Vec::with_capacity(tiers.len() * zones.len());

    for tier in tiers {
        let mask = tier.mask.value();
        if mask < vpc.prefix_length() {
            return Err(NetworkError::AddressSpaceExhausted {
                vpc: vpc.to_string(),
                mask,
            });
        }
        let size = 1u64 << (32 - u32::from(mask));

        for (i, zone) in zones.iter().enumerate() {
            let start = next.div_ceil(size) * size;
            if start + size > vpc.end() {
                return Err(NetworkError::AddressSpaceExhausted {
                    vpc: vpc.to_string(),
                    mask,
                });
            }

            // start < 2^32 because vpc.end() <= 2^32
            let cidr = Ipv4Cidr::from_parts(Ipv4Addr::from(start as u32), mask)?;
            subnets.push(AllocatedSubnet {
                tier: tier.name.clone(),
                subnet_type: tier.subnet_type,
                index: i + 1,
                availability_zone: zone.clone(),
                cidr,
            });
            next = start + size;
        }
    }

    Ok(subnets)
}

/// Pick the first `max_azs` zones
pub fn select_zones(zones: &[String], max_azs: usize) -> Result<Vec<String>, NetworkError> {
    if max_azs > zones.len() {
        return Err(NetworkError::NotEnoughZones {
            requested: max_azs,
            available: zones.len(),
        });
    }
    Ok(zones[..max_azs].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<String> {
        vec!["ap-northeast-2a".to_string(), "ap-northeast-2c".to_string()]
    }

    fn tier(name: &str, subnet_type: SubnetType, mask: u8) -> SubnetTier {
        SubnetTier::new(name, subnet_type, SubnetMask::new(mask).unwrap())
    }

    #[test]
    fn test_cidr_parse() {
        let cidr = Ipv4Cidr::new("10.229.0.0/16").unwrap();
        assert_eq!(cidr.network().to_string(), "10.229.0.0");
        assert_eq!(cidr.prefix_length(), 16);
        assert_eq!(cidr.to_string(), "10.229.0.0/16");
    }

    #[test]
    fn test_cidr_canonicalizes_host_bits() {
        let cidr = Ipv4Cidr::new("10.229.1.7/16").unwrap();
        assert_eq!(cidr.to_string(), "10.229.0.0/16");
    }

    #[test]
    fn test_invalid_cidr() {
        assert!(Ipv4Cidr::new("10.229.0.0").is_err());
        assert!(Ipv4Cidr::new("999.0.0.0/16").is_err());
        assert!(Ipv4Cidr::new("10.0.0.0/33").is_err());
        assert!(Ipv4Cidr::new("2001:db8::/64").is_err());
    }

    #[test]
    fn test_subnet_mask_range() {
        assert!(SubnetMask::new(16).is_ok());
        assert!(SubnetMask::new(28).is_ok());
        assert!(SubnetMask::new(15).is_err());
        assert!(SubnetMask::new(29).is_err());
    }

    #[test]
    fn test_default_layout_allocation() {
        let vpc = Ipv4Cidr::new("10.229.0.0/16").unwrap();
        let tiers = vec![
            tier("Public", SubnetType::Public, 28),
            tier("Private", SubnetType::PrivateWithNat, 24),
            tier("Db", SubnetType::PrivateIsolated, 28),
        ];

        let subnets = allocate_subnets(&vpc, &tiers, &zones()).unwrap();
        let cidrs: Vec<String> = subnets.iter().map(|s| s.cidr.to_string()).collect();

        assert_eq!(
            cidrs,
            vec![
                "10.229.0.0/28",
                "10.229.0.16/28",
                "10.229.1.0/24",
                "10.229.2.0/24",
                "10.229.3.0/28",
                "10.229.3.16/28",
            ]
        );
        assert_eq!(subnets[1].availability_zone, "ap-northeast-2c");
        assert_eq!(subnets[3].index, 2);
    }

    #[test]
    fn test_allocation_exhausted() {
        let vpc = Ipv4Cidr::new("10.0.0.0/24").unwrap();
        let tiers = vec![tier("Private", SubnetType::PrivateWithNat, 24)];

        let result = allocate_subnets(&vpc, &tiers, &zones());
        assert!(matches!(
            result,
            Err(NetworkError::AddressSpaceExhausted { mask: 24, .. })
        ));
    }

    #[test]
    fn test_allocated_subnets_do_not_overlap() {
        let vpc = Ipv4Cidr::new("10.1.0.0/20").unwrap();
        let tiers = vec![
            tier("A", SubnetType::Public, 26),
            tier("B", SubnetType::PrivateWithNat, 22),
            tier("C", SubnetType::PrivateIsolated, 27),
        ];

        let subnets = allocate_subnets(&vpc, &tiers, &zones()).unwrap();
        for (i, a) in subnets.iter().enumerate() {
            assert!(vpc.contains(&a.cidr));
            for b in &subnets[i + 1..] {
                assert!(!a.cidr.overlaps(&b.cidr), "{} overlaps {}", a.cidr, b.cidr);
            }
        }
    }

    #[test]
    fn test_select_zones() {
        assert_eq!(select_zones(&zones(), 1).unwrap(), vec!["ap-northeast-2a"]);
        assert!(matches!(
            select_zones(&zones(), 3),
            Err(NetworkError::NotEnoughZones {
                requested: 3,
                available: 2
            })
        ));
    }
}
