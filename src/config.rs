// Copyright (c) 2025 - Cowboy AI, Inc.
//! Composition configuration
//!
//! [`AppConfig`] decides what gets composed: which topology, stack ids,
//! network layout and the per-service defaults baked into each service
//! stack's parameters. Load it with [`AppConfig::from_env`] or
//! [`AppConfig::from_file`], then [`AppConfig::validate`] before composing.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;

use crate::domain::invariants::validate_priority;
use crate::domain::{Environment, HostPattern, Ipv4Cidr, NetworkError, SubnetMask};
use crate::errors::{StackError, StackResult};

/// Prefix of every environment variable [`AppConfig::from_env`] reads
pub const ENV_PREFIX: &str = "FARGATE_STACKS_";

/// Network values wired ahead of the deploy-time parameters
pub const LITERAL_VPC_CIDR: Ipv4Cidr = Ipv4Cidr::literal(Ipv4Addr::new(10, 229, 0, 0), 16);
pub const LITERAL_MAX_AZS: usize = 2;
pub const LITERAL_PUBLIC_MASK: SubnetMask = SubnetMask::literal(28);
pub const LITERAL_PRIVATE_MASK: SubnetMask = SubnetMask::literal(24);
pub const LITERAL_DB_MASK: SubnetMask = SubnetMask::literal(28);

/// How the load balancer is split from the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topology {
    /// LB owns an HTTPS listener; each service adds its own target group and
    /// a host-header rule
    #[default]
    DefaultAction,
    /// LB owns an HTTP listener and target group; services register into it
    SplitAtTargetGroup,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultAction => "default-action",
            Self::SplitAtTargetGroup => "split-at-target-group",
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default-action" => Ok(Self::DefaultAction),
            "split-at-target-group" => Ok(Self::SplitAtTargetGroup),
            other => Err(format!(
                "unknown topology '{other}' (expected default-action or split-at-target-group)"
            )),
        }
    }
}

/// Which network values drive subnet allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkPolicy {
    /// Fixed literals win over configuration; the network parameters stay inert
    #[default]
    PreferLiterals,
    /// Configured CIDR, zone count and masks are used
    UseConfigured,
}

impl FromStr for NetworkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "prefer-literals" => Ok(Self::PreferLiterals),
            "use-configured" => Ok(Self::UseConfigured),
            other => Err(format!(
                "unknown network policy '{other}' (expected prefer-literals or use-configured)"
            )),
        }
    }
}

/// Effective network layout after the policy is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkLayout {
    pub vpc_cidr: Ipv4Cidr,
    pub max_azs: usize,
    pub public_mask: SubnetMask,
    pub private_mask: SubnetMask,
    pub db_mask: SubnetMask,
}

/// VPC and cluster stack settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfraConfig {
    pub stack_id: String,
    pub environment: Environment,
    pub vpc_cidr: Ipv4Cidr,
    pub max_azs: usize,
    /// Zones the VPC is pinned to; the first `max_azs` are used
    pub zones: Vec<String>,
    pub public_mask: SubnetMask,
    pub private_mask: SubnetMask,
    pub db_mask: SubnetMask,
    pub network_policy: NetworkPolicy,
}

impl Default for InfraConfig {
    fn default() -> Self {
        Self {
            stack_id: "VPCWithECSCLuster".to_string(),
            environment: Environment::Dev,
            vpc_cidr: LITERAL_VPC_CIDR,
            max_azs: LITERAL_MAX_AZS,
            zones: vec!["ap-northeast-2a".to_string(), "ap-northeast-2c".to_string()],
            public_mask: LITERAL_PUBLIC_MASK,
            private_mask: LITERAL_PRIVATE_MASK,
            db_mask: LITERAL_DB_MASK,
            network_policy: NetworkPolicy::PreferLiterals,
        }
    }
}

impl InfraConfig {
    /// Layout subnet allocation uses under the configured policy
    pub fn layout(&self) -> NetworkLayout {
        match self.network_policy {
            NetworkPolicy::PreferLiterals => NetworkLayout {
                vpc_cidr: LITERAL_VPC_CIDR,
                max_azs: LITERAL_MAX_AZS,
                public_mask: LITERAL_PUBLIC_MASK,
                private_mask: LITERAL_PRIVATE_MASK,
                db_mask: LITERAL_DB_MASK,
            },
            NetworkPolicy::UseConfigured => NetworkLayout {
                vpc_cidr: self.vpc_cidr,
                max_azs: self.max_azs,
                public_mask: self.public_mask,
                private_mask: self.private_mask,
                db_mask: self.db_mask,
            },
        }
    }
}

/// Load balancer stack settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadBalancerConfig {
    pub stack_id: String,
}

impl Default for LoadBalancerConfig {
    fn default() -> Self {
        Self {
            stack_id: "SplitAtTargetGroup-LBStack".to_string(),
        }
    }
}

/// One service stack; values become its parameter defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub stack_id: String,
    pub service_name: String,
    pub container_port: u16,
    pub health_check_path: String,
    pub health_check_port: u16,
    /// Listener rule priority, unique per listener
    pub priority: u32,
    pub host_headers: Vec<HostPattern>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            stack_id: "SplitAtTargetGroup-ServiceStack".to_string(),
            service_name: "amazon-ecs-sample".to_string(),
            container_port: 80,
            health_check_path: "/".to_string(),
            health_check_port: 80,
            priority: 100,
            host_headers: HostPattern::new("hello.skcnctf.tk").into_iter().collect(),
        }
    }
}

/// Everything composition needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub topology: Topology,
    pub infra: InfraConfig,
    pub load_balancer: LoadBalancerConfig,
    pub services: Vec<ServiceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            topology: Topology::default(),
            infra: InfraConfig::default(),
            load_balancer: LoadBalancerConfig::default(),
            services: vec![ServiceConfig::default()],
        }
    }
}

fn invalid(message: impl Into<String>) -> StackError {
    StackError::Configuration(message.into())
}

fn parse_var<T>(name: &str, raw: &str) -> StackResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| invalid(format!("{ENV_PREFIX}{name}: {e}")))
}

impl AppConfig {
    /// Defaults overridden by `FARGATE_STACKS_*` environment variables
    pub fn from_env() -> StackResult<Self> {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    /// Defaults overridden by `lookup`, keyed by variable name without prefix.
    ///
    /// Service variables apply to the first service.
    pub fn from_lookup<F>(lookup: F) -> StackResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("TOPOLOGY") {
            config.topology = parse_var("TOPOLOGY", &raw)?;
        }
        if let Some(raw) = lookup("ENVIRONMENT") {
            config.infra.environment = parse_var("ENVIRONMENT", &raw)?;
        }
        if let Some(raw) = lookup("NETWORK_POLICY") {
            config.infra.network_policy = parse_var("NETWORK_POLICY", &raw)?;
        }
        if let Some(raw) = lookup("VPC_CIDR") {
            config.infra.vpc_cidr = parse_var("VPC_CIDR", &raw)?;
        }
        if let Some(raw) = lookup("MAX_AZS") {
            config.infra.max_azs = parse_var("MAX_AZS", &raw)?;
        }
        if let Some(raw) = lookup("ZONES") {
            config.infra.zones = raw
                .split(',')
                .map(str::trim)
                .filter(|z| !z.is_empty())
                .map(str::to_string)
                .collect();
        }
        for (name, mask) in [
            ("PUBLIC_MASK", &mut config.infra.public_mask),
            ("PRIVATE_MASK", &mut config.infra.private_mask),
            ("DB_MASK", &mut config.infra.db_mask),
        ] {
            if let Some(raw) = lookup(name) {
                let value: u8 = parse_var(name, &raw)?;
                *mask = SubnetMask::new(value)?;
            }
        }
        if let Some(raw) = lookup("INFRA_STACK_ID") {
            config.infra.stack_id = raw;
        }
        if let Some(raw) = lookup("LB_STACK_ID") {
            config.load_balancer.stack_id = raw;
        }

        if let Some(service) = config.services.first_mut() {
            if let Some(raw) = lookup("SERVICE_STACK_ID") {
                service.stack_id = raw;
            }
            if let Some(raw) = lookup("SERVICE_NAME") {
                service.service_name = raw;
            }
            if let Some(raw) = lookup("CONTAINER_PORT") {
                service.container_port = parse_var("CONTAINER_PORT", &raw)?;
            }
            if let Some(raw) = lookup("PRIORITY") {
                service.priority = parse_var("PRIORITY", &raw)?;
            }
            if let Some(raw) = lookup("HOST_HEADERS") {
                service.host_headers = raw
                    .split(',')
                    .map(|h| HostPattern::new(h.trim()))
                    .collect::<Result<_, _>>()?;
            }
        }

        Ok(config)
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_file(path: impl AsRef<Path>) -> StackResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|e| invalid(format!("{}: {e}", path.display())))
    }

    /// Check the invariants composition relies on
    pub fn validate(&self) -> StackResult<()> {
        let infra = &self.infra;
        if !(2..=4).contains(&infra.max_azs) {
            return Err(invalid(format!(
                "max_azs must be between 2 and 4, got {}",
                infra.max_azs
            )));
        }
        // Same bounds as the VPCCIDR parameter pattern, which defaults to this value
        let prefix = infra.vpc_cidr.prefix_length();
        if !(SubnetMask::MIN..=SubnetMask::MAX).contains(&prefix) {
            return Err(NetworkError::InvalidCidr(format!(
                "{} (VPC prefix must be /{}-/{})",
                infra.vpc_cidr,
                SubnetMask::MIN,
                SubnetMask::MAX
            ))
            .into());
        }
        if self.services.is_empty() {
            return Err(invalid("at least one service is required"));
        }

        let mut stack_ids = BTreeSet::new();
        let all_ids = [infra.stack_id.as_str(), self.load_balancer.stack_id.as_str()]
            .into_iter()
            .chain(self.services.iter().map(|s| s.stack_id.as_str()));
        for id in all_ids {
            if id.is_empty() {
                return Err(invalid("stack ids must not be empty"));
            }
            if !stack_ids.insert(id) {
                return Err(StackError::DuplicateStack(id.to_string()));
            }
        }

        for service in &self.services {
            if service.service_name.is_empty() {
                return Err(invalid(format!("{}: service_name is empty", service.stack_id)));
            }
            if service.host_headers.is_empty() {
                return Err(invalid(format!(
                    "{}: at least one host header is required",
                    service.stack_id
                )));
            }
            validate_priority(service.priority)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: BTreeMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.infra.vpc_cidr.to_string(), "10.229.0.0/16");
        assert_eq!(config.services[0].host_headers[0].as_str(), "hello.skcnctf.tk");
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup(&[
            ("TOPOLOGY", "split-at-target-group"),
            ("ENVIRONMENT", "prod"),
            ("PRIORITY", "7"),
            ("HOST_HEADERS", "a.example.com, *.example.com"),
            ("ZONES", "us-east-1a,us-east-1b,us-east-1c"),
        ]))
        .unwrap();

        assert_eq!(config.topology, Topology::SplitAtTargetGroup);
        assert_eq!(config.infra.environment, Environment::Prod);
        assert_eq!(config.services[0].priority, 7);
        assert_eq!(config.services[0].host_headers.len(), 2);
        assert_eq!(config.infra.zones.len(), 3);
    }

    #[test]
    fn test_lookup_rejects_bad_values() {
        assert!(AppConfig::from_lookup(lookup(&[("MAX_AZS", "two")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("PUBLIC_MASK", "30")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("HOST_HEADERS", "bad host")])).is_err());
    }

    #[test]
    fn test_literals_win_by_default() {
        let mut infra = InfraConfig::default();
        infra.vpc_cidr = Ipv4Cidr::new("10.0.0.0/16").unwrap();
        infra.max_azs = 3;
        assert_eq!(infra.layout().vpc_cidr.to_string(), "10.229.0.0/16");
        assert_eq!(infra.layout().max_azs, 2);

        infra.network_policy = NetworkPolicy::UseConfigured;
        assert_eq!(infra.layout().vpc_cidr.to_string(), "10.0.0.0/16");
        assert_eq!(infra.layout().max_azs, 3);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = AppConfig::default();
        config.infra.max_azs = 5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.services.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.services[0].stack_id = config.infra.stack_id.clone();
        assert!(matches!(config.validate(), Err(StackError::DuplicateStack(_))));

        let mut config = AppConfig::default();
        config.services[0].priority = 0;
        assert!(config.validate().is_err());

        for cidr in ["10.0.0.0/8", "10.0.0.0/15", "10.0.0.0/29"] {
            let mut config = AppConfig::default();
            config.infra.network_policy = NetworkPolicy::UseConfigured;
            config.infra.vpc_cidr = Ipv4Cidr::new(cidr).unwrap();
            assert!(
                matches!(
                    config.validate(),
                    Err(StackError::Network(NetworkError::InvalidCidr(_)))
                ),
                "{cidr} accepted"
            );
        }

        let mut config = AppConfig::default();
        config.infra.vpc_cidr = Ipv4Cidr::new("10.0.0.0/28").unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "topology": "split-at-target-group", "infra": { "environment": "qa" } }"#)
                .unwrap();
        assert_eq!(config.topology, Topology::SplitAtTargetGroup);
        assert_eq!(config.infra.environment, Environment::Qa);
        assert_eq!(config.infra.stack_id, "VPCWithECSCLuster");
        assert_eq!(config.services.len(), 1);
    }
}
