use std::fmt;

/// Logical contract role, the key under which an address is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractRole {
    TokenTemplate,
    TokenRegistry,
    DiGateway,
    MetaTxGateway,
    MetaTxGatewayImplementation,
    GasCreditVault,
    GasCreditVaultImplementation,
    BridgeHub,
}

impl ContractRole {
    /// Roles every network's pipeline produces.
    pub const CORE: [ContractRole; 5] = [
        ContractRole::TokenTemplate,
        ContractRole::TokenRegistry,
        ContractRole::DiGateway,
        ContractRole::MetaTxGateway,
        ContractRole::GasCreditVault,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContractRole::TokenTemplate => "tokenTemplate",
            ContractRole::TokenRegistry => "tokenRegistry",
            ContractRole::DiGateway => "diGateway",
            ContractRole::MetaTxGateway => "metaTxGateway",
            ContractRole::MetaTxGatewayImplementation => "metaTxGatewayImplementation",
            ContractRole::GasCreditVault => "gasCreditVault",
            ContractRole::GasCreditVaultImplementation => "gasCreditVaultImplementation",
            ContractRole::BridgeHub => "bridgeHub",
        }
    }

    /// Implementation role paired with an upgradeable proxy role.
    pub fn implementation(&self) -> Option<ContractRole> {
        match self {
            ContractRole::MetaTxGateway => Some(ContractRole::MetaTxGatewayImplementation),
            ContractRole::GasCreditVault => Some(ContractRole::GasCreditVaultImplementation),
            _ => None,
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_keys_match_address_file_layout() {
        let keys: Vec<&str> = ContractRole::CORE.iter().map(|r| r.as_str()).collect();
        assert_eq!(
            keys,
            vec!["tokenTemplate", "tokenRegistry", "diGateway", "metaTxGateway", "gasCreditVault"]
        );
        assert_eq!(ContractRole::BridgeHub.to_string(), "bridgeHub");
    }

    #[test]
    fn only_proxies_have_implementations() {
        assert_eq!(
            ContractRole::GasCreditVault.implementation(),
            Some(ContractRole::GasCreditVaultImplementation)
        );
        assert_eq!(ContractRole::DiGateway.implementation(), None);
    }
}
