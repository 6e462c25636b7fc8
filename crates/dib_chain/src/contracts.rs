//! Solidity bindings for the bridge contracts.
//!
//! Only the functions this tool calls are declared. The two token admin
//! interfaces cover the `addToken` revisions named by
//! [`AdoptTokenArgs`](dib_core::AdoptTokenArgs).

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IBridgeHub {
        struct ChainInfo {
            uint256 chainId;
            string name;
            string rpcUrl;
            address gateway;
            address gasCreditVault;
            address metaTxGateway;
        }

        function addChain(
            uint256 chainId,
            string name,
            string rpcUrl,
            address gateway,
            address gasCreditVault,
            address metaTxGateway
        ) external;
        function addToken(string symbol, string name, uint8 decimals) external;
        function addTokenContract(
            string symbol,
            uint256 chainId,
            address tokenAddress,
            uint256 originChainId,
            string originSymbol,
            bool isDeployed
        ) external;
        function setGasCreditVault(address vault) external;
        function getDetailedChainsInfo() external view returns (ChainInfo[] memory);
    }

    #[sol(rpc)]
    interface IGasCreditVault {
        function initialize() external;
        function whitelistToken(address token, address priceFeed, bool isStablecoin) external;
        function isTokenWhitelisted(address token) external view returns (bool);
        function addWhitelistedRelayer(address relayer) external;
        function isRelayerWhitelisted(address relayer) external view returns (bool);
    }

    #[sol(rpc)]
    interface IMetaTxGateway {
        function initialize() external;
        function setRelayerAuthorization(address relayer, bool authorized) external;
    }

    #[sol(rpc)]
    interface IDIGateway {
        function owner() external view returns (address);
        function addRelayer(address relayer) external;
        function addChain(uint256 chainId) external;
        function supportedChains(uint256 chainId) external view returns (bool);
        function getBridgeFee() external view returns (uint256);
        function feeReceiver() external view returns (address);
        function getBridgeTokenRegistry() external view returns (address);
    }

    #[sol(rpc)]
    interface IDIBridgedTokenRegistry {
        struct TokenInfo {
            address tokenAddress;
            string symbol;
            string name;
            uint8 decimals;
            uint256 originChainId;
            string originSymbol;
            bool isDeployed;
        }

        function setGateway(address newGateway) external;
        function gateway() external view returns (address);
        function getToken(uint256 chainId, string originSymbol) external view returns (address);
        function getSupportedTokens() external view returns (TokenInfo[] memory);
    }

    /// `addToken(symbol, token, name, decimals, isNative)` revision.
    #[sol(rpc)]
    interface ITokenAdminNameDecimals {
        function deployToken(
            string name,
            string symbol,
            uint8 decimals,
            uint256 originChainId,
            string originSymbol
        ) external;
        function addToken(
            string symbol,
            address token,
            string name,
            uint8 decimals,
            bool isNative
        ) external;
    }

    /// `addToken(symbol, token, logoURI, priceFeed, priceKey, useDIAOracle)` revision.
    #[sol(rpc)]
    interface ITokenAdminPriceFeed {
        function deployToken(
            string name,
            string symbol,
            uint8 decimals,
            uint256 originChainId,
            string originSymbol
        ) external;
        function addToken(
            string symbol,
            address token,
            string logoURI,
            address priceFeed,
            string priceKey,
            bool useDIAOracle
        ) external;
    }
}
