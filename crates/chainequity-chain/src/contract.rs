//! Minimal ABI surface of the indexed contract. Only the view methods and
//! event signatures the indexer consumes are declared here, inline rather
//! than generated from a Foundry artifact — the contract implementation
//! itself lives elsewhere and is never built from this workspace.

use alloy::sol;

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IEquityToken {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function totalSupply() external view returns (uint256);
        function balanceOf(address account) external view returns (uint256);
        function splitMultiplier() external view returns (uint256);
        function isApproved(address account) external view returns (bool);
        function owner() external view returns (address);

        event Transfer(address indexed from, address indexed to, uint256 value);
        event WalletApproved(address indexed wallet);
        event WalletRevoked(address indexed wallet);
        event StockSplit(uint256 multiplier, uint256 newCumulativeMultiplier);
        event SymbolChanged(string oldSymbol, string newSymbol);
        event NameChanged(string oldName, string newName);
        event TransferBlocked(address indexed from, address indexed to, uint256 amount);
    }
}
