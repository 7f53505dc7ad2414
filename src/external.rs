use concordium_cis2::TokenIdVec;
use concordium_std::*;

/// Sequential auction identifier. The first auction gets id 0, identifiers
/// strictly increase and are never reused.
pub type AuctionId = u64;

/// A unique token: the contract managing the collection and the token
/// identifier within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct Token {
    pub contract: ContractAddress,
    pub id: TokenIdVec,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct CreateAuctionParams {
    /// Token to put up for auction. The seller must have added this contract
    /// as an operator on the token contract beforehand.
    pub token: Token,
    /// Smallest acceptable first bid. Must be above zero.
    pub min_bid: Amount,
    /// Time the auction stays open for bids, counted from the creation slot
    /// time. Must be above zero.
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, SchemaType)]
pub struct InitializeV2Params {
    /// Price feed contract exposing a `latestRoundData` entrypoint.
    pub price_feed: ContractAddress,
}

#[derive(Debug, Serialize, SchemaType)]
pub struct UpgradeParams {
    /// New module to run this instance with.
    pub module: ModuleReference,
    /// Optional entrypoint to invoke on the instance after the module has
    /// been changed, e.g. `initializeV2`.
    pub migrate: Option<(OwnedEntrypointName, OwnedParameter)>,
}
