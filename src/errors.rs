use concordium_std::*;

pub type ContractResult<T> = Result<T, ContractError>;

/// Every way a call into this contract can be rejected. Rejections are
/// all-or-nothing: the chain rolls back any state change or transfer made
/// before the error was returned.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, SchemaType, Reject)]
pub enum ContractError {
    /// Failed to parse the call parameter.
    ParseParams,
    /// Event log is full.
    LogFull,
    /// Malformed event data.
    LogMalformed,
    /// Entrypoint is restricted to account senders.
    OnlyAccountAddress,
    /// Entrypoint is restricted to contract senders.
    ContractOnly,
    /// Zero duration or zero minimum bid on auction creation.
    InvalidParameter,
    /// Unknown auction identifier.
    AuctionNotFound,
    /// The auction end time has passed, no further bids are accepted.
    AuctionExpired,
    /// The auction end time has not been reached, settling is not possible yet.
    AuctionStillActive,
    /// The auction has already been settled.
    AuctionAlreadySettled,
    /// First bid below the minimum, or a later bid not strictly above the
    /// current highest bid.
    BidTooLow,
    /// Sender lacks the rights for this operation, or the contract is not an
    /// operator for the seller on the token contract.
    Unauthorized,
    /// The version 2 price feed has already been configured.
    AlreadyInitialized,
    /// Version 2 is not initialized or the price feed could not be read.
    OracleUnavailable,
    /// Arithmetic overflow.
    Overflow,
    /// The token contract does not expose a compatible interface.
    Incompatible,
    /// A contract invocation failed.
    InvokeContractError,
    /// A CCD transfer failed.
    InvokeTransferError,
    FailedUpgradeMissingModule,
    FailedUpgradeMissingContract,
    FailedUpgradeUnsupportedModuleVersion,
}

impl From<ParseError> for ContractError {
    fn from(_: ParseError) -> Self {
        Self::ParseParams
    }
}

impl From<LogError> for ContractError {
    fn from(error: LogError) -> Self {
        match error {
            LogError::Full => Self::LogFull,
            LogError::Malformed => Self::LogMalformed,
        }
    }
}

impl From<TransferError> for ContractError {
    fn from(_: TransferError) -> Self {
        Self::InvokeTransferError
    }
}

impl<T> From<CallContractError<T>> for ContractError {
    fn from(_: CallContractError<T>) -> Self {
        Self::InvokeContractError
    }
}

impl From<UpgradeError> for ContractError {
    fn from(error: UpgradeError) -> Self {
        match error {
            UpgradeError::MissingModule => Self::FailedUpgradeMissingModule,
            UpgradeError::MissingContract => Self::FailedUpgradeMissingContract,
            UpgradeError::UnsupportedModuleVersion => Self::FailedUpgradeUnsupportedModuleVersion,
        }
    }
}
