//! Read-only access to the external price feed configured by version 2, and
//! the fixed-point conversion from native amounts to the quoted unit.

use concordium_std::*;

use crate::errors::{ContractError, ContractResult};

/// Fixed-point scale the price feed quotes prices in (8 decimals).
pub const PRICE_FEED_SCALE: u128 = 100_000_000;

/// Micro CCD per CCD, the scaling factor of the native value unit.
const MICRO_CCD_PER_CCD: u128 = 1_000_000;

/// Latest round reported by the price feed. `price` is the value of one CCD
/// in the quoted unit, scaled by [`PRICE_FEED_SCALE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct PriceFeedResponse {
    pub price: u128,
    pub updated_at: Timestamp,
}

pub trait HostPriceFeedExt<S>: HasHost<S> {
    /// Query the feed's latest round. Any failure, including an
    /// incompatible or unresponsive feed, surfaces as `OracleUnavailable`.
    fn latest_round_price(&self, contract: &ContractAddress) -> ContractResult<PriceFeedResponse> {
        let mut response = self
            .invoke_contract_read_only(
                contract,
                &(),
                EntrypointName::new_unchecked("latestRoundData"),
                Amount::zero(),
            )
            .map_err(|_| ContractError::OracleUnavailable)?
            .ok_or(ContractError::OracleUnavailable)?;

        PriceFeedResponse::deserial(&mut response).map_err(|_| ContractError::OracleUnavailable)
    }
}

impl<S, H: HasHost<S>> HostPriceFeedExt<S> for H {}

/// Value of `amount` in the quoted unit, at the feed's own scale. Plain
/// integer truncation, no rounding.
pub fn to_quoted(amount: Amount, price: u128) -> ContractResult<u128> {
    let quoted = (amount.micro_ccd as u128)
        .checked_mul(price)
        .ok_or(ContractError::Overflow)?;
    Ok(quoted / MICRO_CCD_PER_CCD)
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const PRICE_FEED: ContractAddress = ContractAddress {
        index: 5,
        subindex: 0,
    };

    // 2000.00000000 quoted units per CCD.
    const PRICE: u128 = 2_000 * PRICE_FEED_SCALE;

    #[concordium_test]
    fn test_latest_round_price() {
        let mut host: TestHost<()> = TestHost::new((), TestStateBuilder::new());

        host.setup_mock_entrypoint(
            PRICE_FEED,
            OwnedEntrypointName::new_unchecked("latestRoundData".into()),
            MockFn::returning_ok(PriceFeedResponse {
                price: PRICE,
                updated_at: Timestamp::from_timestamp_millis(1_000),
            }),
        );

        let response = host.latest_round_price(&PRICE_FEED);
        claim_eq!(
            response,
            Ok(PriceFeedResponse {
                price: PRICE,
                updated_at: Timestamp::from_timestamp_millis(1_000),
            })
        );
    }

    #[concordium_test]
    fn test_unresponsive_feed_is_unavailable() {
        let mut host: TestHost<()> = TestHost::new((), TestStateBuilder::new());

        host.setup_mock_entrypoint(
            PRICE_FEED,
            OwnedEntrypointName::new_unchecked("latestRoundData".into()),
            MockFn::new_v1(|_, _, _, _| {
                Err(CallContractError::LogicReject {
                    reason: -1,
                    return_value: (),
                })
            }),
        );

        let response = host.latest_round_price(&PRICE_FEED);
        claim_eq!(response, Err(ContractError::OracleUnavailable));
    }

    #[concordium_test]
    fn test_to_quoted_one_native_unit_is_the_price() {
        // 1 CCD converts to exactly the reported price.
        claim_eq!(to_quoted(Amount::from_ccd(1), PRICE), Ok(PRICE));
    }

    #[concordium_test]
    fn test_to_quoted_truncates() {
        // At the smallest representable price, sub-CCD amounts truncate to
        // zero.
        claim_eq!(to_quoted(Amount::from_micro_ccd(999_999), 1), Ok(0));
        claim_eq!(to_quoted(Amount::from_ccd(1), 1), Ok(1));
        claim_eq!(to_quoted(Amount::zero(), PRICE), Ok(0));
    }
}
