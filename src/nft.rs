//! Custody calls against the CIS-2 contract that manages the auctioned
//! token. Escrow is expressed through ordinary CIS-2 transfers: creation
//! pulls the token from the seller into this contract, settlement pushes it
//! to the winner or back to the seller.

use concordium_cis2::{
    AdditionalData, OperatorOfQuery, OperatorOfQueryParams, OperatorOfQueryResponse, Receiver,
    TokenAmountU8, TokenIdVec, Transfer, TransferParams,
};
use concordium_std::*;

use crate::errors::{ContractError, ContractResult};
use crate::external::Token;

/// Entrypoint invoked by CIS-2 contracts when a token is transferred to this
/// contract.
pub const ON_RECEIVING_CIS2: &str = "onReceivingCIS2";

/// Whether `owner` has made the auction contract an operator on the token
/// contract, i.e. whether the contract may move the token on the seller's
/// behalf.
pub fn is_operator<T>(
    host: &impl HasHost<T>,
    token_contract: &ContractAddress,
    owner: AccountAddress,
    auction: ContractAddress,
) -> ContractResult<bool> {
    let params = OperatorOfQueryParams {
        queries: vec![OperatorOfQuery {
            owner: Address::Account(owner),
            address: Address::Contract(auction),
        }],
    };

    let mut response = host
        .invoke_contract_read_only(
            token_contract,
            &params,
            EntrypointName::new_unchecked("operatorOf"),
            Amount::zero(),
        )
        .map_err(handle_call_error)?
        .ok_or(ContractError::Incompatible)?;

    let response =
        OperatorOfQueryResponse::deserial(&mut response).map_err(|_| ContractError::Incompatible)?;

    Ok(response.0.first().copied().unwrap_or(false))
}

/// Move the token from the seller into escrow.
pub fn pull_into_escrow<T>(
    host: &mut impl HasHost<T>,
    token: &Token,
    seller: AccountAddress,
    auction: ContractAddress,
) -> ContractResult<()> {
    transfer(
        host,
        token,
        Address::Account(seller),
        Receiver::Contract(
            auction,
            OwnedEntrypointName::new_unchecked(ON_RECEIVING_CIS2.to_string()),
        ),
    )
}

/// Move the token out of escrow to `to`.
pub fn release_from_escrow<T>(
    host: &mut impl HasHost<T>,
    token: &Token,
    auction: ContractAddress,
    to: AccountAddress,
) -> ContractResult<()> {
    transfer(host, token, Address::Contract(auction), Receiver::Account(to))
}

fn transfer<T>(
    host: &mut impl HasHost<T>,
    token: &Token,
    from: Address,
    to: Receiver,
) -> ContractResult<()> {
    host.invoke_contract(
        &token.contract,
        &TransferParams::<TokenIdVec, TokenAmountU8>(vec![Transfer {
            token_id: token.id.clone(),
            amount: TokenAmountU8(1),
            from,
            to,
            data: AdditionalData::empty(),
        }]),
        EntrypointName::new_unchecked("transfer"),
        Amount::zero(),
    )
    .map_err(handle_call_error)?;

    Ok(())
}

fn handle_call_error<R>(error: CallContractError<R>) -> ContractError {
    match error {
        CallContractError::MissingContract
        | CallContractError::MissingEntrypoint
        | CallContractError::MessageFailed => ContractError::Incompatible,
        // The token contract refused the call: not an operator or not the
        // current owner.
        CallContractError::LogicReject { .. } => ContractError::Unauthorized,
        _ => ContractError::InvokeContractError,
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_std::test_infrastructure::*;

    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const AUCTION_CONTRACT: ContractAddress = ContractAddress {
        index: 2,
        subindex: 0,
    };

    const SELLER: AccountAddress = AccountAddress([0u8; 32]);
    const WINNER: AccountAddress = AccountAddress([1u8; 32]);

    fn token() -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![0, 1]),
        }
    }

    fn mock_host() -> TestHost<()> {
        TestHost::new((), TestStateBuilder::new())
    }

    #[concordium_test]
    fn test_pull_into_escrow() {
        let mut host = mock_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|parameter, _, _, _| {
                let params = TransferParams::<TokenIdVec, TokenAmountU8>::deserial(
                    &mut Cursor::new(parameter.as_ref()),
                )
                .map_err(|_| CallContractError::Trap)?;
                let transfer = params.0.first().ok_or(CallContractError::Trap)?;
                if transfer.from != Address::Account(SELLER) {
                    return Err(CallContractError::Trap);
                }
                Ok((true, ()))
            }),
        );

        let response = pull_into_escrow(&mut host, &token(), SELLER, AUCTION_CONTRACT);
        claim_eq!(response, Ok(()));
    }

    #[concordium_test]
    fn test_release_from_escrow() {
        let mut host = mock_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|parameter, _, _, _| {
                let params = TransferParams::<TokenIdVec, TokenAmountU8>::deserial(
                    &mut Cursor::new(parameter.as_ref()),
                )
                .map_err(|_| CallContractError::Trap)?;
                let transfer = params.0.first().ok_or(CallContractError::Trap)?;
                let to_winner = matches!(&transfer.to, Receiver::Account(to) if *to == WINNER);
                if transfer.from != Address::Contract(AUCTION_CONTRACT) || !to_winner {
                    return Err(CallContractError::Trap);
                }
                Ok((true, ()))
            }),
        );

        let response = release_from_escrow(&mut host, &token(), AUCTION_CONTRACT, WINNER);
        claim_eq!(response, Ok(()));
    }

    #[concordium_test]
    fn test_transfer_rejection_maps_to_unauthorized() {
        let mut host = mock_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::new_v1(|_, _, _, _| {
                Err(CallContractError::LogicReject {
                    reason: -42,
                    return_value: (),
                })
            }),
        );

        let response = pull_into_escrow(&mut host, &token(), SELLER, AUCTION_CONTRACT);
        claim_eq!(response, Err(ContractError::Unauthorized));
    }

    #[concordium_test]
    fn test_is_operator() {
        let mut host = mock_host();

        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            MockFn::new_v1(|parameter, _, _, _| {
                let params =
                    OperatorOfQueryParams::deserial(&mut Cursor::new(parameter.as_ref()))
                        .map_err(|_| CallContractError::Trap)?;
                let granted = params
                    .queries
                    .iter()
                    .map(|query| query.owner == Address::Account(SELLER))
                    .collect();
                Ok((false, OperatorOfQueryResponse(granted)))
            }),
        );

        let granted = is_operator(&host, &NFT_CONTRACT, SELLER, AUCTION_CONTRACT);
        claim_eq!(granted, Ok(true));

        let denied = is_operator(&host, &NFT_CONTRACT, WINNER, AUCTION_CONTRACT);
        claim_eq!(denied, Ok(false));
    }
}
