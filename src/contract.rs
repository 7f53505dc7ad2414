use concordium_cis2::{OnReceivingCis2Params, TokenAmountU8, TokenIdVec};
use concordium_std::*;

use crate::errors::{ContractError, ContractResult};
use crate::events::AuctionEvent;
use crate::external::{AuctionId, CreateAuctionParams, InitializeV2Params, UpgradeParams};
use crate::nft;
use crate::oracle::{self, HostPriceFeedExt};
use crate::state::{Auction, Settlement, State};

/// Initialize the auction contract with an empty auction book and no price
/// feed.
#[init(contract = "NftAuction")]
fn contract_init<S: HasStateApi>(
    _ctx: &impl HasInitContext,
    state_builder: &mut StateBuilder<S>,
) -> InitResult<State<S>> {
    Ok(State::empty(state_builder))
}

/// Create an auction for a single token and take the token into escrow.
///
/// The sender becomes the seller and must have made this contract an
/// operator on the token contract beforehand. Returns the identifier
/// assigned to the new auction.
#[receive(
    mutable,
    contract = "NftAuction",
    name = "createAuction",
    parameter = "CreateAuctionParams",
    error = "ContractError",
    return_value = "AuctionId",
    enable_logger
)]
fn contract_create_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<AuctionId> {
    let params: CreateAuctionParams = ctx.parameter_cursor().get()?;

    let seller = match ctx.sender() {
        Address::Account(seller) => seller,
        Address::Contract(_) => return Err(ContractError::OnlyAccountAddress),
    };

    ensure!(
        nft::is_operator(host, &params.token.contract, seller, ctx.self_address())?,
        ContractError::Unauthorized
    );

    let auction_id = host.state_mut().create_auction(
        seller,
        params.token.clone(),
        params.min_bid,
        params.duration,
        ctx.metadata().slot_time(),
    )?;

    nft::pull_into_escrow(host, &params.token, seller, ctx.self_address())?;

    let end = host.state().view_auction(auction_id)?.end;
    logger.log(&AuctionEvent::create(
        auction_id,
        &params.token,
        &seller,
        params.min_bid,
        end,
    ))?;

    Ok(auction_id)
}

/// Place a bid on an open auction. The attached CCD is the bid amount and
/// stays in escrow until the bid is superseded or the auction settles.
///
/// The superseded bid, if any, is refunded in full within this call; a
/// failed refund fails the bid.
#[receive(
    mutable,
    payable,
    contract = "NftAuction",
    name = "bid",
    parameter = "AuctionId",
    error = "ContractError",
    enable_logger
)]
fn contract_bid<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    amount: Amount,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction_id: AuctionId = ctx.parameter_cursor().get()?;

    let bidder = match ctx.sender() {
        Address::Account(bidder) => bidder,
        Address::Contract(_) => return Err(ContractError::OnlyAccountAddress),
    };

    let superseded =
        host.state_mut()
            .bid(auction_id, bidder, amount, ctx.metadata().slot_time())?;

    logger.log(&AuctionEvent::bid(auction_id, &bidder, amount))?;

    if let Some(bid) = superseded {
        host.invoke_transfer(&bid.account, bid.amount)?;
    }

    Ok(())
}

/// Settle a finished auction: token to the winner and proceeds to the
/// seller, or the token back to the seller if no bid was placed.
///
/// Deliberately callable by anyone; eligibility is determined by the end
/// time alone. A settled auction can never be settled again.
#[receive(
    mutable,
    contract = "NftAuction",
    name = "settleAuction",
    parameter = "AuctionId",
    error = "ContractError",
    enable_logger
)]
fn contract_settle_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    let auction_id: AuctionId = ctx.parameter_cursor().get()?;

    let outcome = host
        .state_mut()
        .settle(auction_id, ctx.metadata().slot_time())?;

    match outcome {
        Settlement::Winner {
            seller,
            token,
            winning_bid,
        } => {
            nft::release_from_escrow(host, &token, ctx.self_address(), winning_bid.account)?;
            host.invoke_transfer(&seller, winning_bid.amount)?;
            logger.log(&AuctionEvent::settle(
                auction_id,
                Some(&winning_bid.account),
                winning_bid.amount,
            ))?;
        }
        Settlement::Unsold { seller, token } => {
            nft::release_from_escrow(host, &token, ctx.self_address(), seller)?;
            logger.log(&AuctionEvent::settle(auction_id, None, Amount::zero()))?;
        }
    }

    Ok(())
}

/// Identifier that will be assigned to the next created auction. Lets a
/// caller learn the id of an auction it just created.
#[receive(
    contract = "NftAuction",
    name = "getNextAuctionId",
    error = "ContractError",
    return_value = "AuctionId"
)]
fn contract_get_next_auction_id<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<AuctionId> {
    Ok(host.state().next_auction_id)
}

/// Snapshot of a single auction record, settled or not.
#[receive(
    contract = "NftAuction",
    name = "getAuction",
    parameter = "AuctionId",
    error = "ContractError",
    return_value = "Auction"
)]
fn contract_get_auction<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<Auction> {
    let auction_id: AuctionId = ctx.parameter_cursor().get()?;
    host.state().view_auction(auction_id)
}

/// CIS-2 receive hook. Escrow transfers into this contract arrive here; the
/// hook only accepts calls from token contracts.
#[receive(
    contract = "NftAuction",
    name = "onReceivingCIS2",
    parameter = "OnReceivingCis2Params<TokenIdVec, TokenAmountU8>",
    error = "ContractError"
)]
fn contract_on_cis2_received<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    _host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        matches!(ctx.sender(), Address::Contract(_)),
        ContractError::ContractOnly
    );
    Ok(())
}

/// Configure the price feed, turning on the quoted-price queries. Restricted
/// to the instance owner and runs at most once; existing auction records are
/// untouched.
#[receive(
    mutable,
    contract = "NftAuction",
    name = "initializeV2",
    parameter = "InitializeV2Params",
    error = "ContractError",
    enable_logger
)]
fn contract_initialize_v2<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
    logger: &mut impl HasLogger,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );

    let params: InitializeV2Params = ctx.parameter_cursor().get()?;

    ensure!(
        host.state().price_feed.is_none(),
        ContractError::AlreadyInitialized
    );
    host.state_mut().price_feed = Some(params.price_feed);

    logger.log(&AuctionEvent::initialize_v2(&params.price_feed))?;

    Ok(())
}

/// Whether the price feed has been configured.
#[receive(
    contract = "NftAuction",
    name = "isV2Initialized",
    error = "ContractError",
    return_value = "bool"
)]
fn contract_is_v2_initialized<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<bool> {
    Ok(host.state().price_feed.is_some())
}

/// Latest price reported by the configured feed, in the feed's own
/// fixed-point scale.
#[receive(
    contract = "NftAuction",
    name = "getLatestQuotedPrice",
    error = "ContractError",
    return_value = "u128"
)]
fn contract_get_latest_quoted_price<S: HasStateApi>(
    _ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<u128> {
    latest_price(host)
}

/// Value of an arbitrary CCD amount in the quoted unit.
#[receive(
    contract = "NftAuction",
    name = "convertToQuoted",
    parameter = "Amount",
    error = "ContractError",
    return_value = "u128"
)]
fn contract_convert_to_quoted<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<u128> {
    let amount: Amount = ctx.parameter_cursor().get()?;
    oracle::to_quoted(amount, latest_price(host)?)
}

/// Value of an auction's minimum bid in the quoted unit.
#[receive(
    contract = "NftAuction",
    name = "getAuctionMinBidQuoted",
    parameter = "AuctionId",
    error = "ContractError",
    return_value = "u128"
)]
fn contract_get_auction_min_bid_quoted<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<u128> {
    let auction_id: AuctionId = ctx.parameter_cursor().get()?;
    let auction = host.state().view_auction(auction_id)?;
    oracle::to_quoted(auction.min_bid, latest_price(host)?)
}

/// Value of an auction's highest bid in the quoted unit. Zero while no bid
/// has been placed.
#[receive(
    contract = "NftAuction",
    name = "getAuctionHighestBidQuoted",
    parameter = "AuctionId",
    error = "ContractError",
    return_value = "u128"
)]
fn contract_get_auction_highest_bid_quoted<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<u128> {
    let auction_id: AuctionId = ctx.parameter_cursor().get()?;
    let auction = host.state().view_auction(auction_id)?;
    match auction.highest_bid {
        Some(bid) => oracle::to_quoted(bid.amount, latest_price(host)?),
        None => Ok(0),
    }
}

/// Switch this instance over to a new module, optionally invoking a
/// migration entrypoint afterwards. Restricted to the instance owner. The
/// module swap leaves all existing state in place; `initializeV2` is the
/// migration step that introduces the price feed.
#[receive(
    mutable,
    contract = "NftAuction",
    name = "upgrade",
    parameter = "UpgradeParams",
    error = "ContractError"
)]
fn contract_upgrade<S: HasStateApi>(
    ctx: &impl HasReceiveContext,
    host: &mut impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<()> {
    ensure!(
        ctx.sender().matches_account(&ctx.owner()),
        ContractError::Unauthorized
    );

    let params: UpgradeParams = ctx.parameter_cursor().get()?;

    host.upgrade(params.module)?;
    if let Some((func, parameters)) = params.migrate {
        host.invoke_contract_raw(
            &ctx.self_address(),
            parameters.as_parameter(),
            func.as_entrypoint_name(),
            Amount::zero(),
        )?;
    }

    Ok(())
}

fn latest_price<S: HasStateApi>(
    host: &impl HasHost<State<S>, StateApiType = S>,
) -> ContractResult<u128> {
    let price_feed = host
        .state()
        .price_feed
        .ok_or(ContractError::OracleUnavailable)?;
    Ok(host.latest_round_price(&price_feed)?.price)
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use crate::events;
    use crate::external::Token;
    use crate::oracle::{PriceFeedResponse, PRICE_FEED_SCALE};
    use concordium_cis2::OperatorOfQueryResponse;
    use concordium_std::test_infrastructure::*;

    const OWNER: AccountAddress = AccountAddress([0u8; 32]);
    const SELLER: AccountAddress = AccountAddress([1u8; 32]);
    const BIDDER_1: AccountAddress = AccountAddress([2u8; 32]);
    const BIDDER_2: AccountAddress = AccountAddress([3u8; 32]);
    const ANYONE: AccountAddress = AccountAddress([4u8; 32]);

    const SELF_ADDRESS: ContractAddress = ContractAddress {
        index: 0,
        subindex: 0,
    };
    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };
    const PRICE_FEED: ContractAddress = ContractAddress {
        index: 5,
        subindex: 0,
    };

    const MIN_BID: Amount = Amount::from_micro_ccd(100);
    const DURATION_MS: u64 = 120_000;
    const CREATED_AT: u64 = 1_000;
    const AUCTION_END: u64 = CREATED_AT + DURATION_MS;

    // 2000.00000000 quoted units per CCD.
    const PRICE: u128 = 2_000 * PRICE_FEED_SCALE;

    fn token() -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![0, 1]),
        }
    }

    fn receive_ctx<'a>(sender: Address, slot_millis: u64) -> TestReceiveContext<'a> {
        let mut ctx = TestReceiveContext::empty();
        ctx.set_self_address(SELF_ADDRESS);
        ctx.set_owner(OWNER);
        ctx.set_sender(sender);
        ctx.set_metadata_slot_time(Timestamp::from_timestamp_millis(slot_millis));
        ctx
    }

    fn fresh_host() -> TestHost<State<TestStateApi>> {
        let mut state_builder = TestStateBuilder::new();
        let state = State::empty(&mut state_builder);
        let mut host = TestHost::new(state, state_builder);
        host.set_self_balance(Amount::from_ccd(1_000));
        host
    }

    fn setup_nft_mocks(host: &mut TestHost<State<TestStateApi>>, operator: bool) {
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("operatorOf".into()),
            MockFn::new_v1::<OperatorOfQueryResponse, _>(move |_, _, _, _| {
                Ok((false, OperatorOfQueryResponse(vec![operator])))
            }),
        );
        host.setup_mock_entrypoint(
            NFT_CONTRACT,
            OwnedEntrypointName::new_unchecked("transfer".into()),
            MockFn::returning_ok(()),
        );
    }

    fn setup_price_feed_mock(host: &mut TestHost<State<TestStateApi>>) {
        host.setup_mock_entrypoint(
            PRICE_FEED,
            OwnedEntrypointName::new_unchecked("latestRoundData".into()),
            MockFn::returning_ok(PriceFeedResponse {
                price: PRICE,
                updated_at: Timestamp::from_timestamp_millis(CREATED_AT),
            }),
        );
    }

    fn create_auction(host: &mut TestHost<State<TestStateApi>>) -> AuctionId {
        let parameter_bytes = to_bytes(&CreateAuctionParams {
            token: token(),
            min_bid: MIN_BID,
            duration: Duration::from_millis(DURATION_MS),
        });
        let mut ctx = receive_ctx(Address::Account(SELLER), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        contract_create_auction(&ctx, host, &mut logger).expect("creation should succeed")
    }

    fn bid(
        host: &mut TestHost<State<TestStateApi>>,
        auction_id: AuctionId,
        bidder: AccountAddress,
        amount: Amount,
        slot_millis: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&auction_id);
        let mut ctx = receive_ctx(Address::Account(bidder), slot_millis);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        contract_bid(&ctx, host, amount, &mut logger)
    }

    fn settle(
        host: &mut TestHost<State<TestStateApi>>,
        auction_id: AuctionId,
        caller: AccountAddress,
        slot_millis: u64,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&auction_id);
        let mut ctx = receive_ctx(Address::Account(caller), slot_millis);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        contract_settle_auction(&ctx, host, &mut logger)
    }

    fn initialize_v2(
        host: &mut TestHost<State<TestStateApi>>,
        sender: AccountAddress,
    ) -> ContractResult<()> {
        let parameter_bytes = to_bytes(&InitializeV2Params {
            price_feed: PRICE_FEED,
        });
        let mut ctx = receive_ctx(Address::Account(sender), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        contract_initialize_v2(&ctx, host, &mut logger)
    }

    #[concordium_test]
    fn test_init() {
        let ctx = TestInitContext::empty();
        let mut state_builder = TestStateBuilder::new();

        let state = contract_init(&ctx, &mut state_builder).expect("init should succeed");
        claim_eq!(state.next_auction_id, 0);
        claim_eq!(state.price_feed, None);
    }

    #[concordium_test]
    fn test_create_auction() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);

        let parameter_bytes = to_bytes(&CreateAuctionParams {
            token: token(),
            min_bid: MIN_BID,
            duration: Duration::from_millis(DURATION_MS),
        });
        let mut ctx = receive_ctx(Address::Account(SELLER), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        let auction_id = contract_create_auction(&ctx, &mut host, &mut logger)
            .expect("creation should succeed");
        claim_eq!(auction_id, 0);
        claim_eq!(host.state().next_auction_id, 1);

        let record = host.state().view_auction(0).expect("record should exist");
        claim_eq!(record.seller, SELLER);
        claim_eq!(record.token, token());
        claim_eq!(record.min_bid, MIN_BID);
        claim_eq!(record.end, Timestamp::from_timestamp_millis(AUCTION_END));
        claim!(!record.settled);

        claim_eq!(logger.logs.len(), 1);
        claim_eq!(logger.logs[0][0], events::CREATE_TAG);
    }

    #[concordium_test]
    fn test_create_auction_requires_operator_rights() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, false);

        let parameter_bytes = to_bytes(&CreateAuctionParams {
            token: token(),
            min_bid: MIN_BID,
            duration: Duration::from_millis(DURATION_MS),
        });
        let mut ctx = receive_ctx(Address::Account(SELLER), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        let result = contract_create_auction(&ctx, &mut host, &mut logger);
        claim_eq!(result, Err(ContractError::Unauthorized));
        claim_eq!(host.state().next_auction_id, 0);
    }

    #[concordium_test]
    fn test_create_auction_rejects_contract_sender() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);

        let parameter_bytes = to_bytes(&CreateAuctionParams {
            token: token(),
            min_bid: MIN_BID,
            duration: Duration::from_millis(DURATION_MS),
        });
        let mut ctx = receive_ctx(Address::Contract(NFT_CONTRACT), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let mut logger = TestLogger::init();

        let result = contract_create_auction(&ctx, &mut host, &mut logger);
        claim_eq!(result, Err(ContractError::OnlyAccountAddress));
    }

    #[concordium_test]
    fn test_bid_sequence_and_refund() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        let auction_id = create_auction(&mut host);

        // Below the minimum.
        let low = bid(
            &mut host,
            auction_id,
            BIDDER_1,
            Amount::from_micro_ccd(80),
            CREATED_AT,
        );
        claim_eq!(low, Err(ContractError::BidTooLow));

        // Exactly the minimum opens the bidding.
        bid(&mut host, auction_id, BIDDER_1, MIN_BID, CREATED_AT)
            .expect("first bid should succeed");
        claim!(host.get_transfers().is_empty());

        // Matching the highest bid is not enough to supersede it.
        let equal = bid(&mut host, auction_id, BIDDER_2, MIN_BID, CREATED_AT);
        claim_eq!(equal, Err(ContractError::BidTooLow));

        // A strictly greater bid supersedes and refunds the previous bidder
        // in the same call.
        bid(
            &mut host,
            auction_id,
            BIDDER_2,
            Amount::from_micro_ccd(150),
            CREATED_AT,
        )
        .expect("higher bid should succeed");
        claim!(host.transfer_occurred(&BIDDER_1, MIN_BID));

        let record = host
            .state()
            .view_auction(auction_id)
            .expect("record should exist");
        claim_eq!(
            record.highest_bid.map(|bid| (bid.account, bid.amount)),
            Some((BIDDER_2, Amount::from_micro_ccd(150)))
        );
    }

    #[concordium_test]
    fn test_bid_at_end_time_is_expired() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        let auction_id = create_auction(&mut host);

        let result = bid(&mut host, auction_id, BIDDER_1, MIN_BID, AUCTION_END);
        claim_eq!(result, Err(ContractError::AuctionExpired));
    }

    #[concordium_test]
    fn test_bid_unknown_auction() {
        let mut host = fresh_host();

        let result = bid(&mut host, 3, BIDDER_1, MIN_BID, CREATED_AT);
        claim_eq!(result, Err(ContractError::AuctionNotFound));
    }

    #[concordium_test]
    fn test_settle_pays_seller_and_is_terminal() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        let auction_id = create_auction(&mut host);

        bid(&mut host, auction_id, BIDDER_1, MIN_BID, CREATED_AT)
            .expect("first bid should succeed");
        bid(
            &mut host,
            auction_id,
            BIDDER_2,
            Amount::from_micro_ccd(150),
            CREATED_AT,
        )
        .expect("higher bid should succeed");

        // Still open one millisecond before the end.
        let early = settle(&mut host, auction_id, ANYONE, AUCTION_END - 1);
        claim_eq!(early, Err(ContractError::AuctionStillActive));

        // Anyone may settle once the end time has been reached.
        settle(&mut host, auction_id, ANYONE, AUCTION_END).expect("settling should succeed");
        claim!(host.transfer_occurred(&SELLER, Amount::from_micro_ccd(150)));

        let record = host
            .state()
            .view_auction(auction_id)
            .expect("record should exist");
        claim!(record.settled);

        // A repeat call rejects and moves nothing.
        let transfers_before = host.get_transfers().len();
        let repeat = settle(&mut host, auction_id, ANYONE, AUCTION_END);
        claim_eq!(repeat, Err(ContractError::AuctionAlreadySettled));
        claim_eq!(host.get_transfers().len(), transfers_before);
    }

    #[concordium_test]
    fn test_settle_unsold_returns_token_without_payment() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        let auction_id = create_auction(&mut host);

        settle(&mut host, auction_id, ANYONE, AUCTION_END).expect("settling should succeed");

        // The token went back to the seller through the custody call; no CCD
        // moved at all.
        claim!(host.get_transfers().is_empty());
        let record = host
            .state()
            .view_auction(auction_id)
            .expect("record should exist");
        claim!(record.settled);
    }

    #[concordium_test]
    fn test_get_next_auction_id_tracks_creation() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);

        let ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        claim_eq!(contract_get_next_auction_id(&ctx, &host), Ok(0));

        let auction_id = create_auction(&mut host);
        claim_eq!(auction_id, 0);
        claim_eq!(contract_get_next_auction_id(&ctx, &host), Ok(1));
    }

    #[concordium_test]
    fn test_get_auction_unknown_id() {
        let host = fresh_host();

        let parameter_bytes = to_bytes(&7u64);
        let mut ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);

        let result = contract_get_auction(&ctx, &host);
        claim_eq!(result, Err(ContractError::AuctionNotFound));
    }

    #[concordium_test]
    fn test_receive_hook_rejects_accounts() {
        let host = fresh_host();

        let ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        let result = contract_on_cis2_received(&ctx, &host);
        claim_eq!(result, Err(ContractError::ContractOnly));

        let ctx = receive_ctx(Address::Contract(NFT_CONTRACT), CREATED_AT);
        let result = contract_on_cis2_received(&ctx, &host);
        claim_eq!(result, Ok(()));
    }

    #[concordium_test]
    fn test_initialize_v2_is_owner_only_and_runs_once() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        let auction_id = create_auction(&mut host);
        let before = host
            .state()
            .view_auction(auction_id)
            .expect("record should exist");

        let not_owner = initialize_v2(&mut host, SELLER);
        claim_eq!(not_owner, Err(ContractError::Unauthorized));

        let ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        claim_eq!(contract_is_v2_initialized(&ctx, &host), Ok(false));

        initialize_v2(&mut host, OWNER).expect("initialization should succeed");
        claim_eq!(contract_is_v2_initialized(&ctx, &host), Ok(true));
        claim_eq!(host.state().price_feed, Some(PRICE_FEED));

        // A second attempt must not reconfigure anything.
        let repeat = initialize_v2(&mut host, OWNER);
        claim_eq!(repeat, Err(ContractError::AlreadyInitialized));
        claim_eq!(host.state().price_feed, Some(PRICE_FEED));

        // Records that existed before the transition are untouched.
        let after = host
            .state()
            .view_auction(auction_id)
            .expect("record should exist");
        claim_eq!(before, after);
    }

    #[concordium_test]
    fn test_quoted_queries_before_initialization() {
        let host = fresh_host();
        let ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);

        let price = contract_get_latest_quoted_price(&ctx, &host);
        claim_eq!(price, Err(ContractError::OracleUnavailable));

        let parameter_bytes = to_bytes(&Amount::from_ccd(1));
        let mut ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        ctx.set_parameter(&parameter_bytes);
        let converted = contract_convert_to_quoted(&ctx, &host);
        claim_eq!(converted, Err(ContractError::OracleUnavailable));
    }

    #[concordium_test]
    fn test_quoted_queries() {
        let mut host = fresh_host();
        setup_nft_mocks(&mut host, true);
        setup_price_feed_mock(&mut host);
        let auction_id = create_auction(&mut host);
        initialize_v2(&mut host, OWNER).expect("initialization should succeed");

        let ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        claim_eq!(contract_get_latest_quoted_price(&ctx, &host), Ok(PRICE));

        // One CCD converts to exactly the reported price.
        let parameter_bytes = to_bytes(&Amount::from_ccd(1));
        let mut convert_ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        convert_ctx.set_parameter(&parameter_bytes);
        claim_eq!(contract_convert_to_quoted(&convert_ctx, &host), Ok(PRICE));

        let parameter_bytes = to_bytes(&auction_id);
        let mut id_ctx = receive_ctx(Address::Account(ANYONE), CREATED_AT);
        id_ctx.set_parameter(&parameter_bytes);

        let expected_min = oracle::to_quoted(MIN_BID, PRICE).expect("conversion should succeed");
        claim_eq!(
            contract_get_auction_min_bid_quoted(&id_ctx, &host),
            Ok(expected_min)
        );

        // No bid yet: zero, not an error.
        claim_eq!(
            contract_get_auction_highest_bid_quoted(&id_ctx, &host),
            Ok(0)
        );

        bid(
            &mut host,
            auction_id,
            BIDDER_1,
            Amount::from_micro_ccd(150),
            CREATED_AT,
        )
        .expect("bid should succeed");

        let expected_highest = oracle::to_quoted(Amount::from_micro_ccd(150), PRICE)
            .expect("conversion should succeed");
        claim_eq!(
            contract_get_auction_highest_bid_quoted(&id_ctx, &host),
            Ok(expected_highest)
        );
    }

    #[concordium_test]
    fn test_upgrade_is_owner_only() {
        let mut host = fresh_host();

        let ctx = receive_ctx(Address::Account(SELLER), CREATED_AT);
        let result = contract_upgrade(&ctx, &mut host);
        claim_eq!(result, Err(ContractError::Unauthorized));
    }
}
