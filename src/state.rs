use concordium_std::*;

use crate::errors::{ContractError, ContractResult};
use crate::external::{AuctionId, Token};

/// A bid held in escrow by the contract until it is either superseded and
/// refunded, or released to the seller on settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct Bid {
    pub account: AccountAddress,
    pub amount: Amount,
}

/// A single auction record. Records are append-only: once settled they are
/// kept as immutable history, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, SchemaType)]
pub struct Auction {
    /// Account that created the auction. Receives the proceeds, or the token
    /// back if no bid was placed.
    pub seller: AccountAddress,
    /// Token held in escrow by this contract from creation until settlement.
    pub token: Token,
    /// Smallest acceptable first bid. Fixed at creation.
    pub min_bid: Amount,
    /// Absolute end time. Fixed at creation, bids at or past this time are
    /// rejected.
    pub end: Timestamp,
    /// Current leading bid, if any. The amount never decreases.
    pub highest_bid: Option<Bid>,
    /// Flips to true exactly once; no bid or settlement is accepted after.
    pub settled: bool,
}

/// Terminal outcome of an auction. The caller is responsible for moving the
/// escrowed token and funds accordingly.
#[must_use]
pub enum Settlement {
    /// A bid was placed: the token goes to the winner, the winning amount to
    /// the seller.
    Winner {
        seller: AccountAddress,
        token: Token,
        winning_bid: Bid,
    },
    /// No bids were placed: the token goes back to the seller.
    Unsold {
        seller: AccountAddress,
        token: Token,
    },
}

/// The contract state.
#[derive(Serial, DeserialWithState)]
#[concordium(state_parameter = "S")]
pub struct State<S: HasStateApi> {
    /// Identifier assigned to the next created auction. Incremented only
    /// inside `create_auction`.
    pub next_auction_id: AuctionId,
    /// All auctions ever created, keyed by their sequential identifier.
    pub auctions: StateMap<AuctionId, Auction, S>,
    /// Price feed contract, configured once by `initializeV2`. `None` means
    /// version 2 is not initialized.
    pub price_feed: Option<ContractAddress>,
}

impl<S: HasStateApi> State<S> {
    /// Creates an empty state with no auctions and no price feed.
    pub fn empty(state_builder: &mut StateBuilder<S>) -> Self {
        State {
            next_auction_id: 0,
            auctions: state_builder.new_map(),
            price_feed: None,
        }
    }

    /// Allocate the next identifier and store a fresh auction record ending
    /// at `now + duration`. The token must already be in escrow.
    pub fn create_auction(
        &mut self,
        seller: AccountAddress,
        token: Token,
        min_bid: Amount,
        duration: Duration,
        now: Timestamp,
    ) -> ContractResult<AuctionId> {
        ensure!(duration.millis() > 0, ContractError::InvalidParameter);
        ensure!(min_bid > Amount::zero(), ContractError::InvalidParameter);

        let end = now.checked_add(duration).ok_or(ContractError::Overflow)?;
        let auction_id = self.next_auction_id;
        self.auctions.insert(
            auction_id,
            Auction {
                seller,
                token,
                min_bid,
                end,
                highest_bid: None,
                settled: false,
            },
        );
        self.next_auction_id += 1;
        Ok(auction_id)
    }

    /// Apply a bid to an open auction. The first bid must reach the minimum,
    /// every later bid must be strictly greater than the current highest.
    ///
    /// Returns the superseded bid, which MUST be refunded within the same
    /// call.
    pub fn bid(
        &mut self,
        auction_id: AuctionId,
        bidder: AccountAddress,
        amount: Amount,
        now: Timestamp,
    ) -> ContractResult<Option<Bid>> {
        let mut auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(ContractError::AuctionNotFound)?;

        ensure!(!auction.settled, ContractError::AuctionAlreadySettled);
        ensure!(now < auction.end, ContractError::AuctionExpired);

        match &auction.highest_bid {
            None => ensure!(amount >= auction.min_bid, ContractError::BidTooLow),
            Some(current) => ensure!(amount > current.amount, ContractError::BidTooLow),
        }

        Ok(auction.highest_bid.replace(Bid {
            account: bidder,
            amount,
        }))
    }

    /// Resolve a finished auction to its terminal outcome and mark it
    /// settled. Rejects before the end time and rejects repeat calls, so the
    /// outcome transfers can never run twice.
    pub fn settle(&mut self, auction_id: AuctionId, now: Timestamp) -> ContractResult<Settlement> {
        let mut auction = self
            .auctions
            .get_mut(&auction_id)
            .ok_or(ContractError::AuctionNotFound)?;

        ensure!(!auction.settled, ContractError::AuctionAlreadySettled);
        ensure!(now >= auction.end, ContractError::AuctionStillActive);

        auction.settled = true;

        let outcome = match &auction.highest_bid {
            Some(winning_bid) => Settlement::Winner {
                seller: auction.seller,
                token: auction.token.clone(),
                winning_bid: winning_bid.clone(),
            },
            None => Settlement::Unsold {
                seller: auction.seller,
                token: auction.token.clone(),
            },
        };
        Ok(outcome)
    }

    /// Snapshot of a single auction record.
    pub fn view_auction(&self, auction_id: AuctionId) -> ContractResult<Auction> {
        match self.auctions.get(&auction_id) {
            Some(auction) => Ok((*auction).clone()),
            None => Err(ContractError::AuctionNotFound),
        }
    }
}

#[concordium_cfg_test]
mod tests {
    use super::*;
    use concordium_cis2::TokenIdVec;
    use concordium_std::test_infrastructure::*;

    const SELLER: AccountAddress = AccountAddress([0u8; 32]);
    const BIDDER_1: AccountAddress = AccountAddress([1u8; 32]);
    const BIDDER_2: AccountAddress = AccountAddress([2u8; 32]);
    const NFT_CONTRACT: ContractAddress = ContractAddress {
        index: 1,
        subindex: 0,
    };

    const MIN_BID: Amount = Amount::from_micro_ccd(100);
    const DURATION_MS: u64 = 120_000;

    fn token(id: u8) -> Token {
        Token {
            contract: NFT_CONTRACT,
            id: TokenIdVec(vec![id]),
        }
    }

    fn now() -> Timestamp {
        Timestamp::from_timestamp_millis(1_000)
    }

    fn after_end() -> Timestamp {
        Timestamp::from_timestamp_millis(1_000 + DURATION_MS)
    }

    fn fresh_state(state_builder: &mut TestStateBuilder) -> State<TestStateApi> {
        State::empty(state_builder)
    }

    fn create(state: &mut State<TestStateApi>, id: u8) -> AuctionId {
        state
            .create_auction(
                SELLER,
                token(id),
                MIN_BID,
                Duration::from_millis(DURATION_MS),
                now(),
            )
            .expect("creation should succeed")
    }

    #[concordium_test]
    fn test_create_assigns_sequential_ids() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);

        claim_eq!(state.next_auction_id, 0);
        let first = create(&mut state, 0);
        claim_eq!(first, 0);
        claim_eq!(state.next_auction_id, 1);
        let second = create(&mut state, 1);
        claim_eq!(second, 1);
        claim_eq!(state.next_auction_id, 2);

        let record = state.view_auction(first).expect("record should exist");
        claim_eq!(record.seller, SELLER);
        claim_eq!(record.min_bid, MIN_BID);
        claim_eq!(record.end, after_end());
        claim_eq!(record.highest_bid, None);
        claim!(!record.settled);
    }

    #[concordium_test]
    fn test_create_rejects_zero_parameters() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);

        let zero_duration = state.create_auction(
            SELLER,
            token(0),
            MIN_BID,
            Duration::from_millis(0),
            now(),
        );
        claim_eq!(zero_duration, Err(ContractError::InvalidParameter));

        let zero_min_bid = state.create_auction(
            SELLER,
            token(0),
            Amount::zero(),
            Duration::from_millis(DURATION_MS),
            now(),
        );
        claim_eq!(zero_min_bid, Err(ContractError::InvalidParameter));

        // Nothing was allocated by the rejected attempts.
        claim_eq!(state.next_auction_id, 0);
    }

    #[concordium_test]
    fn test_bid_unknown_auction() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);

        let result = state.bid(7, BIDDER_1, MIN_BID, now());
        claim_eq!(result, Err(ContractError::AuctionNotFound));
    }

    #[concordium_test]
    fn test_bid_sequence_is_strictly_increasing() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let auction_id = create(&mut state, 0);

        // Below the minimum.
        let low = state.bid(auction_id, BIDDER_1, Amount::from_micro_ccd(80), now());
        claim_eq!(low, Err(ContractError::BidTooLow));

        // Exactly the minimum is accepted as a first bid.
        let first = state.bid(auction_id, BIDDER_1, MIN_BID, now());
        claim_eq!(first, Ok(None));

        // Matching the highest bid is not enough.
        let equal = state.bid(auction_id, BIDDER_2, MIN_BID, now());
        claim_eq!(equal, Err(ContractError::BidTooLow));

        // A strictly greater bid supersedes and surfaces the refund.
        let higher = state.bid(auction_id, BIDDER_2, Amount::from_micro_ccd(150), now());
        claim_eq!(
            higher,
            Ok(Some(Bid {
                account: BIDDER_1,
                amount: MIN_BID,
            }))
        );

        let record = state.view_auction(auction_id).expect("record should exist");
        claim_eq!(
            record.highest_bid,
            Some(Bid {
                account: BIDDER_2,
                amount: Amount::from_micro_ccd(150),
            })
        );
    }

    #[concordium_test]
    fn test_bid_at_or_after_end_is_rejected() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let auction_id = create(&mut state, 0);

        let at_end = state.bid(auction_id, BIDDER_1, MIN_BID, after_end());
        claim_eq!(at_end, Err(ContractError::AuctionExpired));

        let past_end = state.bid(
            auction_id,
            BIDDER_1,
            MIN_BID,
            Timestamp::from_timestamp_millis(10_000_000),
        );
        claim_eq!(past_end, Err(ContractError::AuctionExpired));
    }

    #[concordium_test]
    fn test_settle_too_early() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let auction_id = create(&mut state, 0);

        let result = state.settle(auction_id, now());
        claim!(matches!(result, Err(ContractError::AuctionStillActive)));

        let record = state.view_auction(auction_id).expect("record should exist");
        claim!(!record.settled);
    }

    #[concordium_test]
    fn test_settle_with_winner_is_terminal() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let auction_id = create(&mut state, 0);

        state
            .bid(auction_id, BIDDER_1, MIN_BID, now())
            .expect("bid should succeed");

        let outcome = state
            .settle(auction_id, after_end())
            .expect("settlement should succeed");
        match outcome {
            Settlement::Winner {
                seller,
                token: settled_token,
                winning_bid,
            } => {
                claim_eq!(seller, SELLER);
                claim_eq!(settled_token, token(0));
                claim_eq!(winning_bid.account, BIDDER_1);
                claim_eq!(winning_bid.amount, MIN_BID);
            }
            Settlement::Unsold { .. } => fail!("expected a winner"),
        }

        // The record survives with the settled flag set.
        let record = state.view_auction(auction_id).expect("record should exist");
        claim!(record.settled);

        // A repeat settlement never re-executes.
        let repeat = state.settle(auction_id, after_end());
        claim!(matches!(repeat, Err(ContractError::AuctionAlreadySettled)));

        // Nor does a late bid get in.
        let late_bid = state.bid(auction_id, BIDDER_2, Amount::from_ccd(1), after_end());
        claim_eq!(late_bid, Err(ContractError::AuctionAlreadySettled));
    }

    #[concordium_test]
    fn test_settle_without_bids_returns_token() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let auction_id = create(&mut state, 0);

        let outcome = state
            .settle(auction_id, after_end())
            .expect("settlement should succeed");
        match outcome {
            Settlement::Unsold {
                seller,
                token: settled_token,
            } => {
                claim_eq!(seller, SELLER);
                claim_eq!(settled_token, token(0));
            }
            Settlement::Winner { .. } => fail!("expected no winner"),
        }
    }

    #[concordium_test]
    fn test_price_feed_configuration_leaves_records_untouched() {
        let mut state_builder = TestStateBuilder::new();
        let mut state = fresh_state(&mut state_builder);
        let first = create(&mut state, 0);
        let second = create(&mut state, 1);
        state
            .bid(first, BIDDER_1, MIN_BID, now())
            .expect("bid should succeed");

        let before: Vec<Auction> = vec![
            state.view_auction(first).expect("record should exist"),
            state.view_auction(second).expect("record should exist"),
        ];

        state.price_feed = Some(ContractAddress {
            index: 9,
            subindex: 0,
        });

        let after: Vec<Auction> = vec![
            state.view_auction(first).expect("record should exist"),
            state.view_auction(second).expect("record should exist"),
        ];
        claim_eq!(before, after);
        claim_eq!(state.next_auction_id, 2);
    }
}
