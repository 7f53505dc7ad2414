use concordium_std::*;

use crate::external::{AuctionId, Token};

pub const CREATE_TAG: u8 = 0;
pub const BID_TAG: u8 = 1;
pub const SETTLE_TAG: u8 = 2;
pub const INITIALIZE_V2_TAG: u8 = 3;

/// Auction creation event data.
#[derive(Debug, Serial)]
pub struct CreateEvent<'a> {
    /// Identifier assigned to the auction.
    pub auction_id: AuctionId,
    /// Token taken into escrow.
    pub token: &'a Token,
    /// Seller account address.
    pub seller: &'a AccountAddress,
    /// Smallest acceptable first bid.
    pub min_bid: Amount,
    /// Absolute end time.
    pub end: Timestamp,
}

/// Bid event data.
#[derive(Debug, Serial)]
pub struct BidEvent<'a> {
    pub auction_id: AuctionId,
    /// Bidder account address.
    pub bidder: &'a AccountAddress,
    /// Bid amount.
    pub amount: Amount,
}

/// Settlement event data.
#[derive(Debug, Serial)]
pub struct SettleEvent<'a> {
    pub auction_id: AuctionId,
    /// Auction winner, or `None` when no bid was placed and the token went
    /// back to the seller.
    pub winner: Option<&'a AccountAddress>,
    /// Winning bid amount, zero when unsold.
    pub price: Amount,
}

/// Version 2 initialization event data.
#[derive(Debug, Serial)]
pub struct InitializeV2Event<'a> {
    /// Configured price feed contract.
    pub price_feed: &'a ContractAddress,
}

/// Tagged event to be serialized for the event log.
#[derive(Debug)]
pub enum AuctionEvent<'a> {
    Create(CreateEvent<'a>),
    Bid(BidEvent<'a>),
    Settle(SettleEvent<'a>),
    InitializeV2(InitializeV2Event<'a>),
}

impl<'a> AuctionEvent<'a> {
    pub fn create(
        auction_id: AuctionId,
        token: &'a Token,
        seller: &'a AccountAddress,
        min_bid: Amount,
        end: Timestamp,
    ) -> Self {
        Self::Create(CreateEvent {
            auction_id,
            token,
            seller,
            min_bid,
            end,
        })
    }

    pub fn bid(auction_id: AuctionId, bidder: &'a AccountAddress, amount: Amount) -> Self {
        Self::Bid(BidEvent {
            auction_id,
            bidder,
            amount,
        })
    }

    pub fn settle(
        auction_id: AuctionId,
        winner: Option<&'a AccountAddress>,
        price: Amount,
    ) -> Self {
        Self::Settle(SettleEvent {
            auction_id,
            winner,
            price,
        })
    }

    pub fn initialize_v2(price_feed: &'a ContractAddress) -> Self {
        Self::InitializeV2(InitializeV2Event { price_feed })
    }
}

impl<'a> Serial for AuctionEvent<'a> {
    fn serial<W: Write>(&self, out: &mut W) -> Result<(), W::Err> {
        match self {
            AuctionEvent::Create(event) => {
                out.write_u8(CREATE_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Bid(event) => {
                out.write_u8(BID_TAG)?;
                event.serial(out)
            }
            AuctionEvent::Settle(event) => {
                out.write_u8(SETTLE_TAG)?;
                event.serial(out)
            }
            AuctionEvent::InitializeV2(event) => {
                out.write_u8(INITIALIZE_V2_TAG)?;
                event.serial(out)
            }
        }
    }
}
