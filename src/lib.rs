//! Timed, escrow-based auctions of single CIS-2 tokens, paid in CCD.
//!
//! Sellers put one token up for auction at a time; the contract holds the
//! token in escrow together with the current highest bid until the auction
//! ends and anyone settles it. A one-time version 2 initialization plugs in
//! an external price feed and adds read-only queries that quote auction
//! amounts in an external unit.
#![cfg_attr(not(feature = "std"), no_std)]

mod contract;
mod errors;
mod events;
mod external;
mod nft;
mod oracle;
mod state;
