//! Proof of Stake validator selection.
//!
//! The next block producer is drawn at random with probability proportional
//! to stake. No proof-of-work search is involved: selection is a single
//! bounded pass over the stake table.

use crate::stake::StakeTable;
use rand::Rng;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during consensus operations.
#[derive(Debug, Error, PartialEq)]
pub enum ConsensusError {
    /// Nothing is staked. Block production must wait; not a fault.
    #[error("no eligible validator: total stake is zero")]
    NoEligibleValidator,

    #[error("random draw {draw} outside [0, {total})")]
    DrawOutOfRange { draw: f64, total: u64 },

    #[error("ticket {ticket} outside [0, {total})")]
    TicketOutOfRange { ticket: u64, total: u64 },

    #[error("staking {amount} for {account} would overflow the stake table")]
    StakeOverflow { account: String, amount: u64 },
}

pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Draw a ticket uniformly from `[0, total)` and select the validator holding it.
///
/// The draw is integral, so selection stays exact for totals beyond the
/// range an `f64` represents without rounding.
pub fn select_validator<R: Rng + ?Sized>(stakes: &StakeTable, rng: &mut R) -> Result<String> {
    let total = stakes.total();
    if total == 0 {
        return Err(ConsensusError::NoEligibleValidator);
    }

    let ticket = rng.gen_range(0..total);
    let selected = select_with_ticket(stakes, ticket)?;
    debug!(validator = %selected, ticket, total, "validator selected");
    Ok(selected)
}

/// Return the account holding `ticket`: account `i` holds the tickets in
/// `[sum(stake[..i]), sum(stake[..=i]))`.
pub fn select_with_ticket(stakes: &StakeTable, ticket: u64) -> Result<String> {
    let total = stakes.total();
    if total == 0 {
        return Err(ConsensusError::NoEligibleValidator);
    }
    if ticket >= total {
        return Err(ConsensusError::TicketOutOfRange { ticket, total });
    }

    // Partial sums never exceed `total`, which the table keeps within u64.
    let mut accumulated = 0u64;
    for entry in stakes.iter() {
        accumulated += entry.amount;
        if accumulated > ticket {
            return Ok(entry.account.clone());
        }
    }

    Err(ConsensusError::NoEligibleValidator)
}

/// Deterministic half of [`select_validator`]: walk the table in insertion
/// order and return the first account whose running stake sum is `>= draw`.
///
/// Zero-stake entries are skipped so that a draw of exactly zero cannot land
/// on an account with nothing at stake.
pub fn select_with_draw(stakes: &StakeTable, draw: f64) -> Result<String> {
    let total = stakes.total();
    if total == 0 {
        return Err(ConsensusError::NoEligibleValidator);
    }
    if !(0.0..total as f64).contains(&draw) {
        return Err(ConsensusError::DrawOutOfRange { draw, total });
    }

    let mut accumulated = 0u64;
    for entry in stakes.iter().filter(|e| e.amount > 0) {
        accumulated += entry.amount;
        if accumulated as f64 >= draw {
            return Ok(entry.account.clone());
        }
    }

    // Unreachable for draw < total; keep the last staker as the answer.
    stakes
        .iter()
        .filter(|e| e.amount > 0)
        .last()
        .map(|e| e.account.clone())
        .ok_or(ConsensusError::NoEligibleValidator)
}
