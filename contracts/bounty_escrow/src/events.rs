//! Audit events published by the bounty escrow contract.
//!
//! Every successful state change publishes exactly one event. Bounty events
//! use the topics `("bounty", <name>, bounty_id)` so indexers can filter on a
//! single bounty; admin events use `("admin", <name>)`.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol};

/// Payload of every bounty lifecycle event.
///
/// `amount` is the value that moved with the event: the initial pool for
/// `created`, the deposit for `funded`, the refund for `closed` and the
/// released value for `payout`. It is zero for `tiers`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BountyEvent {
    pub bounty_id: u64,
    pub amount: i128,
    pub actor: Address,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdminEvent {
    pub admin: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseChanged {
    pub admin: Address,
    pub paused: bool,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AdminTransferred {
    pub previous: Address,
    pub admin: Address,
    pub timestamp: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutAuthoritySet {
    pub admin: Address,
    pub authority: Address,
    pub timestamp: u64,
}

pub const BOUNTY_TOPIC: Symbol = symbol_short!("bounty");
pub const ADMIN_TOPIC: Symbol = symbol_short!("admin");

pub const CREATED: Symbol = symbol_short!("created");
pub const FUNDED: Symbol = symbol_short!("funded");
pub const TIERS_UPDATED: Symbol = symbol_short!("tiers");
pub const CLOSED: Symbol = symbol_short!("closed");
pub const PAYOUT_WITHDRAWN: Symbol = symbol_short!("payout");

fn emit_bounty(env: &Env, name: Symbol, bounty_id: u64, amount: i128, actor: &Address) {
    env.events().publish(
        (BOUNTY_TOPIC, name, bounty_id),
        BountyEvent {
            bounty_id,
            amount,
            actor: actor.clone(),
        },
    );
}

pub fn emit_bounty_created(env: &Env, bounty_id: u64, amount: i128, creator: &Address) {
    emit_bounty(env, CREATED, bounty_id, amount, creator);
}

pub fn emit_bounty_funded(env: &Env, bounty_id: u64, amount: i128, funder: &Address) {
    emit_bounty(env, FUNDED, bounty_id, amount, funder);
}

pub fn emit_tiers_updated(env: &Env, bounty_id: u64, creator: &Address) {
    emit_bounty(env, TIERS_UPDATED, bounty_id, 0, creator);
}

pub fn emit_bounty_closed(env: &Env, bounty_id: u64, refunded: i128, creator: &Address) {
    emit_bounty(env, CLOSED, bounty_id, refunded, creator);
}

/// The actor of a payout event is the recipient of the released value.
pub fn emit_payout_withdrawn(env: &Env, bounty_id: u64, amount: i128, recipient: &Address) {
    emit_bounty(env, PAYOUT_WITHDRAWN, bounty_id, amount, recipient);
}

pub fn emit_initialized(env: &Env, admin: &Address) {
    env.events().publish(
        (ADMIN_TOPIC, symbol_short!("init")),
        AdminEvent {
            admin: admin.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn emit_pause_changed(env: &Env, admin: &Address, paused: bool) {
    env.events().publish(
        (ADMIN_TOPIC, symbol_short!("paused")),
        PauseChanged {
            admin: admin.clone(),
            paused,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn emit_admin_transferred(env: &Env, previous: &Address, admin: &Address) {
    env.events().publish(
        (ADMIN_TOPIC, symbol_short!("transfer")),
        AdminTransferred {
            previous: previous.clone(),
            admin: admin.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn emit_payout_authority_set(env: &Env, admin: &Address, authority: &Address) {
    env.events().publish(
        (ADMIN_TOPIC, symbol_short!("payout")),
        PayoutAuthoritySet {
            admin: admin.clone(),
            authority: authority.clone(),
            timestamp: env.ledger().timestamp(),
        },
    );
}
