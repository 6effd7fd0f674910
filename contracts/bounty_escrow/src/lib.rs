#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, token, Address, Env,
    String, Symbol, Vec,
};

mod events;

pub use events::BountyEvent;

pub const MAX_DESCRIPTION_LEN: u32 = 500;
pub const MAX_SCOPES: u32 = 10;
pub const MAX_SCOPE_LEN: u32 = 50;

const DAY_IN_LEDGERS: u32 = 17_280;
/// Bounty entries live in persistent storage and are bumped on every write.
const BOUNTY_TTL_EXTEND_TO: u32 = 90 * DAY_IN_LEDGERS;
const BOUNTY_TTL_THRESHOLD: u32 = BOUNTY_TTL_EXTEND_TO - DAY_IN_LEDGERS;
const INSTANCE_TTL_EXTEND_TO: u32 = 30 * DAY_IN_LEDGERS;
const INSTANCE_TTL_THRESHOLD: u32 = INSTANCE_TTL_EXTEND_TO - DAY_IN_LEDGERS;

#[contract]
pub struct BountyEscrowContract;

/// Reward amounts per severity level. All four are replaced together.
#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct RewardTiers {
    pub low: i128,
    pub medium: i128,
    pub high: i128,
    pub critical: i128,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct BountyRecord {
    pub id: u64,
    pub creator: Address,
    pub description: String,
    pub scopes: Vec<String>,
    pub reward_tiers: RewardTiers,
    pub active: bool,
    pub created_at: u64,
    pub closed_at: Option<u64>,
}

/// Read view of a bounty. `escrowed` is taken from the bounty's fund balance
/// at read time and is zero once the bounty is closed.
#[derive(Clone, Debug, Eq, PartialEq)]
#[contracttype]
pub struct Bounty {
    pub id: u64,
    pub creator: Address,
    pub description: String,
    pub scopes: Vec<String>,
    pub reward_tiers: RewardTiers,
    pub escrowed: i128,
    pub active: bool,
    pub created_at: u64,
    pub closed_at: Option<u64>,
}

#[derive(Clone)]
#[contracttype]
enum DataKey {
    Admin,
    /// Token every bounty is escrowed in.
    Token,
    Paused,
    /// Id of the most recently created bounty.
    BountyCounter,
    /// Sum of all live `BountyFunds` entries.
    TotalEscrowed,
    /// Collaborator allowed to release escrow through `withdraw_for_payout`.
    PayoutAuthority,
    Bounty(u64),
    BountyFunds(u64),
}

#[contracterror]
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
#[repr(u32)]
pub enum Error {
    NotAuthorized = 1,
    InsufficientFunds = 2,
    NotFound = 3,
    Closed = 4,
    Paused = 5,
    InvalidAmount = 6,
    InvalidSeverity = 7,
    InvalidTarget = 8,
    AlreadyExists = 9,
    InvalidScope = 10,
    NotInitialized = 11,
    AlreadyInitialized = 12,
    /// Description exceeds `MAX_DESCRIPTION_LEN` bytes.
    InvalidDescription = 13,
    MathOverflow = 14,
}

fn read_admin(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)
}

fn require_admin(env: &Env, caller: &Address) -> Result<Address, Error> {
    let admin = read_admin(env)?;
    if *caller != admin {
        return Err(Error::NotAuthorized);
    }
    caller.require_auth();
    Ok(admin)
}

fn read_token(env: &Env) -> Result<Address, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .ok_or(Error::NotInitialized)
}

fn read_paused(env: &Env) -> Result<bool, Error> {
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .ok_or(Error::NotInitialized)
}

fn ensure_not_paused(env: &Env) -> Result<(), Error> {
    if read_paused(env)? {
        return Err(Error::Paused);
    }
    Ok(())
}

fn read_bounty_counter(env: &Env) -> u64 {
    env.storage()
        .instance()
        .get(&DataKey::BountyCounter)
        .unwrap_or(0)
}

fn read_total_escrowed(env: &Env) -> i128 {
    env.storage()
        .instance()
        .get(&DataKey::TotalEscrowed)
        .unwrap_or(0)
}

fn write_total_escrowed(env: &Env, total: i128) {
    env.storage().instance().set(&DataKey::TotalEscrowed, &total);
}

fn read_payout_authority(env: &Env) -> Option<Address> {
    env.storage().instance().get(&DataKey::PayoutAuthority)
}

fn require_payout_authority(env: &Env) -> Result<Address, Error> {
    let authority = read_payout_authority(env).ok_or(Error::NotAuthorized)?;
    authority.require_auth();
    Ok(authority)
}

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_TTL_THRESHOLD, INSTANCE_TTL_EXTEND_TO);
}

fn read_bounty(env: &Env, bounty_id: u64) -> Result<BountyRecord, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Bounty(bounty_id))
        .ok_or(Error::NotFound)
}

fn write_bounty(env: &Env, record: &BountyRecord) {
    let key = DataKey::Bounty(record.id);
    env.storage().persistent().set(&key, record);
    env.storage()
        .persistent()
        .extend_ttl(&key, BOUNTY_TTL_THRESHOLD, BOUNTY_TTL_EXTEND_TO);
}

fn read_bounty_funds(env: &Env, bounty_id: u64) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::BountyFunds(bounty_id))
        .unwrap_or(0)
}

fn write_bounty_funds(env: &Env, bounty_id: u64, amount: i128) {
    let key = DataKey::BountyFunds(bounty_id);
    env.storage().persistent().set(&key, &amount);
    env.storage()
        .persistent()
        .extend_ttl(&key, BOUNTY_TTL_THRESHOLD, BOUNTY_TTL_EXTEND_TO);
}

fn remove_bounty_funds(env: &Env, bounty_id: u64) {
    env.storage()
        .persistent()
        .remove(&DataKey::BountyFunds(bounty_id));
}

fn validate_scopes(scopes: &Vec<String>) -> Result<(), Error> {
    if scopes.is_empty() || scopes.len() > MAX_SCOPES {
        return Err(Error::InvalidScope);
    }
    for scope in scopes.iter() {
        if scope.len() == 0 || scope.len() > MAX_SCOPE_LEN {
            return Err(Error::InvalidScope);
        }
    }
    Ok(())
}

fn validate_tiers(tiers: &RewardTiers) -> Result<(), Error> {
    if tiers.low < 0 || tiers.medium < 0 || tiers.high < 0 || tiers.critical < 0 {
        return Err(Error::InvalidAmount);
    }
    Ok(())
}

fn reward_for_severity(tiers: &RewardTiers, severity: &Symbol) -> Result<i128, Error> {
    if *severity == symbol_short!("low") {
        Ok(tiers.low)
    } else if *severity == symbol_short!("medium") {
        Ok(tiers.medium)
    } else if *severity == symbol_short!("high") {
        Ok(tiers.high)
    } else if *severity == symbol_short!("critical") {
        Ok(tiers.critical)
    } else {
        Err(Error::InvalidSeverity)
    }
}

/// Moves `amount` of the escrow token from `from` to `to`. The source balance
/// is checked first so a shortfall surfaces as `InsufficientFunds` rather
/// than a trap inside the token contract.
fn transfer(env: &Env, from: &Address, to: &Address, amount: i128) -> Result<(), Error> {
    let client = token::Client::new(env, &read_token(env)?);
    if client.balance(from) < amount {
        return Err(Error::InsufficientFunds);
    }
    client.transfer(from, to, &amount);
    Ok(())
}

fn into_view(env: &Env, record: BountyRecord) -> Bounty {
    let escrowed = read_bounty_funds(env, record.id);
    Bounty {
        id: record.id,
        creator: record.creator,
        description: record.description,
        scopes: record.scopes,
        reward_tiers: record.reward_tiers,
        escrowed,
        active: record.active,
        created_at: record.created_at,
        closed_at: record.closed_at,
    }
}

#[contractimpl]
impl BountyEscrowContract {
    pub fn initialize(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        admin.require_auth();
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Token, &token);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage().instance().set(&DataKey::BountyCounter, &0_u64);
        write_total_escrowed(&env, 0);
        bump_instance(&env);

        log!(&env, "bounty escrow initialized", admin);
        events::emit_initialized(&env, &admin);
        Ok(())
    }

    pub fn set_paused(env: Env, caller: Address, value: bool) -> Result<bool, Error> {
        let admin = require_admin(&env, &caller)?;
        env.storage().instance().set(&DataKey::Paused, &value);
        bump_instance(&env);

        log!(&env, "pause flag changed", value);
        events::emit_pause_changed(&env, &admin, value);
        Ok(value)
    }

    pub fn transfer_admin(env: Env, caller: Address, new_admin: Address) -> Result<(), Error> {
        let admin = require_admin(&env, &caller)?;
        if new_admin == caller {
            return Err(Error::InvalidTarget);
        }
        env.storage().instance().set(&DataKey::Admin, &new_admin);
        bump_instance(&env);

        log!(&env, "admin transferred", new_admin);
        events::emit_admin_transferred(&env, &admin, &new_admin);
        Ok(())
    }

    /// Registers the collaborator that may release escrow to hunters. Admin
    /// configuration, so it stays available while the contract is paused.
    pub fn set_payout_authority(
        env: Env,
        caller: Address,
        authority: Address,
    ) -> Result<(), Error> {
        let admin = require_admin(&env, &caller)?;
        env.storage()
            .instance()
            .set(&DataKey::PayoutAuthority, &authority);
        bump_instance(&env);

        events::emit_payout_authority_set(&env, &admin, &authority);
        Ok(())
    }

    pub fn create_bounty(
        env: Env,
        caller: Address,
        description: String,
        scopes: Vec<String>,
        tiers: RewardTiers,
        initial_fund: i128,
    ) -> Result<u64, Error> {
        ensure_not_paused(&env)?;
        caller.require_auth();
        validate_scopes(&scopes)?;

        if description.len() > MAX_DESCRIPTION_LEN {
            return Err(Error::InvalidDescription);
        }

        validate_tiers(&tiers)?;

        if initial_fund <= 0 {
            return Err(Error::InvalidAmount);
        }

        let bounty_id = read_bounty_counter(&env)
            .checked_add(1)
            .ok_or(Error::MathOverflow)?;

        // Unreachable while the counter only grows; guards against foreign writes.
        if env.storage().persistent().has(&DataKey::Bounty(bounty_id)) {
            return Err(Error::AlreadyExists);
        }

        let total = read_total_escrowed(&env)
            .checked_add(initial_fund)
            .ok_or(Error::MathOverflow)?;

        transfer(&env, &caller, &env.current_contract_address(), initial_fund)?;

        let record = BountyRecord {
            id: bounty_id,
            creator: caller.clone(),
            description,
            scopes,
            reward_tiers: tiers,
            active: true,
            created_at: env.ledger().timestamp(),
            closed_at: None,
        };

        write_bounty(&env, &record);
        write_bounty_funds(&env, bounty_id, initial_fund);
        env.storage()
            .instance()
            .set(&DataKey::BountyCounter, &bounty_id);
        write_total_escrowed(&env, total);
        bump_instance(&env);

        events::emit_bounty_created(&env, bounty_id, initial_fund, &caller);
        Ok(bounty_id)
    }

    /// Anyone may add funds to an active bounty.
    pub fn fund_bounty(
        env: Env,
        caller: Address,
        bounty_id: u64,
        amount: i128,
    ) -> Result<bool, Error> {
        ensure_not_paused(&env)?;
        caller.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let record = read_bounty(&env, bounty_id)?;
        if !record.active {
            return Err(Error::Closed);
        }

        let balance = read_bounty_funds(&env, bounty_id)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;
        let total = read_total_escrowed(&env)
            .checked_add(amount)
            .ok_or(Error::MathOverflow)?;

        transfer(&env, &caller, &env.current_contract_address(), amount)?;

        write_bounty_funds(&env, bounty_id, balance);
        write_total_escrowed(&env, total);
        bump_instance(&env);

        events::emit_bounty_funded(&env, bounty_id, amount, &caller);
        Ok(true)
    }

    pub fn update_reward_tiers(
        env: Env,
        caller: Address,
        bounty_id: u64,
        tiers: RewardTiers,
    ) -> Result<bool, Error> {
        ensure_not_paused(&env)?;
        caller.require_auth();

        let mut record = read_bounty(&env, bounty_id)?;
        if caller != record.creator {
            return Err(Error::NotAuthorized);
        }
        if !record.active {
            return Err(Error::Closed);
        }

        validate_tiers(&tiers)?;

        record.reward_tiers = tiers;
        write_bounty(&env, &record);
        bump_instance(&env);

        events::emit_tiers_updated(&env, bounty_id, &caller);
        Ok(true)
    }

    /// Closes an active bounty and refunds whatever is still escrowed for it
    /// to the creator. The bounty is read-only afterwards.
    pub fn close_bounty(env: Env, caller: Address, bounty_id: u64) -> Result<bool, Error> {
        ensure_not_paused(&env)?;
        caller.require_auth();

        let mut record = read_bounty(&env, bounty_id)?;
        if caller != record.creator {
            return Err(Error::NotAuthorized);
        }
        if !record.active {
            return Err(Error::Closed);
        }

        let remaining = read_bounty_funds(&env, bounty_id);
        let total = read_total_escrowed(&env)
            .checked_sub(remaining)
            .ok_or(Error::MathOverflow)?;

        if remaining > 0 {
            transfer(
                &env,
                &env.current_contract_address(),
                &record.creator,
                remaining,
            )?;
        }

        record.active = false;
        record.closed_at = Some(env.ledger().timestamp());
        write_bounty(&env, &record);
        remove_bounty_funds(&env, bounty_id);
        write_total_escrowed(&env, total);
        bump_instance(&env);

        log!(&env, "bounty closed", bounty_id, remaining);
        events::emit_bounty_closed(&env, bounty_id, remaining, &record.creator);
        Ok(true)
    }

    /// Releases `amount` from a bounty's escrow to `recipient`. Only the
    /// registered payout authority can call this, after it has settled which
    /// submission is paid and at what severity.
    pub fn withdraw_for_payout(
        env: Env,
        bounty_id: u64,
        amount: i128,
        recipient: Address,
    ) -> Result<bool, Error> {
        ensure_not_paused(&env)?;
        require_payout_authority(&env)?;

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let record = read_bounty(&env, bounty_id)?;
        if !record.active {
            return Err(Error::Closed);
        }

        // Tokens sent back to custody would leave the ledger unattributed.
        if recipient == env.current_contract_address() {
            return Err(Error::InvalidTarget);
        }

        let available = read_bounty_funds(&env, bounty_id);
        if available < amount {
            return Err(Error::InsufficientFunds);
        }

        let balance = available
            .checked_sub(amount)
            .ok_or(Error::MathOverflow)?;
        let total = read_total_escrowed(&env)
            .checked_sub(amount)
            .ok_or(Error::MathOverflow)?;

        transfer(&env, &env.current_contract_address(), &recipient, amount)?;

        write_bounty_funds(&env, bounty_id, balance);
        write_total_escrowed(&env, total);
        bump_instance(&env);

        events::emit_payout_withdrawn(&env, bounty_id, amount, &recipient);
        Ok(true)
    }

    pub fn get_bounty(env: Env, bounty_id: u64) -> Result<Bounty, Error> {
        let record = read_bounty(&env, bounty_id)?;
        Ok(into_view(&env, record))
    }

    pub fn get_bounty_creator(env: Env, bounty_id: u64) -> Result<Address, Error> {
        Ok(read_bounty(&env, bounty_id)?.creator)
    }

    pub fn get_bounty_escrow(env: Env, bounty_id: u64) -> i128 {
        read_bounty_funds(&env, bounty_id)
    }

    pub fn get_total_escrowed(env: Env) -> i128 {
        read_total_escrowed(&env)
    }

    pub fn get_admin(env: Env) -> Result<Address, Error> {
        read_admin(&env)
    }

    pub fn get_token(env: Env) -> Result<Address, Error> {
        read_token(&env)
    }

    pub fn get_payout_authority(env: Env) -> Option<Address> {
        read_payout_authority(&env)
    }

    pub fn is_paused(env: Env) -> bool {
        read_paused(&env).unwrap_or(false)
    }

    pub fn get_bounty_counter(env: Env) -> u64 {
        read_bounty_counter(&env)
    }

    pub fn get_reward(env: Env, bounty_id: u64, severity: Symbol) -> Result<i128, Error> {
        let record = read_bounty(&env, bounty_id)?;
        reward_for_severity(&record.reward_tiers, &severity)
    }
}

mod test_admin;
