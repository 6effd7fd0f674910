#![cfg(test)]

use super::events::PayoutAuthoritySet;
use super::{
    BountyEscrowContract, BountyEscrowContractClient, Error, RewardTiers, DAY_IN_LEDGERS,
    INSTANCE_TTL_EXTEND_TO,
};
use soroban_sdk::{
    symbol_short,
    testutils::{storage::Instance as _, Address as _, AuthorizedFunction, Events, Ledger},
    token, vec, Address, Env, InvokeError, String, TryFromVal,
};

fn assert_contract_error<T, C>(
    result: Result<Result<T, C>, Result<Error, InvokeError>>,
    expected: Error,
) {
    assert!(matches!(result, Err(Ok(err)) if err == expected));
}

fn setup(env: &Env) -> (BountyEscrowContractClient<'_>, Address, Address) {
    env.mock_all_auths();
    let admin = Address::generate(env);
    let issuer = Address::generate(env);
    let token = env.register_stellar_asset_contract_v2(issuer).address();

    let contract_id = env.register(BountyEscrowContract, ());
    let client = BountyEscrowContractClient::new(env, &contract_id);
    client.initialize(&admin, &token);
    (client, admin, token)
}

fn funded_creator(env: &Env, token: &Address, amount: i128) -> Address {
    let creator = Address::generate(env);
    token::StellarAssetClient::new(env, token).mint(&creator, &amount);
    creator
}

fn open_bounty(
    env: &Env,
    client: &BountyEscrowContractClient,
    creator: &Address,
    fund: i128,
) -> u64 {
    client.create_bounty(
        creator,
        &String::from_str(env, "Audit the bridge"),
        &vec![env, String::from_str(env, "bridge")],
        &RewardTiers {
            low: 100,
            medium: 500,
            high: 1_000,
            critical: 5_000,
        },
        &fund,
    )
}

#[test]
fn test_initialize_only_once() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);

    assert_eq!(client.get_admin(), admin);
    assert_eq!(client.get_token(), token);
    assert!(!client.is_paused());
    assert_eq!(client.get_bounty_counter(), 0);
    assert_eq!(client.get_total_escrowed(), 0);
    assert_eq!(client.get_payout_authority(), None);

    let other = Address::generate(&env);
    assert_contract_error(
        client.try_initialize(&other, &token),
        Error::AlreadyInitialized,
    );
    assert_eq!(client.get_admin(), admin);
}

#[test]
fn test_uninitialized_contract_rejects_mutations() {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register(BountyEscrowContract, ());
    let client = BountyEscrowContractClient::new(&env, &contract_id);
    let caller = Address::generate(&env);

    assert_contract_error(client.try_get_admin(), Error::NotInitialized);
    assert_contract_error(client.try_set_paused(&caller, &true), Error::NotInitialized);
    assert_contract_error(
        client.try_fund_bounty(&caller, &1, &10),
        Error::NotInitialized,
    );
    assert!(!client.is_paused());
    assert_eq!(client.get_total_escrowed(), 0);
}

#[test]
fn test_set_paused_requires_admin() {
    let env = Env::default();
    let (client, admin, _token) = setup(&env);
    let stranger = Address::generate(&env);

    assert_contract_error(
        client.try_set_paused(&stranger, &true),
        Error::NotAuthorized,
    );
    assert!(!client.is_paused());

    assert!(client.set_paused(&admin, &true));
    let auths = env.auths();
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].0, admin);
    assert!(matches!(
        auths[0].1.function,
        AuthorizedFunction::Contract((_, _, _))
    ));
    assert!(client.is_paused());

    assert!(!client.set_paused(&admin, &false));
    assert!(!client.is_paused());
}

#[test]
fn test_pause_blocks_lifecycle_operations() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 10_000);
    let bounty_id = open_bounty(&env, &client, &creator, 1_000);

    client.set_paused(&admin, &true);

    // Pause is checked before any input validation.
    assert_contract_error(
        client.try_create_bounty(
            &creator,
            &String::from_str(&env, "audit"),
            &vec![&env],
            &RewardTiers {
                low: 0,
                medium: 0,
                high: 0,
                critical: 0,
            },
            &0,
        ),
        Error::Paused,
    );
    assert_contract_error(
        client.try_fund_bounty(&creator, &bounty_id, &100),
        Error::Paused,
    );
    assert_contract_error(
        client.try_update_reward_tiers(
            &creator,
            &bounty_id,
            &RewardTiers {
                low: 1,
                medium: 1,
                high: 1,
                critical: 1,
            },
        ),
        Error::Paused,
    );
    assert_contract_error(client.try_close_bounty(&creator, &bounty_id), Error::Paused);

    // Queries keep working.
    assert_eq!(client.get_bounty(&bounty_id).escrowed, 1_000);
    assert_eq!(client.get_reward(&bounty_id, &symbol_short!("high")), 1_000);
    assert_eq!(client.get_total_escrowed(), 1_000);
    assert_eq!(client.get_bounty_counter(), 1);

    client.set_paused(&admin, &false);
    assert!(client.fund_bounty(&creator, &bounty_id, &100));
    assert_eq!(client.get_total_escrowed(), 1_100);
}

#[test]
fn test_transfer_admin() {
    let env = Env::default();
    let (client, admin, _token) = setup(&env);
    let successor = Address::generate(&env);
    let stranger = Address::generate(&env);

    assert_contract_error(
        client.try_transfer_admin(&stranger, &successor),
        Error::NotAuthorized,
    );
    assert_contract_error(
        client.try_transfer_admin(&admin, &admin),
        Error::InvalidTarget,
    );

    client.transfer_admin(&admin, &successor);
    assert_eq!(client.get_admin(), successor);

    assert_contract_error(client.try_set_paused(&admin, &true), Error::NotAuthorized);
    assert!(client.set_paused(&successor, &true));
}

#[test]
fn test_transfer_admin_allowed_while_paused() {
    let env = Env::default();
    let (client, admin, _token) = setup(&env);
    let successor = Address::generate(&env);

    client.set_paused(&admin, &true);
    client.transfer_admin(&admin, &successor);

    assert_eq!(client.get_admin(), successor);
    assert!(client.is_paused());
}

#[test]
fn test_withdraw_for_payout_requires_registered_authority() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 5_000);
    let hunter = Address::generate(&env);
    let bounty_id = open_bounty(&env, &client, &creator, 5_000);

    assert_contract_error(
        client.try_withdraw_for_payout(&bounty_id, &1_000, &hunter),
        Error::NotAuthorized,
    );

    let stranger = Address::generate(&env);
    let authority = Address::generate(&env);
    assert_contract_error(
        client.try_set_payout_authority(&stranger, &authority),
        Error::NotAuthorized,
    );
    client.set_payout_authority(&admin, &authority);
    assert_eq!(client.get_payout_authority(), Some(authority.clone()));

    assert!(client.withdraw_for_payout(&bounty_id, &1_000, &hunter));
    let auths = env.auths();
    assert_eq!(auths.len(), 1);
    assert_eq!(auths[0].0, authority);
}

#[test]
fn test_withdraw_for_payout_moves_escrow() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 5_000);
    let hunter = Address::generate(&env);
    let authority = Address::generate(&env);
    client.set_payout_authority(&admin, &authority);

    let bounty_id = open_bounty(&env, &client, &creator, 5_000);
    client.withdraw_for_payout(&bounty_id, &1_000, &hunter);

    let token_client = token::Client::new(&env, &token);
    assert_eq!(token_client.balance(&hunter), 1_000);
    assert_eq!(token_client.balance(&client.address), 4_000);
    assert_eq!(client.get_bounty_escrow(&bounty_id), 4_000);
    assert_eq!(client.get_bounty(&bounty_id).escrowed, 4_000);
    assert_eq!(client.get_total_escrowed(), 4_000);

    assert_contract_error(
        client.try_withdraw_for_payout(&bounty_id, &4_001, &hunter),
        Error::InsufficientFunds,
    );
    assert_contract_error(
        client.try_withdraw_for_payout(&bounty_id, &0, &hunter),
        Error::InvalidAmount,
    );
    assert_contract_error(
        client.try_withdraw_for_payout(&42, &1, &hunter),
        Error::NotFound,
    );
    assert_eq!(client.get_total_escrowed(), 4_000);

    // Creator gets only what is left after the payout.
    client.close_bounty(&creator, &bounty_id);
    assert_eq!(token_client.balance(&creator), 4_000);
    assert_eq!(client.get_total_escrowed(), 0);

    assert_contract_error(
        client.try_withdraw_for_payout(&bounty_id, &1, &hunter),
        Error::Closed,
    );
}

#[test]
fn test_close_after_full_payout_refunds_nothing() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 2_000);
    let hunter = Address::generate(&env);
    let authority = Address::generate(&env);
    client.set_payout_authority(&admin, &authority);

    let bounty_id = open_bounty(&env, &client, &creator, 2_000);
    client.withdraw_for_payout(&bounty_id, &2_000, &hunter);
    assert_eq!(client.get_bounty_escrow(&bounty_id), 0);

    assert!(client.close_bounty(&creator, &bounty_id));

    let token_client = token::Client::new(&env, &token);
    assert_eq!(token_client.balance(&creator), 0);
    assert_eq!(token_client.balance(&hunter), 2_000);
    assert_eq!(client.get_total_escrowed(), 0);
    assert!(!client.get_bounty(&bounty_id).active);
}

#[test]
fn test_withdraw_for_payout_blocked_while_paused() {
    let env = Env::default();
    let (client, admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 1_000);
    let hunter = Address::generate(&env);
    let authority = Address::generate(&env);
    client.set_payout_authority(&admin, &authority);
    let bounty_id = open_bounty(&env, &client, &creator, 1_000);

    client.set_paused(&admin, &true);
    assert_contract_error(
        client.try_withdraw_for_payout(&bounty_id, &500, &hunter),
        Error::Paused,
    );

    // Admin configuration is not gated by the pause flag.
    let replacement = Address::generate(&env);
    client.set_payout_authority(&admin, &replacement);
    assert_eq!(client.get_payout_authority(), Some(replacement));
    assert_eq!(client.get_bounty_escrow(&bounty_id), 1_000);
}

#[test]
fn test_payout_authority_event_carries_timestamp() {
    let env = Env::default();
    let (client, admin, _token) = setup(&env);
    let authority = Address::generate(&env);

    env.ledger().with_mut(|li| {
        li.timestamp = 700;
    });
    client.set_payout_authority(&admin, &authority);

    let (source, _topics, data) = env.events().all().last().unwrap();
    assert_eq!(source, client.address);
    assert_eq!(
        PayoutAuthoritySet::try_from_val(&env, &data).unwrap(),
        PayoutAuthoritySet {
            admin,
            authority,
            timestamp: 700,
        }
    );
}

#[test]
fn test_update_reward_tiers_extends_instance_ttl() {
    let env = Env::default();
    let (client, _admin, token) = setup(&env);
    let creator = funded_creator(&env, &token, 1_000);
    let bounty_id = open_bounty(&env, &client, &creator, 1_000);

    env.ledger().with_mut(|li| {
        li.sequence_number += 2 * DAY_IN_LEDGERS;
    });
    client.update_reward_tiers(
        &creator,
        &bounty_id,
        &RewardTiers {
            low: 10,
            medium: 20,
            high: 30,
            critical: 40,
        },
    );

    let ttl = env.as_contract(&client.address, || env.storage().instance().get_ttl());
    assert_eq!(ttl, INSTANCE_TTL_EXTEND_TO);
}
