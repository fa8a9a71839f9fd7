//! Property-based tests for Depot custody.
//!
//! Each property runs 256 cases with proptest shrinking.
//!
//! Properties tested:
//! - Only the parent may retarget a forwarder or sweep its tokens
//! - Only the owner may use the wallet's gated operations
//! - Deposits and collections move exact amounts and conserve supply
//! - Batch creation yields distinct, wallet-parented forwarders
//! - Any failed call leaves the chain exactly as it was

use proptest::prelude::*;

use depot_core::{Address, Event};
use depot_custody::{Call, CustodyConfig, ErrorKind};
use depot_tests::helpers::*;

fn any_address() -> impl Strategy<Value = Address> {
    any::<[u8; 20]>().prop_map(Address::from_bytes)
}

/// A call from a small pool of callers against the fixture's instances.
fn arb_step(fx: &Fixture) -> impl Strategy<Value = (Address, Call)> {
    let callers = vec![fx.owner, fx.stranger, fx.issuer, fx.wallet, outsider()];
    let (wallet, forwarder, token) = (fx.wallet, fx.forwarder, fx.token);
    let targets = vec![wallet, forwarder, outsider(), addr(0x66)];

    let call = prop_oneof![
        (prop::sample::select(targets.clone()), 0..2_000u64)
            .prop_map(|(to, amount)| Call::Deposit { to, amount }),
        (prop::sample::select(targets.clone()), 0..2_000u64)
            .prop_map(move |(to, amount)| Call::TransferToken { token, to, amount }),
        Just(Call::Collect { forwarder }),
        Just(Call::CollectTokens { forwarder, token }),
        Just(Call::CollectForwarderTokens { wallet, forwarder, token }),
        prop::sample::select(targets.clone())
            .prop_map(move |new_parent| Call::ChangeForwarderParent { wallet, forwarder, new_parent }),
        prop::sample::select(targets.clone())
            .prop_map(move |new_parent| Call::ChangeParent { forwarder, new_parent }),
        (prop::sample::select(targets.clone()), 0..2_000u64)
            .prop_map(move |(destination, amount)| Call::Send { wallet, destination, amount }),
        (prop::sample::select(targets), 0..2_000u64).prop_map(move |(destination, amount)| {
            Call::SendToken { wallet, destination, amount, token }
        }),
        (0..4u32).prop_map(move |count| Call::CreateForwarders { wallet, count }),
    ];
    (prop::sample::select(callers), call)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // ------------------------------------------------------------------
    // Authorization
    // ------------------------------------------------------------------

    #[test]
    fn only_parent_administers_forwarder(caller in any_address(), new_parent in any_address()) {
        let mut fx = Fixture::default();
        prop_assume!(caller != fx.wallet);
        prop_assume!(!new_parent.is_zero());
        let fwd = fx.forwarder;
        fx.give_tokens(&fwd, 10);
        let before = fx.chain.snapshot();

        let err = fx.chain.change_parent(&caller, &fwd, new_parent).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::NotMainWallet);
        let err = fx.chain.collect_tokens(&caller, &fwd, &fx.token).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::NotMainWallet);
        prop_assert_eq!(fx.chain.snapshot(), before);
    }

    #[test]
    fn only_owner_uses_gated_wallet_operations(caller in any_address(), amount in 1..100u64) {
        let mut fx = Fixture::default();
        prop_assume!(caller != fx.owner);
        let (wallet, fwd, token) = (fx.wallet, fx.forwarder, fx.token);
        fx.chain.deposit(&fx.stranger, &wallet, 100).unwrap();
        fx.give_tokens(&wallet, 100);
        fx.give_tokens(&fwd, 100);
        let before = fx.chain.snapshot();

        let results = [
            fx.chain.change_forwarder_parent(&caller, &wallet, &fwd, outsider()).map(|_| ()),
            fx.chain.collect_forwarder_tokens(&caller, &wallet, &fwd, &token).map(|_| ()),
            fx.chain.send(&caller, &wallet, &outsider(), amount),
            fx.chain.send_token(&caller, &wallet, &outsider(), amount, &token),
        ];
        for result in results {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::NotOwner);
        }
        prop_assert_eq!(fx.chain.snapshot(), before);
    }

    // ------------------------------------------------------------------
    // Balances
    // ------------------------------------------------------------------

    #[test]
    fn deposits_accumulate_and_collect_exactly(amounts in prop::collection::vec(1..10_000u64, 1..20)) {
        let mut fx = Fixture::default();
        let (wallet, fwd) = (fx.wallet, fx.forwarder);
        let supply = fx.chain.state().ledger().total_supply();

        let mut expected = 0u64;
        for amount in &amounts {
            fx.chain.deposit(&fx.stranger, &fwd, *amount).unwrap();
            expected += amount;
            prop_assert_eq!(fx.chain.balance(&fwd), expected);
        }

        prop_assert_eq!(fx.chain.collect(&outsider(), &fwd), Ok(expected));
        prop_assert_eq!(fx.chain.balance(&fwd), 0);
        prop_assert_eq!(fx.chain.balance(&wallet), expected);
        prop_assert_eq!(
            fx.chain.collect(&outsider(), &fwd).unwrap_err().kind(),
            ErrorKind::EmptyBalance
        );
        prop_assert_eq!(fx.chain.state().ledger().total_supply(), supply);
    }

    #[test]
    fn immediate_policy_never_leaves_value_on_forwarder(amounts in prop::collection::vec(1..10_000u64, 1..20)) {
        let mut fx = Fixture::new(CustodyConfig::immediate());
        let (wallet, fwd) = (fx.wallet, fx.forwarder);
        for amount in &amounts {
            fx.chain.deposit(&fx.stranger, &fwd, *amount).unwrap();
            prop_assert_eq!(fx.chain.balance(&fwd), 0);
        }
        prop_assert_eq!(fx.chain.balance(&wallet), amounts.iter().sum::<u64>());
    }

    #[test]
    fn token_collection_moves_whole_balance(amount in 1..1_000_000u64) {
        let mut fx = Fixture::default();
        let (wallet, fwd, token) = (fx.wallet, fx.forwarder, fx.token);
        fx.give_tokens(&fwd, amount);

        prop_assert_eq!(
            fx.chain.collect_forwarder_tokens(&fx.owner, &wallet, &fwd, &token),
            Ok(amount)
        );
        prop_assert_eq!(fx.tokens_of(&fwd), 0);
        prop_assert_eq!(fx.tokens_of(&wallet), amount);
        prop_assert_eq!(
            fx.events_from(&fwd).last().copied(),
            Some(Event::TokensCollected { token_address: token, amount })
        );
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    #[test]
    fn batch_creation_yields_distinct_wallet_children(count in 1..=32u32, caller in any_address()) {
        let mut fx = Fixture::default();
        let wallet = fx.wallet;
        let events_before = fx.events_from(&wallet).len();

        let created = fx.chain.create_forwarders(&caller, &wallet, count).unwrap();
        prop_assert_eq!(created.len(), count as usize);

        let mut unique = created.clone();
        unique.sort();
        unique.dedup();
        prop_assert_eq!(unique.len(), created.len());

        for fwd in &created {
            prop_assert_eq!(fx.chain.state().forwarder(fwd).map(|f| f.parent()), Some(wallet));
        }
        prop_assert_eq!(fx.events_from(&wallet).len() - events_before, count as usize);
    }
}

// ----------------------------------------------------------------------
// Random call sequences
// ----------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    // Fixture addresses are deterministic, so steps drawn against one
    // fixture apply to a fresh one.
    #[test]
    fn failed_calls_change_nothing_and_supply_is_conserved(
        steps in prop::collection::vec(arb_step(&Fixture::default()), 1..24)
    ) {
        let mut fx = Fixture::default();
        let native = fx.chain.state().ledger().total_supply();

        for (caller, call) in &steps {
            let before = fx.chain.snapshot();
            if fx.chain.execute(caller, call).is_err() {
                prop_assert_eq!(fx.chain.snapshot(), before);
            }
            prop_assert_eq!(fx.chain.state().ledger().total_supply(), native);
            prop_assert_eq!(
                fx.chain.state().tokens().total_supply(&fx.token).unwrap(),
                u128::from(TOKEN_SUPPLY)
            );
        }
    }
}
