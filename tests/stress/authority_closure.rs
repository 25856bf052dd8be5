//! Stress test: no committed batch leaves authority delegated.
//!
//! Builds thousands of random batches out of delegations, plugin calls,
//! verification calls, transient rekeys and direct operations on the
//! controlled account, signed by a mix of right and wrong keys. Whatever
//! commits or aborts, the controlled account must end every batch at rest.

#[path = "../common/mod.rs"]
mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::Fixture;
use delegated_authority::controller::ControllerCall;
use delegated_authority::{
    AppId, AuthorityError, BatchBuilder, CallerScope, KeyPair, Operation, ProgramInit,
    SpendingLimitCall, SpendingLimitInit, NATIVE_ASSET, NEVER_EXPIRES,
};

const ROUNDS: usize = 2_000;

struct Actors {
    caller: KeyPair,
    stranger: KeyPair,
    operator: KeyPair,
    sink: KeyPair,
}

/// Pick one random operation together with the key index that signs it.
///
/// Key indices: 0 admin, 1 caller, 2 stranger, 3 operator.
fn random_op(rng: &mut StdRng, fx: &Fixture, plugin: AppId, actors: &Actors) -> (Operation, usize) {
    let caller = actors.caller.address();
    let signer = rng.gen_range(0..4);
    let sender_key = |i: usize| match i {
        0 => fx.admin.address(),
        1 => caller,
        2 => actors.stranger.address(),
        _ => actors.operator.address(),
    };

    match rng.gen_range(0..7) {
        0 => (
            Operation::call(
                sender_key(signer),
                fx.controller,
                ControllerCall::DelegateTo { delegate: plugin },
            ),
            signer,
        ),
        1 => (
            Operation::call(
                sender_key(signer),
                plugin,
                SpendingLimitCall::Spend {
                    asset: NATIVE_ASSET,
                    amount: rng.gen_range(0..20),
                    receiver: actors.sink.address(),
                },
            ),
            signer,
        ),
        2 => (
            Operation::call(
                sender_key(signer),
                fx.controller,
                ControllerCall::VerifyAuthorityReturned,
            ),
            signer,
        ),
        3 => (
            Operation::call(
                sender_key(signer),
                fx.controller,
                ControllerCall::RekeyTo {
                    target: actors.operator.address(),
                    transient: true,
                },
            ),
            signer,
        ),
        4 => (
            Operation::transfer(
                fx.controlled,
                actors.sink.address(),
                NATIVE_ASSET,
                rng.gen_range(0..20),
            ),
            signer,
        ),
        5 => (Operation::rekey(fx.controlled, fx.controlled), signer),
        _ => (
            Operation::transfer(
                fx.controlled,
                actors.sink.address(),
                NATIVE_ASSET,
                1,
            )
            .with_rekey(actors.stranger.address()),
            signer,
        ),
    }
}

#[test]
fn stress_random_batches_never_leave_authority_delegated() {
    let mut fx = Fixture::self_controlled(1_000_000);
    let actors = Actors {
        caller: KeyPair::generate(),
        stranger: KeyPair::generate(),
        operator: KeyPair::generate(),
        sink: KeyPair::generate(),
    };
    let plugin = fx.deploy_plugin(ProgramInit::SpendingLimit(SpendingLimitInit {
        controller: fx.controller,
        window_size: 50,
    }));
    fx.grant(plugin, CallerScope::Caller(actors.caller.address()), NEVER_EXPIRES);
    fx.admin_call_app(
        plugin,
        SpendingLimitCall::SetLimit {
            spender: actors.caller.address(),
            asset: NATIVE_ASSET,
            limit: 100,
        },
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut committed = 0usize;
    let mut aborted = 0usize;

    for round in 0..ROUNDS {
        let len = rng.gen_range(1..=6);
        let mut builder = BatchBuilder::new();
        for _ in 0..len {
            let (op, signer) = random_op(&mut rng, &fx, plugin, &actors);
            let key = match signer {
                0 => &fx.admin,
                1 => &actors.caller,
                2 => &actors.stranger,
                _ => &actors.operator,
            };
            builder = builder.push(op, key);
        }
        let batch = builder.build(&fx.ledger).unwrap();

        let before = fx.ledger.state().clone();
        match fx.ledger.submit(&batch) {
            Ok(_) => committed += 1,
            Err(e) => {
                assert!(matches!(e, AuthorityError::BatchFailed { .. }));
                assert_eq!(fx.ledger.state(), &before, "round {round} leaked state");
                aborted += 1;
            }
        }
        assert!(
            fx.view().is_at_rest(),
            "round {round}: authority left at {}",
            fx.ledger.auth_addr(&fx.controlled)
        );

        if round % 100 == 99 {
            fx.ledger.advance_clock(25);
        }
    }

    assert!(committed > 0, "no random batch ever committed");
    assert!(aborted > 0, "no random batch ever aborted");
}

#[test]
fn stress_canonical_delegations_always_restore() {
    let mut fx = Fixture::self_controlled(1_000_000);
    let caller = KeyPair::generate();
    let sink = KeyPair::generate();
    let plugin = fx.deploy_plugin(ProgramInit::SpendingLimit(SpendingLimitInit {
        controller: fx.controller,
        window_size: 1,
    }));
    fx.grant(plugin, CallerScope::Any, NEVER_EXPIRES);
    fx.admin_call_app(
        plugin,
        SpendingLimitCall::SetLimit {
            spender: caller.address(),
            asset: NATIVE_ASSET,
            limit: 10,
        },
    )
    .unwrap();

    for i in 0..500u64 {
        fx.ledger.advance_clock(1);
        fx.delegated_call(
            &caller,
            plugin,
            SpendingLimitCall::Spend {
                asset: NATIVE_ASSET,
                amount: 10,
                receiver: sink.address(),
            },
        )
        .unwrap_or_else(|e| panic!("delegation {i} failed: {e}"));
        fx.assert_at_rest();
    }

    assert_eq!(fx.balance(&sink.address()), 5_000);
    assert_eq!(fx.ledger.state().committed_batches, 504);
}
