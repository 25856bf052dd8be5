//! Stress test: windowed spending quotas against a reference model.
//!
//! Several spenders draw on several assets across many clock advances.
//! Each attempt is predicted by a plain model of fixed windows before it is
//! submitted; the plugin must agree on every outcome and on every balance.

#[path = "../common/mod.rs"]
mod common;

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use common::{submit, Fixture};
use delegated_authority::{
    AssetId, AuthorityError, CallerScope, KeyPair, Operation, ProgramInit, Quota,
    SpendingLimitCall, SpendingLimitInit, NATIVE_ASSET, NEVER_EXPIRES,
};

const WINDOW: u64 = 60;
const TOKEN: AssetId = 5;

#[derive(Default, Clone, Copy)]
struct ModelQuota {
    limit: u64,
    window_start: u64,
    spent: u64,
}

impl ModelQuota {
    fn try_spend(&mut self, now: u64, amount: u64) -> bool {
        let bucket = (now / WINDOW) * WINDOW;
        let already = if bucket == self.window_start { self.spent } else { 0 };
        if already + amount > self.limit {
            return false;
        }
        self.window_start = bucket;
        self.spent = already + amount;
        true
    }

    fn spent_in(&self, now: u64) -> u64 {
        if (now / WINDOW) * WINDOW == self.window_start {
            self.spent
        } else {
            0
        }
    }
}

#[test]
fn stress_quota_matches_model() {
    let mut fx = Fixture::self_controlled(10_000_000);
    fx.ledger.mint(&fx.controlled, TOKEN, 10_000_000).unwrap();
    let receiver = KeyPair::generate();
    submit(
        &mut fx.ledger,
        vec![(Operation::opt_in(receiver.address(), TOKEN), &receiver)],
    )
    .unwrap();

    let plugin = fx.deploy_plugin(ProgramInit::SpendingLimit(SpendingLimitInit {
        controller: fx.controller,
        window_size: WINDOW,
    }));
    fx.grant(plugin, CallerScope::Any, NEVER_EXPIRES);

    let spenders: Vec<KeyPair> = (0..4).map(|_| KeyPair::generate()).collect();
    let assets = [NATIVE_ASSET, TOKEN];
    let mut model: HashMap<(usize, AssetId), ModelQuota> = HashMap::new();
    for (i, spender) in spenders.iter().enumerate() {
        for (j, &asset) in assets.iter().enumerate() {
            let limit = 50 + (i as u64) * 25 + (j as u64) * 10;
            fx.admin_call_app(
                plugin,
                SpendingLimitCall::SetLimit {
                    spender: spender.address(),
                    asset,
                    limit,
                },
            )
            .unwrap();
            model.insert(
                (i, asset),
                ModelQuota {
                    limit,
                    window_start: 0,
                    spent: 0,
                },
            );
        }
    }

    let mut rng = StdRng::seed_from_u64(42);
    let mut paid: HashMap<AssetId, u64> = HashMap::new();
    let (mut accepted, mut refused) = (0, 0);

    for step in 0..1_500 {
        if rng.gen_bool(0.2) {
            fx.ledger.advance_clock(rng.gen_range(1..40));
        }
        let now = fx.ledger.clock();
        let i = rng.gen_range(0..spenders.len());
        let asset = assets[rng.gen_range(0..assets.len())];
        let amount = rng.gen_range(0..45);

        let predicted = model.get_mut(&(i, asset)).unwrap().try_spend(now, amount);
        let result = fx.delegated_call(
            &spenders[i],
            plugin,
            SpendingLimitCall::Spend {
                asset,
                amount,
                receiver: receiver.address(),
            },
        );

        match result {
            Ok(_) => {
                assert!(predicted, "step {step}: plugin accepted {amount} at {now}");
                *paid.entry(asset).or_default() += amount;
                accepted += 1;
            }
            Err(e) => {
                assert!(!predicted, "step {step}: plugin refused {amount} at {now}: {e}");
                assert!(matches!(
                    e.root_cause(),
                    AuthorityError::QuotaExceeded { .. }
                ));
                refused += 1;
            }
        }
    }

    for &asset in &assets {
        assert_eq!(
            fx.ledger.balance(&receiver.address(), asset),
            paid.get(&asset).copied().unwrap_or(0)
        );
    }
    for (i, spender) in spenders.iter().enumerate() {
        for &asset in &assets {
            let on_ledger = Quota::load(&fx.ledger, plugin, &spender.address(), asset)
                .unwrap()
                .unwrap();
            let m = model[&(i, asset)];
            assert_eq!(on_ledger.limit, m.limit);
            assert_eq!(
                on_ledger.remaining(fx.ledger.clock(), WINDOW),
                m.limit - m.spent_in(fx.ledger.clock())
            );
        }
    }
    assert!(accepted > 0 && refused > 0);
    fx.assert_at_rest();
}

#[test]
fn changing_limit_keeps_window_accounting() {
    let mut fx = Fixture::self_controlled(1_000);
    let spender = KeyPair::generate();
    let sink = KeyPair::generate();
    let plugin = fx.deploy_plugin(ProgramInit::SpendingLimit(SpendingLimitInit {
        controller: fx.controller,
        window_size: WINDOW,
    }));
    fx.grant(plugin, CallerScope::Any, NEVER_EXPIRES);
    let set_limit = |limit| SpendingLimitCall::SetLimit {
        spender: spender.address(),
        asset: NATIVE_ASSET,
        limit,
    };
    let spend = |amount| SpendingLimitCall::Spend {
        asset: NATIVE_ASSET,
        amount,
        receiver: sink.address(),
    };

    fx.admin_call_app(plugin, set_limit(100)).unwrap();
    fx.delegated_call(&spender, plugin, spend(80)).unwrap();

    // Lowering the limit below what was already spent blocks further spends.
    fx.admin_call_app(plugin, set_limit(50)).unwrap();
    let err = fx.delegated_call(&spender, plugin, spend(1)).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        AuthorityError::QuotaExceeded {
            spent: 81,
            limit: 50
        }
    ));

    // Raising it again resumes from the recorded spend.
    fx.admin_call_app(plugin, set_limit(120)).unwrap();
    fx.delegated_call(&spender, plugin, spend(40)).unwrap();
    assert!(fx.delegated_call(&spender, plugin, spend(1)).is_err());
    assert_eq!(fx.balance(&sink.address()), 120);
}

#[test]
fn removed_or_missing_limit_refuses_spend() {
    let mut fx = Fixture::self_controlled(1_000);
    let spender = KeyPair::generate();
    let sink = KeyPair::generate();
    let plugin = fx.deploy_plugin(ProgramInit::SpendingLimit(SpendingLimitInit {
        controller: fx.controller,
        window_size: WINDOW,
    }));
    fx.grant(plugin, CallerScope::Any, NEVER_EXPIRES);
    let spend = SpendingLimitCall::Spend {
        asset: NATIVE_ASSET,
        amount: 1,
        receiver: sink.address(),
    };

    let err = fx
        .delegated_call(&spender, plugin, spend.clone())
        .unwrap_err();
    assert!(matches!(err.root_cause(), AuthorityError::NotFound(_)));

    fx.admin_call_app(
        plugin,
        SpendingLimitCall::SetLimit {
            spender: spender.address(),
            asset: NATIVE_ASSET,
            limit: 10,
        },
    )
    .unwrap();
    fx.delegated_call(&spender, plugin, spend.clone()).unwrap();

    fx.admin_call_app(
        plugin,
        SpendingLimitCall::RemoveLimit {
            spender: spender.address(),
            asset: NATIVE_ASSET,
        },
    )
    .unwrap();
    let err = fx.delegated_call(&spender, plugin, spend).unwrap_err();
    assert!(matches!(err.root_cause(), AuthorityError::NotFound(_)));

    // Only the admin manages limits.
    let err = submit(
        &mut fx.ledger,
        vec![(
            Operation::call(
                spender.address(),
                plugin,
                SpendingLimitCall::SetLimit {
                    spender: spender.address(),
                    asset: NATIVE_ASSET,
                    limit: 1_000,
                },
            ),
            &spender,
        )],
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), AuthorityError::Unauthorized(_)));
}

#[test]
fn zero_window_size_rejected() {
    let mut fx = Fixture::self_controlled(0);
    let admin = &fx.admin;
    let err = submit(
        &mut fx.ledger,
        vec![(
            Operation::deploy(
                admin.address(),
                ProgramInit::SpendingLimit(SpendingLimitInit {
                    controller: fx.controller,
                    window_size: 0,
                }),
            ),
            admin,
        )],
    )
    .unwrap_err();
    assert!(matches!(err.root_cause(), AuthorityError::InvalidArgument(_)));
}
