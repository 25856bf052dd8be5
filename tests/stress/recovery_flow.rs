//! Stress test: recovery state machine under repeated cycles.
//!
//! Runs many initiate / abort / finalize rounds against controllers over
//! both app-held and key-held accounts, checking the phase and the admin
//! after every step.

#[path = "../common/mod.rs"]
mod common;

use common::{submit, Fixture};
use delegated_authority::controller::ControllerCall;
use delegated_authority::{
    AppId, AuthorityError, CallerScope, KeyPair, Operation, ProgramInit, RecoveryCall,
    RecoveryInit, RecoveryPhase, RecoveryState, NEVER_EXPIRES,
};

const GRACE: u64 = 30;

fn setup(fx: &mut Fixture, agent: &KeyPair) -> AppId {
    let recovery = fx.deploy_plugin(ProgramInit::Recovery(RecoveryInit {
        controller: fx.controller,
        recovery_agent: agent.address(),
        grace_window: GRACE,
    }));
    fx.grant(recovery, CallerScope::Caller(agent.address()), NEVER_EXPIRES);
    recovery
}

fn initiate(fx: &mut Fixture, recovery: AppId, who: &KeyPair) -> Result<(), AuthorityError> {
    submit(
        &mut fx.ledger,
        vec![(
            Operation::call(who.address(), recovery, RecoveryCall::Initiate),
            who,
        )],
    )
    .map(|_| ())
}

/// Abort as the controlled account by briefly rekeying it to the admin.
fn abort_via_admin(fx: &mut Fixture, recovery: AppId) -> Result<(), AuthorityError> {
    let admin = &fx.admin;
    let restore_to = fx.view().at_rest();
    submit(
        &mut fx.ledger,
        vec![
            (
                Operation::call(
                    admin.address(),
                    fx.controller,
                    ControllerCall::RekeyTo {
                        target: admin.address(),
                        transient: true,
                    },
                ),
                admin,
            ),
            (
                Operation::call(fx.controlled, recovery, RecoveryCall::Abort)
                    .with_rekey(restore_to),
                admin,
            ),
        ],
    )
    .map(|_| ())
}

fn phase(fx: &Fixture, recovery: AppId) -> RecoveryPhase {
    RecoveryState::load(&fx.ledger, recovery).unwrap().phase()
}

#[test]
fn stress_many_initiate_abort_cycles() {
    let mut fx = Fixture::self_controlled(0);
    let agent = KeyPair::generate();
    let recovery = setup(&mut fx, &agent);
    let admin = fx.admin.address();

    for cycle in 0..200 {
        initiate(&mut fx, recovery, &agent).unwrap();
        let since = fx.ledger.clock();
        assert_eq!(phase(&fx, recovery), RecoveryPhase::Pending { since });

        // A second initiate while pending is refused.
        let err = initiate(&mut fx, recovery, &agent).unwrap_err();
        assert!(matches!(err.root_cause(), AuthorityError::InvalidState(_)));

        fx.ledger.advance_clock(GRACE - 1);
        let err = fx
            .delegated_call(&agent, recovery, RecoveryCall::Finalize)
            .unwrap_err();
        assert!(
            matches!(err.root_cause(), AuthorityError::InvalidState(_)),
            "cycle {cycle}: finalize inside grace window"
        );

        abort_via_admin(&mut fx, recovery).unwrap();
        assert_eq!(phase(&fx, recovery), RecoveryPhase::Idle);
        fx.assert_at_rest();

        fx.ledger.advance_clock(GRACE * 2);
        let err = fx
            .delegated_call(&agent, recovery, RecoveryCall::Finalize)
            .unwrap_err();
        assert!(matches!(err.root_cause(), AuthorityError::InvalidState(_)));
        assert_eq!(fx.view().admin(), admin);
    }
}

#[test]
fn finalize_exactly_at_grace_boundary() {
    let mut fx = Fixture::self_controlled(0);
    let agent = KeyPair::generate();
    let recovery = setup(&mut fx, &agent);

    fx.ledger.set_clock(1_000).unwrap();
    initiate(&mut fx, recovery, &agent).unwrap();
    assert_eq!(
        RecoveryState::load(&fx.ledger, recovery)
            .unwrap()
            .finalizable_at(),
        Some(1_000 + GRACE)
    );

    fx.ledger.set_clock(1_000 + GRACE).unwrap();
    fx.delegated_call(&agent, recovery, RecoveryCall::Finalize)
        .unwrap();
    assert_eq!(fx.view().admin(), agent.address());
    fx.assert_at_rest();
}

#[test]
fn recovery_over_key_held_account() {
    let owner = KeyPair::generate();
    let agent = KeyPair::generate();
    let mut fx = Fixture::external(&owner, 100);
    let recovery = setup(&mut fx, &agent);

    initiate(&mut fx, recovery, &agent).unwrap();
    abort_via_admin(&mut fx, recovery).unwrap();
    assert_eq!(phase(&fx, recovery), RecoveryPhase::Idle);
    assert_eq!(
        fx.ledger.auth_addr(&owner.address()),
        fx.controller.address()
    );

    initiate(&mut fx, recovery, &agent).unwrap();
    fx.ledger.advance_clock(GRACE);
    fx.delegated_call(&agent, recovery, RecoveryCall::Finalize)
        .unwrap();
    assert_eq!(fx.view().admin(), agent.address());
    assert_eq!(
        fx.ledger.auth_addr(&owner.address()),
        fx.controller.address()
    );
}

#[test]
fn only_controlled_account_aborts_and_only_agent_finalizes() {
    let mut fx = Fixture::self_controlled(0);
    let agent = KeyPair::generate();
    let attacker = KeyPair::generate();
    let recovery = setup(&mut fx, &agent);

    initiate(&mut fx, recovery, &agent).unwrap();

    for who in [&attacker, &agent] {
        let err = submit(
            &mut fx.ledger,
            vec![(
                Operation::call(who.address(), recovery, RecoveryCall::Abort),
                who,
            )],
        )
        .unwrap_err();
        assert!(matches!(err.root_cause(), AuthorityError::Unauthorized(_)));
    }

    // The attacker cannot finalize even with a registry entry of its own.
    fx.grant(recovery, CallerScope::Caller(attacker.address()), NEVER_EXPIRES);
    fx.ledger.advance_clock(GRACE);
    let err = fx
        .delegated_call(&attacker, recovery, RecoveryCall::Finalize)
        .unwrap_err();
    assert!(matches!(err.root_cause(), AuthorityError::Unauthorized(_)));
    assert_eq!(
        phase(&fx, recovery),
        RecoveryPhase::Pending { since: 0 }
    );
}
