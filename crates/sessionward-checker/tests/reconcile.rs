//! Integration tests for single reconciliation ticks and the commands
//! around them. No loop runs here: every tick is called explicitly.

mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sessionward_checker::{
    CheckerError, ReconcileOutcome, SessionEvent, SessionPhase, TerminationReason,
};
use sessionward_renewal::{ActionError, RenewalFailure};
use sessionward_types::{Clock, Credentials, Timestamp, TokioClock, TransitionKind, WardConfig};

use support::{Harness, ScriptedBackend, advance_to, grant, scenario_config, t, user};

// =========================================================================
// Sign-in and restoration
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconcile_signed_out_is_idle() {
    let h = Harness::new(scenario_config());

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Idle);
    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_seeds_store_and_emits_signed_in() {
    let mut h = Harness::signed_in(scenario_config()).await;

    assert_eq!(h.checker.phase(), SessionPhase::Valid);
    assert!(h.checker.is_authenticated());
    assert_eq!(h.store.access_window_expiry(), Some(t(60)));
    assert_eq!(h.drain_events(), vec![SessionEvent::SignedIn { user: user() }]);
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_rejected_returns_login_error() {
    let h = Harness::new(scenario_config());
    h.backend
        .next_login(Err(ActionError::Rejected("bad password".into())));

    let result = h.checker.sign_in(&Credentials::new("sam", "nope")).await;

    assert!(matches!(result, Err(CheckerError::Login(_))));
    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sign_in_malformed_token_stays_signed_out() {
    let h = Harness::new(scenario_config());
    h.backend.next_login(Ok(grant("definitely not a jwt")));

    let result = h.checker.sign_in(&Credentials::new("sam", "pw")).await;

    assert!(matches!(result, Err(CheckerError::Credential(_))));
    assert!(!h.checker.is_authenticated());
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_restore_success_starts_session() {
    let mut h = Harness::new(scenario_config());

    let outcome = h.checker.restore().await;

    assert!(outcome.is_success());
    assert_eq!(h.checker.phase(), SessionPhase::Valid);
    assert!(matches!(
        h.drain_events().as_slice(),
        [SessionEvent::SignedIn { .. }]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_restore_failure_while_signed_out_emits_nothing() {
    let mut h = Harness::new(scenario_config());
    h.backend
        .next_refresh(Err(ActionError::Rejected("no refresh cookie".into())));

    let outcome = h.checker.restore().await;

    assert!(!outcome.is_success());
    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(h.drain_events().is_empty());
}

// =========================================================================
// Reconciliation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconcile_open_window_is_valid() {
    let h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 10_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Valid);
    assert_eq!(h.checker.phase(), SessionPhase::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_closed_window_shows_prompt_in_same_tick() {
    let mut h = Harness::signed_in(scenario_config()).await;
    h.drain_events();
    advance_to(&h.clock, 60_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::PromptShown);

    assert_eq!(h.checker.phase(), SessionPhase::Prompting);
    let snap = h.store.snapshot();
    assert_eq!(snap.renewal_countdown_expiry, Some(t(120)));
    assert!(snap.modal_visible);
    assert_eq!(snap.last_modal_shown_at, Some(t(60)));
    assert!(snap.auto_terminate_timer.is_some());
    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::PromptShown {
            countdown_expiry: t(120)
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_prompt_visible_is_suppressed() {
    let h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    let timer = h.store.auto_terminate_timer();

    advance_to(&h.clock, 70_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Suppressed);
    assert_eq!(h.store.renewal_countdown_expiry(), Some(t(120)));
    assert_eq!(h.store.auto_terminate_timer(), timer);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_modal_gate_defers_prompt() {
    let h = Harness::signed_in(scenario_config()).await;
    h.store.set_last_modal_shown_at(Some(t(58)));
    advance_to(&h.clock, 60_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::PromptDeferred);
    assert_eq!(h.checker.phase(), SessionPhase::AwaitingPrompt);
    assert!(!h.store.modal_visible());
    assert_eq!(h.store.renewal_countdown_expiry(), None);

    advance_to(&h.clock, 63_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::PromptShown);
    assert_eq!(h.store.last_modal_shown_at(), Some(t(63)));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_transition_in_flight_is_skipped() {
    let h = Harness::signed_in(scenario_config()).await;
    h.store.set_transition_kind(TransitionKind::ContinueToWork);
    advance_to(&h.clock, 60_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Skipped);
    assert_eq!(h.store.renewal_countdown_expiry(), None);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_idle_user_is_not_renewed_proactively() {
    let h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 35_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Valid);
    assert_eq!(ScriptedBackend::count(&h.backend.refreshes), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_active_user_near_credential_expiry_is_renewed() {
    let mut h = Harness::signed_in(scenario_config()).await;
    h.drain_events();
    advance_to(&h.clock, 35_000).await;
    h.store.set_last_activity_at(Some(t(34)));

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Renewed);

    assert_eq!(ScriptedBackend::count(&h.backend.refreshes), 1);
    assert_eq!(h.store.credential_expiry(), Some(t(95)));
    assert_eq!(h.store.last_activity_at(), Some(t(34)));
    assert!(matches!(
        h.drain_events().as_slice(),
        [SessionEvent::Renewed { expiry, .. }] if *expiry == t(95)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_overlapping_call_is_dropped() {
    let h = Harness::signed_in(scenario_config()).await;
    h.backend.set_refresh_delay(Duration::from_secs(5));
    advance_to(&h.clock, 35_000).await;
    h.store.set_last_activity_at(Some(t(34)));

    let checker = h.checker.clone();
    let first = tokio::spawn(async move { checker.reconcile().await });
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Dropped);
    assert_eq!(first.await.unwrap(), ReconcileOutcome::Renewed);
    assert_eq!(ScriptedBackend::count(&h.backend.refreshes), 1);
    assert_eq!(h.store.credential_expiry(), Some(t(100)));
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_proactive_failure_terminates() {
    let mut h = Harness::signed_in(scenario_config()).await;
    h.drain_events();
    h.backend
        .next_refresh(Err(ActionError::Rejected("refresh token revoked".into())));
    advance_to(&h.clock, 35_000).await;
    h.store.set_last_activity_at(Some(t(34)));

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Terminated);

    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(h.store.snapshot().is_empty());
    assert_eq!(ScriptedBackend::count(&h.backend.logouts), 1);
    assert!(matches!(
        h.drain_events().as_slice(),
        [SessionEvent::Terminated {
            reason: TerminationReason::RenewalFailed(_)
        }]
    ));
}

// =========================================================================
// Fail closed
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_reconcile_invariant_violation_fails_closed() {
    let mut h = Harness::signed_in(scenario_config()).await;
    h.drain_events();
    advance_to(&h.clock, 10_000).await;
    h.store.set_renewal_countdown_expiry(Some(t(100)));

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::FailedClosed);

    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(matches!(
        h.drain_events().as_slice(),
        [SessionEvent::Terminated {
            reason: TerminationReason::Internal(_)
        }]
    ));
}

/// A clock that panics on demand.
struct TrippedClock {
    inner: TokioClock,
    tripped: AtomicBool,
}

impl Clock for TrippedClock {
    fn now(&self) -> Timestamp {
        if self.tripped.load(Ordering::SeqCst) {
            panic!("clock exploded");
        }
        self.inner.now()
    }
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_panic_fails_closed() {
    let clock = Arc::new(TrippedClock {
        inner: TokioClock::starting_at(Timestamp::EPOCH),
        tripped: AtomicBool::new(false),
    });
    let mut h = Harness::with_clock(scenario_config(), clock.clone());
    h.checker
        .sign_in(&Credentials::new("sam", "pw"))
        .await
        .unwrap();
    h.drain_events();

    clock.tripped.store(true, Ordering::SeqCst);

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::FailedClosed);
    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(matches!(
        h.drain_events().as_slice(),
        [SessionEvent::Terminated {
            reason: TerminationReason::Internal(message)
        }] if message.contains("clock exploded")
    ));

    // The running flag was released despite the panic.
    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Idle);
}

// =========================================================================
// Auto-terminate timer
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_auto_terminate_fires_after_delay() {
    let mut h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    h.drain_events();

    advance_to(&h.clock, 119_000).await;
    assert_eq!(h.checker.phase(), SessionPhase::Prompting);

    advance_to(&h.clock, 120_500).await;

    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(h.store.snapshot().is_empty());
    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::Terminated {
            reason: TerminationReason::Inactivity
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_auto_terminate_during_transition_is_discarded() {
    let mut h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    h.store.set_transition_kind(TransitionKind::ContinueToWork);
    h.drain_events();

    advance_to(&h.clock, 121_000).await;

    assert_eq!(h.checker.phase(), SessionPhase::Prompting);
    assert_eq!(h.store.auto_terminate_timer(), None);
    assert_eq!(Harness::terminations(&h.drain_events()), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_abandoned_continue_terminates_after_countdown() {
    let mut h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    h.backend.set_refresh_delay(Duration::from_secs(100));
    h.drain_events();

    let checker = h.checker.clone();
    let pending = tokio::spawn(async move { checker.continue_to_work().await });

    // The auto-terminate timer fires mid-renewal and is discarded.
    advance_to(&h.clock, 130_000).await;
    assert_eq!(h.store.auto_terminate_timer(), None);
    pending.abort();
    assert!(pending.await.unwrap_err().is_cancelled());

    assert!(!h.store.refresh_in_progress());
    assert_eq!(h.store.transition_kind(), TransitionKind::None);

    advance_to(&h.clock, 131_000).await;
    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Terminated);

    assert_eq!(h.checker.phase(), SessionPhase::Terminated);
    assert!(h.store.snapshot().is_empty());
    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::Terminated {
            reason: TerminationReason::Inactivity
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_countdown_near_end_stays_suppressed() {
    let h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    let threshold = h.checker.config().renewal_threshold;

    advance_to(&h.clock, 100_000).await;

    let calculators = h.checker.calculators();
    assert!(calculators.countdown_needs_renewal(threshold));
    assert!(!calculators.is_countdown_expired());
    assert!(calculators.is_user_idle(h.checker.config().idle_threshold));
    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Suppressed);
    assert_eq!(h.checker.phase(), SessionPhase::Prompting);
}

#[tokio::test(start_paused = true)]
async fn test_reconcile_expired_countdown_with_timer_armed_is_suppressed() {
    let config = WardConfig {
        auto_terminate_delay: Duration::from_secs(90),
        ..scenario_config()
    };
    let h = Harness::signed_in(config).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;

    advance_to(&h.clock, 125_000).await;

    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Suppressed);
    assert_eq!(h.checker.phase(), SessionPhase::Prompting);
    assert!(h.store.auto_terminate_timer().is_some());
}

// =========================================================================
// Logout and continue
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_logout_twice_emits_one_termination() {
    let mut h = Harness::signed_in(scenario_config()).await;

    assert!(h.checker.logout().await);
    assert!(!h.checker.logout().await);

    assert_eq!(Harness::terminations(&h.drain_events()), 1);
    assert_eq!(ScriptedBackend::count(&h.backend.logouts), 1);
}

#[tokio::test(start_paused = true)]
async fn test_logout_backend_failure_still_clears_local_state() {
    let h = Harness::signed_in(scenario_config()).await;
    h.backend.fail_logout();

    assert!(h.checker.logout().await);

    assert!(!h.checker.is_authenticated());
    assert!(h.store.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logout_while_prompting_cancels_auto_terminate() {
    let mut h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    h.drain_events();

    h.checker.logout().await;
    advance_to(&h.clock, 200_000).await;

    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::Terminated {
            reason: TerminationReason::Logout
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_continue_during_logout_is_superseded() {
    let mut h = Harness::signed_in(scenario_config()).await;
    advance_to(&h.clock, 60_000).await;
    h.checker.reconcile().await;
    h.backend.set_refresh_delay(Duration::from_secs(2));
    h.drain_events();

    let checker = h.checker.clone();
    let pending = tokio::spawn(async move { checker.continue_to_work().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.checker.logout().await;

    let outcome = pending.await.unwrap();

    assert_eq!(outcome.failure(), Some(&RenewalFailure::Superseded));
    assert!(!h.checker.is_authenticated());
    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::Terminated {
            reason: TerminationReason::Logout
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_logout_overtaken_by_sign_in_keeps_new_session() {
    let mut h = Harness::signed_in(scenario_config()).await;
    h.backend.set_logout_delay(Duration::from_secs(2));
    h.drain_events();

    let checker = h.checker.clone();
    let pending = tokio::spawn(async move { checker.logout().await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    h.checker
        .sign_in(&Credentials::new("sam", "pw"))
        .await
        .expect("sign in");

    assert!(!pending.await.unwrap());

    assert!(h.checker.is_authenticated());
    assert!(h.store.access_token_present());
    assert_eq!(h.checker.reconcile().await, ReconcileOutcome::Valid);
    assert_eq!(
        h.drain_events(),
        vec![SessionEvent::SignedIn { user: user() }]
    );
}
