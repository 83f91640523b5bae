mod common;

// crates.io
use time::Duration;
// self
use common::*;
use token_rotor::{ErrorKind, State, TokenPair, refresh::RefreshOutcome};

#[tokio::test(start_paused = true)]
async fn force_refresh_without_session_fails() {
	let harness = Harness::new();
	let engine = harness.engine(config(60, 10, 250));
	let err = engine.force_refresh().await.expect_err("Blank sessions cannot be refreshed.");

	assert_eq!(err.kind(), ErrorKind::NoSession);
	assert_eq!(harness.refresher.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn force_refresh_rotates_immediately() {
	let harness = Harness::new();
	let a = harness.engine(config(60, 10, 250));
	let b = harness.engine(config(60, 10, 600));
	let initial = harness.pair("initial", 300, 86_400);
	let renewed = harness.pair("renewed", 300, 86_400);

	a.set_pair(Some(initial.clone())).await.expect("Login should succeed.");
	settle().await;
	harness.refresher.push_renewed(renewed.clone());
	advance_secs(30).await;

	b.force_refresh().await.expect("Forced refresh should succeed.");
	settle().await;

	assert_eq!(harness.refresher.seen(), vec![initial.refresh.expose().to_owned()]);
	assert_eq!(harness.store.snapshot(), Some(State::new(renewed.clone())));
	assert_eq!(
		b.current_pair().await.expect("Reading the pair should succeed."),
		Some(renewed.clone())
	);
	assert_eq!(token_of(&a).as_deref(), Some(renewed.auth.expose()));
	assert_eq!(b.metrics().renewals(), 1);
	assert!(a.is_running());
	assert!(b.is_running());
}

#[tokio::test(start_paused = true)]
async fn forced_transient_failure_surfaces_and_keeps_lock() {
	let harness = Harness::new();
	let engine = harness.engine(config(60, 10, 250));

	engine
		.set_pair(Some(harness.pair("initial", 300, 86_400)))
		.await
		.expect("Login should succeed.");
	settle().await;
	harness.refresher.push(Err(transient()));
	advance_secs(30).await;

	let err = engine.force_refresh().await.expect_err("Transient failures should propagate.");

	assert_eq!(err.kind(), ErrorKind::Transient);
	assert!(!err.is_fatal());
	assert_eq!(
		harness.store.snapshot().and_then(|state| state.locked_at),
		Some(T0 + Duration::seconds(30))
	);

	// The background loop, not the caller, retries: it sees the stamp at once, reclaims it at
	// 40.25s (stamp + lock_expiry + jitter), then renews at its deadline (240.25s).
	let renewed = harness.pair("renewed", 300, 86_400);

	harness.refresher.push_renewed(renewed.clone());
	advance_secs(209).await;

	assert_eq!(harness.refresher.calls(), 1);

	advance_secs(2).await;

	assert_eq!(harness.refresher.calls(), 2);
	assert_eq!(harness.store.snapshot(), Some(State::new(renewed)));
}

#[tokio::test(start_paused = true)]
async fn forced_invalid_token_clears_session() {
	let harness = Harness::new();
	let a = harness.engine(config(60, 10, 250));
	let b = harness.engine(config(60, 10, 600));

	a.set_pair(Some(harness.pair("initial", 300, 86_400))).await.expect("Login should succeed.");
	settle().await;
	harness.refresher.push(Ok(RefreshOutcome::Invalid));

	let err = a.force_refresh().await.expect_err("Rejected tokens should propagate.");

	settle().await;

	assert_eq!(err.kind(), ErrorKind::InvalidRefreshToken);
	assert_eq!(harness.store.snapshot(), None);
	assert_eq!(token_of(&a), None);
	assert_eq!(token_of(&b), None);
}

#[tokio::test(start_paused = true)]
async fn forced_empty_result_is_a_contract_violation() {
	let harness = Harness::new();
	let engine = harness.engine(config(60, 10, 250));
	let initial = harness.pair("initial", 300, 86_400);

	engine.set_pair(Some(initial.clone())).await.expect("Login should succeed.");
	settle().await;
	harness.refresher.push_renewed(TokenPair::new("access", ""));

	let err = engine.force_refresh().await.expect_err("Empty pairs should be rejected.");

	assert_eq!(err.kind(), ErrorKind::ContractViolation);
	assert!(err.is_fatal());
	assert_eq!(harness.store.snapshot().map(|state| state.pair), Some(initial.clone()));
	// The fatal error stops this instance's loop too, so the broken refresher is not retried.
	assert!(!engine.is_running());
	assert_eq!(
		engine.last_error().map(|error| error.kind()),
		Some(ErrorKind::ContractViolation)
	);

	advance_secs(250).await;

	assert_eq!(harness.refresher.calls(), 1);
	assert_eq!(harness.store.snapshot().map(|state| state.pair), Some(initial));

	// Logging in again restarts it.
	engine
		.set_pair(Some(harness.pair("fresh", 300, 86_400)))
		.await
		.expect("Login should succeed.");
	settle().await;

	assert!(engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn force_refresh_overrides_a_background_refresh_in_flight() {
	let harness = Harness::new();
	let a = harness.engine(config(60, 10, 250));
	let b = harness.engine(config(60, 10, 600));

	a.set_pair(Some(harness.pair("initial", 300, 86_400))).await.expect("Login should succeed.");
	settle().await;

	let gate = harness.refresher.push_gate();

	advance_secs(241).await;

	assert_eq!(a.metrics().attempts(), 1);
	assert_eq!(harness.refresher.in_flight(), 1);

	// B stamps its own lock over A's and rotates while A's call is still pending.
	let forced = harness.pair("forced", 300, 86_400);

	harness.refresher.push_renewed(forced.clone());
	b.force_refresh().await.expect("Forced refresh should win the stamp it wrote.");

	assert_eq!(harness.refresher.max_in_flight(), 2);
	assert_eq!(harness.store.snapshot(), Some(State::new(forced)));

	// A then finds its stamp gone: the session is invalidated and A's loop stops.
	gate.send(Ok(RefreshOutcome::Renewed(harness.pair("late", 300, 86_400))))
		.expect("Refresh call should still await its gate.");
	settle().await;

	assert_eq!(harness.store.snapshot(), None);
	assert_eq!(token_of(&a), None);
	assert_eq!(token_of(&b), None);
	assert!(!a.is_running());
	assert_eq!(a.last_error().map(|error| error.kind()), Some(ErrorKind::LockIntegrity));
	assert!(b.is_running());
	assert_eq!(b.last_error().map(|error| error.kind()), None);
}

#[tokio::test(start_paused = true)]
async fn forced_refresh_losing_its_stamp_is_fatal() {
	let harness = Harness::new();
	let a = harness.engine(config(60, 10, 250));
	let b = harness.engine(config(60, 10, 600));

	a.set_pair(Some(harness.pair("initial", 300, 86_400))).await.expect("Login should succeed.");
	settle().await;

	let gate = harness.refresher.push_gate();
	let switched = harness.pair("switched", 300, 86_400);
	let (forced, ()) = tokio::join!(a.force_refresh(), async {
		settle().await;
		b.set_pair(Some(switched)).await.expect("Switching users should succeed.");
		gate.send(Ok(RefreshOutcome::Renewed(harness.pair("renewed", 300, 86_400))))
			.expect("Refresh call should still await its gate.");
	});
	let err = forced.expect_err("A replaced stamp should fail the forced refresh.");

	settle().await;

	assert_eq!(err.kind(), ErrorKind::LockIntegrity);
	assert!(err.is_fatal());
	assert_eq!(harness.refresher.calls(), 1);
	assert_eq!(harness.store.snapshot(), None);
	assert_eq!(token_of(&a), None);
	assert_eq!(token_of(&b), None);
	assert!(!a.is_running());
	assert_eq!(a.last_error().map(|error| error.kind()), Some(ErrorKind::LockIntegrity));
	assert!(b.is_running());
}
