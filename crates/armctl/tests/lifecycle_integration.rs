//! SQL server lifecycle integration tests
//!
//! Drives the create -> update -> out-of-band delete -> destroy sequence an
//! acceptance run performs, against the in-memory control plane.
//!
//! Run with:
//! ```
//! RUST_LOG=armctl=debug cargo test -p armctl --test lifecycle_integration -- --nocapture
//! ```

use armctl::arm::{ResourceRef, SqlServerOperations};
use armctl::{LifecycleController, WaitConfig};
use armctl_test_utils::{InMemoryControlPlane, SqlServerFixture, get_test_location, init_tracing};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn setup() -> (InMemoryControlPlane, LifecycleController<InMemoryControlPlane>) {
    init_tracing();
    let plane = InMemoryControlPlane::isolated();
    let controller = LifecycleController::new(plane.clone());
    (plane, controller)
}

fn fast_wait() -> WaitConfig {
    WaitConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn basic_create_and_destroy() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(123, "westus");
    let target = fixture.reference();
    assert_eq!(target.name, "acctestsqlserver123");

    plane.create_or_update(&fixture.basic()).await.unwrap();
    controller.assert_exists(&target).await.unwrap();

    plane.remove(&target.resource_group, &target.name);
    controller.assert_destroyed(&target).await.unwrap();
}

#[tokio::test]
async fn tag_update_is_observed() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::random(get_test_location());
    let target = fixture.reference();

    plane.create_or_update(&fixture.with_tags()).await.unwrap();
    controller.assert_exists(&target).await.unwrap();
    controller.assert_tag_count(&target, 2).await.unwrap();
    controller.assert_tag(&target, "environment", "staging").await.unwrap();
    controller.assert_tag(&target, "database", "test").await.unwrap();

    plane.create_or_update(&fixture.with_tags_updated()).await.unwrap();
    controller.assert_exists(&target).await.unwrap();
    controller.assert_tag_count(&target, 1).await.unwrap();
    controller.assert_tag(&target, "environment", "production").await.unwrap();

    let err = controller.assert_tag_count(&target, 2).await.unwrap_err();
    assert!(err.to_string().contains("attribute 'tags.%' expected '2', got '1'"));

    let err = controller.assert_tag(&target, "database", "test").await.unwrap_err();
    assert!(err.to_string().contains("got '<unset>'"));
}

#[tokio::test]
async fn disappears_out_of_band() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(123, "westus");
    let target = fixture.reference();

    plane.create_or_update(&fixture.basic()).await.unwrap();
    controller.assert_exists(&target).await.unwrap();

    controller.force_delete(&target).await.unwrap();
    assert!(!plane.contains(&target.resource_group, &target.name));

    // Destroy checks are idempotent
    controller.assert_destroyed(&target).await.unwrap();
    controller.assert_destroyed(&target).await.unwrap();

    let err = controller.assert_exists(&target).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("acctestsqlserver123"));
}

#[tokio::test]
async fn repeated_force_delete_stays_destroyed() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(321, "westus");
    let target = fixture.reference();
    plane.create_or_update(&fixture.basic()).await.unwrap();

    for _ in 0..3 {
        controller.force_delete(&target).await.unwrap();
        controller.assert_destroyed(&target).await.unwrap();
    }
    assert!(controller.assert_exists(&target).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn destroy_check_fails_while_present() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(7, "westus");
    plane.create_or_update(&fixture.basic()).await.unwrap();

    let err = controller.assert_destroyed(&fixture.reference()).await.unwrap_err();
    assert!(err.is_still_exists());
    assert!(err.to_string().contains("acctestRG_7"));
}

#[tokio::test]
async fn force_delete_of_absent_server_succeeds() {
    let (plane, controller) = setup();
    let target = ResourceRef::new("acctestRG_404", "acctestsqlserver404");

    controller.force_delete(&target).await.unwrap();
    controller.assert_destroyed(&target).await.unwrap();
    assert!(plane.server_names().is_empty());
}

#[tokio::test]
async fn all_destroyed_stops_at_first_survivor() {
    let (plane, controller) = setup();
    let gone = SqlServerFixture::new(1, "westus");
    let alive = SqlServerFixture::new(2, "westus");
    plane.create_or_update(&alive.basic()).await.unwrap();

    controller
        .assert_all_destroyed(&[gone.reference()])
        .await
        .unwrap();

    let err = controller
        .assert_all_destroyed(&[gone.reference(), alive.reference()])
        .await
        .unwrap_err();
    assert!(err.is_still_exists());
    assert!(err.to_string().contains("acctestsqlserver2"));
}

#[tokio::test]
async fn wait_until_destroyed_rides_out_stale_reads() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(11, "westus");
    let target = fixture.reference();
    plane.create_or_update(&fixture.basic()).await.unwrap();
    plane.stale_reads_after_delete(&target.name, 3);

    controller.force_delete(&target).await.unwrap();
    assert!(controller.assert_destroyed(&target).await.is_err());

    controller
        .wait_until_destroyed(&target, &fast_wait(), None)
        .await
        .unwrap();
    controller.assert_destroyed(&target).await.unwrap();
}

#[tokio::test]
async fn wait_until_destroyed_honors_cancellation() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(12, "westus");
    plane.create_or_update(&fixture.basic()).await.unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = controller
        .wait_until_destroyed(&fixture.reference(), &fast_wait(), Some(&cancel))
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(err.to_string().contains("acctestsqlserver12"));
}

#[tokio::test(start_paused = true)]
async fn wait_until_destroyed_times_out_while_present() {
    let (plane, controller) = setup();
    let fixture = SqlServerFixture::new(13, "westus");
    plane.create_or_update(&fixture.basic()).await.unwrap();

    let err = controller
        .wait_until_destroyed(&fixture.reference(), &fast_wait(), None)
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert!(!err.is_transport());
}
