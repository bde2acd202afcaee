//! Presenter runtime tests
//!
//! End-to-end over the in-memory event log: reactions arrive through a room
//! connection and land on the primary surface and the enabled secondaries.

use cheer_client::{ClientError, ConnectionState};
use cheer_display::{AnimationPool, Bounds, DisplayBroadcaster, DisplayInfo, PoolSurface, Surface};
use cheer_presenter::{PresenterConfig, PresenterContext, PresenterError, SecondaryDisplay};
use cheer_test_utils::{wait_for, RecordingFactory, RecordingSurface, RoomFixture, DEFAULT_CHECK_INTERVAL};
use cheer_transport::LogOp;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Utilities
// ============================================================================

struct Stage {
    fixture: RoomFixture,
    primary: Arc<RecordingSurface>,
    factory: RecordingFactory,
    ctx: PresenterContext,
}

/// Context with a recording primary and two secondaries, `d3` disabled
fn stage() -> Stage {
    let fixture = RoomFixture::new(1000);
    let primary = Arc::new(RecordingSurface::new("primary"));
    let factory = RecordingFactory::new();

    let broadcaster = Arc::new(DisplayBroadcaster::new(factory.clone()));
    broadcaster.on_topology_change(&[
        DisplayInfo::new("primary", Bounds::default(), true),
        DisplayInfo::new("d2", Bounds::default(), false),
        DisplayInfo::new("d3", Bounds::default(), false),
    ]);
    broadcaster.set_enabled("d3", false);

    let ctx = PresenterContext::new(fixture.connection(), primary.clone(), broadcaster);
    Stage {
        fixture,
        primary,
        factory,
        ctx,
    }
}

fn secondary(stage: &Stage, id: &str) -> Arc<RecordingSurface> {
    stage.factory.latest(id).unwrap()
}

// ============================================================================
// Reaction fan-out
// ============================================================================

#[tokio::test]
async fn test_live_reaction_reaches_every_enabled_surface() {
    let stage = stage();
    stage.ctx.init().unwrap();
    stage.ctx.connect("abc12").await.unwrap();

    stage.fixture.push_reaction("abc12", "🔥", 900).await;
    stage.fixture.push_reaction("abc12", "🔥", 1500).await;

    assert!(stage.primary.wait_for_spawns(1, WAIT).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(stage.primary.spawned(), vec!["🔥".to_string()]);
    assert_eq!(secondary(&stage, "d2").spawned(), vec!["🔥".to_string()]);
    assert_eq!(secondary(&stage, "d3").spawn_count(), 0);
}

#[tokio::test]
async fn test_backlog_is_not_rendered() {
    let stage = stage();
    stage.fixture.push_reaction("abc12", "👏", 1200).await;
    stage.ctx.init().unwrap();
    stage.ctx.connect("abc12").await.unwrap();

    stage.fixture.push_reaction("abc12", "🎉", 2000).await;
    assert!(stage.primary.wait_for_spawns(1, WAIT).await);
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(stage.primary.spawned(), vec!["🎉".to_string()]);
}

#[tokio::test]
async fn test_nothing_rendered_before_init() {
    let stage = stage();
    stage.ctx.connect("abc12").await.unwrap();

    stage.fixture.push_reaction("abc12", "🔥", 1500).await;
    assert!(wait_for(
        || async { stage.ctx.connection().router().reaction_count() == 1 },
        DEFAULT_CHECK_INTERVAL,
        WAIT
    )
    .await);

    assert_eq!(stage.primary.spawn_count(), 0);
    assert!(!stage.ctx.is_initialized());
}

#[tokio::test]
async fn test_double_init_rejected() {
    let stage = stage();
    stage.ctx.init().unwrap();
    assert!(matches!(stage.ctx.init(), Err(PresenterError::AlreadyInitialized)));
}

#[tokio::test]
async fn test_full_primary_pool_drops_quietly() {
    let fixture = RoomFixture::new(1000);
    let primary = Arc::new(PoolSurface::manual(
        "primary",
        AnimationPool::with_seed(100, Bounds::default(), 9),
    ));
    for _ in 0..100 {
        primary.spawn("🔥").unwrap();
    }

    let broadcaster = Arc::new(DisplayBroadcaster::new(RecordingFactory::new()));
    let ctx = PresenterContext::new(fixture.connection(), primary.clone(), broadcaster);
    ctx.init().unwrap();
    ctx.connect("abc12").await.unwrap();

    fixture.push_reaction("abc12", "👏", 1500).await;
    assert!(wait_for(
        || async { primary.pool().lock().dropped_count() == 1 },
        DEFAULT_CHECK_INTERVAL,
        WAIT
    )
    .await);

    let pool = primary.pool().lock();
    assert_eq!(pool.active_count(), 100);
    assert!(pool.visuals().all(|(_, visual)| visual.symbol == "🔥"));
}

// ============================================================================
// Questions
// ============================================================================

#[tokio::test]
async fn test_mark_answered_writes_once() {
    let stage = stage();
    stage.ctx.init().unwrap();
    stage.ctx.connect("abc12").await.unwrap();
    let router = stage.ctx.connection().router();

    stage.fixture.put_question("abc12", "q1", "why?", 1500).await;
    assert!(wait_for(
        || async { router.question("q1").is_some() },
        DEFAULT_CHECK_INTERVAL,
        WAIT
    )
    .await);

    assert!(router.mark_answered("q1").await.unwrap());
    assert!(!router.mark_answered("q1").await.unwrap());

    assert!(router.question("q1").unwrap().answered);
    let write = LogOp::Write("rooms/abc12/questions/q1/answered".to_string());
    assert_eq!(stage.fixture.log.count(&write), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_dispose_tears_everything_down() {
    let stage = stage();
    stage.ctx.init().unwrap();
    stage.ctx.connect("abc12").await.unwrap();

    stage.ctx.dispose().await;

    assert!(!stage.ctx.is_initialized());
    assert!(!stage.ctx.connection().is_connected());
    assert!(!stage.fixture.room_exists("abc12"));
    assert!(stage.primary.is_closed());
    assert!(stage.factory.open().is_empty());
    assert!(stage.ctx.broadcaster().is_empty());
}

#[tokio::test]
async fn test_reinit_after_dispose() {
    let stage = stage();
    stage.ctx.init().unwrap();
    stage.ctx.dispose().await;

    stage.ctx.init().unwrap();
    assert!(stage.ctx.is_initialized());
}

#[tokio::test(start_paused = true)]
async fn test_interrupt_cancels_pending_connect() {
    let stage = stage();
    stage.fixture.log.set_write_delay(Some(Duration::from_secs(2)));

    let interrupt = tokio::time::sleep(Duration::from_millis(500));
    let result = stage.ctx.connect_until("abc12", interrupt).await;

    assert!(matches!(
        result,
        Err(PresenterError::Client(ClientError::Cancelled))
    ));
    assert_eq!(stage.ctx.connection().state(), ConnectionState::Cancelled);
    assert!(!stage.fixture.room_exists("abc12"));
}

#[tokio::test]
async fn test_connect_without_interrupt() {
    let stage = stage();
    let room = stage
        .ctx
        .connect_until("abc12", std::future::pending())
        .await
        .unwrap();

    assert_eq!(room.code.as_str(), "abc12");
    assert!(stage.ctx.connection().is_connected());
}

#[tokio::test]
async fn test_from_config_rejects_zero_timeout() {
    let fixture = RoomFixture::new(1000);
    let config = PresenterConfig {
        connect_timeout_secs: 0,
        ..PresenterConfig::default()
    };

    let result = PresenterContext::from_config(&config, fixture.event_log(), None);
    assert!(matches!(result, Err(PresenterError::Config(_))));
}

#[tokio::test]
async fn test_from_config_builds_secondaries() {
    let fixture = RoomFixture::new(1000);
    let config = PresenterConfig {
        pool_capacity: 8,
        click_through: true,
        secondary_displays: vec![
            SecondaryDisplay {
                id: "projector".to_string(),
                bounds: Bounds::new(1280.0, 720.0),
                enabled: true,
            },
            SecondaryDisplay {
                id: "stage".to_string(),
                bounds: Bounds::default(),
                enabled: false,
            },
        ],
        ..PresenterConfig::default()
    };

    let ctx = PresenterContext::from_config(&config, fixture.event_log(), None).unwrap();
    let surfaces = ctx.broadcaster().surfaces();

    assert_eq!(surfaces.len(), 2);
    assert!(ctx.broadcaster().is_enabled("projector"));
    assert!(!ctx.broadcaster().is_enabled("stage"));
    assert_eq!(ctx.broadcaster().broadcast("🔥"), 1);
    assert_eq!(ctx.connection().timeout(), Duration::from_secs(10));

    ctx.dispose().await;
    assert!(ctx.primary().is_closed());
}

#[tokio::test]
async fn test_overlay_mode_needs_a_program() {
    let fixture = RoomFixture::new(1000);
    let config = PresenterConfig {
        secondary_mode: cheer_presenter::SurfaceMode::Overlay,
        ..PresenterConfig::default()
    };

    let result = PresenterContext::from_config(&config, fixture.event_log(), None);
    assert!(matches!(result, Err(PresenterError::Config(_))));
}
