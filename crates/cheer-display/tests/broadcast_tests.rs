//! Display broadcaster tests
//!
//! Covers:
//! - Primary display never mirrored
//! - Enabled flags, remembered across topology changes
//! - Topology changes tearing down and rebuilding surfaces
//! - Click-through applied to current and future surfaces

use cheer_display::{
    AnimationPool, Bounds, DisplayBroadcaster, DisplayInfo, PoolSurface, PoolSurfaceFactory,
    Result, Surface, POOL_CAPACITY,
};
use cheer_test_utils::RecordingFactory;
use std::sync::Arc;

// ============================================================================
// Utilities
// ============================================================================

fn displays(ids: &[&str]) -> Vec<DisplayInfo> {
    let mut all = vec![DisplayInfo::new("primary", Bounds::default(), true)];
    all.extend(
        ids.iter()
            .map(|id| DisplayInfo::new(id, Bounds::new(1280.0, 720.0), false)),
    );
    all
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_primary_is_not_mirrored() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());

    assert_eq!(broadcaster.on_topology_change(&displays(&["left", "right"])), 2);
    assert!(factory.latest("primary").is_none());

    assert_eq!(broadcaster.broadcast("🔥"), 2);
    assert_eq!(factory.latest("left").unwrap().spawned(), vec!["🔥"]);
    assert_eq!(factory.latest("right").unwrap().spawned(), vec!["🔥"]);
}

#[test]
fn test_no_secondary_displays() {
    let broadcaster = DisplayBroadcaster::new(RecordingFactory::new());
    broadcaster.on_topology_change(&displays(&[]));

    assert!(broadcaster.is_empty());
    assert_eq!(broadcaster.broadcast("🔥"), 0);
}

#[test]
fn test_disabled_surface_is_skipped() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());
    broadcaster.on_topology_change(&displays(&["left", "right"]));

    assert!(broadcaster.set_enabled("left", false));
    assert_eq!(broadcaster.broadcast("👏"), 1);

    assert_eq!(factory.latest("left").unwrap().spawn_count(), 0);
    assert_eq!(factory.latest("right").unwrap().spawn_count(), 1);
}

#[test]
fn test_topology_change_rebuilds_and_remembers() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());
    broadcaster.on_topology_change(&displays(&["left", "right"]));
    broadcaster.set_enabled("left", false);
    let old_right = factory.latest("right").unwrap();

    broadcaster.on_topology_change(&displays(&["left", "right", "projector"]));

    assert!(old_right.is_closed());
    assert_eq!(factory.open().len(), 3);
    assert!(!broadcaster.is_enabled("left"));
    assert!(broadcaster.is_enabled("projector"));

    let surfaces = broadcaster.surfaces();
    assert_eq!(surfaces.len(), 3);
    assert!(surfaces.iter().any(|s| s.id == "left" && !s.enabled));

    assert_eq!(broadcaster.broadcast("🎉"), 2);
}

#[test]
fn test_removed_display_goes_away() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());
    broadcaster.on_topology_change(&displays(&["left", "right"]));
    broadcaster.on_topology_change(&displays(&["left"]));

    assert_eq!(broadcaster.len(), 1);
    assert!(!broadcaster.set_enabled("right", false));
    assert_eq!(factory.open().len(), 1);
}

#[test]
fn test_click_through_follows_rebuilds() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());
    broadcaster.on_topology_change(&displays(&["left"]));

    broadcaster.set_click_through(true);
    assert_eq!(factory.latest("left").unwrap().click_through_history(), vec![false, true]);

    broadcaster.on_topology_change(&displays(&["left"]));
    assert_eq!(factory.latest("left").unwrap().click_through_history(), vec![true]);
}

#[test]
fn test_clear_closes_everything() {
    let factory = RecordingFactory::new();
    let broadcaster = DisplayBroadcaster::new(factory.clone());
    broadcaster.on_topology_change(&displays(&["a", "b"]));

    broadcaster.clear();
    assert!(broadcaster.is_empty());
    assert!(factory.open().is_empty());
}

#[test]
fn test_closure_factory() {
    let broadcaster = DisplayBroadcaster::new(|display: &DisplayInfo| -> Result<Arc<dyn Surface>> {
        let pool = AnimationPool::with_seed(4, display.bounds, 9);
        let surface: Arc<dyn Surface> = Arc::new(PoolSurface::manual(&display.id, pool));
        Ok(surface)
    });

    broadcaster.on_topology_change(&displays(&["left"]));
    assert_eq!(broadcaster.broadcast("🔥"), 1);
}

#[tokio::test]
async fn test_full_pool_surfaces_still_accept() {
    let broadcaster = DisplayBroadcaster::new(PoolSurfaceFactory::default());
    broadcaster.on_topology_change(&displays(&["left", "right"]));

    for _ in 0..POOL_CAPACITY + 5 {
        assert_eq!(broadcaster.broadcast("👏"), 2);
    }
}
