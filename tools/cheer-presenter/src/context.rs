//! Presenter runtime
//!
//! [`PresenterContext`] owns the room connection and the surfaces, and wires
//! live reactions to the primary surface and every enabled secondary one.
//! It is built once; [`init`](PresenterContext::init) and
//! [`dispose`](PresenterContext::dispose) bracket its use.

use cheer_client::{RoomConnection, SubscriptionHandle};
use cheer_core::Room;
use cheer_display::{AnimationPool, DisplayBroadcaster, PoolSurface, PoolSurfaceFactory, Surface};
use cheer_transport::EventLog;
use parking_lot::Mutex;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{PresenterConfig, SurfaceMode, PRIMARY_DISPLAY_ID};
use crate::error::{PresenterError, Result};
use crate::overlay::OverlayFactory;

pub struct PresenterContext {
    connection: RoomConnection,
    primary: Arc<dyn Surface>,
    broadcaster: Arc<DisplayBroadcaster>,
    reactions: Mutex<Option<SubscriptionHandle>>,
}

impl PresenterContext {
    pub fn new(
        connection: RoomConnection,
        primary: Arc<dyn Surface>,
        broadcaster: Arc<DisplayBroadcaster>,
    ) -> Self {
        Self {
            connection,
            primary,
            broadcaster,
            reactions: Mutex::new(None),
        }
    }

    /// Build the connection and every surface described by `config`
    ///
    /// `overlay_program` is required when secondaries run as overlays. Must
    /// be called from within a tokio runtime.
    pub fn from_config(
        config: &PresenterConfig,
        log: Arc<dyn EventLog>,
        overlay_program: Option<&Path>,
    ) -> Result<Self> {
        config.validate()?;
        let connection = RoomConnection::builder(log)
            .timeout(config.connect_timeout())
            .build();

        let pool = AnimationPool::with_capacity(config.pool_capacity, config.container);
        let primary: Arc<dyn Surface> =
            Arc::new(PoolSurface::start(PRIMARY_DISPLAY_ID, pool, config.frame_rate));
        primary.set_click_through(config.click_through)?;

        let broadcaster = match config.secondary_mode {
            SurfaceMode::InProcess => DisplayBroadcaster::new(PoolSurfaceFactory {
                capacity: config.pool_capacity,
                frame_rate: config.frame_rate,
            }),
            SurfaceMode::Overlay => {
                let program = overlay_program.ok_or_else(|| {
                    PresenterError::Config("overlay mode needs an overlay program".to_string())
                })?;
                DisplayBroadcaster::new(OverlayFactory::new(program, config))
            }
        };

        for display in &config.secondary_displays {
            broadcaster.set_enabled(&display.id, display.enabled);
        }
        broadcaster.set_click_through(config.click_through);
        broadcaster.on_topology_change(&config.displays());

        Ok(Self::new(connection, primary, Arc::new(broadcaster)))
    }

    /// Start routing reactions to the surfaces
    pub fn init(&self) -> Result<()> {
        let mut reactions = self.reactions.lock();
        if reactions.is_some() {
            return Err(PresenterError::AlreadyInitialized);
        }

        let primary = self.primary.clone();
        let broadcaster = self.broadcaster.clone();
        let handle = self.connection.router().on_reaction(move |reaction| {
            if let Err(e) = primary.spawn(&reaction.emoji) {
                warn!("Primary surface rejected {}: {}", reaction.emoji, e);
            }
            let mirrored = broadcaster.broadcast(&reaction.emoji);
            debug!("Reaction {} mirrored to {} surface(s)", reaction.emoji, mirrored);
        });

        *reactions = Some(handle);
        info!("Presenter initialized");
        Ok(())
    }

    /// Leave the room and tear every surface down
    pub async fn dispose(&self) {
        let handle = self.reactions.lock().take();
        if let Some(handle) = handle {
            handle.detach();
        }

        self.connection.leave().await;
        self.broadcaster.clear();
        self.primary.close();
        info!("Presenter disposed");
    }

    pub async fn connect(&self, raw_code: &str) -> Result<Room> {
        Ok(self.connection.connect(raw_code).await?)
    }

    /// Connect, cancelling the attempt if `interrupt` resolves first
    ///
    /// The attempt still runs to completion after a cancel so its presence
    /// is cleaned up before this returns.
    pub async fn connect_until<F>(&self, raw_code: &str, interrupt: F) -> Result<Room>
    where
        F: Future<Output = ()>,
    {
        let connecting = self.connect(raw_code);
        tokio::pin!(connecting);

        tokio::select! {
            result = &mut connecting => return result,
            _ = interrupt => {}
        }

        if self.connection.cancel() {
            info!("Connect to {} interrupted, cancelling", raw_code.trim());
        }
        connecting.await
    }

    pub fn is_initialized(&self) -> bool {
        self.reactions.lock().is_some()
    }

    pub fn connection(&self) -> &RoomConnection {
        &self.connection
    }

    pub fn primary(&self) -> &Arc<dyn Surface> {
        &self.primary
    }

    pub fn broadcaster(&self) -> &Arc<DisplayBroadcaster> {
        &self.broadcaster
    }
}
