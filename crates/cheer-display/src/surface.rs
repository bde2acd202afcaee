//! Render surfaces
//!
//! A surface is anything a spawn can be sent to. [`PoolSurface`] animates
//! in-process; [`IpcSurface`] forwards [`SurfaceMessage`]s as JSON lines to
//! an overlay process that runs its own pool.

use parking_lot::Mutex;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::animator::Animator;
use crate::error::{DisplayError, Result};
use crate::ipc::SurfaceMessage;
use crate::motion::Bounds;
use crate::pool::{AnimationPool, SharedPool};

/// A render target for floating visuals
pub trait Surface: Send + Sync {
    /// Display this surface is shown on
    fn id(&self) -> &str;

    /// Start a visual; a full pool drops it silently
    fn spawn(&self, symbol: &str) -> Result<()>;

    /// Let pointer input pass through to windows underneath
    fn set_click_through(&self, enabled: bool) -> Result<()>;

    /// Tear down; in-flight visuals are discarded
    fn close(&self);

    fn is_closed(&self) -> bool;
}

// ============================================================================
// In-process surface
// ============================================================================

/// Surface animating its own pool in this process
pub struct PoolSurface {
    id: String,
    pool: SharedPool,
    animator: Mutex<Option<Animator>>,
    click_through: AtomicBool,
    closed: AtomicBool,
}

impl PoolSurface {
    /// Create a surface and start its animator
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(id: &str, pool: AnimationPool, frame_rate: u32) -> Self {
        let pool = pool.shared();
        let animator = Animator::start(pool.clone(), frame_rate);
        debug!("Started surface {} ({} slots)", id, pool.lock().capacity());

        Self {
            id: id.to_string(),
            pool,
            animator: Mutex::new(Some(animator)),
            click_through: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Surface without an animator; the owner ticks the pool
    pub fn manual(id: &str, pool: AnimationPool) -> Self {
        Self {
            id: id.to_string(),
            pool: pool.shared(),
            animator: Mutex::new(None),
            click_through: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn pool(&self) -> &SharedPool {
        &self.pool
    }

    pub fn click_through(&self) -> bool {
        self.click_through.load(Ordering::SeqCst)
    }

    pub fn resize(&self, bounds: Bounds) {
        self.pool.lock().resize(bounds);
    }
}

impl Surface for PoolSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn spawn(&self, symbol: &str) -> Result<()> {
        if self.is_closed() {
            return Err(DisplayError::SurfaceClosed(self.id.clone()));
        }
        self.pool.lock().spawn(symbol, Instant::now());
        Ok(())
    }

    fn set_click_through(&self, enabled: bool) -> Result<()> {
        if self.is_closed() {
            return Err(DisplayError::SurfaceClosed(self.id.clone()));
        }
        self.click_through.store(enabled, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(mut animator) = self.animator.lock().take() {
            animator.stop();
        }
        self.pool.lock().clear();
        debug!("Closed surface {}", self.id);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for PoolSurface {
    fn drop(&mut self) {
        self.close();
    }
}

// ============================================================================
// Out-of-process surface
// ============================================================================

/// Surface living in an overlay process, fed JSON lines
pub struct IpcSurface {
    id: String,
    tx: Mutex<Option<mpsc::UnboundedSender<SurfaceMessage>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    child: Mutex<Option<Child>>,
}

impl IpcSurface {
    /// Forward messages to `writer`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<W>(id: &str, writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(write_messages(id.to_string(), writer, rx));

        Self {
            id: id.to_string(),
            tx: Mutex::new(Some(tx)),
            writer: Mutex::new(Some(task)),
            child: Mutex::new(None),
        }
    }

    /// Launch `program args...` and feed its stdin
    pub fn spawn_process(id: &str, program: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            DisplayError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "overlay stdin not captured",
            ))
        })?;

        info!("Launched overlay for display {} (pid {:?})", id, child.id());
        let surface = Self::new(id, stdin);
        *surface.child.lock() = Some(child);
        Ok(surface)
    }

    fn send(&self, message: SurfaceMessage) -> Result<()> {
        let guard = self.tx.lock();
        let tx = guard
            .as_ref()
            .ok_or_else(|| DisplayError::SurfaceClosed(self.id.clone()))?;
        tx.send(message)
            .map_err(|_| DisplayError::SurfaceClosed(self.id.clone()))
    }
}

async fn write_messages<W>(id: String, mut writer: W, mut rx: mpsc::UnboundedReceiver<SurfaceMessage>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let line = match message.to_line() {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to encode message for {}: {}", id, e);
                continue;
            }
        };

        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await
        };
        if let Err(e) = written.await {
            warn!("Overlay {} stopped accepting messages: {}", id, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
    debug!("Overlay writer for {} finished", id);
}

impl Surface for IpcSurface {
    fn id(&self) -> &str {
        &self.id
    }

    fn spawn(&self, symbol: &str) -> Result<()> {
        self.send(SurfaceMessage::SpawnEmoji {
            symbol: symbol.to_string(),
        })
    }

    fn set_click_through(&self, enabled: bool) -> Result<()> {
        self.send(SurfaceMessage::SetClickThrough { enabled })
    }

    fn close(&self) {
        // Dropping the sender lets the writer drain and close the pipe
        if self.tx.lock().take().is_none() {
            return;
        }
        self.writer.lock().take();
        if let Some(mut child) = self.child.lock().take() {
            if let Err(e) = child.start_kill() {
                debug!("Overlay {} already gone: {}", self.id, e);
            }
        }
        debug!("Closed overlay surface {}", self.id);
    }

    fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl Drop for IpcSurface {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::MessageReader;
    use std::time::Duration;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_pool_surface_spawns() {
        let surface = PoolSurface::manual("primary", AnimationPool::with_seed(2, Bounds::default(), 1));
        surface.spawn("🔥").unwrap();
        surface.spawn("🔥").unwrap();
        surface.spawn("🔥").unwrap();

        assert_eq!(surface.pool().lock().active_count(), 2);
        assert_eq!(surface.pool().lock().dropped_count(), 1);
    }

    #[tokio::test]
    async fn test_pool_surface_close() {
        let surface = PoolSurface::start("d1", AnimationPool::with_seed(4, Bounds::default(), 1), 60);
        surface.spawn("a").unwrap();
        surface.close();

        assert!(surface.is_closed());
        assert_eq!(surface.pool().lock().active_count(), 0);
        assert!(matches!(surface.spawn("a"), Err(DisplayError::SurfaceClosed(_))));
    }

    #[tokio::test]
    async fn test_ipc_surface_writes_lines() {
        let (client, server) = tokio::io::duplex(1024);
        let surface = IpcSurface::new("d2", client);
        let mut reader = MessageReader::new(BufReader::new(server));

        surface.spawn("🎉").unwrap();
        surface.set_click_through(true).unwrap();

        let first = tokio::time::timeout(Duration::from_secs(1), reader.next()).await;
        assert_eq!(
            first.unwrap().unwrap(),
            Some(SurfaceMessage::SpawnEmoji {
                symbol: "🎉".to_string()
            })
        );
        let second = tokio::time::timeout(Duration::from_secs(1), reader.next()).await;
        assert_eq!(
            second.unwrap().unwrap(),
            Some(SurfaceMessage::SetClickThrough { enabled: true })
        );

        surface.close();
        assert!(surface.is_closed());
        assert!(surface.spawn("x").is_err());
    }
}
