//! Display wake lock
//!
//! One controller, two capability variants. The native variant is probed at
//! construction; the fallback is only built the first time a lock is
//! requested. Whichever variant is selected stays selected for the life of
//! the controller.

mod fallback;
mod native;

pub use fallback::HeartbeatProvider;
pub use native::{InhibitorKind, InhibitorProvider};

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::WakeLockConfig;
use crate::error::WakeLockError;
use crate::Result;

/// A platform mechanism that keeps the display awake
#[async_trait::async_trait]
pub trait WakeLockProvider: Send {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Take (or re-take) the lock. Must be idempotent while held.
    async fn acquire(&mut self) -> Result<()>;

    /// Drop the lock; no-op when not held
    fn release(&mut self);

    /// Whether the lock is still in force; the platform may drop it silently
    fn is_held(&mut self) -> bool;
}

/// Builds the fallback provider on first use
pub type ProviderFactory = Box<dyn FnOnce() -> Box<dyn WakeLockProvider> + Send>;

/// Which capability variant backs the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeLockMode {
    Native,
    Fallback,
    Unsupported,
}

enum Backend {
    Native(Box<dyn WakeLockProvider>),
    Fallback {
        factory: Option<ProviderFactory>,
        provider: Option<Box<dyn WakeLockProvider>>,
    },
    Unsupported,
}

/// Owns the single wake lock session
pub struct WakeLockController {
    backend: Backend,
    /// The lock is believed to be in force right now
    active: bool,
    /// A caller asked for the lock and has not released it yet
    engaged: bool,
    last_error: Option<WakeLockError>,
}

impl WakeLockController {
    /// Select a variant: native if present, otherwise the fallback, otherwise unsupported
    pub fn new(native: Option<Box<dyn WakeLockProvider>>, fallback: Option<ProviderFactory>) -> Self {
        let backend = match (native, fallback) {
            (Some(provider), _) => Backend::Native(provider),
            (None, Some(factory)) => Backend::Fallback {
                factory: Some(factory),
                provider: None,
            },
            (None, None) => Backend::Unsupported,
        };
        Self {
            backend,
            active: false,
            engaged: false,
            last_error: None,
        }
    }

    pub fn unsupported() -> Self {
        Self::new(None, None)
    }

    /// Probe the running system for a wake lock mechanism
    pub fn from_config(config: &WakeLockConfig) -> Self {
        if !config.enabled {
            info!("Wake lock disabled by configuration");
            return Self::unsupported();
        }

        let native = InhibitorKind::detect()
            .map(|kind| Box::new(InhibitorProvider::new(kind)) as Box<dyn WakeLockProvider>);

        let fallback = if native.is_none() && HeartbeatProvider::is_available() {
            let interval = std::time::Duration::from_secs(config.fallback_interval_secs);
            Some(Box::new(move || {
                Box::new(HeartbeatProvider::new(interval)) as Box<dyn WakeLockProvider>
            }) as ProviderFactory)
        } else {
            None
        };

        let controller = Self::new(native, fallback);
        info!(mode = ?controller.mode(), "Wake lock capability probed");
        controller
    }

    pub fn mode(&self) -> WakeLockMode {
        match self.backend {
            Backend::Native(_) => WakeLockMode::Native,
            Backend::Fallback { .. } => WakeLockMode::Fallback,
            Backend::Unsupported => WakeLockMode::Unsupported,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.mode() != WakeLockMode::Unsupported
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// A session is open (acquired and not yet released)
    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    /// Most recent non-fatal problem, for a non-blocking UI warning
    pub fn last_error(&self) -> Option<&WakeLockError> {
        self.last_error.as_ref()
    }

    /// Acquire the lock for a session
    ///
    /// The first acquire of a session is fatal on failure. Calling again while
    /// the session is open re-validates the hold and re-acquires under the
    /// non-fatal policy if the platform dropped it.
    pub async fn acquire(&mut self) -> std::result::Result<(), WakeLockError> {
        if self.engaged {
            if self.active && self.provider_held() {
                return Ok(());
            }
            self.reacquire().await;
            return Ok(());
        }

        match self.request().await {
            Ok(()) => {
                self.engaged = true;
                self.active = true;
                self.last_error = None;
                debug!(mode = ?self.mode(), "Wake lock acquired");
                Ok(())
            }
            Err(WakeLockError::Unsupported) => {
                warn!("Wake lock unsupported, the display may sleep during playback");
                self.engaged = true;
                self.last_error = Some(WakeLockError::Unsupported);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Wake lock acquire failed");
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Release the session; safe to call when nothing is held
    pub fn release(&mut self) {
        if !self.engaged && !self.active {
            return;
        }
        if let Some(provider) = self.provider_mut() {
            provider.release();
        }
        self.active = false;
        self.engaged = false;
        debug!("Wake lock released");
    }

    /// React to the host becoming hidden or visible
    pub async fn on_visibility_change(&mut self, visible: bool) {
        if !visible {
            if self.active {
                debug!("Host hidden, dropping wake lock until visible again");
                if let Some(provider) = self.provider_mut() {
                    provider.release();
                }
            }
            self.active = false;
            return;
        }

        if self.engaged && !self.active && self.is_supported() {
            self.reacquire().await;
        }
    }

    async fn reacquire(&mut self) {
        match self.request().await {
            Ok(()) => {
                self.active = true;
                self.last_error = None;
                info!("Wake lock re-acquired");
            }
            Err(WakeLockError::Unsupported) => {}
            Err(WakeLockError::AcquireFailed(message)) | Err(WakeLockError::ReacquireFailed(message)) => {
                let e = WakeLockError::ReacquireFailed(message);
                warn!(error = %e, "Continuing without wake lock");
                self.active = false;
                self.last_error = Some(e);
            }
        }
    }

    async fn request(&mut self) -> std::result::Result<(), WakeLockError> {
        let provider = match &mut self.backend {
            Backend::Native(provider) => provider,
            Backend::Fallback { factory, provider } => {
                if provider.is_none() {
                    if let Some(build) = factory.take() {
                        let built = build();
                        debug!(provider = built.name(), "Constructed fallback wake lock");
                        *provider = Some(built);
                    }
                }
                match provider {
                    Some(provider) => provider,
                    None => return Err(WakeLockError::Unsupported),
                }
            }
            Backend::Unsupported => return Err(WakeLockError::Unsupported),
        };

        provider
            .acquire()
            .await
            .map_err(|e| WakeLockError::AcquireFailed(e.to_string()))
    }

    fn provider_mut(&mut self) -> Option<&mut Box<dyn WakeLockProvider>> {
        match &mut self.backend {
            Backend::Native(provider) => Some(provider),
            Backend::Fallback { provider, .. } => provider.as_mut(),
            Backend::Unsupported => None,
        }
    }

    fn provider_held(&mut self) -> bool {
        self.provider_mut().map(|p| p.is_held()).unwrap_or(false)
    }
}

impl Drop for WakeLockController {
    fn drop(&mut self) {
        self.release();
    }
}

/// Locate an executable on `PATH`
pub(crate) fn find_program(name: &str) -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::WakeLockProvider;
    use crate::{Error, Result};

    /// Shared knobs for observing and steering a `MockProvider`
    #[derive(Clone, Default)]
    pub struct MockHandle {
        pub fail_next: Arc<AtomicUsize>,
        pub held: Arc<AtomicBool>,
        pub acquires: Arc<AtomicUsize>,
        pub releases: Arc<AtomicUsize>,
    }

    impl MockHandle {
        pub fn fail_times(&self, n: usize) {
            self.fail_next.store(n, Ordering::SeqCst);
        }

        /// Simulate the platform silently dropping the lock
        pub fn drop_lock(&self) {
            self.held.store(false, Ordering::SeqCst);
        }

        pub fn is_held(&self) -> bool {
            self.held.load(Ordering::SeqCst)
        }

        pub fn acquires(&self) -> usize {
            self.acquires.load(Ordering::SeqCst)
        }

        pub fn releases(&self) -> usize {
            self.releases.load(Ordering::SeqCst)
        }
    }

    pub struct MockProvider {
        handle: MockHandle,
    }

    impl MockProvider {
        pub fn new() -> (Self, MockHandle) {
            let handle = MockHandle::default();
            (Self { handle: handle.clone() }, handle)
        }
    }

    #[async_trait::async_trait]
    impl WakeLockProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn acquire(&mut self) -> Result<()> {
            self.handle.acquires.fetch_add(1, Ordering::SeqCst);
            let pending = self.handle.fail_next.load(Ordering::SeqCst);
            if pending > 0 {
                self.handle.fail_next.store(pending - 1, Ordering::SeqCst);
                return Err(Error::Other("permission denied".to_string()));
            }
            self.handle.held.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn release(&mut self) {
            if self.handle.held.swap(false, Ordering::SeqCst) {
                self.handle.releases.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn is_held(&mut self) -> bool {
            self.handle.is_held()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::testing::MockProvider;
    use super::*;

    fn native_controller() -> (WakeLockController, testing::MockHandle) {
        let (provider, handle) = MockProvider::new();
        (WakeLockController::new(Some(Box::new(provider)), None), handle)
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let (mut controller, handle) = native_controller();
        assert_eq!(controller.mode(), WakeLockMode::Native);
        assert!(controller.is_supported());

        controller.acquire().await.unwrap();
        assert!(controller.is_active());
        assert!(handle.is_held());

        controller.release();
        assert!(!controller.is_active());
        assert!(!handle.is_held());
        assert_eq!(handle.releases(), 1);

        // Releasing again is a no-op
        controller.release();
        assert_eq!(handle.releases(), 1);
    }

    #[tokio::test]
    async fn test_first_acquire_failure_is_fatal() {
        let (mut controller, handle) = native_controller();
        handle.fail_times(1);

        let err = controller.acquire().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(!controller.is_active());
        assert!(!controller.is_engaged());
        assert_eq!(controller.last_error(), Some(&err));
    }

    #[tokio::test]
    async fn test_acquire_is_idempotent_and_revalidates() {
        let (mut controller, handle) = native_controller();
        controller.acquire().await.unwrap();
        controller.acquire().await.unwrap();
        assert_eq!(handle.acquires(), 1);

        handle.drop_lock();
        controller.acquire().await.unwrap();
        assert_eq!(handle.acquires(), 2);
        assert!(handle.is_held());
    }

    #[tokio::test]
    async fn test_reacquire_failure_is_non_fatal() {
        let (mut controller, handle) = native_controller();
        controller.acquire().await.unwrap();

        controller.on_visibility_change(false).await;
        assert!(!controller.is_active());
        assert!(!handle.is_held());

        handle.fail_times(1);
        controller.on_visibility_change(true).await;
        assert!(!controller.is_active());
        assert!(controller.is_engaged());
        assert!(matches!(
            controller.last_error(),
            Some(WakeLockError::ReacquireFailed(_))
        ));

        // Next visibility return succeeds and clears the warning
        controller.on_visibility_change(false).await;
        controller.on_visibility_change(true).await;
        assert!(controller.is_active());
        assert!(controller.last_error().is_none());
    }

    #[tokio::test]
    async fn test_visible_without_session_does_not_acquire() {
        let (mut controller, handle) = native_controller();
        controller.on_visibility_change(false).await;
        controller.on_visibility_change(true).await;
        assert_eq!(handle.acquires(), 0);
        assert!(!controller.is_active());
    }

    #[tokio::test]
    async fn test_fallback_constructed_lazily_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let (provider, handle) = MockProvider::new();
        let counter = built.clone();
        let factory: ProviderFactory = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Box::new(provider) as Box<dyn WakeLockProvider>
        });

        let mut controller = WakeLockController::new(None, Some(factory));
        assert_eq!(controller.mode(), WakeLockMode::Fallback);
        assert_eq!(built.load(Ordering::SeqCst), 0);

        controller.acquire().await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        controller.release();
        controller.acquire().await.unwrap();
        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(handle.acquires(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_degrades() {
        let mut controller = WakeLockController::unsupported();
        assert!(!controller.is_supported());

        controller.acquire().await.unwrap();
        assert!(!controller.is_active());
        assert!(controller.is_engaged());
        assert_eq!(controller.last_error(), Some(&WakeLockError::Unsupported));

        controller.release();
        assert!(!controller.is_engaged());
    }

    #[test]
    fn test_disabled_config_is_unsupported() {
        let config = WakeLockConfig {
            enabled: false,
            ..Default::default()
        };
        let controller = WakeLockController::from_config(&config);
        assert_eq!(controller.mode(), WakeLockMode::Unsupported);
    }

    #[test]
    fn test_find_program_missing() {
        assert!(find_program("definitely-not-a-real-program-name").is_none());
    }
}
