use std::sync::{Arc, OnceLock};

use tc_core::config::AccelConfig;
use tc_core::traits::ComputeBackend;

use crate::cpu::CpuBackend;

/// Étapes de la sélection du backend. Pas de retour à `Unselected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendState {
    /// Aucune sélection encore.
    Unselected,
    /// GPU initialization in progress.
    TryingGpu,
    /// The GPU backend serves calls.
    GpuActive,
    /// The CPU backend serves calls, by choice or after a GPU failure.
    CpuActive,
}

/// Outcome of one selection.
pub struct Selection {
    /// Backend retenu.
    pub backend: Box<dyn ComputeBackend>,
    /// Final state, `GpuActive` or `CpuActive`.
    pub state: BackendState,
}

/// Politique : GPU si l'initialisation réussit, sinon CPU.
///
/// # Example
/// ```
/// use tc_accel::factory::{BackendFactory, BackendState};
/// use tc_core::config::AccelConfig;
///
/// let config = AccelConfig { prefer_gpu: false, ..AccelConfig::default() };
/// let factory = BackendFactory::new();
/// assert_eq!(factory.state(), BackendState::Unselected);
/// let selection = factory.select(&config);
/// assert_eq!(selection.state, BackendState::CpuActive);
/// ```
#[derive(Debug)]
pub struct BackendFactory {
    state: BackendState,
}

impl Default for BackendFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendFactory {
    /// Factory in the `Unselected` state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: BackendState::Unselected,
        }
    }

    /// Current selection step.
    #[must_use]
    pub fn state(&self) -> BackendState {
        self.state
    }

    /// Run the selection. Consumes the factory: a selection happens once.
    #[must_use]
    pub fn select(mut self, config: &AccelConfig) -> Selection {
        if config.prefer_gpu {
            self.state = BackendState::TryingGpu;
            log::debug!("sélection du backend : essai GPU");
            if let Some(backend) = try_gpu(config) {
                self.state = BackendState::GpuActive;
                log::info!("Backend actif : {}", backend.name());
                return Selection {
                    backend,
                    state: self.state,
                };
            }
        }
        self.state = BackendState::CpuActive;
        let backend: Box<dyn ComputeBackend> = Box::new(CpuBackend::from_config(config));
        log::info!("Backend actif : {}", backend.name());
        Selection {
            backend,
            state: self.state,
        }
    }
}

#[cfg(feature = "gpu")]
fn try_gpu(config: &AccelConfig) -> Option<Box<dyn ComputeBackend>> {
    let gpu = crate::gpu::GpuBackend::new(config);
    if gpu.is_available() {
        Some(Box::new(gpu))
    } else {
        None
    }
}

#[cfg(not(feature = "gpu"))]
fn try_gpu(_config: &AccelConfig) -> Option<Box<dyn ComputeBackend>> {
    log::debug!("compilé sans la feature `gpu`, repli CPU");
    None
}

/// Fresh selection: the GPU backend if it initializes, else the CPU backend.
#[must_use]
pub fn get_best_backend(config: &AccelConfig) -> Box<dyn ComputeBackend> {
    BackendFactory::new().select(config).backend
}

struct Current {
    backend: Arc<dyn ComputeBackend>,
    state: BackendState,
}

static CURRENT: OnceLock<Current> = OnceLock::new();

/// Sélectionne le backend du processus au premier appel, puis le réutilise.
///
/// Later calls ignore `config` and return the backend chosen first.
pub fn init_backend(config: &AccelConfig) -> Arc<dyn ComputeBackend> {
    let current = CURRENT.get_or_init(|| {
        let Selection { backend, state } = BackendFactory::new().select(config);
        Current {
            backend: Arc::from(backend),
            state,
        }
    });
    Arc::clone(&current.backend)
}

/// Process-wide backend, selected with the default configuration if
/// [`init_backend`] was never called.
pub fn current_backend() -> Arc<dyn ComputeBackend> {
    init_backend(&AccelConfig::default())
}

/// State of the process-wide selection.
#[must_use]
pub fn current_state() -> BackendState {
    CURRENT
        .get()
        .map_or(BackendState::Unselected, |current| current.state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_only_config_skips_gpu() {
        let config = AccelConfig {
            prefer_gpu: false,
            threads: 1,
            ..AccelConfig::default()
        };
        let selection = BackendFactory::new().select(&config);
        assert_eq!(selection.state, BackendState::CpuActive);
        assert!(selection.backend.name().starts_with("CPU"));
        assert!((selection.backend.speedup_factor() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn selection_always_yields_a_usable_backend() {
        let selection = BackendFactory::new().select(&AccelConfig::default());
        assert!(selection.backend.is_available());
        match selection.state {
            BackendState::GpuActive => assert!(selection.backend.speedup_factor() > 1.0),
            BackendState::CpuActive => assert!(selection.backend.name().starts_with("CPU")),
            other => panic!("état terminal attendu, obtenu {other:?}"),
        }
        let mut gray = [0u8; 1];
        selection.backend.grayscale(&[10, 10, 10], 1, 1, &mut gray).unwrap();
        assert_eq!(gray[0], 10);
    }

    #[cfg(not(feature = "gpu"))]
    #[test]
    fn without_gpu_feature_cpu_is_selected() {
        let selection = BackendFactory::new().select(&AccelConfig::default());
        assert_eq!(selection.state, BackendState::CpuActive);
    }

    #[test]
    fn current_backend_is_selected_once() {
        let a = current_backend();
        let b = init_backend(&AccelConfig {
            prefer_gpu: false,
            ..AccelConfig::default()
        });
        assert!(Arc::ptr_eq(&a, &b));
        assert_ne!(current_state(), BackendState::Unselected);
    }
}
