use thiserror::Error;

/// Erreurs du backend GPU. Jamais remontées à l'appelant : chaque échec
/// déclenche le repli CPU.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No adapter supports compute.
    #[error("Aucun adaptateur GPU compatible")]
    NoAdapter,

    /// `request_device` failed.
    #[error("Création du device refusée : {0}")]
    Device(String),

    /// A WGSL kernel failed validation at pipeline creation.
    #[error("Compilation du kernel '{kernel}' échouée : {message}")]
    Shader {
        /// Kernel entry name.
        kernel: &'static str,
        /// Validation message from wgpu.
        message: String,
    },

    /// Buffer au-delà de `max_storage_buffer_binding_size`.
    #[error("Buffer de {bytes} octets au-delà de la limite du device ({limit})")]
    BufferTooLarge {
        /// Requested size.
        bytes: u64,
        /// Device limit.
        limit: u64,
    },

    /// The 2D workgroup grid exceeds the per-dimension limit.
    #[error("Grille de dispatch trop grande pour {invocations} invocations")]
    DispatchTooLarge {
        /// Requested invocation count.
        invocations: u64,
    },

    /// Error scope caught a validation error at dispatch.
    #[error("Erreur de validation au dispatch : {0}")]
    Validation(String),

    /// Staging buffer mapping failed or was never delivered.
    #[error("Relecture du buffer échouée : {0}")]
    Readback(String),
}

/// Device + queue wgpu et les limites utiles au dispatch.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub info: wgpu::AdapterInfo,
    pub max_buffer_bytes: u64,
    pub max_workgroups_per_dim: u32,
}

impl GpuContext {
    /// Open the high-performance adapter and a device with its native limits.
    ///
    /// # Errors
    /// [`GpuError::NoAdapter`] when no adapter answers, [`GpuError::Device`]
    /// when device creation is refused.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::new_async())
    }

    async fn new_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        if info.device_type == wgpu::DeviceType::Cpu {
            // llvmpipe, WARP : rasteriseur logiciel, pas un GPU.
            log::info!("Adaptateur logiciel ignoré : {}", info.name);
            return Err(GpuError::NoAdapter);
        }

        let limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("termcell-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| GpuError::Device(e.to_string()))?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            log::error!("Erreur GPU non capturée : {e}");
        }));

        let max_buffer_bytes = limits
            .max_buffer_size
            .min(u64::from(limits.max_storage_buffer_binding_size));
        log::info!(
            "GPU: {} ({:?}, {:?}), buffers ≤ {} Mo",
            info.name,
            info.backend,
            info.device_type,
            max_buffer_bytes / (1024 * 1024)
        );

        Ok(Self {
            device,
            queue,
            info,
            max_buffer_bytes,
            max_workgroups_per_dim: limits.max_compute_workgroups_per_dimension,
        })
    }

    /// Reject a buffer the device could not bind.
    ///
    /// # Errors
    /// [`GpuError::BufferTooLarge`].
    pub fn check_buffer(&self, bytes: u64) -> Result<(), GpuError> {
        if bytes > self.max_buffer_bytes {
            return Err(GpuError::BufferTooLarge {
                bytes,
                limit: self.max_buffer_bytes,
            });
        }
        Ok(())
    }
}
