use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::context::{GpuContext, GpuError};
use super::wire;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const GRAYSCALE_WGSL: &str = include_str!("shaders/grayscale.wgsl");
const BRAILLE_WGSL: &str = include_str!("shaders/braille.wgsl");
const HALFBLOCK_WGSL: &str = include_str!("shaders/halfblock.wgsl");

/// Braille `mode` values understood by `braille.wgsl`.
pub const MODE_THRESHOLD: u32 = 0;
pub const MODE_ORDERED: u32 = 1;
pub const MODE_FLOOD: u32 = 2;
pub const MODE_BAYER: u32 = 3;

/// Uniform partagé par tous les kernels. Même disposition que `Params` en WGSL.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Params {
    pub width: u32,
    pub height: u32,
    pub cells_w: u32,
    pub cells_h: u32,
    pub threshold: u32,
    pub mode: u32,
    pub total: u32,
    pub _pad: u32,
}

/// Pipelines compilés une fois, à l'initialisation.
pub struct Kernels {
    layout: wgpu::BindGroupLayout,
    pub grayscale: wgpu::ComputePipeline,
    pub braille: wgpu::ComputePipeline,
    pub halfblock: wgpu::ComputePipeline,
}

/// Issue du `map_async` après l'attente : le rappel doit avoir été livré avec succès.
fn mapping_status<E: std::fmt::Display>(
    received: Result<Result<(), E>, flume::TryRecvError>,
    idle: bool,
) -> Result<(), GpuError> {
    match received {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(GpuError::Readback(e.to_string())),
        Err(e) => Err(GpuError::Readback(format!(
            "mapping non livré ({e}), file {}",
            if idle { "vide" } else { "encore occupée" }
        ))),
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

impl Kernels {
    /// Compile every kernel. Any validation error aborts GPU initialization.
    ///
    /// # Errors
    /// [`GpuError::Shader`] naming the first kernel that failed.
    pub fn compile(ctx: &GpuContext) -> Result<Self, GpuError> {
        let device = &ctx.device;
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("termcell-bgl"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("termcell-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |kernel: &'static str, body: &str| -> Result<wgpu::ComputePipeline, GpuError> {
            device.push_error_scope(wgpu::ErrorFilter::Validation);
            let source = format!("{COMMON_WGSL}\n{body}");
            let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(kernel),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(kernel),
                layout: Some(&pipeline_layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
            match pollster::block_on(device.pop_error_scope()) {
                None => Ok(pipeline),
                Some(err) => Err(GpuError::Shader {
                    kernel,
                    message: err.to_string(),
                }),
            }
        };

        Ok(Self {
            grayscale: make_pipeline("grayscale", GRAYSCALE_WGSL)?,
            braille: make_pipeline("braille", BRAILLE_WGSL)?,
            halfblock: make_pipeline("halfblock", HALFBLOCK_WGSL)?,
            layout,
        })
    }

    /// Upload `input`, run `pipeline` over `invocations`, read back `out_words` words.
    ///
    /// Blocks until the readback completes.
    ///
    /// # Errors
    /// Oversized buffers or grids, validation errors, or a failed map.
    pub fn run(
        &self,
        ctx: &GpuContext,
        pipeline: &wgpu::ComputePipeline,
        input: &[u32],
        params: &Params,
        invocations: u32,
        out_words: usize,
    ) -> Result<Vec<u32>, GpuError> {
        let in_bytes = (input.len() * 4) as u64;
        let out_bytes = (out_words * 4) as u64;
        ctx.check_buffer(in_bytes)?;
        ctx.check_buffer(out_bytes)?;
        let (gx, gy) = wire::dispatch_grid(invocations, ctx.max_workgroups_per_dim).ok_or(
            GpuError::DispatchTooLarge {
                invocations: u64::from(invocations),
            },
        )?;

        let device = &ctx.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let src = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("termcell-src"),
            contents: bytemuck::cast_slice(input),
            usage: wgpu::BufferUsages::STORAGE,
        });
        let dst = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("termcell-dst"),
            size: out_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("termcell-staging"),
            size: out_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("termcell-params"),
            contents: bytemuck::bytes_of(params),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("termcell-bg"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: uniform.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("termcell-encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("termcell-pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(gx, gy, 1);
        }
        encoder.copy_buffer_to_buffer(&dst, 0, &staging, 0, out_bytes);
        ctx.queue.submit(Some(encoder.finish()));

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(GpuError::Validation(err.to_string()));
        }

        let slice = staging.slice(..);
        let (tx, rx) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let idle = device.poll(wgpu::Maintain::Wait).is_queue_empty();
        mapping_status(rx.try_recv(), idle)?;

        let words = {
            let data = slice.get_mapped_range();
            data.chunks_exact(4)
                .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        };
        staging.unmap();
        Ok(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_mapping_is_accepted() {
        assert!(mapping_status::<String>(Ok(Ok(())), true).is_ok());
    }

    #[test]
    fn undelivered_mapping_is_a_readback_error() {
        let (tx, rx) = flume::bounded::<Result<(), String>>(1);
        let err = mapping_status(rx.try_recv(), false).unwrap_err();
        assert!(matches!(&err, GpuError::Readback(m) if m.contains("encore occupée")), "{err}");
        drop(tx);
        assert!(matches!(mapping_status(rx.try_recv(), true), Err(GpuError::Readback(_))));
    }

    #[test]
    fn failed_mapping_keeps_driver_message() {
        let err = mapping_status(Ok(Err("buffer détruit".to_string())), true).unwrap_err();
        assert!(matches!(err, GpuError::Readback(m) if m == "buffer détruit"));
    }
}
