//! Kernel source loading, compilation, and pipeline resolution.
//!
//! The resolver is variant-agnostic: it compiles whatever WGSL it is
//! given and resolves a named entry point against a binding table.
//! Which entry point and table to use is the mode's decision
//! ([`crate::config::Mode`]).
//!
//! Compile and build diagnostics are captured through wgpu validation
//! error scopes and surfaced verbatim in the error variants, since a
//! binding-order mismatch between host and kernel is otherwise a
//! silent-corruption hazard the type system cannot catch.

use std::borrow::Cow;
use std::path::Path;

use crate::config::SlotKind;
use crate::context::GpuContext;
use crate::error::SimError;

/// Read kernel source wholesale from a UTF-8 text file.
///
/// # Errors
/// [`SimError::SourceRead`] naming the path on any I/O failure.
pub fn read_kernel_source(path: &Path) -> Result<String, SimError> {
    std::fs::read_to_string(path).map_err(|e| SimError::SourceRead {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// A compiled kernel library (one WGSL module, possibly several entry
/// points).
#[derive(Debug)]
pub struct KernelLibrary {
    module: wgpu::ShaderModule,
    workgroup_size: u32,
}

/// An executable pipeline resolved from a library entry point.
#[derive(Debug)]
pub struct KernelPipeline {
    /// The compute pipeline.
    pub pipeline: wgpu::ComputePipeline,
    /// Layout the bind group must be built against.
    pub bind_group_layout: wgpu::BindGroupLayout,
    /// Invocations per workgroup the entry point was compiled with.
    pub workgroup_size: u32,
}

impl KernelLibrary {
    /// Compile WGSL source into a library.
    ///
    /// The module's declared `@workgroup_size` is captured here: the
    /// driver's group-count computation follows the source, so an
    /// external kernel with a narrower workgroup still covers the whole
    /// population.
    ///
    /// # Errors
    /// [`SimError::Compile`] carrying the compiler's diagnostic text,
    /// or describing a missing, non-literal, or ambiguous
    /// `@workgroup_size`.
    pub fn compile(ctx: &GpuContext, source: &str, label: &str) -> Result<Self, SimError> {
        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = ctx
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(source)),
            });
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            return Err(SimError::Compile {
                message: err.to_string(),
            });
        }
        let workgroup_size = parse_workgroup_size(source)?;
        Ok(Self {
            module,
            workgroup_size,
        })
    }

    /// Resolve a named entry point into an executable pipeline bound to
    /// the given slot table.
    ///
    /// # Errors
    /// * [`SimError::EntryPointNotFound`] if the symbol is absent.
    /// * [`SimError::PipelineBuild`] for any other construction failure.
    pub fn resolve(
        &self,
        ctx: &GpuContext,
        entry_point: &str,
        slots: &[SlotKind],
    ) -> Result<KernelPipeline, SimError> {
        let bind_group_layout = create_slot_layout(&ctx.device, slots, entry_point);

        let pipeline_layout = ctx
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(entry_point),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        ctx.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = ctx
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry_point),
                layout: Some(&pipeline_layout),
                module: &self.module,
                entry_point: Some(entry_point),
                compilation_options: Default::default(),
                cache: None,
            });
        if let Some(err) = pollster::block_on(ctx.device.pop_error_scope()) {
            let message = err.to_string();
            if message.contains(entry_point) || message.to_lowercase().contains("entry point") {
                return Err(SimError::EntryPointNotFound {
                    name: entry_point.to_owned(),
                });
            }
            return Err(SimError::PipelineBuild { message });
        }

        Ok(KernelPipeline {
            pipeline,
            bind_group_layout,
            workgroup_size: self.workgroup_size,
        })
    }
}

/// Extract the workgroup x-dimension shared by a module's entry points.
///
/// Both the group-count computation and the kernels' index
/// linearization depend on this value, so a module that declares no
/// `@workgroup_size`, uses a non-literal size, or whose entry points
/// disagree on the size is rejected before any dispatch.
fn parse_workgroup_size(source: &str) -> Result<u32, SimError> {
    const ATTR: &str = "@workgroup_size(";
    let mut size: Option<u32> = None;
    for (start, _) in source.match_indices(ATTR) {
        let rest = source[start + ATTR.len()..].trim_start();
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let n: u32 = digits.parse().map_err(|_| SimError::Compile {
            message: "non-literal @workgroup_size in kernel source".to_owned(),
        })?;
        if n == 0 {
            return Err(SimError::Compile {
                message: "@workgroup_size must be nonzero".to_owned(),
            });
        }
        match size {
            Some(prev) if prev != n => {
                return Err(SimError::Compile {
                    message: format!(
                        "conflicting @workgroup_size values {} and {} in one module",
                        prev, n
                    ),
                });
            }
            _ => size = Some(n),
        }
    }
    size.ok_or_else(|| SimError::Compile {
        message: "kernel source declares no @workgroup_size".to_owned(),
    })
}

/// Build an explicit bind-group layout from a slot table.
///
/// Slot ordinals are the table indices; this is the host half of the
/// fixed binding contract the kernels declare with `@binding(n)`.
fn create_slot_layout(
    device: &wgpu::Device,
    slots: &[SlotKind],
    label: &str,
) -> wgpu::BindGroupLayout {
    let entries: Vec<wgpu::BindGroupLayoutEntry> = slots
        .iter()
        .enumerate()
        .map(|(i, kind)| {
            let ty = match kind {
                SlotKind::StateRw => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                SlotKind::ShimRead => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                SlotKind::FieldUniform | SlotKind::StepUniform => wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
            };
            wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty,
                count: None,
            }
        })
        .collect();

    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(label),
        entries: &entries,
    })
}
