//! Accelerator context: device and queue acquisition.
//!
//! Queried once at startup. Absence of a compute-capable adapter is an
//! unrecoverable startup condition — there is no retry and no CPU
//! fallback path.

use crate::error::SimError;

/// Device capabilities relevant to buffer sizing and dispatch.
///
/// Captured once at acquisition and consulted by the buffer manager's
/// sizing policy and the driver's workgroup-split logic.
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    /// Adapter name as reported by the driver.
    pub adapter_name: String,
    /// Backend in use (Vulkan, Metal, DX12, GL).
    pub backend: wgpu::Backend,
    /// Whether the adapter reports a unified memory architecture.
    pub unified_memory: bool,
    /// Maximum single-buffer allocation in bytes.
    pub max_buffer_size: u64,
    /// Maximum bytes bindable as a single storage buffer.
    pub max_storage_binding: u64,
    /// Maximum invocations per workgroup.
    pub max_workgroup_invocations: u32,
    /// Maximum workgroups per dispatch dimension.
    pub max_workgroups_per_dim: u32,
}

/// Owns the wgpu device and its FIFO submission queue.
pub struct GpuContext {
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The command submission queue bound to the device.
    pub queue: wgpu::Queue,
    /// Capabilities captured at acquisition.
    pub caps: DeviceCaps,
}

impl GpuContext {
    /// Acquire the system's preferred high-performance adapter and
    /// create a device and queue on it.
    ///
    /// Requests the adapter's own buffer-size limits rather than wgpu's
    /// conservative defaults, so multi-gigabyte particle populations can
    /// be allocated and bound where the hardware allows it.
    ///
    /// # Errors
    /// * [`SimError::DeviceUnavailable`] if no adapter is present.
    /// * [`SimError::DeviceCreation`] if device creation fails.
    pub fn acquire() -> Result<Self, SimError> {
        pollster::block_on(Self::acquire_async())
    }

    async fn acquire_async() -> Result<Self, SimError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                ..Default::default()
            })
            .await
            .ok_or(SimError::DeviceUnavailable)?;

        let info = adapter.get_info();
        let adapter_limits = adapter.limits();

        // Lift the buffer-size ceilings to whatever the adapter reports;
        // everything else stays at the portable defaults.
        let required_limits = wgpu::Limits {
            max_buffer_size: adapter_limits.max_buffer_size,
            max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("borispush device"),
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| SimError::DeviceCreation {
                message: e.to_string(),
            })?;

        let limits = device.limits();
        let caps = DeviceCaps {
            adapter_name: info.name.clone(),
            backend: info.backend,
            unified_memory: info.device_type == wgpu::DeviceType::IntegratedGpu,
            max_buffer_size: limits.max_buffer_size,
            max_storage_binding: u64::from(limits.max_storage_buffer_binding_size),
            max_workgroup_invocations: limits.max_compute_invocations_per_workgroup,
            max_workgroups_per_dim: limits.max_compute_workgroups_per_dimension,
        };

        Ok(Self {
            device,
            queue,
            caps,
        })
    }

    /// Block until all work submitted to the queue has completed.
    ///
    /// This is the only blocking point in the system; the driver invokes
    /// it at the synchronization cadence and at the final drain.
    pub fn wait_idle(&self) {
        let _ = self.device.poll(wgpu::Maintain::Wait);
    }

    /// Print device capabilities to the console.
    pub fn print_info(&self) {
        println!("Device: {} ({:?})", self.caps.adapter_name, self.caps.backend);
        println!(
            "Unified Memory: {}",
            if self.caps.unified_memory { "Yes" } else { "No" }
        );
        println!(
            "Max Buffer Size: {:.1} GB",
            self.caps.max_buffer_size as f64 / (1024.0 * 1024.0 * 1024.0)
        );
    }
}
