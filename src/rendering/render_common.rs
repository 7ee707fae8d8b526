use std::sync::RwLock;

use anyhow::Context;
use wgpu::SurfaceConfiguration;

use crate::rendering::{frame_uniform::FrameUniform, texture::DEPTH_FORMAT};

/// Device-wide state shared by every pass.
pub struct RenderCommon {
    pub output_surface_config: RwLock<SurfaceConfiguration>,
    pub frame_uniform: FrameUniform,
    /// MSAA samples used by every color and depth target.
    pub sample_count: u32,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        surface: &wgpu::Surface,
        width: u32,
        height: u32,
        requested_sample_count: u32,
    ) -> anyhow::Result<Self> {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;

        let output_surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(device, &output_surface_config);

        let color_flags = adapter.get_texture_format_features(surface_format).flags;
        let depth_flags = adapter.get_texture_format_features(DEPTH_FORMAT).flags;
        let sample_count = pick_sample_count(requested_sample_count, |count| {
            color_flags.sample_count_supported(count) && depth_flags.sample_count_supported(count)
        });

        if sample_count != requested_sample_count {
            log::warn!(
                "{}x MSAA is not supported for {:?}, using {}x",
                requested_sample_count,
                surface_format,
                sample_count
            );
        }

        Ok(Self {
            output_surface_config: RwLock::new(output_surface_config),
            frame_uniform: FrameUniform::new(device),
            sample_count,
        })
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        match self.output_surface_config.read() {
            Ok(config) => config.format,
            Err(poisoned) => poisoned.into_inner().format,
        }
    }
}

/// Largest supported power-of-two sample count not above `requested`.
pub fn pick_sample_count(requested: u32, supported: impl Fn(u32) -> bool) -> u32 {
    [16, 8, 4, 2]
        .into_iter()
        .find(|&count| count <= requested && supported(count))
        .unwrap_or(1)
}
