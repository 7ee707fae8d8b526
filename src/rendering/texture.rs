use wgpu::{util::DeviceExt, TextureDescriptor};

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Window-sized render attachment, recreated when the window size changes.
pub struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    label: String,
}

impl RenderTarget {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
        label: impl Into<String>,
    ) -> Self {
        let label: String = label.into();
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        RenderTarget {
            texture,
            view,
            label,
        }
    }

    pub fn depth(device: &wgpu::Device, width: u32, height: u32, sample_count: u32) -> Self {
        Self::new(device, width, height, DEPTH_FORMAT, sample_count, "Depth Texture")
    }

    /// Multisampled color buffer that is resolved into the surface texture.
    pub fn multisampled_color(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self::new(device, width, height, format, sample_count, "MSAA Color Texture")
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        let size = self.texture.size();
        if size.width == width && size.height == height {
            return;
        }

        *self = Self::new(
            device,
            width,
            height,
            self.texture.format(),
            self.texture.sample_count(),
            std::mem::take(&mut self.label),
        );
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

/// Uploads an RGBA8 image as an sRGB color texture.
pub fn create_color_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    width: u32,
    height: u32,
    rgba: &[u8],
) -> wgpu::Texture {
    device.create_texture_with_data(
        queue,
        &TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::wgt::TextureDataOrder::default(),
        rgba,
    )
}

/// 1x1 white texture for materials without a base color map.
pub fn create_white_texture(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
    create_color_texture(device, queue, "Default white texture", 1, 1, &[255; 4])
}
