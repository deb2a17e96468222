//! The scene pass and per-frame command encoding.
//!
//! A frame is one wgpu render pass. Colour is cleared to the background and
//! depth to the reverse-Z far value; the six logical passes are ordered inside
//! it by the draw list, each switching pipeline as it starts.

use crate::depth::DepthBuffer;

/// Attachments and clear values of the single per-frame render pass.
#[derive(Debug)]
pub struct ScenePass<'d> {
    clear_color: wgpu::Color,
    depth_view: &'d wgpu::TextureView,
    label: &'static str,
}

impl<'d> ScenePass<'d> {
    pub fn new(depth: &'d DepthBuffer, clear_color: wgpu::Color) -> Self {
        Self {
            clear_color,
            depth_view: &depth.view,
            label: "scene-pass",
        }
    }

    pub fn clear_color(&self) -> wgpu::Color {
        self.clear_color
    }

    /// Depth is always cleared to [`DepthBuffer::CLEAR_VALUE`]: nearer
    /// fragments write larger values.
    pub fn depth_clear(&self) -> f32 {
        DepthBuffer::CLEAR_VALUE
    }

    /// Begin the pass on `color_view`.
    pub fn record<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.depth_clear()),
                    // Nothing reads depth after the pass.
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        })
    }
}

/// Command encoder for one frame; presents its surface texture on submit.
pub struct FrameEncoder<'q> {
    encoder: Option<wgpu::CommandEncoder>,
    queue: &'q wgpu::Queue,
    surface_texture: Option<wgpu::SurfaceTexture>,
    surface_view: wgpu::TextureView,
}

impl<'q> FrameEncoder<'q> {
    pub fn new(
        device: &wgpu::Device,
        queue: &'q wgpu::Queue,
        surface_texture: wgpu::SurfaceTexture,
    ) -> Self {
        let encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame-encoder"),
        });
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            encoder: Some(encoder),
            queue,
            surface_texture: Some(surface_texture),
            surface_view,
        }
    }

    /// Begin `pass` on the surface. `None` once the frame has been submitted.
    pub fn begin<'a>(&'a mut self, pass: &ScenePass<'_>) -> Option<wgpu::RenderPass<'a>> {
        let encoder = self.encoder.as_mut()?;
        Some(pass.record(encoder, &self.surface_view))
    }

    /// Submit the recorded commands and present.
    pub fn submit(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if let (Some(encoder), Some(surface_texture)) =
            (self.encoder.take(), self.surface_texture.take())
        {
            self.queue.submit([encoder.finish()]);
            surface_texture.present();
        }
    }
}

impl Drop for FrameEncoder<'_> {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            log::warn!("FrameEncoder dropped without submit(), presenting anyway");
            self.finish();
        }
    }
}
