use rein_pcss::gpu::{CommandExecutor, GpuShaderGlobals, WgpuTargetAllocator};
use rein_pcss::{
    FilterMode, FrameContext, HeadlessLight, LightEvent, PcssConfig, PcssLight, PixelFormat,
    QualitySettings, WgpuContext,
};

const SHADOW_MAP_SIZE: u32 = 2048;
const FRAMES: u32 = 4;

/// Stand-in for the host light's shadow map: a cleared depth texture.
fn create_shadow_map(ctx: &WgpuContext) -> wgpu::Texture {
    ctx.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("host shadow map"),
        size: wgpu::Extent3d {
            width: SHADOW_MAP_SIZE,
            height: SHADOW_MAP_SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    })
}

fn render_shadow_map(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("host shadow pass"),
        color_attachments: &[],
        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
            view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(0.5),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }),
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let ctx = WgpuContext::new_headless_blocking()?;
    let shadow_map = create_shadow_map(&ctx);
    let shadow_view = shadow_map.create_view(&wgpu::TextureViewDescriptor::default());

    let mut allocator = WgpuTargetAllocator::new(&ctx);
    let mut globals = GpuShaderGlobals::new(&ctx);
    let mut executor = CommandExecutor::new(&ctx);
    let quality = QualitySettings {
        shadow_distance: 80.0,
    };

    let config = PcssConfig {
        resolution: 3000,
        use_custom_resolution: true,
        ..Default::default()
    };
    let mut pcss = PcssLight::with_light(config, HeadlessLight::new());

    {
        let mut frame = FrameContext::new(&mut allocator, &mut globals).with_quality(quality);
        if !pcss.on_setup(&mut frame) {
            anyhow::bail!("PCSS light setup failed");
        }
    }

    for index in 0..FRAMES {
        match index {
            1 => pcss.config_mut().filter_mode = FilterMode::Point,
            2 => pcss.config_mut().pixel_format = PixelFormat::RHalf,
            _ => {}
        }

        {
            let mut frame = FrameContext::new(&mut allocator, &mut globals).with_quality(quality);
            pcss.on_update(&mut frame);
        }
        globals.flush(&ctx);

        let mut encoder = ctx.create_encoder(Some("pcss frame"));
        render_shadow_map(&mut encoder, &shadow_view);
        if let Some(light) = pcss.light() {
            for buffer in light.command_buffers(LightEvent::AfterShadowMap) {
                if let Err(err) = executor.execute(&mut encoder, buffer, &shadow_view, &allocator) {
                    log::error!("frame {index}: {err}");
                }
            }
        }
        ctx.submit([encoder.finish()]);

        log::info!(
            "frame {index}: target {:?}, keywords {:#x}",
            pcss.target().map(|t| (t.handle(), t.width(), t.descriptor().format)),
            globals.uniform().keywords
        );
    }

    {
        let mut frame = FrameContext::new(&mut allocator, &mut globals).with_quality(quality);
        pcss.on_destroy(&mut frame);
    }
    log::info!("live shadow targets after teardown: {}", allocator.live_count());

    Ok(())
}
