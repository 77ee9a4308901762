//! Normal-map and surface-map passes
//!
//! Both passes run before the main composite when normal mapping is on.
//! The normal pass rotates every visible sprite's normal map into screen
//! space in an offscreen target; the surface pass draws material maps into
//! the host's auxiliary buffer. Sprites with a custom silhouette are masked
//! by it through the stencil buffer so overlapping rectangles don't bleed.

use crate::core::config::LightingConfig;
use crate::render::backend::{
    BackendResult, ProgramHandle, ProgramKind, RenderBackend, RenderTargetBinding, RenderTargetDesc,
    RenderTargetHandle, SpriteLayer, StencilMode, UniformValue,
};
use crate::render::compositor::ProgramSlot;
use crate::render::sprite::SurfaceSprite;
use crate::render::viewport::Viewport;

/// Stencil value marking a sprite's silhouette
pub const STENCIL_REFERENCE: u8 = 16;

/// Sprites drawn by each pass in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuxStats {
    /// Sprites drawn into the normal target
    pub normal_sprites: usize,
    /// Sprites drawn into the auxiliary buffer
    pub surface_sprites: usize,
}

/// Resources and state of the auxiliary passes
#[derive(Debug)]
pub struct AuxPasses {
    program: ProgramSlot,
    target: RenderTargetHandle,
    last_data: Option<[f32; 4]>,
}

impl AuxPasses {
    /// Load the normal transform program and create the normal target
    pub fn new(backend: &mut dyn RenderBackend) -> BackendResult<Self> {
        let program = ProgramSlot::load(backend, ProgramKind::NormalTransform)?;
        let (width, height) = backend.target_size();
        let desc = RenderTargetDesc {
            width,
            height,
            hdr: false,
            label: "normal",
        };
        let target = match backend.create_render_target(desc) {
            Ok(target) => target,
            Err(e) => {
                backend.destroy_program(program.handle());
                return Err(e);
            }
        };
        backend.set_uniform(program.handle(), "tex", UniformValue::Int(0));

        Ok(Self {
            program,
            target,
            last_data: None,
        })
    }

    /// Target holding screen-space normals
    pub fn normal_target(&self) -> RenderTargetHandle {
        self.target
    }

    /// Run the normal pass then the surface pass.
    ///
    /// An error means the normal transform program failed validation; the
    /// caller should tear the passes down.
    pub fn run(
        &mut self,
        backend: &mut dyn RenderBackend,
        sprites: &[SurfaceSprite],
        viewport: &Viewport,
        config: &LightingConfig,
    ) -> BackendResult<AuxStats> {
        let normal_sprites = self.draw_normal_maps(backend, sprites, viewport, config)?;
        let surface_sprites = draw_surface_maps(backend, sprites, viewport, config)?;
        backend.bind_render_target(RenderTargetBinding::Screen);
        Ok(AuxStats {
            normal_sprites,
            surface_sprites,
        })
    }

    fn draw_normal_maps(
        &mut self,
        backend: &mut dyn RenderBackend,
        sprites: &[SurfaceSprite],
        viewport: &Viewport,
        config: &LightingConfig,
    ) -> BackendResult<usize> {
        backend.bind_render_target(RenderTargetBinding::Target(self.target));
        backend.clear_color();

        let program = self.program.handle();
        let mut drawn = 0;
        for sprite in sprites.iter().filter(|sprite| is_drawn(sprite, viewport, config)) {
            let data = sprite.transform_data(config.normal_flatness);
            if self.last_data != Some(data) {
                backend.set_uniform(program, "data", UniformValue::Vec4(data));
                self.last_data = Some(data);
            }
            self.program.validate(backend, config.validate_every_frame)?;

            draw_masked(backend, Some(program), sprite, SpriteLayer::NormalMap)?;
            drawn += 1;
        }
        Ok(drawn)
    }

    /// Release the program and target
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.destroy_program(self.program.handle());
        backend.destroy_render_target(self.target);
    }
}

fn draw_surface_maps(
    backend: &mut dyn RenderBackend,
    sprites: &[SurfaceSprite],
    viewport: &Viewport,
    config: &LightingConfig,
) -> BackendResult<usize> {
    backend.bind_render_target(RenderTargetBinding::Auxiliary);
    backend.clear_color();

    let mut drawn = 0;
    for sprite in sprites
        .iter()
        .filter(|sprite| sprite.has_surface_map && is_drawn(sprite, viewport, config))
    {
        draw_masked(backend, None, sprite, SpriteLayer::SurfaceMap)?;
        drawn += 1;
    }
    Ok(drawn)
}

fn is_drawn(sprite: &SurfaceSprite, viewport: &Viewport, config: &LightingConfig) -> bool {
    if sprite.do_not_render || (config.optimize_normals && sprite.hulk) {
        return false;
    }
    viewport.is_near(sprite.location, sprite.radius)
}

/// Draw `layer`, clipped to the sprite's silhouette when it has one
fn draw_masked(
    backend: &mut dyn RenderBackend,
    program: Option<ProgramHandle>,
    sprite: &SurfaceSprite,
    layer: SpriteLayer,
) -> BackendResult<()> {
    if !sprite.custom_bounds {
        return backend.draw_sprite(program, sprite, layer);
    }

    backend.set_stencil(StencilMode::Write {
        reference: STENCIL_REFERENCE,
    });
    let silhouette = backend.draw_sprite(None, sprite, SpriteLayer::Bounds);
    let result = silhouette.and_then(|()| {
        backend.set_stencil(StencilMode::Test {
            reference: STENCIL_REFERENCE,
        });
        backend.draw_sprite(program, sprite, layer)
    });
    backend.set_stencil(StencilMode::Disabled);
    result
}
