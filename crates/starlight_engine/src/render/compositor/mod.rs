//! Light compositor
//!
//! Once per displayed frame the compositor picks the frame's lights from
//! the registry, packs them into the data texture and draws one full-screen
//! composite over the finished frame, optionally preceded by the normal-map
//! passes and followed by bloom.
//!
//! Setup and per-frame failures never reach the host. A failing main
//! program disables the compositor for the rest of the session; failures in
//! the normal-map passes or bloom chain disable just that stage.

pub mod aux_passes;
pub mod bloom;
pub mod packing;
pub mod selection;

use log::{debug, error, info, trace, warn};

use crate::core::config::LightingConfig;
use crate::lighting::{LightRegistry, SceneQuery};
use crate::render::backend::{
    BackendCapabilities, BackendResult, ProgramHandle, ProgramKind, RenderBackend, RenderTargetBinding,
    TextureHandle, TextureSource, UniformValue,
};
use crate::render::sprite::SurfaceSprite;
use crate::render::viewport::Viewport;

pub use aux_passes::{AuxPasses, AuxStats};
pub use bloom::BloomPipeline;
pub use packing::{pack_lights, BatchNormalization, ChannelRange, LightRecord, PackedBatch, PackingParams, RECORD_LEN};
pub use selection::{select_lights, Selection, SelectionLimits, HARD_CAPACITY};

/// Texture slots read by the composite program
pub mod slots {
    /// Copy of the screen
    pub const SCREEN: u32 = 0;
    /// Foreground layer
    pub const FOREGROUND: u32 = 1;
    /// Packed light data
    pub const DATA: u32 = 2;
    /// Screen-space normals
    pub const NORMAL: u32 = 3;
    /// Surface maps
    pub const SURFACE: u32 = 4;
}

/// A loaded program and whether it has passed validation
#[derive(Debug, Clone, Copy)]
pub struct ProgramSlot {
    handle: ProgramHandle,
    kind: ProgramKind,
    validated: bool,
}

impl ProgramSlot {
    /// Load `kind`
    pub fn load(backend: &mut dyn RenderBackend, kind: ProgramKind) -> BackendResult<Self> {
        let handle = backend.load_program(kind)?;
        debug!("Loaded {} program", kind.name());
        Ok(Self {
            handle,
            kind,
            validated: false,
        })
    }

    /// Backend handle
    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    /// Program kind
    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    /// Validate once, or on every call when `every_frame` is set
    pub fn validate(&mut self, backend: &mut dyn RenderBackend, every_frame: bool) -> BackendResult<()> {
        if self.validated {
            return Ok(());
        }
        backend.validate_program(self.handle)?;
        self.validated = !every_frame;
        Ok(())
    }
}

/// What happened in one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// The composite was drawn
    pub composited: bool,
    /// Lights composited
    pub lights: usize,
    /// Of which line lights
    pub line_lights: usize,
    /// Registry lights looked at during selection
    pub considered: usize,
    /// Sprites drawn by the normal pass
    pub normal_sprites: usize,
    /// Sprites drawn by the surface pass
    pub surface_sprites: usize,
    /// The composite went through the bloom chain
    pub bloomed: bool,
}

#[derive(Debug)]
struct ActivePipeline {
    main: ProgramSlot,
    data_texture: TextureHandle,
    aux: Option<AuxPasses>,
    bloom: Option<BloomPipeline>,
}

impl ActivePipeline {
    fn create(backend: &mut dyn RenderBackend, config: &LightingConfig) -> Option<Self> {
        let capabilities = backend.capabilities();
        let required = BackendCapabilities::SHADERS | BackendCapabilities::FLOAT_TEXTURES;
        if !capabilities.contains(required) {
            warn!("Lighting disabled: backend lacks shader or float texture support");
            return None;
        }

        let aux = if config.enable_normal_maps {
            create_aux(backend, capabilities)
        } else {
            None
        };

        let main_kind = if aux.is_some() {
            ProgramKind::LightsNormal
        } else {
            ProgramKind::Lights
        };
        let main = match ProgramSlot::load(backend, main_kind) {
            Ok(main) => main,
            Err(e) => {
                error!("Lighting shader failed to load, lighting disabled: {e}");
                if let Some(aux) = aux {
                    aux.destroy(backend);
                }
                return None;
            }
        };

        let data_texture = match backend.create_data_texture(HARD_CAPACITY * RECORD_LEN) {
            Ok(texture) => texture,
            Err(e) => {
                error!("Light data texture unavailable, lighting disabled: {e}");
                backend.destroy_program(main.handle());
                if let Some(aux) = aux {
                    aux.destroy(backend);
                }
                return None;
            }
        };

        let bloom = if config.enable_bloom {
            create_bloom(backend, config)
        } else {
            None
        };

        let pipeline = Self {
            main,
            data_texture,
            aux,
            bloom,
        };
        pipeline.set_main_uniforms(backend, config);
        Some(pipeline)
    }

    fn set_main_uniforms(&self, backend: &mut dyn RenderBackend, config: &LightingConfig) {
        let program = self.main.handle();
        let (width, height) = backend.target_size();
        let aspect = width as f32 / height.max(1) as f32;
        let hdr = if self.bloom.is_some() {
            1.0 / bloom::HDR_RANGE
        } else {
            1.0
        };

        backend.set_uniform(program, "tex", UniformValue::Int(slots::SCREEN as i32));
        backend.set_uniform(program, "buf", UniformValue::Int(slots::FOREGROUND as i32));
        backend.set_uniform(program, "data", UniformValue::Int(slots::DATA as i32));
        backend.set_uniform(program, "trans", UniformValue::Float(aspect));
        backend.set_uniform(program, "hdr", UniformValue::Float(hdr));
        backend.set_uniform(program, "specmult", UniformValue::Float(config.specular_intensity));
        if self.aux.is_some() {
            backend.set_uniform(program, "normal", UniformValue::Int(slots::NORMAL as i32));
            backend.set_uniform(program, "surface", UniformValue::Int(slots::SURFACE as i32));
            backend.set_uniform(program, "spechard", UniformValue::Float(config.specular_hardness));
        }
    }

    fn bind_inputs(&self, backend: &mut dyn RenderBackend) {
        backend.bind_texture(slots::SCREEN, TextureSource::Screen);
        backend.bind_texture(slots::FOREGROUND, TextureSource::Foreground);
        backend.bind_texture(slots::DATA, TextureSource::Data(self.data_texture));
        if let Some(aux) = &self.aux {
            backend.bind_texture(slots::NORMAL, TextureSource::Target(aux.normal_target()));
            backend.bind_texture(slots::SURFACE, TextureSource::Auxiliary);
        }
    }

    /// Tear down the normal-map passes and switch to the plain composite
    fn drop_normals(&mut self, backend: &mut dyn RenderBackend, config: &LightingConfig) -> BackendResult<()> {
        if let Some(aux) = self.aux.take() {
            aux.destroy(backend);
        }
        let plain = ProgramSlot::load(backend, ProgramKind::Lights)?;
        backend.destroy_program(self.main.handle());
        self.main = plain;
        self.set_main_uniforms(backend, config);
        Ok(())
    }

    fn drop_bloom(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(bloom) = self.bloom.take() {
            bloom.destroy(backend);
        }
        backend.set_uniform(self.main.handle(), "hdr", UniformValue::Float(1.0));
    }

    /// Draw one frame. An error is fatal to the whole compositor.
    fn render(
        &mut self,
        backend: &mut dyn RenderBackend,
        frame: &FrameInputs<'_>,
        config: &LightingConfig,
    ) -> BackendResult<FrameStats> {
        let mut stats = FrameStats::default();

        if let Some(aux) = self.aux.as_mut() {
            match aux.run(backend, frame.sprites, frame.viewport, config) {
                Ok(aux_stats) => {
                    stats.normal_sprites = aux_stats.normal_sprites;
                    stats.surface_sprites = aux_stats.surface_sprites;
                }
                Err(e) => {
                    error!("Normal mapping disabled: {e}");
                    backend.bind_render_target(RenderTargetBinding::Screen);
                    self.drop_normals(backend, config)?;
                }
            }
        }

        let selection = select_lights(frame.registry, frame.scene, frame.viewport, &SelectionLimits::from(config));
        let batch = pack_lights(
            selection.lights.iter().copied(),
            frame.scene,
            frame.viewport,
            &PackingParams::from(config),
        );
        stats.lights = batch.len();
        stats.line_lights = selection.line_lights;
        stats.considered = selection.considered;

        backend.upload_data(self.data_texture, batch.as_floats())?;

        let program = self.main.handle();
        let norm = batch.normalization();
        let count = i32::try_from(batch.len()).unwrap_or(i32::MAX);
        backend.set_uniform(program, "size", UniformValue::Int(count));
        backend.set_uniform(program, "norm1", UniformValue::Vec4(norm.norm1()));
        backend.set_uniform(program, "norm2", UniformValue::Vec4(norm.norm2()));
        backend.set_uniform(program, "norm3", UniformValue::Vec4(norm.norm3()));
        self.bind_inputs(backend);

        self.main.validate(backend, config.validate_every_frame)?;

        if let Some(bloom) = self.bloom.as_mut() {
            match bloom.run(backend, &self.main, config.validate_every_frame) {
                Ok(()) => {
                    stats.bloomed = true;
                    stats.composited = true;
                    return Ok(stats);
                }
                Err(e) => {
                    error!("Bloom disabled: {e}");
                    self.drop_bloom(backend);
                    self.bind_inputs(backend);
                }
            }
        }

        backend.bind_render_target(RenderTargetBinding::Screen);
        backend.draw_fullscreen(program, 1.0)?;
        stats.composited = true;
        Ok(stats)
    }

    fn destroy(self, backend: &mut dyn RenderBackend) {
        if let Some(bloom) = self.bloom {
            bloom.destroy(backend);
        }
        if let Some(aux) = self.aux {
            aux.destroy(backend);
        }
        backend.destroy_texture(self.data_texture);
        backend.destroy_program(self.main.handle());
    }
}

fn create_aux(backend: &mut dyn RenderBackend, capabilities: BackendCapabilities) -> Option<AuxPasses> {
    if !capabilities.contains(BackendCapabilities::FRAMEBUFFERS | BackendCapabilities::STENCIL) {
        warn!("Normal mapping disabled: backend lacks framebuffer or stencil support");
        return None;
    }
    match AuxPasses::new(backend) {
        Ok(aux) => Some(aux),
        Err(e) => {
            error!("Normal mapping disabled: {e}");
            None
        }
    }
}

fn create_bloom(backend: &mut dyn RenderBackend, config: &LightingConfig) -> Option<BloomPipeline> {
    if let Some(reason) = bloom::unsupported_reason(backend) {
        warn!("Bloom disabled: {reason}");
        return None;
    }
    match BloomPipeline::new(backend, config) {
        Ok(bloom) => Some(bloom),
        Err(e) => {
            error!("Bloom disabled: {e}");
            None
        }
    }
}

struct FrameInputs<'a> {
    registry: &'a LightRegistry,
    scene: &'a dyn SceneQuery,
    viewport: &'a Viewport,
    sprites: &'a [SurfaceSprite],
}

/// Draws the light registry over each finished frame
///
/// # Usage
///
/// ```
/// use starlight_engine::core::LightingConfig;
/// use starlight_engine::lighting::{EmptyScene, Light, LightRegistry};
/// use starlight_engine::foundation::math::Vec2;
/// use starlight_engine::render::{LightCompositor, RecordingBackend, Viewport};
///
/// let mut backend = RecordingBackend::new(800, 600);
/// let mut compositor = LightCompositor::new(&LightingConfig::default(), &mut backend);
///
/// let mut registry = LightRegistry::new();
/// registry.insert(Light::point(Vec2::new(400.0, 300.0)).with_size(100.0).with_intensity(1.0));
///
/// let viewport = Viewport::centered(Vec2::new(400.0, 300.0), Vec2::new(800.0, 600.0), 1.0);
/// let stats = compositor.render_frame(&mut backend, &registry, &EmptyScene, &viewport, &[]);
/// assert_eq!(stats.lights, 1);
/// ```
#[derive(Debug)]
pub struct LightCompositor {
    config: LightingConfig,
    pipeline: Option<ActivePipeline>,
}

impl LightCompositor {
    /// Set up programs and targets on `backend`.
    ///
    /// Never fails: anything that can't be set up is disabled and logged.
    pub fn new(config: &LightingConfig, backend: &mut dyn RenderBackend) -> Self {
        let config = config.sanitized();
        let pipeline = if config.enable_lights {
            let (width, height) = backend.target_size();
            info!(
                "Instantiating light compositor ({width}x{height}, {} lights, bloom {}, normal maps {})",
                config.max_lights.min(HARD_CAPACITY),
                config.enable_bloom,
                config.enable_normal_maps
            );
            ActivePipeline::create(backend, &config)
        } else {
            info!("Lighting disabled in configuration");
            None
        };
        Self { config, pipeline }
    }

    /// Whether frames are being composited
    pub fn is_enabled(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Whether the bloom chain is live
    pub fn bloom_enabled(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|pipeline| pipeline.bloom.is_some())
    }

    /// Whether the normal-map passes are live
    pub fn normal_maps_enabled(&self) -> bool {
        self.pipeline.as_ref().is_some_and(|pipeline| pipeline.aux.is_some())
    }

    /// Configuration in effect
    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    /// Composite `registry` over the current frame
    pub fn render_frame(
        &mut self,
        backend: &mut dyn RenderBackend,
        registry: &LightRegistry,
        scene: &dyn SceneQuery,
        viewport: &Viewport,
        sprites: &[SurfaceSprite],
    ) -> FrameStats {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return FrameStats::default();
        };
        if backend.foreground_is_empty() {
            trace!("Foreground empty, skipping lighting");
            return FrameStats::default();
        }

        let frame = FrameInputs {
            registry,
            scene,
            viewport,
            sprites,
        };
        match pipeline.render(backend, &frame, &self.config) {
            Ok(stats) => stats,
            Err(e) => {
                error!("Lighting disabled: {e}");
                backend.bind_render_target(RenderTargetBinding::Screen);
                self.destroy(backend);
                FrameStats::default()
            }
        }
    }

    /// Release every backend resource and stop compositing
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.destroy(backend);
            debug!("Light compositor resources released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec2, Vec3};
    use crate::lighting::{EmptyScene, Light};
    use crate::render::backend::StencilMode;
    use crate::render::recording::{BackendCommand, RecordingBackend};

    fn view() -> Viewport {
        Viewport::centered(Vec2::zeros(), Vec2::new(800.0, 600.0), 1.0)
    }

    fn lit_registry() -> LightRegistry {
        let mut registry = LightRegistry::new();
        registry.insert(Light::point(Vec2::zeros()).with_size(100.0).with_intensity(1.0));
        registry.insert(Light::line(Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0)).with_size(20.0).with_intensity(2.0));
        registry.insert(Light::directional(Vec3::new(0.0, 0.0, -1.0)).with_intensity(0.5));
        registry
    }

    fn plain_config() -> LightingConfig {
        LightingConfig::default().with_bloom(false)
    }

    #[test]
    fn test_direct_composite() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut compositor = LightCompositor::new(&plain_config(), &mut backend);
        assert!(compositor.is_enabled());
        assert!(!compositor.bloom_enabled());

        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(stats.composited);
        assert_eq!(stats.lights, 3);
        assert_eq!(stats.line_lights, 1);
        assert_eq!(backend.last_upload().len(), 3 * RECORD_LEN);
        assert_eq!(backend.fullscreen_draws(), vec![(ProgramKind::Lights, 1.0)]);

        let main = backend.program_of(ProgramKind::Lights).unwrap();
        assert_eq!(backend.uniform(main, "size"), Some(UniformValue::Int(3)));
        assert_eq!(backend.uniform(main, "hdr"), Some(UniformValue::Float(1.0)));
        assert_eq!(backend.uniform(main, "trans"), Some(UniformValue::Float(800.0 / 600.0)));
    }

    #[test]
    fn test_empty_registry_still_composites() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut compositor = LightCompositor::new(&plain_config(), &mut backend);
        let stats = compositor.render_frame(&mut backend, &LightRegistry::new(), &EmptyScene, &view(), &[]);
        assert!(stats.composited);
        assert_eq!(stats.lights, 0);

        let main = backend.program_of(ProgramKind::Lights).unwrap();
        assert_eq!(backend.uniform(main, "size"), Some(UniformValue::Int(0)));
        assert_eq!(backend.uniform(main, "norm1"), Some(UniformValue::Vec4([0.0; 4])));
    }

    #[test]
    fn test_empty_foreground_skips_frame() {
        let mut backend = RecordingBackend::new(800, 600);
        let mut compositor = LightCompositor::new(&plain_config(), &mut backend);
        backend.set_foreground_empty(true);
        backend.clear_commands();

        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert_eq!(stats, FrameStats::default());
        assert!(backend.commands().is_empty());
        assert!(compositor.is_enabled());
    }

    #[test]
    fn test_disabled_by_config() {
        let mut backend = RecordingBackend::new(800, 600);
        let config = LightingConfig {
            enable_lights: false,
            ..LightingConfig::default()
        };
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(!compositor.is_enabled());
        assert_eq!(backend.live_resources(), 0);
        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(!stats.composited);
    }

    #[test]
    fn test_missing_shader_support_disables() {
        let mut backend = RecordingBackend::new(800, 600).with_capabilities(BackendCapabilities::FRAMEBUFFERS);
        let compositor = LightCompositor::new(&LightingConfig::default(), &mut backend);
        assert!(!compositor.is_enabled());
    }

    #[test]
    fn test_main_load_failure_disables_and_releases() {
        let mut backend = RecordingBackend::new(800, 600).failing_load(ProgramKind::LightsNormal);
        let config = LightingConfig::default().with_normal_maps(true);
        let compositor = LightCompositor::new(&config, &mut backend);
        assert!(!compositor.is_enabled());
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn test_main_validation_failure_disables_permanently() {
        let mut backend = RecordingBackend::new(800, 600).failing_validation(ProgramKind::Lights);
        let mut compositor = LightCompositor::new(&plain_config(), &mut backend);
        assert!(compositor.is_enabled());

        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(!stats.composited);
        assert!(!compositor.is_enabled());
        assert_eq!(backend.live_resources(), 0);

        backend.set_validation_failure(ProgramKind::Lights, false);
        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(!stats.composited);
    }

    #[test]
    fn test_validation_runs_once_unless_configured() {
        let count_validations = |backend: &RecordingBackend| {
            backend
                .commands()
                .iter()
                .filter(|command| matches!(command, BackendCommand::ValidateProgram(_)))
                .count()
        };

        let mut backend = RecordingBackend::new(800, 600);
        let mut compositor = LightCompositor::new(&plain_config(), &mut backend);
        for _ in 0..3 {
            compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        }
        assert_eq!(count_validations(&backend), 1);

        let mut backend = RecordingBackend::new(800, 600);
        let mut compositor = LightCompositor::new(&plain_config().with_validate_every_frame(true), &mut backend);
        for _ in 0..3 {
            compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        }
        assert_eq!(count_validations(&backend), 3);
    }

    #[test]
    fn test_bloom_pass_order() {
        let mut backend = RecordingBackend::new(800, 600);
        let config = LightingConfig::default().with_bloom_quality(3, 2);
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(compositor.bloom_enabled());
        let main = backend.program_of(ProgramKind::Lights).unwrap();
        assert_eq!(backend.uniform(main, "hdr"), Some(UniformValue::Float(1.0 / 16.0)));
        backend.clear_commands();

        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(stats.bloomed);
        assert_eq!(
            backend.fullscreen_draws(),
            vec![
                (ProgramKind::Lights, 1.0),
                (ProgramKind::BloomExtract { taps: 9 }, 0.5),
                (ProgramKind::BloomBlur { taps: 9 }, 0.5),
                (ProgramKind::BloomCombine, 1.0),
            ]
        );

        let copy = backend
            .commands()
            .iter()
            .position(|command| *command == BackendCommand::CopyScreen)
            .unwrap();
        let first_draw = backend
            .commands()
            .iter()
            .position(|command| matches!(command, BackendCommand::DrawFullscreen { .. }))
            .unwrap();
        assert!(copy < first_draw);

        let last_bind = backend
            .commands()
            .iter()
            .rev()
            .find(|command| matches!(command, BackendCommand::BindRenderTarget(_)))
            .unwrap();
        assert_eq!(*last_bind, BackendCommand::BindRenderTarget(RenderTargetBinding::Screen));
    }

    #[test]
    fn test_bloom_disabled_on_intel() {
        let mut backend = RecordingBackend::new(800, 600).with_vendor("Intel");
        let compositor = LightCompositor::new(&LightingConfig::default(), &mut backend);
        assert!(compositor.is_enabled());
        assert!(!compositor.bloom_enabled());
    }

    #[test]
    fn test_bloom_validation_failure_falls_back_to_direct() {
        let config = LightingConfig::default();
        let taps = config.bloom_taps();
        let mut backend = RecordingBackend::new(800, 600).failing_validation(ProgramKind::BloomBlur { taps });
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(compositor.bloom_enabled());
        backend.clear_commands();

        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert!(stats.composited);
        assert!(!stats.bloomed);
        assert!(compositor.is_enabled());
        assert!(!compositor.bloom_enabled());

        let draws = backend.fullscreen_draws();
        assert_eq!(draws.last(), Some(&(ProgramKind::Lights, 1.0)));
        let main = backend.program_of(ProgramKind::Lights).unwrap();
        assert_eq!(backend.uniform(main, "hdr"), Some(UniformValue::Float(1.0)));

        backend.clear_commands();
        compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &[]);
        assert_eq!(backend.fullscreen_draws(), vec![(ProgramKind::Lights, 1.0)]);
    }

    #[test]
    fn test_normal_maps_bind_extra_slots() {
        let mut backend = RecordingBackend::new(800, 600);
        let config = plain_config().with_normal_maps(true);
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(compositor.normal_maps_enabled());
        backend.clear_commands();

        let sprites = [SurfaceSprite::new(Vec2::zeros(), 50.0).with_normal_map(1.0).with_surface_map()];
        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &sprites);
        assert_eq!(stats.normal_sprites, 1);
        assert_eq!(stats.surface_sprites, 1);
        assert!(backend
            .commands()
            .iter()
            .any(|command| *command == BackendCommand::BindTexture { slot: slots::SURFACE, source: TextureSource::Auxiliary }));
        assert_eq!(backend.fullscreen_draws(), vec![(ProgramKind::LightsNormal, 1.0)]);
    }

    #[test]
    fn test_normal_validation_failure_drops_normals_only() {
        let mut backend = RecordingBackend::new(800, 600).failing_validation(ProgramKind::NormalTransform);
        let config = plain_config().with_normal_maps(true);
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(compositor.normal_maps_enabled());

        let sprites = [SurfaceSprite::new(Vec2::zeros(), 50.0).with_custom_bounds()];
        let stats = compositor.render_frame(&mut backend, &lit_registry(), &EmptyScene, &view(), &sprites);
        assert!(stats.composited);
        assert!(compositor.is_enabled());
        assert!(!compositor.normal_maps_enabled());
        assert_eq!(backend.fullscreen_draws().last(), Some(&(ProgramKind::Lights, 1.0)));
        assert!(backend.program_of(ProgramKind::LightsNormal).is_none());
        assert!(!backend
            .commands()
            .iter()
            .any(|command| matches!(command, BackendCommand::SetStencil(StencilMode::Write { .. }))));
    }

    #[test]
    fn test_normals_need_stencil() {
        let mut backend = RecordingBackend::new(800, 600)
            .with_capabilities(BackendCapabilities::all() - BackendCapabilities::STENCIL);
        let compositor = LightCompositor::new(&plain_config().with_normal_maps(true), &mut backend);
        assert!(compositor.is_enabled());
        assert!(!compositor.normal_maps_enabled());
        assert!(backend.program_of(ProgramKind::Lights).is_some());
    }

    #[test]
    fn test_destroy_releases_everything() {
        let mut backend = RecordingBackend::new(800, 600);
        let config = LightingConfig::default().with_normal_maps(true);
        let mut compositor = LightCompositor::new(&config, &mut backend);
        assert!(backend.live_resources() > 0);

        compositor.destroy(&mut backend);
        assert!(!compositor.is_enabled());
        assert_eq!(backend.live_resources(), 0);
    }
}
