//! HDR bloom pipeline
//!
//! The main composite renders into a full-size HDR target. A bright-pass
//! with horizontal blur and a vertical blur then run at reduced size, and a
//! final pass adds the glow back over the HDR image onto the screen.

use crate::core::config::LightingConfig;
use crate::render::backend::{
    BackendCapabilities, BackendResult, ProgramKind, RenderBackend, RenderTargetBinding, RenderTargetDesc,
    RenderTargetHandle, TextureSource, UniformValue,
};
use crate::render::compositor::ProgramSlot;
use crate::render::RenderError;

/// HDR values are stored divided by this
pub const HDR_RANGE: f32 = 16.0;

/// Why bloom can't run on a backend, if it can't
pub fn unsupported_reason(backend: &dyn RenderBackend) -> Option<String> {
    let needed = BackendCapabilities::HDR_TARGETS | BackendCapabilities::FRAMEBUFFERS;
    if !backend.capabilities().contains(needed) {
        return Some("backend lacks HDR render targets".to_string());
    }
    if backend.vendor().contains("Intel") {
        return Some(format!("vendor '{}' is known not to support it", backend.vendor()));
    }
    None
}

/// Programs and targets of the bloom chain
#[derive(Debug)]
pub struct BloomPipeline {
    extract: ProgramSlot,
    blur: ProgramSlot,
    combine: ProgramSlot,
    hdr_target: RenderTargetHandle,
    extract_target: RenderTargetHandle,
    blur_target: RenderTargetHandle,
    divisor: f32,
}

impl BloomPipeline {
    /// Load the three bloom programs and create their targets.
    ///
    /// Everything created before a failure is released again.
    pub fn new(backend: &mut dyn RenderBackend, config: &LightingConfig) -> BackendResult<Self> {
        if let Some(reason) = unsupported_reason(backend) {
            return Err(RenderError::Unsupported(reason));
        }

        let taps = config.bloom_taps();
        let divisor = config.bloom_divisor();
        let (width, height) = backend.target_size();
        let (small_width, small_height) = ((width / divisor).max(1), (height / divisor).max(1));

        let kinds = [
            ProgramKind::BloomExtract { taps },
            ProgramKind::BloomBlur { taps },
            ProgramKind::BloomCombine,
        ];
        let descs = [
            (width, height, "bloom hdr"),
            (small_width, small_height, "bloom extract"),
            (small_width, small_height, "bloom blur"),
        ]
        .map(|(width, height, label)| RenderTargetDesc {
            width,
            height,
            hdr: true,
            label,
        });

        let mut programs = Vec::with_capacity(kinds.len());
        let mut targets = Vec::with_capacity(descs.len());
        if let Err(e) = create_resources(backend, &kinds, &descs, &mut programs, &mut targets) {
            for program in &programs {
                backend.destroy_program(program.handle());
            }
            for &target in &targets {
                backend.destroy_render_target(target);
            }
            return Err(e);
        }

        let pipeline = Self {
            extract: programs[0],
            blur: programs[1],
            combine: programs[2],
            hdr_target: targets[0],
            extract_target: targets[1],
            blur_target: targets[2],
            divisor: divisor as f32,
        };
        pipeline.set_static_uniforms(backend, config);
        Ok(pipeline)
    }

    fn set_static_uniforms(&self, backend: &mut dyn RenderBackend, config: &LightingConfig) {
        let (width, height) = backend.target_size();
        let (visible_u, visible_v) = backend.visible_uv();

        let extract = self.extract.handle();
        backend.set_uniform(extract, "tex", UniformValue::Int(0));
        backend.set_uniform(extract, "screen", UniformValue::Vec2([width as f32 / self.divisor, visible_u]));
        backend.set_uniform(extract, "hdr", UniformValue::Float(HDR_RANGE));
        backend.set_uniform(extract, "scale", UniformValue::Float(config.bloom_scale));

        let blur = self.blur.handle();
        backend.set_uniform(blur, "tex", UniformValue::Int(0));
        backend.set_uniform(blur, "screen", UniformValue::Vec2([height as f32 / self.divisor, visible_v]));
        backend.set_uniform(blur, "intensity", UniformValue::Float(config.bloom_intensity));
        backend.set_uniform(blur, "scale", UniformValue::Float(config.bloom_scale));

        let combine = self.combine.handle();
        backend.set_uniform(combine, "tex", UniformValue::Int(0));
        backend.set_uniform(combine, "glow", UniformValue::Int(1));
        backend.set_uniform(combine, "hdr", UniformValue::Float(HDR_RANGE));
    }

    /// Draw the main composite through the bloom chain onto the screen.
    ///
    /// The main program must already have its uniforms and textures bound.
    pub fn run(
        &mut self,
        backend: &mut dyn RenderBackend,
        main: &ProgramSlot,
        validate_every_frame: bool,
    ) -> BackendResult<()> {
        backend.copy_screen()?;

        backend.bind_render_target(RenderTargetBinding::Target(self.hdr_target));
        backend.clear_color();
        backend.draw_fullscreen(main.handle(), 1.0)?;

        let reduced = 1.0 / self.divisor;

        backend.bind_render_target(RenderTargetBinding::Target(self.extract_target));
        backend.clear_color();
        backend.bind_texture(0, TextureSource::Target(self.hdr_target));
        self.extract.validate(backend, validate_every_frame)?;
        backend.draw_fullscreen(self.extract.handle(), reduced)?;

        backend.bind_render_target(RenderTargetBinding::Target(self.blur_target));
        backend.clear_color();
        backend.bind_texture(0, TextureSource::Target(self.extract_target));
        self.blur.validate(backend, validate_every_frame)?;
        backend.draw_fullscreen(self.blur.handle(), reduced)?;

        backend.bind_render_target(RenderTargetBinding::Screen);
        backend.bind_texture(0, TextureSource::Target(self.hdr_target));
        backend.bind_texture(1, TextureSource::Target(self.blur_target));
        self.combine.validate(backend, validate_every_frame)?;
        backend.draw_fullscreen(self.combine.handle(), 1.0)
    }

    /// Release programs and targets
    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        for program in [self.extract, self.blur, self.combine] {
            backend.destroy_program(program.handle());
        }
        for target in [self.hdr_target, self.extract_target, self.blur_target] {
            backend.destroy_render_target(target);
        }
    }
}

fn create_resources(
    backend: &mut dyn RenderBackend,
    kinds: &[ProgramKind],
    descs: &[RenderTargetDesc],
    programs: &mut Vec<ProgramSlot>,
    targets: &mut Vec<RenderTargetHandle>,
) -> BackendResult<()> {
    for &kind in kinds {
        programs.push(ProgramSlot::load(backend, kind)?);
    }
    for &desc in descs {
        targets.push(backend.create_render_target(desc)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::{BackendCommand, RecordingBackend};

    #[test]
    fn test_unsupported_reasons() {
        let intel = RecordingBackend::new(64, 64).with_vendor("Intel Open Source Technology Center");
        assert!(unsupported_reason(&intel).is_some());

        let no_hdr = RecordingBackend::new(64, 64)
            .with_capabilities(BackendCapabilities::all() - BackendCapabilities::HDR_TARGETS);
        assert!(unsupported_reason(&no_hdr).is_some());

        assert!(unsupported_reason(&RecordingBackend::new(64, 64)).is_none());
    }

    #[test]
    fn test_target_sizes_follow_mips() {
        let mut backend = RecordingBackend::new(1024, 512);
        let config = LightingConfig::default().with_bloom_quality(2, 3);
        let pipeline = BloomPipeline::new(&mut backend, &config).unwrap();

        let extract = backend.render_target(pipeline.extract_target).unwrap();
        assert_eq!((extract.width, extract.height), (256, 128));
        let hdr = backend.render_target(pipeline.hdr_target).unwrap();
        assert_eq!((hdr.width, hdr.height), (1024, 512));
        assert!(backend.program_of(ProgramKind::BloomBlur { taps: 7 }).is_some());
    }

    #[test]
    fn test_partial_failure_releases_everything() {
        let mut backend = RecordingBackend::new(64, 64).failing_load(ProgramKind::BloomCombine);
        let result = BloomPipeline::new(&mut backend, &LightingConfig::default());
        assert!(matches!(result, Err(RenderError::InitializationFailed(_))));
        assert_eq!(backend.live_resources(), 0);
        assert!(backend
            .commands()
            .iter()
            .any(|command| matches!(command, BackendCommand::DestroyProgram(_))));
    }
}
