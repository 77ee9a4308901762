//! Headless backend that records every command
//!
//! Used by the compositor tests and the benchmark binary. It tracks the
//! resources it hands out, so destroying a stale handle or drawing with an
//! unknown program shows up as an error, and it can be told to fail specific
//! program loads or validations.

use std::collections::{HashMap, HashSet};

use crate::render::backend::{
    BackendCapabilities, BackendResult, ProgramHandle, ProgramKind, RenderBackend, RenderTargetBinding,
    RenderTargetDesc, RenderTargetHandle, SpriteLayer, StencilMode, TextureHandle, TextureSource, UniformValue,
};
use crate::render::sprite::SurfaceSprite;
use crate::render::RenderError;

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// A program was loaded
    LoadProgram(ProgramKind, ProgramHandle),
    /// A program was validated (successfully or not)
    ValidateProgram(ProgramHandle),
    /// A program was released
    DestroyProgram(ProgramHandle),
    /// A data texture was created
    CreateDataTexture {
        /// New handle
        texture: TextureHandle,
        /// Capacity in floats
        len: usize,
    },
    /// Data was uploaded
    UploadData {
        /// Destination
        texture: TextureHandle,
        /// Floats written
        len: usize,
    },
    /// A data texture was released
    DestroyTexture(TextureHandle),
    /// A render target was created
    CreateRenderTarget(RenderTargetHandle, RenderTargetDesc),
    /// A render target was released
    DestroyRenderTarget(RenderTargetHandle),
    /// Draw destination changed
    BindRenderTarget(RenderTargetBinding),
    /// The bound target was cleared
    ClearColor,
    /// A texture slot was bound
    BindTexture {
        /// Slot index
        slot: u32,
        /// Bound image
        source: TextureSource,
    },
    /// A uniform was set
    SetUniform {
        /// Target program
        program: ProgramHandle,
        /// Uniform name
        name: String,
        /// Value
        value: UniformValue,
    },
    /// A full-screen quad was drawn
    DrawFullscreen {
        /// Program used
        program: ProgramHandle,
        /// Quad scale
        scale: f32,
    },
    /// The screen was copied into the screen texture
    CopyScreen,
    /// A sprite layer was drawn
    DrawSprite {
        /// Program, or `None` for the fixed pipeline
        program: Option<ProgramHandle>,
        /// Layer drawn
        layer: SpriteLayer,
        /// Sprite center
        location: [f32; 2],
    },
    /// Stencil state changed
    SetStencil(StencilMode),
}

/// Command-recording [`RenderBackend`]
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    capabilities: BackendCapabilities,
    vendor: String,
    target_size: (u32, u32),
    foreground_empty: bool,
    failing_loads: HashSet<ProgramKind>,
    failing_validations: HashSet<ProgramKind>,
    programs: HashMap<ProgramHandle, ProgramKind>,
    textures: HashMap<TextureHandle, usize>,
    targets: HashMap<RenderTargetHandle, RenderTargetDesc>,
    last_upload: Vec<f32>,
    commands: Vec<BackendCommand>,
    next_id: u64,
}

impl RecordingBackend {
    /// A fully capable backend with a `width` x `height` screen texture
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: BackendCapabilities::all(),
            vendor: "Starlight Recording".to_string(),
            target_size: (width, height),
            foreground_empty: false,
            failing_loads: HashSet::new(),
            failing_validations: HashSet::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            targets: HashMap::new(),
            last_upload: Vec::new(),
            commands: Vec::new(),
            next_id: 1,
        }
    }

    /// Advertise only `capabilities` (builder)
    pub fn with_capabilities(mut self, capabilities: BackendCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Report `vendor` as the driver vendor (builder)
    pub fn with_vendor(mut self, vendor: impl Into<String>) -> Self {
        self.vendor = vendor.into();
        self
    }

    /// Make every load of `kind` fail (builder)
    pub fn failing_load(mut self, kind: ProgramKind) -> Self {
        self.failing_loads.insert(kind);
        self
    }

    /// Make every validation of a `kind` program fail (builder)
    pub fn failing_validation(mut self, kind: ProgramKind) -> Self {
        self.failing_validations.insert(kind);
        self
    }

    /// Start or stop failing validations of `kind`
    pub fn set_validation_failure(&mut self, kind: ProgramKind, failing: bool) {
        if failing {
            self.failing_validations.insert(kind);
        } else {
            self.failing_validations.remove(&kind);
        }
    }

    /// Report the foreground layer as empty or not
    pub fn set_foreground_empty(&mut self, empty: bool) {
        self.foreground_empty = empty;
    }

    /// Everything recorded so far
    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    /// Forget recorded commands, keeping resources
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Kind of a live program
    pub fn program_kind(&self, program: ProgramHandle) -> Option<ProgramKind> {
        self.programs.get(&program).copied()
    }

    /// Handle of the live program of `kind`, if any
    pub fn program_of(&self, kind: ProgramKind) -> Option<ProgramHandle> {
        self.programs
            .iter()
            .find(|(_, program_kind)| **program_kind == kind)
            .map(|(&handle, _)| handle)
    }

    /// Number of live programs, textures and render targets
    pub fn live_resources(&self) -> usize {
        self.programs.len() + self.textures.len() + self.targets.len()
    }

    /// Description of a live render target
    pub fn render_target(&self, target: RenderTargetHandle) -> Option<RenderTargetDesc> {
        self.targets.get(&target).copied()
    }

    /// Floats written by the most recent upload
    pub fn last_upload(&self) -> &[f32] {
        &self.last_upload
    }

    /// Full-screen draws recorded so far, as (program kind, scale)
    pub fn fullscreen_draws(&self) -> Vec<(ProgramKind, f32)> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                BackendCommand::DrawFullscreen { program, scale } => {
                    self.program_kind(*program).map(|kind| (kind, *scale))
                }
                _ => None,
            })
            .collect()
    }

    /// Last value recorded for a uniform
    pub fn uniform(&self, program: ProgramHandle, name: &str) -> Option<UniformValue> {
        self.commands.iter().rev().find_map(|command| match command {
            BackendCommand::SetUniform { program: p, name: n, value } if *p == program && n == name => Some(*value),
            _ => None,
        })
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn known_program(&self, program: ProgramHandle) -> BackendResult<ProgramKind> {
        self.program_kind(program)
            .ok_or_else(|| RenderError::BackendError(format!("unknown program {}", program.0)))
    }
}

impl RenderBackend for RecordingBackend {
    fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    fn load_program(&mut self, kind: ProgramKind) -> BackendResult<ProgramHandle> {
        if self.failing_loads.contains(&kind) {
            return Err(RenderError::InitializationFailed(format!("{} failed to link", kind.name())));
        }
        let handle = ProgramHandle(self.allocate());
        self.programs.insert(handle, kind);
        self.commands.push(BackendCommand::LoadProgram(kind, handle));
        Ok(handle)
    }

    fn validate_program(&mut self, program: ProgramHandle) -> BackendResult<()> {
        let kind = self.known_program(program)?;
        self.commands.push(BackendCommand::ValidateProgram(program));
        if self.failing_validations.contains(&kind) {
            return Err(RenderError::ValidationFailed {
                program: kind.name().to_string(),
                log: "validation rejected".to_string(),
            });
        }
        Ok(())
    }

    fn destroy_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_some() {
            self.commands.push(BackendCommand::DestroyProgram(program));
        }
    }

    fn create_data_texture(&mut self, len: usize) -> BackendResult<TextureHandle> {
        if !self.capabilities.contains(BackendCapabilities::FLOAT_TEXTURES) {
            return Err(RenderError::Unsupported("float textures".to_string()));
        }
        let texture = TextureHandle(self.allocate());
        self.textures.insert(texture, len);
        self.commands.push(BackendCommand::CreateDataTexture { texture, len });
        Ok(texture)
    }

    fn upload_data(&mut self, texture: TextureHandle, data: &[f32]) -> BackendResult<()> {
        let capacity = *self
            .textures
            .get(&texture)
            .ok_or_else(|| RenderError::BackendError(format!("unknown texture {}", texture.0)))?;
        if data.len() > capacity {
            return Err(RenderError::BackendError(format!(
                "upload of {} floats exceeds texture capacity {}",
                data.len(),
                capacity
            )));
        }
        self.last_upload.clear();
        self.last_upload.extend_from_slice(data);
        self.commands.push(BackendCommand::UploadData { texture, len: data.len() });
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_some() {
            self.commands.push(BackendCommand::DestroyTexture(texture));
        }
    }

    fn create_render_target(&mut self, desc: RenderTargetDesc) -> BackendResult<RenderTargetHandle> {
        if !self.capabilities.contains(BackendCapabilities::FRAMEBUFFERS) {
            return Err(RenderError::Unsupported("framebuffers".to_string()));
        }
        if desc.hdr && !self.capabilities.contains(BackendCapabilities::HDR_TARGETS) {
            return Err(RenderError::Unsupported("HDR render targets".to_string()));
        }
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::ResourceCreationFailed(format!("{} target has zero size", desc.label)));
        }
        let target = RenderTargetHandle(self.allocate());
        self.targets.insert(target, desc);
        self.commands.push(BackendCommand::CreateRenderTarget(target, desc));
        Ok(target)
    }

    fn destroy_render_target(&mut self, target: RenderTargetHandle) {
        if self.targets.remove(&target).is_some() {
            self.commands.push(BackendCommand::DestroyRenderTarget(target));
        }
    }

    fn bind_render_target(&mut self, binding: RenderTargetBinding) {
        self.commands.push(BackendCommand::BindRenderTarget(binding));
    }

    fn clear_color(&mut self) {
        self.commands.push(BackendCommand::ClearColor);
    }

    fn bind_texture(&mut self, slot: u32, source: TextureSource) {
        self.commands.push(BackendCommand::BindTexture { slot, source });
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) {
        self.commands.push(BackendCommand::SetUniform {
            program,
            name: name.to_string(),
            value,
        });
    }

    fn draw_fullscreen(&mut self, program: ProgramHandle, scale: f32) -> BackendResult<()> {
        self.known_program(program)?;
        self.commands.push(BackendCommand::DrawFullscreen { program, scale });
        Ok(())
    }

    fn copy_screen(&mut self) -> BackendResult<()> {
        self.commands.push(BackendCommand::CopyScreen);
        Ok(())
    }

    fn draw_sprite(
        &mut self,
        program: Option<ProgramHandle>,
        sprite: &SurfaceSprite,
        layer: SpriteLayer,
    ) -> BackendResult<()> {
        if let Some(program) = program {
            self.known_program(program)?;
        }
        self.commands.push(BackendCommand::DrawSprite {
            program,
            layer,
            location: [sprite.location.x, sprite.location.y],
        });
        Ok(())
    }

    fn set_stencil(&mut self, mode: StencilMode) {
        self.commands.push(BackendCommand::SetStencil(mode));
    }

    fn foreground_is_empty(&self) -> bool {
        self.foreground_empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_lifecycle() {
        let mut backend = RecordingBackend::new(64, 64);
        let program = backend.load_program(ProgramKind::Lights).unwrap();
        assert_eq!(backend.program_kind(program), Some(ProgramKind::Lights));
        assert!(backend.validate_program(program).is_ok());

        backend.destroy_program(program);
        assert!(backend.draw_fullscreen(program, 1.0).is_err());
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn test_configured_failures() {
        let mut backend = RecordingBackend::new(64, 64)
            .failing_load(ProgramKind::BloomCombine)
            .failing_validation(ProgramKind::Lights);

        assert!(matches!(
            backend.load_program(ProgramKind::BloomCombine),
            Err(RenderError::InitializationFailed(_))
        ));
        let program = backend.load_program(ProgramKind::Lights).unwrap();
        assert!(matches!(
            backend.validate_program(program),
            Err(RenderError::ValidationFailed { .. })
        ));
    }

    #[test]
    fn test_upload_capacity() {
        let mut backend = RecordingBackend::new(64, 64);
        let texture = backend.create_data_texture(4).unwrap();
        assert!(backend.upload_data(texture, &[1.0, 2.0]).is_ok());
        assert_eq!(backend.last_upload(), &[1.0, 2.0]);
        assert!(backend.upload_data(texture, &[0.0; 5]).is_err());
    }

    #[test]
    fn test_hdr_target_needs_capability() {
        let mut backend =
            RecordingBackend::new(64, 64).with_capabilities(BackendCapabilities::all() - BackendCapabilities::HDR_TARGETS);
        let desc = RenderTargetDesc { width: 64, height: 64, hdr: true, label: "hdr" };
        assert!(matches!(backend.create_render_target(desc), Err(RenderError::Unsupported(_))));
        let plain = RenderTargetDesc { hdr: false, ..desc };
        assert!(backend.create_render_target(plain).is_ok());
    }
}
