//! Backend abstraction traits for the rendering system
//!
//! The compositor never talks to a GPU API directly. It drives a
//! [`RenderBackend`], which owns programs, textures and render targets and
//! exposes them through opaque handles.

use bitflags::bitflags;

use crate::render::sprite::SurfaceSprite;
use crate::render::RenderError;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, RenderError>;

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a 1-D float data texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Handle to an offscreen render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle(pub u64);

bitflags! {
    /// Features a backend supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BackendCapabilities: u32 {
        /// Programmable shaders
        const SHADERS = 1 << 0;
        /// Offscreen framebuffers
        const FRAMEBUFFERS = 1 << 1;
        /// Float-valued data textures
        const FLOAT_TEXTURES = 1 << 2;
        /// High dynamic range render targets
        const HDR_TARGETS = 1 << 3;
        /// Stencil buffer on render targets
        const STENCIL = 1 << 4;
    }
}

/// Programs the compositor loads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    /// Main composite without normal maps
    Lights,
    /// Main composite reading the normal and surface targets
    LightsNormal,
    /// Rotates sprite normal maps into screen space
    NormalTransform,
    /// First bloom pass: bright-pass extraction and horizontal blur
    BloomExtract {
        /// Blur taps (5, 7, 9, 11 or 13)
        taps: u32,
    },
    /// Second bloom pass: vertical blur
    BloomBlur {
        /// Blur taps (5, 7, 9, 11 or 13)
        taps: u32,
    },
    /// Final bloom pass: recombine glow with the HDR image
    BloomCombine,
}

impl ProgramKind {
    /// Vertex and fragment source file stems
    pub fn file_stems(self) -> (String, String) {
        match self {
            Self::Lights => ("lights".to_string(), "lights".to_string()),
            Self::LightsNormal => ("lightsnormal".to_string(), "lightsnormal".to_string()),
            Self::NormalTransform => ("2dtangent".to_string(), "2dtangent".to_string()),
            Self::BloomExtract { taps } => ("bloom1".to_string(), format!("bloom1-{taps}")),
            Self::BloomBlur { taps } => ("bloom2".to_string(), format!("bloom2-{taps}")),
            Self::BloomCombine => ("bloom3".to_string(), "bloom3".to_string()),
        }
    }

    /// Short name for logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Lights => "lights",
            Self::LightsNormal => "lights (normal mapped)",
            Self::NormalTransform => "normal transform",
            Self::BloomExtract { .. } => "bloom extract",
            Self::BloomBlur { .. } => "bloom blur",
            Self::BloomCombine => "bloom combine",
        }
    }
}

/// Offscreen render target description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTargetDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Floating-point color storage
    pub hdr: bool,
    /// Debug label
    pub label: &'static str,
}

/// Where draws land
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTargetBinding {
    /// The visible screen
    Screen,
    /// The host's auxiliary (surface map) buffer
    Auxiliary,
    /// A target created through the backend
    Target(RenderTargetHandle),
}

/// Image bound to a texture slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSource {
    /// Copy of the rendered screen
    Screen,
    /// Foreground layer (ships, projectiles) of the current frame
    Foreground,
    /// Host auxiliary buffer filled by the surface pass
    Auxiliary,
    /// Packed light data
    Data(TextureHandle),
    /// Color attachment of a render target
    Target(RenderTargetHandle),
}

/// Uniform values
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer or sampler slot
    Int(i32),
    /// Scalar
    Float(f32),
    /// Two-component vector
    Vec2([f32; 2]),
    /// Four-component vector
    Vec4([f32; 4]),
}

/// Stencil state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilMode {
    /// Stencil test off
    Disabled,
    /// Clear, then write `reference` wherever something is drawn
    Write {
        /// Value written
        reference: u8,
    },
    /// Only draw where the stencil equals `reference`; no writes
    Test {
        /// Value compared
        reference: u8,
    },
}

/// What a sprite draw renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteLayer {
    /// The sprite's normal map
    NormalMap,
    /// The sprite's surface (material) map
    SurfaceMap,
    /// The sprite's custom silhouette, for stencil masks
    Bounds,
}

/// Main rendering backend trait
///
/// Object safe so the compositor can drive any implementation through
/// `&mut dyn RenderBackend`.
pub trait RenderBackend {
    /// Supported features
    fn capabilities(&self) -> BackendCapabilities;

    /// Driver vendor string
    fn vendor(&self) -> &str;

    /// Size of the internal screen texture in pixels
    fn target_size(&self) -> (u32, u32);

    /// Fraction of the screen texture that is visible, per axis
    fn visible_uv(&self) -> (f32, f32) {
        (1.0, 1.0)
    }

    /// Load, compile and link a program
    fn load_program(&mut self, kind: ProgramKind) -> BackendResult<ProgramHandle>;

    /// Validate a program against the current state
    fn validate_program(&mut self, program: ProgramHandle) -> BackendResult<()>;

    /// Release a program
    fn destroy_program(&mut self, program: ProgramHandle);

    /// Create a data texture holding `len` floats
    fn create_data_texture(&mut self, len: usize) -> BackendResult<TextureHandle>;

    /// Overwrite the start of a data texture
    fn upload_data(&mut self, texture: TextureHandle, data: &[f32]) -> BackendResult<()>;

    /// Release a data texture
    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Create an offscreen render target
    fn create_render_target(&mut self, desc: RenderTargetDesc) -> BackendResult<RenderTargetHandle>;

    /// Release a render target
    fn destroy_render_target(&mut self, target: RenderTargetHandle);

    /// Direct subsequent draws
    fn bind_render_target(&mut self, binding: RenderTargetBinding);

    /// Clear the color of the bound target
    fn clear_color(&mut self);

    /// Bind an image to a texture slot
    fn bind_texture(&mut self, slot: u32, source: TextureSource);

    /// Set a named uniform on a program
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue);

    /// Draw a full-screen quad with `program`, scaled by `scale`
    fn draw_fullscreen(&mut self, program: ProgramHandle, scale: f32) -> BackendResult<()>;

    /// Copy the visible screen into the screen texture
    fn copy_screen(&mut self) -> BackendResult<()>;

    /// Draw one sprite layer, with `program` or the fixed pipeline
    fn draw_sprite(
        &mut self,
        program: Option<ProgramHandle>,
        sprite: &SurfaceSprite,
        layer: SpriteLayer,
    ) -> BackendResult<()>;

    /// Change the stencil state
    fn set_stencil(&mut self, mode: StencilMode);

    /// Whether this frame's foreground layer has nothing in it
    fn foreground_is_empty(&self) -> bool;
}
