//! Light batch packing and normalization
//!
//! Each selected light becomes an 11-float [`LightRecord`]. Position, size,
//! intensity and height channels are rescaled against the batch's own
//! min/max before upload, and the [`BatchNormalization`] that undoes this is
//! sent alongside as three vec4 uniforms. The ranges are recomputed every
//! frame, since a frame of muzzle flashes and a frame with a capital-ship
//! explosion differ by orders of magnitude.

use bytemuck::{Pod, Zeroable};

use crate::core::config::LightingConfig;
use crate::lighting::{Light, LightKind, SceneQuery};
use crate::render::viewport::Viewport;

/// Floats per packed light
pub const RECORD_LEN: usize = 11;

/// Smallest range a channel is stretched over
pub const RANGE_FLOOR: f32 = 0.01;

/// Kind tags as read by the composite shader
pub mod tags {
    /// Point light
    pub const POINT: f32 = 0.0;
    /// Line light
    pub const LINE: f32 = 0.33;
    /// Cone light
    pub const CONE: f32 = 0.67;
    /// Directional light
    pub const DIRECTIONAL: f32 = 1.0;
}

/// One light as laid out in the data texture
///
/// Slot meaning depends on `tag`:
///
/// | kind        | x, y         | size     | s0            | s1         | height |
/// |-------------|--------------|----------|---------------|------------|--------|
/// | point       | center UV    | radius   | specular      | 0.5        | height |
/// | line        | endpoint 1   | radius   | endpoint 2 x  | endpoint 2 y | height |
/// | cone        | center UV    | radius   | arc start rad | arc end rad | height |
/// | directional | direction xy | specular | direction z   | 0.5        | 0      |
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
#[allow(missing_docs)]
pub struct LightRecord {
    pub x: f32,
    pub y: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub size: f32,
    pub intensity: f32,
    pub tag: f32,
    pub s0: f32,
    pub s1: f32,
    pub height: f32,
}

/// Scale and offset of one normalized channel
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelRange {
    /// Width of the range, never below [`RANGE_FLOOR`] for a live batch
    pub scale: f32,
    /// Lower bound
    pub offset: f32,
}

impl ChannelRange {
    /// Range covering `min..=max`
    pub fn from_bounds(min: f32, max: f32) -> Self {
        let span = max - min;
        Self {
            scale: if span.abs() < RANGE_FLOOR { RANGE_FLOOR } else { span },
            offset: min,
        }
    }

    /// Map a value into `0..=1`
    pub fn normalize(&self, value: f32) -> f32 {
        (value - self.offset) / self.scale
    }

    /// Map a normalized value back
    pub fn denormalize(&self, value: f32) -> f32 {
        value.mul_add(self.scale, self.offset)
    }

    /// Map a value that shares a zero origin with its range
    pub fn normalize_magnitude(&self, value: f32) -> f32 {
        value / self.scale
    }

    /// Undo [`normalize_magnitude`](Self::normalize_magnitude)
    pub fn denormalize_magnitude(&self, value: f32) -> f32 {
        value * self.scale
    }
}

/// Ranges needed to reconstruct a packed batch
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[allow(missing_docs)]
pub struct BatchNormalization {
    pub x: ChannelRange,
    pub y: ChannelRange,
    pub x2: ChannelRange,
    pub y2: ChannelRange,
    pub size: ChannelRange,
    pub intensity: ChannelRange,
    pub height: ChannelRange,
}

impl BatchNormalization {
    /// `(x.scale, x.offset, y.scale, y.offset)`
    pub fn norm1(&self) -> [f32; 4] {
        [self.x.scale, self.x.offset, self.y.scale, self.y.offset]
    }

    /// `(size.scale, intensity.scale, height.scale, height.offset)`
    pub fn norm2(&self) -> [f32; 4] {
        [self.size.scale, self.intensity.scale, self.height.scale, self.height.offset]
    }

    /// `(x2.scale, x2.offset, y2.scale, y2.offset)`
    pub fn norm3(&self) -> [f32; 4] {
        [self.x2.scale, self.x2.offset, self.y2.scale, self.y2.offset]
    }

    fn normalize(&self, raw: &LightRecord) -> LightRecord {
        LightRecord {
            x: self.x.normalize(raw.x),
            y: self.y.normalize(raw.y),
            size: self.size.normalize_magnitude(raw.size),
            intensity: self.intensity.normalize_magnitude(raw.intensity),
            s0: self.x2.normalize(raw.s0),
            s1: self.y2.normalize(raw.s1),
            height: self.height.normalize(raw.height),
            ..*raw
        }
    }

    /// Reconstruct the raw record from a normalized one
    pub fn denormalize(&self, packed: &LightRecord) -> LightRecord {
        LightRecord {
            x: self.x.denormalize(packed.x),
            y: self.y.denormalize(packed.y),
            size: self.size.denormalize_magnitude(packed.size),
            intensity: self.intensity.denormalize_magnitude(packed.intensity),
            s0: self.x2.denormalize(packed.s0),
            s1: self.y2.denormalize(packed.s1),
            height: self.height.denormalize(packed.height),
            ..*packed
        }
    }
}

/// Scalars applied while packing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackingParams {
    /// Multiplier on light sizes
    pub size_scale: f32,
    /// Multiplier on intensities
    pub intensity_scale: f32,
    /// Minimum height as a fraction of unscaled size
    pub light_depth: f32,
}

impl From<&LightingConfig> for PackingParams {
    fn from(config: &LightingConfig) -> Self {
        Self {
            size_scale: config.size_scale,
            intensity_scale: config.intensity_scale,
            light_depth: config.light_depth,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: f32,
    max: f32,
}

impl Bounds {
    fn at(value: f32) -> Self {
        Self { min: value, max: value }
    }

    fn include(&mut self, value: f32) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn range(self) -> ChannelRange {
        ChannelRange::from_bounds(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy)]
struct BatchBounds {
    x: Bounds,
    y: Bounds,
    x2: Bounds,
    y2: Bounds,
    height: Bounds,
    max_size: f32,
    max_intensity: f32,
}

impl BatchBounds {
    fn start(first: &LightRecord) -> Self {
        Self {
            x: Bounds::at(first.x),
            y: Bounds::at(first.y),
            x2: Bounds::at(first.s0),
            y2: Bounds::at(first.s1),
            height: Bounds::at(0.0),
            max_size: 0.0,
            max_intensity: 0.0,
        }
    }

    fn include(&mut self, record: &LightRecord, tracks_height: bool) {
        self.x.include(record.x);
        self.y.include(record.y);
        self.x2.include(record.s0);
        self.y2.include(record.s1);
        if tracks_height {
            self.height.include(record.height);
        }
        self.max_size = self.max_size.max(record.size);
        self.max_intensity = self.max_intensity.max(record.intensity);
    }

    fn normalization(self) -> BatchNormalization {
        BatchNormalization {
            x: self.x.range(),
            y: self.y.range(),
            x2: self.x2.range(),
            y2: self.y2.range(),
            size: ChannelRange::from_bounds(0.0, self.max_size),
            intensity: ChannelRange::from_bounds(0.0, self.max_intensity),
            height: self.height.range(),
        }
    }
}

/// Build the unnormalized record for one light
pub fn raw_record(light: &Light, scene: &dyn SceneQuery, viewport: &Viewport, params: &PackingParams) -> LightRecord {
    let color = light.color();
    let intensity = light.effective_intensity(scene);
    let mut record = LightRecord {
        r: color.x,
        g: color.y,
        b: color.z,
        intensity: (intensity * params.intensity_scale).max(0.0),
        ..LightRecord::default()
    };

    if light.kind() == LightKind::Directional {
        let direction = light.direction();
        record.x = direction.x;
        record.y = direction.y;
        record.size = (light.specular_intensity() * params.intensity_scale).max(0.0);
        record.tag = tags::DIRECTIONAL;
        record.s0 = direction.z;
        record.s1 = 0.5;
        return record;
    }

    let center = viewport.world_to_uv(light.location(scene));
    record.x = center.x;
    record.y = center.y;
    record.size = viewport.units_to_uv((light.size() * params.size_scale).max(0.0));
    record.height = viewport.units_to_uv(light.height().max(light.size() * params.light_depth));

    match light.kind() {
        LightKind::Point => {
            record.tag = tags::POINT;
            record.s0 = (light.specular_multiplier() * intensity * params.intensity_scale).max(0.0);
            record.s1 = 0.5;
        }
        LightKind::Line => {
            let end = viewport.world_to_uv(light.location2(scene));
            record.tag = tags::LINE;
            record.s0 = end.x;
            record.s1 = end.y;
        }
        LightKind::Cone => {
            record.tag = tags::CONE;
            record.s0 = light.arc_start().to_radians();
            record.s1 = light.arc_end().to_radians();
        }
        LightKind::Directional => {}
    }
    record
}

/// A frame's packed lights, ready for upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackedBatch {
    records: Vec<LightRecord>,
    normalization: BatchNormalization,
}

impl PackedBatch {
    /// Number of lights
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Normalized records
    pub fn records(&self) -> &[LightRecord] {
        &self.records
    }

    /// Ranges for the shader
    pub fn normalization(&self) -> &BatchNormalization {
        &self.normalization
    }

    /// Flat view for upload
    pub fn as_floats(&self) -> &[f32] {
        bytemuck::cast_slice(&self.records)
    }

    /// Raw record `index`, reconstructed from its normalized form
    pub fn unpack(&self, index: usize) -> Option<LightRecord> {
        self.records
            .get(index)
            .map(|record| self.normalization.denormalize(record))
    }
}

/// Pack `lights` in order.
///
/// An empty input yields an empty batch with all-zero ranges.
pub fn pack_lights<'a>(
    lights: impl IntoIterator<Item = &'a Light>,
    scene: &dyn SceneQuery,
    viewport: &Viewport,
    params: &PackingParams,
) -> PackedBatch {
    let mut raw = Vec::new();
    let mut bounds: Option<BatchBounds> = None;

    for light in lights {
        let record = raw_record(light, scene, viewport, params);
        let tracks_height = light.kind() != LightKind::Directional;
        bounds
            .get_or_insert_with(|| BatchBounds::start(&record))
            .include(&record, tracks_height);
        raw.push(record);
    }

    let Some(bounds) = bounds else {
        return PackedBatch::default();
    };

    let normalization = bounds.normalization();
    let records = raw.iter().map(|record| normalization.normalize(record)).collect();
    PackedBatch { records, normalization }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Vec2, Vec3};
    use crate::lighting::EmptyScene;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn view() -> Viewport {
        Viewport::new(Vec2::zeros(), Vec2::new(1000.0, 500.0), 1.0, Vec2::new(1000.0, 500.0))
    }

    fn params() -> PackingParams {
        PackingParams {
            size_scale: 1.0,
            intensity_scale: 1.0,
            light_depth: 0.2,
        }
    }

    #[test]
    fn test_record_is_eleven_floats() {
        assert_eq!(std::mem::size_of::<LightRecord>(), RECORD_LEN * std::mem::size_of::<f32>());
    }

    #[test]
    fn test_range_floor() {
        let flat = ChannelRange::from_bounds(3.0, 3.001);
        assert_relative_eq!(flat.scale, RANGE_FLOOR);
        assert_relative_eq!(flat.offset, 3.0);

        let wide = ChannelRange::from_bounds(-2.0, 6.0);
        assert_relative_eq!(wide.scale, 8.0);
        assert_relative_eq!(wide.normalize(2.0), 0.5);
    }

    #[test]
    fn test_empty_batch_is_zeroed() {
        let batch = pack_lights(std::iter::empty(), &EmptyScene, &view(), &params());
        assert!(batch.is_empty());
        assert_eq!(batch.normalization().norm1(), [0.0; 4]);
        assert_eq!(batch.normalization().norm2(), [0.0; 4]);
        assert_eq!(batch.normalization().norm3(), [0.0; 4]);
    }

    #[test]
    fn test_point_record_layout() {
        let mut light = Light::point(Vec2::new(500.0, 250.0)).with_size(100.0).with_intensity(2.0);
        light.set_specular_multiplier(0.5);
        let record = raw_record(&light, &EmptyScene, &view(), &params());

        assert_relative_eq!(record.x, 0.5);
        assert_relative_eq!(record.y, 0.5);
        assert_relative_eq!(record.size, 0.2);
        assert_relative_eq!(record.intensity, 2.0);
        assert_eq!(record.tag, tags::POINT);
        assert_relative_eq!(record.s0, 1.0);
        assert_relative_eq!(record.s1, 0.5);
        // default height of 200 beats 100 * 0.2
        assert_relative_eq!(record.height, 0.4);
    }

    #[test]
    fn test_cone_and_line_secondary_slots() {
        let cone = Light::cone(Vec2::zeros(), 90.0, 180.0).with_size(10.0);
        let record = raw_record(&cone, &EmptyScene, &view(), &params());
        assert_eq!(record.tag, tags::CONE);
        assert_relative_eq!(record.s0, std::f32::consts::FRAC_PI_2);
        assert_relative_eq!(record.s1, std::f32::consts::PI);

        let line = Light::line(Vec2::zeros(), Vec2::new(1000.0, 500.0)).with_size(10.0);
        let record = raw_record(&line, &EmptyScene, &view(), &params());
        assert_eq!(record.tag, tags::LINE);
        assert_relative_eq!(record.s0, 1.0);
        assert_relative_eq!(record.s1, 1.0);
    }

    #[test]
    fn test_directional_record() {
        let mut light = Light::directional(Vec3::new(0.0, 0.6, -0.8)).with_intensity(1.0);
        light.set_specular_intensity(3.0);
        let record = raw_record(&light, &EmptyScene, &view(), &params());
        assert_eq!(record.tag, tags::DIRECTIONAL);
        assert_relative_eq!(record.x, 0.0);
        assert_relative_eq!(record.y, 0.6);
        assert_relative_eq!(record.s0, -0.8);
        assert_relative_eq!(record.size, 3.0);
        assert_eq!(record.height, 0.0);
    }

    #[test]
    fn test_negative_intensity_clamped() {
        let light = Light::point(Vec2::zeros()).with_size(1.0).with_intensity(-4.0);
        let record = raw_record(&light, &EmptyScene, &view(), &params());
        assert_eq!(record.intensity, 0.0);
        assert_eq!(record.s0, 0.0);
    }

    #[test]
    fn test_normalized_values_in_unit_range() {
        let lights = vec![
            Light::point(Vec2::new(100.0, 50.0)).with_size(5.0).with_intensity(0.1),
            Light::point(Vec2::new(900.0, 450.0)).with_size(2000.0).with_intensity(40.0),
            Light::cone(Vec2::new(400.0, 300.0), 10.0, 350.0).with_size(60.0).with_intensity(3.0),
        ];
        let batch = pack_lights(&lights, &EmptyScene, &view(), &params());
        assert_eq!(batch.len(), 3);
        for record in batch.records() {
            for value in [record.x, record.y, record.size, record.intensity, record.s0, record.s1, record.height] {
                assert!((-1e-5..=1.0 + 1e-5).contains(&value), "{value} outside unit range");
            }
        }
    }

    #[test]
    fn test_normalization_round_trip() {
        let lights: Vec<Light> = (0..20)
            .map(|i| {
                let i = i as f32;
                Light::line(Vec2::new(i * 40.0, i * 10.0), Vec2::new(1000.0 - i * 30.0, 20.0 + i * 5.0))
                    .with_size(1.0 + i * i)
                    .with_intensity(0.05 + i * 0.7)
            })
            .collect();
        let batch = pack_lights(&lights, &EmptyScene, &view(), &params());

        for (index, light) in lights.iter().enumerate() {
            let expected = raw_record(light, &EmptyScene, &view(), &params());
            let actual = batch.unpack(index).unwrap();
            assert_abs_diff_eq!(actual.x, expected.x, epsilon = 1e-5);
            assert_abs_diff_eq!(actual.y, expected.y, epsilon = 1e-5);
            assert_abs_diff_eq!(actual.s0, expected.s0, epsilon = 1e-5);
            assert_abs_diff_eq!(actual.s1, expected.s1, epsilon = 1e-5);
            assert_abs_diff_eq!(actual.height, expected.height, epsilon = 1e-5);
            assert_relative_eq!(actual.size, expected.size, max_relative = 1e-5);
            assert_relative_eq!(actual.intensity, expected.intensity, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_uniform_vectors() {
        let lights = vec![
            Light::point(Vec2::new(0.0, 0.0)).with_size(50.0).with_intensity(1.0),
            Light::point(Vec2::new(500.0, 500.0)).with_size(100.0).with_intensity(4.0),
        ];
        let batch = pack_lights(&lights, &EmptyScene, &view(), &params());
        let norm = batch.normalization();

        assert_relative_eq!(norm.norm1()[0], 0.5);
        assert_relative_eq!(norm.norm1()[1], 0.0);
        assert_relative_eq!(norm.norm1()[2], 1.0);
        assert_relative_eq!(norm.norm2()[0], 0.2);
        assert_relative_eq!(norm.norm2()[1], 4.0);
        assert_eq!(batch.as_floats().len(), 2 * RECORD_LEN);
    }
}
