//! Light data catalog
//!
//! Loads per-weapon lighting presets from a CSV table. Each row names a
//! projectile or beam type and carries up to three preset groups:
//!
//! - **standard**: continuous light that follows the projectile or beam
//! - **hit**: flash at the impact point
//! - **flash**: muzzle flash at the firing point
//!
//! ## Table format
//!
//! ```text
//! id,type,size,intensity,color,fadeout,offset,hit size,hit intensity,hit color,...
//! pulse_laser,projectile,60,1.2,"[255,80,80]",0.2,10,...
//! ```
//!
//! The first non-empty line is the header. Cells may be quoted with `"`;
//! rows whose first cell starts with `#` are comments. Colors are written
//! `[r,g,b]` or `(r,g,b)` with 0-255 components.

use std::collections::HashMap;
use std::path::Path;

use crate::foundation::math::Vec3;

/// Catalog namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightDataKind {
    /// Keys are projectile type ids
    Projectile,
    /// Keys are beam weapon ids
    Beam,
}

impl LightDataKind {
    fn from_cell(cell: &str) -> Option<Self> {
        match cell {
            "projectile" => Some(Self::Projectile),
            "beam" => Some(Self::Beam),
            _ => None,
        }
    }
}

/// How a load treats keys that are already present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Later rows replace earlier entries
    #[default]
    Overwrite,
    /// Existing entries win; their rows are skipped
    KeepExisting,
}

/// One preset group
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightPreset {
    /// Light size in world units
    pub size: f32,
    /// Light intensity
    pub intensity: f32,
    /// Color as unit floats
    pub color: Vec3,
    /// Fade-out duration in seconds
    pub fadeout: f32,
    /// Distance behind the firing point (standard and flash groups only)
    pub offset: f32,
}

/// Presets for one projectile or beam type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightEntry {
    /// Continuous light
    pub standard: Option<LightPreset>,
    /// Impact flash
    pub hit: Option<LightPreset>,
    /// Muzzle flash
    pub flash: Option<LightPreset>,
    /// Probability that a spawn actually produces lights
    pub chance: f32,
    /// Dim when fired by the smallest platform class
    pub fighter_dim: bool,
}

impl Default for LightEntry {
    fn default() -> Self {
        Self {
            standard: None,
            hit: None,
            flash: None,
            chance: 1.0,
            fighter_dim: true,
        }
    }
}

impl LightEntry {
    /// Whether the entry has a standard preset
    pub fn has_standard(&self) -> bool {
        self.standard.is_some()
    }

    /// Whether the entry has a hit preset
    pub fn has_hit(&self) -> bool {
        self.hit.is_some()
    }

    /// Whether the entry has a flash preset
    pub fn has_flash(&self) -> bool {
        self.flash.is_some()
    }
}

/// Summary of one load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    /// Entries written into the catalog
    pub loaded: usize,
    /// Rows skipped because their key already existed
    pub kept_existing: usize,
    /// Rows without an id or with an unknown type
    pub ignored: usize,
    /// Rows with an unparsable cell
    pub malformed: usize,
}

/// Catalog loading errors
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The table could not be read
    #[error("Failed to read light data {path}: {source}")]
    Io {
        /// Table path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The table has no header line
    #[error("Light data has no header row")]
    MissingHeader,

    /// A row could not be parsed
    #[error("Line {line}: {reason}")]
    Row {
        /// 1-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },
}

/// Lighting presets keyed by projectile and beam type
#[derive(Debug, Clone, Default)]
pub struct LightCatalog {
    projectiles: HashMap<String, LightEntry>,
    beams: HashMap<String, LightEntry>,
}

impl LightCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table from disk.
    ///
    /// Malformed rows are skipped and reported with a single error line for
    /// the file. A missing or unreadable file is logged and returned as an
    /// error; the catalog is left unchanged.
    pub fn load(&mut self, path: impl AsRef<Path>, mode: LoadMode) -> Result<LoadReport, CatalogError> {
        let path = path.as_ref();
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) => {
                let error = CatalogError::Io {
                    path: path.display().to_string(),
                    source,
                };
                log::error!("Light data not loaded: {error}");
                return Err(error);
            }
        };

        let (report, first_error) = match self.load_rows(&contents, mode) {
            Ok(loaded) => loaded,
            Err(error) => {
                log::error!("Light data {} not loaded: {error}", path.display());
                return Err(error);
            }
        };
        if let Some(error) = first_error {
            log::error!(
                "Light data {}: skipped {} malformed row(s), first: {error}",
                path.display(),
                report.malformed
            );
        }
        log::info!(
            "Loaded {} light entries from {} ({} kept existing, {} ignored)",
            report.loaded,
            path.display(),
            report.kept_existing,
            report.ignored
        );
        Ok(report)
    }

    /// Load a table from an in-memory string.
    ///
    /// Failures are logged and returned like [`LightCatalog::load`].
    pub fn load_str(&mut self, contents: &str, mode: LoadMode) -> Result<LoadReport, CatalogError> {
        let (report, first_error) = match self.load_rows(contents, mode) {
            Ok(loaded) => loaded,
            Err(error) => {
                log::error!("Light data not loaded: {error}");
                return Err(error);
            }
        };
        if let Some(error) = first_error {
            log::error!("Light data: skipped {} malformed row(s), first: {error}", report.malformed);
        }
        Ok(report)
    }

    /// Look up the presets for `id`
    pub fn lookup(&self, id: &str, kind: LightDataKind) -> Option<&LightEntry> {
        self.table(kind).get(id)
    }

    /// Total entries across both namespaces
    pub fn len(&self) -> usize {
        self.projectiles.len() + self.beams.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.projectiles.clear();
        self.beams.clear();
    }

    fn table(&self, kind: LightDataKind) -> &HashMap<String, LightEntry> {
        match kind {
            LightDataKind::Projectile => &self.projectiles,
            LightDataKind::Beam => &self.beams,
        }
    }

    fn table_mut(&mut self, kind: LightDataKind) -> &mut HashMap<String, LightEntry> {
        match kind {
            LightDataKind::Projectile => &mut self.projectiles,
            LightDataKind::Beam => &mut self.beams,
        }
    }

    fn load_rows(&mut self, contents: &str, mode: LoadMode) -> Result<(LoadReport, Option<CatalogError>), CatalogError> {
        let mut lines = contents
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .filter(|(_, line)| !line.trim().is_empty());

        let (header_line, header) = lines.next().ok_or(CatalogError::MissingHeader)?;
        let columns: HashMap<String, usize> = split_record(header, header_line)?
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_ascii_lowercase(), index))
            .collect();

        let mut report = LoadReport::default();
        let mut first_error = None;

        for (line_num, line) in lines {
            let fields = match split_record(line, line_num) {
                Ok(fields) => fields,
                Err(error) => {
                    report.malformed += 1;
                    first_error.get_or_insert(error);
                    continue;
                }
            };

            // Comment rows
            if fields.first().is_some_and(|first| first.trim_start().starts_with('#')) {
                continue;
            }

            let row = Row { fields: &fields, columns: &columns, line: line_num };
            let id = row.text("id");
            let Some(kind) = LightDataKind::from_cell(row.text("type")) else {
                report.ignored += 1;
                continue;
            };
            if id.is_empty() {
                report.ignored += 1;
                continue;
            }

            if mode == LoadMode::KeepExisting && self.table(kind).contains_key(id) {
                report.kept_existing += 1;
                continue;
            }

            match row.parse_entry() {
                Ok(entry) => {
                    self.table_mut(kind).insert(id.to_string(), entry);
                    report.loaded += 1;
                }
                Err(error) => {
                    report.malformed += 1;
                    first_error.get_or_insert(error);
                }
            }
        }

        Ok((report, first_error))
    }
}

/// Cells of one record, addressed by header name
struct Row<'a> {
    fields: &'a [String],
    columns: &'a HashMap<String, usize>,
    line: usize,
}

impl Row<'_> {
    fn text(&self, column: &str) -> &str {
        self.columns
            .get(column)
            .and_then(|&index| self.fields.get(index))
            .map_or("", |cell| cell.trim())
    }

    fn error(&self, reason: String) -> CatalogError {
        CatalogError::Row { line: self.line, reason }
    }

    fn number(&self, column: &str, default: f32) -> Result<f32, CatalogError> {
        let cell = self.text(column);
        if cell.is_empty() {
            return Ok(default);
        }
        cell.parse::<f32>()
            .map_err(|_| self.error(format!("'{column}' is not a number: '{cell}'")))
    }

    fn flag(&self, column: &str, default: bool) -> Result<bool, CatalogError> {
        let cell = self.text(column);
        if cell.is_empty() {
            return Ok(default);
        }
        match cell.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(self.error(format!("'{column}' is not true/false: '{cell}'"))),
        }
    }

    fn color(&self, column: &str) -> Result<Vec3, CatalogError> {
        let cell = self.text(column);
        parse_color(cell).ok_or_else(|| self.error(format!("'{column}' is not a color: '{cell}'")))
    }

    /// Parse one preset group. `prefix` is `""`, `"hit "` or `"flash "`.
    fn preset(&self, prefix: &str, with_offset: bool) -> Result<Option<LightPreset>, CatalogError> {
        let size = self.number(&format!("{prefix}size"), 0.0)?;
        let intensity = self.number(&format!("{prefix}intensity"), 0.0)?;
        let fadeout = self.number(&format!("{prefix}fadeout"), 0.0)?;
        let offset = if with_offset {
            self.number(&format!("{prefix}offset"), 0.0)?
        } else {
            0.0
        };

        let color_column = format!("{prefix}color");
        let present = size > 0.0 && intensity > 0.0 && !self.text(&color_column).is_empty();
        if !present {
            return Ok(None);
        }

        Ok(Some(LightPreset {
            size,
            intensity,
            color: self.color(&color_column)?,
            fadeout,
            offset,
        }))
    }

    fn parse_entry(&self) -> Result<LightEntry, CatalogError> {
        Ok(LightEntry {
            standard: self.preset("", true)?,
            hit: self.preset("hit ", false)?,
            flash: self.preset("flash ", true)?,
            chance: self.number("chance", 1.0)?,
            fighter_dim: self.flag("fighter dim", true)?,
        })
    }
}

/// Split one CSV record into cells. Quoted cells may contain commas and
/// doubled quotes.
fn split_record(line: &str, line_num: usize) -> Result<Vec<String>, CatalogError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if current.trim().is_empty() => {
                current.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(CatalogError::Row {
            line: line_num,
            reason: "unterminated quoted cell".to_string(),
        });
    }
    fields.push(current);
    Ok(fields)
}

/// Parse `[r,g,b]` or `(r,g,b)` with 0-255 components into unit floats.
/// Components are clamped; anything after the third is ignored.
fn parse_color(cell: &str) -> Option<Vec3> {
    let mut chars = cell.chars();
    chars.next()?;
    chars.next_back()?;
    let inner = chars.as_str();

    let mut components = inner.split(',').map(|part| part.trim().parse::<i32>().ok());
    let mut channel = || -> Option<f32> {
        let value = u8::try_from(components.next()??.clamp(0, 255)).ok()?;
        Some(f32::from(value) / 255.0)
    };

    let red = channel()?;
    let green = channel()?;
    let blue = channel()?;
    Some(Vec3::new(red, green, blue))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str = "id,type,size,intensity,color,fadeout,offset,hit size,hit intensity,hit color,hit fadeout,flash size,flash intensity,flash color,flash fadeout,flash offset,chance,fighter dim";

    fn table(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_beam_hit_row() {
        let mut catalog = LightCatalog::new();
        let report = catalog
            .load_str(&table(&[r#"beam_x,beam,,,,,,50,2,"(255,0,0)",1,,,,,,1,"#]), LoadMode::Overwrite)
            .unwrap();
        assert_eq!(report.loaded, 1);

        let entry = catalog.lookup("beam_x", LightDataKind::Beam).unwrap();
        assert!(entry.has_hit());
        assert!(!entry.has_standard());
        assert!(!entry.has_flash());

        let hit = entry.hit.unwrap();
        assert_relative_eq!(hit.size, 50.0);
        assert_relative_eq!(hit.intensity, 2.0);
        assert_relative_eq!(hit.color.x, 1.0);
        assert_relative_eq!(hit.color.y, 0.0);
        assert_relative_eq!(hit.fadeout, 1.0);
        assert!(entry.fighter_dim);

        assert!(catalog.lookup("beam_x", LightDataKind::Projectile).is_none());
    }

    #[test]
    fn test_defaults_and_presets() {
        let mut catalog = LightCatalog::new();
        catalog
            .load_str(
                &table(&[r#"shot,projectile,40,1.5,"[100,200,300]",0.3,12,,,,,20,3,"[255,255,255]",0.1,5,,false"#]),
                LoadMode::Overwrite,
            )
            .unwrap();

        let entry = catalog.lookup("shot", LightDataKind::Projectile).unwrap();
        assert_relative_eq!(entry.chance, 1.0);
        assert!(!entry.fighter_dim);

        let standard = entry.standard.unwrap();
        assert_relative_eq!(standard.offset, 12.0);
        assert_relative_eq!(standard.color.z, 1.0);
        assert_relative_eq!(standard.color.x, 100.0 / 255.0);

        let flash = entry.flash.unwrap();
        assert_relative_eq!(flash.offset, 5.0);
        assert_relative_eq!(flash.fadeout, 0.1);
    }

    #[test]
    fn test_group_requires_positive_size_and_color() {
        let mut catalog = LightCatalog::new();
        catalog
            .load_str(&table(&["dim,projectile,0,1,\"[1,2,3]\",,,10,1,,,,,,,,0.5,"]), LoadMode::Overwrite)
            .unwrap();

        let entry = catalog.lookup("dim", LightDataKind::Projectile).unwrap();
        assert!(!entry.has_standard());
        assert!(!entry.has_hit());
        assert_relative_eq!(entry.chance, 0.5);
    }

    #[test]
    fn test_overwrite_vs_keep_existing() {
        let mut catalog = LightCatalog::new();
        catalog
            .load_str(&table(&["a,projectile,10,1,\"[255,0,0]\""]), LoadMode::Overwrite)
            .unwrap();

        let report = catalog
            .load_str(&table(&["a,projectile,99,1,\"[255,0,0]\""]), LoadMode::KeepExisting)
            .unwrap();
        assert_eq!(report.kept_existing, 1);
        let size = catalog.lookup("a", LightDataKind::Projectile).and_then(|e| e.standard).map(|p| p.size);
        assert_eq!(size, Some(10.0));

        catalog
            .load_str(&table(&["a,projectile,99,1,\"[255,0,0]\""]), LoadMode::Overwrite)
            .unwrap();
        let size = catalog.lookup("a", LightDataKind::Projectile).and_then(|e| e.standard).map(|p| p.size);
        assert_eq!(size, Some(99.0));

        // Same id in the other namespace is a separate key
        let report = catalog
            .load_str(&table(&["a,beam,5,1,\"[0,0,255]\""]), LoadMode::KeepExisting)
            .unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_nan_cells_leave_group_empty() {
        let mut catalog = LightCatalog::new();
        let report = catalog
            .load_str(
                &table(&[
                    "nan_size,projectile,NaN,1,\"[255,0,0]\"",
                    "nan_intensity,projectile,10,nan,\"[255,0,0]\",,,NaN,2,\"[0,255,0]\",1",
                ]),
                LoadMode::Overwrite,
            )
            .unwrap();
        assert_eq!(report.loaded, 2);

        let entry = catalog.lookup("nan_size", LightDataKind::Projectile).unwrap();
        assert!(!entry.has_standard());
        let entry = catalog.lookup("nan_intensity", LightDataKind::Projectile).unwrap();
        assert!(!entry.has_standard());
        assert!(!entry.has_hit());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let mut catalog = LightCatalog::new();
        let report = catalog
            .load_str(
                &table(&[
                    "bad_number,projectile,big,1,\"[1,1,1]\"",
                    "bad_color,projectile,10,1,\"[1,x,1]\"",
                    "bad_quote,projectile,10,1,\"[1,1,1]",
                    "# commented,projectile,10,1,\"[1,1,1]\"",
                    ",projectile,10,1,\"[1,1,1]\"",
                    "odd,laser,10,1,\"[1,1,1]\"",
                    "good,projectile,10,1,\"[1,1,1]\"",
                ]),
                LoadMode::Overwrite,
            )
            .unwrap();

        assert_eq!(report.malformed, 3);
        assert_eq!(report.ignored, 2);
        assert_eq!(report.loaded, 1);
        assert!(catalog.lookup("good", LightDataKind::Projectile).is_some());
        assert!(catalog.lookup("bad_number", LightDataKind::Projectile).is_none());
    }

    #[test]
    fn test_missing_header_and_file() {
        let mut catalog = LightCatalog::new();
        assert!(matches!(catalog.load_str("\n  \n", LoadMode::Overwrite), Err(CatalogError::MissingHeader)));
        assert!(matches!(
            catalog.load("/nonexistent/light_data.csv", LoadMode::Overwrite),
            Err(CatalogError::Io { .. })
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_failed_load_keeps_existing_entries() {
        let mut catalog = LightCatalog::new();
        catalog
            .load_str(&table(&["kept,projectile,10,1,\"[1,1,1]\""]), LoadMode::Overwrite)
            .unwrap();

        assert!(catalog.load("/nonexistent/light_data.csv", LoadMode::Overwrite).is_err());
        assert!(catalog.load_str("", LoadMode::Overwrite).is_err());
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup("kept", LightDataKind::Projectile).is_some());
    }

    #[test]
    fn test_parse_color_clamps() {
        let color = parse_color("(300,-5,51)").unwrap();
        assert_relative_eq!(color.x, 1.0);
        assert_relative_eq!(color.y, 0.0);
        assert_relative_eq!(color.z, 0.2);
        assert!(parse_color("[1,2]").is_none());
        assert!(parse_color("").is_none());
    }
}
