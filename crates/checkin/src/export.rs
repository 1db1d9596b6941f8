//! Bulk QR code generation.
//!
//! Turns a `name,phone` guest list into one PNG QR code per guest, packed
//! into a single ZIP archive. Each code encodes exactly the payload the
//! check-in scanner expects, so printed codes round-trip through
//! [`crate::parser::parse_candidate`].
//!
//! Archives are deterministic: entries are written in input order with a
//! fixed 1980-01-01 timestamp, so identical input yields identical bytes
//! and an identical digest.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::Path;

use image::{ImageFormat, Rgb};
use qrcode::QrCode;
use serde::Serialize;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::guest::Candidate;
use crate::parser::parse_bulk;

/// Parse a `#rrggbb` color.
#[must_use]
pub fn parse_hex_color(value: &str) -> Option<Rgb<u8>> {
    let hex = value.strip_prefix('#')?;
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

/// Replace every character outside `[A-Za-z0-9]` with `_`.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Archive entry name for a guest: `{sanitized_name}_{phone}.png`.
///
/// The phone is kept as written, except path separators, which would
/// otherwise create directories inside the archive.
#[must_use]
pub fn archive_entry_name(candidate: &Candidate) -> String {
    let phone = candidate.phone.replace(['/', '\\'], "_");
    format!("{}_{phone}.png", sanitize_name(&candidate.name))
}

/// Claim `base`, or the first free `{stem}_{n}.png` with `n >= 2`.
fn unique_entry_name(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let stem = base.strip_suffix(".png").unwrap_or(base);
    let mut n = 2_usize;
    loop {
        let name = format!("{stem}_{n}.png");
        if taken.insert(name.clone()) {
            return name;
        }
        n += 1;
    }
}

/// Rendering options for QR images.
#[derive(Debug, Clone, PartialEq)]
pub struct QrStyle {
    /// Minimum width and height in pixels.
    pub min_size: u32,
    /// Include the quiet zone border.
    pub quiet_zone: bool,
    /// Module color.
    pub dark: Rgb<u8>,
    /// Background color.
    pub light: Rgb<u8>,
}

impl Default for QrStyle {
    fn default() -> Self {
        Self {
            min_size: 400,
            quiet_zone: true,
            dark: Rgb([0x1a, 0x1a, 0x1a]),
            light: Rgb([0xff, 0xff, 0xff]),
        }
    }
}

impl QrStyle {
    /// Build a style from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigValidation`] if a color is not `#rrggbb`.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        let color = |field: &str, value: &str| {
            parse_hex_color(value).ok_or_else(|| Error::ConfigValidation {
                message: format!("{field} must be a #rrggbb color, got {value:?}"),
            })
        };
        Ok(Self {
            min_size: config.image_size,
            quiet_zone: config.quiet_zone,
            dark: color("dark_color", &config.dark_color)?,
            light: color("light_color", &config.light_color)?,
        })
    }
}

/// Encode `payload` as a PNG QR code.
///
/// # Errors
///
/// Returns [`Error::QrEncode`] if the payload does not fit in a QR code,
/// or [`Error::Image`] if PNG encoding fails.
pub fn render_png(payload: &str, style: &QrStyle) -> Result<Vec<u8>> {
    let code = QrCode::new(payload.as_bytes())?;
    let image = code
        .render::<Rgb<u8>>()
        .min_dimensions(style.min_size, style.min_size)
        .quiet_zone(style.quiet_zone)
        .dark_color(style.dark)
        .light_color(style.light)
        .build();

    let mut png = Vec::new();
    image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// One guest's entry in an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    /// File name inside the archive.
    pub file_name: String,
    /// Guest name.
    pub name: String,
    /// Guest phone.
    pub phone: String,
    /// Encoded payload.
    pub payload: String,
}

/// Entries planned from a guest list, before any rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportPlan {
    /// Entries in input order.
    pub entries: Vec<ExportEntry>,
    /// Non-blank lines that were not guest rows.
    pub skipped_lines: usize,
}

/// A finished export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    /// The ZIP archive bytes.
    pub archive: Vec<u8>,
    /// Entries written, in archive order.
    pub entries: Vec<ExportEntry>,
    /// Non-blank lines that were not guest rows.
    pub skipped_lines: usize,
    /// BLAKE3 hex digest of `archive`.
    pub digest: String,
}

impl ExportReport {
    /// Write the archive to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.archive)?;
        info!(path = %path.display(), entries = self.entries.len(), "Archive written");
        Ok(())
    }
}

/// Generates QR archives from guest lists.
#[derive(Debug, Clone, Default)]
pub struct QrExporter {
    style: QrStyle,
}

impl QrExporter {
    /// Create an exporter with the given style.
    #[must_use]
    pub fn new(style: QrStyle) -> Self {
        Self { style }
    }

    /// Create an exporter from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured colors are invalid.
    pub fn from_config(config: &ExportConfig) -> Result<Self> {
        Ok(Self::new(QrStyle::from_config(config)?))
    }

    /// Parse `text` and assign archive entry names without rendering.
    ///
    /// Colliding names get the lowest free `_2`, `_3`, ... suffix before
    /// the extension, so no two entries share a name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoValidData`] if no line is a guest row.
    pub fn plan(&self, text: &str) -> Result<ExportPlan> {
        let parsed = parse_bulk(text);
        if parsed.is_empty() {
            return Err(Error::NoValidData);
        }

        let mut taken: HashSet<String> = HashSet::new();
        let entries = parsed
            .candidates
            .into_iter()
            .map(|candidate| {
                let file_name = unique_entry_name(&archive_entry_name(&candidate), &mut taken);
                ExportEntry {
                    file_name,
                    payload: candidate.payload(),
                    name: candidate.name,
                    phone: candidate.phone,
                }
            })
            .collect();

        Ok(ExportPlan {
            entries,
            skipped_lines: parsed.skipped,
        })
    }

    /// Render every guest in `text` and pack the images into a ZIP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoValidData`] if no line is a guest row, or an
    /// encoding or archive error. No partial archive is produced.
    pub fn export(&self, text: &str) -> Result<ExportReport> {
        let plan = self.plan(text)?;

        let mut archive = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut archive));
            let options = SimpleFileOptions::default()
                .last_modified_time(zip::DateTime::default())
                .compression_method(zip::CompressionMethod::Deflated);

            for entry in &plan.entries {
                let png = render_png(&entry.payload, &self.style)?;
                zip.start_file(entry.file_name.as_str(), options)?;
                zip.write_all(&png)?;
                debug!(file = %entry.file_name, bytes = png.len(), "Added QR image");
            }

            zip.finish()?;
        }

        let digest = blake3::hash(&archive).to_hex().to_string();
        info!(
            entries = plan.entries.len(),
            skipped = plan.skipped_lines,
            bytes = archive.len(),
            "QR archive generated"
        );

        Ok(ExportReport {
            archive,
            entries: plan.entries,
            skipped_lines: plan.skipped_lines,
            digest,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::parser::parse_candidate;

    fn small_exporter() -> QrExporter {
        QrExporter::new(QrStyle {
            min_size: 64,
            ..QrStyle::default()
        })
    }

    fn read_entry(archive: &[u8], name: &str) -> Vec<u8> {
        let mut zip = zip::ZipArchive::new(Cursor::new(archive)).unwrap();
        let mut file = zip.by_name(name).unwrap();
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1a1a1a"), Some(Rgb([26, 26, 26])));
        assert_eq!(parse_hex_color("#FFFFFF"), Some(Rgb([255, 255, 255])));
        assert_eq!(parse_hex_color("1a1a1a"), None);
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("Jane Doe"), "Jane_Doe");
        assert_eq!(sanitize_name("O'Brien-Smith"), "O_Brien_Smith");
        assert_eq!(sanitize_name("José"), "Jos_");
        assert_eq!(sanitize_name("abc123"), "abc123");
    }

    #[test]
    fn test_archive_entry_name() {
        let candidate = Candidate::new("Jane Doe", "555-0100");
        assert_eq!(archive_entry_name(&candidate), "Jane_Doe_555-0100.png");

        let candidate = Candidate::new("A", "555/0100");
        assert_eq!(archive_entry_name(&candidate), "A_555_0100.png");
    }

    #[test]
    fn test_style_from_config() {
        let style = QrStyle::from_config(&ExportConfig::default()).unwrap();
        assert_eq!(style, QrStyle::default());

        let config = ExportConfig {
            light_color: "white".to_string(),
            ..ExportConfig::default()
        };
        assert!(QrStyle::from_config(&config).is_err());
    }

    #[test]
    fn test_render_png_meets_min_size() {
        let png = render_png("Alex,555-1234", &QrStyle::default()).unwrap();
        let image = image::load_from_memory_with_format(&png, ImageFormat::Png).unwrap();

        assert!(image.width() >= 400);
        assert!(image.height() >= 400);
    }

    #[test]
    fn test_render_png_uses_colors() {
        let png = render_png("Alex,555-1234", &QrStyle::default()).unwrap();
        let image = image::load_from_memory(&png).unwrap().to_rgb8();

        // Corner pixel is in the quiet zone; the finder pattern follows.
        assert_eq!(*image.get_pixel(0, 0), Rgb([0xff, 0xff, 0xff]));
        assert!(image.pixels().any(|p| *p == Rgb([0x1a, 0x1a, 0x1a])));
    }

    #[test]
    fn test_plan_names_and_payloads() {
        let plan = small_exporter()
            .plan("Jane Doe,555-0100\nbad\n\nJohn,555-0101\n")
            .unwrap();

        assert_eq!(plan.skipped_lines, 1);
        assert_eq!(plan.entries.len(), 2);
        assert_eq!(plan.entries[0].file_name, "Jane_Doe_555-0100.png");
        assert_eq!(plan.entries[0].payload, "Jane Doe,555-0100");
        assert_eq!(
            parse_candidate(&plan.entries[1].payload).unwrap(),
            Candidate::new("John", "555-0101")
        );
    }

    #[test]
    fn test_plan_resolves_collisions() {
        let plan = small_exporter()
            .plan("Jane Doe,555\nJane-Doe,555\nJane.Doe,555\n")
            .unwrap();

        let names: Vec<&str> = plan.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Jane_Doe_555.png", "Jane_Doe_555_2.png", "Jane_Doe_555_3.png"]
        );
    }

    #[test]
    fn test_plan_suffix_never_reuses_a_taken_name() {
        // The third guest's own name equals the suffixed name of the second.
        let plan = small_exporter().plan("A,1\nA,1\nA_1,2\n").unwrap();

        let names: Vec<&str> = plan.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["A_1.png", "A_1_2.png", "A_1_2_2.png"]);

        let report = small_exporter().export("A,1\nA,1\nA_1,2\n").unwrap();
        let zip = zip::ZipArchive::new(Cursor::new(&report.archive)).unwrap();
        assert_eq!(zip.len(), 3);
    }

    #[test]
    fn test_plan_suffix_skips_earlier_natural_name() {
        // The first guest's own name already holds the `_2` suffix slot.
        let plan = small_exporter().plan("A_1,2\nA,1\nA,1\n").unwrap();

        let names: Vec<&str> = plan.entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["A_1_2.png", "A_1.png", "A_1_3.png"]);
    }

    #[test]
    fn test_unique_entry_name_skips_taken_suffixes() {
        let mut taken: HashSet<String> = ["B_2.png", "B_2_2.png", "B_2_3.png"]
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(unique_entry_name("B_2.png", &mut taken), "B_2_4.png");
        assert_eq!(unique_entry_name("C.png", &mut taken), "C.png");
        assert_eq!(unique_entry_name("C.png", &mut taken), "C_2.png");
    }

    #[test]
    fn test_export_no_valid_data() {
        let exporter = small_exporter();
        assert!(matches!(exporter.export(""), Err(Error::NoValidData)));
        assert!(matches!(
            exporter.export("nobody\n,\n   \n"),
            Err(Error::NoValidData)
        ));
    }

    #[test]
    fn test_export_archive_contents() {
        let report = small_exporter().export("A,1\nB,2\n\nC,3").unwrap();

        assert_eq!(report.entries.len(), 3);
        assert_eq!(report.skipped_lines, 0);

        let zip = zip::ZipArchive::new(Cursor::new(&report.archive)).unwrap();
        assert_eq!(zip.len(), 3);
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        assert_eq!(names, vec!["A_1.png", "B_2.png", "C_3.png"]);

        let png = read_entry(&report.archive, "B_2.png");
        assert!(image::load_from_memory(&png).is_ok());
    }

    #[test]
    fn test_export_is_deterministic() {
        let exporter = small_exporter();
        let first = exporter.export("A,1\nB,2").unwrap();
        let second = exporter.export("A,1\nB,2").unwrap();

        assert_eq!(first.archive, second.archive);
        assert_eq!(first.digest, second.digest);
        assert_eq!(first.digest.len(), 64);

        let different = exporter.export("A,1\nB,3").unwrap();
        assert_ne!(first.digest, different.digest);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codes.zip");
        let report = small_exporter().export("A,1").unwrap();

        report.write_to(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), report.archive);
    }
}
