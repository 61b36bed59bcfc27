//! PDF report assembly.
//!
//! Lays out an A4 portrait document in millimetres: a title header and page
//! footer on every page, then the key metrics, the insight lines and the
//! chart images. Text uses the built-in Helvetica family with WinAnsi
//! encoding, so every line goes through [`sanitize_text`] first.

use std::fs;
use std::io::Write;
use std::mem;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use tracing::{debug, info, warn};

use crate::analyzers::MetricsBundle;
use crate::analyzers::insights::or_na;
use crate::error::{RideError, Result};

pub const REPORT_TITLE: &str = "RideIQ Rides Data Report";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const BOTTOM_MARGIN: f32 = 15.0;
const IMAGE_WIDTH: f32 = 180.0;
const MIN_IMAGE_SPACE: f32 = 120.0;
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Replaces typographic symbols with plain equivalents and drops anything
/// outside Latin-1.
pub fn sanitize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '₹' => out.push_str("Rs."),
            '\u{2013}' | '\u{2014}' => out.push('-'),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{2026}' => out.push_str("..."),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => {}
        }
    }
    out
}

/// Encodes text as Latin-1 bytes, failing on the first character that does
/// not fit.
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|ch| u8::try_from(u32::from(ch)).map_err(|_| RideError::Encoding { ch }))
        .collect()
}

/// The "Key Metrics" lines printed at the top of the report.
pub fn key_metric_lines(metrics: &MetricsBundle) -> Vec<String> {
    let money = |v: Option<f64>| or_na(v.map(|v| format!("Rs.{v:.2}")));
    vec![
        format!("Total Rides: {}", metrics.total_rides),
        format!("Average Fare: {}", money(metrics.avg_fare)),
        format!("Total Revenue: {}", money(metrics.total_revenue)),
        format!(
            "Peak Hour: {}",
            or_na(metrics.peak_hour.map(|h| format!("{h}:00")))
        ),
    ]
}

/// Writes the PDF report to `output` and returns its path.
///
/// Chart paths that do not exist are skipped. Any other failure aborts the
/// whole document; no partial file is left behind on encoding errors.
#[tracing::instrument(skip_all, fields(output = %output.display(), charts = plot_paths.len()))]
pub fn generate_pdf_report(
    metrics: &MetricsBundle,
    insights: &[String],
    plot_paths: &[PathBuf],
    output: &Path,
) -> Result<PathBuf> {
    let mut pdf = ReportWriter::new();
    pdf.add_page()?;

    pdf.set_font(Font::Bold, 12.0);
    pdf.cell(10.0, "Key Metrics", Align::Left)?;
    pdf.set_font(Font::Regular, 11.0);
    for line in key_metric_lines(metrics) {
        pdf.cell(8.0, &line, Align::Left)?;
    }

    pdf.ln(5.0);
    pdf.set_font(Font::Bold, 12.0);
    pdf.cell(10.0, "Auto-Generated Insights", Align::Left)?;
    pdf.set_font(Font::Regular, 11.0);
    for line in insights {
        pdf.cell(8.0, line, Align::Left)?;
    }

    pdf.ln(5.0);
    pdf.set_font(Font::Bold, 12.0);
    pdf.cell(10.0, "Visualizations", Align::Left)?;

    for path in plot_paths {
        if !path.exists() {
            debug!(path = %path.display(), "Chart missing, skipped");
            continue;
        }
        pdf.image(path)?;
        pdf.ln(5.0);
    }

    let pages = pdf.finish(output)?;
    info!(pages, "PDF generated");
    Ok(output.to_path_buf())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    const ALL: [Font; 3] = [Font::Regular, Font::Bold, Font::Italic];

    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
            Font::Italic => "F3",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
            Font::Italic => "Helvetica-Oblique",
        }
    }

    /// Glyph width in thousandths of the font size.
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
            Font::Regular | Font::Italic => &HELVETICA_WIDTHS,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            _ => 556,
        }
    }
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Center,
}

/// Flowing page writer with a cursor measured in millimetres from the top.
struct ReportWriter {
    doc: Document,
    finished: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    page_count: usize,
    y: f32,
    font: Font,
    size: f32,
    images: Vec<(String, ObjectId)>,
}

impl ReportWriter {
    fn new() -> Self {
        Self {
            doc: Document::with_version("1.5"),
            finished: Vec::new(),
            current: Vec::new(),
            page_count: 0,
            y: MARGIN,
            font: Font::Regular,
            size: 11.0,
            images: Vec::new(),
        }
    }

    fn add_page(&mut self) -> Result<()> {
        let (font, size) = (self.font, self.size);
        if self.page_count > 0 {
            self.footer()?;
            self.finished.push(mem::take(&mut self.current));
        }
        self.page_count += 1;
        self.y = MARGIN;
        self.header()?;
        self.set_font(font, size);
        Ok(())
    }

    fn header(&mut self) -> Result<()> {
        self.set_font(Font::Bold, 14.0);
        self.draw_text(10.0, REPORT_TITLE, Align::Center)?;
        self.y += 10.0;
        Ok(())
    }

    fn footer(&mut self) -> Result<()> {
        self.y = PAGE_HEIGHT - 15.0;
        self.set_font(Font::Italic, 8.0);
        self.draw_text(10.0, &format!("Page {}", self.page_count), Align::Center)
    }

    fn set_font(&mut self, font: Font, size: f32) {
        self.font = font;
        self.size = size;
    }

    fn ln(&mut self, h: f32) {
        self.y += h;
    }

    /// Full-width text line of height `h`, breaking the page first if it
    /// would cross the bottom margin.
    fn cell(&mut self, h: f32, text: &str, align: Align) -> Result<()> {
        if self.y + h > PAGE_HEIGHT - BOTTOM_MARGIN {
            self.add_page()?;
        }
        self.draw_text(h, &sanitize_text(text), align)?;
        self.y += h;
        Ok(())
    }

    fn text_width(&self, bytes: &[u8]) -> f32 {
        let units: u32 = bytes.iter().map(|b| u32::from(self.font.glyph_width(*b))).sum();
        units as f32 * self.size / 1000.0 / PT_PER_MM
    }

    fn draw_text(&mut self, h: f32, text: &str, align: Align) -> Result<()> {
        let bytes = encode_latin1(text)?;
        let x = match align {
            Align::Left => MARGIN,
            Align::Center => MARGIN + (PAGE_WIDTH - 2.0 * MARGIN - self.text_width(&bytes)) / 2.0,
        };
        let baseline = self.y + 0.5 * h + 0.3 * self.size / PT_PER_MM;

        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![self.font.resource().into(), self.size.into()]),
            Operation::new(
                "Td",
                vec![
                    (x * PT_PER_MM).into(),
                    ((PAGE_HEIGHT - baseline) * PT_PER_MM).into(),
                ],
            ),
            Operation::new("Tj", vec![Object::String(bytes, StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
        Ok(())
    }

    /// Places an image 180 mm wide at the cursor, starting a new page when
    /// the space left is too small for it.
    fn image(&mut self, path: &Path) -> Result<()> {
        let (name, width_px, height_px) = self.embed_image(path)?;
        let h = IMAGE_WIDTH * height_px as f32 / width_px.max(1) as f32;

        let space_left = PAGE_HEIGHT - BOTTOM_MARGIN - self.y;
        if space_left < MIN_IMAGE_SPACE.max(h) {
            self.add_page()?;
        }

        let bottom = PAGE_HEIGHT - self.y - h;
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (IMAGE_WIDTH * PT_PER_MM).into(),
                    0i64.into(),
                    0i64.into(),
                    (h * PT_PER_MM).into(),
                    (MARGIN * PT_PER_MM).into(),
                    (bottom * PT_PER_MM).into(),
                ],
            ),
            Operation::new("Do", vec![name.as_str().into()]),
            Operation::new("Q", vec![]),
        ]);
        self.y += h;
        Ok(())
    }

    /// Adds the image as a Flate-compressed RGB XObject.
    fn embed_image(&mut self, path: &Path) -> Result<(String, u32, u32)> {
        let rgb = image::open(path)
            .map_err(|source| RideError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(rgb.as_raw())?;
        let data = encoder.finish()?;

        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
                "Filter" => "FlateDecode",
            },
            data,
        )
        .with_compression(false);
        let id = self.doc.add_object(stream);

        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((name.clone(), id));
        debug!(path = %path.display(), width, height, "Image embedded");
        Ok((name, width, height))
    }

    /// Closes the last page, assembles the page tree and writes the file.
    /// Returns the page count.
    fn finish(mut self, output: &Path) -> Result<usize> {
        self.footer()?;
        self.finished.push(mem::take(&mut self.current));

        let mut fonts = Dictionary::new();
        for font in Font::ALL {
            let id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => font.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(font.resource(), id);
        }
        let mut xobjects = Dictionary::new();
        for (name, id) in &self.images {
            xobjects.set(name.as_str(), *id);
        }
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => fonts,
            "XObject" => xobjects,
        });

        let pages_id = self.doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(self.finished.len());
        for operations in mem::take(&mut self.finished) {
            let content = Content { operations }.encode()?;
            let content_id = self.doc.add_object(Stream::new(Dictionary::new(), content));
            let page_id = self.doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        let count = kids.len();

        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    0i64.into(),
                    0i64.into(),
                    (PAGE_WIDTH * PT_PER_MM).into(),
                    (PAGE_HEIGHT * PT_PER_MM).into(),
                ],
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.compress();

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        if let Err(e) = self.doc.save(output) {
            warn!(output = %output.display(), error = %e, "Failed to save PDF");
            return Err(e.into());
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn page_count(path: &Path) -> usize {
        Document::load(path).unwrap().get_pages().len()
    }

    fn insights() -> Vec<String> {
        vec![
            "Average Fare: ₹150.00".to_string(),
            "Peak Ride Hour: 18:00".to_string(),
            "Top Pickup: Airport → Top Drop: Mall".to_string(),
        ]
    }

    #[test]
    fn test_sanitize_text_replacements() {
        assert_eq!(sanitize_text("₹100 – done…"), "Rs.100 - done...");
        assert_eq!(sanitize_text("“quoted” ‘single’ — dash"), "\"quoted\" 'single' - dash");
    }

    #[test]
    fn test_sanitize_text_drops_non_latin1() {
        assert_eq!(sanitize_text("Airport → Mall"), "Airport  Mall");
        assert_eq!(sanitize_text("café 東京"), "café ");
    }

    #[test]
    fn test_encode_latin1() {
        assert_eq!(encode_latin1("café").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert!(matches!(
            encode_latin1("a → b"),
            Err(RideError::Encoding { ch: '→' })
        ));
    }

    #[test]
    fn test_key_metric_lines() {
        let metrics = MetricsBundle {
            total_rides: 3,
            avg_fare: Some(120.0),
            total_revenue: Some(360.0),
            peak_hour: Some(18),
            ..Default::default()
        };
        assert_eq!(
            key_metric_lines(&metrics),
            vec![
                "Total Rides: 3",
                "Average Fare: Rs.120.00",
                "Total Revenue: Rs.360.00",
                "Peak Hour: 18:00",
            ]
        );
    }

    #[test]
    fn test_key_metric_lines_absent_values() {
        let lines = key_metric_lines(&MetricsBundle::default());
        assert_eq!(lines[0], "Total Rides: 0");
        assert_eq!(lines[1], "Average Fare: N/A");
        assert_eq!(lines[3], "Peak Hour: N/A");
    }

    #[test]
    fn test_text_width_centres_title() {
        let mut pdf = ReportWriter::new();
        pdf.set_font(Font::Bold, 14.0);
        let width = pdf.text_width(REPORT_TITLE.as_bytes());
        assert!(width > 40.0 && width < 90.0);
    }

    #[test]
    fn test_generate_without_images() {
        let output = temp_path("rideiq_test_report_plain.pdf");
        let _ = fs::remove_file(&output);

        let path = generate_pdf_report(
            &MetricsBundle::default(),
            &insights(),
            &[temp_path("rideiq_missing_chart.png")],
            &output,
        )
        .unwrap();

        assert_eq!(path, output);
        let bytes = fs::read(&output).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert_eq!(page_count(&output), 1);
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn test_long_text_breaks_pages() {
        let output = temp_path("rideiq_test_report_long.pdf");
        let lines: Vec<String> = (0..40).map(|i| format!("Line {i}")).collect();

        generate_pdf_report(&MetricsBundle::default(), &lines, &[], &output).unwrap();

        assert_eq!(page_count(&output), 2);
        fs::remove_file(&output).unwrap();
    }

    #[test]
    fn test_images_start_new_page_when_space_runs_out() {
        let chart = temp_path("rideiq_test_report_chart.png");
        image::RgbImage::from_pixel(40, 20, image::Rgb([200, 30, 30]))
            .save(&chart)
            .unwrap();
        let output = temp_path("rideiq_test_report_images.pdf");

        generate_pdf_report(
            &MetricsBundle::default(),
            &insights(),
            &[chart.clone(), chart.clone()],
            &output,
        )
        .unwrap();

        assert_eq!(page_count(&output), 2);
        fs::remove_file(&output).unwrap();
        fs::remove_file(&chart).unwrap();
    }

    #[test]
    fn test_unreadable_image_is_an_error() {
        let chart = temp_path("rideiq_test_report_bad.png");
        fs::write(&chart, b"not a png").unwrap();
        let output = temp_path("rideiq_test_report_bad.pdf");

        let result = generate_pdf_report(&MetricsBundle::default(), &[], &[chart.clone()], &output);

        assert!(matches!(result, Err(RideError::Image { .. })));
        fs::remove_file(&chart).unwrap();
    }
}
