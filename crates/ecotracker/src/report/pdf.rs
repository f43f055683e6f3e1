//! PDF rendering with printpdf.
//!
//! Layout is a single column on landscape A4, top to bottom: header, meta
//! line, key metrics, sparklines, summary, tip, category bars and the
//! per-activity table. Content that doesn't fit starts a new page.

use std::io::Cursor;

use image::codecs::{jpeg::JpegDecoder, png::PngDecoder};
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerReference, Point, Rect,
};
use tracing::{debug, warn};

use super::{ReportPayload, Rgb};
use crate::calculator::format_emissions;
use crate::error::{Error, Result};

const PAGE_WIDTH: f32 = 297.0;
const PAGE_HEIGHT: f32 = 210.0;
const LAYER_NAME: &str = "Layer 1";

const LOGO_SIZE: f32 = 16.0;
const LOGO_DPI: f32 = 300.0;
const FOOTER_HEIGHT: f32 = 8.0;
const LINE_GAP: f32 = 1.6;
const SPARK_HEIGHT: f32 = 18.0;
const BAR_HEIGHT: f32 = 5.0;

const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;

/// Renders [`ReportPayload`]s to PDF.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExporter;

impl PdfExporter {
    /// Create an exporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render the payload to PDF bytes.
    ///
    /// An undecodable logo is replaced by a drawn badge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Report`] if the document cannot be built.
    pub fn render(&self, payload: &ReportPayload) -> Result<Vec<u8>> {
        let mut canvas = Canvas::new(payload)?;

        canvas.header(payload);
        canvas.meta_line(payload);
        canvas.key_metrics(payload);
        if !payload.category_series.is_empty() {
            canvas.sparklines(payload);
        }
        canvas.paragraph("Today's summary", &payload.summary);
        if let Some(tip) = &payload.tip {
            if !tip.text.trim().is_empty() {
                canvas.paragraph(&format!("Personalized tip ({})", tip.source), &tip.text);
            }
        }
        canvas.category_bars(payload);
        canvas.activity_table(payload);
        if let Some(footer) = &payload.footer {
            canvas.footers(footer);
        }

        debug!("Rendered report with {} page(s)", canvas.layers.len());
        canvas
            .doc
            .save_to_bytes()
            .map_err(|e| Error::report(e.to_string()))
    }
}

/// Drawing state: the document, its pages and a cursor.
struct Canvas {
    doc: PdfDocumentReference,
    layers: Vec<PdfLayerReference>,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    left: f32,
    right: f32,
    top: f32,
    bottom: f32,
    y: f32,
    primary: Rgb,
    text: Rgb,
    panel: Rgb,
}

impl Canvas {
    fn new(payload: &ReportPayload) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            pdf_text(&payload.title),
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            LAYER_NAME,
        );
        let layer = doc.get_page(page).get_layer(layer);
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| Error::report(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| Error::report(e.to_string()))?;

        let margins = payload.margins;
        let bottom = margins.bottom
            + if payload.footer.is_some() {
                FOOTER_HEIGHT
            } else {
                0.0
            };
        Ok(Self {
            doc,
            layers: vec![layer],
            regular,
            bold,
            left: margins.side,
            right: PAGE_WIDTH - margins.side,
            top: PAGE_HEIGHT - margins.top,
            bottom,
            y: PAGE_HEIGHT - margins.top,
            primary: payload.colors.primary,
            text: payload.colors.text,
            panel: payload.colors.chart_background,
        })
    }

    fn layer(&self) -> &PdfLayerReference {
        // Never empty: `new` pushes the first page
        &self.layers[self.layers.len() - 1]
    }

    fn width(&self) -> f32 {
        self.right - self.left
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER_NAME);
        let layer = self.doc.get_page(page).get_layer(layer);
        self.layers.push(layer);
        self.y = self.top;
    }

    /// Start a new page unless `height` fits above the bottom margin.
    fn ensure(&mut self, height: f32) {
        if self.y - height < self.bottom {
            self.new_page();
        }
    }

    fn fill(&self, color: Rgb) {
        let (r, g, b) = color.unit();
        self.layer()
            .set_fill_color(Color::Rgb(printpdf::Rgb::new(r, g, b, None)));
    }

    fn stroke(&self, color: Rgb, thickness: f32) {
        let (r, g, b) = color.unit();
        let layer = self.layer();
        layer.set_outline_color(Color::Rgb(printpdf::Rgb::new(r, g, b, None)));
        layer.set_outline_thickness(thickness);
    }

    fn text_at(&self, text: &str, size: f32, bold: bool, x: f32, y: f32) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer()
            .use_text(pdf_text(text), size, Mm(x), Mm(y), font);
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.fill(color);
        let rect = Rect::new(Mm(x), Mm(y), Mm(x + width), Mm(y + height))
            .with_mode(PaintMode::Fill);
        self.layer().add_rect(rect);
    }

    fn line_height(size: f32) -> f32 {
        size * PT_TO_MM + LINE_GAP
    }

    fn header(&mut self, payload: &ReportPayload) {
        let top = self.y;
        let logo_drawn = payload
            .logo
            .as_deref()
            .is_some_and(|bytes| self.logo(bytes, self.left, top - LOGO_SIZE));
        if !logo_drawn {
            self.badge(self.left, top - LOGO_SIZE);
        }

        self.fill(self.primary);
        self.text_at(
            &payload.title,
            18.0,
            true,
            self.left + LOGO_SIZE + 5.0,
            top - LOGO_SIZE / 2.0 - 2.0,
        );
        self.y = top - LOGO_SIZE - 6.0;
    }

    /// Draw the logo scaled to the header height. False if it can't be decoded.
    fn logo(&self, bytes: &[u8], x: f32, y: f32) -> bool {
        let image = match decode_image(bytes) {
            Ok(image) => image,
            Err(message) => {
                warn!("Cannot decode logo ({message}), using badge");
                return false;
            }
        };

        let px_to_mm = 25.4 / LOGO_DPI;
        #[allow(clippy::cast_precision_loss)]
        let (width_mm, height_mm) = (
            image.image.width.0 as f32 * px_to_mm,
            image.image.height.0 as f32 * px_to_mm,
        );
        if width_mm <= 0.0 || height_mm <= 0.0 {
            return false;
        }
        let scale = (LOGO_SIZE / width_mm).min(LOGO_SIZE / height_mm);
        image.add_to_layer(
            self.layer().clone(),
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(y)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(LOGO_DPI),
                ..Default::default()
            },
        );
        true
    }

    /// "ST" initials on a primary-colored square.
    fn badge(&self, x: f32, y: f32) {
        self.rect(x, y, LOGO_SIZE, LOGO_SIZE, self.primary);
        self.fill(Rgb {
            r: 0xFF,
            g: 0xFF,
            b: 0xFF,
        });
        self.text_at("ST", 16.0, true, x + 3.2, y + 5.0);
    }

    fn meta_line(&mut self, payload: &ReportPayload) {
        let mut meta = format!("Date: {}", payload.date.format("%Y-%m-%d"));
        if let Some(tip) = &payload.tip {
            meta.push_str(&format!("  |  Tip source: {}", tip.source));
        }
        if let Some(dominant) = payload.breakdown.dominant() {
            meta.push_str(&format!("  |  Largest source: {dominant}"));
        }
        self.fill(self.text);
        self.text_at(&meta, 10.0, false, self.left, self.y);
        self.y -= Self::line_height(10.0) + 3.0;
    }

    fn key_metrics(&mut self, payload: &ReportPayload) {
        let metrics = payload.metrics;
        let cards = [
            ("Total today", format_emissions(metrics.total)),
            ("Change vs previous", metrics.change.to_string()),
            ("Streak", format!("{} day(s)", metrics.streak_days)),
            (
                "Trailing average",
                metrics
                    .window_average
                    .map_or_else(|| "N/A".to_string(), format_emissions),
            ),
        ];

        let height = 16.0;
        self.ensure(height + 4.0);
        let gap = 4.0;
        #[allow(clippy::cast_precision_loss)]
        let card_width = (self.width() - gap * (cards.len() - 1) as f32) / cards.len() as f32;
        let y = self.y - height;

        let mut x = self.left;
        for (label, value) in cards {
            self.rect(x, y, card_width, height, self.panel);
            self.fill(self.text);
            self.text_at(label, 9.0, false, x + 3.0, y + height - 5.0);
            self.fill(self.primary);
            self.text_at(&value, 13.0, true, x + 3.0, y + 3.5);
            x += card_width + gap;
        }
        self.y = y - 6.0;
    }

    fn sparklines(&mut self, payload: &ReportPayload) {
        self.heading("Trailing window");

        let panels = sparkline_panels(payload);
        let gap = 4.0;
        let count = panels.len().max(1);
        #[allow(clippy::cast_precision_loss)]
        let panel_width = (self.width() - gap * (count - 1) as f32) / count as f32;
        self.ensure(SPARK_HEIGHT + 6.0);
        let y = self.y - SPARK_HEIGHT;

        let mut x = self.left;
        for (label, series) in &panels {
            self.rect(x, y, panel_width, SPARK_HEIGHT, self.panel);
            self.fill(self.text);
            self.text_at(label, 9.0, true, x + 2.5, y + SPARK_HEIGHT - 4.5);
            self.sparkline(series, x + 2.5, y + 2.5, panel_width - 5.0, SPARK_HEIGHT - 9.0);
            x += panel_width + gap;
        }
        self.y = y - 6.0;
    }

    fn sparkline(&self, series: &[f64], x: f32, y: f32, width: f32, height: f32) {
        if series.len() < 2 {
            self.fill(self.text);
            self.text_at("Not enough data", 8.0, false, x, y + height / 2.0);
            return;
        }

        let max = series.iter().copied().fold(0.0_f64, f64::max);
        let min = series.iter().copied().fold(f64::INFINITY, f64::min);
        let span = if max > min { max - min } else { 1.0 };
        #[allow(clippy::cast_precision_loss)]
        let step = width / (series.len() - 1) as f32;

        #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
        let points = series
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let ratio = ((value - min) / span) as f32;
                (Point::new(Mm(x + step * i as f32), Mm(y + ratio * height)), false)
            })
            .collect();

        self.stroke(self.primary, 1.2);
        self.layer().add_line(Line {
            points,
            is_closed: false,
        });
    }

    fn heading(&mut self, text: &str) {
        self.ensure(Self::line_height(12.0) + 6.0);
        self.fill(self.primary);
        self.text_at(text, 12.0, true, self.left, self.y);
        self.y -= Self::line_height(12.0) + 1.5;
    }

    fn paragraph(&mut self, heading: &str, body: &str) {
        self.heading(heading);
        let size = 11.0;
        let max_chars = chars_per_line(self.width(), size);
        for line in wrap(body, max_chars) {
            self.ensure(Self::line_height(size));
            self.fill(self.text);
            self.text_at(&line, size, false, self.left, self.y);
            self.y -= Self::line_height(size);
        }
        self.y -= 3.0;
    }

    fn category_bars(&mut self, payload: &ReportPayload) {
        self.heading("Emissions by category");

        let label_width = 32.0;
        let value_width = 34.0;
        let track = self.width() - label_width - value_width;
        let max = payload
            .breakdown
            .iter()
            .map(|(_, value)| value)
            .fold(0.0_f64, f64::max);

        for (category, value) in payload.breakdown.iter() {
            self.ensure(BAR_HEIGHT + 3.0);
            let y = self.y - BAR_HEIGHT + 1.5;
            self.fill(self.text);
            self.text_at(&category.to_string(), 10.0, false, self.left, y + 1.0);

            self.rect(self.left + label_width, y, track, BAR_HEIGHT, self.panel);
            #[allow(clippy::cast_possible_truncation)]
            let ratio = if max > 0.0 { (value / max) as f32 } else { 0.0 };
            if ratio > 0.0 {
                self.rect(self.left + label_width, y, track * ratio, BAR_HEIGHT, self.primary);
            }

            self.fill(self.text);
            self.text_at(
                &format_emissions(value),
                10.0,
                false,
                self.right - value_width + 3.0,
                y + 1.0,
            );
            self.y -= BAR_HEIGHT + 3.0;
        }
        self.y -= 3.0;
    }

    fn activity_table(&mut self, payload: &ReportPayload) {
        if payload.per_activity.is_empty() {
            return;
        }
        self.heading("Per-activity breakdown");

        let columns = [self.left, self.left + 90.0, self.left + 150.0];
        let row = Self::line_height(10.0) + 0.8;
        let header = |canvas: &Self| {
            canvas.fill(canvas.primary);
            for (x, title) in columns.iter().zip(["Activity", "Quantity", "kg CO2e"]) {
                canvas.text_at(title, 10.0, true, *x, canvas.y);
            }
        };

        self.ensure(row * 2.0);
        header(&*self);
        self.y -= row;

        for emission in &payload.per_activity {
            if self.y - row < self.bottom {
                self.new_page();
                header(&*self);
                self.y -= row;
            }
            self.fill(self.text);
            let activity = emission.activity;
            self.text_at(activity.label(), 10.0, false, columns[0], self.y);
            self.text_at(
                &format!("{:.2} {}", emission.quantity, activity.unit()),
                10.0,
                false,
                columns[1],
                self.y,
            );
            self.text_at(
                &format!("{:.3}", emission.kg_co2e),
                10.0,
                false,
                columns[2],
                self.y,
            );
            self.y -= row;
        }
    }

    fn footers(&self, footer: &str) {
        let pages = self.layers.len();
        let y = (self.bottom - FOOTER_HEIGHT).max(4.0);
        for (index, layer) in self.layers.iter().enumerate() {
            let (r, g, b) = self.text.unit();
            layer.set_fill_color(Color::Rgb(printpdf::Rgb::new(r, g, b, None)));
            layer.use_text(pdf_text(footer), 8.0, Mm(self.left), Mm(y), &self.regular);
            layer.use_text(
                format!("Page {} of {pages}", index + 1),
                8.0,
                Mm(self.right - 22.0),
                Mm(y),
                &self.regular,
            );
        }
    }
}

/// Sparkline panels in drawing order: the window total, then each category.
fn sparkline_panels(payload: &ReportPayload) -> Vec<(String, Vec<f64>)> {
    let totals = payload.window.iter().map(|point| point.total).collect();
    std::iter::once(("Total".to_string(), totals))
        .chain(
            payload
                .category_series
                .iter()
                .map(|(category, series)| (category.to_string(), series.clone())),
        )
        .collect()
}

fn decode_image(bytes: &[u8]) -> std::result::Result<Image, String> {
    const PNG_MAGIC: &[u8] = b"\x89PNG";
    const JPEG_MAGIC: &[u8] = b"\xFF\xD8";

    if bytes.starts_with(PNG_MAGIC) {
        let decoder = PngDecoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        Image::try_from(decoder).map_err(|e| e.to_string())
    } else if bytes.starts_with(JPEG_MAGIC) {
        let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(|e| e.to_string())?;
        Image::try_from(decoder).map_err(|e| e.to_string())
    } else {
        Err("unsupported image format".to_string())
    }
}

/// Map text onto what the built-in fonts can show.
fn pdf_text(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '₂' => Some('2'),
            '–' | '—' => Some('-'),
            '‘' | '’' => Some('\''),
            '“' | '”' => Some('"'),
            c if c.is_ascii() && !c.is_ascii_control() => Some(c),
            _ => None,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn chars_per_line(width_mm: f32, size_pt: f32) -> usize {
    let glyph = size_pt * PT_TO_MM * AVG_GLYPH_EM;
    ((width_mm / glyph).floor() as usize).max(10)
}

/// Greedy word wrap to at most `max_chars` per line.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::ActivityRecord;
    use crate::calculator::calculate;
    use crate::coefficients::CoefficientTable;
    use crate::config::ReportConfig;
    use crate::history::fixtures::{day, energy};
    use crate::history::{History, HistoryRecord};
    use crate::tips::Tip;

    fn payload(config: &ReportConfig) -> ReportPayload {
        let inputs = ActivityRecord::new()
            .with("electricity_kwh", 8.0)
            .with("petrol_liter", 2.5)
            .with("meat_kg", 0.15);
        let breakdown = calculate(&inputs, &CoefficientTable::standard()).unwrap();
        let today = HistoryRecord::new(day(2024, 6, 3), inputs, breakdown);
        let history = History::from_records([
            energy(day(2024, 6, 1), 3.0),
            energy(day(2024, 6, 2), 5.0),
            today.clone(),
        ]);
        ReportPayload::assemble(config, &today, &history, &CoefficientTable::standard(), 7)
            .unwrap()
            .with_tip(Some(Tip::fallback("Take the bus – it’s cheaper.")))
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = PdfExporter::new()
            .render(&payload(&ReportConfig::default()))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_sparkline_panels_start_with_window_totals() {
        let payload = payload(&ReportConfig::default());
        let panels = sparkline_panels(&payload);

        let labels: Vec<_> = panels.iter().map(|(label, _)| label.as_str()).collect();
        assert_eq!(labels, vec!["Total", "Energy", "Transport", "Meals"]);
        let totals = &panels[0].1;
        assert_eq!(totals.len(), 3);
        assert_eq!(&totals[..2], &[3.0, 5.0]);
        assert!((totals[2] - payload.metrics.total).abs() < 1e-9);
    }

    #[test]
    fn test_render_with_bad_logo_uses_badge() {
        let mut payload = payload(&ReportConfig::default());
        payload.logo = Some(b"\x89PNG garbage".to_vec());
        let bytes = PdfExporter::new().render(&payload).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_with_png_logo() {
        use image::codecs::png::PngEncoder;
        use image::{ColorType, ImageEncoder};

        let mut png = Vec::new();
        PngEncoder::new(&mut png)
            .write_image(&[0x25, 0x63, 0xEB].repeat(4), 2, 2, ColorType::Rgb8)
            .unwrap();
        assert!(decode_image(&png).is_ok());

        let mut payload = payload(&ReportConfig::default());
        payload.logo = Some(png);
        let bytes = PdfExporter::new().render(&payload).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        assert!(decode_image(b"GIF89a").is_err());
    }

    #[test]
    fn test_render_without_optional_sections() {
        let mut config = ReportConfig::default();
        config.include_footer = false;
        config.include_sparklines = false;
        let payload = payload(&config).with_tip(None);
        let bytes = PdfExporter::new().render(&payload).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_long_table_breaks_pages() {
        let mut payload = payload(&ReportConfig::default());
        let row = payload.per_activity[0];
        payload.per_activity = vec![row; 80];
        payload.summary = "word ".repeat(600);

        let mut canvas = Canvas::new(&payload).unwrap();
        canvas.paragraph("Summary", &payload.summary);
        canvas.activity_table(&payload);
        assert!(canvas.layers.len() > 1);
    }

    #[test]
    fn test_pdf_text_replaces_unsupported_chars() {
        assert_eq!(pdf_text("5.00 kg CO₂ – ok 🌿"), "5.00 kg CO2 - ok");
    }

    #[test]
    fn test_wrap() {
        let lines = wrap("one two three four five", 9);
        assert_eq!(lines, vec!["one two", "three", "four five"]);
        assert!(wrap("   ", 10).is_empty());
        // Overlong words get their own line
        assert_eq!(wrap("abcdefghijkl x", 5), vec!["abcdefghijkl", "x"]);
    }

    #[test]
    fn test_chars_per_line_has_floor() {
        assert_eq!(chars_per_line(1.0, 12.0), 10);
        assert!(chars_per_line(257.0, 11.0) > 100);
    }
}
