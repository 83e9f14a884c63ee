// Copyright (c), Mysten Labs, Inc.
// SPDX-License-Identifier: Apache-2.0

use super::extract::SoapNote;
use super::font_metrics::{glyph_units, Face, PT_TO_MM};
use crate::common::sanitize_file_component;
use crate::SoapError;
use chrono::NaiveDateTime;
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const PRINTABLE_WIDTH_MM: f32 = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;

const TITLE_PT: f32 = 16.0;
const SECTION_PT: f32 = 13.0;
const BODY_PT: f32 = 12.0;

/// Cursor over the document that adds pages as text runs off the bottom.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, SoapError> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| SoapError::Render(format!("Failed to load font: {e:?}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| SoapError::Render(format!("Failed to load font: {e:?}")))?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN_MM {
            let (page, layer) =
                self.doc
                    .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT_MM - MARGIN_MM;
        }
    }

    /// Draw one already-wrapped Latin-1 line.
    fn line(&mut self, text: &str, size: f32, face: Face, height: f32) {
        self.ensure_space(height);
        let baseline = self.y - height * 0.75;
        let font = match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
        };
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(baseline), font);
        self.y -= height;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn paragraph(&mut self, text: &str, size: f32, face: Face, height: f32) {
        for line in wrap_text(text, PRINTABLE_WIDTH_MM, size, face) {
            self.line(&line, size, face, height);
        }
    }

    fn finish(self) -> Result<Vec<u8>, SoapError> {
        self.doc
            .save_to_bytes()
            .map_err(|e| SoapError::Render(format!("Failed to write PDF: {e:?}")))
    }
}

/// Render a SOAP note into a PDF document.
pub fn render_soap_pdf(
    patient: Option<&str>,
    date: Option<&str>,
    note: &SoapNote,
) -> Result<Vec<u8>, SoapError> {
    let mut w = PageWriter::new("SOAP Note")?;

    w.paragraph("SOAP Note", TITLE_PT, Face::Bold, 10.0);

    let patient = patient.map(str::trim).filter(|p| !p.is_empty()).unwrap_or("-");
    let date = date.map(str::trim).filter(|d| !d.is_empty()).unwrap_or("-");
    w.paragraph(
        &format!("Patient: {patient}   |   Date: {date}"),
        BODY_PT,
        Face::Regular,
        8.0,
    );
    w.gap(2.0);

    for (title, content) in note.sections() {
        w.paragraph(title, SECTION_PT, Face::Bold, 8.0);
        let content = content.trim();
        w.paragraph(
            if content.is_empty() { "-" } else { content },
            BODY_PT,
            Face::Regular,
            7.0,
        );
        w.gap(2.0);
    }

    w.finish()
}

/// Download name, e.g. `SOAP_Demo_Patient_20250101_0930.pdf`.
pub fn pdf_file_name(patient: Option<&str>, now: NaiveDateTime) -> String {
    let name = patient
        .map(sanitize_file_component)
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "patient".to_string());
    format!("SOAP_{}_{}.pdf", name, now.format("%Y%m%d_%H%M"))
}

/// Greedy word wrap on measured glyph widths, like FPDF's `multi_cell`.
/// Text is converted to Latin-1 first so the widths match what is drawn.
/// Explicit newlines are kept and words wider than a line are split.
pub fn wrap_text(text: &str, max_width_mm: f32, size_pt: f32, face: Face) -> Vec<String> {
    let max_units = (max_width_mm / (size_pt * PT_TO_MM) * 1000.0).max(0.0) as u32;
    let space = glyph_units(' ', face) as u32;
    let units = |s: &str| -> u32 { s.chars().map(|c| glyph_units(c, face) as u32).sum() };

    let mut lines = Vec::new();
    for raw_line in text.lines() {
        let raw_line = to_latin1(raw_line);
        let mut current = String::new();
        let mut current_units = 0u32;
        for word in raw_line.split_whitespace() {
            let mut word = word.to_string();
            let mut word_units = units(&word);

            if word_units > max_units {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    current_units = 0;
                }
                let mut chunk = String::new();
                let mut chunk_units = 0u32;
                for c in word.chars() {
                    let cu = glyph_units(c, face) as u32;
                    if !chunk.is_empty() && chunk_units + cu > max_units {
                        lines.push(std::mem::take(&mut chunk));
                        chunk_units = 0;
                    }
                    chunk.push(c);
                    chunk_units += cu;
                }
                word = chunk;
                word_units = chunk_units;
            }

            if !current.is_empty() && current_units + space + word_units > max_units {
                lines.push(std::mem::take(&mut current));
                current_units = 0;
            }
            if !current.is_empty() {
                current.push(' ');
                current_units += space;
            }
            current.push_str(&word);
            current_units += word_units;
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Built-in PDF fonts only cover Latin-1.
fn to_latin1(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\t' => ' ',
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            c if (c as u32) <= 0xFF && !c.is_control() => c,
            _ => '?',
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use super::super::font_metrics::text_width_mm;
    use chrono::NaiveDate;

    fn note() -> SoapNote {
        SoapNote {
            subjective: "Laki-laki 28 tahun demam 3 hari, pusing, mual.".to_string(),
            objective: "Suhu 38.4°C, TD 118/76, N 96, RR 20.".to_string(),
            assessment: "Dengue vs infeksi virus.".to_string(),
            plan: String::new(),
        }
    }

    #[test]
    fn test_render_pdf() {
        let bytes = render_soap_pdf(Some("Demo Patient"), Some("2025-01-01"), &note()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_pdf_long_note_and_missing_header() {
        let mut long = note();
        long.plan = "Hydration and paracetamol as needed. ".repeat(400);
        let short = render_soap_pdf(None, None, &note()).unwrap();
        let bytes = render_soap_pdf(None, None, &long).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > short.len());
    }

    #[test]
    fn test_pdf_file_name() {
        let now = NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 0)
            .unwrap();
        assert_eq!(
            pdf_file_name(Some("Demo Patient"), now),
            "SOAP_Demo_Patient_20250307_0905.pdf"
        );
        assert_eq!(pdf_file_name(None, now), "SOAP_patient_20250307_0905.pdf");
        assert_eq!(pdf_file_name(Some("   "), now), "SOAP_patient_20250307_0905.pdf");
    }

    fn widest_mm(lines: &[String], size: f32, face: Face) -> f32 {
        lines
            .iter()
            .map(|l| text_width_mm(l, size, face))
            .fold(0.0, f32::max)
    }

    #[test]
    fn test_wrap_text() {
        let width = text_width_mm("dddd", BODY_PT, Face::Regular) + 0.01;
        assert_eq!(
            wrap_text("a bb ccc dddd", width, BODY_PT, Face::Regular),
            vec!["a bb", "ccc", "dddd"]
        );
        assert_eq!(
            wrap_text("line one\nline two", PRINTABLE_WIDTH_MM, BODY_PT, Face::Regular),
            vec!["line one", "line two"]
        );
        assert_eq!(wrap_text("", PRINTABLE_WIDTH_MM, BODY_PT, Face::Regular), vec![""]);
    }

    #[test]
    fn test_wrap_keeps_blank_lines() {
        assert_eq!(
            wrap_text("a\n\nb", PRINTABLE_WIDTH_MM, BODY_PT, Face::Regular),
            vec!["a", "", "b"]
        );
    }

    #[test]
    fn test_wrap_stays_within_printable_width() {
        let inputs = [
            "BP 118/76, HR 96, RR 20, SpO2 98%, CBC, NS1. ".repeat(10),
            "PASIEN DEMAM TIGA HARI, MUAL, PUSING. WBC 4200, PLT 98000. ".repeat(8),
            "WWWW MMMM @@@@ %%%% ".repeat(20),
        ];
        for text in &inputs {
            for face in [Face::Regular, Face::Bold] {
                for size in [BODY_PT, SECTION_PT, TITLE_PT] {
                    let lines = wrap_text(text, PRINTABLE_WIDTH_MM, size, face);
                    assert!(lines.len() > 1);
                    assert!(widest_mm(&lines, size, face) <= PRINTABLE_WIDTH_MM + 1e-3);
                    // wrapping only moves whitespace
                    let rejoined: Vec<&str> =
                        lines.iter().flat_map(|l| l.split_whitespace()).collect();
                    let original: Vec<&str> = text.split_whitespace().collect();
                    assert_eq!(rejoined, original);
                }
            }
        }
    }

    #[test]
    fn test_wrap_splits_overlong_word() {
        let word = "W".repeat(300);
        let lines = wrap_text(&word, PRINTABLE_WIDTH_MM, BODY_PT, Face::Bold);
        assert!(lines.len() > 1);
        assert!(widest_mm(&lines, BODY_PT, Face::Bold) <= PRINTABLE_WIDTH_MM + 1e-3);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn test_wrap_measures_latin1_text() {
        let lines = wrap_text("\u{201C}ok\u{201D} 🩺", PRINTABLE_WIDTH_MM, BODY_PT, Face::Regular);
        assert_eq!(lines, vec!["\"ok\" ?"]);
    }

    #[test]
    fn test_to_latin1() {
        assert_eq!(to_latin1("38.4°C"), "38.4°C");
        assert_eq!(to_latin1("\u{201C}ok\u{201D} \u{2014} 🩺"), "\"ok\" - ?");
    }
}
