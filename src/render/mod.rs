//! Certificate document rendering.
//!
//! Pure byte production: given the certificate fields and any resolved
//! assets, lay out one fixed landscape page and return the PDF bytes plus
//! the verification token printed on them. The template has two
//! attestation layouts selected by provider type; both are expressed as
//! field tables consumed by a single drawing routine so they cannot
//! drift apart.

mod metrics;

use std::io::Cursor;

use bytes::Bytes;
use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument,
    PdfLayerReference, Pt, Rgb,
};
use sha2::{Digest, Sha256};

use crate::errors::RenderError;
use crate::types::{CertificateFields, ProviderType};
use metrics::{text_width, FontStyle};

/// Page width in points (11in landscape).
const PAGE_WIDTH: f32 = 792.0;
/// Page height in points (8.5in landscape).
const PAGE_HEIGHT: f32 = 612.0;

/// Signature images draw at 30% of their native size.
const SIGNATURE_SCALE: f32 = 0.3;

/// Point size of the script signature name.
const SIGNATURE_NAME_SIZE: f32 = 20.0;

const LABEL_SIZE: f32 = 7.0;
const HEADER_SIZE: f32 = 18.0;
const TITLE_SIZE: f32 = 24.0;

/// An immutable rendered certificate.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// The PDF bytes.
    pub bytes: Bytes,
    /// Verification token printed at the bottom of the page.
    pub verification_token: String,
}

/// Assets resolved ahead of rendering. Rendering itself never does I/O.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAssets {
    /// Raster signature image (PNG or JPEG), when available.
    pub signature_image: Option<Bytes>,
    /// Decorative script font for the signature name, when fetched.
    pub script_font: Option<Bytes>,
}

/// Rendering seam consumed by the orchestrator.
pub trait DocumentRenderer: Send + Sync {
    /// Renders one certificate. Fails atomically or succeeds.
    fn render(
        &self,
        fields: &CertificateFields,
        assets: &ResolvedAssets,
    ) -> Result<RenderedDocument, RenderError>;
}

/// Template renderer for CEU certificates.
#[derive(Debug, Clone, Copy, Default)]
pub struct CertificateRenderer;

impl CertificateRenderer {
    /// Creates the renderer.
    pub fn new() -> Self {
        CertificateRenderer
    }
}

/// Tamper-evidence fingerprint printed on the document.
///
/// Pure function of (participant name, course title, issue date): the
/// SHA-256 of `"{name}-{title}-{date}"`, truncated to eight bytes and
/// hex-encoded uppercase. Not a cryptographic signature.
pub fn verification_token(name: &str, title: &str, date: &str) -> String {
    let digest = Sha256::digest(format!("{name}-{title}-{date}").as_bytes());
    digest[..8].iter().map(|b| format!("{b:02X}")).collect()
}

/// One centered label/value pair at a fixed template position.
struct Field {
    x: f32,
    /// Field baseline, measured down from the top edge.
    top: f32,
    width: f32,
    label: &'static str,
    value: String,
    size: f32,
}

impl Field {
    fn new(x: f32, top: f32, width: f32, label: &'static str, value: impl Into<String>) -> Self {
        Field { x, top, width, label, value: value.into(), size: 12.0 }
    }

    fn sized(mut self, size: f32) -> Self {
        self.size = size;
        self
    }
}

/// Centered section header at a fixed height.
struct SectionHeader {
    top: f32,
    text: &'static str,
}

/// Signature area geometry; differs between the two attestation layouts.
struct SignatureBlock {
    x: f32,
    width: f32,
    /// Bottom edge of an embedded image, down from the top.
    image_top: f32,
    /// Baseline of the font-rendered name, down from the top.
    text_top: f32,
}

/// Everything below the credit-hours row, branch-selected.
struct AttestationLayout {
    headers: Vec<SectionHeader>,
    fields: Vec<Field>,
    signature: SignatureBlock,
}

fn hours_display(hours: f64) -> String {
    format!("{hours}")
}

fn common_fields(fields: &CertificateFields) -> Vec<Field> {
    vec![
        Field::new(80.0, 120.0, 300.0, "Participant Name", fields.participant_name.clone())
            .sized(16.0),
        Field::new(
            412.0,
            120.0,
            300.0,
            "Participant BACB Certification Number",
            fields.participant_cert_number.clone().unwrap_or_else(|| "N/A".to_string()),
        )
        .sized(16.0),
        Field::new(80.0, 230.0, 632.0, "Event Name", fields.course_title.clone()).sized(14.0),
        Field::new(80.0, 280.0, 300.0, "Event Date", fields.issue_date.clone()),
        Field::new(412.0, 280.0, 300.0, "Event Modality", fields.modality.clone()),
        Field::new(80.0, 330.0, 200.0, "Total Number of CEUs", hours_display(fields.hours)),
        Field::new(
            296.0,
            330.0,
            200.0,
            "Number of CEUs in Ethics",
            hours_display(fields.ethics_hours),
        ),
        Field::new(
            512.0,
            330.0,
            200.0,
            "Number of CEUs in Supervision",
            hours_display(fields.supervision_hours),
        ),
    ]
}

fn attestation_layout(fields: &CertificateFields, organization: bool) -> AttestationLayout {
    if organization {
        AttestationLayout {
            headers: vec![
                SectionHeader { top: 400.0, text: "ACE Coordinator Information" },
                SectionHeader { top: 500.0, text: "ACE Provider Information" },
            ],
            fields: vec![
                Field::new(296.0, 440.0, 200.0, "ACE Coordinator Name", fields.coordinator.clone()),
                Field::new(80.0, 540.0, 200.0, "ACE Provider Name", fields.provider_name.clone()),
                Field::new(296.0, 540.0, 200.0, "ACE Provider Number", fields.provider_id.clone()),
                Field::new(
                    512.0,
                    540.0,
                    200.0,
                    "Instructor Name (if applicable)",
                    fields.instructor.clone(),
                ),
                Field::new(80.0, 590.0, 300.0, "ACE Provider Signature", ""),
                Field::new(480.0, 590.0, 232.0, "Date", fields.issue_date.clone()),
            ],
            signature: SignatureBlock { x: 80.0, width: 250.0, image_top: 590.0, text_top: 580.0 },
        }
    } else {
        AttestationLayout {
            headers: vec![SectionHeader {
                top: 420.0,
                text: "Individual ACE Provider Information",
            }],
            fields: vec![
                Field::new(80.0, 470.0, 200.0, "ACE Provider Name", fields.provider_name.clone()),
                Field::new(296.0, 470.0, 200.0, "ACE Provider Number", fields.provider_id.clone()),
                Field::new(
                    512.0,
                    470.0,
                    200.0,
                    "Business Name (if applicable)",
                    fields.organization_name.clone().unwrap_or_default(),
                ),
                Field::new(80.0, 540.0, 400.0, "ACE Provider Signature", ""),
                Field::new(512.0, 540.0, 200.0, "Date", fields.issue_date.clone()),
            ],
            signature: SignatureBlock { x: 80.0, width: 300.0, image_top: 540.0, text_top: 530.0 },
        }
    }
}

/// Page drawing context: one layer, the two built-in fonts.
struct Canvas {
    layer: PdfLayerReference,
    bold: IndirectFontRef,
    regular: IndirectFontRef,
}

impl Canvas {
    fn text(&self, text: &str, size: f32, x: f32, top: f32, style: FontStyle, grey: Option<f32>) {
        let color = match grey {
            Some(level) => Color::Rgb(Rgb::new(level, level, level, None)),
            None => Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)),
        };
        self.layer.set_fill_color(color);
        let font = match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
        };
        self.layer.use_text(
            text,
            size,
            Mm::from(Pt(x)),
            Mm::from(Pt(PAGE_HEIGHT - top)),
            font,
        );
    }

    fn field(&self, field: &Field) {
        let label_width = text_width(field.label, LABEL_SIZE, FontStyle::Regular);
        self.text(
            field.label,
            LABEL_SIZE,
            field.x + (field.width - label_width) / 2.0,
            field.top + 10.0,
            FontStyle::Regular,
            Some(0.3),
        );
        if !field.value.is_empty() {
            let value_width = text_width(&field.value, field.size, FontStyle::Bold);
            self.text(
                &field.value,
                field.size,
                field.x + (field.width - value_width) / 2.0,
                field.top - 6.0,
                FontStyle::Bold,
                None,
            );
        }
    }

    fn header(&self, header: &SectionHeader) {
        let width = text_width(header.text, HEADER_SIZE, FontStyle::Bold);
        self.text(
            header.text,
            HEADER_SIZE,
            (PAGE_WIDTH - width) / 2.0,
            header.top,
            FontStyle::Bold,
            None,
        );
    }
}

/// Decodes signature bytes as PNG, then JPEG. Anything else is `None`.
fn decode_signature(bytes: &Bytes) -> Option<Image> {
    if let Ok(decoder) = PngDecoder::new(Cursor::new(bytes.as_ref())) {
        if let Ok(image) = Image::try_from(decoder) {
            return Some(image);
        }
    }
    if let Ok(decoder) = JpegDecoder::new(Cursor::new(bytes.as_ref())) {
        if let Ok(image) = Image::try_from(decoder) {
            return Some(image);
        }
    }
    None
}

/// Advance width of `text` in a parsed script face, in points.
fn script_text_width(face: &ttf_parser::Face<'_>, text: &str, size: f32) -> f32 {
    let units_per_em = f32::from(face.units_per_em());
    let units: u32 = text
        .chars()
        .map(|c| {
            face.glyph_index(c)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
                .map(u32::from)
                .unwrap_or(0)
        })
        .sum();
    units as f32 * size / units_per_em
}

impl DocumentRenderer for CertificateRenderer {
    fn render(
        &self,
        fields: &CertificateFields,
        assets: &ResolvedAssets,
    ) -> Result<RenderedDocument, RenderError> {
        let token = verification_token(
            &fields.participant_name,
            &fields.course_title,
            &fields.issue_date,
        );

        let (doc, page, layer) = PdfDocument::new(
            "CEU Certificate",
            Mm::from(Pt(PAGE_WIDTH)),
            Mm::from(Pt(PAGE_HEIGHT)),
            "certificate",
        );
        let layer = doc.get_page(page).get_layer(layer);
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| RenderError::Page(e.to_string()))?;
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| RenderError::Page(e.to_string()))?;

        // Script font failures are non-fatal: the signature name falls back
        // to the standard font.
        let script_font = assets
            .script_font
            .as_ref()
            .and_then(|bytes| doc.add_external_font(Cursor::new(bytes.as_ref())).ok());

        let canvas = Canvas { layer, bold, regular };

        let title = "Learning Continuing Education";
        let title_width = text_width(title, TITLE_SIZE, FontStyle::Bold);
        canvas.text(title, TITLE_SIZE, (PAGE_WIDTH - title_width) / 2.0, 60.0, FontStyle::Bold, None);

        let organization = fields.provider_type == ProviderType::Organization
            || fields.organization_name.as_deref().is_some_and(|n| !n.is_empty());
        let badge = if organization { "Organization Provider" } else { "Individual Provider" };
        canvas.layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.4, 0.6, None)));
        canvas.layer.use_text(
            badge,
            10.0,
            Mm::from(Pt(PAGE_WIDTH - 150.0)),
            Mm::from(Pt(PAGE_HEIGHT - 60.0)),
            &canvas.bold,
        );

        for field in common_fields(fields) {
            canvas.field(&field);
        }
        canvas.header(&SectionHeader { top: 180.0, text: "Event Information" });

        let layout = attestation_layout(fields, organization);
        for header in &layout.headers {
            canvas.header(header);
        }
        for field in &layout.fields {
            canvas.field(field);
        }

        // Signature area: embedded image when one decodes, else the first
        // non-empty name in the script font (standard font as a last
        // resort), centered in the block either way.
        let block = &layout.signature;
        let mut signature_rendered = false;
        if let Some(bytes) = &assets.signature_image {
            if let Some(image) = decode_signature(bytes) {
                let drawn_width = image.image.width.0 as f32 * SIGNATURE_SCALE;
                image.add_to_layer(
                    canvas.layer.clone(),
                    ImageTransform {
                        translate_x: Some(Mm::from(Pt(block.x + (block.width - drawn_width) / 2.0))),
                        translate_y: Some(Mm::from(Pt(PAGE_HEIGHT - block.image_top))),
                        scale_x: Some(SIGNATURE_SCALE),
                        scale_y: Some(SIGNATURE_SCALE),
                        dpi: Some(72.0),
                        ..Default::default()
                    },
                );
                signature_rendered = true;
            } else {
                tracing::warn!("signature image did not decode as PNG or JPEG, using text fallback");
            }
        }
        if !signature_rendered {
            let name = [&fields.coordinator, &fields.provider_name, &fields.instructor]
                .into_iter()
                .find(|n| !n.is_empty());
            if let Some(name) = name {
                let (font, width) = match (&script_font, &assets.script_font) {
                    (Some(font), Some(bytes)) => match ttf_parser::Face::parse(bytes, 0) {
                        Ok(face) => (font, script_text_width(&face, name, SIGNATURE_NAME_SIZE)),
                        Err(_) => {
                            (&canvas.regular, text_width(name, SIGNATURE_NAME_SIZE, FontStyle::Regular))
                        }
                    },
                    _ => (&canvas.regular, text_width(name, SIGNATURE_NAME_SIZE, FontStyle::Regular)),
                };
                canvas.layer.set_fill_color(Color::Rgb(Rgb::new(0.0, 0.0, 0.0, None)));
                canvas.layer.use_text(
                    name,
                    SIGNATURE_NAME_SIZE,
                    Mm::from(Pt(block.x + (block.width - width) / 2.0)),
                    Mm::from(Pt(PAGE_HEIGHT - block.text_top)),
                    font,
                );
            }
        }

        let stamp = format!("Verification ID: {token}");
        canvas.text(&stamp, 8.0, PAGE_WIDTH / 2.0 - 80.0, PAGE_HEIGHT - 10.0, FontStyle::Regular, Some(0.6));

        let bytes = doc
            .save_to_bytes()
            .map_err(|e| RenderError::Serialize(e.to_string()))?;

        Ok(RenderedDocument { bytes: Bytes::from(bytes), verification_token: token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attendee, CertificateFields, Event, EventType};
    use printpdf::image_crate::{DynamicImage, ImageOutputFormat};

    fn fields(provider_type: ProviderType) -> CertificateFields {
        let event = Event {
            id: "ev1".into(),
            legacy_id: None,
            title: "Intro to Ethics".into(),
            date: "2026-03-05".into(),
            hours: 1.5,
            event_type: EventType::Ethics,
            modality: None,
            instructor_name: "Dana Instructor".into(),
            ace_coordinator_name: "Casey Coordinator".into(),
            ace_organization_name: None,
            ace_provider_type: Some(provider_type),
            provider_id: "OP-04-0012".into(),
            email_subject: None,
        };
        let attendee = Attendee {
            id: "at1".into(),
            event_id: "ev1".into(),
            first_name: "Jordan".into(),
            last_name: "Learner".into(),
            email: "jordan@example.com".into(),
            bcba_number: Some("1-23-45678".into()),
            rbt_number: None,
        };
        CertificateFields::for_attendee(&event, &attendee, None)
    }

    fn png_bytes() -> Bytes {
        let image = DynamicImage::new_rgb8(40, 16);
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageOutputFormat::Png).unwrap();
        Bytes::from(cursor.into_inner())
    }

    fn jpeg_bytes() -> Bytes {
        let image = DynamicImage::new_rgb8(40, 16);
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, ImageOutputFormat::Jpeg(90)).unwrap();
        Bytes::from(cursor.into_inner())
    }

    #[test]
    fn token_is_stable_and_input_sensitive() {
        let a = verification_token("Jordan Learner", "Intro to Ethics", "March 5, 2026");
        let b = verification_token("Jordan Learner", "Intro to Ethics", "March 5, 2026");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        assert_ne!(a, verification_token("Jordan Lerner", "Intro to Ethics", "March 5, 2026"));
        assert_ne!(a, verification_token("Jordan Learner", "Intro to Ethic", "March 5, 2026"));
        assert_ne!(a, verification_token("Jordan Learner", "Intro to Ethics", "March 6, 2026"));
    }

    #[test]
    fn renders_both_branches() {
        let renderer = CertificateRenderer::new();
        let organization = renderer
            .render(&fields(ProviderType::Organization), &ResolvedAssets::default())
            .unwrap();
        let individual = renderer
            .render(&fields(ProviderType::Individual), &ResolvedAssets::default())
            .unwrap();

        assert!(organization.bytes.starts_with(b"%PDF"));
        assert!(individual.bytes.starts_with(b"%PDF"));
        assert_eq!(organization.verification_token, individual.verification_token);
    }

    #[test]
    fn renders_with_png_signature() {
        let renderer = CertificateRenderer::new();
        let assets = ResolvedAssets { signature_image: Some(png_bytes()), script_font: None };
        let document = renderer.render(&fields(ProviderType::Organization), &assets).unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_with_jpeg_signature() {
        let renderer = CertificateRenderer::new();
        let assets = ResolvedAssets { signature_image: Some(jpeg_bytes()), script_font: None };
        let document = renderer.render(&fields(ProviderType::Individual), &assets).unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn undecodable_signature_falls_back_to_text() {
        let renderer = CertificateRenderer::new();
        let assets = ResolvedAssets {
            signature_image: Some(Bytes::from_static(b"not an image")),
            script_font: None,
        };
        let document = renderer.render(&fields(ProviderType::Organization), &assets).unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unloadable_script_font_falls_back_to_standard() {
        let renderer = CertificateRenderer::new();
        let assets = ResolvedAssets {
            signature_image: None,
            script_font: Some(Bytes::from_static(b"definitely not a ttf")),
        };
        let document = renderer.render(&fields(ProviderType::Individual), &assets).unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn decode_signature_rejects_garbage() {
        assert!(decode_signature(&Bytes::from_static(b"junk")).is_none());
        assert!(decode_signature(&png_bytes()).is_some());
        assert!(decode_signature(&jpeg_bytes()).is_some());
    }
}
