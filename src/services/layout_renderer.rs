//! 版面渲染服务 - 业务能力层
//!
//! 只负责"把一个批次画成单页 PDF"，不关心加密和投递
//!
//! 版面固定：A4、左边距 50pt、行距 18pt；标题、字段、备注依次向下排列。
//! 不分页，内容超出页面高度时直接落在页面外。

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

use crate::error::RenderError;
use crate::models::{Client, QualityBatch};

/// A4 宽度（pt）
pub const PAGE_WIDTH: f32 = 595.2756;
/// A4 高度（pt）
pub const PAGE_HEIGHT: f32 = 841.8898;
pub const MARGIN: f32 = 50.0;
pub const LINE_HEIGHT: f32 = 18.0;
/// 备注行缩进
pub const NOTES_INDENT: f32 = 20.0;

/// 字体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Helvetica-Bold 16
    Title,
    /// Helvetica 12
    Body,
}

impl Font {
    fn resource_name(self) -> &'static [u8] {
        match self {
            Font::Title => b"F2",
            Font::Body => b"F1",
        }
    }

    fn size(self) -> i64 {
        match self {
            Font::Title => 16,
            Font::Body => 12,
        }
    }
}

/// 页面上的一行文字
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub x: f32,
    pub y: f32,
    pub font: Font,
    pub text: String,
}

/// 渲染结果（仅存在于内存中）
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// 版面渲染器
#[derive(Debug, Clone, Default)]
pub struct LayoutRenderer;

impl LayoutRenderer {
    pub fn new() -> Self {
        Self
    }

    /// 渲染批次报告
    pub fn render(
        &self,
        batch: &QualityBatch,
        client: &Client,
    ) -> Result<RenderedDocument, RenderError> {
        let lines = layout_lines(batch, client);
        let bytes = write_pdf(&lines)?;
        debug!(
            "批次 {} 渲染完成: {} 行, {} 字节",
            batch.lot_code,
            lines.len(),
            bytes.len()
        );
        Ok(RenderedDocument { bytes })
    }
}

/// 计算每一行的位置和内容
pub fn layout_lines(batch: &QualityBatch, client: &Client) -> Vec<TextLine> {
    let mut lines = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;

    lines.push(TextLine {
        x: MARGIN,
        y,
        font: Font::Title,
        text: format!("Informe de Calidad: Lote {}", batch.lot_code),
    });
    y -= LINE_HEIGHT * 2.0;

    let fields = [
        ("Cliente:", client.display_name()),
        ("Tipo de grano:", batch.grain_type.label().to_string()),
        (
            "Procesado el:",
            batch.processed_on.format("%Y-%m-%d").to_string(),
        ),
        ("Cantidad (kg):", batch.quantity_kg.to_string()),
        ("Humedad (%):", batch.humidity.to_string()),
        ("Impurezas (%):", batch.impurities.to_string()),
        ("Grano bueno (%):", optional_value(batch.good_grain)),
        ("Grano defectuoso (%):", optional_value(batch.defective_grain)),
    ];
    for (label, value) in fields {
        lines.push(TextLine {
            x: MARGIN,
            y,
            font: Font::Body,
            text: format!("{} {}", label, value),
        });
        y -= LINE_HEIGHT;
    }

    if !batch.notes.is_empty() {
        y -= LINE_HEIGHT;
        lines.push(TextLine {
            x: MARGIN,
            y,
            font: Font::Body,
            text: "Observaciones:".to_string(),
        });
        for note in split_lines(&batch.notes) {
            y -= LINE_HEIGHT;
            lines.push(TextLine {
                x: MARGIN + NOTES_INDENT,
                y,
                font: Font::Body,
                text: note.to_string(),
            });
        }
    }

    lines
}

fn optional_value(value: Option<rust_decimal::Decimal>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "None".to_string(),
    }
}

/// 按所有换行符拆分（`\r\n`、`\n`、`\r` 以及 Unicode 行分隔符），末尾换行不产生空行
pub fn split_lines(text: &str) -> Vec<&str> {
    static LINE_BREAK: OnceLock<Regex> = OnceLock::new();
    let re = LINE_BREAK.get_or_init(|| {
        Regex::new(r"\r\n|[\n\r\x0B\x0C\x1C\x1D\x1E\x{85}\x{2028}\x{2029}]")
            .expect("line break pattern is valid")
    });

    let mut parts: Vec<&str> = re.split(text).collect();
    if parts.last() == Some(&"") {
        parts.pop();
    }
    parts
}

/// WinAnsi 编码；超出 Latin-1 的字符替换为 `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect()
}

fn write_pdf(lines: &[TextLine]) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut operations = Vec::with_capacity(lines.len() * 5);
    for line in lines {
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(line.font.resource_name().to_vec()),
                Object::Integer(line.font.size()),
            ],
        ));
        operations.push(Operation::new(
            "Td",
            vec![Object::Real(line.x), Object::Real(line.y)],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(&line.text),
                StringFormat::Literal,
            )],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => Object::Array(vec![Object::Reference(page_id)]),
        "Count" => Object::Integer(1),
        "Resources" => resources_id,
        "MediaBox" => Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(PAGE_WIDTH),
            Object::Real(PAGE_HEIGHT),
        ]),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GrainType;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn client() -> Client {
        let mut client = Client::new(1, "jperez");
        client.first_name = "Juan".into();
        client.last_name = "Pérez".into();
        client
    }

    fn batch(notes: &str) -> QualityBatch {
        QualityBatch {
            id: 1,
            client_id: 1,
            lot_code: "L-001".into(),
            grain_type: GrainType::Maiz,
            processed_on: NaiveDate::from_ymd_opt(2026, 3, 7).unwrap(),
            quantity_kg: Decimal::new(1500_00, 2),
            humidity: Decimal::new(10_00, 2),
            impurities: Decimal::new(5_00, 2),
            good_grain: Some(Decimal::new(80_00, 2)),
            defective_grain: Some(Decimal::new(5_00, 2)),
            notes: notes.into(),
            delivered: false,
            created_at: Utc::now(),
        }
    }

    fn tj_strings(bytes: &[u8]) -> Vec<String> {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| {
                op.operands[0]
                    .as_str()
                    .unwrap()
                    .iter()
                    .map(|&b| b as char)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn fields_follow_fixed_order() {
        let lines = layout_lines(&batch(""), &client());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Informe de Calidad: Lote L-001",
                "Cliente: Juan Pérez",
                "Tipo de grano: Maíz",
                "Procesado el: 2026-03-07",
                "Cantidad (kg): 1500.00",
                "Humedad (%): 10.00",
                "Impurezas (%): 5.00",
                "Grano bueno (%): 80.00",
                "Grano defectuoso (%): 5.00",
            ]
        );
    }

    #[test]
    fn positions_use_margin_and_pitch() {
        let lines = layout_lines(&batch(""), &client());
        assert_eq!(lines[0].y, PAGE_HEIGHT - MARGIN);
        assert_eq!(lines[0].font, Font::Title);
        assert_eq!(lines[1].y, PAGE_HEIGHT - MARGIN - 2.0 * LINE_HEIGHT);
        assert_eq!(lines[2].y, lines[1].y - LINE_HEIGHT);
        assert!(lines.iter().all(|l| l.x == MARGIN));
    }

    #[test]
    fn observations_are_indented_after_a_gap() {
        let lines = layout_lines(&batch("Secado al sol\r\nSin plagas\rRevisado"), &client());
        let last_field = &lines[8];
        let heading = &lines[9];
        assert_eq!(heading.text, "Observaciones:");
        assert!((heading.y - (last_field.y - 2.0 * LINE_HEIGHT)).abs() < 1e-3);

        let notes: Vec<&TextLine> = lines[10..].iter().collect();
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].text, "Secado al sol");
        assert_eq!(notes[2].text, "Revisado");
        assert!(notes.iter().all(|l| l.x == MARGIN + NOTES_INDENT));
    }

    #[test]
    fn missing_percentage_prints_none() {
        let mut b = batch("");
        b.defective_grain = None;
        let lines = layout_lines(&b, &client());
        assert_eq!(lines[8].text, "Grano defectuoso (%): None");
    }

    #[test]
    fn split_lines_drops_only_trailing_break() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines("a\u{2028}b"), vec!["a", "b"]);
    }

    #[test]
    fn renders_single_page_pdf() {
        let doc = LayoutRenderer::new()
            .render(&batch("Secado al sol"), &client())
            .unwrap();
        assert!(doc.as_bytes().starts_with(b"%PDF-1.4"));

        let strings = tj_strings(doc.as_bytes());
        assert_eq!(strings[0], "Informe de Calidad: Lote L-001");
        assert_eq!(strings[1], "Cliente: Juan Pérez");
        assert_eq!(strings.last().unwrap(), "Secado al sol");
    }

    #[test]
    fn characters_outside_latin1_are_replaced() {
        assert_eq!(encode_win_ansi("Maíz ✓"), b"Ma\xedz ?".to_vec());
    }
}
