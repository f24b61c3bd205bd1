//! Course rendering: lay a [`Course`] out and write it as a PDF with `lopdf`.
//!
//! The writer uses the three standard Helvetica faces with
//! `WinAnsiEncoding`, so no font files are embedded and no native library is
//! needed. No creation or modification dates are written: the same course and
//! layout always produce the same bytes.

use crate::config::LayoutConfig;
use crate::course::Course;
use crate::error::CourseError;
use crate::pipeline::fonts::{encode_win_ansi, Font};
use crate::pipeline::layout::{build_flow, paginate, PageLayout, PlacedLine};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const PRODUCER: &str = concat!("personallearn ", env!("CARGO_PKG_VERSION"));

/// Render a course to PDF bytes on A4 with 2 cm margins.
pub fn render(course: &Course) -> Result<Vec<u8>, CourseError> {
    render_with_layout(course, &LayoutConfig::default())
}

/// Render a course to PDF bytes with an explicit page geometry.
pub fn render_with_layout(
    course: &Course,
    layout: &LayoutConfig,
) -> Result<Vec<u8>, CourseError> {
    if course.title.trim().is_empty() {
        return Err(CourseError::RenderFailure {
            detail: "course has no title".into(),
        });
    }
    if layout.frame_width() <= 0.0 || layout.frame_height() <= 0.0 {
        return Err(CourseError::RenderFailure {
            detail: format!(
                "margins of {}pt leave no room on a {}x{}pt page",
                layout.margin, layout.page_width, layout.page_height
            ),
        });
    }

    let flow = build_flow(course);
    let pages = paginate(&flow, layout);
    debug!("{} layout blocks flowed onto {} pages", flow.len(), pages.len());

    let bytes = write_document(&course.title, &pages, layout)?;
    info!("Rendered '{}': {} pages, {} bytes", course.title, pages.len(), bytes.len());
    Ok(bytes)
}

/// Render a course given as an untyped JSON value.
///
/// A value missing required course fields is a [`CourseError::RenderFailure`]:
/// the caller handed the renderer something that is not a course.
pub fn render_json(value: &serde_json::Value) -> Result<Vec<u8>, CourseError> {
    let course = Course::deserialize(value).map_err(|e| CourseError::RenderFailure {
        detail: e.to_string(),
    })?;
    render(&course)
}

/// Render a course and write it to `path`.
///
/// The PDF is written to a sibling temporary file first and renamed into
/// place, so a failed write never leaves a truncated file at `path`.
pub fn render_to_file(course: &Course, path: &Path) -> Result<(), CourseError> {
    let bytes = render(course)?;
    write_atomic(path, &bytes)
}

/// [`render_json`], written to `path` the same way as [`render_to_file`].
///
/// Nothing is written when the value is not a course.
pub fn render_json_to_file(value: &serde_json::Value, path: &Path) -> Result<(), CourseError> {
    let bytes = render_json(value)?;
    write_atomic(path, &bytes)
}

pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CourseError> {
    let write_err = |source| CourseError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".part");
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, bytes).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        write_err(e)
    })?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── PDF writing ──────────────────────────────────────────────────────────

fn write_document(
    title: &str,
    pages: &[PageLayout],
    layout: &LayoutConfig,
) -> Result<Vec<u8>, CourseError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for font in Font::ALL {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), id);
    }

    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        Object::Real(layout.page_width),
        Object::Real(layout.page_height),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content_id = add_page_content(&mut doc, page)?;
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => fonts.clone() },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => text_string(title),
        "Producer" => Object::string_literal(PRODUCER),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| CourseError::RenderFailure {
            detail: format!("could not serialise PDF: {e}"),
        })?;
    Ok(buf)
}

fn add_page_content(doc: &mut Document, page: &PageLayout) -> Result<ObjectId, CourseError> {
    let operations: Vec<Operation> = page.lines.iter().flat_map(line_operations).collect();
    let content = Content { operations };
    let encoded = content.encode().map_err(|e| CourseError::RenderFailure {
        detail: format!("could not encode page content: {e}"),
    })?;
    Ok(doc.add_object(Stream::new(dictionary! {}, encoded)))
}

fn line_operations(line: &PlacedLine) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), Object::Real(line.size)],
        ),
        Operation::new(
            "rg",
            vec![
                Object::Real(line.color.0),
                Object::Real(line.color.1),
                Object::Real(line.color.2),
            ],
        ),
        Operation::new("Tw", vec![Object::Real(line.word_spacing)]),
        Operation::new("Td", vec![Object::Real(line.x), Object::Real(line.y)]),
        Operation::new(
            "Tj",
            vec![Object::String(
                encode_win_ansi(&line.text),
                StringFormat::Literal,
            )],
        ),
        Operation::new("ET", vec![]),
    ]
}

/// A PDF text string: literal for ASCII, UTF-16BE with BOM otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::tests::sample_course;
    use crate::pipeline::extract::extract_pages;

    #[test]
    fn output_is_a_pdf() {
        let bytes = render(&sample_course(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
    }

    #[test]
    fn rendering_is_byte_deterministic() {
        let course = sample_course(3);
        assert_eq!(render(&course).unwrap(), render(&course).unwrap());
    }

    #[test]
    fn one_page_per_unit_plus_cover() {
        let bytes = render(&sample_course(3)).unwrap();
        let pages = extract_pages(&bytes).unwrap();
        assert_eq!(pages.len(), 4);
    }

    #[test]
    fn text_survives_extraction() {
        let bytes = render(&sample_course(2)).unwrap();
        let pages = extract_pages(&bytes).unwrap();
        assert!(pages[0].contains("Cognitive Science 101"), "{:?}", pages[0]);
        assert!(pages[1].contains("Unit 1"), "{:?}", pages[1]);
        assert!(pages[1].contains("Review Quiz"));
        assert!(!pages[1].contains("Because B."));
    }

    #[test]
    fn blank_title_is_a_render_failure() {
        let mut course = sample_course(1);
        course.title = "   ".into();
        assert!(matches!(
            render(&course),
            Err(CourseError::RenderFailure { .. })
        ));
    }

    #[test]
    fn impossible_margins_are_rejected() {
        let layout = LayoutConfig {
            margin: 400.0,
            ..LayoutConfig::default()
        };
        assert!(matches!(
            render_with_layout(&sample_course(1), &layout),
            Err(CourseError::RenderFailure { .. })
        ));
    }

    #[test]
    fn json_without_title_is_a_render_failure() {
        let value = serde_json::json!({ "level": "Beginner", "language": "en", "units": [] });
        let err = render_json(&value).unwrap_err();
        assert!(matches!(err, CourseError::RenderFailure { .. }));
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn json_course_renders() {
        let value = serde_json::to_value(sample_course(1)).unwrap();
        let bytes = render_json(&value).unwrap();
        assert_eq!(extract_pages(&bytes).unwrap().len(), 2);
    }

    #[test]
    fn non_ascii_title_uses_utf16() {
        match text_string("Élan") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn writes_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("course.pdf");
        render_to_file(&sample_course(1), &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!dir.path().join("nested").join("course.pdf.part").exists());
    }

    #[test]
    fn json_course_is_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.pdf");
        let value = serde_json::to_value(sample_course(2)).unwrap();
        render_json_to_file(&value, &path).unwrap();
        assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF"));
        assert!(!dir.path().join("course.pdf.part").exists());
    }

    #[test]
    fn invalid_json_course_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course.pdf");
        let err = render_json_to_file(&serde_json::json!({"units": []}), &path).unwrap_err();
        assert!(matches!(err, CourseError::RenderFailure { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn failed_rename_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        // a non-empty directory cannot be replaced by a file
        let path = dir.path().join("taken");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), b"x").unwrap();

        let err = render_to_file(&sample_course(1), &path).unwrap_err();
        assert!(matches!(err, CourseError::OutputWriteFailed { .. }));
        assert!(!dir.path().join("taken.part").exists());
        assert!(path.join("keep").exists());
    }
}
