//! Presentation rendering as an Office Open XML (`.pptx`) package
//!
//! Each slide gets a full-bleed background, a brand-coloured title bar and
//! a bulleted body text box. The package contains the minimum parts
//! PowerPoint, Keynote and LibreOffice require: one master, one blank layout
//! and one theme.

use super::markdown::Slide;
use crate::error::{ForgeError, Result};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// 10in x 7.5in in EMU
const SLIDE_CX: i64 = 9_144_000;
const SLIDE_CY: i64 = 6_858_000;
const EMU_PER_INCH: f64 = 914_400.0;

const PRIMARY_HEX: &str = "016B61";
const SURFACE_HEX: &str = "E5E9C5";
const ACCENT_HEX: &str = "70B2B2";
const BODY_HEX: &str = "1F2A2A";

const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn emu(inches: f64) -> i64 {
    (inches * EMU_PER_INCH).round() as i64
}

/// Escape text for XML element content and attributes
fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters are not allowed in XML 1.0
            c if (c as u32) < 0x20 && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}

fn content_types(slide_count: usize) -> String {
    let mut slides = String::new();
    for i in 1..=slide_count {
        slides.push_str(&format!(
            "<Override PartName=\"/ppt/slides/slide{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slide+xml\"/>",
            i
        ));
    }
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
<Default Extension=\"xml\" ContentType=\"application/xml\"/>\
<Override PartName=\"/ppt/presentation.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml\"/>\
<Override PartName=\"/ppt/slideMasters/slideMaster1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml\"/>\
<Override PartName=\"/ppt/slideLayouts/slideLayout1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml\"/>\
<Override PartName=\"/ppt/theme/theme1.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.theme+xml\"/>\
{slides}\
<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
<Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
</Types>"
    )
}

fn root_rels() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/officeDocument\" Target=\"ppt/presentation.xml\"/>\
<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
<Relationship Id=\"rId3\" Type=\"{REL_BASE}/extended-properties\" Target=\"docProps/app.xml\"/>\
</Relationships>"
    )
}

fn app_props(slide_count: usize) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\">\
<Application>Lesson Forge</Application><Slides>{slide_count}</Slides>\
</Properties>"
    )
}

fn core_props(title: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
<dc:title>{}</dc:title><dc:creator>Lesson Forge</dc:creator>\
</cp:coreProperties>",
        xml_escape(title)
    )
}

fn presentation(slide_count: usize) -> String {
    let ids: String = (0..slide_count)
        .map(|i| format!("<p:sldId id=\"{}\" r:id=\"rId{}\"/>", 256 + i, i + 2))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:presentation xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\">\
<p:sldMasterIdLst><p:sldMasterId id=\"2147483648\" r:id=\"rId1\"/></p:sldMasterIdLst>\
<p:sldIdLst>{ids}</p:sldIdLst>\
<p:sldSz cx=\"{SLIDE_CX}\" cy=\"{SLIDE_CY}\" type=\"screen4x3\"/>\
<p:notesSz cx=\"{SLIDE_CY}\" cy=\"{SLIDE_CX}\"/>\
</p:presentation>"
    )
}

fn presentation_rels(slide_count: usize) -> String {
    let slides: String = (0..slide_count)
        .map(|i| {
            format!(
                "<Relationship Id=\"rId{}\" Type=\"{REL_BASE}/slide\" Target=\"slides/slide{}.xml\"/>",
                i + 2,
                i + 1
            )
        })
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideMaster\" Target=\"slideMasters/slideMaster1.xml\"/>\
{slides}\
<Relationship Id=\"rId{theme}\" Type=\"{REL_BASE}/theme\" Target=\"theme/theme1.xml\"/>\
</Relationships>",
        theme = slide_count + 2
    )
}

const EMPTY_TREE: &str = "<p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>\
</p:spTree></p:cSld>";

fn slide_master() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:sldMaster xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\">\
{EMPTY_TREE}\
<p:clrMap bg1=\"lt1\" tx1=\"dk1\" bg2=\"lt2\" tx2=\"dk2\" accent1=\"accent1\" accent2=\"accent2\" accent3=\"accent3\" \
accent4=\"accent4\" accent5=\"accent5\" accent6=\"accent6\" hlink=\"hlink\" folHlink=\"folHlink\"/>\
<p:sldLayoutIdLst><p:sldLayoutId id=\"2147483649\" r:id=\"rId1\"/></p:sldLayoutIdLst>\
</p:sldMaster>"
    )
}

fn slide_master_rels() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
<Relationship Id=\"rId2\" Type=\"{REL_BASE}/theme\" Target=\"../theme/theme1.xml\"/>\
</Relationships>"
    )
}

fn slide_layout() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:sldLayout xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\" type=\"blank\" preserve=\"1\">\
{EMPTY_TREE}\
<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr>\
</p:sldLayout>"
    )
}

fn slide_layout_rels() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideMaster\" Target=\"../slideMasters/slideMaster1.xml\"/>\
</Relationships>"
    )
}

fn theme() -> String {
    let solid = |scheme: &str| format!("<a:solidFill><a:schemeClr val=\"{scheme}\"/></a:solidFill>");
    let line = format!("<a:ln w=\"9525\">{}</a:ln>", solid("phClr"));
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<a:theme xmlns:a=\"{NS_A}\" name=\"Lesson Forge\"><a:themeElements>\
<a:clrScheme name=\"Lesson Forge\">\
<a:dk1><a:srgbClr val=\"{BODY_HEX}\"/></a:dk1><a:lt1><a:srgbClr val=\"FFFFFF\"/></a:lt1>\
<a:dk2><a:srgbClr val=\"{PRIMARY_HEX}\"/></a:dk2><a:lt2><a:srgbClr val=\"{SURFACE_HEX}\"/></a:lt2>\
<a:accent1><a:srgbClr val=\"{PRIMARY_HEX}\"/></a:accent1><a:accent2><a:srgbClr val=\"{ACCENT_HEX}\"/></a:accent2>\
<a:accent3><a:srgbClr val=\"9ECFD4\"/></a:accent3><a:accent4><a:srgbClr val=\"{SURFACE_HEX}\"/></a:accent4>\
<a:accent5><a:srgbClr val=\"4F6D7A\"/></a:accent5><a:accent6><a:srgbClr val=\"C0D6DF\"/></a:accent6>\
<a:hlink><a:srgbClr val=\"0563C1\"/></a:hlink><a:folHlink><a:srgbClr val=\"954F72\"/></a:folHlink>\
</a:clrScheme>\
<a:fontScheme name=\"Lesson Forge\">\
<a:majorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:majorFont>\
<a:minorFont><a:latin typeface=\"Calibri\"/><a:ea typeface=\"\"/><a:cs typeface=\"\"/></a:minorFont>\
</a:fontScheme>\
<a:fmtScheme name=\"Lesson Forge\">\
<a:fillStyleLst>{f}{f}{f}</a:fillStyleLst>\
<a:lnStyleLst>{line}{line}{line}</a:lnStyleLst>\
<a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle>\
<a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst>\
<a:bgFillStyleLst>{f}{f}{f}</a:bgFillStyleLst>\
</a:fmtScheme></a:themeElements></a:theme>",
        f = solid("phClr")
    )
}

fn shape(id: usize, name: &str, x: i64, y: i64, cx: i64, cy: i64, fill: Option<&str>, body: &str) -> String {
    let fill = match fill {
        Some(hex) => format!("<a:solidFill><a:srgbClr val=\"{hex}\"/></a:solidFill>"),
        None => "<a:noFill/>".to_string(),
    };
    format!(
        "<p:sp><p:nvSpPr><p:cNvPr id=\"{id}\" name=\"{name}\"/><p:cNvSpPr txBox=\"1\"/><p:nvPr/></p:nvSpPr>\
<p:spPr><a:xfrm><a:off x=\"{x}\" y=\"{y}\"/><a:ext cx=\"{cx}\" cy=\"{cy}\"/></a:xfrm>\
<a:prstGeom prst=\"rect\"><a:avLst/></a:prstGeom>{fill}</p:spPr>\
<p:txBody><a:bodyPr wrap=\"square\" lIns=\"182880\" rIns=\"182880\" anchor=\"ctr\"><a:normAutofit/></a:bodyPr><a:lstStyle/>{body}</p:txBody></p:sp>"
    )
}

fn run(text: &str, size_pt: u32, color: &str, bold: bool, italic: bool) -> String {
    format!(
        "<a:r><a:rPr lang=\"en-US\" sz=\"{}\" b=\"{}\" i=\"{}\" dirty=\"0\"><a:solidFill><a:srgbClr val=\"{}\"/></a:solidFill></a:rPr><a:t>{}</a:t></a:r>",
        size_pt * 100,
        u8::from(bold),
        u8::from(italic),
        color,
        xml_escape(text)
    )
}

fn slide_xml(slide: &Slide) -> String {
    let background = shape(2, "Background", 0, 0, SLIDE_CX, SLIDE_CY, Some(SURFACE_HEX), "<a:p><a:endParaRPr lang=\"en-US\"/></a:p>");

    let title = format!(
        "<a:p><a:pPr algn=\"ctr\"/>{}</a:p>",
        run(&slide.title.to_uppercase(), 36, "FFFFFF", true, false)
    );
    let title_bar = shape(3, "Title", 0, 0, SLIDE_CX, emu(1.5), Some(PRIMARY_HEX), &title);

    let mut paragraphs = String::new();
    for bullet in &slide.bullets {
        paragraphs.push_str(&format!(
            "<a:p><a:pPr marL=\"342900\" indent=\"-342900\"><a:buFont typeface=\"Arial\"/><a:buChar char=\"&#8226;\"/></a:pPr>{}</a:p>",
            run(bullet, 22, BODY_HEX, false, false)
        ));
    }
    if let Some(image) = &slide.image {
        paragraphs.push_str(&format!(
            "<a:p><a:pPr><a:buNone/></a:pPr>{}</a:p>",
            run(&format!("Image: {}", image), 16, PRIMARY_HEX, false, true)
        ));
    }

    let body = if paragraphs.is_empty() {
        String::new()
    } else {
        shape(4, "Body", emu(0.75), emu(2.0), emu(8.5), emu(5.0), None, &paragraphs)
    };

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<p:sld xmlns:a=\"{NS_A}\" xmlns:r=\"{NS_R}\" xmlns:p=\"{NS_P}\"><p:cSld><p:spTree>\
<p:nvGrpSpPr><p:cNvPr id=\"1\" name=\"\"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>\
<p:grpSpPr><a:xfrm><a:off x=\"0\" y=\"0\"/><a:ext cx=\"0\" cy=\"0\"/><a:chOff x=\"0\" y=\"0\"/><a:chExt cx=\"0\" cy=\"0\"/></a:xfrm></p:grpSpPr>\
{background}{title_bar}{body}\
</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
    )
}

fn slide_rels() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
<Relationship Id=\"rId1\" Type=\"{REL_BASE}/slideLayout\" Target=\"../slideLayouts/slideLayout1.xml\"/>\
</Relationships>"
    )
}

fn zip_err(e: impl std::fmt::Display) -> ForgeError {
    ForgeError::Document(format!("Failed to write presentation package: {}", e))
}

/// Render slides into `.pptx` bytes
///
/// # Errors
///
/// Returns `ForgeError::Document` if there are no slides or the package
/// cannot be written
///
/// # Examples
///
/// ```
/// use lesson_forge::documents::markdown::parse_slides;
/// use lesson_forge::documents::pptx::render_presentation;
///
/// let bytes = render_presentation(&parse_slides("Hello\n- world")).unwrap();
/// assert!(bytes.starts_with(b"PK"));
/// ```
pub fn render_presentation(slides: &[Slide]) -> Result<Vec<u8>> {
    if slides.is_empty() {
        return Err(ForgeError::Document("Presentation has no slides".to_string()).into());
    }

    let mut parts: Vec<(String, String)> = vec![
        ("[Content_Types].xml".to_string(), content_types(slides.len())),
        ("_rels/.rels".to_string(), root_rels()),
        ("docProps/app.xml".to_string(), app_props(slides.len())),
        ("docProps/core.xml".to_string(), core_props(&slides[0].title)),
        ("ppt/presentation.xml".to_string(), presentation(slides.len())),
        (
            "ppt/_rels/presentation.xml.rels".to_string(),
            presentation_rels(slides.len()),
        ),
        ("ppt/slideMasters/slideMaster1.xml".to_string(), slide_master()),
        (
            "ppt/slideMasters/_rels/slideMaster1.xml.rels".to_string(),
            slide_master_rels(),
        ),
        ("ppt/slideLayouts/slideLayout1.xml".to_string(), slide_layout()),
        (
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels".to_string(),
            slide_layout_rels(),
        ),
        ("ppt/theme/theme1.xml".to_string(), theme()),
    ];
    for (i, slide) in slides.iter().enumerate() {
        parts.push((format!("ppt/slides/slide{}.xml", i + 1), slide_xml(slide)));
        parts.push((format!("ppt/slides/_rels/slide{}.xml.rels", i + 1), slide_rels()));
    }

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, body) in &parts {
        writer.start_file(name.as_str(), options).map_err(zip_err)?;
        writer.write_all(body.as_bytes()).map_err(zip_err)?;
    }
    let cursor = writer.finish().map_err(zip_err)?;

    tracing::debug!("Rendered presentation with {} slide(s)", slides.len());
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::markdown::parse_slides;
    use std::io::Read;

    fn read_part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut out = String::new();
        file.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_package_contains_one_part_per_slide() {
        let slides = parse_slides("Intro\n- a\n---\nMiddle\n---\nEnd");
        let bytes = render_presentation(&slides).unwrap();
        let archive = zip::ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let names: Vec<&str> = archive.file_names().collect();
        for expected in [
            "[Content_Types].xml",
            "ppt/presentation.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide3.xml",
            "ppt/theme/theme1.xml",
        ] {
            assert!(names.contains(&expected), "missing {}", expected);
        }
        assert!(!names.contains(&"ppt/slides/slide4.xml"));
        assert!(read_part(&bytes, "[Content_Types].xml").contains("/ppt/slides/slide3.xml"));
    }

    #[test]
    fn test_slide_text_is_escaped() {
        let slides = parse_slides("Q&A <time>\n- \"Why?\" & 'how'");
        let bytes = render_presentation(&slides).unwrap();
        let xml = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains("Q&amp;A &lt;TIME&gt;"));
        assert!(xml.contains("&quot;Why?&quot; &amp; &apos;how&apos;"));
    }

    #[test]
    fn test_presentation_lists_every_slide() {
        let slides = parse_slides("A\n---\nB");
        let bytes = render_presentation(&slides).unwrap();
        let xml = read_part(&bytes, "ppt/presentation.xml");
        assert!(xml.contains("<p:sldId id=\"256\" r:id=\"rId2\"/>"));
        assert!(xml.contains("<p:sldId id=\"257\" r:id=\"rId3\"/>"));
        let rels = read_part(&bytes, "ppt/_rels/presentation.xml.rels");
        assert!(rels.contains("Id=\"rId4\""));
        assert!(rels.contains("theme/theme1.xml"));
    }

    #[test]
    fn test_image_note_rendered() {
        let slides = parse_slides("Animals\nIMAGE: a cat");
        let bytes = render_presentation(&slides).unwrap();
        let xml = read_part(&bytes, "ppt/slides/slide1.xml");
        assert!(xml.contains("Image: a cat"));
    }

    #[test]
    fn test_no_slides_is_error() {
        assert!(render_presentation(&[]).is_err());
    }

    #[test]
    fn test_xml_escape_drops_control_chars() {
        assert_eq!(xml_escape("a\u{0007}b"), "ab");
    }
}
