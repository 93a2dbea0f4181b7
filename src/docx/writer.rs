use chrono::{Datelike, Timelike, Utc};
use quick_xml::escape::escape;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::Path;
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::error::DocxError;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:rPr><w:sz w:val="22"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:spacing w:before="240" w:after="120"/><w:outlineLvl w:val="0"/></w:pPr><w:rPr><w:b/><w:sz w:val="32"/></w:rPr></w:style></w:styles>"#;

/// Write a .docx with a level-1 heading followed by one paragraph per entry
pub fn write_summary<S: AsRef<str>>(
    path: &Path,
    heading: &str,
    paragraphs: &[S],
) -> Result<(), DocxError> {
    let file = File::create(path).map_err(|source| DocxError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    write_to(file, heading, paragraphs)?;
    info!(path = %path.display(), "Summary saved");
    Ok(())
}

/// Write the package to any seekable sink
pub fn write_to<W: Write + Seek, S: AsRef<str>>(
    sink: W,
    heading: &str,
    paragraphs: &[S],
) -> Result<W, DocxError> {
    let mut zip = ZipWriter::new(sink);

    let now = chrono::Local::now();
    let options: FileOptions<'_, ()> = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .last_modified_time(
            zip::DateTime::from_date_and_time(
                now.year() as u16,
                now.month() as u8,
                now.day() as u8,
                now.hour() as u8,
                now.minute() as u8,
                now.second() as u8,
            )
            .unwrap_or_default(),
        );

    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("docProps/core.xml", core_properties(heading)),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.to_string()),
        ("word/styles.xml", STYLES.to_string()),
        ("word/document.xml", document_xml(heading, paragraphs)),
    ];

    for (name, content) in parts {
        zip.start_file(name, options)?;
        zip.write_all(content.as_bytes())?;
    }

    Ok(zip.finish()?)
}

fn document_xml<S: AsRef<str>>(heading: &str, paragraphs: &[S]) -> String {
    let mut body = String::new();

    body.push_str(r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>"#);
    push_run(&mut body, heading);
    body.push_str("</w:p>");

    for paragraph in paragraphs {
        body.push_str("<w:p>");
        push_run(&mut body, paragraph.as_ref());
        body.push_str("</w:p>");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}<w:sectPr/></w:body></w:document>"#,
        body
    )
}

fn push_run(out: &mut String, text: &str) {
    out.push_str(r#"<w:r><w:t xml:space="preserve">"#);
    out.push_str(&escape(text));
    out.push_str("</w:t></w:r>");
}

fn core_properties(title: &str) -> String {
    let created = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><dc:title>{}</dc:title><dc:creator>docdigest v{}</dc:creator><dcterms:created xsi:type="dcterms:W3CDTF">{}</dcterms:created></cp:coreProperties>"#,
        escape(title),
        env!("CARGO_PKG_VERSION"),
        created
    )
}
