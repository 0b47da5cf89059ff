//! Inline annotation of DOCX filings
//!
//! Each finding is matched to the body paragraph (outside tables) whose text is
//! most similar to the finding's section preview. When the best score exceeds
//! the threshold, an italic run `  [COMMENT: <analysis>]` is appended to that
//! paragraph. Only `word/document.xml` is rewritten; every other part of the
//! package is copied byte for byte.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{Error, Result};
use crate::types::{FileType, Finding};

use super::similarity;

const DOCUMENT_PART: &str = "word/document.xml";

/// Result of annotating one document
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSummary {
    pub output_path: PathBuf,
    /// Findings attached to a paragraph
    pub annotated: usize,
    /// Findings with no paragraph above the threshold
    pub unmatched: usize,
}

/// A paragraph directly under `w:body`
#[derive(Debug, Clone, PartialEq)]
struct BodyParagraph {
    text: String,
    /// Byte offset of the closing `</w:p>`; `None` for `<w:p/>`
    end_offset: Option<usize>,
}

fn is_nested(stack: &[Vec<u8>], para_depth: usize) -> bool {
    stack
        .get(para_depth..)
        .is_some_and(|inner| inner.iter().any(|n| n.as_slice() == b"w:txbxContent"))
}

/// Scan the main document part for body-level paragraphs in document order
fn body_paragraphs(xml: &str) -> Result<Vec<BodyParagraph>> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut para_depth = 0usize;
    let mut in_text = false;

    loop {
        let offset = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let parent = stack.last().map(Vec::as_slice);
                if name.as_slice() == b"w:p" && current.is_none() && parent == Some(b"w:body".as_slice()) {
                    current = Some(String::new());
                    para_depth = stack.len();
                } else if name.as_slice() == b"w:t"
                    && current.is_some()
                    && parent == Some(b"w:r".as_slice())
                    && !is_nested(&stack, para_depth)
                {
                    in_text = true;
                }
                stack.push(name);
            }
            Event::End(e) => {
                stack.pop();
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" if current.is_some() && stack.len() == para_depth => {
                        paragraphs.push(BodyParagraph {
                            text: current.take().unwrap_or_default(),
                            end_offset: Some(offset),
                        });
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let parent = stack.last().map(Vec::as_slice);
                let in_run = current.is_some()
                    && parent == Some(b"w:r".as_slice())
                    && !is_nested(&stack, para_depth);
                match e.name().as_ref() {
                    b"w:p" if current.is_none() && parent == Some(b"w:body".as_slice()) => {
                        paragraphs.push(BodyParagraph {
                            text: String::new(),
                            end_offset: None,
                        });
                    }
                    b"w:tab" if in_run => {
                        if let Some(text) = current.as_mut() {
                            text.push('\t');
                        }
                    }
                    b"w:br" | b"w:cr" if in_run => {
                        if let Some(text) = current.as_mut() {
                            text.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) if in_text => {
                if let Some(text) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

/// Italic run carrying `text`; newlines become breaks and tabs become tabs
fn comment_run(text: &str) -> String {
    let mut run = String::from("<w:r><w:rPr><w:i/></w:rPr>");
    let mut segment = String::new();

    let flush = |segment: &mut String, run: &mut String| {
        if !segment.is_empty() {
            run.push_str("<w:t xml:space=\"preserve\">");
            run.push_str(&quick_xml::escape::escape(segment.as_str()));
            run.push_str("</w:t>");
            segment.clear();
        }
    };

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\t' => {
                flush(&mut segment, &mut run);
                run.push_str("<w:tab/>");
            }
            '\r' | '\n' => {
                flush(&mut segment, &mut run);
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                run.push_str("<w:br/>");
            }
            c if (c as u32) < 0x20 => {}
            c => segment.push(c),
        }
    }
    flush(&mut segment, &mut run);

    run.push_str("</w:r>");
    run
}

/// Insert fragments at byte offsets; fragments sharing an offset keep their order
fn splice(xml: &str, mut insertions: Vec<(usize, String)>) -> String {
    insertions.sort_by_key(|(offset, _)| *offset);
    let extra: usize = insertions.iter().map(|(_, s)| s.len()).sum();
    let mut out = String::with_capacity(xml.len() + extra);
    let mut cursor = 0;
    for (offset, fragment) in insertions {
        out.push_str(&xml[cursor..offset]);
        out.push_str(&fragment);
        cursor = offset;
    }
    out.push_str(&xml[cursor..]);
    out
}

/// Adds inline comment runs to DOCX filings
pub struct Annotator {
    threshold: f64,
}

impl Annotator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// `<stem>_annotated.docx` next to the input
    pub fn annotated_path(input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        input.with_file_name(format!("{}_annotated.docx", stem))
    }

    /// Index and score of the most similar non-empty paragraph; ties go to the earliest
    pub fn best_match<'a, I>(paragraphs: I, section: &str) -> Option<(usize, f64)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let section = section.to_lowercase();
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = 0.0;

        for (idx, text) in paragraphs.into_iter().enumerate() {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            let score = similarity::ratio(&text.to_lowercase(), &section);
            if score > best_score {
                best_score = score;
                best = Some((idx, score));
            }
        }

        best
    }

    /// Compute the annotated `document.xml`, returning it with the (annotated, unmatched) counts
    fn annotate_xml(&self, xml: &str, findings: &[Finding]) -> Result<(String, usize, usize)> {
        let mut paragraphs = body_paragraphs(xml)?;
        let mut insertions = Vec::new();
        let mut unmatched = 0;

        for finding in findings {
            let matched = Self::best_match(
                paragraphs.iter().map(|p| {
                    if p.end_offset.is_some() {
                        p.text.as_str()
                    } else {
                        ""
                    }
                }),
                &finding.section,
            );

            match matched {
                Some((idx, score)) if score > self.threshold => {
                    let comment = format!("  [COMMENT: {}]", finding.ai_analysis);
                    let paragraph = &mut paragraphs[idx];
                    if let Some(offset) = paragraph.end_offset {
                        insertions.push((offset, comment_run(&comment)));
                        // Later findings see the paragraph as it now reads
                        paragraph.text.push_str(&comment);
                    }
                }
                _ => {
                    tracing::warn!("No good match found for section snippet: {}", finding.section);
                    unmatched += 1;
                }
            }
        }

        let annotated = insertions.len();
        Ok((splice(xml, insertions), annotated, unmatched))
    }

    /// Write an annotated copy of `input` to `output`
    pub fn annotate(&self, input: &Path, findings: &[Finding], output: &Path) -> Result<AnnotationSummary> {
        if !input.is_file() {
            return Err(Error::annotation(format!("Input file not found: {}", input.display())));
        }
        if !FileType::from_path(input).supports_annotation() {
            return Err(Error::UnsupportedFileType(format!(
                "annotation requires a .docx file ({})",
                input.display()
            )));
        }

        tracing::info!("Loading DOCX: {}", input.display());
        let mut archive = ZipArchive::new(std::fs::File::open(input)?)?;

        let mut xml = String::new();
        archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;

        tracing::info!("Adding {} compliance comments...", findings.len());
        let (annotated_xml, annotated, unmatched) = self.annotate_xml(&xml, findings)?;

        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;
        let tmp = tempfile::NamedTempFile::new_in(&parent)?;
        {
            let mut writer = ZipWriter::new(tmp.as_file());
            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            for i in 0..archive.len() {
                let entry = archive.by_index_raw(i)?;
                if entry.name() == DOCUMENT_PART {
                    drop(entry);
                    writer.start_file(DOCUMENT_PART, options)?;
                    writer.write_all(annotated_xml.as_bytes())?;
                } else {
                    writer.raw_copy_file(entry)?;
                }
            }
            writer.finish()?;
        }
        tmp.persist(output).map_err(|e| Error::Io(e.error))?;

        tracing::info!("Saved annotated DOCX to: {}", output.display());
        Ok(AnnotationSummary {
            output_path: output.to_path_buf(),
            annotated,
            unmatched,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::FileParser;
    use crate::test_support::write_docx;

    const XML: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>"#,
        r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Article 1</w:t></w:r></w:p>"#,
        r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>In table</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        r#"<w:p><w:r><w:t xml:space="preserve">Tab</w:t><w:tab/><w:t>and &amp; break</w:t><w:br/></w:r></w:p>"#,
        r#"<w:p/>"#,
        r#"<w:sectPr/></w:body></w:document>"#,
    );

    fn finding(section: &str, analysis: &str) -> Finding {
        Finding::analyzed(section.to_string(), analysis.to_string(), None)
    }

    #[test]
    fn test_body_paragraphs_skip_tables() {
        let paragraphs = body_paragraphs(XML).unwrap();
        let texts: Vec<&str> = paragraphs.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["Article 1", "Tab\tand & break\n", ""]);

        let first_end = paragraphs[0].end_offset.unwrap();
        assert!(XML[first_end..].starts_with("</w:p>"));
        assert!(paragraphs[2].end_offset.is_none());
    }

    #[test]
    fn test_comment_run_escapes_and_breaks() {
        let run = comment_run("  [COMMENT: a < b\nnext]");
        assert_eq!(
            run,
            concat!(
                "<w:r><w:rPr><w:i/></w:rPr>",
                "<w:t xml:space=\"preserve\">  [COMMENT: a &lt; b</w:t>",
                "<w:br/>",
                "<w:t xml:space=\"preserve\">next]</w:t>",
                "</w:r>"
            )
        );
    }

    #[test]
    fn test_best_match_prefers_first_on_ties() {
        let paragraphs = ["", "Share capital", "Share capital"];
        let (idx, score) = Annotator::best_match(paragraphs, "share capital...").unwrap();
        assert_eq!(idx, 1);
        // 2 * 13 matched chars / (13 + 16)
        assert!((score - 26.0 / 29.0).abs() < 1e-9);
        assert!(Annotator::best_match(["", "  "], "anything").is_none());
    }

    #[test]
    fn test_annotate_xml_inserts_before_paragraph_end() {
        let annotator = Annotator::new(0.3);
        let (xml, annotated, unmatched) = annotator
            .annotate_xml(XML, &[finding("Article 1...", "Looks fine")])
            .unwrap();

        assert_eq!((annotated, unmatched), (1, 0));
        assert!(xml.contains(
            "<w:t>Article 1</w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t xml:space=\"preserve\">  [COMMENT: Looks fine]</w:t></w:r></w:p>"
        ));
        // Table paragraph untouched
        assert!(xml.contains("<w:t>In table</w:t></w:r></w:p></w:tc>"));
    }

    #[test]
    fn test_low_similarity_leaves_document_unchanged() {
        let annotator = Annotator::new(0.3);
        let (xml, annotated, unmatched) = annotator
            .annotate_xml(XML, &[finding("zzzz qqqq yyyy...", "Irrelevant")])
            .unwrap();

        assert_eq!((annotated, unmatched), (0, 1));
        assert_eq!(xml, XML);
    }

    #[test]
    fn test_threshold_is_strict() {
        // "ab" vs "abcd": 2*2/6 = 0.666...
        let xml = concat!(
            r#"<w:document xmlns:w="x"><w:body>"#,
            r#"<w:p><w:r><w:t>ab</w:t></w:r></w:p>"#,
            r#"</w:body></w:document>"#,
        );
        let exact = 2.0 * 2.0 / 6.0;
        let (out, annotated, _) = Annotator::new(exact).annotate_xml(xml, &[finding("abcd", "x")]).unwrap();
        assert_eq!(annotated, 0);
        assert_eq!(out, xml);

        let (_, annotated, _) = Annotator::new(exact - 1e-6).annotate_xml(xml, &[finding("abcd", "x")]).unwrap();
        assert_eq!(annotated, 1);
    }

    #[test]
    fn test_annotate_docx_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("resolution.docx");
        write_docx(
            &input,
            &[
                "Resolution of the shareholders of Example Holdings Ltd",
                "Jurisdiction: the UAE Federal Courts shall have exclusive jurisdiction.",
                "Signed by the directors",
            ],
        );

        let findings = vec![
            finding(
                "Jurisdiction: the UAE Federal Courts shall have exclusive jurisdiction....",
                "Should reference ADGM Courts",
            ),
            finding("completely unrelated text about zebras...", "n/a"),
        ];

        let output = Annotator::annotated_path(&input);
        assert_eq!(output, dir.path().join("resolution_annotated.docx"));

        let summary = Annotator::new(0.3).annotate(&input, &findings, &output).unwrap();
        assert_eq!(summary.annotated, 1);
        assert_eq!(summary.unmatched, 1);

        let parsed = FileParser::parse_path(&output).unwrap();
        let paragraphs: Vec<&str> = parsed.content.split("\n\n").collect();
        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], "Resolution of the shareholders of Example Holdings Ltd");
        assert_eq!(
            paragraphs[1],
            "Jurisdiction: the UAE Federal Courts shall have exclusive jurisdiction.  [COMMENT: Should reference ADGM Courts]"
        );
        assert_eq!(paragraphs[2], "Signed by the directors");

        // Input is left as it was
        let original = FileParser::parse_path(&input).unwrap();
        assert!(!original.content.contains("[COMMENT:"));
    }

    #[test]
    fn test_annotate_rejects_pdf_and_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let annotator = Annotator::new(0.3);

        let missing = annotator.annotate(&dir.path().join("nope.docx"), &[], &dir.path().join("out.docx"));
        assert!(matches!(missing, Err(Error::Annotation(_))));

        let pdf = dir.path().join("filing.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let result = annotator.annotate(&pdf, &[], &dir.path().join("out.docx"));
        assert!(matches!(result, Err(Error::UnsupportedFileType(_))));
    }
}
