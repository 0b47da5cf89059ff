//! PDF and DOCX text extraction

use sha2::{Digest, Sha256};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{FileType, ParsedDocument};

/// Normalize characters that PDF fonts commonly emit so keyword matching
/// sees plain ASCII punctuation.
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{2010}', "-") // Hyphen
        .replace('\u{2011}', "-") // Non-breaking hyphen
        .replace('\u{2013}', "-") // En dash
        .replace('\u{2014}', "--") // Em dash
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2022}', "* ")
        .replace('\u{2026}', "...")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
}

/// Trim every line and collapse runs of blank lines into a single blank line,
/// so paragraph breaks survive as `\n\n`.
fn collapse_blank_lines(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            if !previous_blank {
                out.push("");
            }
            previous_blank = true;
        } else {
            out.push(line);
            previous_blank = false;
        }
    }

    out.join("\n").trim().to_string()
}

/// PDF and DOCX parser
pub struct FileParser;

impl FileParser {
    /// Parse a file on disk
    pub fn parse_path(path: &Path) -> Result<ParsedDocument> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        if !path.exists() {
            return Err(Error::file_parse(filename, "File not found"));
        }

        let file_type = FileType::from_path(path);
        if !file_type.is_supported() {
            let ext = path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            return Err(Error::UnsupportedFileType(format!("{} ({})", ext, filename)));
        }

        tracing::info!("Parsing document: {}", filename);
        let data = std::fs::read(path)?;
        Self::parse(&filename, &data)
    }

    /// Parse raw bytes based on the filename's extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let extension = Path::new(filename)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let parsed = match FileType::from_extension(&extension) {
            FileType::Pdf => Self::parse_pdf(filename, data)?,
            FileType::Docx => Self::parse_docx(filename, data)?,
            _ => {
                return Err(Error::UnsupportedFileType(format!(
                    "{} ({})",
                    extension, filename
                )))
            }
        };

        if parsed.content.trim().is_empty() {
            return Err(Error::EmptyDocument(filename.to_string()));
        }

        tracing::debug!(
            "Extracted {} chars from {} (hash {})",
            parsed.content.chars().count(),
            filename,
            &parsed.content_hash[..12]
        );

        Ok(parsed)
    }

    /// Extract PDF text with a sync timeout to prevent hangs on problematic fonts
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(Duration::from_secs(60)) {
            Ok(Ok(text)) => {
                let _ = handle.join();
                Ok(text)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                tracing::warn!("pdf-extract failed on {}: {}, trying fallback", filename, e);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                tracing::error!("PDF extraction timeout after 60s for {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!("PDF extraction thread crashed for {}", filename);
                Self::extract_pdf_text_fallback(filename, data)
            }
        }
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let raw = Self::extract_pdf_with_timeout(filename, data)?;
        let content = collapse_blank_lines(&cleanup_pdf_text(&raw));

        Ok(ParsedDocument {
            file_type: FileType::Pdf,
            content_hash: hash_content(&content),
            content,
        })
    }

    /// Fallback PDF text extraction using lopdf directly
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut pages_text = Vec::new();
        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => {
                    let text = Self::extract_text_from_content(&content);
                    if !text.trim().is_empty() {
                        pages_text.push(text);
                    }
                }
                Err(e) => {
                    tracing::debug!("Could not get content for page {}: {}", page_num, e);
                }
            }
        }

        if pages_text.is_empty() {
            tracing::warn!("Fallback extraction produced no text for {}", filename);
        }

        Ok(pages_text.join("\n"))
    }

    /// Extract text from PDF content stream bytes (text between BT/ET operators)
    fn extract_text_from_content(content: &[u8]) -> String {
        let content_str = String::from_utf8_lossy(content);
        let mut text = String::new();
        let mut in_text_block = false;
        let mut current_text = String::new();

        for line in content_str.lines() {
            let line = line.trim();

            if line == "BT" {
                in_text_block = true;
                continue;
            }

            if line == "ET" {
                in_text_block = false;
                if !current_text.is_empty() {
                    text.push_str(&current_text);
                    text.push('\n');
                    current_text.clear();
                }
                continue;
            }

            if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        let decoded = line[start + 1..end]
                            .replace("\\n", "\n")
                            .replace("\\r", "\r")
                            .replace("\\t", "\t")
                            .replace("\\(", "(")
                            .replace("\\)", ")")
                            .replace("\\\\", "\\");
                        current_text.push_str(&decoded);
                    }
                }
            }
        }

        text
    }

    /// Parse DOCX document; each non-empty body paragraph becomes its own
    /// `\n\n`-separated block.
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut paragraphs = Vec::new();

        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(p) = child {
                let mut text = String::new();
                push_paragraph_text(&p.children, &mut text);
                // Tables are skipped, matching body-paragraph annotation
                if !text.trim().is_empty() {
                    paragraphs.push(text);
                }
            }
        }

        let content = paragraphs.join("\n\n");

        Ok(ParsedDocument {
            file_type: FileType::Docx,
            content_hash: hash_content(&content),
            content,
        })
    }
}

/// Text of runs, hyperlinks and insertions; tabs become `\t`, breaks `\n`
fn push_paragraph_text(children: &[docx_rs::ParagraphChild], out: &mut String) {
    use docx_rs::{InsertChild, ParagraphChild};

    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, out),
            ParagraphChild::Hyperlink(link) => push_paragraph_text(&link.children, out),
            ParagraphChild::Insert(insert) => {
                for child in &insert.children {
                    if let InsertChild::Run(run) = child {
                        push_run_text(run, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(run: &docx_rs::Run, out: &mut String) {
    use docx_rs::RunChild;

    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) | RunChild::PTab(_) => out.push('\t'),
            RunChild::Break(_) | RunChild::CarriageReturn(_) => out.push('\n'),
            _ => {}
        }
    }
}

/// Hash content for change detection
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_docx;

    #[test]
    fn test_collapse_blank_lines_keeps_paragraph_breaks() {
        let text = "  Article 1  \n\n\n\nShares\n   \nArticle 2\n";
        assert_eq!(collapse_blank_lines(text), "Article 1\n\nShares\n\nArticle 2");
    }

    #[test]
    fn test_cleanup_pdf_text_normalizes_hyphens() {
        let text = "Non\u{2011}Financial Services\u{00A0}Checklist\0";
        assert_eq!(cleanup_pdf_text(text), "Non-Financial Services Checklist");
    }

    #[test]
    fn test_parse_docx_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.docx");
        write_docx(&path, &["Articles of Association", "", "The company is a private company limited by shares."]);

        let parsed = FileParser::parse_path(&path).unwrap();
        assert_eq!(parsed.file_type, FileType::Docx);
        assert_eq!(
            parsed.content,
            "Articles of Association\n\nThe company is a private company limited by shares."
        );
        assert_eq!(parsed.content_hash.len(), 64);
    }

    #[test]
    fn test_parse_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.odt");
        std::fs::write(&path, b"hello").unwrap();

        let err = FileParser::parse_path(&path).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn test_parse_missing_file() {
        let err = FileParser::parse_path(Path::new("/nonexistent/filing.pdf")).unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn test_parse_empty_docx_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.docx");
        write_docx(&path, &["", "   "]);

        let err = FileParser::parse_path(&path).unwrap_err();
        assert!(matches!(err, Error::EmptyDocument(_)));
    }

    #[test]
    fn test_parse_docx_keeps_hyperlink_tab_and_break_text() {
        use docx_rs::{BreakType, Docx, Hyperlink, HyperlinkType, Paragraph, Run};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jurisdiction.docx");
        let paragraph = Paragraph::new()
            .add_run(Run::new().add_text("Disputes go to the "))
            .add_hyperlink(
                Hyperlink::new("https://www.adgm.com/courts", HyperlinkType::External)
                    .add_run(Run::new().add_text("ADGM Courts")),
            )
            .add_run(
                Run::new()
                    .add_text(" Clause")
                    .add_tab()
                    .add_text("5")
                    .add_break(BreakType::TextWrapping)
                    .add_text("end"),
            );
        let file = std::fs::File::create(&path).unwrap();
        Docx::new().add_paragraph(paragraph).build().pack(file).unwrap();

        let parsed = FileParser::parse_path(&path).unwrap();
        assert_eq!(parsed.content, "Disputes go to the ADGM Courts Clause\t5\nend");
    }

    #[test]
    fn test_corrupt_docx_is_parse_error() {
        let err = FileParser::parse("broken.docx", b"not a zip archive").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }
}
