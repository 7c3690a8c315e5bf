//! Document, ebook and spreadsheet conversion.
//!
//! Every pair is delegated to an external tool:
//!
//! - `pandoc` writes markdown, HTML, DOCX, EPUB, PDF and plain text
//! - Calibre's `ebook-convert` handles the Kindle/FB2 family
//! - Ghostscript recompresses PDFs
//! - poppler's `pdftotext` extracts PDF text for markdown output
//! - LibreOffice (`soffice`) converts between CSV and Excel workbooks
//!
//! Some pairs need two hops (markdown to MOBI goes through EPUB). The
//! intermediate file lives in a temporary directory that is removed when the
//! conversion finishes, successful or not.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

use super::command::{ensure_input, ensure_output, ExternalTool};
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::extension::{extension_of, normalize_extension};
use super::options::{ConversionOptions, QualityPreset, EBOOK_ARGS, PANDOC_ARGS};
use super::traits::Converter;

const SOURCES: &[&str] = &[
    ".pdf", ".md", ".html", ".docx", ".epub", ".mobi", ".azw", ".azw3", ".fb2", ".csv", ".xlsx",
    ".xls",
];

const EBOOKS: &[&str] = &[".epub", ".mobi", ".azw", ".azw3", ".fb2"];

const PANDOC_HINT: &str = "please install Pandoc to convert documents (https://pandoc.org)";
const CALIBRE_HINT: &str =
    "please install Calibre to convert ebook formats (https://calibre-ebook.com)";
const GHOSTSCRIPT_HINT: &str =
    "please install Ghostscript to compress PDFs (https://ghostscript.com)";
const PDFTOTEXT_HINT: &str =
    "please install poppler-utils to extract PDF text (https://poppler.freedesktop.org)";
const SOFFICE_HINT: &str =
    "please install LibreOffice to convert spreadsheets (https://www.libreoffice.org)";

fn is_ebook(ext: &str) -> bool {
    EBOOKS.contains(&ext)
}

/// How a (source, target) pair is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// `pdftotext`, then a `# <file name>` heading is prepended.
    PdfToMarkdown,
    /// Ghostscript `pdfwrite` re-encode.
    CompressPdf,
    /// A single pandoc call.
    Pandoc,
    /// pandoc to a temporary EPUB, then `ebook-convert`.
    PandocViaEpub,
    /// A single `ebook-convert` call.
    Calibre,
    /// `ebook-convert` to temporary HTML, then pandoc to markdown.
    CalibreViaHtml,
    /// `soffice --headless --convert-to`.
    Spreadsheet,
}

/// Routing table. `None` means the pair is not supported.
fn route(source_ext: &str, target_ext: &str) -> Option<Route> {
    let (src, tgt) = (source_ext, target_ext);
    match src {
        ".pdf" => match tgt {
            ".md" => Some(Route::PdfToMarkdown),
            ".pdf" => Some(Route::CompressPdf),
            _ => None,
        },
        ".md" => match tgt {
            ".html" | ".pdf" | ".docx" | ".epub" => Some(Route::Pandoc),
            t if is_ebook(t) => Some(Route::PandocViaEpub),
            _ => None,
        },
        ".html" => match tgt {
            ".md" | ".docx" | ".epub" => Some(Route::Pandoc),
            t if is_ebook(t) => Some(Route::PandocViaEpub),
            _ => None,
        },
        ".docx" => match tgt {
            ".md" | ".html" | ".txt" => Some(Route::Pandoc),
            _ => None,
        },
        ".csv" => match tgt {
            ".xlsx" | ".xls" => Some(Route::Spreadsheet),
            _ => None,
        },
        ".xlsx" | ".xls" => match tgt {
            ".csv" => Some(Route::Spreadsheet),
            _ => None,
        },
        ".epub" => match tgt {
            ".md" => Some(Route::Pandoc),
            ".pdf" | ".html" | ".txt" => Some(Route::Calibre),
            t if is_ebook(t) && t != src => Some(Route::Calibre),
            _ => None,
        },
        s if is_ebook(s) => match tgt {
            ".md" => Some(Route::CalibreViaHtml),
            ".pdf" | ".html" | ".txt" => Some(Route::Calibre),
            t if is_ebook(t) && t != s => Some(Route::Calibre),
            _ => None,
        },
        _ => None,
    }
}

/// Converts documents, ebooks and spreadsheets by delegating to external tools.
#[derive(Debug, Clone)]
pub struct DocumentConverter {
    pandoc: ExternalTool,
    ebook_convert: ExternalTool,
    ghostscript: ExternalTool,
    pdftotext: ExternalTool,
    soffice: ExternalTool,
}

impl DocumentConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            pandoc: ExternalTool::new("pandoc", &config.pandoc_path, PANDOC_HINT),
            ebook_convert: ExternalTool::new(
                "ebook-convert",
                &config.ebook_convert_path,
                CALIBRE_HINT,
            ),
            ghostscript: ExternalTool::new("gs", &config.ghostscript_path, GHOSTSCRIPT_HINT),
            pdftotext: ExternalTool::new("pdftotext", &config.pdftotext_path, PDFTOTEXT_HINT),
            soffice: ExternalTool::new("soffice", &config.soffice_path, SOFFICE_HINT),
        }
    }

    pub(crate) fn pandoc_args(
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Vec<String> {
        let mut args = vec![
            source.to_string_lossy().into_owned(),
            "-o".to_string(),
            target.to_string_lossy().into_owned(),
        ];
        match extension_of(target).as_str() {
            ".md" => args.extend(["-t".to_string(), "gfm".to_string()]),
            ".txt" => args.extend(["-t".to_string(), "plain".to_string()]),
            ".html" => {
                let title = source
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                args.push("--standalone".to_string());
                args.extend(["--metadata".to_string(), format!("pagetitle={title}")]);
            }
            _ => {}
        }
        args.extend(options.extra_args(PANDOC_ARGS));
        args
    }

    pub(crate) fn ebook_args(
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Vec<String> {
        let mut args = vec![
            source.to_string_lossy().into_owned(),
            target.to_string_lossy().into_owned(),
        ];
        args.extend(options.extra_args(EBOOK_ARGS));
        args
    }

    pub(crate) fn ghostscript_args(
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Vec<String> {
        let settings = match options.quality_preset() {
            Some(QualityPreset::High) => "/prepress",
            Some(QualityPreset::Compact) => "/screen",
            Some(QualityPreset::Balanced) | None => "/ebook",
        };
        vec![
            "-sDEVICE=pdfwrite".to_string(),
            "-dCompatibilityLevel=1.4".to_string(),
            format!("-dPDFSETTINGS={settings}"),
            "-dNOPAUSE".to_string(),
            "-dQUIET".to_string(),
            "-dBATCH".to_string(),
            format!("-sOutputFile={}", target.display()),
            source.to_string_lossy().into_owned(),
        ]
    }

    pub(crate) fn markdown_from_pdf_text(source: &Path, text: &str) -> Result<String, ConverterError> {
        if text.trim().is_empty() {
            return Err(ConverterError::conversion_failed(
                "no text content found in PDF (might be image-based)",
                None,
            ));
        }
        let name = source
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("# {name}\n\n{text}"))
    }

    fn scratch_dir() -> Result<TempDir, ConverterError> {
        Ok(tempfile::Builder::new().prefix("golter_doc").tempdir()?)
    }

    async fn pdf_to_markdown(&self, source: &Path, target: &Path) -> Result<(), ConverterError> {
        let source_arg = source.to_string_lossy().into_owned();
        let text = self
            .pdftotext
            .run([source_arg.as_str(), "-layout", "-enc", "UTF-8", "-"])
            .await?;
        let markdown = Self::markdown_from_pdf_text(source, &text)?;
        tokio::fs::write(target, markdown).await?;
        Ok(())
    }

    async fn spreadsheet(&self, source: &Path, target: &Path) -> Result<(), ConverterError> {
        let scratch = Self::scratch_dir()?;
        let format = extension_of(target).trim_start_matches('.').to_string();
        self.soffice
            .run([
                "--headless".to_string(),
                "--convert-to".to_string(),
                format.clone(),
                "--outdir".to_string(),
                scratch.path().to_string_lossy().into_owned(),
                source.to_string_lossy().into_owned(),
            ])
            .await?;

        // soffice names its output after the input stem
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let produced = scratch.path().join(format!("{stem}.{format}"));
        ensure_output(&produced).await?;
        tokio::fs::copy(&produced, target).await?;
        Ok(())
    }

    async fn two_hop(
        &self,
        source: &Path,
        target: &Path,
        intermediate_ext: &str,
        options: &ConversionOptions,
        first: Route,
        second: Route,
    ) -> Result<(), ConverterError> {
        let scratch = Self::scratch_dir()?;
        let intermediate: PathBuf = scratch.path().join(format!("temp{intermediate_ext}"));
        debug!(intermediate = %intermediate.display(), "converting via intermediate file");

        self.single(source, &intermediate, options, first).await?;
        ensure_output(&intermediate).await?;
        self.single(&intermediate, target, options, second).await
    }

    async fn single(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
        route: Route,
    ) -> Result<(), ConverterError> {
        match route {
            Route::Pandoc => {
                self.pandoc
                    .run(Self::pandoc_args(source, target, options))
                    .await?;
            }
            Route::Calibre => {
                self.ebook_convert
                    .run(Self::ebook_args(source, target, options))
                    .await?;
            }
            Route::CompressPdf => {
                self.ghostscript
                    .run(Self::ghostscript_args(source, target, options))
                    .await?;
            }
            Route::PdfToMarkdown => self.pdf_to_markdown(source, target).await?,
            Route::Spreadsheet => self.spreadsheet(source, target).await?,
            Route::PandocViaEpub | Route::CalibreViaHtml => {
                return Err(ConverterError::unsupported(
                    extension_of(source),
                    extension_of(target),
                ))
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Converter for DocumentConverter {
    fn name(&self) -> &str {
        "Document Converter"
    }

    fn can_convert(&self, source_ext: &str, target_ext: &str) -> bool {
        route(&normalize_extension(source_ext), &normalize_extension(target_ext)).is_some()
    }

    fn supported_source_extensions(&self) -> BTreeSet<String> {
        SOURCES.iter().map(|s| s.to_string()).collect()
    }

    fn supported_target_formats(&self, source_ext: &str) -> BTreeSet<String> {
        let src = normalize_extension(source_ext);
        let targets: &[&str] = match src.as_str() {
            ".pdf" => &[".md", ".pdf"],
            ".md" => &[
                ".html", ".pdf", ".docx", ".epub", ".mobi", ".azw", ".azw3", ".fb2",
            ],
            ".html" => &[".md", ".docx", ".epub", ".mobi", ".azw", ".azw3", ".fb2"],
            ".docx" => &[".md", ".html", ".txt"],
            ".csv" => &[".xlsx"],
            ".xlsx" | ".xls" => &[".csv"],
            ".epub" => &[".pdf", ".md", ".html", ".mobi", ".azw", ".azw3", ".fb2", ".txt"],
            ".mobi" | ".azw" | ".azw3" | ".fb2" => &[
                ".epub", ".mobi", ".azw", ".azw3", ".fb2", ".pdf", ".html", ".txt", ".md",
            ],
            _ => &[],
        };
        // ebook to the same ebook format is not a conversion
        targets
            .iter()
            .filter(|t| !(is_ebook(t) && **t == src.as_str()))
            .map(|t| t.to_string())
            .collect()
    }

    async fn convert(
        &self,
        source: &Path,
        target: &Path,
        options: &ConversionOptions,
    ) -> Result<(), ConverterError> {
        let (source_ext, target_ext) = (extension_of(source), extension_of(target));
        let Some(route) = route(&source_ext, &target_ext) else {
            return Err(ConverterError::unsupported(source_ext, target_ext));
        };
        ensure_input(source).await?;
        debug!(?route, source = %source.display(), target = %target.display(), "document conversion");

        match route {
            Route::PandocViaEpub => {
                self.two_hop(source, target, ".epub", options, Route::Pandoc, Route::Calibre)
                    .await?
            }
            Route::CalibreViaHtml => {
                self.two_hop(source, target, ".html", options, Route::Calibre, Route::Pandoc)
                    .await?
            }
            single => self.single(source, target, options, single).await?,
        }
        ensure_output(target).await
    }
}
