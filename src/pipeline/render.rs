//! PDF rasterisation: every page becomes a `DynamicImage` via pdfium.
//!
//! pdfium is a C++ library with thread-local state and no async story, so
//! the whole document is rendered inside one `spawn_blocking` call rather
//! than interleaved with runtime workers.
//!
//! Page geometry varies across issuers (A4, letter, long receipt-style
//! pages), so rendering targets a pixel width derived from the configured
//! DPI against a letter-class page instead of a raw DPI matrix. A generous
//! height ceiling accommodates tall pages without unbounded allocation; the
//! preprocessor applies the final size cap afterwards.

use crate::config::ExtractConfig;
use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Render width in pixels for the configured DPI, sized for an
/// 8.5-inch-wide page so small statement print keeps enough pixels.
fn target_width_px(dpi: u32) -> i32 {
    (dpi as i32) * 85 / 10
}

/// Rasterise all pages of the PDF, in page order.
pub async fn render_pages(
    pdf_path: &Path,
    config: &ExtractConfig,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let path = pdf_path.to_path_buf();
    let dpi = config.dpi;
    let password = config.password.clone();

    tokio::task::spawn_blocking(move || rasterize_document(&path, dpi, password.as_deref()))
        .await
        .map_err(|e| ExtractError::Internal(format!("render task panicked: {e}")))?
}

fn rasterize_document(
    pdf_path: &Path,
    dpi: u32,
    password: Option<&str>,
) -> Result<Vec<DynamicImage>, ExtractError> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| classify_open_error(e, pdf_path, password.is_some()))?;

    let pages = document.pages();
    if pages.len() == 0 {
        return Err(ExtractError::EmptyDocument {
            path: pdf_path.to_path_buf(),
        });
    }
    info!("Opened PDF with {} pages", pages.len());

    let width = target_width_px(dpi);
    let render_config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_maximum_height(width * 4);

    let mut images = Vec::with_capacity(pages.len() as usize);
    for (idx, page) in pages.iter().enumerate() {
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{e:?}"),
            })?;
        let image = bitmap.as_image();
        debug!("Page {}: {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
    }

    Ok(images)
}

/// Map a pdfium open failure onto the password/corruption taxonomy.
///
/// pdfium reports a password problem with the same error whether the
/// password was missing or wrong; `had_password` disambiguates.
fn classify_open_error(e: PdfiumError, path: &Path, had_password: bool) -> ExtractError {
    let detail = format!("{e:?}");
    if detail.to_ascii_lowercase().contains("password") {
        if had_password {
            ExtractError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            ExtractError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        ExtractError::CorruptPdf {
            path: path.to_path_buf(),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_width_scales_with_dpi() {
        assert_eq!(target_width_px(300), 2550);
        assert_eq!(target_width_px(72), 612);
    }

    #[test]
    fn password_errors_depend_on_whether_one_was_given() {
        let path = Path::new("x.pdf");
        let e = classify_open_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ), path, false);
        assert!(matches!(e, ExtractError::PasswordRequired { .. }));

        let e = classify_open_error(PdfiumError::PdfiumLibraryInternalError(
            PdfiumInternalError::PasswordError,
        ), path, true);
        assert!(matches!(e, ExtractError::WrongPassword { .. }));
    }
}
