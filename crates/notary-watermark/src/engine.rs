//! `WatermarkEngine`: parse, fetch the logo, stamp every page, serialize.

use async_trait::async_trait;
use lopdf::Document;
use tracing::{info, warn};

use notary_core::config::WatermarkConfig;
use notary_core::pipeline::ProvenanceEmbedder;
use notary_core::{NotaryError, NotaryResult};

use crate::logo::{decode_logo, LogoDecode, LogoFetch, LogoImage, LogoSource};
use crate::overlay::{check_structure, stamp_document, StampSummary};

#[derive(Debug, Clone)]
pub struct WatermarkEngine {
    config: WatermarkConfig,
    logo: LogoSource,
}

impl WatermarkEngine {
    pub fn new(config: WatermarkConfig, logo: LogoSource) -> Self {
        Self { config, logo }
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    pub fn logo_source(&self) -> &LogoSource {
        &self.logo
    }

    /// Fetch and decode the configured logo. Every failure degrades to `None`.
    pub async fn load_logo(&self) -> Option<LogoImage> {
        if self.logo.is_none() {
            return None;
        }
        let bytes = match self.logo.fetch().await {
            LogoFetch::Fetched(bytes) => bytes,
            LogoFetch::Unavailable(reason) => {
                warn!(source = %self.logo, %reason, "logo unavailable; stamping without it");
                return None;
            }
        };
        match decode_logo(&bytes) {
            LogoDecode::Decoded(img) => Some(img),
            LogoDecode::Unsupported => {
                warn!(source = %self.logo, bytes = bytes.len(), "logo format unsupported; stamping without it");
                None
            }
        }
    }

    /// Stamp `text` (and the logo, when available) on every page of `document`.
    ///
    /// Only an unreadable document is an error; logo problems are logged and
    /// skipped.
    pub async fn embed_provenance(&self, document: &[u8], text: &str) -> NotaryResult<Vec<u8>> {
        self.embed_with_summary(document, text).await.map(|(bytes, _)| bytes)
    }

    pub async fn embed_with_summary(
        &self,
        document: &[u8],
        text: &str,
    ) -> NotaryResult<(Vec<u8>, StampSummary)> {
        let mut doc = parse(document)?;
        let logo = self.load_logo().await;

        let summary = stamp_document(&mut doc, text, logo.as_ref(), &self.config)?;
        info!(
            pages = summary.pages,
            text_pages = summary.text_pages,
            logo_pages = summary.logo_pages,
            "provenance embedded"
        );

        let mut out = Vec::with_capacity(document.len() + 4096);
        doc.save_to(&mut out)
            .map_err(|e| NotaryError::unsupported_document(format!("serialize derivative: {e}")))?;
        Ok((out, summary))
    }
}

/// Parse bytes as a PDF with a usable page tree.
pub fn parse(document: &[u8]) -> NotaryResult<Document> {
    let doc = Document::load_mem(document)
        .map_err(|e| NotaryError::unsupported_document(format!("not a readable PDF: {e}")))?;
    check_structure(&doc)?;
    Ok(doc)
}

#[async_trait]
impl ProvenanceEmbedder for WatermarkEngine {
    async fn embed_provenance(&self, document: &[u8], text: &str) -> NotaryResult<Vec<u8>> {
        WatermarkEngine::embed_provenance(self, document, text).await
    }
}

#[cfg(test)]
mod tests {
    use notary_core::config::TextPolicy;
    use notary_core::ErrorKind;

    use super::*;
    use crate::logo::tests::png_bytes;
    use crate::overlay::media_box;
    use crate::overlay::tests::{contains, sample_document};

    fn sample_bytes() -> Vec<u8> {
        let (mut doc, _) = sample_document();
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    const MARK: &str = "File hash: 9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

    #[tokio::test]
    async fn derivative_keeps_pages_and_media_boxes() {
        let engine = WatermarkEngine::new(WatermarkConfig::default(), LogoSource::None);
        let out = engine.embed_provenance(&sample_bytes(), MARK).await.unwrap();

        let doc = Document::load_mem(&out).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        for page_id in pages.into_values() {
            assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 595.0, 842.0]);
            assert!(contains(&doc.get_page_content(page_id).unwrap(), MARK.as_bytes()));
        }
    }

    #[tokio::test]
    async fn broken_logo_degrades_to_text_only() {
        let engine = WatermarkEngine::new(
            WatermarkConfig::default(),
            LogoSource::Bytes(b"definitely not an image".to_vec()),
        );
        assert!(engine.load_logo().await.is_none());
        let (out, summary) = engine.embed_with_summary(&sample_bytes(), MARK).await.unwrap();
        assert_eq!(summary.logo_pages, 0);
        assert_eq!(summary.text_pages, 2);
        assert!(Document::load_mem(&out).is_ok());
    }

    #[tokio::test]
    async fn logo_is_embedded_when_decodable() {
        let engine = WatermarkEngine::new(WatermarkConfig::default(), LogoSource::Bytes(png_bytes(200)));
        let (out, summary) = engine.embed_with_summary(&sample_bytes(), MARK).await.unwrap();
        assert_eq!(summary.logo_pages, 2);

        let doc = Document::load_mem(&out).unwrap();
        let page_id = doc.get_pages()[&2];
        assert!(contains(&doc.get_page_content(page_id).unwrap(), b"/NtLogo Do"));
    }

    #[tokio::test]
    async fn missing_logo_with_legacy_policy_leaves_pages_unmarked() {
        let config = WatermarkConfig {
            text_policy: TextPolicy::WithLogoOnly,
            ..Default::default()
        };
        let engine = WatermarkEngine::new(config, LogoSource::File("/no/such/logo.png".into()));
        let out = engine.embed_provenance(&sample_bytes(), MARK).await.unwrap();

        let doc = Document::load_mem(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 2);
        for page_id in doc.get_pages().into_values() {
            assert!(!contains(&doc.get_page_content(page_id).unwrap(), b"File hash"));
        }
    }

    #[tokio::test]
    async fn garbage_is_unsupported_format() {
        let engine = WatermarkEngine::new(WatermarkConfig::default(), LogoSource::None);
        let err = engine.embed_provenance(b"hello, not a pdf", MARK).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDocumentFormat);

        let err = engine.embed_provenance(&[], MARK).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedDocumentFormat);
    }

    #[tokio::test]
    async fn usable_through_the_pipeline_trait() {
        let engine: Box<dyn ProvenanceEmbedder> =
            Box::new(WatermarkEngine::new(WatermarkConfig::default(), LogoSource::None));
        let out = engine.embed_provenance(&sample_bytes(), MARK).await.unwrap();
        assert!(out.starts_with(b"%PDF-"));
    }
}
