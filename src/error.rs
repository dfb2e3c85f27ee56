//! Error types for the scrape-rewrite-deliver pipeline.
//!
//! Each pipeline stage owns its error enum so the runner can tell a
//! run-aborting failure (the landing page fetch) apart from the per-article
//! failures it logs and skips past:
//!
//! - [`FetchError`]: HTTP status or transport problems from [`crate::fetch`]
//! - [`ImageError`]: image acquisition problems, degrade to "no image"
//! - [`TransformError`]: paraphrase backend problems, degrade to the original text
//! - [`DeliveryError`]: SMTP assembly or transmission problems, fatal for one article

use reqwest::StatusCode;
use thiserror::Error;
use url::Url;

/// A failed page or byte fetch.
///
/// Non-success HTTP statuses and network-level failures are reported as
/// distinct variants so callers can log them separately. Retrying is the
/// caller's decision, not the fetcher's.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status code.
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },

    /// The request never produced a usable response (timeout, DNS failure,
    /// connection reset, body read error).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub(crate) fn transport(url: &Url, source: reqwest::Error) -> Self {
        FetchError::Transport { url: url.to_string(), source }
    }
}

/// A failed image resolution.
///
/// None of these abort an article. The resolver logs the failure and the
/// payload ships without an image.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The bytes decoded to a format outside the configured allow-list.
    #[error("image format {0:?} is not in the allow-list")]
    UnsupportedFormat(image::ImageFormat),

    /// The bytes could not be decoded as an image at all.
    #[error("image bytes could not be decoded: {0}")]
    Decode(#[from] image::ImageError),

    /// An inline reference that is not a base64 `data:` URI.
    #[error("malformed data URI")]
    MalformedDataUri,

    /// The base64 payload of an inline reference did not decode.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Fetching a remote reference failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Writing the accepted image to the spool directory failed.
    #[error("failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

/// A failed paraphrase call.
///
/// The rewriter treats every variant the same way: log it and deliver the
/// original text unchanged.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The endpoint answered with a non-success status code.
    #[error("paraphrase endpoint returned status {0}")]
    Api(StatusCode),

    /// The request failed in transit or the response body was not the
    /// expected JSON shape.
    #[error("paraphrase request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered but produced no usable rewritten text.
    #[error("paraphrase response contained no text")]
    EmptyResponse,
}

/// A failed payload delivery. Fatal for the article it belongs to, never
/// for the run.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// A sender or recipient address did not parse.
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// The attachment content type string was rejected.
    #[error("invalid attachment content type: {0}")]
    ContentType(#[from] lettre::message::header::ContentTypeErr),

    /// The resolved image could not be read back from the spool directory.
    #[error("could not read image attachment: {0}")]
    Attachment(#[from] std::io::Error),

    /// The SMTP session failed.
    #[error("SMTP transport failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_status_display() {
        let err = FetchError::Status {
            url: "https://punchng.com/".to_string(),
            status: StatusCode::FORBIDDEN,
        };
        let rendered = err.to_string();
        assert!(rendered.contains("punchng.com"));
        assert!(rendered.contains("403"));
    }

    #[test]
    fn test_image_error_unsupported_format_display() {
        let err = ImageError::UnsupportedFormat(image::ImageFormat::Gif);
        assert!(err.to_string().contains("Gif"));
    }

    #[test]
    fn test_transform_error_api_display() {
        let err = TransformError::Api(StatusCode::TOO_MANY_REQUESTS);
        assert!(err.to_string().contains("429"));
    }
}
