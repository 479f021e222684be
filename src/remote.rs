// ABOUTME: Remote image resolver for the outline-deck application
// ABOUTME: Fetches a slide's visual URL over HTTP with a short timeout and no retries

use crate::errors::Result;
use crate::images::{ImagePayload, ImageResolution, ImageResolver, SlideSlot};
use crate::outline::SlideRecord;
use log::info;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::time::Duration;
use url::Url;

/// Default timeout for a single image download.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(4);

/// Downloads slide images from the URLs found in the outline.
pub struct RemoteFetcher {
    client: Client,
}

impl RemoteFetcher {
    /// Create a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Fetch the image at `url`.
    ///
    /// Only values starting with `http` are attempted. A single GET is issued;
    /// anything but status 200 with a decodable image body is a failure.
    pub fn fetch(&self, url: &str) -> ImageResolution {
        if url.is_empty() || !url.starts_with("http") {
            return ImageResolution::Skipped("visual is not an http URL");
        }

        let parsed = match Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => return ImageResolution::Failed(format!("malformed URL {}: {}", url, e)),
        };

        info!("Fetching remote image: {}", parsed);
        let response = match self.client.get(parsed).send() {
            Ok(response) => response,
            Err(e) => return ImageResolution::Failed(format!("request failed: {}", e)),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return ImageResolution::Failed(format!("HTTP error: {}", status));
        }

        let body = match response.bytes() {
            Ok(body) => body,
            Err(e) => return ImageResolution::Failed(format!("failed to read body: {}", e)),
        };

        match ImagePayload::from_bytes(body.to_vec()) {
            Ok(payload) => ImageResolution::Attached(payload),
            Err(e) => ImageResolution::Failed(e.to_string()),
        }
    }
}

impl ImageResolver for RemoteFetcher {
    fn resolve(&mut self, _slot: SlideSlot, record: &SlideRecord) -> ImageResolution {
        self.fetch(&record.visual)
    }
}
