use std::sync::Arc;

use bytes::Bytes;
use serde_json::json;

use super::error::{ShortsError, ShortsResult};
use super::providers::ImageSearch;
use super::retry::{RetryPolicy, retry_operation};
use crate::ui::prelude::{Level, emit};

/// Number of slides a short aims for.
pub const TARGET_SLIDE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOrigin {
    User,
    Search,
}

/// Image container format, sniffed from the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Gif,
    Bmp,
}

impl ImageFormat {
    /// Unknown data is treated as JPEG; the engine probes the real format.
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::Webp,
            [b'G', b'I', b'F', b'8', ..] => ImageFormat::Gif,
            [b'B', b'M', ..] => ImageFormat::Bmp,
            _ => ImageFormat::Jpeg,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAsset {
    pub data: Bytes,
    pub ordinal: usize,
    pub origin: ImageOrigin,
    pub format: ImageFormat,
}

impl ImageAsset {
    pub fn new(data: Bytes, ordinal: usize, origin: ImageOrigin) -> Self {
        let format = ImageFormat::sniff(&data);
        Self {
            data,
            ordinal,
            origin,
            format,
        }
    }
}

/// One still image and how long it stays on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub image: ImageAsset,
    pub duration: f64,
}

/// Merges user uploads with keyword search results into the slide list.
pub struct SlideSetBuilder {
    search: Arc<dyn ImageSearch>,
    retry: RetryPolicy,
    target_count: usize,
}

impl SlideSetBuilder {
    pub fn new(search: Arc<dyn ImageSearch>, retry: RetryPolicy) -> Self {
        Self {
            search,
            retry,
            target_count: TARGET_SLIDE_COUNT,
        }
    }

    pub fn with_target_count(mut self, target_count: usize) -> Self {
        self.target_count = target_count;
        self
    }

    /// User images first in upload order, then search results for the
    /// remaining slots. Slides share `total_duration` equally.
    pub async fn build(
        &self,
        user_images: Vec<Bytes>,
        keyword: &str,
        total_duration: f64,
    ) -> ShortsResult<Vec<Slide>> {
        let mut user_images = user_images;
        if user_images.len() > self.target_count {
            emit(
                Level::Warn,
                "shorts.slides.extra_images",
                &format!(
                    "Received {} images, using the first {}",
                    user_images.len(),
                    self.target_count
                ),
                Some(json!({ "received": user_images.len(), "used": self.target_count })),
            );
            user_images.truncate(self.target_count);
        }

        let remaining = self.target_count - user_images.len();
        let mut images: Vec<ImageAsset> = user_images
            .into_iter()
            .enumerate()
            .map(|(ordinal, data)| ImageAsset::new(data, ordinal, ImageOrigin::User))
            .collect();

        if remaining > 0 {
            let found = self.search_images(keyword, remaining, images.is_empty()).await?;
            let offset = images.len();
            images.extend(
                found
                    .into_iter()
                    .take(remaining)
                    .enumerate()
                    .map(|(i, data)| ImageAsset::new(data, offset + i, ImageOrigin::Search)),
            );
        }

        if images.is_empty() {
            return Err(ShortsError::ImageSearchFailed(format!(
                "no images found for '{keyword}'"
            )));
        }

        emit(
            Level::Debug,
            "shorts.slides.built",
            &format!("Built {} slides", images.len()),
            None,
        );
        Ok(assign_durations(images, total_duration))
    }

    async fn search_images(&self, keyword: &str, count: usize, required: bool) -> ShortsResult<Vec<Bytes>> {
        let search = &self.search;
        let result = retry_operation(&self.retry, "image search", || search.search(keyword, count)).await;
        match result {
            Ok(found) => Ok(found),
            Err(err) if required => Err(ShortsError::ImageSearchFailed(format!("{err:#}"))),
            Err(err) => {
                emit(
                    Level::Warn,
                    "shorts.slides.search_failed",
                    &format!("Image search failed, continuing with uploaded images: {err:#}"),
                    None,
                );
                Ok(Vec::new())
            }
        }
    }
}

/// Split `total_duration` evenly across the images.
pub fn assign_durations(images: Vec<ImageAsset>, total_duration: f64) -> Vec<Slide> {
    let count = images.len().max(1) as f64;
    let duration = total_duration / count;
    images
        .into_iter()
        .map(|image| Slide { image, duration })
        .collect()
}
