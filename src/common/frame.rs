use crate::error::CaptureError;
use image::DynamicImage;
use image::codecs::jpeg::JpegEncoder;
use std::sync::Arc;
use uuid::Uuid;

/// One decoded frame from the capture device.
#[derive(Clone)]
pub struct VideoFrame {
    image: Arc<DynamicImage>,
    presentation_ts: f64,
    frame_id: Uuid,
    sequence: u64,
}

impl VideoFrame {
    pub fn new(image: DynamicImage, presentation_ts: f64, sequence: u64) -> Self {
        Self {
            image: Arc::new(image),
            presentation_ts,
            frame_id: Uuid::new_v4(),
            sequence,
        }
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// The source's own presentation time, in seconds.
    pub fn presentation_ts(&self) -> f64 {
        self.presentation_ts
    }

    pub fn frame_id(&self) -> Uuid {
        self.frame_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Read-only, single-consumer view of the capture device.
pub trait VideoSource: Send {
    /// Presentation timestamp of the frame currently on the device, or `None`
    /// while the device has nothing to show yet.
    fn presentation_timestamp(&mut self) -> Option<f64>;

    fn current_frame(&mut self) -> Option<VideoFrame>;
}

/// A still frame encoded for upload.
#[derive(Debug, Clone)]
pub struct StillImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl StillImage {
    pub const MIME: &'static str = "image/jpeg";
    pub const FILE_NAME: &'static str = "frame.jpg";
}

/// Grabs whatever the source is showing right now and encodes it as JPEG.
pub fn capture_still(source: &mut dyn VideoSource, quality: u8) -> Result<StillImage, CaptureError> {
    let frame = source.current_frame().ok_or(CaptureError::NotReady)?;
    encode_still(frame.image(), quality)
}

pub fn encode_still(image: &DynamicImage, quality: u8) -> Result<StillImage, CaptureError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptyFrame { width, height });
    }

    // JPEG has no alpha channel
    let rgb = image.to_rgb8();
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality.clamp(1, 100)).encode_image(&rgb)?;

    Ok(StillImage {
        bytes,
        width,
        height,
    })
}
