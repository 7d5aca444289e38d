//! QR code text generation and PNG rendering.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use common::UserId;
use image::{ImageFormat, Luma};
use qrcode::QrCode;
use thiserror::Error;
use uuid::Uuid;

/// Edge length in pixels of rendered codes.
pub const QR_SIZE: u32 = 300;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR encoding failed: {0}")]
    Encode(String),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("QR file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Renders QR codes and stores reservation codes as PNG files.
#[derive(Debug, Clone)]
pub struct QrCodeGenerator {
    dir: PathBuf,
}

impl QrCodeGenerator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `BOOKFAIR-2026-RES-{id}-USER-{user}-{8 hex}`. The random suffix
    /// keeps codes unguessable from the id alone.
    pub fn reservation_code(reservation_id: i64, user_id: UserId) -> String {
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_uppercase();
        format!("BOOKFAIR-2026-RES-{reservation_id}-USER-{user_id}-{suffix}")
    }

    /// Where the PNG for a reservation lives.
    pub fn path_for(&self, reservation_id: i64) -> PathBuf {
        self.dir.join(format!("QR-{reservation_id}.png"))
    }

    /// Renders `data` as a PNG at least [`QR_SIZE`] pixels square.
    pub fn render_png(data: &str) -> Result<Vec<u8>, QrError> {
        let code = QrCode::new(data.as_bytes()).map_err(|e| QrError::Encode(e.to_string()))?;
        let image = code
            .render::<Luma<u8>>()
            .min_dimensions(QR_SIZE, QR_SIZE)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageFormat::Png)?;
        Ok(buffer.into_inner())
    }

    pub fn to_base64(png: &[u8]) -> String {
        STANDARD.encode(png)
    }

    pub fn data_uri(png: &[u8]) -> String {
        format!("data:image/png;base64,{}", Self::to_base64(png))
    }

    /// Renders `data` and writes it to the reservation's file.
    pub async fn write(&self, reservation_id: i64, data: &str) -> Result<PathBuf, QrError> {
        let png = Self::render_png(data)?;
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(reservation_id);
        tokio::fs::write(&path, png).await?;
        Ok(path)
    }

    pub async fn read(&self, path: impl AsRef<Path>) -> Result<Vec<u8>, QrError> {
        Ok(tokio::fs::read(path).await?)
    }
}
