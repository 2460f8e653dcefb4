pub mod sink;

use std::path::Path;

use thiserror::Error;

pub use sink::{FileSink, LocalDiskSink};

/// File received from a multipart upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    pub original_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub bytes: Vec<u8>,
}

impl UploadedAsset {
    pub fn new(original_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("Please upload a file")]
    Missing,

    #[error("Please upload an image file")]
    NotAnImage,

    #[error("Please upload an image less than {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

/// Check an upload and derive its stored name, `photo_<resource id><ext>`.
///
/// The name depends only on the resource id, so repeated uploads to the same
/// resource replace each other and different resources never collide.
pub fn validate(
    asset: Option<&UploadedAsset>,
    resource_id: &str,
    max_size_bytes: u64,
) -> Result<String, UploadRejection> {
    let asset = asset.ok_or(UploadRejection::Missing)?;

    if !asset.mime_type.starts_with("image/") {
        return Err(UploadRejection::NotAnImage);
    }

    if asset.size_bytes > max_size_bytes {
        return Err(UploadRejection::TooLarge {
            size: asset.size_bytes,
            max: max_size_bytes,
        });
    }

    Ok(format!("photo_{}{}", resource_id, extension_of(&asset.original_name)))
}

/// `.png` for `me.png`, empty when there is no extension
fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default()
}
