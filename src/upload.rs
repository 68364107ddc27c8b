use crate::error::ApiError;
use crate::validation::validate_upload;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use std::sync::Arc;

/// Form field the API reads the uploaded file from.
pub const IMAGE_FIELD: &str = "image";
const CHUNK_SIZE: usize = 16 * 1024;

/// Receives upload progress as an integer percentage, 0 to 100.
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        validate_upload(&self.file_name, &self.mime, self.bytes.len())
            .map_err(|e| ApiError::invalid_input(IMAGE_FIELD, e))
    }
}

pub fn percent(loaded: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (loaded.min(total) * 100 / total) as u8
}

/// Description of a multipart body. Kept as plain data so the form can be
/// rebuilt for every attempt of a request.
#[derive(Clone, Default)]
pub struct MultipartForm {
    fields: Vec<(String, String)>,
    image: Option<ImageUpload>,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for MultipartForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultipartForm")
            .field("fields", &self.fields)
            .field("image", &self.image.as_ref().map(|i| &i.file_name))
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: impl ToString) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text_opt(self, name: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.text(name, v),
            None => self,
        }
    }

    pub fn image(mut self, image: ImageUpload) -> Self {
        self.image = Some(image);
        self
    }

    pub fn on_progress(mut self, progress: Option<ProgressFn>) -> Self {
        self.progress = progress;
        self
    }

    pub(crate) fn build(&self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }

        // Progress tracks the file part only.
        let Some(image) = &self.image else {
            return Ok(form);
        };

        let total = image.bytes.len() as u64;
        let body = match self.progress.clone() {
            Some(progress) => progress_body(image.bytes.clone(), progress),
            None => reqwest::Body::from(image.bytes.clone()),
        };
        let part = Part::stream_with_length(body, total)
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(|e| ApiError::invalid_input(IMAGE_FIELD, format!("Invalid MIME type: {e}")))?;
        Ok(form.part(IMAGE_FIELD, part))
    }
}

/// Stream `bytes` in chunks, reporting the share already handed to the
/// transport after each one.
fn progress_body(bytes: Bytes, progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len() as u64;
    if total == 0 {
        progress(100);
        return reqwest::Body::from(bytes);
    }

    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect();

    progress(0);
    let mut loaded = 0u64;
    let stream = stream::iter(chunks).map(move |chunk| {
        loaded += chunk.len() as u64;
        progress(percent(loaded, total));
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}
