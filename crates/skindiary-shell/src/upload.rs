//! Photo upload form: file selection, drag and drop, local preview.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mime::Mime;

use crate::{ShellError, ShellResult};

/// A file picked by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedFile {
    pub name: String,
    pub mime: Mime,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// File with the type the browser reported. Unparseable types count as
    /// `application/octet-stream`.
    pub fn new(name: impl Into<String>, mime_type: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime_type
                .parse()
                .unwrap_or(mime::APPLICATION_OCTET_STREAM),
            bytes,
        }
    }

    /// File whose type is guessed from its name.
    pub fn from_name(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime = mime_guess::from_path(&name).first_or_octet_stream();
        Self { name, mime, bytes }
    }

    pub fn is_image(&self) -> bool {
        self.mime.type_() == mime::IMAGE
    }
}

/// Local preview of the selected image, as a data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub data_url: String,
}

impl ImagePreview {
    pub fn render(file: &SelectedFile) -> ShellResult<Self> {
        if !file.is_image() {
            return Err(ShellError::NotAnImage(file.mime.to_string()));
        }
        Ok(Self {
            data_url: format!(
                "data:{};base64,{}",
                file.mime.essence_str(),
                STANDARD.encode(&file.bytes)
            ),
        })
    }
}

/// Upload form state.
#[derive(Debug, Default)]
pub struct UploadForm {
    selected: Option<SelectedFile>,
    preview: Option<ImagePreview>,
    highlighted: bool,
    loading: bool,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn preview(&self) -> Option<&ImagePreview> {
        self.preview.as_ref()
    }

    pub fn is_highlighted(&self) -> bool {
        self.highlighted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Select a file. Non-images are rejected and the previous selection kept.
    pub fn select(&mut self, file: SelectedFile) -> ShellResult<&ImagePreview> {
        let preview = ImagePreview::render(&file).inspect_err(|e| {
            log::warn!("Rejected {} ({}): {}", file.name, file.mime, e);
        })?;

        log::debug!("Selected {} ({} bytes)", file.name, file.bytes.len());
        self.selected = Some(file);
        Ok(&*self.preview.insert(preview))
    }

    pub fn drag_enter(&mut self) {
        self.highlighted = true;
    }

    pub fn drag_leave(&mut self) {
        self.highlighted = false;
    }

    /// Drop files on the upload area; only the first is used.
    pub fn drop_files(&mut self, files: Vec<SelectedFile>) -> ShellResult<Option<&ImagePreview>> {
        self.highlighted = false;
        match files.into_iter().next() {
            Some(file) => self.select(file).map(Some),
            None => Ok(None),
        }
    }

    /// Form submitted. The loading overlay is shown only when a file is selected.
    pub fn submit(&mut self) -> bool {
        self.loading = self.selected.is_some();
        self.loading
    }

    pub fn hide_loading(&mut self) {
        self.loading = false;
    }
}
