// ============================================================
// Layer 3 — Annotation Domain Type
// ============================================================
// Represents one (image, caption) pair from the annotation file.
// This is a plain data struct with no behaviour — an image name
// and the raw caption text written for it.
//
// An image usually appears in several Annotations (COCO-style
// datasets ship ~5 captions per image), so the image name is
// NOT unique across records.
//
// Reference: Rust Book §5 (Structs and Methods)

use serde::{Deserialize, Serialize};

/// One raw caption annotation, straight from `captions.json`.
/// By the time an Annotation exists, image preprocessing and
/// feature extraction have already happened elsewhere — the
/// `image` field is only a key into the feature files on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    /// Image name (file stem) — keys the feature file and lets
    /// us group all captions of the same image together
    pub image: String,

    /// The human-written caption text, before any cleaning
    pub caption: String,
}

impl Annotation {
    /// Create a new Annotation.
    /// Uses impl Into<String> so callers can pass &str or String.
    pub fn new(image: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            image:   image.into(),
            caption: caption.into(),
        }
    }
}
