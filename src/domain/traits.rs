// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// By programming against traits instead of concrete types,
// we can swap implementations without changing the code
// that uses them. For example:
//   - CorpusLoader implements AnnotationSource
//   - A future CocoLoader could also implement AnnotationSource
//   - The application layer only sees AnnotationSource
//     and works with both without any changes
//
// This is the Dependency Inversion Principle from SOLID,
// applied using Rust's trait system.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)
//            Rust Book §17 (Object Oriented Patterns)

use anyhow::Result;
use crate::domain::annotation::Annotation;

// ─── AnnotationSource ─────────────────────────────────────────────────────────
/// Any component that can produce caption annotations.
///
/// Implementations:
///   - CorpusLoader → reads a captions.json annotation file
///   - (future) CocoLoader → reads COCO's annotation format directly
pub trait AnnotationSource {
    /// Load every available (image, caption) record from this source.
    fn load_all(&self) -> Result<Vec<Annotation>>;
}

// ─── Captioner ────────────────────────────────────────────────────────────────
/// Any component that can describe an image feature in words.
///
/// Implementations:
///   - CaptionUseCase → samples from the trained recurrent decoder
///   - (future) RetrievalCaptioner → nearest-neighbour caption lookup
pub trait Captioner {
    /// Given the path to a feature file, return one generated caption.
    fn caption(&self, feature_path: &str) -> Result<String>;
}
