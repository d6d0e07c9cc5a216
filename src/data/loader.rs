// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the two on-disk inputs the core consumes:
//
//   {data_dir}/captions.json      — JSON array of annotation
//                                   records: {"image", "caption"}
//   {data_dir}/features/{img}.bin — one pre-extracted feature map
//                                   per image, raw little-endian
//                                   f32, exactly regions*channels
//                                   values
//
// Feature extraction itself (the CNN forward pass) happens in a
// separate offline tool; by the time this loader runs, every
// image is already a fixed-shape float dump. A file of the wrong
// length is a shape mismatch and fails loudly here, before any
// tensor is built.
//
// Caption text is cleaned on the way in: lowercased, punctuation
// stripped (apostrophes survive — "man's" is one word), spaces
// collapsed. The vocabulary is built from the cleaned text, so
// cleaning and tokenization always agree.
//
// Reference: Rust Book §9 (Error Handling), §12 (I/O)

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::annotation::Annotation;
use crate::domain::traits::AnnotationSource;

pub struct CorpusLoader {
    data_dir: PathBuf,
    regions:  usize,
    channels: usize,
}

impl CorpusLoader {
    pub fn new(data_dir: impl Into<String>, regions: usize, channels: usize) -> Self {
        Self {
            data_dir: PathBuf::from(data_dir.into()),
            regions,
            channels,
        }
    }

    /// Path of the feature dump for one image name.
    pub fn feature_path(&self, image: &str) -> PathBuf {
        self.data_dir.join("features").join(format!("{image}.bin"))
    }

    /// Decode one image's feature file, validating its shape.
    pub fn load_feature(&self, image: &str) -> Result<Vec<f32>> {
        read_feature_file(&self.feature_path(image), self.regions * self.channels)
    }
}

impl AnnotationSource for CorpusLoader {
    fn load_all(&self) -> Result<Vec<Annotation>> {
        let path = self.data_dir.join("captions.json");
        let json = std::fs::read_to_string(&path)
            .with_context(|| format!("Cannot read annotations from '{}'", path.display()))?;

        let annotations: Vec<Annotation> = serde_json::from_str(&json)
            .with_context(|| format!("Malformed annotation file '{}'", path.display()))?;

        tracing::info!(
            "Loaded {} annotations from '{}'",
            annotations.len(),
            path.display()
        );
        Ok(annotations)
    }
}

/// Read a raw little-endian f32 feature file and check that it holds
/// exactly `expected_len` values. The length check is the shape
/// gate for the whole pipeline — everything downstream may assume
/// features are well-formed.
pub fn read_feature_file(path: &Path, expected_len: usize) -> Result<Vec<f32>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Cannot read feature file '{}'", path.display()))?;

    if bytes.len() % 4 != 0 || bytes.len() / 4 != expected_len {
        bail!(
            "feature file '{}' holds {} bytes, expected {} f32 values ({} bytes)",
            path.display(),
            bytes.len(),
            expected_len,
            expected_len * 4,
        );
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Normalise raw caption text for tokenization: lowercase, strip
/// punctuation (apostrophes survive), collapse whitespace runs.
pub fn clean_caption(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '\'' {
                c
            } else {
                ' '
            }
        })
        .collect();

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_caption_strips_punctuation_and_case() {
        assert_eq!(
            clean_caption("A man, riding  his horse!"),
            "a man riding his horse"
        );
    }

    #[test]
    fn test_clean_caption_keeps_apostrophes() {
        assert_eq!(clean_caption("the man's dog"), "the man's dog");
    }

    #[test]
    fn test_clean_caption_empty_input() {
        assert_eq!(clean_caption("  ...  "), "");
    }

    #[test]
    fn test_load_all_reads_annotation_records() {
        let dir = std::env::temp_dir().join("image-captioner-annotations-test");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let records = vec![
            Annotation::new("img_001", "A man riding a horse."),
            Annotation::new("img_001", "Someone on horseback."),
            Annotation::new("img_002", "A dog on the beach."),
        ];
        std::fs::write(
            dir.join("captions.json"),
            serde_json::to_string(&records).unwrap(),
        )
        .unwrap();

        let loader = CorpusLoader::new(dir.to_string_lossy().to_string(), 2, 3);
        let loaded = loader.load_all().unwrap();

        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].image, "img_001");
        assert_eq!(loaded[2].caption, "A dog on the beach.");
    }

    #[test]
    fn test_read_feature_file_round_trip() {
        let dir = std::env::temp_dir().join("image-captioner-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("ok.bin");

        let values = [1.0f32, -2.5, 0.0, 3.25];
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(&path, bytes).unwrap();

        let decoded = read_feature_file(&path, 4).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_read_feature_file_rejects_wrong_length() {
        let dir = std::env::temp_dir().join("image-captioner-loader-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("short.bin");

        std::fs::write(&path, [0u8; 8]).unwrap();

        // 8 bytes = 2 values, but 4 were expected
        assert!(read_feature_file(&path, 4).is_err());
    }
}
