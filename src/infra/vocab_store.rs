// ============================================================
// Layer 6 — Vocabulary Store
// ============================================================
// Builds, saves, and loads the caption vocabulary.
//
// The vocabulary is a word-level tokenizer: every distinct word
// in the cleaned caption corpus gets an id, most frequent words
// first, capped at vocab_size. Four ids are reserved up front
// and never assigned to words:
//
//   <pad>=0  <start>=1  <end>=2  <unk>=3
//
// Rather than fighting the trainer type plumbing in tokenizers
// 0.15, the store writes a valid WordLevel tokenizer JSON
// directly and loads it back through Tokenizer::from_file — the
// resulting Tokenizer handles unknown-word fallback (<unk>) and
// id↔token lookup for the rest of the pipeline.
//
// Reference: tokenizers crate documentation (WordLevel model)

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokenizers::Tokenizer;

use crate::domain::caption::{
    END_ID, END_TOKEN, PAD_ID, PAD_TOKEN, RESERVED_TOKENS, START_ID, START_TOKEN, UNK_ID,
    UNK_TOKEN,
};

pub struct VocabStore {
    dir: PathBuf,
}

impl VocabStore {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: PathBuf::from(dir.into()) }
    }

    /// Load an existing vocabulary or build a new one from captions.
    pub fn load_or_build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        let path = self.dir.join("vocabulary.json");
        if path.exists() {
            tracing::info!("Loading existing vocabulary from disk");
            self.load()
        } else {
            tracing::info!("Building new vocabulary (vocab_size={})", vocab_size);
            self.build_and_save(texts, vocab_size)
        }
    }

    /// Load a previously saved vocabulary from its JSON file.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.dir.join("vocabulary.json");
        Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!("Cannot load vocabulary from '{}': {}", path.display(), e)
        })
    }

    /// Count word frequencies over the cleaned corpus, keep the top
    /// `vocab_size - 4` words, and write the tokenizer JSON.
    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir).ok();

        // ── Step 1: Word frequencies ──────────────────────────────────────────
        use std::collections::HashMap;
        let mut freq: HashMap<String, usize> = HashMap::new();

        for text in texts {
            for word in text.split_whitespace() {
                *freq.entry(word.to_string()).or_insert(0) += 1;
            }
        }

        // Sort by frequency descending; ties broken alphabetically so
        // the same corpus always produces the same vocabulary
        let mut words: Vec<(String, usize)> = freq.into_iter().collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(vocab_size.saturating_sub(RESERVED_TOKENS));

        // ── Step 2: Build the vocab map ───────────────────────────────────────
        let mut vocab = serde_json::json!({
            (PAD_TOKEN):   PAD_ID,
            (START_TOKEN): START_ID,
            (END_TOKEN):   END_ID,
            (UNK_TOKEN):   UNK_ID,
        });

        let mut next_id = RESERVED_TOKENS;
        for (word, _) in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        // ── Step 3: Write the tokenizer JSON ──────────────────────────────────
        // This is the format Tokenizer::from_file() expects
        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content,
                "single_word": false, "lstrip": false, "rstrip": false,
                "normalized": false, "special": true
            })
        };

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_ID,   PAD_TOKEN),
                special(START_ID, START_TOKEN),
                special(END_ID,   END_TOKEN),
                special(UNK_ID,   UNK_TOKEN),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": {
                "type": "Whitespace"
            },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": UNK_TOKEN
            }
        });

        let path = self.dir.join("vocabulary.json");
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| "Cannot write vocabulary JSON")?;

        tracing::info!(
            "Vocabulary built with {} entries, saved to '{}'",
            next_id,
            path.display()
        );

        Tokenizer::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Cannot reload vocabulary: {e}"))
    }
}
