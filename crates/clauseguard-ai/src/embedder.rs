//! ONNX Runtime embeddings for clause text.
//!
//! Drives a sentence-transformers export (all-MiniLM-L6-v2 by default) to
//! produce normalised vectors for standard-clause indexing and for querying
//! the vector store with clauses extracted from a contract.

use std::path::Path;

use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

/// Expected dimensionality when the model does not report one.
const DEFAULT_DIM: usize = 384;

/// Clause texts are short; 256 tokens comfortably covers a full clause.
const MAX_TOKENS: usize = 256;

/// Sentence-embedding generator for clause text.
pub struct ClauseEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    dim: usize,
}

/// Flat `[batch, seq]` token tensors ready for the ONNX session.
struct EncodedBatch {
    input_ids: Vec<i64>,
    attention_mask: Vec<i64>,
    token_type_ids: Vec<i64>,
    batch: usize,
    seq: usize,
}

impl ClauseEmbedder {
    /// Load a model directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path) -> anyhow::Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let session = Session::builder()?.commit_from_file(&model_path)?;
        let dim = output_dim(&session).unwrap_or(DEFAULT_DIM);

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_TOKENS,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams::default()));

        info!(dim, model = %model_path.display(), "loaded clause embedding model");
        Ok(Self {
            session,
            tokenizer,
            dim,
        })
    }

    /// Embedding dimensionality.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed one clause text.
    pub fn embed_clause(&mut self, text: &str) -> anyhow::Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text])?;
        vectors
            .pop()
            .ok_or_else(|| anyhow::anyhow!("empty embedding batch"))
    }

    /// Embed a batch of clause texts, one normalised vector per input.
    pub fn embed_batch(&mut self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encoded = self.encode(texts)?;
        let shape = [encoded.batch as i64, encoded.seq as i64];

        let outputs = self.session.run(ort::inputs![
            "input_ids" => Tensor::from_array((shape, encoded.input_ids.into_boxed_slice()))?,
            "attention_mask" => Tensor::from_array((shape, encoded.attention_mask.clone().into_boxed_slice()))?,
            "token_type_ids" => Tensor::from_array((shape, encoded.token_type_ids.into_boxed_slice()))?,
        ])?;

        let (out_shape, out_data) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = out_shape;
        anyhow::ensure!(
            dims.len() == 3
                && dims[0] as usize == encoded.batch
                && dims[2] as usize == self.dim,
            "unexpected model output shape {dims:?}"
        );

        let out_seq = dims[1] as usize;
        let pooled = (0..encoded.batch)
            .map(|i| mean_pool(out_data, &encoded.attention_mask, i, encoded.seq, out_seq, self.dim))
            .collect();
        Ok(pooled)
    }

    fn encode(&self, texts: &[&str]) -> anyhow::Result<EncodedBatch> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;

        let batch = texts.len();
        let seq = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut input_ids = vec![0i64; batch * seq];
        let mut attention_mask = vec![0i64; batch * seq];
        let mut token_type_ids = vec![0i64; batch * seq];

        for (i, encoding) in encodings.iter().enumerate() {
            let base = i * seq;
            for (j, &id) in encoding.get_ids().iter().enumerate() {
                input_ids[base + j] = id as i64;
            }
            for (j, &m) in encoding.get_attention_mask().iter().enumerate() {
                attention_mask[base + j] = m as i64;
            }
            for (j, &t) in encoding.get_type_ids().iter().enumerate() {
                token_type_ids[base + j] = t as i64;
            }
        }

        Ok(EncodedBatch {
            input_ids,
            attention_mask,
            token_type_ids,
            batch,
            seq,
        })
    }
}

/// Attention-mask-weighted mean over token embeddings, L2-normalised.
///
/// The mask is indexed by the tokenizer's padded length; the output tensor
/// by the model's reported sequence length. They are normally equal but are
/// kept separate in case the runtime trims padding.
fn mean_pool(
    token_embeddings: &[f32],
    attention_mask: &[i64],
    row: usize,
    mask_seq: usize,
    out_seq: usize,
    dim: usize,
) -> Vec<f32> {
    let mut pooled = vec![0.0f32; dim];
    let mut tokens = 0.0f32;

    for j in 0..out_seq.min(mask_seq) {
        if attention_mask[row * mask_seq + j] == 0 {
            continue;
        }
        let offset = (row * out_seq + j) * dim;
        for (d, p) in pooled.iter_mut().enumerate() {
            *p += token_embeddings[offset + d];
        }
        tokens += 1.0;
    }

    if tokens > 0.0 {
        for p in &mut pooled {
            *p /= tokens;
        }
    }

    let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for p in &mut pooled {
            *p /= norm;
        }
    }
    pooled
}

/// Last dimension of the model's first output, if it reports a static shape.
fn output_dim(session: &Session) -> Option<usize> {
    match session.outputs().first()?.dtype() {
        ort::value::ValueType::Tensor { shape, .. } => shape
            .last()
            .and_then(|&d| if d > 0 { Some(d as usize) } else { None }),
        _ => None,
    }
}
