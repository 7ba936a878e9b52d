use crate::config::{EmbedConfig, EmbedProviderKind};
use crate::error::{EmbedderError, Result};
use ndarray::Array;
use ort::session::{builder::GraphOptimizationLevel, Session, SessionInputs};
use ort::value::{DynTensor, Tensor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tokio::task::spawn_blocking;

/// Token budget for the local transformer; longer chunks are truncated.
const LOCAL_MAX_LENGTH: usize = 512;

enum Backend {
    Hash(HashBackend),
    Local(Arc<LocalBackend>),
    Remote(RemoteBackend),
}

/// Provider-agnostic embedder.
///
/// Construction validates the configuration and loads whatever the selected
/// provider needs; `embed_batch` then behaves uniformly across providers.
pub struct Embedder {
    backend: Backend,
    batch_size: usize,
    dimension: usize,
}

impl Embedder {
    /// Build an embedder for the configured provider.
    pub fn from_config(config: &EmbedConfig) -> Result<Self> {
        config.validate()?;

        let backend = match config.provider {
            EmbedProviderKind::Hash => Backend::Hash(HashBackend {
                dimension: config.dimension,
            }),
            EmbedProviderKind::Local => {
                let model_dir = config
                    .model_dir
                    .as_deref()
                    .unwrap_or_else(|| Path::new("."));
                Backend::Local(Arc::new(LocalBackend::load(
                    model_dir,
                    &config.model,
                    config.quantized,
                    config.dimension,
                )?))
            }
            EmbedProviderKind::Remote => {
                let endpoint = config.endpoint.clone().unwrap_or_default();
                Backend::Remote(RemoteBackend::new(
                    endpoint,
                    config.model.clone(),
                    config.api_key.clone(),
                    config.dimension,
                ))
            }
        };

        Ok(Self {
            backend,
            batch_size: config.batch_size,
            dimension: config.dimension,
        })
    }

    /// Output vector dimension
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    /// Configured chunks per provider request
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Embed one batch of texts, in order.
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        match &self.backend {
            Backend::Hash(hash) => Ok(hash.embed_batch(&texts)),
            Backend::Local(local) => {
                let local = local.clone();
                spawn_blocking(move || local.embed_batch_blocking(&texts))
                    .await
                    .map_err(|e| EmbedderError::Provider(format!("embedding task failed: {e}")))?
            }
            Backend::Remote(remote) => remote.embed_batch(&texts).await,
        }
    }
}

/// Deterministic content-hash vectors; cheap, model-free fallback.
struct HashBackend {
    dimension: usize,
}

impl HashBackend {
    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|text| hash_embed(text, self.dimension))
            .collect()
    }
}

/// Local ONNX transformer backend.
struct LocalBackend {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    dimension: usize,
}

impl LocalBackend {
    fn load(model_dir: &Path, model: &str, quantized: bool, dimension: usize) -> Result<Self> {
        let dir = model_dir.join(model);
        let model_file = if quantized {
            "model_quantized.onnx"
        } else {
            "model.onnx"
        };
        let model_path = dir.join(model_file);
        let tokenizer_path = dir.join("tokenizer.json");

        if !model_path.exists() || !tokenizer_path.exists() {
            return Err(EmbedderError::Provider(format!(
                "Model assets for '{model}' are missing: expected {} and {}",
                model_path.display(),
                tokenizer_path.display()
            )));
        }

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| EmbedderError::Provider(format!("Tokenizer load failed: {e}")))?;
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..PaddingParams::default()
        }));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: LOCAL_MAX_LENGTH,
                ..TruncationParams::default()
            }))
            .map_err(|e| EmbedderError::Provider(format!("Tokenizer truncation failed: {e}")))?;

        let session = Session::builder()
            .map_err(|e| EmbedderError::Provider(format!("{e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EmbedderError::Provider(format!("{e}")))?
            .commit_from_file(&model_path)
            .map_err(|e| EmbedderError::Provider(format!("Failed to load ONNX model: {e}")))?;

        log::info!("Loaded ONNX model '{model}' (dim {dimension}, quantized: {quantized})");

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            dimension,
        })
    }

    fn embed_batch_blocking(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbedderError::Provider(format!("Tokenization failed: {e}")))?;
        if encodings.is_empty() {
            return Ok(Vec::new());
        }

        let seq_len = encodings[0].len();
        if encodings.iter().any(|e| e.len() != seq_len) {
            return Err(EmbedderError::Provider(
                "Inconsistent sequence lengths after padding".to_string(),
            ));
        }

        let batch = encodings.len();
        let mut ids = Vec::with_capacity(batch * seq_len);
        let mut masks = Vec::with_capacity(batch * seq_len);
        let mut type_ids = Vec::with_capacity(batch * seq_len);
        let mut mask_rows = Vec::with_capacity(batch);
        for encoding in &encodings {
            for idx in 0..seq_len {
                ids.push(i64::from(*encoding.get_ids().get(idx).unwrap_or(&0)));
                masks.push(i64::from(
                    *encoding.get_attention_mask().get(idx).unwrap_or(&0),
                ));
                type_ids.push(i64::from(*encoding.get_type_ids().get(idx).unwrap_or(&0)));
            }
            mask_rows.push(
                encoding
                    .get_attention_mask()
                    .iter()
                    .take(seq_len)
                    .map(|v| i64::from(*v))
                    .collect::<Vec<i64>>(),
            );
        }

        let mut available: HashMap<String, DynTensor> = HashMap::new();
        for (name, data) in [
            ("input_ids", ids),
            ("attention_mask", masks),
            ("token_type_ids", type_ids),
        ] {
            let array = Array::from_shape_vec((batch, seq_len), data)
                .map_err(|e| EmbedderError::Provider(format!("Tensor shape error: {e}")))?;
            let tensor = Tensor::from_array(array.into_dyn())
                .map_err(|e| EmbedderError::Provider(format!("{e}")))?
                .upcast();
            available.insert(name.to_string(), tensor);
        }

        let output = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| EmbedderError::Provider("Failed to lock ONNX session".to_string()))?;

            let mut feed: HashMap<String, DynTensor> = HashMap::new();
            for input in session.inputs() {
                match available.get(input.name()) {
                    Some(tensor) => {
                        feed.insert(input.name().to_string(), tensor.clone());
                    }
                    None => {
                        return Err(EmbedderError::Provider(format!(
                            "Unsupported ONNX input '{}'",
                            input.name()
                        )));
                    }
                }
            }

            let outputs = session
                .run(SessionInputs::from(feed))
                .map_err(|e| EmbedderError::Provider(format!("ONNX forward failed: {e}")))?;
            if outputs.len() == 0 {
                return Err(EmbedderError::Provider(
                    "ONNX returned no outputs".to_string(),
                ));
            }

            outputs[0]
                .try_extract_array::<f32>()
                .map_err(|e| EmbedderError::Provider(format!("Failed to decode output: {e}")))?
                .to_owned()
        };

        pool_embeddings(&output, &mask_rows, self.dimension)
    }
}

/// Mean-pool transformer output over the attention mask, then L2 normalize.
///
/// Accepts `[batch, hidden]` (already pooled) or `[batch, seq, hidden]`.
fn pool_embeddings(
    output: &ndarray::ArrayD<f32>,
    mask_rows: &[Vec<i64>],
    expected_dim: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(mask_rows.len());

    match output.ndim() {
        2 => {
            for row in output.rows() {
                let mut vec: Vec<f32> = row.to_vec();
                ensure_dimension(&vec, expected_dim)?;
                normalize(&mut vec);
                out.push(vec);
            }
        }
        3 => {
            let shape = output.shape();
            let (seq, hidden) = (shape[1], shape[2]);
            if hidden != expected_dim {
                return Err(EmbedderError::InvalidDimension {
                    expected: expected_dim,
                    actual: hidden,
                });
            }
            for (b, mask) in mask_rows.iter().enumerate() {
                let mut vec = vec![0.0f32; hidden];
                let mut count = 0.0f32;
                for (s, &m) in mask.iter().enumerate().take(seq) {
                    if m == 0 {
                        continue;
                    }
                    count += 1.0;
                    for (h, slot) in vec.iter_mut().enumerate() {
                        *slot += output[[b, s, h]];
                    }
                }
                if count > 0.0 {
                    for slot in &mut vec {
                        *slot /= count;
                    }
                }
                normalize(&mut vec);
                out.push(vec);
            }
        }
        other => {
            return Err(EmbedderError::Provider(format!(
                "Unexpected ONNX output rank {other}"
            )));
        }
    }

    Ok(out)
}

/// Remote embeddings API backend.
struct RemoteBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

#[derive(Serialize)]
struct RemoteRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct RemoteResponse {
    data: Vec<RemoteEmbedding>,
}

#[derive(Deserialize)]
struct RemoteEmbedding {
    embedding: Vec<f32>,
}

impl RemoteBackend {
    fn new(endpoint: String, model: String, api_key: Option<String>, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            model,
            api_key,
            dimension,
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.endpoint).json(&RemoteRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedderError::Provider(format!(
                "Embeddings API returned {status}: {body}"
            )));
        }

        let parsed: RemoteResponse = response.json().await?;
        if parsed.data.len() != texts.len() {
            return Err(EmbedderError::Provider(format!(
                "Embeddings API returned {} vectors for {} inputs",
                parsed.data.len(),
                texts.len()
            )));
        }

        let mut out = Vec::with_capacity(parsed.data.len());
        for item in parsed.data {
            ensure_dimension(&item.embedding, self.dimension)?;
            out.push(item.embedding);
        }
        Ok(out)
    }
}

fn ensure_dimension(vec: &[f32], expected: usize) -> Result<()> {
    if vec.len() != expected {
        return Err(EmbedderError::InvalidDimension {
            expected,
            actual: vec.len(),
        });
    }
    Ok(())
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

/// Deterministic pseudo-random unit vector seeded by the text content.
fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmbedConfig, EmbedProviderKind};
    use pretty_assertions::assert_eq;

    fn hash_embedder(dimension: usize) -> Embedder {
        Embedder::from_config(&EmbedConfig {
            provider: EmbedProviderKind::Hash,
            dimension,
            ..EmbedConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn hash_embeddings_are_deterministic() {
        let embedder = hash_embedder(64);
        let a = embedder
            .embed_batch(vec!["fn main() {}".to_string()])
            .await
            .unwrap();
        let b = embedder
            .embed_batch(vec!["fn main() {}".to_string()])
            .await
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
    }

    #[tokio::test]
    async fn hash_embeddings_differ_across_texts() {
        let embedder = hash_embedder(32);
        let out = embedder
            .embed_batch(vec!["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_ne!(out[0], out[1]);
    }

    #[tokio::test]
    async fn hash_embeddings_are_unit_length() {
        let embedder = hash_embedder(128);
        let out = embedder
            .embed_batch(vec!["some chunk of code".to_string()])
            .await
            .unwrap();
        let norm: f32 = out[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() {
        let embedder = hash_embedder(16);
        assert!(embedder.embed_batch(Vec::new()).await.unwrap().is_empty());
    }

    #[test]
    fn missing_local_assets_fail_fast() {
        let config = EmbedConfig {
            provider: EmbedProviderKind::Local,
            model_dir: Some(std::env::temp_dir().join("repograph-no-such-model-dir")),
            ..EmbedConfig::default()
        };
        assert!(Embedder::from_config(&config).is_err());
    }

    #[test]
    fn mean_pooling_respects_the_mask() {
        // batch=1, seq=3, hidden=2; the third position is masked out.
        let output = ndarray::arr3(&[[[2.0f32, 0.0], [0.0, 2.0], [100.0, 100.0]]]).into_dyn();
        let masks = vec![vec![1i64, 1, 0]];
        let pooled = pool_embeddings(&output, &masks, 2).unwrap();
        // Mean of (2,0) and (0,2) is (1,1), normalized.
        let inv_sqrt2 = 1.0 / 2.0f32.sqrt();
        assert!((pooled[0][0] - inv_sqrt2).abs() < 1e-6);
        assert!((pooled[0][1] - inv_sqrt2).abs() < 1e-6);
    }
}
