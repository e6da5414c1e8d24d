use std::os::raw::{c_char, c_void};

use dr_engine::{EngineError, InferenceBackend, Result, Tokenizer};

use crate::types::{DRDecodeCallback, DRLogitsCallback};

/// First buffer size offered to the decode callback.
pub(crate) const INITIAL_TEXT_CAPACITY: usize = 256;

/// Inference collaborator backed by a host callback.
pub struct HostBackend {
    callback: DRLogitsCallback,
    vocab_size: usize,
    user_data: *mut c_void,
}

/// Tokenizer collaborator backed by a host callback. Only decoding crosses
/// the boundary; prompts arrive already tokenized.
pub struct HostTokenizer {
    callback: DRDecodeCallback,
    eos_token_id: u32,
    user_data: *mut c_void,
}

// SAFETY: the host owns `user_data` and guarantees its callbacks may be
// invoked from the thread that calls `dr_generate`, and from worker threads
// when it requests parallel generation.
unsafe impl Send for HostBackend {}
unsafe impl Sync for HostBackend {}
unsafe impl Send for HostTokenizer {}
unsafe impl Sync for HostTokenizer {}

impl InferenceBackend for HostBackend {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> Result<Vec<f32>> {
        let Some(callback) = self.callback else {
            return Err(EngineError::InferenceFailure(
                "no logits callback registered".to_string(),
            ));
        };

        let mut logits = vec![0.0f32; self.vocab_size];
        let ok = callback(
            tokens.as_ptr(),
            mask.as_ptr(),
            tokens.len(),
            logits.as_mut_ptr(),
            self.vocab_size,
            self.user_data,
        );
        if !ok {
            return Err(EngineError::InferenceFailure(
                "host logits callback reported failure".to_string(),
            ));
        }
        Ok(logits)
    }
}

impl Tokenizer for HostTokenizer {
    fn encode(&self, _text: &str) -> Result<Vec<u32>> {
        Err(EngineError::Tokenizer(
            "text prompts are tokenized by the host".to_string(),
        ))
    }

    fn decode(&self, tokens: &[u32]) -> Result<String> {
        let Some(callback) = self.callback else {
            return Err(EngineError::Tokenizer(
                "no decode callback registered".to_string(),
            ));
        };

        let mut capacity = INITIAL_TEXT_CAPACITY;
        // Second attempt uses the size the host asked for.
        for _ in 0..2 {
            let mut buf = vec![0u8; capacity];
            let written = callback(
                tokens.as_ptr(),
                tokens.len(),
                buf.as_mut_ptr().cast::<c_char>(),
                capacity,
                self.user_data,
            );
            if written < 0 {
                return Err(EngineError::Tokenizer(
                    "host decode callback reported failure".to_string(),
                ));
            }

            let needed = written as usize;
            if needed >= capacity {
                capacity = needed + 1;
                continue;
            }

            buf.truncate(needed);
            return String::from_utf8(buf)
                .map_err(|e| EngineError::Tokenizer(format!("decoded text is not UTF-8: {e}")));
        }

        Err(EngineError::Tokenizer(format!(
            "host decode callback kept asking for more than {capacity} bytes"
        )))
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }
}

/// Opaque context handle that owns the host collaborators.
pub struct DRContext {
    pub backend: HostBackend,
    pub tokenizer: HostTokenizer,
}

impl DRContext {
    pub fn new(
        vocab_size: usize,
        eos_token_id: u32,
        logits: DRLogitsCallback,
        decode: DRDecodeCallback,
        user_data: *mut c_void,
    ) -> Self {
        Self {
            backend: HostBackend {
                callback: logits,
                vocab_size,
                user_data,
            },
            tokenizer: HostTokenizer {
                callback: decode,
                eos_token_id,
                user_data,
            },
        }
    }
}
