use std::sync::Arc;

/// The inference collaborator: produces next-token logits for a sequence.
///
/// Implementations receive the whole sequence on every call; the engine keeps
/// no cache on their behalf. Whatever shape the underlying model emits, the
/// adapter must hand back exactly one logit vector of length
/// [`InferenceBackend::vocab_size`] for the position after the input.
pub trait InferenceBackend: Send + Sync {
    /// Returns the vocabulary size (number of output logits).
    fn vocab_size(&self) -> usize;

    /// Run one forward pass over `tokens` and return the last position's logits.
    ///
    /// - `tokens`: the full token sequence so far.
    /// - `mask`: attention mask, same length as `tokens`.
    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> crate::Result<Vec<f32>>;
}

/// The tokenizer collaborator.
pub trait Tokenizer: Send + Sync {
    /// Encode a text prompt into token ids.
    fn encode(&self, text: &str) -> crate::Result<Vec<u32>>;

    /// Decode token ids into text. Dropping special control tokens is up to
    /// the implementation.
    fn decode(&self, tokens: &[u32]) -> crate::Result<String>;

    /// Returns the end-of-sequence token ID.
    fn eos_token_id(&self) -> u32;
}

impl<T: InferenceBackend + ?Sized> InferenceBackend for &T {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> crate::Result<Vec<f32>> {
        (**self).next_logits(tokens, mask)
    }
}

impl<T: InferenceBackend + ?Sized> InferenceBackend for Arc<T> {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn next_logits(&self, tokens: &[u32], mask: &[u8]) -> crate::Result<Vec<f32>> {
        (**self).next_logits(tokens, mask)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn encode(&self, text: &str) -> crate::Result<Vec<u32>> {
        (**self).encode(text)
    }

    fn decode(&self, tokens: &[u32]) -> crate::Result<String> {
        (**self).decode(tokens)
    }

    fn eos_token_id(&self) -> u32 {
        (**self).eos_token_id()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn encode(&self, text: &str) -> crate::Result<Vec<u32>> {
        (**self).encode(text)
    }

    fn decode(&self, tokens: &[u32]) -> crate::Result<String> {
        (**self).decode(tokens)
    }

    fn eos_token_id(&self) -> u32 {
        (**self).eos_token_id()
    }
}
