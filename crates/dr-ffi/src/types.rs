use std::os::raw::{c_char, c_void};

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DRStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorGenerate = 2,
    ErrorInternal = 3,
}

/// Parameters controlling text generation.
///
/// Values outside their documented ranges are clamped, not rejected:
/// `max_length` 1..=512, `temperature` 0..=2, `top_k` 1..=100,
/// `top_p` 0..=1, `num_return_sequences` 1..=3.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DRGenerateParams {
    pub max_length: u32,
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub num_return_sequences: u32,
    /// Only read when `has_seed` is true.
    pub seed: u64,
    pub has_seed: bool,
    /// Run sequences on separate threads. The host callbacks must then be
    /// safe to call concurrently.
    pub parallel: bool,
}

impl Default for DRGenerateParams {
    fn default() -> Self {
        Self {
            max_length: 128,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.9,
            num_return_sequences: 1,
            seed: 0,
            has_seed: false,
            parallel: false,
        }
    }
}

/// Host inference callback.
///
/// Receives `len` token ids and mask bits and must write exactly
/// `vocab_size` logits to `logits_out`. Returns false on failure.
pub type DRLogitsCallback = Option<
    extern "C" fn(
        tokens: *const u32,
        mask: *const u8,
        len: usize,
        logits_out: *mut f32,
        vocab_size: usize,
        user_data: *mut c_void,
    ) -> bool,
>;

/// Host detokenize callback.
///
/// Writes at most `capacity` bytes of NUL-terminated UTF-8 to `text_out` and
/// returns the full text length in bytes, excluding the terminator. A return
/// value `>= capacity` asks to be called again with a larger buffer; a
/// negative value signals failure.
pub type DRDecodeCallback = Option<
    extern "C" fn(
        tokens: *const u32,
        len: usize,
        text_out: *mut c_char,
        capacity: usize,
        user_data: *mut c_void,
    ) -> isize,
>;
