mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::CString;
use std::os::raw::{c_char, c_void};

use dr_engine::{
    ExecutionMode, GenerateParams, GenerationOrchestrator, GenerationRequest, Tokenizer,
};
use tracing_subscriber::EnvFilter;

/// Execute a closure that returns a `DRStatus`, catching any panics
/// and converting them into `DRStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> DRStatus + std::panic::UnwindSafe>(f: F) -> DRStatus {
    match std::panic::catch_unwind(f) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic");
            DRStatus::ErrorInternal
        }
    }
}

/// Install a `tracing` subscriber that writes to stderr.
///
/// Honours `RUST_LOG`; defaults to `info`. Calling it again is a no-op.
#[no_mangle]
pub extern "C" fn dr_init_logging() -> DRStatus {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
    if installed.is_err() {
        tracing::debug!("logging already initialized");
    }
    DRStatus::Ok
}

/// Default generation parameters.
#[no_mangle]
pub extern "C" fn dr_default_params() -> DRGenerateParams {
    DRGenerateParams::default()
}

/// Create a new decoding context around host callbacks.
///
/// `user_data` is passed back to both callbacks untouched. On success, writes
/// a heap-allocated `DRContext` pointer into `*ctx_out`. The caller must later
/// call `dr_context_destroy` to free the context.
#[no_mangle]
pub extern "C" fn dr_context_create(
    vocab_size: usize,
    eos_token_id: u32,
    logits: DRLogitsCallback,
    decode: DRDecodeCallback,
    user_data: *mut c_void,
    ctx_out: *mut *mut DRContext,
) -> DRStatus {
    catch_panic(|| {
        if ctx_out.is_null() {
            set_last_error("ctx_out is null");
            return DRStatus::ErrorInvalidArgument;
        }
        if logits.is_none() || decode.is_none() {
            set_last_error("logits and decode callbacks are required");
            return DRStatus::ErrorInvalidArgument;
        }
        if vocab_size == 0 {
            set_last_error("vocab_size must be positive");
            return DRStatus::ErrorInvalidArgument;
        }

        let ctx = Box::new(DRContext::new(
            vocab_size,
            eos_token_id,
            logits,
            decode,
            user_data,
        ));
        unsafe {
            *ctx_out = Box::into_raw(ctx);
        }
        DRStatus::Ok
    })
}

/// Destroy a context previously created by `dr_context_create`.
///
/// Passing a null pointer is a no-op and returns `DRStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn dr_context_destroy(ctx: *mut DRContext) -> DRStatus {
    if ctx.is_null() {
        return DRStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    DRStatus::Ok
}

/// Generate `num_return_sequences` continuations of a tokenized prompt.
///
/// On success, writes a heap-allocated JSON document into `*output`:
/// `{"sequences": [...], "metrics": {...}, "parameters": {...},
/// "prompt_tokens": n}`. A sequence whose callbacks failed appears as
/// `{"status": "failed", "error": "..."}` and does not fail the call.
/// The caller must later call `dr_free_string` to free the output string.
#[no_mangle]
pub unsafe extern "C" fn dr_generate(
    ctx: *mut DRContext,
    prompt_tokens: *const u32,
    prompt_len: usize,
    params: DRGenerateParams,
    output: *mut *mut c_char,
) -> DRStatus {
    catch_panic(|| {
        if ctx.is_null() || prompt_tokens.is_null() || output.is_null() {
            set_last_error("null argument");
            return DRStatus::ErrorInvalidArgument;
        }
        if prompt_len == 0 {
            set_last_error("prompt is empty");
            return DRStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &*ctx };
        let prompt = unsafe { std::slice::from_raw_parts(prompt_tokens, prompt_len) }.to_vec();

        let request = GenerationRequest {
            prompt_tokens: prompt,
            config: generate_params(&params).sampling_config(),
            eos_token_id: ctx.tokenizer.eos_token_id(),
            seed: params.has_seed.then_some(params.seed),
        };
        let mode = if params.parallel {
            ExecutionMode::Parallel
        } else {
            ExecutionMode::Sequential
        };

        let orchestrator =
            GenerationOrchestrator::new(&ctx.backend, &ctx.tokenizer).with_mode(mode);
        let response = match orchestrator.generate(&request) {
            Ok(r) => r,
            Err(e) => {
                set_last_error(format!("generation failed: {e}"));
                return DRStatus::ErrorGenerate;
            }
        };

        let json = match serde_json::to_string(&response) {
            Ok(j) => j,
            Err(e) => {
                set_last_error(format!("failed to serialize response: {e}"));
                return DRStatus::ErrorInternal;
            }
        };
        match CString::new(json) {
            Ok(c) => {
                unsafe { *output = c.into_raw() };
                DRStatus::Ok
            }
            Err(e) => {
                set_last_error(format!("output encoding error: {e}"));
                DRStatus::ErrorGenerate
            }
        }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error, or
/// null if no error has occurred. The caller must free the returned string
/// with `dr_free_string`.
#[no_mangle]
pub extern "C" fn dr_last_error() -> *mut c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null_mut(),
    }
}

/// Free a string previously returned by `dr_generate` or `dr_last_error`.
#[no_mangle]
pub unsafe extern "C" fn dr_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

fn generate_params(params: &DRGenerateParams) -> GenerateParams {
    GenerateParams {
        max_length: Some(i64::from(params.max_length)),
        temperature: Some(params.temperature),
        top_p: Some(params.top_p),
        top_k: Some(i64::from(params.top_k)),
        num_return_sequences: Some(i64::from(params.num_return_sequences)),
        eos_token_id: None,
        seed: params.has_seed.then_some(params.seed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;
    use std::ptr;

    const VOCAB: usize = 8;

    /// Favours `(last + 1) % VOCAB`; id 0 is EOS.
    extern "C" fn next_id(
        tokens: *const u32,
        mask: *const u8,
        len: usize,
        logits_out: *mut f32,
        vocab_size: usize,
        _user_data: *mut c_void,
    ) -> bool {
        let tokens = unsafe { std::slice::from_raw_parts(tokens, len) };
        let mask = unsafe { std::slice::from_raw_parts(mask, len) };
        assert!(mask.iter().all(|&m| m == 1));
        let logits = unsafe { std::slice::from_raw_parts_mut(logits_out, vocab_size) };
        logits.fill(0.0);
        logits[(tokens[len - 1] as usize + 1) % vocab_size] = 10.0;
        true
    }

    extern "C" fn always_fails(
        _tokens: *const u32,
        _mask: *const u8,
        _len: usize,
        _logits_out: *mut f32,
        _vocab_size: usize,
        _user_data: *mut c_void,
    ) -> bool {
        false
    }

    /// Comma-separated ids, or `user_data` copies of 'x' when it is non-null.
    extern "C" fn join_ids(
        tokens: *const u32,
        len: usize,
        text_out: *mut c_char,
        capacity: usize,
        user_data: *mut c_void,
    ) -> isize {
        let text = if user_data.is_null() {
            let tokens = unsafe { std::slice::from_raw_parts(tokens, len) };
            tokens
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(",")
        } else {
            "x".repeat(unsafe { *(user_data as *const usize) })
        };
        let bytes = text.as_bytes();
        if bytes.len() < capacity {
            unsafe {
                ptr::copy_nonoverlapping(bytes.as_ptr(), text_out.cast::<u8>(), bytes.len());
                *text_out.add(bytes.len()) = 0;
            }
        }
        bytes.len() as isize
    }

    fn create(logits: DRLogitsCallback, user_data: *mut c_void) -> *mut DRContext {
        let mut ctx = ptr::null_mut();
        let status =
            dr_context_create(VOCAB, 0, logits, Some(join_ids), user_data, &mut ctx);
        assert_eq!(status, DRStatus::Ok);
        ctx
    }

    fn generate_json(ctx: *mut DRContext, prompt: &[u32], params: DRGenerateParams) -> String {
        let mut out = ptr::null_mut();
        let status =
            unsafe { dr_generate(ctx, prompt.as_ptr(), prompt.len(), params, &mut out) };
        assert_eq!(status, DRStatus::Ok);
        let json = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { dr_free_string(out) };
        json
    }

    #[test]
    fn test_greedy_generation_json() {
        let ctx = create(Some(next_id), ptr::null_mut());
        let params = DRGenerateParams {
            temperature: 0.0,
            max_length: 16,
            ..DRGenerateParams::default()
        };
        let json = generate_json(ctx, &[5], params);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        // 5 -> 6 -> 7 -> 0 (EOS, not appended)
        assert_eq!(value["sequences"][0]["status"], "completed");
        assert_eq!(value["sequences"][0]["text"], "5,6,7");
        assert_eq!(value["sequences"][0]["token_count"], 2);
        assert_eq!(value["metrics"]["tokens_generated"], 2);
        unsafe { dr_context_destroy(ctx) };
    }

    #[test]
    fn test_failing_callback_marks_each_sequence() {
        let ctx = create(Some(always_fails), ptr::null_mut());
        let params = DRGenerateParams {
            num_return_sequences: 3,
            ..DRGenerateParams::default()
        };
        let json = generate_json(ctx, &[1, 2], params);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let sequences = value["sequences"].as_array().unwrap();
        assert_eq!(sequences.len(), 3);
        for s in sequences {
            assert_eq!(s["status"], "failed");
            assert_eq!(s["error"], "inference failed: host logits callback reported failure");
        }
        unsafe { dr_context_destroy(ctx) };
    }

    #[test]
    fn test_decode_grows_buffer() {
        let mut len = INITIAL_TEXT_CAPACITY * 3;
        let ctx = create(Some(next_id), (&mut len as *mut usize).cast());
        let params = DRGenerateParams {
            temperature: 0.0,
            max_length: 2,
            ..DRGenerateParams::default()
        };
        let json = generate_json(ctx, &[1, 2], params);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value["sequences"][0]["text"].as_str().unwrap().len(),
            INITIAL_TEXT_CAPACITY * 3
        );
        unsafe { dr_context_destroy(ctx) };
    }

    #[test]
    fn test_invalid_arguments() {
        let mut ctx = ptr::null_mut();
        assert_eq!(
            dr_context_create(VOCAB, 0, None, Some(join_ids), ptr::null_mut(), &mut ctx),
            DRStatus::ErrorInvalidArgument
        );
        let err = dr_last_error();
        assert!(!err.is_null());
        unsafe { dr_free_string(err) };

        let ctx = create(Some(next_id), ptr::null_mut());
        let mut out = ptr::null_mut();
        let status = unsafe {
            dr_generate(ctx, [1u32].as_ptr(), 0, DRGenerateParams::default(), &mut out)
        };
        assert_eq!(status, DRStatus::ErrorInvalidArgument);
        assert!(out.is_null());
        unsafe { dr_context_destroy(ctx) };
        assert_eq!(unsafe { dr_context_destroy(ptr::null_mut()) }, DRStatus::Ok);
    }

    #[test]
    fn test_params_are_clamped() {
        let params = DRGenerateParams {
            max_length: 10_000,
            temperature: 9.0,
            top_k: 0,
            top_p: 4.0,
            num_return_sequences: 0,
            ..DRGenerateParams::default()
        };
        let cfg = generate_params(&params).sampling_config();
        assert_eq!(cfg.max_length(), 512);
        assert_eq!(cfg.temperature(), 2.0);
        assert_eq!(cfg.top_k(), 1);
        assert_eq!(cfg.top_p(), 1.0);
        assert_eq!(cfg.num_return_sequences(), 1);
    }
}
