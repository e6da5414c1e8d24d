use std::thread;
use std::time::Instant;

use dr_sampler::SamplingConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug_span, info, info_span, warn};

use crate::backend::{InferenceBackend, Tokenizer};
use crate::decode::DecodingLoop;
use crate::error::{EngineError, Result};
use crate::request::{GenerateParams, GenerationMetrics, GenerationResponse, SequenceOutcome};
use crate::sequence::{SequenceState, StopCondition};

/// How the independent sequences of one request are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One sequence after another on the calling thread.
    #[default]
    Sequential,
    /// One scoped thread per sequence. Requires the collaborators to tolerate
    /// concurrent calls.
    Parallel,
}

/// A token-level generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt_tokens: Vec<u32>,
    pub config: SamplingConfig,
    pub eos_token_id: u32,
    /// Sequence `i` draws from `StdRng::seed_from_u64(seed + i)`. Without a
    /// seed every sequence is seeded from OS entropy.
    pub seed: Option<u64>,
}

impl GenerationRequest {
    pub fn new(prompt_tokens: Vec<u32>, config: SamplingConfig, eos_token_id: u32) -> Self {
        Self {
            prompt_tokens,
            config,
            eos_token_id,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng_for(&self, index: usize) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        }
    }
}

/// Runs `num_return_sequences` independent decoding loops for one prompt.
///
/// Collaborators are injected here; nothing is global. A failing sequence
/// becomes a [`SequenceOutcome::Failed`] in its slot and the rest of the
/// request carries on.
pub struct GenerationOrchestrator<B, T> {
    backend: B,
    tokenizer: T,
    mode: ExecutionMode,
}

impl<B: InferenceBackend, T: Tokenizer> GenerationOrchestrator<B, T> {
    pub fn new(backend: B, tokenizer: T) -> Self {
        Self {
            backend,
            tokenizer,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Encode a text prompt and generate from it.
    ///
    /// The prompt is truncated to `max_length` tokens. The EOS id defaults to
    /// the tokenizer's.
    pub fn generate_text(&self, prompt: &str, params: &GenerateParams) -> Result<GenerationResponse> {
        let config = params.sampling_config();
        let mut prompt_tokens = self.tokenizer.encode(prompt)?;
        prompt_tokens.truncate(config.max_length());

        let eos_token_id = params
            .eos_token_id
            .unwrap_or_else(|| self.tokenizer.eos_token_id());
        let request = GenerationRequest {
            prompt_tokens,
            config,
            eos_token_id,
            seed: params.seed,
        };
        self.generate(&request)
    }

    /// Run every sequence of `request` and collect results and metrics.
    ///
    /// Only an empty prompt fails the whole request; anything else is
    /// reported per sequence.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        if request.prompt_tokens.is_empty() {
            return Err(EngineError::EmptyPrompt);
        }

        let config = &request.config;
        let n = config.num_return_sequences();
        let _span = info_span!("generate", sequences = n).entered();
        info!(
            prompt_tokens = request.prompt_tokens.len(),
            max_length = config.max_length(),
            temperature = config.temperature(),
            top_p = config.top_p(),
            top_k = config.top_k(),
            mode = ?self.mode,
            "starting generation"
        );

        let start = Instant::now();
        let sequences: Vec<SequenceOutcome> = match self.mode {
            ExecutionMode::Sequential => (0..n).map(|i| self.run_sequence(i, request)).collect(),
            ExecutionMode::Parallel => thread::scope(|s| {
                let handles: Vec<_> = (0..n)
                    .map(|i| s.spawn(move || self.run_sequence(i, request)))
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join()
                            .unwrap_or_else(|_| SequenceOutcome::failed("sequence worker panicked"))
                    })
                    .collect()
            }),
        };
        let elapsed = start.elapsed().as_secs_f64();

        let tokens_generated = sequences.iter().map(SequenceOutcome::token_count).sum();
        let metrics = GenerationMetrics::new(elapsed, tokens_generated);
        info!(
            elapsed_seconds = metrics.elapsed_seconds,
            tokens_generated = metrics.tokens_generated,
            tokens_per_second = metrics.tokens_per_second,
            "generation finished"
        );

        Ok(GenerationResponse {
            sequences,
            metrics,
            parameters: config.clone(),
            prompt_tokens: request.prompt_tokens.len(),
        })
    }

    fn run_sequence(&self, index: usize, request: &GenerationRequest) -> SequenceOutcome {
        let _span = debug_span!("sequence", index).entered();
        match self.decode_one(index, request) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(sequence = index, error = %e, "sequence failed");
                SequenceOutcome::failed(e)
            }
        }
    }

    fn decode_one(&self, index: usize, request: &GenerationRequest) -> Result<SequenceOutcome> {
        let stop = StopCondition::new(request.eos_token_id, request.config.max_length());
        let state = SequenceState::new(request.prompt_tokens.clone(), stop)?;
        let mut rng = request.rng_for(index);

        let output = DecodingLoop::new(&self.backend, &request.config).run(state, &mut rng)?;
        let text = self.tokenizer.decode(&output.tokens)?;

        Ok(SequenceOutcome::Completed {
            text,
            token_count: output.generated_len(),
            finish_reason: output.finish_reason,
        })
    }
}
