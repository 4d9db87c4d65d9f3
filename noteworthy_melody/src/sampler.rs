// Autoregressive melody sampling.
//
// `MelodyGenerator` owns a loaded `SequenceModel` and the `Vocabulary`, both
// read-only after construction. Generation pads the seed with end-marker
// symbols up to the context length, then repeatedly:
//
//   1. takes the last `context_length` codes as the window,
//   2. one-hot encodes it and asks the model for a next-code distribution,
//   3. draws a code with temperature sampling,
//   4. appends it, stopping at the end marker.
//
// Steps are strictly sequential (each window contains every earlier draw).
// Randomness comes from the caller's RNG so a seeded `StdRng` reproduces a
// melody exactly.
//
// Temperature sampling rescales `log(p) / t` and renormalises with a softmax:
// t -> 0 approaches greedy argmax, t = 1 leaves the distribution unchanged,
// large t flattens towards uniform. Probabilities are floored before the log
// so an exact zero cannot produce -inf.

use crate::error::{MelodyError, Result};
use crate::model::{DenseModel, SequenceModel, one_hot};
use crate::token::{END_TOKEN, split_tokens};
use crate::vocabulary::Vocabulary;
use rand::Rng;
use std::path::Path;

/// Smallest probability fed to `ln`.
pub const PROBABILITY_FLOOR: f64 = 1e-10;

/// Context window length the bundled models are trained with.
pub const DEFAULT_SEQUENCE_LENGTH: usize = 64;

/// Knobs for one `generate` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Maximum number of sampling steps.
    pub num_steps: usize,
    /// Window length fed to the model at each step.
    pub context_length: usize,
    /// Sampling temperature, strictly positive.
    pub temperature: f64,
}

impl GenerationParams {
    /// Reject parameters that would make sampling undefined.
    pub fn validate(&self) -> Result<()> {
        if self.context_length == 0 {
            return Err(MelodyError::InvalidParameter(
                "context length must be at least 1".into(),
            ));
        }
        validate_temperature(self.temperature)
    }
}

fn validate_temperature(temperature: f64) -> Result<()> {
    if !temperature.is_finite() || temperature <= 0.0 {
        return Err(MelodyError::InvalidParameter(format!(
            "temperature must be a finite value > 0, got {temperature}"
        )));
    }
    Ok(())
}

/// Rescale a distribution by `temperature`: softmax(log(p) / t).
///
/// Returns the adjusted distribution (sums to 1). Fails on an empty
/// distribution or a non-positive temperature.
pub fn apply_temperature(probabilities: &[f32], temperature: f64) -> Result<Vec<f64>> {
    validate_temperature(temperature)?;
    if probabilities.is_empty() {
        return Err(MelodyError::InvalidParameter("empty probability distribution".into()));
    }
    // `f64::max` maps NaN and negatives to the floor as well.
    let scaled: Vec<f64> = probabilities
        .iter()
        .map(|&p| (p as f64).max(PROBABILITY_FLOOR).ln() / temperature)
        .collect();
    let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|&s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    Ok(exps.into_iter().map(|e| e / total).collect())
}

/// Draw an index from `probabilities` after temperature rescaling.
pub fn sample_with_temperature(
    probabilities: &[f32],
    temperature: f64,
    rng: &mut impl Rng,
) -> Result<usize> {
    let adjusted = apply_temperature(probabilities, temperature)?;
    Ok(weighted_index(&adjusted, rng.random::<f64>()))
}

/// Pick an index from a normalised distribution using a uniform value in [0, 1).
fn weighted_index(weights: &[f64], rng_val: f64) -> usize {
    let target = rng_val * weights.iter().sum::<f64>();
    let mut cumulative = 0.0;
    for (index, &weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative > target {
            return index;
        }
    }
    // Rounding left the target past the last bucket: take the last non-empty one.
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

/// A loaded model + vocabulary, ready to extend seeds into melodies.
pub struct MelodyGenerator<M: SequenceModel> {
    model: M,
    vocab: Vocabulary,
}

impl MelodyGenerator<DenseModel> {
    /// Load a `DenseModel` and its vocabulary from disk.
    pub fn load(model_path: &Path, mapping_path: &Path) -> Result<Self> {
        let model = DenseModel::load(model_path)?;
        let vocab = Vocabulary::load(mapping_path)?;
        Self::new(model, vocab)
    }
}

impl<M: SequenceModel> MelodyGenerator<M> {
    /// Pair a model with its vocabulary. Both must agree on the symbol count.
    pub fn new(model: M, vocab: Vocabulary) -> Result<Self> {
        if model.vocab_size() != vocab.len() {
            return Err(MelodyError::ModelLoad(format!(
                "model predicts over {} symbols but the mapping has {}",
                model.vocab_size(),
                vocab.len()
            )));
        }
        Ok(MelodyGenerator { model, vocab })
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Extend `seed` by up to `params.num_steps` sampled tokens.
    ///
    /// The result is the seed followed by every generated token before the
    /// first end marker. Padding never appears in the output.
    pub fn generate<S: AsRef<str>>(
        &self,
        seed: &[S],
        params: &GenerationParams,
        rng: &mut impl Rng,
    ) -> Result<Vec<String>> {
        params.validate()?;
        let model_window = self.model.context_length().unwrap_or(params.context_length);
        if model_window != params.context_length {
            return Err(MelodyError::InvalidParameter(format!(
                "context length {} does not match the model's window of {model_window}",
                params.context_length
            )));
        }

        let mut melody: Vec<String> = seed.iter().map(|t| t.as_ref().to_string()).collect();

        let pad = self.vocab.encode(END_TOKEN)?;
        let mut context = vec![pad; params.context_length];
        context.extend(self.vocab.encode_all(seed)?);

        let vocab_size = self.vocab.len();
        for step in 0..params.num_steps {
            let window_start = context.len().saturating_sub(params.context_length);
            let window = one_hot(&context[window_start..], vocab_size);

            let probabilities = self.model.predict(&window)?;
            if probabilities.len() != vocab_size {
                return Err(MelodyError::Inference(format!(
                    "model returned {} probabilities for a vocabulary of {vocab_size}",
                    probabilities.len()
                )));
            }
            let code = sample_with_temperature(&probabilities, params.temperature, rng)?;
            context.push(code);

            let token = self.vocab.decode(code)?;
            if token == END_TOKEN {
                log::debug!("End marker sampled after {step} generated steps");
                break;
            }
            log::trace!("step {step}: sampled {token:?} (code {code})");
            melody.push(token.to_string());
        }

        log::info!(
            "Generated melody of {} steps from a {}-token seed",
            melody.len(),
            seed.len()
        );
        Ok(melody)
    }

    /// Collaborator entry point: seed given as space-separated tokens.
    pub fn generate_melody(
        &self,
        seed: &str,
        num_steps: usize,
        max_sequence_length: usize,
        temperature: f64,
        rng: &mut impl Rng,
    ) -> Result<Vec<String>> {
        let params = GenerationParams {
            num_steps,
            context_length: max_sequence_length,
            temperature,
        };
        self.generate(&split_tokens(seed), &params, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::{Cell, RefCell};

    const TOKENS: [&str; 7] = ["/", "_", "r", "60", "62", "64", "67"];

    fn vocab() -> Vocabulary {
        Vocabulary::from_tokens(TOKENS).unwrap()
    }

    fn code(token: &str) -> usize {
        TOKENS.iter().position(|&t| t == token).unwrap()
    }

    /// Plays back a fixed list of tokens as one-hot predictions, then the end
    /// marker forever. Records the shape of every window it sees.
    struct ScriptedModel {
        script: Vec<usize>,
        context_length: Option<usize>,
        calls: Cell<usize>,
        windows: RefCell<Vec<Array2<f32>>>,
    }

    impl ScriptedModel {
        fn new(tokens: &[&str]) -> Self {
            ScriptedModel {
                script: tokens.iter().map(|t| code(t)).collect(),
                context_length: None,
                calls: Cell::new(0),
                windows: RefCell::new(Vec::new()),
            }
        }
    }

    impl SequenceModel for ScriptedModel {
        fn vocab_size(&self) -> usize {
            TOKENS.len()
        }

        fn context_length(&self) -> Option<usize> {
            self.context_length
        }

        fn predict(&self, window: &Array2<f32>) -> Result<Vec<f32>> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.windows.borrow_mut().push(window.clone());
            let next = self.script.get(call).copied().unwrap_or(code("/"));
            let mut probs = vec![0.0; TOKENS.len()];
            probs[next] = 1.0;
            Ok(probs)
        }
    }

    fn params(num_steps: usize, context_length: usize, temperature: f64) -> GenerationParams {
        GenerationParams { num_steps, context_length, temperature }
    }

    #[test]
    fn unit_temperature_keeps_distribution() {
        let probs = [0.1f32, 0.2, 0.3, 0.4];
        let adjusted = apply_temperature(&probs, 1.0).unwrap();
        for (p, a) in probs.iter().zip(&adjusted) {
            assert!((*p as f64 - a).abs() < 1e-6, "{p} vs {a}");
        }
    }

    #[test]
    fn high_temperature_flattens_distribution() {
        let adjusted = apply_temperature(&[0.05, 0.15, 0.8], 1000.0).unwrap();
        for a in &adjusted {
            assert!((a - 1.0 / 3.0).abs() < 0.01, "{adjusted:?}");
        }
    }

    #[test]
    fn low_temperature_is_greedy() {
        let mut rng = StdRng::seed_from_u64(7);
        let probs = [0.1f32, 0.6, 0.3];
        for _ in 0..1000 {
            assert_eq!(sample_with_temperature(&probs, 0.01, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn non_positive_temperature_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        for t in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                sample_with_temperature(&[0.5, 0.5], t, &mut rng),
                Err(MelodyError::InvalidParameter(_))
            ));
        }
    }

    #[test]
    fn zero_probabilities_stay_finite() {
        let adjusted = apply_temperature(&[0.0, 1.0, 0.0], 0.5).unwrap();
        assert!(adjusted.iter().all(|a| a.is_finite()));
        assert!(adjusted[1] > 0.999_999);
        assert!(matches!(apply_temperature(&[], 1.0), Err(MelodyError::InvalidParameter(_))));
    }

    #[test]
    fn sampling_follows_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let probs = [0.25f32, 0.75];
        let n = 10_000;
        let ones = (0..n)
            .filter(|_| sample_with_temperature(&probs, 1.0, &mut rng).unwrap() == 1)
            .count();
        let pct = ones as f64 / n as f64;
        assert!((0.72..0.78).contains(&pct), "expected ~75%, got {:.1}%", pct * 100.0);
    }

    #[test]
    fn weighted_index_edges() {
        assert_eq!(weighted_index(&[1.0, 0.0], 0.0), 0);
        assert_eq!(weighted_index(&[0.0, 1.0], 0.0), 1);
        assert_eq!(weighted_index(&[0.5, 0.5, 0.0], 0.999_999_999), 1);
    }

    #[test]
    fn zero_steps_returns_seed() {
        let generator = MelodyGenerator::new(ScriptedModel::new(&["62"]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let melody = generator.generate(&["60"], &params(0, 4, 1.0), &mut rng).unwrap();
        assert_eq!(melody, vec!["60"]);
        assert_eq!(generator.model().calls.get(), 0);
    }

    #[test]
    fn stops_at_end_marker_without_emitting_it() {
        let generator =
            MelodyGenerator::new(ScriptedModel::new(&["62", "_", "r"]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let melody = generator.generate(&["60"], &params(50, 4, 1.0), &mut rng).unwrap();
        assert_eq!(melody, vec!["60", "62", "_", "r"]);
        assert!(!melody.iter().any(|t| t == "/"));
        // Three tokens plus the step that produced the end marker.
        assert_eq!(generator.model().calls.get(), 4);
    }

    #[test]
    fn runs_full_step_budget_without_end_marker() {
        let script = ["64"; 10];
        let generator = MelodyGenerator::new(ScriptedModel::new(&script), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let melody = generator.generate(&["60", "_"], &params(5, 3, 0.5), &mut rng).unwrap();
        assert_eq!(melody.len(), 2 + 5);
        assert!(melody[2..].iter().all(|t| t == "64"));
    }

    #[test]
    fn windows_slide_over_padded_context() {
        let generator = MelodyGenerator::new(ScriptedModel::new(&["62", "64"]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        generator.generate(&["60"], &params(3, 3, 1.0), &mut rng).unwrap();

        let windows = generator.model().windows.borrow();
        assert_eq!(windows.len(), 3);
        for w in windows.iter() {
            assert_eq!(w.dim(), (3, TOKENS.len()));
        }
        // First window: two padding symbols then the seed.
        assert_eq!(windows[0][[0, code("/")]], 1.0);
        assert_eq!(windows[0][[1, code("/")]], 1.0);
        assert_eq!(windows[0][[2, code("60")]], 1.0);
        // Third window: seed followed by both sampled tokens.
        assert_eq!(windows[2][[0, code("60")]], 1.0);
        assert_eq!(windows[2][[1, code("62")]], 1.0);
        assert_eq!(windows[2][[2, code("64")]], 1.0);
    }

    #[test]
    fn unknown_seed_token_is_rejected() {
        let generator = MelodyGenerator::new(ScriptedModel::new(&[]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let result = generator.generate(&["60", "99"], &params(5, 4, 1.0), &mut rng);
        assert!(matches!(result, Err(MelodyError::UnknownToken(t)) if t == "99"));
        assert_eq!(generator.model().calls.get(), 0);
    }

    #[test]
    fn invalid_parameters_fail_before_inference() {
        let generator = MelodyGenerator::new(ScriptedModel::new(&["62"]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for bad in [params(5, 0, 1.0), params(5, 4, 0.0), params(5, 4, -0.5)] {
            let result = generator.generate(&["60"], &bad, &mut rng);
            assert!(matches!(result, Err(MelodyError::InvalidParameter(_))), "{bad:?}");
        }
        assert_eq!(generator.model().calls.get(), 0);
    }

    #[test]
    fn context_length_must_match_model_window() {
        let model = ScriptedModel { context_length: Some(4), ..ScriptedModel::new(&["62"]) };
        let generator = MelodyGenerator::new(model, vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for num_steps in [0, 5] {
            let result = generator.generate(&["60"], &params(num_steps, 8, 1.0), &mut rng);
            assert!(matches!(result, Err(MelodyError::InvalidParameter(_))), "{result:?}");
        }
        assert_eq!(generator.model().calls.get(), 0);

        let melody = generator.generate(&["60"], &params(5, 4, 1.0), &mut rng).unwrap();
        assert_eq!(melody, vec!["60", "62"]);
    }

    #[test]
    fn mismatched_vocabulary_size_is_rejected() {
        let small = Vocabulary::from_tokens(["/", "_", "60"]).unwrap();
        assert!(matches!(
            MelodyGenerator::new(ScriptedModel::new(&[]), small),
            Err(MelodyError::ModelLoad(_))
        ));
    }

    #[test]
    fn generate_melody_splits_seed_string() {
        let generator = MelodyGenerator::new(ScriptedModel::new(&["67"]), vocab()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let melody = generator.generate_melody("60 _ _ 62", 10, 8, 0.2, &mut rng).unwrap();
        assert_eq!(melody, vec!["60", "_", "_", "62", "67"]);
    }

    #[test]
    fn same_rng_seed_reproduces_melody() {
        struct Uniform;
        impl SequenceModel for Uniform {
            fn vocab_size(&self) -> usize {
                TOKENS.len()
            }
            fn predict(&self, _window: &Array2<f32>) -> Result<Vec<f32>> {
                Ok(vec![1.0 / TOKENS.len() as f32; TOKENS.len()])
            }
        }
        let generator = MelodyGenerator::new(Uniform, vocab()).unwrap();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            generator.generate(&["60"], &params(64, 8, 1.0), &mut rng).unwrap()
        };
        assert_eq!(run(11), run(11));
    }
}
