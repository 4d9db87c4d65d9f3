// Vocabulary mapping between timeline tokens and dense integer codes.
//
// Loaded once from a JSON object exported alongside the trained model
// (`{"60": 0, "_": 1, "r": 2, "/": 3, ...}`) and immutable afterwards. The
// code -> token direction is an explicit inverse table built at load time,
// so translating a sampled code back to its token is a single index.
//
// The only checks performed are the ones needed to build that inverse: codes
// must be unique and lie in `[0, len)`. Whether the tokens themselves are
// musically meaningful is the model exporter's business.

use crate::error::{MelodyError, Result};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct Vocabulary {
    codes: HashMap<String, usize>,
    tokens: Vec<String>,
}

impl Vocabulary {
    /// Load from a JSON file mapping token strings to codes.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| MelodyError::MappingLoad(format!("{}: {e}", path.display())))?;
        let codes: HashMap<String, usize> = serde_json::from_str(&data)
            .map_err(|e| MelodyError::MappingLoad(format!("{}: {e}", path.display())))?;
        let vocab = Self::from_map(codes)?;
        log::debug!("Loaded vocabulary of {} symbols from {}", vocab.len(), path.display());
        Ok(vocab)
    }

    /// Build from an in-memory token -> code map, constructing the inverse.
    pub fn from_map(codes: HashMap<String, usize>) -> Result<Self> {
        if codes.is_empty() {
            return Err(MelodyError::MappingLoad("mapping is empty".into()));
        }
        let size = codes.len();
        let mut slots: Vec<Option<String>> = vec![None; size];
        for (token, &code) in &codes {
            let slot = slots.get_mut(code).ok_or_else(|| {
                MelodyError::MappingLoad(format!(
                    "code {code} for token {token:?} is outside 0..{size}"
                ))
            })?;
            if let Some(existing) = slot {
                return Err(MelodyError::MappingLoad(format!(
                    "tokens {existing:?} and {token:?} share code {code}"
                )));
            }
            *slot = Some(token.clone());
        }
        // Unique codes, all below `size`, over `size` entries: every slot is filled.
        let tokens = slots.into_iter().flatten().collect();
        Ok(Vocabulary { codes, tokens })
    }

    /// Build from tokens listed in code order (token `i` gets code `i`).
    pub fn from_tokens<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut codes = HashMap::new();
        for (code, token) in tokens.into_iter().enumerate() {
            let token = token.into();
            if codes.insert(token.clone(), code).is_some() {
                return Err(MelodyError::MappingLoad(format!("token {token:?} listed twice")));
            }
        }
        Self::from_map(codes)
    }

    /// Number of symbols (`V`).
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Code for a token, or `UnknownToken`.
    pub fn encode(&self, token: &str) -> Result<usize> {
        self.codes
            .get(token)
            .copied()
            .ok_or_else(|| MelodyError::UnknownToken(token.to_string()))
    }

    /// Encode a whole token sequence, failing on the first unknown token.
    pub fn encode_all<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<usize>> {
        tokens.iter().map(|t| self.encode(t.as_ref())).collect()
    }

    /// Token for a code. Codes outside the vocabulary report as `UnknownToken`.
    pub fn decode(&self, code: usize) -> Result<&str> {
        self.tokens
            .get(code)
            .map(String::as_str)
            .ok_or_else(|| MelodyError::UnknownToken(format!("<code {code}>")))
    }

    /// Tokens in code order.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}
