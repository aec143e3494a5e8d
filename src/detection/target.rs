//! Detection target.
//!
//! The letter or word the game currently expects the user to sign. A sum
//! type instead of two nullable fields: exactly one mode is active at a
//! time, so illegal states are unrepresentable.

/// Active detection target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Single letter target (quiz and speed letter rounds)
    Letter(String),

    /// Whole word target (word game and speed word rounds)
    Word(String),
}

impl Target {
    /// The expected value, independent of mode
    pub fn value(&self) -> &str {
        match self {
            Target::Letter(value) | Target::Word(value) => value,
        }
    }

    /// Check if this is a letter-mode target
    pub fn is_letter(&self) -> bool {
        matches!(self, Target::Letter(_))
    }

    /// Check if this is a word-mode target
    pub fn is_word(&self) -> bool {
        matches!(self, Target::Word(_))
    }

    /// Get a human-readable description of the target
    pub fn description(&self) -> String {
        match self {
            Target::Letter(value) => format!("letter '{}'", value),
            Target::Word(value) => format!("word '{}'", value),
        }
    }
}
