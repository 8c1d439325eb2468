use rand::Rng;

/// URL-safe alphabet: 64 symbols, so every character carries 6 bits.
pub const DEFAULT_ALPHABET: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const DEFAULT_LENGTH: usize = 7;

/// Collision retries allowed at one length before escalating.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Random short-identifier generator with length escalation.
///
/// The generator never inspects storage itself. Callers hand
/// [`IdGenerator::allocate`] a commit closure that atomically claims a
/// candidate (or reports it taken), so the "is it free" check and the insert
/// are one step.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    alphabet: Vec<char>,
    length: usize,
    max_attempts: usize,
}

impl IdGenerator {
    pub fn new(length: usize, max_attempts: usize) -> Self {
        Self::with_alphabet(DEFAULT_ALPHABET, length, max_attempts)
    }

    /// # Panics
    ///
    /// If `alphabet` is empty. Configured alphabets are validated before
    /// they get here.
    pub fn with_alphabet(alphabet: &str, length: usize, max_attempts: usize) -> Self {
        assert!(!alphabet.is_empty(), "identifier alphabet must not be empty");
        Self {
            alphabet: alphabet.chars().collect(),
            length,
            max_attempts,
        }
    }

    /// Draw a random identifier of `len` characters.
    pub fn draw(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| self.alphabet[rng.gen_range(0..self.alphabet.len())])
            .collect()
    }

    /// Draw candidates until `try_commit` claims one.
    ///
    /// `try_commit` returns `None` when the candidate is already in use. After
    /// `max_attempts` collisions at the default length, drawing continues at
    /// one character longer for another `max_attempts` tries. Returns `None`
    /// only if both rounds are exhausted.
    pub fn allocate<T>(&self, mut try_commit: impl FnMut(&str) -> Option<T>) -> Option<T> {
        if let Some(claimed) = self.attempt(self.length, &mut try_commit) {
            return Some(claimed);
        }

        let escalated = self.length + 1;
        tracing::warn!(
            attempts = self.max_attempts,
            length = escalated,
            "Identifier collisions exhausted, escalating length"
        );

        let claimed = self.attempt(escalated, &mut try_commit);
        if claimed.is_none() {
            tracing::error!(
                attempts = self.max_attempts,
                length = escalated,
                "No free identifier found after escalation"
            );
        }
        claimed
    }

    fn attempt<T>(
        &self,
        len: usize,
        try_commit: &mut impl FnMut(&str) -> Option<T>,
    ) -> Option<T> {
        (0..self.max_attempts).find_map(|_| try_commit(&self.draw(len)))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_LENGTH, DEFAULT_MAX_ATTEMPTS)
    }
}
