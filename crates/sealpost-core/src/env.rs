//! Environment abstraction for deterministic testing.
//!
//! Decouples engine logic from system randomness. Session engines never
//! reach for an RNG directly; they take an [`Environment`], so tests can
//! supply fixed bytes and replay an exchange byte-for-byte.

/// Abstract source of randomness for the engines.
///
/// # Safety
///
/// Implementations MUST use cryptographically secure entropy in production:
/// the bytes become AEAD nonces, and a repeated nonce under one key voids
/// confidentiality for both messages involved.
pub trait Environment {
    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);
}

/// Production environment backed by the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        let Ok(()) = getrandom::fill(buffer) else {
            unreachable!("OS entropy source is unavailable");
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_fills_buffers() {
        let env = SystemEnv::new();
        let mut a = [0u8; 24];
        let mut b = [0u8; 24];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        // Two 24-byte draws colliding would mean the entropy source is broken
        assert_ne!(a, b);
    }
}
