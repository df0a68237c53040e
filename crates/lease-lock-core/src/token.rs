//! Ownership token generation.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use crate::error::{LockError, LockResult};

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 16;

/// Length of the encoded token (16 bytes, unpadded base64).
pub const TOKEN_LEN: usize = 22;

/// Secret proof of lease ownership.
///
/// The value is stored as the lease's value in the store and compared by every
/// ownership-sensitive operation. `Debug` never prints it.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Mints a token from the operating system's CSPRNG.
    pub fn generate() -> LockResult<Self> {
        Self::from_rng(&mut OsRng)
    }

    /// Mints a token from the given cryptographic source.
    ///
    /// A failing source is reported as [`LockError::Generation`]; there is no
    /// fallback to a weaker generator.
    pub fn from_rng<R>(rng: &mut R) -> LockResult<Self>
    where
        R: RngCore + CryptoRng,
    {
        let mut buf = [0u8; TOKEN_BYTES];
        rng.try_fill_bytes(&mut buf).map_err(LockError::Generation)?;
        Ok(Self(URL_SAFE_NO_PAD.encode(buf)))
    }

    /// The encoded token as sent to the store.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            unreachable!("only try_fill_bytes is used")
        }

        fn next_u64(&mut self) -> u64 {
            unreachable!("only try_fill_bytes is used")
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {
            unreachable!("only try_fill_bytes is used")
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other("entropy exhausted")))
        }
    }

    impl CryptoRng for BrokenRng {}

    #[test]
    fn test_token_shape() {
        let token = Token::generate().unwrap();
        assert_eq!(token.as_str().len(), TOKEN_LEN);
        assert!(
            token
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<Token> = (0..10_000).map(|_| Token::generate().unwrap()).collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_tokens_unique_across_threads() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| {
                    (0..1_000)
                        .map(|_| Token::generate().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for token in handle.join().unwrap() {
                assert!(seen.insert(token));
            }
        }
        assert_eq!(seen.len(), 8_000);
    }

    #[test]
    fn test_failing_source_is_fatal() {
        let err = Token::from_rng(&mut BrokenRng).unwrap_err();
        assert!(matches!(err, LockError::Generation(_)));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = Token::generate().unwrap();
        let printed = format!("{:?}", token);
        assert!(!printed.contains(token.as_str()));
    }
}
