use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The shared secret guarding every write and admin operation.
#[derive(Clone)]
pub struct SharedSecret(Arc<str>);

impl SharedSecret {
    pub fn new(secret: &str) -> Self {
        SharedSecret(Arc::from(secret))
    }

    pub fn verify(&self, token: Option<&str>) -> bool {
        let Some(token) = token else {
            return false;
        };
        let (expected, actual) = (self.0.as_bytes(), token.as_bytes());
        // Compare every byte so timing does not reveal the matching prefix length
        expected.len() == actual.len() && expected.iter().zip(actual).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }
}

impl Debug for SharedSecret {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(<redacted>)")
    }
}
