//! Cross-crate integration tests for tessera. See `tests/`.
