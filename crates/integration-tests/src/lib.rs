//! Integration test crate for keypool; all content lives in `tests/`.
