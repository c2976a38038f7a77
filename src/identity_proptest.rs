//! Property-based tests for remote identities.
//!
//! Remote ids end up in `git remote` names and inside reference names, so
//! whatever the alias, they must be made of reference-safe characters and
//! stay distinct for distinct aliases.
