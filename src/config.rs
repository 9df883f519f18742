//! Engine-wide configuration.
//!
//! The only documented behavioural toggle is the legacy value-equality
//! quirk (Design Notes §9): `Null == 0 == false` is kept for compatibility
//! by default, but a host that wants strict reflexive equality can ask for
//! it instead.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// `true`: `Null` compares equal to any value whose `AsNumber` is `0`
    /// or `AsBool` is `false` (the legacy quirk). `false`: `Null` only
    /// equals `Null`.
    pub legacy_null_equality: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { legacy_null_equality: true }
    }
}

impl EngineConfig {
    pub fn strict() -> Self {
        Self { legacy_null_equality: false }
    }
}
