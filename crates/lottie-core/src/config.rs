use serde::{Deserialize, Serialize};

/// What a draw pass does when an expression fails to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpressionErrorPolicy {
    /// Log the failure and use the keyframed value for that property only.
    #[default]
    Fallback,
    /// Abort the draw pass and hand the error to the caller.
    Fail,
}

/// Engine settings, passed explicitly to loaders and compositions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub expressions_enabled: bool,
    pub expression_errors: ExpressionErrorPolicy,
    /// Treat unparsable expressions as malformed documents.
    pub strict_expressions: bool,
    pub max_expression_depth: usize,
    pub gradient_cache_capacity: usize,
    pub composition_cache_capacity: usize,
    /// Composite semi-transparent layers through an intermediate surface.
    pub offscreen_alpha: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            expressions_enabled: true,
            expression_errors: ExpressionErrorPolicy::Fallback,
            strict_expressions: false,
            max_expression_depth: 16,
            gradient_cache_capacity: 8,
            composition_cache_capacity: 16,
            offscreen_alpha: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
