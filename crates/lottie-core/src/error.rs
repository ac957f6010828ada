use std::fmt;

pub type Result<T> = std::result::Result<T, LottieError>;

/// What kind of identifier an expression failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Layer,
    Effect,
    Property,
    Variable,
    Function,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LookupKind::Layer => "layer",
            LookupKind::Effect => "effect",
            LookupKind::Property => "property",
            LookupKind::Variable => "variable",
            LookupKind::Function => "function",
        };
        f.write_str(s)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum LottieError {
    /// Malformed document. Construction never yields a partial composition.
    #[error("structural error: {0}")]
    Structural(String),

    #[error("lookup error: unknown {kind} `{name}`")]
    Lookup { kind: LookupKind, name: String },

    #[error("type error: expected {expected}, found {found} in {context}")]
    Type {
        expected: &'static str,
        found: &'static str,
        context: String,
    },

    #[error("syntax error at {position} in `{expression}`: {message}")]
    Syntax {
        expression: String,
        position: usize,
        message: String,
    },

    #[error("expression recursion exceeded depth {0}")]
    RecursionLimit(usize),

    #[error("asset `{id}`: {message}")]
    Asset { id: String, message: String },
}

impl LottieError {
    pub fn structural(msg: impl Into<String>) -> Self {
        Self::Structural(msg.into())
    }

    pub fn lookup(kind: LookupKind, name: impl Into<String>) -> Self {
        Self::Lookup {
            kind,
            name: name.into(),
        }
    }

    pub fn type_mismatch(
        expected: &'static str,
        found: &'static str,
        context: impl Into<String>,
    ) -> Self {
        Self::Type {
            expected,
            found,
            context: context.into(),
        }
    }

    pub fn asset(id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Asset {
            id: id.into(),
            message: msg.into(),
        }
    }

    /// True for failures scoped to a single expression evaluation.
    pub fn is_evaluation_error(&self) -> bool {
        matches!(
            self,
            Self::Lookup { .. } | Self::Type { .. } | Self::RecursionLimit(_)
        )
    }
}

impl From<serde_json::Error> for LottieError {
    fn from(err: serde_json::Error) -> Self {
        Self::Structural(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_identifier() {
        let err = LottieError::lookup(LookupKind::Layer, "Ghost");
        assert_eq!(err.to_string(), "lookup error: unknown layer `Ghost`");
        assert!(err.is_evaluation_error());
    }

    #[test]
    fn json_errors_are_structural() {
        let err: LottieError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, LottieError::Structural(_)));
        assert!(!err.is_evaluation_error());
    }
}
