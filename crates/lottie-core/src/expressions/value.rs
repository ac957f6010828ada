use super::ast::BinaryOp;
use crate::error::{LottieError, Result};
use crate::shape_data::ShapeData;

/// Transform channels that expressions can read on any layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformChannel {
    AnchorPoint,
    Position,
    Scale,
    Rotation,
    Opacity,
}

impl TransformChannel {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "anchorPoint" => Some(Self::AnchorPoint),
            "position" => Some(Self::Position),
            "scale" => Some(Self::Scale),
            "rotation" | "zRotation" => Some(Self::Rotation),
            "opacity" => Some(Self::Opacity),
            _ => None,
        }
    }
}

/// Handles into the composition graph. Layers, effects and parameters are
/// addressed by their slot in the owning layer list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    Comp,
    Layer(usize),
    Transform(usize),
    Channel(usize, TransformChannel),
    Effect(usize, usize),
    EffectParam(usize, usize, usize),
    ThisProperty,
    Math,
}

/// Dynamically typed expression value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Bool(bool),
    Vector(Vec<f64>),
    Color([f64; 4]),
    Path(ShapeData),
    String(String),
    Reference(Reference),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Vector(_) => "vector",
            Value::Color(_) => "color",
            Value::Path(_) => "path",
            Value::String(_) => "string",
            Value::Reference(r) => match r {
                Reference::Comp => "composition",
                Reference::Layer(_) => "layer",
                Reference::Transform(_) => "transform group",
                Reference::Effect(..) => "effect",
                Reference::Math => "Math",
                Reference::Channel(..) | Reference::EffectParam(..) | Reference::ThisProperty => {
                    "property"
                }
            },
        }
    }

    pub fn vector(components: &[f32]) -> Value {
        Value::Vector(components.iter().map(|c| *c as f64).collect())
    }

    /// Numeric view: numbers, booleans, vectors and colors.
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            Value::Number(n) => Some(vec![*n]),
            Value::Bool(b) => Some(vec![if *b { 1.0 } else { 0.0 }]),
            Value::Vector(v) => Some(v.clone()),
            Value::Color(c) => Some(c.to_vec()),
            _ => None,
        }
    }

    pub fn as_number(&self, context: &str) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Vector(v) if v.len() == 1 => Ok(v[0]),
            other => Err(LottieError::type_mismatch("number", other.type_name(), context)),
        }
    }

    pub fn as_vector(&self, context: &str) -> Result<Vec<f64>> {
        match self {
            Value::Vector(v) => Ok(v.clone()),
            Value::Color(c) => Ok(c.to_vec()),
            Value::Number(n) => Ok(vec![*n]),
            other => Err(LottieError::type_mismatch("vector", other.type_name(), context)),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn index(&self, idx: &Value) -> Result<Value> {
        let i = idx.as_number("index")?;
        let comps = match self {
            Value::Vector(v) => v.as_slice(),
            Value::Color(c) => c.as_slice(),
            Value::Number(n) if i == 0.0 => return Ok(Value::Number(*n)),
            Value::String(s) => {
                return s
                    .chars()
                    .nth(i as usize)
                    .map(|c| Value::String(c.to_string()))
                    .ok_or_else(|| LottieError::type_mismatch("index in range", "out of range", "string index"));
            }
            other => return Err(LottieError::type_mismatch("vector", other.type_name(), "index")),
        };
        if i < 0.0 || i.fract() != 0.0 || i as usize >= comps.len() {
            return Err(LottieError::type_mismatch(
                "index in range",
                "out of range",
                format!("[{}] of {}-component value", i, comps.len()),
            ));
        }
        Ok(Value::Number(comps[i as usize]))
    }

    /// Applies an operator to two plain values. Scalars broadcast against
    /// vectors; vector pairs combine over their common length.
    pub fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
        match op {
            BinaryOp::Eq => return Ok(Value::Bool(lhs.loose_eq(rhs))),
            BinaryOp::Ne => return Ok(Value::Bool(!lhs.loose_eq(rhs))),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let ctx = format!("operator {}", op.symbol());
                let (a, b) = (lhs.as_number(&ctx)?, rhs.as_number(&ctx)?);
                let r = match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Le => a <= b,
                    BinaryOp::Gt => a > b,
                    _ => a >= b,
                };
                return Ok(Value::Bool(r));
            }
            BinaryOp::And | BinaryOp::Or => {
                // short-circuiting happens in the interpreter
                let r = if op == BinaryOp::And {
                    lhs.truthy() && rhs.truthy()
                } else {
                    lhs.truthy() || rhs.truthy()
                };
                return Ok(Value::Bool(r));
            }
            _ => {}
        }

        if op == BinaryOp::Add {
            if let (Value::String(a), b) = (lhs, rhs) {
                return Ok(Value::String(format!("{}{}", a, b.display())));
            }
            if let (a, Value::String(b)) = (lhs, rhs) {
                return Ok(Value::String(format!("{}{}", a.display(), b)));
            }
        }

        let apply = |a: f64, b: f64| match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            _ => a % b,
        };
        let scalar = |v: &Value| matches!(v, Value::Number(_) | Value::Bool(_));
        let context = || format!("operator {}", op.symbol());

        match (lhs.components(), rhs.components()) {
            (Some(a), Some(b)) if scalar(lhs) && scalar(rhs) => Ok(Value::Number(apply(a[0], b[0]))),
            (Some(a), Some(b)) if scalar(rhs) => {
                Ok(Value::Vector(a.iter().map(|x| apply(*x, b[0])).collect()))
            }
            (Some(a), Some(b)) if scalar(lhs) => {
                Ok(Value::Vector(b.iter().map(|x| apply(a[0], *x)).collect()))
            }
            (Some(a), Some(b)) => Ok(Value::Vector(
                a.iter().zip(b.iter()).map(|(x, y)| apply(*x, *y)).collect(),
            )),
            (None, _) => Err(LottieError::type_mismatch(
                "number or vector",
                lhs.type_name(),
                context(),
            )),
            (_, None) => Err(LottieError::type_mismatch(
                "number or vector",
                rhs.type_name(),
                context(),
            )),
        }
    }

    fn loose_eq(&self, other: &Value) -> bool {
        match (self.components(), other.components()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Bool(b) => b.to_string(),
            Value::String(s) => s.clone(),
            Value::Vector(_) | Value::Color(_) => self
                .components()
                .unwrap_or_default()
                .into_iter()
                .map(format_number)
                .collect::<Vec<_>>()
                .join(","),
            other => format!("[{}]", other.type_name()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_broadcasts_over_vectors() {
        let v = Value::Vector(vec![10.0, 20.0]);
        assert_eq!(
            Value::binary(BinaryOp::Sub, &Value::Number(1.0), &v).unwrap(),
            Value::Vector(vec![-9.0, -19.0])
        );
        assert_eq!(
            Value::binary(BinaryOp::Mul, &v, &Value::Number(2.0)).unwrap(),
            Value::Vector(vec![20.0, 40.0])
        );
    }

    #[test]
    fn vectors_combine_over_common_length() {
        let a = Value::Vector(vec![1.0, 2.0, 3.0]);
        let b = Value::Color([1.0, 1.0, 1.0, 1.0]);
        assert_eq!(
            Value::binary(BinaryOp::Sub, &a, &b).unwrap(),
            Value::Vector(vec![0.0, 1.0, 2.0])
        );
    }

    #[test]
    fn non_numeric_operands_are_type_errors() {
        let err = Value::binary(
            BinaryOp::Mul,
            &Value::Reference(Reference::Layer(0)),
            &Value::Number(2.0),
        )
        .unwrap_err();
        assert!(matches!(err, LottieError::Type { found: "layer", .. }));
        let err = Value::binary(BinaryOp::Sub, &Value::String("a".into()), &Value::Number(1.0))
            .unwrap_err();
        assert!(matches!(err, LottieError::Type { found: "string", .. }));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(
            Value::binary(BinaryOp::Add, &Value::String("n=".into()), &Value::Number(3.0)).unwrap(),
            Value::String("n=3".into())
        );
    }

    #[test]
    fn indexing() {
        let v = Value::Vector(vec![4.0, 5.0]);
        assert_eq!(v.index(&Value::Number(1.0)).unwrap(), Value::Number(5.0));
        assert!(v.index(&Value::Number(2.0)).is_err());
    }
}
