//! Scalar fields used as source terms, fluxes, coefficients and boundary data.

use crate::error::{Error, Result};
use crate::types::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A thread-safe scalar field `x ↦ f(x)`.
#[derive(Clone)]
pub struct Expression {
    f: Arc<dyn Fn(&Point2) -> f64 + Send + Sync>,
    constant: Option<f64>,
}

impl Expression {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Point2) -> f64 + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(f),
            constant: None,
        }
    }

    /// A spatially constant field.
    pub fn constant(value: f64) -> Self {
        Self {
            f: Arc::new(move |_| value),
            constant: Some(value),
        }
    }

    /// Evaluate at a point.
    #[inline]
    pub fn eval(&self, x: &Point2) -> f64 {
        (self.f)(x)
    }

    /// The value if this field was built with [`Expression::constant`].
    pub fn as_constant(&self) -> Option<f64> {
        self.constant
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.constant {
            Some(c) => write!(f, "Expression::constant({})", c),
            None => write!(f, "Expression(<closure>)"),
        }
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::constant(value)
    }
}

/// Coordinate axis selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    #[default]
    X,
    Y,
}

impl Axis {
    fn pick(self, p: &Point2) -> f64 {
        match self {
            Axis::X => p.x,
            Axis::Y => p.y,
        }
    }
}

/// Serializable description of a scalar field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FieldSpec {
    /// `value`
    Constant { value: f64 },
    /// `amplitude * exp(-|x - center|² / width)`
    Gaussian {
        amplitude: f64,
        center: [f64; 2],
        width: f64,
    },
    /// `amplitude * sin(frequency * x_axis)`
    Sine {
        amplitude: f64,
        frequency: f64,
        #[serde(default)]
        axis: Axis,
    },
    /// `c + cx x + cy y + cxx x² + cyy y² + cxy x y`
    Polynomial {
        #[serde(default)]
        c: f64,
        #[serde(default)]
        cx: f64,
        #[serde(default)]
        cy: f64,
        #[serde(default)]
        cxx: f64,
        #[serde(default)]
        cyy: f64,
        #[serde(default)]
        cxy: f64,
    },
}

impl FieldSpec {
    /// Check parameters that would make the field ill-defined.
    pub fn validate(&self) -> Result<()> {
        let finite = |v: f64, what: &str| {
            if v.is_finite() {
                Ok(())
            } else {
                Err(Error::Config(format!("{} must be finite, got {}", what, v)))
            }
        };
        match self {
            FieldSpec::Constant { value } => finite(*value, "constant value"),
            FieldSpec::Gaussian {
                amplitude,
                center,
                width,
            } => {
                finite(*amplitude, "gaussian amplitude")?;
                finite(center[0], "gaussian center")?;
                finite(center[1], "gaussian center")?;
                if *width <= 0.0 || !width.is_finite() {
                    return Err(Error::Config(format!(
                        "gaussian width must be positive, got {}",
                        width
                    )));
                }
                Ok(())
            }
            FieldSpec::Sine {
                amplitude,
                frequency,
                ..
            } => {
                finite(*amplitude, "sine amplitude")?;
                finite(*frequency, "sine frequency")
            }
            FieldSpec::Polynomial {
                c,
                cx,
                cy,
                cxx,
                cyy,
                cxy,
            } => [c, cx, cy, cxx, cyy, cxy]
                .iter()
                .try_for_each(|v| finite(**v, "polynomial coefficient")),
        }
    }

    /// Build the corresponding expression.
    pub fn to_expression(&self) -> Expression {
        match *self {
            FieldSpec::Constant { value } => Expression::constant(value),
            FieldSpec::Gaussian {
                amplitude,
                center,
                width,
            } => Expression::new(move |p| {
                let dx = p.x - center[0];
                let dy = p.y - center[1];
                amplitude * (-(dx * dx + dy * dy) / width).exp()
            }),
            FieldSpec::Sine {
                amplitude,
                frequency,
                axis,
            } => Expression::new(move |p| amplitude * (frequency * axis.pick(p)).sin()),
            FieldSpec::Polynomial {
                c,
                cx,
                cy,
                cxx,
                cyy,
                cxy,
            } => Expression::new(move |p| {
                c + cx * p.x + cy * p.y + cxx * p.x * p.x + cyy * p.y * p.y + cxy * p.x * p.y
            }),
        }
    }
}
