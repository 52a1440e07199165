//! Covariance kernels for one-dimensional Gaussian Processes.
//!
//! A kernel maps a pair of scalar positions to their covariance. The set of
//! kernels is closed: every shape is a variant of [`Kernel`] carrying only the
//! parameters it uses, and composition goes through [`Kernel::Sum`] and
//! [`Kernel::Product`].

use std::f64::consts::PI;
use std::fmt;
use std::ops::{Add, Mul};

use crate::covariance::Matrix;
use crate::error::{Error, Result};

/// Period of the periodic kernels (one table cycle in radians)
pub const TABLE_PERIOD: f64 = 2.0 * PI;

/// Variance the factory gives PeriodicExponential and PeriodicMatern32
const PERIODIC_FACTORY_VARIANCE: f64 = 0.3 * 0.3;

/// Kernel names accepted by [`kernel_for_name`] and used for sweeps
pub const ALL_KERNELS: &[&str] = &[
    "RBF",
    "Exponential",
    "Matern32",
    "Matern52",
    "PeriodicExponential",
    "PeriodicMatern32",
    "PeriodicMatern52",
    "StdPeriodic",
    "ExpQuad",
    "OU",
    "RatQuad",
    "MLP",
    "Spline",
    "Poly",
];

fn check_positive(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(Error::InvalidParameter { name, value })
    }
}

/// Parameters of a stationary kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stationary {
    pub lengthscale: f64,
    pub variance: f64,
}

impl Stationary {
    pub fn new(lengthscale: f64, variance: f64) -> Result<Self> {
        Ok(Self {
            lengthscale: check_positive("lengthscale", lengthscale)?,
            variance: check_positive("variance", variance)?,
        })
    }

    /// Scaled distance r = |x1 - x2| / lengthscale
    #[inline]
    fn r(&self, x1: f64, x2: f64) -> f64 {
        (x1 - x2).abs() / self.lengthscale
    }
}

/// Parameters of a periodic kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Periodic {
    pub lengthscale: f64,
    pub variance: f64,
    pub period: f64,
}

impl Periodic {
    pub fn new(lengthscale: f64, variance: f64) -> Result<Self> {
        Ok(Self {
            lengthscale: check_positive("lengthscale", lengthscale)?,
            variance: check_positive("variance", variance)?,
            period: TABLE_PERIOD,
        })
    }

    /// Chordal distance between the two positions wrapped onto a circle of
    /// circumference `period`, divided by the lengthscale.
    #[inline]
    fn r(&self, x1: f64, x2: f64) -> f64 {
        let half_angle = PI * (x1 - x2) / self.period;
        (self.period / PI) * half_angle.sin().abs() / self.lengthscale
    }
}

/// Multi-layer perceptron (arc-sine) kernel parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mlp {
    pub variance: f64,
    pub weight_variance: f64,
    pub bias_variance: f64,
}

impl Default for Mlp {
    fn default() -> Self {
        Self {
            variance: 1.0,
            weight_variance: 1.0,
            bias_variance: 1.0,
        }
    }
}

/// Polynomial kernel parameters: variance * (scale * x1 * x2 + bias)^order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polynomial {
    pub variance: f64,
    pub scale: f64,
    pub bias: f64,
    pub order: i32,
}

impl Default for Polynomial {
    fn default() -> Self {
        Self {
            variance: 1.0,
            scale: 1.0,
            bias: 1.0,
            order: 3,
        }
    }
}

/// Covariance kernel
#[derive(Debug, Clone, PartialEq)]
pub enum Kernel {
    Rbf(Stationary),
    Exponential(Stationary),
    Matern32(Stationary),
    Matern52(Stationary),
    PeriodicExponential(Periodic),
    PeriodicMatern32(Periodic),
    PeriodicMatern52(Periodic),
    StdPeriodic(Periodic),
    ExpQuad(Stationary),
    Ou(Stationary),
    /// Rational quadratic with shape `power`
    RatQuad { params: Stationary, power: f64 },
    Brownian { variance: f64 },
    White { variance: f64 },
    Mlp(Mlp),
    /// Integrated Brownian motion (cubic spline)
    Spline { variance: f64 },
    Polynomial(Polynomial),
    Sum(Box<Kernel>, Box<Kernel>),
    Product(Box<Kernel>, Box<Kernel>),
}

impl Kernel {
    pub fn rbf(lengthscale: f64) -> Result<Self> {
        Ok(Self::Rbf(Stationary::new(lengthscale, 1.0)?))
    }

    pub fn exponential(lengthscale: f64) -> Result<Self> {
        Ok(Self::Exponential(Stationary::new(lengthscale, 1.0)?))
    }

    pub fn matern32(lengthscale: f64) -> Result<Self> {
        Ok(Self::Matern32(Stationary::new(lengthscale, 1.0)?))
    }

    pub fn matern52(lengthscale: f64) -> Result<Self> {
        Ok(Self::Matern52(Stationary::new(lengthscale, 1.0)?))
    }

    pub fn std_periodic(lengthscale: f64) -> Result<Self> {
        Ok(Self::StdPeriodic(Periodic::new(lengthscale, 1.0)?))
    }

    pub fn brownian(variance: f64) -> Result<Self> {
        Ok(Self::Brownian {
            variance: check_positive("variance", variance)?,
        })
    }

    pub fn white(variance: f64) -> Result<Self> {
        Ok(Self::White {
            variance: check_positive("variance", variance)?,
        })
    }

    pub fn spline(variance: f64) -> Result<Self> {
        Ok(Self::Spline {
            variance: check_positive("variance", variance)?,
        })
    }

    /// Sum of two kernels
    pub fn sum(k1: Kernel, k2: Kernel) -> Self {
        Self::Sum(Box::new(k1), Box::new(k2))
    }

    /// Product of two kernels
    pub fn product(k1: Kernel, k2: Kernel) -> Self {
        Self::Product(Box::new(k1), Box::new(k2))
    }

    /// Covariance between positions `x1` and `x2`
    pub fn evaluate(&self, x1: f64, x2: f64) -> f64 {
        match self {
            Self::Rbf(p) | Self::ExpQuad(p) => {
                let r = p.r(x1, x2);
                p.variance * (-0.5 * r * r).exp()
            }
            Self::Exponential(p) | Self::Ou(p) => p.variance * (-p.r(x1, x2)).exp(),
            Self::Matern32(p) => p.variance * matern32(p.r(x1, x2)),
            Self::Matern52(p) => p.variance * matern52(p.r(x1, x2)),
            Self::PeriodicExponential(p) => p.variance * (-p.r(x1, x2)).exp(),
            Self::PeriodicMatern32(p) => p.variance * matern32(p.r(x1, x2)),
            Self::PeriodicMatern52(p) => p.variance * matern52(p.r(x1, x2)),
            Self::StdPeriodic(p) => {
                let s = (PI * (x1 - x2) / p.period).sin() / p.lengthscale;
                p.variance * (-0.5 * s * s).exp()
            }
            Self::RatQuad { params, power } => {
                let r = params.r(x1, x2);
                params.variance * (1.0 + r * r / (2.0 * power)).powf(-power)
            }
            Self::Brownian { variance } => {
                if same_side(x1, x2) {
                    variance * x1.abs().min(x2.abs())
                } else {
                    0.0
                }
            }
            Self::White { variance } => {
                if x1 == x2 {
                    *variance
                } else {
                    0.0
                }
            }
            Self::Mlp(p) => {
                let num = p.weight_variance * x1 * x2 + p.bias_variance;
                let d1 = p.weight_variance * x1 * x1 + p.bias_variance + 1.0;
                let d2 = p.weight_variance * x2 * x2 + p.bias_variance + 1.0;
                let arg = (num / (d1 * d2).sqrt()).clamp(-1.0, 1.0);
                p.variance * 2.0 / PI * arg.asin()
            }
            Self::Spline { variance } => {
                if same_side(x1, x2) {
                    let m = x1.abs().min(x2.abs());
                    let d = (x1 - x2).abs();
                    variance * (d * m * m / 2.0 + m * m * m / 3.0)
                } else {
                    0.0
                }
            }
            Self::Polynomial(p) => p.variance * (p.scale * x1 * x2 + p.bias).powi(p.order),
            Self::Sum(k1, k2) => k1.evaluate(x1, x2) + k2.evaluate(x1, x2),
            Self::Product(k1, k2) => k1.evaluate(x1, x2) * k2.evaluate(x1, x2),
        }
    }

    /// Cross-covariance matrix: rows follow `xs`, columns follow `ys`
    pub fn gram(&self, xs: &[f64], ys: &[f64]) -> Matrix {
        let mut out = Matrix::zeros(xs.len(), ys.len());
        for (i, &x) in xs.iter().enumerate() {
            for (j, &y) in ys.iter().enumerate() {
                out[(i, j)] = self.evaluate(x, y);
            }
        }
        out
    }

    /// Gram matrix of `xs` against itself, evaluated on the lower triangle
    /// and mirrored so the result is exactly symmetric.
    pub fn gram_symmetric(&self, xs: &[f64]) -> Matrix {
        let n = xs.len();
        let mut out = Matrix::zeros(n, n);
        for i in 0..n {
            for j in 0..=i {
                let k = self.evaluate(xs[i], xs[j]);
                out[(i, j)] = k;
                out[(j, i)] = k;
            }
        }
        out
    }

    /// Whether sampled paths are continuous and differentiable across the
    /// wrap point of one table period.
    pub fn is_periodic(&self) -> bool {
        match self {
            Self::PeriodicExponential(_)
            | Self::PeriodicMatern32(_)
            | Self::PeriodicMatern52(_)
            | Self::StdPeriodic(_) => true,
            Self::Sum(k1, k2) | Self::Product(k1, k2) => k1.is_periodic() && k2.is_periodic(),
            _ => false,
        }
    }

    /// Short kernel name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rbf(_) => "RBF",
            Self::Exponential(_) => "Exponential",
            Self::Matern32(_) => "Matern32",
            Self::Matern52(_) => "Matern52",
            Self::PeriodicExponential(_) => "PeriodicExponential",
            Self::PeriodicMatern32(_) => "PeriodicMatern32",
            Self::PeriodicMatern52(_) => "PeriodicMatern52",
            Self::StdPeriodic(_) => "StdPeriodic",
            Self::ExpQuad(_) => "ExpQuad",
            Self::Ou(_) => "OU",
            Self::RatQuad { .. } => "RatQuad",
            Self::Brownian { .. } => "Brownian",
            Self::White { .. } => "White",
            Self::Mlp(_) => "MLP",
            Self::Spline { .. } => "Spline",
            Self::Polynomial(_) => "Poly",
            Self::Sum(..) => "Sum",
            Self::Product(..) => "Product",
        }
    }
}

impl fmt::Display for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rbf(p)
            | Self::Exponential(p)
            | Self::Matern32(p)
            | Self::Matern52(p)
            | Self::ExpQuad(p)
            | Self::Ou(p) => write!(
                f,
                "{}(lengthscale={}, variance={})",
                self.name(),
                p.lengthscale,
                p.variance
            ),
            Self::PeriodicExponential(p)
            | Self::PeriodicMatern32(p)
            | Self::PeriodicMatern52(p)
            | Self::StdPeriodic(p) => write!(
                f,
                "{}(lengthscale={}, variance={}, period={:.4})",
                self.name(),
                p.lengthscale,
                p.variance,
                p.period
            ),
            Self::RatQuad { params, power } => write!(
                f,
                "RatQuad(lengthscale={}, variance={}, power={})",
                params.lengthscale, params.variance, power
            ),
            Self::Brownian { variance } | Self::White { variance } | Self::Spline { variance } => {
                write!(f, "{}(variance={})", self.name(), variance)
            }
            Self::Mlp(p) => write!(
                f,
                "MLP(variance={}, weight_variance={}, bias_variance={})",
                p.variance, p.weight_variance, p.bias_variance
            ),
            Self::Polynomial(p) => write!(
                f,
                "Poly(variance={}, scale={}, bias={}, order={})",
                p.variance, p.scale, p.bias, p.order
            ),
            Self::Sum(k1, k2) => write!(f, "({k1} + {k2})"),
            Self::Product(k1, k2) => write!(f, "({k1} * {k2})"),
        }
    }
}

impl Add for Kernel {
    type Output = Kernel;

    fn add(self, rhs: Kernel) -> Kernel {
        Kernel::sum(self, rhs)
    }
}

impl Mul for Kernel {
    type Output = Kernel;

    fn mul(self, rhs: Kernel) -> Kernel {
        Kernel::product(self, rhs)
    }
}

#[inline]
fn matern32(r: f64) -> f64 {
    let s = 3f64.sqrt() * r;
    (1.0 + s) * (-s).exp()
}

#[inline]
fn matern52(r: f64) -> f64 {
    let s = 5f64.sqrt() * r;
    (1.0 + s + 5.0 / 3.0 * r * r) * (-s).exp()
}

/// Sign agreement with zero only matching zero (`f64::signum` maps 0 to 1).
#[inline]
fn same_side(x1: f64, x2: f64) -> bool {
    fn sign(x: f64) -> i8 {
        if x > 0.0 {
            1
        } else if x < 0.0 {
            -1
        } else {
            0
        }
    }
    sign(x1) == sign(x2)
}

/// Build a kernel from its name and lengthscale.
///
/// Kernels without a lengthscale ignore the argument.
pub fn kernel_for_name(name: &str, lengthscale: f64) -> Result<Kernel> {
    let kernel = match name {
        "RBF" => Kernel::Rbf(Stationary::new(lengthscale, 1.0)?),
        "Exponential" => Kernel::Exponential(Stationary::new(lengthscale, 1.0)?),
        "Matern32" => Kernel::Matern32(Stationary::new(lengthscale, 1.0)?),
        "Matern52" => Kernel::Matern52(Stationary::new(lengthscale, 1.0)?),
        "PeriodicExponential" => {
            Kernel::PeriodicExponential(Periodic::new(lengthscale, PERIODIC_FACTORY_VARIANCE)?)
        }
        "PeriodicMatern32" => {
            Kernel::PeriodicMatern32(Periodic::new(lengthscale, PERIODIC_FACTORY_VARIANCE)?)
        }
        "PeriodicMatern52" => Kernel::PeriodicMatern52(Periodic::new(lengthscale, 1.0)?),
        "StdPeriodic" => Kernel::StdPeriodic(Periodic::new(lengthscale, 1.0)?),
        "Brownian" => Kernel::brownian(1.0)?,
        "ExpQuad" => Kernel::ExpQuad(Stationary::new(lengthscale, 1.0)?),
        "OU" => Kernel::Ou(Stationary::new(lengthscale, 1.0)?),
        "RatQuad" => Kernel::RatQuad {
            params: Stationary::new(lengthscale, 1.0)?,
            power: 2.0,
        },
        "White" => Kernel::white(1.0)?,
        "MLP" => Kernel::Mlp(Mlp::default()),
        "Spline" => Kernel::spline(1.0)?,
        "Poly" | "Polynomial" => Kernel::Polynomial(Polynomial::default()),
        other => return Err(Error::UnknownKernel(other.to_string())),
    };
    Ok(kernel)
}
