/*!
 * Numerical type definitions
 *
 * The traits here let a function be written once and evaluated either on plain `f64`s or on
 * [Var](crate::differentiation::Var)s, so the same code computes a value or records a graph
 * to differentiate. Both `f64` and `Var` implement [Real].
 *
 * ```
 * use easy_rev::differentiation::Context;
 * use easy_rev::numeric::Real;
 * use easy_rev::numeric::extra::Exp;
 *
 * // x * e^x
 * fn f<T: Real>(x: T) -> T {
 *     x * x.exp()
 * }
 *
 * let context = Context::new();
 * let x = context.variable(0.5);
 * let y = f(x);
 * assert_eq!(y.number, f(0.5));
 * // d(x * e^x) / dx = e^x + x * e^x
 * assert_eq!(y.derivatives()[&x], 0.5_f64.exp() + (0.5 * 0.5_f64.exp()));
 * ```
 */

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::numeric::extra::{Cos, Exp, Ln, Pow, Sin, Sqrt};

/**
 * A trait defining how to obtain 0 and 1 for every implementing type.
 */
pub trait ZeroOne: Sized {
    fn zero() -> Self;
    fn one() -> Self;
}

impl ZeroOne for f64 {
    #[inline]
    fn zero() -> f64 {
        0.0
    }
    #[inline]
    fn one() -> f64 {
        1.0
    }
}

/**
 * A real number type that supports the arithmetic and elementary functions needed to write
 * differentiable functions generically.
 *
 * Constants can be mixed in on the right hand side of every arithmetic operator and lifted
 * with `From<f64>`.
 */
pub trait Real:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Add<f64, Output = Self>
    + Sub<f64, Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + PartialOrd
    + ZeroOne
    + From<f64>
    + Exp<Output = Self>
    + Ln<Output = Self>
    + Sqrt<Output = Self>
    + Sin<Output = Self>
    + Cos<Output = Self>
    + Pow<Self, Output = Self>
{
    /**
     * The plain number this value represents.
     */
    fn value(&self) -> f64;
}

impl Real for f64 {
    #[inline]
    fn value(&self) -> f64 {
        *self
    }
}

/**
 * Additional traits for more complex numerical operations.
 */
pub mod extra {

/**
 * A type which can be square rooted.
 *
 * This is implemented by `f64` by value and by reference.
 */
pub trait Sqrt {
    type Output;
    fn sqrt(self) -> Self::Output;
}

/**
 * A type which can compute e^self.
 *
 * This is implemented by `f64` by value and by reference.
 */
pub trait Exp {
    type Output;
    fn exp(self) -> Self::Output;
}

/**
 * A type which can compute the natural logarithm of itself.
 *
 * This is implemented by `f64` by value and by reference.
 */
pub trait Ln {
    type Output;
    fn ln(self) -> Self::Output;
}

/**
 * A type which can compute the sine of itself.
 */
pub trait Sin {
    type Output;
    fn sin(self) -> Self::Output;
}

/**
 * A type which can compute the cosine of itself.
 */
pub trait Cos {
    type Output;
    fn cos(self) -> Self::Output;
}

macro_rules! unary_float {
    (impl $op:tt for f64 { fn $method:ident }) => {
        impl $op for f64 {
            type Output = f64;
            #[inline]
            fn $method(self) -> Self::Output {
                f64::$method(self)
            }
        }
        impl $op for &f64 {
            type Output = f64;
            #[inline]
            fn $method(self) -> Self::Output {
                f64::$method(*self)
            }
        }
    };
}

unary_float!(impl Sqrt for f64 { fn sqrt });
unary_float!(impl Exp for f64 { fn exp });
unary_float!(impl Ln for f64 { fn ln });
unary_float!(impl Sin for f64 { fn sin });
unary_float!(impl Cos for f64 { fn cos });

/**
 * A type which can compute self^rhs.
 *
 * This is implemented by `f64` for all combinations of by value and by reference.
 */
pub trait Pow<Rhs = Self> {
    type Output;
    fn pow(self, rhs: Rhs) -> Self::Output;
}

// f64 ^ f64
impl Pow<f64> for f64 {
    type Output = f64;
    #[inline]
    fn pow(self, rhs: f64) -> Self::Output {
        self.powf(rhs)
    }
}

// f64 ^ &f64
impl<'a> Pow<&'a f64> for f64 {
    type Output = f64;
    #[inline]
    fn pow(self, rhs: &f64) -> Self::Output {
        self.powf(*rhs)
    }
}

// &f64 ^ f64
impl<'a> Pow<f64> for &'a f64 {
    type Output = f64;
    #[inline]
    fn pow(self, rhs: f64) -> Self::Output {
        self.powf(rhs)
    }
}

// &f64 ^ &f64
impl<'a> Pow<&'a f64> for &'a f64 {
    type Output = f64;
    #[inline]
    fn pow(self, rhs: Self) -> Self::Output {
        self.powf(*rhs)
    }
}

/**
 * A type which can represent Pi.
 */
pub trait Pi {
    fn pi() -> Self;
}

impl Pi for f64 {
    fn pi() -> f64 {
        std::f64::consts::PI
    }
}

}
