/*!
 * Operator implementations for Vars.
 *
 * These implementations are written here but Rust docs will display them on the
 * [Var](super::Var) struct page.
 *
 * Vars implement all the standard library traits for addition, subtraction, multiplication,
 * division and negation, so you can use the normal `+ - * /` operators as you can with `f64`.
 * As a convenience, these operations can also be used with a Var on one side and an `f64`
 * constant on the other, which records the constant as part of the operation instead of as a
 * separate node.
 *
 * ```
 * use easy_rev::differentiation::Context;
 * let context = Context::new();
 * let x = context.variable(2.0);
 * let y = (x * 2.0) - (1.0 / x);
 * assert_eq!(y.number, 3.5);
 * assert_eq!(y.derivatives()[&x], 2.25);
 * ```
 *
 * Vars also implement the [extra](crate::numeric::extra) numeric traits. Note that to use a
 * method defined in a trait you have to import the trait as well as have a type that
 * implements it!
 *
 * Every operation computes the derivative of its result with respect to each operand from
 * the operands' numbers at the time it is called, and records those partials on the new
 * node. Nothing is recomputed during the reverse sweep.
 */

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::differentiation::{binary, unary, Var};
use crate::numeric::extra::{Cos, Exp, Ln, Pi, Pow, Sin, Sqrt};
use crate::numeric::{Real, ZeroOne};

/**
 * A var is displayed by showing its number component.
 */
impl<'a> fmt::Display for Var<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number)
    }
}

impl<'a> ZeroOne for Var<'a> {
    #[inline]
    fn zero() -> Var<'a> {
        Var::constant(0.0)
    }
    #[inline]
    fn one() -> Var<'a> {
        Var::constant(1.0)
    }
}

/**
 * Lifts a number to a constant Var.
 */
impl<'a> From<f64> for Var<'a> {
    #[inline]
    fn from(c: f64) -> Var<'a> {
        Var::constant(c)
    }
}

impl<'a> Real for Var<'a> {
    #[inline]
    fn value(&self) -> f64 {
        self.number
    }
}

impl<'a> Pi for Var<'a> {
    #[inline]
    fn pi() -> Var<'a> {
        Var::constant(std::f64::consts::PI)
    }
}

macro_rules! var_operator_impl_value_value {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for two vars.
         */
        impl<'a> $op for Var<'a> {
            type Output = Var<'a>;
            #[track_caller]
            #[inline]
            fn $method(self, rhs: Var<'a>) -> Self::Output {
                (&self).$method(&rhs)
            }
        }
    };
}

macro_rules! var_operator_impl_value_reference {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for two vars with the right referenced.
         */
        impl<'a> $op<&Var<'a>> for Var<'a> {
            type Output = Var<'a>;
            #[track_caller]
            #[inline]
            fn $method(self, rhs: &Var<'a>) -> Self::Output {
                (&self).$method(rhs)
            }
        }
    };
}

macro_rules! var_operator_impl_reference_value {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for two vars with the left referenced.
         */
        impl<'a> $op<Var<'a>> for &Var<'a> {
            type Output = Var<'a>;
            #[track_caller]
            #[inline]
            fn $method(self, rhs: Var<'a>) -> Self::Output {
                self.$method(&rhs)
            }
        }
    };
}

macro_rules! var_number_operator_impl_value {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for a var and a constant.
         */
        impl<'a> $op<f64> for Var<'a> {
            type Output = Var<'a>;
            #[inline]
            fn $method(self, rhs: f64) -> Self::Output {
                (&self).$method(rhs)
            }
        }
    };
}

macro_rules! number_var_operator_impl_value {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for a constant and a var.
         */
        impl<'a> $op<Var<'a>> for f64 {
            type Output = Var<'a>;
            #[inline]
            fn $method(self, rhs: Var<'a>) -> Self::Output {
                self.$method(&rhs)
            }
        }
    };
}

macro_rules! var_operator_impl_all {
    (impl $op:tt for Var { fn $method:ident }) => {
        var_operator_impl_value_value!(impl $op for Var { fn $method });
        var_operator_impl_value_reference!(impl $op for Var { fn $method });
        var_operator_impl_reference_value!(impl $op for Var { fn $method });
        var_number_operator_impl_value!(impl $op for Var { fn $method });
        number_var_operator_impl_value!(impl $op for Var { fn $method });
    };
}

/**
 * Addition for two referenced vars using the same Context.
 */
impl<'a, 'l, 'r> Add<&'r Var<'a>> for &'l Var<'a> {
    type Output = Var<'a>;
    #[track_caller]
    #[inline]
    fn add(self, rhs: &Var<'a>) -> Self::Output {
        binary(
            self,
            // δ(self + rhs) / δself = 1
            1.0,
            rhs,
            // δ(self + rhs) / δrhs = 1
            1.0,
            self.number + rhs.number,
        )
    }
}

/**
 * Addition for a referenced var and a constant.
 */
impl<'a> Add<f64> for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn add(self, rhs: f64) -> Self::Output {
        // δ(self + C) / δself = 1
        unary(self, self.number + rhs, 1.0)
    }
}

/**
 * Addition for a constant and a referenced var.
 */
impl<'a> Add<&Var<'a>> for f64 {
    type Output = Var<'a>;
    #[inline]
    fn add(self, rhs: &Var<'a>) -> Self::Output {
        // δ(C + rhs) / δrhs = 1
        unary(rhs, self + rhs.number, 1.0)
    }
}

var_operator_impl_all!(impl Add for Var { fn add });

/**
 * Subtraction for two referenced vars using the same Context.
 */
impl<'a, 'l, 'r> Sub<&'r Var<'a>> for &'l Var<'a> {
    type Output = Var<'a>;
    #[track_caller]
    #[inline]
    fn sub(self, rhs: &Var<'a>) -> Self::Output {
        binary(
            self,
            // δ(self - rhs) / δself = 1
            1.0,
            rhs,
            // δ(self - rhs) / δrhs = -1
            -1.0,
            self.number - rhs.number,
        )
    }
}

/**
 * Subtraction for a referenced var and a constant.
 */
impl<'a> Sub<f64> for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn sub(self, rhs: f64) -> Self::Output {
        // δ(self - C) / δself = 1
        unary(self, self.number - rhs, 1.0)
    }
}

/**
 * Subtraction for a constant and a referenced var.
 */
impl<'a> Sub<&Var<'a>> for f64 {
    type Output = Var<'a>;
    #[inline]
    fn sub(self, rhs: &Var<'a>) -> Self::Output {
        // δ(C - rhs) / δrhs = -1
        unary(rhs, self - rhs.number, -1.0)
    }
}

var_operator_impl_all!(impl Sub for Var { fn sub });

/**
 * Multiplication for two referenced vars using the same Context.
 */
impl<'a, 'l, 'r> Mul<&'r Var<'a>> for &'l Var<'a> {
    type Output = Var<'a>;
    #[track_caller]
    #[inline]
    fn mul(self, rhs: &Var<'a>) -> Self::Output {
        binary(
            self,
            // δ(self * rhs) / δself = rhs
            rhs.number,
            rhs,
            // δ(self * rhs) / δrhs = self
            self.number,
            self.number * rhs.number,
        )
    }
}

/**
 * Multiplication for a referenced var and a constant.
 */
impl<'a> Mul<f64> for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn mul(self, rhs: f64) -> Self::Output {
        // δ(self * C) / δself = C
        unary(self, self.number * rhs, rhs)
    }
}

/**
 * Multiplication for a constant and a referenced var.
 */
impl<'a> Mul<&Var<'a>> for f64 {
    type Output = Var<'a>;
    #[inline]
    fn mul(self, rhs: &Var<'a>) -> Self::Output {
        // δ(C * rhs) / δrhs = C
        unary(rhs, self * rhs.number, self)
    }
}

var_operator_impl_all!(impl Mul for Var { fn mul });

/**
 * Division for two referenced vars using the same Context.
 */
impl<'a, 'l, 'r> Div<&'r Var<'a>> for &'l Var<'a> {
    type Output = Var<'a>;
    #[track_caller]
    #[inline]
    fn div(self, rhs: &Var<'a>) -> Self::Output {
        binary(
            self,
            // δ(self / rhs) / δself = 1 / rhs
            1.0 / rhs.number,
            rhs,
            // δ(self / rhs) / δrhs = -(self / rhs^2)
            -self.number / (rhs.number * rhs.number),
            self.number / rhs.number,
        )
    }
}

/**
 * Division for a referenced var and a constant.
 */
impl<'a> Div<f64> for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn div(self, rhs: f64) -> Self::Output {
        // δ(self / C) / δself = 1 / C
        unary(self, self.number / rhs, 1.0 / rhs)
    }
}

/**
 * Division for a constant and a referenced var.
 */
impl<'a> Div<&Var<'a>> for f64 {
    type Output = Var<'a>;
    #[inline]
    fn div(self, rhs: &Var<'a>) -> Self::Output {
        // δ(C / rhs) / δrhs = -(C / rhs^2)
        unary(rhs, self / rhs.number, -self / (rhs.number * rhs.number))
    }
}

var_operator_impl_all!(impl Div for Var { fn div });

/**
 * Negation of a var by reference.
 */
impl<'a> Neg for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn neg(self) -> Self::Output {
        // δ(-self) / δself = -1
        unary(self, -self.number, -1.0)
    }
}

/**
 * Negation of a var by value.
 */
impl<'a> Neg for Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn neg(self) -> Self::Output {
        -&self
    }
}

/**
 * Summing vars is the same as adding them together one at a time. The sum of no vars is a
 * constant 0.
 */
impl<'a> Sum for Var<'a> {
    #[track_caller]
    fn sum<I>(iter: I) -> Var<'a>
    where
        I: Iterator<Item = Var<'a>>,
    {
        iter.fold(Var::zero(), |total, next| total + next)
    }
}

impl<'a, 'b> Sum<&'b Var<'a>> for Var<'a> {
    #[track_caller]
    fn sum<I>(iter: I) -> Var<'a>
    where
        I: Iterator<Item = &'b Var<'a>>,
    {
        iter.fold(Var::zero(), |total, next| total + next)
    }
}

macro_rules! var_real_operator_impl_value {
    (impl $op:tt for Var { fn $method:ident }) => {
        /**
         * Operation for a var by value.
         */
        impl<'a> $op for Var<'a> {
            type Output = Var<'a>;
            #[inline]
            fn $method(self) -> Self::Output {
                (&self).$method()
            }
        }
    };
}

/**
 * Sine of a var by reference.
 */
impl<'a> Sin for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn sin(self) -> Self::Output {
        // δ(sin(self)) / δself = cos(self)
        unary(self, self.number.sin(), self.number.cos())
    }
}

var_real_operator_impl_value!(impl Sin for Var { fn sin });

/**
 * Cosine of a var by reference.
 */
impl<'a> Cos for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn cos(self) -> Self::Output {
        // δ(cos(self)) / δself = -sin(self)
        unary(self, self.number.cos(), -self.number.sin())
    }
}

var_real_operator_impl_value!(impl Cos for Var { fn cos });

/**
 * Exponential, ie e<sup>x</sup> of a var by reference.
 */
impl<'a> Exp for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn exp(self) -> Self::Output {
        let exp = self.number.exp();
        // δ(e^self) / δself = e^self
        unary(self, exp, exp)
    }
}

var_real_operator_impl_value!(impl Exp for Var { fn exp });

/**
 * Natural logarithm, ie ln(x) of a var by reference.
 */
impl<'a> Ln for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn ln(self) -> Self::Output {
        // δ(ln(self)) / δself = 1 / self
        unary(self, self.number.ln(), 1.0 / self.number)
    }
}

var_real_operator_impl_value!(impl Ln for Var { fn ln });

/**
 * Square root of a var by reference.
 */
impl<'a> Sqrt for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn sqrt(self) -> Self::Output {
        let sqrt = self.number.sqrt();
        // δ(sqrt(self)) / δself = 1 / (2*sqrt(self))
        unary(self, sqrt, 1.0 / (2.0 * sqrt))
    }
}

var_real_operator_impl_value!(impl Sqrt for Var { fn sqrt });

/**
 * Power of one var to another, ie self^rhs for two referenced vars using the same Context.
 */
impl<'a, 'l, 'r> Pow<&'r Var<'a>> for &'l Var<'a> {
    type Output = Var<'a>;
    #[track_caller]
    #[inline]
    fn pow(self, rhs: &Var<'a>) -> Self::Output {
        let power = self.number.powf(rhs.number);
        binary(
            self,
            // δ(self^rhs) / δself = rhs * self^(rhs-1)
            rhs.number * self.number.powf(rhs.number - 1.0),
            rhs,
            // δ(self^rhs) / δrhs = self^rhs * ln(self), which tends to 0 as self does
            if self.number == 0.0 {
                0.0
            } else {
                power * self.number.ln()
            },
            power,
        )
    }
}

/**
 * Power of a referenced var to a constant.
 */
impl<'a> Pow<f64> for &Var<'a> {
    type Output = Var<'a>;
    #[inline]
    fn pow(self, rhs: f64) -> Self::Output {
        // δ(self^C) / δself = C * self^(C-1)
        unary(
            self,
            self.number.powf(rhs),
            rhs * self.number.powf(rhs - 1.0),
        )
    }
}

/**
 * Power of a constant to a referenced var.
 */
impl<'a> Pow<&Var<'a>> for f64 {
    type Output = Var<'a>;
    #[inline]
    fn pow(self, rhs: &Var<'a>) -> Self::Output {
        let power = self.powf(rhs.number);
        // δ(C^rhs) / δrhs = C^rhs * ln(C)
        unary(
            rhs,
            power,
            if self == 0.0 { 0.0 } else { power * self.ln() },
        )
    }
}

var_operator_impl_all!(impl Pow for Var { fn pow });
