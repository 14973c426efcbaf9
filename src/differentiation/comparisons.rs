/*!
 * Comparisons between Vars and numbers.
 *
 * Comparing Vars only ever looks at their forward values. Nothing is recorded on any
 * Context, and the result follows IEEE-754 exactly: any comparison involving NaN is false,
 * including equality of a NaN with itself, in every order of operands. Not equal is the
 * negation of equal, so it is the one comparison that is true for NaN.
 *
 * The standard operators work on any mix of Vars and `f64`s:
 *
 * ```
 * use easy_rev::differentiation::Context;
 * let context = Context::new();
 * let a = context.variable(5.0);
 * let b = context.variable(6.0);
 * let c = context.variable(6.0);
 * assert!(a <= b);
 * assert!(!(b <= a));
 * assert!(b <= c && c <= b);
 * assert!(a < 5.5);
 * assert_eq!(context.len(), 3);
 * ```
 *
 * And the same comparisons are available as named functions for generic code which only
 * knows its arguments are [Comparable]:
 *
 * ```
 * use easy_rev::differentiation::Context;
 * use easy_rev::differentiation::comparisons::{less_than_or_equal, equal};
 * let context = Context::new();
 * let a = context.variable(f64::NAN);
 * let b = context.variable(2.0);
 * assert!(!less_than_or_equal(&a, &b));
 * assert!(!less_than_or_equal(&b, &a));
 * assert!(!less_than_or_equal(&a, &a));
 * assert!(!equal(&a, &a));
 * ```
 */

use std::cmp::Ordering;

use crate::differentiation::Var;

/**
 * A type with a forward value that can be compared.
 */
pub trait Comparable {
    /**
     * The number that comparisons are made on.
     */
    fn number(&self) -> f64;
}

impl Comparable for f64 {
    #[inline]
    fn number(&self) -> f64 {
        *self
    }
}

impl<'a> Comparable for Var<'a> {
    #[inline]
    fn number(&self) -> f64 {
        self.number
    }
}

impl<T: Comparable + ?Sized> Comparable for &T {
    #[inline]
    fn number(&self) -> f64 {
        (**self).number()
    }
}

/** a < b, false if either is NaN */
pub fn less_than(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() < b.number()
}

/** a <= b, false if either is NaN */
pub fn less_than_or_equal(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() <= b.number()
}

/** a > b, false if either is NaN */
pub fn greater_than(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() > b.number()
}

/** a >= b, false if either is NaN */
pub fn greater_than_or_equal(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() >= b.number()
}

/** a == b, false if either is NaN */
pub fn equal(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() == b.number()
}

/** a != b, true if either is NaN */
pub fn not_equal(a: impl Comparable, b: impl Comparable) -> bool {
    a.number() != b.number()
}

/**
 * Compares two vars by their numbers only, regardless of which Context they are on.
 */
impl<'a, 'b> PartialEq<Var<'b>> for Var<'a> {
    #[inline]
    fn eq(&self, other: &Var<'b>) -> bool {
        self.number == other.number
    }
}

/**
 * Compares two vars by their numbers only. There is no ordering if either is NaN.
 */
impl<'a, 'b> PartialOrd<Var<'b>> for Var<'a> {
    #[inline]
    fn partial_cmp(&self, other: &Var<'b>) -> Option<Ordering> {
        self.number.partial_cmp(&other.number)
    }
}

impl<'a> PartialEq<f64> for Var<'a> {
    #[inline]
    fn eq(&self, other: &f64) -> bool {
        self.number == *other
    }
}

impl<'a> PartialOrd<f64> for Var<'a> {
    #[inline]
    fn partial_cmp(&self, other: &f64) -> Option<Ordering> {
        self.number.partial_cmp(other)
    }
}

impl<'a> PartialEq<Var<'a>> for f64 {
    #[inline]
    fn eq(&self, other: &Var<'a>) -> bool {
        *self == other.number
    }
}

impl<'a> PartialOrd<Var<'a>> for f64 {
    #[inline]
    fn partial_cmp(&self, other: &Var<'a>) -> Option<Ordering> {
        self.partial_cmp(&other.number)
    }
}
