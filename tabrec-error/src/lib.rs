#![feature(error_generic_member_access)]
#![deny(missing_docs)]

//! This crate defines error & result types for Tabrec.
//! It also contains a variety of useful macros for error handling.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::{env, fmt, io};

/// A string that can be used as an error message.
#[derive(Debug)]
pub struct ErrString(Cow<'static, str>);

#[allow(clippy::fallible_impl_from)]
impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    #[allow(clippy::panic)]
    fn from(msg: T) -> Self {
        if env::var("TABREC_PANIC_ON_ERR").as_deref().unwrap_or("") == "1" {
            panic!("{}", msg.into())
        } else {
            Self(msg.into())
        }
    }
}

impl AsRef<str> for ErrString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// The top-level error type for Tabrec.
#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum TabrecError {
    /// An index was outside the valid range.
    #[error("index {0} out of bounds from {1} to {2}\nBacktrace:\n{3}")]
    OutOfBounds(usize, usize, usize, Backtrace),
    /// An invalid argument was provided, or a caller broke an access contract.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidArgument(ErrString, Backtrace),
    /// Persisted bytes could not be read back into a valid value.
    #[error("{0}\nBacktrace:\n{1}")]
    InvalidSerde(ErrString, Backtrace),
    /// A value of one type was supplied where another was expected.
    #[error("expected type: {0} but instead got {1}\nBacktrace:\n{2}")]
    MismatchedTypes(ErrString, ErrString, Backtrace),
    /// A required collaborator (dictionary, codec) could not be found.
    #[error("{0}\nBacktrace:\n{1}")]
    NotFound(ErrString, Backtrace),
    /// A wrapper for other errors, carrying additional context.
    #[error("{0}: {1}")]
    Context(ErrString, #[source] Box<TabrecError>),
    /// A wrapper for IO errors.
    #[error("{0}\nBacktrace:\n{1}")]
    IOError(#[from] io::Error, Backtrace),
}

impl TabrecError {
    /// Adds additional context to an error.
    pub fn with_context<T: Into<ErrString>>(self, msg: T) -> Self {
        TabrecError::Context(msg.into(), Box::new(self))
    }
}

impl Debug for TabrecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// A type alias for Results that return TabrecErrors as their error type.
pub type TabrecResult<T> = Result<T, TabrecError>;

/// A trait for unwrapping a TabrecResult.
pub trait TabrecUnwrap {
    /// The type of the value being unwrapped.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (programmer error).
    fn tabrec_unwrap(self) -> Self::Output;
}

impl<T, E> TabrecUnwrap for Result<T, E>
where
    E: Into<TabrecError>,
{
    type Output = T;

    #[inline(always)]
    fn tabrec_unwrap(self) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|err| __private::panic_with(err))
    }
}

/// A trait for expect-ing a TabrecResult or an Option.
pub trait TabrecExpect {
    /// The type of the value being expected.
    type Output;

    /// Returns the value of the result if it is Ok, otherwise panics with the error.
    /// Should be called only in contexts where the error condition represents a bug (programmer error).
    fn tabrec_expect(self, msg: &str) -> Self::Output;
}

impl<T, E> TabrecExpect for Result<T, E>
where
    E: Into<TabrecError>,
{
    type Output = T;

    #[inline(always)]
    fn tabrec_expect(self, msg: &str) -> Self::Output {
        self.map_err(|err| err.into())
            .unwrap_or_else(|e| __private::panic_with(e.with_context(msg.to_string())))
    }
}

impl<T> TabrecExpect for Option<T> {
    type Output = T;

    #[inline(always)]
    fn tabrec_expect(self, msg: &str) -> Self::Output {
        self.unwrap_or_else(|| {
            __private::panic_with(TabrecError::InvalidArgument(
                msg.to_string().into(),
                Backtrace::capture(),
            ))
        })
    }
}

/// A convenient macro for creating a TabrecError.
#[macro_export]
macro_rules! tabrec_err {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabrecError::OutOfBounds($idx, $start, $stop, Backtrace::capture())
        )
    }};
    (NotFound: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabrecError::NotFound(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    (InvalidArgument: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabrecError::InvalidArgument(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    (InvalidSerde: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabrecError::InvalidSerde(format!($fmt, $($arg),*).into(), Backtrace::capture())
        )
    }};
    (MismatchedTypes: $expected:expr, $actual:expr) => {{
        use std::backtrace::Backtrace;
        $crate::__private::must_use(
            $crate::TabrecError::MismatchedTypes(
                $expected.to_string().into(),
                $actual.to_string().into(),
                Backtrace::capture(),
            )
        )
    }};
    (Context: $msg:literal, $err:expr) => {{
        $crate::__private::must_use(
            $crate::TabrecError::Context($msg.into(), Box::new($err))
        )
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::tabrec_err!(InvalidArgument: $fmt, $($arg),*)
    };
}

/// A convenient macro for returning a TabrecError.
#[macro_export]
macro_rules! tabrec_bail {
    ($($tt:tt)+) => {
        return Err($crate::tabrec_err!($($tt)+))
    };
}

/// A convenient macro for panicking with a TabrecError in the presence of a programmer error
/// (e.g., an invariant has been violated).
#[macro_export]
macro_rules! tabrec_panic {
    (OutOfBounds: $idx:expr, $start:expr, $stop:expr) => {{
        $crate::__private::panic_with($crate::tabrec_err!(OutOfBounds: $idx, $start, $stop))
    }};
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::__private::panic_with($crate::tabrec_err!($variant: $fmt, $($arg),*))
    }};
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::__private::panic_with($crate::tabrec_err!($fmt, $($arg),*))
    }};
    ($err:expr) => {{
        let err: $crate::TabrecError = $err;
        $crate::__private::panic_with(err)
    }};
}

#[doc(hidden)]
pub mod __private {
    use crate::TabrecError;

    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub fn must_use(err: TabrecError) -> TabrecError {
        err
    }

    #[doc(hidden)]
    #[cold]
    #[track_caller]
    #[allow(clippy::panic)]
    pub fn panic_with(err: TabrecError) -> ! {
        panic!("{}", err)
    }
}
