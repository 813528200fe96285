use std::{fmt, io};
use std::any::Any;
use std::panic::Location;
use std::error::Error as StdError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug)]
pub struct Error {
    detail: Vec<Box<dyn ErrorDetail>>,
    prev: Option<Box<Error>>,
    _location: &'static Location<'static>,
}

pub trait ErrorDetail: fmt::Display + fmt::Debug + Send + Sync {
    fn context(&self) -> Vec<(Option<String>, String)> { vec![] }

    /// Typed access to the detail for callers that match on it.
    fn as_any(&self) -> Option<&dyn Any> { None }
}

/// The fatal, build-time content failures. Any of these aborts the build of
/// the whole collection: nothing is published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// A required field is missing or a field has the wrong type.
    SchemaValidation {
        path: String,
        field: String,
        reason: String,
    },
    /// Two documents of one collection resolve to the same slug.
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },
    /// An embedded component reference outside of the allowed set.
    UnknownComponent {
        path: String,
        name: String,
    },
    /// Malformed embedded component syntax.
    Compilation {
        path: String,
        line: usize,
        message: String,
    },
}

impl Error {
    pub fn chain(self, mut other: Error) -> Self {
        #[inline]
        fn _chain(error: Error, behind: &mut Error) {
            if let Some(prev) = behind.prev.as_mut() {
                _chain(error, prev);
            } else {
                behind.prev = Some(Box::new(error));
            }
        }

        _chain(self, &mut other);
        other
    }

    /// Finds the first detail of type `T` in this error or any error it chains.
    pub fn find<T: 'static>(&self) -> Option<&T> {
        self.details().find_map(|d| d.as_any()?.downcast_ref::<T>())
    }

    /// All details of type `T`, outermost error first.
    pub fn find_all<T: 'static>(&self) -> Vec<&T> {
        self.details()
            .filter_map(|d| d.as_any()?.downcast_ref::<T>())
            .collect()
    }

    fn details(&self) -> impl Iterator<Item = &dyn ErrorDetail> + '_ {
        let mut error = Some(self);
        std::iter::from_fn(move || {
            let current = error?;
            error = current.prev.as_deref();
            Some(current.detail.iter().map(|d| &**d))
        }).flatten()
    }
}

impl ErrorDetail for &(dyn StdError + Send + Sync) {
    fn context(&self) -> Vec<(Option<String>, String)> {
        let mut ctxt = vec![];
        let mut error = self.source();
        while let Some(e) = error {
            ctxt.push((None, e.to_string()));
            error = e.source();
        }

        ctxt
    }
}

macro_rules! impl_error_detail_with_std_error {
    ($T:ty) => {
        impl $crate::error::ErrorDetail for $T {
            fn context(&self) -> Vec<(Option<String>, String)> {
                let error: &(dyn std::error::Error + Send + Sync) = self;
                error.context()
            }
        }
    }
}

impl_error_detail_with_std_error!(io::Error);
impl_error_detail_with_std_error!(toml::de::Error);
impl_error_detail_with_std_error!(serde_json::Error);
impl_error_detail_with_std_error!(serde_yaml_ng::Error);
impl_error_detail_with_std_error!(notify::Error);
impl_error_detail_with_std_error!(jwalk::Error);

impl ErrorDetail for String { }
impl ErrorDetail for &str { }

impl ErrorDetail for ContentError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        match self {
            ContentError::SchemaValidation { path, field, reason } => vec![
                (Some("document".into()), path.clone()),
                (Some("field".into()), field.clone()),
                (Some("reason".into()), reason.clone()),
            ],
            ContentError::DuplicateSlug { slug, first, second } => vec![
                (Some("slug".into()), slug.clone()),
                (Some("first document".into()), first.clone()),
                (Some("second document".into()), second.clone()),
            ],
            ContentError::UnknownComponent { path, name } => vec![
                (Some("document".into()), path.clone()),
                (Some("component".into()), name.clone()),
            ],
            ContentError::Compilation { path, line, message } => vec![
                (Some("document".into()), format!("{path}:{line}")),
                (None, message.clone()),
            ],
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentError::SchemaValidation { field, .. } => {
                write!(f, "schema validation failed for field `{field}`")
            }
            ContentError::DuplicateSlug { slug, .. } => {
                write!(f, "duplicate slug `{slug}`")
            }
            ContentError::UnknownComponent { name, .. } => {
                write!(f, "unknown embedded component `{name}`")
            }
            ContentError::Compilation { .. } => {
                write!(f, "malformed embedded component syntax")
            }
        }
    }
}

impl<T: ErrorDetail + 'static> From<T> for Error {
    #[track_caller]
    fn from(detail: T) -> Self {
        Error {
            prev: None,
            detail: vec![Box::new(detail)],
            _location: std::panic::Location::caller(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        #[derive(Copy, Clone)] struct Indent(usize);

        impl fmt::Display for Indent {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                for _ in 0..(self.0 * 4) { write!(f, " ")? }
                Ok(())
            }
        }

        struct NestedError<'a>(Indent, &'a Error);

        impl fmt::Display for NestedError<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let NestedError(indent, e) = self;

                for detail in &e.detail {
                    let indent_line = format!("\n{indent}");

                    writeln!(f, "{indent}{}", format!("{:#}", detail).replace('\n', &indent_line))?;
                    for (key, value) in detail.context() {
                        let value = value.replace('\n', &indent_line);
                        if let Some(key) = key {
                            writeln!(f, "{indent}{key}: {value}")?;
                        } else {
                            writeln!(f, "{indent}{value}")?;
                        }
                    }

                    if std::env::var_os("RUST_BACKTRACE").is_some() {
                        writeln!(f, "{indent}[{}]", e._location)?;
                    }
                }

                if let Some(prev) = &e.prev {
                    NestedError(Indent(indent.0 + 1), prev).fmt(f)?;
                }

                Ok(())
            }
        }

        NestedError(Indent(0), self).fmt(f)
    }
}

impl StdError for Error { }

#[derive(Debug)]
pub struct MakeshiftError {
    pub message: String,
    pub parameters: Vec<(Option<String>, String)>,
}

#[doc(hidden)]
#[macro_export]
macro_rules! err {
    ($($token:tt)*) => (Err($crate::error!($($token)*)));
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($msg:expr, $($rest:tt)*) => (
        $crate::error::Error::from($crate::error::MakeshiftError {
            message: $msg.to_string(),
            parameters: {
                #[allow(unused_mut)]
                let mut v: Vec<(Option<String>, String)> = Vec::new();
                $crate::error!(@param v $($rest)*);
                v
            },
        })
    );

    ($msg:expr) => ( $crate::error!($msg,) );

    (@param $v:ident $key:expr => $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $key => $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $key:expr => $value:expr) => {
        $v.push((Some($key.to_string()), $value.to_string()));
    };

    (@param $v:ident $value:expr, $($rest:tt)*) => {
        $crate::error!(@param $v $value);
        $crate::error!(@param $v $($rest)*);
    };

    (@param $v:ident $value:expr) => {
        $v.push((None, $value.to_string()));
    };

    (@param $v:ident $(,)?) => { };
}

impl fmt::Display for MakeshiftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.message.fmt(f)
    }
}

impl ErrorDetail for MakeshiftError {
    fn context(&self) -> Vec<(Option<String>, String)> {
        self.parameters.clone()
    }
}

pub trait Chainable<T> {
    fn chain(self, other: impl Into<Error>) -> Result<T>;

    fn chain_with<F, E>(self, f: F) -> Result<T>
        where F: FnOnce() -> E, E: Into<Error>;
}

impl<T, E: Into<Error>> Chainable<T> for Result<T, E> {
    #[track_caller]
    fn chain(self, other: impl Into<Error>) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(other.into()))
        }
    }

    fn chain_with<F, Err>(self, f: F) -> Result<T>
        where F: FnOnce() -> Err, Err: Into<Error>,
     {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(e.into().chain(f().into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_typed_detail_through_chain() {
        let inner = Error::from(ContentError::UnknownComponent {
            path: "posts/a.mdx".into(),
            name: "Foo".into(),
        });

        let outer = Err::<(), _>(inner).chain(error!("failed to build collection", "posts"));
        let error = outer.unwrap_err();
        match error.find::<ContentError>() {
            Some(ContentError::UnknownComponent { name, .. }) => assert_eq!(name, "Foo"),
            other => panic!("unexpected detail: {other:?}"),
        }

        assert!(error.to_string().contains("failed to build collection"));
        assert!(error.to_string().contains("unknown embedded component `Foo`"));
    }

    #[test]
    fn untyped_errors_have_no_typed_detail() {
        let error = error!("plain", "key" => "value");
        assert!(error.find::<ContentError>().is_none());
        assert!(error.to_string().contains("key: value"));
    }
}
