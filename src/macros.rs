//! Accessor and authoring macros
//!
//! Accessor generation uses `paste` internally for identifier concatenation.

// =============================================================================
// Enum accessor generation
// =============================================================================

/// Generate is_xxx, as_xxx, as_xxx_mut for enums with single-field variants
///
/// # Generated methods per variant:
/// - `is_xxx(&self) -> bool`
/// - `as_xxx(&self) -> Option<&Type>`
/// - `as_xxx_mut(&mut self) -> Option<&mut Type>`
///
/// # Example
/// ```ignore
/// impl Node {
///     impl_enum_accessors!(element => Element(Element), text => Text(Text));
/// }
/// ```
#[macro_export]
macro_rules! impl_enum_accessors {
    ($($name:ident => $variant:ident($ty:ty)),* $(,)?) => {
        ::paste::paste! {
            $(
                #[doc = "Check if this is a `" $variant "`"]
                #[inline]
                pub fn [<is_ $name>](&self) -> bool {
                    matches!(self, Self::$variant(_))
                }

                #[doc = "Try to get as `" $variant "` reference"]
                #[inline]
                pub fn [<as_ $name>](&self) -> Option<&$ty> {
                    match self { Self::$variant(v) => Some(v), _ => None }
                }

                #[doc = "Try to get as mutable `" $variant "` reference"]
                #[inline]
                pub fn [<as_ $name _mut>](&mut self) -> Option<&mut $ty> {
                    match self { Self::$variant(v) => Some(v), _ => None }
                }
            )*
        }
    };
}

// =============================================================================
// Authoring
// =============================================================================

/// Build a [`Handler`](crate::value::Handler) that remembers its own source text.
///
/// Handlers are compared by source text between renders, so a closure that is
/// re-created every render with the same body is not rebound.
///
/// # Example
/// ```ignore
/// let on_click = handler!(|_event| counter.fetch_add(1, Ordering::Relaxed));
/// ```
#[macro_export]
macro_rules! handler {
    ($($closure:tt)+) => {
        $crate::value::Handler::new(stringify!($($closure)+), $($closure)+)
    };
}

/// Build a [`TemplateResult`](crate::value::TemplateResult) from alternating
/// fragments and values.
///
/// Fragments are string literals, values are bracketed expressions converted
/// with `DynamicValue::from`.
///
/// # Example
/// ```ignore
/// let row = template!("<li class=\"" [class] "\">" [label] "</li>");
/// ```
#[macro_export]
macro_rules! template {
    ($first:literal $([$value:expr] $fragment:literal)*) => {
        $crate::value::template(
            [$first $(, $fragment)*],
            vec![$($crate::value::DynamicValue::from($value)),*],
        )
    };
}
