//! Shared macros for the backend crate.

/// Generate a `fmt::Debug` implementation that keeps secrets out of logs.
///
/// Each field is listed with how it should be rendered:
///
/// - `show field_name` - the value's own `Debug` output
/// - `redact field_name` - `"[REDACTED]"`
/// - `redact_option field_name` - `Some("[REDACTED]")` or `None`
///
/// ```ignore
/// redacted_debug!(User {
///     show username,
///     redact password_hash,
/// });
/// ```
macro_rules! redacted_debug {
    ($name:ident { $( $kind:ident $field:ident ),* $(,)? }) => {
        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                let mut s = f.debug_struct(stringify!($name));
                $( redacted_debug!(@add_field s, self, $kind, $field); )*
                s.finish_non_exhaustive()
            }
        }
    };
    (@add_field $s:ident, $self:ident, show, $field:ident) => {
        $s.field(stringify!($field), &$self.$field);
    };
    (@add_field $s:ident, $self:ident, redact, $field:ident) => {
        $s.field(stringify!($field), &"[REDACTED]");
    };
    (@add_field $s:ident, $self:ident, redact_option, $field:ident) => {
        $s.field(stringify!($field), &$self.$field.as_ref().map(|_| "[REDACTED]"));
    };
}
