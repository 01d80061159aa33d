use crate::{TypeInfo, TypePath};

/// A static accessor to compile-time type information.
///
/// Implemented by [`#[derive(Schema)]`](crate::derive::Schema) for records and
/// by this crate for primitives, strings, tuples and the standard containers.
///
/// Manual implementations should store the info in a
/// [`NonGenericTypeInfoCell`] or a [`GenericTypeInfoCell`]:
///
/// ```
/// use vc_schema::{
///     NonGenericTypeInfoCell, OpaqueInfo, Type, TypeInfo, TypePath, Typed,
/// };
///
/// struct Timestamp(u64);
///
/// impl TypePath for Timestamp {
///     fn type_path() -> &'static str { "my_crate::Timestamp" }
///     fn type_name() -> &'static str { "Timestamp" }
///     fn type_ident() -> &'static str { "Timestamp" }
/// }
///
/// impl Typed for Timestamp {
///     fn type_info() -> &'static TypeInfo {
///         static CELL: NonGenericTypeInfoCell = NonGenericTypeInfoCell::new();
///         CELL.get_or_init(|| TypeInfo::Opaque(OpaqueInfo::new::<Self>()))
///     }
/// }
///
/// assert!(Timestamp::type_info().ty().is::<Timestamp>());
/// ```
///
/// [`NonGenericTypeInfoCell`]: crate::NonGenericTypeInfoCell
/// [`GenericTypeInfoCell`]: crate::GenericTypeInfoCell
pub trait Typed: TypePath {
    /// Returns the process-wide type information of `Self`.
    fn type_info() -> &'static TypeInfo;
}
