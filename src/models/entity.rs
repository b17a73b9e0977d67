//! Records mapped to and from statement parameters and result rows.
//!
//! A record type describes its fields once, in a static table of
//! [`Field`] descriptors, usually generated by [`impl_entity!`](crate::impl_entity).

use super::value::{Value, ValueError};

/// Accessor pair for one record field.
pub struct Field<E> {
    /// Field name in camelCase, e.g. `varcharColumn`.
    pub name: &'static str,
    pub get: fn(&E) -> Value,
    pub set: fn(&mut E, Value) -> Result<(), ValueError>,
}

/// A record with a static field-descriptor table.
pub trait Entity: Default + Send + Sync + 'static {
    fn fields() -> &'static [Field<Self>];

    /// Look up a field descriptor by its camelCase name.
    fn field(name: &str) -> Option<&'static Field<Self>> {
        Self::fields().iter().find(|f| f.name == name)
    }
}

/// The record with no fields.
impl Entity for () {
    fn fields() -> &'static [Field<Self>] {
        &[]
    }
}

/// Implement [`Entity`] for a struct from `"camelName" => rust_field` pairs.
///
/// # Example
///
/// ```
/// #[derive(Debug, Default)]
/// struct User {
///     user_id: i64,
///     display_name: Option<String>,
/// }
///
/// sqlframe::impl_entity!(User {
///     "userId" => user_id,
///     "displayName" => display_name,
/// });
///
/// use sqlframe::models::Entity;
/// assert_eq!(User::fields().len(), 2);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($ty:ty { $($name:literal => $field:ident),* $(,)? }) => {
        impl $crate::models::Entity for $ty {
            fn fields() -> &'static [$crate::models::Field<Self>] {
                const FIELDS: &[$crate::models::Field<$ty>] = &[
                    $(
                        $crate::models::Field {
                            name: $name,
                            get: |record: &$ty| -> $crate::models::Value {
                                $crate::models::ToValue::to_value(&record.$field)
                            },
                            set: |record: &mut $ty,
                                  value: $crate::models::Value|
                             -> ::core::result::Result<(), $crate::models::ValueError> {
                                record.$field = $crate::models::FromValue::from_value(value)?;
                                ::core::result::Result::Ok(())
                            },
                        },
                    )*
                ];
                FIELDS
            }
        }
    };
}
