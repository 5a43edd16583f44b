//! Compile-time descriptor derivation for Rust types.
//!
//! `Describe` pairs a type's shape with a conversion of its instances into `Value`.
//! Records and enumerations get their impls from `describe_record!` / `describe_enum!`.
//! Self-referential shapes cannot be described this way; register them by name and use
//! `TypeDescriptor::Ref` instead.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::{ScalarKind, TypeDescriptor, Value};

pub trait Describe {
    fn descriptor() -> TypeDescriptor;
    fn to_value(&self) -> Value;
}

macro_rules! scalar_describe {
    ($kind:ident: $($t:ty),+ => |$v:ident| $body:expr) => {
        $(
            impl Describe for $t {
                fn descriptor() -> TypeDescriptor { TypeDescriptor::Scalar(ScalarKind::$kind) }
                fn to_value(&self) -> Value {
                    let $v = self;
                    $body
                }
            }
        )+
    };
}

scalar_describe!(Integer: i8, i16, i32, u8, u16 => |v| Value::Integer(i64::from(*v)));
scalar_describe!(Long: i64, u32 => |v| Value::Integer(i64::from(*v)));
scalar_describe!(Float: f32, f64 => |v| Value::Float(f64::from(*v)));
scalar_describe!(Boolean: bool => |v| Value::Boolean(*v));
scalar_describe!(Text: String => |v| Value::Text(v.clone()));
scalar_describe!(DateTime: DateTime<Utc> => |v| Value::DateTime(*v));
scalar_describe!(TimeSpan: Duration => |v| Value::TimeSpan(*v));

impl<T: Describe> Describe for Option<T> {
    fn descriptor() -> TypeDescriptor { TypeDescriptor::nullable(T::descriptor()) }
    fn to_value(&self) -> Value { self.as_ref().map(Describe::to_value).unwrap_or(Value::Null) }
}

impl<T: Describe> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor { TypeDescriptor::sequence(T::descriptor()) }
    fn to_value(&self) -> Value { Value::List(self.iter().map(Describe::to_value).collect()) }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor { TypeDescriptor::mapping(K::descriptor(), V::descriptor()) }
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }
}

/// Declare a struct together with its `Describe` impl. Fields are walked in declaration order.
#[macro_export]
macro_rules! describe_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field : $fty ),*
        }

        impl $crate::Describe for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::record(
                    $crate::RecordDescriptor::new(stringify!($name))
                        $( .field(stringify!($field), <$fty as $crate::Describe>::descriptor()) )*
                )
            }

            #[allow(unused_mut)]
            fn to_value(&self) -> $crate::Value {
                let mut fields = ::std::collections::BTreeMap::<String, $crate::Value>::new();
                $( fields.insert(stringify!($field).to_string(), $crate::Describe::to_value(&self.$field)); )*
                $crate::Value::Record(fields)
            }
        }
    };
}

/// Declare a fieldless enum together with its `Describe` impl. Ordinals follow declaration order.
/// The macro derives `Debug, Clone, Copy, PartialEq, Eq`.
#[macro_export]
macro_rules! describe_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $crate::Describe for $name {
            fn descriptor() -> $crate::TypeDescriptor {
                $crate::TypeDescriptor::enumeration($crate::EnumDescriptor::new(
                    stringify!($name),
                    [ $( stringify!($variant) ),+ ],
                ))
            }

            fn to_value(&self) -> $crate::Value { $crate::Value::Ordinal(*self as i64) }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EnumDescriptor, RecordDescriptor};

    crate::describe_enum! {
        enum Crime { None, Claim, Fine, Bounty }
    }

    crate::describe_record! {
        struct Coordinates {
            x: f64,
            y: f64,
        }
    }

    crate::describe_record! {
        struct Jumped {
            system_name: String,
            coordinates: Option<Coordinates>,
            crimes: Vec<Crime>,
        }
    }

    #[test]
    fn record_macro_derives_descriptor_in_declaration_order() {
        let expected = TypeDescriptor::record(
            RecordDescriptor::new("Jumped")
                .field("system_name", TypeDescriptor::text())
                .field(
                    "coordinates",
                    TypeDescriptor::nullable(TypeDescriptor::record(
                        RecordDescriptor::new("Coordinates")
                            .field("x", TypeDescriptor::float())
                            .field("y", TypeDescriptor::float()),
                    )),
                )
                .field(
                    "crimes",
                    TypeDescriptor::sequence(TypeDescriptor::enumeration(EnumDescriptor::new(
                        "Crime",
                        ["None", "Claim", "Fine", "Bounty"],
                    ))),
                ),
        );
        assert_eq!(Jumped::descriptor(), expected);
    }

    #[test]
    fn record_macro_converts_values() {
        let j = Jumped { system_name: "Artemis".into(), coordinates: None, crimes: vec![Crime::Fine] };
        let v = j.to_value();
        assert_eq!(v.field("system_name"), &Value::from("Artemis"));
        assert!(v.field("coordinates").is_null());
        assert_eq!(v.field("crimes"), &Value::List(vec![Value::Ordinal(2)]));
    }

    #[test]
    fn maps_keep_key_order() {
        let mut m = BTreeMap::new();
        m.insert("b".to_string(), 2i32);
        m.insert("a".to_string(), 1i32);
        assert_eq!(
            m.to_value(),
            Value::Map(vec![(Value::from("a"), Value::Integer(1)), (Value::from("b"), Value::Integer(2))])
        );
    }
}
