//! Mapping of declared terminal types onto host kinds.

use flatvar_core::{FlattenError, HostKind, HostValue, ScalarKind, TypeDescriptor, Value};

/// Host kind and coerced value for a terminal member.
///
/// Nullable wrappers are unwrapped and an absent value keeps the underlying kind.
/// Floating point, decimal and 64-bit integer kinds widen to the host number.
/// Records, sequences, mappings and references are never terminal and fail as `UnexpectedType`.
pub fn normalize(declared: &TypeDescriptor, value: &Value) -> Result<(HostKind, Option<HostValue>), FlattenError> {
    let declared = declared.unwrap_nullable();
    match declared {
        TypeDescriptor::Unknown => Ok((HostKind::Unknown, None)),
        TypeDescriptor::Scalar(kind) => scalar(*kind, declared, value),
        TypeDescriptor::Enumeration(e) => match value {
            Value::Null => Ok((HostKind::Text, None)),
            Value::Ordinal(o) => match e.name_of(*o) {
                Some(name) => Ok((HostKind::Text, Some(HostValue::Text(name.to_string())))),
                None => Err(FlattenError::UnknownOrdinal { name: e.name.clone(), ordinal: *o }),
            },
            Value::Text(s) if e.ordinal_of(s).is_some() => Ok((HostKind::Text, Some(HostValue::Text(s.clone())))),
            other => Err(FlattenError::mismatch(declared, other)),
        },
        other => Err(FlattenError::UnexpectedType(other.to_string())),
    }
}

fn scalar(kind: ScalarKind, declared: &TypeDescriptor, value: &Value) -> Result<(HostKind, Option<HostValue>), FlattenError> {
    let host = match kind {
        ScalarKind::Text => HostKind::Text,
        ScalarKind::Integer => HostKind::Integer,
        ScalarKind::Long | ScalarKind::Float | ScalarKind::Decimal => HostKind::Number,
        ScalarKind::Boolean => HostKind::Boolean,
        ScalarKind::DateTime => HostKind::DateTime,
        ScalarKind::TimeSpan => return Err(FlattenError::UnexpectedType(declared.to_string())),
    };
    if value.is_null() { return Ok((host, None)); }

    let coerced = match (host, value) {
        (HostKind::Text, Value::Text(s)) => HostValue::Text(s.clone()),
        (HostKind::Boolean, Value::Boolean(b)) => HostValue::Boolean(*b),
        (HostKind::DateTime, Value::DateTime(dt)) => HostValue::DateTime(*dt),
        (HostKind::Integer, Value::Integer(i)) => {
            HostValue::Integer(i32::try_from(*i).map_err(|_| FlattenError::IntegerOverflow(*i))?)
        }
        (HostKind::Number, Value::Integer(i)) => HostValue::Number(*i as f64),
        (HostKind::Number, Value::Float(x)) if kind != ScalarKind::Long => {
            if !x.is_finite() { return Err(FlattenError::NotRepresentable(*x)); }
            HostValue::Number(*x)
        }
        (_, other) => return Err(FlattenError::mismatch(declared, other)),
    };
    Ok((host, Some(coerced)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flatvar_core::{EnumDescriptor, RecordDescriptor};

    #[test]
    fn nullable_absent_keeps_inner_kind() {
        let d = TypeDescriptor::nullable(TypeDescriptor::float());
        assert_eq!(normalize(&d, &Value::Null), Ok((HostKind::Number, None)));
    }

    #[test]
    fn wide_numerics_become_numbers() {
        assert_eq!(
            normalize(&TypeDescriptor::long(), &Value::Integer(5_000_000_000)),
            Ok((HostKind::Number, Some(HostValue::Number(5_000_000_000.0))))
        );
        assert_eq!(
            normalize(&TypeDescriptor::float(), &Value::Float(1.5)),
            Ok((HostKind::Number, Some(HostValue::Number(1.5))))
        );
        assert_eq!(
            normalize(&TypeDescriptor::scalar(ScalarKind::Decimal), &Value::Integer(2)),
            Ok((HostKind::Number, Some(HostValue::Number(2.0))))
        );
    }

    #[test]
    fn small_integers_map_one_to_one_and_overflow_faults() {
        assert_eq!(
            normalize(&TypeDescriptor::integer(), &Value::Integer(-7)),
            Ok((HostKind::Integer, Some(HostValue::Integer(-7))))
        );
        assert_eq!(
            normalize(&TypeDescriptor::integer(), &Value::Integer(i64::from(i32::MAX) + 1)),
            Err(FlattenError::IntegerOverflow(i64::from(i32::MAX) + 1))
        );
    }

    #[test]
    fn non_finite_numbers_fault() {
        assert!(matches!(
            normalize(&TypeDescriptor::float(), &Value::Float(f64::NAN)),
            Err(FlattenError::NotRepresentable(_))
        ));
    }

    #[test]
    fn enumerations_resolve_symbolic_names() {
        let d = TypeDescriptor::enumeration(EnumDescriptor::new("Crime", ["None", "Claim"]));
        assert_eq!(
            normalize(&d, &Value::Ordinal(1)),
            Ok((HostKind::Text, Some(HostValue::Text("Claim".into()))))
        );
        assert_eq!(normalize(&d, &Value::Null), Ok((HostKind::Text, None)));
        assert_eq!(
            normalize(&d, &Value::Ordinal(9)),
            Err(FlattenError::UnknownOrdinal { name: "Crime".into(), ordinal: 9 })
        );
    }

    #[test]
    fn unknown_declared_type_clears() {
        assert_eq!(normalize(&TypeDescriptor::Unknown, &Value::Integer(1)), Ok((HostKind::Unknown, None)));
    }

    #[test]
    fn non_terminal_shapes_are_unexpected() {
        let rec = TypeDescriptor::record(RecordDescriptor::new("Body"));
        assert!(matches!(normalize(&rec, &Value::Null), Err(FlattenError::UnexpectedType(_))));
        let seq = TypeDescriptor::sequence(TypeDescriptor::text());
        assert!(matches!(normalize(&seq, &Value::Null), Err(FlattenError::UnexpectedType(_))));
    }

    #[test]
    fn mismatched_values_fault() {
        assert_eq!(
            normalize(&TypeDescriptor::boolean(), &Value::from("yes")),
            Err(FlattenError::ValueMismatch { expected: "boolean".into(), found: "text" })
        );
    }
}
