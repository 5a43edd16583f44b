//! Descriptor-guided reading of JSON payloads into `Value`.

use chrono::{DateTime, Duration, Utc};
use flatvar_core::{Resolver, ScalarKind, TypeDescriptor, Value};
use serde_json::Value as Json;
use tracing::debug;

const MAX_REF_HOPS: usize = 32;

/// Read `json` as an instance of `desc`.
///
/// RFC 3339 strings become date-times, variant names or numbers become enum ordinals,
/// objects become records or maps and numbers declared as timespans are read as seconds.
/// Anything that does not fit its declaration keeps its natural reading so the walk can
/// report the mismatch against the field it belongs to.
pub fn decode(json: &Json, desc: &TypeDescriptor, resolver: &dyn Resolver) -> Value {
    if json.is_null() { return Value::Null; }
    let desc = match resolve(desc, resolver) {
        Some(d) => d,
        None => return Value::from_json(json),
    };
    match (&desc, json) {
        (TypeDescriptor::Scalar(kind), _) => scalar(*kind, json),
        (TypeDescriptor::Enumeration(e), Json::String(s)) => match e.ordinal_of(s) {
            Some(o) => Value::Ordinal(o),
            None => natural(&desc, json),
        },
        (TypeDescriptor::Enumeration(_), Json::Number(n)) => match n.as_i64() {
            Some(o) => Value::Ordinal(o),
            None => natural(&desc, json),
        },
        (TypeDescriptor::Sequence(element), Json::Array(items)) => {
            Value::List(items.iter().map(|i| decode(i, element, resolver)).collect())
        }
        (TypeDescriptor::Mapping { key, value }, Json::Object(entries)) => Value::Map(
            entries.iter().map(|(k, v)| (map_key(k, key, resolver), decode(v, value, resolver))).collect(),
        ),
        (TypeDescriptor::Record(rec), Json::Object(entries)) => Value::Record(
            entries
                .iter()
                .map(|(k, v)| {
                    let field = match rec.get(k) {
                        Some(f) => decode(v, &f.ty, resolver),
                        None => Value::from_json(v),
                    };
                    (k.clone(), field)
                })
                .collect(),
        ),
        _ => natural(&desc, json),
    }
}

fn resolve(desc: &TypeDescriptor, resolver: &dyn Resolver) -> Option<TypeDescriptor> {
    let mut cur = desc.unwrap_nullable().clone();
    for _ in 0..MAX_REF_HOPS {
        let next = match &cur {
            TypeDescriptor::Ref(name) => resolver.resolve(name)?,
            _ => return Some(cur),
        };
        cur = next.unwrap_nullable().clone();
    }
    None
}

fn natural(desc: &TypeDescriptor, json: &Json) -> Value {
    debug!(declared = %desc, "value does not fit its declaration");
    Value::from_json(json)
}

fn scalar(kind: ScalarKind, json: &Json) -> Value {
    match (kind, json) {
        (ScalarKind::DateTime, Json::String(s)) => match DateTime::parse_from_rfc3339(s) {
            Ok(dt) => Value::DateTime(dt.with_timezone(&Utc)),
            Err(e) => {
                debug!(value = %s, error = %e, "not an RFC 3339 timestamp");
                Value::Text(s.clone())
            }
        },
        (ScalarKind::Float | ScalarKind::Decimal, Json::Number(n)) => match n.as_f64() {
            Some(x) => Value::Float(x),
            None => Value::from_json(json),
        },
        (ScalarKind::TimeSpan, Json::Number(n)) => {
            match n.as_f64().and_then(|secs| Duration::try_milliseconds((secs * 1000.0).round() as i64)) {
                Some(span) => Value::TimeSpan(span),
                None => {
                    debug!(value = %n, "timespan out of range");
                    Value::from_json(json)
                }
            }
        }
        _ => Value::from_json(json),
    }
}

fn map_key(key: &str, desc: &TypeDescriptor, resolver: &dyn Resolver) -> Value {
    match resolve(desc, resolver) {
        Some(TypeDescriptor::Enumeration(e)) => e.ordinal_of(key).map(Value::Ordinal).unwrap_or_else(|| Value::from(key)),
        Some(TypeDescriptor::Scalar(ScalarKind::Integer | ScalarKind::Long)) => {
            key.parse::<i64>().map(Value::Integer).unwrap_or_else(|_| Value::from(key))
        }
        _ => Value::from(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use flatvar_core::{EnumDescriptor, NoRefs, RecordDescriptor};
    use serde_json::json;

    fn crime() -> TypeDescriptor {
        TypeDescriptor::enumeration(EnumDescriptor::new("Crime", ["None", "Claim", "Fine"]))
    }

    #[test]
    fn timestamps_and_enums_follow_the_declaration() {
        let rec = TypeDescriptor::record(
            RecordDescriptor::new("Bounty")
                .field("timestamp", TypeDescriptor::date_time())
                .field("Crime", crime())
                .field("Previous", TypeDescriptor::nullable(crime()))
                .field("Reward", TypeDescriptor::float()),
        );
        let v = decode(
            &json!({ "timestamp": "2024-03-01T10:00:00Z", "Crime": "Fine", "Previous": 1, "Reward": 10, "Extra": true }),
            &rec,
            &NoRefs,
        );
        assert_eq!(v.field("timestamp"), &Value::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap()));
        assert_eq!(v.field("Crime"), &Value::Ordinal(2));
        assert_eq!(v.field("Previous"), &Value::Ordinal(1));
        assert_eq!(v.field("Reward"), &Value::Float(10.0));
        assert_eq!(v.field("Extra"), &Value::Boolean(true));
    }

    #[test]
    fn objects_declared_as_maps_become_maps() {
        let d = TypeDescriptor::mapping(crime(), TypeDescriptor::integer());
        let v = decode(&json!({ "Claim": 3, "Piracy": 1 }), &d, &NoRefs);
        assert_eq!(
            v,
            Value::Map(vec![(Value::Ordinal(1), Value::Integer(3)), (Value::from("Piracy"), Value::Integer(1))])
        );
    }

    #[test]
    fn misfits_keep_their_natural_reading() {
        assert_eq!(decode(&json!("yesterday"), &TypeDescriptor::date_time(), &NoRefs), Value::from("yesterday"));
        assert_eq!(decode(&json!("Arson"), &crime(), &NoRefs), Value::from("Arson"));
        assert_eq!(decode(&json!([1]), &TypeDescriptor::reference("Missing"), &NoRefs), Value::List(vec![Value::Integer(1)]));
    }

    #[test]
    fn timespans_read_as_seconds() {
        let v = decode(&json!(1.5), &TypeDescriptor::scalar(ScalarKind::TimeSpan), &NoRefs);
        assert_eq!(v, Value::TimeSpan(Duration::milliseconds(1500)));
    }

    #[test]
    fn out_of_range_timespans_keep_their_natural_reading() {
        let span = TypeDescriptor::scalar(ScalarKind::TimeSpan);
        assert_eq!(decode(&json!(-1e300), &span, &NoRefs), Value::Float(-1e300));
    }
}
