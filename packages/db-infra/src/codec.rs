//! ORM-side adapter for the structured-value codec: a custom value type
//! stored as TEXT, so entity columns behave identically to columns defined
//! through the migration layer. All encoding goes through
//! [`migration::codec`].

use migration::codec;
use sea_orm::sea_query::{ArrayType, ColumnType, Nullable, Value, ValueType, ValueTypeErr};
use sea_orm::{ColIdx, DbErr, QueryResult, TryGetError, TryGetable};
use serde_json::Value as JsonValue;

/// A tree-shaped value round-tripped through a single text column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonText(pub JsonValue);

impl From<JsonValue> for JsonText {
    fn from(v: JsonValue) -> Self {
        Self(v)
    }
}

impl From<JsonText> for Value {
    fn from(v: JsonText) -> Self {
        Value::String(codec::encode(Some(&v.0)).map(Box::new))
    }
}

impl TryGetable for JsonText {
    fn try_get_by<I: ColIdx>(res: &QueryResult, idx: I) -> Result<Self, TryGetError> {
        let raw = <Option<String> as TryGetable>::try_get_by(res, idx)?;
        match codec::decode(raw.as_deref()) {
            Ok(Some(v)) => Ok(JsonText(v)),
            Ok(None) => Err(TryGetError::Null(
                idx.as_str().map(str::to_owned).unwrap_or_default(),
            )),
            Err(e) => Err(TryGetError::DbErr(DbErr::TryIntoErr {
                from: "TEXT",
                into: "JsonText",
                source: Box::new(e),
            })),
        }
    }
}

impl ValueType for JsonText {
    fn try_from(v: Value) -> Result<Self, ValueTypeErr> {
        match v {
            Value::String(Some(s)) => codec::decode(Some(s.as_str()))
                .ok()
                .flatten()
                .map(JsonText)
                .ok_or(ValueTypeErr),
            _ => Err(ValueTypeErr),
        }
    }

    fn type_name() -> String {
        stringify!(JsonText).to_owned()
    }

    fn array_type() -> ArrayType {
        ArrayType::String
    }

    fn column_type() -> ColumnType {
        ColumnType::Text
    }
}

impl Nullable for JsonText {
    fn null() -> Value {
        Value::String(None)
    }
}
