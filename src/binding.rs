//! Deserialization of merged request data.
//!
//! JSON bodies arrive typed, but route parameters, query strings and form
//! fields are text. Text fields are parsed into whatever primitive the
//! target type asks for, so `/users/:id` binds to `id: u64` and
//! `?verbose=true` binds to `verbose: bool`.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::value::{MapDeserializer, StringDeserializer};
use serde::de::{DeserializeOwned, Error as _, IntoDeserializer, Unexpected, Visitor};
use serde::{forward_to_deserialize_any, Deserializer};
use serde_json::Value;

/// A single bound field.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Field {
    /// A value from a JSON body.
    Json(Value),
    /// A value from the path, the query string or a form.
    Text(String),
}

impl From<Value> for Field {
    /// Strings become [`Field::Text`], everything else stays JSON.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Field::Text(text),
            other => Field::Json(other),
        }
    }
}

/// The merged request fields. Later inserts replace earlier ones.
pub(crate) type Fields = BTreeMap<String, Field>;

pub(crate) fn deserialize<T: DeserializeOwned>(fields: Fields) -> Result<T, serde_json::Error> {
    T::deserialize(MapDeserializer::new(fields.into_iter()))
}

type Error = serde_json::Error;

fn parse<'de, T, V>(text: String, visitor: &V) -> Result<T, Error>
where
    T: FromStr,
    V: Visitor<'de>,
{
    text.trim()
        .parse()
        .map_err(|_| Error::invalid_value(Unexpected::Str(&text), visitor))
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident,)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self {
                    Field::Json(value) => value.$method(visitor),
                    Field::Text(text) => {
                        let parsed = parse(text, &visitor)?;
                        visitor.$visit(parsed)
                    }
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Field {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_any(visitor),
            Field::Text(text) => visitor.visit_string(text),
        }
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_option(visitor),
            // `?draft=` means no value
            Field::Text(text) if text.is_empty() => visitor.visit_none(),
            text => visitor.visit_some(text),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_newtype_struct(name, visitor),
            text => visitor.visit_newtype_struct(text),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_enum(name, variants, visitor),
            Field::Text(text) => {
                let variant: StringDeserializer<Error> = text.into_deserializer();
                visitor.visit_enum(variant)
            }
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_seq(visitor),
            text => text.deserialize_any(visitor),
        }
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_map(visitor),
            text => text.deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_struct(name, fields, visitor),
            text => text.deserialize_any(visitor),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Field::Json(value) => value.deserialize_unit(visitor),
            text => text.deserialize_any(visitor),
        }
    }

    forward_to_deserialize_any! {
        i128 u128 str string bytes byte_buf unit_struct tuple tuple_struct
        identifier ignored_any
    }
}

impl<'de> IntoDeserializer<'de, Error> for Field {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    enum Sort {
        #[serde(rename = "asc")]
        Asc,
        #[serde(rename = "desc")]
        Desc,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Listing {
        id: u64,
        verbose: bool,
        ratio: f32,
        sort: Sort,
        page: Option<u32>,
        cursor: Option<u32>,
        name: String,
        tags: Vec<String>,
    }

    fn fields(entries: Vec<(&str, Field)>) -> Fields {
        entries
            .into_iter()
            .map(|(name, field)| (name.to_string(), field))
            .collect()
    }

    #[test]
    fn text_is_parsed_into_requested_primitives() {
        let listing: Listing = deserialize(fields(vec![
            ("id", Field::Text("5".into())),
            ("verbose", Field::Text("true".into())),
            ("ratio", Field::Text("0.5".into())),
            ("sort", Field::Text("desc".into())),
            ("page", Field::Text("2".into())),
            ("cursor", Field::Text(String::new())),
            ("name", Field::Text("42".into())),
            ("tags", Field::Json(json!(["a", "b"]))),
        ]))
        .unwrap();

        assert_eq!(
            listing,
            Listing {
                id: 5,
                verbose: true,
                ratio: 0.5,
                sort: Sort::Desc,
                page: Some(2),
                cursor: None,
                name: "42".to_string(),
                tags: vec!["a".to_string(), "b".to_string()],
            }
        );
    }

    #[test]
    fn json_values_keep_their_types() {
        #[derive(Debug, Deserialize)]
        struct Count {
            count: u64,
        }

        let count: Count = deserialize(fields(vec![("count", Field::Json(json!(7)))])).unwrap();
        assert_eq!(count.count, 7);

        let err = deserialize::<Count>(fields(vec![("count", Field::Json(json!("7")))]));
        assert!(err.is_err());
    }

    #[test]
    fn unparsable_text_names_the_value() {
        #[derive(Debug, Deserialize)]
        struct User {
            #[allow(dead_code)]
            id: u64,
        }

        let err = deserialize::<User>(fields(vec![("id", Field::Text("five".into()))]))
            .unwrap_err()
            .to_string();
        assert!(err.contains("\"five\""), "{}", err);
    }

    #[test]
    fn untyped_targets_see_strings() {
        let value: Value = deserialize(fields(vec![("id", Field::Text("5".into()))])).unwrap();
        assert_eq!(value, json!({ "id": "5" }));
    }
}
