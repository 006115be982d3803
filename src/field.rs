use std::fmt;

use diesel::deserialize::{self, FromSql, Queryable};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, Output, ToSql};
use diesel::sql_types::BigInt;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, Registry, Type};

fn global_type(prefix: &str) -> Result<Type, Error> {
    Registry::global()
        .ok_or_else(|| Error::Backend("global registry is not set".to_string()))?
        .get(prefix)
}

pub trait TypeMarker: std::fmt::Debug {
    /// The prefix of the identifier type, as registered in the global registry.
    fn prefix() -> &'static str;
}

/// A generic type-safe object ID field (a wrapped i64).
///
/// When serialized with Serde, the number is encoded into an external identifier
/// using the type registered under the marker's `fn prefix()` in the global
/// [`Registry`]. Deserialization decodes the string back to an integer and
/// rejects identifiers of any other type.
///
/// Traits are also provided for Diesel compatibility with Postgres BigInt fields.
///
/// # Examples
///
/// ```
/// use extid_rs;
/// use serde::{Serialize, Deserialize};
/// use serde_json;
///
/// #[derive(Clone, Copy, Debug)]
/// pub struct UserIdMarker;
/// impl extid_rs::TypeMarker for UserIdMarker {
///     fn prefix() -> &'static str { "user" }
/// }
///
/// type UserId = extid_rs::Field<UserIdMarker>;
///
/// #[derive(serde::Serialize)]
/// struct User {
///     pub id: UserId,
/// }
///
/// let registry = extid_rs::Registry::new();
/// registry.register("user", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15]).unwrap();
/// extid_rs::Registry::set_global(registry);
///
/// let obj = User {id: UserId::from(1)};
/// let obj_str = serde_json::to_string(&obj).unwrap();
/// assert_eq!(obj_str, "{\"id\":\"user_13189a6ae4ab07ae70a3aabd30be99de\"}");
/// ```
#[derive(AsExpression, Debug, Clone, Copy)]
#[diesel(sql_type = BigInt)]
pub struct Field<T: TypeMarker> {
    id: i64,
    _marker: std::marker::PhantomData<T>,
}

impl<T: TypeMarker> From<Field<T>> for i64 {
    /// Returns the raw `i64` value.
    fn from(field: Field<T>) -> Self {
        field.id
    }
}

impl<T: TypeMarker> PartialEq for Field<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T: TypeMarker> Eq for Field<T> {}

impl<T: TypeMarker> fmt::Display for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Field {{ id: {}, prefix: {} }}", self.id, T::prefix())
    }
}

impl<T: TypeMarker> Field<T> {
    /// Creates a `Field<T>` value from an `i64`.
    ///
    /// This method converts an `i64` into a `Field<T>`, effectively changing its type.
    pub fn from(id: i64) -> Self {
        Field {
            id,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Encodes the ID with the globally registered type.
    pub fn encode(&self) -> Result<String, Error> {
        Ok(global_type(T::prefix())?.encode(self.id))
    }

    /// Decodes an external identifier with the globally registered type.
    pub fn decode(external_id: &str) -> Result<Self, Error> {
        let id = global_type(T::prefix())?.decode(external_id)?;
        Ok(Field::from(id))
    }
}

impl<T: TypeMarker> Serialize for Field<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let encoded = self.encode().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&encoded)
    }
}

impl<'de, T: TypeMarker> Deserialize<'de> for Field<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        Self::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

impl<T: TypeMarker> ToSql<BigInt, Pg> for Field<T> {
    fn to_sql(&self, out: &mut Output<'_, '_, Pg>) -> serialize::Result {
        <i64 as ToSql<BigInt, Pg>>::to_sql(&self.id, &mut out.reborrow())
    }
}

impl<T: TypeMarker> FromSql<BigInt, Pg> for Field<T> {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let id = <i64 as FromSql<BigInt, Pg>>::from_sql(bytes)?;
        Ok(Field::from(id))
    }
}

impl<T> Queryable<BigInt, Pg> for Field<T>
where
    T: TypeMarker,
{
    type Row = <i64 as Queryable<BigInt, Pg>>::Row;

    fn build(row: Self::Row) -> deserialize::Result<Self> {
        let id = i64::build(row)?;
        Ok(Field::from(id))
    }
}
