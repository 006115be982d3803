use std::sync::{Mutex, PoisonError};

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};

use crate::{Error, KeyStore, SecretKey, Type};

diesel::table! {
    extid_types (prefix) {
        prefix -> Text,
        secret_key -> Bytea,
    }
}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Error {
        Error::Backend(err.to_string())
    }
}

/// Key store backed by the `extid_types` table in Postgres.
///
/// Each `resolve` is a single point read. The table's primary key is what
/// keeps prefixes unique. See `sql/extid.sql` for the schema and the matching
/// `encode_extid`/`decode_extid` SQL functions.
pub struct PgKeyStore {
    conn: Mutex<PgConnection>,
}

impl PgKeyStore {
    pub fn new(conn: PgConnection) -> Self {
        PgKeyStore {
            conn: Mutex::new(conn),
        }
    }

    /// Connects to `database_url`.
    pub fn establish(database_url: &str) -> Result<Self, Error> {
        let conn = PgConnection::establish(database_url)
            .map_err(|err| Error::Backend(err.to_string()))?;
        Ok(PgKeyStore::new(conn))
    }

    /// Runs `f` with exclusive access to the underlying connection.
    pub fn with_connection<R>(&self, f: impl FnOnce(&mut PgConnection) -> R) -> R {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *conn)
    }

    /// Validates and stores a new type.
    ///
    /// A prefix that is already present is reported as
    /// [`Error::DuplicatePrefix`].
    pub fn register(&self, prefix: &str, secret_key: &[u8]) -> Result<Type, Error> {
        let extid_type = Type::new(prefix, secret_key)?;
        // Savepoint, so a unique violation doesn't abort the caller's transaction.
        let inserted = self.with_connection(|conn| {
            conn.transaction(|conn| {
                diesel::insert_into(extid_types::table)
                    .values((
                        extid_types::prefix.eq(prefix),
                        extid_types::secret_key.eq(&extid_type.secret_key().as_bytes()[..]),
                    ))
                    .execute(conn)
            })
        });
        match inserted {
            Ok(_) => {
                tracing::debug!(prefix, "stored extid type");
                Ok(extid_type)
            }
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(Error::DuplicatePrefix {
                    prefix: prefix.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a type. Returns whether a row was removed.
    pub fn remove(&self, prefix: &str) -> Result<bool, Error> {
        let deleted = self.with_connection(|conn| {
            diesel::delete(extid_types::table.filter(extid_types::prefix.eq(prefix)))
                .execute(conn)
        })?;
        if deleted > 0 {
            tracing::debug!(prefix, "deleted extid type");
        }
        Ok(deleted > 0)
    }
}

impl KeyStore for PgKeyStore {
    fn resolve(&self, prefix: &str) -> Result<SecretKey, Error> {
        let secret_key: Option<Vec<u8>> = self.with_connection(|conn| {
            extid_types::table
                .filter(extid_types::prefix.eq(prefix))
                .select(extid_types::secret_key)
                .first::<Vec<u8>>(conn)
                .optional()
        })?;
        match secret_key {
            Some(bytes) => SecretKey::try_from(bytes.as_slice()),
            None => {
                tracing::trace!(prefix, "unknown extid prefix");
                Err(Error::UnknownPrefix {
                    prefix: prefix.to_string(),
                })
            }
        }
    }
}
