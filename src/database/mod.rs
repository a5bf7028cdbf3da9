// Copyright 2023 Remi Bernotavicius

use diesel::prelude::Connection as _;
use diesel::RunQueryDsl as _;
use std::path::{Path, PathBuf};

pub mod models;
mod repository;
pub mod schema;

pub use repository::RecipeRepository;

pub type Connection = diesel::sqlite::SqliteConnection;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to connect to database {url:?}: {source}")]
    Connectivity {
        url: String,
        #[source]
        source: diesel::ConnectionError,
    },

    #[error("database operation failed: {0}")]
    Operation(#[from] diesel::result::Error),

    #[error("{what} {key} does not exist")]
    NotFound { what: &'static str, key: String },
}

impl Error {
    pub fn not_found(what: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what,
            key: format!("with ID={id}"),
        }
    }

    pub fn not_found_by_name(what: &'static str, name: &str) -> Self {
        Self::NotFound {
            what,
            key: format!("named {name:?}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Where the database lives. For SQLite the only coordinate is the path to the database file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl DatabaseConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_owned(),
        }
    }

    /// Fails for paths that aren't valid UTF-8, since diesel only accepts a `&str`.
    pub fn url(&self) -> Result<&str> {
        self.path.to_str().ok_or_else(|| {
            let url = self.path.to_string_lossy().into_owned();
            Error::Connectivity {
                source: diesel::ConnectionError::InvalidConnectionUrl(format!(
                    "{url:?} is not valid UTF-8"
                )),
                url,
            }
        })
    }
}

/// Hands out a fresh connection for every operation. There is no pooling.
#[derive(Debug, Clone)]
pub struct ConnectionProvider {
    config: DatabaseConfig,
}

impl ConnectionProvider {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn acquire(&self) -> Result<Connection> {
        let url = self.config.url()?;
        let mut connection = Connection::establish(url).map_err(|source| {
            log::error!("error getting connection to {url:?}");
            Error::Connectivity {
                url: url.into(),
                source,
            }
        })?;

        // SQLite only enforces foreign keys (and so cascading deletes) when asked to, and the
        // pragma is ignored inside a transaction.
        diesel::sql_query("PRAGMA foreign_keys = ON").execute(&mut connection)?;

        log::debug!("connected to {url:?}");
        Ok(connection)
    }

    /// Runs `body` inside a transaction on a freshly acquired connection. The transaction commits
    /// if `body` succeeds and rolls back otherwise. Either way the connection is closed before
    /// returning.
    pub fn transaction<T>(
        &self,
        operation: &str,
        body: impl FnOnce(&mut Connection) -> Result<T>,
    ) -> Result<T> {
        let mut connection = self.acquire()?;
        connection
            .transaction(body)
            .inspect_err(|e| log::warn!("{operation}: rolled back: {e}"))
    }
}

#[test]
fn unreachable_database() {
    let provider =
        ConnectionProvider::new(DatabaseConfig::new("/no/such/directory/recipes.sqlite"));
    let Err(err) = provider.acquire() else {
        panic!("connected to a database in a missing directory");
    };
    assert!(matches!(err, Error::Connectivity { .. }), "{err}");
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn transaction_rolls_back_on_error() {
    use diesel::connection::SimpleConnection as _;

    let dir = tempfile::tempdir().unwrap();
    let provider = ConnectionProvider::new(DatabaseConfig::new(dir.path().join("t.sqlite")));
    provider
        .acquire()
        .unwrap()
        .batch_execute("CREATE TABLE t (x INTEGER NOT NULL)")
        .unwrap();

    let res: Result<()> = provider.transaction("insert then fail", |conn| {
        diesel::sql_query("INSERT INTO t (x) VALUES (1)").execute(conn)?;
        Err(Error::not_found("thing", 1))
    });
    assert!(matches!(res, Err(Error::NotFound { .. })));

    let committed = provider.transaction("insert", |conn| {
        Ok(diesel::sql_query("INSERT INTO t (x) VALUES (2)").execute(conn)?)
    });
    assert_eq!(committed.unwrap(), 1);

    #[derive(diesel::QueryableByName)]
    struct Count {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        n: i64,
    }
    let count: Count = diesel::sql_query("SELECT COUNT(*) AS n FROM t")
        .get_result(&mut provider.acquire().unwrap())
        .unwrap();
    assert_eq!(count.n, 1);
}

#[test]
fn not_found_message() {
    assert_eq!(
        Error::not_found("Recipe", 42).to_string(),
        "Recipe with ID=42 does not exist"
    );
    assert_eq!(
        Error::not_found_by_name("Category", "Brunch").to_string(),
        "Category named \"Brunch\" does not exist"
    );
}

#[cfg(unix)]
#[test]
fn non_utf8_path_is_rejected() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt as _;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(OsStr::from_bytes(b"recipes-\xff.sqlite"));
    let provider = ConnectionProvider::new(DatabaseConfig::new(&path));

    let Err(err) = provider.acquire() else {
        panic!("connected using a rewritten path");
    };
    assert!(
        matches!(
            &err,
            Error::Connectivity {
                source: diesel::ConnectionError::InvalidConnectionUrl(_),
                ..
            }
        ),
        "{err}"
    );
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
