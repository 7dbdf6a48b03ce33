use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use std::fmt;

pub mod account;
pub mod chat;
pub mod job_registry;
pub mod ledger;
pub mod notification;
pub mod user;

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(database_uri: &str, max_db_connections: u32) -> DbThreadPool {
    r2d2::Pool::builder()
        .max_size(max_db_connections)
        .build(ConnectionManager::<PgConnection>::new(database_uri))
        .expect("Failed to create DB thread pool")
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    OutOfDate(&'static str),
    InvalidState(&'static str),
    ConflictWithExisting(&'static str),
    Disallowed(&'static str),
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::OutOfDate(msg) => {
                write!(f, "DaoError: Out of date: {msg}")
            }
            DaoError::InvalidState(msg) => {
                write!(f, "DaoError: Invalid state: {msg}")
            }
            DaoError::ConflictWithExisting(msg) => {
                write!(f, "DaoError: Conflict with existing record: {msg}")
            }
            DaoError::Disallowed(msg) => {
                write!(f, "DaoError: Disallowed: {msg}")
            }
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(error: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(error)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}
