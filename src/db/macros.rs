//! Database dispatch macros for reducing code duplication.
//!
//! The sqlx-backed driver keeps one code path per backend in its own
//! sub-module. The macro here generates the match arms that route a pooled
//! connection to the right sub-module.

use url::Url;

/// Database backend type for dispatch operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// Includes MariaDB
    MySql,
    SQLite,
}

impl DatabaseType {
    /// Get the backend from a parsed connection URL.
    pub fn from_url(url: &Url) -> Option<Self> {
        match url.scheme().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "sqlite" => Some(Self::SQLite),
            _ => None,
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Macro for generating backend dispatch match arms over a pooled connection.
///
/// # Example
///
/// ```ignore
/// impl_db_dispatch!(conn, {
///     MySql(c) => mysql::execute(c, stmt).await,
///     SQLite(c) => sqlite::execute(c, stmt).await,
/// });
/// ```
#[macro_export]
macro_rules! impl_db_dispatch {
    ($conn:expr, { $($variant:ident($c:ident) => $body:expr),+ $(,)? }) => {
        match $conn {
            $(
                $crate::db::pool::PooledConnection::$variant($c) => $body,
            )+
        }
    };
}

pub use impl_db_dispatch;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_type_from_url() {
        let mysql = Url::parse("mariadb://user@host/app").unwrap();
        let sqlite = Url::parse("sqlite://data.db").unwrap();
        let memory = Url::parse("sqlite::memory:").unwrap();
        let pg = Url::parse("postgres://host/db").unwrap();
        assert_eq!(DatabaseType::from_url(&mysql), Some(DatabaseType::MySql));
        assert_eq!(DatabaseType::from_url(&sqlite), Some(DatabaseType::SQLite));
        assert_eq!(DatabaseType::from_url(&memory), Some(DatabaseType::SQLite));
        assert_eq!(DatabaseType::from_url(&pg), None);
    }

    #[test]
    fn test_database_type_display() {
        assert_eq!(DatabaseType::MySql.to_string(), "MySQL");
        assert_eq!(DatabaseType::SQLite.to_string(), "SQLite");
    }
}
