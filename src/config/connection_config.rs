use serde::{Deserialize, Serialize};

use crate::error::{DumpError, Result};

// This is a MySQL connection configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    // Database name
    pub database: String,
    // Database host
    #[serde(default)]
    pub host: Option<String>,
    // Database port
    #[serde(default)]
    pub port: Option<u16>,
    // Database user name
    #[serde(default)]
    pub user: Option<String>,
    // Database user password
    #[serde(default)]
    pub password: Option<String>,
}

impl ConnectionConfig {
    // Create a connection configuration for the given database.
    pub fn new(database: impl Into<String>) -> Self {
        ConnectionConfig {
            database: database.into(),
            ..Default::default()
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Checks that the database name is usable.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(DumpError::Validation(
                "database name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Host, if set and non-empty.
    pub fn get_host(&self) -> Option<&str> {
        non_empty(self.host.as_deref())
    }

    /// Port, if set and non-zero.
    pub fn get_port(&self) -> Option<u16> {
        self.port.filter(|port| *port != 0)
    }

    /// User, if set and non-empty.
    pub fn get_user(&self) -> Option<&str> {
        non_empty(self.user.as_deref())
    }

    /// Password, if set and non-empty.
    pub fn get_password(&self) -> Option<&str> {
        non_empty(self.password.as_deref())
    }

    // Returns a masked description of the connection.
    pub fn get_masked_connection_string(&self) -> String {
        let user = if self.get_user().is_some() { "*" } else { "" };
        let password = if self.get_password().is_some() { ":*" } else { "" };
        let credentials = if user.is_empty() && password.is_empty() {
            String::new()
        } else {
            format!("{user}{password}@")
        };
        let port = self
            .get_port()
            .map(|port| format!(":{port}"))
            .unwrap_or_default();
        format!(
            "mysql://{}{}{}/{}",
            credentials,
            self.get_host().unwrap_or("localhost"),
            port,
            self.database
        )
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
