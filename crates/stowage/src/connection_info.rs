use stowage_core::{Error, Result};

use url::Url;

/// Where and as whom to connect.
///
/// The user, password and database are merged into the URL when the
/// connection is opened, so the URL itself may carry only host and port.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionInformation {
    url: String,
    database: String,
    user: Option<String>,
    password: Option<String>,
}

impl ConnectionInformation {
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> ConnectionInformation {
        ConnectionInformation {
            url: url.into(),
            database: database.into(),
            user: None,
            password: None,
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn user_name(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// The URL handed to the driver, with credentials and database applied.
    ///
    /// SQLite URLs name a file, not a server, and are returned unchanged.
    pub fn connect_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.url)
            .map_err(|err| Error::invalid_connection_url(format!("{}: {err}", self.url)))?;

        if url.scheme() == "sqlite" {
            return Ok(self.url.clone());
        }

        if let Some(user) = &self.user {
            url.set_username(user).map_err(|()| {
                Error::invalid_connection_url(format!("cannot set user on {}", self.url))
            })?;
        }
        if let Some(password) = &self.password {
            url.set_password(Some(password)).map_err(|()| {
                Error::invalid_connection_url(format!("cannot set password on {}", self.url))
            })?;
        }
        if !self.database.is_empty() && url.path().trim_matches('/').is_empty() {
            url.set_path(&format!("/{}", self.database));
        }

        Ok(url.into())
    }
}

impl core::fmt::Debug for ConnectionInformation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConnectionInformation")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
