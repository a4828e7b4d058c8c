use crate::error::Error;
use std::fmt;
use url::Url;

/// The one active server/credential profile, passed explicitly into the
/// transport client and the orchestrator at construction.
///
/// A credential or trust change produces a new context (and with it a new
/// client), so the trust-downgrade flag is re-evaluated per connection and
/// never cached past a credential change.
#[derive(Clone)]
pub struct SessionContext {
    base_url: Url,
    username: String,
    password: String,
    allow_self_signed: bool,
}

impl SessionContext {
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: impl Into<String>,
        allow_self_signed: bool,
    ) -> Result<Self, Error> {
        let base_url =
            Url::parse(base_url).map_err(|e| Error::InvalidEndpoint(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidEndpoint(base_url.to_string()));
        }
        let username = username.into();
        let password = password.into();
        check_header_safe("username", &username)?;
        check_header_safe("password", &password)?;
        Ok(Self {
            base_url,
            username,
            password,
            allow_self_signed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    pub fn allow_self_signed(&self) -> bool {
        self.allow_self_signed
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("password", &"****")
            .field("allow_self_signed", &self.allow_self_signed)
            .finish()
    }
}

/// Basic-auth material travels in a header; control characters would make
/// the request unconstructable.
fn check_header_safe(what: &str, value: &str) -> Result<(), Error> {
    if value.chars().any(|c| c.is_control()) {
        return Err(Error::InvalidCredentials(what.to_string()));
    }
    Ok(())
}
