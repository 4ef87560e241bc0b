//! The authenticated identity, created at sign-in and passed down to every
//! consumer. There is no ambient token store: code that needs a credential
//! takes a `&Session`, so nothing can attempt an authenticated call without
//! one.

#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token for REST calls and the socket's connection credential.
    pub token: String,
    /// Display name used for self/other attribution in the log.
    pub username: String,
    pub email: String,
}

impl Session {
    pub fn new(token: String, username: String, email: String) -> Self {
        Session {
            token,
            username,
            email,
        }
    }
}
