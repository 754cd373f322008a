use rand::RngCore;

/// Credentials attached to every request.
///
/// Cloned into each [`crate::RequestBuilder`] so a request always sees one
/// consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub application_id: String,
    pub client_key: String,
    /// Empty until assigned or generated.
    pub installation_id: String,
    /// Empty when no user session is active.
    pub session_token: String,
}

impl Identity {
    pub fn new(application_id: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            client_key: client_key.into(),
            ..Default::default()
        }
    }
}

/// A random RFC 4122 version 4 UUID in its hyphenated lowercase form.
pub fn new_installation_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let mut id = String::with_capacity(36);
    for (i, byte) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            id.push('-');
        }
        id.push_str(&format!("{:02x}", byte));
    }
    id
}
