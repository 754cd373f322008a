use bytes::{BufMut, BytesMut};

use crate::Identity;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const PARAMS_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Fixed client identification sent with every request.
#[derive(Debug, Clone, Copy)]
pub struct ClientInfo<'a> {
    pub host: &'a str,
    pub user_agent: &'a str,
    pub client_version: &'a str,
}

/// One HTTP/1.1 request assembled by hand.
///
/// The request body takes precedence over URL parameters; whichever is used
/// becomes the payload. With neither, no `Content-Type`/`Content-Length`
/// headers are written and nothing follows the blank line.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    verb: String,
    path: String,
    body: String,
    params: String,
    identity: Identity,
}

impl RequestBuilder {
    pub fn new(verb: &str, path: &str, identity: Identity) -> Self {
        Self {
            verb: verb.to_string(),
            path: path.to_string(),
            body: String::new(),
            params: String::new(),
            identity,
        }
    }

    /// JSON request body, sent verbatim.
    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    /// URL-encoded parameters, sent as the payload when there is no body.
    pub fn params(mut self, params: &str) -> Self {
        self.params = params.to_string();
        self
    }

    pub fn payload(&self) -> &str {
        if !self.body.is_empty() {
            &self.body
        } else {
            &self.params
        }
    }

    /// Request line and headers in wire order, without line terminators.
    /// The final entry is the empty line that ends the header block.
    pub fn header_lines(&self, info: &ClientInfo<'_>) -> Vec<String> {
        let mut lines = vec![
            format!("{} {} HTTP/1.1", self.verb, self.path),
            format!("Host: {}", info.host),
            format!("User-Agent: {}", info.user_agent),
            format!("X-Parse-Client-Version: {}", info.client_version),
            format!("X-Parse-Application-Id: {}", self.identity.application_id),
            format!("X-Parse-Client-Key: {}", self.identity.client_key),
        ];
        if !self.identity.installation_id.is_empty() {
            lines.push(format!(
                "X-Parse-Installation-Id: {}",
                self.identity.installation_id
            ));
        }
        if !self.identity.session_token.is_empty() {
            lines.push(format!(
                "X-Parse-Session-Token: {}",
                self.identity.session_token
            ));
        }

        let payload = self.payload();
        if !payload.is_empty() {
            let content_type = if !self.body.is_empty() {
                JSON_CONTENT_TYPE
            } else {
                PARAMS_CONTENT_TYPE
            };
            lines.push(format!("Content-Type: {}", content_type));
            lines.push(format!("Content-Length: {}", payload.len()));
        }
        lines.push("Connection: close".to_string());
        lines.push(String::new());
        lines
    }

    /// The complete request as it goes on the wire.
    pub fn encode(&self, info: &ClientInfo<'_>) -> BytesMut {
        let mut out = BytesMut::new();
        for line in self.header_lines(info) {
            out.put_slice(line.as_bytes());
            out.put_slice(b"\r\n");
        }
        out.put_slice(self.payload().as_bytes());
        out
    }
}
