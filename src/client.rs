use tracing::{debug, instrument, trace, warn};

use crate::{
    metrics, new_installation_id, push_handshake, ClientConfig, ClientError, ClientInfo,
    Connection, Identity, PushChannel, RequestBuilder, ResponseReader, RESPONSE_TIMEOUT_SECS,
};

/// Session against the backend: one request connection plus an optional push
/// connection.
///
/// Only one request is in flight at a time. [`send_request`] tears down the
/// previous request connection, and the returned reader borrows the client
/// until it is dropped.
///
/// [`send_request`]: Client::send_request
pub struct Client<C> {
    config: ClientConfig,
    identity: Identity,
    connection: C,
    push: PushChannel<C>,
}

impl<C: Connection> Client<C> {
    /// Validates `config` and binds the two transports.
    pub fn new(config: ClientConfig, connection: C, push_connection: C) -> Result<Self, ClientError> {
        config.validate()?;
        debug!(
            application_id = %config.application_id,
            "Creating client for {}", config.api_host
        );

        let mut identity = Identity::new(&config.application_id, &config.client_key);
        if let Some(id) = &config.installation_id {
            identity.installation_id = id.clone();
        }
        let push = PushChannel::new(push_connection, &config.push_host, config.port)
            .with_buffer_sizes(config.buffer_size, config.scratch_size);

        Ok(Self {
            config,
            identity,
            connection,
            push,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn push(&self) -> &PushChannel<C> {
        &self.push
    }

    /// Sends one request and returns a reader over its response.
    ///
    /// `body` is a JSON document; `params` is used as the payload only when
    /// `body` is empty. When the backend cannot be reached nothing is sent
    /// and the reader yields an empty body.
    #[instrument(skip(self, body, params))]
    pub async fn send_request(
        &mut self,
        verb: &str,
        path: &str,
        body: &str,
        params: &str,
    ) -> ResponseReader<'_> {
        self.connection.close().await;

        if self.connection.connect(&self.config.api_host, self.config.port).await {
            debug!("Connected to {}", self.config.api_host);
            let request = RequestBuilder::new(verb, path, self.identity.clone())
                .body(body)
                .params(params);
            let info = ClientInfo {
                host: &self.config.api_host,
                user_agent: &self.config.user_agent,
                client_version: &self.config.client_version,
            };
            Self::write_request(&mut self.connection, &request, &info).await;
        } else {
            warn!("Failed to connect to {}", self.config.api_host);
            metrics::record_connect_failure(1);
        }

        ResponseReader::with_capacity(
            &mut self.connection,
            self.config.buffer_size,
            self.config.scratch_size,
        )
    }

    async fn write_request(connection: &mut C, request: &RequestBuilder, info: &ClientInfo<'_>) {
        for line in request.header_lines(info) {
            trace!("> {}", line);
            let mut bytes = line.into_bytes();
            bytes.extend_from_slice(b"\r\n");
            if let Err(e) = connection.send(&bytes).await {
                warn!("Failed to send request: {}", e);
                return;
            }
        }

        let payload = request.payload();
        if !payload.is_empty() {
            trace!("> {}", payload);
            if let Err(e) = connection.send(payload.as_bytes()).await {
                warn!("Failed to send request payload: {}", e);
                return;
            }
        }
        metrics::record_request(1);
    }

    /// The installation id, creating and registering one on first use.
    #[instrument(skip(self))]
    pub async fn installation_id(&mut self) -> &str {
        if self.identity.installation_id.is_empty() {
            let id = new_installation_id();
            debug!("Creating new installation {}", id);
            self.identity.installation_id = id;

            let content = format!(
                "{{\"installationId\": \"{}\", \"deviceType\": \"embedded\", \"parseVersion\": \"1.0.0\"}}",
                self.identity.installation_id
            );
            let mut response = self.send_request("POST", "/1/installations", &content, "").await;
            response.read_with_timeout(RESPONSE_TIMEOUT_SECS).await;
            debug!("Installation registered: {}", response.json_body());
            response.close();
        }
        &self.identity.installation_id
    }

    /// Replaces the installation id without contacting the backend. `None`
    /// clears it.
    pub fn set_installation_id(&mut self, installation_id: Option<&str>) {
        self.identity.installation_id = installation_id.unwrap_or_default().to_string();
    }

    /// Sets the user session and makes sure the backend links it to this
    /// installation.
    ///
    /// Ensures an installation id exists, asks for the current session, and
    /// re-links it when the backend reports a different installation. An
    /// empty or absent token clears the session without any I/O.
    #[instrument(skip(self, session_token))]
    pub async fn set_session_token(&mut self, session_token: Option<&str>) {
        let token = session_token.unwrap_or_default();
        if token.is_empty() {
            self.identity.session_token.clear();
            return;
        }
        self.identity.session_token = token.to_string();

        let installation_id = self.installation_id().await.to_string();
        debug!("Linking session to installation {}", installation_id);

        let mut response = self.send_request("GET", "/1/sessions/me", "", "").await;
        response.read_with_timeout(RESPONSE_TIMEOUT_SECS).await;
        let linked = response.get_string("installationId").to_string();
        response.close();

        if linked != installation_id {
            debug!("Session is linked to {:?}, re-linking", linked);
            let mut response = self.send_request("PUT", "/1/sessions/me", "{}", "").await;
            response.close();
        }
    }

    pub fn clear_session_token(&mut self) {
        self.identity.session_token.clear();
    }

    pub fn session_token(&self) -> Option<&str> {
        if self.identity.session_token.is_empty() {
            None
        } else {
            Some(&self.identity.session_token)
        }
    }

    /// Opens the push connection for this installation.
    pub async fn start_push_service(&mut self) -> bool {
        let installation_id = self.installation_id().await.to_string();
        let handshake = push_handshake(&installation_id, &self.identity.application_id);
        self.push.start(&handshake).await
    }

    pub async fn push_available(&mut self) -> bool {
        self.push.available().await
    }

    pub fn next_push(&mut self) -> ResponseReader<'_> {
        self.push.next()
    }

    pub async fn stop_push_service(&mut self) {
        self.push.stop().await;
    }

    /// Shuts down both connections.
    pub async fn end(&mut self) {
        self.stop_push_service().await;
        self.connection.close().await;
    }
}
