#[cfg(test)]
mod tests {
    use tokio::time::{sleep, Duration, Instant};

    use crate::tests::mock::MockConnection;
    use crate::{Client, ClientConfig, ClientError};

    fn config() -> ClientConfig {
        let mut config = ClientConfig::new("app-id", "client-key");
        config.api_host = "api.example.com".into();
        config.push_host = "push.example.com".into();
        config.user_agent = "parse-lite/test".into();
        config
    }

    fn client(connection: MockConnection) -> Client<MockConnection> {
        Client::new(config(), connection, MockConnection::new()).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = Client::new(
            ClientConfig::new("", "key"),
            MockConnection::new(),
            MockConnection::new(),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));

        let mut config = config();
        config.buffer_size = 1;
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_request_wire_format() {
        let mock = MockConnection::new().reply(r#"{"objectId":"xyz"}"#);
        let watch = mock.clone();
        let mut client = client(mock);

        let mut response = client.send_request("GET", "/1/classes/Foo", "", "").await;
        assert_eq!(response.get_string("objectId"), "xyz");
        response.close();
        drop(response);

        assert_eq!(
            watch.state().connects,
            vec![("api.example.com".to_string(), 443)]
        );
        assert_eq!(
            watch.sent_text(),
            "GET /1/classes/Foo HTTP/1.1\r\n\
             Host: api.example.com\r\n\
             User-Agent: parse-lite/test\r\n\
             X-Parse-Client-Version: 1.0\r\n\
             X-Parse-Application-Id: app-id\r\n\
             X-Parse-Client-Key: client-key\r\n\
             Connection: close\r\n\
             \r\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_sends_body_after_blank_line() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);

        client
            .send_request("POST", "/1/classes/Foo", r#"{"score":7}"#, "")
            .await;

        let sent = watch.sent_text();
        assert!(sent.contains("Content-Type: application/json; charset=utf-8\r\n"));
        assert!(sent.contains("Content-Length: 11\r\n"));
        assert!(sent.ends_with("Connection: close\r\n\r\n{\"score\":7}"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_yields_empty_body() {
        let mock = MockConnection::unreachable();
        let watch = mock.clone();
        let mut client = client(mock);

        let mut response = client.send_request("GET", "/1/classes/Foo", "", "").await;
        assert_eq!(response.json_body(), "");
        assert_eq!(response.error_code(), 0);
        drop(response);

        assert!(watch.state().sent.is_empty());
        assert_eq!(watch.state().connects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_request_closes_previous_connection() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);

        client.send_request("GET", "/1/a", "", "").await;
        client.send_request("GET", "/1/b", "", "").await;
        assert_eq!(watch.state().closes, 1);
        assert_eq!(watch.state().connects.len(), 2);

        client.end().await;
        assert_eq!(watch.state().closes, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_installation_id_is_created_and_registered_once() {
        let mock = MockConnection::new().reply(r#"{"objectId":"inst"}"#);
        let watch = mock.clone();
        let mut client = client(mock);

        let id = client.installation_id().await.to_string();
        assert_eq!(id.len(), 36);
        assert_eq!(id.as_bytes()[14], b'4');
        assert_eq!(id.matches('-').count(), 4);

        let sent = watch.sent_text();
        assert!(sent.starts_with("POST /1/installations HTTP/1.1\r\n"));
        assert!(sent.contains(&format!("\"installationId\": \"{}\"", id)));
        assert!(sent.contains(&format!("X-Parse-Installation-Id: {}\r\n", id)));

        assert_eq!(client.installation_id().await, id);
        assert_eq!(watch.state().connects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_installation_ids_differ() {
        let mut first = client(MockConnection::new());
        let mut second = client(MockConnection::new());
        let a = first.installation_id().await.to_string();
        let b = second.installation_id().await.to_string();
        assert_ne!(a, b);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_installation_id_skips_registration() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut config = config();
        config.installation_id = Some("known-id".into());
        let mut client = Client::new(config, mock, MockConnection::new()).unwrap();

        assert_eq!(client.installation_id().await, "known-id");
        client.set_installation_id(Some("other-id"));
        assert_eq!(client.installation_id().await, "other-id");
        assert!(watch.state().connects.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_token_already_linked() {
        let mock = MockConnection::new().reply(r#"{"installationId":"known-id"}"#);
        let watch = mock.clone();
        let mut client = client(mock);
        client.set_installation_id(Some("known-id"));

        client.set_session_token(Some("r:abc")).await;
        assert_eq!(client.session_token(), Some("r:abc"));

        let sent = watch.sent_text();
        assert!(sent.starts_with("GET /1/sessions/me HTTP/1.1\r\n"));
        assert!(sent.contains("X-Parse-Session-Token: r:abc\r\n"));
        assert!(!sent.contains("PUT"));
        assert_eq!(watch.state().connects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_lookup_waits_for_late_reply() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);
        client.set_installation_id(Some("known-id"));

        let late = watch.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(2)).await;
            late.deliver(r#"{"installationId":"known-id"}"#);
        });
        client.set_session_token(Some("r:abc")).await;

        assert!(!watch.sent_text().contains("PUT"));
        assert_eq!(watch.state().connects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_waits_for_reply() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);

        let late = watch.clone();
        tokio::spawn(async move {
            sleep(Duration::from_secs(3)).await;
            late.deliver(r#"{"objectId":"inst"}"#);
        });
        let started = Instant::now();
        client.installation_id().await;

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(watch.state().inbound.len(), 0);
        assert_eq!(watch.state().connects.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_token_relinks_when_unlinked() {
        let mock = MockConnection::new().reply(r#"{"sessionToken":"r:abc"}"#);
        let watch = mock.clone();
        let mut client = client(mock);
        client.set_installation_id(Some("known-id"));

        client.set_session_token(Some("r:abc")).await;

        let sent = watch.sent_text();
        let get = sent.find("GET /1/sessions/me").unwrap();
        let put = sent.find("PUT /1/sessions/me").unwrap();
        assert!(get < put);
        assert!(sent.ends_with("\r\n\r\n{}"));
        assert_eq!(watch.state().connects.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_token_creates_installation_first() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);

        client.set_session_token(Some("r:abc")).await;

        let sent = watch.sent_text();
        let install = sent.find("POST /1/installations").unwrap();
        let session = sent.find("GET /1/sessions/me").unwrap();
        assert!(install < session);
        assert!(!client.identity().installation_id.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clearing_session_token() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut client = client(mock);
        client.set_installation_id(Some("known-id"));

        client.set_session_token(None).await;
        assert_eq!(client.session_token(), None);
        assert!(watch.state().connects.is_empty());

        client.set_session_token(Some("r:abc")).await;
        client.clear_session_token();
        assert_eq!(client.session_token(), None);

        watch.state().sent.clear();
        client.send_request("GET", "/1/classes/Foo", "", "").await;
        assert!(!watch.sent_text().contains("X-Parse-Session-Token"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_service_handshake() {
        let push = MockConnection::new();
        let push_watch = push.clone();
        let mut config = config();
        config.installation_id = Some("inst-1".into());
        let mut client = Client::new(config, MockConnection::new(), push).unwrap();

        assert!(client.start_push_service().await);
        assert_eq!(
            push_watch.state().connects,
            vec![("push.example.com".to_string(), 443)]
        );
        assert_eq!(
            push_watch.sent_text(),
            "{\"installation_id\":\"inst-1\",\"oauth_key\":\"app-id\",\"v\":\"e1.0.0\",\"last\":null}\r\n"
        );

        push_watch.deliver(r#"{"alert":"hello"}"#);
        assert!(client.push_available().await);
        let mut push = client.next_push();
        assert_eq!(push.get_string("alert"), "hello");
        drop(push);

        client.stop_push_service().await;
        assert!(!client.push().is_connected());
    }
}
