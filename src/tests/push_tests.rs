#[cfg(test)]
mod tests {
    use tokio::time::Duration;
    use tokio_stream::StreamExt;

    use crate::tests::mock::MockConnection;
    use crate::{push_handshake, PushChannel};

    const HANDSHAKE: &str = r#"{"installation_id":"i","oauth_key":"a","v":"e1.0.0","last":null}"#;

    #[test]
    fn test_handshake_payload() {
        assert_eq!(push_handshake("i", "a"), HANDSHAKE);
    }

    #[tokio::test]
    async fn test_start_fails_when_unreachable() {
        let mock = MockConnection::unreachable();
        let watch = mock.clone();
        let mut push = PushChannel::new(mock, "push.example.com", 443);

        assert!(!push.start(HANDSHAKE).await);
        assert!(watch.state().sent.is_empty());
        assert!(!push.available().await);
        assert!(watch.state().sent.is_empty());
    }

    #[tokio::test]
    async fn test_idle_poll_sends_keepalive() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut push = PushChannel::new(mock, "push.example.com", 443);
        assert!(push.start(HANDSHAKE).await);

        assert!(!push.available().await);
        assert!(!push.available().await);
        let sent = watch.sent_text();
        assert_eq!(sent, format!("{}\r\n{{}}\r\n{{}}\r\n", HANDSHAKE));
    }

    #[tokio::test]
    async fn test_pending_push_is_read_without_keepalive() {
        let mock = MockConnection::new().reply(r#"{"data":{"alert":"door open","badge":3}}"#);
        let watch = mock.clone();
        let mut push = PushChannel::new(mock, "push.example.com", 443);
        assert!(push.start(HANDSHAKE).await);

        assert!(push.available().await);
        let mut message = push.next();
        assert_eq!(message.get_string("alert"), "door open");
        assert_eq!(message.get_int("badge"), 3);
        message.close();
        drop(message);

        assert_eq!(watch.state().sent.len(), 1);
    }

    #[tokio::test]
    async fn test_lost_connection_is_terminal() {
        let mock = MockConnection::new();
        let watch = mock.clone();
        let mut push = PushChannel::new(mock, "push.example.com", 443);
        assert!(push.start(HANDSHAKE).await);

        watch.disconnect();
        assert!(!push.available().await);
        assert!(!push.is_connected());
        assert_eq!(watch.state().sent.len(), 1);

        assert!(push.start(HANDSHAKE).await);
        assert!(push.is_connected());
        assert_eq!(watch.state().connects.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_stream() {
        let mock = MockConnection::new().reply(r#"{"alert":"first"}"#);
        let watch = mock.clone();
        let mut push = PushChannel::new(mock, "push.example.com", 443);
        assert!(push.start(HANDSHAKE).await);

        {
            let notifications = push.notifications(Duration::from_secs(1));
            tokio::pin!(notifications);

            assert_eq!(notifications.next().await.as_deref(), Some(r#"{"alert":"first"}"#));

            watch.disconnect();
            assert_eq!(notifications.next().await, None);
        }

        push.stop().await;
        assert!(!push.is_connected());
    }
}
