//! Compare-and-swap integration tests.

#[cfg(test)]
mod tests {
    use crate::{TestServer, unique_key};

    #[tokio::test]
    async fn test_should_swap_with_current_token_then_reject_stale_token() {
        let server = TestServer::start().await;
        let key = unique_key("cas");
        let token = server.put_and_read_cas(&key, r#"{"rev":1}"#).await;

        let swapped = server
            .post_json(&format!("/default/{key}?cas={token}"), r#"{"rev":2}"#)
            .await;
        assert_eq!(swapped.status, 200);
        assert_eq!(swapped.body, "{}");

        let next = server.read_cas(&key).await;
        assert_ne!(next, token);

        let stale = server
            .post_json(&format!("/default/{key}?cas={token}"), r#"{"rev":3}"#)
            .await;
        assert_eq!(stale.status, 200);
        assert_eq!(stale.err_code(), 12);

        let read = server.get(&format!("/default/{key}")).await;
        assert_eq!(read.json()[0]["doc"], r#"{"rev":2}"#);
        assert_eq!(read.json()[0]["cas"], next);
    }

    #[tokio::test]
    async fn test_should_treat_zero_token_as_unconditional_write() {
        let server = TestServer::start().await;
        let key = unique_key("zero");
        server.put_and_read_cas(&key, r#"{"rev":1}"#).await;

        let saved = server
            .post_json(&format!("/default/{key}?cas=0"), r#"{"rev":2}"#)
            .await;
        assert_eq!(saved.body, "{}");

        let read = server.get(&format!("/default/{key}")).await;
        assert_eq!(read.json()[0]["doc"], r#"{"rev":2}"#);
    }

    #[tokio::test]
    async fn test_should_accept_cas_write_against_missing_document() {
        let server = TestServer::start().await;
        let key = unique_key("gone");

        let saved = server
            .post_json(&format!("/default/{key}?cas=12345"), r#"{"rev":1}"#)
            .await;
        assert_eq!(saved.status, 200);
        assert_eq!(saved.body, "{}");

        // The write is acknowledged but nothing is created.
        let read = server.get(&format!("/default/{key}")).await;
        assert_eq!(read.json()[0]["err"]["code"], 13);
    }

    #[tokio::test]
    async fn test_should_let_exactly_one_concurrent_cas_writer_win() {
        let server = TestServer::start().await;
        let key = unique_key("race");
        let token = server.put_and_read_cas(&key, r#"{"rev":0}"#).await;
        let path = format!("/default/{key}?cas={token}");

        let (a, b) = tokio::join!(
            server.post_json(&path, r#"{"rev":"a"}"#),
            server.post_json(&path, r#"{"rev":"b"}"#),
        );

        let wins = [&a, &b].iter().filter(|r| r.body == "{}").count();
        assert_eq!(wins, 1, "a: {}, b: {}", a.body, b.body);
        let loser = if a.body == "{}" { &b } else { &a };
        assert_eq!(loser.err_code(), 12);
    }
}
