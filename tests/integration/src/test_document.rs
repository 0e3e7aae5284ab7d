//! Document read/write integration tests.

#[cfg(test)]
mod tests {
    use crate::{TestServer, unique_key};

    #[tokio::test]
    async fn test_should_save_then_read_user_document() {
        let server = TestServer::start().await;

        let saved = server.post_json("/default/user1", r#"{"name":"a"}"#).await;
        assert_eq!(saved.status, 200);
        assert_eq!(saved.body, "{}");

        let read = server.get("/default/user1").await;
        assert_eq!(read.status, 200);
        let json = read.json();
        let cas = json[0]["cas"].as_u64().unwrap();
        assert_ne!(cas, 0);
        assert_eq!(
            read.body,
            format!(r#"[{{"key":"user1","cas":{cas},"doc":"{{\"name\":\"a\"}}"}}]"#)
        );
    }

    #[tokio::test]
    async fn test_should_return_stored_value_byte_for_byte() {
        let server = TestServer::start().await;
        let key = unique_key("raw");
        let value = "{ \"spaced\" :  [1, 2,3],\n  \"unicode\": \"h\u{e9}llo\" }";

        server.post_json(&format!("/default/{key}"), value).await;

        let read = server.get(&format!("/default/{key}")).await;
        let json = read.json();
        assert_eq!(json.as_array().unwrap().len(), 1);
        assert_eq!(json[0]["key"], key.as_str());
        assert_eq!(json[0]["doc"], value);
    }

    #[tokio::test]
    async fn test_should_report_missing_document() {
        let server = TestServer::start().await;
        let read = server.get("/default/nobody").await;
        assert_eq!(read.status, 200);
        assert_eq!(
            read.body,
            r#"[{"err":{"code":13,"message":"No such document"}}]"#
        );
    }

    #[tokio::test]
    async fn test_should_preserve_key_order_in_multi_get() {
        let server = TestServer::start().await;
        server.post_json("/default/b", r#"{"v":"b"}"#).await;
        server.post_json("/default/d", r#"{"v":"d"}"#).await;

        let read = server.get("/default?keys=a,b,c,d,b").await;
        assert_eq!(read.status, 200);
        let json = read.json();
        let items = json.as_array().unwrap();
        assert_eq!(items.len(), 5);

        assert_eq!(items[0]["err"]["code"], 13);
        assert_eq!(items[1]["key"], "b");
        assert_eq!(items[1]["doc"], r#"{"v":"b"}"#);
        assert_eq!(items[2]["err"]["code"], 13);
        assert_eq!(items[3]["key"], "d");
        assert_eq!(items[4]["key"], "b");
    }

    #[tokio::test]
    async fn test_should_skip_empty_entries_in_keys_list() {
        let server = TestServer::start().await;
        server.post_json("/default/x", "{}").await;

        let read = server.get("/default?keys=x,,x,").await;
        let json = read.json();
        assert_eq!(json.as_array().unwrap().len(), 2);
        assert_eq!(json[0]["key"], "x");
        assert_eq!(json[1]["key"], "x");
    }

    #[tokio::test]
    async fn test_should_overwrite_on_repeated_unconditional_save() {
        let server = TestServer::start().await;
        let key = unique_key("idem");
        let path = format!("/default/{key}");

        let first = server.post_json(&path, r#"{"n":1}"#).await;
        let second = server.post_json(&path, r#"{"n":2}"#).await;
        assert_eq!(first.body, "{}");
        assert_eq!(second.body, "{}");

        let read = server.get(&path).await;
        assert_eq!(read.json()[0]["doc"], r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn test_should_keep_buckets_apart() {
        let server = TestServer::with_buckets(&["default", "other"]).await;
        server.post_json("/other/k", r#"{"in":"other"}"#).await;

        let other = server.get("/other/k").await;
        assert_eq!(other.json()[0]["doc"], r#"{"in":"other"}"#);

        let default = server.get("/default/k").await;
        assert_eq!(default.json()[0]["err"]["code"], 13);
    }

    #[tokio::test]
    async fn test_should_decode_percent_encoded_key() {
        let server = TestServer::start().await;
        server.post_json("/default/user%201", r#"{"n":1}"#).await;

        let read = server.get("/default?keys=user%201").await;
        assert_eq!(read.json()[0]["key"], "user 1");
    }

    #[tokio::test]
    async fn test_should_accept_lowercase_method_token() {
        let server = TestServer::start().await;
        let saved = server
            .send("post", "/default/lc", Some("application/json"), "{}")
            .await;
        assert_eq!(saved.body, "{}");
        let read = server.send("get", "/default/lc", None, "").await;
        assert_eq!(read.json()[0]["key"], "lc");
    }
}
