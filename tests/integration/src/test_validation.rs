//! Request validation integration tests.

#[cfg(test)]
mod tests {
    use crate::TestServer;

    #[tokio::test]
    async fn test_should_require_keys_parameter_for_bucket_get() {
        let server = TestServer::start().await;
        let resp = server.get("/default").await;
        assert_eq!(resp.status, 400);
        assert_eq!(resp.err_code(), 4);
        assert_eq!(
            resp.json()["err"]["message"],
            "Either document key as a resource or keys as 'keys' parameters must be provided"
        );
    }

    #[tokio::test]
    async fn test_should_reject_empty_keys_parameter() {
        let server = TestServer::start().await;
        for path in ["/default?keys=", "/default?keys=,,"] {
            let resp = server.get(path).await;
            assert_eq!(resp.status, 400, "{path}");
            assert_eq!(resp.err_code(), 5, "{path}");
        }
    }

    #[tokio::test]
    async fn test_should_reject_deep_paths() {
        let server = TestServer::start().await;
        let resp = server.get("/a/b/c").await;
        assert_eq!(resp.status, 400);
        assert_eq!(
            resp.body,
            r#"{"err":{"code":2,"message":"Invalid resource"}}"#
        );
    }

    #[tokio::test]
    async fn test_should_reject_missing_bucket() {
        let server = TestServer::start().await;
        let resp = server.get("/").await;
        assert_eq!(resp.status, 404);
        assert_eq!(resp.err_code(), 3);
    }

    #[tokio::test]
    async fn test_should_reject_unknown_bucket() {
        let server = TestServer::start().await;
        let resp = server.get("/unknownbucket/key").await;
        assert_eq!(resp.status, 404);
        assert_eq!(
            resp.body,
            r#"{"err":{"code":3,"message":"Unknown bucket [unknownbucket]"}}"#
        );
    }

    #[tokio::test]
    async fn test_should_match_bucket_names_case_sensitively() {
        let server = TestServer::start().await;
        assert_eq!(server.get("/Default/key").await.err_code(), 3);
    }

    #[tokio::test]
    async fn test_should_reject_non_json_content_type() {
        let server = TestServer::start().await;
        let resp = server
            .send("POST", "/default/key", Some("text/plain"), "hello")
            .await;
        assert_eq!(resp.status, 400);
        assert_eq!(
            resp.body,
            r#"{"err":{"code":8,"message":"Unsupported content type [text/plain]"}}"#
        );

        // Nothing was written.
        assert_eq!(server.get("/default/key").await.json()[0]["err"]["code"], 13);
    }

    #[tokio::test]
    async fn test_should_reject_post_without_content_type() {
        let server = TestServer::start().await;
        let resp = server.send("POST", "/default/key", None, "{}").await;
        assert_eq!(resp.err_code(), 8);
    }

    #[tokio::test]
    async fn test_should_accept_json_content_type_with_parameters() {
        let server = TestServer::start().await;
        let resp = server
            .send(
                "POST",
                "/default/key",
                Some("Application/JSON; charset=utf-8"),
                "{}",
            )
            .await;
        assert_eq!(resp.body, "{}");
    }

    #[tokio::test]
    async fn test_should_reject_post_to_bucket_without_key() {
        let server = TestServer::start().await;
        let resp = server.post_json("/default?keys=a,b", "{}").await;
        assert_eq!(resp.status, 400);
        assert_eq!(resp.err_code(), 4);
    }

    #[tokio::test]
    async fn test_should_reject_invalid_cas_values() {
        let server = TestServer::start().await;
        for raw in ["abc", "-1", "1.5", "18446744073709551616"] {
            let resp = server
                .post_json(&format!("/default/key?cas={raw}"), "{}")
                .await;
            assert_eq!(resp.status, 400, "cas={raw}");
            assert_eq!(
                resp.json()["err"]["message"],
                format!("Invalid CAS value [{raw}]"),
                "cas={raw}"
            );
            assert_eq!(resp.err_code(), 7, "cas={raw}");
        }
    }

    #[tokio::test]
    async fn test_should_reject_unsupported_methods() {
        let server = TestServer::start().await;
        for method in ["PUT", "DELETE", "PATCH"] {
            let resp = server
                .send(method, "/default/key", Some("application/json"), "{}")
                .await;
            assert_eq!(resp.status, 400, "{method}");
            assert_eq!(
                resp.json()["err"]["message"],
                format!("Unsupported method type [{method}]")
            );
            assert_eq!(resp.err_code(), 9, "{method}");
        }
    }

    #[tokio::test]
    async fn test_should_check_path_shape_before_method() {
        let server = TestServer::start().await;
        let resp = server.send("DELETE", "/a/b/c", None, "").await;
        assert_eq!(resp.err_code(), 2);
    }
}
