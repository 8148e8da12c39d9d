fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use mcft_protocol::{
        AuthenticateRequest, Envelope, FileBlockRequest, FinishUploadRequest, RequestType,
        StatusResponse, UploadFileRequest,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  decoded: {reserialized}"
        );
        parsed
    }

    // --- Requests from the client ---

    #[test]
    fn fixture_envelope() {
        let env: Envelope = roundtrip_test("envelope_upload_file.json");
        assert_eq!(env.request_type().unwrap(), RequestType::UploadFile);
    }

    #[test]
    fn fixture_authenticate_request() {
        let req: AuthenticateRequest = roundtrip_test("authenticate_request.json");
        assert_eq!(req.apitoken, "T1");
        assert_eq!(req.project_id, 42);
    }

    #[test]
    fn fixture_upload_file_request() {
        let req: UploadFileRequest = roundtrip_test("upload_file_request.json");
        assert_eq!(req.path, "/a/b/report.docx");
    }

    #[test]
    fn fixture_file_block_request() {
        let req: FileBlockRequest = roundtrip_test("file_block_request.json");
        assert_eq!(req.block, b"xyz");
    }

    #[test]
    fn fixture_finish_upload_request() {
        let req: FinishUploadRequest = roundtrip_test("finish_upload_request.json");
        assert_eq!(req.file_checksum, mcft_transfer::checksum_bytes(b"xyz"));
    }

    #[test]
    fn nil_block_from_client() {
        // The reference client sends a nil block as null.
        let json = r#"{"path":"","block":null,"content_type":"","content_length":0,
            "upload_offset":0,"checksum":"","check_algorithm":"","version":""}"#;
        let req: FileBlockRequest = serde_json::from_str(json).unwrap();
        assert!(req.block.is_empty());
    }

    #[test]
    fn minimal_requests_decode() {
        let req: AuthenticateRequest =
            serde_json::from_str(r#"{"apitoken":"T1","project_id":42}"#).unwrap();
        assert!(req.version.is_empty());
        let req: FileBlockRequest = serde_json::from_str(r#"{"block":"AA=="}"#).unwrap();
        assert_eq!(req.block, vec![0]);
    }

    // --- Replies from the server ---

    #[test]
    fn fixture_status_continue() {
        let status: StatusResponse = roundtrip_test("status_continue.json");
        assert_eq!(status, StatusResponse::proceed());
    }

    #[test]
    fn fixture_status_checksum_mismatch() {
        let status: StatusResponse = roundtrip_test("status_checksum_mismatch.json");
        let produced = StatusResponse::checksum_result(
            &mcft_transfer::checksum_bytes(b"xyz"),
            &mcft_transfer::checksum_bytes(b""),
        );
        assert_eq!(status, produced);
        assert!(status.is_error);
    }

    #[test]
    fn status_error_flag_keeps_go_field_name() {
        let json = serde_json::to_value(StatusResponse::error("boom")).unwrap();
        assert_eq!(json["IsError"], serde_json::Value::Bool(true));
        assert!(json.get("is_error").is_none());
    }
}
