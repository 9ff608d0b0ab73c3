use anyhow::Context;
use base64::Engine;

use crate::api::SourceDocument;

/// Decode the sources response header: base64-encoded UTF-8 JSON array of
/// source records.
pub fn decode_sources_header(header: &str) -> anyhow::Result<Vec<SourceDocument>> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(header)
        .context("sources header is not valid base64")?;
    let json = String::from_utf8(bytes).context("sources header is not UTF-8")?;
    let docs =
        serde_json::from_str::<Vec<SourceDocument>>(&json).context("sources header is not a JSON array of source records")?;
    Ok(docs)
}

/// Encode a source list the way the backend does. Test helper, mostly.
pub fn encode_sources_header(docs: &[SourceDocument]) -> anyhow::Result<String> {
    let json = serde_json::to_string(docs)?;
    Ok(base64::engine::general_purpose::STANDARD.encode(json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_record() {
        let header = base64::engine::general_purpose::STANDARD.encode(r#"[{"text":"a"}]"#);
        let docs = decode_sources_header(&header).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "a");
    }

    #[test]
    fn test_decode_empty_array() {
        let header = base64::engine::general_purpose::STANDARD.encode("[]");
        let docs = decode_sources_header(&header).unwrap();
        assert!(docs.is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode_sources_header("not base64 at all!!!").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_json() {
        let header = base64::engine::general_purpose::STANDARD.encode("{not json");
        assert!(decode_sources_header(&header).is_err());
    }

    #[test]
    fn test_decode_rejects_non_array() {
        let header = base64::engine::general_purpose::STANDARD.encode(r#"{"text":"a"}"#);
        assert!(decode_sources_header(&header).is_err());
    }

    #[test]
    fn test_round_trip() {
        let docs = vec![SourceDocument {
            text: "passage".to_string(),
            locator: Some(serde_json::json!({"line": 12})),
        }];
        let header = encode_sources_header(&docs).unwrap();
        assert_eq!(decode_sources_header(&header).unwrap(), docs);
    }
}
