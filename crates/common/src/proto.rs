//! Generated types and client for the `semantic_engine.SemanticEngine` gRPC service

tonic::include_proto!("semantic_engine");

pub use semantic_engine_client::SemanticEngineClient;

impl From<&crate::models::Triple> for Triple {
    fn from(t: &crate::models::Triple) -> Self {
        Self {
            subject: t.subject().to_string(),
            predicate: t.predicate().to_string(),
            object: t.object().to_string(),
        }
    }
}

impl From<Triple> for crate::models::Triple {
    fn from(t: Triple) -> Self {
        crate::models::Triple::new(t.subject, t.predicate, t.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_triple_conversion_keeps_fields() {
        let domain = crate::models::Triple::new("Alice", "knows", "Bob");
        let wire = Triple::from(&domain);
        assert_eq!(wire.predicate, "knows");
        assert_eq!(crate::models::Triple::from(wire), domain);
    }

    #[test]
    fn test_ingest_request_decodes() {
        let request = IngestRequest {
            triples: vec![Triple::from(&crate::models::Triple::new("Alice", "knows", "Bob"))],
            tenant_id: "acme".into(),
        };
        let decoded = IngestRequest::decode(request.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded.tenant_id, "acme");
        assert_eq!(decoded.triples.len(), 1);
    }
}
