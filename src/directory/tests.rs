//! Replica Directory Tests

#[cfg(test)]
mod tests {
    use crate::directory::types::{ReplicaAddress, ReplicaDirectory};
    use crate::error::LogError;

    #[test]
    fn test_parse_comma_separated_list() {
        let directory =
            ReplicaDirectory::parse("http://node1:8081, http://node2:8082/,http://node3:8083")
                .unwrap();

        assert_eq!(directory.len(), 3);
        assert_eq!(directory.replicas()[1].as_str(), "http://node2:8082");
        assert_eq!(directory.get(2).unwrap().as_str(), "http://node3:8083");
        assert!(directory.get(3).is_none());
    }

    #[test]
    fn test_parse_skips_blank_items() {
        let directory = ReplicaDirectory::parse("http://node1:8081,, ,").unwrap();
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_empty_list_is_allowed() {
        let directory = ReplicaDirectory::parse("").unwrap();
        assert!(directory.is_empty());
    }

    #[test]
    fn test_duplicates_are_rejected() {
        let result = ReplicaDirectory::parse("http://node1:8081,http://node1:8081/");
        assert!(matches!(result, Err(LogError::Validation { .. })));
    }

    #[test]
    fn test_address_requires_scheme() {
        assert!(ReplicaAddress::new("node1:8081").is_err());
        assert!(ReplicaAddress::new("   ").is_err());
        assert!(ReplicaAddress::new("https://node1").is_ok());
    }

    #[test]
    fn test_url_joins_endpoint() {
        let address = ReplicaAddress::new("http://node1:8081/").unwrap();
        assert_eq!(
            address.url("/api/storage/health"),
            "http://node1:8081/api/storage/health"
        );
    }
}
