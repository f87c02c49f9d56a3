//! Helpers for using the figment config parsing library

use figment::providers::Format;

/// A figment provider for JSON5 documents.
///
/// JSON5 is a superset of JSON, so plain JSON config files parse as well. Comments and trailing
/// commas are allowed, which makes it a friendlier format for hand written configs.
pub struct JsonProvider;

impl Format for JsonProvider {
    type Error = json5::Error;

    const NAME: &'static str = "JSON5";

    fn from_str<'de, T: serde::de::DeserializeOwned>(string: &'de str) -> Result<T, Self::Error> {
        json5::from_str(string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchConfig;
    use figment::Figment;

    #[test]
    fn test_parses_json5() {
        let config: PatchConfig = Figment::new()
            .merge(JsonProvider::string("{ margin: 6, /* comment */ 'delete-threshold': 0.1, }"))
            .extract()
            .unwrap();
        assert_eq!(config.margin, 6);
        assert_eq!(config.delete_threshold, 0.1);
    }

    #[test]
    fn test_rejects_garbage() {
        let result: Result<PatchConfig, _> = Figment::new()
            .merge(JsonProvider::string("{ margin: "))
            .extract();
        assert!(result.is_err());
    }
}
