/// Runtime configuration for the update-service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OntodbConfig {
    /// Upper bound on rows accepted by one batch call.
    pub max_batch_rows: usize,
    /// Prefix for generated object URIs; the table name and a v4 UUID are
    /// appended.
    pub object_uri_prefix: String,
}

impl Default for OntodbConfig {
    fn default() -> Self {
        Self {
            max_batch_rows: 10_000,
            object_uri_prefix: "urn:lsid:ontodb".into(),
        }
    }
}

impl OntodbConfig {
    pub fn with_max_batch_rows(mut self, max_batch_rows: usize) -> Self {
        self.max_batch_rows = max_batch_rows;
        self
    }

    pub fn with_object_uri_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.object_uri_prefix = prefix.into();
        self
    }
}
