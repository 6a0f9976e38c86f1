//! ABOUTME: Connection configuration for the PostgreSQL-backed repository

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_pool_size: usize,
}

impl PostgresConfig {
    #[must_use]
    pub fn new(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: connection_string.into(),
            max_pool_size: 16,
        }
    }

    #[must_use]
    pub const fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_default_pool_size() {
        let config = PostgresConfig::new("postgresql://localhost/quillforge").with_max_pool_size(4);
        assert_eq!(config.max_pool_size, 4);
    }
}
