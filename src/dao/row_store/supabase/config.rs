use super::error::{SupabaseError, SupabaseResult};

/// Runtime configuration describing how to reach the hosted project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    pub project_url: String,
    pub api_key: String,
    pub schema: String,
}

impl SupabaseConfig {
    /// Construct a configuration from an explicit project URL and anon key.
    pub fn new(project_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            api_key: api_key.into(),
            schema: "public".into(),
        }
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> SupabaseResult<Self> {
        let project_url = std::env::var("SUPABASE_URL")
            .map_err(|_| SupabaseError::MissingEnvVar { var: "SUPABASE_URL" })?;
        let api_key = std::env::var("SUPABASE_KEY")
            .map_err(|_| SupabaseError::MissingEnvVar { var: "SUPABASE_KEY" })?;

        let mut config = Self::new(project_url, api_key);
        if let Some(schema) = std::env::var("SUPABASE_SCHEMA")
            .ok()
            .filter(|schema| !schema.trim().is_empty())
        {
            config.schema = schema;
        }
        Ok(config)
    }

    /// Base URL of the PostgREST endpoint.
    pub fn rest_url(&self) -> String {
        format!("{}/rest/v1", self.project_url.trim_end_matches('/'))
    }

    /// Websocket URL of the realtime endpoint.
    pub fn realtime_url(&self) -> String {
        let base = self.project_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!(
            "{ws_base}/realtime/v1/websocket?apikey={}&vsn=1.0.0",
            self.api_key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_endpoint_urls() {
        let config = SupabaseConfig::new("https://demo.supabase.co/", "anon");
        assert_eq!(config.rest_url(), "https://demo.supabase.co/rest/v1");
        assert_eq!(
            config.realtime_url(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=anon&vsn=1.0.0"
        );
    }
}
