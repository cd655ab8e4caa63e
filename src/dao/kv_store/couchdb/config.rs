use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "number_hunt";
const DEFAULT_CONFLICT_RETRIES: u32 = 5;

/// Where the key documents live and how hard to fight revision conflicts.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL without trailing slash.
    pub base_url: String,
    /// Database holding the key documents.
    pub database: String,
    /// Basic auth user and password.
    pub credentials: Option<(String, String)>,
    /// Replays of a read-modify-write after a `409 Conflict`.
    pub conflict_retries: u32,
}

impl CouchConfig {
    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, the
    /// `COUCH_USERNAME`/`COUCH_PASSWORD` pair and `COUCH_CONFLICT_RETRIES`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let non_blank = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        let base_url = non_blank("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let conflict_retries = non_blank("COUCH_CONFLICT_RETRIES")
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_CONFLICT_RETRIES);

        Ok(Self {
            base_url,
            database: non_blank("COUCH_DB").unwrap_or_else(|| DEFAULT_DATABASE.to_owned()),
            credentials: non_blank("COUCH_USERNAME").zip(non_blank("COUCH_PASSWORD")),
            conflict_retries,
        })
    }
}
