use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub moderation: ModerationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PagingConfig {
    /// Users fetched per page of the user list
    #[serde(default = "default_users_per_page")]
    pub users_per_page: usize,
    /// Records fetched per page of a record tab
    #[serde(default = "default_records_per_page")]
    pub records_per_page: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            users_per_page: default_users_per_page(),
            records_per_page: default_records_per_page(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModerationConfig {
    #[serde(default)]
    pub allow_restore_from_unsubscribed: bool,
}

fn default_max_connections() -> u32 {
    10
}

fn default_users_per_page() -> usize {
    20
}

fn default_records_per_page() -> usize {
    7
}

impl Config {
    /// Load from `.env` and `DATABASE__URL`-style environment variables
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("database.url", "postgres://localhost/pico_admin")?
            .set_default("database.max_connections", 10)?
            .set_default("paging.users_per_page", 20)?
            .set_default("paging.records_per_page", 7)?
            .set_default("moderation.allow_restore_from_unsubscribed", false)?
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.paging.users_per_page == 0 {
            anyhow::bail!("paging.users_per_page must be greater than zero");
        }
        if self.paging.records_per_page == 0 {
            anyhow::bail!("paging.records_per_page must be greater than zero");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "postgres://localhost/pico_admin".to_string(),
                max_connections: default_max_connections(),
            },
            paging: PagingConfig::default(),
            moderation: ModerationConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_config() {
        env::remove_var("PAGING__RECORDS_PER_PAGE");
        env::remove_var("MODERATION__ALLOW_RESTORE_FROM_UNSUBSCRIBED");

        let config = Config::load().unwrap();
        assert_eq!(config.paging.users_per_page, 20);
        assert_eq!(config.paging.records_per_page, 7);
        assert!(!config.moderation.allow_restore_from_unsubscribed);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        env::set_var("PAGING__RECORDS_PER_PAGE", "12");
        env::set_var("MODERATION__ALLOW_RESTORE_FROM_UNSUBSCRIBED", "true");

        let config = Config::load().unwrap();

        env::remove_var("PAGING__RECORDS_PER_PAGE");
        env::remove_var("MODERATION__ALLOW_RESTORE_FROM_UNSUBSCRIBED");

        assert_eq!(config.paging.records_per_page, 12);
        assert!(config.moderation.allow_restore_from_unsubscribed);
    }

    #[test]
    #[serial]
    fn test_zero_page_size_is_rejected() {
        env::set_var("PAGING__USERS_PER_PAGE", "0");
        let result = Config::load();
        env::remove_var("PAGING__USERS_PER_PAGE");

        assert!(result.is_err());
    }
}
