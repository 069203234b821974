//! Configuration file loading.

use std::path::Path;

use anyhow::Context;

use crate::Config;

/// Environment variable supplying the upstream API key when the
/// configuration file does not.
const API_KEY_ENV: &str = "SPOONACULAR_API_KEY";

pub(crate) fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("failed to parse configuration in {}", path.display()))?
    } else {
        Config::default()
    };

    apply_env_fallbacks(&mut config);

    Ok(config)
}

fn apply_env_fallbacks(config: &mut Config) {
    if config.api.upstream.api_key.is_none()
        && let Ok(key) = std::env::var(API_KEY_ENV)
        && !key.is_empty()
    {
        config.api.upstream.api_key = Some(key.into());
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use secrecy::ExposeSecret;

    use crate::Config;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load(dir.path().join("pantry.toml")).unwrap();

        assert_eq!("/api", config.api.path);
        assert_eq!(1, config.api.search.rate_limit.limit);
    }

    #[test]
    fn file_values_win_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[api.upstream]").unwrap();
        writeln!(file, "api_key = \"from-file\"").unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(
            "from-file",
            config.api.upstream.api_key.unwrap().expose_secret()
        );
    }

    #[test]
    fn api_key_falls_back_to_environment() {
        let dir = tempfile::tempdir().unwrap();

        // SAFETY: test-local mutation; no other test reads this variable
        // while unset.
        unsafe { std::env::set_var(super::API_KEY_ENV, "from-env") };

        let config = Config::load(dir.path().join("pantry.toml")).unwrap();

        unsafe { std::env::remove_var(super::API_KEY_ENV) };

        assert_eq!(
            "from-env",
            config.api.upstream.api_key.unwrap().expose_secret()
        );
    }

    #[test]
    fn invalid_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pantry.toml");

        std::fs::write(&path, "not valid toml [").unwrap();

        let error = Config::load(&path).unwrap_err();

        assert!(error.to_string().contains("pantry.toml"));
    }
}
