use anyhow::{anyhow, Context};
use std::{fs, path::PathBuf, str::FromStr};

use apix_hosted::{AccessKey, Credentials};
use etcetera::{app_strategy, AppStrategy, AppStrategyArgs};

use crate::args::CredentialArgs;

pub fn credentials_filepath() -> anyhow::Result<PathBuf> {
    let strategy = app_strategy::Unix::new(AppStrategyArgs {
        top_level_domain: "com".to_string(),
        author: "apix".to_string(),
        app_name: "apix".to_string(),
    })?;
    let config_dir = strategy.config_dir();
    Ok(config_dir.join("credentials.toml"))
}

pub fn read_credentials(path: anyhow::Result<PathBuf>) -> anyhow::Result<Credentials> {
    let toml_str = fs::read_to_string(path?)?;
    let credentials = toml::from_str(&toml_str)?;
    Ok(credentials)
}

/// Credentials given as flags or environment variables win. Otherwise they are read from the
/// credentials file at `path`.
pub fn resolve(args: CredentialArgs, path: anyhow::Result<PathBuf>) -> anyhow::Result<Credentials> {
    if let (Some(username), Some(access_key)) = (&args.username, &args.access_key) {
        let access_key = AccessKey::from_str(access_key)?;
        return Ok(Credentials::new(username.trim(), access_key));
    }

    let path = path?;
    let credentials = read_credentials(Ok(path.clone())).with_context(|| {
        format!(
            "no credentials found; pass --username and --access-key, set APIX_USERNAME and APIX_ACCESS_KEY, or write them to {}",
            path.display()
        )
    })?;

    if !credentials.is_valid() {
        return Err(anyhow!(
            "credentials in {} are missing a username or access key",
            path.display()
        ));
    }
    Ok(credentials)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use tempfile::NamedTempFile;

    fn write_credentials(
        credentials: &Credentials,
        path: anyhow::Result<PathBuf>,
    ) -> anyhow::Result<PathBuf> {
        let path = path?;
        let config_dir = path
            .parent()
            .ok_or_else(|| anyhow!("credentials file must have parent dir"))?;
        fs::create_dir_all(config_dir)?;
        let toml_str = toml::to_string(credentials)?;
        fs::write(&path, toml_str)?;
        Ok(path)
    }

    fn credentials() -> Credentials {
        Credentials::new("jdoe", AccessKey::from_str("secret-key").unwrap())
    }

    #[test]
    fn test_credentials_file_operations() {
        let tmp_file = NamedTempFile::new().expect("Failed to create temporary file");

        let path = write_credentials(&credentials(), Ok(tmp_file.path().to_path_buf()));
        let read = read_credentials(path).unwrap();

        assert_eq!(read, credentials());
    }

    #[test]
    fn flags_win_over_file() {
        let tmp_file = NamedTempFile::new().unwrap();
        write_credentials(&credentials(), Ok(tmp_file.path().to_path_buf())).unwrap();

        let args = CredentialArgs {
            username: Some("other".to_owned()),
            access_key: Some("other-key".to_owned()),
        };
        let resolved = resolve(args, Ok(tmp_file.path().to_path_buf())).unwrap();

        assert_eq!(resolved.username, "other");
        assert_eq!(resolved.access_key.expose(), "other-key");
    }

    #[test]
    fn partial_flags_fall_back_to_file() {
        let tmp_file = NamedTempFile::new().unwrap();
        write_credentials(&credentials(), Ok(tmp_file.path().to_path_buf())).unwrap();

        let args = CredentialArgs {
            username: Some("other".to_owned()),
            access_key: None,
        };
        let resolved = resolve(args, Ok(tmp_file.path().to_path_buf())).unwrap();

        assert_eq!(resolved, credentials());
    }

    #[test]
    fn missing_credentials_say_how_to_provide_them() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(Default::default(), Ok(dir.path().join("credentials.toml"))).unwrap_err();

        assert!(err.to_string().contains("APIX_ACCESS_KEY"), "{err}");
    }

    #[test]
    fn empty_access_key_flag_is_rejected() {
        let args = CredentialArgs {
            username: Some("jdoe".to_owned()),
            access_key: Some("  ".to_owned()),
        };
        assert!(resolve(args, Err(anyhow!("unused"))).is_err());
    }
}
