use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub uploader: UploaderConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    /// CORS origins allowed to reach the upload endpoints; empty means any.
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root of the permanent uploads area.
    pub uploads_root: PathBuf,
    /// Public URL prefix mapped onto `uploads_root`.
    pub public_base_url: String,
    /// Optional subdirectory of `uploads_root` where committed files land.
    pub custom_subdir: Option<String>,
    /// Name of the staging directory created under `uploads_root`.
    pub staging_dir_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploaderConfig {
    /// Allowed file types, as extensions or MIME types.
    pub allowed_file_types: Vec<String>,
    pub max_file_size_mb: u64,
    pub label_idle: String,
    pub file_type_error: Option<String>,
    pub file_size_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub nonce_secret: String,
    pub nonce_lifetime_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            uploader: UploaderConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_url: "http://127.0.0.1:3000".to_string(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            uploads_root: PathBuf::from("./uploads"),
            public_base_url: "http://127.0.0.1:3000/uploads".to_string(),
            custom_subdir: None,
            staging_dir_name: "easy-dragdrop-uploader-temp".to_string(),
        }
    }
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            allowed_file_types: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "gif".to_string(),
                "pdf".to_string(),
                "txt".to_string(),
                "doc".to_string(),
                "docx".to_string(),
            ],
            max_file_size_mb: 10,
            label_idle: "Browse Image".to_string(),
            file_type_error: Some("File type not allowed.".to_string()),
            file_size_error: Some("File exceeds the maximum allowed size.".to_string()),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            nonce_secret: "b7c1f2de99a04e34a1c85d20f6e4c3aa".to_string(),
            nonce_lifetime_seconds: 12 * 60 * 60,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder().add_source(Config::try_from(&AppConfig::default())?);

        if std::path::Path::new("config.toml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let app_config: AppConfig = config.try_deserialize()?;

        app_config.validate()?;

        Ok(app_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Message("Server port cannot be 0".to_string()));
        }

        if self.uploader.max_file_size_mb == 0 {
            return Err(ConfigError::Message(
                "Max file size must be greater than 0".to_string(),
            ));
        }

        if self.uploader.allowed_file_types.is_empty() {
            return Err(ConfigError::Message(
                "At least one allowed file type is required".to_string(),
            ));
        }

        if self.storage.staging_dir_name.is_empty() {
            return Err(ConfigError::Message(
                "Staging directory name cannot be empty".to_string(),
            ));
        }

        if self.auth.nonce_secret.is_empty() {
            return Err(ConfigError::Message(
                "Nonce secret cannot be empty".to_string(),
            ));
        }

        if self.auth.nonce_secret == AuthConfig::default().nonce_secret {
            tracing::warn!("Using default nonce secret - change this in production!");
        }

        Ok(())
    }

    pub fn create_directories(&self) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(self.storage_path())?;
        std::fs::create_dir_all(self.staging_root())?;
        Ok(())
    }

    /// Directory committed files are moved into.
    pub fn storage_path(&self) -> PathBuf {
        match &self.storage.custom_subdir {
            Some(subdir) if !subdir.is_empty() => self.storage.uploads_root.join(subdir),
            _ => self.storage.uploads_root.clone(),
        }
    }

    /// Root under which per-upload staging directories are created.
    pub fn staging_root(&self) -> PathBuf {
        self.storage
            .uploads_root
            .join(&self.storage.staging_dir_name)
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.uploader.max_file_size_mb * 1024 * 1024
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
