//! Container runtime abstraction.
//!
//! The [`ContainerRuntime`] trait is the only way the rest of the crate
//! touches containers. Production code uses [`DockerEngine`], which talks
//! to the Docker Engine API through `bollard`; tests substitute their own
//! implementation.

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as BollardError;
use bollard::image::CreateImageOptions;
use bollard::models::HostConfig;
use futures::{StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Image not found: {image} ({detail})")]
    ImageNotFound { image: String, detail: String },

    #[error("Failed to connect to container runtime: {0}")]
    Connection(String),

    #[error("Container runtime {operation} failed: {message}")]
    Api { operation: String, message: String },
}

/// A host directory bound read-write into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

impl VolumeMount {
    /// Bind specification in `host:container:rw` form.
    pub fn bind(&self) -> String {
        format!("{}:{}:rw", self.host_path.display(), self.container_path)
    }
}

/// Everything needed to start one scan container.
///
/// The container is removed once it exits.
#[derive(Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub mount: VolumeMount,
    /// User (uid or name) to run as instead of the image default.
    pub user: Option<String>,
    /// Environment variables. Values may be secrets and are never printed.
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    pub fn env_names(&self) -> impl Iterator<Item = &str> {
        self.env.iter().map(|(name, _)| name.as_str())
    }
}

impl std::fmt::Debug for ContainerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerSpec")
            .field("image", &self.image)
            .field("command", &self.command)
            .field("mount", &self.mount)
            .field("user", &self.user)
            .field("env", &self.env_names().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetches `image` so that [`run`](Self::run) can start it.
    async fn pull(&self, image: &str) -> Result<(), RuntimeError>;

    /// Runs a container to completion and returns its exit status.
    async fn run(&self, spec: &ContainerSpec) -> Result<i32, RuntimeError>;
}

/// [`ContainerRuntime`] backed by the Docker Engine API.
pub struct DockerEngine {
    docker: Arc<bollard::Docker>,
}

impl DockerEngine {
    /// Connects using the local defaults (`DOCKER_HOST` or the platform
    /// socket).
    pub fn connect_local() -> Result<Self, RuntimeError> {
        let docker = bollard::Docker::connect_with_local_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    /// Connects to the daemon listening on the Unix socket at `path`.
    pub fn connect_with_socket(path: &str) -> Result<Self, RuntimeError> {
        let docker = bollard::Docker::connect_with_socket(path, 120, bollard::API_DEFAULT_VERSION)
            .map_err(|e| RuntimeError::Connection(format!("{path}: {e}")))?;
        Ok(Self {
            docker: Arc::new(docker),
        })
    }

    async fn remove(&self, id: &str) {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        if let Err(e) = self.docker.remove_container(id, Some(options)).await {
            warn!(container = id, "Failed to remove scan container: {}", e);
        }
    }

    async fn wait(&self, id: &str) -> Result<i32, RuntimeError> {
        let mut stream = Box::pin(
            self.docker
                .wait_container(id, None::<WaitContainerOptions<String>>),
        );
        let code = match stream.next().await {
            Some(Ok(response)) => response.status_code,
            // bollard reports a non-zero exit as an error carrying the code.
            Some(Err(BollardError::DockerContainerWaitError { code, .. })) => code,
            Some(Err(e)) => return Err(api_error("wait", e)),
            None => {
                return Err(RuntimeError::Api {
                    operation: "wait".to_string(),
                    message: format!("no exit status reported for container {id}"),
                })
            }
        };
        i32::try_from(code).map_err(|_| RuntimeError::Api {
            operation: "wait".to_string(),
            message: format!("exit status {code} out of range"),
        })
    }
}

#[async_trait]
impl ContainerRuntime for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn pull(&self, image: &str) -> Result<(), RuntimeError> {
        let (repository, tag) = split_image_ref(image);
        let options = CreateImageOptions {
            from_image: repository.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| classify_pull_error(image, e))?;
        Ok(())
    }

    async fn run(&self, spec: &ContainerSpec) -> Result<i32, RuntimeError> {
        debug!(?spec, "Starting container");

        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config(spec))
            .await
            .map_err(|e| api_error("create", e))?;
        let id = created.id;

        if let Err(e) = self
            .docker
            .start_container(&id, None::<StartContainerOptions<String>>)
            .await
        {
            self.remove(&id).await;
            return Err(api_error("start", e));
        }

        // Removed after the wait rather than through `auto_remove`, which can
        // delete the container before its exit status is read.
        let status = self.wait(&id).await;
        self.remove(&id).await;
        status
    }
}

/// Splits `repo[:tag]` into repository and tag, defaulting to `latest`.
/// A colon inside a registry host (`host:5000/repo`) is not a tag separator.
fn split_image_ref(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((repository, tag)) if !tag.contains('/') => (repository, tag),
        _ => (image, "latest"),
    }
}

/// Engine API configuration for one scan container. Environment values
/// travel in the request body, never on a command line.
fn container_config(spec: &ContainerSpec) -> Config<String> {
    let env = spec
        .env
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect();

    Config {
        image: Some(spec.image.clone()),
        cmd: Some(spec.command.clone()),
        env: Some(env),
        user: spec.user.clone(),
        host_config: Some(HostConfig {
            binds: Some(vec![spec.mount.bind()]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A 404 from the image endpoint means the repository or tag does not exist.
fn classify_pull_error(image: &str, err: BollardError) -> RuntimeError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::ImageNotFound {
            image: image.to_string(),
            detail: message,
        },
        other => api_error("pull", other),
    }
}

fn api_error(operation: &str, err: BollardError) -> RuntimeError {
    RuntimeError::Api {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

/// The user scan containers run as when none is configured: the owner of
/// the project directory, so files the engine writes stay owned by it.
#[cfg(unix)]
pub fn default_container_user(project: &Path) -> Option<String> {
    use std::os::unix::fs::MetadataExt;

    std::fs::metadata(project)
        .ok()
        .map(|m| m.uid().to_string())
}

#[cfg(not(unix))]
pub fn default_container_user(_project: &Path) -> Option<String> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ContainerSpec {
        ContainerSpec {
            image: "snyk/snyk-cli:npm".to_string(),
            command: vec![
                "test".to_string(),
                "--file=a/package.json".to_string(),
                "--skip-unresolved".to_string(),
            ],
            mount: VolumeMount {
                host_path: PathBuf::from("/home/ci/project"),
                container_path: "/project".to_string(),
            },
            user: Some("1000".to_string()),
            env: vec![("SNYK_TOKEN".to_string(), "secret-token-value".to_string())],
        }
    }

    #[test]
    fn test_container_config() {
        let config = container_config(&spec());

        assert_eq!(config.image.as_deref(), Some("snyk/snyk-cli:npm"));
        assert_eq!(
            config.cmd.unwrap(),
            vec!["test", "--file=a/package.json", "--skip-unresolved"]
        );
        assert_eq!(config.user.as_deref(), Some("1000"));
        assert_eq!(config.env.unwrap(), vec!["SNYK_TOKEN=secret-token-value"]);
        assert_eq!(
            config.host_config.unwrap().binds.unwrap(),
            vec!["/home/ci/project:/project:rw"]
        );
    }

    #[test]
    fn test_container_config_without_user() {
        let mut spec = spec();
        spec.user = None;
        assert!(container_config(&spec).user.is_none());
    }

    #[test]
    fn test_debug_redacts_env_values() {
        let debug = format!("{:?}", spec());
        assert!(debug.contains("SNYK_TOKEN"));
        assert!(!debug.contains("secret-token-value"));
    }

    #[test]
    fn test_split_image_ref() {
        assert_eq!(split_image_ref("snyk/snyk-cli:npm"), ("snyk/snyk-cli", "npm"));
        assert_eq!(split_image_ref("snyk/snyk:linux"), ("snyk/snyk", "linux"));
        assert_eq!(split_image_ref("snyk/snyk"), ("snyk/snyk", "latest"));
        assert_eq!(
            split_image_ref("registry.local:5000/snyk/snyk"),
            ("registry.local:5000/snyk/snyk", "latest")
        );
        assert_eq!(
            split_image_ref("registry.local:5000/snyk/snyk-cli:sbt-1.0.4"),
            ("registry.local:5000/snyk/snyk-cli", "sbt-1.0.4")
        );
    }

    #[test]
    fn test_pull_404_is_image_not_found() {
        let err = classify_pull_error(
            "snyk/snyk-cli:nope",
            BollardError::DockerResponseServerError {
                status_code: 404,
                message: "manifest for snyk/snyk-cli:nope not found: manifest unknown".to_string(),
            },
        );
        assert!(matches!(
            err,
            RuntimeError::ImageNotFound { ref image, .. } if image == "snyk/snyk-cli:nope"
        ));
    }

    #[test]
    fn test_pull_other_failures_are_api_errors() {
        // Message text alone never makes a failure a missing image.
        let err = classify_pull_error(
            "snyk/snyk:linux",
            BollardError::DockerResponseServerError {
                status_code: 500,
                message: "network bridge not found".to_string(),
            },
        );
        assert!(matches!(err, RuntimeError::Api { ref operation, .. } if operation == "pull"));

        let err = classify_pull_error(
            "snyk/snyk:linux",
            BollardError::DockerStreamError {
                error: "unexpected EOF".to_string(),
            },
        );
        assert!(matches!(err, RuntimeError::Api { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreachable_socket_fails_to_pull() {
        let dir = tempfile::TempDir::new().unwrap();
        let socket = dir.path().join("docker.sock");
        let engine = DockerEngine::connect_with_socket(&socket.to_string_lossy()).unwrap();

        let err = engine.pull("snyk/snyk:linux").await.unwrap_err();

        assert!(matches!(err, RuntimeError::Api { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_default_container_user_is_owner_uid() {
        let dir = tempfile::TempDir::new().unwrap();
        let user = default_container_user(dir.path()).unwrap();
        assert!(user.parse::<u32>().is_ok());
        assert!(default_container_user(&dir.path().join("missing")).is_none());
    }
}
