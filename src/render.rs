//! HTML rendering of the result document by an external renderer.

use std::path::Path;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed with status {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Runs `<renderer> -i <input> -o <output>`.
pub async fn render_html(renderer: &str, input: &Path, output: &Path) -> Result<(), RenderError> {
    let result = Command::new(renderer)
        .arg("-i")
        .arg(input)
        .arg("-o")
        .arg(output)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| RenderError::Spawn {
            program: renderer.to_string(),
            source,
        })?;

    if result.status.success() {
        Ok(())
    } else {
        Err(RenderError::Failed {
            command: format!("{} -i {} -o {}", renderer, input.display(), output.display()),
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        })
    }
}

/// Writes an executable renderer script that wraps its input in a minimal
/// HTML page.
#[cfg(all(test, unix))]
pub(crate) fn write_test_renderer(dir: &Path) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("render-html.sh");
    std::fs::write(
        &path,
        "#!/bin/sh\n\
         [ \"$1\" = \"-i\" ] && [ \"$3\" = \"-o\" ] || exit 64\n\
         { echo '<html><body><pre>'; cat \"$2\"; echo '</pre></body></html>'; } > \"$4\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_renderer() {
        let dir = TempDir::new().unwrap();
        let err = render_html(
            "depscan-no-such-renderer",
            &dir.path().join("in.json"),
            &dir.path().join("out.html"),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, RenderError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_renderer() {
        let dir = TempDir::new().unwrap();
        let err = render_html("false", &dir.path().join("in.json"), &dir.path().join("out.html"))
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Failed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_writes_html() {
        let bin = TempDir::new().unwrap();
        let renderer = write_test_renderer(bin.path());
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("snyk-result.json");
        let output = dir.path().join("snyk_report.html");
        std::fs::write(&input, r#"{"vulnerabilities":[{"id":"X"}]}"#).unwrap();

        render_html(&renderer.to_string_lossy(), &input, &output)
            .await
            .unwrap();

        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.starts_with("<html>"));
        assert!(html.contains(r#""id":"X""#));
    }
}
