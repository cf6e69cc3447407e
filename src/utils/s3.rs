//! Object storage upload via the AWS CLI

use crate::config::S3Config;
use crate::error::{BackupError, Result};
use crate::utils::executor::CommandExecutor;
use std::path::Path;
use std::time::Duration;

/// Upload a local file to `s3://<bucket>/<key>`.
///
/// Credentials are passed through the CLI's environment. A missing bucket
/// configuration is an upload error, not a startup error: kinds can be
/// enumerated and dumped without S3, they just cannot ship anything.
pub async fn upload_file(
    executor: &dyn CommandExecutor,
    s3: Option<&S3Config>,
    local: &Path,
    key: &str,
    timeout: Option<Duration>,
) -> Result<()> {
    let s3 = s3.ok_or_else(|| BackupError::Upload {
        path: local.to_path_buf(),
        key: key.to_string(),
        code: None,
        stderr: "S3_BUCKET is not configured".to_string(),
    })?;

    let mut envs = Vec::new();
    if let Some(access_key) = &s3.access_key {
        envs.push(("AWS_ACCESS_KEY_ID".to_string(), access_key.clone()));
    }
    if let Some(secret_key) = &s3.secret_key {
        envs.push(("AWS_SECRET_ACCESS_KEY".to_string(), secret_key.clone()));
    }

    let args = vec![
        "s3".to_string(),
        "cp".to_string(),
        local.display().to_string(),
        format!("s3://{}/{}", s3.bucket, key),
    ];

    let output = executor
        .run("aws", &args, &envs, timeout)
        .await
        .map_err(|e| BackupError::Upload {
            path: local.to_path_buf(),
            key: key.to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(BackupError::Upload {
            path: local.to_path_buf(),
            key: key.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::executor::mock::{MockExecutor, MockResponse};

    fn s3() -> S3Config {
        S3Config {
            bucket: "nightly-backups".to_string(),
            access_key: Some("AKIA123".to_string()),
            secret_key: Some("sekrit".to_string()),
        }
    }

    #[tokio::test]
    async fn test_upload_arguments_and_credentials() {
        let executor = MockExecutor::new();
        upload_file(
            &executor,
            Some(&s3()),
            Path::new("/tmp/work/app.sql.gz"),
            "app/2024-01-02T03-04-05.000Z.pg.sql.gz",
            None,
        )
        .await
        .unwrap();

        let call = &executor.calls_for("aws")[0];
        assert_eq!(call.args[0], "s3");
        assert_eq!(call.args[1], "cp");
        assert_eq!(call.args[2], "/tmp/work/app.sql.gz");
        assert_eq!(
            call.args[3],
            "s3://nightly-backups/app/2024-01-02T03-04-05.000Z.pg.sql.gz"
        );
        assert_eq!(call.env("AWS_ACCESS_KEY_ID"), Some("AKIA123"));
        assert_eq!(call.env("AWS_SECRET_ACCESS_KEY"), Some("sekrit"));
    }

    #[tokio::test]
    async fn test_upload_without_bucket_fails() {
        let executor = MockExecutor::new();
        let err = upload_file(&executor, None, Path::new("/tmp/a.gz"), "a/b.gz", None)
            .await
            .unwrap_err();
        assert!(matches!(err, BackupError::Upload { code: None, .. }));
        assert!(!executor.was_called("aws"));
    }

    #[tokio::test]
    async fn test_upload_failure_is_typed() {
        let executor = MockExecutor::new().expect("aws", MockResponse::failure(255, "AccessDenied"));
        let err = upload_file(&executor, Some(&s3()), Path::new("/tmp/a.gz"), "a/b.gz", None)
            .await
            .unwrap_err();
        match err {
            BackupError::Upload { code, stderr, .. } => {
                assert_eq!(code, Some(255));
                assert_eq!(stderr, "AccessDenied");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
