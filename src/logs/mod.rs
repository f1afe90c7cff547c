//! Best-effort retrieval of a build's CloudWatch log stream.
//!
//! CodeBuild writes each build's output to the log group
//! `/aws/codebuild/{project}` under a stream named after the UUID half of
//! the build ID. A fetch failure here never fails the notification; the
//! report just goes out without an attachment.

use aws_sdk_cloudwatchlogs::error::SdkError;
use aws_sdk_cloudwatchlogs::operation::get_log_events::GetLogEventsError;
use tracing::{debug, warn};

/// Ordered log lines for one build, plus the identifying header.
#[derive(Debug, Clone)]
pub struct LogBundle {
    build_id: String,
    lines: Vec<String>,
}

impl LogBundle {
    pub fn new(build_id: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            build_id: build_id.into(),
            lines,
        }
    }

    /// True when the stream had no events.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// The full text blob: a header line, then one line per event.
    pub fn to_text(&self) -> String {
        let mut text = format!("Logs for build {}:\n", self.build_id);
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// File name for the email attachment. Build IDs contain a colon,
    /// which some mail clients reject in filenames.
    pub fn attachment_name(&self) -> String {
        format!("{}-logs.txt", self.build_id.replace([':', '/'], "-"))
    }
}

/// Log group that CodeBuild writes a project's builds into.
pub fn log_group_for(project: &str) -> String {
    format!("/aws/codebuild/{project}")
}

/// Log stream for one build: the UUID part of `project:uuid`.
pub fn log_stream_for(build_id: &str) -> &str {
    build_id
        .split_once(':')
        .map(|(_, uuid)| uuid)
        .unwrap_or(build_id)
}

/// Fetches a build's log stream from CloudWatch Logs.
pub struct LogFetcher {
    client: aws_sdk_cloudwatchlogs::Client,
}

impl LogFetcher {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_cloudwatchlogs::Client::new(config),
        }
    }

    /// Fetch the full stream for a build, best-effort. Returns `None` when
    /// the stream cannot be read (missing stream, auth failure, ...).
    pub async fn fetch(&self, project: &str, build_id: &str) -> Option<LogBundle> {
        match self.fetch_lines(project, build_id).await {
            Ok(lines) => {
                debug!(build_id, lines = lines.len(), "Fetched build logs");
                Some(LogBundle::new(build_id, lines))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    build_id,
                    "Could not fetch build logs, sending report without attachment"
                );
                None
            }
        }
    }

    async fn fetch_lines(
        &self,
        project: &str,
        build_id: &str,
    ) -> Result<Vec<String>, SdkError<GetLogEventsError>> {
        let group = log_group_for(project);
        let stream = log_stream_for(build_id);

        let mut lines = Vec::new();
        let mut token: Option<String> = None;

        // GetLogEvents pages forward until the token stops advancing.
        loop {
            let output = self
                .client
                .get_log_events()
                .log_group_name(&group)
                .log_stream_name(stream)
                .start_from_head(true)
                .set_next_token(token.clone())
                .send()
                .await?;

            for event in output.events() {
                if let Some(message) = event.message() {
                    lines.push(message.trim_end_matches('\n').to_string());
                }
            }

            let next = output.next_forward_token().map(str::to_string);
            if next.is_none() || next == token {
                break;
            }
            token = next;
        }

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_group_for() {
        assert_eq!(log_group_for("codebuildtest-np"), "/aws/codebuild/codebuildtest-np");
    }

    #[test]
    fn test_log_stream_for() {
        assert_eq!(
            log_stream_for("codebuildtest-np:0f1e2d3c-4b5a"),
            "0f1e2d3c-4b5a"
        );
        assert_eq!(log_stream_for("b-123"), "b-123");
    }

    #[test]
    fn test_empty_bundle_is_header_only() {
        let bundle = LogBundle::new("b-123", vec![]);
        assert!(bundle.is_empty());
        assert_eq!(bundle.to_text(), "Logs for build b-123:\n");
    }

    #[test]
    fn test_bundle_one_line_per_event() {
        let bundle = LogBundle::new(
            "b-123",
            vec!["phase DOWNLOAD_SOURCE".to_string(), "phase BUILD".to_string()],
        );
        assert_eq!(bundle.len(), 2);
        assert_eq!(
            bundle.to_text(),
            "Logs for build b-123:\nphase DOWNLOAD_SOURCE\nphase BUILD\n"
        );
    }

    #[test]
    fn test_attachment_name_sanitizes_build_id() {
        let bundle = LogBundle::new("codebuildtest-np:0f1e2d3c", vec![]);
        assert_eq!(bundle.attachment_name(), "codebuildtest-np-0f1e2d3c-logs.txt");
    }
}
