//! Build report rendering and email delivery.

mod email;

pub use email::{EmailConfig, EmailNotifier};

use chrono::Utc;

use crate::codebuild::BuildStatus;

/// Everything the report email says about one build.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub environment: String,
    pub project: String,
    pub build_id: String,
    pub status: BuildStatus,
    pub timestamp: String,
}

impl BuildReport {
    pub fn new(
        environment: impl Into<String>,
        project: impl Into<String>,
        build_id: impl Into<String>,
        status: BuildStatus,
    ) -> Self {
        Self {
            environment: environment.into(),
            project: project.into(),
            build_id: build_id.into(),
            status,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn subject(&self) -> String {
        format!("CodeBuild alert for project {}", self.project)
    }

    /// Header color for the HTML rendering.
    pub fn color(&self) -> &'static str {
        match self.status {
            BuildStatus::InProgress => "#3498db",        // Blue
            BuildStatus::Succeeded => "#2ecc71",         // Green
            BuildStatus::Failed => "#e74c3c",            // Red
            BuildStatus::Stopped => "#f39c12",           // Orange
            BuildStatus::Unknown(_) => "#95a5a6",        // Gray
        }
    }

    pub fn render_html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <style>
        body {{ font-family: Arial, sans-serif; margin: 0; padding: 20px; background-color: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; background-color: #ffffff; border-radius: 8px; overflow: hidden; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .header {{ background-color: {color}; color: white; padding: 20px; text-align: center; }}
        .content {{ padding: 20px; }}
        .field {{ margin-bottom: 15px; }}
        .field-label {{ font-weight: bold; color: #666; }}
        .field-value {{ color: #333; }}
        .footer {{ padding: 15px; text-align: center; color: #888; font-size: 12px; border-top: 1px solid #eee; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{subject}</h1>
        </div>
        <div class="content">
            <p>Build {build_id} reported status {status}.</p>
            <div class="field">
                <span class="field-label">Project:</span>
                <span class="field-value">{project}</span>
            </div>
            <div class="field">
                <span class="field-label">Build:</span>
                <span class="field-value">{build_id}</span>
            </div>
            <div class="field">
                <span class="field-label">Status:</span>
                <span class="field-value">{status}</span>
            </div>
            <div class="field">
                <span class="field-label">Environment:</span>
                <span class="field-value">{environment}</span>
            </div>
        </div>
        <div class="footer">
            Reported by buildwatch at {timestamp}
        </div>
    </div>
</body>
</html>
"#,
            color = self.color(),
            subject = html_escape(&self.subject()),
            project = html_escape(&self.project),
            build_id = html_escape(&self.build_id),
            status = html_escape(&self.status.to_string()),
            environment = html_escape(&self.environment),
            timestamp = html_escape(&self.timestamp),
        )
    }

    pub fn render_text(&self) -> String {
        format!(
            "{subject}\n\n\
             Build {build_id} reported status {status}.\n\n\
             Project: {project}\n\
             Build: {build_id}\n\
             Status: {status}\n\
             Environment: {environment}\n\n\
             ---\n\
             Reported by buildwatch at {timestamp}\n",
            subject = self.subject(),
            project = self.project,
            build_id = self.build_id,
            status = self.status,
            environment = self.environment,
            timestamp = self.timestamp,
        )
    }
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: BuildStatus) -> BuildReport {
        BuildReport::new("np", "codebuildtest-np", "codebuildtest-np:0f1e2d3c", status)
    }

    #[test]
    fn test_subject_contains_project() {
        let report = report(BuildStatus::Succeeded);
        assert!(report.subject().contains("codebuildtest-np"));
    }

    #[test]
    fn test_bodies_contain_literal_status() {
        for (status, literal) in [
            (BuildStatus::Succeeded, "SUCCEEDED"),
            (BuildStatus::Failed, "FAILED"),
            (BuildStatus::Stopped, "STOPPED"),
            (BuildStatus::InProgress, "IN_PROGRESS"),
        ] {
            let report = report(status);
            assert!(report.render_html().contains(literal));
            assert!(report.render_text().contains(literal));
        }
    }

    #[test]
    fn test_html_is_escaped() {
        let report = BuildReport::new("np", "evil<&>project", "b-123", BuildStatus::Failed);
        let html = report.render_html();
        assert!(html.contains("evil&lt;&amp;&gt;project"));
        assert!(!html.contains("evil<&>project"));
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(report(BuildStatus::Succeeded).color(), "#2ecc71");
        assert_eq!(report(BuildStatus::Failed).color(), "#e74c3c");
        assert_eq!(
            report(BuildStatus::Unknown("FAULT".to_string())).color(),
            "#95a5a6"
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }
}
