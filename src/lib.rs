pub mod codebuild;
pub mod config;
pub mod logs;
pub mod notifications;
pub mod poll;
