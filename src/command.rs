//! Startup command normalization
//!
//! Images declare their entrypoint and default command either as a
//! single string, as an ordered sequence, or not at all. Both halves are
//! normalized with one match and concatenated entrypoint-first.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrimError};

/// Declared shape of an image's entrypoint or default command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandShape {
    #[default]
    Absent,
    Single(String),
    Many(Vec<String>),
}

impl CommandShape {
    /// Normalize to an ordered sequence; empty shapes contribute nothing
    pub fn into_args(self) -> Vec<String> {
        match self {
            CommandShape::Absent => Vec::new(),
            CommandShape::Single(s) if s.is_empty() => Vec::new(),
            CommandShape::Single(s) => vec![s],
            CommandShape::Many(args) => args,
        }
    }
}

/// Startup declaration as reported by image inspection
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageConfig {
    #[serde(rename = "Entrypoint", default)]
    pub entrypoint: CommandShape,
    #[serde(rename = "Cmd", default)]
    pub cmd: CommandShape,
}

/// Executable path followed by its arguments, as originally declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartupCommand(Vec<String>);

impl StartupCommand {
    /// Flatten entrypoint then command into one sequence
    ///
    /// Fails when both halves are empty: such an image has no
    /// determinable startup command and cannot be instrumented.
    pub fn from_image_config(image: &str, config: ImageConfig) -> Result<Self> {
        let mut args = config.entrypoint.into_args();
        args.extend(config.cmd.into_args());

        if args.is_empty() {
            return Err(TrimError::Configuration(format!(
                "Could not determine the command to wrap from image '{}'. Does it have an ENTRYPOINT or CMD?",
                image
            )));
        }

        Ok(Self(args))
    }

    pub fn args(&self) -> &[String] {
        &self.0
    }

    pub fn into_args(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(entrypoint: CommandShape, cmd: CommandShape) -> ImageConfig {
        ImageConfig { entrypoint, cmd }
    }

    fn many(items: &[&str]) -> CommandShape {
        CommandShape::Many(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_entrypoint_then_cmd_order() {
        let cmd = StartupCommand::from_image_config(
            "img",
            config(many(&["/lambda-entrypoint.sh"]), many(&["app.handler"])),
        )
        .unwrap();
        assert_eq!(cmd.args(), ["/lambda-entrypoint.sh", "app.handler"]);
    }

    #[test]
    fn test_single_string_shapes() {
        let cmd = StartupCommand::from_image_config(
            "img",
            config(
                CommandShape::Single("/entry".to_string()),
                CommandShape::Single("serve".to_string()),
            ),
        )
        .unwrap();
        assert_eq!(cmd.args(), ["/entry", "serve"]);
    }

    #[test]
    fn test_only_cmd() {
        let cmd =
            StartupCommand::from_image_config("img", config(CommandShape::Absent, many(&["python", "app.py"])))
                .unwrap();
        assert_eq!(cmd.args(), ["python", "app.py"]);
    }

    #[test]
    fn test_only_entrypoint() {
        let cmd = StartupCommand::from_image_config(
            "img",
            config(CommandShape::Single("/bin/server".to_string()), CommandShape::Absent),
        )
        .unwrap();
        assert_eq!(cmd.into_args(), vec!["/bin/server".to_string()]);
    }

    #[test]
    fn test_absent_absent_is_configuration_error() {
        let err = StartupCommand::from_image_config("scratch:latest", ImageConfig::default()).unwrap_err();
        assert!(matches!(err, TrimError::Configuration(_)));
        assert!(err.to_string().contains("scratch:latest"));
    }

    #[test]
    fn test_empty_shapes_count_as_absent() {
        let err = StartupCommand::from_image_config(
            "img",
            config(CommandShape::Single(String::new()), many(&[])),
        )
        .unwrap_err();
        assert!(matches!(err, TrimError::Configuration(_)));
    }

    #[test]
    fn test_deserialize_inspect_config() {
        let json = r#"{"Entrypoint": null, "Cmd": ["/bin/sh", "-c", "run"], "Env": []}"#;
        let parsed: ImageConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.entrypoint, CommandShape::Absent);
        assert_eq!(parsed.cmd, many(&["/bin/sh", "-c", "run"]));
    }

    #[test]
    fn test_deserialize_string_and_missing_fields() {
        let parsed: ImageConfig = serde_json::from_str(r#"{"Entrypoint": "/entry"}"#).unwrap();
        assert_eq!(parsed.entrypoint, CommandShape::Single("/entry".to_string()));
        assert_eq!(parsed.cmd, CommandShape::Absent);
    }
}
