//! Classifier backed by an external command-line program
//!
//! The capsule is embedded in a prompt written to the program's stdin. The
//! answer is the outermost `{...}` span of its stdout.

use crate::capsule::Capsule;
use crate::classify::{Classification, ClassifierError, Classifier, ClassifyMode};
use crate::config::ClassifierConfig;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Builds the classification prompt for a capsule
pub fn build_prompt(capsule: &Capsule) -> Result<String, ClassifierError> {
    let capsule_json = serde_json::to_string(capsule)
        .map_err(|e| ClassifierError::Malformed(format!("capsule encoding: {}", e)))?;

    Ok(format!(
        "Classify this web page for a job search index. \
         Reply with a single JSON object with keys type, confidence, fields.\n\
         type is one of: job_posting, listing, careers_hub, application_form, article, irrelevant, blocked.\n\
         confidence is a number from 0 to 1.\n\
         fields is an object. For job_posting include title, organization, location, deadline, \
         apply_method, required_documents, contact_details, language_requirements; \
         otherwise leave it empty.\n\
         Output JSON only.\n\
         CAPSULE={}",
        capsule_json
    ))
}

/// Extracts and validates a classification from program output
///
/// Text around the outermost braces is ignored.
pub fn parse_classification(output: &str) -> Result<Classification, ClassifierError> {
    let output = output.trim();
    let (Some(start), Some(end)) = (output.find('{'), output.rfind('}')) else {
        return Err(ClassifierError::Malformed("no JSON object in output".to_string()));
    };
    if end <= start {
        return Err(ClassifierError::Malformed("no JSON object in output".to_string()));
    }

    let classification: Classification = serde_json::from_str(&output[start..=end])
        .map_err(|e| ClassifierError::Malformed(e.to_string()))?;
    classification.validate()
}

/// Runs `<program> <args..> --model <model> [--search]` per capsule
#[derive(Debug, Clone)]
pub struct CommandClassifier {
    program: String,
    args: Vec<String>,
    model: String,
    timeout: Duration,
}

impl CommandClassifier {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            model: model.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.program.clone(),
            config.args.clone(),
            config.model.clone(),
            config.timeout(),
        )
    }

    fn command(&self, mode: ClassifyMode) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if mode == ClassifyMode::SearchAugmented {
            command.arg("--search");
        }
        command
    }

    async fn run(&self, prompt: String, mode: ClassifyMode) -> Result<String, ClassifierError> {
        let mut child = self.command(mode).spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => {
                ClassifierError::Unavailable(format!("{} not found", self.program))
            }
            _ => ClassifierError::Unavailable(format!("failed to start {}: {}", self.program, e)),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                tracing::debug!("{} did not take the full prompt: {}", self.program, e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifierError::Unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(stdout)
    }
}

#[async_trait]
impl Classifier for CommandClassifier {
    async fn classify(
        &self,
        capsule: &Capsule,
        mode: ClassifyMode,
    ) -> Result<Classification, ClassifierError> {
        let prompt = build_prompt(capsule)?;

        let stdout = tokio::time::timeout(self.timeout, self.run(prompt, mode))
            .await
            .map_err(|_| ClassifierError::Timeout(self.timeout))??;

        parse_classification(&stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::PageType;

    #[test]
    fn test_parse_plain_json() {
        let parsed =
            parse_classification(r#"{"type": "listing", "confidence": 0.8, "fields": {}}"#)
                .unwrap();
        assert_eq!(parsed.page_type, PageType::Listing);
        assert_eq!(parsed.confidence, 0.8);
    }

    #[test]
    fn test_parse_with_surrounding_text() {
        let output = "Sure! Here it is:\n```json\n{\"type\": \"job_posting\", \"confidence\": 0.93, \
                      \"fields\": {\"title\": \"Nurse\", \"meta\": {\"x\": 1}}}\n```\n";
        let parsed = parse_classification(output).unwrap();
        assert_eq!(parsed.page_type, PageType::JobPosting);
        assert_eq!(parsed.fields["title"], "Nurse");
    }

    #[test]
    fn test_parse_missing_fields_defaults() {
        let parsed = parse_classification(r#"{"type": "article", "confidence": 0.3}"#).unwrap();
        assert!(parsed.fields.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_classification(""),
            Err(ClassifierError::Malformed(_))
        ));
        assert!(matches!(
            parse_classification("} nope {"),
            Err(ClassifierError::Malformed(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"type": "recipe", "confidence": 0.5}"#),
            Err(ClassifierError::Malformed(_))
        ));
        assert!(matches!(
            parse_classification(r#"{"type": "listing", "confidence": 7}"#),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn test_prompt_embeds_capsule() {
        let capsule = Capsule {
            title: Some("Kesätyö".to_string()),
            ..Capsule::default()
        };
        let prompt = build_prompt(&capsule).unwrap();
        assert!(prompt.contains("CAPSULE={"));
        assert!(prompt.contains("\"title\":\"Kesätyö\""));
        assert!(prompt.contains("careers_hub"));
    }

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let classifier = CommandClassifier::new(
            "job-sieve-no-such-classifier",
            vec![],
            "any",
            Duration::from_secs(5),
        );
        let result = classifier
            .classify(&Capsule::default(), ClassifyMode::Plain)
            .await;
        assert!(matches!(result, Err(ClassifierError::Unavailable(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_output_parsed() {
        let script = r#"cat > /dev/null; echo 'ok {"type": "careers_hub", "confidence": 0.6, "fields": {}}'"#;
        let classifier = CommandClassifier::new(
            "sh",
            vec!["-c".to_string(), script.to_string()],
            "test-model",
            Duration::from_secs(5),
        );
        let answer = classifier
            .classify(&Capsule::default(), ClassifyMode::SearchAugmented)
            .await
            .unwrap();
        assert_eq!(answer.page_type, PageType::CareersHub);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_program_times_out() {
        let classifier = CommandClassifier::new(
            "sh",
            vec!["-c".to_string(), "sleep 5".to_string()],
            "test-model",
            Duration::from_millis(100),
        );
        let result = classifier
            .classify(&Capsule::default(), ClassifyMode::Plain)
            .await;
        assert!(matches!(result, Err(ClassifierError::Timeout(_))));
    }
}
