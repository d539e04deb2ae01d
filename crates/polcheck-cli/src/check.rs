//! # Check Subcommand
//!
//! Checks one document against policy files read from disk. Policies are
//! keyed by file name, exactly as the service keys uploads, so a check here
//! sees the same policy set the service would after uploading those files.
//!
//! Substring mode runs offline. Prompt mode reads `GOOGLE_API_KEY` (and the
//! optional `LLM_*` overrides) from the environment and makes one request.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use polcheck_core::prompt::{build_prompt, parse_completion};
use polcheck_core::{evaluate, ComplianceReport, Policy};
use polcheck_llm::{LlmClient, LlmConfig};

use crate::{read_text, EXIT_NON_COMPLIANT, EXIT_OK};

/// How the document is evaluated.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CheckMode {
    /// Literal, case-insensitive phrase matching.
    #[default]
    Substring,
    /// Ask the hosted model for a report.
    Prompt,
}

/// Arguments for `polcheck check`.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Policy file. Repeat for several policies.
    #[arg(long = "policy", value_name = "FILE", required = true)]
    pub policies: Vec<PathBuf>,

    /// Document to check.
    #[arg(long, value_name = "FILE", conflicts_with = "text", required_unless_present = "text")]
    pub document: Option<PathBuf>,

    /// Document text given inline.
    #[arg(long)]
    pub text: Option<String>,

    /// Evaluation mode.
    #[arg(long, value_enum, default_value_t = CheckMode::Substring)]
    pub mode: CheckMode,

    /// Print the `{"compliance_report": ...}` JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// Execute the check subcommand. Returns [`EXIT_OK`] for a compliant
/// document and [`EXIT_NON_COMPLIANT`] otherwise.
pub fn run_check(args: &CheckArgs) -> anyhow::Result<u8> {
    let policies = load_policies(&args.policies)?;
    let document_text = match (&args.text, &args.document) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => read_text(path)?,
        (None, None) => bail!("either --document or --text is required"),
    };

    tracing::info!(
        mode = ?args.mode,
        policies = policies.len(),
        "checking document"
    );

    let report = match args.mode {
        CheckMode::Substring => evaluate(&policies, &document_text)?,
        CheckMode::Prompt => {
            let config = LlmConfig::from_env().context("prompt mode needs a model client")?;
            let client = LlmClient::new(config)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(check_with_model(&client, &policies, &document_text))?
        }
    };

    if args.json {
        let envelope = report.clone().into_envelope();
        println!("{}", serde_json::to_string_pretty(&envelope)?);
    } else {
        print!("{}", render_summary(&report));
    }

    Ok(if report.is_compliant() {
        EXIT_OK
    } else {
        EXIT_NON_COMPLIANT
    })
}

/// Read every policy file, keyed and ordered by file name. A later file
/// with the same name replaces an earlier one.
pub fn load_policies(paths: &[PathBuf]) -> anyhow::Result<Vec<Policy>> {
    let mut by_name = BTreeMap::new();
    for path in paths {
        let name = file_name(path)?;
        let text = read_text(path)?;
        if by_name.insert(name.clone(), text).is_some() {
            tracing::warn!(%name, "duplicate policy file name; keeping the last one");
        }
    }
    Ok(by_name
        .into_iter()
        .map(|(name, text)| Policy::new(name, text))
        .collect())
}

/// Build the prompt, send it, and parse the completion strictly.
pub async fn check_with_model(
    client: &LlmClient,
    policies: &[Policy],
    document_text: &str,
) -> anyhow::Result<ComplianceReport> {
    let prompt = build_prompt(policies, document_text)?;
    let completion = client.generate_json(&prompt).await?;
    parse_completion(&completion).context("model returned an unusable report")
}

/// Human-readable rendering of a report.
pub fn render_summary(report: &ComplianceReport) -> String {
    if report.is_compliant() {
        return "COMPLIANT: no violations found\n".to_string();
    }

    let violations = report.violations();
    let mut out = format!("NON-COMPLIANT: {} violation(s)\n", violations.len());
    for (i, v) in violations.iter().enumerate() {
        let _ = writeln!(out, "\n{}. {}", i + 1, v.rule_violated);
        let _ = writeln!(out, "   text:       {}", v.violating_text);
        let _ = writeln!(out, "   suggestion: {}", v.suggestion);
    }
    out
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("policy path has no usable file name: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use polcheck_core::Violation;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn args(policies: Vec<PathBuf>, text: &str) -> CheckArgs {
        CheckArgs {
            policies,
            document: None,
            text: Some(text.to_string()),
            mode: CheckMode::Substring,
            json: false,
        }
    }

    #[test]
    fn document_containing_every_policy_exits_zero() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write(dir.path(), "refunds.txt", "No refunds after 30 days");
        let code = run_check(&args(
            vec![policy],
            "Our policy: NO REFUNDS AFTER 30 DAYS. Thanks for writing in.",
        ))
        .unwrap();
        assert_eq!(code, EXIT_OK);
    }

    #[test]
    fn document_missing_a_policy_exits_two() {
        let dir = tempfile::tempdir().unwrap();
        let kept = write(dir.path(), "greeting.txt", "thanks for writing");
        let missing = write(dir.path(), "refunds.txt", "No refunds after 30 days");
        let mut a = args(vec![kept, missing], "Thanks for writing. We offer refunds anytime.");
        a.json = true;
        assert_eq!(run_check(&a).unwrap(), EXIT_NON_COMPLIANT);
    }

    #[test]
    fn document_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write(dir.path(), "p.txt", "all sales are final");
        let compliant = write(dir.path(), "reply.txt", "Please note: All sales are final.");
        let non_compliant = write(dir.path(), "other.txt", "We take returns.");

        let mut a = CheckArgs {
            policies: vec![policy],
            document: Some(compliant),
            text: None,
            mode: CheckMode::Substring,
            json: false,
        };
        assert_eq!(run_check(&a).unwrap(), EXIT_OK);

        a.document = Some(non_compliant);
        assert_eq!(run_check(&a).unwrap(), EXIT_NON_COMPLIANT);
    }

    #[test]
    fn empty_inline_text_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let policy = write(dir.path(), "p.txt", "anything");
        assert!(run_check(&args(vec![policy], "")).is_err());
    }

    #[test]
    fn missing_policy_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_check(&args(vec![dir.path().join("absent.pdf")], "text")).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }

    #[test]
    fn policies_are_keyed_and_ordered_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("newer");
        std::fs::create_dir(&sub).unwrap();
        let b = write(dir.path(), "b.txt", "second");
        let a_old = write(dir.path(), "a.txt", "old");
        let a_new = write(&sub, "a.txt", "new");

        let policies = load_policies(&[b, a_old, a_new]).unwrap();
        assert_eq!(
            policies,
            vec![Policy::new("a.txt", "new"), Policy::new("b.txt", "second")]
        );
    }

    #[test]
    fn summary_lists_violations_in_order() {
        let report = ComplianceReport::from_violations(vec![
            Violation {
                rule_violated: "first rule".into(),
                violating_text: "x".into(),
                suggestion: "fix x".into(),
            },
            Violation {
                rule_violated: "second rule".into(),
                violating_text: "y".into(),
                suggestion: "fix y".into(),
            },
        ]);
        let text = render_summary(&report);
        assert!(text.starts_with("NON-COMPLIANT: 2 violation(s)"));
        let first = text.find("1. first rule").unwrap();
        let second = text.find("2. second rule").unwrap();
        assert!(first < second);
        assert_eq!(
            render_summary(&ComplianceReport::compliant()),
            "COMPLIANT: no violations found\n"
        );
    }
}
