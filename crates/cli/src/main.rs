//! CLI tool for translating PowerPoint decks.

mod orchestrator;

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use deck_core::RateLimits;
use deck_service::{chat, BackendKind, ClientConfig};
use orchestrator::{process_folder, process_presentation};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Environment variable holding the API key for either backend.
const API_KEY_VAR: &str = "GOOGLE_API_KEY";

const LANGUAGE_HELP: &str = "\
Examples of language codes:
  en     English
  es     Spanish
  fr     French
  de     German
  pt     Portuguese
  ja     Japanese
  zh-CN  Chinese (Simplified)

Full list: https://cloud.google.com/translate/docs/languages";

/// Translate the text of PowerPoint presentations, keeping their layout.
#[derive(Parser, Debug)]
#[command(name = "deck-translate")]
#[command(author, version, about, long_about = None, after_help = LANGUAGE_HELP)]
struct Args {
    /// Path to a .pptx file or a folder of them
    input_path: Option<PathBuf>,

    /// Target language (ex: 'en' for English, 'es' for Spanish)
    target_language: Option<String>,

    /// List supported languages and exit
    #[arg(short = 'l', long)]
    list_langs: bool,

    /// Translation service to use
    #[arg(short, long, value_enum, default_value_t = BackendArg::Google)]
    backend: BackendArg,

    /// Directory for translated decks
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Chat model (chat backend only)
    #[arg(long, env = "DECK_TRANSLATE_MODEL", default_value = chat::DEFAULT_MODEL)]
    model: String,

    /// Override the chat endpoint (chat backend only)
    #[arg(long, env = "DECK_TRANSLATE_ENDPOINT")]
    endpoint: Option<String>,

    /// Requests allowed per minute
    #[arg(long, default_value_t = 60)]
    max_requests: u32,

    /// Estimated tokens allowed per minute
    #[arg(long, default_value_t = 100_000)]
    max_tokens: u64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Google,
    Chat,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Google => BackendKind::Google,
            BackendArg::Chat => BackendKind::Chat,
        }
    }
}

impl Args {
    fn client_config(&self, api_key: String) -> ClientConfig {
        let mut config = ClientConfig::new(self.backend.into(), api_key);
        config.model = self.model.clone();
        config.endpoint = self.endpoint.clone();
        config.limits = RateLimits {
            max_requests: self.max_requests,
            max_tokens: self.max_tokens,
            ..RateLimits::default()
        };
        config.timeout = Duration::from_secs(self.timeout);
        config
    }
}

fn main() -> Result<ExitCode> {
    let api_key = std::env::var(API_KEY_VAR).map_err(|_| {
        anyhow!(
            "No API key found. Please set the '{}' environment variable.",
            API_KEY_VAR
        )
    })?;

    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let config = args.client_config(api_key);

    if args.list_langs {
        let languages = config
            .google_backend()?
            .supported_languages()
            .context("Failed to fetch supported languages")?;
        println!("Supported languages:");
        println!("{}", languages.join(", "));
        return Ok(ExitCode::SUCCESS);
    }

    let (Some(input_path), Some(target_language)) = (&args.input_path, &args.target_language)
    else {
        Args::command().print_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    if config.backend == BackendKind::Google && !is_supported(&config, target_language) {
        eprintln!(
            "'{}' is NOT A VALID LANGUAGE CODE. Run with --list-langs to see supported codes.",
            target_language
        );
        return Ok(ExitCode::FAILURE);
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    let mut client = config.build_client()?;
    let show_progress = !args.verbose;

    if input_path.is_dir() {
        let summary = process_folder(
            input_path,
            target_language,
            &mut client,
            &args.output_dir,
            show_progress,
        )?;

        for report in &summary.translated {
            println!("{}", report.summary());
        }
        for (path, _) in &summary.failed {
            eprintln!("Failed: {}", path.display());
        }
        println!(
            "{} translated, {} failed",
            summary.translated.len(),
            summary.failed.len()
        );

        if !summary.failed.is_empty() {
            return Ok(ExitCode::FAILURE);
        }
    } else {
        match process_presentation(
            input_path,
            target_language,
            &mut client,
            &args.output_dir,
            show_progress,
        ) {
            Ok(report) => println!("{}", report.summary()),
            Err(e) => {
                log::error!("{:#}", e);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Check a target code against Google's list. An unreachable list counts as
/// no match.
fn is_supported(config: &ClientConfig, target_language: &str) -> bool {
    let languages = match config
        .google_backend()
        .and_then(|backend| backend.supported_languages())
    {
        Ok(languages) => languages,
        Err(e) => {
            log::error!("{}", e);
            Vec::new()
        }
    };

    languages.iter().any(|code| code == target_language)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["deck-translate", "talk.pptx", "es"]).unwrap();
        assert_eq!(args.input_path, Some(PathBuf::from("talk.pptx")));
        assert_eq!(args.target_language.as_deref(), Some("es"));
        assert_eq!(args.backend, BackendArg::Google);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.list_langs);
        assert!(!args.verbose);

        let config = args.client_config("key".to_string());
        assert_eq!(config.backend, BackendKind::Google);
        assert_eq!(config.limits, RateLimits::default());
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_positionals_optional() {
        let args = Args::try_parse_from(["deck-translate"]).unwrap();
        assert!(args.input_path.is_none());
        assert!(args.target_language.is_none());

        let args = Args::try_parse_from(["deck-translate", "-l"]).unwrap();
        assert!(args.list_langs);
    }

    #[test]
    fn test_chat_options() {
        let args = Args::try_parse_from([
            "deck-translate",
            "decks/",
            "Brazilian Portuguese",
            "-b",
            "chat",
            "-o",
            "out",
            "--model",
            "gpt-4o-mini",
            "--endpoint",
            "http://localhost:8080/v1/chat/completions",
            "--max-requests",
            "10",
            "--max-tokens",
            "5000",
            "--timeout",
            "5",
            "-v",
        ])
        .unwrap();

        let config = args.client_config("key".to_string());
        assert_eq!(config.backend, BackendKind::Chat);
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://localhost:8080/v1/chat/completions")
        );
        assert_eq!(config.limits.max_requests, 10);
        assert_eq!(config.limits.max_tokens, 5000);
        assert_eq!(config.limits.window, Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(args.output_dir, PathBuf::from("out"));
        assert!(args.verbose);
    }

    #[test]
    fn test_unknown_backend_rejected() {
        assert!(Args::try_parse_from(["deck-translate", "a.pptx", "es", "-b", "deepl"]).is_err());
    }

    #[test]
    fn test_help_lists_language_codes() {
        let help = Args::command().render_help().to_string();
        assert!(help.contains("zh-CN"));
        assert!(help.contains("https://cloud.google.com/translate/docs/languages"));
    }
}
