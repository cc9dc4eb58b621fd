use std::path::PathBuf;

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand, ValueEnum};

use crate::{Formality, GlossaryEntry, LanguageType, SplitSentences, TagHandling};

#[derive(Parser, Debug)]
#[command(name = "deepl")]
#[command(about = "Command-line client for the DeepL translation API")]
#[command(version)]
pub struct Args {
    /// Authentication key as given in your DeepL account
    #[arg(long, env = "DEEPL_AUTH_KEY", hide_env_values = true, global = true)]
    pub auth_key: Option<String>,

    /// Alternative server URL
    #[arg(long, env = "DEEPL_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Per-attempt request timeout in milliseconds
    #[arg(long, default_value_t = 10_000, global = true)]
    pub timeout_ms: u64,

    /// Increase output verbosity (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate texts
    Translate(TranslateArgs),
    /// Translate documents
    Document {
        #[command(subcommand)]
        command: DocumentCommand,
    },
    /// Manage glossaries
    Glossaries {
        #[command(subcommand)]
        command: GlossariesCommand,
    },
    /// List supported languages
    Languages(LanguagesArgs),
    /// Show account usage
    Usage,
}

#[derive(ClapArgs, Debug)]
pub struct TranslateArgs {
    /// Texts to translate
    #[arg(required = true)]
    pub texts: Vec<String>,

    /// Language into which the text should be translated
    #[arg(short = 't', long, visible_alias = "to")]
    pub target_lang: String,

    /// Language of the text to be translated
    #[arg(short = 's', long, visible_alias = "from")]
    pub source_lang: Option<String>,

    /// Whether to split input into sentences (0, 1, nonewlines)
    #[arg(long)]
    pub split_sentences: Option<SplitSentences>,

    /// Respect the original formatting
    #[arg(long)]
    pub preserve_formatting: bool,

    /// Formality: default, more, less, prefer_more, prefer_less
    #[arg(long)]
    pub formality: Option<Formality>,

    /// Glossary to use for the translation
    #[arg(long)]
    pub glossary_id: Option<String>,

    /// Kind of tags to handle (xml, html)
    #[arg(long)]
    pub tag_handling: Option<TagHandling>,

    /// Automatic detection of XML structure
    #[arg(long)]
    pub outline_detection: Option<bool>,

    /// Comma-separated XML tags which never split sentences
    #[arg(long, value_delimiter = ',')]
    pub non_splitting_tags: Vec<String>,

    /// Comma-separated XML tags which always split sentences
    #[arg(long, value_delimiter = ',')]
    pub splitting_tags: Vec<String>,

    /// Comma-separated XML tags marking text not to be translated
    #[arg(long, value_delimiter = ',')]
    pub ignore_tags: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// Upload documents for translation
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[arg(short = 't', long, visible_alias = "to")]
        target_lang: String,

        #[arg(short = 's', long, visible_alias = "from")]
        source_lang: Option<String>,

        #[arg(long)]
        formality: Option<Formality>,

        #[arg(long)]
        glossary_id: Option<String>,
    },
    /// Check the translation status of uploaded documents
    Status {
        /// Documents as ID:KEY
        #[arg(required = true, value_parser = parse_document_ref)]
        documents: Vec<DocumentRef>,
    },
    /// Download a translated document
    Download {
        /// Document as ID:KEY
        #[arg(value_parser = parse_document_ref)]
        document: DocumentRef,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GlossariesCommand {
    /// List language pairs supported by glossaries
    LanguagePairs,
    /// Create a glossary from SOURCE=TARGET entries
    Create {
        #[arg(long)]
        name: String,

        #[arg(short = 's', long, visible_alias = "from")]
        source_lang: String,

        #[arg(short = 't', long, visible_alias = "to")]
        target_lang: String,

        #[arg(required = true, value_parser = parse_glossary_entry)]
        entries: Vec<GlossaryEntry>,
    },
    /// List all glossaries
    List,
    /// Show glossary details
    Info {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Print glossary entries
    Entries {
        id: String,

        #[arg(long, value_enum, default_value_t = EntriesFormat::Tsv)]
        format: EntriesFormat,
    },
    /// Delete glossaries
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(ClapArgs, Debug)]
pub struct LanguagesArgs {
    /// Type of languages to list (source, target)
    #[arg(long = "type", conflicts_with_all = ["source", "target"])]
    pub language_type: Option<LanguageType>,

    /// Shorthand for --type=source
    #[arg(long, conflicts_with = "target")]
    pub source: bool,

    /// Shorthand for --type=target
    #[arg(long)]
    pub target: bool,
}

impl LanguagesArgs {
    pub fn resolved_type(&self) -> LanguageType {
        if self.target {
            LanguageType::Target
        } else if self.source {
            LanguageType::Source
        } else {
            self.language_type.unwrap_or(LanguageType::Source)
        }
    }
}

/// Output format of `glossaries entries`.
///
/// CSV fields containing a comma, quote or line break are quoted, with inner
/// quotes doubled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EntriesFormat {
    Tsv,
    Csv,
}

impl EntriesFormat {
    pub fn separator(self) -> char {
        match self {
            Self::Tsv => '\t',
            Self::Csv => ',',
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub key: String,
}

fn parse_document_ref(value: &str) -> Result<DocumentRef, String> {
    match value.split_once(':') {
        Some((id, key)) if !id.is_empty() && !key.is_empty() && !key.contains(':') => {
            Ok(DocumentRef {
                id: id.to_owned(),
                key: key.to_owned(),
            })
        }
        _ => Err(format!("expected ID:KEY, got '{value}'")),
    }
}

fn parse_glossary_entry(value: &str) -> Result<GlossaryEntry, String> {
    match value.split_once('=') {
        Some((source, target)) if !source.is_empty() && !target.is_empty() && !target.contains('=') => {
            Ok(GlossaryEntry::new(source, target))
        }
        _ => Err(format!("expected SOURCE=TARGET, got '{value}'")),
    }
}
