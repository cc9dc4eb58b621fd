use std::fmt;
use std::str::FromStr;

use url::form_urlencoded;

use crate::DeeplError;

macro_rules! option_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $option:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Value as sent on the wire.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DeeplError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DeeplError::InvalidOption {
                        name: $option,
                        value: other.to_owned(),
                    }),
                }
            }
        }
    };
}

option_enum! {
    /// Sentence splitting mode of the translate endpoint.
    SplitSentences, "split_sentences" {
        Off => "0",
        On => "1",
        NoNewlines => "nonewlines",
    }
}

option_enum! {
    Formality, "formality" {
        Default => "default",
        More => "more",
        Less => "less",
        PreferMore => "prefer_more",
        PreferLess => "prefer_less",
    }
}

option_enum! {
    TagHandling, "tag_handling" {
        Xml => "xml",
        Html => "html",
    }
}

option_enum! {
    /// Which side of a translation a language listing describes.
    LanguageType, "type" {
        Source => "source",
        Target => "target",
    }
}

/// Optional parameters of [`Translator::translate_text`](crate::Translator::translate_text).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TranslateOptions {
    pub source_lang: Option<String>,
    pub split_sentences: Option<SplitSentences>,
    pub preserve_formatting: Option<bool>,
    pub formality: Option<Formality>,
    pub glossary_id: Option<String>,
    pub tag_handling: Option<TagHandling>,
    pub outline_detection: Option<bool>,
    pub non_splitting_tags: Vec<String>,
    pub splitting_tags: Vec<String>,
    pub ignore_tags: Vec<String>,
}

impl TranslateOptions {
    /// Encodes the form body of a translate request.
    ///
    /// Every text becomes its own `text` field, in order.
    pub(crate) fn encode_form<S: AsRef<str>>(&self, texts: &[S], target_lang: &str) -> String {
        let mut form = form_urlencoded::Serializer::new(String::new());
        for text in texts {
            form.append_pair("text", text.as_ref());
        }
        form.append_pair("target_lang", target_lang);
        if let Some(source_lang) = &self.source_lang {
            form.append_pair("source_lang", source_lang);
        }
        if let Some(split) = self.split_sentences {
            form.append_pair("split_sentences", split.as_str());
        }
        if let Some(preserve) = self.preserve_formatting {
            form.append_pair("preserve_formatting", flag(preserve));
        }
        if let Some(formality) = self.formality {
            form.append_pair("formality", formality.as_str());
        }
        if let Some(glossary_id) = &self.glossary_id {
            form.append_pair("glossary_id", glossary_id);
        }
        if let Some(tag_handling) = self.tag_handling {
            form.append_pair("tag_handling", tag_handling.as_str());
        }
        if let Some(outline) = self.outline_detection {
            form.append_pair("outline_detection", flag(outline));
        }
        for (name, tags) in [
            ("non_splitting_tags", &self.non_splitting_tags),
            ("splitting_tags", &self.splitting_tags),
            ("ignore_tags", &self.ignore_tags),
        ] {
            if !tags.is_empty() {
                form.append_pair(name, &tags.join(","));
            }
        }
        form.finish()
    }
}

/// Optional parameters of [`Translator::upload_document`](crate::Translator::upload_document).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentOptions {
    pub source_lang: Option<String>,
    pub formality: Option<Formality>,
    pub glossary_id: Option<String>,
    /// Overrides the file name reported to the server.
    pub filename: Option<String>,
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}
