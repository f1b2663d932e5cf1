use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::line::ShoppingListLine;

pub const DEFAULT_FILENAME: &str = "Список покупок.txt";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Separator {
    /// `Flour - 500 g.`
    #[default]
    Spaced,
    /// `Flour-500 g.`
    Compact,
}

impl Separator {
    fn as_str(self) -> &'static str {
        match self {
            Separator::Spaced => " - ",
            Separator::Compact => "-",
        }
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Separator::Spaced => write!(f, "spaced"),
            Separator::Compact => write!(f, "compact"),
        }
    }
}

impl FromStr for Separator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spaced" => Ok(Separator::Spaced),
            "compact" => Ok(Separator::Compact),
            _ => Err(format!("Unknown shopping list separator: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListExport {
    pub payload: Vec<u8>,
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFormat {
    pub filename: String,
    pub separator: Separator,
}

impl Default for ExportFormat {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            separator: Separator::default(),
        }
    }
}

impl ExportFormat {
    pub fn new(filename: impl Into<String>, separator: Separator) -> Self {
        Self {
            filename: filename.into(),
            separator,
        }
    }

    /// Renders lines in the order given. Each item ends in `.\n`; a notice
    /// is written as-is.
    pub fn render(&self, lines: &[ShoppingListLine]) -> ShoppingListExport {
        let mut payload = String::new();

        for line in lines {
            match line {
                ShoppingListLine::Item(item) => {
                    payload.push_str(&item.name);
                    payload.push_str(self.separator.as_str());
                    payload.push_str(&item.total_amount.to_string());
                    payload.push(' ');
                    payload.push_str(&item.measurement_unit);
                    payload.push_str(".\n");
                }
                ShoppingListLine::Notice { text } => payload.push_str(text),
            }
        }

        ShoppingListExport {
            payload: payload.into_bytes(),
            filename: self.filename.clone(),
        }
    }

    /// `Content-Disposition` value for the download. The quoted filename is
    /// kept verbatim and an RFC 5987 `filename*` is added for clients that
    /// need an ASCII-safe header.
    pub fn content_disposition(&self) -> String {
        let quoted = self.filename.replace('\\', "\\\\").replace('"', "\\\"");

        format!(
            "attachment; filename=\"{quoted}\"; filename*=UTF-8''{}",
            urlencoding::encode(&self.filename)
        )
    }
}
