use crate::foundation::error::{ScrubError, ScrubResult};

/// Which locator of a frame a load attempt targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Attempt {
    /// The pattern's own extension.
    Primary,
    /// The alternate encoding, tried once after a primary failure.
    Fallback,
}

/// Maps zero-based frame indices to zero-padded numbered asset locators.
///
/// A pattern such as `"frames/hero_####.webp"` holds exactly one run of `#`; the run length is the
/// padding width. `start_number` is added to the index before formatting, so a sequence stored as
/// `0001..0250` uses `start_number = 1`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramePathTemplate {
    prefix: String,
    padding: usize,
    suffix: String,
    start_number: u32,
    fallback_suffix: Option<String>,
}

impl FramePathTemplate {
    /// Parse a pattern and optional fallback extension (with or without the leading dot).
    pub fn parse(
        pattern: &str,
        start_number: u32,
        fallback_extension: Option<&str>,
    ) -> ScrubResult<Self> {
        let Some(first) = pattern.find('#') else {
            return Err(ScrubError::validation(format!(
                "frame pattern '{pattern}' must contain a run of '#' for the frame number"
            )));
        };
        let padding = pattern[first..].chars().take_while(|&c| c == '#').count();
        let prefix = &pattern[..first];
        let suffix = &pattern[first + padding..];
        if suffix.contains('#') {
            return Err(ScrubError::validation(format!(
                "frame pattern '{pattern}' must contain exactly one run of '#'"
            )));
        }

        let fallback_suffix = match fallback_extension {
            None => None,
            Some(ext) => {
                let ext = ext.trim_start_matches('.');
                if ext.is_empty() {
                    return Err(ScrubError::validation(
                        "fallback extension must be non-empty",
                    ));
                }
                let Some(dot) = suffix.rfind('.') else {
                    return Err(ScrubError::validation(format!(
                        "frame pattern '{pattern}' has no extension to swap for the fallback"
                    )));
                };
                Some(format!("{}.{ext}", &suffix[..dot]))
            }
        };

        Ok(Self {
            prefix: prefix.to_string(),
            padding,
            suffix: suffix.to_string(),
            start_number,
            fallback_suffix,
        })
    }

    /// Whether a fallback locator exists.
    pub fn has_fallback(&self) -> bool {
        self.fallback_suffix.is_some()
    }

    /// Format the locator for `index`; `None` when asking for a fallback that is not configured.
    pub fn format(&self, index: u32, attempt: Attempt) -> Option<String> {
        let suffix = match attempt {
            Attempt::Primary => &self.suffix,
            Attempt::Fallback => self.fallback_suffix.as_ref()?,
        };
        let number = u64::from(index) + u64::from(self.start_number);
        Some(format!(
            "{}{:0width$}{}",
            self.prefix,
            number,
            suffix,
            width = self.padding
        ))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/sequence/template.rs"]
mod tests;
