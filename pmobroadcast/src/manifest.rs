//! HLS manifest helpers.
//!
//! The engine only understands two tags of the playlist format: `#EXTINF:`,
//! whose values add up to the playback duration of a recorded manifest, and
//! `#EXT-X-VERSION:3`, after which the synchronized manifest injects an
//! `#EXT-X-START` line pointing players at the shared broadcast position.

use crate::error::{Error, Result};

/// Segment duration tag.
pub const EXTINF_TAG: &str = "#EXTINF:";

/// Line after which the start offset is injected.
pub const VERSION_LINE: &str = "#EXT-X-VERSION:3";

/// Splits manifest text into lines, dropping line terminators.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_owned).collect()
}

/// Duration in seconds announced by a single manifest line.
///
/// Returns `None` for lines that are not `#EXTINF:` tags. Only the leading
/// number of the value is read, so attributes and the segment title that
/// follow it are ignored.
pub fn segment_duration(line: &str) -> Option<std::result::Result<f64, String>> {
    let rest = line.strip_prefix(EXTINF_TAG)?;
    let raw = rest.split(',').next().unwrap_or_default().trim();

    Some(match numeric_prefix(raw).parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value),
        _ => Err(raw.to_string()),
    })
}

/// Longest prefix of `raw` written as a decimal number (`-1`, `10.`, `.5`, `2e3`).
fn numeric_prefix(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    let digits_from = |start: usize| {
        start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    end = digits_from(end);
    if bytes.get(end) == Some(&b'.') {
        end = digits_from(end + 1);
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = digits_from(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }

    &raw[..end]
}

/// Total playback duration of a manifest, in seconds.
///
/// ```
/// use pmobroadcast::manifest::parse_duration;
///
/// let lines = ["#EXTINF:10.0,", "seg1.ts", "#EXTINF:5.5,", "seg2.ts"];
/// assert_eq!(parse_duration(lines).unwrap(), 15.5);
/// ```
pub fn parse_duration<I, S>(lines: I) -> Result<f64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut total = 0.0;
    for (index, line) in lines.into_iter().enumerate() {
        match segment_duration(line.as_ref()) {
            Some(Ok(seconds)) => total += seconds,
            Some(Err(value)) => {
                return Err(Error::InvalidSegmentDuration {
                    line: index + 1,
                    value,
                })
            }
            None => {}
        }
    }
    Ok(total)
}

/// `#EXT-X-START` line positioning players at `offset` seconds.
pub fn start_tag(offset: f64) -> String {
    format!("#EXT-X-START:TIME-OFFSET={offset},PRECISE=YES")
}

/// Rewrites a manifest so that players join the broadcast at `offset`.
///
/// Every line is copied in order and terminated by `\n`; the start tag is
/// inserted right after each `#EXT-X-VERSION:3` line.
pub fn synchronize<I, S>(lines: I, offset: f64) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut output = String::new();
    for line in lines {
        let line = line.as_ref();
        output.push_str(line);
        output.push('\n');

        if line.trim_end() == VERSION_LINE {
            output.push_str(&start_tag(offset));
            output.push('\n');
        }
    }
    output
}
