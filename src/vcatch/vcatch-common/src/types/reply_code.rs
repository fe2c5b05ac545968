/*
 * vSMTP mail transfer agent
 * Copyright (C) 2022 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/

/// Code at the start of each line of a reply
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum ReplyCode {
    /// simple reply code as defined in RFC5321
    Code {
        // https://datatracker.ietf.org/doc/html/rfc5321#section-4.2
        /// code base
        code: u16,
    },
    /// enhanced status code as defined in RFC3463
    Enhanced {
        /// code base
        code: u16,
        /// `class.subject.detail`
        enhanced: String,
    },
}

impl ReplyCode {
    /// 4xx and 5xx are errors
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.value() / 100 >= 4
    }

    /// 4xx codes, the client may try again
    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.value() / 100 == 4
    }

    /// Return the underlying value of the reply code
    #[must_use]
    pub fn value(&self) -> u16 {
        match self {
            Self::Code { code, .. } | Self::Enhanced { code, .. } => *code,
        }
    }

    /// Return the enhanced value of the reply code
    #[must_use]
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Enhanced { enhanced, .. } => Some(enhanced),
            Self::Code { .. } => None,
        }
    }

    /// Build a reply code from its parts, `None` if `code` is not in `200..600` or
    /// `enhanced` is not `class.subject.detail`.
    #[must_use]
    pub fn from_parts(code: u16, enhanced: Option<String>) -> Option<Self> {
        Self::parse_code(&code.to_string())?;
        match enhanced {
            None => Some(Self::Code { code }),
            Some(enhanced) => {
                Self::parse_enhanced(&enhanced).map(|enhanced| Self::Enhanced { code, enhanced })
            }
        }
    }

    fn parse_code(word: &str) -> Option<u16> {
        if word.len() != 3 || !word.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        word.parse::<u16>().ok().filter(|code| (200..600).contains(code))
    }

    fn parse_enhanced(word: &str) -> Option<String> {
        let is_number =
            |i: &str| !i.is_empty() && i.len() <= 3 && i.bytes().all(|b| b.is_ascii_digit());

        match word.split('.').collect::<Vec<_>>().as_slice() {
            [class, subject, detail]
                if ["2", "4", "5"].contains(class) && is_number(subject) && is_number(detail) =>
            {
                Some(word.to_string())
            }
            _ => None,
        }
    }

    /// Split a reply line in its code and the remaining text.
    ///
    /// The separator (`' '` or `'-'`) following the code is kept at the start of the text.
    pub(super) fn parse_line(line: &str) -> anyhow::Result<(Self, String)> {
        let code = line
            .get(..3)
            .and_then(Self::parse_code)
            .ok_or_else(|| anyhow::anyhow!("cannot parse reply code in {line:?}"))?;

        let rest = &line[3..];
        let enhanced = rest
            .strip_prefix([' ', '-'])
            .and_then(|after| after.split(' ').next())
            .filter(|word| !word.is_empty())
            .and_then(Self::parse_enhanced);

        Ok(match enhanced {
            Some(enhanced) => {
                let text = &rest[1 + enhanced.len()..];
                let text = text.strip_prefix(' ').unwrap_or(text);
                (
                    Self::Enhanced { code, enhanced },
                    format!("{}{text}", &rest[..1]),
                )
            }
            None => (Self::Code { code }, rest.to_string()),
        })
    }
}

impl std::fmt::Display for ReplyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code { code } => f.write_fmt(format_args!("{code}")),
            Self::Enhanced { code, enhanced } => f.write_fmt(format_args!("{code} {enhanced}")),
        }
    }
}
