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

use crate::ReplyCode;

/// SMTP message send by the server to the client as defined in RFC5321#4.2
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: ReplyCode,
    text: Vec<String>,
    folded: String,
}

impl serde::Serialize for Reply {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.folded)
    }
}

impl<'de> serde::Deserialize<'de> for Reply {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ReplyVisitor;

        impl<'de> serde::de::Visitor<'de> for ReplyVisitor {
            type Value = Reply;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a reply string or a table { code, enhanced?, text }")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                <Reply as std::str::FromStr>::from_str(v).map_err(serde::de::Error::custom)
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                #[derive(serde::Deserialize)]
                #[serde(field_identifier, rename_all = "lowercase")]
                enum Field {
                    Code,
                    Enhanced,
                    Text,
                }

                let mut text: Option<String> = None;
                let mut code = None;
                let mut enhanced = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Code => {
                            if code.is_some() {
                                return Err(serde::de::Error::duplicate_field("code"));
                            }
                            code = Some(map.next_value()?);
                        }
                        Field::Text => {
                            if text.is_some() {
                                return Err(serde::de::Error::duplicate_field("text"));
                            }
                            text = Some(map.next_value()?);
                        }
                        Field::Enhanced => {
                            if enhanced.is_some() {
                                return Err(serde::de::Error::duplicate_field("enhanced"));
                            }
                            enhanced = Some(map.next_value()?);
                        }
                    }
                }
                let code = code.ok_or_else(|| serde::de::Error::missing_field("code"))?;
                let text = text.ok_or_else(|| serde::de::Error::missing_field("text"))?;

                let code = ReplyCode::from_parts(code, enhanced).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "invalid reply code {code}, expected 200..600 and an optional `class.subject.detail`"
                    ))
                })?;

                Ok(Reply::new(code, text))
            }
        }

        deserializer.deserialize_any(ReplyVisitor)
    }
}

impl Reply {
    /// Build a reply, each `\n` in `text` starts a new line of the reply.
    pub fn new(code: ReplyCode, text: impl AsRef<str>) -> Self {
        Self::with_lines(
            code,
            text.as_ref()
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect(),
        )
    }

    /// Build a multi-line reply, an empty `lines` produce a single empty line.
    pub fn with_lines(code: ReplyCode, mut lines: Vec<String>) -> Self {
        if lines.is_empty() {
            lines.push(String::new());
        }
        let reply = Self {
            code,
            text: lines,
            folded: String::new(),
        };
        Self {
            folded: reply.fold(),
            ..reply
        }
    }

    ///
    pub const fn code(&self) -> &ReplyCode {
        &self.code
    }

    /// Text of the reply, one item per line, without the code.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.text
    }

    /// Apply `f` on each line of text, and fold the reply again.
    pub fn map_text(self, f: impl Fn(&str) -> String) -> Self {
        let lines = self.text.iter().map(|i| f(i)).collect();
        Self::with_lines(self.code, lines)
    }

    fn fold(&self) -> String {
        let prefix = self.code.to_string();
        let last = self.text.len().saturating_sub(1);

        self.text
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                // the enhanced code is separated by a space, only the base code carries the mark
                let (base, enhanced) = prefix.split_at(3);
                let mark = if idx == last { ' ' } else { '-' };
                if enhanced.is_empty() {
                    format!("{base}{mark}{line}\r\n")
                } else {
                    format!("{base}{mark}{} {line}\r\n", &enhanced[1..])
                }
            })
            .collect()
    }

    /// Create a new reply with:
    /// * `text` = `self.text` + `other.text`
    /// * `code` = `other.code`
    /// ```
    /// # use vcatch_common::Reply;
    /// let first = "454 TLS not available due to temporary reason".parse::<Reply>().unwrap();
    /// let second = "451 Too many errors from the client".parse::<Reply>().unwrap();
    ///
    /// assert_eq!(
    ///   first.extended(&second).to_string(),
    ///   [
    ///     "451-TLS not available due to temporary reason\r\n",
    ///     "451 Too many errors from the client\r\n"
    ///   ].concat()
    /// );
    /// ```
    pub fn extended(mut self, other: &Self) -> Self {
        self.text.extend(other.text.iter().cloned());
        Self::with_lines(other.code.clone(), self.text)
    }
}

impl std::str::FromStr for Reply {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut first_code = None;
        let mut text = vec![];

        for line in s.split("\r\n").filter(|s| !s.is_empty()) {
            let (new_code, mut line) = ReplyCode::parse_line(line)?;

            match &first_code {
                Some(first) if *first != new_code => {
                    anyhow::bail!("Reply codes are not consistent")
                }
                Some(_) => {}
                None => first_code = Some(new_code),
            }

            if line.starts_with([' ', '-']) {
                line.remove(0);
            }
            text.push(line);
        }

        let code = first_code.ok_or_else(|| anyhow::anyhow!("empty reply"))?;
        Ok(Self::with_lines(code, text))
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.folded)
    }
}

impl AsRef<str> for Reply {
    fn as_ref(&self) -> &str {
        &self.folded
    }
}
