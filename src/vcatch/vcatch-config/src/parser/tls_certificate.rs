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

use crate::field::SecretFile;

pub fn from_path(path: &str) -> anyhow::Result<Vec<rustls::Certificate>> {
    let path = std::path::Path::new(&path);
    anyhow::ensure!(
        path.exists(),
        format!("certificate path does not exists: '{}'", path.display())
    );
    from_string(&std::fs::read_to_string(path)?)
}

pub fn from_string(input: &str) -> anyhow::Result<Vec<rustls::Certificate>> {
    let mut reader = std::io::BufReader::new(input.as_bytes());

    let chain = rustls_pemfile::certs(&mut reader)?
        .into_iter()
        .map(rustls::Certificate)
        .collect::<Vec<_>>();

    anyhow::ensure!(!chain.is_empty(), "certificate path is valid but empty");
    Ok(chain)
}

impl<'de> serde::Deserialize<'de> for SecretFile<Vec<rustls::Certificate>> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(Self {
            inner: from_path(&s).map_err(serde::de::Error::custom)?,
            path: s.into(),
        })
    }
}
