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

///
#[must_use]
pub const fn get_certificate() -> &'static str {
    include_str!("template/certs/certificate.crt")
}

///
#[must_use]
pub const fn get_rsa_key() -> &'static str {
    include_str!("template/certs/private_key.rsa.pem")
}

///
#[must_use]
pub const fn get_pkcs8_key() -> &'static str {
    include_str!("template/certs/private_key.pkcs8.pem")
}

///
#[must_use]
pub const fn get_ec256_key() -> &'static str {
    include_str!("template/certs/private_key.ec.pem")
}

fn certs_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("src/template/certs")
}

/// Path of the certificate, for the configurations read from a file.
#[must_use]
pub fn certificate_path() -> std::path::PathBuf {
    certs_dir().join("certificate.crt")
}

/// Path of the private key matching [`certificate_path`].
#[must_use]
pub fn private_key_path() -> std::path::PathBuf {
    certs_dir().join("private_key.pkcs8.pem")
}
