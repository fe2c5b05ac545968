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

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio_rustls::rustls;
use vcatch_config::Config;
use vcatch_protocol::{AsyncIo, ConnectionKind, Error};
use vcatch_relay::RelayEngine;
use vcatch_server::{store::InMemoryStore, Connection, ServerContext};
extern crate alloc;

const DUPLEX_CAPACITY: usize = 1024 * 1024;
const TLS_GO_AHEAD: &str = "220 TLS go ahead\r\n";

/// Accept any certificate presented by the server under test.
struct NoVerifier;

impl rustls::client::ServerCertVerifier for NoVerifier {
    fn verify_server_cert(
        &self,
        _: &rustls::Certificate,
        _: &[rustls::Certificate],
        _: &rustls::ServerName,
        _: &mut dyn Iterator<Item = &[u8]>,
        _: &[u8],
        _: std::time::SystemTime,
    ) -> Result<rustls::client::ServerCertVerified, rustls::Error> {
        Ok(rustls::client::ServerCertVerified::assertion())
    }
}

/// Complete a TLS handshake as a client of `server_name`.
///
/// # Panics
///
/// * the handshake failed
pub async fn connect_tls<IO: AsyncIo + 'static>(
    io: IO,
    server_name: &str,
) -> tokio_rustls::client::TlsStream<IO> {
    let config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(alloc::sync::Arc::new(NoVerifier))
        .with_no_client_auth();

    tokio_rustls::TlsConnector::from(alloc::sync::Arc::new(config))
        .connect(rustls::ServerName::try_from(server_name).unwrap(), io)
        .await
        .unwrap()
}

/// Write `input` at once, then read the replies until `until` or the end of the stream.
///
/// Without `until` the write side is shut down, the server reads the end of the stream.
async fn exchange<IO: AsyncIo>(io: &mut IO, input: &[String], until: Option<&str>) -> String {
    io.write_all(input.concat().as_bytes()).await.unwrap();
    io.flush().await.unwrap();

    let mut output = String::new();
    if let Some(until) = until {
        let mut reader = tokio::io::BufReader::new(&mut *io);
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                break;
            }
            output.push_str(&line);
            if line == until {
                break;
            }
        }
        return output;
    }

    if let Err(error) = io.shutdown().await {
        tracing::debug!(%error, "Client shutdown failure.");
    }
    let mut buffer = vec![];
    // the peer may close without `close_notify`
    if let Err(error) = io.read_to_end(&mut buffer).await {
        tracing::debug!(%error, "Client read failure.");
    }
    output.push_str(&String::from_utf8_lossy(&buffer));
    output
}

/// What remains once the scripted client is done.
pub struct TestOutcome {
    /// Value returned by [`Connection::run`].
    pub result: Result<(), Error>,
    /// Every reply received, clear-text then encrypted.
    pub output: String,
    /// Messages captured during the connection.
    pub store: alloc::sync::Arc<InMemoryStore>,
    /// Context of the connection, with the relay if `[relay]` is set.
    pub context: alloc::sync::Arc<ServerContext>,
}

impl std::fmt::Debug for TestOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestOutcome")
            .field("result", &self.result)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Run a connection with `config`, and assert the replies of the server are `expected`.
///
/// * `input` is sent at once, in clear-text unless `tunnel` is set.
/// * if `secured_input` is set, the client waits for the reply to STARTTLS, completes the
///   handshake and sends `secured_input`.
///
/// # Panics
///
/// * the server cannot be built from `config`
/// * the replies are not `expected`
pub async fn test_receiver_inner(
    config: Config,
    input: Vec<String>,
    expected: Vec<String>,
    secured_input: Option<Vec<String>>,
    tunnel: bool,
) -> TestOutcome {
    let domain = config.server.domain.clone();
    let store = alloc::sync::Arc::new(InMemoryStore::new(
        config.server.store.message_count_max,
    ));
    let relay = RelayEngine::new(&config).unwrap();
    let context = alloc::sync::Arc::new(
        ServerContext::new(config, alloc::sync::Arc::clone(&store) as _, relay).unwrap(),
    );

    let (client, server) = tokio::io::duplex(DUPLEX_CAPACITY);
    let connection = Connection::new(
        alloc::sync::Arc::clone(&context),
        server,
        "127.0.0.1:53844".parse().unwrap(),
        "127.0.0.1:25".parse().unwrap(),
        if tunnel {
            ConnectionKind::Tunneled
        } else {
            ConnectionKind::Opportunistic
        },
    );
    let handle = tokio::spawn(connection.run());

    let output = match (tunnel, secured_input) {
        (true, _) => {
            let mut client = connect_tls(client, &domain).await;
            exchange(&mut client, &input, None).await
        }
        (false, None) => {
            let mut client = client;
            exchange(&mut client, &input, None).await
        }
        (false, Some(secured_input)) => {
            let mut client = client;
            let mut output = exchange(&mut client, &input, Some(TLS_GO_AHEAD)).await;
            let mut client = connect_tls(client, &domain).await;
            output.push_str(&exchange(&mut client, &secured_input, None).await);
            output
        }
    };

    let result = handle.await.unwrap();
    pretty_assertions::assert_eq!(expected.concat(), output);

    TestOutcome {
        result,
        output,
        store,
        context,
    }
}

/// Run a connection, see [`test_receiver_inner`].
///
/// With a leading `fn name,` a test is generated, otherwise the expression evaluates to
/// the [`TestOutcome`].
#[allow(clippy::module_name_repetitions)]
#[macro_export]
macro_rules! run_test {
    (@config) => { $crate::config::local_test() };
    (@config $config:expr) => { $config };
    (@secured) => { None };
    (@secured [ $( $secured:expr ),* ]) => { Some(vec![ $( ($secured).to_string() ),* ]) };
    (@tunnel) => { false };
    (@tunnel $tunnel:expr) => { $tunnel };
    (
        fn $name:ident,
        $( $rest:tt )*
    ) => {
        #[test_log::test(tokio::test(flavor = "multi_thread", worker_threads = 2))]
        async fn $name() {
            $crate::run_test! { $( $rest )* };
        }
    };
    (
        input = [ $( $input:expr ),* $(,)? ],
        expected = [ $( $expected:expr ),* $(,)? ]
        $(, starttls = [ $( $secured:expr ),* $(,)? ] )?
        $(, tunnel = $tunnel:expr )?
        $(, config = $config:expr )?
        $(,)?
    ) => {
        $crate::receiver::test_receiver_inner(
            $crate::run_test!(@config $( $config )?),
            vec![ $( ($input).to_string() ),* ],
            vec![ $( ($expected).to_string() ),* ],
            $crate::run_test!(@secured $( [ $( $secured ),* ] )?),
            $crate::run_test!(@tunnel $( $tunnel )?),
        )
        .await
    };
}
