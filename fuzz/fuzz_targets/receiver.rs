#![no_main]
use libfuzzer_sys::fuzz_target;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use vcatch_config::Config;
use vcatch_protocol::ConnectionKind;
use vcatch_server::{store::InMemoryStore, Connection, ServerContext};

fuzz_target!(|data: &[u8]| {
    let mut config = Config::ensure(Config::default()).unwrap();
    config.server.smtp.error.soft_count = -1;
    config.server.smtp.error.hard_count = -1;
    config.server.smtp.timeout_client.idle = std::time::Duration::from_millis(100);

    let store = std::sync::Arc::new(InMemoryStore::new(10));
    let context = std::sync::Arc::new(ServerContext::new(config, store, None).unwrap());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let (mut client, server) = tokio::io::duplex(data.len() + 1024);
        let conn = Connection::new(
            context,
            server,
            "0.0.0.0:0".parse().unwrap(),
            "0.0.0.0:0".parse().unwrap(),
            ConnectionKind::Opportunistic,
        );

        let client = async move {
            let _ = client.write_all(data).await;
            let _ = client.shutdown().await;
            let mut output = vec![];
            let _ = client.read_to_end(&mut output).await;
        };

        let _ = tokio::join!(conn.run(), client);
    });
});
