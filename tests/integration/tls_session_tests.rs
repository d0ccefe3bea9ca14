// tests/integration/tls_session_tests.rs
use std::sync::Arc;
use std::time::Duration;

use lwe_secure_link::network::transport::tcp;
use lwe_secure_link::utils::metrics::SessionOutcome;
use lwe_secure_link::{run_client, Bit, LweServer};
use lwe_secure_link::network::SessionReport;
use tokio::sync::mpsc;

use crate::common::{TestPki, SECRET};

async fn start_server(pki: &TestPki, key_scope: &str) -> (String, Arc<LweServer>, mpsc::UnboundedReceiver<SessionReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let config = pki.server_config(key_scope);
    let server = Arc::new(LweServer::new(&config).unwrap().with_reports(tx));

    let listener = tcp::listen(&config.network.listen_address).await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let serving = Arc::clone(&server);
    tokio::spawn(async move { serving.serve(listener).await });

    (address, server, rx)
}

async fn next_report(rx: &mut mpsc::UnboundedReceiver<SessionReport>) -> SessionReport {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("no session report within 10s")
        .expect("report channel closed")
}

#[test_log::test(tokio::test)]
async fn test_both_bits_delivered_over_mutual_tls() {
    let pki = TestPki::new();
    let (address, server, mut reports) = start_server(&pki, "shared").await;
    let client = pki.client_config(&address, SECRET);

    for bit in [Bit::One, Bit::Zero] {
        let report = run_client(&client, bit).await.unwrap();
        assert_eq!(report.message, bit);
        assert!(report.public_key_size > 0);
        assert!(report.ciphertext_size > 0);

        let session = next_report(&mut reports).await;
        assert_eq!(session.outcome, SessionOutcome::Decrypted);
        assert_eq!(session.bit, Some(bit));
    }

    let snapshot = server.metrics().snapshot();
    assert_eq!(snapshot.accepted, 2);
    assert_eq!(snapshot.decrypted, 2);
}

#[test_log::test(tokio::test)]
async fn test_shared_key_reused_across_sessions() {
    let pki = TestPki::new();
    let (address, server, mut reports) = start_server(&pki, "shared").await;
    let client = pki.client_config(&address, SECRET);

    let first = run_client(&client, Bit::One).await.unwrap();
    let second = run_client(&client, Bit::One).await.unwrap();
    next_report(&mut reports).await;
    next_report(&mut reports).await;

    assert_eq!(first.public_key_fingerprint, second.public_key_fingerprint);
    assert!(server.public_key().is_some());
}

#[test_log::test(tokio::test)]
async fn test_per_session_keys_differ() {
    let pki = TestPki::new();
    let (address, server, mut reports) = start_server(&pki, "per_session").await;
    let client = pki.client_config(&address, SECRET);

    let first = run_client(&client, Bit::One).await.unwrap();
    let second = run_client(&client, Bit::Zero).await.unwrap();
    let bits = [next_report(&mut reports).await.bit, next_report(&mut reports).await.bit];
    assert!(bits.contains(&Some(Bit::One)));
    assert!(bits.contains(&Some(Bit::Zero)));

    assert_ne!(first.public_key_fingerprint, second.public_key_fingerprint);
    assert!(server.public_key().is_none());
}

#[test_log::test(tokio::test)]
async fn test_wrong_secret_never_receives_public_key() {
    let pki = TestPki::new();
    let (address, server, mut reports) = start_server(&pki, "shared").await;
    let client = pki.client_config(&address, "not-the-secret");

    assert!(run_client(&client, Bit::One).await.is_err());

    let session = next_report(&mut reports).await;
    assert_eq!(session.outcome, SessionOutcome::Rejected);
    assert_eq!(session.bit, None);

    // the server keeps accepting after a rejection
    let good = pki.client_config(&address, SECRET);
    run_client(&good, Bit::One).await.unwrap();
    assert_eq!(next_report(&mut reports).await.bit, Some(Bit::One));
    assert_eq!(server.metrics().snapshot().rejected, 1);
}

#[test_log::test(tokio::test)]
async fn test_untrusted_client_certificate_rejected() {
    let pki = TestPki::new();
    let (address, _server, mut reports) = start_server(&pki, "shared").await;
    let client = pki.client_config_with(&address, SECRET, &pki.rogue_cert, &pki.rogue_key);

    assert!(run_client(&client, Bit::One).await.is_err());

    let session = next_report(&mut reports).await;
    assert_eq!(session.outcome, SessionOutcome::Failed);
    assert_eq!(session.bit, None);
}

#[test_log::test(tokio::test)]
async fn test_client_fails_without_server() {
    let pki = TestPki::new();
    let listener = tcp::listen("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = pki.client_config(&address, SECRET);
    assert!(run_client(&client, Bit::One).await.is_err());
}
