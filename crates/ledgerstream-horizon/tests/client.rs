//! `HorizonClient` against a canned local HTTP server.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use ledgerstream_core::client::{LedgerClient, LedgerRequest, Order, TransactionRequest};
use ledgerstream_core::error::IngestError;
use ledgerstream_horizon::{HorizonClient, HorizonConfig, RetryConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const LEDGERS: &str = r#"{"_embedded":{"records":[
  {"sequence":1,"hash":"aa","paging_token":"4294967296","successful_transaction_count":0,"closed_at":"2020-01-01T00:00:00Z"},
  {"sequence":2,"hash":"bb","prev_hash":"aa","paging_token":"8589934592","successful_transaction_count":1,"closed_at":"2020-01-01T00:00:05Z"}
]}}"#;

const TRANSACTIONS: &str = r#"{"_embedded":{"records":[
  {"hash":"t1","ledger":7,"paging_token":"30064775169","envelope_xdr":"AQID","result_xdr":"BAU=","result_meta_xdr":""}
]}}"#;

type RequestLog = Arc<Mutex<Vec<String>>>;

/// Serve `routes` (path prefix → body) on an ephemeral port. Unmatched paths get 404.
async fn serve(routes: Vec<(&'static str, &'static str)>) -> (String, RequestLog) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: RequestLog = Arc::default();
    let seen = Arc::clone(&log);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            let seen = Arc::clone(&seen);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]).to_string();
                let target = head.split_whitespace().nth(1).unwrap_or("/").to_string();
                seen.lock().unwrap().push(target.clone());

                let (status, body) = routes
                    .iter()
                    .find(|(prefix, _)| target.starts_with(prefix))
                    .map(|(_, body)| ("200 OK", *body))
                    .unwrap_or(("404 Not Found", r#"{"status":404}"#));
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/hal+json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (format!("http://{addr}"), log)
}

fn config(url: &str) -> HorizonConfig {
    HorizonConfig {
        poll_interval_ms: 50,
        retry: RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        },
        ..HorizonConfig::new(url)
    }
}

#[tokio::test]
async fn ledger_subscription_starts_at_cursor() {
    let (url, log) = serve(vec![("/ledgers?", LEDGERS)]).await;
    let client = HorizonClient::new(config(&url)).unwrap();

    let stream = client
        .stream_ledgers(LedgerRequest {
            cursor: "0".into(),
            order: Order::Asc,
        })
        .await
        .unwrap();
    let headers: Vec<_> = stream.take(2).map(|h| h.unwrap()).collect().await;

    assert_eq!(headers[0].sequence, 1);
    assert_eq!(headers[1].sequence, 2);
    assert_eq!(headers[1].prev_hash, "aa");

    let first = log.lock().unwrap()[0].clone();
    assert!(first.contains("cursor=0"), "{first}");
    assert!(first.contains("order=asc"), "{first}");
    assert!(first.contains("limit=200"), "{first}");
}

#[tokio::test]
async fn polling_advances_cursor() {
    let (url, log) = serve(vec![("/ledgers?", LEDGERS)]).await;
    let client = HorizonClient::new(config(&url)).unwrap();

    let stream = client
        .stream_ledgers(LedgerRequest {
            cursor: "0".into(),
            order: Order::Asc,
        })
        .await
        .unwrap();
    // The canned server repeats itself, so the third header is from the second poll.
    let headers: Vec<_> = stream.take(3).map(|h| h.unwrap()).collect().await;
    assert_eq!(headers.len(), 3);

    let requests = log.lock().unwrap().clone();
    assert!(requests.len() >= 2);
    assert!(requests[1].contains("cursor=8589934592"), "{}", requests[1]);
}

#[tokio::test]
async fn transactions_for_ledger() {
    let (url, log) = serve(vec![("/ledgers/7/transactions", TRANSACTIONS)]).await;
    let client = HorizonClient::new(config(&url)).unwrap();

    let records = client.ledger_transactions(7, 200).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].envelope_xdr, "AQID");

    let page = client
        .transactions(TransactionRequest {
            for_ledger: 7,
            cursor: Some("30064775168".into()),
            limit: 10,
        })
        .await
        .unwrap();
    assert_eq!(page.next_cursor.as_deref(), Some("30064775169"));

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].starts_with("/ledgers/7/transactions?order=asc&limit=200"));
    assert!(requests[1].contains("cursor=30064775168"));
}

#[tokio::test]
async fn missing_ledger_is_not_retried() {
    let (url, log) = serve(vec![]).await;
    let mut cfg = config(&url);
    cfg.retry = RetryConfig {
        max_retries: 3,
        initial_backoff_ms: 1,
        ..RetryConfig::default()
    };
    let client = HorizonClient::new(cfg).unwrap();

    let err = client.ledger_transactions(9, 200).await.unwrap_err();
    assert!(matches!(err, IngestError::Client(_)));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unreachable_server_fails_subscription() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HorizonClient::new(config(&format!("http://{addr}"))).unwrap();
    let result = client
        .stream_ledgers(LedgerRequest {
            cursor: "0".into(),
            order: Order::Asc,
        })
        .await;
    match result {
        Err(err) => assert!(err.is_setup(), "{err}"),
        Ok(_) => panic!("subscription to a closed port should fail"),
    }
}
