//! Event receiver and query API tests.
//!
//! Events are posted to the receiver router and read back through the
//! public router, both over one in-memory datastore.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use sidecar_chain::ChainConfig;
use sidecar_core::{format_hash, transaction_id};
use sidecar_node::config::Network;

use common::{
    block_event, hash_hex, mempool_event, sender, signed_transfer, tx_event, FakeRpc, TestApp,
};

#[tokio::test]
async fn test_ingested_block_is_queryable() {
    let app = TestApp::new();
    let a1 = block_event(
        1,
        1,
        None,
        true,
        vec![
            tx_event(&hash_hex(0x10, 1, 0), 0, "coinbase"),
            tx_event(&hash_hex(0x10, 1, 1), 1, "token_transfer"),
        ],
    );
    let a2 = block_event(
        2,
        1,
        Some(&a1),
        true,
        vec![tx_event(&hash_hex(0x10, 1, 2), 0, "coinbase")],
    );

    for block in [&a1, &a2] {
        let (status, body) = app.post_event("/new_block", block.clone()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], "ok");
    }

    let (status, page) = app.get("/extended/v1/tx").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 3);
    assert_eq!(page["limit"], 96);
    assert_eq!(page["offset"], 0);
    // Most recent first.
    assert_eq!(page["results"][0]["tx_id"], hash_hex(0x10, 1, 2));
    assert_eq!(page["results"][0]["block_height"], 2);

    let (_, asc) = app.get("/extended/v1/tx?order=asc&limit=1&offset=1").await;
    assert_eq!(asc["limit"], 1);
    assert_eq!(asc["results"].as_array().unwrap().len(), 1);
    assert_eq!(asc["results"][0]["tx_id"], hash_hex(0x10, 1, 1));

    let (status, current) = app.get("/extended/v1/block/current").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(current["hash"], a2["block_hash"]);
    assert_eq!(current["height"], 2);
    assert_eq!(current["canonical"], true);

    let (_, by_height) = app.get("/extended/v1/block/1").await;
    assert_eq!(by_height["hash"], a1["block_hash"]);
    assert_eq!(by_height["txs"].as_array().unwrap().len(), 2);

    let path = format!("/extended/v1/block/{}", a1["block_hash"].as_str().unwrap());
    let (status, by_hash) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(by_hash["height"], 1);

    let path = format!("/extended/v1/tx/{}", hash_hex(0x10, 1, 1));
    let (status, tx) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["canonical"], true);
    assert_eq!(tx["tx_status"], "success");
    assert_eq!(tx["sender_address"], sender());

    let (_, status_body) = app.get("/extended/v1/status").await;
    assert_eq!(status_body["status"], "ready");
    assert_eq!(status_body["chain_tip"]["block_height"], 2);
    assert_eq!(status_body["canonical_transactions"], 3);
}

#[tokio::test]
async fn test_empty_datastore_answers_not_found() {
    let app = TestApp::new();

    let (status, _) = app.get("/extended/v1/block/current").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/extended/v1/block/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let path = format!("/extended/v1/tx/{}", hash_hex(0x10, 9, 9));
    let (status, body) = app.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (_, page) = app.get("/extended/v1/tx").await;
    assert_eq!(page["total"], 0);
    assert!(page["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_bad_parameters_rejected() {
    let app = TestApp::new();

    let (status, body) = app.get("/extended/v1/tx?limit=500").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("limit"));

    let (status, _) = app.get("/extended/v1/tx?limit=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/extended/v1/tx/mempool?limit=201").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/extended/v1/tx/0x1234").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/extended/v1/block/tip").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_event_writes_nothing() {
    let app = TestApp::new();

    let (status, _) = app.post_raw_event("/new_block", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut block = block_event(1, 1, None, true, vec![]);
    block["parent_block_hash"] = block["block_hash"].clone();
    let (status, body) = app.post_event("/new_block", block).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let duplicate_index = block_event(
        1,
        1,
        None,
        true,
        vec![
            tx_event(&hash_hex(0x10, 1, 0), 0, "coinbase"),
            tx_event(&hash_hex(0x10, 1, 1), 0, "token_transfer"),
        ],
    );
    let (status, _) = app.post_event("/new_block", duplicate_index).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_hash = block_event(1, 1, None, true, vec![]);
    bad_hash["block_hash"] = json!("0xabc");
    let (status, _) = app.post_event("/new_block", bad_hash).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status_body) = app.get("/extended/v1/status").await;
    assert_eq!(status_body["blocks"], 0);
    assert!(status_body["chain_tip"].is_null());
}

#[tokio::test]
async fn test_redelivered_block_is_absorbed() {
    let app = TestApp::new();
    let a1 = block_event(
        1,
        1,
        None,
        true,
        vec![tx_event(&hash_hex(0x10, 1, 0), 0, "coinbase")],
    );

    for _ in 0..3 {
        let (status, _) = app.post_event("/new_block", a1.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, status_body) = app.get("/extended/v1/status").await;
    assert_eq!(status_body["blocks"], 1);
    assert_eq!(status_body["canonical_transactions"], 1);
}

#[tokio::test]
async fn test_reorg_through_events() {
    let app = TestApp::new();
    let transfer = hash_hex(0x10, 1, 5);
    let a1 = block_event(1, 1, None, true, vec![]);
    let a2 = block_event(
        2,
        1,
        Some(&a1),
        true,
        vec![
            tx_event(&hash_hex(0x10, 1, 2), 0, "coinbase"),
            tx_event(&transfer, 1, "token_transfer"),
        ],
    );
    let b2 = block_event(
        2,
        2,
        Some(&a1),
        true,
        vec![tx_event(&hash_hex(0x10, 2, 2), 0, "coinbase")],
    );

    for block in [&a1, &a2, &b2] {
        let (status, _) = app.post_event("/new_block", block.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, current) = app.get("/extended/v1/block/current").await;
    assert_eq!(current["hash"], b2["block_hash"]);

    let path = format!("/extended/v1/block/{}", a2["block_hash"].as_str().unwrap());
    let (_, orphaned) = app.get(&path).await;
    assert_eq!(orphaned["canonical"], false);

    // The transfer was only mined on the losing branch, so it is pending again.
    let path = format!("/extended/v1/tx/{transfer}");
    let (status, tx) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tx["tx_status"], "pending");

    let (_, mempool) = app.get("/extended/v1/tx/mempool").await;
    assert_eq!(mempool["total"], 1);
    assert_eq!(mempool["results"][0]["tx_id"], transfer);

    let (_, page) = app.get("/extended/v1/tx").await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["results"][0]["tx_id"], hash_hex(0x10, 2, 2));

    // The orphaned coinbase is still reachable by id, flagged non-canonical.
    let path = format!("/extended/v1/tx/{}", hash_hex(0x10, 1, 2));
    let (status, coinbase) = app.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coinbase["canonical"], false);
}

#[tokio::test]
async fn test_mempool_lifecycle() {
    let app = TestApp::new();
    let raw = signed_transfer(0x04, 0x00, [1; 65]);
    let tx_id = format_hash(&transaction_id(&raw));

    let (status, _) = app.post_event("/new_mempool_tx", mempool_event(&raw, 1_000)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, mempool) = app.get("/extended/v1/tx/mempool").await;
    assert_eq!(mempool["total"], 1);
    assert_eq!(mempool["results"][0]["tx_id"], tx_id);
    assert_eq!(mempool["results"][0]["receipt_time"], 1_000);

    let (_, pending) = app.get(&format!("/extended/v1/tx/{tx_id}")).await;
    assert_eq!(pending["tx_status"], "pending");

    // Mining it canonically takes it out of the mempool.
    let a1 = block_event(
        1,
        1,
        None,
        true,
        vec![
            tx_event(&hash_hex(0x10, 1, 0), 0, "coinbase"),
            tx_event(&tx_id, 1, "token_transfer"),
        ],
    );
    let (status, _) = app.post_event("/new_block", a1).await;
    assert_eq!(status, StatusCode::OK);

    let (_, mempool) = app.get("/extended/v1/tx/mempool").await;
    assert_eq!(mempool["total"], 0);

    let (_, mined) = app.get(&format!("/extended/v1/tx/{tx_id}")).await;
    assert_eq!(mined["tx_status"], "success");
    assert_eq!(mined["canonical"], true);
}

#[tokio::test]
async fn test_dropped_mempool_transaction() {
    let app = TestApp::new();
    let raw = signed_transfer(0x04, 0x00, [2; 65]);
    let tx_id = format_hash(&transaction_id(&raw));

    app.post_event("/new_mempool_tx", mempool_event(&raw, 50)).await;
    let (status, _) = app
        .post_event(
            "/drop_mempool_tx",
            json!({ "dropped_txids": [tx_id], "reason": "ReplaceByFee" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, mempool) = app.get("/extended/v1/tx/mempool").await;
    assert_eq!(mempool["total"], 0);

    let (status, _) = app.get(&format!("/extended/v1/tx/{tx_id}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_burn_block_and_microblocks_accepted() {
    let app = TestApp::new();
    let a1 = block_event(1, 1, None, true, vec![]);
    app.post_event("/new_block", a1.clone()).await;

    let (status, _) = app
        .post_event(
            "/new_burn_block",
            json!({
                "burn_block_hash": hash_hex(3, 1, 1),
                "burn_block_height": 800_001,
                "burn_block_time": 1_700_000_600,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .post_event(
            "/new_microblocks",
            json!({
                "microblocks": [{
                    "microblock_hash": hash_hex(4, 1, 0),
                    "microblock_sequence": 0,
                    "microblock_parent_hash": a1["block_hash"],
                    "parent_index_block_hash": a1["index_block_hash"],
                }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let anchor = sidecar_core::parse_hash(a1["index_block_hash"].as_str().unwrap()).unwrap();
    let microblocks = app.store.get_microblocks(&anchor).unwrap();
    assert_eq!(microblocks.len(), 1);
    assert!(microblocks[0].canonical);
}

#[tokio::test]
async fn test_contract_lookup() {
    let app = TestApp::new();
    let contract_id = format!("{}.counter", sender());
    let mut deploy = tx_event(&hash_hex(0x10, 1, 1), 1, "smart_contract");
    deploy["contract_deploy"] = json!({
        "contract_id": contract_id,
        "source_code": "(define-data-var count int 0)",
        "abi": { "functions": [], "variables": [] },
    });
    let a1 = block_event(
        1,
        1,
        None,
        true,
        vec![tx_event(&hash_hex(0x10, 1, 0), 0, "coinbase"), deploy],
    );
    let (status, _) = app.post_event("/new_block", a1).await;
    assert_eq!(status, StatusCode::OK);

    let (status, contract) = app.get(&format!("/extended/v1/contract/{contract_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contract["contract_id"], contract_id);
    assert_eq!(contract["tx_id"], hash_hex(0x10, 1, 1));
    assert!(contract["abi"]["functions"].is_array());

    let (status, _) = app
        .get(&format!("/extended/v1/contract/{}.missing", sender()))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_inconsistent_reorg_halts_ingest() {
    let app = TestApp::with(
        ChainConfig { max_reorg_depth: 1 },
        FakeRpc::new(0),
        Network::Testnet,
    );
    let a1 = block_event(1, 1, None, true, vec![]);
    let a2 = block_event(2, 1, Some(&a1), true, vec![]);
    let a3 = block_event(3, 1, Some(&a2), true, vec![]);
    for block in [&a1, &a2, &a3] {
        let (status, _) = app.post_event("/new_block", block.clone()).await;
        assert_eq!(status, StatusCode::OK);
    }

    // Forks off the root, two blocks below the tip.
    let b2 = block_event(2, 2, Some(&a1), false, vec![]);
    let b3 = block_event(3, 2, Some(&b2), true, vec![]);
    let (status, _) = app.post_event("/new_block", b2).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app.post_event("/new_block", b3).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());

    let (_, current) = app.get("/extended/v1/block/current").await;
    assert_eq!(current["hash"], a3["block_hash"]);

    let a4 = block_event(4, 1, Some(&a3), true, vec![]);
    let (status, _) = app.post_event("/new_block", a4).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, status_body) = app.get("/extended/v1/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(status_body["status"], "halted");
    assert!(status_body["halted_reason"].is_string());
}

#[tokio::test]
async fn test_broadcast_passthrough() {
    let app = TestApp::new();
    let raw = signed_transfer(0x04, 0x00, [3; 65]);

    let (status, body) = app.post_bytes("/v2/transactions", raw.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(format_hash(&transaction_id(&raw))));
    assert_eq!(app.rpc.broadcasts.lock().unwrap().as_slice(), &[raw]);

    let (status, _) = app.post_bytes("/v2/transactions", Vec::new()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_broadcast_upstream_unavailable() {
    let app = TestApp::with(ChainConfig::default(), FakeRpc::unavailable(), Network::Testnet);
    let raw = signed_transfer(0x04, 0x00, [3; 65]);

    let (status, body) = app.post_bytes("/v2/transactions", raw).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("unavailable"));
}
