use std::{collections::HashSet, sync::Arc};

use assert_matches::assert_matches;
use futures::StreamExt;
use vertex_block_api::{
    Block, BlockGetter, BlockServiceError, BlockStoreError, CancellationToken, Cid, ExchangeError,
    WriteMode,
};
use vertex_block_test_utils::{
    Call, CallLog, MemoryBlockStore, MockExchange, block_from, cids_of, test_block, test_blocks,
};
use vertex_blockservice::{BlockService, BlockServiceArgs, BlockServiceMetrics};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

struct Harness {
    service: BlockService,
    store: Arc<MemoryBlockStore>,
    exchange: MockExchange,
    log: CallLog,
}

fn harness(mode: WriteMode) -> Harness {
    init_tracing();
    let log = CallLog::new();
    let store = Arc::new(MemoryBlockStore::with_log(log.clone()));
    let exchange = MockExchange::with_log(log.clone());
    let service = BlockService::with_mode(store.clone(), Some(Arc::new(exchange.clone())), mode)
        .with_metrics(BlockServiceMetrics::noop());
    Harness {
        service,
        store,
        exchange,
        log,
    }
}

fn set_of(blocks: &[Block]) -> HashSet<Cid> {
    cids_of(blocks).into_iter().collect()
}

#[tokio::test]
async fn local_hit_does_not_touch_exchange() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(1);
    h.store.insert(block.clone());

    let got = h.service.get_block(&CancellationToken::new(), block.cid()).await.unwrap();
    assert_eq!(got, block);
    assert_eq!(h.log.count(Call::is_fetch), 0);
}

#[tokio::test]
async fn remote_hit_checks_store_first() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(2);
    h.exchange.add_remote(block.clone());

    let got = h.service.get_block(&CancellationToken::new(), block.cid()).await.unwrap();
    assert_eq!(got, block);

    let get = h.log.position(&Call::Get(block.cid().clone())).unwrap();
    let fetch = h.log.position_where(Call::is_fetch).unwrap();
    assert!(get < fetch);
    assert_eq!(h.log.count(Call::is_fetch), 1);
}

#[tokio::test]
async fn missing_everywhere_is_not_found() {
    let h = harness(WriteMode::Deduplicate);
    let missing = test_block(3);

    let err = h
        .service
        .get_block(&CancellationToken::new(), missing.cid())
        .await
        .unwrap_err();
    assert_matches!(err, BlockServiceError::NotFound { ref cid } if cid == missing.cid());
    assert_eq!(err.to_string(), format!("blockservice: key not found: {}", missing.cid()));
}

#[tokio::test]
async fn offline_miss_is_not_found() {
    init_tracing();
    let service = BlockService::new(Arc::new(MemoryBlockStore::new()), None);
    let missing = test_block(4);

    let err = service
        .get_block(&CancellationToken::new(), missing.cid())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn dedup_skips_present_block() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(5);
    h.store.insert(block.clone());

    h.service.add_block(&block).await.unwrap();
    assert_eq!(h.log.count(Call::is_write), 0);
    assert_eq!(h.log.count(Call::is_announce), 0);
}

#[tokio::test]
async fn dedup_writes_and_announces_new_block() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(6);

    h.service.add_block(&block).await.unwrap();
    assert_eq!(
        h.log.calls(),
        vec![
            Call::Has(block.cid().clone()),
            Call::Put(block.cid().clone()),
            Call::Announce(block.cid().clone()),
        ]
    );
}

#[tokio::test]
async fn write_through_always_writes() {
    let h = harness(WriteMode::WriteThrough);
    let block = test_block(7);
    h.store.insert(block.clone());

    h.service.add_block(&block).await.unwrap();
    assert_eq!(
        h.log.calls(),
        vec![Call::Put(block.cid().clone()), Call::Announce(block.cid().clone())]
    );
}

#[tokio::test]
async fn add_blocks_filters_present_and_announces_in_order() {
    let h = harness(WriteMode::Deduplicate);
    let blocks = test_blocks(1..=3);
    h.store.insert(blocks[1].clone());

    h.service.add_blocks(&blocks).await.unwrap();

    assert_eq!(
        h.log.count(|c| *c == Call::PutMany(vec![blocks[0].cid().clone(), blocks[2].cid().clone()])),
        1
    );
    assert_eq!(h.log.announced(), vec![blocks[0].cid().clone(), blocks[2].cid().clone()]);
    assert_eq!(h.store.len(), 3);
}

#[tokio::test]
async fn get_blocks_emits_local_hits_before_fetching() {
    let h = harness(WriteMode::Deduplicate);
    let blocks = test_blocks(1..=3);
    h.store.insert(blocks[0].clone());
    h.store.insert(blocks[2].clone());
    h.exchange.add_remote(blocks[1].clone());

    let got: Vec<Block> = h
        .service
        .get_blocks(&CancellationToken::new(), cids_of(&blocks))
        .collect()
        .await;

    assert_eq!(got, vec![blocks[0].clone(), blocks[2].clone(), blocks[1].clone()]);
    assert_eq!(set_of(&got), set_of(&blocks));

    let last_get = h.log.position(&Call::Get(blocks[2].cid().clone())).unwrap();
    let fetch = h
        .log
        .position(&Call::FetchBlocks {
            cids: vec![blocks[1].cid().clone()],
            session: None,
        })
        .unwrap();
    assert!(last_get < fetch);
    assert_eq!(h.log.count(Call::is_fetch), 1);
}

#[tokio::test]
async fn get_blocks_all_local_skips_exchange() {
    let h = harness(WriteMode::Deduplicate);
    let blocks = test_blocks(1..=4);
    for block in &blocks {
        h.store.insert(block.clone());
    }

    let got: Vec<Block> = h
        .service
        .get_blocks(&CancellationToken::new(), cids_of(&blocks))
        .collect()
        .await;
    assert_eq!(got, blocks);
    assert_eq!(h.log.count(Call::is_fetch), 0);
}

#[tokio::test]
async fn unresolvable_block_ends_stream_silently() {
    let h = harness(WriteMode::Deduplicate);
    let found = test_block(1);
    let missing = test_block(2);
    h.store.insert(found.clone());

    let got: Vec<Block> = h
        .service
        .get_blocks(
            &CancellationToken::new(),
            vec![found.cid().clone(), missing.cid().clone()],
        )
        .collect()
        .await;
    assert_eq!(got, vec![found]);
}

#[tokio::test]
async fn empty_batch_yields_nothing() {
    let h = harness(WriteMode::Deduplicate);
    let got: Vec<Block> = h.service.get_blocks(&CancellationToken::new(), vec![]).collect().await;
    assert!(got.is_empty());
    assert!(h.log.calls().is_empty());
}

#[tokio::test]
async fn cancel_mid_batch_stops_delivery() {
    init_tracing();
    let log = CallLog::new();
    let blocks = test_blocks(1..=6);
    let store = MemoryBlockStore::with_blocks(log.clone(), blocks.clone());
    let args = BlockServiceArgs {
        batch_buffer: 1,
        ..Default::default()
    };
    let service = BlockService::from_config(Arc::new(store), None, &args);

    let ctx = CancellationToken::new();
    let mut stream = service.get_blocks(&ctx, cids_of(&blocks));
    assert_eq!(stream.next().await, Some(blocks[0].clone()));

    ctx.cancel();
    assert!(stream.is_cancelled());
    assert_eq!(stream.next().await, None);
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    init_tracing();
    let service = BlockService::new(Arc::new(MemoryBlockStore::new()), None);
    let block = test_block(8);
    let ctx = CancellationToken::new();

    service.add_block(&block).await.unwrap();
    assert_eq!(service.get_block(&ctx, block.cid()).await.unwrap(), block);

    service.delete_block(block.cid()).unwrap();
    assert!(service.get_block(&ctx, block.cid()).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn delete_is_local_only() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(9);
    h.store.insert(block.clone());

    h.service.delete_block(block.cid()).unwrap();
    assert_eq!(h.log.calls(), vec![Call::Delete(block.cid().clone())]);
    assert!(!h.store.contains(block.cid()));
}

#[tokio::test]
async fn round_trip_preserves_content() {
    let h = harness(WriteMode::Deduplicate);
    let block = block_from(b"hello blockservice");

    h.service.add_block(&block).await.unwrap();
    let got = h.service.get_block(&CancellationToken::new(), block.cid()).await.unwrap();
    assert_eq!(got.data(), block.data());
    assert_eq!(got.cid(), block.cid());
}

#[tokio::test]
async fn add_block_after_close_reports_closed() {
    let h = harness(WriteMode::Deduplicate);
    h.service.close().await.unwrap();

    let block = test_block(10);
    let err = h.service.add_block(&block).await.unwrap_err();
    assert_matches!(err, BlockServiceError::Closed);
    assert!(err.is_closed());
    // The local write is not rolled back.
    assert!(h.store.contains(block.cid()));
}

#[tokio::test]
async fn add_blocks_stops_at_first_failed_announcement() {
    let h = harness(WriteMode::Deduplicate);
    let blocks = test_blocks(1..=3);
    h.exchange.close_after_announces(1);

    let err = h.service.add_blocks(&blocks).await.unwrap_err();
    assert_matches!(
        err,
        BlockServiceError::ClosedWhileAnnouncing { ref cid, source: ExchangeError::Closed }
            if cid == blocks[1].cid()
    );
    assert!(err.is_closed());
    assert_eq!(h.log.announced(), cids_of(&blocks[..2]));
    assert_eq!(h.store.len(), 3);
}

#[tokio::test]
async fn getters_are_interchangeable() {
    async fn fetch_all(getter: &dyn BlockGetter, cids: Vec<Cid>) -> Vec<Block> {
        getter.get_blocks(&CancellationToken::new(), cids).collect().await
    }

    let h = harness(WriteMode::Deduplicate);
    let blocks = test_blocks(1..=2);
    h.store.insert(blocks[0].clone());
    h.exchange.add_remote(blocks[1].clone());

    let session = h.service.new_session(&CancellationToken::new());
    for getter in [&h.service as &dyn BlockGetter, &session as &dyn BlockGetter] {
        let got = fetch_all(getter, cids_of(&blocks)).await;
        assert_eq!(set_of(&got), set_of(&blocks));
        let one = getter
            .get_block(&CancellationToken::new(), blocks[1].cid())
            .await
            .unwrap();
        assert_eq!(one, blocks[1]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reads_and_writes() {
    let h = harness(WriteMode::Deduplicate);
    let service = Arc::new(h.service);
    let blocks = test_blocks(0..32);

    let mut handles = Vec::new();
    for block in blocks.clone() {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service.add_block(&block).await.unwrap();
            service
                .get_block(&CancellationToken::new(), block.cid())
                .await
                .unwrap()
        }));
    }
    for (handle, block) in handles.into_iter().zip(&blocks) {
        assert_eq!(&handle.await.unwrap(), block);
    }

    assert_eq!(h.store.len(), blocks.len());
    assert_eq!(h.log.count(Call::is_fetch), 0);
}

#[tokio::test]
async fn add_block_put_failure_skips_announce() {
    let h = harness(WriteMode::Deduplicate);
    h.store.fail_writes();
    let block = test_block(11);

    let err = h.service.add_block(&block).await.unwrap_err();
    assert_matches!(err, BlockServiceError::Store(BlockStoreError::Backend { .. }));
    assert_eq!(h.log.count(|c| *c == Call::Put(block.cid().clone())), 1);
    assert_eq!(h.log.count(Call::is_announce), 0);
}

#[tokio::test]
async fn add_blocks_put_many_failure_announces_nothing() {
    let h = harness(WriteMode::WriteThrough);
    h.store.fail_writes();
    let blocks = test_blocks(1..=3);

    let err = h.service.add_blocks(&blocks).await.unwrap_err();
    assert_matches!(err, BlockServiceError::Store(BlockStoreError::Backend { .. }));
    assert_eq!(h.log.count(|c| *c == Call::PutMany(cids_of(&blocks))), 1);
    assert_eq!(h.log.count(Call::is_announce), 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn add_block_has_failure_writes_nothing() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(12);
    h.store.fail_on(block.cid().clone());

    let err = h.service.add_block(&block).await.unwrap_err();
    assert_matches!(err, BlockServiceError::Store(BlockStoreError::Backend { .. }));
    assert_eq!(h.log.calls(), vec![Call::Has(block.cid().clone())]);
}

#[tokio::test]
async fn repeated_add_is_a_no_op() {
    let h = harness(WriteMode::Deduplicate);
    let block = test_block(13);

    h.service.add_block(&block).await.unwrap();
    assert_eq!(h.log.announced(), vec![block.cid().clone()]);

    h.log.clear();
    h.service.add_block(&block).await.unwrap();
    assert_eq!(h.log.calls(), vec![Call::Has(block.cid().clone())]);
}
